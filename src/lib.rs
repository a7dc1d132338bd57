//! Deferred answer grading against an unreliable LLM judge.
//!
//! Requests are queued in a [`store::JobStore`], claimed by the
//! [`dispatcher::Dispatcher`]'s workers, judged one or more times through the
//! retrying [`oracle::OracleInvoker`], and collapsed into a single
//! [`consensus::ConsensusResult`]. [`intake::Intake`] is the front door.

pub mod anthropic;
pub mod config;
pub mod consensus;
pub mod dispatcher;
pub mod error;
pub mod intake;
pub mod oracle;
pub mod request;
pub mod state_machine;
pub mod store;

pub use error::VerdictError;
