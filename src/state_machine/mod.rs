mod job;
mod state;

pub use job::EvaluationJob;
pub use state::{InvalidTransition, JobState, StateMachine, Transition};
