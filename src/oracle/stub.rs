//! Scripted oracles for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use super::Oracle;
use crate::error::OracleError;
use crate::request::EvaluationRequest;

type Reply = Result<String, OracleError>;

enum Script {
    Queue(Mutex<VecDeque<Reply>>),
    Always(fn() -> Reply),
    Raw(String),
}

/// Replays a fixed sequence of replies, one per call, and counts calls.
/// When a queue runs dry every further call fails with a transport error.
pub struct ScriptedOracle {
    script: Script,
    calls: AtomicU32,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(replies.into())),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_transport_error() -> Self {
        Self {
            script: Script::Always(|| Err(OracleError::Transport("service unavailable".into()))),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_raw(raw: &str) -> Self {
        Self {
            script: Script::Raw(raw.to_string()),
            calls: AtomicU32::new(0),
        }
    }

    /// Each call answers with the next score, all as `correct`.
    pub fn scores(scores: &[f64]) -> Self {
        Self::new(scores.iter().map(|s| Ok(response_json("correct", *s))).collect())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn evaluate(&self, _request: &EvaluationRequest) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(OracleError::Transport("script exhausted".into()))),
            Script::Always(reply) => reply(),
            Script::Raw(raw) => Ok(raw.clone()),
        }
    }
}

pub fn response_json(status: &str, points: f64) -> String {
    format!(r#"{{"status": "{status}", "feedback": "scored {points}", "points": {points}}}"#)
}
