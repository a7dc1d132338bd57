use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::JobState;
use crate::consensus::ConsensusResult;
use crate::request::EvaluationRequest;

/// The durable job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationJob {
    pub id: String,
    pub payload: EvaluationRequest,
    pub state: JobState,
    /// Attempts spent by each oracle call, in call order.
    #[serde(default)]
    pub attempts: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ConsensusResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl EvaluationJob {
    pub fn new(payload: EvaluationRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            state: JobState::Queued,
            attempts: Vec::new(),
            result: None,
            error: None,
            enqueued_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Time spent between enqueue and the terminal transition.
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|done| (done - self.enqueued_at).num_milliseconds())
    }
}
