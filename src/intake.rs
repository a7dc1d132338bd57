//! Submission and status facade over the job store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consensus::ConsensusResult;
use crate::error::VerdictError;
use crate::request::EvaluationRequest;
use crate::state_machine::JobState;
use crate::store::JobStore;

/// Handle returned by [`Intake::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub job_id: String,
}

/// Externally visible job status. `NotFound` is an answer, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Queued,
    Active,
    Completed,
    Failed,
    NotFound,
}

impl From<JobState> for Status {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Queued => Status::Queued,
            JobState::Active => Status::Active,
            JobState::Completed => Status::Completed,
            JobState::Failed => Status::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ConsensusResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            result: None,
            error: None,
        }
    }
}

pub struct Intake {
    store: Arc<JobStore>,
    max_repetitions: u32,
}

impl Intake {
    pub fn new(store: Arc<JobStore>, max_repetitions: u32) -> Self {
        Self {
            store,
            max_repetitions,
        }
    }

    /// Validate and queue a request. Returns as soon as the job is stored.
    pub fn enqueue(&self, request: EvaluationRequest) -> Result<Submission, VerdictError> {
        request.validate(self.max_repetitions)?;
        let job_id = self.store.submit(request)?;
        Ok(Submission { job_id })
    }

    pub fn status(&self, job_id: &str) -> Result<StatusReport, VerdictError> {
        let Some(job) = self.store.get(job_id)? else {
            debug!(job_id, "status requested for unknown job");
            return Ok(StatusReport::not_found());
        };
        Ok(StatusReport {
            status: job.state.into(),
            result: job.result,
            error: job.error,
        })
    }
}
