use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::job::EvaluationJob;
use crate::consensus::ConsensusResult;

/// Lifecycle of an evaluation job.
///
/// QUEUED → ACTIVE → (COMPLETED | FAILED). There are no backward edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Column value used by the job store. Matches the serde encoding.
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<JobState> {
        match value {
            "queued" => Some(JobState::Queued),
            "active" => Some(JobState::Active),
            "completed" => Some(JobState::Completed),
            "failed" => Some(JobState::Failed),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::Active)
                | (JobState::Active, JobState::Completed)
                | (JobState::Active, JobState::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Queued => write!(f, "QUEUED"),
            JobState::Active => write!(f, "ACTIVE"),
            JobState::Completed => write!(f, "COMPLETED"),
            JobState::Failed => write!(f, "FAILED"),
        }
    }
}

/// A requested state change, with the data the target state carries.
///
/// Terminal transitions carry the per-call attempt counts so they land in
/// the same write as the outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Claim,
    Complete {
        result: ConsensusResult,
        attempts: Vec<u32>,
    },
    Fail {
        error: String,
        attempts: Vec<u32>,
    },
}

impl Transition {
    pub fn target(&self) -> JobState {
        match self {
            Transition::Claim => JobState::Active,
            Transition::Complete { .. } => JobState::Completed,
            Transition::Fail { .. } => JobState::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move job from {from} to {to}")]
pub struct InvalidTransition {
    pub from: JobState,
    pub to: JobState,
}

/// Applies transitions to a job, keeping `result` present iff COMPLETED and
/// `error` present iff FAILED.
pub struct StateMachine;

impl StateMachine {
    pub fn apply(job: &mut EvaluationJob, transition: Transition) -> Result<(), InvalidTransition> {
        let to = transition.target();
        if !job.state.can_transition_to(to) {
            return Err(InvalidTransition {
                from: job.state,
                to,
            });
        }

        match transition {
            Transition::Claim => {}
            Transition::Complete { result, attempts } => {
                job.result = Some(result);
                job.attempts = attempts;
                job.completed_at = Some(chrono::Utc::now());
            }
            Transition::Fail { error, attempts } => {
                job.error = Some(error);
                job.attempts = attempts;
                job.completed_at = Some(chrono::Utc::now());
            }
        }
        job.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{Agreement, ConsensusResult};
    use crate::oracle::{OracleResponse, Verdict};
    use crate::request::EvaluationRequest;

    fn make_job() -> EvaluationJob {
        EvaluationJob::new(EvaluationRequest::new("Capital of France?", "Paris"))
    }

    fn complete() -> Transition {
        Transition::Complete {
            result: result(),
            attempts: vec![1],
        }
    }

    fn fail(error: &str) -> Transition {
        Transition::Fail {
            error: error.into(),
            attempts: vec![3],
        }
    }

    fn result() -> ConsensusResult {
        ConsensusResult {
            response: OracleResponse {
                verdict: Verdict::Positive,
                score: 1.0,
                feedback: "Correct.".into(),
                hint: None,
                passed_rubrics: None,
                failed_rubrics: None,
            },
            agreement: Agreement::AllSame,
            votes: 1,
        }
    }

    #[test]
    fn happy_path_walks_all_states() {
        let mut job = make_job();
        assert_eq!(job.state, JobState::Queued);

        StateMachine::apply(&mut job, Transition::Claim).unwrap();
        assert_eq!(job.state, JobState::Active);
        assert!(job.completed_at.is_none());

        StateMachine::apply(&mut job, complete()).unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.attempts, vec![1]);
        assert!(job.result.is_some());
        assert!(job.error.is_none());
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn failure_sets_error_not_result() {
        let mut job = make_job();
        StateMachine::apply(&mut job, Transition::Claim).unwrap();
        StateMachine::apply(&mut job, fail("oracle down")).unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts, vec![3]);
        assert_eq!(job.error.as_deref(), Some("oracle down"));
        assert!(job.result.is_none());
    }

    #[test]
    fn queued_job_cannot_complete() {
        let mut job = make_job();
        let err = StateMachine::apply(&mut job, complete()).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                from: JobState::Queued,
                to: JobState::Completed
            }
        );
        assert_eq!(job.state, JobState::Queued);
        assert!(job.result.is_none());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut job = make_job();
        StateMachine::apply(&mut job, Transition::Claim).unwrap();
        StateMachine::apply(&mut job, complete()).unwrap();

        assert!(StateMachine::apply(&mut job, Transition::Claim).is_err());
        assert!(StateMachine::apply(&mut job, fail("late")).is_err());
        assert!(StateMachine::apply(&mut job, complete()).is_err());
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.attempts, vec![1]);
        assert!(job.error.is_none());
    }

    #[test]
    fn claim_happens_once() {
        let mut job = make_job();
        StateMachine::apply(&mut job, Transition::Claim).unwrap();
        assert!(StateMachine::apply(&mut job, Transition::Claim).is_err());
    }

    #[test]
    fn state_display_and_serde() {
        assert_eq!(JobState::Queued.to_string(), "QUEUED");
        assert_eq!(JobState::Completed.to_string(), "COMPLETED");
        assert_eq!(serde_json::to_string(&JobState::Active).unwrap(), r#""active""#);
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Active.is_terminal());
    }

    #[test]
    fn column_encoding_matches_serde() {
        for state in [JobState::Queued, JobState::Active, JobState::Completed, JobState::Failed] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
            assert_eq!(JobState::parse(state.as_str()), Some(state));
        }
        assert_eq!(JobState::parse("ACTIVE"), None);
    }
}
