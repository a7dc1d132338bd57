//! Submit, work and status running on separate handles of one database file,
//! the way separate `verdict` invocations share it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use verdict::dispatcher::{Dispatcher, DispatcherConfig};
use verdict::error::OracleError;
use verdict::intake::{Intake, Status};
use verdict::oracle::{Backoff, Oracle, OracleInvoker, RetryPolicy};
use verdict::request::EvaluationRequest;
use verdict::store::JobStore;

struct FixedOracle;

#[async_trait]
impl Oracle for FixedOracle {
    async fn evaluate(&self, _request: &EvaluationRequest) -> Result<String, OracleError> {
        Ok(r#"{"status": "correct", "feedback": "Fine.", "points": 1}"#.to_string())
    }
}

fn dispatcher(store: Arc<JobStore>) -> Arc<Dispatcher> {
    let invoker = OracleInvoker::new(
        Arc::new(FixedOracle),
        RetryPolicy {
            attempt_budget: 1,
            backoff: Backoff::Fixed(Duration::ZERO),
        },
    );
    Arc::new(Dispatcher::new(
        store,
        Arc::new(invoker),
        DispatcherConfig {
            workers: 2,
            poll_interval: Duration::from_millis(10),
        },
    ))
}

#[tokio::test]
async fn worker_drains_jobs_submitted_by_another_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("verdict.db");

    let submit = Intake::new(Arc::new(JobStore::open(&path).unwrap()), 10);
    let ids: Vec<String> = (0..5)
        .map(|_| {
            submit
                .enqueue(EvaluationRequest::new("Q", "A").with_repetitions(2))
                .unwrap()
                .job_id
        })
        .collect();

    let worker_store = Arc::new(JobStore::open(&path).unwrap());
    assert_eq!(worker_store.recover_interrupted().unwrap(), 0);
    assert_eq!(dispatcher(worker_store).drain().await, 5);

    let status = Intake::new(Arc::new(JobStore::open(&path).unwrap()), 10);
    for id in ids {
        let report = status.status(&id).unwrap();
        assert_eq!(report.status, Status::Completed);
        assert_eq!(report.result.unwrap().votes, 2);
    }
}

#[tokio::test]
async fn status_check_does_not_fail_a_running_job() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("verdict.db");

    let worker = JobStore::open(&path).unwrap();
    let submission = Intake::new(Arc::new(JobStore::open(&path).unwrap()), 10)
        .enqueue(EvaluationRequest::new("Q", "A"))
        .unwrap();
    let job = worker.claim().unwrap().unwrap();
    assert_eq!(job.id, submission.job_id);

    // A fresh handle opened just to ask for status.
    let status = Intake::new(Arc::new(JobStore::open(&path).unwrap()), 10);
    assert_eq!(status.status(&job.id).unwrap().status, Status::Active);
    assert_eq!(status.status(&job.id).unwrap().status, Status::Active);

    let worker = Arc::new(worker);
    assert_eq!(
        dispatcher(worker).process(job.clone()).await.unwrap(),
        verdict::state_machine::JobState::Completed
    );
    assert_eq!(status.status(&job.id).unwrap().status, Status::Completed);
}
