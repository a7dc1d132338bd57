use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::consensus::{self, ConsensusResult};
use crate::error::{OracleError, StoreError};
use crate::oracle::OracleInvoker;
use crate::state_machine::{EvaluationJob, JobState};
use crate::store::JobStore;

/// Writes tried for a terminal transition before giving up on the store.
const TERMINAL_WRITE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Number of concurrently running workers. Values below 1 are treated as 1.
    pub workers: usize,
    /// How long an idle worker waits before polling the store again.
    pub poll_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Pool of workers that claim jobs, collect oracle opinions and persist the
/// consensus.
pub struct Dispatcher {
    store: Arc<JobStore>,
    invoker: Arc<OracleInvoker>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(store: Arc<JobStore>, invoker: Arc<OracleInvoker>, config: DispatcherConfig) -> Self {
        Self {
            store,
            invoker,
            config,
        }
    }

    /// Run a claimed job to its terminal state.
    ///
    /// Every requested call must succeed for the job to complete. The first
    /// call that exhausts its retries fails the job and no further calls are
    /// made. The outcome and the per-call attempt counts are stored in a
    /// single write.
    pub async fn process(&self, job: EvaluationJob) -> Result<JobState, StoreError> {
        let requested = job.payload.repetition_count().max(1);
        let mut batch = Vec::with_capacity(requested as usize);
        let mut attempts = Vec::with_capacity(requested as usize);
        let mut failure = None;

        for call in 1..=requested {
            match self.invoker.invoke_once(&job.payload).await {
                Ok(invocation) => {
                    debug!(job_id = %job.id, call, requested, attempts = invocation.attempts, "oracle call succeeded");
                    attempts.push(invocation.attempts);
                    batch.push(invocation.response);
                }
                Err(err) => {
                    if let OracleError::RetriesExhausted { attempts: spent, .. } = &err {
                        attempts.push(*spent);
                    }
                    error!(job_id = %job.id, call, requested, error = %err, "oracle call failed");
                    failure = Some(err);
                    break;
                }
            }
        }

        let outcome = match failure {
            Some(err) => Outcome::Failed(err.to_string()),
            None => Outcome::Completed(consensus::resolve(batch)),
        };
        self.settle(&job.id, outcome, attempts).await
    }

    /// Persist the terminal transition, retrying while the store is
    /// unavailable. A completion that still cannot be stored falls back to
    /// failing the job so it does not stay ACTIVE.
    async fn settle(
        &self,
        id: &str,
        outcome: Outcome,
        attempts: Vec<u32>,
    ) -> Result<JobState, StoreError> {
        let mut write = 1;
        let err = loop {
            let written = match &outcome {
                Outcome::Completed(result) => {
                    self.store.complete(id, result.clone(), attempts.clone())
                }
                Outcome::Failed(error) => self.store.fail(id, error.clone(), attempts.clone()),
            };
            match written {
                Ok(()) => {
                    outcome.log(id);
                    return Ok(outcome.state());
                }
                Err(StoreError::Unavailable(reason)) if write < TERMINAL_WRITE_ATTEMPTS => {
                    warn!(job_id = %id, write, %reason, "could not record job outcome, retrying");
                    write += 1;
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Err(err) => break err,
            }
        };

        match (outcome, err) {
            (Outcome::Completed(_), err @ StoreError::Unavailable(_)) => {
                error!(job_id = %id, error = %err, "could not record result, failing job");
                self.store
                    .fail(id, format!("could not record result: {err}"), attempts)?;
                Ok(JobState::Failed)
            }
            (_, err) => Err(err),
        }
    }

    /// Process queued jobs until none are left, then return how many were
    /// processed.
    pub async fn drain(self: &Arc<Self>) -> usize {
        let mut workers = JoinSet::new();
        for worker in 0..self.config.workers.max(1) {
            let this = Arc::clone(self);
            workers.spawn(async move { this.drain_worker(worker).await });
        }
        join_workers(workers).await
    }

    /// Keep serving jobs until `shutdown` becomes `true`. Workers finish the
    /// job in hand before exiting.
    pub async fn run(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> usize {
        info!(workers = self.config.workers.max(1), "dispatcher started");
        let mut workers = JoinSet::new();
        for worker in 0..self.config.workers.max(1) {
            let this = Arc::clone(self);
            let shutdown = shutdown.clone();
            workers.spawn(async move { this.follow_worker(worker, shutdown).await });
        }
        let processed = join_workers(workers).await;
        info!(processed, "dispatcher stopped");
        processed
    }

    async fn drain_worker(&self, worker: usize) -> usize {
        let mut processed = 0;
        loop {
            match self.store.claim() {
                Ok(Some(job)) => {
                    self.handle(worker, job).await;
                    processed += 1;
                }
                Ok(None) => break,
                Err(err) => {
                    error!(worker, error = %err, "claim failed, worker stopping");
                    break;
                }
            }
        }
        processed
    }

    async fn follow_worker(&self, worker: usize, mut shutdown: watch::Receiver<bool>) -> usize {
        let mut processed = 0;
        while !*shutdown.borrow() {
            match self.store.claim() {
                Ok(Some(job)) => {
                    self.handle(worker, job).await;
                    processed += 1;
                    continue;
                }
                Ok(None) => {}
                Err(err) => error!(worker, error = %err, "claim failed"),
            }

            tokio::select! {
                _ = self.store.wait_for_submission(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        processed
    }

    async fn handle(&self, worker: usize, job: EvaluationJob) {
        let id = job.id.clone();
        debug!(worker, job_id = %id, "processing job");
        if let Err(err) = self.process(job).await {
            error!(worker, job_id = %id, error = %err, "could not record job outcome");
        }
    }
}

enum Outcome {
    Completed(ConsensusResult),
    Failed(String),
}

impl Outcome {
    fn state(&self) -> JobState {
        match self {
            Outcome::Completed(_) => JobState::Completed,
            Outcome::Failed(_) => JobState::Failed,
        }
    }

    fn log(&self, id: &str) {
        match self {
            Outcome::Completed(result) => info!(
                job_id = %id,
                score = result.response.score,
                agreement = ?result.agreement,
                votes = result.votes,
                "job completed"
            ),
            Outcome::Failed(_) => info!(job_id = %id, "job failed"),
        }
    }
}

async fn join_workers(mut workers: JoinSet<usize>) -> usize {
    let mut processed = 0;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(count) => processed += count,
            Err(err) => error!(error = %err, "worker task ended abnormally"),
        }
    }
    processed
}
