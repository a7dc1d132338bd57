//! SQLite-backed job store with atomic claim and terminal transitions.
//!
//! Several processes may open the same database file: the CLI submitting
//! jobs, another asking for status, a worker draining the queue. Claims and
//! terminal writes are guarded by the row's current state inside SQLite, so
//! no two handles can take the same job or finish it twice.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::consensus::ConsensusResult;
use crate::error::StoreError;
use crate::request::EvaluationRequest;
use crate::state_machine::{EvaluationJob, JobState, StateMachine, Transition};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    id           TEXT NOT NULL UNIQUE,
    payload_json TEXT NOT NULL,
    state        TEXT NOT NULL,
    attempts_json TEXT NOT NULL DEFAULT '[]',
    result_json  TEXT,
    error        TEXT,
    enqueued_at  TEXT NOT NULL,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state, seq);
"#;

const COLUMNS: &str =
    "id, payload_json, state, attempts_json, result_json, error, enqueued_at, completed_at";

/// How long a handle waits on another process's lock before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub const INTERRUPTED: &str = "interrupted before completion";

/// Number of jobs in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub queued: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StateCounts {
    pub fn pending(&self) -> usize {
        self.queued + self.active
    }
}

pub struct JobStore {
    conn: Mutex<Connection>,
    submitted: Notify,
}

impl JobStore {
    /// A private in-memory database that lives as long as the handle.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open (or create) the database at `path`.
    ///
    /// Opening never touches existing jobs. Recovering jobs a dead worker
    /// left ACTIVE is the worker's job, see [`JobStore::recover_interrupted`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        // WAL lets status reads proceed while a worker writes.
        let _ = conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()));
        let store = Self::init(conn)?;
        info!(path = %path.display(), "job store opened");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            submitted: Notify::new(),
        })
    }

    /// Change how long this handle waits for another connection's lock.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<(), StoreError> {
        self.lock()?.busy_timeout(timeout)?;
        Ok(())
    }

    /// Create a QUEUED job and return its id. Never waits for a worker.
    pub fn submit(&self, payload: EvaluationRequest) -> Result<String, StoreError> {
        let job = EvaluationJob::new(payload);
        let payload_json = serde_json::to_string(&job.payload)?;
        self.lock()?.execute(
            "INSERT INTO jobs (id, payload_json, state, enqueued_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                job.id,
                payload_json,
                JobState::Queued.as_str(),
                encode_time(job.enqueued_at)
            ],
        )?;
        debug!(job_id = %job.id, "job submitted");
        self.submitted.notify_one();
        Ok(job.id)
    }

    /// Atomically move the oldest QUEUED job to ACTIVE and hand it to the
    /// caller.
    ///
    /// The update is a single statement guarded by `state = 'queued'`, so
    /// concurrent callers, in this process or another, never receive the
    /// same job.
    pub fn claim(&self) -> Result<Option<EvaluationJob>, StoreError> {
        let sql = format!(
            "UPDATE jobs SET state = 'active'
             WHERE id = (SELECT id FROM jobs WHERE state = 'queued' ORDER BY seq LIMIT 1)
               AND state = 'queued'
             RETURNING {COLUMNS}"
        );
        let raw = self.lock()?.query_row(&sql, [], RawJob::from_row).optional()?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let job = raw.into_job()?;
        debug!(job_id = %job.id, "job claimed");
        Ok(Some(job))
    }

    /// ACTIVE → COMPLETED, recording the result and per-call attempt counts
    /// in one write. Rejected for any other state, so a duplicate completion
    /// has no effect.
    pub fn complete(
        &self,
        id: &str,
        result: ConsensusResult,
        attempts: Vec<u32>,
    ) -> Result<(), StoreError> {
        self.finish(id, Transition::Complete { result, attempts })
    }

    /// ACTIVE → FAILED, recording the error and per-call attempt counts in
    /// one write. Rejected for any other state.
    pub fn fail(
        &self,
        id: &str,
        error: impl Into<String>,
        attempts: Vec<u32>,
    ) -> Result<(), StoreError> {
        self.finish(
            id,
            Transition::Fail {
                error: error.into(),
                attempts,
            },
        )
    }

    fn finish(&self, id: &str, transition: Transition) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut job = select_job(&tx, id)?.ok_or_else(|| StoreError::JobNotFound(id.to_string()))?;
        StateMachine::apply(&mut job, transition).map_err(|_| not_active(&job))?;

        let result_json = job.result.as_ref().map(serde_json::to_string).transpose()?;
        let updated = tx.execute(
            "UPDATE jobs
             SET state = ?1, attempts_json = ?2, result_json = ?3, error = ?4, completed_at = ?5
             WHERE id = ?6 AND state = 'active'",
            params![
                job.state.as_str(),
                serde_json::to_string(&job.attempts)?,
                result_json,
                job.error,
                job.completed_at.map(encode_time),
                id,
            ],
        )?;
        if updated != 1 {
            return Err(not_active(&job));
        }
        tx.commit()?;
        Ok(())
    }

    /// Fail every job left ACTIVE by a worker that is no longer running.
    ///
    /// Only a worker calls this, once, before it starts claiming. Jobs are
    /// failed, never re-queued.
    pub fn recover_interrupted(&self) -> Result<usize, StoreError> {
        let recovered = self.lock()?.execute(
            "UPDATE jobs SET state = 'failed', error = ?1, completed_at = ?2
             WHERE state = 'active'",
            params![INTERRUPTED, encode_time(Utc::now())],
        )?;
        if recovered > 0 {
            warn!(recovered, "failed jobs left active by a previous worker");
        }
        Ok(recovered)
    }

    /// Read-only lookup. A missing job is `Ok(None)`.
    pub fn get(&self, id: &str) -> Result<Option<EvaluationJob>, StoreError> {
        let conn = self.lock()?;
        select_job(&conn, id)
    }

    /// Remove terminal jobs that finished more than `older_than` ago.
    pub fn purge(&self, older_than: Duration) -> Result<usize, StoreError> {
        let horizon = chrono::Duration::from_std(older_than)
            .map_err(|e| StoreError::Unavailable(format!("retention out of range: {e}")))?;
        let cutoff = encode_time(Utc::now() - horizon);

        let removed = self.lock()?.execute(
            "DELETE FROM jobs
             WHERE state IN ('completed', 'failed') AND completed_at <= ?1",
            params![cutoff],
        )?;
        if removed > 0 {
            info!(removed, "purged finished jobs");
        }
        Ok(removed)
    }

    pub fn counts(&self) -> Result<StateCounts, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM jobs GROUP BY state")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut counts = StateCounts::default();
        for row in rows {
            let (state, n) = row?;
            let n = n as usize;
            match JobState::parse(&state) {
                Some(JobState::Queued) => counts.queued = n,
                Some(JobState::Active) => counts.active = n,
                Some(JobState::Completed) => counts.completed = n,
                Some(JobState::Failed) => counts.failed = n,
                None => return Err(StoreError::Corrupt(format!("unknown state `{state}`"))),
            }
        }
        Ok(counts)
    }

    /// Wait until a job is submitted through this handle or `timeout`
    /// elapses. Jobs submitted by other processes are picked up when the
    /// timeout runs out.
    pub async fn wait_for_submission(&self, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, self.submitted.notified()).await;
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("job store lock poisoned".into()))
    }
}

/// A row as stored, before its JSON columns are decoded.
struct RawJob {
    id: String,
    payload: String,
    state: String,
    attempts: String,
    result: Option<String>,
    error: Option<String>,
    enqueued_at: String,
    completed_at: Option<String>,
}

impl RawJob {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            payload: row.get(1)?,
            state: row.get(2)?,
            attempts: row.get(3)?,
            result: row.get(4)?,
            error: row.get(5)?,
            enqueued_at: row.get(6)?,
            completed_at: row.get(7)?,
        })
    }

    fn into_job(self) -> Result<EvaluationJob, StoreError> {
        let state = JobState::parse(&self.state).ok_or_else(|| {
            StoreError::Corrupt(format!("job {} has unknown state `{}`", self.id, self.state))
        })?;
        Ok(EvaluationJob {
            payload: serde_json::from_str(&self.payload)?,
            state,
            attempts: serde_json::from_str(&self.attempts)?,
            result: self.result.as_deref().map(serde_json::from_str).transpose()?,
            error: self.error,
            enqueued_at: decode_time(&self.enqueued_at)?,
            completed_at: self.completed_at.as_deref().map(decode_time).transpose()?,
            id: self.id,
        })
    }
}

fn select_job(conn: &Connection, id: &str) -> Result<Option<EvaluationJob>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM jobs WHERE id = ?1");
    conn.query_row(&sql, [id], RawJob::from_row)
        .optional()?
        .map(RawJob::into_job)
        .transpose()
}

fn not_active(job: &EvaluationJob) -> StoreError {
    StoreError::NotActive {
        id: job.id.clone(),
        state: job.state.to_string(),
    }
}

// Fixed-width UTC timestamps so text comparison in SQL orders them correctly.
fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp `{value}`: {e}")))
}
