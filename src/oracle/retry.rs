use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use super::{Oracle, OracleResponse, decode};
use crate::error::OracleError;
use crate::request::EvaluationRequest;

/// Delay between two failed attempts of the same logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// delay = base * 2^(attempt - 1)
    Exponential { base: Duration },
}

impl Backoff {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base } => {
                base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            }
        }
    }
}

/// Retry behaviour for one logical oracle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub attempt_budget: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_budget: 3,
            backoff: Backoff::Fixed(Duration::from_millis(2000)),
        }
    }
}

/// A successful logical call and how many attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub response: OracleResponse,
    pub attempts: u32,
}

/// Wraps an [`Oracle`] with bounded, sequential retries.
pub struct OracleInvoker {
    oracle: Arc<dyn Oracle>,
    policy: RetryPolicy,
}

impl OracleInvoker {
    pub fn new(oracle: Arc<dyn Oracle>, policy: RetryPolicy) -> Self {
        Self { oracle, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Perform one logical oracle call under the configured retry policy.
    ///
    /// Transport and decode failures both consume one attempt. Only the
    /// calling task sleeps during backoff.
    pub async fn invoke_once(&self, request: &EvaluationRequest) -> Result<Invocation, OracleError> {
        let budget = self.policy.attempt_budget.max(1);
        let mut last = OracleError::Transport("no attempt made".into());

        for attempt in 1..=budget {
            match self.attempt(request).await {
                Ok(response) => {
                    debug!(attempt, score = response.score, "oracle attempt succeeded");
                    return Ok(Invocation {
                        response,
                        attempts: attempt,
                    });
                }
                Err(err) => {
                    warn!(attempt, budget, kind = err.kind(), error = %err, "oracle attempt failed");
                    last = err;
                    if attempt < budget {
                        sleep(self.policy.backoff.delay_for_attempt(attempt)).await;
                    }
                }
            }
        }

        Err(OracleError::RetriesExhausted {
            attempts: budget,
            last: Box::new(last),
        })
    }

    async fn attempt(&self, request: &EvaluationRequest) -> Result<OracleResponse, OracleError> {
        let raw = self.oracle.evaluate(request).await?;
        decode(&raw)
    }
}
