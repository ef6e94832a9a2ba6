//! Per-record verification with retry/backoff
//!
//! ## State machine
//!
//! ```text
//! Attempting(n) --200 + valid body--> Success
//!               --200 + bad body----> Failed(Payload)
//!               --other status------> Failed(Http)
//!               --429---------------> Backoff((2 + n) units) --> Attempting(n + 1)
//!               --transport error---> Backoff(1 unit)        --> Attempting(n + 1)
//!               --retryable at n = max_retries - 1--> Exhausted(tag of last failure)
//! ```
//!
//! Backoff sleeps suspend only the record's own task.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Sleeper;
use crate::comparator::compare;
use crate::credential::Credential;
use crate::error::{LookupError, TransportError};
use crate::record::Record;
use crate::registry::{RegistryLookup, RegistryPayload, RegistryReply};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Attempt budget and backoff scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of lookup attempts per record
    pub max_retries: u32,
    /// One backoff time unit
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

/// Why an attempt is being retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryCause {
    RateLimited,
    Transport(String),
}

/// Retry state for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    /// About to issue attempt `n` (zero-based)
    Attempting(u32),
    /// Waiting before attempt `next`
    Backoff {
        next: u32,
        wait: Duration,
        cause: RetryCause,
    },
    /// Retry budget spent
    Exhausted(LookupError),
}

impl RetryPolicy {
    /// Wait before retrying after failed attempt `attempt`.
    pub fn backoff(&self, attempt: u32, cause: &RetryCause) -> Duration {
        match cause {
            RetryCause::Transport(_) => self.backoff_unit,
            RetryCause::RateLimited => self
                .backoff_unit
                .checked_mul(attempt.saturating_add(2))
                .unwrap_or(Duration::MAX),
        }
    }

    /// State following a retryable failure on attempt `attempt`.
    pub fn after_failure(&self, attempt: u32, cause: RetryCause) -> RetryState {
        let attempts = attempt + 1;
        if attempts >= self.max_retries {
            let error = match cause {
                RetryCause::RateLimited => LookupError::RateLimited { attempts },
                RetryCause::Transport(message) => LookupError::Transport { attempts, message },
            };
            return RetryState::Exhausted(error);
        }

        RetryState::Backoff {
            next: attempts,
            wait: self.backoff(attempt, &cause),
            cause,
        }
    }
}

/// Classification of a single attempt
enum AttemptOutcome {
    Success(RegistryPayload),
    Rejected(LookupError),
    Retry(RetryCause),
}

fn classify(result: Result<RegistryReply, TransportError>) -> AttemptOutcome {
    match result {
        Err(e) => AttemptOutcome::Retry(RetryCause::Transport(e.to_string())),
        Ok(reply) if reply.is_rate_limited() => AttemptOutcome::Retry(RetryCause::RateLimited),
        Ok(reply) if reply.is_success() => match RegistryPayload::parse(&reply.body) {
            Ok(payload) => AttemptOutcome::Success(payload),
            Err(e) => AttemptOutcome::Rejected(LookupError::Payload {
                message: e.to_string(),
            }),
        },
        Ok(reply) => AttemptOutcome::Rejected(LookupError::Http {
            status: reply.status,
        }),
    }
}

/// Verifies one record at a time; holds no per-record state.
///
/// Cloning is cheap: the registry and sleeper are shared, the credential is
/// read-only for the lifetime of the batch.
#[derive(Clone)]
pub struct VerificationClient {
    registry: Arc<dyn RegistryLookup>,
    credential: Credential,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl VerificationClient {
    pub fn new(
        registry: Arc<dyn RegistryLookup>,
        credential: Credential,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            registry,
            credential,
            policy,
            sleeper,
        }
    }

    /// Drive a pending record to its terminal state.
    pub async fn verify(&self, record: Record) -> Record {
        match self.lookup_with_retry(&record.key).await {
            Ok(payload) => {
                if let Some(message) = payload.message.as_deref() {
                    debug!(id = record.id, message, "Registry message");
                }
                let authoritative = payload.names();
                let matches = compare(&record.input, &authoritative);
                debug!(id = record.id, all_match = matches.all(), "Record resolved");
                record.resolve(authoritative, matches)
            }
            Err(error) => {
                warn!(
                    id = record.id,
                    key = %record.key,
                    exhausted = error.is_exhausted(),
                    error = %error,
                    "Record failed"
                );
                record.fail(error)
            }
        }
    }

    /// Run the retry state machine for one key.
    pub async fn lookup_with_retry(&self, key: &str) -> Result<RegistryPayload, LookupError> {
        let mut state = RetryState::Attempting(0);

        loop {
            state = match state {
                RetryState::Attempting(attempt) => {
                    debug!(key, attempt, "Registry lookup attempt");
                    let result = self.registry.lookup(key, &self.credential).await;
                    match classify(result) {
                        AttemptOutcome::Success(payload) => return Ok(payload),
                        AttemptOutcome::Rejected(error) => return Err(error),
                        AttemptOutcome::Retry(cause) => self.policy.after_failure(attempt, cause),
                    }
                }
                RetryState::Backoff { next, wait, cause } => {
                    debug!(key, next, wait_ms = wait.as_millis() as u64, ?cause, "Backing off");
                    self.sleeper.sleep(wait).await;
                    RetryState::Attempting(next)
                }
                RetryState::Exhausted(error) => return Err(error),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            backoff_unit: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_rate_limit_backoff_escalates() {
        let p = policy();
        assert_eq!(p.backoff(0, &RetryCause::RateLimited), Duration::from_millis(200));
        assert_eq!(p.backoff(1, &RetryCause::RateLimited), Duration::from_millis(300));
        assert_eq!(p.backoff(4, &RetryCause::RateLimited), Duration::from_millis(600));
    }

    #[test]
    fn test_huge_backoff_unit_saturates() {
        let p = RetryPolicy {
            max_retries: 3,
            backoff_unit: Duration::from_secs(u64::MAX / 2),
        };
        assert_eq!(p.backoff(1, &RetryCause::RateLimited), Duration::MAX);
        assert_eq!(
            p.backoff(1, &RetryCause::Transport("refused".into())),
            Duration::from_secs(u64::MAX / 2)
        );
    }

    #[test]
    fn test_transport_backoff_is_fixed() {
        let p = policy();
        let cause = RetryCause::Transport("refused".into());
        assert_eq!(p.backoff(0, &cause), Duration::from_millis(100));
        assert_eq!(p.backoff(2, &cause), Duration::from_millis(100));
    }

    #[test]
    fn test_after_failure_moves_to_backoff() {
        assert_eq!(
            policy().after_failure(0, RetryCause::RateLimited),
            RetryState::Backoff {
                next: 1,
                wait: Duration::from_millis(200),
                cause: RetryCause::RateLimited,
            }
        );
    }

    #[test]
    fn test_last_attempt_exhausts_without_wait() {
        assert_eq!(
            policy().after_failure(2, RetryCause::RateLimited),
            RetryState::Exhausted(LookupError::RateLimited { attempts: 3 })
        );
        assert_eq!(
            policy().after_failure(2, RetryCause::Transport("timeout".into())),
            RetryState::Exhausted(LookupError::Transport {
                attempts: 3,
                message: "timeout".into()
            })
        );
    }

    #[test]
    fn test_single_attempt_policy_never_backs_off() {
        let p = RetryPolicy {
            max_retries: 1,
            ..policy()
        };
        assert!(matches!(
            p.after_failure(0, RetryCause::RateLimited),
            RetryState::Exhausted(_)
        ));
    }

    #[test]
    fn test_classify_statuses() {
        assert!(matches!(
            classify(Ok(RegistryReply::new(404, "{}"))),
            AttemptOutcome::Rejected(LookupError::Http { status: 404 })
        ));
        assert!(matches!(
            classify(Ok(RegistryReply::new(200, "<html>"))),
            AttemptOutcome::Rejected(LookupError::Payload { .. })
        ));
        assert!(matches!(
            classify(Ok(RegistryReply::new(429, ""))),
            AttemptOutcome::Retry(RetryCause::RateLimited)
        ));
        assert!(matches!(
            classify(Err(TransportError::Timeout)),
            AttemptOutcome::Retry(RetryCause::Transport(_))
        ));
        assert!(matches!(
            classify(Ok(RegistryReply::new(200, r#"{"first_name":"A"}"#))),
            AttemptOutcome::Success(_)
        ));
    }
}
