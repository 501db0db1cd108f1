//! Polling of asynchronous account creation
//!
//! Account creation is a backend job with no push notification, so the only
//! option is bounded polling. The clock is injected so that tests can run a
//! full ten-minute wait instantly.

use crate::directory::AccountDirectory;
use crate::directory::types::CreationState;
use crate::error::{DirectoryError, LifecycleError, Result};
use async_trait::async_trait;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of time and sleeping for the waiter
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    pub max_attempts: u32,
    #[serde(rename = "interval_seconds", with = "duration_secs")]
    pub interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(10),
        }
    }
}

impl WaitPolicy {
    /// Upper bound on the time spent waiting
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// How a wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The account exists
    Succeeded { account_id: String, attempts: u32 },
    /// The directory gave up on the request; never retried
    Failed {
        reason: Option<String>,
        attempts: u32,
    },
    /// Every attempt was used and the last answer was still pending
    TimedOut { attempts: u32 },
    /// Every attempt was used and the last status query failed
    ExhaustedWithErrors {
        attempts: u32,
        errors: u32,
        last_error: DirectoryError,
    },
    /// The caller's deadline arrived before a terminal status
    DeadlineExceeded { attempts: u32 },
}

impl WaitOutcome {
    /// Number of status queries issued
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::TimedOut { attempts }
            | Self::ExhaustedWithErrors { attempts, .. }
            | Self::DeadlineExceeded { attempts } => *attempts,
        }
    }

    /// Turn the outcome into the new account id or a lifecycle error
    pub fn into_account_id(self, ticket_id: &str) -> Result<String> {
        let ticket_id = ticket_id.to_string();
        let error = match self {
            Self::Succeeded { account_id, .. } => return Ok(account_id),
            Self::Failed { reason, .. } => LifecycleError::CreationFailed { ticket_id, reason },
            Self::TimedOut { attempts } => LifecycleError::CreationTimedOut {
                ticket_id,
                attempts,
            },
            Self::ExhaustedWithErrors {
                attempts,
                errors,
                last_error,
            } => LifecycleError::CreationStatusUnavailable {
                ticket_id,
                attempts,
                errors,
                last_error,
            },
            Self::DeadlineExceeded { attempts } => LifecycleError::DeadlineExceeded {
                ticket_id,
                attempts,
            },
        };
        Err(error.into())
    }
}

/// Polls a creation request until it reaches a terminal state
#[derive(Clone)]
pub struct CreationWaiter {
    directory: AccountDirectory,
    clock: Arc<dyn Clock>,
    policy: WaitPolicy,
}

impl CreationWaiter {
    pub fn new(directory: AccountDirectory, clock: Arc<dyn Clock>, policy: WaitPolicy) -> Self {
        Self {
            directory,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Wait for `ticket_id` to succeed or fail
    ///
    /// Each attempt sleeps one interval, then queries the status. Query errors
    /// are logged and consume the attempt. When `deadline` would pass during
    /// the next sleep, the waiter sleeps until the deadline and gives up
    /// without querying again.
    pub async fn wait(&self, ticket_id: &str, deadline: Option<Instant>) -> Result<WaitOutcome> {
        let WaitPolicy {
            max_attempts,
            interval,
        } = self.policy;
        debug!("Waiting for creation {ticket_id} (max {max_attempts} x {interval:?})");

        let mut errors = 0u32;
        let mut last_error: Option<DirectoryError> = None;

        for attempt in 1..=max_attempts {
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(self.clock.now());
                if remaining < interval {
                    if !remaining.is_zero() {
                        self.clock.sleep(remaining).await;
                    }
                    warn!("Deadline reached while waiting for creation {ticket_id}");
                    return Ok(WaitOutcome::DeadlineExceeded {
                        attempts: attempt - 1,
                    });
                }
            }

            self.clock.sleep(interval).await;

            let status = match self.directory.get_creation_status(ticket_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!("Attempt {attempt}/{max_attempts}: status query for {ticket_id} failed: {e}");
                    errors += 1;
                    last_error = Some(e);
                    continue;
                }
            };
            last_error = None;

            match status.state {
                Some(CreationState::Succeeded) => {
                    let account_id = status.account_id.ok_or_else(|| {
                        DirectoryError::invalid_response(
                            "DescribeCreateAccountStatus",
                            format!("creation {ticket_id} succeeded without an account id"),
                        )
                    })?;
                    debug!("Creation {ticket_id} succeeded after {attempt} attempt(s): {account_id}");
                    return Ok(WaitOutcome::Succeeded {
                        account_id,
                        attempts: attempt,
                    });
                }
                Some(CreationState::Failed) => {
                    warn!(
                        "Creation {ticket_id} failed: {}",
                        status.failure_reason.as_deref().unwrap_or("no reason given")
                    );
                    return Ok(WaitOutcome::Failed {
                        reason: status.failure_reason,
                        attempts: attempt,
                    });
                }
                Some(CreationState::Pending) | None => {
                    trace!("Attempt {attempt}/{max_attempts}: creation {ticket_id} pending");
                }
            }
        }

        Ok(match last_error {
            Some(last_error) => WaitOutcome::ExhaustedWithErrors {
                attempts: max_attempts,
                errors,
                last_error,
            },
            None => WaitOutcome::TimedOut {
                attempts: max_attempts,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_default_policy_ceiling_is_ten_minutes() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.max_attempts, 60);
        assert_eq!(policy.ceiling(), Duration::from_secs(600));
    }

    #[test]
    fn test_policy_serializes_interval_as_seconds() {
        let json = serde_json::to_value(WaitPolicy::default()).unwrap();
        assert_eq!(json["interval_seconds"], 10);

        let policy: WaitPolicy =
            serde_json::from_str(r#"{"max_attempts": 3, "interval_seconds": 2}"#).unwrap();
        assert_eq!(policy.interval, Duration::from_secs(2));
    }

    #[test]
    fn test_outcome_into_account_id() {
        let outcome = WaitOutcome::Succeeded {
            account_id: "111122223333".to_string(),
            attempts: 4,
        };
        assert_eq!(outcome.attempts(), 4);
        assert_eq!(outcome.into_account_id("car-1").unwrap(), "111122223333");
    }

    #[test]
    fn test_outcome_errors_carry_ticket() {
        let err = WaitOutcome::TimedOut { attempts: 60 }
            .into_account_id("car-9")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Lifecycle(LifecycleError::CreationTimedOut { ref ticket_id, attempts: 60 })
                if ticket_id == "car-9"
        ));

        let err = WaitOutcome::ExhaustedWithErrors {
            attempts: 60,
            errors: 60,
            last_error: DirectoryError::transport("DescribeCreateAccountStatus", "down"),
        }
        .into_account_id("car-9")
        .unwrap_err();
        assert!(err.to_string().contains("60 failed queries"));
    }
}
