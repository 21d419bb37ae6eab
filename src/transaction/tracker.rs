//! Polling a submitted transaction to a terminal state
//!
//! The deadline runs from the handle's submission time. Transient poll
//! failures are retried at the normal interval until `max_poll_retries`
//! consecutive failures have been seen.

use crate::access::{FlowAccess, TransactionStatus};
use crate::transaction::cadence;
use crate::transaction::clock::Clock;
use crate::transaction::state::{TransactionHandle, TransactionState};
use crate::types::{Identifier, TransactionId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often to poll, for how long, and how many failures to tolerate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    #[serde(with = "duration_ms")]
    pub interval: Duration,
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    pub max_poll_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(120),
            max_poll_retries: 5,
        }
    }
}

/// Durations as integer milliseconds in config files
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// An event from a sealed transaction with its payload as plain JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub event_index: u32,
    pub data: Value,
}

/// Outcome of a sealed transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionResult {
    pub transaction_id: TransactionId,
    pub block_id: Option<Identifier>,
    pub status_code: u32,
    pub computation_used: u64,
    pub events: Vec<Event>,
}

impl TransactionResult {
    fn from_status(id: TransactionId, status: TransactionStatus) -> Self {
        let events = status
            .events
            .into_iter()
            .map(|raw| Event {
                data: cadence::decode(&raw.payload).unwrap_or_else(|e| {
                    tracing::debug!(error = %e, event = %raw.event_type, "Keeping raw event payload");
                    raw.payload.clone()
                }),
                event_type: raw.event_type,
                event_index: raw.event_index,
            })
            .collect();
        Self {
            transaction_id: id,
            block_id: status.block_id,
            status_code: status.status_code,
            computation_used: status.computation_used,
            events,
        }
    }
}

pub struct SealTracker {
    access: Arc<dyn FlowAccess>,
    clock: Arc<dyn Clock>,
    policy: PollPolicy,
}

impl SealTracker {
    pub fn new(access: Arc<dyn FlowAccess>, clock: Arc<dyn Clock>, policy: PollPolicy) -> Self {
        Self {
            access,
            clock,
            policy,
        }
    }

    /// Track with the policy's timeout
    pub async fn track(
        &self,
        handle: &mut TransactionHandle,
        cancel: &CancellationToken,
    ) -> Result<TransactionResult> {
        self.track_with_timeout(handle, self.policy.timeout, cancel)
            .await
    }

    /// Poll until the handle is terminal, the deadline passes, polling keeps
    /// failing, or `cancel` fires.
    ///
    /// - `SEALED` returns the result
    /// - `ERRORED` returns `Execution` with the network's message
    /// - `EXPIRED` or the deadline returns an indeterminate `Timeout`, and
    ///   the handle ends `EXPIRED`
    pub async fn track_with_timeout(
        &self,
        handle: &mut TransactionHandle,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<TransactionResult> {
        let id = *handle.id();
        let deadline = handle.submitted_at() + timeout;
        let mut consecutive_failures = 0u32;

        tracing::debug!(tx_id = %id, ?timeout, interval = ?self.policy.interval, "Tracking transaction");

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(handle));
            }

            let now = self.clock.now();
            if now >= deadline {
                let last_seen = handle.state();
                handle.mark_deadline_passed();
                tracing::warn!(tx_id = %id, last_state = %last_seen, "Transaction not final before deadline");
                return Err(Error::Timeout {
                    tx_id: id.to_hex(),
                    waited: now.saturating_duration_since(handle.submitted_at()),
                    last_state: last_seen.to_string(),
                    indeterminate: true,
                });
            }

            match self.access.get_transaction_result(&id).await {
                Ok(status) => {
                    consecutive_failures = 0;
                    let observed = TransactionState::from_status(&status);
                    if handle.advance(observed) {
                        tracing::info!(tx_id = %id, state = %observed, "Transaction state changed");
                    }
                    match handle.state() {
                        TransactionState::Sealed => {
                            return Ok(TransactionResult::from_status(id, status));
                        }
                        TransactionState::Errored => {
                            return Err(Error::Execution {
                                tx_id: id.to_hex(),
                                status_code: status.status_code,
                                message: status.error_message,
                            });
                        }
                        TransactionState::Expired => {
                            handle.mark_indeterminate();
                            tracing::warn!(tx_id = %id, "Network reported transaction expired");
                            return Err(Error::Timeout {
                                tx_id: id.to_hex(),
                                waited: self
                                    .clock
                                    .now()
                                    .saturating_duration_since(handle.submitted_at()),
                                last_state: TransactionState::Expired.to_string(),
                                indeterminate: true,
                            });
                        }
                        TransactionState::Pending | TransactionState::Executed => {}
                    }
                }
                Err(e) if e.is_retryable() => {
                    consecutive_failures += 1;
                    tracing::warn!(
                        tx_id = %id,
                        attempt = consecutive_failures,
                        error = %e,
                        "Transaction status poll failed"
                    );
                    if consecutive_failures > self.policy.max_poll_retries {
                        handle.mark_indeterminate();
                        return Err(Error::Poll {
                            tx_id: id.to_hex(),
                            attempts: consecutive_failures,
                            message: e.to_string(),
                        });
                    }
                }
                Err(e) => {
                    handle.mark_indeterminate();
                    return Err(e);
                }
            }

            let remaining = deadline.saturating_duration_since(self.clock.now());
            let pause = self.policy.interval.min(remaining);
            tokio::select! {
                _ = cancel.cancelled() => return Err(self.cancelled(handle)),
                _ = self.clock.sleep(pause) => {}
            }
        }
    }

    fn cancelled(&self, handle: &mut TransactionHandle) -> Error {
        handle.mark_indeterminate();
        tracing::info!(tx_id = %handle.id(), state = %handle.state(), "Tracking cancelled");
        Error::Cancelled(handle.id().to_hex())
    }
}
