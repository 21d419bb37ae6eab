//! Transaction lifecycle
//!
//! ```text
//! PENDING ──► EXECUTED ──► SEALED
//!    │            │
//!    ├──► EXPIRED └──► ERRORED
//!    └──► ERRORED
//! ```
//!
//! `SEALED`, `EXPIRED` and `ERRORED` are terminal. Observations that would
//! move a handle backwards or out of a terminal state are ignored. A passed
//! deadline moves any non-terminal handle to `EXPIRED`, including one that
//! was last seen `EXECUTED`.

use crate::access::{NetworkStatus, TransactionStatus};
use crate::types::TransactionId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    Pending,
    Executed,
    Sealed,
    Expired,
    Errored,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Sealed | TransactionState::Expired | TransactionState::Errored
        )
    }

    /// Whether moving from `self` to `next` is a forward transition
    pub fn can_transition_to(&self, next: TransactionState) -> bool {
        use TransactionState::*;
        match (self, next) {
            (Pending, Executed | Sealed | Expired | Errored) => true,
            (Executed, Sealed | Errored) => true,
            _ => false,
        }
    }

    /// State implied by a network status report
    pub fn from_status(status: &TransactionStatus) -> Self {
        let failed = status.status_code != 0 || !status.error_message.is_empty();
        match status.status {
            NetworkStatus::Unknown | NetworkStatus::Pending | NetworkStatus::Finalized => {
                TransactionState::Pending
            }
            NetworkStatus::Executed | NetworkStatus::Sealed if failed => TransactionState::Errored,
            NetworkStatus::Executed => TransactionState::Executed,
            NetworkStatus::Sealed => TransactionState::Sealed,
            NetworkStatus::Expired => TransactionState::Expired,
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionState::Pending => "PENDING",
            TransactionState::Executed => "EXECUTED",
            TransactionState::Sealed => "SEALED",
            TransactionState::Expired => "EXPIRED",
            TransactionState::Errored => "ERRORED",
        })
    }
}

/// Why tracking ended without a sealed or errored outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryCause {
    /// The network reported the transaction expired
    Network,
    /// Our own deadline passed; the transaction may still seal
    Deadline,
}

/// A submitted transaction and what has been observed about it
#[derive(Debug, Clone)]
pub struct TransactionHandle {
    id: TransactionId,
    state: TransactionState,
    submitted_at: Instant,
    submitted_at_utc: DateTime<Utc>,
    history: Vec<TransactionState>,
    expiry: Option<ExpiryCause>,
    indeterminate: bool,
}

impl TransactionHandle {
    pub fn new(id: TransactionId, submitted_at: Instant) -> Self {
        Self {
            id,
            state: TransactionState::Pending,
            submitted_at,
            submitted_at_utc: Utc::now(),
            history: vec![TransactionState::Pending],
            expiry: None,
            indeterminate: false,
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    pub fn submitted_at_utc(&self) -> DateTime<Utc> {
        self.submitted_at_utc
    }

    /// Every distinct state the handle has been in, oldest first
    pub fn history(&self) -> &[TransactionState] {
        &self.history
    }

    pub fn expiry(&self) -> Option<ExpiryCause> {
        self.expiry
    }

    /// True when tracking stopped without knowing the on-chain outcome
    pub fn is_indeterminate(&self) -> bool {
        self.indeterminate
    }

    /// Apply an observed state. Returns whether the handle changed.
    pub(crate) fn advance(&mut self, observed: TransactionState) -> bool {
        if !self.state.can_transition_to(observed) {
            if observed != self.state {
                tracing::debug!(
                    tx_id = %self.id,
                    current = %self.state,
                    observed = %observed,
                    "Ignoring non-forward state observation"
                );
            }
            return false;
        }
        self.state = observed;
        self.history.push(observed);
        if observed == TransactionState::Expired {
            self.expiry = Some(ExpiryCause::Network);
        }
        true
    }

    /// Stop tracking at the deadline. The handle becomes `EXPIRED` unless it
    /// already reached a terminal state.
    pub(crate) fn mark_deadline_passed(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = TransactionState::Expired;
        self.history.push(TransactionState::Expired);
        self.expiry = Some(ExpiryCause::Deadline);
        self.indeterminate = true;
    }

    pub(crate) fn mark_indeterminate(&mut self) {
        self.indeterminate = true;
    }
}
