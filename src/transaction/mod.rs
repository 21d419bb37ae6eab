//! Transaction core
//!
//! Data flow:
//! 1. `MessageCodec` canonicalizes the payload and envelope
//! 2. Each bound `Authorization` signs through its `RoleSigner`
//! 3. `TransactionSubmitter` broadcasts and returns a `PENDING` handle
//! 4. `SealTracker` polls the handle to a terminal state

mod authz;
pub mod cadence;
mod clock;
mod codec;
mod envelope;
mod state;
mod submitter;
mod tracker;


pub use authz::{
    AccountRoleBinding, Authorization, AuthorizationBinder, CompositeSignature, KeySigner, Role,
    RoleSigner,
};
pub use cadence::CadenceValue;
pub use clock::{Clock, ManualClock, TokioClock};
pub use codec::{DomainTag, MessageCodec, SignaturePayload};
pub use envelope::{
    ProposalKey, SignedEnvelope, SignedEnvelopeBuilder, SignedTransaction, TransactionPayload,
    TransactionSignature, DEFAULT_GAS_LIMIT, MAX_GAS_LIMIT,
};
pub use state::{ExpiryCause, TransactionHandle, TransactionState};
pub use submitter::TransactionSubmitter;
pub use tracker::{Event, PollPolicy, SealTracker, TransactionResult};
