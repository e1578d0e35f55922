//! Error taxonomy for transfer processing.

use thiserror::Error;

use crate::Amount;
use crate::gateway::GatewayError;
use crate::lock::LockError;
use crate::model::AccountId;

/// Short enumerated identifier for programmatic branching by callers,
/// distinct from the human-readable `Display` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    InvalidAmount,
    SameAccount,
    InsufficientFunds,
    LookupFailed,
    LockFailed,
    MutationFailed,
    CompensationFailed,
    UnlockFailed,
}

impl ReasonCode {
    /// Whether a caller may safely retry the transfer after seeing this code.
    ///
    /// `CompensationFailed` means funds left the source and were not restored;
    /// `UnlockFailed` means the account locks may still be held. Both need
    /// operational intervention before any retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ReasonCode::CompensationFailed | ReasonCode::UnlockFailed
        )
    }
}

/// Terminal failure of a transfer attempt.
///
/// Exactly one of these reaches the caller per attempt; the contract
/// guarantees no observable partial success except for the explicitly fatal
/// [`CompensationFailed`](TransferError::CompensationFailed) outcome.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid transfer amount {0}")]
    InvalidAmount(Amount),

    #[error("source and destination are the same account {0}")]
    SameAccount(AccountId),

    #[error("insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        available: Amount,
        requested: Amount,
    },

    #[error("account lookup failed: {0}")]
    Lookup(#[source] GatewayError),

    #[error("could not lock accounts: {0}")]
    Lock(#[source] LockError),

    #[error("transfer failed: {0}")]
    Mutation(#[source] GatewayError),

    /// The source was debited, the credit failed, and depositing the amount
    /// back to the source failed too. Funds are in an inconsistent state and
    /// must be restored manually.
    #[error("transfer failed and crediting back to source failed: {compensation} (original failure: {cause})")]
    CompensationFailed {
        /// The deposit failure that triggered compensation.
        cause: GatewayError,
        #[source]
        compensation: GatewayError,
    },

    /// Releasing the account locks failed; they may still be held.
    #[error("failed to release account locks: {source}")]
    UnlockFailed {
        #[source]
        source: LockError,
        /// Transfer error that was pending when the unlock failed, if any.
        pending: Option<Box<TransferError>>,
    },
}

impl TransferError {
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            TransferError::InvalidAmount(_) => ReasonCode::InvalidAmount,
            TransferError::SameAccount(_) => ReasonCode::SameAccount,
            TransferError::InsufficientFunds { .. } => ReasonCode::InsufficientFunds,
            TransferError::Lookup(_) => ReasonCode::LookupFailed,
            TransferError::Lock(_) => ReasonCode::LockFailed,
            TransferError::Mutation(_) => ReasonCode::MutationFailed,
            TransferError::CompensationFailed { .. } => ReasonCode::CompensationFailed,
            TransferError::UnlockFailed { .. } => ReasonCode::UnlockFailed,
        }
    }
}
