//! Core domain types for the transfer engine.

use crate::Amount;

/// Account identifier.
pub type AccountId = u64;

/// Read snapshot of an account, as returned by the gateway.
///
/// The orchestrator only ever inspects snapshots; all balance mutation goes
/// through [`AccountGateway`](crate::gateway::AccountGateway) calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub balance: Amount,
}

/// A request to move `amount` from `source` to `destination`.
///
/// Immutable once constructed; consumed by a single transfer attempt.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Amount,
}

impl TransferRequest {
    pub fn new(source: AccountId, destination: AccountId, amount: Amount) -> Self {
        Self {
            source,
            destination,
            amount,
        }
    }
}
