//! Funds transfer orchestrator.
//!
//! The orchestrator drives a single internal transfer end to end: validate
//! the request, look up both accounts through the gateway, take an atomic
//! lock over the account pair, withdraw from the source and deposit to the
//! destination, and credit the amount back to the source when the deposit
//! fails after a successful withdraw. Locks are released on every path.
//! Also supports draining an async stream of transfer requests.

use tokio_stream::{Stream, StreamExt};
use tracing::{error, info, warn};

use crate::gateway::AccountGateway;
use crate::lock::{LockGuard, LockManager};
use crate::model::TransferRequest;

mod error;
pub use error::{ReasonCode, TransferError};

/// The transfer orchestrator.
///
/// Stateless across calls; both collaborators are injected at construction
/// and account balances are the only shared mutable state, reached through
/// the gateway while the account-pair locks are held.
pub struct Orchestrator<G, L> {
    gateway: G,
    locks: L,
}

/// Public API
impl<G: AccountGateway, L: LockManager> Orchestrator<G, L> {
    pub fn new(gateway: G, locks: L) -> Self {
        Self { gateway, locks }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn locks(&self) -> &L {
        &self.locks
    }

    /// Run the orchestrator over the given stream of transfer requests.
    ///
    /// Per-transfer failures are logged and never stop the run.
    pub async fn run(&self, mut stream: impl Stream<Item = TransferRequest> + Unpin) {
        while let Some(request) = stream.next().await {
            let _ = self.transfer(request);
        }
    }

    /// Execute a single transfer to completion.
    ///
    /// Either the full debit/credit pair applies or the caller gets exactly
    /// one terminal error whose [`ReasonCode`] distinguishes "nothing
    /// happened" from "retry after fixing" from "fatal, needs manual
    /// intervention".
    pub fn transfer(&self, request: TransferRequest) -> Result<(), TransferError> {
        let result = self.transfer_inner(&request);
        Self::log_result(&request, &result);
        result
    }
}

/// Private API
impl<G: AccountGateway, L: LockManager> Orchestrator<G, L> {
    fn transfer_inner(&self, request: &TransferRequest) -> Result<(), TransferError> {
        // Validation: side-effect-free, nothing fetched, nothing locked.
        if !request.amount.is_positive() {
            return Err(TransferError::InvalidAmount(request.amount));
        }
        if request.source == request.destination {
            return Err(TransferError::SameAccount(request.source));
        }

        // Lookup both accounts. Failures here carry the gateway reason and
        // are safe to retry.
        let source = self
            .gateway
            .get_account(request.source)
            .map_err(TransferError::Lookup)?;
        self.gateway
            .get_account(request.destination)
            .map_err(TransferError::Lookup)?;

        if source.balance < request.amount {
            return Err(TransferError::InsufficientFunds {
                account: source.id,
                available: source.balance,
                requested: request.amount,
            });
        }

        // Both-or-neither lock over the pair; the manager canonicalizes the
        // id order so concurrent opposite-order pairs cannot deadlock.
        let guard = LockGuard::acquire(&self.locks, &[request.source, request.destination])
            .map_err(TransferError::Lock)?;

        let result = self.mutate(request);

        // Unconditional release. A fatal compensation failure outranks an
        // unlock failure; any other pending error travels inside the unlock
        // error so neither is dropped.
        match guard.release() {
            Ok(()) => result,
            Err(unlock) => match result {
                Err(fatal @ TransferError::CompensationFailed { .. }) => {
                    error!(
                        source = request.source,
                        destination = request.destination,
                        error = %unlock,
                        "failed to release account locks after failed compensation"
                    );
                    Err(fatal)
                }
                other => Err(TransferError::UnlockFailed {
                    source: unlock,
                    pending: other.err().map(Box::new),
                }),
            },
        }
    }

    /// Two-phase mutation, called with both account locks held.
    fn mutate(&self, request: &TransferRequest) -> Result<(), TransferError> {
        // Phase one: debit the source. On failure no funds have moved.
        self.gateway
            .withdraw(request.source, request.amount)
            .map_err(TransferError::Mutation)?;

        // Phase two: credit the destination.
        let Err(cause) = self.gateway.deposit(request.destination, request.amount) else {
            return Ok(());
        };

        // The source is debited but the destination was not credited; put
        // the amount back. Even a successful compensation is still a failed
        // transfer from the caller's point of view.
        warn!(
            source = request.source,
            destination = request.destination,
            amount = %request.amount,
            error = %cause,
            "deposit failed after debit, crediting amount back to source"
        );
        match self.gateway.deposit(request.source, request.amount) {
            Ok(()) => Err(TransferError::Mutation(cause)),
            Err(compensation) => Err(TransferError::CompensationFailed {
                cause,
                compensation,
            }),
        }
    }

    fn log_result(request: &TransferRequest, result: &Result<(), TransferError>) {
        match result {
            Ok(()) => info!(
                source = request.source,
                destination = request.destination,
                amount = %request.amount,
                "transfer applied"
            ),
            Err(e) if e.reason_code().is_retryable() => info!(
                source = request.source,
                destination = request.destination,
                amount = %request.amount,
                reason = ?e.reason_code(),
                error = %e,
                "transfer rejected"
            ),
            Err(e) => error!(
                source = request.source,
                destination = request.destination,
                amount = %request.amount,
                reason = ?e.reason_code(),
                error = %e,
                "transfer failed, manual remediation required"
            ),
        }
    }
}
