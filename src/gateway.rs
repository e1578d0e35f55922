//! Account service contract consumed by the orchestrator.
//!
//! The gateway exposes three single-account primitives: read a snapshot,
//! withdraw, deposit. Each mutating call is atomic with respect to its own
//! account; cross-account atomicity is the orchestrator's job.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::Amount;
use crate::model::{Account, AccountId};

/// Error returned by the account service, carrying the failure reason.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        available: Amount,
        requested: Amount,
    },

    #[error("account service unavailable: {0}")]
    Unavailable(String),
}

/// The account service seam.
///
/// Implementations must keep each call atomic and consistent for the single
/// account it touches. The orchestrator holds both account locks while
/// calling the mutating operations.
pub trait AccountGateway: Send + Sync {
    fn get_account(&self, id: AccountId) -> Result<Account, GatewayError>;

    /// Debit `amount` from the account's balance.
    fn withdraw(&self, id: AccountId, amount: Amount) -> Result<(), GatewayError>;

    /// Credit `amount` to the account's balance.
    fn deposit(&self, id: AccountId, amount: Amount) -> Result<(), GatewayError>;
}

/// In-process gateway backed by a mutex-guarded account map.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    accounts: Mutex<HashMap<AccountId, Amount>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section is a single map write, so a panic in another
    // holder cannot leave the map inconsistent; recover from poisoning.
    fn map(&self) -> MutexGuard<'_, HashMap<AccountId, Amount>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an account with the given opening balance.
    ///
    /// Opening an existing account resets its balance.
    pub fn open_account(&self, id: AccountId, balance: Amount) {
        self.map().insert(id, balance);
    }

    /// Current balance, if the account exists. Test and reporting helper.
    pub fn balance(&self, id: AccountId) -> Option<Amount> {
        self.map().get(&id).copied()
    }

    /// Snapshot of all accounts, for the final balance report.
    pub fn accounts(&self) -> Vec<Account> {
        self.map()
            .iter()
            .map(|(&id, &balance)| Account { id, balance })
            .collect()
    }
}

impl AccountGateway for InMemoryGateway {
    fn get_account(&self, id: AccountId) -> Result<Account, GatewayError> {
        let accounts = self.map();
        let balance = *accounts.get(&id).ok_or(GatewayError::AccountNotFound(id))?;
        Ok(Account { id, balance })
    }

    fn withdraw(&self, id: AccountId, amount: Amount) -> Result<(), GatewayError> {
        let mut accounts = self.map();
        let balance = accounts
            .get_mut(&id)
            .ok_or(GatewayError::AccountNotFound(id))?;

        if *balance < amount {
            return Err(GatewayError::InsufficientFunds {
                account: id,
                available: *balance,
                requested: amount,
            });
        }

        *balance -= amount;
        Ok(())
    }

    fn deposit(&self, id: AccountId, amount: Amount) -> Result<(), GatewayError> {
        let mut accounts = self.map();
        let balance = accounts
            .get_mut(&id)
            .ok_or(GatewayError::AccountNotFound(id))?;

        *balance += amount;
        Ok(())
    }
}
