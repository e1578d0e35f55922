//! Atomic multi-account locking.
//!
//! The lock manager hands out all-or-nothing locks over sets of account
//! identifiers. A caller either holds every id it asked for or none of them,
//! so two transfers naming the same pair of accounts in opposite order can
//! never deadlock, and callers never sort ids themselves.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::error;

use crate::model::AccountId;

#[derive(Debug, Clone, Error)]
pub enum LockError {
    #[error("timed out after {0:?} waiting to lock accounts")]
    AcquireTimeout(Duration),

    #[error("account {0} is not locked by this manager")]
    NotHeld(AccountId),
}

/// Contract for atomic acquisition and release of account-id lock sets.
pub trait LockManager: Send + Sync {
    /// Lock every id in `ids`, blocking until all are free. Never holds a
    /// partial set.
    fn lock_all(&self, ids: &[AccountId]) -> Result<(), LockError>;

    /// Release previously acquired ids.
    fn unlock_all(&self, ids: &[AccountId]) -> Result<(), LockError>;
}

/// In-process [`LockManager`] over a shared held-id set.
///
/// `lock_all` waits on a condition variable until none of the requested ids
/// is held, then claims them all inside one critical section. Partial holds
/// are unrepresentable, which is what makes the acquire deadlock-free
/// regardless of the order callers name their accounts in.
#[derive(Debug, Default)]
pub struct AccountLockManager {
    held: Mutex<HashSet<AccountId>>,
    freed: Condvar,
    acquire_timeout: Option<Duration>,
}

impl AccountLockManager {
    /// Lock manager that blocks indefinitely on contended acquires.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock manager whose acquires give up after `timeout`, surfacing
    /// [`LockError::AcquireTimeout`].
    pub fn with_acquire_timeout(timeout: Duration) -> Self {
        Self {
            acquire_timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// Number of account ids currently locked.
    pub fn held_count(&self) -> usize {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // Canonical form of a requested id set: sorted, duplicates collapsed.
    // A degenerate pair like [a, a] locks a single id.
    fn canonical(ids: &[AccountId]) -> Vec<AccountId> {
        let mut wanted = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        wanted
    }
}

impl LockManager for AccountLockManager {
    fn lock_all(&self, ids: &[AccountId]) -> Result<(), LockError> {
        let wanted = Self::canonical(ids);
        let deadline = self.acquire_timeout.map(|t| (t, Instant::now() + t));

        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while wanted.iter().any(|id| held.contains(id)) {
            held = match deadline {
                None => self
                    .freed
                    .wait(held)
                    .unwrap_or_else(PoisonError::into_inner),
                Some((timeout, deadline)) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(LockError::AcquireTimeout(timeout));
                    }
                    let (guard, _) = self
                        .freed
                        .wait_timeout(held, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    guard
                }
            };
        }

        held.extend(wanted);
        Ok(())
    }

    fn unlock_all(&self, ids: &[AccountId]) -> Result<(), LockError> {
        let wanted = Self::canonical(ids);

        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        // Verify the whole set before removing anything, so a bad release
        // request leaves the held set untouched.
        for id in &wanted {
            if !held.contains(id) {
                return Err(LockError::NotHeld(*id));
            }
        }
        for id in &wanted {
            held.remove(id);
        }

        self.freed.notify_all();
        Ok(())
    }
}

/// Scoped hold over a set of account locks.
///
/// Call [`release`](LockGuard::release) to unlock and observe the result;
/// dropping an unreleased guard unlocks best-effort and logs any failure.
/// The explicit path is the real one, drop is the panic backstop.
#[must_use]
pub struct LockGuard<'a, L: LockManager + ?Sized> {
    manager: &'a L,
    ids: Vec<AccountId>,
    released: bool,
}

impl<'a, L: LockManager + ?Sized> LockGuard<'a, L> {
    /// Atomically lock `ids` on `manager`, returning the guard that holds them.
    pub fn acquire(manager: &'a L, ids: &[AccountId]) -> Result<Self, LockError> {
        manager.lock_all(ids)?;
        Ok(Self {
            manager,
            ids: ids.to_vec(),
            released: false,
        })
    }

    /// Release the held locks, reporting any failure to the caller.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        self.manager.unlock_all(&self.ids)
    }
}

impl<L: LockManager + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.manager.unlock_all(&self.ids) {
            error!(ids = ?self.ids, error = %e, "failed to release account locks on drop");
        }
    }
}
