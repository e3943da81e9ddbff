//! Delegation registry.
//!
//! Each account points at one current delegate. Power is pushed to the
//! delegate's checkpoint history when the edge changes, so queries never walk
//! the delegation graph and cycles cannot arise. An account that never
//! delegated has no delegate and its balance carries no voting power; it must
//! delegate (possibly to itself) to activate it.

use std::collections::HashMap;
use snapvote_types::{Address, U256};
use crate::checkpoint::CheckpointStore;
use crate::error::LedgerError;

/// Record of a delegation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelegateChanged {
    /// Account whose delegate changed
    pub delegator: Address,
    /// Previous delegate (if any)
    pub from: Option<Address>,
    /// New delegate (if any)
    pub to: Option<Address>,
}

/// Current delegate per account.
#[derive(Debug, Clone, Default)]
pub struct DelegationRegistry {
    /// delegator -> delegate
    delegates: HashMap<Address, Address>,
}

impl DelegationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_map(delegates: HashMap<Address, Address>) -> Self {
        Self { delegates }
    }

    /// Current delegate of `account`, or `None` if it never delegated.
    pub fn effective_delegate(&self, account: &Address) -> Option<Address> {
        self.delegates.get(account).copied()
    }

    /// Point `account` at `new_delegate` and move its `balance` worth of power
    /// from the old delegate to the new one at `point`.
    ///
    /// Delegating to the zero address clears the delegation. Re-delegating to
    /// the current delegate is legal and leaves power untouched.
    ///
    /// # Errors
    /// - `InvariantViolation` if `point` is non-monotonic for either delegate
    ///   or the old delegate holds less than `balance`
    /// - `Overflow` if the new delegate's power would exceed `U256::MAX`
    pub fn delegate_to(
        &mut self,
        store: &mut CheckpointStore,
        account: Address,
        new_delegate: Address,
        balance: U256,
        point: u64,
    ) -> Result<DelegateChanged, LedgerError> {
        let from = self.effective_delegate(&account);
        let to = new_delegate.non_zero();

        store.move_power(from, to, balance, point)?;

        match to {
            Some(delegate) => {
                self.delegates.insert(account, delegate);
            }
            None => {
                self.delegates.remove(&account);
            }
        }

        tracing::info!(
            delegator = %account,
            ?from,
            ?to,
            %balance,
            point,
            "Delegate changed"
        );

        Ok(DelegateChanged {
            delegator: account,
            from,
            to,
        })
    }

    /// Accounts currently delegating to `delegate` (direct only).
    pub fn delegators_of(&self, delegate: &Address) -> Vec<Address> {
        let mut delegators: Vec<Address> = self
            .delegates
            .iter()
            .filter(|(_, d)| *d == delegate)
            .map(|(a, _)| *a)
            .collect();
        delegators.sort();
        delegators
    }

    /// All (delegator, delegate) edges.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Address)> {
        self.delegates.iter()
    }
}
