//! Voting-power ledger.
//!
//! The ledger is the entry point for an external token component: every
//! balance-affecting event is reported here, tagged with the issuance point it
//! happened at, and the ledger keeps per-account checkpoint histories of the
//! voting power credited to each delegate.
//!
//! Conservation: after every successful call, the current power summed over
//! all accounts equals the summed balances of all accounts that have a
//! delegate. Every call either applies completely or returns an error and
//! leaves the ledger untouched.
//!
//! A ballot reading power at some point seals the ledger through that point,
//! after which events at or before it are rejected. Power at a sealed point
//! never changes again.

use std::collections::HashMap;
use snapvote_types::{Address, U256};
use crate::checkpoint::{Checkpoint, CheckpointHistory, CheckpointStore};
use crate::delegation::{DelegateChanged, DelegationRegistry};
use crate::error::LedgerError;

/// Checkpointed, delegation-aware voting-power ledger.
#[derive(Debug, Clone, Default)]
pub struct VotingPowerLedger {
    /// Raw token balances
    pub(crate) balances: HashMap<Address, U256>,
    /// Current delegate per account
    pub(crate) registry: DelegationRegistry,
    /// Received voting power per delegate
    pub(crate) checkpoints: CheckpointStore,
    /// Total supply history
    pub(crate) total_supply: CheckpointHistory,
    /// Highest issuance point written so far
    pub(crate) latest_point: u64,
    /// Points at or before this one accept no further writes
    pub(crate) sealed_through: Option<u64>,
}

impl VotingPowerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `account` (mint or incoming balance).
    ///
    /// The amount becomes voting power of the account's delegate, if it has one.
    ///
    /// # Errors
    /// - `Overflow` if the balance or total supply would exceed `U256::MAX`
    /// - `InvariantViolation` if `point` is before an already recorded point
    ///   or not after the sealed point
    pub fn on_balance_increase(
        &mut self,
        account: Address,
        amount: U256,
        point: u64,
    ) -> Result<(), LedgerError> {
        self.ensure_open(point)?;
        if amount.is_zero() {
            return Ok(());
        }

        let new_balance = self.balance_of(&account).checked_add(&amount).ok_or_else(|| {
            LedgerError::Overflow(format!("balance of {} exceeds U256", account))
        })?;
        let new_supply = self
            .total_supply
            .latest()
            .checked_add(&amount)
            .ok_or_else(|| LedgerError::Overflow("total supply exceeds U256".to_string()))?;
        self.total_supply.ensure_writable(point)?;

        let delegate = self.registry.effective_delegate(&account);
        self.checkpoints.move_power(None, delegate, amount, point)?;
        self.total_supply.push(point, new_supply)?;
        self.balances.insert(account, new_balance);
        self.observe(point);

        tracing::debug!(%account, %amount, point, "Balance increased");
        Ok(())
    }

    /// Debit `amount` from `account` (burn or outgoing balance).
    ///
    /// # Errors
    /// - `InsufficientBalance` if `amount` exceeds the account's balance
    /// - `InvariantViolation` if `point` is non-monotonic or the delegate's
    ///   power would go negative
    pub fn on_balance_decrease(
        &mut self,
        account: Address,
        amount: U256,
        point: u64,
    ) -> Result<(), LedgerError> {
        self.ensure_open(point)?;
        let balance = self.balance_of(&account);
        let new_balance = balance
            .checked_sub(&amount)
            .ok_or(LedgerError::InsufficientBalance {
                required: amount,
                available: balance,
            })?;
        if amount.is_zero() {
            return Ok(());
        }

        let new_supply = self
            .total_supply
            .latest()
            .checked_sub(&amount)
            .ok_or_else(|| {
                LedgerError::InvariantViolation("total supply would drop below zero".to_string())
            })?;
        self.total_supply.ensure_writable(point)?;

        let delegate = self.registry.effective_delegate(&account);
        self.checkpoints.move_power(delegate, None, amount, point)?;
        self.total_supply.push(point, new_supply)?;
        self.balances.insert(account, new_balance);
        self.observe(point);

        tracing::debug!(%account, %amount, point, "Balance decreased");
        Ok(())
    }

    /// Move `amount` of balance from `from` to `to`; total supply is unchanged.
    ///
    /// Power moves from `from`'s delegate to `to`'s delegate.
    ///
    /// # Errors
    /// - `InsufficientBalance` if `amount` exceeds `from`'s balance
    /// - `Overflow` if `to`'s balance would exceed `U256::MAX`
    /// - `InvariantViolation` as for [`Self::on_balance_decrease`]
    pub fn on_transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
        point: u64,
    ) -> Result<(), LedgerError> {
        self.ensure_open(point)?;
        let from_balance = self.balance_of(&from);
        let new_from_balance = from_balance
            .checked_sub(&amount)
            .ok_or(LedgerError::InsufficientBalance {
                required: amount,
                available: from_balance,
            })?;
        if from == to || amount.is_zero() {
            return Ok(());
        }

        let new_to_balance = self.balance_of(&to).checked_add(&amount).ok_or_else(|| {
            LedgerError::Overflow(format!("balance of {} exceeds U256", to))
        })?;

        let src = self.registry.effective_delegate(&from);
        let dst = self.registry.effective_delegate(&to);
        self.checkpoints.move_power(src, dst, amount, point)?;
        self.balances.insert(from, new_from_balance);
        self.balances.insert(to, new_to_balance);
        self.observe(point);

        tracing::debug!(%from, %to, %amount, point, "Balance transferred");
        Ok(())
    }

    /// Point `account` at `new_delegate`, moving its whole current balance.
    ///
    /// Pass `Address::ZERO` to clear the delegation.
    ///
    /// # Errors
    /// - `InvariantViolation` if `point` is sealed or non-monotonic
    pub fn on_delegation_change(
        &mut self,
        account: Address,
        new_delegate: Address,
        point: u64,
    ) -> Result<DelegateChanged, LedgerError> {
        self.ensure_open(point)?;
        let balance = self.balance_of(&account);
        let event = self.registry.delegate_to(
            &mut self.checkpoints,
            account,
            new_delegate,
            balance,
            point,
        )?;
        self.observe(point);
        Ok(event)
    }

    /// Voting power of `account` as of `point`.
    pub fn power_of(&self, account: &Address, point: u64) -> U256 {
        self.checkpoints.power_at(account, point)
    }

    /// Current voting power of `account`.
    pub fn current_power(&self, account: &Address) -> U256 {
        self.checkpoints.latest(account)
    }

    /// Current delegate of `account`, or `None` if it never delegated.
    pub fn delegates(&self, account: &Address) -> Option<Address> {
        self.registry.effective_delegate(account)
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or(U256::ZERO)
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply.latest()
    }

    /// Total supply as of `point`.
    pub fn past_total_supply(&self, point: u64) -> U256 {
        self.total_supply.power_at(point)
    }

    /// Sum of the balances of accounts that have a delegate.
    ///
    /// Equals the sum of current power across all accounts.
    pub fn delegated_supply(&self) -> U256 {
        self.registry
            .iter()
            .map(|(account, _)| self.balance_of(account))
            .fold(U256::ZERO, |acc, b| acc.saturating_add(&b))
    }

    pub fn num_checkpoints(&self, account: &Address) -> usize {
        self.checkpoints.num_checkpoints(account)
    }

    pub fn checkpoint(&self, account: &Address, pos: usize) -> Option<Checkpoint> {
        self.checkpoints.checkpoint(account, pos)
    }

    /// Highest issuance point any mutation has been recorded at.
    pub fn latest_point(&self) -> u64 {
        self.latest_point
    }

    /// Reject every later event at or before `point`.
    ///
    /// The watermark only moves forward; sealing an earlier point than the
    /// current one is a no-op.
    pub fn seal(&mut self, point: u64) {
        let sealed = self.sealed_through.map_or(point, |s| s.max(point));
        if self.sealed_through != Some(sealed) {
            tracing::info!(point = sealed, "Ledger sealed");
        }
        self.sealed_through = Some(sealed);
    }

    /// Highest sealed issuance point, if any.
    pub fn sealed_through(&self) -> Option<u64> {
        self.sealed_through
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn registry(&self) -> &DelegationRegistry {
        &self.registry
    }

    fn ensure_open(&self, point: u64) -> Result<(), LedgerError> {
        match self.sealed_through {
            Some(sealed) if point <= sealed => {
                tracing::warn!(point, sealed, "Rejected event at sealed point");
                Err(LedgerError::InvariantViolation(format!(
                    "issuance point {} is sealed (sealed through {})",
                    point, sealed
                )))
            }
            _ => Ok(()),
        }
    }

    fn observe(&mut self, point: u64) {
        self.latest_point = self.latest_point.max(point);
    }
}
