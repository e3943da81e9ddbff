//! Checkpoint histories.
//!
//! Each account owns an append-only sequence of `(issuance_point, power)`
//! pairs with strictly increasing points. Writes at the point of the last
//! entry overwrite it; writes before it are rejected. Lookups binary-search
//! for the latest entry at or before the query point.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use snapvote_types::{Address, U256};
use crate::error::LedgerError;

/// One step of a voting-power history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Issuance point (block height) the value takes effect at
    pub issuance_point: u64,
    /// Power from this point until the next checkpoint
    pub power: U256,
}

impl Checkpoint {
    pub fn new(issuance_point: u64, power: U256) -> Self {
        Self {
            issuance_point,
            power,
        }
    }
}

/// Ordered checkpoint sequence for a single key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointHistory {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a history, rejecting sequences that are not strictly increasing.
    pub fn from_checkpoints(checkpoints: Vec<Checkpoint>) -> Result<Self, LedgerError> {
        if let Some(pair) = checkpoints
            .windows(2)
            .find(|pair| pair[0].issuance_point >= pair[1].issuance_point)
        {
            return Err(LedgerError::InvariantViolation(format!(
                "checkpoint at {} is not after {}",
                pair[1].issuance_point, pair[0].issuance_point
            )));
        }
        Ok(Self { checkpoints })
    }

    /// Check that a write at `point` would keep the history monotonic.
    pub fn ensure_writable(&self, point: u64) -> Result<(), LedgerError> {
        match self.latest_point() {
            Some(last) if point < last => Err(LedgerError::InvariantViolation(format!(
                "non-monotonic issuance point {} (last recorded {})",
                point, last
            ))),
            _ => Ok(()),
        }
    }

    /// Record `power` at `point`, coalescing with an entry at the same point.
    pub fn push(&mut self, point: u64, power: U256) -> Result<(), LedgerError> {
        self.ensure_writable(point)?;

        match self.checkpoints.last_mut() {
            Some(last) if last.issuance_point == point => last.power = power,
            _ => self.checkpoints.push(Checkpoint::new(point, power)),
        }
        Ok(())
    }

    /// Power at the most recent checkpoint, or zero.
    pub fn latest(&self) -> U256 {
        self.checkpoints
            .last()
            .map(|c| c.power)
            .unwrap_or(U256::ZERO)
    }

    pub fn latest_point(&self) -> Option<u64> {
        self.checkpoints.last().map(|c| c.issuance_point)
    }

    /// Power of the latest checkpoint with `issuance_point <= point`.
    ///
    /// O(log n) in the length of the history.
    pub fn power_at(&self, point: u64) -> U256 {
        let idx = self
            .checkpoints
            .partition_point(|c| c.issuance_point <= point);

        match idx {
            0 => U256::ZERO,
            n => self.checkpoints[n - 1].power,
        }
    }

    pub fn get(&self, pos: usize) -> Option<Checkpoint> {
        self.checkpoints.get(pos).copied()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn as_slice(&self) -> &[Checkpoint] {
        &self.checkpoints
    }
}

/// Per-account checkpoint histories of received voting power.
#[derive(Debug, Clone, Default)]
pub struct CheckpointStore {
    histories: HashMap<Address, CheckpointHistory>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_histories(histories: HashMap<Address, CheckpointHistory>) -> Self {
        Self { histories }
    }

    /// Record `power` for `account` at `point`.
    ///
    /// # Errors
    /// - `InvariantViolation` if `point` is before the account's last checkpoint
    pub fn append(
        &mut self,
        account: Address,
        point: u64,
        power: U256,
    ) -> Result<(), LedgerError> {
        if let Some(history) = self.histories.get(&account) {
            if let Err(e) = history.ensure_writable(point) {
                tracing::warn!(%account, point, "Rejected checkpoint write: {}", e);
                return Err(e);
            }
        }

        self.histories
            .entry(account)
            .or_default()
            .push(point, power)?;

        tracing::debug!(%account, point, %power, "Checkpoint written");
        Ok(())
    }

    /// Power of `account` as of `point` (zero before its first checkpoint).
    pub fn power_at(&self, account: &Address, point: u64) -> U256 {
        self.histories
            .get(account)
            .map(|h| h.power_at(point))
            .unwrap_or(U256::ZERO)
    }

    /// Current power of `account`.
    pub fn latest(&self, account: &Address) -> U256 {
        self.histories
            .get(account)
            .map(|h| h.latest())
            .unwrap_or(U256::ZERO)
    }

    pub fn num_checkpoints(&self, account: &Address) -> usize {
        self.histories.get(account).map(|h| h.len()).unwrap_or(0)
    }

    pub fn checkpoint(&self, account: &Address, pos: usize) -> Option<Checkpoint> {
        self.histories.get(account).and_then(|h| h.get(pos))
    }

    pub fn history(&self, account: &Address) -> &[Checkpoint] {
        self.histories
            .get(account)
            .map(|h| h.as_slice())
            .unwrap_or(&[])
    }

    /// Accounts that have at least one checkpoint.
    pub fn accounts(&self) -> impl Iterator<Item = &Address> {
        self.histories.keys()
    }

    pub(crate) fn histories(&self) -> &HashMap<Address, CheckpointHistory> {
        &self.histories
    }

    /// Move `amount` of power from one delegate to another at `point`.
    ///
    /// `None` on either side means the power comes from (or goes to) nowhere:
    /// newly counted balance, or balance whose holder has no delegate.
    /// The whole move is validated before either side is written.
    ///
    /// # Errors
    /// - `InvariantViolation` if `point` is non-monotonic for either side or
    ///   the source holds less than `amount`
    /// - `Overflow` if the destination would exceed `U256::MAX`
    pub fn move_power(
        &mut self,
        from: Option<Address>,
        to: Option<Address>,
        amount: U256,
        point: u64,
    ) -> Result<(), LedgerError> {
        if from == to || amount.is_zero() {
            return Ok(());
        }

        let debit = match from {
            Some(src) => {
                self.check_writable(&src, point)?;
                let current = self.latest(&src);
                let updated = current.checked_sub(&amount).ok_or_else(|| {
                    tracing::warn!(account = %src, %current, %amount, "Power underflow");
                    LedgerError::InvariantViolation(format!(
                        "power of {} would drop below zero ({} - {})",
                        src, current, amount
                    ))
                })?;
                Some((src, updated))
            }
            None => None,
        };

        let credit = match to {
            Some(dst) => {
                self.check_writable(&dst, point)?;
                let current = self.latest(&dst);
                let updated = current.checked_add(&amount).ok_or_else(|| {
                    LedgerError::Overflow(format!("power of {} exceeds U256", dst))
                })?;
                Some((dst, updated))
            }
            None => None,
        };

        if let Some((src, power)) = debit {
            self.append(src, point, power)?;
        }
        if let Some((dst, power)) = credit {
            self.append(dst, point, power)?;
        }

        tracing::debug!(?from, ?to, %amount, point, "Voting power moved");
        Ok(())
    }

    fn check_writable(&self, account: &Address, point: u64) -> Result<(), LedgerError> {
        match self.histories.get(account) {
            Some(history) => history.ensure_writable(point).map_err(|e| {
                tracing::warn!(%account, point, "Rejected power move: {}", e);
                e
            }),
            None => Ok(()),
        }
    }
}
