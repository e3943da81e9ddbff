//! Ledger persistence.
//!
//! The full ledger state is written as pretty JSON. Loading re-checks the
//! history ordering and the conservation law before handing back a ledger.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use snapvote_types::{Address, U256};
use crate::checkpoint::{Checkpoint, CheckpointHistory, CheckpointStore};
use crate::delegation::DelegationRegistry;
use crate::error::LedgerError;
use crate::ledger::VotingPowerLedger;

/// Serializable image of a [`VotingPowerLedger`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub latest_point: u64,
    pub balances: BTreeMap<Address, U256>,
    pub delegates: BTreeMap<Address, Address>,
    pub checkpoints: BTreeMap<Address, Vec<Checkpoint>>,
    pub total_supply: Vec<Checkpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sealed_through: Option<u64>,
}

impl VotingPowerLedger {
    /// Capture the current state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            latest_point: self.latest_point,
            balances: self
                .balances
                .iter()
                .filter(|(_, b)| !b.is_zero())
                .map(|(a, b)| (*a, *b))
                .collect(),
            delegates: self.registry.iter().map(|(a, d)| (*a, *d)).collect(),
            checkpoints: self
                .checkpoints
                .histories()
                .iter()
                .map(|(a, h)| (*a, h.as_slice().to_vec()))
                .collect(),
            total_supply: self.total_supply.as_slice().to_vec(),
            sealed_through: self.sealed_through,
        }
    }

    /// Rebuild a ledger from a snapshot.
    ///
    /// # Errors
    /// - `InvariantViolation` if a history is not strictly increasing or
    ///   extends past `latest_point`, a delegate is the zero address, or
    ///   current power and total supply do not match the balances
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let mut histories = HashMap::with_capacity(snapshot.checkpoints.len());
        for (account, checkpoints) in snapshot.checkpoints {
            histories.insert(account, CheckpointHistory::from_checkpoints(checkpoints)?);
        }
        let total_supply = CheckpointHistory::from_checkpoints(snapshot.total_supply)?;

        let highest = histories
            .values()
            .chain(std::iter::once(&total_supply))
            .filter_map(|h| h.latest_point())
            .max();
        if let Some(highest) = highest.filter(|p| *p > snapshot.latest_point) {
            return Err(LedgerError::InvariantViolation(format!(
                "checkpoint at {} is after latest point {}",
                highest, snapshot.latest_point
            )));
        }

        if let Some((account, _)) = snapshot.delegates.iter().find(|(_, d)| d.is_zero()) {
            return Err(LedgerError::InvariantViolation(format!(
                "{} delegates to the zero address",
                account
            )));
        }

        let ledger = Self {
            balances: snapshot.balances.into_iter().collect(),
            registry: DelegationRegistry::from_map(snapshot.delegates.into_iter().collect()),
            checkpoints: CheckpointStore::from_histories(histories),
            total_supply,
            latest_point: snapshot.latest_point,
            sealed_through: snapshot.sealed_through,
        };
        ledger.verify_conservation()?;

        tracing::info!(
            accounts = ledger.balances.len(),
            latest_point = ledger.latest_point,
            "Ledger restored"
        );
        Ok(ledger)
    }

    /// Write the ledger to `path` as JSON, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> Result<(), LedgerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, json)?;

        tracing::debug!("Ledger persisted to {:?}", path);
        Ok(())
    }

    /// Load a ledger previously written with [`Self::save_to_file`].
    pub fn load_from_file(path: &Path) -> Result<Self, LedgerError> {
        let json = fs::read_to_string(path)?;
        let snapshot: LedgerSnapshot = serde_json::from_str(&json)?;
        Self::restore(snapshot)
    }

    /// Check that each delegate's current power equals the balances delegated
    /// to it and that the total supply equals the summed balances.
    pub fn verify_conservation(&self) -> Result<(), LedgerError> {
        let delegates: BTreeSet<Address> = self
            .registry
            .iter()
            .map(|(_, d)| *d)
            .chain(self.checkpoints.accounts().copied())
            .collect();

        for delegate in &delegates {
            let want = self
                .registry
                .delegators_of(delegate)
                .iter()
                .try_fold(U256::ZERO, |acc, a| acc.checked_add(&self.balance_of(a)))
                .ok_or_else(|| LedgerError::Overflow(format!("power of {} exceeds U256", delegate)))?;
            let have = self.current_power(delegate);
            if want != have {
                return Err(LedgerError::InvariantViolation(format!(
                    "power of {} is {} but delegated balances sum to {}",
                    delegate, have, want
                )));
            }
        }

        let balances = self
            .balances
            .values()
            .try_fold(U256::ZERO, |acc, b| acc.checked_add(b))
            .ok_or_else(|| LedgerError::Overflow("balances exceed U256".to_string()))?;
        if balances != self.total_supply() {
            return Err(LedgerError::InvariantViolation(format!(
                "total supply is {} but balances sum to {}",
                self.total_supply(),
                balances
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_address(n: u8) -> Address {
        let mut addr = [0u8; 20];
        addr[19] = n;
        Address::from_bytes(addr)
    }

    fn sample_ledger() -> VotingPowerLedger {
        let mut ledger = VotingPowerLedger::new();
        let alice = test_address(1);
        let bob = test_address(2);
        let charlie = test_address(3);

        ledger.on_balance_increase(alice, U256::from(40u64), 1).unwrap();
        ledger.on_balance_increase(bob, U256::from(40u64), 1).unwrap();
        ledger.on_delegation_change(alice, alice, 2).unwrap();
        ledger.on_delegation_change(bob, alice, 3).unwrap();
        ledger.on_transfer(alice, charlie, U256::from(10u64), 4).unwrap();
        ledger
    }

    #[test]
    fn test_restore_preserves_history() {
        let ledger = sample_ledger();
        let alice = test_address(1);

        let restored = VotingPowerLedger::restore(ledger.snapshot()).unwrap();

        assert_eq!(restored.snapshot(), ledger.snapshot());
        assert_eq!(restored.power_of(&alice, 2), U256::from(40u64));
        assert_eq!(restored.power_of(&alice, 3), U256::from(80u64));
        assert_eq!(restored.power_of(&alice, 4), U256::from(70u64));
        assert_eq!(restored.latest_point(), 4);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("ledger.json");
        let ledger = sample_ledger();

        ledger.save_to_file(&path).unwrap();
        let loaded = VotingPowerLedger::load_from_file(&path).unwrap();

        assert_eq!(loaded.snapshot(), ledger.snapshot());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = VotingPowerLedger::load_from_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(LedgerError::Storage(_))));
    }

    #[test]
    fn test_restore_rejects_tampered_power() {
        let mut snapshot = sample_ledger().snapshot();
        let alice = test_address(1);
        if let Some(last) = snapshot.checkpoints.get_mut(&alice).and_then(|h| h.last_mut()) {
            last.power = U256::from(1_000u64);
        }

        let result = VotingPowerLedger::restore(snapshot);
        assert!(matches!(result, Err(LedgerError::InvariantViolation(_))));
    }

    #[test]
    fn test_restore_rejects_unordered_history() {
        let mut snapshot = sample_ledger().snapshot();
        if let Some(history) = snapshot.checkpoints.get_mut(&test_address(1)) {
            history.reverse();
        }

        let result = VotingPowerLedger::restore(snapshot);
        assert!(matches!(result, Err(LedgerError::InvariantViolation(_))));
    }

    #[test]
    fn test_restore_rejects_supply_mismatch() {
        let mut snapshot = sample_ledger().snapshot();
        snapshot.balances.insert(test_address(9), U256::from(5u64));

        let result = VotingPowerLedger::restore(snapshot);
        assert!(matches!(result, Err(LedgerError::InvariantViolation(_))));
    }

    #[test]
    fn test_conservation_counts_each_delegator() {
        let ledger = sample_ledger();
        let alice = test_address(1);

        assert_eq!(ledger.registry().delegators_of(&alice).len(), 2);
        assert!(ledger.verify_conservation().is_ok());
    }

    #[test]
    fn test_restore_rejects_stale_latest_point() {
        let mut snapshot = sample_ledger().snapshot();
        snapshot.latest_point = 0;

        let result = VotingPowerLedger::restore(snapshot);
        assert!(matches!(result, Err(LedgerError::InvariantViolation(_))));
    }

    #[test]
    fn test_restore_keeps_seal() {
        let mut ledger = sample_ledger();
        let alice = test_address(1);
        ledger.seal(4);

        let mut restored = VotingPowerLedger::restore(ledger.snapshot()).unwrap();

        assert_eq!(restored.sealed_through(), Some(4));
        assert!(restored.on_balance_decrease(alice, U256::ONE, 4).is_err());
    }
}
