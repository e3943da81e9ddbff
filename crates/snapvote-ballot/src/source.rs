//! Where a ballot reads voting power from.
//!
//! The ballot only ever asks for historical power at its reference point, so
//! the seam is a read plus a seal. A ledger that keeps changing after the
//! ballot is created is shared behind a `parking_lot::RwLock`; writers take
//! the write lock for each event, which serializes every mutation. Creating a
//! ballot over a shared ledger seals it through the reference point, so the
//! snapshot cannot move once votes are cast.

use std::sync::Arc;
use parking_lot::RwLock;
use snapvote_ledger::VotingPowerLedger;
use snapvote_types::{Address, U256};

/// Read-only point-in-time voting power.
pub trait VotingPowerSource {
    /// Voting power of `account` as of `point`.
    fn power_of(&self, account: &Address, point: u64) -> U256;

    /// Freeze power at and before `point`.
    ///
    /// Sources that cannot change while the ballot holds them keep the
    /// default.
    fn seal(&mut self, _point: u64) {}
}

/// Ledger handle shared between the token side and one or more ballots.
pub type SharedLedger = Arc<RwLock<VotingPowerLedger>>;

/// Wrap a ledger for sharing.
pub fn shared(ledger: VotingPowerLedger) -> SharedLedger {
    Arc::new(RwLock::new(ledger))
}

impl VotingPowerSource for VotingPowerLedger {
    fn power_of(&self, account: &Address, point: u64) -> U256 {
        VotingPowerLedger::power_of(self, account, point)
    }

    fn seal(&mut self, point: u64) {
        VotingPowerLedger::seal(self, point)
    }
}

impl<T: VotingPowerSource + ?Sized> VotingPowerSource for &T {
    fn power_of(&self, account: &Address, point: u64) -> U256 {
        (**self).power_of(account, point)
    }
}

impl<T: VotingPowerSource + ?Sized> VotingPowerSource for Arc<RwLock<T>> {
    fn power_of(&self, account: &Address, point: u64) -> U256 {
        self.read().power_of(account, point)
    }

    fn seal(&mut self, point: u64) {
        self.write().seal(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voter() -> Address {
        Address::from_bytes([1u8; 20])
    }

    #[test]
    fn test_shared_ledger_sees_later_writes() {
        let handle = shared(VotingPowerLedger::new());
        let reader = Arc::clone(&handle);

        {
            let mut ledger = handle.write();
            ledger.on_delegation_change(voter(), voter(), 1).unwrap();
            ledger.on_balance_increase(voter(), U256::from(10u64), 2).unwrap();
        }

        assert_eq!(reader.power_of(&voter(), 2), U256::from(10u64));
        assert_eq!(reader.power_of(&voter(), 1), U256::ZERO);
    }

    #[test]
    fn test_sealing_shared_handle_seals_ledger() {
        let handle = shared(VotingPowerLedger::new());
        let mut seal_handle = Arc::clone(&handle);

        seal_handle.seal(4);

        assert_eq!(handle.read().sealed_through(), Some(4));
        assert!(handle.write().on_balance_increase(voter(), U256::ONE, 4).is_err());
        assert!(handle.write().on_balance_increase(voter(), U256::ONE, 5).is_ok());
    }

    #[test]
    fn test_reference_source() {
        let mut ledger = VotingPowerLedger::new();
        ledger.on_delegation_change(voter(), voter(), 1).unwrap();
        ledger.on_balance_increase(voter(), U256::from(3u64), 1).unwrap();

        fn read<S: VotingPowerSource>(source: S) -> U256 {
            source.power_of(&Address::from_bytes([1u8; 20]), 1)
        }
        assert_eq!(read(&ledger), U256::from(3u64));
    }
}
