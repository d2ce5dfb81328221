// 3.0: durable map from settlement key to pending-request record.
// one record per outstanding request; registering a record freezes its
// sub-account, consuming it is the only way a key leaves the map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::freeze::FreezeGuard;
use crate::types::{AccountNumber, Address, SettlementKey, SubAccount, Timestamp, Wei};

// One outstanding mint or redeem request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSettlement {
    pub key: SettlementKey,
    pub vault: Address,
    pub account_number: AccountNumber,
    // source-asset amount committed when the request was created
    pub input_amount: Wei,
    // asset the requester expects back
    pub output_token: Address,
    // slippage floor from the original request
    pub min_output_amount: Wei,
    // zero while pending, stamped by a validated execution callback
    pub output_amount: Wei,
    pub created_at: Timestamp,
}

impl PendingSettlement {
    pub fn new(
        key: SettlementKey,
        sub: SubAccount,
        input_amount: Wei,
        output_token: Address,
        min_output_amount: Wei,
        created_at: Timestamp,
    ) -> Self {
        Self {
            key,
            vault: sub.vault,
            account_number: sub.number,
            input_amount,
            output_token,
            min_output_amount,
            output_amount: Wei::zero(),
            created_at,
        }
    }

    pub fn sub_account(&self) -> SubAccount {
        SubAccount::new(self.vault, self.account_number)
    }

    pub fn is_settled(&self) -> bool {
        !self.output_amount.is_zero()
    }
}

// Reduced form of a record whose settled proceeds could not be forwarded.
// the freeze is already cleared; the amount sits in the trader's wallet
// until the owner releases it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedSettlement {
    pub key: SettlementKey,
    pub vault: Address,
    pub account_number: AccountNumber,
    pub token: Address,
    pub amount: Wei,
    // empty string for silent failures
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Duplicate settlement key {0}")]
    DuplicateKey(SettlementKey),

    #[error("Sub-account {0} already has an outstanding request")]
    AccountAlreadyFrozen(SubAccount),

    #[error("Unknown settlement key {0}")]
    UnknownKey(SettlementKey),
}

// Keyed store for pending requests. owned by a trader, never exposed to
// vaults or external callers directly.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RequestRegistry {
    records: HashMap<SettlementKey, PendingSettlement>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    // registers a record and freezes its sub-account. rejects a second
    // concurrent request against an already-frozen account.
    pub fn register(
        &mut self,
        guard: &mut FreezeGuard,
        record: PendingSettlement,
    ) -> Result<(), RegistryError> {
        if self.records.contains_key(&record.key) {
            return Err(RegistryError::DuplicateKey(record.key));
        }

        let sub = record.sub_account();
        if guard.is_frozen(sub) {
            return Err(RegistryError::AccountAlreadyFrozen(sub));
        }

        guard.freeze(sub);
        self.records.insert(record.key, record);
        Ok(())
    }

    pub fn get(&self, key: SettlementKey) -> Option<&PendingSettlement> {
        self.records.get(&key)
    }

    // stamps the settled output amount on a live record. validation failures
    // must leave the record untouched, so callers stamp only after every
    // check has passed.
    pub fn mark_settled(&mut self, key: SettlementKey, amount: Wei) -> Result<(), RegistryError> {
        let record = self
            .records
            .get_mut(&key)
            .ok_or(RegistryError::UnknownKey(key))?;
        record.output_amount = amount;
        Ok(())
    }

    // removes and returns the record. a consumed key can never settle again.
    pub fn consume(&mut self, key: SettlementKey) -> Result<PendingSettlement, RegistryError> {
        self.records
            .remove(&key)
            .ok_or(RegistryError::UnknownKey(key))
    }

    pub fn pending_count(&self) -> usize {
        self.records.len()
    }

    pub fn pending_for(&self, sub: SubAccount) -> Option<&PendingSettlement> {
        self.records.values().find(|r| r.sub_account() == sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(key: u128, vault: u64, number: u32) -> PendingSettlement {
        PendingSettlement::new(
            SettlementKey(key),
            SubAccount::new(Address(vault), AccountNumber(number)),
            Wei::new_unchecked(dec!(1000)),
            Address(0xEE),
            Wei::new_unchecked(dec!(1)),
            Timestamp::from_millis(0),
        )
    }

    #[test]
    fn register_freezes_the_sub_account() {
        let mut registry = RequestRegistry::new();
        let mut guard = FreezeGuard::new();
        let rec = record(1, 7, 123);
        let sub = rec.sub_account();

        registry.register(&mut guard, rec).unwrap();

        assert!(guard.is_frozen(sub));
        assert_eq!(registry.pending_count(), 1);
        assert!(registry.pending_for(sub).is_some());
    }

    #[test]
    fn second_request_against_frozen_account_rejected() {
        let mut registry = RequestRegistry::new();
        let mut guard = FreezeGuard::new();

        registry.register(&mut guard, record(1, 7, 123)).unwrap();
        let result = registry.register(&mut guard, record(2, 7, 123));

        assert!(matches!(
            result,
            Err(RegistryError::AccountAlreadyFrozen(_))
        ));
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut registry = RequestRegistry::new();
        let mut guard = FreezeGuard::new();

        registry.register(&mut guard, record(1, 7, 123)).unwrap();
        let result = registry.register(&mut guard, record(1, 8, 9));

        assert!(matches!(result, Err(RegistryError::DuplicateKey(_))));
    }

    #[test]
    fn consume_deletes_the_record() {
        let mut registry = RequestRegistry::new();
        let mut guard = FreezeGuard::new();

        registry.register(&mut guard, record(1, 7, 123)).unwrap();

        let consumed = registry.consume(SettlementKey(1)).unwrap();
        assert_eq!(consumed.input_amount.value(), dec!(1000));

        // replay fails
        assert!(matches!(
            registry.consume(SettlementKey(1)),
            Err(RegistryError::UnknownKey(_))
        ));
    }

    #[test]
    fn mark_settled_stamps_output_amount() {
        let mut registry = RequestRegistry::new();
        let mut guard = FreezeGuard::new();

        registry.register(&mut guard, record(1, 7, 123)).unwrap();
        assert!(!registry.get(SettlementKey(1)).unwrap().is_settled());

        registry
            .mark_settled(SettlementKey(1), Wei::new_unchecked(dec!(997)))
            .unwrap();

        let rec = registry.get(SettlementKey(1)).unwrap();
        assert!(rec.is_settled());
        assert_eq!(rec.output_amount.value(), dec!(997));
    }

    #[test]
    fn unknown_key_lookups_fail() {
        let mut registry = RequestRegistry::new();

        assert!(registry.get(SettlementKey(42)).is_none());
        assert!(matches!(
            registry.mark_settled(SettlementKey(42), Wei::zero()),
            Err(RegistryError::UnknownKey(_))
        ));
    }
}
