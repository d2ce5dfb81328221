// 1.0: all the primitives live here. nothing in the settlement core works without these types.
// addresses, market ids, sub-accounts, settlement keys, wei amounts, timestamps.
// each is a newtype so the compiler catches type mixups.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

// On-chain identity: vaults, handlers, owners, token contracts, receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

// Ledger market. each market holds exactly one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketId(pub u32);

// Sub-account index within a vault. freeze scope is per sub-account, not per vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountNumber(pub u32);

// 1.1: the unit of isolation: one vault, one sub-account index.
// pending requests and freezes are keyed by this pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubAccount {
    pub vault: Address,
    pub number: AccountNumber,
}

impl SubAccount {
    pub fn new(vault: Address, number: AccountNumber) -> Self {
        Self { vault, number }
    }
}

impl fmt::Display for SubAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.vault, self.number.0)
    }
}

// 1.2: opaque identifier assigned by the external venue at request creation.
// globally unique, immutable once assigned. correlates a request with its callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SettlementKey(pub u128);

impl SettlementKey {
    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }
}

impl fmt::Display for SettlementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:032x}", self.0)
    }
}

// 1.3: wei-denominated token amount. must be non-negative.
// collateral balances, request amounts, fees all use this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wei(Decimal);

impl Wei {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value >= Decimal::ZERO);
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: Wei) -> Self {
        Self(self.0 + other.0)
    }

    // saturates at zero rather than going negative
    pub fn saturating_sub(&self, other: Wei) -> Self {
        Self((self.0 - other.0).max(Decimal::ZERO))
    }

    #[must_use]
    pub fn checked_sub(&self, other: Wei) -> Option<Self> {
        if other.0 > self.0 {
            None
        } else {
            Some(Self(self.0 - other.0))
        }
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for Wei {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Wei {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Sum for Wei {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, w| acc.add(w))
    }
}

impl<'a> Sum<&'a Wei> for Wei {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, w| acc.add(*w))
    }
}

// 1.4: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn wei_rejects_negative() {
        assert!(Wei::new(dec!(-1)).is_none());
        assert!(Wei::new(dec!(0)).is_some());
        assert!(Wei::new(dec!(10_000_000_000_000_000_000)).is_some()); // 10e18 fits
    }

    #[test]
    fn wei_arithmetic() {
        let a = Wei::new_unchecked(dec!(100));
        let b = Wei::new_unchecked(dec!(30));

        assert_eq!(a.add(b).value(), dec!(130));
        assert_eq!(a.checked_sub(b).unwrap().value(), dec!(70));
        assert!(b.checked_sub(a).is_none());
        assert_eq!(b.saturating_sub(a), Wei::zero());
    }

    #[test]
    fn settlement_key_round_trips_through_bytes() {
        let key = SettlementKey(0xdead_beef_0123);
        assert_eq!(SettlementKey::from_bytes(key.to_bytes()), key);
    }

    #[test]
    fn sub_account_identity() {
        let a = SubAccount::new(Address(7), AccountNumber(123));
        let b = SubAccount::new(Address(7), AccountNumber(123));
        let c = SubAccount::new(Address(7), AccountNumber(124));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
