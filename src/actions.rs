// 5.0: the host ledger's generic trade-action primitives, plus the thin
// adapter that turns a settlement outcome into an atomic action batch.
// the composition system itself is external; this is only the interface
// the settlement core must satisfy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Address, MarketId, SettlementKey, Wei};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Deposit,
    Withdraw,
    Transfer,
    Call,
    Trade,
    Liquidate,
}

// Whether the value is an exact wei count or a principal (interest-indexed) count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetDenomination {
    Wei,
    Par,
}

// Delta applies the value relative to the current balance; Target sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountReference {
    Delta,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    pub sign: bool,
    pub denomination: AssetDenomination,
    pub reference: AmountReference,
    pub value: Decimal,
}

impl AssetAmount {
    pub fn positive_wei_delta(amount: Wei) -> Self {
        Self {
            sign: true,
            denomination: AssetDenomination::Wei,
            reference: AmountReference::Delta,
            value: amount.value(),
        }
    }

    pub fn negative_wei_delta(amount: Wei) -> Self {
        Self {
            sign: false,
            denomination: AssetDenomination::Wei,
            reference: AmountReference::Delta,
            value: amount.value(),
        }
    }

    pub fn zero() -> Self {
        Self {
            sign: true,
            denomination: AssetDenomination::Wei,
            reference: AmountReference::Delta,
            value: Decimal::ZERO,
        }
    }
}

// One action inside a ledger operate batch. account_id and other_account_id
// index into the batch's account list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionArgs {
    pub action_type: ActionType,
    pub account_id: usize,
    pub amount: AssetAmount,
    pub primary_market_id: MarketId,
    pub secondary_market_id: MarketId,
    pub other_address: Address,
    pub other_account_id: usize,
    pub data: Vec<u8>,
}

impl ActionArgs {
    pub fn call(account_id: usize, target: Address, data: Vec<u8>) -> Self {
        Self {
            action_type: ActionType::Call,
            account_id,
            amount: AssetAmount::zero(),
            primary_market_id: MarketId(0),
            secondary_market_id: MarketId(0),
            other_address: target,
            other_account_id: 0,
            data,
        }
    }

    pub fn deposit(account_id: usize, from: Address, market: MarketId, amount: Wei) -> Self {
        Self {
            action_type: ActionType::Deposit,
            account_id,
            amount: AssetAmount::positive_wei_delta(amount),
            primary_market_id: market,
            secondary_market_id: MarketId(0),
            other_address: from,
            other_account_id: 0,
            data: Vec::new(),
        }
    }

    pub fn withdraw(account_id: usize, to: Address, market: MarketId, amount: Wei) -> Self {
        Self {
            action_type: ActionType::Withdraw,
            account_id,
            amount: AssetAmount::negative_wei_delta(amount),
            primary_market_id: market,
            secondary_market_id: MarketId(0),
            other_address: to,
            other_account_id: 0,
            data: Vec::new(),
        }
    }

    pub fn transfer(account_id: usize, other_account_id: usize, market: MarketId, amount: Wei) -> Self {
        Self {
            action_type: ActionType::Transfer,
            account_id,
            amount: AssetAmount::negative_wei_delta(amount),
            primary_market_id: market,
            secondary_market_id: MarketId(0),
            other_address: Address(0),
            other_account_id,
            data: Vec::new(),
        }
    }
}

// 5.1: settlement forwarding batch: a call to trigger the forward plus the
// deposit of the settled proceeds, composable with other margin actions
// inside one operate batch.
pub fn forward_actions(
    trader: Address,
    account_id: usize,
    market: MarketId,
    amount: Wei,
    key: SettlementKey,
) -> Vec<ActionArgs> {
    vec![
        ActionArgs::call(account_id, trader, key.to_bytes().to_vec()),
        ActionArgs::deposit(account_id, trader, market, amount),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn forward_batch_shape() {
        let trader = Address(0xAA);
        let key = SettlementKey(42);
        let actions = forward_actions(trader, 0, MarketId(2), Wei::new_unchecked(dec!(997)), key);

        assert_eq!(actions.len(), 2);

        assert_eq!(actions[0].action_type, ActionType::Call);
        assert_eq!(actions[0].other_address, trader);
        assert_eq!(actions[0].data, key.to_bytes().to_vec());

        assert_eq!(actions[1].action_type, ActionType::Deposit);
        assert_eq!(actions[1].primary_market_id, MarketId(2));
        assert!(actions[1].amount.sign);
        assert_eq!(actions[1].amount.value, dec!(997));
    }

    #[test]
    fn asset_amount_constructors() {
        let amt = AssetAmount::positive_wei_delta(Wei::new_unchecked(dec!(5)));
        assert!(amt.sign);
        assert_eq!(amt.denomination, AssetDenomination::Wei);
        assert_eq!(amt.reference, AmountReference::Delta);

        let neg = AssetAmount::negative_wei_delta(Wei::new_unchecked(dec!(5)));
        assert!(!neg.sign);
    }

    #[test]
    fn action_serializes_to_tagged_json() {
        let action = ActionArgs::deposit(0, Address(1), MarketId(2), Wei::new_unchecked(dec!(10)));
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"deposit\""));
    }
}
