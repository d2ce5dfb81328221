// 6.0: host ledger collaborator. the settlement core treats the margin ledger
// as an external system that accepts atomic batches of trade actions. the
// in-memory implementation here mirrors what a chain deployment would do:
// sub-account collateral balances, plain wallet balances, and user-supplied
// deposit hooks that may reject a forward.

use std::collections::HashMap;

use crate::actions::{ActionArgs, ActionType};
use crate::freeze::FreezeGuard;
use crate::types::{Address, MarketId, SubAccount, Wei};

// A vault-installed hook observing collateral deposits. hooks are untrusted
// user code: they may reject with a reason or fail silently.
pub trait DepositHook {
    fn on_deposit(&mut self, sub: SubAccount, market: MarketId, amount: Wei)
        -> Result<(), HookFailure>;
}

// "did it fail, and do we have a human-readable reason" — nothing more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub reason: Option<String>,
}

impl HookFailure {
    pub fn reasoned(reason: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
        }
    }

    pub fn silent() -> Self {
        Self { reason: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient collateral in {sub} market {market:?}: available {available}, requested {requested}")]
    InsufficientCollateral {
        sub: SubAccount,
        market: MarketId,
        available: Wei,
        requested: Wei,
    },

    #[error("Insufficient wallet balance for {owner} market {market:?}: available {available}, requested {requested}")]
    InsufficientWalletBalance {
        owner: Address,
        market: MarketId,
        available: Wei,
        requested: Wei,
    },

    #[error("Account {0} is frozen pending settlement")]
    AccountFrozen(SubAccount),

    #[error("Deposit hook reverted: {}", reason.as_deref().unwrap_or("<no reason>"))]
    HookReverted { reason: Option<String> },

    #[error("Action references account index {index} outside the batch")]
    InvalidAccountIndex { index: usize },

    #[error("Action type {0:?} is not supported by this ledger")]
    UnsupportedAction(ActionType),
}

// Consumed by the traders. balance getters plus custody primitives plus the
// atomic action batch entrypoint.
pub trait Ledger {
    fn balance(&self, sub: SubAccount, market: MarketId) -> Wei;

    fn wallet_balance(&self, owner: Address, market: MarketId) -> Wei;

    // external inflow: tokens arriving from outside the ledger's books
    // (venue payouts, seeded test balances)
    fn credit_wallet(&mut self, owner: Address, market: MarketId, amount: Wei);

    // sub-account custody -> external wallet
    fn withdraw_to(
        &mut self,
        sub: SubAccount,
        market: MarketId,
        amount: Wei,
        receiver: Address,
    ) -> Result<(), LedgerError>;

    // external wallet -> sub-account custody, without running deposit hooks
    // (cancellation refunds restore custody, they are not new deposits)
    fn deposit_from(
        &mut self,
        from: Address,
        sub: SubAccount,
        market: MarketId,
        amount: Wei,
    ) -> Result<(), LedgerError>;

    // wallet -> wallet, used for owner sweeps
    fn wallet_transfer(
        &mut self,
        from: Address,
        to: Address,
        market: MarketId,
        amount: Wei,
    ) -> Result<(), LedgerError>;

    // atomic action batch. deposit actions run the target vault's hook;
    // any hook failure aborts the batch before balances change.
    fn execute(&mut self, accounts: &[SubAccount], actions: &[ActionArgs])
        -> Result<(), LedgerError>;
}

// 6.1: in-memory ledger. balances only, no real token transfers.
#[derive(Default)]
pub struct InMemoryLedger {
    balances: HashMap<(SubAccount, MarketId), Wei>,
    wallets: HashMap<(Address, MarketId), Wei>,
    hooks: HashMap<Address, Box<dyn DepositHook>>,
    call_log: Vec<(Address, Vec<u8>)>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit_account(&mut self, sub: SubAccount, market: MarketId, amount: Wei) {
        let entry = self.balances.entry((sub, market)).or_insert_with(Wei::zero);
        *entry = entry.add(amount);
    }

    // installs an untrusted deposit hook for a vault
    pub fn install_hook(&mut self, vault: Address, hook: Box<dyn DepositHook>) {
        self.hooks.insert(vault, hook);
    }

    pub fn calls(&self) -> &[(Address, Vec<u8>)] {
        &self.call_log
    }

    // freeze-gated public path for ordinary margin operations. any action
    // touching a frozen sub-account is rejected before the batch runs.
    pub fn operate(
        &mut self,
        accounts: &[SubAccount],
        actions: &[ActionArgs],
        guard: &FreezeGuard,
    ) -> Result<(), LedgerError> {
        for action in actions {
            for index in [action.account_id, action.other_account_id] {
                if let Some(sub) = accounts.get(index) {
                    if guard.is_frozen(*sub) {
                        return Err(LedgerError::AccountFrozen(*sub));
                    }
                }
            }
        }
        self.execute(accounts, actions)
    }

    fn debit_account(
        &mut self,
        sub: SubAccount,
        market: MarketId,
        amount: Wei,
    ) -> Result<(), LedgerError> {
        let available = self.balance(sub, market);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientCollateral {
                    sub,
                    market,
                    available,
                    requested: amount,
                })?;
        self.balances.insert((sub, market), remaining);
        Ok(())
    }

    fn debit_wallet(
        &mut self,
        owner: Address,
        market: MarketId,
        amount: Wei,
    ) -> Result<(), LedgerError> {
        let available = self.wallet_balance(owner, market);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientWalletBalance {
                    owner,
                    market,
                    available,
                    requested: amount,
                })?;
        self.wallets.insert((owner, market), remaining);
        Ok(())
    }

    fn account_at(accounts: &[SubAccount], index: usize) -> Result<SubAccount, LedgerError> {
        accounts
            .get(index)
            .copied()
            .ok_or(LedgerError::InvalidAccountIndex { index })
    }

    fn amount_of(action: &ActionArgs) -> Wei {
        Wei::new_unchecked(action.amount.value)
    }
}

impl Ledger for InMemoryLedger {
    fn balance(&self, sub: SubAccount, market: MarketId) -> Wei {
        self.balances
            .get(&(sub, market))
            .copied()
            .unwrap_or_else(Wei::zero)
    }

    fn wallet_balance(&self, owner: Address, market: MarketId) -> Wei {
        self.wallets
            .get(&(owner, market))
            .copied()
            .unwrap_or_else(Wei::zero)
    }

    fn credit_wallet(&mut self, owner: Address, market: MarketId, amount: Wei) {
        let entry = self.wallets.entry((owner, market)).or_insert_with(Wei::zero);
        *entry = entry.add(amount);
    }

    fn withdraw_to(
        &mut self,
        sub: SubAccount,
        market: MarketId,
        amount: Wei,
        receiver: Address,
    ) -> Result<(), LedgerError> {
        self.debit_account(sub, market, amount)?;
        self.credit_wallet(receiver, market, amount);
        Ok(())
    }

    fn deposit_from(
        &mut self,
        from: Address,
        sub: SubAccount,
        market: MarketId,
        amount: Wei,
    ) -> Result<(), LedgerError> {
        self.debit_wallet(from, market, amount)?;
        self.credit_account(sub, market, amount);
        Ok(())
    }

    fn wallet_transfer(
        &mut self,
        from: Address,
        to: Address,
        market: MarketId,
        amount: Wei,
    ) -> Result<(), LedgerError> {
        self.debit_wallet(from, market, amount)?;
        self.credit_wallet(to, market, amount);
        Ok(())
    }

    fn execute(
        &mut self,
        accounts: &[SubAccount],
        actions: &[ActionArgs],
    ) -> Result<(), LedgerError> {
        // validate everything (including hooks) before any balance changes,
        // so a failed batch leaves the books untouched
        for action in actions {
            match action.action_type {
                ActionType::Deposit => {
                    let sub = Self::account_at(accounts, action.account_id)?;
                    let amount = Self::amount_of(action);

                    let available = self.wallet_balance(action.other_address, action.primary_market_id);
                    if available < amount {
                        return Err(LedgerError::InsufficientWalletBalance {
                            owner: action.other_address,
                            market: action.primary_market_id,
                            available,
                            requested: amount,
                        });
                    }

                    if let Some(hook) = self.hooks.get_mut(&sub.vault) {
                        hook.on_deposit(sub, action.primary_market_id, amount)
                            .map_err(|failure| LedgerError::HookReverted {
                                reason: failure.reason,
                            })?;
                    }
                }
                ActionType::Withdraw | ActionType::Transfer => {
                    let sub = Self::account_at(accounts, action.account_id)?;
                    let amount = Self::amount_of(action);
                    let available = self.balance(sub, action.primary_market_id);
                    if available < amount {
                        return Err(LedgerError::InsufficientCollateral {
                            sub,
                            market: action.primary_market_id,
                            available,
                            requested: amount,
                        });
                    }
                    if action.action_type == ActionType::Transfer {
                        Self::account_at(accounts, action.other_account_id)?;
                    }
                }
                ActionType::Call => {
                    Self::account_at(accounts, action.account_id)?;
                }
                ActionType::Trade | ActionType::Liquidate => {
                    return Err(LedgerError::UnsupportedAction(action.action_type));
                }
            }
        }

        // apply
        for action in actions {
            match action.action_type {
                ActionType::Deposit => {
                    let sub = Self::account_at(accounts, action.account_id)?;
                    let amount = Self::amount_of(action);
                    self.debit_wallet(action.other_address, action.primary_market_id, amount)?;
                    self.credit_account(sub, action.primary_market_id, amount);
                }
                ActionType::Withdraw => {
                    let sub = Self::account_at(accounts, action.account_id)?;
                    let amount = Self::amount_of(action);
                    self.debit_account(sub, action.primary_market_id, amount)?;
                    self.credit_wallet(action.other_address, action.primary_market_id, amount);
                }
                ActionType::Transfer => {
                    let from = Self::account_at(accounts, action.account_id)?;
                    let to = Self::account_at(accounts, action.other_account_id)?;
                    let amount = Self::amount_of(action);
                    self.debit_account(from, action.primary_market_id, amount)?;
                    self.credit_account(to, action.primary_market_id, amount);
                }
                ActionType::Call => {
                    self.call_log
                        .push((action.other_address, action.data.clone()));
                }
                ActionType::Trade | ActionType::Liquidate => unreachable!("rejected in validation"),
            }
        }

        Ok(())
    }
}

// Hook that always rejects. used to exercise the fallback custody path.
pub struct RejectingHook {
    failure: HookFailure,
}

impl RejectingHook {
    pub fn with_reason(reason: &str) -> Self {
        Self {
            failure: HookFailure::reasoned(reason),
        }
    }

    // assertion-style failure carrying no reason
    pub fn silent() -> Self {
        Self {
            failure: HookFailure::silent(),
        }
    }
}

impl DepositHook for RejectingHook {
    fn on_deposit(&mut self, _: SubAccount, _: MarketId, _: Wei) -> Result<(), HookFailure> {
        Err(self.failure.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountNumber;
    use rust_decimal::Decimal;

    fn sub(vault: u64, number: u32) -> SubAccount {
        SubAccount::new(Address(vault), AccountNumber(number))
    }

    fn wei(v: i64) -> Wei {
        Wei::new_unchecked(Decimal::from(v))
    }

    #[test]
    fn custody_transfers_round_trip() {
        let mut ledger = InMemoryLedger::new();
        let acct = sub(1, 123);
        let venue = Address(0xBB);

        ledger.credit_account(acct, MarketId(1), wei(1000));

        ledger.withdraw_to(acct, MarketId(1), wei(400), venue).unwrap();
        assert_eq!(ledger.balance(acct, MarketId(1)), wei(600));
        assert_eq!(ledger.wallet_balance(venue, MarketId(1)), wei(400));

        ledger.deposit_from(venue, acct, MarketId(1), wei(400)).unwrap();
        assert_eq!(ledger.balance(acct, MarketId(1)), wei(1000));
        assert_eq!(ledger.wallet_balance(venue, MarketId(1)), Wei::zero());
    }

    #[test]
    fn withdraw_rejects_insufficient_collateral() {
        let mut ledger = InMemoryLedger::new();
        let acct = sub(1, 123);

        ledger.credit_account(acct, MarketId(1), wei(100));

        let result = ledger.withdraw_to(acct, MarketId(1), wei(200), Address(0xBB));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientCollateral { .. })
        ));
        // untouched
        assert_eq!(ledger.balance(acct, MarketId(1)), wei(100));
    }

    #[test]
    fn execute_deposit_moves_wallet_funds_into_custody() {
        let mut ledger = InMemoryLedger::new();
        let acct = sub(1, 123);
        let trader = Address(0xAA);

        ledger.credit_wallet(trader, MarketId(2), wei(997));

        let actions = vec![ActionArgs::deposit(0, trader, MarketId(2), wei(997))];
        ledger.execute(&[acct], &actions).unwrap();

        assert_eq!(ledger.balance(acct, MarketId(2)), wei(997));
        assert_eq!(ledger.wallet_balance(trader, MarketId(2)), Wei::zero());
    }

    #[test]
    fn hook_failure_aborts_batch_before_balances_change() {
        let mut ledger = InMemoryLedger::new();
        let acct = sub(1, 123);
        let trader = Address(0xAA);

        ledger.credit_wallet(trader, MarketId(2), wei(997));
        ledger.install_hook(Address(1), Box::new(RejectingHook::with_reason("boom")));

        let actions = vec![ActionArgs::deposit(0, trader, MarketId(2), wei(997))];
        let result = ledger.execute(&[acct], &actions);

        assert!(matches!(
            result,
            Err(LedgerError::HookReverted { reason: Some(ref r) }) if r == "boom"
        ));
        assert_eq!(ledger.balance(acct, MarketId(2)), Wei::zero());
        assert_eq!(ledger.wallet_balance(trader, MarketId(2)), wei(997));
    }

    #[test]
    fn silent_hook_failure_carries_no_reason() {
        let mut ledger = InMemoryLedger::new();
        let acct = sub(1, 123);
        let trader = Address(0xAA);

        ledger.credit_wallet(trader, MarketId(2), wei(1));
        ledger.install_hook(Address(1), Box::new(RejectingHook::silent()));

        let actions = vec![ActionArgs::deposit(0, trader, MarketId(2), wei(1))];
        let result = ledger.execute(&[acct], &actions);

        assert_eq!(result, Err(LedgerError::HookReverted { reason: None }));
    }

    #[test]
    fn operate_rejects_frozen_sub_account() {
        let mut ledger = InMemoryLedger::new();
        let mut guard = FreezeGuard::new();
        let acct = sub(1, 123);

        ledger.credit_account(acct, MarketId(1), wei(1000));
        guard.freeze(acct);

        let actions = vec![ActionArgs::withdraw(0, Address(0xCC), MarketId(1), wei(10))];
        let result = ledger.operate(&[acct], &actions, &guard);

        assert_eq!(result, Err(LedgerError::AccountFrozen(acct)));
        assert_eq!(ledger.balance(acct, MarketId(1)), wei(1000));

        guard.clear(acct);
        ledger.operate(&[acct], &actions, &guard).unwrap();
        assert_eq!(ledger.balance(acct, MarketId(1)), wei(990));
    }

    #[test]
    fn trade_actions_unsupported() {
        let mut ledger = InMemoryLedger::new();
        let acct = sub(1, 123);

        let mut action = ActionArgs::deposit(0, Address(0xAA), MarketId(1), Wei::zero());
        action.action_type = ActionType::Trade;

        assert!(matches!(
            ledger.execute(&[acct], &[action]),
            Err(LedgerError::UnsupportedAction(ActionType::Trade))
        ));
    }

    #[test]
    fn call_actions_are_logged() {
        let mut ledger = InMemoryLedger::new();
        let acct = sub(1, 123);
        let target = Address(0xAA);

        let actions = vec![ActionArgs::call(0, target, vec![1, 2, 3])];
        ledger.execute(&[acct], &actions).unwrap();

        assert_eq!(ledger.calls(), &[(target, vec![1, 2, 3])]);
    }
}
