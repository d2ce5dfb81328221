// 10.0: redemption trader. converts the external venue's yield-bearing token
// back into a plain asset. owns the withdrawal half of the request registry.

use crate::actions::ActionArgs;
use crate::freeze::FreezeGuard;
use crate::ledger::Ledger;
use crate::payload::CallbackData;
use crate::registry::{PendingSettlement, RetainedSettlement};
use crate::types::{Address, MarketId, SettlementKey, SubAccount, Timestamp, Wei};
use crate::venue::{VenueQueue, VenueRegistry};

use super::base::{Direction, MarketPair, SettlementRequest, TraderBase, TraderError};

// A redemption request: commit venue tokens, expect the plain asset back.
pub type UnwrapRequest = SettlementRequest;

pub struct UnwrapperTrader {
    base: TraderBase,
}

impl UnwrapperTrader {
    pub fn new(
        address: Address,
        owner: Address,
        venue_token: Address,
        venue_market: MarketId,
        output_token: Address,
        output_market: MarketId,
    ) -> Self {
        let pair = MarketPair {
            input_token: venue_token,
            input_market: venue_market,
            output_token,
            output_market,
        };
        Self {
            base: TraderBase::new(Direction::Unwrap, address, owner, pair),
        }
    }

    pub fn initialize(
        &mut self,
        venue_registry: Address,
        native_asset: Address,
        ledger: Address,
    ) -> Result<(), TraderError> {
        self.base.initialize(venue_registry, native_asset, ledger)
    }

    // callable only by the owning vault. freezes the sub-account and returns
    // the venue-assigned settlement key.
    pub fn initiate_unwrapping(
        &mut self,
        caller: Address,
        request: UnwrapRequest,
        venue: &mut VenueQueue,
        ledger: &mut dyn Ledger,
        guard: &mut FreezeGuard,
        now: Timestamp,
    ) -> Result<SettlementKey, TraderError> {
        self.base.initiate(caller, request, venue, ledger, guard, now)
    }

    // handler-only. validates the reported redemption outcome and forwards
    // the proceeds into the vault position, retaining custody on a failed
    // forward.
    pub fn after_withdrawal_execution(
        &mut self,
        caller: Address,
        key: SettlementKey,
        data: &CallbackData,
        venue_registry: &VenueRegistry,
        ledger: &mut dyn Ledger,
        guard: &mut FreezeGuard,
        now: Timestamp,
    ) -> Result<(), TraderError> {
        self.base
            .process_execution(caller, key, data, venue_registry, ledger, guard, now)
    }

    // handler-only. returns the committed venue tokens to the vault.
    // cancellation is keyed only; the executor payload is accepted for
    // callback-surface compatibility but never consulted.
    pub fn after_withdrawal_cancellation(
        &mut self,
        caller: Address,
        key: SettlementKey,
        _data: &CallbackData,
        venue_registry: &VenueRegistry,
        venue: &VenueQueue,
        ledger: &mut dyn Ledger,
        guard: &mut FreezeGuard,
        now: Timestamp,
    ) -> Result<(), TraderError> {
        self.base
            .process_cancellation(caller, key, venue_registry, venue, ledger, guard, now)
    }

    pub fn create_actions_for_unwrapping(
        &self,
        key: SettlementKey,
        primary_market: MarketId,
        secondary_market: MarketId,
        amount: Wei,
    ) -> Result<Vec<ActionArgs>, TraderError> {
        self.base
            .create_actions(key, primary_market, secondary_market, amount)
    }

    pub fn get_exchange_cost(
        &self,
        input_token: Address,
        output_token: Address,
        desired_input_amount: Wei,
    ) -> Result<Wei, TraderError> {
        self.base
            .get_exchange_cost(input_token, output_token, desired_input_amount)
    }

    pub fn withdraw_native_asset(
        &mut self,
        caller: Address,
        receiver: Address,
        now: Timestamp,
    ) -> Result<Wei, TraderError> {
        self.base.withdraw_native_asset(caller, receiver, now)
    }

    pub fn sweep_retained(
        &mut self,
        caller: Address,
        key: SettlementKey,
        receiver: Address,
        ledger: &mut dyn Ledger,
        now: Timestamp,
    ) -> Result<Wei, TraderError> {
        self.base.sweep_retained(caller, key, receiver, ledger, now)
    }

    pub fn address(&self) -> Address {
        self.base.address()
    }

    pub fn venue_token(&self) -> Address {
        self.base.pair().input_token
    }

    pub fn output_token(&self) -> Address {
        self.base.pair().output_token
    }

    pub fn pending(&self, key: SettlementKey) -> Option<&PendingSettlement> {
        self.base.pending(key)
    }

    pub fn pending_count(&self) -> usize {
        self.base.pending_count()
    }

    pub fn pending_for(&self, sub: SubAccount) -> Option<&PendingSettlement> {
        self.base.pending_for(sub)
    }

    pub fn retained(&self, key: SettlementKey) -> Option<&RetainedSettlement> {
        self.base.retained(key)
    }

    pub fn fee_escrow(&self) -> Wei {
        self.base.fee_escrow()
    }

    pub fn events(&self) -> &[crate::events::Event] {
        self.base.events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::types::AccountNumber;
    use rust_decimal::Decimal;

    const VENUE_TOKEN: Address = Address(0xAE);
    const WETH: Address = Address(0xEE);
    const OWNER: Address = Address(0x01);
    const VAULT: Address = Address(0x07);

    fn wei(v: i64) -> Wei {
        Wei::new_unchecked(Decimal::from(v))
    }

    struct Fixture {
        trader: UnwrapperTrader,
        venue: VenueQueue,
        registry: VenueRegistry,
        ledger: InMemoryLedger,
        guard: FreezeGuard,
    }

    fn fixture() -> Fixture {
        let mut trader =
            UnwrapperTrader::new(Address(0xAA), OWNER, VENUE_TOKEN, MarketId(1), WETH, MarketId(2));
        trader
            .initialize(Address(0x10), Address(0x11), Address(0x12))
            .unwrap();

        let mut registry = VenueRegistry::new(Address(0x10), OWNER);
        registry.add_handler(OWNER, Address(0x42)).unwrap();

        let mut ledger = InMemoryLedger::new();
        ledger.credit_account(
            SubAccount::new(VAULT, AccountNumber(123)),
            MarketId(1),
            wei(1000),
        );

        Fixture {
            trader,
            venue: VenueQueue::new(Address(0xBB), Wei::zero()),
            registry,
            ledger,
            guard: FreezeGuard::new(),
        }
    }

    fn request() -> UnwrapRequest {
        UnwrapRequest {
            vault: VAULT,
            account_number: AccountNumber(123),
            input_amount: wei(1000),
            output_token: WETH,
            min_output_amount: wei(1),
            execution_fee: Wei::zero(),
        }
    }

    #[test]
    fn initiate_requires_the_owning_vault() {
        let mut f = fixture();

        let result = f.trader.initiate_unwrapping(
            Address(0x99),
            request(),
            &mut f.venue,
            &mut f.ledger,
            &mut f.guard,
            Timestamp::from_millis(0),
        );

        assert!(matches!(result, Err(TraderError::CallerNotVault { .. })));
    }

    #[test]
    fn initiate_rejects_foreign_output_token() {
        let mut f = fixture();
        let mut req = request();
        req.output_token = Address(0xFF);

        let result = f.trader.initiate_unwrapping(
            VAULT,
            req,
            &mut f.venue,
            &mut f.ledger,
            &mut f.guard,
            Timestamp::from_millis(0),
        );

        assert_eq!(result, Err(TraderError::InvalidOutputToken(Address(0xFF))));
    }

    #[test]
    fn initiate_rejects_zero_amounts() {
        let mut f = fixture();

        let mut req = request();
        req.input_amount = Wei::zero();
        assert_eq!(
            f.trader.initiate_unwrapping(
                VAULT,
                req,
                &mut f.venue,
                &mut f.ledger,
                &mut f.guard,
                Timestamp::from_millis(0),
            ),
            Err(TraderError::InvalidInputAmount)
        );

        let mut req = request();
        req.min_output_amount = Wei::zero();
        assert_eq!(
            f.trader.initiate_unwrapping(
                VAULT,
                req,
                &mut f.venue,
                &mut f.ledger,
                &mut f.guard,
                Timestamp::from_millis(0),
            ),
            Err(TraderError::InvalidMinOutputAmount)
        );
    }

    #[test]
    fn initiate_enforces_the_venue_fee_floor() {
        let mut f = fixture();
        f.venue = VenueQueue::new(Address(0xBB), wei(5));

        let result = f.trader.initiate_unwrapping(
            VAULT,
            request(),
            &mut f.venue,
            &mut f.ledger,
            &mut f.guard,
            Timestamp::from_millis(0),
        );

        assert_eq!(
            result,
            Err(TraderError::InsufficientExecutionFee {
                provided: Wei::zero(),
                required: wei(5),
            })
        );
    }

    #[test]
    fn initiate_moves_collateral_and_freezes() {
        let mut f = fixture();
        let sub = SubAccount::new(VAULT, AccountNumber(123));

        let key = f
            .trader
            .initiate_unwrapping(
                VAULT,
                request(),
                &mut f.venue,
                &mut f.ledger,
                &mut f.guard,
                Timestamp::from_millis(0),
            )
            .unwrap();

        assert!(f.guard.is_frozen(sub));
        assert_eq!(f.ledger.balance(sub, MarketId(1)), Wei::zero());
        assert_eq!(f.ledger.wallet_balance(f.venue.address, MarketId(1)), wei(1000));
        assert_eq!(f.venue.get(key).unwrap().amount, wei(1000));
        assert!(f.trader.pending(key).is_some());
    }

    #[test]
    fn second_request_on_frozen_account_fails() {
        let mut f = fixture();
        let sub = SubAccount::new(VAULT, AccountNumber(123));
        f.ledger.credit_account(sub, MarketId(1), wei(1000));

        f.trader
            .initiate_unwrapping(
                VAULT,
                request(),
                &mut f.venue,
                &mut f.ledger,
                &mut f.guard,
                Timestamp::from_millis(0),
            )
            .unwrap();

        let result = f.trader.initiate_unwrapping(
            VAULT,
            request(),
            &mut f.venue,
            &mut f.ledger,
            &mut f.guard,
            Timestamp::from_millis(1),
        );

        assert_eq!(result, Err(TraderError::AccountAlreadyFrozen(sub)));
    }

    #[test]
    fn cancellation_returns_the_committed_tokens() {
        let mut f = fixture();
        let sub = SubAccount::new(VAULT, AccountNumber(123));

        let key = f
            .trader
            .initiate_unwrapping(
                VAULT,
                request(),
                &mut f.venue,
                &mut f.ledger,
                &mut f.guard,
                Timestamp::from_millis(0),
            )
            .unwrap();

        f.trader
            .after_withdrawal_cancellation(
                Address(0x42),
                key,
                &CallbackData::new(),
                &f.registry,
                &f.venue,
                &mut f.ledger,
                &mut f.guard,
                Timestamp::from_millis(1),
            )
            .unwrap();

        assert!(!f.guard.is_frozen(sub));
        assert_eq!(f.ledger.balance(sub, MarketId(1)), wei(1000));
        assert!(f.trader.pending(key).is_none());
    }

    #[test]
    fn exchange_cost_is_unavailable() {
        let f = fixture();
        assert_eq!(
            f.trader.get_exchange_cost(VENUE_TOKEN, WETH, wei(10)),
            Err(TraderError::SynchronousCostUnavailable)
        );
    }

    #[test]
    fn create_actions_validates_market_pair() {
        let mut f = fixture();
        let key = f
            .trader
            .initiate_unwrapping(
                VAULT,
                request(),
                &mut f.venue,
                &mut f.ledger,
                &mut f.guard,
                Timestamp::from_millis(0),
            )
            .unwrap();

        // swapped markets
        let result =
            f.trader
                .create_actions_for_unwrapping(key, MarketId(1), MarketId(2), wei(1));
        assert!(matches!(result, Err(TraderError::InvalidMarketPair { .. })));

        // nothing settled yet, any positive amount exceeds it
        let result =
            f.trader
                .create_actions_for_unwrapping(key, MarketId(2), MarketId(1), wei(1));
        assert!(matches!(
            result,
            Err(TraderError::AmountExceedsSettled { .. })
        ));
    }
}
