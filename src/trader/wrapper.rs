// 11.0: minting trader. converts a plain asset into the external venue's
// yield-bearing token. owns the deposit half of the request registry.
// mirror image of the unwrapper: same base state machine, opposite pair.

use crate::actions::ActionArgs;
use crate::freeze::FreezeGuard;
use crate::ledger::Ledger;
use crate::payload::CallbackData;
use crate::registry::{PendingSettlement, RetainedSettlement};
use crate::types::{Address, MarketId, SettlementKey, SubAccount, Timestamp, Wei};
use crate::venue::{VenueQueue, VenueRegistry};

use super::base::{Direction, MarketPair, SettlementRequest, TraderBase, TraderError};

// A minting request: commit the plain asset, expect venue tokens back.
pub type WrapRequest = SettlementRequest;

pub struct WrapperTrader {
    base: TraderBase,
}

impl WrapperTrader {
    pub fn new(
        address: Address,
        owner: Address,
        input_token: Address,
        input_market: MarketId,
        venue_token: Address,
        venue_market: MarketId,
    ) -> Self {
        let pair = MarketPair {
            input_token,
            input_market,
            output_token: venue_token,
            output_market: venue_market,
        };
        Self {
            base: TraderBase::new(Direction::Wrap, address, owner, pair),
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

    // callable only by the owning vault. commits the plain asset to the
    // venue's mint queue and freezes the sub-account.
    pub fn initiate_wrapping(
        &mut self,
        caller: Address,
        request: WrapRequest,
        venue: &mut VenueQueue,
        ledger: &mut dyn Ledger,
        guard: &mut FreezeGuard,
        now: Timestamp,
    ) -> Result<SettlementKey, TraderError> {
        self.base.initiate(caller, request, venue, ledger, guard, now)
    }

    // handler-only. validates the reported minted amount against the floor
    // and forwards the venue tokens into the vault position.
    pub fn after_deposit_execution(
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

    // handler-only. returns the committed plain asset to the vault.
    // cancellation is keyed only; the executor payload is accepted for
    // callback-surface compatibility but never consulted.
    pub fn after_deposit_cancellation(
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

    pub fn create_actions_for_wrapping(
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
        self.base.pair().output_token
    }

    pub fn input_token(&self) -> Address {
        self.base.pair().input_token
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
