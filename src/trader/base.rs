// 9.0: shared trader plumbing for both settlement directions. one-time
// initialization, handler/owner authorization, execution-fee custody, and the
// direction-parameterized request state machine:
//
//   NONE -> PENDING -> { SETTLED | CANCELLED | FAILED_RETAINED }
//
// the wrapper and unwrapper fronts only pick the direction and the
// entrypoint names; everything below is common to both.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::actions::{forward_actions, ActionArgs};
use crate::events::{
    CancelledEvent, EventCollector, EventPayload, ForwardFailedEvent, NativeAssetWithdrawnEvent,
    RequestInitiatedEvent, RetainedSweptEvent, SettledEvent,
};
use crate::freeze::FreezeGuard;
use crate::ledger::{Ledger, LedgerError};
use crate::payload::{
    CallbackData, PayloadError, OUTPUT_AMOUNT_KEY, OUTPUT_TOKEN_KEY, SECONDARY_OUTPUT_AMOUNT_KEY,
    SECONDARY_OUTPUT_TOKEN_KEY,
};
use crate::registry::{
    PendingSettlement, RegistryError, RequestRegistry, RetainedSettlement,
};
use crate::types::{AccountNumber, Address, MarketId, SettlementKey, SubAccount, Timestamp, Wei};
use crate::venue::{RequestDirection, VenueQueue, VenueRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    // plain asset -> venue token (minting)
    Wrap,
    // venue token -> plain asset (redemption)
    Unwrap,
}

impl Direction {
    pub fn request_direction(&self) -> RequestDirection {
        match self {
            Direction::Wrap => RequestDirection::Deposit,
            Direction::Unwrap => RequestDirection::Withdrawal,
        }
    }
}

// The trader's fixed token/market pair. input is what a request commits,
// output is what a validated execution delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPair {
    pub input_token: Address,
    pub input_market: MarketId,
    pub output_token: Address,
    pub output_market: MarketId,
}

// Collaborator identities bound at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraderHandles {
    pub venue_registry: Address,
    pub native_asset: Address,
    pub ledger: Address,
}

// A request as supplied by the owning vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub vault: Address,
    pub account_number: AccountNumber,
    pub input_amount: Wei,
    pub output_token: Address,
    pub min_output_amount: Wei,
    pub execution_fee: Wei,
}

impl SettlementRequest {
    pub fn sub_account(&self) -> SubAccount {
        SubAccount::new(self.vault, self.account_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraderError {
    #[error("Trader is not initialized")]
    NotInitialized,

    #[error("Trader is already initialized")]
    AlreadyInitialized,

    #[error("Caller {0} is not an authorized handler")]
    UnauthorizedCaller(Address),

    #[error("Caller {caller} is not the owning vault {vault}")]
    CallerNotVault { caller: Address, vault: Address },

    #[error("Caller {0} is not the trader owner")]
    NotOwner(Address),

    #[error("Input amount must be positive")]
    InvalidInputAmount,

    #[error("Minimum output amount must be positive")]
    InvalidMinOutputAmount,

    #[error("Token {0} is not the trader's output token")]
    InvalidOutputToken(Address),

    #[error("Execution fee {provided} below venue minimum {required}")]
    InsufficientExecutionFee { provided: Wei, required: Wei },

    #[error("Sub-account {0} already has an outstanding request")]
    AccountAlreadyFrozen(SubAccount),

    #[error("Duplicate settlement key {0}")]
    DuplicateKey(SettlementKey),

    #[error("Settlement key {0} is unknown or already consumed")]
    UnknownOrReplayedKey(SettlementKey),

    #[error("Settlement key {0} was not created through this trader")]
    InvalidOrForeignKey(SettlementKey),

    #[error("Settlement reported more than one non-zero output")]
    MultiTokenSettlementUnsupported,

    #[error("Reported output token {reported} does not match requested {expected}")]
    UnexpectedOutputToken { expected: Address, reported: Address },

    #[error("Reported output {reported} below minimum {minimum}")]
    SlippageExceeded { minimum: Wei, reported: Wei },

    #[error("Market pair ({primary:?}, {secondary:?}) does not match the trader's pair")]
    InvalidMarketPair {
        primary: MarketId,
        secondary: MarketId,
    },

    #[error("Requested {requested} exceeds settled amount {settled}")]
    AmountExceedsSettled { requested: Wei, settled: Wei },

    #[error("Exchange cost is unknowable before asynchronous execution")]
    SynchronousCostUnavailable,

    #[error("No retained settlement for key {0}")]
    NoRetainedBalance(SettlementKey),

    #[error("Callback payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

pub struct TraderBase {
    direction: Direction,
    // the trader's own on-chain identity; retained proceeds sit in its wallet
    address: Address,
    owner: Address,
    pair: MarketPair,
    handles: Option<TraderHandles>,
    registry: RequestRegistry,
    retained: HashMap<SettlementKey, RetainedSettlement>,
    fee_escrow: Wei,
    events: EventCollector,
}

impl TraderBase {
    pub fn new(direction: Direction, address: Address, owner: Address, pair: MarketPair) -> Self {
        Self {
            direction,
            address,
            owner,
            pair,
            handles: None,
            registry: RequestRegistry::new(),
            retained: HashMap::new(),
            fee_escrow: Wei::zero(),
            events: EventCollector::new(),
        }
    }

    // one-time setup binding the collaborator identities
    pub fn initialize(
        &mut self,
        venue_registry: Address,
        native_asset: Address,
        ledger: Address,
    ) -> Result<(), TraderError> {
        if self.handles.is_some() {
            return Err(TraderError::AlreadyInitialized);
        }
        self.handles = Some(TraderHandles {
            venue_registry,
            native_asset,
            ledger,
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.handles.is_some()
    }

    pub fn handles(&self) -> Result<TraderHandles, TraderError> {
        self.handles.ok_or(TraderError::NotInitialized)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pair(&self) -> MarketPair {
        self.pair
    }

    pub fn fee_escrow(&self) -> Wei {
        self.fee_escrow
    }

    pub fn events(&self) -> &[crate::events::Event] {
        self.events.events()
    }

    pub fn pending(&self, key: SettlementKey) -> Option<&PendingSettlement> {
        self.registry.get(key)
    }

    pub fn pending_count(&self) -> usize {
        self.registry.pending_count()
    }

    pub fn pending_for(&self, sub: SubAccount) -> Option<&PendingSettlement> {
        self.registry.pending_for(sub)
    }

    pub fn retained(&self, key: SettlementKey) -> Option<&RetainedSettlement> {
        self.retained.get(&key)
    }

    pub fn retained_count(&self) -> usize {
        self.retained.len()
    }

    fn assert_handler(&self, caller: Address, registry: &VenueRegistry) -> Result<(), TraderError> {
        if !registry.is_handler(caller) {
            return Err(TraderError::UnauthorizedCaller(caller));
        }
        Ok(())
    }

    fn assert_owner(&self, caller: Address) -> Result<(), TraderError> {
        if caller != self.owner {
            return Err(TraderError::NotOwner(caller));
        }
        Ok(())
    }

    // 9.1: request creation. commits the input asset to the venue queue,
    // registers the pending record, and freezes the sub-account.
    pub fn initiate(
        &mut self,
        caller: Address,
        request: SettlementRequest,
        venue: &mut VenueQueue,
        ledger: &mut dyn Ledger,
        guard: &mut FreezeGuard,
        now: Timestamp,
    ) -> Result<SettlementKey, TraderError> {
        self.handles()?;

        if caller != request.vault {
            return Err(TraderError::CallerNotVault {
                caller,
                vault: request.vault,
            });
        }
        if request.input_amount.is_zero() {
            return Err(TraderError::InvalidInputAmount);
        }
        if request.min_output_amount.is_zero() {
            return Err(TraderError::InvalidMinOutputAmount);
        }
        if request.output_token != self.pair.output_token {
            return Err(TraderError::InvalidOutputToken(request.output_token));
        }
        if request.execution_fee < venue.min_execution_fee() {
            return Err(TraderError::InsufficientExecutionFee {
                provided: request.execution_fee,
                required: venue.min_execution_fee(),
            });
        }

        let sub = request.sub_account();
        if guard.is_frozen(sub) {
            return Err(TraderError::AccountAlreadyFrozen(sub));
        }

        // move the committed asset out of the vault's custody into the
        // venue's request queue before registering anything
        ledger.withdraw_to(sub, self.pair.input_market, request.input_amount, venue.address)?;

        let key = venue.submit(
            self.direction.request_direction(),
            self.pair.input_token,
            request.input_amount,
            request.execution_fee,
            now,
        );

        let record = PendingSettlement::new(
            key,
            sub,
            request.input_amount,
            request.output_token,
            request.min_output_amount,
            now,
        );
        self.registry
            .register(guard, record)
            .map_err(|e| match e {
                RegistryError::DuplicateKey(k) => TraderError::DuplicateKey(k),
                RegistryError::AccountAlreadyFrozen(s) => TraderError::AccountAlreadyFrozen(s),
                RegistryError::UnknownKey(k) => TraderError::UnknownOrReplayedKey(k),
            })?;

        self.fee_escrow = self.fee_escrow.add(request.execution_fee);

        let initiated = RequestInitiatedEvent {
            key,
            vault: request.vault,
            account_number: request.account_number,
            input_amount: request.input_amount,
            output_token: request.output_token,
            min_output_amount: request.min_output_amount,
            execution_fee: request.execution_fee,
        };
        let payload = match self.direction {
            Direction::Wrap => EventPayload::WrappingInitiated(initiated),
            Direction::Unwrap => EventPayload::UnwrappingInitiated(initiated),
        };
        self.events.record(now, payload);

        Ok(key)
    }

    // 9.2: callback validation against the PENDING record. does not consume:
    // a failed validation must leave the record intact for the venue's own
    // retry or cancellation path.
    fn validate_execution(
        record: &PendingSettlement,
        data: &CallbackData,
    ) -> Result<Wei, TraderError> {
        let primary_token = data.address_named(0, OUTPUT_TOKEN_KEY)?;
        let primary_amount = data.uint_named(0, OUTPUT_AMOUNT_KEY)?;
        let secondary_amount = data
            .uint_named_opt(1, SECONDARY_OUTPUT_AMOUNT_KEY)?
            .unwrap_or_else(Wei::zero);

        if !primary_amount.is_zero() && !secondary_amount.is_zero() {
            // the secondary slot name must still be well-formed before we
            // report the semantic failure
            data.address_named(1, SECONDARY_OUTPUT_TOKEN_KEY)?;
            return Err(TraderError::MultiTokenSettlementUnsupported);
        }

        let (reported_token, reported_amount) = if !secondary_amount.is_zero() {
            let secondary_token = data.address_named(1, SECONDARY_OUTPUT_TOKEN_KEY)?;
            (secondary_token, secondary_amount)
        } else {
            (primary_token, primary_amount)
        };

        if reported_token != record.output_token {
            return Err(TraderError::UnexpectedOutputToken {
                expected: record.output_token,
                reported: reported_token,
            });
        }
        if reported_amount < record.min_output_amount {
            return Err(TraderError::SlippageExceeded {
                minimum: record.min_output_amount,
                reported: reported_amount,
            });
        }

        Ok(reported_amount)
    }

    // 9.3: execution callback. validates the untrusted payload, takes custody
    // of the venue payout, and forwards it into the vault position. a forward
    // revert is the one locally-recovered failure: proceeds stay in the
    // trader wallet, the freeze clears, and the account is usable again.
    pub fn process_execution(
        &mut self,
        caller: Address,
        key: SettlementKey,
        data: &CallbackData,
        venue_registry: &VenueRegistry,
        ledger: &mut dyn Ledger,
        guard: &mut FreezeGuard,
        now: Timestamp,
    ) -> Result<(), TraderError> {
        self.handles()?;
        self.assert_handler(caller, venue_registry)?;

        let record = self
            .registry
            .get(key)
            .ok_or(TraderError::UnknownOrReplayedKey(key))?
            .clone();

        let settled = Self::validate_execution(&record, data)?;

        // every check passed: stamp the record and take custody of the payout
        self.registry
            .mark_settled(key, settled)
            .map_err(|_| TraderError::UnknownOrReplayedKey(key))?;
        ledger.credit_wallet(self.address, self.pair.output_market, settled);

        let sub = record.sub_account();
        let actions = self.create_actions(
            key,
            self.pair.output_market,
            self.pair.input_market,
            settled,
        )?;

        match ledger.execute(&[sub], &actions) {
            Ok(()) => {
                self.registry
                    .consume(key)
                    .map_err(|_| TraderError::UnknownOrReplayedKey(key))?;
                guard.clear(sub);

                let settled_event = SettledEvent {
                    key,
                    vault: record.vault,
                    account_number: record.account_number,
                    output_token: record.output_token,
                    output_amount: settled,
                };
                let payload = match self.direction {
                    Direction::Wrap => EventPayload::DepositSettled(settled_event),
                    Direction::Unwrap => EventPayload::WithdrawalSettled(settled_event),
                };
                self.events.record(now, payload);
                Ok(())
            }
            Err(failure) => {
                self.retain_custody(key, &record, settled, failure, guard, now);
                Ok(())
            }
        }
    }

    // fallback custody: never leave the account frozen or the funds stranded
    // because a user-supplied hook misbehaved
    fn retain_custody(
        &mut self,
        key: SettlementKey,
        record: &PendingSettlement,
        settled: Wei,
        failure: LedgerError,
        guard: &mut FreezeGuard,
        now: Timestamp,
    ) {
        let reason = match failure {
            LedgerError::HookReverted { reason } => reason,
            other => Some(other.to_string()),
        };
        let reason = reason.unwrap_or_default();

        let _ = self.registry.consume(key);
        guard.clear(record.sub_account());

        self.retained.insert(
            key,
            RetainedSettlement {
                key,
                vault: record.vault,
                account_number: record.account_number,
                token: self.pair.output_token,
                amount: settled,
                reason: reason.clone(),
            },
        );

        self.events.record(
            now,
            EventPayload::SettlementForwardFailed(ForwardFailedEvent {
                key,
                vault: record.vault,
                account_number: record.account_number,
                token: self.pair.output_token,
                amount: settled,
                reason,
            }),
        );
    }

    // 9.4: cancellation callback. the venue could not fulfill the request;
    // the originally committed amount goes back to the vault's custody.
    pub fn process_cancellation(
        &mut self,
        caller: Address,
        key: SettlementKey,
        venue_registry: &VenueRegistry,
        venue: &VenueQueue,
        ledger: &mut dyn Ledger,
        guard: &mut FreezeGuard,
        now: Timestamp,
    ) -> Result<(), TraderError> {
        self.handles()?;
        self.assert_handler(caller, venue_registry)?;

        let record = self
            .registry
            .get(key)
            .ok_or(TraderError::InvalidOrForeignKey(key))?
            .clone();

        let sub = record.sub_account();
        ledger.deposit_from(venue.address, sub, self.pair.input_market, record.input_amount)?;

        self.registry
            .consume(key)
            .map_err(|_| TraderError::InvalidOrForeignKey(key))?;
        guard.clear(sub);

        let cancelled = CancelledEvent {
            key,
            vault: record.vault,
            account_number: record.account_number,
            refunded_amount: record.input_amount,
        };
        let payload = match self.direction {
            Direction::Wrap => EventPayload::DepositCancelled(cancelled),
            Direction::Unwrap => EventPayload::WithdrawalCancelled(cancelled),
        };
        self.events.record(now, payload);

        Ok(())
    }

    // 9.5: read-only action builder for the ledger's operate batch. the only
    // place the trader's market pair is checked.
    pub fn create_actions(
        &self,
        key: SettlementKey,
        primary_market: MarketId,
        secondary_market: MarketId,
        amount: Wei,
    ) -> Result<Vec<ActionArgs>, TraderError> {
        self.handles()?;

        if primary_market != self.pair.output_market || secondary_market != self.pair.input_market {
            return Err(TraderError::InvalidMarketPair {
                primary: primary_market,
                secondary: secondary_market,
            });
        }

        let record = self
            .registry
            .get(key)
            .ok_or(TraderError::UnknownOrReplayedKey(key))?;
        if amount > record.output_amount {
            return Err(TraderError::AmountExceedsSettled {
                requested: amount,
                settled: record.output_amount,
            });
        }

        Ok(forward_actions(
            self.address,
            0,
            primary_market,
            amount,
            key,
        ))
    }

    // settlement cost is unknowable before async execution
    pub fn get_exchange_cost(
        &self,
        _input_token: Address,
        _output_token: Address,
        _desired_input_amount: Wei,
    ) -> Result<Wei, TraderError> {
        Err(TraderError::SynchronousCostUnavailable)
    }

    // owner-only sweep of accumulated execution-fee refunds
    pub fn withdraw_native_asset(
        &mut self,
        caller: Address,
        receiver: Address,
        now: Timestamp,
    ) -> Result<Wei, TraderError> {
        self.assert_owner(caller)?;

        let amount = self.fee_escrow;
        self.fee_escrow = Wei::zero();

        self.events.record(
            now,
            EventPayload::NativeAssetWithdrawn(NativeAssetWithdrawnEvent { receiver, amount }),
        );

        Ok(amount)
    }

    // owner-only release of fallback-retained proceeds. out-of-band recovery,
    // deliberately outside the automatic state machine.
    pub fn sweep_retained(
        &mut self,
        caller: Address,
        key: SettlementKey,
        receiver: Address,
        ledger: &mut dyn Ledger,
        now: Timestamp,
    ) -> Result<Wei, TraderError> {
        self.assert_owner(caller)?;

        let retained = self
            .retained
            .get(&key)
            .ok_or(TraderError::NoRetainedBalance(key))?
            .clone();

        ledger.wallet_transfer(
            self.address,
            receiver,
            self.pair.output_market,
            retained.amount,
        )?;
        self.retained.remove(&key);

        self.events.record(
            now,
            EventPayload::RetainedSwept(RetainedSweptEvent {
                key,
                receiver,
                token: retained.token,
                amount: retained.amount,
            }),
        );

        Ok(retained.amount)
    }
}
