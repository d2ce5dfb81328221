// 8.0: every settlement state transition produces an event. used for audit
// trails, off-chain indexing, and notifying the executor infrastructure.
// the EventPayload enum lists all event types.

use crate::types::{AccountNumber, Address, SettlementKey, Timestamp, Wei};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Request creation
    UnwrappingInitiated(RequestInitiatedEvent),
    WrappingInitiated(RequestInitiatedEvent),

    // Terminal transitions
    WithdrawalSettled(SettledEvent),
    DepositSettled(SettledEvent),
    WithdrawalCancelled(CancelledEvent),
    DepositCancelled(CancelledEvent),
    SettlementForwardFailed(ForwardFailedEvent),

    // Fee custody
    NativeAssetWithdrawn(NativeAssetWithdrawnEvent),
    RetainedSwept(RetainedSweptEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestInitiatedEvent {
    pub key: SettlementKey,
    pub vault: Address,
    pub account_number: AccountNumber,
    pub input_amount: Wei,
    pub output_token: Address,
    pub min_output_amount: Wei,
    pub execution_fee: Wei,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettledEvent {
    pub key: SettlementKey,
    pub vault: Address,
    pub account_number: AccountNumber,
    pub output_token: Address,
    pub output_amount: Wei,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledEvent {
    pub key: SettlementKey,
    pub vault: Address,
    pub account_number: AccountNumber,
    pub refunded_amount: Wei,
}

// Settled proceeds could not be forwarded into the vault position.
// the trader keeps custody; reason is empty for silent failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardFailedEvent {
    pub key: SettlementKey,
    pub vault: Address,
    pub account_number: AccountNumber,
    pub token: Address,
    pub amount: Wei,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeAssetWithdrawnEvent {
    pub receiver: Address,
    pub amount: Wei,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetainedSweptEvent {
    pub key: SettlementKey,
    pub receiver: Address,
    pub token: Address,
    pub amount: Wei,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn record(&mut self, timestamp: Timestamp, payload: EventPayload) {
        let id = self.next_id();
        self.events.push(Event::new(id, timestamp, payload));
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}
