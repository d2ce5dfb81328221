// 7.0: external venue collaborators. the registry tracks which addresses are
// authorized to deliver settlement callbacks; the queue models the venue's
// async request intake: it assigns settlement keys and collects execution fees.
// actual mint/redeem execution happens off-chain and arrives via callbacks.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::{Address, SettlementKey, Timestamp, Wei};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    #[error("Caller {0} is not the venue registry owner")]
    NotRegistryOwner(Address),
}

// Owner-managed allow-list of executor addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueRegistry {
    pub id: Address,
    owner: Address,
    handlers: HashSet<Address>,
}

impl VenueRegistry {
    pub fn new(id: Address, owner: Address) -> Self {
        Self {
            id,
            owner,
            handlers: HashSet::new(),
        }
    }

    pub fn is_handler(&self, caller: Address) -> bool {
        self.handlers.contains(&caller)
    }

    pub fn add_handler(&mut self, caller: Address, handler: Address) -> Result<(), VenueError> {
        if caller != self.owner {
            return Err(VenueError::NotRegistryOwner(caller));
        }
        self.handlers.insert(handler);
        Ok(())
    }

    pub fn remove_handler(&mut self, caller: Address, handler: Address) -> Result<(), VenueError> {
        if caller != self.owner {
            return Err(VenueError::NotRegistryOwner(caller));
        }
        self.handlers.remove(&handler);
        Ok(())
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestDirection {
    // venue token -> plain asset
    Withdrawal,
    // plain asset -> venue token
    Deposit,
}

// What the venue knows about a submitted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub key: SettlementKey,
    pub direction: RequestDirection,
    pub token: Address,
    pub amount: Wei,
    pub fee_paid: Wei,
    pub submitted_at: Timestamp,
}

// Mock request queue. assigns monotonically increasing keys; the executor
// resolves entries out-of-band and then drives the trader callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueQueue {
    pub address: Address,
    min_execution_fee: Wei,
    next_key: u128,
    pending: HashMap<SettlementKey, QueuedRequest>,
}

impl VenueQueue {
    pub fn new(address: Address, min_execution_fee: Wei) -> Self {
        Self {
            address,
            min_execution_fee,
            next_key: 1,
            pending: HashMap::new(),
        }
    }

    pub fn min_execution_fee(&self) -> Wei {
        self.min_execution_fee
    }

    // accepts a request and assigns a fresh key
    pub fn submit(
        &mut self,
        direction: RequestDirection,
        token: Address,
        amount: Wei,
        fee_paid: Wei,
        submitted_at: Timestamp,
    ) -> SettlementKey {
        let key = SettlementKey(self.next_key);
        self.next_key += 1;

        self.pending.insert(
            key,
            QueuedRequest {
                key,
                direction,
                token,
                amount,
                fee_paid,
                submitted_at,
            },
        );
        key
    }

    // executor takes a request off the queue to fulfill or cancel it
    pub fn resolve(&mut self, key: SettlementKey) -> Option<QueuedRequest> {
        self.pending.remove(&key)
    }

    pub fn get(&self, key: SettlementKey) -> Option<&QueuedRequest> {
        self.pending.get(&key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn handler_management_is_owner_gated() {
        let owner = Address(1);
        let stranger = Address(2);
        let handler = Address(3);
        let mut registry = VenueRegistry::new(Address(100), owner);

        assert!(matches!(
            registry.add_handler(stranger, handler),
            Err(VenueError::NotRegistryOwner(_))
        ));
        assert!(!registry.is_handler(handler));

        registry.add_handler(owner, handler).unwrap();
        assert!(registry.is_handler(handler));

        registry.remove_handler(owner, handler).unwrap();
        assert!(!registry.is_handler(handler));
    }

    #[test]
    fn queue_assigns_unique_keys() {
        let mut queue = VenueQueue::new(Address(0xBB), Wei::zero());

        let k1 = queue.submit(
            RequestDirection::Withdrawal,
            Address(0xEE),
            Wei::new_unchecked(dec!(10)),
            Wei::zero(),
            Timestamp::from_millis(0),
        );
        let k2 = queue.submit(
            RequestDirection::Deposit,
            Address(0xEE),
            Wei::new_unchecked(dec!(20)),
            Wei::zero(),
            Timestamp::from_millis(0),
        );

        assert_ne!(k1, k2);
        assert_eq!(queue.pending_count(), 2);
    }

    #[test]
    fn resolve_removes_request() {
        let mut queue = VenueQueue::new(Address(0xBB), Wei::zero());

        let key = queue.submit(
            RequestDirection::Withdrawal,
            Address(0xEE),
            Wei::new_unchecked(dec!(10)),
            Wei::zero(),
            Timestamp::from_millis(0),
        );

        let request = queue.resolve(key).unwrap();
        assert_eq!(request.amount.value(), dec!(10));
        assert!(queue.resolve(key).is_none());
    }
}
