// 2.0: per-sub-account freeze flags. a frozen sub-account has exactly one
// outstanding settlement request and must reject every other margin operation
// until the request reaches a terminal state.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::SubAccount;

// Mutated only by the trader components. the ledger consults it read-only.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FreezeGuard {
    frozen: HashSet<SubAccount>,
}

impl FreezeGuard {
    pub fn new() -> Self {
        Self {
            frozen: HashSet::new(),
        }
    }

    pub fn is_frozen(&self, sub: SubAccount) -> bool {
        self.frozen.contains(&sub)
    }

    // returns false if the sub-account was already frozen
    pub fn freeze(&mut self, sub: SubAccount) -> bool {
        self.frozen.insert(sub)
    }

    pub fn clear(&mut self, sub: SubAccount) -> bool {
        self.frozen.remove(&sub)
    }

    pub fn frozen_count(&self) -> usize {
        self.frozen.len()
    }
}
