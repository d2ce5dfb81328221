// 9.x trader/: the settlement traders. base.rs carries the shared
// direction-parameterized state machine; unwrapper.rs and wrapper.rs are the
// redemption and minting fronts.

pub mod base;
pub mod unwrapper;
pub mod wrapper;

pub use base::{
    Direction, MarketPair, SettlementRequest, TraderBase, TraderError, TraderHandles,
};
pub use unwrapper::{UnwrapRequest, UnwrapperTrader};
pub use wrapper::{WrapRequest, WrapperTrader};
