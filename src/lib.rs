// vault-settlement: async mint/redeem settlement core for isolated-margin vaults.
// safety-first architecture: account freezing and fallback custody take priority.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Address, MarketId, SubAccount, SettlementKey, Wei
//   2.x  freeze.rs: per-sub-account freeze flags
//   3.x  registry.rs: pending settlement records, register/consume lifecycle
//   4.x  payload.rs: untrusted named-item callback payload
//   5.x  actions.rs: host-ledger trade-action primitives + forward batch builder
//   6.x  ledger.rs: host ledger collaborator, in-memory impl, deposit hooks
//   7.x  venue.rs: handler allow-list registry + venue request queue (mocked)
//   8.x  events.rs: state transition events for audit
//   9.x  trader/: shared settlement state machine (base) + directional fronts
//   10.x trader/unwrapper.rs: redemption trader (venue token -> plain asset)
//   11.x trader/wrapper.rs: minting trader (plain asset -> venue token)

// bookkeeping modules
pub mod freeze;
pub mod registry;
pub mod types;

// callback and ledger interface modules
pub mod actions;
pub mod ledger;
pub mod payload;

// collaborators and audit
pub mod events;
pub mod venue;

// the traders
pub mod trader;

// re exports for convenience
pub use actions::*;
pub use events::*;
pub use freeze::*;
pub use ledger::*;
pub use payload::*;
pub use registry::*;
pub use trader::*;
pub use types::*;
pub use venue::*;
