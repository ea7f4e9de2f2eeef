//! Deterministic simulation harness for Parley.
//!
//! In-memory implementations of the Environment, broker, REST API and
//! Driver for deterministic, reproducible testing under reordering,
//! duplication and dropped sends.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! reconciliation invariants.
//!
//! # Model
//!
//! The `model` module tracks what the unread counters should be, given the
//! frames a client actually saw, so the real client can be compared against
//! it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_broker;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    ActiveRoomInRooms, ActiveRoomNotUnread, AttachmentMonotonicity, ClientSnapshot, Invariant,
    InvariantRegistry, InvariantResult, MessageStatusMonotonicity, NoDuplicateTokens,
    RoomSnapshot, SystemSnapshot, UnreadMatchesForeignArrivals, Violation,
};
pub use model::UnreadModel;
pub use sim_broker::{
    ConnectionId, FaultConfig, MemoryApi, SharedSimBroker, SimBroker, create_shared_broker,
};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
