//! Parley core
//!
//! Domain model and reconciliation logic for an optimistic chat client. Pure,
//! Sans-IO code: no networking, no clocks, no randomness except through the
//! [`env::Environment`] trait.
//!
//! # Components
//!
//! - [`Message`], [`Attachment`]: chat entries and their upload state
//! - [`MessageLog`]: per-room ordered log that merges optimistic entries with
//!   server echoes by correlation token
//! - [`RoomSummary`]: room list entry with last message and unread count
//! - [`env::Environment`]: time and randomness abstraction

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
mod ids;
mod log;
mod model;
mod summary;

pub use error::LogError;
pub use ids::{RoomId, UniqueId, UserId};
pub use log::{AttachmentChange, MessageLog, Reconciled};
pub use model::{Attachment, AttachmentStatus, AttachmentUpdate, Message, MessageStatus};
pub use summary::RoomSummary;
