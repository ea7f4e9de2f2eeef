//! Client
//!
//! Action-based client state machine for Parley chat rooms. Keeps an ordered
//! log per room, merges optimistic sends with the broker's echoes by
//! correlation token, and tracks unread counts for rooms that are not open.
//!
//! # Architecture
//!
//! The client follows the Sans-IO pattern of [`parley_core`]. It receives
//! events ([`ClientEvent`]), processes them through pure state machine logic,
//! and returns actions ([`ClientAction`]) for the caller to execute.
//!
//! # Components
//!
//! - [`Client`]: Top-level state machine managing multiple rooms
//! - [`ClientEvent`]: Events fed into the client
//! - [`ClientAction`]: Actions produced by the client
//! - [`ChatApi`]: REST collaborator (history fetch, unread update)
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::connect`]: WebSocket connection to the broker
//! - [`rest::HttpChatApi`]: [`ChatApi`] over HTTP

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod client;
mod config;
mod error;
mod event;

#[cfg(feature = "transport")]
pub mod rest;
#[cfg(feature = "transport")]
pub mod transport;

pub use api::{ApiError, ChatApi};
pub use client::{Client, ClientIdentity, MAX_HELD_ATTACHMENT_REPORTS};
pub use config::{ClientConfig, DEFAULT_HISTORY_PAGE_SIZE};
pub use error::ClientError;
pub use event::{AttachmentDraft, ClientAction, ClientEvent};
pub use parley_core::{RoomId, UniqueId, UserId, env::Environment};
