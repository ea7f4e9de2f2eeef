//! Application layer for Parley
//!
//! Pure state machines and generic runtime for the chat UI, enabling
//! deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`App`]: UI state machine (connection, room list, active room, toasts)
//! - [`Command`]: Parser for the line-oriented input
//! - [`Bridge`]: Protocol bridge (translates App actions to Client events)
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod command;
mod config;
mod driver;
mod event;
mod request;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::App;
pub use bridge::Bridge;
pub use command::{Command, CommandError};
pub use config::{AppConfig, MAX_TOASTS, TOAST_TTL};
pub use driver::{Driver, Inbound};
pub use event::AppEvent;
pub use request::{ApiRequest, ApiResponse};
pub use runtime::Runtime;
pub use state::{ConnectionState, RoomView, Toast};
