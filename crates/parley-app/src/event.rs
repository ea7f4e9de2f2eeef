//! Application input events.
//!
//! This module defines [`AppEvent`], the set of inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from two distinct sources:
//! - User input lines and system ticks.
//! - Protocol notifications translated from the underlying client.

use std::time::Duration;

use parley_core::{Message, RoomId, RoomSummary};

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A line typed by the user.
    Input(String),

    /// Periodic tick carrying the time elapsed since the runtime started.
    Tick(Duration),

    /// Connection in progress.
    Connecting,

    /// Connected to the broker.
    Connected,

    /// Connection lost or could not be established.
    Disconnected {
        /// Failure description.
        reason: String,
    },

    /// Room list entry changed.
    RoomUpdated(RoomSummary),

    /// Messages of a room changed; carries the full ordered log.
    MessagesChanged {
        /// Room whose log changed.
        room_id: RoomId,
        /// Ordered messages.
        messages: Vec<Message>,
    },

    /// Transient notification.
    Toast {
        /// Notification text.
        message: String,
    },

    /// Error occurred.
    Error {
        /// Error description.
        message: String,
    },
}
