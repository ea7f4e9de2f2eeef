//! Observable application state types.
//!
//! These structures serve as the "View Model" for the application. They
//! contain the subset of client state necessary for rendering the UI: room
//! list entries, a snapshot of each room's messages and pending toasts.

use std::time::Duration;

use parley_core::{Message, MessageStatus, RoomId, RoomSummary};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to the broker.
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected.
    Connected,
}

/// Per-room view.
#[derive(Debug, Clone)]
pub struct RoomView {
    /// Room list entry.
    pub summary: RoomSummary,
    /// Ordered messages.
    pub messages: Vec<Message>,
}

impl RoomView {
    /// Create an empty room view.
    pub fn new(room_id: RoomId) -> Self {
        Self { summary: RoomSummary::new(room_id), messages: Vec::new() }
    }

    /// Room ID.
    pub fn room_id(&self) -> &RoomId {
        &self.summary.room_id
    }

    /// Unread count shown next to the room.
    pub fn unread_count(&self) -> u32 {
        self.summary.unread_count
    }

    /// Messages still waiting for the broker's echo.
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.status == MessageStatus::Sending).count()
    }
}

/// Transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Notification text.
    pub message: String,
    /// Runtime clock value after which the toast is dropped.
    pub expires_at: Duration,
}
