//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use parley_client::AttachmentDraft;
use parley_core::RoomId;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Connect to the broker.
    Connect {
        /// WebSocket URL of the broker.
        server_url: String,
    },

    /// Open a room: subscribe, load history, mark read.
    OpenRoom {
        /// Room to open.
        room_id: RoomId,
    },

    /// Close the open room.
    CloseRoom,
    /// Unsubscribe from a room.
    LeaveRoom {
        /// Room to leave.
        room_id: RoomId,
    },

    /// Send a message.
    SendMessage {
        /// Target room.
        room_id: RoomId,
        /// Text body.
        content: String,
        /// Files queued with `/attach`.
        attachments: Vec<AttachmentDraft>,
    },

    /// Refresh the room list from the REST API.
    LoadRooms,
}
