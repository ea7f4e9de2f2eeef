//! Real-time transport frames.
//!
//! Every frame is a JSON object with a `type` discriminator. Unknown frame
//! types fail to decode; the caller logs and drops them.

use parley_core::{Attachment, AttachmentUpdate, Message, RoomId, UniqueId};
use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Largest frame accepted in either direction (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Frames sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Post a message. `unique_id` is echoed back by the broker.
    SendMessage {
        /// Target room.
        room_id: RoomId,
        /// Text body.
        content: String,
        /// Attachment metadata; uploads complete asynchronously.
        attachments: Vec<Attachment>,
        /// Correlation token.
        unique_id: UniqueId,
    },

    /// Subscribe to a room's events.
    JoinRoom {
        /// Room to subscribe to.
        room_id: RoomId,
    },

    /// Unsubscribe from a room's events.
    LeaveRoom {
        /// Room to unsubscribe from.
        room_id: RoomId,
    },
}

/// Frames pushed by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// A message, either an echo of ours or one from another participant.
    Message(Message),

    /// Upload progress for an attachment.
    AttachmentStatus(AttachmentUpdate),

    /// Acknowledgement of a send without the full echo body.
    Ack {
        /// Token of the acknowledged message.
        unique_id: UniqueId,
    },

    /// Request failed.
    Error {
        /// Token of the failed send, if the error relates to one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unique_id: Option<UniqueId>,
        /// Human-readable reason.
        message: String,
    },
}

/// Encode a client frame as JSON text.
pub fn encode(frame: &ClientFrame) -> Result<String> {
    checked(serde_json::to_string(frame)?)
}

/// Decode a server frame from JSON text.
pub fn decode(text: &str) -> Result<ServerFrame> {
    check_size(text.len())?;
    Ok(serde_json::from_str(text)?)
}

/// Encode a server frame as JSON text. Used by brokers and test doubles.
pub fn encode_server(frame: &ServerFrame) -> Result<String> {
    checked(serde_json::to_string(frame)?)
}

/// Decode a client frame from JSON text. Used by brokers and test doubles.
pub fn decode_client(text: &str) -> Result<ClientFrame> {
    check_size(text.len())?;
    Ok(serde_json::from_str(text)?)
}

fn checked(text: String) -> Result<String> {
    check_size(text.len())?;
    Ok(text)
}

fn check_size(size: usize) -> Result<()> {
    if size > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size, max: MAX_FRAME_SIZE });
    }
    Ok(())
}
