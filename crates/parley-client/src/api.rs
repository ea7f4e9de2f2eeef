//! REST collaborator.
//!
//! History and unread counts live behind the marketplace REST API. The
//! client never calls it directly: it emits [`crate::ClientAction::FetchHistory`]
//! and [`crate::ClientAction::MarkRead`], and the driver performs the call
//! through a [`ChatApi`] implementation and feeds the result back.

use async_trait::async_trait;
use parley_core::{Message, RoomId, RoomSummary};
use thiserror::Error;

/// REST failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Request could not be sent or the connection dropped.
    #[error("request failed: {0}")]
    Request(String),

    /// Server answered with a non-success status.
    #[error("server returned {status}: {reason}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        reason: String,
    },

    /// Response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

/// Chat REST endpoints consumed by the client.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Fetch the most recent `limit` messages of a room, oldest first.
    async fn fetch_history(&self, room_id: &RoomId, limit: u32) -> Result<Vec<Message>, ApiError>;

    /// Store the unread count of a room.
    async fn update_unread(&self, room_id: &RoomId, unread_count: u32) -> Result<(), ApiError>;

    /// Fetch the room list with server-side unread counts.
    async fn fetch_summaries(&self) -> Result<Vec<RoomSummary>, ApiError>;
}
