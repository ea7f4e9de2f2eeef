//! REST payloads.
//!
//! History fetch and unread-count update are served by the marketplace API,
//! not the real-time broker.

use parley_core::{Message, RoomId, RoomSummary};
use serde::{Deserialize, Serialize};

/// Page of room history, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    /// Room the page belongs to.
    pub room_id: RoomId,
    /// Messages, oldest first.
    pub messages: Vec<Message>,
}

/// Body of the unread-count update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadUpdate {
    /// Room whose count changes.
    pub room_id: RoomId,
    /// New unread count.
    pub unread_count: u32,
}

/// Room list returned at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomList {
    /// Summaries with server-side unread counts.
    pub rooms: Vec<RoomSummary>,
}
