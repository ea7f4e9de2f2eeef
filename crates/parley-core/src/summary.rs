//! Room list entries.

use serde::{Deserialize, Serialize};

use crate::{Message, RoomId};

/// Per-room summary shown in the room list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    /// Room identifier.
    pub room_id: RoomId,
    /// Preview of the most recent message. `None` for an empty room.
    #[serde(default)]
    pub last_message: Option<String>,
    /// Timestamp of the most recent message, Unix milliseconds.
    #[serde(default)]
    pub last_message_time: Option<u64>,
    /// Messages received while the room was not open.
    #[serde(default)]
    pub unread_count: u32,
}

impl RoomSummary {
    /// Empty summary for a room.
    pub fn new(room_id: RoomId) -> Self {
        Self { room_id, last_message: None, last_message_time: None, unread_count: 0 }
    }

    /// Record a message as the room's latest.
    ///
    /// Older timestamps (history backfill, late echoes) do not replace a
    /// newer preview.
    pub fn record(&mut self, message: &Message) {
        if self.last_message_time.is_some_and(|t| t > message.created_at) {
            return;
        }
        self.last_message = Some(message.preview().to_owned());
        self.last_message_time = Some(message.created_at);
    }

    /// Reset the preview to the given entry, e.g. after the latest message
    /// was dropped.
    pub fn reset_preview(&mut self, latest: Option<&Message>) {
        self.last_message = latest.map(|m| m.preview().to_owned());
        self.last_message_time = latest.map(|m| m.created_at);
    }

    /// Count one more unread message.
    pub fn increment_unread(&mut self) {
        self.unread_count = self.unread_count.saturating_add(1);
    }

    /// Mark everything read. Returns `true` if the count changed.
    pub fn clear_unread(&mut self) -> bool {
        let had_unread = self.unread_count > 0;
        self.unread_count = 0;
        had_unread
    }
}
