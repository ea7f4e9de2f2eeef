//! REST requests routed through the driver.

use parley_client::ApiError;
use parley_core::{Message, RoomId, RoomSummary};

/// REST call the driver should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    /// Load a page of room history.
    FetchHistory {
        /// Room to fetch.
        room_id: RoomId,
        /// Maximum number of messages.
        limit: u32,
    },

    /// Store a room's unread count.
    UpdateUnread {
        /// Room to update.
        room_id: RoomId,
        /// New count.
        unread_count: u32,
    },

    /// Load the room list.
    FetchSummaries,
}

/// Result of an [`ApiRequest`].
#[derive(Debug, Clone)]
pub enum ApiResponse {
    /// Result of [`ApiRequest::FetchHistory`].
    History {
        /// Room that was fetched.
        room_id: RoomId,
        /// Messages, oldest first.
        result: Result<Vec<Message>, ApiError>,
    },

    /// Result of [`ApiRequest::UpdateUnread`].
    Unread {
        /// Room that was updated.
        room_id: RoomId,
        /// Outcome.
        result: Result<(), ApiError>,
    },

    /// Result of [`ApiRequest::FetchSummaries`].
    Summaries(Result<Vec<RoomSummary>, ApiError>),
}
