//! Client events and actions.

use parley_core::{AttachmentStatus, Message, RoomId, RoomSummary, UniqueId};
use parley_proto::{ClientFrame, ServerFrame};

/// File the user attached to an outgoing message, before it has a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDraft {
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
}

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Receiving frames from the broker
/// - Performing REST requests and reporting their results
/// - Forwarding user intents (send, open room, etc.)
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Frame received from the broker.
    FrameReceived(ServerFrame),

    /// Transport (re)connected. Rooms joined so far are re-subscribed.
    Connected,

    /// Transport closed. Every send still in flight fails.
    Disconnected {
        /// Failure description.
        reason: String,
    },

    /// User wants to send a message.
    SendMessage {
        /// Target room.
        room_id: RoomId,
        /// Text body.
        content: String,
        /// Files to attach.
        attachments: Vec<AttachmentDraft>,
    },

    /// Transport failed to deliver a send.
    SendFailed {
        /// Token of the failed message.
        unique_id: UniqueId,
        /// Failure description.
        reason: String,
    },

    /// User opened a room.
    OpenRoom {
        /// Room being opened.
        room_id: RoomId,
    },

    /// User closed the open room.
    CloseRoom,

    /// User left a room: unsubscribe from its live messages.
    LeaveRoom {
        /// Room to leave.
        room_id: RoomId,
    },

    /// History fetch completed.
    HistoryLoaded {
        /// Room the history belongs to.
        room_id: RoomId,
        /// Messages, oldest first.
        messages: Vec<Message>,
    },

    /// History fetch failed.
    HistoryFailed {
        /// Room whose history was requested.
        room_id: RoomId,
        /// Failure description.
        reason: String,
    },

    /// Room list fetched from the REST API.
    SummariesLoaded(Vec<RoomSummary>),
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Send a frame to the broker.
    Send(ClientFrame),

    /// A message was added to a room's log.
    MessageAppended {
        /// Room the message was added to.
        room_id: RoomId,
        /// Token of the message.
        unique_id: UniqueId,
        /// `true` for an optimistic local entry.
        local: bool,
    },

    /// A local entry was confirmed by the server and replaced in place.
    MessageConfirmed {
        /// Room of the message.
        room_id: RoomId,
        /// Token of the message.
        unique_id: UniqueId,
    },

    /// An optimistic entry was dropped after a failed send.
    MessageRemoved {
        /// Room of the message.
        room_id: RoomId,
        /// Token of the message.
        unique_id: UniqueId,
    },

    /// An attachment's upload status advanced.
    AttachmentUpdated {
        /// Room of the parent message.
        room_id: RoomId,
        /// Token of the parent message.
        message_id: UniqueId,
        /// Token of the attachment.
        attachment_id: UniqueId,
        /// New status.
        status: AttachmentStatus,
    },

    /// A room summary changed (preview, timestamp or unread count).
    RoomUpdated(RoomSummary),

    /// Fetch a page of history for a room.
    ///
    /// The caller should report the result as `HistoryLoaded` or
    /// `HistoryFailed`.
    FetchHistory {
        /// Room to fetch.
        room_id: RoomId,
        /// Maximum number of messages.
        limit: u32,
    },

    /// Push a room's unread count (now zero) to the REST API.
    MarkRead {
        /// Room that was read.
        room_id: RoomId,
    },

    /// Show a transient notification to the user.
    Toast {
        /// Notification text.
        message: String,
    },

    /// Log message for debugging.
    Log {
        /// Log message.
        message: String,
    },
}
