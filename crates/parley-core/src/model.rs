//! Chat messages and attachments.
//!
//! Both carry a client-generated [`UniqueId`] and a status that only moves
//! forward: `Sending -> Sent` for messages, `Uploading -> Uploaded` for
//! attachments. Merging server data into a local entry goes through
//! [`Message::merge_confirmed`], which never lets a status regress.

use serde::{Deserialize, Serialize};

use crate::{RoomId, UniqueId, UserId};

/// Delivery status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    /// Inserted locally, not yet acknowledged by the server.
    Sending,
    /// Confirmed by the server.
    Sent,
}

impl MessageStatus {
    /// Later of the two statuses.
    pub fn advance(self, next: Self) -> Self {
        self.max(next)
    }
}

/// Upload status of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachmentStatus {
    /// Upload in progress.
    Uploading,
    /// Stored server-side; `file_path` is available.
    Uploaded,
}

impl AttachmentStatus {
    /// Later of the two statuses.
    pub fn advance(self, next: Self) -> Self {
        self.max(next)
    }
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Correlation token for this attachment.
    pub unique_id: UniqueId,
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Upload status.
    pub status: AttachmentStatus,
    /// Server-side location. `None` until uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl Attachment {
    /// New attachment in the `Uploading` state.
    pub fn uploading(
        unique_id: UniqueId,
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        file_size: u64,
    ) -> Self {
        Self {
            unique_id,
            file_name: file_name.into(),
            file_type: file_type.into(),
            file_size,
            status: AttachmentStatus::Uploading,
            file_path: None,
        }
    }

    /// Apply a status report. Returns `true` if anything changed.
    ///
    /// The status only advances. A path, once known, is never cleared.
    pub fn apply_update(&mut self, status: AttachmentStatus, file_path: Option<&str>) -> bool {
        let next = self.status.advance(status);
        let mut changed = next != self.status;
        self.status = next;

        if let Some(path) = file_path
            && self.file_path.as_deref() != Some(path)
        {
            self.file_path = Some(path.to_owned());
            changed = true;
        }
        changed
    }
}

/// Attachment status report pushed by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentUpdate {
    /// Token of the message that owns the attachment.
    pub message_unique_id: UniqueId,
    /// Token of the attachment itself.
    pub attachment_unique_id: UniqueId,
    /// Reported status.
    pub status: AttachmentStatus,
    /// Server-side location, when uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Correlation token.
    pub unique_id: UniqueId,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// Author.
    pub user_id: UserId,
    /// Text body. May be empty when the message only carries attachments.
    pub content: String,
    /// Attached files.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Delivery status.
    pub status: MessageStatus,
    /// Creation time, Unix milliseconds.
    pub created_at: u64,
}

impl Message {
    /// Merge a server-confirmed copy of this message into the local entry.
    ///
    /// Content, author and timestamp come from the server. Statuses advance;
    /// attachments are matched by token and unknown ones appended.
    pub fn merge_confirmed(&mut self, confirmed: Message) {
        self.content = confirmed.content;
        self.user_id = confirmed.user_id;
        self.created_at = confirmed.created_at;
        self.status = self.status.advance(confirmed.status);

        for incoming in confirmed.attachments {
            match self.attachments.iter_mut().find(|a| a.unique_id == incoming.unique_id) {
                Some(local) => {
                    local.file_name = incoming.file_name;
                    local.file_type = incoming.file_type;
                    local.file_size = incoming.file_size;
                    local.apply_update(incoming.status, incoming.file_path.as_deref());
                },
                None => self.attachments.push(incoming),
            }
        }
    }

    /// Text shown in room previews.
    ///
    /// Falls back to the first attachment's file name for attachment-only
    /// messages.
    pub fn preview(&self) -> &str {
        if self.content.is_empty() {
            self.attachments.first().map_or("", |a| a.file_name.as_str())
        } else {
            &self.content
        }
    }
}
