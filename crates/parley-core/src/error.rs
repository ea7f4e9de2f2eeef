//! Error types for the message log.

use thiserror::Error;

use crate::UniqueId;

/// Errors raised by [`crate::MessageLog`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// A local entry with this correlation token already exists.
    #[error("duplicate correlation token {unique_id}")]
    DuplicateUniqueId {
        /// Token that collided.
        unique_id: UniqueId,
    },

    /// No message carries this correlation token.
    #[error("message {unique_id} not found")]
    MessageNotFound {
        /// Token that was looked up.
        unique_id: UniqueId,
    },

    /// The parent message exists but has no attachment with this token.
    #[error("attachment {attachment_id} not found on message {message_id}")]
    AttachmentNotFound {
        /// Parent message token.
        message_id: UniqueId,
        /// Attachment token that was looked up.
        attachment_id: UniqueId,
    },
}
