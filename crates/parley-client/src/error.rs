//! Client error types.

use parley_core::LogError;
use thiserror::Error;

/// Errors returned by [`crate::Client::handle`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Message has neither text nor attachments.
    #[error("message is empty")]
    EmptyMessage,

    /// Message log rejected the operation.
    #[error(transparent)]
    Log(#[from] LogError),
}
