//! Line-oriented input commands.
//!
//! Plain text is a message for the open room. A leading `/` starts a
//! command; `//` escapes a literal slash.

use parley_client::AttachmentDraft;
use parley_core::RoomId;
use thiserror::Error;

/// Parsed user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/open <room>`
    Open(RoomId),
    /// `/close`
    Close,
    /// `/leave <room>`: stop receiving the room's live messages.
    Leave(RoomId),
    /// `/connect`: reconnect after the connection dropped.
    Connect,
    /// `/attach <name> <type> <size>`: queue a file for the next send.
    Attach(AttachmentDraft),
    /// `/rooms`: refresh the room list.
    Rooms,
    /// `/quit`
    Quit,
    /// Message text.
    Say(String),
}

/// Input that is not a valid command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line.
    #[error("empty input")]
    Empty,

    /// Unknown `/command`.
    #[error("unknown command: /{0}")]
    Unknown(String),

    /// Command is missing arguments.
    #[error("usage: {usage}")]
    MissingArgument {
        /// Usage line for the command.
        usage: &'static str,
    },

    /// Attachment size is not a number.
    #[error("invalid file size: {0}")]
    InvalidSize(String),
}

impl Command {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }

        if let Some(escaped) = line.strip_prefix("//") {
            return Ok(Self::Say(format!("/{escaped}")));
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Say(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();

        match name {
            "open" => parts
                .next()
                .map(|room| Self::Open(RoomId::from(room)))
                .ok_or(CommandError::MissingArgument { usage: "/open <room>" }),
            "close" => Ok(Self::Close),
            "leave" => parts
                .next()
                .map(|room| Self::Leave(RoomId::from(room)))
                .ok_or(CommandError::MissingArgument { usage: "/leave <room>" }),
            "connect" => Ok(Self::Connect),
            "attach" => {
                let (Some(file_name), Some(file_type), Some(size)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    return Err(CommandError::MissingArgument {
                        usage: "/attach <name> <type> <size>",
                    });
                };
                let file_size =
                    size.parse::<u64>().map_err(|_| CommandError::InvalidSize(size.to_string()))?;

                Ok(Self::Attach(AttachmentDraft {
                    file_name: file_name.to_string(),
                    file_type: file_type.to_string(),
                    file_size,
                }))
            },
            "rooms" => Ok(Self::Rooms),
            "quit" | "q" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
