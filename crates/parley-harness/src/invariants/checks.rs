//! Standard reconciliation invariants.
//!
//! Each check looks at one client snapshot; [`Invariant::check`] walks the
//! clients and tags the first failure with the client id.

use std::collections::HashSet;

use super::{ClientSnapshot, Invariant};

/// Every correlation token appears at most once per client.
///
/// A duplicated token means an echo was appended instead of merged into the
/// optimistic entry.
pub struct NoDuplicateTokens;

impl Invariant for NoDuplicateTokens {
    fn name(&self) -> &'static str {
        "NoDuplicateTokens"
    }

    fn check_client(&self, client: &ClientSnapshot) -> Result<(), String> {
        let mut seen = HashSet::new();
        for (room_id, room) in &client.rooms {
            if let Some(token) = room.tokens.iter().find(|t| !seen.insert(*t)) {
                return Err(format!("token {token} appears twice (room {room_id})"));
            }
        }
        Ok(())
    }
}

/// A selected room is always one the client knows.
pub struct ActiveRoomInRooms;

impl Invariant for ActiveRoomInRooms {
    fn name(&self) -> &'static str {
        "ActiveRoomInRooms"
    }

    fn check_client(&self, client: &ClientSnapshot) -> Result<(), String> {
        match &client.active_room {
            Some(active) if !client.rooms.contains_key(active) => {
                let mut known: Vec<_> = client.rooms.keys().map(ToString::to_string).collect();
                known.sort();
                Err(format!("active room {active} not among {known:?}"))
            },
            _ => Ok(()),
        }
    }
}

/// The open room never shows unread messages.
pub struct ActiveRoomNotUnread;

impl Invariant for ActiveRoomNotUnread {
    fn name(&self) -> &'static str {
        "ActiveRoomNotUnread"
    }

    fn check_client(&self, client: &ClientSnapshot) -> Result<(), String> {
        let open = client.active_room.as_ref().and_then(|id| Some((id, client.rooms.get(id)?)));
        match open {
            Some((room_id, room)) if room.unread_count != 0 => {
                Err(format!("open room {room_id} shows {} unread", room.unread_count))
            },
            _ => Ok(()),
        }
    }
}

/// A message status never moves from `Sent` back to `Sending`.
pub struct MessageStatusMonotonicity;

impl Invariant for MessageStatusMonotonicity {
    fn name(&self) -> &'static str {
        "MessageStatusMonotonicity"
    }

    fn check_client(&self, client: &ClientSnapshot) -> Result<(), String> {
        for (token, history) in &client.message_history {
            if let Some(step) = history.windows(2).find(|w| w[1] < w[0]) {
                return Err(format!("message {token} went {:?} -> {:?}", step[0], step[1]));
            }
        }
        Ok(())
    }
}

/// An attachment status never moves from `Uploaded` back to `Uploading`.
///
/// Status reports may arrive duplicated or out of order; the stored status
/// must still only advance.
pub struct AttachmentMonotonicity;

impl Invariant for AttachmentMonotonicity {
    fn name(&self) -> &'static str {
        "AttachmentMonotonicity"
    }

    fn check_client(&self, client: &ClientSnapshot) -> Result<(), String> {
        for (token, history) in &client.attachment_history {
            if let Some(step) = history.windows(2).find(|w| w[1] < w[0]) {
                return Err(format!("attachment {token} went {:?} -> {:?}", step[0], step[1]));
            }
        }
        Ok(())
    }
}

/// Unread counts equal the foreign messages that arrived while the room was
/// not open, since it was last opened.
///
/// Only rooms with an `expected_unread` from a reference model are checked.
pub struct UnreadMatchesForeignArrivals;

impl Invariant for UnreadMatchesForeignArrivals {
    fn name(&self) -> &'static str {
        "UnreadMatchesForeignArrivals"
    }

    fn check_client(&self, client: &ClientSnapshot) -> Result<(), String> {
        for (room_id, room) in &client.rooms {
            match room.expected_unread {
                Some(expected) if expected != room.unread_count => {
                    return Err(format!(
                        "room {room_id}: unread {} but {expected} foreign arrivals",
                        room.unread_count
                    ));
                },
                _ => {},
            }
        }
        Ok(())
    }
}
