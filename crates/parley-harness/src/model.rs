//! Reference model for unread counts.
//!
//! The model sees exactly the frames the real client sees and applies the
//! rule in its simplest form: a message whose token the client has not seen
//! counts as unread unless its room is open. Opening a room resets it.

use std::collections::{HashMap, HashSet};

use parley_core::{Message, RoomId, UniqueId};
use parley_proto::ServerFrame;

/// Expected unread counts for one client.
#[derive(Debug, Clone, Default)]
pub struct UnreadModel {
    active_room: Option<RoomId>,
    unread: HashMap<RoomId, u32>,
    seen: HashSet<UniqueId>,
}

impl UnreadModel {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// The client appended an optimistic entry.
    pub fn record_local(&mut self, unique_id: UniqueId) {
        self.seen.insert(unique_id);
    }

    /// The client dropped an entry after a failed send.
    pub fn forget(&mut self, unique_id: &UniqueId) {
        self.seen.remove(unique_id);
    }

    /// A room was opened.
    pub fn open_room(&mut self, room_id: RoomId) {
        self.unread.insert(room_id.clone(), 0);
        self.active_room = Some(room_id);
    }

    /// The open room was closed.
    pub fn close_room(&mut self) {
        self.active_room = None;
    }

    /// History was merged. Never counts as unread.
    pub fn observe_history(&mut self, messages: &[Message]) {
        self.seen.extend(messages.iter().map(|m| m.unique_id.clone()));
    }

    /// A frame reached the client.
    pub fn observe(&mut self, frame: &ServerFrame) {
        let ServerFrame::Message(message) = frame else { return };
        if !self.seen.insert(message.unique_id.clone()) {
            return;
        }
        if self.active_room.as_ref() != Some(&message.room_id) {
            *self.unread.entry(message.room_id.clone()).or_insert(0) += 1;
        }
    }

    /// Expected unread count per room.
    pub fn expected(&self) -> &HashMap<RoomId, u32> {
        &self.unread
    }
}
