//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use std::collections::HashMap;

use parley_app::App;
use parley_client::Client;
use parley_core::{
    AttachmentStatus, Message, MessageStatus, RoomId, UniqueId, env::Environment,
};

/// Snapshot of the entire system state.
///
/// Contains observable state from one or more clients for invariant checking.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-client state snapshots.
    pub clients: Vec<ClientSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(client: ClientSnapshot) -> Self {
        Self { clients: vec![client] }
    }

    /// Create a snapshot from multiple clients.
    pub fn from_clients(clients: Vec<ClientSnapshot>) -> Self {
        Self { clients }
    }
}

/// Snapshot of a single client's observable state.
#[derive(Debug, Clone, Default)]
pub struct ClientSnapshot {
    /// Client identifier.
    pub id: u64,
    /// Currently open room.
    pub active_room: Option<RoomId>,
    /// All rooms this client knows.
    pub rooms: HashMap<RoomId, RoomSnapshot>,
    /// Observed status of every message, one entry per snapshot.
    pub message_history: HashMap<UniqueId, Vec<MessageStatus>>,
    /// Observed status of every attachment, one entry per snapshot.
    pub attachment_history: HashMap<UniqueId, Vec<AttachmentStatus>>,
}

impl ClientSnapshot {
    /// Create a new client snapshot.
    pub fn new(id: u64) -> Self {
        Self { id, ..Default::default() }
    }

    /// Capture a client's rooms and statuses.
    pub fn from_client<E: Environment>(id: u64, client: &Client<E>) -> Self {
        let mut snapshot = Self::new(id).with_active_room(client.active_room().cloned());
        for room_id in client.room_ids() {
            let room = RoomSnapshot::from_messages(client.messages(&room_id))
                .with_unread(client.unread_count(&room_id));
            snapshot = snapshot.with_room(room_id, room);
        }
        snapshot
    }

    /// Capture the App view model.
    pub fn from_app(id: u64, app: &App) -> Self {
        let mut snapshot = Self::new(id).with_active_room(app.active_room().cloned());
        for (room_id, view) in app.rooms() {
            let room =
                RoomSnapshot::from_messages(&view.messages).with_unread(view.unread_count());
            snapshot = snapshot.with_room(room_id.clone(), room);
        }
        snapshot
    }

    /// Set active room.
    #[must_use]
    pub fn with_active_room(mut self, room_id: Option<RoomId>) -> Self {
        self.active_room = room_id;
        self
    }

    /// Add a room to the snapshot and record its statuses.
    #[must_use]
    pub fn with_room(mut self, room_id: RoomId, snapshot: RoomSnapshot) -> Self {
        for (token, status) in &snapshot.message_statuses {
            self.message_history.insert(token.clone(), vec![*status]);
        }
        for (token, status) in &snapshot.attachment_statuses {
            self.attachment_history.insert(token.clone(), vec![*status]);
        }
        self.rooms.insert(room_id, snapshot);
        self
    }

    /// Prepend the status history observed by an earlier snapshot.
    ///
    /// Tokens that disappeared (a dropped send) are forgotten.
    #[must_use]
    pub fn with_history_from(mut self, previous: Option<&ClientSnapshot>) -> Self {
        let Some(previous) = previous else {
            return self;
        };
        for (token, history) in &mut self.message_history {
            if let Some(earlier) = previous.message_history.get(token) {
                let mut merged = earlier.clone();
                merged.append(history);
                *history = merged;
            }
        }
        for (token, history) in &mut self.attachment_history {
            if let Some(earlier) = previous.attachment_history.get(token) {
                let mut merged = earlier.clone();
                merged.append(history);
                *history = merged;
            }
        }
        self
    }

    /// Set the unread counts a model expects, per room.
    #[must_use]
    pub fn with_expected_unread(mut self, expected: &HashMap<RoomId, u32>) -> Self {
        for (room_id, room) in &mut self.rooms {
            room.expected_unread = Some(expected.get(room_id).copied().unwrap_or(0));
        }
        self
    }
}

/// Snapshot of a room's observable state.
#[derive(Debug, Clone, Default)]
pub struct RoomSnapshot {
    /// Tokens in log order.
    pub tokens: Vec<UniqueId>,
    /// Current status per message token.
    pub message_statuses: HashMap<UniqueId, MessageStatus>,
    /// Current status per attachment token.
    pub attachment_statuses: HashMap<UniqueId, AttachmentStatus>,
    /// Unread count shown for the room.
    pub unread_count: u32,
    /// Unread count a reference model expects. `None` when unchecked.
    pub expected_unread: Option<u32>,
}

impl RoomSnapshot {
    /// Capture an ordered message log.
    pub fn from_messages(messages: &[Message]) -> Self {
        let mut snapshot = Self::default();
        for message in messages {
            snapshot.tokens.push(message.unique_id.clone());
            snapshot.message_statuses.insert(message.unique_id.clone(), message.status);
            for attachment in &message.attachments {
                snapshot.attachment_statuses.insert(attachment.unique_id.clone(), attachment.status);
            }
        }
        snapshot
    }

    /// Set unread count.
    #[must_use]
    pub fn with_unread(mut self, unread_count: u32) -> Self {
        self.unread_count = unread_count;
        self
    }
}
