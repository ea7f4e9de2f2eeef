//! Client state machine.
//!
//! The `Client` is the top-level state machine that manages every room the
//! user can see. It is the reconciler between optimistic local sends and the
//! broker's authoritative event stream.
//!
//! # Reconciliation
//!
//! A send generates a correlation token, appends a `Sending` entry and emits
//! the frame. When the broker pushes a message with a known token, the entry
//! is replaced in place. Unknown tokens are foreign messages: they are
//! appended and count as unread unless their room is open.
//!
//! Attachment reports can overtake the message that owns them. Reports for
//! an unknown message are held and applied once the message arrives, live
//! or through history.

use std::collections::HashMap;

use parley_core::{
    Attachment, AttachmentChange, AttachmentUpdate, Message, MessageLog, MessageStatus, Reconciled,
    RoomId, RoomSummary, UniqueId, UserId, env::Environment,
};
use parley_proto::{ClientFrame, ServerFrame};

use crate::{
    config::ClientConfig,
    error::ClientError,
    event::{AttachmentDraft, ClientAction, ClientEvent},
};

/// Client identity.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Server-assigned user ID; author of every local entry.
    pub user_id: UserId,
}

impl ClientIdentity {
    /// Create a new client identity with the given user ID.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self { user_id: user_id.into() }
    }
}

/// Per-room state.
#[derive(Debug, Clone)]
struct RoomState {
    /// Ordered messages.
    log: MessageLog,

    /// Room list entry.
    summary: RoomSummary,

    /// Subscribed on the broker. Re-sent on every reconnect.
    joined: bool,

    /// History fetch issued or completed. Cleared when the fetch fails.
    history_requested: bool,
}

impl RoomState {
    fn new(room_id: RoomId) -> Self {
        Self {
            log: MessageLog::new(),
            summary: RoomSummary::new(room_id),
            joined: false,
            history_requested: false,
        }
    }
}

/// Upper bound on messages with held attachment reports.
pub const MAX_HELD_ATTACHMENT_REPORTS: usize = 256;

/// Chat client for a single user.
pub struct Client<E: Environment> {
    /// Environment for randomness and wall-clock time.
    env: E,

    /// Client identity.
    identity: ClientIdentity,

    /// Configuration.
    config: ClientConfig,

    /// Known rooms.
    rooms: HashMap<RoomId, RoomState>,

    /// Room currently open. Messages arriving here are not counted as unread.
    active_room: Option<RoomId>,

    /// Attachment reports whose message has not arrived yet, by message token.
    held_reports: HashMap<UniqueId, Vec<AttachmentUpdate>>,
}

impl<E: Environment> Client<E> {
    /// Create a new client with the given identity and default config.
    pub fn new(env: E, identity: ClientIdentity) -> Self {
        Self::with_config(env, identity, ClientConfig::default())
    }

    /// Create a new client with an explicit config.
    pub fn with_config(env: E, identity: ClientIdentity, config: ClientConfig) -> Self {
        Self {
            env,
            identity,
            config,
            rooms: HashMap::new(),
            active_room: None,
            held_reports: HashMap::new(),
        }
    }

    /// Process an event and return resulting actions.
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::FrameReceived(frame) => Ok(self.handle_frame(frame)),
            ClientEvent::Connected => Ok(self.handle_connected()),
            ClientEvent::Disconnected { reason } => Ok(self.handle_disconnected(&reason)),
            ClientEvent::SendMessage { room_id, content, attachments } => {
                self.handle_send_message(room_id, content, attachments)
            },
            ClientEvent::SendFailed { unique_id, reason } => {
                Ok(self.handle_send_failed(&unique_id, &reason))
            },
            ClientEvent::OpenRoom { room_id } => Ok(self.handle_open_room(room_id)),
            ClientEvent::CloseRoom => {
                self.active_room = None;
                Ok(vec![])
            },
            ClientEvent::LeaveRoom { room_id } => Ok(self.handle_leave_room(&room_id)),
            ClientEvent::HistoryLoaded { room_id, messages } => {
                Ok(self.handle_history_loaded(room_id, messages))
            },
            ClientEvent::HistoryFailed { room_id, reason } => {
                Ok(self.handle_history_failed(&room_id, &reason))
            },
            ClientEvent::SummariesLoaded(summaries) => Ok(self.handle_summaries_loaded(summaries)),
        }
    }

    fn handle_send_message(
        &mut self,
        room_id: RoomId,
        content: String,
        drafts: Vec<AttachmentDraft>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if content.trim().is_empty() && drafts.is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let unique_id = UniqueId::generate(&self.env);
        let attachments: Vec<Attachment> = drafts
            .into_iter()
            .map(|d| {
                Attachment::uploading(
                    UniqueId::generate(&self.env),
                    d.file_name,
                    d.file_type,
                    d.file_size,
                )
            })
            .collect();

        let message = Message {
            unique_id: unique_id.clone(),
            room_id: room_id.clone(),
            user_id: self.identity.user_id.clone(),
            content: content.clone(),
            attachments: attachments.clone(),
            status: MessageStatus::Sending,
            created_at: self.env.wall_clock_millis(),
        };

        let room = self.room_entry(&room_id);
        room.log.push_local(message.clone())?;
        room.summary.record(&message);
        let summary = room.summary.clone();

        tracing::debug!(room_id = %room_id, unique_id = %unique_id, "optimistic send");

        Ok(vec![
            ClientAction::MessageAppended {
                room_id: room_id.clone(),
                unique_id: unique_id.clone(),
                local: true,
            },
            ClientAction::RoomUpdated(summary),
            ClientAction::Send(ClientFrame::SendMessage { room_id, content, attachments, unique_id }),
        ])
    }

    fn handle_frame(&mut self, frame: ServerFrame) -> Vec<ClientAction> {
        match frame {
            ServerFrame::Message(message) => self.handle_server_message(message),
            ServerFrame::AttachmentStatus(update) => self.handle_attachment_status(&update),
            ServerFrame::Ack { unique_id } => self.handle_ack(&unique_id),
            ServerFrame::Error { unique_id: Some(unique_id), message } => {
                self.handle_send_failed(&unique_id, &message)
            },
            ServerFrame::Error { unique_id: None, message } => {
                tracing::warn!(%message, "broker error");
                vec![ClientAction::Toast { message }]
            },
        }
    }

    fn handle_server_message(&mut self, message: Message) -> Vec<ClientAction> {
        let room_id = message.room_id.clone();
        let unique_id = message.unique_id.clone();
        let is_active = self.active_room.as_ref() == Some(&room_id);

        let room = self.room_entry(&room_id);
        let outcome = room.log.reconcile(message);
        if let Some(entry) = room.log.as_slice().get(outcome.index()) {
            room.summary.record(entry);
        }

        let change = match outcome {
            Reconciled::Confirmed { .. } => {
                ClientAction::MessageConfirmed { room_id: room_id.clone(), unique_id }
            },
            Reconciled::Appended { .. } => {
                if !is_active {
                    room.summary.increment_unread();
                }
                ClientAction::MessageAppended { room_id: room_id.clone(), unique_id, local: false }
            },
        };

        let mut actions = vec![change];
        actions.extend(self.release_held_reports(&room_id));
        if let Some(room) = self.rooms.get(&room_id) {
            actions.push(ClientAction::RoomUpdated(room.summary.clone()));
        }
        actions
    }

    fn handle_attachment_status(&mut self, update: &AttachmentUpdate) -> Vec<ClientAction> {
        let message_id = &update.message_unique_id;
        if !self.rooms.values().any(|r| r.log.contains(message_id)) {
            return self.hold_report(update);
        }

        self.rooms
            .iter_mut()
            .find(|(_, r)| r.log.contains(message_id))
            .and_then(|(room_id, room)| apply_report(room_id, &mut room.log, update))
            .into_iter()
            .collect()
    }

    /// Keep a report for a message that has not arrived yet.
    fn hold_report(&mut self, update: &AttachmentUpdate) -> Vec<ClientAction> {
        let message_id = &update.message_unique_id;

        if !self.held_reports.contains_key(message_id)
            && self.held_reports.len() >= MAX_HELD_ATTACHMENT_REPORTS
        {
            tracing::warn!(message_id = %message_id, "attachment status for unknown message");
            return vec![ClientAction::Log {
                message: format!("Dropped attachment status for unknown message {message_id}"),
            }];
        }

        tracing::debug!(message_id = %message_id, "holding attachment status");
        self.held_reports.entry(message_id.clone()).or_default().push(update.clone());
        vec![ClientAction::Log {
            message: format!("Holding attachment status for unknown message {message_id}"),
        }]
    }

    /// Apply held reports whose message is now in `room_id`.
    fn release_held_reports(&mut self, room_id: &RoomId) -> Vec<ClientAction> {
        if self.held_reports.is_empty() {
            return vec![];
        }
        let Some(room) = self.rooms.get_mut(room_id) else {
            return vec![];
        };

        let ready: Vec<UniqueId> =
            self.held_reports.keys().filter(|id| room.log.contains(id)).cloned().collect();

        let mut actions = Vec::new();
        for message_id in ready {
            for update in self.held_reports.remove(&message_id).unwrap_or_default() {
                actions.extend(apply_report(room_id, &mut room.log, &update));
            }
        }
        actions
    }

    fn handle_ack(&mut self, unique_id: &UniqueId) -> Vec<ClientAction> {
        let Some((room_id, room)) = self.rooms.iter_mut().find(|(_, r)| r.log.contains(unique_id))
        else {
            return vec![ClientAction::Log { message: format!("Ack for unknown message {unique_id}") }];
        };

        match room.log.confirm(unique_id) {
            Ok(true) => vec![ClientAction::MessageConfirmed {
                room_id: room_id.clone(),
                unique_id: unique_id.clone(),
            }],
            Ok(false) => vec![],
            Err(e) => vec![ClientAction::Log { message: e.to_string() }],
        }
    }

    /// Drop the optimistic entry and notify the user. No retry.
    fn handle_send_failed(&mut self, unique_id: &UniqueId, reason: &str) -> Vec<ClientAction> {
        let toast = ClientAction::Toast { message: format!("Failed to send message: {reason}") };

        let Some((room_id, room)) = self.rooms.iter_mut().find(|(_, r)| r.log.contains(unique_id))
        else {
            return vec![toast];
        };

        if room.log.get(unique_id).is_none_or(|m| m.status != MessageStatus::Sending) {
            // Already confirmed; the failure report is stale
            return vec![toast];
        }

        room.log.remove(unique_id);
        room.summary.reset_preview(room.log.last());
        tracing::warn!(room_id = %room_id, unique_id = %unique_id, %reason, "send failed");

        vec![
            ClientAction::MessageRemoved { room_id: room_id.clone(), unique_id: unique_id.clone() },
            ClientAction::RoomUpdated(room.summary.clone()),
            toast,
        ]
    }

    fn handle_open_room(&mut self, room_id: RoomId) -> Vec<ClientAction> {
        self.active_room = Some(room_id.clone());
        let history_page_size = self.config.history_page_size;
        let mark_read_on_open = self.config.mark_read_on_open;

        let room = self.room_entry(&room_id);
        let mut actions = Vec::new();

        if !room.joined {
            room.joined = true;
            actions.push(ClientAction::Send(ClientFrame::JoinRoom { room_id: room_id.clone() }));
        }
        if !room.history_requested {
            room.history_requested = true;
            actions.push(ClientAction::FetchHistory {
                room_id: room_id.clone(),
                limit: history_page_size,
            });
        }

        if room.summary.clear_unread() {
            actions.push(ClientAction::RoomUpdated(room.summary.clone()));
            if mark_read_on_open {
                actions.push(ClientAction::MarkRead { room_id });
            }
        }

        actions
    }

    fn handle_history_loaded(&mut self, room_id: RoomId, messages: Vec<Message>) -> Vec<ClientAction> {
        let room = self.room_entry(&room_id);
        let fetched = messages.len();
        let inserted = room.log.merge_history(messages);
        if let Some(last) = room.log.last() {
            room.summary.record(last);
        }
        let summary = room.summary.clone();

        let mut actions = self.release_held_reports(&room_id);
        actions.push(ClientAction::RoomUpdated(summary));
        actions.push(ClientAction::Log {
            message: format!("Loaded {inserted} of {fetched} history messages for {room_id}"),
        });
        actions
    }

    fn handle_history_failed(&mut self, room_id: &RoomId, reason: &str) -> Vec<ClientAction> {
        // The subscription stands; only the next open fetches again
        if let Some(room) = self.rooms.get_mut(room_id) {
            room.history_requested = false;
        }
        vec![ClientAction::Toast { message: format!("Could not load chat history: {reason}") }]
    }

    fn handle_summaries_loaded(&mut self, summaries: Vec<RoomSummary>) -> Vec<ClientAction> {
        let mark_read_on_open = self.config.mark_read_on_open;
        let mut actions = Vec::new();

        for incoming in summaries {
            let room_id = incoming.room_id.clone();
            let is_active = self.active_room.as_ref() == Some(&room_id);
            let room = self.room_entry(&room_id);

            if incoming.last_message_time > room.summary.last_message_time {
                room.summary.last_message = incoming.last_message;
                room.summary.last_message_time = incoming.last_message_time;
            }

            if is_active {
                if incoming.unread_count > 0 && mark_read_on_open {
                    actions.push(ClientAction::MarkRead { room_id: room_id.clone() });
                }
            } else {
                room.summary.unread_count = incoming.unread_count;
            }

            actions.push(ClientAction::RoomUpdated(room.summary.clone()));
        }

        actions
    }

    fn handle_leave_room(&mut self, room_id: &RoomId) -> Vec<ClientAction> {
        if self.active_room.as_ref() == Some(room_id) {
            self.active_room = None;
        }

        match self.rooms.get_mut(room_id) {
            Some(room) if room.joined => {
                room.joined = false;
                room.history_requested = false;
                tracing::debug!(room_id = %room_id, "leaving room");
                vec![ClientAction::Send(ClientFrame::LeaveRoom { room_id: room_id.clone() })]
            },
            _ => vec![],
        }
    }

    /// Fail every send still waiting for the broker. No retry.
    fn handle_disconnected(&mut self, reason: &str) -> Vec<ClientAction> {
        let stranded: Vec<UniqueId> = self
            .room_ids()
            .iter()
            .filter_map(|id| self.rooms.get(id))
            .flat_map(|room| room.log.iter())
            .filter(|m| m.status == MessageStatus::Sending)
            .map(|m| m.unique_id.clone())
            .collect();

        if !stranded.is_empty() {
            tracing::warn!(count = stranded.len(), %reason, "failing sends stranded by disconnect");
        }

        let reason = format!("connection lost: {reason}");
        stranded.iter().flat_map(|id| self.handle_send_failed(id, &reason)).collect()
    }

    fn handle_connected(&mut self) -> Vec<ClientAction> {
        let mut rooms: Vec<_> =
            self.rooms.iter().filter(|(_, r)| r.joined).map(|(id, _)| id.clone()).collect();
        rooms.sort();

        let mut actions: Vec<_> = rooms
            .into_iter()
            .map(|room_id| ClientAction::Send(ClientFrame::JoinRoom { room_id }))
            .collect();
        actions.push(ClientAction::Log { message: format!("Connected as {}", self.identity.user_id) });
        actions
    }

    fn room_entry(&mut self, room_id: &RoomId) -> &mut RoomState {
        self.rooms.entry(room_id.clone()).or_insert_with(|| RoomState::new(room_id.clone()))
    }

    /// Client's user ID.
    pub fn user_id(&self) -> &UserId {
        &self.identity.user_id
    }

    /// Room currently open. `None` if no room is open.
    pub fn active_room(&self) -> Option<&RoomId> {
        self.active_room.as_ref()
    }

    /// IDs of all known rooms, sorted.
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<_> = self.rooms.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Messages of a room in arrival order. Empty for an unknown room.
    pub fn messages(&self, room_id: &RoomId) -> &[Message] {
        self.rooms.get(room_id).map(|r| r.log.as_slice()).unwrap_or_default()
    }

    /// Summary of a room. `None` for an unknown room.
    pub fn summary(&self, room_id: &RoomId) -> Option<&RoomSummary> {
        self.rooms.get(room_id).map(|r| &r.summary)
    }

    /// Unread count of a room. Zero for an unknown room.
    pub fn unread_count(&self, room_id: &RoomId) -> u32 {
        self.summary(room_id).map_or(0, |s| s.unread_count)
    }

    /// Sum of unread counts across rooms.
    pub fn total_unread(&self) -> u64 {
        self.rooms.values().map(|r| u64::from(r.summary.unread_count)).sum()
    }

    /// Messages with attachment reports waiting for them.
    pub fn held_report_count(&self) -> usize {
        self.held_reports.len()
    }
}

/// Apply one attachment report to a log that holds its message.
fn apply_report(
    room_id: &RoomId,
    log: &mut MessageLog,
    update: &AttachmentUpdate,
) -> Option<ClientAction> {
    match log.apply_attachment_status(update) {
        Ok(AttachmentChange::Advanced) => Some(ClientAction::AttachmentUpdated {
            room_id: room_id.clone(),
            message_id: update.message_unique_id.clone(),
            attachment_id: update.attachment_unique_id.clone(),
            status: update.status,
        }),
        Ok(AttachmentChange::Unchanged) => None,
        Err(e) => {
            tracing::warn!(error = %e, "attachment status rejected");
            Some(ClientAction::Log { message: e.to_string() })
        },
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Instant,
    };

    use parley_core::AttachmentStatus;

    use super::*;

    #[derive(Clone, Default)]
    struct TestEnv {
        counter: Arc<AtomicU64>,
    }

    impl Environment for TestEnv {
        type Instant = Instant;

        #[allow(clippy::disallowed_methods)]
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn wall_clock_millis(&self) -> u64 {
            1_000
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let n = self.counter.fetch_add(1, Ordering::Relaxed).to_be_bytes();
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = n[i % n.len()];
            }
        }
    }

    fn client() -> Client<TestEnv> {
        Client::new(TestEnv::default(), ClientIdentity::new("buyer"))
    }

    fn send(client: &mut Client<TestEnv>, room: &str, text: &str) -> UniqueId {
        let actions = client
            .handle(ClientEvent::SendMessage {
                room_id: room.into(),
                content: text.into(),
                attachments: vec![],
            })
            .unwrap_or_default();

        actions
            .into_iter()
            .find_map(|a| match a {
                ClientAction::MessageAppended { unique_id, local: true, .. } => Some(unique_id),
                _ => None,
            })
            .unwrap_or_else(|| UniqueId::new("missing"))
    }

    fn foreign(room: &str, id: &str) -> ServerFrame {
        ServerFrame::Message(Message {
            unique_id: id.into(),
            room_id: room.into(),
            user_id: "seller".into(),
            content: "hi".into(),
            attachments: vec![],
            status: MessageStatus::Sent,
            created_at: 2_000,
        })
    }

    #[test]
    fn send_appends_then_transmits() {
        let mut client = client();
        let actions = client
            .handle(ClientEvent::SendMessage {
                room_id: "r1".into(),
                content: "hello".into(),
                attachments: vec![AttachmentDraft {
                    file_name: "a.png".into(),
                    file_type: "image/png".into(),
                    file_size: 10,
                }],
            })
            .unwrap_or_default();

        assert!(matches!(actions.as_slice(), [
            ClientAction::MessageAppended { local: true, .. },
            ClientAction::RoomUpdated(_),
            ClientAction::Send(ClientFrame::SendMessage { .. }),
        ]));

        let messages = client.messages(&"r1".into());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].status, MessageStatus::Sending);
        assert_eq!(messages[0].attachments[0].status, AttachmentStatus::Uploading);
    }

    #[test]
    fn empty_message_rejected() {
        let mut client = client();
        let result = client.handle(ClientEvent::SendMessage {
            room_id: "r1".into(),
            content: "   ".into(),
            attachments: vec![],
        });
        assert_eq!(result, Err(ClientError::EmptyMessage));
    }

    #[test]
    fn echo_confirms_in_place() {
        let mut client = client();
        let token = send(&mut client, "r1", "hello");

        let echo = ServerFrame::Message(Message {
            status: MessageStatus::Sent,
            created_at: 5_000,
            ..client.messages(&"r1".into())[0].clone()
        });
        let actions = client.handle(ClientEvent::FrameReceived(echo)).unwrap_or_default();

        assert!(matches!(actions.first(), Some(ClientAction::MessageConfirmed { .. })));
        let messages = client.messages(&"r1".into());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].unique_id, token);
        assert_eq!(messages[0].status, MessageStatus::Sent);
        assert_eq!(client.unread_count(&"r1".into()), 0);
    }

    #[test]
    fn foreign_message_counts_unread_only_when_room_closed() {
        let mut client = client();
        let _ = client.handle(ClientEvent::OpenRoom { room_id: "open".into() });

        let _ = client.handle(ClientEvent::FrameReceived(foreign("open", "m1")));
        let _ = client.handle(ClientEvent::FrameReceived(foreign("other", "m2")));
        let _ = client.handle(ClientEvent::FrameReceived(foreign("other", "m3")));

        assert_eq!(client.unread_count(&"open".into()), 0);
        assert_eq!(client.unread_count(&"other".into()), 2);
        assert_eq!(client.total_unread(), 2);
    }

    #[test]
    fn opening_room_clears_unread_and_marks_read() {
        let mut client = client();
        let _ = client.handle(ClientEvent::FrameReceived(foreign("r1", "m1")));

        let actions = client.handle(ClientEvent::OpenRoom { room_id: "r1".into() }).unwrap_or_default();

        assert!(actions.contains(&ClientAction::Send(ClientFrame::JoinRoom { room_id: "r1".into() })));
        assert!(actions.iter().any(|a| matches!(a, ClientAction::FetchHistory { limit: 50, .. })));
        assert!(actions.contains(&ClientAction::MarkRead { room_id: "r1".into() }));
        assert_eq!(client.unread_count(&"r1".into()), 0);

        // Second open neither re-subscribes nor marks read again
        let _ = client.handle(ClientEvent::CloseRoom);
        let actions = client.handle(ClientEvent::OpenRoom { room_id: "r1".into() }).unwrap_or_default();
        assert!(actions.is_empty());
    }

    #[test]
    fn send_failure_drops_entry_and_toasts() {
        let mut client = client();
        let token = send(&mut client, "r1", "hello");

        let actions = client
            .handle(ClientEvent::SendFailed { unique_id: token, reason: "socket closed".into() })
            .unwrap_or_default();

        assert!(matches!(actions.first(), Some(ClientAction::MessageRemoved { .. })));
        assert!(actions.iter().any(|a| matches!(a, ClientAction::Toast { .. })));
        assert!(client.messages(&"r1".into()).is_empty());
        assert_eq!(client.summary(&"r1".into()).and_then(|s| s.last_message.clone()), None);
    }

    #[test]
    fn failure_after_confirmation_keeps_entry() {
        let mut client = client();
        let token = send(&mut client, "r1", "hello");
        let _ = client.handle(ClientEvent::FrameReceived(ServerFrame::Ack { unique_id: token.clone() }));

        let actions = client
            .handle(ClientEvent::FrameReceived(ServerFrame::Error {
                unique_id: Some(token),
                message: "late".into(),
            }))
            .unwrap_or_default();

        assert!(matches!(actions.as_slice(), [ClientAction::Toast { .. }]));
        assert_eq!(client.messages(&"r1".into()).len(), 1);
    }

    fn with_attachment(room: &str, id: &str, attachment: &str) -> Message {
        Message {
            unique_id: id.into(),
            room_id: room.into(),
            user_id: "seller".into(),
            content: "photo".into(),
            attachments: vec![Attachment::uploading(attachment.into(), "a.png", "image/png", 10)],
            status: MessageStatus::Sent,
            created_at: 2_000,
        }
    }

    fn uploaded(message: &str, attachment: &str) -> ServerFrame {
        ServerFrame::AttachmentStatus(AttachmentUpdate {
            message_unique_id: message.into(),
            attachment_unique_id: attachment.into(),
            status: AttachmentStatus::Uploaded,
            file_path: Some("/uploads/a.png".into()),
        })
    }

    #[test]
    fn attachment_status_before_message_is_applied_on_arrival() {
        let mut client = client();
        let _ = client.handle(ClientEvent::OpenRoom { room_id: "r".into() });

        let actions = client.handle(ClientEvent::FrameReceived(uploaded("m1", "a1"))).unwrap_or_default();
        assert!(matches!(actions.as_slice(), [ClientAction::Log { .. }]));
        assert_eq!(client.held_report_count(), 1);

        let message = ServerFrame::Message(with_attachment("r", "m1", "a1"));
        let actions = client.handle(ClientEvent::FrameReceived(message)).unwrap_or_default();

        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::AttachmentUpdated { status: AttachmentStatus::Uploaded, .. }
        )));
        let attachment = &client.messages(&"r".into())[0].attachments[0];
        assert_eq!(attachment.status, AttachmentStatus::Uploaded);
        assert_eq!(attachment.file_path.as_deref(), Some("/uploads/a.png"));
        assert_eq!(client.held_report_count(), 0);
    }

    #[test]
    fn attachment_status_before_history_is_applied_on_load() {
        let mut client = client();
        let _ = client.handle(ClientEvent::OpenRoom { room_id: "r".into() });
        let _ = client.handle(ClientEvent::FrameReceived(uploaded("m1", "a1")));

        let _ = client.handle(ClientEvent::HistoryLoaded {
            room_id: "r".into(),
            messages: vec![with_attachment("r", "m1", "a1")],
        });

        let attachment = &client.messages(&"r".into())[0].attachments[0];
        assert_eq!(attachment.status, AttachmentStatus::Uploaded);
        assert_eq!(client.held_report_count(), 0);
    }

    #[test]
    fn held_reports_are_bounded() {
        let mut client = client();
        for i in 0..MAX_HELD_ATTACHMENT_REPORTS {
            let _ = client.handle(ClientEvent::FrameReceived(uploaded(&format!("m{i}"), "a")));
        }
        let actions = client.handle(ClientEvent::FrameReceived(uploaded("overflow", "a"))).unwrap_or_default();

        assert!(matches!(
            actions.as_slice(),
            [ClientAction::Log { message }] if message.starts_with("Dropped")
        ));
        assert_eq!(client.held_report_count(), MAX_HELD_ATTACHMENT_REPORTS);
    }

    #[test]
    fn failed_history_keeps_subscription() {
        let mut client = client();
        let _ = client.handle(ClientEvent::OpenRoom { room_id: "r".into() });
        let actions = client
            .handle(ClientEvent::HistoryFailed { room_id: "r".into(), reason: "timeout".into() })
            .unwrap_or_default();
        assert!(matches!(actions.as_slice(), [ClientAction::Toast { .. }]));

        let actions = client.handle(ClientEvent::Connected).unwrap_or_default();
        assert!(actions.contains(&ClientAction::Send(ClientFrame::JoinRoom { room_id: "r".into() })));

        // Reopening retries the fetch without subscribing twice
        let actions = client.handle(ClientEvent::OpenRoom { room_id: "r".into() }).unwrap_or_default();
        assert!(actions.iter().any(|a| matches!(a, ClientAction::FetchHistory { .. })));
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::Send(ClientFrame::JoinRoom { .. }))));
    }

    #[test]
    fn disconnect_fails_sends_in_flight() {
        let mut client = client();
        let acked = send(&mut client, "r1", "delivered");
        let _ = client.handle(ClientEvent::FrameReceived(ServerFrame::Ack { unique_id: acked }));
        let _ = send(&mut client, "r1", "stranded");
        let _ = send(&mut client, "r2", "also stranded");

        let actions = client
            .handle(ClientEvent::Disconnected { reason: "connection reset".into() })
            .unwrap_or_default();

        let toasts: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                ClientAction::Toast { message } => Some(message.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(toasts, [
            "Failed to send message: connection lost: connection reset",
            "Failed to send message: connection lost: connection reset",
        ]);
        assert_eq!(client.messages(&"r1".into()).len(), 1);
        assert!(client.messages(&"r2".into()).is_empty());

        // Nothing left to fail
        let actions = client
            .handle(ClientEvent::Disconnected { reason: "again".into() })
            .unwrap_or_default();
        assert!(actions.is_empty());
    }

    #[test]
    fn leave_unsubscribes_until_reopened() {
        let mut client = client();
        let _ = client.handle(ClientEvent::OpenRoom { room_id: "r".into() });

        let actions = client.handle(ClientEvent::LeaveRoom { room_id: "r".into() }).unwrap_or_default();
        assert_eq!(actions, vec![ClientAction::Send(ClientFrame::LeaveRoom { room_id: "r".into() })]);
        assert_eq!(client.active_room(), None);

        // Leaving twice is a no-op, and a reconnect does not re-join
        assert!(client.handle(ClientEvent::LeaveRoom { room_id: "r".into() }).unwrap_or_default().is_empty());
        let actions = client.handle(ClientEvent::Connected).unwrap_or_default();
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::Send(_))));

        let actions = client.handle(ClientEvent::OpenRoom { room_id: "r".into() }).unwrap_or_default();
        assert!(actions.contains(&ClientAction::Send(ClientFrame::JoinRoom { room_id: "r".into() })));
        assert!(actions.iter().any(|a| matches!(a, ClientAction::FetchHistory { .. })));
    }

    #[test]
    fn summaries_seed_unread_counts() {
        let mut client = client();
        let _ = client.handle(ClientEvent::OpenRoom { room_id: "open".into() });

        let mut closed = RoomSummary::new("closed".into());
        closed.unread_count = 3;
        let mut open = RoomSummary::new("open".into());
        open.unread_count = 2;

        let actions =
            client.handle(ClientEvent::SummariesLoaded(vec![closed, open])).unwrap_or_default();

        assert_eq!(client.unread_count(&"closed".into()), 3);
        assert_eq!(client.unread_count(&"open".into()), 0);
        assert!(actions.contains(&ClientAction::MarkRead { room_id: "open".into() }));
    }

    #[test]
    fn reconnect_resubscribes_opened_rooms() {
        let mut client = client();
        let _ = client.handle(ClientEvent::OpenRoom { room_id: "b".into() });
        let _ = client.handle(ClientEvent::OpenRoom { room_id: "a".into() });
        let _ = client.handle(ClientEvent::FrameReceived(foreign("c", "m1")));

        let actions = client.handle(ClientEvent::Connected).unwrap_or_default();
        let joined: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                ClientAction::Send(ClientFrame::JoinRoom { room_id }) => Some(room_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(joined, ["a", "b"]);
    }
}
