//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! state of the application completely decoupled from I/O and protocol
//! mechanics.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Parses input lines into commands and message sends.
//! - Tracks the room list, unread badges, and the currently active room.
//! - Queues attachments for the next send.
//! - Keeps transient toasts and expires them on tick.
//! - Tracks high-level connection state for UI feedback.

use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use parley_client::AttachmentDraft;
use parley_core::{RoomId, UserId};

use crate::{
    AppAction, AppConfig, AppEvent, Command, CommandError, ConnectionState, RoomView, Toast,
};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Connection state.
    state: ConnectionState,
    /// Broker URL.
    server_url: String,
    /// Signed-in user.
    user_id: UserId,
    /// Configuration.
    config: AppConfig,
    /// Per-room view (summary and messages).
    rooms: HashMap<RoomId, RoomView>,
    /// Currently open room. `None` if no room is open.
    active_room: Option<RoomId>,
    /// Attachments queued for the next send.
    pending_attachments: Vec<AttachmentDraft>,
    /// Visible toasts, oldest first.
    toasts: VecDeque<Toast>,
    /// Time since the runtime started, as of the last tick.
    clock: Duration,
}

impl App {
    /// Create a new App for `user_id` talking to `server_url`.
    pub fn new(server_url: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self::with_config(server_url, user_id, AppConfig::default())
    }

    /// Create a new App with an explicit config.
    pub fn with_config(
        server_url: impl Into<String>,
        user_id: impl Into<UserId>,
        config: AppConfig,
    ) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            server_url: server_url.into(),
            user_id: user_id.into(),
            config,
            rooms: HashMap::new(),
            active_room: None,
            pending_attachments: Vec::new(),
            toasts: VecDeque::new(),
            clock: Duration::ZERO,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Input(line) => self.handle_input(&line),
            AppEvent::Tick(elapsed) => {
                self.clock = self.clock.max(elapsed);
                let before = self.toasts.len();
                let now = self.clock;
                self.toasts.retain(|t| t.expires_at > now);
                if self.toasts.len() == before { vec![] } else { vec![AppAction::Render] }
            },
            AppEvent::Connecting => {
                self.state = ConnectionState::Connecting;
                vec![AppAction::Render]
            },
            AppEvent::Connected => {
                self.state = ConnectionState::Connected;
                vec![AppAction::LoadRooms, AppAction::Render]
            },
            AppEvent::Disconnected { reason } => {
                self.state = ConnectionState::Disconnected;
                self.push_toast(format!("Disconnected: {reason}"));
                vec![AppAction::Render]
            },
            AppEvent::RoomUpdated(summary) => {
                let room_id = summary.room_id.clone();
                self.rooms.entry(room_id.clone()).or_insert_with(|| RoomView::new(room_id)).summary =
                    summary;
                vec![AppAction::Render]
            },
            AppEvent::MessagesChanged { room_id, messages } => {
                self.rooms.entry(room_id.clone()).or_insert_with(|| RoomView::new(room_id)).messages =
                    messages;
                vec![AppAction::Render]
            },
            AppEvent::Toast { message } => {
                self.push_toast(message);
                vec![AppAction::Render]
            },
            AppEvent::Error { message } => {
                self.push_toast(format!("Error: {message}"));
                vec![AppAction::Render]
            },
        }
    }

    fn handle_input(&mut self, line: &str) -> Vec<AppAction> {
        match Command::parse(line) {
            Ok(Command::Open(room_id)) => self.open_room(room_id),
            Ok(Command::Close) => self.close_room(),
            Ok(Command::Leave(room_id)) => self.leave_room(room_id),
            Ok(Command::Connect) => match self.state {
                ConnectionState::Disconnected => self.connect(),
                ConnectionState::Connecting | ConnectionState::Connected => {
                    self.push_toast("Already connected");
                    vec![AppAction::Render]
                },
            },
            Ok(Command::Attach(draft)) => {
                self.push_toast(format!("Attached {}", draft.file_name));
                self.pending_attachments.push(draft);
                vec![AppAction::Render]
            },
            Ok(Command::Rooms) => vec![AppAction::LoadRooms, AppAction::Render],
            Ok(Command::Quit) => self.quit(),
            Ok(Command::Say(content)) => match self.active_room.clone() {
                Some(room_id) => self.send_message(room_id, content),
                None => {
                    self.push_toast("Open a room first: /open <room>");
                    vec![AppAction::Render]
                },
            },
            Err(CommandError::Empty) => vec![],
            Err(e) => {
                self.push_toast(e.to_string());
                vec![AppAction::Render]
            },
        }
    }

    fn push_toast(&mut self, message: impl Into<String>) {
        while self.toasts.len() >= self.config.max_toasts.max(1) {
            self.toasts.pop_front();
        }
        self.toasts
            .push_back(Toast { message: message.into(), expires_at: self.clock + self.config.toast_ttl });
    }

    /// Initiate connection to the broker.
    pub fn connect(&mut self) -> Vec<AppAction> {
        self.state = ConnectionState::Connecting;
        vec![AppAction::Connect { server_url: self.server_url.clone() }, AppAction::Render]
    }

    /// Open a room. Its unread badge clears immediately.
    pub fn open_room(&mut self, room_id: RoomId) -> Vec<AppAction> {
        let room = self.rooms.entry(room_id.clone()).or_insert_with(|| RoomView::new(room_id.clone()));
        room.summary.unread_count = 0;
        self.active_room = Some(room_id.clone());
        vec![AppAction::OpenRoom { room_id }, AppAction::Render]
    }

    /// Close the open room.
    pub fn close_room(&mut self) -> Vec<AppAction> {
        self.active_room = None;
        vec![AppAction::CloseRoom, AppAction::Render]
    }

    /// Leave a room. It stays in the list but no longer receives live messages.
    pub fn leave_room(&mut self, room_id: RoomId) -> Vec<AppAction> {
        if self.active_room.as_ref() == Some(&room_id) {
            self.active_room = None;
        }
        vec![AppAction::LeaveRoom { room_id }, AppAction::Render]
    }

    /// Send a message with every queued attachment.
    pub fn send_message(&mut self, room_id: RoomId, content: String) -> Vec<AppAction> {
        let attachments = std::mem::take(&mut self.pending_attachments);
        vec![AppAction::SendMessage { room_id, content, attachments }, AppAction::Render]
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    /// Broker URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Signed-in user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Every room the user has seen.
    pub fn rooms(&self) -> &HashMap<RoomId, RoomView> {
        &self.rooms
    }

    /// Rooms ordered for display: most recent activity first.
    pub fn room_list(&self) -> Vec<&RoomView> {
        let mut rooms: Vec<_> = self.rooms.values().collect();
        rooms.sort_by(|a, b| {
            b.summary
                .last_message_time
                .cmp(&a.summary.last_message_time)
                .then_with(|| a.room_id().cmp(b.room_id()))
        });
        rooms
    }

    /// Currently open room. `None` if no room is open.
    pub fn active_room(&self) -> Option<&RoomId> {
        self.active_room.as_ref()
    }

    /// View of the currently open room.
    pub fn active_room_view(&self) -> Option<&RoomView> {
        self.active_room.as_ref().and_then(|id| self.rooms.get(id))
    }

    /// Attachments queued for the next send.
    pub fn pending_attachments(&self) -> &[AttachmentDraft] {
        &self.pending_attachments
    }

    /// Visible toasts, oldest first.
    pub fn toasts(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    /// Unread messages across all rooms.
    pub fn total_unread(&self) -> u64 {
        self.rooms.values().map(|r| u64::from(r.unread_count())).sum()
    }
}

#[cfg(test)]
mod tests {
    use parley_core::RoomSummary;

    use super::*;

    fn connected_app() -> App {
        let mut app = App::new("ws://localhost:8080", "alice");
        app.state = ConnectionState::Connected;
        app
    }

    #[test]
    fn api_connect() {
        let mut app = App::new("ws://localhost:8080", "alice");
        let actions = app.connect();

        assert!(matches!(actions.as_slice(), [AppAction::Connect { .. }, AppAction::Render]));
        assert_eq!(app.connection_state(), ConnectionState::Connecting);
    }

    #[test]
    fn connected_loads_rooms() {
        let mut app = App::new("ws://localhost:8080", "alice");
        let actions = app.handle(AppEvent::Connected);

        assert_eq!(actions, vec![AppAction::LoadRooms, AppAction::Render]);
    }

    #[test]
    fn open_room_clears_badge() {
        let mut app = connected_app();
        let mut summary = RoomSummary::new("r1".into());
        summary.unread_count = 3;
        let _ = app.handle(AppEvent::RoomUpdated(summary));

        let actions = app.handle(AppEvent::Input("/open r1".into()));

        assert!(matches!(actions.as_slice(), [AppAction::OpenRoom { .. }, AppAction::Render]));
        assert_eq!(app.active_room(), Some(&RoomId::from("r1")));
        assert_eq!(app.total_unread(), 0);
    }

    #[test]
    fn leave_closes_active_room() {
        let mut app = connected_app();
        let _ = app.open_room("r1".into());

        let actions = app.handle(AppEvent::Input("/leave r1".into()));

        assert_eq!(actions, vec![AppAction::LeaveRoom { room_id: "r1".into() }, AppAction::Render]);
        assert_eq!(app.active_room(), None);
    }

    #[test]
    fn connect_command_only_when_disconnected() {
        let mut app = connected_app();
        assert_eq!(app.handle(AppEvent::Input("/connect".into())), vec![AppAction::Render]);
        assert_eq!(app.toasts().count(), 1);

        let _ = app.handle(AppEvent::Disconnected { reason: "reset".into() });
        let actions = app.handle(AppEvent::Input("/connect".into()));
        assert!(matches!(actions.as_slice(), [AppAction::Connect { .. }, AppAction::Render]));
        assert_eq!(app.connection_state(), ConnectionState::Connecting);
    }

    #[test]
    fn text_without_room_toasts() {
        let mut app = connected_app();
        let actions = app.handle(AppEvent::Input("hello".into()));

        assert_eq!(actions, vec![AppAction::Render]);
        assert_eq!(app.toasts().count(), 1);
    }

    #[test]
    fn send_takes_queued_attachments() {
        let mut app = connected_app();
        let _ = app.open_room("r1".into());
        let _ = app.handle(AppEvent::Input("/attach a.png image/png 10".into()));
        assert_eq!(app.pending_attachments().len(), 1);

        let actions = app.handle(AppEvent::Input("look".into()));

        match actions.as_slice() {
            [AppAction::SendMessage { room_id, content, attachments }, AppAction::Render] => {
                assert_eq!(room_id.as_str(), "r1");
                assert_eq!(content, "look");
                assert_eq!(attachments.len(), 1);
            },
            other => panic!("unexpected actions: {other:?}"),
        }
        assert!(app.pending_attachments().is_empty());
    }

    #[test]
    fn toasts_expire_on_tick() {
        let mut app = connected_app();
        let _ = app.handle(AppEvent::Toast { message: "boom".into() });

        assert!(app.handle(AppEvent::Tick(Duration::from_secs(1))).is_empty());
        assert_eq!(app.toasts().count(), 1);

        assert_eq!(app.handle(AppEvent::Tick(Duration::from_secs(5))), vec![AppAction::Render]);
        assert_eq!(app.toasts().count(), 0);
    }

    #[test]
    fn toast_queue_is_bounded() {
        let mut app = connected_app();
        for i in 0..10 {
            let _ = app.handle(AppEvent::Toast { message: format!("t{i}") });
        }

        let messages: Vec<_> = app.toasts().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["t5", "t6", "t7", "t8", "t9"]);
    }

    #[test]
    fn room_list_orders_by_activity() {
        let mut app = connected_app();
        for (room, time) in [("a", 10), ("b", 30), ("c", 20)] {
            let mut summary = RoomSummary::new(room.into());
            summary.last_message_time = Some(time);
            let _ = app.handle(AppEvent::RoomUpdated(summary));
        }

        let order: Vec<_> = app.room_list().iter().map(|r| r.room_id().as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn close_room_clears_active() {
        let mut app = connected_app();
        let _ = app.open_room("r1".into());
        let actions = app.handle(AppEvent::Input("/close".into()));

        assert_eq!(actions, vec![AppAction::CloseRoom, AppAction::Render]);
        assert_eq!(app.active_room(), None);
    }
}
