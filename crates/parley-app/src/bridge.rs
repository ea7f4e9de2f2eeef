//! Protocol-to-Application translation layer.
//!
//! The [`Bridge`] wraps the low-level [`parley_client::Client`] and adapts
//! it to the high-level application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts high-level [`crate::AppAction`] into client events.
//! - Accumulates outgoing [`ClientFrame`]s and pending [`ApiRequest`]s to be
//!   performed by the driver in the next I/O cycle.
//! - Interprets results from the client and converts them back into
//!   [`crate::AppEvent`]s to update the UI, including fresh message snapshots
//!   for every room the client touched.

use parley_client::{
    Client, ClientAction, ClientConfig, ClientError, ClientEvent, ClientIdentity,
};
use parley_core::{RoomId, UserId, env::Environment};
use parley_proto::{ClientFrame, ServerFrame};

use crate::{ApiRequest, ApiResponse, AppAction, AppEvent};

/// Bridge between App and Client protocol logic.
///
/// Generic over Environment to support both production and simulation.
pub struct Bridge<E: Environment> {
    client: Client<E>,
    outgoing: Vec<ClientFrame>,
    requests: Vec<ApiRequest>,
}

impl<E: Environment> Bridge<E> {
    /// Create a new Bridge with the given environment and user ID.
    pub fn new(env: E, user_id: impl Into<UserId>) -> Self {
        Self::with_config(env, user_id, ClientConfig::default())
    }

    /// Create a new Bridge with an explicit client config.
    pub fn with_config(env: E, user_id: impl Into<UserId>, config: ClientConfig) -> Self {
        let client = Client::with_config(env, ClientIdentity::new(user_id), config);
        Self { client, outgoing: Vec::new(), requests: Vec::new() }
    }

    /// Client's user ID.
    pub fn user_id(&self) -> &UserId {
        self.client.user_id()
    }

    /// Underlying client, for inspection.
    pub fn client(&self) -> &Client<E> {
        &self.client
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        match action {
            AppAction::OpenRoom { room_id } => {
                let result = self.client.handle(ClientEvent::OpenRoom { room_id });
                self.handle_client_result(result)
            },
            AppAction::CloseRoom => {
                let result = self.client.handle(ClientEvent::CloseRoom);
                self.handle_client_result(result)
            },
            AppAction::LeaveRoom { room_id } => {
                let result = self.client.handle(ClientEvent::LeaveRoom { room_id });
                self.handle_client_result(result)
            },
            AppAction::SendMessage { room_id, content, attachments } => {
                let result =
                    self.client.handle(ClientEvent::SendMessage { room_id, content, attachments });
                self.handle_client_result(result)
            },
            AppAction::LoadRooms => {
                self.requests.push(ApiRequest::FetchSummaries);
                vec![]
            },
            AppAction::Render | AppAction::Quit | AppAction::Connect { .. } => vec![],
        }
    }

    /// Handle a frame from the broker.
    pub fn handle_frame(&mut self, frame: ServerFrame) -> Vec<AppEvent> {
        let result = self.client.handle(ClientEvent::FrameReceived(frame));
        self.handle_client_result(result)
    }

    /// Transport (re)connected.
    pub fn handle_connected(&mut self) -> Vec<AppEvent> {
        let result = self.client.handle(ClientEvent::Connected);
        self.handle_client_result(result)
    }

    /// Transport closed or could not be opened.
    ///
    /// Sends still in flight fail with a toast; the app learns it is
    /// disconnected last.
    pub fn handle_disconnected(&mut self, reason: &str) -> Vec<AppEvent> {
        self.outgoing.clear();
        let result = self.client.handle(ClientEvent::Disconnected { reason: reason.to_string() });
        let mut events = self.handle_client_result(result);
        events.push(AppEvent::Disconnected { reason: reason.to_string() });
        events
    }

    /// A frame could not be delivered to the broker.
    pub fn handle_send_failed(&mut self, frame: ClientFrame, reason: &str) -> Vec<AppEvent> {
        match frame {
            ClientFrame::SendMessage { unique_id, .. } => {
                let result = self
                    .client
                    .handle(ClientEvent::SendFailed { unique_id, reason: reason.to_string() });
                self.handle_client_result(result)
            },
            ClientFrame::JoinRoom { room_id } => {
                tracing::warn!(room_id = %room_id, %reason, "subscribe failed");
                vec![AppEvent::Toast { message: format!("Could not join {room_id}: {reason}") }]
            },
            ClientFrame::LeaveRoom { room_id } => {
                tracing::debug!(room_id = %room_id, %reason, "unsubscribe failed");
                vec![]
            },
        }
    }

    /// Feed the result of a REST request back into the client.
    pub fn handle_api_response(&mut self, response: ApiResponse) -> Vec<AppEvent> {
        let event = match response {
            ApiResponse::History { room_id, result: Ok(messages) } => {
                ClientEvent::HistoryLoaded { room_id, messages }
            },
            ApiResponse::History { room_id, result: Err(e) } => {
                ClientEvent::HistoryFailed { room_id, reason: e.to_string() }
            },
            ApiResponse::Summaries(Ok(summaries)) => ClientEvent::SummariesLoaded(summaries),
            ApiResponse::Summaries(Err(e)) => {
                tracing::warn!(error = %e, "room list fetch failed");
                return vec![AppEvent::Toast { message: format!("Could not load rooms: {e}") }];
            },
            ApiResponse::Unread { room_id, result } => {
                if let Err(e) = result {
                    tracing::warn!(room_id = %room_id, error = %e, "unread update failed");
                }
                return vec![];
            },
        };

        let result = self.client.handle(event);
        self.handle_client_result(result)
    }

    /// Take pending outgoing frames.
    pub fn take_outgoing(&mut self) -> Vec<ClientFrame> {
        std::mem::take(&mut self.outgoing)
    }

    /// Take pending REST requests.
    pub fn take_requests(&mut self) -> Vec<ApiRequest> {
        std::mem::take(&mut self.requests)
    }

    fn handle_client_result(
        &mut self,
        result: Result<Vec<ClientAction>, ClientError>,
    ) -> Vec<AppEvent> {
        match result {
            Ok(actions) => self.process_client_actions(actions),
            Err(e) => vec![AppEvent::Error { message: e.to_string() }],
        }
    }

    fn process_client_actions(&mut self, actions: Vec<ClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        let mut touched: Vec<RoomId> = Vec::new();

        for action in actions {
            match action {
                ClientAction::Send(frame) => {
                    self.outgoing.push(frame);
                },
                ClientAction::MessageAppended { room_id, .. }
                | ClientAction::MessageConfirmed { room_id, .. }
                | ClientAction::MessageRemoved { room_id, .. }
                | ClientAction::AttachmentUpdated { room_id, .. } => {
                    if !touched.contains(&room_id) {
                        touched.push(room_id);
                    }
                },
                ClientAction::RoomUpdated(summary) => {
                    if !touched.contains(&summary.room_id) {
                        touched.push(summary.room_id.clone());
                    }
                    events.push(AppEvent::RoomUpdated(summary));
                },
                ClientAction::FetchHistory { room_id, limit } => {
                    self.requests.push(ApiRequest::FetchHistory { room_id, limit });
                },
                ClientAction::MarkRead { room_id } => {
                    let unread_count = self.client.unread_count(&room_id);
                    self.requests.push(ApiRequest::UpdateUnread { room_id, unread_count });
                },
                ClientAction::Toast { message } => {
                    events.push(AppEvent::Toast { message });
                },
                ClientAction::Log { message } => {
                    tracing::debug!(%message, "client");
                },
            }
        }

        events.extend(touched.into_iter().map(|room_id| {
            let messages = self.client.messages(&room_id).to_vec();
            AppEvent::MessagesChanged { room_id, messages }
        }));

        events
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

    use parley_client::ApiError;
    use parley_core::{Message, MessageStatus};

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
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = (n as u8).wrapping_add(i as u8);
            }
        }
    }

    fn bridge() -> Bridge<TestEnv> {
        Bridge::new(TestEnv::default(), "alice")
    }

    fn send(bridge: &mut Bridge<TestEnv>, room: &str, text: &str) -> Vec<AppEvent> {
        bridge.process_app_action(AppAction::SendMessage {
            room_id: room.into(),
            content: text.into(),
            attachments: vec![],
        })
    }

    #[test]
    fn send_message_produces_outgoing_frame() {
        let mut bridge = bridge();
        let events = send(&mut bridge, "r1", "hello");

        let outgoing = bridge.take_outgoing();
        assert!(matches!(outgoing.as_slice(), [ClientFrame::SendMessage { .. }]));
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::MessagesChanged { messages, .. } if messages.len() == 1
        )));
    }

    #[test]
    fn empty_send_produces_error() {
        let mut bridge = bridge();
        let events = send(&mut bridge, "r1", "  ");

        assert!(matches!(events.as_slice(), [AppEvent::Error { .. }]));
        assert!(bridge.take_outgoing().is_empty());
    }

    #[test]
    fn open_room_queues_history_and_subscribe() {
        let mut bridge = bridge();
        let _ = bridge.process_app_action(AppAction::OpenRoom { room_id: "r1".into() });

        assert_eq!(bridge.take_outgoing(), vec![ClientFrame::JoinRoom { room_id: "r1".into() }]);
        assert!(matches!(
            bridge.take_requests().as_slice(),
            [ApiRequest::FetchHistory { limit: 50, .. }]
        ));
    }

    #[test]
    fn failed_send_removes_entry() {
        let mut bridge = bridge();
        let _ = send(&mut bridge, "r1", "hello");
        let frame = bridge.take_outgoing().remove(0);

        let events = bridge.handle_send_failed(frame, "socket closed");

        assert!(events.iter().any(|e| matches!(e, AppEvent::Toast { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::MessagesChanged { messages, .. } if messages.is_empty()
        )));
    }

    #[test]
    fn echo_confirms_snapshot() {
        let mut bridge = bridge();
        let _ = send(&mut bridge, "r1", "hello");
        let Some(ClientFrame::SendMessage { unique_id, .. }) = bridge.take_outgoing().pop() else {
            panic!("expected send frame");
        };

        let echo = Message {
            unique_id,
            room_id: "r1".into(),
            user_id: "alice".into(),
            content: "hello".into(),
            attachments: vec![],
            status: MessageStatus::Sent,
            created_at: 2_000,
        };
        let events = bridge.handle_frame(ServerFrame::Message(echo));

        let snapshot = events.iter().find_map(|e| match e {
            AppEvent::MessagesChanged { messages, .. } => Some(messages.clone()),
            _ => None,
        });
        let messages = snapshot.unwrap_or_default();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].status, MessageStatus::Sent);
    }

    #[test]
    fn disconnect_fails_pending_sends() {
        let mut bridge = bridge();
        let _ = send(&mut bridge, "r1", "hello");

        let events = bridge.handle_disconnected("connection reset");

        assert!(bridge.take_outgoing().is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::Toast { message } if message.starts_with("Failed to send message")
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::MessagesChanged { messages, .. } if messages.is_empty()
        )));
        assert!(matches!(events.last(), Some(AppEvent::Disconnected { .. })));
    }

    #[test]
    fn leave_room_queues_unsubscribe() {
        let mut bridge = bridge();
        let _ = bridge.process_app_action(AppAction::OpenRoom { room_id: "r1".into() });
        let _ = bridge.take_outgoing();

        let _ = bridge.process_app_action(AppAction::LeaveRoom { room_id: "r1".into() });

        assert_eq!(bridge.take_outgoing(), vec![ClientFrame::LeaveRoom { room_id: "r1".into() }]);
    }

    #[test]
    fn failed_room_list_toasts() {
        let mut bridge = bridge();
        let events = bridge
            .handle_api_response(ApiResponse::Summaries(Err(ApiError::Request("offline".into()))));

        assert!(matches!(events.as_slice(), [AppEvent::Toast { .. }]));
    }

    #[test]
    fn load_rooms_queues_request() {
        let mut bridge = bridge();
        let events = bridge.process_app_action(AppAction::LoadRooms);

        assert!(events.is_empty());
        assert_eq!(bridge.take_requests(), vec![ApiRequest::FetchSummaries]);
    }
}
