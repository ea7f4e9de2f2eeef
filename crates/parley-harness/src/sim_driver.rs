//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`parley_app::Runtime`] orchestration code runs in both production and
//! simulation. Frames go to a [`SimBroker`](crate::SimBroker) and REST calls
//! to a [`MemoryApi`] backed by the same broker.

use std::{
    collections::VecDeque,
    sync::{MutexGuard, PoisonError},
};

use parley_app::{ApiRequest, ApiResponse, App, AppEvent, Driver, Inbound};
use parley_client::ChatApi;
use parley_core::{UserId, env::Environment};
use parley_proto::ClientFrame;

use crate::{
    SimBroker,
    sim_broker::{ConnectionId, MemoryApi, SharedSimBroker},
    sim_env::{SimEnv, SimInstant},
};

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Simulation driver for deterministic testing.
pub struct SimDriver {
    broker: SharedSimBroker,
    api: MemoryApi,
    env: SimEnv,
    user_id: UserId,
    connection: Option<ConnectionId>,
    pending_events: VecDeque<AppEvent>,
    inbound: VecDeque<Inbound>,
    sent: Vec<ClientFrame>,
    renders: usize,
    fail_connect: bool,
    fail_sends: bool,
    hold_sends: bool,
    /// Frames accepted but not yet on the wire.
    held: Vec<ClientFrame>,
}

impl SimDriver {
    /// Create a driver for `user_id` talking to `broker`.
    pub fn new(broker: SharedSimBroker, env: SimEnv, user_id: impl Into<UserId>) -> Self {
        let user_id = user_id.into();
        let api = MemoryApi::new(broker.clone(), user_id.clone());
        Self {
            broker,
            api,
            env,
            user_id,
            connection: None,
            pending_events: VecDeque::new(),
            inbound: VecDeque::new(),
            sent: Vec::new(),
            renders: 0,
            fail_connect: false,
            fail_sends: false,
            hold_sends: false,
            held: Vec::new(),
        }
    }

    fn broker(&self) -> MutexGuard<'_, SimBroker> {
        self.broker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inject an `AppEvent` for processing.
    pub fn inject_event(&mut self, event: AppEvent) {
        self.pending_events.push_back(event);
    }

    /// Inject a line of user input.
    pub fn inject_input(&mut self, line: impl Into<String>) {
        self.pending_events.push_back(AppEvent::Input(line.into()));
    }

    /// Inject something from the connection directly.
    pub fn inject_inbound(&mut self, inbound: Inbound) {
        self.inbound.push_back(inbound);
    }

    /// Make the next connection attempts fail.
    pub fn set_fail_connect(&mut self, fail: bool) {
        self.fail_connect = fail;
    }

    /// Make sends fail at the transport.
    pub fn set_fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }

    /// Accept sends without passing them to the broker until
    /// [`SimDriver::release_sends`] or [`SimDriver::drop_connection`].
    pub fn set_hold_sends(&mut self, hold: bool) {
        self.hold_sends = hold;
    }

    /// Pass every held frame to the broker.
    pub fn release_sends(&mut self) {
        let Some(id) = self.connection else {
            return;
        };
        let held = std::mem::take(&mut self.held);
        let mut broker = self.broker.lock().unwrap_or_else(PoisonError::into_inner);
        for frame in held {
            if broker.receive(id, frame.clone()).is_ok() {
                self.sent.push(frame);
            }
        }
    }

    /// Close the connection from the broker side.
    ///
    /// Held frames reach the broker first; whatever it pushes back is lost
    /// with the connection.
    pub fn drop_connection(&mut self) {
        self.release_sends();
        if let Some(id) = self.connection.take() {
            self.broker().disconnect(id);
            self.inbound.push_back(Inbound::Closed { reason: "connection reset".to_string() });
        }
    }

    /// REST client used for requests.
    pub fn api(&self) -> &MemoryApi {
        &self.api
    }

    /// Broker connection, if connected.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    /// Frames accepted by the driver so far.
    pub fn sent_frames(&self) -> &[ClientFrame] {
        &self.sent
    }

    /// Number of renders requested.
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Check if there are pending events or frames to process.
    pub fn has_pending(&self) -> bool {
        if !self.pending_events.is_empty() || !self.inbound.is_empty() {
            return true;
        }
        self.connection.is_some_and(|id| self.broker().pending_frames(id) > 0)
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        Ok(self.pending_events.pop_front())
    }

    async fn send_frame(&mut self, frame: ClientFrame) -> Result<(), Self::Error> {
        if self.fail_sends {
            return Err(SimDriverError("send failed".to_string()));
        }
        let id = self.connection.ok_or_else(|| SimDriverError("not connected".to_string()))?;
        if self.hold_sends {
            self.held.push(frame);
            return Ok(());
        }
        self.broker().receive(id, frame.clone()).map_err(|e| SimDriverError(e.to_string()))?;
        self.sent.push(frame);
        Ok(())
    }

    async fn recv_frame(&mut self) -> Option<Inbound> {
        if self.inbound.is_empty()
            && let Some(id) = self.connection
        {
            let frames = self.broker().take_inbox(id);
            self.inbound.extend(frames.into_iter().map(Inbound::Frame));
        }
        self.inbound.pop_front()
    }

    async fn perform_request(&mut self, request: ApiRequest) -> ApiResponse {
        match request {
            ApiRequest::FetchHistory { room_id, limit } => {
                let result = self.api.fetch_history(&room_id, limit).await;
                ApiResponse::History { room_id, result }
            },
            ApiRequest::UpdateUnread { room_id, unread_count } => {
                let result = self.api.update_unread(&room_id, unread_count).await;
                ApiResponse::Unread { room_id, result }
            },
            ApiRequest::FetchSummaries => ApiResponse::Summaries(self.api.fetch_summaries().await),
        }
    }

    async fn connect(&mut self, _url: &str) -> Result<(), Self::Error> {
        if self.fail_connect {
            return Err(SimDriverError("connection refused".to_string()));
        }
        let id = self.broker().connect(self.user_id.clone());
        self.connection = Some(id);
        Ok(())
    }

    /// Connected, or still holding inbound items such as the close notice.
    fn is_connected(&self) -> bool {
        self.connection.is_some() || !self.inbound.is_empty()
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn render(&mut self, _app: &App) -> Result<(), Self::Error> {
        self.renders += 1;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(id) = self.connection.take() {
            self.broker().disconnect(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FaultConfig, create_shared_broker};

    fn driver() -> SimDriver {
        SimDriver::new(create_shared_broker(1, FaultConfig::none()), SimEnv::new(), "alice")
    }

    #[test]
    fn inject_event_queues_event() {
        let mut driver = driver();
        driver.inject_input("/open r1");

        assert!(driver.has_pending());
    }

    #[tokio::test]
    async fn send_requires_connection() {
        let mut driver = driver();
        let frame = ClientFrame::JoinRoom { room_id: "r1".into() };

        assert!(driver.send_frame(frame.clone()).await.is_err());

        driver.connect("sim://broker").await.unwrap();
        driver.send_frame(frame).await.unwrap();
        assert_eq!(driver.sent_frames().len(), 1);
    }

    #[tokio::test]
    async fn held_sends_reach_broker_on_drop() {
        let mut driver = driver();
        driver.connect("sim://broker").await.unwrap();
        driver.set_hold_sends(true);
        driver.send_frame(ClientFrame::JoinRoom { room_id: "r1".into() }).await.unwrap();
        assert!(driver.sent_frames().is_empty());

        driver.drop_connection();

        assert_eq!(driver.sent_frames().len(), 1);
        assert!(matches!(driver.recv_frame().await, Some(Inbound::Closed { .. })));
    }

    #[tokio::test]
    async fn dropped_connection_reports_closed() {
        let mut driver = driver();
        driver.connect("sim://broker").await.unwrap();
        driver.drop_connection();

        assert!(driver.is_connected());
        assert!(matches!(driver.recv_frame().await, Some(Inbound::Closed { .. })));
        assert!(!driver.is_connected());
    }
}
