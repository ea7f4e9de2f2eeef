//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: Protocol bridge to Client
//! - [`Driver`]: Platform-specific I/O

use parley_client::ClientConfig;
use parley_core::{RoomId, UserId, env::Environment};

use crate::{App, AppAction, AppConfig, AppEvent, Bridge, Driver, Inbound};

/// Generic runtime that orchestrates App, Bridge, and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for token generation and timestamps
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    app: App,
    bridge: Bridge<E>,
    initial_room: Option<RoomId>,
    started: Option<D::Instant>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    /// Create a new runtime with the given driver and environment.
    pub fn new(driver: D, env: E, user_id: UserId, server_url: String) -> Self {
        Self::with_config(
            driver,
            env,
            user_id,
            server_url,
            AppConfig::default(),
            ClientConfig::default(),
        )
    }

    /// Create a new runtime with explicit App and Client configs.
    pub fn with_config(
        driver: D,
        env: E,
        user_id: UserId,
        server_url: String,
        app_config: AppConfig,
        client_config: ClientConfig,
    ) -> Self {
        let app = App::with_config(server_url, user_id.clone(), app_config);
        let bridge = Bridge::with_config(env, user_id, client_config);
        Self { driver, app, bridge, initial_room: None, started: None }
    }

    /// Open `room_id` as soon as the connection is up.
    #[must_use]
    pub fn with_initial_room(mut self, room_id: RoomId) -> Self {
        self.initial_room = Some(room_id);
        self
    }

    /// Run the main event loop.
    ///
    /// This is the core orchestration loop that:
    /// 1. Polls for input events from the driver
    /// 2. Receives frames from the broker
    /// 3. Performs pending REST requests
    /// 4. Ticks the App clock
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an input or render error.
    /// Broker and REST failures are surfaced to the user, not returned.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.start().await?;

        loop {
            if self.process_cycle().await? {
                break;
            }
        }

        self.driver.stop();
        Ok(())
    }

    /// Render, connect and open the initial room.
    ///
    /// Returns `true` if the application should quit.
    pub async fn start(&mut self) -> Result<bool, D::Error> {
        self.started = Some(self.driver.now());
        self.driver.render(&self.app)?;

        let actions = self.app.connect();
        if self.process_actions(actions).await? {
            return Ok(true);
        }

        if let Some(room_id) = self.initial_room.take() {
            let actions = self.app.open_room(room_id);
            return self.process_actions(actions).await;
        }
        Ok(false)
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    pub async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        if let Some(event) = self.driver.poll_event().await? {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }

        if self.driver.is_connected()
            && let Some(inbound) = self.driver.recv_frame().await
        {
            let mut events = match inbound {
                Inbound::Frame(frame) => self.bridge.handle_frame(frame),
                Inbound::SendFailed { frame, reason } => {
                    self.bridge.handle_send_failed(frame, &reason)
                },
                Inbound::Closed { reason } => {
                    tracing::warn!(%reason, "broker connection closed");
                    self.bridge.handle_disconnected(&reason)
                },
            };
            events.extend(self.send_outgoing_frames().await);
            if self.process_bridge_events(events).await? {
                return Ok(true);
            }
        }

        if self.perform_requests().await? {
            return Ok(true);
        }

        let now = self.driver.now();
        let elapsed = self.started.map(|start| now - start).unwrap_or_default();
        let actions = self.app.handle(AppEvent::Tick(elapsed));
        self.process_actions(actions).await
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => return Ok(true),
                    AppAction::Connect { server_url } => {
                        let events = self.connect(&server_url).await;
                        for event in events {
                            pending_actions.extend(self.app.handle(event));
                        }
                    },

                    // Protocol operations go through the bridge
                    AppAction::OpenRoom { .. }
                    | AppAction::CloseRoom
                    | AppAction::LeaveRoom { .. }
                    | AppAction::SendMessage { .. }
                    | AppAction::LoadRooms => {
                        let mut events = self.bridge.process_app_action(action);
                        events.extend(self.send_outgoing_frames().await);
                        for event in events {
                            pending_actions.extend(self.app.handle(event));
                        }
                    },
                }
            }
        }
        Ok(false)
    }

    /// Connect the driver and re-subscribe rooms.
    ///
    /// Failures become a `Disconnected` event; the app keeps running and the
    /// user can retry with `/connect`.
    async fn connect(&mut self, server_url: &str) -> Vec<AppEvent> {
        match self.driver.connect(server_url).await {
            Ok(()) => {
                tracing::info!(%server_url, user_id = %self.bridge.user_id(), "connected");
                let mut events = self.bridge.handle_connected();
                events.extend(self.send_outgoing_frames().await);
                events.push(AppEvent::Connected);
                events
            },
            Err(e) => {
                tracing::warn!(%server_url, error = %e, "connect failed");
                self.bridge.handle_disconnected(&e.to_string())
            },
        }
    }

    /// Perform every queued REST request.
    ///
    /// Returns `true` if should quit.
    async fn perform_requests(&mut self) -> Result<bool, D::Error> {
        let requests = self.bridge.take_requests();
        for request in requests {
            let response = self.driver.perform_request(request).await;
            let mut events = self.bridge.handle_api_response(response);
            events.extend(self.send_outgoing_frames().await);
            if self.process_bridge_events(events).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Process events from Bridge back to App.
    async fn process_bridge_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        for event in events {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Send all pending outgoing frames to the broker.
    ///
    /// Frames the driver rejects are reported back to the client.
    async fn send_outgoing_frames(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();
        for frame in self.bridge.take_outgoing() {
            if let Err(e) = self.driver.send_frame(frame.clone()).await {
                tracing::warn!(error = %e, "frame not sent");
                events.extend(self.bridge.handle_send_failed(frame, &e.to_string()));
            }
        }
        events
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a reference to the Bridge
    pub fn bridge(&self) -> &Bridge<E> {
        &self.bridge
    }

    /// Get a mutable reference to the driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
