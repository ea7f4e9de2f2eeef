//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use parley_proto::{ClientFrame, ServerFrame};

use crate::{ApiRequest, ApiResponse, App, AppEvent};

/// Something the broker connection delivered.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Frame pushed by the broker.
    Frame(ServerFrame),
    /// A frame accepted by [`Driver::send_frame`] was later lost.
    SendFailed {
        /// Frame that was not delivered.
        frame: ClientFrame,
        /// Failure description.
        reason: String,
    },
    /// Connection closed.
    Closed {
        /// Close reason.
        reason: String,
    },
}

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in the terminal client and simulation.
///
/// # Implementations
///
/// - **CLI**: stdin lines, WebSocket broker connection, HTTP REST calls
/// - **Simulation**: in-memory broker and REST store with seeded faults
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Poll for the next input event.
    ///
    /// Returns an event or `None` if no events are ready.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Send a frame to the broker.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the send fails. The
    /// runtime reports the failure to the client; it does not stop.
    fn send_frame(
        &mut self,
        frame: ClientFrame,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive from the broker connection.
    ///
    /// Returns `None` if nothing is ready.
    fn recv_frame(&mut self) -> impl Future<Output = Option<Inbound>> + Send;

    /// Perform a REST request.
    fn perform_request(&mut self, request: ApiRequest) -> impl Future<Output = ApiResponse> + Send;

    /// Establish connection to the broker.
    ///
    /// # Errors
    ///
    /// Returns an error if connection cannot be established.
    fn connect(&mut self, url: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Check if connected to the broker.
    fn is_connected(&self) -> bool;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Stop the connection and clean up resources.
    fn stop(&mut self);
}
