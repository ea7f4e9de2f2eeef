//! Terminal driver for the line client.
//!
//! Implements the [`Driver`] trait over stdin lines, a WebSocket broker
//! connection and the HTTP REST API. The view is printed to stdout whenever
//! it changes; logs go to stderr.

use std::{
    collections::VecDeque,
    io::{self, Stdout, Write, stdout},
    time::{Duration, Instant},
};

use parley_app::{ApiRequest, ApiResponse, App, AppEvent, Driver, Inbound};
use parley_client::{
    ChatApi,
    rest::HttpChatApi,
    transport::{self, ConnectedClient, TransportConfig, TransportError, TransportEvent},
};
use parley_proto::ClientFrame;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::mpsc::error::TryRecvError,
};

use crate::view;

/// How long `poll_event` waits before letting the runtime tick.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error on stdin or stdout.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Send attempted without a broker connection.
    #[error("not connected")]
    NotConnected,

    /// Connection task is gone.
    #[error("channel send error")]
    ChannelSend,
}

/// What woke up `poll_event`.
enum Wake {
    Line(Option<String>),
    Transport(Option<TransportEvent>),
    Timeout,
}

/// Terminal driver implementing the [`Driver`] trait.
pub struct TerminalDriver {
    lines: Lines<BufReader<Stdin>>,
    input_closed: bool,
    connection: Option<ConnectedClient>,
    inbound: VecDeque<Inbound>,
    api: HttpChatApi,
    transport: TransportConfig,
    out: Stdout,
    last_view: String,
}

impl TerminalDriver {
    /// Create a driver using the REST API at `api_url`.
    pub fn new(api_url: &str, transport: TransportConfig) -> Result<Self, TerminalError> {
        let api = HttpChatApi::new(api_url, &transport)?;
        Ok(Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            input_closed: false,
            connection: None,
            inbound: VecDeque::new(),
            api,
            transport,
            out: stdout(),
            last_view: String::new(),
        })
    }

    /// Queue a transport event for [`Driver::recv_frame`].
    ///
    /// `None` means the connection task ended without a close notice.
    fn buffer(&mut self, event: Option<TransportEvent>) {
        let inbound = match event {
            Some(TransportEvent::Frame(frame)) => Inbound::Frame(frame),
            Some(TransportEvent::SendFailed { frame, reason }) => {
                Inbound::SendFailed { frame, reason }
            },
            Some(TransportEvent::Closed) | None => {
                self.connection = None;
                Inbound::Closed { reason: "connection closed".to_string() }
            },
        };
        self.inbound.push_back(inbound);
    }
}

/// Next event from the connection, or never if there is none.
async fn next_transport_event(connection: Option<&mut ConnectedClient>) -> Option<TransportEvent> {
    match connection {
        Some(conn) => conn.from_server.recv().await,
        None => std::future::pending().await,
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        let wake = if self.input_closed {
            tokio::select! {
                event = next_transport_event(self.connection.as_mut()) => Wake::Transport(event),
                () = tokio::time::sleep(POLL_INTERVAL) => Wake::Timeout,
            }
        } else {
            tokio::select! {
                biased;

                line = self.lines.next_line() => Wake::Line(line?),
                event = next_transport_event(self.connection.as_mut()) => Wake::Transport(event),
                () = tokio::time::sleep(POLL_INTERVAL) => Wake::Timeout,
            }
        };

        match wake {
            Wake::Line(Some(line)) => Ok(Some(AppEvent::Input(line))),
            Wake::Line(None) => {
                // EOF on stdin ends the session
                self.input_closed = true;
                Ok(Some(AppEvent::Input("/quit".to_string())))
            },
            Wake::Transport(event) => {
                self.buffer(event);
                Ok(None)
            },
            Wake::Timeout => Ok(None),
        }
    }

    async fn send_frame(&mut self, frame: ClientFrame) -> Result<(), Self::Error> {
        let conn = self.connection.as_ref().ok_or(TerminalError::NotConnected)?;
        conn.to_server.send(frame).await.map_err(|_| TerminalError::ChannelSend)
    }

    async fn recv_frame(&mut self) -> Option<Inbound> {
        if self.inbound.is_empty()
            && let Some(conn) = self.connection.as_mut()
        {
            match conn.from_server.try_recv() {
                Ok(event) => self.buffer(Some(event)),
                Err(TryRecvError::Disconnected) => self.buffer(None),
                Err(TryRecvError::Empty) => {},
            }
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

    async fn connect(&mut self, url: &str) -> Result<(), Self::Error> {
        self.stop();
        let client = transport::connect(url, &self.transport).await?;
        self.connection = Some(client);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some() || !self.inbound.is_empty()
    }

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        let rendered = view::render(app);
        if rendered == self.last_view {
            return Ok(());
        }

        let mut out = self.out.lock();
        writeln!(out)?;
        out.write_all(rendered.as_bytes())?;
        out.flush()?;
        self.last_view = rendered;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.stop();
        }
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
