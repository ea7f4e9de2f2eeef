//! WebSocket transport for the client.
//!
//! Provides [`ConnectedClient`] which handles WebSocket I/O for frame
//! transport. This is a thin layer that just sends/receives frames - protocol
//! logic remains in the Sans-IO [`crate::Client`].

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parley_proto::{ClientFrame, ServerFrame};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message as WsMessage};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] parley_proto::ProtocolError),
}

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Capacity of the frame channels in each direction.
    pub channel_capacity: usize,
    /// Timeout for REST requests.
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { channel_capacity: 64, request_timeout: Duration::from_secs(10) }
    }
}

/// Events delivered by the transport task.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Frame pushed by the broker.
    Frame(ServerFrame),
    /// A frame could not be written to the socket.
    SendFailed {
        /// Frame that was not delivered.
        frame: ClientFrame,
        /// Failure description.
        reason: String,
    },
    /// Connection closed by either side.
    Closed,
}

/// Handle to a connected client with WebSocket transport.
///
/// Provides channels for frame transport. Frames are sent/received via
/// the channels, and an internal task handles the socket I/O.
pub struct ConnectedClient {
    /// Send frames to the broker.
    pub to_server: mpsc::Sender<ClientFrame>,
    /// Receive transport events.
    pub from_server: mpsc::Receiver<TransportEvent>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedClient {
    /// Stop the connection.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Connect to a Parley broker over WebSocket (`ws://` or `wss://`).
pub async fn connect(
    server_url: &str,
    config: &TransportConfig,
) -> Result<ConnectedClient, TransportError> {
    let url = Url::parse(server_url)
        .map_err(|e| TransportError::Connection(format!("invalid url: {e}")))?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(TransportError::Connection(format!(
            "url must use ws:// or wss://, got {}",
            url.scheme()
        )));
    }

    let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| TransportError::Connection(format!("handshake failed: {e}")))?;

    tracing::info!(%url, "connected to broker");

    let (to_server_tx, to_server_rx) = mpsc::channel::<ClientFrame>(config.channel_capacity);
    let (from_server_tx, from_server_rx) = mpsc::channel::<TransportEvent>(config.channel_capacity);

    let handle = tokio::spawn(run_connection(stream, to_server_rx, from_server_tx));

    Ok(ConnectedClient {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the connection, bridging between channels and the socket.
async fn run_connection(
    stream: WsStream,
    mut to_server: mpsc::Receiver<ClientFrame>,
    events: mpsc::Sender<TransportEvent>,
) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            outgoing = to_server.recv() => {
                let Some(frame) = outgoing else { break };
                let result = match parley_proto::encode(&frame) {
                    Ok(text) => sink
                        .send(WsMessage::text(text))
                        .await
                        .map_err(|e| TransportError::Stream(format!("write failed: {e}"))),
                    Err(e) => Err(TransportError::from(e)),
                };

                if let Err(e) = result {
                    tracing::warn!(error = %e, "send failed");
                    let failed = TransportEvent::SendFailed { frame, reason: e.to_string() };
                    if events.send(failed).await.is_err() {
                        break;
                    }
                }
            },
            incoming = source.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => match parley_proto::decode(text.as_str()) {
                        Ok(frame) => {
                            if events.send(TransportEvent::Frame(frame)).await.is_err() {
                                break;
                            }
                        },
                        Err(e) => tracing::warn!(error = %e, "dropping undecodable frame"),
                    },
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    // Ping/pong are answered by tungstenite; binary frames are not part of the protocol
                    Some(Ok(_)) => {},
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "socket error");
                        break;
                    },
                }
            },
        }
    }

    tracing::info!("broker connection closed");
    fail_unsent(&mut to_server, &events).await;
    let _ = events.send(TransportEvent::Closed).await;
}

/// Report every frame accepted into the channel but never written.
async fn fail_unsent(to_server: &mut mpsc::Receiver<ClientFrame>, events: &mpsc::Sender<TransportEvent>) {
    to_server.close();
    while let Ok(frame) = to_server.try_recv() {
        let failed =
            TransportEvent::SendFailed { frame, reason: "connection closed before send".to_string() };
        if events.send(failed).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsent_frames_fail_in_order() {
        let (to_server_tx, mut to_server_rx) = mpsc::channel(8);
        let (events_tx, mut events_rx) = mpsc::channel(8);

        for room in ["a", "b"] {
            to_server_tx.send(ClientFrame::JoinRoom { room_id: room.into() }).await.unwrap();
        }
        fail_unsent(&mut to_server_rx, &events_tx).await;

        for room in ["a", "b"] {
            match events_rx.recv().await {
                Some(TransportEvent::SendFailed { frame, reason }) => {
                    assert_eq!(frame, ClientFrame::JoinRoom { room_id: room.into() });
                    assert_eq!(reason, "connection closed before send");
                },
                other => panic!("expected send failure, got {other:?}"),
            }
        }
        assert!(events_rx.try_recv().is_err());

        // The channel is closed: later sends fail at the caller
        assert!(to_server_tx.send(ClientFrame::JoinRoom { room_id: "c".into() }).await.is_err());
    }
}
