//! Duplex channel to the backend terminal endpoint.
//!
//! The session only sees the [`Transport`] trait. The socket itself lives in
//! two tokio tasks: a reader that turns text frames into [`Event::Socket`]
//! and a writer that drains serialized frames from an mpsc channel.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::event::Event;
use crate::protocol::OutboundMessage;

/// Outbound half of the connection as seen by the terminal session.
pub trait Transport {
    fn send(&mut self, message: &OutboundMessage) -> Result<()>;
}

/// Transport that hands serialized frames to the socket writer task.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        let frame = message.to_json()?;
        debug!(kind = message.kind(), "sending frame");
        self.tx
            .send(frame)
            .map_err(|_| AppError::Transport("socket writer closed".into()))
    }
}

/// Build `<base>/ws/terminal/<user id>` with the id percent-encoded as a
/// single path segment.
pub fn terminal_endpoint(base: &str, user_id: &str) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| AppError::InvalidUrl(format!("{base}: {e}")))?;
    match url.scheme() {
        "ws" | "wss" => {}
        "http" => url
            .set_scheme("ws")
            .map_err(|_| AppError::InvalidUrl(base.to_string()))?,
        "https" => url
            .set_scheme("wss")
            .map_err(|_| AppError::InvalidUrl(base.to_string()))?,
        other => {
            return Err(AppError::InvalidUrl(format!(
                "{base}: unsupported scheme {other}"
            )))
        }
    }
    url.path_segments_mut()
        .map_err(|_| AppError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(["ws", "terminal", user_id]);
    Ok(url)
}

/// Open the websocket and pump it until either side closes.
///
/// Frames queued on `outbound` (by a [`ChannelTransport`]) are written by a
/// spawned task; inbound text frames are delivered as [`Event::Socket`] from
/// this one. `Event::Connected` is sent once the handshake succeeds and
/// `Event::Disconnected` when the socket goes away.
pub async fn connect(
    endpoint: &Url,
    mut outbound: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::UnboundedSender<Event>,
) -> Result<()> {
    let (stream, _) = connect_async(endpoint.as_str()).await?;
    info!(%endpoint, "terminal socket connected");
    let _ = event_tx.send(Event::Connected);
    let (mut sink, mut source) = stream.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(err) = sink.send(Message::Text(frame)).await {
                warn!(error = %err, "socket write failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(message) = source.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if event_tx.send(Event::Socket(text)).is_err() {
                    break;
                }
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "socket closed by server");
                break;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "socket read failed");
                break;
            }
        }
    }
    writer.abort();
    info!("terminal socket disconnected");
    let _ = event_tx.send(Event::Disconnected);
    Ok(())
}
