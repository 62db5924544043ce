//! `tokio-tungstenite`-backed [`Transport`] implementation
//!
//! Enrichment source: the teacher crate has no websocket dependency, so the
//! crate choice is grounded on `other_examples/`'s websocket-client SDKs
//! (e.g. `clockworklabs-SpacetimeDB`'s `crates/client-sdk`, which pins
//! `tokio-tungstenite`), which are architecturally the closest fit for "a
//! client SDK that owns one persistent websocket per logical connection".

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{info, trace, warn};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// A connected websocket, ready to carry framed JSON messages.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: String,
}

impl WebSocketTransport {
    /// Open a websocket to `ws://<host>/<namespace>`.
    ///
    /// This only performs the transport-level connect; callers run
    /// [`crate::transport::authenticate`] afterwards to complete the
    /// handshake described in spec.md §6.
    pub async fn connect(host: &str, namespace_path: &str) -> Result<Self> {
        let url = format!("ws://{host}/{namespace_path}");
        info!(target: "lmskit::transport", %url, "connecting");
        let (stream, _response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| Error::Connect(e.to_string()))?;
        Ok(Self { stream, url })
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: Value) -> Result<()> {
        let text = serde_json::to_string(&frame)?;
        trace!(target: "lmskit::transport", url = %self.url, bytes = text.len(), "send");
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| Error::Tx(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<Value>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(target: "lmskit::transport", url = %self.url, bytes = text.len(), "recv");
                    return Ok(Some(serde_json::from_str(&text)?));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(Some(serde_json::from_slice(&bytes)?));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    warn!(target: "lmskit::transport", url = %self.url, error = %e, "rx error");
                    return Err(Error::Rx(e.to_string()));
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
        info!(target: "lmskit::transport", url = %self.url, "closed");
    }
}
