//! Per-namespace session: owns a lazily-created Pump, exposes
//! `remote_call`/`open_channel` (spec.md §4.4).
//!
//! Grounded on the teacher's per-session connect/disconnect pattern in
//! `examples/xbcsmith-xzatoma/src/mcp/client.rs` (`JsonRpcClient::request`
//! awaiting a `oneshot` resolved by the read loop) generalized to two
//! interaction shapes -- one-shot calls and long-lived channels -- per
//! spec.md §4.4 and §4.5.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::channel::Channel;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::multiplex::{new_inbox, InboxItem};
use crate::protocol::{ChannelCreateFrame, Namespace, RpcCallFrame};
use crate::pump::Pump;
use crate::transport::websocket::WebSocketTransport;
use crate::transport::{authenticate, Transport};

/// One websocket connection dedicated to a single API namespace.
///
/// The transport/pump pair is brought up lazily on first use and torn down
/// by [`Session::disconnect`]; a subsequent call or channel open reconnects.
pub struct Session {
    namespace: Namespace,
    config: ClientConfig,
    pump: Mutex<Option<Arc<Pump>>>,
}

impl Session {
    pub fn new(namespace: Namespace, config: ClientConfig) -> Self {
        Self {
            namespace,
            config,
            pump: Mutex::new(None),
        }
    }

    /// True if a transport/pump pair is currently up. Exposed for tests
    /// asserting the "lazy connect" invariant (spec.md §8, property 6).
    pub async fn is_connected(&self) -> bool {
        self.pump.lock().await.is_some()
    }

    async fn ensure_connected(&self) -> Result<Arc<Pump>> {
        let mut guard = self.pump.lock().await;
        if let Some(pump) = guard.as_ref() {
            return Ok(Arc::clone(pump));
        }
        let pump = Arc::new(self.connect().await?);
        *guard = Some(Arc::clone(&pump));
        Ok(pump)
    }

    async fn connect(&self) -> Result<Pump> {
        let host = self.config.normalized_host();
        let namespace_path = self.namespace.as_path();
        debug!(target: "lmskit::session", %host, namespace = namespace_path, "connecting");

        let mut transport: Box<dyn Transport> =
            Box::new(WebSocketTransport::connect(&host, namespace_path).await?);
        authenticate(
            transport.as_mut(),
            self.config.identifier_or_generated(),
            self.config.passkey_or_generated(),
        )
        .await?;

        Ok(Pump::spawn(transport))
    }

    /// Release the transport. A subsequent operation reconnects and starts
    /// a fresh `Multiplexer` (ids are never recycled across reconnects,
    /// spec.md §9 open question (b)).
    pub async fn disconnect(&self) {
        let mut guard = self.pump.lock().await;
        if let Some(pump) = guard.take() {
            pump.terminate();
        }
    }

    /// Construct a [`Session`] whose transport/pump is already running,
    /// bypassing the websocket connect -- used by tests to inject a
    /// [`crate::transport::fake::FakeTransport`].
    #[cfg(any(test, feature = "test-util"))]
    pub fn from_pump(namespace: Namespace, config: ClientConfig, pump: Pump) -> Self {
        Self {
            namespace,
            config,
            pump: Mutex::new(Some(Arc::new(pump))),
        }
    }

    /// Send `rpcCall` and block until `rpcResult`, `rpcError`, or shutdown.
    /// Enforces "exactly one result per call_id" (spec.md §3) by construction:
    /// the inbox is removed from the multiplexer after its first frame.
    pub async fn remote_call(&self, endpoint: &str, params: Value) -> Result<Value> {
        let pump = self.ensure_connected().await?;
        let (tx, mut rx) = new_inbox();
        let call_id = pump.multiplexer().register_call(tx).await;

        let frame = RpcCallFrame::new(call_id, endpoint, params);
        let send_result = pump.submit_send(serde_json::to_value(&frame)?).await;
        if let Err(e) = send_result {
            pump.multiplexer().remove_call(call_id).await;
            return Err(e);
        }

        match rx.recv().await {
            Some(InboxItem::Frame(frame)) => match frame.kind() {
                crate::protocol::FrameKind::RpcResult => {
                    Ok(frame.result.unwrap_or(Value::Null))
                }
                crate::protocol::FrameKind::RpcError => {
                    let err = frame.error.ok_or_else(|| {
                        Error::Channel("rpcError frame missing error payload".to_string())
                    })?;
                    Err(Error::Rpc {
                        title: err.title,
                        cause: err.cause,
                        stack: err.stack,
                    })
                }
                _ => Err(Error::Channel(format!(
                    "unexpected frame kind for call: {}",
                    frame.kind
                ))),
            },
            Some(InboxItem::Shutdown) | None => Err(Error::Disconnected),
        }
    }

    /// Open a channel: allocate a `channel_id`, send `channelCreate` with
    /// `creation_parameter`, and return the [`Channel`] handle.
    pub async fn open_channel(
        &self,
        endpoint: &str,
        creation_parameter: Value,
    ) -> Result<Channel> {
        let pump = self.ensure_connected().await?;
        let (tx, rx) = new_inbox();
        let channel_id = pump.multiplexer().register_channel(tx).await;

        let frame = ChannelCreateFrame::new(channel_id, endpoint, creation_parameter);
        if let Err(e) = pump.submit_send(serde_json::to_value(&frame)?).await {
            pump.multiplexer().remove_channel(channel_id).await;
            return Err(e);
        }

        Ok(Channel::new(channel_id, pump, rx))
    }
}
