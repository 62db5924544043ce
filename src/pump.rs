//! The background Pump: owns the transport, drives the receive loop, and
//! serializes outgoing sends (spec.md §4.3).
//!
//! Grounded on `other_examples/.../clockworklabs-SpacetimeDB__.../background_connection.rs.rs`'s
//! `BackgroundDbConnection`: a dedicated Tokio task owns the socket,
//! `JoinHandle`s track the receive task, and a channel carries outgoing
//! writes across from caller threads. This module additionally implements
//! the ordered shutdown protocol from spec.md §5.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{Error, Result};
use crate::multiplex::{InboxItem, Multiplexer, SharedMultiplexer};
use crate::protocol::InboundFrame;
use crate::transport::Transport;

/// A queued outbound send: the frame plus a one-shot to signal completion.
struct SendRequest {
    frame: Value,
    done: oneshot::Sender<Result<()>>,
}

/// Handle to a running background pump. Cloning shares the same
/// submission channel and join handle.
pub struct Pump {
    submit_tx: mpsc::UnboundedSender<SendRequest>,
    terminate_tx: mpsc::UnboundedSender<()>,
    task: Option<JoinHandle<()>>,
    multiplexer: SharedMultiplexer,
}

impl Pump {
    /// Start the pump: a dedicated task owns `transport` for its whole
    /// lifetime, running a receive loop concurrently with a submission
    /// loop, until either fails or [`Pump::terminate`] is called.
    pub fn spawn(mut transport: Box<dyn Transport>) -> Self {
        let multiplexer: SharedMultiplexer = Arc::new(Multiplexer::new());
        let (submit_tx, mut submit_rx) = mpsc::unbounded_channel::<SendRequest>();
        let (terminate_tx, mut terminate_rx) = mpsc::unbounded_channel::<()>();

        let mux_for_task = Arc::clone(&multiplexer);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = terminate_rx.recv() => {
                        info!(target: "lmskit::pump", "terminate requested");
                        break;
                    }

                    maybe_req = submit_rx.recv() => {
                        match maybe_req {
                            Some(req) => {
                                let result = transport.send(req.frame).await;
                                let _ = req.done.send(result);
                            }
                            None => {
                                info!(target: "lmskit::pump", "submission channel closed");
                                break;
                            }
                        }
                    }

                    recv_result = transport.recv() => {
                        match recv_result {
                            Ok(Some(raw)) => {
                                match serde_json::from_value::<InboundFrame>(raw) {
                                    Ok(frame) => { mux_for_task.map_rx(frame).await; }
                                    Err(e) => {
                                        tracing::warn!(target: "lmskit::pump", error = %e, "dropping malformed inbound frame");
                                    }
                                }
                            }
                            Ok(None) => {
                                info!(target: "lmskit::pump", "transport closed by peer");
                                break;
                            }
                            Err(e) => {
                                tracing::warn!(target: "lmskit::pump", error = %e, "transport rx failure, shutting down");
                                break;
                            }
                        }
                    }
                }
            }

            // Shutdown protocol (spec.md §5): multiplexer fan-out, then
            // transport close.
            mux_for_task.shutdown().await;
            transport.close().await;
        });

        Self {
            submit_tx,
            terminate_tx,
            task: Some(task),
            multiplexer,
        }
    }

    /// Shared handle to this pump's multiplexer.
    pub fn multiplexer(&self) -> SharedMultiplexer {
        Arc::clone(&self.multiplexer)
    }

    /// Submit a frame for sending; resolves once the background task has
    /// handed it to the transport (or the pump has already terminated).
    pub async fn submit_send(&self, frame: Value) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.submit_tx
            .send(SendRequest {
                frame,
                done: done_tx,
            })
            .map_err(|_| Error::Disconnected)?;
        done_rx.await.map_err(|_| Error::Disconnected)?
    }

    /// Fire-and-forget request to end the background task. Idempotent.
    pub fn terminate(&self) {
        let _ = self.terminate_tx.send(());
    }

    /// Wait for the background task to fully exit.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplex::new_inbox;
    use crate::transport::fake::FakeTransport;
    use serde_json::json;

    #[tokio::test]
    async fn submitted_send_reaches_server() {
        let (client, mut server) = FakeTransport::pair();
        let pump = Pump::spawn(Box::new(client));

        pump.submit_send(json!({"type": "rpcCall", "callId": 0}))
            .await
            .unwrap();
        let received = server.recv().await.unwrap();
        assert_eq!(received["callId"], 0);
    }

    #[tokio::test]
    async fn received_frame_routes_to_registered_inbox() {
        let (client, server) = FakeTransport::pair();
        let pump = Pump::spawn(Box::new(client));
        let mux = pump.multiplexer();

        let (tx, mut rx) = new_inbox();
        let id = mux.register_call(tx).await;

        server.send(json!({"type": "rpcResult", "callId": id, "result": {"ok": true}}));

        match rx.recv().await.unwrap() {
            InboxItem::Frame(f) => assert_eq!(f.call_id, Some(id)),
            InboxItem::Shutdown => panic!("unexpected shutdown"),
        }
    }

    #[tokio::test]
    async fn peer_disconnect_shuts_down_multiplexer() {
        let (client, server) = FakeTransport::pair();
        let mut pump = Pump::spawn(Box::new(client));
        let mux = pump.multiplexer();
        let (tx, mut rx) = new_inbox();
        mux.register_call(tx).await;

        server.disconnect();
        pump.join().await;

        assert!(matches!(rx.recv().await.unwrap(), InboxItem::Shutdown));
        assert!(mux.is_shutdown());
    }

    #[tokio::test]
    async fn explicit_terminate_runs_shutdown_protocol() {
        let (client, _server) = FakeTransport::pair();
        let mut pump = Pump::spawn(Box::new(client));
        let mux = pump.multiplexer();

        pump.terminate();
        pump.join().await;

        assert!(mux.is_shutdown());
    }
}
