//! In-memory paired transport for tests
//!
//! Grounded on the teacher's `mcp::transport::fake::FakeTransport`
//! (`examples/xbcsmith-xzatoma/src/mcp/transport/fake.rs`): two unbounded
//! channels standing in for the wire, with a [`FakeTransport::server_handle`]
//! the test drives directly to script server behavior, instead of spinning
//! up a real listener.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// The client-facing half of an in-memory transport pair.
pub struct FakeTransport {
    to_server: mpsc::UnboundedSender<Value>,
    from_server: mpsc::UnboundedReceiver<Value>,
    closed: bool,
}

/// The test-facing half: scripts server sends and observes client sends.
pub struct FakeServerHandle {
    to_client: mpsc::UnboundedSender<Value>,
    from_client: mpsc::UnboundedReceiver<Value>,
}

impl FakeTransport {
    /// Build a connected pair: a [`FakeTransport`] to hand to production
    /// code under test, and a [`FakeServerHandle`] the test uses to script
    /// server behavior.
    pub fn pair() -> (Self, FakeServerHandle) {
        let (to_server, from_client) = mpsc::unbounded_channel();
        let (to_client, from_server) = mpsc::unbounded_channel();
        (
            Self {
                to_server,
                from_server,
                closed: false,
            },
            FakeServerHandle {
                to_client,
                from_client,
            },
        )
    }
}

impl FakeServerHandle {
    /// Push one frame to the client as if the server had sent it.
    pub fn send(&self, frame: Value) {
        let _ = self.to_client.send(frame);
    }

    /// Receive the next frame the client sent, if any.
    pub async fn recv(&mut self) -> Option<Value> {
        self.from_client.recv().await
    }

    /// Drop the server's sending half, simulating the transport failing.
    pub fn disconnect(self) {
        drop(self.to_client);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&mut self, frame: Value) -> Result<()> {
        if self.closed {
            return Err(Error::Tx("transport closed".to_string()));
        }
        self.to_server
            .send(frame)
            .map_err(|_| Error::Tx("peer dropped".to_string()))
    }

    async fn recv(&mut self) -> Result<Option<Value>> {
        Ok(self.from_server.recv().await)
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn round_trips_a_frame_each_direction() {
        let (mut client, mut server) = FakeTransport::pair();
        client.send(json!({"hello": "server"})).await.unwrap();
        assert_eq!(server.recv().await.unwrap(), json!({"hello": "server"}));

        server.send(json!({"hello": "client"}));
        assert_eq!(client.recv().await.unwrap(), Some(json!({"hello": "client"})));
    }

    #[tokio::test]
    async fn disconnect_ends_client_recv() {
        let (mut client, server) = FakeTransport::pair();
        server.disconnect();
        assert_eq!(client.recv().await.unwrap(), None);
    }
}
