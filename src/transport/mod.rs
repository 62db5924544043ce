//! Transport abstraction (spec.md §4.1)
//!
//! Grounded on the teacher's `mcp::transport::Transport` trait
//! (`examples/xbcsmith-xzatoma/src/mcp/transport/mod.rs`): a minimal
//! send/receive interface so the multiplex and pump layers are agnostic to
//! the concrete wire. The websocket implementation additionally matches the
//! sync-over-async bridging idiom of
//! `other_examples/.../clockworklabs-SpacetimeDB__.../background_connection.rs.rs`
//! (owning the socket from a single task, never sharing it across threads).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::protocol::{AuthenticateFrame, AuthenticatedFrame};

pub mod websocket;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

/// One persistent full-duplex connection, already past the handshake.
///
/// A `Transport` implementation is single-consumer, single-producer per
/// direction: exactly one task calls `send`, exactly one task calls `recv`.
/// Implementations never inspect payloads beyond the handshake response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Serialize and transmit one frame.
    async fn send(&mut self, frame: Value) -> Result<()>;

    /// Receive and deserialize one frame. Returns `Ok(None)` when the peer
    /// has closed the connection in an orderly way.
    async fn recv(&mut self) -> Result<Option<Value>>;

    /// Request orderly termination. Idempotent.
    async fn close(&mut self);
}

/// Perform the handshake described in spec.md §6 over an already-open
/// transport: send [`AuthenticateFrame`], read the reply, and fail with
/// [`crate::error::Error::Auth`] if `success` is `false`.
pub async fn authenticate(
    transport: &mut dyn Transport,
    client_identifier: String,
    client_passkey: String,
) -> Result<()> {
    let frame = AuthenticateFrame::new(client_identifier, client_passkey);
    let value = serde_json::to_value(&frame)?;
    transport.send(value).await?;

    let reply = transport
        .recv()
        .await?
        .ok_or_else(|| crate::error::Error::Connect("connection closed before handshake reply".into()))?;
    let reply: AuthenticatedFrame = serde_json::from_value(reply)?;
    if !reply.success {
        let detail = reply
            .error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown auth failure".to_string());
        return Err(crate::error::Error::Auth(detail));
    }
    Ok(())
}
