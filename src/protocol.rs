//! Wire envelope types for the multiplexed JSON-over-WebSocket protocol
//!
//! Every frame on the wire is a JSON object discriminated by its `type`
//! field. This mirrors the `camelCase`-on-the-wire convention the teacher's
//! MCP types module uses, but the method/shape set is this protocol's own
//! (see spec.md §3 and §6), not JSON-RPC 2.0 or MCP.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Namespaces a connection is established against. One websocket per
/// namespace, per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    System,
    Llm,
    Embedding,
    Files,
    Repository,
}

impl Namespace {
    /// The path segment used to build the connection URL,
    /// `ws://<host>/<namespace>`.
    pub fn as_path(&self) -> &'static str {
        match self {
            Namespace::System => "system",
            Namespace::Llm => "llm",
            Namespace::Embedding => "embedding",
            Namespace::Files => "files",
            Namespace::Repository => "repository",
        }
    }
}

/// First frame sent by the client, before any `rpcCall`/`channelCreate`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticateFrame {
    #[serde(rename = "authVersion")]
    pub auth_version: u32,
    #[serde(rename = "clientIdentifier")]
    pub client_identifier: String,
    #[serde(rename = "clientPasskey")]
    pub client_passkey: String,
}

impl AuthenticateFrame {
    pub fn new(client_identifier: String, client_passkey: String) -> Self {
        Self {
            auth_version: 1,
            client_identifier,
            client_passkey,
        }
    }
}

/// Server's reply to [`AuthenticateFrame`].
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedFrame {
    pub success: bool,
    #[serde(default)]
    pub error: Option<Value>,
}

/// A non-handshake frame. Deserialized generically first (to read `type`
/// and the id), then the `result`/`error`/`message` payload is taken as a
/// raw [`Value`] for the endpoint state machine to interpret.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "channelId")]
    pub channel_id: Option<u64>,
    #[serde(rename = "callId")]
    pub call_id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorPayload>,
    #[serde(default)]
    pub message: Option<Value>,
}

/// Server-supplied error detail carried by `rpcError`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcErrorPayload {
    pub title: String,
    #[serde(default)]
    pub cause: Option<String>,
    #[serde(default)]
    pub stack: Option<String>,
}

/// Outbound `rpcCall` frame.
#[derive(Debug, Clone, Serialize)]
pub struct RpcCallFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "callId")]
    pub call_id: u64,
    pub endpoint: String,
    pub parameter: Value,
}

impl RpcCallFrame {
    pub fn new(call_id: u64, endpoint: impl Into<String>, parameter: Value) -> Self {
        Self {
            kind: "rpcCall",
            call_id,
            endpoint: endpoint.into(),
            parameter,
        }
    }
}

/// Outbound `channelCreate` frame.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelCreateFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "channelId")]
    pub channel_id: u64,
    pub endpoint: String,
    #[serde(rename = "creationParameter")]
    pub creation_parameter: Value,
}

impl ChannelCreateFrame {
    pub fn new(channel_id: u64, endpoint: impl Into<String>, creation_parameter: Value) -> Self {
        Self {
            kind: "channelCreate",
            channel_id,
            endpoint: endpoint.into(),
            creation_parameter,
        }
    }
}

/// Outbound `channelSend` frame (client -> server messages on a channel).
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSendFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "channelId")]
    pub channel_id: u64,
    pub message: Value,
}

impl ChannelSendFrame {
    pub fn new(channel_id: u64, message: Value) -> Self {
        Self {
            kind: "channelSend",
            channel_id,
            message,
        }
    }
}

/// Outbound `channelCancel` frame.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelCancelFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "channelId")]
    pub channel_id: u64,
}

impl ChannelCancelFrame {
    pub fn new(channel_id: u64) -> Self {
        Self {
            kind: "channelCancel",
            channel_id,
        }
    }
}

/// A frame kind discriminant, used to classify an already-parsed
/// [`InboundFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    ChannelSend,
    ChannelClose,
    RpcResult,
    RpcError,
    Unknown,
}

impl InboundFrame {
    pub fn kind(&self) -> FrameKind {
        match self.kind.as_str() {
            "channelSend" => FrameKind::ChannelSend,
            "channelClose" => FrameKind::ChannelClose,
            "rpcResult" => FrameKind::RpcResult,
            "rpcError" => FrameKind::RpcError,
            _ => FrameKind::Unknown,
        }
    }
}
