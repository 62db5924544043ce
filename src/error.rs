//! Error taxonomy for the lmskit client core
//!
//! This module defines every error kind the multiplex layer, the session
//! manager, and the endpoint state machines can surface, using `thiserror`
//! for ergonomic `Display`/`std::error::Error` impls.

use thiserror::Error;

/// Errors produced by the lmskit client core.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level connect failure (DNS, refused, TLS) before the
    /// handshake is attempted.
    #[error("connect error: {0}")]
    Connect(String),

    /// The handshake reply reported `success: false`.
    #[error("auth error: {0}")]
    Auth(String),

    /// Wire send failed mid-session.
    #[error("tx error: {0}")]
    Tx(String),

    /// Wire receive failed mid-session.
    #[error("rx error: {0}")]
    Rx(String),

    /// An inbox received the shutdown sentinel before a terminal frame.
    #[error("disconnected")]
    Disconnected,

    /// The server returned `rpcError` for this call.
    #[error("rpc error: {title}{}", cause.as_ref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Rpc {
        /// Server-supplied error title.
        title: String,
        /// Server-supplied cause, if any.
        cause: Option<String>,
        /// Server-supplied stack trace, if any.
        stack: Option<String>,
    },

    /// A malformed inbound channel frame, or a frame that violates the
    /// channel's expected ordering.
    #[error("channel protocol error: {0}")]
    Channel(String),

    /// The model or server reported an inference error.
    #[error("prediction error: {0}")]
    Prediction(String),

    /// The prediction was cancelled, locally or by the server.
    #[error("prediction cancelled")]
    PredictionCancelled,

    /// A requested tool was unknown, or its arguments violated the
    /// declared JSON schema.
    #[error("invalid tool request: {0}")]
    InvalidToolRequest(String),

    /// The caller supplied invalid parameters, caught before send.
    #[error("value error: {0}")]
    Value(String),

    /// Misuse of the API (starting a prediction twice, operating on a
    /// closed client, and so on).
    #[error("runtime error: {0}")]
    Runtime(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying websocket I/O failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Local I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_error_display_includes_cause() {
        let err = Error::Rpc {
            title: "NotFound".to_string(),
            cause: Some("model key unknown".to_string()),
            stack: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("NotFound"));
        assert!(msg.contains("model key unknown"));
    }

    #[test]
    fn rpc_error_display_without_cause() {
        let err = Error::Rpc {
            title: "NotFound".to_string(),
            cause: None,
            stack: None,
        };
        assert_eq!(err.to_string(), "rpc error: NotFound");
    }

    #[test]
    fn disconnected_display() {
        assert_eq!(Error::Disconnected.to_string(), "disconnected");
    }

    #[test]
    fn serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
