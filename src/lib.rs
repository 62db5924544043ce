//! Client SDK core for a local model-hosting service.
//!
//! This crate implements the multiplexed JSON-over-websocket protocol,
//! the call/channel lifecycle, the background I/O pump, the per-namespace
//! session manager, and the endpoint state machines for loading models,
//! running predictions, driving multi-round tool-use ("act") loops, and
//! downloading models. It does not implement a CLI, a model catalog, or
//! any UI -- those are out of scope for the core (see `SPEC_FULL.md`).
//!
//! # Layout
//!
//! - [`error`] -- the crate's error taxonomy.
//! - [`config`] -- [`config::ClientConfig`].
//! - [`protocol`] -- wire frame types.
//! - [`multiplex`] -- inbound frame routing.
//! - [`transport`] -- the `Transport` trait, websocket implementation,
//!   and (behind `test-util`) an in-memory fake.
//! - [`pump`] -- the background I/O task.
//! - [`session`] -- per-namespace connection and call/channel lifecycle.
//! - [`channel`] -- the long-lived channel handle.
//! - [`history`] -- chat history accumulation.
//! - [`tools`] -- tool registration and argument validation for `act`.
//! - [`endpoints`] -- the per-endpoint state machines.
//! - [`handles`] -- user-facing handles built on the above.
//! - [`client`] -- [`client::Client`], the crate's entry point.

pub mod channel;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod handles;
pub mod history;
pub mod multiplex;
pub mod protocol;
pub mod pump;
pub mod session;
pub mod tools;
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use protocol::Namespace;

/// Install a default `tracing` subscriber reading its filter from
/// `RUST_LOG` (falling back to `info`), the way the teacher's binaries
/// wire up logging at startup. Library consumers that already run their
/// own subscriber should skip this and just depend on the `tracing`
/// events this crate emits.
pub fn install_default_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
