//! Endpoint state machines (spec.md §4.6): each endpoint owns a small
//! state machine that turns raw `channelSend` payloads into typed events
//! and, eventually, a typed result.
//!
//! Grounded on the teacher's `Agent::execute` round-driving loop
//! (`examples/xbcsmith-xzatoma/src/agent/core.rs`), generalized into a
//! trait so [`crate::channel::Channel::wait_for_result`] can drive any of
//! them without knowing their concrete event/output types.

use serde_json::Value;

use crate::error::Result;

pub mod act;
pub mod chat_response;
pub mod download;
pub mod load_model;
pub mod prediction;

/// A state machine driven by the raw messages of one channel.
///
/// `on_frame` turns one wire payload into zero or more typed events
/// (usually one; `act`'s round boundaries can synthesize extra ones).
/// `handle_event` lets the endpoint update its own state and invoke any
/// caller-supplied callbacks. `result` reports completion: `None` means
/// "still running", `Some(Ok(_))`/`Some(Err(_))` means the channel can
/// stop being polled.
pub trait EndpointState {
    type Event;
    type Output;

    fn on_frame(&mut self, message: Value) -> Result<Vec<Self::Event>>;
    fn handle_event(&mut self, event: Self::Event);

    /// Returns the terminal result the first time it's available, taking
    /// it out of the endpoint's own state. `Error` wraps non-`Clone`
    /// sources (`serde_json::Error`, transport errors), so this consumes
    /// rather than clones; callers that need it again hold onto the
    /// returned value themselves.
    fn result(&mut self) -> Option<Result<Self::Output>>;

    /// Called when the channel closes (`channelClose`) without ever
    /// producing a terminal frame (spec.md §8 S3/S4). `cancelled` reports
    /// whether the caller had already called `Channel::cancel()`: a
    /// cancelled close synthesizes `Error::PredictionCancelled`, an
    /// uncancelled one synthesizes an outcome from whatever the endpoint
    /// accumulated so far (e.g. fragment text for a structured response
    /// that never got an explicit `"success"` frame).
    fn finalize(&mut self, cancelled: bool) -> Result<Self::Output>;
}
