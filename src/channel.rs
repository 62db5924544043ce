//! Channel handle: `rx_stream`, `cancel`, `wait_for_result` (spec.md §4.5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::endpoints::EndpointState;
use crate::error::{Error, Result};
use crate::multiplex::{InboxItem, InboxReceiver};
use crate::protocol::{ChannelCancelFrame, FrameKind};
use crate::pump::Pump;

/// A long-lived bidirectional stream identified by a `channelId`.
///
/// Dropping a `Channel` that hasn't finished sends `channelCancel`
/// automatically, matching spec.md §4.4's "on exit, if not finished, sends
/// `channelCancel`" for the scoped-acquisition `open_channel` contract.
pub struct Channel {
    channel_id: u64,
    pump: Arc<Pump>,
    rx: InboxReceiver,
    finished: bool,
    cancel_sent: AtomicBool,
}

impl Channel {
    pub(crate) fn new(channel_id: u64, pump: Arc<Pump>, rx: InboxReceiver) -> Self {
        Self {
            channel_id,
            pump,
            rx,
            finished: false,
            cancel_sent: AtomicBool::new(false),
        }
    }

    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    /// Whether `cancel()` has already been called on this channel.
    pub fn cancel_requested(&self) -> bool {
        self.cancel_sent.load(Ordering::Acquire)
    }

    /// Request cancellation. Idempotent: sends `channelCancel` at most once
    /// (spec.md §8, property 5). Non-blocking: does not wait for the
    /// server's `channelClose`.
    pub fn cancel(&self) {
        if self.cancel_sent.swap(true, Ordering::AcqRel) {
            return;
        }
        let pump = Arc::clone(&self.pump);
        let channel_id = self.channel_id;
        tokio::spawn(async move {
            let frame = ChannelCancelFrame::new(channel_id);
            if let Ok(value) = serde_json::to_value(&frame) {
                let _ = pump.submit_send(value).await;
            }
        });
    }

    /// Pull the next message payload (the `message` field of a
    /// `channelSend` frame), or `None` once the channel has terminated.
    ///
    /// Terminates on `channelClose` (returns `None`) or on the shutdown
    /// sentinel (returns `Err(Disconnected)`). After either, further calls
    /// return `None`/the same error without touching the transport again.
    pub async fn next(&mut self) -> Result<Option<Value>> {
        if self.finished {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(InboxItem::Frame(frame)) => match frame.kind() {
                FrameKind::ChannelSend => Ok(Some(frame.message.unwrap_or(Value::Null))),
                FrameKind::ChannelClose => {
                    self.finished = true;
                    Ok(None)
                }
                other => Err(Error::Channel(format!(
                    "unexpected frame kind on channel: {other:?}"
                ))),
            },
            Some(InboxItem::Shutdown) => {
                self.finished = true;
                Err(Error::Disconnected)
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Drive `endpoint` over this channel's stream until it reports
    /// finished, returning its result.
    pub async fn wait_for_result<E: EndpointState>(&mut self, endpoint: &mut E) -> Result<E::Output> {
        loop {
            if let Some(result) = endpoint.result() {
                return result;
            }
            match self.next().await {
                Ok(Some(message)) => {
                    for event in endpoint.on_frame(message)? {
                        endpoint.handle_event(event);
                    }
                }
                Ok(None) => {
                    if let Some(result) = endpoint.result() {
                        return result;
                    }
                    // spec.md §8 S3/S4: a bare `channelClose` with no
                    // terminal frame isn't itself a protocol error --
                    // synthesize the outcome from whatever the endpoint
                    // accumulated, informed by whether we asked to cancel.
                    return endpoint.finalize(self.cancel_requested());
                }
                Err(Error::Disconnected) => return Err(Error::Disconnected),
                Err(e) => return Err(e),
            }
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if !self.finished {
            debug!(target: "lmskit::channel", channel_id = self.channel_id, "dropping unfinished channel, cancelling");
            self.cancel();
        }
    }
}
