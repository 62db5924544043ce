//! Streaming handle returned by [`super::llm::LlmHandle::predict`]
//! (spec.md §4.6.2): pull fragments as they arrive, or drain straight to
//! the final [`PredictionResult`].

use crate::channel::Channel;
use crate::endpoints::prediction::{PredictionEvent, PredictionResult, PredictionState};
use crate::endpoints::EndpointState;
use crate::error::Result;

pub struct PredictionStream {
    channel: Channel,
    state: PredictionState,
    finished: bool,
}

impl PredictionStream {
    pub(crate) fn new(channel: Channel, state: PredictionState) -> Self {
        Self {
            channel,
            state,
            finished: false,
        }
    }

    /// Pull the next generated fragment. Returns `None` once the
    /// prediction has finished (successfully or not) -- call
    /// [`PredictionStream::into_result`] afterward for the final value.
    ///
    /// Deliberately does not peek `state.result()` to decide this: that
    /// call takes the result out of the endpoint, and [`Self::into_result`]
    /// needs it still there.
    pub async fn next_fragment(&mut self) -> Result<Option<String>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            match self.channel.next().await? {
                Some(message) => {
                    let events = self.state.on_frame(message)?;
                    for event in events {
                        match event {
                            PredictionEvent::Fragment(text) => {
                                self.state.handle_event(PredictionEvent::Fragment(text.clone()));
                                return Ok(Some(text));
                            }
                            terminal @ (PredictionEvent::Result(_) | PredictionEvent::Cancelled) => {
                                self.finished = true;
                                self.state.handle_event(terminal);
                                return Ok(None);
                            }
                            other => self.state.handle_event(other),
                        }
                    }
                }
                None => {
                    self.finished = true;
                    return Ok(None);
                }
            }
        }
    }

    /// Cancel the in-flight prediction (spec.md §4.6.2 "userStopped").
    pub fn cancel(&self) {
        self.channel.cancel();
    }

    /// Drain any remaining frames and return the terminal result.
    pub async fn into_result(mut self) -> Result<PredictionResult> {
        self.channel.wait_for_result(&mut self.state).await
    }
}
