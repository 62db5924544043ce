//! Streaming handle for `downloadModel` (spec.md §4.6.4): pull progress
//! updates as they arrive, or drain straight to the final path.
//!
//! Mirrors [`super::prediction_stream::PredictionStream`]'s shape: a
//! `finished` flag tracked independently of `EndpointState::result` so
//! draining progress doesn't consume the value `into_result` needs.

use serde_json::json;

use crate::channel::Channel;
use crate::endpoints::download::{DownloadEvent, DownloadProgress, DownloadState};
use crate::endpoints::EndpointState;
use crate::error::Result;
use crate::session::Session;

pub struct DownloadStream {
    channel: Channel,
    state: DownloadState,
    finished: bool,
}

impl DownloadStream {
    pub(crate) fn new(channel: Channel, state: DownloadState) -> Self {
        Self {
            channel,
            state,
            finished: false,
        }
    }

    /// Open a `downloadModel` channel for `model_key` (spec.md §4.6.4).
    pub async fn start(session: &Session, model_key: &str) -> Result<Self> {
        let channel = session
            .open_channel("downloadModel", json!({"modelKey": model_key}))
            .await?;
        Ok(Self::new(channel, DownloadState::new()))
    }

    /// Pull the next progress update. Returns `None` once the download has
    /// finished -- call [`Self::into_result`] afterward for the final path.
    pub async fn next_progress(&mut self) -> Result<Option<DownloadProgress>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            match self.channel.next().await? {
                Some(message) => {
                    for event in self.state.on_frame(message)? {
                        match event {
                            DownloadEvent::Progress { .. } => {
                                self.state.handle_event(event);
                                return Ok(Some(self.state.progress().clone()));
                            }
                            finalized @ DownloadEvent::Finalized { .. } => {
                                self.finished = true;
                                self.state.handle_event(finalized);
                                return Ok(None);
                            }
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

    /// Cancel the in-flight download.
    pub fn cancel(&self) {
        self.channel.cancel();
    }

    /// Drain any remaining frames and return the downloaded file's path.
    pub async fn into_result(mut self) -> Result<String> {
        self.channel.wait_for_result(&mut self.state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::protocol::Namespace;
    use crate::pump::Pump;
    use crate::transport::fake::FakeTransport;
    use serde_json::json as j;

    fn test_session() -> (Session, crate::transport::fake::FakeServerHandle) {
        let (client, server) = FakeTransport::pair();
        let pump = Pump::spawn(Box::new(client));
        let session = Session::from_pump(Namespace::System, ClientConfig::default(), pump);
        (session, server)
    }

    #[tokio::test]
    async fn progress_then_final_path() {
        let (session, mut server) = test_session();
        let server_task = tokio::spawn(async move {
            let create = server.recv().await.unwrap();
            assert_eq!(create["endpoint"], "downloadModel");
            let channel_id = create["channelId"].as_u64().unwrap();
            server.send(j!({
                "type": "channelSend", "channelId": channel_id,
                "message": {"type": "downloadProgress", "downloadedBytes": 500, "totalBytes": 1000, "speedBytesPerSec": 250}
            }));
            server.send(j!({
                "type": "channelSend", "channelId": channel_id,
                "message": {"type": "success", "path": "/models/llama-3.gguf"}
            }));
            server.send(j!({"type": "channelClose", "channelId": channel_id}));
        });

        let mut stream = DownloadStream::start(&session, "llama-3-gguf").await.unwrap();
        let progress = stream.next_progress().await.unwrap().unwrap();
        assert_eq!(progress.fraction, 0.5);
        assert_eq!(progress.speed_bytes_per_sec, 250);
        assert!(stream.next_progress().await.unwrap().is_none());

        let path = stream.into_result().await.unwrap();
        server_task.await.unwrap();
        assert_eq!(path, "/models/llama-3.gguf");
    }
}
