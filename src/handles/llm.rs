//! Handle to a loaded LLM model (spec.md §4.6.1/§4.6.2/§4.6.3).

use std::sync::Arc;

use serde_json::{json, Value};

use crate::endpoints::act::{act, ActCallbacks, ActConfig, ActResult};
use crate::endpoints::load_model::{LoadModelEvent, LoadModelState};
use crate::endpoints::prediction::PredictionState;
use crate::error::Result;
use crate::history::ChatHistory;
use crate::session::Session;

use super::prediction_stream::PredictionStream;

/// A model loaded on the server, ready for `predict`/`act`/`unload`.
pub struct LlmHandle {
    identifier: String,
    session: Arc<Session>,
}

impl LlmHandle {
    /// Load `model_key`, reporting progress to `on_progress` as it comes
    /// in (spec.md §4.6.1). `ttl_seconds` overrides the session's
    /// configured default when `Some`.
    pub async fn load(
        session: Arc<Session>,
        model_key: &str,
        ttl_seconds: Option<u64>,
        mut on_progress: impl FnMut(f64) + Send,
    ) -> Result<Self> {
        let mut channel = session
            .open_channel("loadModel", json!({"modelKey": model_key, "ttl": ttl_seconds}))
            .await?;
        let mut state = LoadModelState::new();
        loop {
            if let Some(result) = state.result() {
                let identifier = result?;
                return Ok(Self { identifier, session });
            }
            match channel.next().await? {
                Some(message) => {
                    for event in state.on_frame(message)? {
                        if let LoadModelEvent::Progress(fraction) = &event {
                            on_progress(*fraction);
                        }
                        state.handle_event(event);
                    }
                }
                None => {
                    return state
                        .result()
                        .unwrap_or_else(|| {
                            Err(crate::error::Error::Runtime(
                                "loadModel channel closed without a result".to_string(),
                            ))
                        })
                        .map(|identifier| Self { identifier, session });
                }
            }
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Start a streaming prediction (spec.md §4.6.2).
    pub async fn predict(
        &self,
        prompt: impl Into<String>,
        response_format: Option<Value>,
    ) -> Result<PredictionStream> {
        let channel = self
            .session
            .open_channel(
                "predict",
                json!({
                    "modelIdentifier": self.identifier,
                    "prompt": prompt.into(),
                    "responseFormat": response_format.clone(),
                }),
            )
            .await?;
        Ok(PredictionStream::new(channel, PredictionState::new(response_format)))
    }

    /// Run the multi-round tool-use loop (spec.md §4.6.3).
    pub async fn act(
        &self,
        config: &ActConfig,
        history: &mut ChatHistory,
        callbacks: &mut dyn ActCallbacks,
    ) -> Result<ActResult> {
        act(&self.session, config, history, callbacks).await
    }

    /// Release the model from the server (spec.md §4.6.1 non-goal note:
    /// explicit unload, no ref-counted auto-eviction in this core).
    pub async fn unload(&self) -> Result<()> {
        self.session
            .remote_call("unload", json!({"identifier": self.identifier}))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::protocol::Namespace;
    use crate::pump::Pump;
    use crate::transport::fake::FakeTransport;

    fn test_session() -> (Arc<Session>, crate::transport::fake::FakeServerHandle) {
        let (client, server) = FakeTransport::pair();
        let pump = Pump::spawn(Box::new(client));
        let session = Arc::new(Session::from_pump(Namespace::Llm, ClientConfig::default(), pump));
        (session, server)
    }

    #[tokio::test]
    async fn load_reports_progress_then_resolves_identifier() {
        let (session, mut server) = test_session();
        let server_task = tokio::spawn(async move {
            let create = server.recv().await.unwrap();
            let channel_id = create["channelId"].as_u64().unwrap();
            server.send(json!({"type": "channelSend", "channelId": channel_id, "message": {"type": "progress", "progress": 0.5}}));
            server.send(json!({"type": "channelSend", "channelId": channel_id, "message": {"type": "success", "identifier": "llama-3"}}));
            server.send(json!({"type": "channelClose", "channelId": channel_id}));
        });

        let mut seen_progress = Vec::new();
        let handle = LlmHandle::load(session, "llama-3-gguf", None, |p| seen_progress.push(p))
            .await
            .unwrap();
        server_task.await.unwrap();

        assert_eq!(handle.identifier(), "llama-3");
        assert_eq!(seen_progress, vec![0.5]);
    }

    #[tokio::test]
    async fn predict_with_response_format_parses_structured_result() {
        let (session, mut server) = test_session();
        let server_task = tokio::spawn(async move {
            let create = server.recv().await.unwrap();
            let channel_id = create["channelId"].as_u64().unwrap();
            server.send(json!({"type": "channelSend", "channelId": channel_id, "message": {"type": "success", "identifier": "llama-3"}}));
            server.send(json!({"type": "channelClose", "channelId": channel_id}));

            let create2 = server.recv().await.unwrap();
            assert_eq!(create2["creationParameter"]["responseFormat"], json!({"type": "object"}));
            let channel_id2 = create2["channelId"].as_u64().unwrap();
            server.send(json!({"type": "channelSend", "channelId": channel_id2, "message": {"type": "success", "content": "{\"n\":42}"}}));
            server.send(json!({"type": "channelClose", "channelId": channel_id2}));
        });

        let handle = LlmHandle::load(session, "llama-3-gguf", None, |_| {}).await.unwrap();
        let result = handle
            .predict("give me a number", Some(json!({"type": "object"})))
            .await
            .unwrap()
            .into_result()
            .await
            .unwrap();
        server_task.await.unwrap();

        assert_eq!(result.parsed, Some(json!({"n": 42})));
    }
}
