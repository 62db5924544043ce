//! Handle to a loaded embedding model (spec.md §4.6.1's load path, in the
//! `embedding` namespace rather than `llm`).

use std::sync::Arc;

use serde_json::json;

use crate::endpoints::load_model::LoadModelState;
use crate::error::{Error, Result};
use crate::session::Session;

pub struct EmbeddingHandle {
    identifier: String,
    session: Arc<Session>,
}

impl EmbeddingHandle {
    pub async fn load(
        session: Arc<Session>,
        model_key: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<Self> {
        let mut channel = session
            .open_channel("loadModel", json!({"modelKey": model_key, "ttl": ttl_seconds}))
            .await?;
        let mut state = LoadModelState::new();
        loop {
            if let Some(result) = state.result() {
                return result.map(|identifier| Self { identifier, session });
            }
            match channel.next().await? {
                Some(message) => {
                    for event in state.on_frame(message)? {
                        state.handle_event(event);
                    }
                }
                None => {
                    return Err(Error::Runtime(
                        "loadModel channel closed without a result".to_string(),
                    ))
                }
            }
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let result = self
            .session
            .remote_call(
                "embed",
                json!({"modelIdentifier": self.identifier, "input": text}),
            )
            .await?;
        let values = result
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::Value("embed result missing `embedding` array".to_string()))?;
        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| Error::Value("embedding value was not a number".to_string()))
            })
            .collect()
    }

    pub async fn unload(&self) -> Result<()> {
        self.session
            .remote_call("unload", json!({"identifier": self.identifier}))
            .await?;
        Ok(())
    }
}
