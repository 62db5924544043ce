//! `predict` endpoint (spec.md §4.6.2): streams prompt-processing
//! progress, first-token/fragment deltas, and a final result over a
//! channel opened against `llm`/`embedding` namespaces.
//!
//! Grounded on the teacher's `Agent::execute` per-round accounting
//! (`examples/xbcsmith-xzatoma/src/agent/core.rs`) for the
//! accumulate-fragments-then-finalize shape, and on
//! `examples/original_source/src/lmstudio/sync_api.py`'s `act()`/predict
//! callback set (`on_prediction_fragment`, `on_first_token`,
//! `on_message`) for which events exist and in what order they fire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EndpointState;
use crate::error::{Error, Result};

/// One increment of a streaming prediction.
#[derive(Debug, Clone)]
pub enum PredictionEvent {
    /// Fraction in `[0.0, 1.0]` of prompt tokens processed so far.
    PromptProcessingProgress(f64),
    /// Fired once, before the first `Fragment`.
    FirstToken,
    /// One piece of generated text.
    Fragment(String),
    /// Terminal: the full prediction, with stats.
    Result(PredictionResult),
    /// Terminal: the prediction was cancelled (spec.md §4.6.2, "userStopped").
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionStats {
    #[serde(default)]
    pub tokens_predicted: u64,
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub stop_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    pub content: String,
    #[serde(default)]
    pub stats: PredictionStats,
    /// Present when the caller supplied a `response_format` schema
    /// (spec.md §4.6.2's distinct structured-response parameter).
    #[serde(default)]
    pub parsed: Option<Value>,
}

/// Drives one `predict` channel from raw frames to a [`PredictionResult`].
pub struct PredictionState {
    content: String,
    first_token_seen: bool,
    response_format: Option<Value>,
    result: Option<Result<PredictionResult>>,
}

impl PredictionState {
    pub fn new(response_format: Option<Value>) -> Self {
        Self {
            content: String::new(),
            first_token_seen: false,
            response_format,
            result: None,
        }
    }

    pub fn content_so_far(&self) -> &str {
        &self.content
    }

    fn parse_structured(&self, content: &str) -> Option<Value> {
        self.response_format
            .as_ref()
            .and_then(|_| serde_json::from_str::<Value>(content).ok())
    }
}

impl EndpointState for PredictionState {
    type Event = PredictionEvent;
    type Output = PredictionResult;

    fn on_frame(&mut self, message: Value) -> Result<Vec<PredictionEvent>> {
        let kind = message
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Prediction("prediction frame missing type".to_string()))?;

        let events = match kind {
            "promptProcessingProgress" => {
                let fraction = message
                    .get("progress")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0)
                    .clamp(0.0, 1.0);
                vec![PredictionEvent::PromptProcessingProgress(fraction)]
            }
            "fragment" => {
                let text = message
                    .get("fragment")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let mut events = Vec::new();
                if !self.first_token_seen {
                    events.push(PredictionEvent::FirstToken);
                }
                events.push(PredictionEvent::Fragment(text));
                events
            }
            "success" => {
                let content = message
                    .get("content")
                    .or_else(|| message.get("fullText"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| self.content.clone());
                let stats = message
                    .get("stats")
                    .and_then(|s| serde_json::from_value(s.clone()).ok())
                    .unwrap_or(PredictionStats {
                        tokens_predicted: 0,
                        prompt_tokens: 0,
                        stop_reason: "eosFound".to_string(),
                    });
                let parsed = self.parse_structured(&content);
                vec![PredictionEvent::Result(PredictionResult {
                    content,
                    stats,
                    parsed,
                })]
            }
            "cancelled" => vec![PredictionEvent::Cancelled],
            other => {
                return Err(Error::Prediction(format!(
                    "unrecognized prediction frame type: {other}"
                )))
            }
        };
        Ok(events)
    }

    fn handle_event(&mut self, event: PredictionEvent) {
        match event {
            PredictionEvent::PromptProcessingProgress(_) => {}
            PredictionEvent::FirstToken => self.first_token_seen = true,
            PredictionEvent::Fragment(text) => self.content.push_str(&text),
            PredictionEvent::Result(result) => self.result = Some(Ok(result)),
            PredictionEvent::Cancelled => self.result = Some(Err(Error::PredictionCancelled)),
        }
    }

    fn result(&mut self) -> Option<Result<PredictionResult>> {
        self.result.take()
    }

    fn finalize(&mut self, cancelled: bool) -> Result<PredictionResult> {
        if cancelled {
            return Err(Error::PredictionCancelled);
        }
        // spec.md §8 S4: a bare `channelClose` with no `"success"`/
        // `"cancelled"` frame still has to resolve to a result, built from
        // whatever content accumulated before the close.
        let content = self.content.clone();
        let parsed = self.parse_structured(&content);
        Ok(PredictionResult {
            content,
            stats: PredictionStats {
                tokens_predicted: 0,
                prompt_tokens: 0,
                stop_reason: "unknown".to_string(),
            },
            parsed,
        })
    }
}
