//! `loadModel` endpoint (spec.md §4.6.1): progress updates culminating in
//! the loaded model's identifier.
//!
//! Grounded on `examples/other_examples/.../background_connection.rs.rs`'s
//! subscription-progress handling for the "progress fraction, then
//! terminal event" shape, and on
//! `examples/original_source/src/lmstudio/sync_api.py`'s `load_new_model`
//! (`on_progress` callback, final event carries the loaded identifier).

use serde_json::Value;

use super::EndpointState;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub enum LoadModelEvent {
    /// Fraction in `[0.0, 1.0]`, clamped monotonically non-decreasing
    /// (spec.md §4.6.1 edge case: servers may resend an equal or lower
    /// fraction, which is not itself reported as an error but never moves
    /// the externally observed progress backwards).
    Progress(f64),
    Loaded { identifier: String },
}

pub struct LoadModelState {
    last_progress: f64,
    result: Option<Result<String>>,
}

impl Default for LoadModelState {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadModelState {
    pub fn new() -> Self {
        Self {
            last_progress: 0.0,
            result: None,
        }
    }

    pub fn progress(&self) -> f64 {
        self.last_progress
    }
}

impl EndpointState for LoadModelState {
    type Event = LoadModelEvent;
    type Output = String;

    fn on_frame(&mut self, message: Value) -> Result<Vec<LoadModelEvent>> {
        let kind = message
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Value("loadModel frame missing type".to_string()))?;

        match kind {
            "progress" => {
                let fraction = message
                    .get("progress")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0)
                    .clamp(0.0, 1.0);
                Ok(vec![LoadModelEvent::Progress(fraction)])
            }
            "success" => {
                let identifier = message
                    .get("identifier")
                    .or_else(|| message.get("info").and_then(|i| i.get("identifier")))
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::Value("loadModel success missing identifier".to_string()))?
                    .to_string();
                Ok(vec![LoadModelEvent::Loaded { identifier }])
            }
            other => Err(Error::Value(format!("unrecognized loadModel frame type: {other}"))),
        }
    }

    fn handle_event(&mut self, event: LoadModelEvent) {
        match event {
            LoadModelEvent::Progress(fraction) => {
                if fraction > self.last_progress {
                    self.last_progress = fraction;
                }
            }
            LoadModelEvent::Loaded { identifier } => self.result = Some(Ok(identifier)),
        }
    }

    fn result(&mut self) -> Option<Result<String>> {
        self.result.take()
    }

    fn finalize(&mut self, cancelled: bool) -> Result<String> {
        if cancelled {
            Err(Error::PredictionCancelled)
        } else {
            Err(Error::Channel(
                "loadModel channel closed before reporting a result".to_string(),
            ))
        }
    }
}
