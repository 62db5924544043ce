//! `downloadModel` endpoint (spec.md §4.6.4): byte-counted progress
//! culminating in the final file path.
//!
//! Grounded the same way as [`super::load_model`] but carrying byte
//! counters rather than a bare fraction, per
//! `examples/original_source/src/lmstudio/sync_api.py`'s download
//! progress payload (`downloadedBytes`/`totalBytes`).

use serde_json::Value;

use super::EndpointState;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Progress {
        fraction: f64,
        downloaded_bytes: u64,
        total_bytes: u64,
        speed_bytes_per_sec: u64,
    },
    Finalized {
        path: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DownloadProgress {
    pub fraction: f64,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub speed_bytes_per_sec: u64,
}

pub struct DownloadState {
    progress: DownloadProgress,
    result: Option<Result<String>>,
}

impl Default for DownloadState {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadState {
    pub fn new() -> Self {
        Self {
            progress: DownloadProgress::default(),
            result: None,
        }
    }

    pub fn progress(&self) -> &DownloadProgress {
        &self.progress
    }
}

impl EndpointState for DownloadState {
    type Event = DownloadEvent;
    type Output = String;

    fn on_frame(&mut self, message: Value) -> Result<Vec<DownloadEvent>> {
        let kind = message
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Value("download frame missing type".to_string()))?;

        match kind {
            "downloadProgress" => {
                let downloaded_bytes = message.get("downloadedBytes").and_then(Value::as_u64).unwrap_or(0);
                let total_bytes = message.get("totalBytes").and_then(Value::as_u64).unwrap_or(0);
                let speed_bytes_per_sec = message
                    .get("speedBytesPerSec")
                    .or_else(|| message.get("downloadSpeed"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                let fraction = if total_bytes > 0 {
                    (downloaded_bytes as f64 / total_bytes as f64).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                Ok(vec![DownloadEvent::Progress {
                    fraction,
                    downloaded_bytes,
                    total_bytes,
                    speed_bytes_per_sec,
                }])
            }
            "success" => {
                let path = message
                    .get("path")
                    .or_else(|| message.get("defaultIdentifier"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::Value("download success missing path".to_string()))?
                    .to_string();
                Ok(vec![DownloadEvent::Finalized { path }])
            }
            other => Err(Error::Value(format!("unrecognized download frame type: {other}"))),
        }
    }

    fn handle_event(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Progress {
                fraction,
                downloaded_bytes,
                total_bytes,
                speed_bytes_per_sec,
            } => {
                self.progress = DownloadProgress {
                    fraction,
                    downloaded_bytes,
                    total_bytes,
                    speed_bytes_per_sec,
                };
            }
            DownloadEvent::Finalized { path } => self.result = Some(Ok(path)),
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
                "download channel closed before reporting a result".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn drive(state: &mut DownloadState, message: Value) {
        for event in state.on_frame(message).unwrap() {
            state.handle_event(event);
        }
    }

    #[test]
    fn progress_reports_byte_counters_and_fraction() {
        let mut state = DownloadState::new();
        drive(
            &mut state,
            json!({"type": "downloadProgress", "downloadedBytes": 50, "totalBytes": 200, "speedBytesPerSec": 1024}),
        );
        assert_eq!(state.progress().downloaded_bytes, 50);
        assert_eq!(state.progress().total_bytes, 200);
        assert_eq!(state.progress().fraction, 0.25);
        assert_eq!(state.progress().speed_bytes_per_sec, 1024);
    }

    #[test]
    fn close_without_terminal_frame_is_an_error_not_silent_success() {
        let mut state = DownloadState::new();
        drive(
            &mut state,
            json!({"type": "downloadProgress", "downloadedBytes": 10, "totalBytes": 100, "speedBytesPerSec": 5}),
        );
        assert!(matches!(state.finalize(false), Err(Error::Channel(_))));
    }

    #[test]
    fn cancelled_close_surfaces_prediction_cancelled() {
        let mut state = DownloadState::new();
        assert!(matches!(state.finalize(true), Err(Error::PredictionCancelled)));
    }

    #[test]
    fn success_frame_yields_finalized_path() {
        let mut state = DownloadState::new();
        drive(&mut state, json!({"type": "success", "path": "/models/llama-3.gguf"}));
        assert_eq!(state.result().unwrap().unwrap(), "/models/llama-3.gguf");
    }
}
