//! `predict` endpoint in chat mode (spec.md §4.6.2): layers tool-call
//! requests and validation on top of the base prediction stream.
//!
//! Grounded on `examples/xbcsmith-xzatoma/src/agent/core.rs`'s
//! `execute_tool_call` (tool lookup, argument handling, error-as-result)
//! and on `examples/original_source/src/lmstudio/sync_api.py`'s
//! `handle_invalid_tool_request` recovery path: an unknown tool or a
//! schema mismatch doesn't abort the round, it's surfaced to the caller
//! and, if not overridden, turned into a synthetic tool-error result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::prediction::{PredictionEvent, PredictionResult, PredictionState};
use super::EndpointState;
use crate::error::Result;
use crate::tools::ToolRegistry;

/// One tool invocation the model requested during a chat turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// A tool call that failed registry validation (unknown tool or argument
/// mismatch) before ever reaching [`crate::tools::ToolImpl::call`].
#[derive(Debug, Clone)]
pub struct InvalidToolRequest {
    pub request: ToolCallRequest,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub enum ChatResponseEvent {
    Prediction(PredictionEvent),
    ToolCallRequested(ToolCallRequest),
    InvalidToolRequest(InvalidToolRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponseResult {
    pub content: String,
    pub tool_call_requests: Vec<ToolCallRequest>,
}

/// Drives one chat-mode `predict` channel, validating any tool call
/// requests against `tools` as they arrive.
pub struct ChatResponseState {
    prediction: PredictionState,
    tools: Option<ToolRegistry>,
    tool_call_requests: Vec<ToolCallRequest>,
    invalid_requests: Vec<InvalidToolRequest>,
    result: Option<Result<ChatResponseResult>>,
}

impl ChatResponseState {
    pub fn new(tools: Option<ToolRegistry>, response_format: Option<Value>) -> Self {
        Self {
            prediction: PredictionState::new(response_format),
            tools,
            tool_call_requests: Vec::new(),
            invalid_requests: Vec::new(),
            result: None,
        }
    }

    /// Tool-call requests the model has made so far that passed
    /// validation, in arrival order -- what `act` dispatches per round.
    pub fn tool_call_requests(&self) -> &[ToolCallRequest] {
        &self.tool_call_requests
    }

    pub fn invalid_requests(&self) -> &[InvalidToolRequest] {
        &self.invalid_requests
    }

    fn validate(&self, request: &ToolCallRequest) -> std::result::Result<(), String> {
        match &self.tools {
            Some(registry) => registry
                .validate_call(&request.name, &request.arguments)
                .map(|_| ()),
            None => Err(format!("no tools registered, cannot call {}", request.name)),
        }
    }
}

impl EndpointState for ChatResponseState {
    type Event = ChatResponseEvent;
    type Output = ChatResponseResult;

    fn on_frame(&mut self, message: Value) -> Result<Vec<ChatResponseEvent>> {
        if message.get("type").and_then(Value::as_str) == Some("toolCallRequest") {
            let request = ToolCallRequest {
                id: message
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                name: message
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                arguments: message.get("arguments").cloned().unwrap_or(Value::Null),
            };
            return Ok(vec![match self.validate(&request) {
                Ok(()) => ChatResponseEvent::ToolCallRequested(request),
                Err(reason) => ChatResponseEvent::InvalidToolRequest(InvalidToolRequest {
                    request,
                    reason,
                }),
            }]);
        }

        Ok(self
            .prediction
            .on_frame(message)?
            .into_iter()
            .map(ChatResponseEvent::Prediction)
            .collect())
    }

    fn handle_event(&mut self, event: ChatResponseEvent) {
        match event {
            ChatResponseEvent::Prediction(PredictionEvent::Result(PredictionResult {
                content,
                ..
            })) => {
                self.result = Some(Ok(ChatResponseResult {
                    content,
                    tool_call_requests: self.tool_call_requests.clone(),
                }));
            }
            ChatResponseEvent::Prediction(event) => self.prediction.handle_event(event),
            ChatResponseEvent::ToolCallRequested(request) => {
                self.tool_call_requests.push(request);
            }
            ChatResponseEvent::InvalidToolRequest(invalid) => {
                self.invalid_requests.push(invalid);
            }
        }
    }

    fn result(&mut self) -> Option<Result<ChatResponseResult>> {
        self.result.take()
    }

    fn finalize(&mut self, cancelled: bool) -> Result<ChatResponseResult> {
        let prediction = self.prediction.finalize(cancelled)?;
        Ok(ChatResponseResult {
            content: prediction.content,
            tool_call_requests: self.tool_call_requests.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolImpl;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct EchoTool {
        schema: Value,
    }

    #[async_trait]
    impl ToolImpl for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn parameters_schema(&self) -> &Value {
            &self.schema
        }
        async fn call(&self, arguments: Value) -> Result<String> {
            Ok(arguments.to_string())
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool {
            schema: json!({"type": "object", "required": ["text"]}),
        }));
        registry
    }

    fn drive(state: &mut ChatResponseState, message: Value) {
        for event in state.on_frame(message).unwrap() {
            state.handle_event(event);
        }
    }

    #[test]
    fn valid_tool_call_is_recorded_and_survives_into_result() {
        let mut state = ChatResponseState::new(Some(registry()), None);
        drive(
            &mut state,
            json!({"type": "toolCallRequest", "id": "c1", "name": "echo", "arguments": {"text": "hi"}}),
        );
        assert_eq!(state.tool_call_requests().len(), 1);

        drive(&mut state, json!({"type": "success", "content": "done"}));
        let result = state.result().unwrap().unwrap();
        assert_eq!(result.tool_call_requests[0].name, "echo");
        assert_eq!(result.content, "done");
    }

    #[test]
    fn unknown_tool_is_flagged_invalid_not_fatal() {
        let mut state = ChatResponseState::new(Some(registry()), None);
        drive(
            &mut state,
            json!({"type": "toolCallRequest", "id": "c1", "name": "nope", "arguments": {}}),
        );
        assert!(state.tool_call_requests().is_empty());
        assert_eq!(state.invalid_requests().len(), 1);
        assert_eq!(state.invalid_requests()[0].request.name, "nope");
    }

    #[test]
    fn schema_mismatch_is_flagged_invalid() {
        let mut state = ChatResponseState::new(Some(registry()), None);
        drive(
            &mut state,
            json!({"type": "toolCallRequest", "id": "c1", "name": "echo", "arguments": {}}),
        );
        assert_eq!(state.invalid_requests().len(), 1);
    }
}
