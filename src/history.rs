//! Minimal chat-history collaborator
//!
//! spec.md §1 puts "the chat-history data model" out of scope beyond the
//! operations the core calls on it. This module implements exactly those
//! operations -- append an assistant response, append tool results, and
//! produce the wire form -- the way the teacher's `Conversation`
//! (`examples/xbcsmith-xzatoma/src/agent/conversation.rs`) holds a
//! `Vec<Message>`, simplified since token-budget pruning is the
//! application's concern, not the core's.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoints::chat_response::ToolCallRequest;

/// One turn of chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum Message {
    System { content: String },
    User { content: String },
    #[serde(rename_all = "camelCase")]
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_call_requests: Vec<ToolCallRequest>,
    },
    /// One tool result, associated with the `ToolCallRequest::id` it answers.
    #[serde(rename_all = "camelCase")]
    Tool { tool_call_id: String, content: String },
}

/// An ordered sequence of [`Message`]s, plus the operations
/// `endpoints::chat_response` and `endpoints::act` call on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    messages: Vec<Message>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_message(content: impl Into<String>) -> Self {
        let mut history = Self::new();
        history.push_user(content);
        history
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.messages.push(Message::System { content: content.into() });
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::User { content: content.into() });
    }

    /// Append the assistant's response for one round, including any tool
    /// call requests it made, per spec.md §4.6.3's "append to chat:
    /// assistant response (with tool call requests)".
    pub fn append_assistant_response(
        &mut self,
        content: impl Into<String>,
        tool_call_requests: Vec<ToolCallRequest>,
    ) {
        self.messages.push(Message::Assistant {
            content: content.into(),
            tool_call_requests,
        });
    }

    /// Append one tool result message per spec.md §4.6.3's "then
    /// tool-results message".
    pub fn append_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.messages.push(Message::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Produce the wire form sent as `parameter.messages` / `creationParameter.history`.
    pub fn to_wire(&self) -> Value {
        serde_json::to_value(&self.messages).unwrap_or(Value::Array(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_response_round_trips_tool_calls() {
        let mut history = ChatHistory::with_user_message("add 2 and 3");
        history.append_assistant_response(
            "",
            vec![ToolCallRequest {
                id: "call-1".to_string(),
                name: "add".to_string(),
                arguments: serde_json::json!({"a": 2, "b": 3}),
            }],
        );
        history.append_tool_result("call-1", "5");

        assert_eq!(history.messages().len(), 3);
        let wire = history.to_wire();
        assert!(wire.is_array());
        assert_eq!(wire[2]["role"], "tool");
        assert_eq!(wire[2]["content"], "5");
    }
}
