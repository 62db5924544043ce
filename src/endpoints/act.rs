//! `act` loop (spec.md §4.6.3): repeated predict-with-tools rounds over a
//! session, dispatching any requested tool calls and feeding their
//! results back into history until the model stops asking for tools or
//! the round budget is exhausted.
//!
//! Grounded on `examples/xbcsmith-xzatoma/src/agent/core.rs`'s
//! `Agent::execute` (round counter, iteration-limit check, per-tool-call
//! dispatch, `execute_tool_call` turning a tool failure into a string
//! result rather than aborting) and on
//! `examples/original_source/src/lmstudio/sync_api.py`'s `act()`
//! (`round_counter`, `final_round_index` suppressing tool offers on the
//! last round, `on_round_start`/`on_round_end`/`on_prediction_completed`
//! callbacks, and `handle_invalid_tool_request` as the recovery path for
//! a tool call that fails validation).

use std::time::Duration;

use serde_json::json;
use tokio::task::JoinSet;
use tracing::warn;

use super::chat_response::{ChatResponseResult, ChatResponseState, InvalidToolRequest, ToolCallRequest};
use crate::error::Result;
use crate::history::ChatHistory;
use crate::session::Session;
use crate::tools::ToolRegistry;

/// Caller-supplied observers for the act loop. All methods default to a
/// no-op so callers only implement what they care about, matching the
/// teacher's optional-callback style in
/// `examples/xbcsmith-xzatoma/src/agent/core.rs`.
pub trait ActCallbacks {
    fn on_round_start(&mut self, _round: usize) {}
    fn on_round_end(&mut self, _round: usize) {}
    fn on_prediction_completed(&mut self, _result: &ChatResponseResult) {}

    /// Called for each tool request that failed validation. Returning
    /// `Some(content)` supplies the synthetic tool-result content to
    /// append to history instead of the default message (spec.md §4.6.2).
    fn handle_invalid_tool_request(&mut self, _invalid: &InvalidToolRequest) -> Option<String> {
        None
    }
}

/// A no-op set of callbacks for callers that don't need observability.
#[derive(Default)]
pub struct NoopCallbacks;
impl ActCallbacks for NoopCallbacks {}

pub struct ActConfig {
    pub endpoint: String,
    pub tools: ToolRegistry,
    pub max_rounds: usize,
    pub response_format: Option<serde_json::Value>,
    /// Maximum tool calls executed concurrently within a single round.
    pub tool_concurrency: usize,
}

impl ActConfig {
    pub fn new(endpoint: impl Into<String>, tools: ToolRegistry, max_rounds: usize) -> Self {
        Self {
            endpoint: endpoint.into(),
            tools,
            max_rounds,
            response_format: None,
            tool_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActResult {
    pub rounds: usize,
    pub duration: Duration,
    pub final_content: String,
}

/// Run the act loop against `session`, mutating `history` in place with
/// every assistant/tool message produced along the way.
pub async fn act(
    session: &Session,
    config: &ActConfig,
    history: &mut ChatHistory,
    callbacks: &mut dyn ActCallbacks,
) -> Result<ActResult> {
    let started = tokio::time::Instant::now();
    let mut final_content = String::new();

    for round in 0..config.max_rounds.max(1) {
        callbacks.on_round_start(round);
        let is_final_round = round + 1 == config.max_rounds;

        let creation_parameter = json!({
            "history": history.to_wire(),
            "tools": if is_final_round { Vec::new() } else { config.tools.to_wire() },
            "responseFormat": config.response_format,
        });

        let mut channel = session.open_channel(&config.endpoint, creation_parameter).await?;
        // Tools are omitted from the wire request on the final round, but
        // validation still runs against the full registry: a well-behaved
        // server won't offer a tool call here, and if one arrives anyway it
        // must come through as a *valid* request so the final-round check
        // below can report it as "tool use on final round" rather than
        // "no tools registered".
        let mut state = ChatResponseState::new(Some(config.tools.clone()), config.response_format.clone());
        let result = channel.wait_for_result(&mut state).await?;

        callbacks.on_prediction_completed(&result);
        final_content = result.content.clone();
        history.append_assistant_response(result.content.clone(), result.tool_call_requests.clone());

        for invalid in state.invalid_requests() {
            warn!(
                target: "lmskit::act",
                tool = %invalid.request.name,
                reason = %invalid.reason,
                "invalid tool request"
            );
            let content = callbacks
                .handle_invalid_tool_request(invalid)
                .unwrap_or_else(|| format!("error: {}", invalid.reason));
            history.append_tool_result(invalid.request.id.clone(), content);
        }

        if result.tool_call_requests.is_empty() {
            callbacks.on_round_end(round);
            break;
        }

        if is_final_round {
            // spec.md §4.6.3: tools are suppressed on the final round; if the
            // model asks for one anyway, it's treated as an invalid request
            // rather than dispatched, and the loop ends here regardless.
            for request in &result.tool_call_requests {
                let invalid = InvalidToolRequest {
                    request: request.clone(),
                    reason: "tool use on final round".to_string(),
                };
                warn!(
                    target: "lmskit::act",
                    tool = %invalid.request.name,
                    "tool use requested on final round"
                );
                let content = callbacks
                    .handle_invalid_tool_request(&invalid)
                    .unwrap_or_else(|| format!("error: {}", invalid.reason));
                history.append_tool_result(invalid.request.id.clone(), content);
            }
            callbacks.on_round_end(round);
            break;
        }

        let outcomes = dispatch_tool_calls(&config.tools, &result.tool_call_requests, config.tool_concurrency).await;
        for (id, content) in outcomes {
            history.append_tool_result(id, content);
        }

        callbacks.on_round_end(round);
    }

    Ok(ActResult {
        rounds: history
            .messages()
            .iter()
            .filter(|m| matches!(m, crate::history::Message::Assistant { .. }))
            .count(),
        duration: started.elapsed(),
        final_content,
    })
}

/// Run every requested tool call with at most `concurrency` in flight at
/// once, preserving the caller-requested order in the returned vector.
async fn dispatch_tool_calls(
    tools: &ToolRegistry,
    requests: &[ToolCallRequest],
    concurrency: usize,
) -> Vec<(String, String)> {
    let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for (index, request) in requests.iter().cloned().enumerate() {
        let tools = tools.clone();
        let semaphore = std::sync::Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let content = match tools.validate_call(&request.name, &request.arguments) {
                Ok(tool) => match tool.call(request.arguments).await {
                    Ok(content) => content,
                    Err(e) => format!("error: {e}"),
                },
                Err(reason) => format!("error: {reason}"),
            };
            (index, request.id, content)
        });
    }

    let mut outcomes = vec![(String::new(), String::new()); requests.len()];
    while let Some(joined) = set.join_next().await {
        if let Ok((index, id, content)) = joined {
            outcomes[index] = (id, content);
        }
    }
    outcomes
}
