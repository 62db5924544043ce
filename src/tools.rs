//! Tool definitions and registry used by `endpoints::chat_response` and
//! `endpoints::act`.
//!
//! Grounded on the teacher's `ToolExecutor` trait
//! (`examples/xbcsmith-xzatoma/src/agent/executor.rs`) and mode-aware
//! registry (`examples/xbcsmith-xzatoma/src/tools/registry_builder.rs`):
//! a small `async_trait` per tool plus a name-keyed registry. Argument
//! validation here is a lightweight structural check against the
//! declared JSON schema (type/required-field checks), matching the level
//! of validation spec.md §4.6.2 calls for ("tool known, arguments match
//! declared schema") without pulling in a full JSON-schema engine, since
//! the source SDK performs this same shallow validation itself.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A single tool a model may call during `act`/`predict` with tools.
#[async_trait]
pub trait ToolImpl: Send + Sync {
    /// Stable tool name the model refers to in `ToolCallRequest::name`.
    fn name(&self) -> &str;

    /// JSON schema describing the tool's arguments (an object schema with
    /// `properties`/`required`, per spec.md §4.6.2).
    fn parameters_schema(&self) -> &Value;

    /// Run the tool. Implementations are responsible for their own
    /// cooperative cancellation (spec.md §9); a single failure here is
    /// turned into an error-string tool result by the caller rather than
    /// aborting the round (spec.md §4.6.3).
    async fn call(&self, arguments: Value) -> Result<String>;
}

/// Name-keyed collection of tools available to an `act`/`predict` call.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolImpl>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn ToolImpl>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolImpl>> {
        self.tools.get(name)
    }

    /// Wire-form tool declarations sent in `creationParameter`/`parameter`
    /// for endpoints that accept tools (`predict` in chat-response mode).
    pub fn to_wire(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "parameters": tool.parameters_schema(),
                })
            })
            .collect()
    }

    /// Validate that `name` is registered and `arguments` satisfies its
    /// declared schema's `required` properties and top-level `type`.
    ///
    /// Returns `Ok(())` on success, or `Err(message)` describing the
    /// violation -- the caller turns that into the `InvalidToolRequest`
    /// recovery path (spec.md §4.6.2).
    pub fn validate_call(
        &self,
        name: &str,
        arguments: &Value,
    ) -> std::result::Result<Arc<dyn ToolImpl>, String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| format!("unknown tool: {name}"))?;

        let schema = tool.parameters_schema();
        if schema.get("type").and_then(Value::as_str) == Some("object") && !arguments.is_object()
        {
            return Err(format!("arguments for {name} must be an object"));
        }

        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            let obj = arguments.as_object();
            for req in required {
                let Some(req_name) = req.as_str() else { continue };
                let present = obj.map(|o| o.contains_key(req_name)).unwrap_or(false);
                if !present {
                    return Err(format!("missing required argument `{req_name}` for {name}"));
                }
            }
        }

        Ok(Arc::clone(tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct AddTool {
        schema: Value,
    }

    #[async_trait]
    impl ToolImpl for AddTool {
        fn name(&self) -> &str {
            "add"
        }
        fn parameters_schema(&self) -> &Value {
            &self.schema
        }
        async fn call(&self, arguments: Value) -> Result<String> {
            let a = arguments["a"].as_i64().unwrap_or(0);
            let b = arguments["b"].as_i64().unwrap_or(0);
            Ok((a + b).to_string())
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(AddTool {
            schema: json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                "required": ["a", "b"]
            }),
        }));
        registry
    }

    #[tokio::test]
    async fn validated_call_executes() {
        let registry = registry();
        let tool = registry.validate_call("add", &json!({"a": 2, "b": 3})).unwrap();
        assert_eq!(tool.call(json!({"a": 2, "b": 3})).await.unwrap(), "5");
    }

    #[test]
    fn unknown_tool_name_rejected() {
        let registry = registry();
        let err = registry.validate_call("subtract", &json!({})).unwrap_err();
        assert!(err.contains("unknown tool"));
    }

    #[test]
    fn missing_required_argument_rejected() {
        let registry = registry();
        let err = registry.validate_call("add", &json!({"a": 2})).unwrap_err();
        assert!(err.contains("missing required argument"));
        assert!(err.contains("b"));
    }

    #[test]
    fn non_object_arguments_rejected_for_object_schema() {
        let registry = registry();
        let err = registry.validate_call("add", &json!([1, 2])).unwrap_err();
        assert!(err.contains("must be an object"));
    }
}
