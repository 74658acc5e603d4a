//! Role-checked tool execution

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use voice_bridge_core::{SessionContext, ToolCall, ToolResult, UiEffect};

/// Tool execution errors. These never escape the gateway; they become
/// structured failure results.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid argument {name}: {message}")]
    InvalidArgument { name: &'static str, message: String },

    #[error("Execution failed: {0}")]
    Execution(String),
}

/// Successful tool output plus an optional client-visible side effect
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub payload: Value,
    pub ui: Option<UiEffect>,
}

impl ToolOutcome {
    pub fn new(payload: Value) -> Self {
        Self { payload, ui: None }
    }

    pub fn with_ui(mut self, effect: UiEffect) -> Self {
        self.ui = Some(effect);
        self
    }
}

/// A named server-side action
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as referenced by the pipeline
    fn name(&self) -> &str;

    /// One-line description
    fn description(&self) -> &str;

    /// Whether only admins may call this tool
    fn admin_only(&self) -> bool {
        false
    }

    /// Execute with named arguments and session identity
    async fn execute(
        &self,
        arguments: &Map<String, Value>,
        ctx: &SessionContext,
    ) -> Result<ToolOutcome, ToolError>;
}

/// Executes tool calls on behalf of the bridge.
///
/// Admin-gated tools are rejected for non-admin roles with a descriptive
/// failure instead of executing, and every execution error is converted
/// into a failure result rather than propagated.
#[derive(Default)]
pub struct ToolGateway {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Later registrations replace earlier ones by name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Registered tool names and descriptions
    pub fn list(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .tools
            .values()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect();
        entries.sort();
        entries
    }

    /// Execute one call. Always returns a result; never errors.
    pub async fn execute(&self, call: &ToolCall, ctx: &SessionContext) -> ToolResult {
        let Some(tool) = self.tools.get(&call.name) else {
            tracing::warn!(tool = %call.name, "Unknown tool requested");
            metrics::counter!("voice_bridge_tool_calls_total", "outcome" => "unknown").increment(1);
            return ToolResult::failure(&call.id, format!("Unknown tool: {}", call.name));
        };

        if tool.admin_only() && !ctx.role.is_admin() {
            tracing::warn!(
                tool = %call.name,
                user = %ctx.user_id,
                "Rejected admin-gated tool for non-admin role"
            );
            metrics::counter!("voice_bridge_tool_calls_total", "outcome" => "denied").increment(1);
            return ToolResult::failure(
                &call.id,
                format!("Tool '{}' requires the admin role", call.name),
            );
        }

        match tool.execute(&call.arguments, ctx).await {
            Ok(outcome) => {
                metrics::counter!("voice_bridge_tool_calls_total", "outcome" => "ok").increment(1);
                let mut result = ToolResult::success(&call.id, outcome.payload);
                if let Some(effect) = outcome.ui {
                    result = result.with_ui(effect);
                }
                result
            }
            Err(e) => {
                tracing::error!(tool = %call.name, error = %e, "Tool execution failed");
                metrics::counter!("voice_bridge_tool_calls_total", "outcome" => "error").increment(1);
                ToolResult::failure(&call.id, e.to_string())
            }
        }
    }
}

/// Fetch a required string argument
pub fn require_str<'a>(
    arguments: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, ToolError> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .ok_or(ToolError::MissingArgument(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voice_bridge_core::Role;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input"
        }

        async fn execute(
            &self,
            arguments: &Map<String, Value>,
            _ctx: &SessionContext,
        ) -> Result<ToolOutcome, ToolError> {
            let text = require_str(arguments, "text")?;
            Ok(ToolOutcome::new(json!({ "echo": text })))
        }
    }

    struct AdminOnlyTool;

    #[async_trait]
    impl Tool for AdminOnlyTool {
        fn name(&self) -> &str {
            "wipe"
        }

        fn description(&self) -> &str {
            "Dangerous"
        }

        fn admin_only(&self) -> bool {
            true
        }

        async fn execute(
            &self,
            _arguments: &Map<String, Value>,
            _ctx: &SessionContext,
        ) -> Result<ToolOutcome, ToolError> {
            Ok(ToolOutcome::new(json!({ "wiped": true })))
        }
    }

    fn gateway() -> ToolGateway {
        let mut gateway = ToolGateway::new();
        gateway.register(Arc::new(EchoTool));
        gateway.register(Arc::new(AdminOnlyTool));
        gateway
    }

    fn member_ctx() -> SessionContext {
        SessionContext::new("s1", "u1", Role::Member)
    }

    #[tokio::test]
    async fn test_successful_execution() {
        let call = ToolCall::new("c1", "echo").with_arg("text", json!("hi"));
        let result = gateway().execute(&call, &member_ctx()).await;

        assert!(result.ok);
        assert_eq!(result.id, "c1");
        assert_eq!(result.payload["echo"], "hi");
    }

    #[tokio::test]
    async fn test_admin_gate_rejects_member() {
        let call = ToolCall::new("c2", "wipe");
        let result = gateway().execute(&call, &member_ctx()).await;

        assert!(!result.ok);
        assert!(result.error.as_ref().unwrap().contains("admin role"));
        assert_eq!(result.payload, Value::Null);
    }

    #[tokio::test]
    async fn test_admin_gate_allows_admin() {
        let call = ToolCall::new("c3", "wipe");
        let ctx = SessionContext::new("s1", "root", Role::Admin);
        let result = gateway().execute(&call, &ctx).await;

        assert!(result.ok);
        assert_eq!(result.payload["wiped"], true);
    }

    #[tokio::test]
    async fn test_execution_error_becomes_failure_result() {
        let call = ToolCall::new("c4", "echo"); // missing "text"
        let result = gateway().execute(&call, &member_ctx()).await;

        assert!(!result.ok);
        assert!(result.error.as_ref().unwrap().contains("text"));
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_gracefully() {
        let call = ToolCall::new("c5", "does_not_exist");
        let result = gateway().execute(&call, &member_ctx()).await;

        assert!(!result.ok);
        assert!(result.error.as_ref().unwrap().contains("Unknown tool"));
    }
}
