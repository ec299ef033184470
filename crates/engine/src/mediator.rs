//! Tool Mediator: the single place the engine reaches for tool discovery
//! and dispatch, wrapping the MCP manager with the configured allow/deny
//! policy. Tool names crossing this boundary are always `mcp:{server}:{tool}`
//! so the model sees one flat, collision-free namespace.

use thinksuit_core::config::ToolPolicy;
use thinksuit_core::tool::{ToolCall, ToolHandle, ToolResult};
use thinksuit_mcp::McpManager;

pub struct Mediator {
    manager: McpManager,
    policy: ToolPolicy,
}

impl Mediator {
    pub fn new(manager: McpManager, policy: ToolPolicy) -> Self {
        Self { manager, policy }
    }

    pub fn empty() -> Self {
        Self::new(McpManager::empty(), ToolPolicy::default())
    }

    /// All tools discoverable across live MCP servers, filtered by policy.
    pub fn discover_tools(&self) -> Vec<ToolHandle> {
        self.manager
            .list_tools()
            .into_iter()
            .map(|(server_id, def)| ToolHandle {
                name: format!("mcp:{server_id}:{}", def.name),
                description: def.description.clone(),
                input_schema: def.input_schema.clone(),
                server: server_id.to_string(),
            })
            .filter(|handle| self.policy.allows(&handle.name))
            .collect()
    }

    /// Dispatch a single tool call. Never returns `Err`: a subprocess
    /// crash, unknown tool, or policy denial all come back as a failed
    /// `ToolResult` so the turn can continue and the model sees the
    /// failure on its next cycle.
    pub async fn call(&self, call: &ToolCall) -> ToolResult {
        let Some((server, tool_name)) = parse_qualified_name(&call.tool_name) else {
            return failed(call, format!("unrecognized tool name '{}'", call.tool_name));
        };

        if !self.policy.allows(&call.tool_name) {
            return failed(call, format!("tool '{}' denied by policy", call.tool_name));
        }

        match self.manager.call_tool(&server, &tool_name, call.arguments.clone()).await {
            Ok(result) => ToolResult {
                call_id: call.call_id.clone(),
                content: render_content(&result),
                is_error: result.is_error,
            },
            Err(e) => failed(call, e.to_string()),
        }
    }

    pub fn tool_count(&self) -> usize {
        self.manager.tool_count()
    }

    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}

fn failed(call: &ToolCall, message: String) -> ToolResult {
    ToolResult { call_id: call.call_id.clone(), content: message, is_error: true }
}

fn parse_qualified_name(name: &str) -> Option<(String, String)> {
    let rest = name.strip_prefix("mcp:")?;
    let (server, tool) = rest.split_once(':')?;
    Some((server.to_string(), tool.to_string()))
}

fn render_content(result: &thinksuit_mcp::protocol::ToolCallResult) -> String {
    result.content.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_round_trips() {
        assert_eq!(
            parse_qualified_name("mcp:filesystem:read_file"),
            Some(("filesystem".to_string(), "read_file".to_string()))
        );
        assert_eq!(parse_qualified_name("roll_dice"), None);
    }

    #[tokio::test]
    async fn dispatch_to_unknown_tool_is_a_failed_result_not_an_error() {
        let mediator = Mediator::empty();
        let call = ToolCall {
            call_id: "c1".into(),
            tool_name: "roll_dice".into(),
            arguments: serde_json::json!({}),
        };
        let result = mediator.call(&call).await;
        assert!(result.is_error);
        assert_eq!(result.call_id, "c1");
    }

    #[tokio::test]
    async fn policy_deny_fails_the_call() {
        let policy = ToolPolicy { allow: vec![], deny: vec!["mcp".into()] };
        let mediator = Mediator::new(McpManager::empty(), policy);
        let call = ToolCall {
            call_id: "c1".into(),
            tool_name: "mcp:filesystem:read_file".into(),
            arguments: serde_json::json!({}),
        };
        let result = mediator.call(&call).await;
        assert!(result.is_error);
        assert!(result.content.contains("denied"));
    }
}
