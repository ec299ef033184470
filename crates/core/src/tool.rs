//! Provider-agnostic tool-call shapes and the handle used to reach a
//! discovered MCP tool.

use serde::{Deserialize, Serialize};

/// A tool invocation requested by a model, in the uniform shape every
/// provider adapter normalizes to and from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// A tool's JSON Schema description, as handed to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool discovered from a running MCP server, ready to be dispatched by
/// name. `server` identifies which configured MCP server it came from so
/// the mediator can route `callMCPTool` to the right subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolHandle {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    pub server: String,
}

impl ToolHandle {
    pub fn as_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.clone(),
        }
    }
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}
