//! The provider adapter's uniform response envelope, plus the streaming
//! event shape the Plan Executor consumes for live deltas.

use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

/// A boxed async stream of provider events.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Token usage for a completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt: u64,
    pub completion: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.prompt + self.completion
    }
}

/// Why a completion stopped, as a closed enumeration every provider
/// adapter normalizes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Complete,
    MaxTokens,
    ToolUse,
    Safety,
    Other,
}

/// The uniform result of a `callLLM` invocation, regardless of backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub output: String,
    pub usage: Usage,
    pub model: String,
    pub finish_reason: FinishReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

/// Incremental events emitted while a completion streams, used by the
/// Plan Executor to forward live deltas to journal subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "token")]
    Token { text: String },

    #[serde(rename = "tool_call_started")]
    ToolCallStarted { call_id: String, tool_name: String },

    #[serde(rename = "tool_call_delta")]
    ToolCallDelta { call_id: String, delta: String },

    #[serde(rename = "tool_call_finished")]
    ToolCallFinished {
        call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },

    #[serde(rename = "done")]
    Done {
        usage: Option<Usage>,
        finish_reason: Option<FinishReason>,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_totals_sum_prompt_and_completion() {
        let usage = Usage { prompt: 10, completion: 5 };
        assert_eq!(usage.total(), 15);
    }

    #[test]
    fn finish_reason_serializes_snake_case() {
        let encoded = serde_json::to_string(&FinishReason::MaxTokens).unwrap();
        assert_eq!(encoded, "\"max_tokens\"");
    }
}
