use thinksuit_core::capability::LlmCapabilities;
use thinksuit_core::context::CancelToken;
use thinksuit_core::error::Result;
use thinksuit_core::stream::{BoxStream, LlmResponse, StreamEvent};
use thinksuit_core::thread::Thread;
use thinksuit_core::tool::ToolDefinition;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic `callLLM` request, mirroring the uniform capability
/// every plan-executor role invokes regardless of backend.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier, already resolved to this provider's naming (no
    /// `provider_id/` prefix).
    pub model: String,
    pub system_instructions: Option<String>,
    pub thread: Thread,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub stop: Vec<String>,
    /// When `true`, request the model to respond with valid JSON only.
    pub json_mode: bool,
    /// Tool definitions the model may invoke.
    pub tools: Vec<ToolDefinition>,
    /// Cancellation signal threaded from the `MachineContext` so in-flight
    /// calls can be aborted.
    pub cancel: CancelToken,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, thread: Thread, cancel: CancelToken) -> Self {
        Self {
            model: model.into(),
            system_instructions: None,
            thread,
            max_tokens: None,
            temperature: None,
            stop: Vec::new(),
            json_mode: false,
            tools: Vec::new(),
            cancel,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every LLM adapter must implement.
///
/// Implementations are provider-specific adapters (OpenAI-compatible,
/// Anthropic) that translate between `ChatRequest`/`LlmResponse` and the
/// wire format of each provider's HTTP API. The adapter omits request
/// options the provider doesn't support rather than erroring.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and wait for the full response.
    async fn chat(&self, req: ChatRequest) -> Result<LlmResponse>;

    /// Send a chat completion request and return a stream of events.
    async fn chat_stream(&self, req: ChatRequest) -> Result<BoxStream<'static, Result<StreamEvent>>>;

    /// The advertised capabilities of this provider/model combination.
    fn capabilities(&self) -> &LlmCapabilities;

    /// A unique identifier for this provider instance (its config id).
    fn provider_id(&self) -> &str;
}
