//! Shared test scaffolding for the engine's end-to-end suites: a scripted
//! `LlmProvider` double and a helper that assembles a `Scheduler` over it
//! without going through `EngineBuilder`'s real MCP startup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thinksuit_core::{
    Config, EngineError, FinishReason, LlmCapabilities, Result, ToolCall, ToolSupport, Usage,
};
use thinksuit_core::config::{ProvidersConfig, ResourcesConfig, RoleRouting, ToolsConfig};
use thinksuit_core::stream::{BoxStream, LlmResponse, StreamEvent};
use thinksuit_engine::turn::{build_interpreter, TurnServices};
use thinksuit_engine::{ApprovalRegistry, Mediator, Scheduler};
use thinksuit_journal::Journal;
use thinksuit_modules::{builtin::core_chat_module, ClassifierRegistry};
use thinksuit_providers::{ChatRequest, LlmProvider, LlmRouter, ProviderRegistry};

/// One scripted turn of a mocked model. Calls beyond the script's length
/// repeat the last entry, so a test can under-specify a bounded loop.
#[derive(Clone)]
pub enum Script {
    Text(&'static str),
    ToolCall { call_id: &'static str, tool_name: &'static str, arguments: serde_json::Value },
    /// Sleeps in 5ms increments up to `millis`, checking the request's
    /// cancel token each time; aborts early if it trips.
    SlowThenText { millis: u64, output: &'static str },
}

pub struct MockProvider {
    id: String,
    caps: LlmCapabilities,
    calls: AtomicUsize,
    scripts: Vec<Script>,
}

impl MockProvider {
    pub fn new(id: &str, scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            caps: LlmCapabilities {
                supports_tools: ToolSupport::Basic,
                supports_streaming: false,
                supports_json_mode: false,
                context_window_tokens: Some(128_000),
                max_output_tokens: Some(4096),
            },
            calls: AtomicUsize::new(0),
            scripts,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn chat(&self, req: ChatRequest) -> Result<LlmResponse> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.get(idx).or_else(|| self.scripts.last()).cloned();
        let script = script.ok_or_else(|| EngineError::Provider("mock provider has no scripted response".into()))?;

        match script {
            Script::Text(output) => Ok(LlmResponse {
                output: output.to_string(),
                usage: Usage { prompt: 10, completion: 5 },
                model: req.model,
                finish_reason: FinishReason::Complete,
                tool_calls: None,
                raw: None,
            }),
            Script::ToolCall { call_id, tool_name, arguments } => Ok(LlmResponse {
                output: String::new(),
                usage: Usage { prompt: 10, completion: 5 },
                model: req.model,
                finish_reason: FinishReason::ToolUse,
                tool_calls: Some(vec![ToolCall {
                    call_id: call_id.to_string(),
                    tool_name: tool_name.to_string(),
                    arguments,
                }]),
                raw: None,
            }),
            Script::SlowThenText { millis, output } => {
                let mut waited = 0;
                while waited < millis {
                    if req.cancel.is_cancelled() {
                        return Err(EngineError::Aborted("interrupted mid-call".into()));
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    waited += 5;
                }
                Ok(LlmResponse {
                    output: output.to_string(),
                    usage: Usage { prompt: 10, completion: 5 },
                    model: req.model,
                    finish_reason: FinishReason::Complete,
                    tool_calls: None,
                    raw: None,
                })
            }
        }
    }

    async fn chat_stream(&self, _req: ChatRequest) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        Err(EngineError::Provider("mock provider does not support streaming".into()))
    }

    fn capabilities(&self) -> &LlmCapabilities {
        &self.caps
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

/// Knobs for [`scheduler_with`], defaulted to values that don't get in
/// the way of a test that doesn't care about them.
pub struct Harness {
    pub max_fanout: usize,
    pub max_depth: u32,
    pub max_children: usize,
    pub approval_timeout_ms: u64,
    pub auto_approve: Vec<String>,
}

impl Default for Harness {
    fn default() -> Self {
        Self { max_fanout: 8, max_depth: 4, max_children: 64, approval_timeout_ms: 30_000, auto_approve: Vec::new() }
    }
}

/// Assemble a `Scheduler` wired to `provider` under the `assistant` role,
/// skipping `EngineBuilder`'s real MCP startup since these tests never
/// need live tools.
pub fn scheduler_with(dir: &std::path::Path, provider: Arc<MockProvider>, harness: Harness) -> Scheduler {
    let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
    providers.insert("mock".into(), provider as Arc<dyn LlmProvider>);
    let registry = ProviderRegistry::from_providers(providers);

    let mut roles = HashMap::new();
    roles.insert(
        "assistant".to_string(),
        RoleRouting { model: "mock/model-a".into(), fallbacks: vec![], require_tools: true, require_json: false, require_streaming: false },
    );
    let router = Arc::new(LlmRouter::new(registry, roles, 5_000));

    let module = core_chat_module();
    let services = Arc::new(TurnServices {
        router,
        mediator: Arc::new(Mediator::empty()),
        approvals: Arc::new(ApprovalRegistry::new(harness.approval_timeout_ms)),
        classifier: ClassifierRegistry::with_builtin().for_module(&module),
        dimension_policies: HashMap::new(),
        profile: None,
        budget_ms: None,
        max_depth: harness.max_depth,
        max_fanout: harness.max_fanout,
        max_children: harness.max_children,
        auto_approve: harness.auto_approve,
    });

    let journal = Arc::new(Journal::new(thinksuit_core::PathService::new(dir.to_path_buf())));
    let paths = thinksuit_core::PathService::new(dir.to_path_buf());
    let interpreter = build_interpreter();

    let mut config = Config::default();
    config.providers = ProvidersConfig::default();
    config.resources = ResourcesConfig {
        max_fanout: harness.max_fanout,
        max_depth: harness.max_depth,
        max_children: harness.max_children,
        ..ResourcesConfig::default()
    };
    config.tools = ToolsConfig::default();

    Scheduler::new(journal, paths, interpreter, services, Arc::new(config), Arc::new(module))
}
