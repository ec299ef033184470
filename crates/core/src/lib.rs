//! Shared data model for the ThinkSuit orchestration engine: the value
//! types passed between the Journal, the Provider Adapter, the Tool
//! Mediator, the module system, and the Plan Executor.

pub mod approval;
pub mod capability;
pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod fact;
pub mod id;
pub mod module;
pub mod plan;
pub mod rule;
pub mod stream;
pub mod thread;
pub mod tool;

pub use approval::{Approval, ApprovalDecision, ApprovalState};
pub use capability::{LlmCapabilities, ModelCandidate, RoleRequirements, ToolSupport};
pub use config::Config;
pub use context::{CancelToken, ExecLogger, MachineContext, NullLogger};
pub use entry::{Entry, Event, Level};
pub use error::{EngineError, Result};
pub use fact::{aggregate_facts, DimensionPolicy, Fact, TurnContext};
pub use id::{PathBase, PathService, SortableId};
pub use module::{Classifiers, Module, Prompts, RoleConfig, ToolDependency, TokensConfig};
pub use plan::{select_plan, Candidate, ExecutionPlan, ResultStrategy, Resolution, Step};
pub use rule::{Condition, Rule};
pub use stream::{BoxStream, FinishReason, LlmResponse, StreamEvent, Usage};
pub use thread::{Message, Role, Thread};
pub use tool::{ToolCall, ToolDefinition, ToolHandle, ToolResult};
