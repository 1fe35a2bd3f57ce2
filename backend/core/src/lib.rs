//! Core data model, error taxonomy, and tool registry for Parley.

pub mod error;
pub mod tools;
pub mod traits;
pub mod types;

pub use error::{ParleyError, ToolError};
pub use tools::{ToolOutcome, ToolRegistry};
pub use traits::{ChatMessage, ChatRole, LlmProvider, LlmRequest, LlmResponse, Tool, ToolCallRequest};
pub use types::{
    ChatRequest, ChatResponse, HistoryEntry, HistoryResponse, ParamKind, ParamSpec, ResetResponse,
    RoutingDecision, ToolDescriptor, Turn, TurnDraft, NO_TOOL,
};
