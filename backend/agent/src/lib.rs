//! Router and turn recording for Parley.
//!
//! [`ChatService`] is the entry point: it routes a message with [`Router`],
//! records the turn with [`TurnRecorder`], and returns the reply.

pub mod context_window;
pub mod recorder;
pub mod router;
pub mod service;
pub mod session_lock;

#[cfg(test)]
mod testing;

pub use context_window::ContextWindow;
pub use recorder::{RecordOutcome, RecorderMode, TurnRecorder};
pub use router::{
    AgentContext, RoutePath, Routed, Router, RouterSettings, EMPTY_REPLY_FALLBACK,
    GENERIC_FALLBACK_REPLY, TOOL_FAILURE_REPLY,
};
pub use service::{mint_session_id, ChatService};
pub use session_lock::SessionLocks;
