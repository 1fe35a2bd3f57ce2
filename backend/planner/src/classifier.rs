use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use parley_core::{ToolDescriptor, Turn};

/// What the classifier decided for one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// No tool needed; answer with the drafted reply.
    Direct { reply: String },
    /// Invoke the named tool with these arguments.
    Invoke { tool_name: String, arguments: Value },
}

impl Classification {
    pub fn direct(reply: impl Into<String>) -> Self {
        Classification::Direct {
            reply: reply.into(),
        }
    }

    pub fn invoke(tool_name: impl Into<String>, arguments: Value) -> Self {
        Classification::Invoke {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Maps a message plus conversation context to a tool selection.
///
/// Implementations may be non-deterministic; callers make exactly one call
/// per turn and never retry.
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(
        &self,
        message: &str,
        history: &[Turn],
        tools: &[ToolDescriptor],
    ) -> Result<Classification>;
}
