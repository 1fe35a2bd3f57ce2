//! The closed set of builtin tools and the startup-checked registry.

use std::fmt;
use std::sync::Arc;

use parley_core::{ParleyError, Tool, ToolRegistry};
use tracing::info;

use crate::marks::{MarksBook, MarksTool};
use crate::negative::NegativeTool;
use crate::positive::PositiveTool;
use crate::safety::SafetyTool;

/// Every tool the router can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Marks,
    Positive,
    Negative,
    Safety,
}

impl ToolKind {
    /// Registration order, which is also the order descriptors are offered in.
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Positive,
        ToolKind::Negative,
        ToolKind::Marks,
        ToolKind::Safety,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Marks => "student_marks_tool",
            ToolKind::Positive => "positive_prompt_tool",
            ToolKind::Negative => "negative_prompt_tool",
            ToolKind::Safety => "safety_tool",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn handler(self, book: &MarksBook) -> Arc<dyn Tool> {
        match self {
            ToolKind::Marks => Arc::new(MarksTool::new(book.clone())),
            ToolKind::Positive => Arc::new(PositiveTool),
            ToolKind::Negative => Arc::new(NegativeTool),
            ToolKind::Safety => Arc::new(SafetyTool),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the registry of all builtin tools.
///
/// Fails if any handler's descriptor does not carry its kind's name, so no
/// kind is left without an implementation.
pub fn builtin_registry(book: MarksBook) -> Result<ToolRegistry, ParleyError> {
    let mut registry = ToolRegistry::new();
    for kind in ToolKind::ALL {
        registry.register(kind.handler(&book))?;
    }
    check_complete(&registry)?;
    info!(tools = ?registry.names(), "Tool registry ready");
    Ok(registry)
}

fn check_complete(registry: &ToolRegistry) -> Result<(), ParleyError> {
    let missing: Vec<&str> = ToolKind::ALL
        .iter()
        .map(|kind| kind.name())
        .filter(|name| !registry.contains(name))
        .collect();
    if !missing.is_empty() {
        return Err(ParleyError::Config(format!(
            "tool kinds without a handler: {}",
            missing.join(", ")
        )));
    }
    if registry.len() != ToolKind::ALL.len() {
        return Err(ParleyError::Config(format!(
            "registry holds {} tools, expected {}",
            registry.len(),
            ToolKind::ALL.len()
        )));
    }
    Ok(())
}
