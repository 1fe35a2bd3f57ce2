//! Builtin leaf tools: marks lookup, positive and negative framing, and the
//! fixed crisis response.

pub mod kind;
pub mod marks;
pub mod negative;
pub mod positive;
pub mod safety;

pub use kind::{builtin_registry, ToolKind};
pub use marks::{letter_grade, MarkRecord, MarksBook, MarksTool};
pub use negative::NegativeTool;
pub use positive::PositiveTool;
pub use safety::{CrisisDetector, SafetyTool, CRISIS_RESPONSE};

use parley_core::ToolError;
use serde_json::Value;

/// Non-blank string argument, trimmed.
pub(crate) fn required_text<'a>(args: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    let text = args[field].as_str().unwrap_or_default().trim();
    if text.is_empty() {
        return Err(ToolError::InvalidArguments(format!("`{}` must not be empty", field)));
    }
    Ok(text)
}
