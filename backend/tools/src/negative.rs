use async_trait::async_trait;
use parley_core::{ParamKind, ParamSpec, Tool, ToolDescriptor, ToolError};
use serde_json::Value;

use crate::kind::ToolKind;

/// Exclusion-style rewrite: turns the request into what to avoid.
pub struct NegativeTool;

#[async_trait]
impl Tool for NegativeTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            ToolKind::Negative.name(),
            "Use this tool when the user explicitly asks for a negative prompt, or to \
             avoid/exclude something in an image or text generation prompt, or when the \
             request should not be fulfilled verbatim. Returns an exclusion-style rewrite.",
        )
        .with_param(ParamSpec::required(
            "prompt",
            ParamKind::String,
            "The idea or prompt to rewrite as an exclusion",
        ))
    }

    async fn execute(&self, args: &Value) -> Result<String, ToolError> {
        let prompt = crate::required_text(args, "prompt")?;
        let prompt = prompt.trim_end_matches(['.', '!', '?']);
        Ok(format!(
            "Negative/exclusion-style version of your idea: Avoid {}.",
            prompt
        ))
    }
}
