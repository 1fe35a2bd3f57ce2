use async_trait::async_trait;
use parley_core::{ParamKind, ParamSpec, Tool, ToolDescriptor, ToolError};
use serde_json::Value;

use crate::kind::ToolKind;

/// Warm, encouraging response for someone who seems low.
pub struct PositiveTool;

#[async_trait]
impl Tool for PositiveTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            ToolKind::Positive.name(),
            "Use this tool when the user or their friend seems emotionally low, lonely, \
             stressed, sad, or in need of encouragement or motivation. Returns a warm, \
             supportive, and uplifting response.",
        )
        .with_param(ParamSpec::required(
            "prompt",
            ParamKind::String,
            "What the user said about how they or their friend feel",
        ))
    }

    async fn execute(&self, args: &Value) -> Result<String, ToolError> {
        let prompt = crate::required_text(args, "prompt")?;
        Ok(format!(
            "I hear that: '{}'. It's completely okay to feel this way sometimes. \
             You matter, and things can get better step by step. \
             Try reaching out to someone you trust, and be kind to yourself.",
            prompt
        ))
    }
}
