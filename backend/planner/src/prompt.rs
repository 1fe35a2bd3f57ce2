//! System prompt for the LLM classifier.

use parley_core::ToolDescriptor;

const IDENTITY: &str = "You are a helpful AI assistant.";

const RULES: &str = "- You have access to several tools; decide when to call them.\n\
- Call at most one tool per message.\n\
- Use student_marks_tool for any question about student marks, scores, results or grades.\n\
- Use positive_prompt_tool when the user or a friend seems emotionally low.\n\
- Use negative_prompt_tool when the user explicitly asks for a negative prompt or to avoid/exclude something.\n\
- For any mention of suicidal intent or self-harm, you MUST call safety_tool.\n\
- Otherwise answer directly and briefly, using the conversation so far for context.";

pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the system prompt, listing only the tools actually offered.
    pub fn build(tools: &[ToolDescriptor]) -> String {
        let listing = if tools.is_empty() {
            "No tools are available; answer directly.".to_string()
        } else {
            tools
                .iter()
                .map(|t| format!("* {}: {}", t.name, t.description))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!("{}\n\n{}\n\nTOOLS:\n{}", IDENTITY, RULES, listing)
    }
}
