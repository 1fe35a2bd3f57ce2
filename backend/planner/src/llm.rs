use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use parley_core::{ChatMessage, LlmProvider, LlmRequest, ToolDescriptor, Turn};

use crate::classifier::{Classification, Classifier};
use crate::prompt::PromptBuilder;

/// Sampling and model settings for the LLM classifier.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 512,
            temperature: 0.0,
        }
    }
}

/// Classifier backed by an LLM provider's function calling.
pub struct LlmClassifier {
    provider: Arc<dyn LlmProvider>,
    settings: LlmSettings,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: LlmSettings) -> Self {
        Self { provider, settings }
    }

    fn build_request(&self, message: &str, history: &[Turn], tools: &[ToolDescriptor]) -> LlmRequest {
        let mut messages = Vec::with_capacity(history.len() * 2 + 1);
        for turn in history {
            messages.push(ChatMessage::user(turn.user_message.clone()));
            messages.push(ChatMessage::assistant(turn.assistant_message.clone()));
        }
        messages.push(ChatMessage::user(message));

        LlmRequest {
            model: self.settings.model.clone(),
            system_prompt: PromptBuilder::build(tools),
            messages,
            tools: tools.to_vec(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn classify(
        &self,
        message: &str,
        history: &[Turn],
        tools: &[ToolDescriptor],
    ) -> Result<Classification> {
        let request = self.build_request(message, history, tools);
        let response = self.provider.complete(&request).await?;

        info!(
            provider = %response.provider,
            tokens = response.tokens_used,
            latency_ms = response.latency_ms,
            tool_calls = response.tool_calls.len(),
            "Classifier responded"
        );

        // One decision per turn: only the first tool call is honoured.
        match response.tool_calls.into_iter().next() {
            Some(call) => {
                debug!(tool = %call.name, "Model requested tool");
                Ok(Classification::invoke(call.name, call.arguments))
            }
            None => Ok(Classification::direct(response.content.trim())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;
    use chrono::Utc;
    use parley_core::NO_TOOL;
    use serde_json::json;

    fn turn(user: &str, assistant: &str) -> Turn {
        Turn {
            session_id: "s".into(),
            user_message: user.into(),
            assistant_message: assistant.into(),
            tool_used: NO_TOOL.into(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_tool_call_becomes_invoke() {
        let provider = MockProvider::new("mock")
            .with_tool_call("student_marks_tool", json!({"student": "Priya", "subject": "Maths"}));
        let classifier = LlmClassifier::new(Arc::new(provider), LlmSettings::default());
        let result = classifier.classify("Priya maths?", &[], &[]).await.unwrap();
        assert_eq!(
            result,
            Classification::invoke("student_marks_tool", json!({"student": "Priya", "subject": "Maths"}))
        );
    }

    #[tokio::test]
    async fn test_plain_content_becomes_direct() {
        let provider = MockProvider::new("mock").with_response("  Hello there!  ");
        let classifier = LlmClassifier::new(Arc::new(provider), LlmSettings::default());
        let result = classifier.classify("hi", &[], &[]).await.unwrap();
        assert_eq!(result, Classification::direct("Hello there!"));
    }

    #[test]
    fn test_request_includes_history_in_order() {
        let classifier = LlmClassifier::new(Arc::new(MockProvider::new("mock")), LlmSettings::default());
        let history = vec![turn("first", "one"), turn("second", "two")];
        let request = classifier.build_request("third", &history, &[]);
        let contents: Vec<&str> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "one", "second", "two", "third"]);
        assert_eq!(request.temperature, 0.0);
    }
}
