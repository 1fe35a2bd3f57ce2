//! Crisis response tool and the indicators that force it.
//!
//! The reply is a fixed template. It never depends on the input text or on
//! any model output.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parley_core::{ParamKind, ParamSpec, Tool, ToolDescriptor, ToolError};
use regex::Regex;
use serde_json::Value;

use crate::kind::ToolKind;

/// The only text ever returned on the safety path.
pub const CRISIS_RESPONSE: &str = "I'm really sorry you're feeling this way. \
Your life is important and you deserve support. \
Please reach out immediately to someone you trust, a family member, friend, \
or local mental health professional. \
If you are in immediate danger, contact your local emergency services or a crisis helpline. \
You are not alone.";

/// Self-harm and crisis indicators, matched case-insensitively.
static CRISIS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bsuicid(e|al)\b",
        r"\bkill(ing)?\s+my\s?self\b",
        r"\bhurt(ing)?\s+my\s?self\b",
        r"\bharm(ing)?\s+my\s?self\b",
        r"\bself[-\s]?harm",
        r"\bend(ing)?\s+(my|it)\s+(life|all)\b",
        r"\btake\s+my\s+(own\s+)?life\b",
        r"\bwant\s+to\s+die\b",
        r"\bbetter\s+off\s+dead\b",
        r"\bno\s+reason\s+to\s+live\b",
        r"\bnot\s+worth\s+living\b",
        r"\bcut(ting)?\s+myself\b",
        r"\b(don['’]?t|do\s+not|no\s+longer)\s+want\s+to\s+(live|be\s+alive|exist|wake\s+up)\b",
        r"\bwant\s+to\s+be\s+dead\b",
        r"\bwish\s+i\s+(was|were)\s+dead\b",
        r"\bhang(ing)?\s+my\s?self\b",
        r"\boverdos(e|ed|ing)\b",
        r"\b(slit|slitting|cut|cutting)\s+my\s+wrists?\b",
        r"\b(want(ed)?\s+to|going\s+to|gonna|about\s+to|(think|thinking)\s+(about|of)|plan(ning)?\s+(to|on))\s+end(ing)?\s+it\b",
        r"\bend(ing)?\s+it\s+all\b",
        r"\bkms\b",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("crisis pattern is valid"))
    .collect()
});

/// Keyword/pattern check for self-harm indicators.
///
/// Runs before any classifier. Extra phrases from configuration are matched
/// as case-insensitive substrings.
#[derive(Debug, Clone, Default)]
pub struct CrisisDetector {
    extra_phrases: Vec<String>,
}

impl CrisisDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_phrases.extend(
            phrases
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty()),
        );
        self
    }

    /// First indicator found in `text`, if any.
    pub fn matched_indicator(&self, text: &str) -> Option<String> {
        if let Some(m) = CRISIS_PATTERNS.iter().find_map(|re| re.find(text)) {
            return Some(m.as_str().to_lowercase());
        }
        let lower = text.to_lowercase();
        self.extra_phrases
            .iter()
            .find(|phrase| lower.contains(phrase.as_str()))
            .cloned()
    }

    pub fn is_crisis(&self, text: &str) -> bool {
        self.matched_indicator(text).is_some()
    }
}

/// Fixed, resource-referring response for crisis-adjacent messages.
pub struct SafetyTool;

#[async_trait]
impl Tool for SafetyTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            ToolKind::Safety.name(),
            "ALWAYS use this tool when the user expresses suicidal thoughts, self-harm \
             intent, or wants to end their life. Responds with a safe, supportive message \
             that encourages contacting trusted people or professionals.",
        )
        .with_param(ParamSpec::required(
            "text",
            ParamKind::String,
            "The user's message",
        ))
    }

    async fn execute(&self, _args: &Value) -> Result<String, ToolError> {
        Ok(CRISIS_RESPONSE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detects_crisis_phrases() {
        let detector = CrisisDetector::new();
        for text in [
            "I want to hurt myself",
            "i've been thinking about suicide",
            "I just want to END MY LIFE",
            "sometimes I think about killing myself",
            "everyone would be better off dead without me",
            "my friend talks about self-harm",
            "I don't want to live anymore",
            "i dont want to be alive",
            "I want to be dead",
            "I'm going to hang myself tonight",
            "thinking about taking an overdose",
            "I want to slit my wrists",
            "I'm thinking about ending it",
            "I just want to end it all",
            "honestly i might just kms",
        ] {
            assert!(detector.is_crisis(text), "expected crisis: {text}");
        }
    }

    #[test]
    fn test_ignores_ordinary_messages() {
        let detector = CrisisDetector::new();
        for text in [
            "What are Priya's Science marks?",
            "I feel a bit low today",
            "give me a negative prompt for a sunset",
            "this bug is killing me",
            "I want to live in Paris someday",
            "the movie's ending was sad",
            "let's wrap up and end the lesson",
        ] {
            assert!(!detector.is_crisis(text), "unexpected crisis: {text}");
        }
    }

    #[test]
    fn test_extra_phrases() {
        let detector = CrisisDetector::new().with_extra_phrases(["Disappear Forever", " "]);
        assert_eq!(
            detector.matched_indicator("I want to disappear forever").as_deref(),
            Some("disappear forever")
        );
    }

    #[tokio::test]
    async fn test_response_is_fixed() {
        let a = SafetyTool.execute(&json!({"text": "I want to die"})).await.unwrap();
        let b = SafetyTool.execute(&json!({"text": "anything else"})).await.unwrap();
        assert_eq!(a, CRISIS_RESPONSE);
        assert_eq!(a, b);
    }
}
