//! Deterministic offline classifier.
//!
//! Reads the same routing intent the tool descriptions give the model, as
//! keyword rules. Used when no LLM is configured.

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tracing::debug;

use parley_core::{ToolDescriptor, Turn};
use parley_tools::{MarksBook, ToolKind};

use crate::classifier::{Classification, Classifier};

static MARKS_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(marks?|scores?|scored|grades?|results?|percentage)\b").unwrap()
});

static NEGATIVE_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\bnegative\s+prompt\b(?:\s+(?:for|of|about|to))?|\bavoid\b|\bexclud(?:e|ing)\b)\s*:?\s*(?P<rest>.*)$",
    )
    .unwrap()
});

static LOW_MOOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(sad|lonely|alone|stressed|depressed|down|low|anxious|unmotivated|upset|hopeless|worried|overwhelmed|heartbroken|miserable)\b",
    )
    .unwrap()
});

static GREETING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(hi|hello|hey|good\s+(morning|afternoon|evening))\b").unwrap()
});

pub const GREETING_REPLY: &str = "Hello! I can look up student marks, offer some encouragement, \
or write negative prompts. What would you like to do?";

pub const GENERIC_REPLY: &str = "I'm here to help. I can look up a student's marks (for example \
'What are Priya's Science marks?'), offer some encouragement, or turn an idea into a negative prompt.";

pub const MARKS_HINT_REPLY: &str = "I couldn't clearly detect the name and subject. \
Please include both, like: 'What are Priya's Science marks?'.";

pub struct KeywordClassifier {
    book: MarksBook,
}

impl KeywordClassifier {
    pub fn new(book: MarksBook) -> Self {
        Self { book }
    }

    /// Student and subject for a marks question, filling gaps from earlier
    /// turns so follow-ups like "and in Maths?" work.
    fn marks_query(&self, message: &str, history: &[Turn]) -> Option<(String, String)> {
        let student = self
            .book
            .detect_student(message)
            .or_else(|| recall(history, |text| self.book.detect_student(text)))?;
        let subject = self
            .book
            .detect_subject(message)
            .or_else(|| recall(history, |text| self.book.detect_subject(text)))?;
        Some((student, subject))
    }

    fn is_marks_follow_up(&self, message: &str, history: &[Turn]) -> bool {
        let last_was_marks = history
            .last()
            .is_some_and(|turn| turn.tool_used == ToolKind::Marks.name());
        last_was_marks
            && (self.book.detect_student(message).is_some()
                || self.book.detect_subject(message).is_some())
    }
}

/// Most recent earlier user message that `detect` finds something in.
fn recall(history: &[Turn], detect: impl Fn(&str) -> Option<String>) -> Option<String> {
    history
        .iter()
        .rev()
        .find_map(|turn| detect(&turn.user_message))
}

fn offered(tools: &[ToolDescriptor], kind: ToolKind) -> bool {
    tools.iter().any(|t| t.name == kind.name())
}

#[async_trait]
impl Classifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(
        &self,
        message: &str,
        history: &[Turn],
        tools: &[ToolDescriptor],
    ) -> Result<Classification> {
        let text = message.trim();

        if offered(tools, ToolKind::Marks)
            && (MARKS_INTENT.is_match(text) || self.is_marks_follow_up(text, history))
        {
            return Ok(match self.marks_query(text, history) {
                Some((student, subject)) => {
                    debug!(%student, %subject, "Keyword rule: marks");
                    Classification::invoke(
                        ToolKind::Marks.name(),
                        json!({"student": student, "subject": subject}),
                    )
                }
                None => Classification::direct(MARKS_HINT_REPLY),
            });
        }

        if offered(tools, ToolKind::Negative) {
            if let Some(caps) = NEGATIVE_INTENT.captures(text) {
                let rest = caps.name("rest").map(|m| m.as_str().trim()).unwrap_or_default();
                let prompt = if rest.is_empty() { text } else { rest };
                debug!("Keyword rule: negative");
                return Ok(Classification::invoke(
                    ToolKind::Negative.name(),
                    json!({"prompt": prompt}),
                ));
            }
        }

        if offered(tools, ToolKind::Positive) && LOW_MOOD.is_match(text) {
            debug!("Keyword rule: positive");
            return Ok(Classification::invoke(
                ToolKind::Positive.name(),
                json!({"prompt": text}),
            ));
        }

        if GREETING.is_match(text) {
            return Ok(Classification::direct(GREETING_REPLY));
        }
        Ok(Classification::direct(GENERIC_REPLY))
    }
}
