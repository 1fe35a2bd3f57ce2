//! Student marks lookup tool.
//!
//! Scores come from a [`MarksBook`], either the builtin sample data or a CSV
//! file with `student,subject,score` rows.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parley_core::{ParamKind, ParamSpec, Tool, ToolDescriptor, ToolError};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::kind::ToolKind;

/// Subject spellings users commonly type, mapped to the canonical subject.
const SUBJECT_ALIASES: &[(&str, &str)] = &[
    ("mathematics", "Maths"),
    ("math", "Maths"),
    ("maths", "Maths"),
    ("english", "English"),
    ("science", "Science"),
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarkRecord {
    pub student: String,
    pub subject: String,
    pub score: u32,
}

/// Letter grade for a score: >=90 A+, >=80 A, >=70 B, >=60 C, else D.
pub fn letter_grade(score: u32) -> &'static str {
    match score {
        90.. => "A+",
        80..=89 => "A",
        70..=79 => "B",
        60..=69 => "C",
        _ => "D",
    }
}

/// Read-only table of student scores.
#[derive(Debug, Clone, Default)]
pub struct MarksBook {
    records: Vec<MarkRecord>,
}

impl MarksBook {
    pub fn new(records: Vec<MarkRecord>) -> Self {
        Self { records }
    }

    /// The sample class shipped with the service.
    pub fn builtin() -> Self {
        let rows: [(&str, &str, u32); 9] = [
            ("Priya", "English", 92),
            ("Priya", "Maths", 88),
            ("Priya", "Science", 95),
            ("Amit", "English", 78),
            ("Amit", "Maths", 81),
            ("Amit", "Science", 74),
            ("Rahul", "English", 67),
            ("Rahul", "Maths", 72),
            ("Rahul", "Science", 70),
        ];
        Self::new(
            rows.iter()
                .map(|&(student, subject, score)| MarkRecord {
                    student: student.to_string(),
                    subject: subject.to_string(),
                    score,
                })
                .collect(),
        )
    }

    /// Load a CSV file with a `student,subject,score` header.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open marks file: {}", path.display()))?;
        let records = reader
            .deserialize()
            .collect::<Result<Vec<MarkRecord>, _>>()
            .with_context(|| format!("Failed to parse marks file: {}", path.display()))?;
        info!(path = %path.display(), rows = records.len(), "Loaded marks book");
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Case-insensitive lookup of a student/subject pair.
    pub fn lookup(&self, student: &str, subject: &str) -> Option<&MarkRecord> {
        let subject = canonical_subject(subject).unwrap_or(subject);
        self.records.iter().find(|r| {
            r.student.eq_ignore_ascii_case(student.trim())
                && r.subject.eq_ignore_ascii_case(subject.trim())
        })
    }

    fn knows_student(&self, student: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.student.eq_ignore_ascii_case(student.trim()))
    }

    /// A known student named in free text.
    pub fn detect_student(&self, text: &str) -> Option<String> {
        self.records
            .iter()
            .map(|r| r.student.as_str())
            .find(|name| mentions_word(text, name))
            .map(str::to_string)
    }

    /// A subject named in free text, canonicalized ("math" becomes "Maths").
    pub fn detect_subject(&self, text: &str) -> Option<String> {
        SUBJECT_ALIASES
            .iter()
            .find(|(alias, _)| mentions_word(text, alias))
            .map(|(_, canonical)| canonical.to_string())
            .or_else(|| {
                self.records
                    .iter()
                    .map(|r| r.subject.as_str())
                    .find(|subject| mentions_word(text, subject))
                    .map(str::to_string)
            })
    }

    /// Find a known student and a subject mentioned in free text.
    pub fn detect(&self, text: &str) -> Option<(String, String)> {
        Some((self.detect_student(text)?, self.detect_subject(text)?))
    }
}

fn canonical_subject(subject: &str) -> Option<&'static str> {
    let lower = subject.trim().to_lowercase();
    SUBJECT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canonical)| *canonical)
}

/// Whole-word, case-insensitive match. Allows a trailing possessive ("Priya's").
fn mentions_word(text: &str, word: &str) -> bool {
    let word = word.trim().to_lowercase();
    if word.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
    text.match_indices(word.as_str()).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + word.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Looks up a student's score in a subject and derives the letter grade.
pub struct MarksTool {
    book: MarksBook,
}

impl MarksTool {
    pub fn new(book: MarksBook) -> Self {
        Self { book }
    }
}

#[async_trait]
impl Tool for MarksTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            ToolKind::Marks.name(),
            "Use this tool when the user is asking about a student's marks, score, result, \
             or grade in a specific subject.",
        )
        .with_param(ParamSpec::required(
            "student",
            ParamKind::String,
            "The student's name, e.g. 'Priya'",
        ))
        .with_param(ParamSpec::required(
            "subject",
            ParamKind::String,
            "The subject, e.g. 'Science'",
        ))
    }

    async fn execute(&self, args: &Value) -> Result<String, ToolError> {
        let student = args["student"].as_str().unwrap_or_default().trim();
        let subject = args["subject"].as_str().unwrap_or_default().trim();
        if student.is_empty() || subject.is_empty() {
            return Err(ToolError::InvalidArguments(
                "both student and subject are required".to_string(),
            ));
        }

        match self.book.lookup(student, subject) {
            Some(record) => Ok(format!(
                "{} scored {} in {} (Grade: {})",
                record.student,
                record.score,
                record.subject,
                letter_grade(record.score)
            )),
            None if self.book.knows_student(student) => Err(ToolError::NotFound(format!(
                "{} has no marks stored for {}",
                student, subject
            ))),
            None => Err(ToolError::NotFound(format!(
                "no marks stored for {} in {}",
                student, subject
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(letter_grade(100), "A+");
        assert_eq!(letter_grade(90), "A+");
        assert_eq!(letter_grade(89), "A");
        assert_eq!(letter_grade(80), "A");
        assert_eq!(letter_grade(70), "B");
        assert_eq!(letter_grade(60), "C");
        assert_eq!(letter_grade(59), "D");
        assert_eq!(letter_grade(0), "D");
    }

    #[tokio::test]
    async fn test_known_student() {
        let tool = MarksTool::new(MarksBook::builtin());
        let out = tool
            .execute(&json!({"student": "Priya", "subject": "Science"}))
            .await
            .unwrap();
        assert_eq!(out, "Priya scored 95 in Science (Grade: A+)");
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let tool = MarksTool::new(MarksBook::builtin());
        let out = tool
            .execute(&json!({"student": "amit", "subject": "math"}))
            .await
            .unwrap();
        assert_eq!(out, "Amit scored 81 in Maths (Grade: A)");
    }

    #[tokio::test]
    async fn test_unknown_student_is_not_found() {
        let tool = MarksTool::new(MarksBook::builtin());
        let err = tool
            .execute(&json!({"student": "Zara", "subject": "Science"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));

        let err = tool
            .execute(&json!({"student": "Rahul", "subject": "History"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(msg) if msg.contains("Rahul has no marks")));
    }

    #[tokio::test]
    async fn test_blank_student_is_invalid() {
        let tool = MarksTool::new(MarksBook::builtin());
        let err = tool
            .execute(&json!({"student": "  ", "subject": "Science"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn test_mentions_whole_words_only() {
        assert!(mentions_word("What are Priya's marks?", "Priya"));
        assert!(mentions_word("marks for PRIYA", "priya"));
        assert!(mentions_word("maths, then math", "math"));
        assert!(!mentions_word("Priyanka's marks", "Priya"));
        assert!(!mentions_word("aftermath", "math"));
        assert!(!mentions_word("anything", " "));
    }

    #[test]
    fn test_detect_from_free_text() {
        let book = MarksBook::builtin();
        assert_eq!(
            book.detect("What are Priya's Science marks?"),
            Some(("Priya".to_string(), "Science".to_string()))
        );
        assert_eq!(
            book.detect("how did rahul do in mathematics"),
            Some(("Rahul".to_string(), "Maths".to_string()))
        );
        assert_eq!(book.detect("What did Priya get?"), None);
        assert_eq!(book.detect("Science marks for Zara"), None);
    }

    #[test]
    fn test_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "student,subject,score").unwrap();
        writeln!(file, "Meera,History,64").unwrap();
        let book = MarksBook::from_csv(file.path()).unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.lookup("meera", "history").unwrap().score, 64);
    }
}
