//! Intent classification for the Parley router.
//!
//! The [`Classifier`] capability is injected into the router. Two
//! implementations ship: [`LlmClassifier`] (function calling through an
//! [`parley_core::LlmProvider`]) and [`KeywordClassifier`] (offline rules).

pub mod classifier;
pub mod keyword;
pub mod llm;
pub mod prompt;
pub mod providers;

pub use classifier::{Classification, Classifier};
pub use keyword::KeywordClassifier;
pub use llm::{LlmClassifier, LlmSettings};
pub use prompt::PromptBuilder;
