//! Structured logging for Parley.
//!
//! Handles subscriber setup, secret redaction, and per-turn event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{AgentEvent, EventLogEntry, EventLogger};
pub use logger::init_logger;
pub use redact::{mask_secret, redact_sensitive_data};
