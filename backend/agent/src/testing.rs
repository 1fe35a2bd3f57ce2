//! Deterministic stand-ins for the classifier, tools, and store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use parley_core::{ParleyError, Tool, ToolDescriptor, ToolError, Turn, TurnDraft};
use parley_memory::SessionStore;
use parley_planner::{Classification, Classifier};

/// Always returns the same classification, or always fails.
pub struct FixedClassifier {
    outcome: Result<Classification, String>,
    calls: AtomicUsize,
    last_history: Mutex<Vec<Turn>>,
}

impl FixedClassifier {
    pub fn new(classification: Classification) -> Self {
        Self {
            outcome: Ok(classification),
            calls: AtomicUsize::new(0),
            last_history: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            last_history: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_history(&self) -> Vec<Turn> {
        self.last_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn classify(
        &self,
        _message: &str,
        history: &[Turn],
        _tools: &[ToolDescriptor],
    ) -> Result<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_history.lock().unwrap() = history.to_vec();
        self.outcome.clone().map_err(|e| anyhow!(e))
    }
}

/// Sleeps past any reasonable timeout before answering.
pub struct SleepingClassifier {
    delay: Duration,
}

impl SleepingClassifier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Classifier for SleepingClassifier {
    fn name(&self) -> &str {
        "sleeping"
    }

    async fn classify(
        &self,
        _message: &str,
        _history: &[Turn],
        _tools: &[ToolDescriptor],
    ) -> Result<Classification> {
        tokio::time::sleep(self.delay).await;
        Ok(Classification::direct("too late"))
    }
}

/// Records how much history each call saw, pausing so concurrent turns overlap.
pub struct HistoryLenClassifier {
    delay: Duration,
    seen: Mutex<Vec<usize>>,
}

impl HistoryLenClassifier {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<usize> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for HistoryLenClassifier {
    fn name(&self) -> &str {
        "history-len"
    }

    async fn classify(
        &self,
        _message: &str,
        history: &[Turn],
        _tools: &[ToolDescriptor],
    ) -> Result<Classification> {
        self.seen.lock().unwrap().push(history.len());
        tokio::time::sleep(self.delay).await;
        Ok(Classification::direct("noted"))
    }
}

pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("failing_tool", "Always fails.")
    }

    async fn execute(&self, _args: &Value) -> Result<String, ToolError> {
        Err(ToolError::Execution(anyhow!("backend exploded")))
    }
}

/// A store whose backend is never reachable.
pub struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn append(&self, _draft: TurnDraft) -> Result<Turn, ParleyError> {
        Err(ParleyError::StorageUnavailable("connection refused".into()))
    }

    async fn list(&self, _session_id: &str) -> Result<Vec<Turn>, ParleyError> {
        Err(ParleyError::StorageUnavailable("connection refused".into()))
    }

    async fn delete_all(&self, _session_id: &str) -> Result<(), ParleyError> {
        Err(ParleyError::StorageUnavailable("connection refused".into()))
    }
}
