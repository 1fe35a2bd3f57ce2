use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{ParleyError, ToolError};
use crate::traits::Tool;
use crate::types::ToolDescriptor;

/// Result of a successful tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The tool produced its reply text.
    Completed(String),
    /// The tool ran but had no data for the request. Not an error.
    NoData(String),
}

struct Entry {
    descriptor: ToolDescriptor,
    handler: Arc<dyn Tool>,
}

/// Fixed catalog of callable tools, read-only once built.
///
/// Descriptors are kept in registration order so that the selection
/// procedure always sees the same sequence.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Fails if a tool with the same name is already registered.
    pub fn register(&mut self, handler: Arc<dyn Tool>) -> Result<(), ParleyError> {
        let descriptor = handler.descriptor();
        if self.index.contains_key(&descriptor.name) {
            return Err(ParleyError::DuplicateTool(descriptor.name));
        }
        debug!(tool = %descriptor.name, "Registered tool");
        self.index.insert(descriptor.name.clone(), self.entries.len());
        self.entries.push(Entry {
            descriptor,
            handler,
        });
        Ok(())
    }

    /// Descriptors in registration order.
    pub fn describe_all(&self) -> Vec<ToolDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.descriptor.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate `args` against the tool's schema and run it.
    pub async fn invoke(&self, name: &str, args: &Value) -> Result<ToolOutcome, ParleyError> {
        let entry = self
            .index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| ParleyError::UnknownTool(name.to_string()))?;

        entry
            .descriptor
            .validate(args)
            .map_err(|reason| ParleyError::InvalidArguments {
                tool: name.to_string(),
                reason,
            })?;

        match entry.handler.execute(args).await {
            Ok(text) => Ok(ToolOutcome::Completed(text)),
            Err(ToolError::NotFound(detail)) => Ok(ToolOutcome::NoData(detail)),
            Err(ToolError::InvalidArguments(reason)) => Err(ParleyError::InvalidArguments {
                tool: name.to_string(),
                reason,
            }),
            Err(ToolError::Execution(source)) => Err(ParleyError::ToolExecution {
                tool: name.to_string(),
                source,
            }),
        }
    }
}
