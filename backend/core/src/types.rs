use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel recorded in `tool_used` when the reply was produced without a tool.
pub const NO_TOOL: &str = "none";

/// One persisted user/assistant exchange.
///
/// Immutable once written. Serializes to the persisted record shape
/// `{session_id, user, assistant, tool_used, timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub session_id: String,
    #[serde(rename = "user")]
    pub user_message: String,
    #[serde(rename = "assistant")]
    pub assistant_message: String,
    pub tool_used: String,
    pub timestamp: DateTime<Utc>,
}

/// A turn that has not been written yet. The store assigns the timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnDraft {
    pub session_id: String,
    pub user_message: String,
    pub assistant_message: String,
    pub tool_used: String,
}

impl TurnDraft {
    pub fn stamp(self, timestamp: DateTime<Utc>) -> Turn {
        Turn {
            session_id: self.session_id,
            user_message: self.user_message,
            assistant_message: self.assistant_message,
            tool_used: self.tool_used,
            timestamp,
        }
    }
}

/// Primitive type of a declared tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

/// A named, typed argument field of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Static description of a callable tool, used for selection and validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    /// JSON Schema for the parameters, in the shape function-calling APIs expect.
    pub fn json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": param.kind.json_type(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check `args` against the declared parameters.
    ///
    /// Arguments must be an object; required fields must be present and
    /// non-null; every present field must be declared and of the declared kind.
    pub fn validate(&self, args: &Value) -> Result<(), String> {
        let Some(map) = args.as_object() else {
            return Err("arguments must be a JSON object".to_string());
        };

        for param in &self.parameters {
            match map.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(format!("missing field `{}`", param.name));
                }
                Some(value) if !value.is_null() && !param.kind.accepts(value) => {
                    return Err(format!(
                        "field `{}` must be of type {}",
                        param.name,
                        param.kind.json_type()
                    ));
                }
                _ => {}
            }
        }

        if let Some(unknown) = map
            .keys()
            .find(|key| !self.parameters.iter().any(|p| &p.name == *key))
        {
            return Err(format!("unexpected field `{}`", unknown));
        }

        Ok(())
    }
}

/// The per-request outcome of routing. Collapsed into a [`Turn`] by the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoutingDecision {
    Direct {
        reply: String,
    },
    ToolInvocation {
        tool_name: String,
        arguments: Value,
        reply: String,
    },
}

impl RoutingDecision {
    pub fn direct(reply: impl Into<String>) -> Self {
        RoutingDecision::Direct {
            reply: reply.into(),
        }
    }

    pub fn reply(&self) -> &str {
        match self {
            RoutingDecision::Direct { reply } => reply,
            RoutingDecision::ToolInvocation { reply, .. } => reply,
        }
    }

    /// Tool name for `route_selected` / `tool_used`, or [`NO_TOOL`].
    pub fn tool_used(&self) -> &str {
        match self {
            RoutingDecision::Direct { .. } => NO_TOOL,
            RoutingDecision::ToolInvocation { tool_name, .. } => tool_name,
        }
    }
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingDecision::Direct { .. } => write!(f, "direct"),
            RoutingDecision::ToolInvocation { tool_name, .. } => write!(f, "tool({})", tool_name),
        }
    }
}

/// Inbound chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: String,
    pub message: String,
}

/// Outbound chat result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub response: String,
    pub route_selected: String,
}

/// One history record as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user: String,
    pub assistant: String,
    pub tool_used: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Turn> for HistoryEntry {
    fn from(turn: Turn) -> Self {
        Self {
            user: turn.user_message,
            assistant: turn.assistant_message,
            tool_used: turn.tool_used,
            timestamp: turn.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub status: String,
}
