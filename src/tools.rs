//! Tool descriptors the host can invoke, and their dispatch.
//!
//! Every tool maps onto a panel action; invoking it has the same effect as
//! the matching key press, including the notification sent back to the host.

use once_cell::sync::Lazy;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::model::EventType;

/// Panel a tool is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolTarget {
    Sessions,
    Events,
}

/// Declarative description of an invocable tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub output_schema: Value,
    pub tags: Vec<&'static str>,
    pub target: ToolTarget,
}

fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ok": { "type": "boolean" },
            "error": { "type": ["string", "null"] }
        },
        "required": ["ok"]
    })
}

fn empty_input() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn session_id_input() -> Value {
    json!({
        "type": "object",
        "properties": { "session_id": { "type": "string" } },
        "required": ["session_id"]
    })
}

static TOOLS: Lazy<Vec<ToolDescriptor>> = Lazy::new(|| {
    vec![
        ToolDescriptor {
            name: "refresh_sessions",
            description: "Ask the host to reload the session list",
            input_schema: empty_input(),
            output_schema: output_schema(),
            tags: vec!["sessions", "refresh"],
            target: ToolTarget::Sessions,
        },
        ToolDescriptor {
            name: "open_session_terminal",
            description: "Open a terminal attached to a session",
            input_schema: session_id_input(),
            output_schema: output_schema(),
            tags: vec!["sessions", "terminal"],
            target: ToolTarget::Sessions,
        },
        ToolDescriptor {
            name: "select_session",
            description: "Select a session in the sessions panel",
            input_schema: session_id_input(),
            output_schema: output_schema(),
            tags: vec!["sessions", "navigation"],
            target: ToolTarget::Sessions,
        },
        ToolDescriptor {
            name: "delete_session",
            description: "Delete a session and its stored state",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "session_id": { "type": "string" },
                    "cwd": { "type": "string" }
                },
                "required": ["session_id"]
            }),
            output_schema: output_schema(),
            tags: vec!["sessions", "destructive"],
            target: ToolTarget::Sessions,
        },
        ToolDescriptor {
            name: "open_directory",
            description: "Open a session's working directory",
            input_schema: json!({
                "type": "object",
                "properties": { "directory": { "type": "string" } },
                "required": ["directory"]
            }),
            output_schema: output_schema(),
            tags: vec!["sessions", "filesystem"],
            target: ToolTarget::Sessions,
        },
        ToolDescriptor {
            name: "filter_events",
            description: "Show only the given event types; an empty list shows all",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "event_types": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["event_types"]
            }),
            output_schema: output_schema(),
            tags: vec!["events", "filter"],
            target: ToolTarget::Events,
        },
        ToolDescriptor {
            name: "clear_events",
            description: "Clear the event stream",
            input_schema: empty_input(),
            output_schema: output_schema(),
            tags: vec!["events"],
            target: ToolTarget::Events,
        },
        ToolDescriptor {
            name: "toggle_repo_filter",
            description: "Restrict events to the current repository",
            input_schema: json!({
                "type": "object",
                "properties": { "enabled": { "type": "boolean" } },
                "required": ["enabled"]
            }),
            output_schema: output_schema(),
            tags: vec!["events", "filter"],
            target: ToolTarget::Events,
        },
    ]
});

pub fn descriptors() -> &'static [ToolDescriptor] {
    &TOOLS
}

/// A parsed, typed tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    RefreshSessions,
    OpenSessionTerminal { session_id: String },
    SelectSession { session_id: String },
    DeleteSession { session_id: String, cwd: Option<String> },
    OpenDirectory { directory: String },
    FilterEvents { event_types: Vec<EventType> },
    ClearEvents,
    ToggleRepoFilter { enabled: bool },
}

#[derive(Deserialize)]
struct SessionIdInput {
    session_id: String,
}

#[derive(Deserialize)]
struct DeleteInput {
    session_id: String,
    #[serde(default)]
    cwd: Option<String>,
}

#[derive(Deserialize)]
struct DirectoryInput {
    directory: String,
}

#[derive(Deserialize)]
struct FilterInput {
    event_types: Vec<EventType>,
}

#[derive(Deserialize)]
struct RepoFilterInput {
    enabled: bool,
}

fn parse_input<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T, ToolError> {
    let input = if input.is_null() { json!({}) } else { input };
    serde_json::from_value(input).map_err(|source| ToolError::InvalidInput {
        tool: tool.to_string(),
        source,
    })
}

impl ToolCall {
    /// Resolve a tool name and raw input into a call
    pub fn parse(name: &str, input: Value) -> Result<Self, ToolError> {
        let call = match name {
            "refresh_sessions" => Self::RefreshSessions,
            "open_session_terminal" => {
                let SessionIdInput { session_id } = parse_input(name, input)?;
                Self::OpenSessionTerminal { session_id }
            }
            "select_session" => {
                let SessionIdInput { session_id } = parse_input(name, input)?;
                Self::SelectSession { session_id }
            }
            "delete_session" => {
                let DeleteInput { session_id, cwd } = parse_input(name, input)?;
                Self::DeleteSession { session_id, cwd }
            }
            "open_directory" => {
                let DirectoryInput { directory } = parse_input(name, input)?;
                Self::OpenDirectory { directory }
            }
            "filter_events" => {
                let FilterInput { event_types } = parse_input(name, input)?;
                Self::FilterEvents { event_types }
            }
            "clear_events" => Self::ClearEvents,
            "toggle_repo_filter" => {
                let RepoFilterInput { enabled } = parse_input(name, input)?;
                Self::ToggleRepoFilter { enabled }
            }
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(call)
    }

    pub fn target(&self) -> ToolTarget {
        match self {
            Self::FilterEvents { .. } | Self::ClearEvents | Self::ToggleRepoFilter { .. } => {
                ToolTarget::Events
            }
            _ => ToolTarget::Sessions,
        }
    }
}
