mod bus;
mod process;

pub use bus::{EventBus, Subscription};
pub use process::HostLink;

use serde::{Deserialize, Serialize};

use crate::model::{lenient_vec, AgentEvent, EventType, Session};

/// Data slice the host supplies to the sessions panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSlice {
    #[serde(deserialize_with = "lenient_vec")]
    pub sessions: Vec<Session>,
    pub loading: bool,
    pub error: Option<String>,
}

/// A message from the host, one JSON object per line
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// Replacement session snapshot
    Slice(SessionSlice),
    /// One pushed agent event
    Event { event: AgentEvent },
    /// The repository the dashboard is scoped to changed
    Repository {
        #[serde(default)]
        path: Option<String>,
    },
    /// External tool invocation
    InvokeTool {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
}

impl HostMessage {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Notification sent from a panel to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelEvent {
    Refresh,
    OpenTerminal {
        session_id: String,
    },
    SelectSession {
        session_id: String,
    },
    DeleteSession {
        session_id: String,
        cwd: Option<String>,
    },
    OpenDirectory {
        directory: String,
    },
    ClearEvents,
    FilterEvents {
        event_types: Vec<EventType>,
    },
    ToggleRepoFilter {
        enabled: bool,
    },
    ToolResult {
        id: Option<String>,
        name: String,
        ok: bool,
        error: Option<String>,
    },
}

impl PanelEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::OpenTerminal { .. } => "open_terminal",
            Self::SelectSession { .. } => "select_session",
            Self::DeleteSession { .. } => "delete_session",
            Self::OpenDirectory { .. } => "open_directory",
            Self::ClearEvents => "clear_events",
            Self::FilterEvents { .. } => "filter_events",
            Self::ToggleRepoFilter { .. } => "toggle_repo_filter",
            Self::ToolResult { .. } => "tool_result",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slice_skips_bad_sessions() {
        let msg = HostMessage::parse(
            r#"{"type":"slice","sessions":[{"id":"a","cwd":"/repo"},{"id":5},{"id":"b"}],"loading":true}"#,
        )
        .unwrap();
        match msg {
            HostMessage::Slice(slice) => {
                assert_eq!(slice.sessions.len(), 2);
                assert!(slice.loading);
                assert!(slice.error.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_event_and_tool() {
        let msg = HostMessage::parse(
            r#"{"type":"event","event":{"event_type":"post_tool_use","session_id":"s","tool_name":"Edit","files":["a.rs"]}}"#,
        )
        .unwrap();
        let HostMessage::Event { event } = msg else {
            panic!("expected event");
        };
        assert_eq!(event.event_type, EventType::PostToolUse);
        assert_eq!(event.files, vec!["a.rs".to_string()]);

        let msg = HostMessage::parse(r#"{"type":"invoke_tool","name":"clear_events"}"#).unwrap();
        assert_eq!(
            msg,
            HostMessage::InvokeTool {
                id: None,
                name: "clear_events".to_string(),
                input: serde_json::Value::Null,
            }
        );

        assert!(HostMessage::parse(r#"{"type":"bogus"}"#).is_err());
    }

    #[test]
    fn test_panel_event_wire_format() {
        let json = serde_json::to_value(PanelEvent::DeleteSession {
            session_id: "a".to_string(),
            cwd: Some("/repo".to_string()),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type":"delete_session","session_id":"a","cwd":"/repo"})
        );

        let json = serde_json::to_value(PanelEvent::FilterEvents {
            event_types: vec![EventType::PreToolUse, EventType::Other("x".into())],
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type":"filter_events","event_types":["pre_tool_use","x"]})
        );

        let json = serde_json::to_value(PanelEvent::Refresh).unwrap();
        assert_eq!(json, serde_json::json!({"type":"refresh"}));
    }
}
