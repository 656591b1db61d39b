use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{lenient_timestamp, normalize_dir};

/// Lifecycle event tag emitted by an agent
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    SessionStart,
    SessionEnd,
    UserPromptSubmit,
    PreToolUse,
    PostToolUse,
    Notification,
    Stop,
    SubagentStop,
    PreCompact,
    /// Any tag this dashboard does not know, kept verbatim
    Other(String),
}

impl EventType {
    /// Known event types, in the order they are bound to the number keys
    pub const KNOWN: [EventType; 9] = [
        EventType::SessionStart,
        EventType::SessionEnd,
        EventType::UserPromptSubmit,
        EventType::PreToolUse,
        EventType::PostToolUse,
        EventType::Notification,
        EventType::Stop,
        EventType::SubagentStop,
        EventType::PreCompact,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::UserPromptSubmit => "user_prompt_submit",
            Self::PreToolUse => "pre_tool_use",
            Self::PostToolUse => "post_tool_use",
            Self::Notification => "notification",
            Self::Stop => "stop",
            Self::SubagentStop => "subagent_stop",
            Self::PreCompact => "pre_compact",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        // Hosts use snake_case, kebab-case or PascalCase for the same tag
        let key: String = value
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "sessionstart" => Self::SessionStart,
            "sessionend" => Self::SessionEnd,
            "userpromptsubmit" => Self::UserPromptSubmit,
            "pretooluse" => Self::PreToolUse,
            "posttooluse" => Self::PostToolUse,
            "notification" => Self::Notification,
            "stop" => Self::Stop,
            "subagentstop" => Self::SubagentStop,
            "precompact" => Self::PreCompact,
            _ => Self::Other(value),
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository an event originated from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub path: String,
    pub name: Option<String>,
    pub branch: Option<String>,
}

impl Repository {
    /// Whether this repository is the one at `scope` (both normalized)
    pub fn matches_path(&self, scope: &str) -> bool {
        !self.path.is_empty() && normalize_dir(&self.path) == normalize_dir(scope)
    }

    pub fn label(&self) -> String {
        let name = self.name.clone().unwrap_or_else(|| {
            normalize_dir(&self.path)
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string()
        });
        match &self.branch {
            Some(branch) => format!("{}@{}", name, branch),
            None => name,
        }
    }
}

/// An event pushed by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    #[serde(alias = "type", alias = "hook_event_name")]
    pub event_type: EventType,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub repository: Option<Repository>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl AgentEvent {
    #[cfg(test)]
    pub fn new(event_type: EventType, session_id: impl Into<String>) -> Self {
        Self {
            event_type,
            session_id: session_id.into(),
            tool_name: None,
            files: Vec::new(),
            repository: None,
            timestamp: None,
        }
    }
}
