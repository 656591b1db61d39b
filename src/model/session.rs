use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{lenient_timestamp, lenient_vec, TodoItem};

/// Status of an agent session as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SessionStatus {
    /// Agent is working
    Active,
    /// Agent is at its prompt
    Idle,
    /// Agent is blocked on the user
    Waiting,
    /// No recent activity; also used for unrecognized statuses
    #[default]
    Inactive,
    /// Session has ended
    Stopped,
}

impl From<String> for SessionStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "idle" => Self::Idle,
            "waiting" => Self::Waiting,
            "stopped" => Self::Stopped,
            _ => Self::Inactive,
        }
    }
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Waiting => "waiting",
            Self::Inactive => "inactive",
            Self::Stopped => "stopped",
        }
    }
}

/// A session record supplied by the host.
///
/// Every field except `id` is optional on the wire; missing values fall back
/// to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub id: String,
    /// Working directory
    pub cwd: Option<String>,
    pub status: SessionStatus,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub last_activity: Option<DateTime<Utc>>,
    pub file_reads: u64,
    pub file_writes: u64,
    pub tool_calls: u64,
    /// Custom name given by the user
    pub name: Option<String>,
    pub last_tool: Option<String>,
    pub last_file: Option<String>,
    #[serde(deserialize_with = "lenient_vec")]
    pub todos: Vec<TodoItem>,
}

impl Session {
    #[cfg(test)]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Name shown in lists: the custom name, else a shortened id
    pub fn display_name(&self) -> String {
        match self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => name.to_string(),
            None => self.id.chars().take(8).collect(),
        }
    }

    /// Text searched by the free-text query
    pub fn search_haystack(&self) -> String {
        [
            self.name.as_deref(),
            Some(self.id.as_str()),
            self.cwd.as_deref(),
            self.last_tool.as_deref(),
            self.last_file.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }
}
