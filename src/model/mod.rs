pub(crate) mod event;
mod session;
mod todo;

pub use event::{AgentEvent, EventType};
pub use session::{Session, SessionStatus};
pub use todo::{current_task, TodoItem};

use chrono::{DateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};

/// Label used for sessions that carry no working directory
pub const UNKNOWN_DIRECTORY: &str = "Unknown Directory";

/// Normalize a directory path for grouping and comparison.
///
/// Backslashes become forward slashes and trailing separators are trimmed.
/// A path made only of separators normalizes to `/`. Comparison stays
/// case-sensitive and whitespace is kept as part of the path.
pub fn normalize_dir(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let trimmed = unified.trim_end_matches('/');
    if trimmed.is_empty() && !unified.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Accepts an RFC 3339 string or epoch milliseconds; anything else is `None`.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }))
}

/// Deserializes a list, dropping entries that fail to parse.
pub(crate) fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .filter_map(|v| match serde_json::from_value(v) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed record");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dir() {
        assert_eq!(normalize_dir("/repo/"), "/repo");
        assert_eq!(normalize_dir("/repo///"), "/repo");
        assert_eq!(normalize_dir("C:\\work\\repo\\"), "C:/work/repo");
        assert_eq!(normalize_dir("/"), "/");
        assert_eq!(normalize_dir(""), "");
        assert_ne!(normalize_dir("/Repo"), normalize_dir("/repo"));
    }

    #[test]
    fn test_normalize_dir_keeps_whitespace() {
        assert_eq!(normalize_dir(" /repo/"), " /repo");
        assert_eq!(normalize_dir("/my repo /"), "/my repo ");
        assert_ne!(normalize_dir("/repo "), normalize_dir("/repo"));
        assert_eq!(normalize_dir("  "), "  ");
    }
}
