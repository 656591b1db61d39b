use serde::{Deserialize, Serialize};

/// Status of a todo item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

/// An entry of a session's todo list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    #[serde(default)]
    pub content: String,
    #[serde(default, alias = "activeForm")]
    pub active_form: Option<String>,
    pub status: TodoStatus,
}

impl TodoItem {
    /// Text shown for the item: the active form while in progress
    pub fn display_text(&self) -> &str {
        match (self.status, self.active_form.as_deref()) {
            (TodoStatus::InProgress, Some(active)) if !active.is_empty() => active,
            _ => &self.content,
        }
    }
}

/// Pick the todo item to surface as the session's current task.
///
/// The first in-progress item wins, then the first pending one, then the
/// most recent (last) completed one.
pub fn current_task(todos: &[TodoItem]) -> Option<&TodoItem> {
    todos
        .iter()
        .find(|t| t.status == TodoStatus::InProgress)
        .or_else(|| todos.iter().find(|t| t.status == TodoStatus::Pending))
        .or_else(|| todos.iter().rev().find(|t| t.status == TodoStatus::Completed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(content: &str, status: TodoStatus) -> TodoItem {
        TodoItem {
            content: content.to_string(),
            active_form: None,
            status,
        }
    }

    #[test]
    fn test_in_progress_preferred() {
        let todos = vec![
            todo("a", TodoStatus::Completed),
            todo("b", TodoStatus::Pending),
            todo("c", TodoStatus::InProgress),
        ];
        assert_eq!(current_task(&todos).unwrap().content, "c");
    }

    #[test]
    fn test_first_pending_then_last_completed() {
        let todos = vec![
            todo("a", TodoStatus::Completed),
            todo("b", TodoStatus::Pending),
            todo("c", TodoStatus::Pending),
        ];
        assert_eq!(current_task(&todos).unwrap().content, "b");

        let todos = vec![todo("a", TodoStatus::Completed), todo("b", TodoStatus::Completed)];
        assert_eq!(current_task(&todos).unwrap().content, "b");

        assert!(current_task(&[]).is_none());
    }

    #[test]
    fn test_active_form_alias() {
        let item: TodoItem = serde_json::from_str(
            r#"{"content":"Run tests","activeForm":"Running tests","status":"in_progress"}"#,
        )
        .unwrap();
        assert_eq!(item.display_text(), "Running tests");
    }
}
