use chrono::{DateTime, Utc};
use ratatui::style::Color;
use std::collections::BTreeMap;

use crate::model::{normalize_dir, Session, SessionStatus, UNKNOWN_DIRECTORY};
use crate::theme::color_for_index;

/// Status filter offered by the sessions panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Idle,
    Inactive,
}

impl StatusFilter {
    pub fn next(&self) -> Self {
        match self {
            Self::All => Self::Active,
            Self::Active => Self::Idle,
            Self::Idle => Self::Inactive,
            Self::Inactive => Self::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Inactive => "inactive",
        }
    }

    /// Waiting sessions count as active, stopped ones as inactive
    pub fn matches(&self, status: SessionStatus) -> bool {
        match self {
            Self::All => true,
            Self::Active => matches!(status, SessionStatus::Active | SessionStatus::Waiting),
            Self::Idle => status == SessionStatus::Idle,
            Self::Inactive => matches!(status, SessionStatus::Inactive | SessionStatus::Stopped),
        }
    }
}

/// What a directory group is keyed on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    /// Normalized working directory
    Directory(String),
    /// Sessions without a working directory; sorts after every directory
    Unknown,
}

impl GroupKey {
    fn of(session: &Session) -> Self {
        match session.cwd.as_deref().map(normalize_dir) {
            Some(dir) if !dir.is_empty() => Self::Directory(dir),
            _ => Self::Unknown,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Directory(dir) => Some(dir),
            Self::Unknown => None,
        }
    }

    pub fn label(&self) -> &str {
        self.path().unwrap_or(UNKNOWN_DIRECTORY)
    }
}

/// Sessions sharing a normalized working directory
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryGroup {
    pub key: GroupKey,
    pub sessions: Vec<Session>,
    /// Latest activity among the members
    pub last_activity: Option<DateTime<Utc>>,
    /// Whether this is the currently open repository
    pub is_current: bool,
    pub color: Color,
}

impl DirectoryGroup {
    pub fn label(&self) -> &str {
        self.key.label()
    }

    pub fn active_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| StatusFilter::Active.matches(s.status))
            .count()
    }
}

/// Case-insensitive substring match over the session's searchable fields
pub fn matches_query(session: &Session, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    session
        .search_haystack()
        .to_lowercase()
        .contains(&query.to_lowercase())
}

/// Filter sessions and group them by directory.
///
/// The group matching `current_dir` comes first, the others follow in
/// ascending directory order. Every filtered session lands in exactly one
/// group.
pub fn group_sessions(
    sessions: &[Session],
    filter: StatusFilter,
    query: &str,
    current_dir: Option<&str>,
) -> Vec<DirectoryGroup> {
    let current = current_dir.map(normalize_dir).filter(|d| !d.is_empty());

    let mut buckets: BTreeMap<GroupKey, Vec<Session>> = BTreeMap::new();
    for session in sessions
        .iter()
        .filter(|s| filter.matches(s.status) && matches_query(s, query))
    {
        buckets
            .entry(GroupKey::of(session))
            .or_default()
            .push(session.clone());
    }

    let mut groups: Vec<DirectoryGroup> = buckets
        .into_iter()
        .map(|(key, mut sessions)| {
            // Newest first, sessions without a timestamp last
            sessions.sort_by(|a, b| {
                b.last_activity
                    .cmp(&a.last_activity)
                    .then_with(|| a.id.cmp(&b.id))
            });
            let last_activity = sessions.iter().filter_map(|s| s.last_activity).max();
            let is_current = current.is_some() && key.path() == current.as_deref();
            DirectoryGroup {
                key,
                sessions,
                last_activity,
                is_current,
                color: color_for_index(0),
            }
        })
        .collect();

    // BTreeMap iteration is already ascending with Unknown last; only the
    // current group moves
    if let Some(pos) = groups.iter().position(|g| g.is_current) {
        let current_group = groups.remove(pos);
        groups.insert(0, current_group);
    }

    for (i, group) in groups.iter_mut().enumerate() {
        group.color = color_for_index(i);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn session(id: &str, dir: Option<&str>, status: SessionStatus) -> Session {
        Session {
            id: id.to_string(),
            cwd: dir.map(str::to_string),
            status,
            ..Default::default()
        }
    }

    fn sample() -> Vec<Session> {
        vec![
            session("a", Some("/repo"), SessionStatus::Active),
            session("b", Some("/repo/"), SessionStatus::Idle),
            session("c", Some("/alpha"), SessionStatus::Waiting),
            session("d", Some("C:\\zeta\\"), SessionStatus::Stopped),
            session("e", None, SessionStatus::Inactive),
            session("f", Some("/beta"), SessionStatus::Active),
        ]
    }

    #[test]
    fn test_status_filter_example() {
        let sessions = vec![
            session("a", Some("/repo"), SessionStatus::Active),
            session("b", Some("/repo"), SessionStatus::Idle),
        ];
        let groups = group_sessions(&sessions, StatusFilter::Active, "", None);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label(), "/repo");
        let ids: Vec<_> = groups[0].sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_groups_partition_filtered_sessions() {
        let sessions = sample();
        for filter in [
            StatusFilter::All,
            StatusFilter::Active,
            StatusFilter::Idle,
            StatusFilter::Inactive,
        ] {
            let groups = group_sessions(&sessions, filter, "", Some("/repo"));
            let mut seen = HashSet::new();
            for group in &groups {
                assert!(!group.sessions.is_empty());
                for s in &group.sessions {
                    assert!(seen.insert(s.id.clone()), "{} grouped twice", s.id);
                }
            }
            let expected: HashSet<_> = sessions
                .iter()
                .filter(|s| filter.matches(s.status))
                .map(|s| s.id.clone())
                .collect();
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn test_current_group_first_then_ascending() {
        let groups = group_sessions(&sample(), StatusFilter::All, "", Some("/repo/"));
        let dirs: Vec<_> = groups.iter().map(|g| g.label()).collect();
        assert_eq!(dirs, vec!["/repo", "/alpha", "/beta", "C:/zeta", UNKNOWN_DIRECTORY]);
        assert!(groups[0].is_current);
        assert!(groups[1..].iter().all(|g| !g.is_current));
        assert_eq!(groups[0].sessions.len(), 2);
    }

    #[test]
    fn test_without_current_dir_plain_order() {
        let groups = group_sessions(&sample(), StatusFilter::All, "", None);
        let dirs: Vec<_> = groups.iter().map(|g| g.label()).collect();
        assert_eq!(dirs, vec!["/alpha", "/beta", "/repo", "C:/zeta", UNKNOWN_DIRECTORY]);
        assert_eq!(groups[0].color, color_for_index(0));
        assert_eq!(groups[4].color, color_for_index(4));
    }

    #[test]
    fn test_query_is_case_insensitive_substring() {
        let mut sessions = sample();
        sessions[2].last_file = Some("src/Main.rs".to_string());
        sessions[5].name = Some("Docs Writer".to_string());

        let groups = group_sessions(&sessions, StatusFilter::All, "main.RS", None);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].sessions[0].id, "c");

        let groups = group_sessions(&sessions, StatusFilter::All, "docs", None);
        assert_eq!(groups[0].sessions[0].id, "f");

        let groups = group_sessions(&sessions, StatusFilter::All, "ALPHA", None);
        assert_eq!(groups[0].label(), "/alpha");

        assert!(group_sessions(&sessions, StatusFilter::All, "nothing-here", None).is_empty());
    }

    #[test]
    fn test_group_last_activity_and_member_order() {
        let mut sessions = vec![
            session("old", Some("/repo"), SessionStatus::Idle),
            session("new", Some("/repo"), SessionStatus::Active),
            session("none", Some("/repo"), SessionStatus::Active),
        ];
        sessions[0].last_activity = Utc.timestamp_opt(1_000, 0).single();
        sessions[1].last_activity = Utc.timestamp_opt(2_000, 0).single();

        let groups = group_sessions(&sessions, StatusFilter::All, "", None);
        let ids: Vec<_> = groups[0].sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "none"]);
        assert_eq!(groups[0].last_activity, sessions[1].last_activity);
        assert_eq!(groups[0].active_count(), 2);
    }

    #[test]
    fn test_literal_unknown_directory_cwd_is_its_own_group() {
        let sessions = vec![
            session("named", Some(UNKNOWN_DIRECTORY), SessionStatus::Active),
            session("missing", None, SessionStatus::Active),
            session("blank", Some(""), SessionStatus::Idle),
        ];
        let groups = group_sessions(&sessions, StatusFilter::All, "", Some(UNKNOWN_DIRECTORY));
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].key, GroupKey::Directory(UNKNOWN_DIRECTORY.to_string()));
        assert!(groups[0].is_current);
        let ids: Vec<_> = groups[0].sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["named"]);

        assert_eq!(groups[1].key, GroupKey::Unknown);
        assert!(!groups[1].is_current);
        assert_eq!(groups[1].label(), UNKNOWN_DIRECTORY);
        assert_eq!(groups[1].sessions.len(), 2);
    }

    #[test]
    fn test_unknown_group_sorts_after_every_directory() {
        let sessions = vec![
            session("none", None, SessionStatus::Active),
            session("late", Some("~zzz"), SessionStatus::Active),
            session("caps", Some("Unknown Directory/x"), SessionStatus::Active),
        ];
        let groups = group_sessions(&sessions, StatusFilter::All, "", None);
        let keys: Vec<_> = groups.iter().map(|g| g.key.clone()).collect();
        assert_eq!(
            keys,
            vec![
                GroupKey::Directory("Unknown Directory/x".to_string()),
                GroupKey::Directory("~zzz".to_string()),
                GroupKey::Unknown,
            ]
        );
    }

    #[test]
    fn test_query_matches_last_tool() {
        let mut sessions = sample();
        sessions[1].last_tool = Some("WebFetch".to_string());

        let groups = group_sessions(&sessions, StatusFilter::All, "webfetch", None);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label(), "/repo");
        let ids: Vec<_> = groups[0].sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);

        // The tool name alone must not leak into other sessions
        assert!(group_sessions(&sessions, StatusFilter::Active, "webfetch", None).is_empty());
    }

    #[test]
    fn test_query_and_filter_partition() {
        let mut sessions = sample();
        sessions[0].last_tool = Some("Edit".to_string());
        sessions[2].name = Some("editor cleanup".to_string());
        sessions[3].last_file = Some("src/edit.rs".to_string());
        sessions[4].last_tool = Some("Edit".to_string());

        for filter in [
            StatusFilter::All,
            StatusFilter::Active,
            StatusFilter::Idle,
            StatusFilter::Inactive,
        ] {
            let groups = group_sessions(&sessions, filter, " EDIT ", Some("/repo"));
            let mut seen = HashSet::new();
            for group in &groups {
                assert!(!group.sessions.is_empty());
                for s in &group.sessions {
                    assert!(seen.insert(s.id.clone()), "{} grouped twice", s.id);
                }
            }
            let expected: HashSet<_> = sessions
                .iter()
                .filter(|s| filter.matches(s.status) && matches_query(s, "edit"))
                .map(|s| s.id.clone())
                .collect();
            assert_eq!(seen, expected);
        }

        let all: HashSet<_> = group_sessions(&sessions, StatusFilter::All, "edit", None)
            .into_iter()
            .flat_map(|g| g.sessions)
            .map(|s| s.id)
            .collect();
        let expected: HashSet<_> = ["a", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_sessions(&[], StatusFilter::All, "", Some("/repo")).is_empty());
    }
}
