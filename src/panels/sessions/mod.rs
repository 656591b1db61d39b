mod grouping;

pub use grouping::{group_sessions, DirectoryGroup, StatusFilter};
use grouping::GroupKey;

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::collections::HashSet;

use crate::actions::Action;
use crate::host::{PanelEvent, SessionSlice};
use crate::model::{current_task, Session};
use crate::theme::Theme;
use crate::tools::ToolCall;

/// A visible line of the session list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    Group(usize),
    Session(usize, usize),
}

/// Session the user asked to delete, captured when the dialog opened
#[derive(Debug, Clone, PartialEq)]
struct PendingDelete {
    session_id: String,
    cwd: Option<String>,
    name: String,
}

/// Sessions panel state, owned for the lifetime of the panel
pub struct SessionsPanel {
    slice: SessionSlice,
    filter: StatusFilter,
    query: String,
    searching: bool,
    pending_delete: Option<PendingDelete>,
    collapsed: HashSet<GroupKey>,
    current_dir: Option<String>,
    groups: Vec<DirectoryGroup>,
    rows: Vec<Row>,
    list_state: ListState,
}

impl SessionsPanel {
    pub fn new(current_dir: Option<String>) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        Self {
            slice: SessionSlice::default(),
            filter: StatusFilter::default(),
            query: String::new(),
            searching: false,
            pending_delete: None,
            collapsed: HashSet::new(),
            current_dir,
            groups: Vec::new(),
            rows: Vec::new(),
            list_state,
        }
    }

    #[cfg(test)]
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_loading(&self) -> bool {
        self.slice.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.slice.error.as_deref()
    }

    /// Whether keys are going to a text input or dialog
    pub fn is_capturing_input(&self) -> bool {
        self.searching || self.pending_delete.is_some()
    }

    /// Name of the session awaiting delete confirmation
    pub fn pending_delete_name(&self) -> Option<&str> {
        self.pending_delete.as_ref().map(|p| p.name.as_str())
    }

    /// Replace the session snapshot, keeping the selected session if it survives
    pub fn apply_slice(&mut self, slice: SessionSlice) {
        let selected_id = self.selected_session().map(|s| s.id.clone());
        tracing::debug!(
            sessions = slice.sessions.len(),
            loading = slice.loading,
            error = slice.error.is_some(),
            "Session slice updated"
        );
        self.slice = slice;
        self.regroup();
        if let Some(id) = selected_id {
            self.select_by_id(&id);
        }
    }

    /// Record a host failure and end any pending refresh
    pub fn set_error(&mut self, message: String) {
        self.slice.error = Some(message);
        self.slice.loading = false;
    }

    /// End a refresh the host will never answer
    pub fn finish_refresh(&mut self) {
        if self.slice.loading {
            tracing::debug!("Refresh finished without a slice");
            self.slice.loading = false;
        }
    }

    pub fn set_current_dir(&mut self, dir: Option<String>) {
        self.current_dir = dir;
        self.regroup();
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
        self.regroup();
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.regroup();
    }

    fn regroup(&mut self) {
        self.groups = group_sessions(
            &self.slice.sessions,
            self.filter,
            &self.query,
            self.current_dir.as_deref(),
        );
        self.rows.clear();
        for (gi, group) in self.groups.iter().enumerate() {
            self.rows.push(Row::Group(gi));
            if !self.collapsed.contains(&group.key) {
                self.rows
                    .extend((0..group.sessions.len()).map(|si| Row::Session(gi, si)));
            }
        }

        match self.list_state.selected() {
            _ if self.rows.is_empty() => self.list_state.select(Some(0)),
            Some(i) if i >= self.rows.len() => self.list_state.select(Some(self.rows.len() - 1)),
            None => self.list_state.select(Some(0)),
            _ => {}
        }
    }

    fn selected_row(&self) -> Option<Row> {
        self.list_state
            .selected()
            .and_then(|i| self.rows.get(i))
            .copied()
    }

    /// Session under the cursor, if the cursor is on a session row
    pub fn selected_session(&self) -> Option<&Session> {
        match self.selected_row()? {
            Row::Session(gi, si) => self.groups.get(gi)?.sessions.get(si),
            Row::Group(_) => None,
        }
    }

    /// Group under the cursor, or the group of the selected session
    pub fn selected_group(&self) -> Option<&DirectoryGroup> {
        match self.selected_row()? {
            Row::Group(gi) | Row::Session(gi, _) => self.groups.get(gi),
        }
    }

    fn select_by_id(&mut self, id: &str) -> bool {
        let found = self.rows.iter().position(|row| match row {
            Row::Session(gi, si) => self.groups[*gi].sessions[*si].id == id,
            Row::Group(_) => false,
        });
        if let Some(i) = found {
            self.list_state.select(Some(i));
        }
        found.is_some()
    }

    fn next_row(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.rows.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    fn previous_row(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn toggle_collapsed(&mut self, key: GroupKey) {
        if !self.collapsed.remove(&key) {
            self.collapsed.insert(key);
        }
        self.regroup();
    }

    /// Request a reload from the host. Ignored while one is in flight.
    pub fn refresh(&mut self) -> Option<Action> {
        if self.slice.loading {
            tracing::debug!("Refresh already in flight");
            return None;
        }
        self.slice.loading = true;
        Some(Action::Emit(PanelEvent::Refresh))
    }

    pub fn open_terminal(&self, session_id: &str) -> Action {
        Action::Emit(PanelEvent::OpenTerminal {
            session_id: session_id.to_string(),
        })
    }

    pub fn select_session(&mut self, session_id: &str) -> Action {
        if !self.select_by_id(session_id) {
            tracing::debug!(session_id, "Selected session is not visible");
        }
        Action::Emit(PanelEvent::SelectSession {
            session_id: session_id.to_string(),
        })
    }

    pub fn delete_session(&mut self, session_id: &str, cwd: Option<String>) -> Action {
        self.pending_delete = None;
        Action::Emit(PanelEvent::DeleteSession {
            session_id: session_id.to_string(),
            cwd,
        })
    }

    pub fn open_directory(&self, directory: &str) -> Action {
        Action::Emit(PanelEvent::OpenDirectory {
            directory: directory.to_string(),
        })
    }

    /// Apply a tool call aimed at this panel
    pub fn apply_tool(&mut self, call: ToolCall) -> Result<Vec<Action>, String> {
        match call {
            ToolCall::RefreshSessions => self
                .refresh()
                .map(|a| vec![a])
                .ok_or_else(|| "refresh already in progress".to_string()),
            ToolCall::OpenSessionTerminal { session_id } => {
                Ok(vec![self.open_terminal(&session_id)])
            }
            ToolCall::SelectSession { session_id } => Ok(vec![self.select_session(&session_id)]),
            ToolCall::DeleteSession { session_id, cwd } => {
                let cwd = cwd.or_else(|| {
                    self.slice
                        .sessions
                        .iter()
                        .find(|s| s.id == session_id)
                        .and_then(|s| s.cwd.clone())
                });
                Ok(vec![self.delete_session(&session_id, cwd)])
            }
            ToolCall::OpenDirectory { directory } => Ok(vec![self.open_directory(&directory)]),
            other => Err(format!("{:?} is not a sessions panel tool", other)),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if self.pending_delete.is_some() {
            return self.handle_confirming_key(key);
        }
        if self.searching {
            self.handle_search_key(key);
            return Vec::new();
        }

        let mut actions = Vec::new();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.next_row(),
            KeyCode::Char('k') | KeyCode::Up => self.previous_row(),
            KeyCode::Char('f') => self.set_filter(self.filter.next()),
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Esc if !self.query.is_empty() => self.set_query(""),
            KeyCode::Char('r') => actions.extend(self.refresh()),
            KeyCode::Enter => match self.selected_row() {
                Some(Row::Group(gi)) => {
                    let key = self.groups[gi].key.clone();
                    self.toggle_collapsed(key);
                }
                Some(Row::Session(..)) => {
                    if let Some(id) = self.selected_session().map(|s| s.id.clone()) {
                        actions.push(self.open_terminal(&id));
                    }
                }
                None => {}
            },
            KeyCode::Char('s') => {
                if let Some(id) = self.selected_session().map(|s| s.id.clone()) {
                    actions.push(self.select_session(&id));
                }
            }
            KeyCode::Char('o') => {
                let directory = match self.selected_session() {
                    Some(session) => session.cwd.clone(),
                    None => self
                        .selected_group()
                        .and_then(|g| g.key.path())
                        .map(str::to_string),
                };
                if let Some(directory) = directory {
                    actions.push(self.open_directory(&directory));
                }
            }
            KeyCode::Char('d') => {
                self.pending_delete = self.selected_session().map(|s| PendingDelete {
                    session_id: s.id.clone(),
                    cwd: s.cwd.clone(),
                    name: s.display_name(),
                });
            }
            KeyCode::Char('y') => {
                if let Some(session) = self.selected_session() {
                    actions.push(Action::CopyToClipboard(session.id.clone()));
                }
            }
            _ => {}
        }
        actions
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.searching = false,
            KeyCode::Esc => {
                self.searching = false;
                self.set_query("");
            }
            KeyCode::Backspace => {
                let mut query = self.query.clone();
                query.pop();
                self.set_query(&query);
            }
            KeyCode::Char(c) => {
                let query = format!("{}{}", self.query, c);
                self.set_query(&query);
            }
            _ => {}
        }
    }

    fn handle_confirming_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Some(target) = self.pending_delete.take() {
                    return vec![self.delete_session(&target.session_id, target.cwd)];
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.pending_delete = None;
            }
            _ => {}
        }
        Vec::new()
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, focused: bool) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(45), // Grouped list
                Constraint::Percentage(55), // Detail pane
            ])
            .split(area);

        self.render_list(frame, chunks[0], theme, focused);
        self.render_detail(frame, chunks[1], theme);
    }

    fn title(&self) -> String {
        let mut title = format!(" Sessions [{}]", self.filter.label());
        if self.searching || !self.query.is_empty() {
            title.push_str(&format!(" /{}", self.query));
            if self.searching {
                title.push('_');
            }
        }
        if self.slice.loading {
            title.push_str(" ⟳");
        }
        title.push(' ');
        title
    }

    fn render_list(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, focused: bool) {
        let mut items: Vec<ListItem> = Vec::new();

        if let Some(ref error) = self.slice.error {
            items.push(ListItem::new(Line::from(Span::styled(
                format!("  {}", error),
                Style::default().fg(theme.error),
            ))));
        }

        if self.rows.is_empty() {
            let hint = if self.slice.loading {
                "  Loading sessions..."
            } else if self.slice.sessions.is_empty() {
                "  No sessions. Press 'r' to refresh."
            } else {
                "  No sessions match the current filter."
            };
            items.push(ListItem::new(Line::from(Span::styled(
                hint,
                Style::default().fg(theme.dim),
            ))));
        }

        for row in &self.rows {
            let line = match *row {
                Row::Group(gi) => {
                    let group = &self.groups[gi];
                    let marker = if self.collapsed.contains(&group.key) {
                        "▸ "
                    } else {
                        "▾ "
                    };
                    let mut spans = vec![
                        Span::styled(marker, Style::default().fg(theme.dim)),
                        Span::styled("● ", Style::default().fg(group.color)),
                        Span::styled(
                            group.label().to_string(),
                            Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(
                            format!(" ({}/{})", group.active_count(), group.sessions.len()),
                            Style::default().fg(theme.dim),
                        ),
                    ];
                    if group.is_current {
                        spans.push(Span::styled(" current", Style::default().fg(theme.accent)));
                    }
                    Line::from(spans)
                }
                Row::Session(gi, si) => {
                    let session = &self.groups[gi].sessions[si];
                    Line::from(vec![
                        Span::raw("    "),
                        Span::styled("● ", Style::default().fg(theme.status_color(session.status))),
                        Span::styled(session.display_name(), Style::default().fg(theme.fg)),
                        Span::styled(
                            format!("  {}", format_relative(session.last_activity, Utc::now())),
                            Style::default().fg(theme.dim),
                        ),
                    ])
                }
            };
            items.push(ListItem::new(line));
        }

        // Leading status lines shift the row indices
        let offset = items.len() - self.rows.len();
        let mut state = ListState::default();
        if !self.rows.is_empty() {
            state.select(self.list_state.selected().map(|i| i + offset));
        }
        *state.offset_mut() = self.list_state.offset();

        let border = if focused { theme.accent } else { theme.dim };
        let list = List::new(items)
            .block(
                Block::default()
                    .title(self.title())
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border)),
            )
            .highlight_style(
                Style::default()
                    .bg(theme.highlight)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        frame.render_stateful_widget(list, area, &mut state);
        *self.list_state.offset_mut() = state.offset();
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let label = |text: &'static str| Span::styled(text, Style::default().fg(theme.dim));
        let value = |text: String| Span::styled(text, Style::default().fg(theme.fg));

        let content = if let Some(session) = self.selected_session() {
            let mut lines = vec![
                Line::from(vec![label("Name: "), value(session.display_name())]),
                Line::from(vec![label("ID: "), value(session.id.clone())]),
                Line::from(vec![
                    label("Status: "),
                    Span::styled(
                        session.status.label(),
                        Style::default().fg(theme.status_color(session.status)),
                    ),
                ]),
                Line::from(vec![
                    label("Directory: "),
                    value(session.cwd.clone().unwrap_or_else(|| "-".to_string())),
                ]),
                Line::from(vec![
                    label("Last activity: "),
                    value(format_relative(session.last_activity, Utc::now())),
                ]),
                Line::from(vec![
                    label("Reads/Writes/Tools: "),
                    value(format!(
                        "{} / {} / {}",
                        session.file_reads, session.file_writes, session.tool_calls
                    )),
                ]),
            ];
            if let Some(ref tool) = session.last_tool {
                lines.push(Line::from(vec![label("Last tool: "), value(tool.clone())]));
            }
            if let Some(ref file) = session.last_file {
                lines.push(Line::from(vec![label("Last file: "), value(file.clone())]));
            }
            if let Some(task) = current_task(&session.todos) {
                lines.push(Line::from(vec![
                    label("Task: "),
                    Span::styled(task.display_text().to_string(), Style::default().fg(theme.accent)),
                ]));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Enter: terminal │ s: select │ o: open dir │ d: delete │ y: copy id",
                Style::default().fg(theme.dim),
            )));
            lines
        } else if let Some(group) = self.selected_group() {
            vec![
                Line::from(vec![
                    label("Directory: "),
                    Span::styled(group.label().to_string(), Style::default().fg(group.color)),
                ]),
                Line::from(vec![label("Sessions: "), value(group.sessions.len().to_string())]),
                Line::from(vec![
                    label("Last activity: "),
                    value(format_relative(group.last_activity, Utc::now())),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    "Enter: collapse/expand │ o: open dir",
                    Style::default().fg(theme.dim),
                )),
            ]
        } else {
            vec![Line::from(Span::styled(
                "No session selected",
                Style::default().fg(theme.dim),
            ))]
        };

        let detail = Paragraph::new(content).wrap(Wrap { trim: true }).block(
            Block::default()
                .title(" Details ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.dim)),
        );
        frame.render_widget(detail, area);
    }
}

/// Coarse "time ago" label
pub fn format_relative(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return "never".to_string();
    };
    let secs = (now - ts).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}
