mod buffer;

pub use buffer::{BufferedEvent, EventBuffer, EventFilter, Expansion};

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use crate::actions::Action;
use crate::host::PanelEvent;
use crate::model::{AgentEvent, EventType};
use crate::theme::Theme;
use crate::tools::ToolCall;

/// Events panel state, owned for the lifetime of the panel
pub struct EventsPanel {
    buffer: EventBuffer,
    filter: EventFilter,
    expansion: Expansion,
    auto_scroll: bool,
    /// Sequence number of the selected event
    selected: Option<u64>,
    /// Repository the panel is scoped to
    scope: Option<String>,
    list_state: ListState,
}

impl EventsPanel {
    pub fn new(scope: Option<String>) -> Self {
        Self {
            buffer: EventBuffer::new(),
            filter: EventFilter::default(),
            expansion: Expansion::default(),
            auto_scroll: true,
            selected: None,
            scope,
            list_state: ListState::default(),
        }
    }

    #[cfg(test)]
    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    #[cfg(test)]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    pub fn set_scope(&mut self, scope: Option<String>) {
        self.scope = scope;
        self.settle_selection();
    }

    /// Sequence numbers of the events that pass the filter, oldest first
    pub fn visible_seqs(&self) -> Vec<u64> {
        self.buffer
            .visible(&self.filter, self.scope.as_deref())
            .map(|e| e.seq)
            .collect()
    }

    /// Record an event received from the bus
    pub fn push(&mut self, event: AgentEvent) -> u64 {
        let (seq, evicted) = self.buffer.push(event);
        if let Some(old) = evicted {
            self.expansion.remove(old);
        }
        self.settle_selection();
        seq
    }

    /// Follow the newest event under auto-scroll, or drop a stale selection
    fn settle_selection(&mut self) {
        let visible = self.visible_seqs();
        let stale = self.selected.map_or(true, |seq| !visible.contains(&seq));
        if self.auto_scroll || stale {
            self.selected = visible.last().copied();
        }
    }

    fn move_selection(&mut self, forward: bool) {
        let visible = self.visible_seqs();
        if visible.is_empty() {
            return;
        }
        self.auto_scroll = false;
        let pos = self
            .selected
            .and_then(|seq| visible.iter().position(|s| *s == seq));
        let next = match (pos, forward) {
            (Some(i), true) if i + 1 < visible.len() => i + 1,
            (Some(i), false) if i > 0 => i - 1,
            (Some(i), _) => i,
            (None, _) => visible.len() - 1,
        };
        self.selected = Some(visible[next]);
    }

    pub fn toggle_expanded(&mut self, seq: u64) {
        if self.buffer.contains(seq) {
            self.expansion.toggle(seq);
        }
    }

    pub fn toggle_auto_scroll(&mut self) {
        self.auto_scroll = !self.auto_scroll;
        self.settle_selection();
    }

    /// Replace the selected event types; empty shows everything
    pub fn set_types(&mut self, types: Vec<EventType>) -> Action {
        self.filter.types = types.into_iter().collect();
        self.settle_selection();
        self.filter_action()
    }

    pub fn toggle_type(&mut self, event_type: EventType) -> Action {
        self.filter.toggle_type(event_type);
        self.settle_selection();
        self.filter_action()
    }

    fn filter_action(&self) -> Action {
        Action::Emit(PanelEvent::FilterEvents {
            event_types: self.filter.types.iter().cloned().collect(),
        })
    }

    pub fn set_repo_filter(&mut self, enabled: bool) -> Action {
        self.filter.repo_only = enabled;
        self.settle_selection();
        Action::Emit(PanelEvent::ToggleRepoFilter { enabled })
    }

    pub fn clear(&mut self) -> Action {
        self.buffer.clear();
        self.expansion.clear();
        self.selected = None;
        Action::Emit(PanelEvent::ClearEvents)
    }

    /// Apply a tool call aimed at this panel
    pub fn apply_tool(&mut self, call: ToolCall) -> Result<Vec<Action>, String> {
        match call {
            ToolCall::FilterEvents { event_types } => Ok(vec![self.set_types(event_types)]),
            ToolCall::ClearEvents => Ok(vec![self.clear()]),
            ToolCall::ToggleRepoFilter { enabled } => Ok(vec![self.set_repo_filter(enabled)]),
            other => Err(format!("{:?} is not an events panel tool", other)),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let mut actions = Vec::new();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(true),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(false),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(seq) = self.selected {
                    self.toggle_expanded(seq);
                }
            }
            KeyCode::Char('0') => actions.push(self.set_types(Vec::new())),
            KeyCode::Char(c @ '1'..='9') => {
                let index = (c as u8 - b'1') as usize;
                if let Some(event_type) = EventType::KNOWN.get(index) {
                    actions.push(self.toggle_type(event_type.clone()));
                }
            }
            KeyCode::Char('R') => actions.push(self.set_repo_filter(!self.filter.repo_only)),
            KeyCode::Char('a') => self.toggle_auto_scroll(),
            KeyCode::Char('c') => actions.push(self.clear()),
            _ => {}
        }
        actions
    }

    fn title(&self) -> String {
        let visible = self.visible_seqs().len();
        let mut title = format!(" Events {}/{}", visible, self.buffer.len());
        if !self.filter.types.is_empty() {
            let types: Vec<&str> = self.filter.types.iter().map(EventType::as_str).collect();
            title.push_str(&format!(" [{}]", types.join(",")));
        }
        if self.filter.repo_only {
            title.push_str(" repo");
        }
        if self.auto_scroll {
            title.push_str(" ↓");
        }
        title.push(' ');
        title
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, focused: bool) {
        let visible: Vec<&BufferedEvent> = self
            .buffer
            .visible(&self.filter, self.scope.as_deref())
            .collect();

        let items: Vec<ListItem> = if visible.is_empty() {
            let hint = if self.buffer.is_empty() {
                "  Waiting for events..."
            } else {
                "  No events match the current filter."
            };
            vec![ListItem::new(Line::from(Span::styled(
                hint,
                Style::default().fg(theme.dim),
            )))]
        } else {
            visible
                .iter()
                .map(|entry| event_item(entry, self.expansion.is_expanded(entry.seq), theme))
                .collect()
        };

        let selected_index = self
            .selected
            .and_then(|seq| visible.iter().position(|e| e.seq == seq));
        self.list_state.select(selected_index);

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

        frame.render_stateful_widget(list, area, &mut self.list_state);
    }
}

fn event_item<'a>(entry: &BufferedEvent, expanded: bool, theme: &Theme) -> ListItem<'a> {
    let event = &entry.event;
    let time = event
        .timestamp
        .map(|ts| ts.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    let session: String = event.session_id.chars().take(8).collect();

    let mut spans = vec![
        Span::styled(if expanded { "▾ " } else { "▸ " }, Style::default().fg(theme.dim)),
        Span::styled(format!("{} ", time), Style::default().fg(theme.dim)),
        Span::styled(
            format!("{:<18}", event.event_type.as_str()),
            Style::default().fg(theme.event_color(&event.event_type)),
        ),
        Span::styled(format!(" {}", session), Style::default().fg(theme.fg)),
    ];
    if let Some(ref tool) = event.tool_name {
        spans.push(Span::styled(format!(" {}", tool), Style::default().fg(theme.accent)));
    }
    if !event.files.is_empty() {
        spans.push(Span::styled(
            format!(" ({} files)", event.files.len()),
            Style::default().fg(theme.dim),
        ));
    }

    let mut lines = vec![Line::from(spans)];
    if expanded {
        let detail = |text: String| Line::from(Span::styled(text, Style::default().fg(theme.dim)));
        lines.push(detail(format!("    #{} session {}", entry.seq, event.session_id)));
        if let Some(ref repo) = event.repository {
            lines.push(detail(format!("    repo {} ({})", repo.label(), repo.path)));
        }
        if let Some(ts) = event.timestamp {
            lines.push(detail(format!("    at {}", ts.to_rfc3339())));
        }
        for file in &event.files {
            lines.push(detail(format!("    • {}", file)));
        }
    }
    ListItem::new(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::buffer::EVENT_CAPACITY;
    use crate::model::event::Repository;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn event(event_type: EventType, repo: Option<&str>) -> AgentEvent {
        let mut e = AgentEvent::new(event_type, "session");
        e.repository = repo.map(|path| Repository {
            path: path.to_string(),
            ..Default::default()
        });
        e
    }

    fn emitted(actions: &[Action]) -> Vec<PanelEvent> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Emit(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_auto_scroll_follows_newest() {
        let mut panel = EventsPanel::new(None);
        panel.push(event(EventType::SessionStart, None));
        let seq = panel.push(event(EventType::Stop, None));
        assert_eq!(panel.selected, Some(seq));

        panel.handle_key(key(KeyCode::Char('k')));
        assert!(!panel.auto_scroll);
        assert_eq!(panel.selected, Some(0));

        panel.push(event(EventType::Stop, None));
        assert_eq!(panel.selected, Some(0));

        panel.handle_key(key(KeyCode::Char('a')));
        assert_eq!(panel.selected, Some(2));
    }

    #[test]
    fn test_expand_selected_and_prune_on_eviction() {
        let mut panel = EventsPanel::new(None);
        panel.push(event(EventType::PreToolUse, None));
        panel.handle_key(key(KeyCode::Enter));
        assert!(panel.expansion.is_expanded(0));
        panel.handle_key(key(KeyCode::Char(' ')));
        assert!(!panel.expansion.is_expanded(0));

        panel.handle_key(key(KeyCode::Enter));
        for _ in 0..EVENT_CAPACITY {
            panel.push(event(EventType::PreToolUse, None));
        }
        assert_eq!(panel.buffer.len(), EVENT_CAPACITY);
        assert!(!panel.expansion.is_expanded(0));
        assert_eq!(panel.expansion.len(), 0);

        // Toggling an evicted event is a no-op
        panel.toggle_expanded(0);
        assert_eq!(panel.expansion.len(), 0);
    }

    #[test]
    fn test_number_keys_toggle_types() {
        let mut panel = EventsPanel::new(None);
        panel.push(event(EventType::SessionStart, None));
        panel.push(event(EventType::PreToolUse, None));

        let actions = panel.handle_key(key(KeyCode::Char('4')));
        assert_eq!(
            emitted(&actions),
            vec![PanelEvent::FilterEvents {
                event_types: vec![EventType::PreToolUse]
            }]
        );
        assert_eq!(panel.visible_seqs(), vec![1]);

        let actions = panel.handle_key(key(KeyCode::Char('0')));
        assert_eq!(
            emitted(&actions),
            vec![PanelEvent::FilterEvents {
                event_types: vec![]
            }]
        );
        assert_eq!(panel.visible_seqs(), vec![0, 1]);
    }

    #[test]
    fn test_repo_filter_toggle() {
        let mut panel = EventsPanel::new(Some("/repo".to_string()));
        panel.push(event(EventType::Stop, Some("/repo")));
        panel.push(event(EventType::Stop, Some("/elsewhere")));

        let actions = panel.handle_key(key(KeyCode::Char('R')));
        assert_eq!(
            emitted(&actions),
            vec![PanelEvent::ToggleRepoFilter { enabled: true }]
        );
        assert_eq!(panel.visible_seqs(), vec![0]);
        assert_eq!(panel.selected, Some(0));

        panel.set_scope(Some("/elsewhere/".to_string()));
        assert_eq!(panel.visible_seqs(), vec![1]);

        let actions = panel.handle_key(key(KeyCode::Char('R')));
        assert_eq!(
            emitted(&actions),
            vec![PanelEvent::ToggleRepoFilter { enabled: false }]
        );
        assert_eq!(panel.visible_seqs(), vec![0, 1]);
    }

    #[test]
    fn test_clear_keeps_sequence_running() {
        let mut panel = EventsPanel::new(None);
        panel.push(event(EventType::Stop, None));
        panel.handle_key(key(KeyCode::Enter));

        let actions = panel.handle_key(key(KeyCode::Char('c')));
        assert_eq!(emitted(&actions), vec![PanelEvent::ClearEvents]);
        assert!(panel.buffer.is_empty());
        assert_eq!(panel.expansion.len(), 0);
        assert_eq!(panel.selected, None);

        assert_eq!(panel.push(event(EventType::Stop, None)), 1);
    }

    #[test]
    fn test_tools() {
        let mut panel = EventsPanel::new(None);
        let actions = panel
            .apply_tool(ToolCall::FilterEvents {
                event_types: vec![EventType::Stop, EventType::Notification],
            })
            .unwrap();
        assert_eq!(
            emitted(&actions),
            vec![PanelEvent::FilterEvents {
                event_types: vec![EventType::Notification, EventType::Stop]
            }]
        );
        assert!(panel
            .apply_tool(ToolCall::ToggleRepoFilter { enabled: true })
            .is_ok());
        assert!(panel.filter.repo_only);
        assert!(panel.apply_tool(ToolCall::RefreshSessions).is_err());
    }
}
