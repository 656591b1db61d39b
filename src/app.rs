use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use tokio::sync::mpsc;

use crate::actions::Action;
use crate::error::HostError;
use crate::host::{EventBus, PanelEvent, Subscription};
use crate::panels::{EventsPanel, SessionsPanel};
use crate::theme::Theme;
use crate::tools::{ToolCall, ToolTarget};

/// Which panel receives key presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sessions,
    Events,
}

/// How a footer message is colored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// One-shot footer message, cleared on the next key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

/// Main application state
pub struct App {
    pub sessions: SessionsPanel,
    pub events: EventsPanel,
    pub focus: Focus,
    /// Current message to display
    pub status_message: Option<StatusMessage>,
    /// Theme
    pub theme: Theme,
    /// Pending action queue
    pub pending_actions: Vec<Action>,
    subscription: Option<Subscription>,
}

impl App {
    pub fn new(repository: Option<String>) -> Self {
        Self {
            sessions: SessionsPanel::new(repository.clone()),
            events: EventsPanel::new(repository),
            focus: Focus::Sessions,
            status_message: None,
            theme: Theme::default(),
            pending_actions: Vec::new(),
            subscription: None,
        }
    }

    /// Subscribe the events panel to the bus.
    ///
    /// Events are forwarded into `tx` until [`App::teardown`] drops the
    /// subscription, which also ends the forwarding task.
    pub fn mount(&mut self, bus: &EventBus, tx: mpsc::UnboundedSender<Action>) {
        let (subscription, mut rx) = bus.subscribe();
        tracing::info!(subscriber = subscription.id(), "Events panel mounted");
        self.subscription = Some(subscription);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if tx.send(Action::EventReceived(event)).is_err() {
                    break;
                }
            }
        });
    }

    /// Release the bus subscription
    pub fn teardown(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::info!("Events panel unmounted");
        }
    }

    /// Take pending actions (drains the queue)
    pub fn take_pending_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending_actions)
    }

    /// Handle an action and return whether to quit
    pub fn handle_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::KeyPress(key) => self.handle_key(key),
            Action::SliceUpdated(slice) => {
                self.sessions.apply_slice(slice);
                Ok(false)
            }
            Action::EventReceived(event) => {
                self.events.push(event);
                Ok(false)
            }
            Action::RepositoryChanged(path) => {
                tracing::info!(repository = ?path, "Repository scope changed");
                self.sessions.set_current_dir(path.clone());
                self.events.set_scope(path);
                Ok(false)
            }
            Action::ToolInvoked { id, name, input } => {
                self.invoke_tool(id, name, input);
                Ok(false)
            }
            Action::Error(msg) => {
                tracing::warn!(error = %msg, "Host error");
                self.sessions.set_error(msg.clone());
                self.status_message = Some(StatusMessage::error(msg));
                Ok(false)
            }
            other => {
                self.pending_actions.push(other);
                Ok(false)
            }
        }
    }

    /// Record the outcome of handing `event` to the host link.
    ///
    /// `Ok(false)` means nothing was listening, so no reply will come. A
    /// refresh that was not delivered is finished here so the next one is
    /// not refused.
    pub fn settle_emit(&mut self, event: &PanelEvent, outcome: Result<bool, HostError>) {
        let delivered = match outcome {
            Ok(delivered) => delivered,
            Err(e) => {
                tracing::error!(error = %e, kind = event.kind(), "Failed to notify host");
                self.status_message = Some(StatusMessage::error(format!("Host: {}", e)));
                false
            }
        };
        if !delivered && matches!(event, PanelEvent::Refresh) {
            self.sessions.finish_refresh();
        }
    }

    /// Run a tool call against its panel and report the result to the host
    pub fn invoke_tool(&mut self, id: Option<String>, name: String, input: serde_json::Value) {
        let outcome = ToolCall::parse(&name, input)
            .map_err(|e| e.to_string())
            .and_then(|call| match call.target() {
                ToolTarget::Sessions => self.sessions.apply_tool(call),
                ToolTarget::Events => self.events.apply_tool(call),
            });

        let error = match outcome {
            Ok(actions) => {
                tracing::info!(tool = %name, "Tool invoked");
                self.pending_actions.extend(actions);
                None
            }
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool invocation failed");
                Some(e)
            }
        };

        self.pending_actions.push(Action::Emit(PanelEvent::ToolResult {
            id,
            ok: error.is_none(),
            name,
            error,
        }));
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Clear the status message on any key press
        self.status_message = None;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(true);
        }

        let capturing = self.focus == Focus::Sessions && self.sessions.is_capturing_input();
        if !capturing {
            match key.code {
                KeyCode::Char('q') => return Ok(true),
                KeyCode::Tab | KeyCode::BackTab => {
                    self.focus = match self.focus {
                        Focus::Sessions => Focus::Events,
                        Focus::Events => Focus::Sessions,
                    };
                    return Ok(false);
                }
                _ => {}
            }
        }

        let actions = match self.focus {
            Focus::Sessions => self.sessions.handle_key(key),
            Focus::Events => self.events.handle_key(key),
        };
        self.pending_actions.extend(actions);
        Ok(false)
    }

    pub fn render(&mut self, frame: &mut Frame) {
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.bg)),
            frame.area(),
        );

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),      // Header
                Constraint::Percentage(55), // Sessions
                Constraint::Min(0),         // Events
                Constraint::Length(3),      // Footer/status
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.sessions.render(
            frame,
            chunks[1],
            &self.theme,
            self.focus == Focus::Sessions,
        );
        self.events
            .render(frame, chunks[2], &self.theme, self.focus == Focus::Events);
        self.render_footer(frame, chunks[3]);

        if let Some(name) = self.sessions.pending_delete_name() {
            self.render_confirm_dialog(frame, name);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(
                " Agent Panels ",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "│ Sessions and events for AI agents",
                Style::default().fg(self.theme.dim),
            ),
        ];
        if self.sessions.error().is_some() {
            spans.push(Span::styled(
                " │ host error",
                Style::default().fg(self.theme.error),
            ));
        } else if self.sessions.is_loading() {
            spans.push(Span::styled(
                " │ refreshing...",
                Style::default().fg(self.theme.warning),
            ));
        }
        let title = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(title, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let help_text = match self.focus {
            Focus::Sessions => {
                " q: Quit │ Tab: Events │ j/k: Navigate │ /: Search │ f: Filter │ r: Refresh │ Enter: Open "
            }
            Focus::Events => {
                " q: Quit │ Tab: Sessions │ Enter: Expand │ 1-9: Types │ 0: All │ R: Repo │ a: Follow │ c: Clear "
            }
        };

        let content = if let Some(ref msg) = self.status_message {
            let color = match msg.kind {
                StatusKind::Info => self.theme.accent,
                StatusKind::Success => self.theme.success,
                StatusKind::Error => self.theme.error,
            };
            Line::from(Span::styled(
                format!(" {} ", msg.text),
                Style::default().fg(color),
            ))
        } else {
            Line::from(Span::styled(help_text, Style::default().fg(self.theme.dim)))
        };

        let footer = Paragraph::new(content).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(footer, area);
    }

    fn render_confirm_dialog(&self, frame: &mut Frame, session_name: &str) {
        let area = centered_rect(50, 20, frame.area());

        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(" Confirm Delete ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.error));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("Delete session '{}'?", session_name),
                Style::default().fg(self.theme.fg),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "This action cannot be undone.",
                Style::default().fg(self.theme.warning),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press 'y' to confirm, 'n' or Esc to cancel",
                Style::default().fg(self.theme.dim),
            )),
        ];

        let paragraph = Paragraph::new(text);
        frame.render_widget(paragraph, inner);
    }
}

/// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
