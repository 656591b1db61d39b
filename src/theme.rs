use ratatui::style::Color;

use crate::model::{EventType, SessionStatus};

/// Theme colors inspired by Claude Code
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub accent: Color,
    pub dim: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub highlight: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg: Color::Rgb(30, 30, 30),
            fg: Color::Rgb(220, 220, 220),
            accent: Color::Rgb(217, 119, 87), // Claude orange
            dim: Color::Rgb(100, 100, 100),
            success: Color::Rgb(80, 200, 120),
            warning: Color::Rgb(255, 193, 7),
            error: Color::Rgb(220, 53, 69),
            highlight: Color::Rgb(50, 50, 50),
        }
    }
}

impl Theme {
    pub fn status_color(&self, status: SessionStatus) -> Color {
        match status {
            SessionStatus::Active => self.success,
            SessionStatus::Idle => self.warning,
            SessionStatus::Waiting => self.accent,
            SessionStatus::Inactive => self.dim,
            SessionStatus::Stopped => self.error,
        }
    }

    pub fn event_color(&self, event_type: &EventType) -> Color {
        match event_type {
            EventType::SessionStart | EventType::SessionEnd => self.accent,
            EventType::PreToolUse => self.warning,
            EventType::PostToolUse => self.success,
            EventType::Notification => Color::Rgb(100, 160, 255),
            EventType::Stop | EventType::SubagentStop => self.error,
            _ => self.fg,
        }
    }
}

/// Fixed palette cycled through for directory groups
pub const PALETTE: [Color; 8] = [
    Color::Rgb(217, 119, 87),
    Color::Rgb(80, 200, 120),
    Color::Rgb(100, 160, 255),
    Color::Rgb(255, 193, 7),
    Color::Rgb(200, 120, 220),
    Color::Rgb(64, 200, 200),
    Color::Rgb(240, 110, 150),
    Color::Rgb(170, 200, 90),
];

/// Color for the `index`-th item, repeating every eight
pub fn color_for_index(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}
