use crossterm::event::KeyEvent;

use crate::host::{PanelEvent, SessionSlice};
use crate::model::AgentEvent;

/// Actions that can be dispatched through the application
#[derive(Debug, Clone)]
pub enum Action {
    /// A key was pressed
    KeyPress(KeyEvent),
    /// The host replaced the session slice
    SliceUpdated(SessionSlice),
    /// An event arrived through the bus subscription
    EventReceived(AgentEvent),
    /// The host scoped the dashboard to another repository
    RepositoryChanged(Option<String>),
    /// The host invoked one of our tools
    ToolInvoked {
        id: Option<String>,
        name: String,
        input: serde_json::Value,
    },
    /// An error occurred
    Error(String),
    /// Notify the host
    Emit(PanelEvent),
    /// Copy text to the system clipboard
    CopyToClipboard(String),
}
