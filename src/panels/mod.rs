pub mod events;
pub mod sessions;

pub use events::EventsPanel;
pub use sessions::SessionsPanel;
