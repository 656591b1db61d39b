use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

mod actions;
mod app;
mod config;
mod error;
mod host;
mod logging;
mod model;
mod panels;
mod theme;
mod tools;

use actions::Action;
use app::{App, StatusMessage};
use config::{Cli, FileConfig, Settings};
use host::{EventBus, HostLink};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_tools {
        let json = serde_json::to_string_pretty(tools::descriptors())
            .context("Failed to encode tool descriptors")?;
        println!("{}", json);
        return Ok(());
    }

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let file_config = FileConfig::load(&config_path)?;
    let settings = Settings::resolve(&cli, file_config);

    // Initialize logging
    logging::init(&settings.log_level, &settings.log_file)?;
    tracing::info!(config = %config_path.display(), ?settings, "Starting agent-panels");

    // Create event channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Action>();
    let bus = EventBus::new();

    // Spawn the host, if one is configured
    let mut host = match settings.host_command.as_deref() {
        Some(command) => {
            let (link, _reader) =
                HostLink::spawn(command, &settings.host_args, tx.clone(), bus.clone())
                    .context("Failed to start host")?;
            link
        }
        None => {
            tracing::warn!("No host command configured, running detached");
            HostLink::Detached
        }
    };

    // Initialize terminal
    let mut terminal = ratatui::init();

    // Spawn input handler
    let input_tx = tx.clone();
    let tick = Duration::from_millis(settings.tick_ms);
    tokio::spawn(async move {
        loop {
            if event::poll(tick).unwrap_or(false) {
                if let Ok(Event::Key(key)) = event::read() {
                    if key.kind == KeyEventKind::Press
                        && input_tx.send(Action::KeyPress(key)).is_err()
                    {
                        break;
                    }
                }
            }
        }
    });

    // Create app state
    let mut app = App::new(settings.repository.clone());
    app.mount(&bus, tx.clone());
    if host.is_detached() {
        app.status_message = Some(StatusMessage::info("No host configured (see --host)"));
    } else {
        app.pending_actions.extend(app.sessions.refresh());
    }

    // Main event loop
    let result = loop {
        // Render
        if let Err(e) = terminal.draw(|f| app.render(f)) {
            break Err(e.into());
        }

        // Process any pending actions from the app
        for pending_action in app.take_pending_actions() {
            match pending_action {
                Action::Emit(ref panel_event) => {
                    let outcome = host.send(panel_event).await;
                    app.settle_emit(panel_event, outcome);
                }
                Action::CopyToClipboard(ref text) => {
                    let message = match arboard::Clipboard::new() {
                        Ok(mut clipboard) => match clipboard.set_text(text.as_str()) {
                            Ok(()) => StatusMessage::success(format!("'{}' copied to clipboard", text)),
                            Err(e) => StatusMessage::error(format!("Clipboard error: {}", e)),
                        },
                        Err(e) => StatusMessage::error(format!("Clipboard error: {}", e)),
                    };
                    app.status_message = Some(message);
                }
                _ => {}
            }
        }

        // Handle events from channel
        tokio::select! {
            Some(action) = rx.recv() => {
                match app.handle_action(action) {
                    Ok(should_quit) => {
                        if should_quit {
                            break Ok(());
                        }
                    }
                    Err(e) => {
                        break Err(e);
                    }
                }
            }
        }
    };

    // Tear down before restoring the terminal
    app.teardown();
    ratatui::restore();
    host.shutdown().await;
    tracing::info!("Shut down");
    result
}
