//! Terminal User Interface for slurmtop
//!
//! One screen: an info line, the partition load panel, the job queue table
//! and a status line. All data comes from a [`RefreshCoordinator`]; the TUI
//! only renders snapshots and keeps its own sort order.

pub mod app;
pub mod event;
pub mod runtime;
pub mod theme;
pub mod ui;

use std::io::{self, IsTerminal, stdout};
use std::sync::Arc;

use anyhow::{Result, bail};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::models::Config;
use crate::refresh::RefreshCoordinator;
use crate::slurm::SlurmSource;
use crate::tui::app::App;
use crate::tui::runtime::{create_input_channel, run_event_loop, spawn_input_task};
use crate::tui::theme::Theme;

/// Refuse to start when stdout is not a terminal that can host an
/// alternate screen.
fn ensure_interactive_terminal() -> Result<()> {
    if !stdout().is_terminal() {
        bail!(
            "the monitor needs an interactive terminal (stdout is not a TTY)\n\
             Hint: use 'slurmtop partitions' or 'slurmtop jobs' for plain output"
        );
    }

    let term = std::env::var("TERM").unwrap_or_default();
    if matches!(term.as_str(), "" | "dumb" | "unknown") {
        bail!(
            "terminal type '{}' cannot host the monitor\n\
             Hint: set TERM (e.g. xterm-256color) or use 'slurmtop jobs'",
            if term.is_empty() { "(unset)" } else { &term }
        );
    }
    Ok(())
}

/// Run the TUI against `source` until the user quits
pub async fn run_tui<S: SlurmSource>(source: Arc<S>, config: &Config) -> Result<()> {
    ensure_interactive_terminal()?;

    let mut coordinator = RefreshCoordinator::new(source, config);
    coordinator.start();

    let mut terminal = setup_terminal()?;

    let app = App::new(
        Theme::from_name(&config.display.theme),
        config.display.default_sort.clone(),
    );

    let cancel = CancellationToken::new();
    let (input_tx, input_rx) = create_input_channel();
    let input_task = spawn_input_task(input_tx, cancel.clone());

    let result = run_event_loop(app, &coordinator, input_rx, |app| {
        terminal.draw(|frame| ui::render(app, frame))?;
        Ok(())
    })
    .await;

    cancel.cancel();
    let _ = input_task.await;
    coordinator.shutdown().await;

    restore_terminal(&mut terminal)?;

    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
