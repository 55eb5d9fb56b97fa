//! Event loop and input task for the TUI
//!
//! Terminal input arrives on an mpsc channel fed by [`spawn_input_task`].
//! Data arrives through the refresh coordinator's `watch` slots, so a slow
//! redraw only ever skips intermediate snapshots, never input. The loop uses
//! `tokio::select!` biased toward input.

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::refresh::{RefreshCoordinator, Source};
use crate::slurm::SlurmSource;
use crate::tui::app::App;
use crate::tui::event::{EventResult, InputEvent};

const INPUT_CHANNEL_CAPACITY: usize = 16;

/// Redraw interval for the clock, status expiry and staleness counters
const CLOCK_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub fn create_input_channel() -> (mpsc::Sender<InputEvent>, mpsc::Receiver<InputEvent>) {
    mpsc::channel(INPUT_CHANNEL_CAPACITY)
}

/// Spawn the terminal input reader task
pub fn spawn_input_task(tx: mpsc::Sender<InputEvent>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = EventStream::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                maybe_event = reader.next() => {
                    match maybe_event {
                        Some(Ok(event)) => {
                            let input_event = match event {
                                Event::Key(key) => Some(InputEvent::Key(key)),
                                Event::Mouse(mouse) => Some(InputEvent::Mouse(mouse)),
                                Event::Resize(w, h) => Some(InputEvent::Resize(w, h)),
                                _ => None,
                            };

                            if let Some(evt) = input_event
                                && tx.send(evt).await.is_err()
                            {
                                break; // Receiver dropped
                            }
                        }
                        Some(Err(e)) => {
                            let is_fatal = matches!(
                                e.kind(),
                                std::io::ErrorKind::BrokenPipe
                                    | std::io::ErrorKind::ConnectionReset
                                    | std::io::ErrorKind::UnexpectedEof
                            );

                            if is_fatal {
                                tracing::info!("Terminal disconnected: {:?}", e);
                                break;
                            }
                            tracing::warn!("Terminal event read error: {:?}", e);
                        }
                        None => break,
                    }
                }
            }
        }
    })
}

/// Run until the user quits. `draw` renders one frame.
pub async fn run_event_loop<S, F>(
    mut app: App,
    coordinator: &RefreshCoordinator<S>,
    mut input_rx: mpsc::Receiver<InputEvent>,
    mut draw: F,
) -> Result<()>
where
    S: SlurmSource,
    F: FnMut(&mut App) -> Result<()>,
{
    let mut info_rx = coordinator.subscribe_info();
    let mut partitions_rx = coordinator.subscribe_partitions();
    let mut jobs_rx = coordinator.subscribe_jobs();
    let mut clock = tokio::time::interval(CLOCK_TICK_INTERVAL);
    clock.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    draw(&mut app)?;

    loop {
        let result = tokio::select! {
            biased;

            event = input_rx.recv() => match event {
                Some(event) => app.handle_input(event),
                None => EventResult::Quit,
            },

            Ok(()) = jobs_rx.changed() => {
                let snapshot = jobs_rx.borrow_and_update().clone();
                app.set_jobs(snapshot);
                app.set_health(Source::Jobs, coordinator.health(Source::Jobs));
                EventResult::Continue
            }

            Ok(()) = partitions_rx.changed() => {
                let snapshot = partitions_rx.borrow_and_update().clone();
                app.set_partitions(snapshot);
                app.set_health(Source::Partitions, coordinator.health(Source::Partitions));
                EventResult::Continue
            }

            Ok(()) = info_rx.changed() => {
                let info = info_rx.borrow_and_update().clone();
                app.set_info(info);
                EventResult::Continue
            }

            _ = clock.tick() => {
                app.expire_status();
                app.set_health(Source::Jobs, coordinator.health(Source::Jobs));
                app.set_health(Source::Partitions, coordinator.health(Source::Partitions));
                EventResult::Continue
            }
        };

        if app.take_refresh_request() && !coordinator.refresh_now(Source::Jobs) {
            app.set_status("Job refresh already running", false);
        }

        match result {
            EventResult::Quit => break,
            EventResult::Continue => draw(&mut app)?,
            EventResult::Unchanged => {}
        }
    }

    Ok(())
}
