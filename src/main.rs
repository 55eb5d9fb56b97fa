//! slurmtop - live partition and job-queue monitor for Slurm

use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing_subscriber::EnvFilter;

use slurmtop::display::{format_info, format_jobs, format_partitions};
use slurmtop::models::Config;
use slurmtop::refresh::{RefreshCoordinator, Source};
use slurmtop::slurm::SlurmInterface;
use slurmtop::sort::SortEngine;

#[derive(Parser)]
#[command(name = "slurmtop")]
#[command(about = "Live partition and job-queue monitor for Slurm", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file to use instead of the user config
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the interactive monitor (default)
    #[command(alias = "ui")]
    Tui,

    /// Show partition load
    #[command(alias = "part")]
    Partitions {
        /// Watch mode: refresh every N seconds
        #[arg(short, long, value_name = "SECONDS", default_value = "0")]
        watch: f64,
    },

    /// Show the job queue
    Jobs {
        /// Sort by column, e.g. `priority_number` or `TIME`. Repeat the
        /// same column to flip its direction.
        #[arg(short, long, value_name = "COLUMN")]
        sort: Vec<String>,

        /// Maximum number of jobs to show (0 = all)
        #[arg(short = 'n', long, default_value = "0")]
        limit: usize,

        /// Watch mode: refresh every N seconds
        #[arg(short, long, value_name = "SECONDS", default_value = "0")]
        watch: f64,
    },

    /// Show user, host, OS and Slurm version
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let is_tui = matches!(cli.command, None | Some(Commands::Tui));

    init_tracing(is_tui)?;

    let (config, warnings) = match Config::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if !is_tui {
        for warning in &warnings {
            eprintln!("Warning: {}", warning);
        }
    }
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli.command.unwrap_or(Commands::Tui), config))
}

async fn run(command: Commands, config: Config) -> Result<()> {
    let slurm = SlurmInterface::with_config(config.system.slurm_bin_path.as_deref())
        .with_timeout(config.system.command_timeout());
    if slurm.bin_dir().is_default() {
        tracing::debug!("sinfo not found on PATH; using {}", slurm.bin_dir().path().display());
    }
    let source = Arc::new(slurm);

    match command {
        Commands::Tui => slurmtop::tui::run_tui(source, &config).await,
        Commands::Partitions { watch } => {
            let coordinator = RefreshCoordinator::new(source, &config);
            let result = run_command(watch, || handle_partitions_command(&coordinator)).await;
            coordinator.shutdown().await;
            result
        }
        Commands::Jobs { sort, limit, watch } => {
            let coordinator = RefreshCoordinator::new(source, &config);
            let result =
                run_command(watch, || handle_jobs_command(&coordinator, &sort, limit)).await;
            coordinator.shutdown().await;
            result
        }
        Commands::Info => {
            let coordinator = RefreshCoordinator::new(source, &config);
            let result = handle_info_command(&coordinator).await;
            coordinator.shutdown().await;
            println!("{}", result?);
            Ok(())
        }
    }
}

/// Route tracing output. CLI commands log to stderr; the TUI owns the
/// terminal, so it only logs when `SLURMTOP_LOG` names a file.
fn init_tracing(is_tui: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if !is_tui {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(());
    }

    if let Ok(path) = std::env::var("SLURMTOP_LOG")
        && !path.is_empty()
    {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open log file '{}'", path))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

async fn run_command<F, Fut>(watch: f64, command: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    if watch > 0.0 {
        watch_loop(watch, command).await
    } else {
        println!("{}", command().await?);
        Ok(())
    }
}

async fn watch_loop<F, Fut>(interval: f64, command: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    // Enter alternate screen buffer and hide cursor for clean display
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let result = async {
        loop {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

            let output = match command().await {
                Ok(s) => s,
                Err(e) => format!("Error: {:#}", e),
            };

            let screen_content = format!(
                "{}\n\nLast updated: {} | Refreshing every {}s | Press Ctrl+C to exit",
                output, timestamp, interval
            );

            // Synchronized update (DEC private mode 2026) so the terminal
            // renders the frame in one go
            write!(stdout, "\x1B[?2026h")?;
            write!(stdout, "\x1B[H{}\x1B[J", screen_content)?;
            write!(stdout, "\x1B[?2026l")?;
            stdout.flush()?;

            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = tokio::time::sleep(Duration::from_secs_f64(interval)) => {}
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    // Always clean up terminal state
    execute!(stdout, Show, LeaveAlternateScreen)?;
    println!("Watch mode stopped.");

    result
}

async fn handle_partitions_command(coordinator: &RefreshCoordinator<SlurmInterface>) -> Result<String> {
    coordinator.poll_once(Source::Partitions).await?;
    Ok(format_partitions(&coordinator.partitions()))
}

async fn handle_jobs_command(
    coordinator: &RefreshCoordinator<SlurmInterface>,
    sort: &[String],
    limit: usize,
) -> Result<String> {
    coordinator.poll_once(Source::Jobs).await?;
    let snapshot = coordinator.jobs();

    let mut engine = SortEngine::new();
    let mut jobs = snapshot.records.clone();
    for column in sort {
        jobs = engine
            .sort_by_name(&jobs, column)
            .with_context(|| format!("cannot sort by '{}'", column))?;
    }
    if limit > 0 {
        jobs.truncate(limit);
    }

    Ok(format_jobs(&jobs, engine.state().current()))
}

async fn handle_info_command(coordinator: &RefreshCoordinator<SlurmInterface>) -> Result<String> {
    coordinator.poll_once(Source::Info).await?;
    Ok(format_info(&coordinator.info()))
}
