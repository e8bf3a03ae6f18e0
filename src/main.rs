//! CLI entry point for the filetransfer tool.

use std::io::{self, BufRead, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use filetransfer_core::{HttpClient, Transfer, TransferOutcome, resolve_unique_path};
use indicatif::ProgressBar;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod config_runtime;
mod console;

use cli::Args;
use console::{ControlCommand, Summary};

const PROGRESS_REFRESH: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args);
    debug!(?args, "CLI arguments parsed");

    let file_config = app_config::load_default_file_config()?;
    let settings = config_runtime::resolve_settings(&args, file_config.as_ref())?;
    debug!(?settings, "settings resolved");

    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory '{}'",
                settings.output_dir.display()
            )
        })?;
    let destination = resolve_unique_path(&settings.output_dir, &args.name);

    let client = HttpClient::with_timeouts(
        &settings.server_url,
        settings.connect_timeout_secs,
        settings.read_timeout_secs,
    )?;
    let transfer = Transfer::with_options(
        client,
        args.name.as_str(),
        &destination,
        settings.chunk_size,
        settings.options,
    )
    .await
    .with_context(|| format!("Failed to prepare transfer of '{}'", args.name))?;

    info!(
        name = %args.name,
        path = %destination.display(),
        length = %transfer.expected_length(),
        "Transfer starting"
    );

    let show_progress = !args.quiet && !args.json && io::stderr().is_terminal();
    let bar = console::progress_bar(transfer.expected_length(), show_progress);
    let outcome = drive(&transfer, &bar).await;
    bar.finish_and_clear();
    let outcome = outcome?;

    match outcome {
        TransferOutcome::Completed => info!(
            path = %destination.display(),
            bytes = transfer.bytes_written(),
            "Download complete"
        ),
        TransferOutcome::Stopped => info!("Download stopped; partial file removed"),
        TransferOutcome::ResourceNotFound => warn!(name = %args.name, "Resource not found on server"),
    }

    if args.json {
        let summary = Summary::from_transfer(&transfer, outcome);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(console::exit_code_for(outcome))
}

/// Runs the transfer to completion while serving stdin commands and
/// refreshing the progress bar.
async fn drive(transfer: &Transfer, bar: &ProgressBar) -> Result<TransferOutcome> {
    let mut handle = transfer.spawn();
    let mut commands = spawn_stdin_reader();
    let mut listening = true;
    let mut ticker = tokio::time::interval(PROGRESS_REFRESH);

    loop {
        tokio::select! {
            joined = &mut handle => {
                let outcome = joined.context("Transfer task panicked")??;
                return Ok(outcome);
            }
            line = commands.recv(), if listening => {
                let Some(line) = line else {
                    debug!("stdin closed; no longer listening for commands");
                    listening = false;
                    continue;
                };
                apply_command(transfer, bar, &line).await?;
            }
            _ = ticker.tick() => console::refresh_progress(bar, transfer),
        }
    }
}

async fn apply_command(transfer: &Transfer, bar: &ProgressBar, line: &str) -> Result<()> {
    match ControlCommand::parse(line) {
        Some(ControlCommand::Pause) => transfer.pause(),
        Some(ControlCommand::Resume) => transfer.resume(),
        Some(ControlCommand::Stop) => {
            info!("Stopping transfer");
            transfer.stop().await.context("Failed to stop transfer")?;
        }
        Some(ControlCommand::State) => {
            let state = transfer.state();
            let written = transfer.bytes_written();
            let length = transfer.expected_length();
            bar.suspend(|| eprintln!("{state}: {written} bytes written, expected {length}"));
        }
        None if line.trim().is_empty() => {}
        None => {
            bar.suspend(|| eprintln!("Unknown command '{}'. Use p, r, s or state.", line.trim()));
        }
    }
    console::refresh_progress(bar, transfer);
    Ok(())
}

/// Forwards stdin lines from a plain thread, so a pending read never holds
/// up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn init_tracing(args: &Args) {
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so `--json` output on stdout stays machine-readable.
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .try_init();
}
