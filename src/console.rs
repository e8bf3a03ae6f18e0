//! Terminal side of a CLI run: stdin control commands, progress display,
//! exit codes and the JSON summary.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use filetransfer_core::{DownloadState, ExpectedLength, Transfer, TransferOutcome};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;

/// A command typed on stdin while the transfer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlCommand {
    Pause,
    Resume,
    Stop,
    State,
}

impl ControlCommand {
    /// Parses one trimmed, case-insensitive input line.
    pub(crate) fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Some(Self::Pause),
            "r" | "resume" => Some(Self::Resume),
            "s" | "stop" => Some(Self::Stop),
            "state" | "status" => Some(Self::State),
            _ => None,
        }
    }
}

/// Process exit codes for each terminal outcome. Errors exit with 1.
pub(crate) fn exit_code_for(outcome: TransferOutcome) -> ExitCode {
    match outcome {
        TransferOutcome::Completed => ExitCode::SUCCESS,
        TransferOutcome::ResourceNotFound => ExitCode::from(2),
        TransferOutcome::Stopped => ExitCode::from(3),
    }
}

/// Final machine-readable report for `--json`.
#[derive(Debug, Serialize)]
pub(crate) struct Summary {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) outcome: TransferOutcome,
    pub(crate) bytes_written: u64,
    pub(crate) chunks_written: u64,
    pub(crate) expected_length: ExpectedLength,
}

impl Summary {
    pub(crate) fn from_transfer(transfer: &Transfer, outcome: TransferOutcome) -> Self {
        let descriptor = transfer.descriptor();
        Self {
            name: descriptor.requested_name().to_string(),
            path: descriptor.destination_path().to_path_buf(),
            outcome,
            bytes_written: transfer.bytes_written(),
            chunks_written: transfer.chunks_written(),
            expected_length: transfer.expected_length(),
        }
    }
}

/// Builds the progress display; hidden when quiet or not on a terminal.
pub(crate) fn progress_bar(length: ExpectedLength, visible: bool) -> ProgressBar {
    let bar = match length {
        ExpectedLength::Known(n) => {
            let bar = ProgressBar::new(n);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner} [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
            ) {
                bar.set_style(style.progress_chars("=> "));
            }
            bar
        }
        ExpectedLength::Unknown => {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner} {bytes} ({bytes_per_sec}) {msg}") {
                bar.set_style(style);
            }
            bar
        }
    };
    if visible {
        bar.enable_steady_tick(Duration::from_millis(120));
    } else {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    }
    bar
}

/// Mirrors the transfer's counters and state onto the progress bar.
pub(crate) fn refresh_progress(bar: &ProgressBar, transfer: &Transfer) {
    if let ExpectedLength::Known(n) = transfer.expected_length()
        && bar.length() != Some(n)
    {
        bar.set_length(n);
    }
    bar.set_position(transfer.bytes_written());
    bar.set_message(match transfer.state() {
        DownloadState::Running => "",
        DownloadState::Paused => "paused",
        DownloadState::Stopped => "stopping",
    });
}
