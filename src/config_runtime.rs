//! Merges CLI flags, file config and built-in defaults into run settings.
//!
//! Priority: CLI flag > config file > built-in default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use filetransfer_core::TransferOptions;
use filetransfer_core::transfer::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CHUNK_SIZE, PAUSE_POLL_INTERVAL, READ_TIMEOUT_SECS,
};

use crate::app_config::FileConfig;
use crate::cli::{Args, DEFAULT_SERVER_URL};

/// Fully resolved settings for one CLI run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunSettings {
    pub(crate) server_url: String,
    pub(crate) output_dir: PathBuf,
    pub(crate) chunk_size: usize,
    pub(crate) options: TransferOptions,
    pub(crate) connect_timeout_secs: u64,
    pub(crate) read_timeout_secs: u64,
}

pub(crate) fn resolve_settings(args: &Args, file_config: Option<&FileConfig>) -> Result<RunSettings> {
    let fallback = FileConfig::default();
    let file_config = file_config.unwrap_or(&fallback);

    let server_url = args
        .server
        .clone()
        .or_else(|| file_config.server_url.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| file_config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let chunk_size = match args.chunk_size.or(file_config.chunk_size) {
        Some(bytes) => usize::try_from(bytes)
            .with_context(|| format!("Chunk size {bytes} does not fit this platform"))?,
        None => DEFAULT_CHUNK_SIZE,
    };

    let pause_poll_interval = args
        .pause_poll_ms
        .or(file_config.pause_poll_ms)
        .map_or(PAUSE_POLL_INTERVAL, Duration::from_millis);

    Ok(RunSettings {
        server_url,
        output_dir,
        chunk_size,
        options: TransferOptions {
            pause_poll_interval,
            ..TransferOptions::default()
        },
        connect_timeout_secs: file_config
            .connect_timeout_secs
            .unwrap_or(CONNECT_TIMEOUT_SECS),
        read_timeout_secs: file_config.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
    })
}
