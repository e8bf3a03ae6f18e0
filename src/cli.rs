//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Default file server when neither the CLI nor the config file names one.
pub const DEFAULT_SERVER_URL: &str = "https://localhost:7092/api";

/// Download one file in chunks with live pause, resume and stop.
///
/// While the transfer runs, type `p` (pause), `r` (resume), `s` (stop) or
/// `state` followed by Enter.
#[derive(Parser, Debug)]
#[command(name = "filetransfer")]
#[command(author, version, about)]
pub struct Args {
    /// Name of the file to fetch from <SERVER>/files/<NAME>
    pub name: String,

    /// File server base URL [default: https://localhost:7092/api]
    #[arg(short = 's', long)]
    pub server: Option<String>,

    /// Directory to save into (defaults to the current directory)
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Bytes per read/write cycle (1-16777216)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u64).range(1..=16_777_216))]
    pub chunk_size: Option<u64>,

    /// Pause poll interval in milliseconds (1-10000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=10_000))]
    pub pause_poll_ms: Option<u64>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output and the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Print a JSON summary of the result on stdout
    #[arg(long)]
    pub json: bool,
}
