//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::classify::ClassifyArgs;
use crate::commands::history::HistoryArgs;

/// World record history reconstruction.
///
/// Reads chat lines extracted from demos, recognizes world record messages,
/// and rebuilds each map's record history.
#[derive(Debug, Parser)]
#[command(name = "wrh", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify chat lines into raw record entries (JSON Lines).
    Classify(ClassifyArgs),

    /// Rebuild the reconciled record history.
    History(HistoryArgs),

    /// Convert race times.
    Time {
        #[command(subcommand)]
        action: TimeAction,
    },
}

/// Race time conversions.
#[derive(Debug, Subcommand)]
pub enum TimeAction {
    /// Print the centiseconds of `MM:SS.cc` or `H:MM:SS.cc`.
    Parse {
        /// The time to parse.
        text: String,
    },

    /// Print centiseconds as a time string.
    Format {
        /// Duration in centiseconds.
        centiseconds: u32,
    },

    /// Canonicalize a possibly signed time, keeping its sign.
    Normalize {
        /// The time to normalize, e.g. `-0:01.23`.
        #[arg(allow_hyphen_values = true)]
        text: String,
    },
}
