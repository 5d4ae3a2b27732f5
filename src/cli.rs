use crate::flamegraph::Direction;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "flamescope")]
#[command(about = "Interactive terminal flame graphs for recorded stack samples")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Write logs to this file (the TUI owns the terminal)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Browse a profile database interactively
    View {
        /// Profile database file (defaults to most recent in the current directory)
        file: Option<PathBuf>,

        /// Open the flame graph of this query directly
        #[arg(long, short = 'q')]
        query_id: Option<String>,

        /// Custom SQL returning (count, stack) rows; ?1 binds the query id
        #[arg(long)]
        sql: Option<String>,

        /// Flame graph orientation
        #[arg(long, short = 'd', value_enum, default_value_t = Direction::TopDown)]
        direction: Direction,

        /// Re-run the query periodically (e.g. 5s)
        #[arg(long, short = 'r', value_parser = parse_duration)]
        refresh: Option<Duration>,
    },

    /// Open a folded stack file (`a;b;c 42` per line) as a flame graph
    Fold {
        /// Folded stacks file
        file: PathBuf,

        /// Flame graph orientation
        #[arg(long, short = 'd', value_enum, default_value_t = Direction::TopDown)]
        direction: Direction,
    },

    /// Import a folded stack file into a profile database
    Import {
        /// Profile database file (created if missing)
        db: PathBuf,

        /// Folded stacks file
        file: PathBuf,

        /// Identifier the stacks are stored under
        #[arg(long, short = 'q')]
        query_id: String,

        /// Replace stacks already stored under this query id
        #[arg(long)]
        replace: bool,
    },

    /// Print the heaviest stacks
    Top {
        /// Profile database or folded stacks file
        file: PathBuf,

        /// Only stacks of this query (databases only)
        #[arg(long, short = 'q')]
        query_id: Option<String>,

        /// Number of stacks to display
        #[arg(long, short = 'n', default_value = "20")]
        top: usize,

        /// Minimum percentage to display
        #[arg(long, short = 't', default_value = "0")]
        threshold: f64,
    },

    /// List profile databases
    List {
        /// Directory to search (defaults to current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

impl Command {
    /// Commands that take over the terminal
    pub fn is_interactive(&self) -> bool {
        matches!(self, Command::View { .. } | Command::Fold { .. })
    }
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    // Try humantime first
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Try bare number as seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    Err(format!(
        "Invalid duration '{}'. Examples: 500ms, 5s, 1m, 90",
        s
    ))
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::View { refresh: Some(d), .. } if d.is_zero() => {
                Err("Refresh interval must be greater than zero".to_string())
            }
            Command::Top { threshold, .. } if !(0.0..=100.0).contains(threshold) => Err(format!(
                "Threshold must be between 0 and 100, got {}",
                threshold
            )),
            Command::Import { query_id, .. } if query_id.trim().is_empty() => {
                Err("Query id must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}
