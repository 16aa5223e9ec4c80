//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Flags
//!
//! - `--yes` / `-y`: Skip the confirmation prompt
//! - `--debug`: Enable debug logging on stderr
//! - `--quiet` / `-q`: Errors only
//! - `--timeout <secs>`: Abort network work that runs longer than this

use clap::Parser;

/// pr-bullet is a tool for copying pull request to multiple repositories
#[derive(Parser, Debug)]
#[command(name = "pr-bullet")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Pull request to copy, e.g. https://github.com/owner/repo/pull/12
    #[arg(value_name = "PULL_REQUEST_URL")]
    pub pull_request: String,

    /// Target repositories (owner/repo or URL); read from stdin when omitted
    #[arg(value_name = "TARGET_REPOS")]
    pub targets: Vec<String>,

    /// Automatic yes to prompts
    #[arg(short, long)]
    pub yes: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Abort if fetching or copying takes longer than this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Whether targets must be read from stdin.
    pub fn targets_from_stdin(&self) -> bool {
        self.targets.is_empty()
    }
}
