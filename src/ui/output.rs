//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Status output goes to stderr and respects the quiet flag. Formatting is
//! kept in pure functions so it can be tested without capturing streams.

use std::fmt::Display;

use crate::core::types::{PullRequestSummary, ReplicatedPullRequest, RepositoryRef};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - errors only
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a status line to stderr (respects quiet mode).
pub fn status(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("{}", message);
    }
}

/// Print status text to stderr without a newline (respects quiet mode).
pub fn status_partial(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprint!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Format a list of items on one line.
pub fn format_list<T: Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Format the pre-flight summary shown before anything is written.
pub fn format_summary(
    source: &PullRequestSummary,
    url: &str,
    file_count: usize,
    targets: &[RepositoryRef],
) -> String {
    format!(
        "Original pull request:\n  \
           Title ... {}\n  \
           URL   ... {}\n  \
           Files ... {}\n\
         Target repositories:\n  \
           {}\n",
        source.title,
        url,
        file_count,
        format_list(targets, ", ")
    )
}

/// Format the start of a progress line for one target.
pub fn format_progress(source: &PullRequestSummary, target: &RepositoryRef) -> String {
    format!(
        "Copying {}/{} pull request #{} to {} ... ",
        source.head_author_login, source.head_repo_name, source.number, target
    )
}

/// Format the end of a progress line for a created pull request.
pub fn format_created(pr: &ReplicatedPullRequest) -> String {
    if pr.is_draft {
        format!("{} as draft", pr.url)
    } else {
        pr.url.clone()
    }
}
