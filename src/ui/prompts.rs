//! ui::prompts
//!
//! Interactive confirmation.
//!
//! # Design
//!
//! Prompts are only shown when stdin is a terminal. Otherwise the prompt is
//! skipped and its default answer is taken.

use std::io::{self, BufRead, IsTerminal, Write};

use log::debug;
use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Prompt for confirmation (yes/no) on the terminal.
///
/// Returns `Ok(true)` if the user confirms, `Ok(false)` if they decline.
/// An empty answer takes `default`, and so does a non-terminal stdin.
pub fn confirm(message: &str, default: bool) -> Result<bool, PromptError> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        debug!("stdin is not a terminal; answering {:?} with {}", message, default);
        return Ok(default);
    }
    confirm_with(&mut stdin.lock(), &mut io::stderr(), message, default)
}

/// Prompt for confirmation using explicit streams.
///
/// Unrecognised answers re-ask. End of input counts as cancellation.
pub fn confirm_with(
    input: &mut impl BufRead,
    output: &mut impl Write,
    message: &str,
    default: bool,
) -> Result<bool, PromptError> {
    let hint = if default { "Y/n" } else { "y/N" };

    loop {
        write!(output, "{} ({}) [{}]: ", message, hint, if default { "y" } else { "n" })?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(PromptError::Cancelled);
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn answer(input: &str, default: bool) -> Result<bool, PromptError> {
        let mut out = Vec::new();
        confirm_with(&mut Cursor::new(input), &mut out, "Continue?", default)
    }

    #[test]
    fn empty_answer_takes_default() {
        assert!(answer("\n", true).unwrap());
        assert!(!answer("\n", false).unwrap());
    }

    #[test]
    fn explicit_answers() {
        assert!(answer("y\n", false).unwrap());
        assert!(answer("YES\n", false).unwrap());
        assert!(!answer("n\n", true).unwrap());
        assert!(!answer(" no \n", true).unwrap());
    }

    #[test]
    fn unrecognised_answer_asks_again() {
        let mut out = Vec::new();
        let result = confirm_with(&mut Cursor::new("maybe\ny\n"), &mut out, "Continue?", false);
        assert!(result.unwrap());

        let shown = String::from_utf8(out).unwrap();
        assert_eq!(shown.matches("Continue? (y/N) [n]: ").count(), 2);
    }

    #[test]
    fn end_of_input_cancels() {
        assert!(matches!(answer("", true), Err(PromptError::Cancelled)));
    }
}
