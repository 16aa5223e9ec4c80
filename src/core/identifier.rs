//! core::identifier
//!
//! Parse repository and pull request identifiers out of URL-like strings.
//!
//! # Accepted Shapes
//!
//! Only the path of the input matters, so the host is free:
//!
//! - `https://github.com/owner/repo` or `owner/repo` -> repository
//! - `https://github.com/owner/repo/pull/12` or `owner/repo/pull/12` -> pull request
//!
//! Anything else is a [`ParseError`]. Parsing never touches the network and
//! never panics.
//!
//! # Example
//!
//! ```
//! use pr_bullet::core::identifier::parse;
//!
//! let id = parse("https://github.com/acme/widgets/pull/12").unwrap();
//! assert_eq!(id.repo.owner, "acme");
//! assert_eq!(id.repo.name, "widgets");
//! assert_eq!(id.number, 12);
//!
//! let repo = parse("acme/widgets-mirror").unwrap();
//! assert_eq!(repo.number, 0);
//!
//! assert!(parse("acme").is_err());
//! ```

use std::borrow::Cow;

use thiserror::Error;
use url::Url;

use super::types::{PullRequestIdentifier, RepositoryRef};

/// The input could not be read as a repository or pull request identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse: {input}")]
pub struct ParseError {
    /// The offending input, verbatim
    pub input: String,
}

impl ParseError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

/// Parse an identifier into a repository and optional pull request number.
///
/// # Errors
///
/// Returns [`ParseError`] unless the path has exactly two segments
/// (`owner/repo`) or four segments of the form `owner/repo/pull/<n>`.
pub fn parse(input: &str) -> Result<PullRequestIdentifier, ParseError> {
    let path = extract_path(input).ok_or_else(|| ParseError::new(input))?;
    let path = path.strip_prefix('/').unwrap_or(&path);
    let segments: Vec<&str> = path.split('/').collect();

    let (owner, name, number) = match segments.as_slice() {
        [owner, name] => (*owner, *name, 0),
        [owner, name, "pull", number] => {
            let number = number
                .parse::<u64>()
                .map_err(|_| ParseError::new(input))?;
            (*owner, *name, number)
        }
        _ => return Err(ParseError::new(input)),
    };

    if owner.is_empty() || name.is_empty() {
        return Err(ParseError::new(input));
    }

    Ok(PullRequestIdentifier {
        repo: RepositoryRef::new(owner, name),
        number,
    })
}

/// Pull the path component out of an absolute URL or a bare path.
fn extract_path(input: &str) -> Option<Cow<'_, str>> {
    match Url::parse(input) {
        Ok(url) => Some(Cow::Owned(url.path().to_string())),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = input.split(['?', '#']).next().unwrap_or_default();
            Some(Cow::Borrowed(path))
        }
        Err(_) => None,
    }
}
