//! engine::validate
//!
//! Check that a user-supplied identifier names an existing repository.

use log::debug;
use thiserror::Error;

use crate::core::identifier::{self, ParseError};
use crate::core::types::RepositoryRef;
use crate::forge::{Forge, ForgeError};

/// Errors from target validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The identifier is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The identifier names a pull request, not a repository.
    #[error("invalid arg: {0}")]
    NotARepository(String),

    /// The repository could not be looked up.
    #[error("failed to look up {repo}: {source}")]
    Lookup {
        repo: RepositoryRef,
        #[source]
        source: ForgeError,
    },
}

/// Validate a replication target.
///
/// The identifier is parsed first and a pull request URL is rejected before
/// any network call; only then is the repository looked up.
pub async fn validate_target(
    forge: &dyn Forge,
    input: &str,
) -> Result<RepositoryRef, ValidationError> {
    let id = identifier::parse(input)?;
    if id.is_pull_request() {
        return Err(ValidationError::NotARepository(input.to_string()));
    }

    forge
        .get_repository(&id.repo)
        .await
        .map_err(|source| ValidationError::Lookup {
            repo: id.repo.clone(),
            source,
        })?;

    debug!("target {} exists", id.repo);
    Ok(id.repo)
}
