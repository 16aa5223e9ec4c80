//! engine
//!
//! Resolve a source pull request, validate targets, and replicate.
//!
//! # Flow
//!
//! ```text
//! parse -> resolve -> validate targets -> replicate (per target, in order)
//! ```
//!
//! Every stage talks to the remote only through [`crate::forge::Forge`].
//! Nothing is cached or persisted between runs.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pr_bullet::engine::{resolve_pull_request, validate_target, Replicator};
//!
//! let resolved = resolve_pull_request(forge.as_ref(), &source, 12).await?;
//! let target = validate_target(forge.as_ref(), "acme/widgets-mirror").await?;
//! let results = Replicator::new(forge)
//!     .replicate_all(&[target], &resolved.summary, &resolved.files, |_| {})
//!     .await;
//! ```

pub mod replicate;
pub mod resolve;
pub mod validate;

pub use replicate::{ReplicationError, ReplicationEvent, ReplicationStep, Replicator};
pub use resolve::{
    resolve_pull_request, FetchStep, ResolveError, ResolvedPullRequest, MAX_FILES_PER_PAGE,
};
pub use validate::{validate_target, ValidationError};
