//! engine::resolve
//!
//! Turn a source pull request into a summary plus a fully populated file set.
//!
//! Resolution runs in two phases. The changed-file listing seeds one
//! placeholder per path; the recursive tree walk at the head commit then
//! fills in mode, type, size and blob content for every seeded path. Tree
//! entries that were not changed are ignored.
//!
//! A changed path that never shows up in the tree (a deleted file, a
//! directory) fails resolution with [`ResolveError::MissingTreeEntry`], and
//! a changed path whose entry is not a blob (a submodule) fails with
//! [`ResolveError::UnsupportedEntry`]. Nothing partial is returned.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info};
use thiserror::Error;

use crate::core::types::{PullRequestFile, PullRequestSummary, RepositoryRef};
use crate::forge::{Forge, ForgeError};

/// Largest page the forge will return when listing pull request files.
///
/// Pull requests with more changed files than this are not supported.
pub const MAX_FILES_PER_PAGE: u32 = 100;

/// The remote read that failed during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStep {
    PullRequest,
    ChangedFiles,
    Tree,
    Blob(String),
}

impl fmt::Display for FetchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStep::PullRequest => write!(f, "fetch pull request"),
            FetchStep::ChangedFiles => write!(f, "list changed files"),
            FetchStep::Tree => write!(f, "fetch head tree"),
            FetchStep::Blob(path) => write!(f, "fetch blob for {}", path),
        }
    }
}

/// Errors from pull request resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A remote read failed.
    #[error("failed to {step}: {source}")]
    Fetch {
        step: FetchStep,
        #[source]
        source: ForgeError,
    },

    /// A changed path has no entry in the head tree.
    #[error("not found: {0}")]
    MissingTreeEntry(String),

    /// A changed path is not backed by a blob.
    #[error("unsupported tree entry '{path}' of type '{kind}'")]
    UnsupportedEntry { path: String, kind: String },
}

impl ResolveError {
    fn fetch(step: FetchStep) -> impl FnOnce(ForgeError) -> Self {
        move |source| ResolveError::Fetch { step, source }
    }
}

/// A resolved source pull request.
#[derive(Debug, Clone)]
pub struct ResolvedPullRequest {
    /// Snapshot of the pull request metadata
    pub summary: PullRequestSummary,
    /// Changed files with content; order carries no meaning
    pub files: Vec<PullRequestFile>,
}

/// Resolve a pull request into its summary and changed files.
///
/// # Errors
///
/// Any failed remote read aborts resolution with [`ResolveError::Fetch`].
/// See the module docs for the tree-entry failures.
pub async fn resolve_pull_request(
    forge: &dyn Forge,
    repo: &RepositoryRef,
    number: u64,
) -> Result<ResolvedPullRequest, ResolveError> {
    info!("resolving {}#{}", repo, number);

    let pr = forge
        .get_pull_request(repo, number)
        .await
        .map_err(ResolveError::fetch(FetchStep::PullRequest))?;

    let changed = forge
        .list_pull_request_files(repo, number, MAX_FILES_PER_PAGE)
        .await
        .map_err(ResolveError::fetch(FetchStep::ChangedFiles))?;
    debug!("{}#{} changes {} file(s)", repo, number, changed.len());

    let tree = forge
        .get_tree(repo, &pr.head.sha, true)
        .await
        .map_err(ResolveError::fetch(FetchStep::Tree))?;

    // Phase 1: one placeholder per changed path.
    let mut files: BTreeMap<String, PullRequestFile> = changed
        .into_iter()
        .map(|path| (path.clone(), PullRequestFile::placeholder(path)))
        .collect();

    // Phase 2: enrich from the tree walk.
    for entry in tree {
        let Some(file) = files.get_mut(&entry.path) else {
            continue;
        };

        if entry.kind != "blob" {
            return Err(ResolveError::UnsupportedEntry {
                path: entry.path,
                kind: entry.kind,
            });
        }

        let blob = forge
            .get_blob(repo, &entry.sha)
            .await
            .map_err(ResolveError::fetch(FetchStep::Blob(entry.path.clone())))?;

        file.file_mode = entry.mode;
        file.object_type = entry.kind;
        file.size = entry.size.unwrap_or(0);
        file.content = Some(blob.content);
        file.encoding = blob.encoding;
    }

    if let Some(missing) = files.values().find(|f| !f.is_resolved()) {
        return Err(ResolveError::MissingTreeEntry(missing.path.clone()));
    }

    let summary = PullRequestSummary {
        title: pr.title,
        body: pr.body.unwrap_or_default(),
        head_ref: pr.head.ref_name,
        head_owner: pr.head.repo_owner,
        head_repo_name: pr.head.repo_name,
        head_author_login: pr.head.user_login,
        number: pr.number,
    };

    Ok(ResolvedPullRequest {
        summary,
        files: files.into_values().collect(),
    })
}
