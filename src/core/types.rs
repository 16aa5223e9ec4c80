//! core::types
//!
//! Value types shared by the resolver and the replication engine.
//!
//! # Types
//!
//! - [`RepositoryRef`] - Owner/name pair identifying a repository
//! - [`PullRequestIdentifier`] - Repository plus optional PR number
//! - [`PullRequestFile`] - One resolved file of a source pull request
//! - [`PullRequestSummary`] - Snapshot of the source pull request
//! - [`ReplicationResult`] - Outcome of replicating into one target
//!
//! None of these are persisted; they live for a single run.

use std::fmt;

use crate::engine::ReplicationError;

/// Prefix for branch references.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Build the fully qualified ref name for a branch.
///
/// # Example
///
/// ```
/// use pr_bullet::core::types::branch_ref;
///
/// assert_eq!(branch_ref("main"), "refs/heads/main");
/// ```
pub fn branch_ref(branch: &str) -> String {
    format!("{}{}", BRANCH_REF_PREFIX, branch)
}

/// Identifies a repository on the forge.
///
/// Equality is by `(owner, name)`; case is preserved exactly as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    /// User or organization that owns the repository
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepositoryRef {
    /// Create a repository reference.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A parsed repository or pull request identifier.
///
/// `number == 0` means the input named a bare repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestIdentifier {
    /// The repository part
    pub repo: RepositoryRef,
    /// Pull request number, or 0 for a bare repository
    pub number: u64,
}

impl PullRequestIdentifier {
    /// Whether this identifier names a specific pull request.
    pub fn is_pull_request(&self) -> bool {
        self.number != 0
    }
}

/// A file of the source pull request, ready to be re-uploaded as a blob.
///
/// `content` is kept in its transfer encoding (see `encoding`), exactly as
/// the forge returned it, so it can be handed back without re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestFile {
    /// Path relative to the repository root; unique within a pull request
    pub path: String,
    /// Git file mode, e.g. `100644`
    pub file_mode: String,
    /// Git object type, e.g. `blob`
    pub object_type: String,
    /// Encoded content
    pub content: Option<String>,
    /// Content transfer encoding, e.g. `base64`
    pub encoding: String,
    /// Decoded size in bytes
    pub size: u64,
}

impl PullRequestFile {
    /// Create an empty placeholder for a changed path.
    pub fn placeholder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_mode: String::new(),
            object_type: String::new(),
            content: None,
            encoding: String::new(),
            size: 0,
        }
    }

    /// Whether the tree walk has filled in this entry.
    pub fn is_resolved(&self) -> bool {
        !self.file_mode.is_empty() && !self.object_type.is_empty() && self.content.is_some()
    }
}

/// Snapshot of the source pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummary {
    /// PR title (becomes commit message and new PR title)
    pub title: String,
    /// PR body (becomes new PR body)
    pub body: String,
    /// Head branch name (becomes the new branch name)
    pub head_ref: String,
    /// Owner of the head repository
    pub head_owner: String,
    /// Name of the head repository
    pub head_repo_name: String,
    /// Login of the user who owns the head branch
    pub head_author_login: String,
    /// PR number
    pub number: u64,
}

/// A pull request opened in a target repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatedPullRequest {
    /// Web URL of the new pull request
    pub url: String,
    /// Whether it was opened as a draft
    pub is_draft: bool,
}

/// Outcome of replicating into a single target.
#[derive(Debug)]
pub struct ReplicationResult {
    /// The target repository
    pub target: RepositoryRef,
    /// The new pull request, or why it could not be created
    pub outcome: Result<ReplicatedPullRequest, ReplicationError>,
}

impl ReplicationResult {
    /// Whether this target was replicated successfully.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
