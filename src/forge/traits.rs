//! forge::traits
//!
//! Forge trait definition for the repository, git-object and pull-request
//! primitives the replication engine needs.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is network I/O.
//! Unlike a per-repository client, each method takes the repository it
//! acts on, so one forge instance serves the source and every target.
//!
//! # Example
//!
//! ```ignore
//! use pr_bullet::core::types::RepositoryRef;
//! use pr_bullet::forge::{Forge, ForgeError};
//!
//! async fn default_branch(forge: &dyn Forge) -> Result<String, ForgeError> {
//!     let repo = forge.get_repository(&RepositoryRef::new("acme", "widgets")).await?;
//!     Ok(repo.default_branch)
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::RepositoryRef;

/// Errors from forge operations.
///
/// These error types map to common failure modes when interacting
/// with remote hosting services like GitHub.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForgeError {
    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error, including timeouts.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Head of a source pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestHead {
    /// Branch name
    pub ref_name: String,
    /// Commit SHA the branch points at
    pub sha: String,
    /// Owner of the head repository
    pub repo_owner: String,
    /// Name of the head repository
    pub repo_name: String,
    /// Login of the head's user
    pub user_login: String,
}

/// Pull request metadata returned by [`Forge::get_pull_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDetails {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR body, if any
    pub body: Option<String>,
    /// Head branch information
    pub head: PullRequestHead,
}

/// One entry of a recursive git tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Path relative to the repository root
    pub path: String,
    /// Git file mode
    pub mode: String,
    /// Object type (`blob`, `tree`, `commit`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Object SHA
    pub sha: String,
    /// Size in bytes (blobs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Blob contents as returned by the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Encoded content
    pub content: String,
    /// Content transfer encoding (`base64` or `utf-8`)
    pub encoding: String,
}

/// Request to create a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlob {
    /// Encoded content
    pub content: String,
    /// Content transfer encoding
    pub encoding: String,
    /// Decoded size in bytes
    pub size: u64,
}

/// An entry to place in a new tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTreeEntry {
    /// Path relative to the repository root
    pub path: String,
    /// Git file mode
    pub mode: String,
    /// Object type
    #[serde(rename = "type")]
    pub kind: String,
    /// SHA of the object the entry points at
    pub sha: String,
}

/// Repository metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Name of the default branch
    pub default_branch: String,
    /// Visibility (`public`, `private`, `internal`)
    pub visibility: String,
}

impl Repository {
    /// Whether the repository is private.
    pub fn is_private(&self) -> bool {
        self.visibility == "private"
    }
}

/// The object a ref points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitObject {
    /// Object SHA
    pub sha: String,
    /// Object type, normally `commit`
    pub kind: String,
}

/// A git reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    /// Fully qualified ref name, e.g. `refs/heads/main`
    pub ref_name: String,
    /// API URL of the ref
    pub url: String,
    /// Object the ref points at
    pub object: GitObject,
}

/// A git commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Commit SHA
    pub sha: String,
    /// SHA of the commit's tree
    pub tree_sha: String,
}

/// Request to create a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit {
    /// Commit message
    pub message: String,
    /// Tree SHA
    pub tree: String,
    /// Parent commit SHAs
    pub parents: Vec<String>,
}

/// Request to create a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrRequest {
    /// Head branch name (the branch with changes)
    pub head: String,
    /// Base branch name (the branch to merge into)
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: Option<String>,
    /// Create as draft
    pub draft: bool,
}

/// A pull request created by [`Forge::create_pull_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL (web URL for viewing)
    pub url: String,
    /// Whether the PR is a draft
    pub is_draft: bool,
}

/// The Forge trait for interacting with a remote hosting service.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; blob uploads run on spawned tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Nothing is retried here;
/// callers decide what to do with a failure.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Fetch pull request metadata.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the PR doesn't exist
    async fn get_pull_request(
        &self,
        repo: &RepositoryRef,
        number: u64,
    ) -> Result<PullRequestDetails, ForgeError>;

    /// List the paths changed by a pull request.
    ///
    /// Only a single page of at most `per_page` files is returned.
    async fn list_pull_request_files(
        &self,
        repo: &RepositoryRef,
        number: u64,
        per_page: u32,
    ) -> Result<Vec<String>, ForgeError>;

    /// Fetch a git tree, optionally recursively.
    async fn get_tree(
        &self,
        repo: &RepositoryRef,
        sha: &str,
        recursive: bool,
    ) -> Result<Vec<TreeEntry>, ForgeError>;

    /// Fetch a blob by SHA.
    async fn get_blob(&self, repo: &RepositoryRef, sha: &str) -> Result<Blob, ForgeError>;

    /// Fetch repository metadata.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository doesn't exist or isn't visible
    async fn get_repository(&self, repo: &RepositoryRef) -> Result<Repository, ForgeError>;

    /// Resolve a fully qualified ref such as `refs/heads/main`.
    async fn get_ref(&self, repo: &RepositoryRef, ref_name: &str) -> Result<GitRef, ForgeError>;

    /// Create a new ref pointing at `sha`.
    ///
    /// # Errors
    ///
    /// - `ApiError` with status 422 if the ref already exists
    async fn create_ref(
        &self,
        repo: &RepositoryRef,
        ref_name: &str,
        sha: &str,
    ) -> Result<GitRef, ForgeError>;

    /// Create a blob and return its SHA.
    async fn create_blob(&self, repo: &RepositoryRef, blob: NewBlob)
        -> Result<String, ForgeError>;

    /// Create a tree on top of `base_tree` and return its SHA.
    async fn create_tree(
        &self,
        repo: &RepositoryRef,
        base_tree: &str,
        entries: Vec<NewTreeEntry>,
    ) -> Result<String, ForgeError>;

    /// Fetch a commit by SHA.
    async fn get_commit(&self, repo: &RepositoryRef, sha: &str) -> Result<Commit, ForgeError>;

    /// Create a commit and return its SHA.
    async fn create_commit(
        &self,
        repo: &RepositoryRef,
        commit: NewCommit,
    ) -> Result<String, ForgeError>;

    /// Move a ref to `sha`, optionally without requiring a fast-forward.
    async fn update_ref(
        &self,
        repo: &RepositoryRef,
        ref_name: &str,
        sha: &str,
        force: bool,
    ) -> Result<GitRef, ForgeError>;

    /// Open a pull request.
    ///
    /// # Errors
    ///
    /// - `ApiError` with status 422 if validation fails (e.g., head doesn't exist)
    async fn create_pull_request(
        &self,
        repo: &RepositoryRef,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError>;
}
