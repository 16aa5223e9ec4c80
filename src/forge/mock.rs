//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge keeps a small content-addressed object store per
//! repository (blobs, flat trees, commits, refs) plus seeded and created
//! pull requests. Object ids are derived from content, so uploading the
//! same bytes twice yields the same SHA just like a real forge.
//!
//! Behaviour mirrors GitHub where the engine depends on it:
//! - `create_ref` fails with 422 if the ref already exists
//! - `update_ref` without `force` requires a fast-forward
//! - `create_tree` requires the base tree and every entry's blob to exist
//!
//! Trees are stored flat (path -> entry); directory entries are not modelled.
//!
//! # Example
//!
//! ```
//! use pr_bullet::core::types::RepositoryRef;
//! use pr_bullet::forge::mock::MockForge;
//! use pr_bullet::forge::Forge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//! let repo = RepositoryRef::new("acme", "widgets");
//! forge.seed_repository(&repo, "main", "public");
//!
//! let info = forge.get_repository(&repo).await.unwrap();
//! assert_eq!(info.default_branch, "main");
//! # });
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::traits::{
    Blob, Commit, CreatePrRequest, Forge, ForgeError, GitObject, GitRef, NewBlob, NewCommit,
    NewTreeEntry, PullRequest, PullRequestDetails, PullRequestHead, Repository, TreeEntry,
};
use crate::core::types::{branch_ref, RepositoryRef};

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockForgeInner {
    /// Repositories by owner/name.
    repos: HashMap<RepositoryRef, MockRepo>,
    /// Operation to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// State of one mock repository.
#[derive(Debug)]
struct MockRepo {
    info: Repository,
    refs: HashMap<String, String>,
    blobs: HashMap<String, Blob>,
    trees: HashMap<String, BTreeMap<String, NewTreeEntry>>,
    commits: HashMap<String, MockCommit>,
    pulls: HashMap<u64, SeededPull>,
    created_pulls: Vec<CreatedPullRequest>,
    next_pr_number: u64,
}

/// A seeded source pull request.
#[derive(Debug, Clone)]
struct SeededPull {
    details: PullRequestDetails,
    changed_files: Vec<String>,
}

/// A commit stored by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCommit {
    /// Commit message
    pub message: String,
    /// Tree SHA
    pub tree: String,
    /// Parent commit SHAs
    pub parents: Vec<String>,
}

/// A pull request opened through [`Forge::create_pull_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPullRequest {
    /// Assigned number
    pub number: u64,
    /// Web URL
    pub url: String,
    /// Head branch
    pub head: String,
    /// Base branch
    pub base: String,
    /// Title
    pub title: String,
    /// Body
    pub body: Option<String>,
    /// Draft flag as requested
    pub draft: bool,
}

/// A file to place in a seeded pull request head tree.
#[derive(Debug, Clone)]
pub struct SeedFile {
    /// Path
    pub path: String,
    /// Git file mode
    pub mode: String,
    /// Object type; non-`blob` types are stored with a dangling SHA
    pub kind: String,
    /// Raw content
    pub content: String,
}

impl SeedFile {
    /// A regular `100644` blob.
    pub fn blob(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: "100644".into(),
            kind: "blob".into(),
            content: content.into(),
        }
    }
}

/// Description of a source pull request to seed.
#[derive(Debug, Clone)]
pub struct PullRequestSeed {
    /// PR number
    pub number: u64,
    /// Title
    pub title: String,
    /// Body
    pub body: Option<String>,
    /// Head branch name
    pub head_ref: String,
    /// Head user login
    pub user_login: String,
    /// Paths reported as changed
    pub changed_files: Vec<String>,
    /// Full head tree
    pub tree: Vec<SeedFile>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetPullRequest(ForgeError),
    ListPullRequestFiles(ForgeError),
    GetTree(ForgeError),
    GetBlob(ForgeError),
    GetRepository(ForgeError),
    GetRef(ForgeError),
    CreateRef(ForgeError),
    CreateBlob(ForgeError),
    CreateTree(ForgeError),
    GetCommit(ForgeError),
    CreateCommit(ForgeError),
    UpdateRef(ForgeError),
    CreatePullRequest(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetPullRequest {
        repo: RepositoryRef,
        number: u64,
    },
    ListPullRequestFiles {
        repo: RepositoryRef,
        number: u64,
        per_page: u32,
    },
    GetTree {
        repo: RepositoryRef,
        sha: String,
        recursive: bool,
    },
    GetBlob {
        repo: RepositoryRef,
        sha: String,
    },
    GetRepository {
        repo: RepositoryRef,
    },
    GetRef {
        repo: RepositoryRef,
        ref_name: String,
    },
    CreateRef {
        repo: RepositoryRef,
        ref_name: String,
        sha: String,
    },
    CreateBlob {
        repo: RepositoryRef,
        content: String,
        encoding: String,
        size: u64,
    },
    CreateTree {
        repo: RepositoryRef,
        base_tree: String,
        entries: Vec<NewTreeEntry>,
    },
    GetCommit {
        repo: RepositoryRef,
        sha: String,
    },
    CreateCommit {
        repo: RepositoryRef,
        message: String,
        tree: String,
        parents: Vec<String>,
    },
    UpdateRef {
        repo: RepositoryRef,
        ref_name: String,
        sha: String,
        force: bool,
    },
    CreatePullRequest {
        repo: RepositoryRef,
        head: String,
        base: String,
        title: String,
        draft: bool,
    },
}

impl MockOperation {
    /// Whether this operation writes to the forge.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            MockOperation::CreateRef { .. }
                | MockOperation::CreateBlob { .. }
                | MockOperation::CreateTree { .. }
                | MockOperation::CreateCommit { .. }
                | MockOperation::UpdateRef { .. }
                | MockOperation::CreatePullRequest { .. }
        )
    }
}

/// Derive a 40-hex object id from typed content.
fn object_id(kind: &str, data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    hasher.update(data);
    hex::encode(&hasher.finalize()[..20])
}

fn tree_id(entries: &BTreeMap<String, NewTreeEntry>) -> String {
    let serialized: String = entries
        .values()
        .map(|e| format!("{} {} {} {}\n", e.mode, e.kind, e.sha, e.path))
        .collect();
    object_id("tree", serialized.as_bytes())
}

fn commit_id(commit: &MockCommit) -> String {
    let serialized = format!(
        "tree {}\nparents {}\n\n{}",
        commit.tree,
        commit.parents.join(" "),
        commit.message
    );
    object_id("commit", serialized.as_bytes())
}

fn unprocessable(message: impl Into<String>) -> ForgeError {
    ForgeError::ApiError {
        status: 422,
        message: message.into(),
    }
}

impl MockRepo {
    fn new(default_branch: &str, visibility: &str) -> Self {
        let mut repo = Self {
            info: Repository {
                default_branch: default_branch.to_string(),
                visibility: visibility.to_string(),
            },
            refs: HashMap::new(),
            blobs: HashMap::new(),
            trees: HashMap::new(),
            commits: HashMap::new(),
            pulls: HashMap::new(),
            created_pulls: Vec::new(),
            next_pr_number: 1,
        };

        let tree = repo.store_tree(BTreeMap::new());
        let root = repo.store_commit(MockCommit {
            message: "Initial commit".into(),
            tree,
            parents: Vec::new(),
        });
        repo.refs.insert(branch_ref(default_branch), root);
        repo
    }

    fn store_blob(&mut self, blob: Blob) -> String {
        let sha = object_id("blob", format!("{}:{}", blob.encoding, blob.content).as_bytes());
        self.blobs.insert(sha.clone(), blob);
        sha
    }

    fn store_tree(&mut self, entries: BTreeMap<String, NewTreeEntry>) -> String {
        let sha = tree_id(&entries);
        self.trees.insert(sha.clone(), entries);
        sha
    }

    fn store_commit(&mut self, commit: MockCommit) -> String {
        let sha = commit_id(&commit);
        self.commits.insert(sha.clone(), commit);
        sha
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        let mut stack = vec![descendant.to_string()];
        while let Some(sha) = stack.pop() {
            if sha == ancestor {
                return true;
            }
            if let Some(commit) = self.commits.get(&sha) {
                stack.extend(commit.parents.iter().cloned());
            }
        }
        false
    }

    fn git_ref(&self, repo: &RepositoryRef, ref_name: &str, sha: &str) -> GitRef {
        GitRef {
            ref_name: ref_name.to_string(),
            url: format!(
                "https://api.github.com/repos/{}/{}/git/{}",
                repo.owner, repo.name, ref_name
            ),
            object: GitObject {
                sha: sha.to_string(),
                kind: "commit".into(),
            },
        }
    }
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository with an initial empty commit on `default_branch`.
    ///
    /// Returns the SHA of that initial commit.
    pub fn seed_repository(
        &self,
        repo: &RepositoryRef,
        default_branch: &str,
        visibility: &str,
    ) -> String {
        let mut inner = self.inner.lock().unwrap();
        let mock = MockRepo::new(default_branch, visibility);
        let head = mock.refs[&branch_ref(default_branch)].clone();
        inner.repos.insert(repo.clone(), mock);
        head
    }

    /// Add a commit on `branch` containing `files` on top of its current tree.
    ///
    /// Returns the new commit SHA. Panics if the repository or branch is unknown.
    pub fn seed_commit(&self, repo: &RepositoryRef, branch: &str, files: Vec<SeedFile>) -> String {
        let mut inner = self.inner.lock().unwrap();
        let mock = inner.repos.get_mut(repo).expect("repository not seeded");
        let ref_name = branch_ref(branch);
        let parent = mock.refs.get(&ref_name).expect("branch not seeded").clone();
        let mut entries = mock.trees[&mock.commits[&parent].tree].clone();

        for file in files {
            let sha = mock.store_blob(Blob {
                content: file.content,
                encoding: "utf-8".into(),
            });
            entries.insert(
                file.path.clone(),
                NewTreeEntry {
                    path: file.path,
                    mode: file.mode,
                    kind: file.kind,
                    sha,
                },
            );
        }

        let tree = mock.store_tree(entries);
        let sha = mock.store_commit(MockCommit {
            message: "Seed commit".into(),
            tree,
            parents: vec![parent],
        });
        mock.refs.insert(ref_name, sha.clone());
        sha
    }

    /// Register a source pull request whose head tree is `seed.tree`.
    ///
    /// The repository must already be seeded. Non-`blob` files get an
    /// object SHA that does not resolve to any blob.
    pub fn seed_pull_request(&self, repo: &RepositoryRef, seed: PullRequestSeed) {
        let mut inner = self.inner.lock().unwrap();
        let mock = inner.repos.get_mut(repo).expect("repository not seeded");

        let mut entries = BTreeMap::new();
        for file in seed.tree {
            let sha = if file.kind == "blob" {
                mock.store_blob(Blob {
                    content: file.content,
                    encoding: "utf-8".into(),
                })
            } else {
                object_id(&file.kind, file.content.as_bytes())
            };
            entries.insert(
                file.path.clone(),
                NewTreeEntry {
                    path: file.path,
                    mode: file.mode,
                    kind: file.kind,
                    sha,
                },
            );
        }
        let tree = mock.store_tree(entries);
        let head_sha = mock.store_commit(MockCommit {
            message: seed.title.clone(),
            tree,
            parents: Vec::new(),
        });
        mock.refs.insert(branch_ref(&seed.head_ref), head_sha.clone());

        let details = PullRequestDetails {
            number: seed.number,
            title: seed.title,
            body: seed.body,
            head: PullRequestHead {
                ref_name: seed.head_ref,
                sha: head_sha,
                repo_owner: repo.owner.clone(),
                repo_name: repo.name.clone(),
                user_login: seed.user_login,
            },
        };
        mock.pulls.insert(
            seed.number,
            SeededPull {
                details,
                changed_files: seed.changed_files,
            },
        );
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use pr_bullet::forge::mock::{MockForge, FailOn};
    /// use pr_bullet::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreateBlob(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.set_fail_on(fail_on);
        self
    }

    /// Configure a failure on an existing (possibly shared) mock.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = Some(fail_on);
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Recorded operations against one repository.
    pub fn operations_for(&self, repo: &RepositoryRef) -> Vec<MockOperation> {
        self.operations()
            .into_iter()
            .filter(|op| op_repo(op) == repo)
            .collect()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// Commit SHA a ref points at.
    pub fn ref_target(&self, repo: &RepositoryRef, ref_name: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.repos.get(repo)?.refs.get(ref_name).cloned()
    }

    /// A stored commit.
    pub fn commit(&self, repo: &RepositoryRef, sha: &str) -> Option<MockCommit> {
        let inner = self.inner.lock().unwrap();
        inner.repos.get(repo)?.commits.get(sha).cloned()
    }

    /// Entries of a stored tree, sorted by path.
    pub fn tree_entries(&self, repo: &RepositoryRef, sha: &str) -> Option<Vec<NewTreeEntry>> {
        let inner = self.inner.lock().unwrap();
        let tree = inner.repos.get(repo)?.trees.get(sha)?;
        Some(tree.values().cloned().collect())
    }

    /// A stored blob.
    pub fn blob(&self, repo: &RepositoryRef, sha: &str) -> Option<Blob> {
        let inner = self.inner.lock().unwrap();
        inner.repos.get(repo)?.blobs.get(sha).cloned()
    }

    /// Pull requests opened in a repository.
    pub fn created_pull_requests(&self, repo: &RepositoryRef) -> Vec<CreatedPullRequest> {
        let inner = self.inner.lock().unwrap();
        inner
            .repos
            .get(repo)
            .map(|r| r.created_pulls.clone())
            .unwrap_or_default()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str) -> Result<(), ForgeError> {
        let inner = self.inner.lock().unwrap();
        let failure = match &inner.fail_on {
            Some(FailOn::GetPullRequest(e)) if expected == "get_pull_request" => e,
            Some(FailOn::ListPullRequestFiles(e)) if expected == "list_pull_request_files" => e,
            Some(FailOn::GetTree(e)) if expected == "get_tree" => e,
            Some(FailOn::GetBlob(e)) if expected == "get_blob" => e,
            Some(FailOn::GetRepository(e)) if expected == "get_repository" => e,
            Some(FailOn::GetRef(e)) if expected == "get_ref" => e,
            Some(FailOn::CreateRef(e)) if expected == "create_ref" => e,
            Some(FailOn::CreateBlob(e)) if expected == "create_blob" => e,
            Some(FailOn::CreateTree(e)) if expected == "create_tree" => e,
            Some(FailOn::GetCommit(e)) if expected == "get_commit" => e,
            Some(FailOn::CreateCommit(e)) if expected == "create_commit" => e,
            Some(FailOn::UpdateRef(e)) if expected == "update_ref" => e,
            Some(FailOn::CreatePullRequest(e)) if expected == "create_pull_request" => e,
            _ => return Ok(()),
        };
        Err(failure.clone())
    }

    /// Run `f` against a repository's state, or fail with `NotFound`.
    fn with_repo<T>(
        &self,
        repo: &RepositoryRef,
        f: impl FnOnce(&mut MockRepo) -> Result<T, ForgeError>,
    ) -> Result<T, ForgeError> {
        let mut inner = self.inner.lock().unwrap();
        let mock = inner
            .repos
            .get_mut(repo)
            .ok_or_else(|| ForgeError::NotFound(format!("repository {}", repo)))?;
        f(mock)
    }
}

fn op_repo(op: &MockOperation) -> &RepositoryRef {
    match op {
        MockOperation::GetPullRequest { repo, .. }
        | MockOperation::ListPullRequestFiles { repo, .. }
        | MockOperation::GetTree { repo, .. }
        | MockOperation::GetBlob { repo, .. }
        | MockOperation::GetRepository { repo }
        | MockOperation::GetRef { repo, .. }
        | MockOperation::CreateRef { repo, .. }
        | MockOperation::CreateBlob { repo, .. }
        | MockOperation::CreateTree { repo, .. }
        | MockOperation::GetCommit { repo, .. }
        | MockOperation::CreateCommit { repo, .. }
        | MockOperation::UpdateRef { repo, .. }
        | MockOperation::CreatePullRequest { repo, .. } => repo,
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_pull_request(
        &self,
        repo: &RepositoryRef,
        number: u64,
    ) -> Result<PullRequestDetails, ForgeError> {
        self.record(MockOperation::GetPullRequest {
            repo: repo.clone(),
            number,
        });
        self.check_fail("get_pull_request")?;

        self.with_repo(repo, |mock| {
            mock.pulls
                .get(&number)
                .map(|p| p.details.clone())
                .ok_or_else(|| ForgeError::NotFound(format!("PR #{}", number)))
        })
    }

    async fn list_pull_request_files(
        &self,
        repo: &RepositoryRef,
        number: u64,
        per_page: u32,
    ) -> Result<Vec<String>, ForgeError> {
        self.record(MockOperation::ListPullRequestFiles {
            repo: repo.clone(),
            number,
            per_page,
        });
        self.check_fail("list_pull_request_files")?;

        self.with_repo(repo, |mock| {
            let pull = mock
                .pulls
                .get(&number)
                .ok_or_else(|| ForgeError::NotFound(format!("PR #{}", number)))?;
            Ok(pull
                .changed_files
                .iter()
                .take(per_page as usize)
                .cloned()
                .collect())
        })
    }

    async fn get_tree(
        &self,
        repo: &RepositoryRef,
        sha: &str,
        recursive: bool,
    ) -> Result<Vec<TreeEntry>, ForgeError> {
        self.record(MockOperation::GetTree {
            repo: repo.clone(),
            sha: sha.to_string(),
            recursive,
        });
        self.check_fail("get_tree")?;

        self.with_repo(repo, |mock| {
            // A commit SHA resolves to its tree, as on GitHub.
            let tree_sha = mock
                .commits
                .get(sha)
                .map(|c| c.tree.clone())
                .unwrap_or_else(|| sha.to_string());
            let tree = mock
                .trees
                .get(&tree_sha)
                .ok_or_else(|| ForgeError::NotFound(format!("tree {}", sha)))?;

            Ok(tree
                .values()
                .map(|e| TreeEntry {
                    path: e.path.clone(),
                    mode: e.mode.clone(),
                    kind: e.kind.clone(),
                    sha: e.sha.clone(),
                    size: mock.blobs.get(&e.sha).map(|b| b.content.len() as u64),
                })
                .collect())
        })
    }

    async fn get_blob(&self, repo: &RepositoryRef, sha: &str) -> Result<Blob, ForgeError> {
        self.record(MockOperation::GetBlob {
            repo: repo.clone(),
            sha: sha.to_string(),
        });
        self.check_fail("get_blob")?;

        self.with_repo(repo, |mock| {
            mock.blobs
                .get(sha)
                .cloned()
                .ok_or_else(|| ForgeError::NotFound(format!("blob {}", sha)))
        })
    }

    async fn get_repository(&self, repo: &RepositoryRef) -> Result<Repository, ForgeError> {
        self.record(MockOperation::GetRepository { repo: repo.clone() });
        self.check_fail("get_repository")?;

        self.with_repo(repo, |mock| Ok(mock.info.clone()))
    }

    async fn get_ref(&self, repo: &RepositoryRef, ref_name: &str) -> Result<GitRef, ForgeError> {
        self.record(MockOperation::GetRef {
            repo: repo.clone(),
            ref_name: ref_name.to_string(),
        });
        self.check_fail("get_ref")?;

        self.with_repo(repo, |mock| {
            let sha = mock
                .refs
                .get(ref_name)
                .ok_or_else(|| ForgeError::NotFound(format!("ref {}", ref_name)))?;
            Ok(mock.git_ref(repo, ref_name, sha))
        })
    }

    async fn create_ref(
        &self,
        repo: &RepositoryRef,
        ref_name: &str,
        sha: &str,
    ) -> Result<GitRef, ForgeError> {
        self.record(MockOperation::CreateRef {
            repo: repo.clone(),
            ref_name: ref_name.to_string(),
            sha: sha.to_string(),
        });
        self.check_fail("create_ref")?;

        self.with_repo(repo, |mock| {
            if mock.refs.contains_key(ref_name) {
                return Err(unprocessable("Reference already exists"));
            }
            if !mock.commits.contains_key(sha) {
                return Err(unprocessable("Object does not exist"));
            }
            mock.refs.insert(ref_name.to_string(), sha.to_string());
            Ok(mock.git_ref(repo, ref_name, sha))
        })
    }

    async fn create_blob(
        &self,
        repo: &RepositoryRef,
        blob: NewBlob,
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::CreateBlob {
            repo: repo.clone(),
            content: blob.content.clone(),
            encoding: blob.encoding.clone(),
            size: blob.size,
        });
        self.check_fail("create_blob")?;

        self.with_repo(repo, |mock| {
            if blob.encoding != "utf-8" && blob.encoding != "base64" {
                return Err(unprocessable(format!(
                    "encoding '{}' is not supported",
                    blob.encoding
                )));
            }
            Ok(mock.store_blob(Blob {
                content: blob.content,
                encoding: blob.encoding,
            }))
        })
    }

    async fn create_tree(
        &self,
        repo: &RepositoryRef,
        base_tree: &str,
        entries: Vec<NewTreeEntry>,
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::CreateTree {
            repo: repo.clone(),
            base_tree: base_tree.to_string(),
            entries: entries.clone(),
        });
        self.check_fail("create_tree")?;

        self.with_repo(repo, |mock| {
            let mut tree = mock
                .trees
                .get(base_tree)
                .cloned()
                .ok_or_else(|| unprocessable("base_tree is not a valid tree oid"))?;

            for entry in entries {
                if entry.kind == "blob" && !mock.blobs.contains_key(&entry.sha) {
                    return Err(unprocessable(format!(
                        "tree.sha {} is not a valid blob",
                        entry.sha
                    )));
                }
                tree.insert(entry.path.clone(), entry);
            }

            Ok(mock.store_tree(tree))
        })
    }

    async fn get_commit(&self, repo: &RepositoryRef, sha: &str) -> Result<Commit, ForgeError> {
        self.record(MockOperation::GetCommit {
            repo: repo.clone(),
            sha: sha.to_string(),
        });
        self.check_fail("get_commit")?;

        self.with_repo(repo, |mock| {
            let commit = mock
                .commits
                .get(sha)
                .ok_or_else(|| ForgeError::NotFound(format!("commit {}", sha)))?;
            Ok(Commit {
                sha: sha.to_string(),
                tree_sha: commit.tree.clone(),
            })
        })
    }

    async fn create_commit(
        &self,
        repo: &RepositoryRef,
        commit: NewCommit,
    ) -> Result<String, ForgeError> {
        self.record(MockOperation::CreateCommit {
            repo: repo.clone(),
            message: commit.message.clone(),
            tree: commit.tree.clone(),
            parents: commit.parents.clone(),
        });
        self.check_fail("create_commit")?;

        self.with_repo(repo, |mock| {
            if !mock.trees.contains_key(&commit.tree) {
                return Err(unprocessable("Tree SHA does not exist"));
            }
            if let Some(missing) = commit.parents.iter().find(|p| !mock.commits.contains_key(*p)) {
                return Err(unprocessable(format!("Parent SHA {} does not exist", missing)));
            }
            Ok(mock.store_commit(MockCommit {
                message: commit.message,
                tree: commit.tree,
                parents: commit.parents,
            }))
        })
    }

    async fn update_ref(
        &self,
        repo: &RepositoryRef,
        ref_name: &str,
        sha: &str,
        force: bool,
    ) -> Result<GitRef, ForgeError> {
        self.record(MockOperation::UpdateRef {
            repo: repo.clone(),
            ref_name: ref_name.to_string(),
            sha: sha.to_string(),
            force,
        });
        self.check_fail("update_ref")?;

        self.with_repo(repo, |mock| {
            let current = mock
                .refs
                .get(ref_name)
                .cloned()
                .ok_or_else(|| unprocessable("Reference does not exist"))?;
            if !mock.commits.contains_key(sha) {
                return Err(unprocessable("Object does not exist"));
            }
            if !force && !mock.is_ancestor(&current, sha) {
                return Err(unprocessable("Update is not a fast forward"));
            }
            mock.refs.insert(ref_name.to_string(), sha.to_string());
            Ok(mock.git_ref(repo, ref_name, sha))
        })
    }

    async fn create_pull_request(
        &self,
        repo: &RepositoryRef,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::CreatePullRequest {
            repo: repo.clone(),
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
            draft: request.draft,
        });
        self.check_fail("create_pull_request")?;

        self.with_repo(repo, |mock| {
            for branch in [&request.head, &request.base] {
                if !mock.refs.contains_key(&branch_ref(branch)) {
                    return Err(unprocessable(format!("branch {} does not exist", branch)));
                }
            }

            let number = mock.next_pr_number;
            mock.next_pr_number += 1;
            let url = format!("https://github.com/{}/{}/pull/{}", repo.owner, repo.name, number);

            mock.created_pulls.push(CreatedPullRequest {
                number,
                url: url.clone(),
                head: request.head,
                base: request.base,
                title: request.title,
                body: request.body,
                draft: request.draft,
            });

            Ok(PullRequest {
                number,
                url,
                is_draft: request.draft,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("acme", "widgets")
    }

    #[test]
    fn object_ids_are_content_addressed() {
        assert_eq!(object_id("blob", b"hello"), object_id("blob", b"hello"));
        assert_ne!(object_id("blob", b"hello"), object_id("blob", b"world"));
        assert_ne!(object_id("blob", b"hello"), object_id("tree", b"hello"));
        assert_eq!(object_id("blob", b"hello").len(), 40);
    }

    #[tokio::test]
    async fn seeded_repository_has_default_branch() {
        let forge = MockForge::new();
        let root = forge.seed_repository(&repo(), "main", "public");

        let git_ref = forge.get_ref(&repo(), "refs/heads/main").await.unwrap();
        assert_eq!(git_ref.object.sha, root);
        assert_eq!(git_ref.object.kind, "commit");
    }

    #[tokio::test]
    async fn unknown_repository_not_found() {
        let forge = MockForge::new();
        let result = forge.get_repository(&repo()).await;
        assert!(matches!(result, Err(ForgeError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_ref_rejects_existing() {
        let forge = MockForge::new();
        let root = forge.seed_repository(&repo(), "main", "public");

        let result = forge.create_ref(&repo(), "refs/heads/main", &root).await;
        assert!(matches!(result, Err(ForgeError::ApiError { status: 422, .. })));
    }

    #[tokio::test]
    async fn same_content_same_blob_sha() {
        let forge = MockForge::new();
        forge.seed_repository(&repo(), "main", "public");

        let blob = NewBlob {
            content: "hello".into(),
            encoding: "utf-8".into(),
            size: 5,
        };
        let a = forge.create_blob(&repo(), blob.clone()).await.unwrap();
        let b = forge.create_blob(&repo(), blob).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn create_blob_rejects_unknown_encoding() {
        let forge = MockForge::new();
        forge.seed_repository(&repo(), "main", "public");

        let result = forge
            .create_blob(
                &repo(),
                NewBlob {
                    content: "x".into(),
                    encoding: String::new(),
                    size: 1,
                },
            )
            .await;
        assert!(matches!(result, Err(ForgeError::ApiError { status: 422, .. })));
    }

    #[tokio::test]
    async fn create_tree_overlays_base() {
        let forge = MockForge::new();
        forge.seed_repository(&repo(), "main", "public");
        let head = forge.seed_commit(
            &repo(),
            "main",
            vec![SeedFile::blob("a.txt", "a"), SeedFile::blob("b.txt", "b")],
        );
        let base_tree = forge.commit(&repo(), &head).unwrap().tree;

        let sha = forge
            .create_blob(
                &repo(),
                NewBlob {
                    content: "b2".into(),
                    encoding: "utf-8".into(),
                    size: 2,
                },
            )
            .await
            .unwrap();
        let tree = forge
            .create_tree(
                &repo(),
                &base_tree,
                vec![NewTreeEntry {
                    path: "b.txt".into(),
                    mode: "100644".into(),
                    kind: "blob".into(),
                    sha: sha.clone(),
                }],
            )
            .await
            .unwrap();

        let entries = forge.tree_entries(&repo(), &tree).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].path, "b.txt");
        assert_eq!(entries[1].sha, sha);
    }

    #[tokio::test]
    async fn update_ref_requires_force_for_non_fast_forward() {
        let forge = MockForge::new();
        let root = forge.seed_repository(&repo(), "main", "public");
        let tree = forge.commit(&repo(), &root).unwrap().tree;

        let unrelated = forge
            .create_commit(
                &repo(),
                NewCommit {
                    message: "orphan".into(),
                    tree,
                    parents: vec![],
                },
            )
            .await
            .unwrap();

        let result = forge
            .update_ref(&repo(), "refs/heads/main", &unrelated, false)
            .await;
        assert!(matches!(result, Err(ForgeError::ApiError { status: 422, .. })));

        forge
            .update_ref(&repo(), "refs/heads/main", &unrelated, true)
            .await
            .unwrap();
        assert_eq!(
            forge.ref_target(&repo(), "refs/heads/main"),
            Some(unrelated)
        );
    }

    #[tokio::test]
    async fn create_pull_request_assigns_sequential_numbers() {
        let forge = MockForge::new();
        forge.seed_repository(&repo(), "main", "public");

        let request = CreatePrRequest {
            head: "main".into(),
            base: "main".into(),
            title: "Title".into(),
            body: None,
            draft: true,
        };
        let first = forge
            .create_pull_request(&repo(), request.clone())
            .await
            .unwrap();
        let second = forge.create_pull_request(&repo(), request).await.unwrap();

        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(first.url, "https://github.com/acme/widgets/pull/1");
        assert!(first.is_draft);
    }

    #[tokio::test]
    async fn create_pull_request_requires_head_branch() {
        let forge = MockForge::new();
        forge.seed_repository(&repo(), "main", "public");

        let result = forge
            .create_pull_request(
                &repo(),
                CreatePrRequest {
                    head: "missing".into(),
                    base: "main".into(),
                    title: "Title".into(),
                    body: None,
                    draft: false,
                },
            )
            .await;
        assert!(matches!(result, Err(ForgeError::ApiError { status: 422, .. })));
    }

    #[tokio::test]
    async fn fail_on_injects_error() {
        let forge = MockForge::new().fail_on(FailOn::GetRepository(ForgeError::RateLimited));
        forge.seed_repository(&repo(), "main", "public");

        let result = forge.get_repository(&repo()).await;
        assert!(matches!(result, Err(ForgeError::RateLimited)));

        forge.clear_fail_on();
        assert!(forge.get_repository(&repo()).await.is_ok());
    }

    #[tokio::test]
    async fn operations_recorded() {
        let forge = MockForge::new();
        forge.seed_repository(&repo(), "main", "public");
        forge.get_repository(&repo()).await.unwrap();

        let ops = forge.operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], MockOperation::GetRepository { .. }));
        assert!(!ops[0].is_write());
    }

    #[tokio::test]
    async fn seeded_pull_request_lists_files_and_tree() {
        let forge = MockForge::new();
        forge.seed_repository(&repo(), "main", "public");
        forge.seed_pull_request(
            &repo(),
            PullRequestSeed {
                number: 5,
                title: "Change".into(),
                body: None,
                head_ref: "change".into(),
                user_login: "octocat".into(),
                changed_files: vec!["a.txt".into()],
                tree: vec![SeedFile::blob("a.txt", "a"), SeedFile::blob("z.txt", "z")],
            },
        );

        let pr = forge.get_pull_request(&repo(), 5).await.unwrap();
        assert_eq!(pr.head.ref_name, "change");

        let files = forge.list_pull_request_files(&repo(), 5, 100).await.unwrap();
        assert_eq!(files, vec!["a.txt".to_string()]);

        let tree = forge.get_tree(&repo(), &pr.head.sha, true).await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].size, Some(1));
    }
}
