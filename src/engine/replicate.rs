//! engine::replicate
//!
//! Re-create a resolved pull request in target repositories.
//!
//! # Protocol
//!
//! For each target, strictly in order:
//!
//! 1. Fetch the repository (default branch, visibility)
//! 2. Resolve `refs/heads/<default>` and create `refs/heads/<head_ref>` at the same commit
//! 3. Fetch that commit; it becomes the sole parent
//! 4. Upload every file as a blob (concurrently, bounded)
//! 5. Create a tree over the parent's tree
//! 6. Create a commit titled after the source pull request
//! 7. Force-update the new branch to the commit
//! 8. Open a pull request into the default branch, draft unless the target is private
//!
//! Any failure stops that target. Artifacts already created on the target
//! stay there; nothing is rolled back. Nothing is retried.
//!
//! Targets are processed one after another and the run stops after the
//! first failing target.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::task::JoinSet;

use crate::core::config::DEFAULT_BLOB_CONCURRENCY;
use crate::core::types::{
    branch_ref, PullRequestFile, PullRequestSummary, ReplicatedPullRequest, ReplicationResult,
    RepositoryRef,
};
use crate::forge::{CreatePrRequest, Forge, ForgeError, NewBlob, NewCommit, NewTreeEntry};

/// The step of the replication protocol that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationStep {
    GetRepository,
    GetBaseRef(String),
    CreateBranch(String),
    GetParentCommit,
    UploadBlob(String),
    CreateTree,
    CreateCommit,
    UpdateRef(String),
    CreatePullRequest,
}

impl fmt::Display for ReplicationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicationStep::GetRepository => write!(f, "fetch repository"),
            ReplicationStep::GetBaseRef(r) => write!(f, "resolve {}", r),
            ReplicationStep::CreateBranch(r) => write!(f, "create {}", r),
            ReplicationStep::GetParentCommit => write!(f, "fetch parent commit"),
            ReplicationStep::UploadBlob(path) => write!(f, "upload blob for {}", path),
            ReplicationStep::CreateTree => write!(f, "create tree"),
            ReplicationStep::CreateCommit => write!(f, "create commit"),
            ReplicationStep::UpdateRef(r) => write!(f, "update {}", r),
            ReplicationStep::CreatePullRequest => write!(f, "open pull request"),
        }
    }
}

/// A target could not be replicated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{target}: failed to {step}: {source}")]
pub struct ReplicationError {
    /// The target being replicated
    pub target: RepositoryRef,
    /// The step that failed
    pub step: ReplicationStep,
    /// The forge error
    #[source]
    pub source: ForgeError,
}

/// Progress notifications from [`Replicator::replicate_all`].
#[derive(Debug)]
pub enum ReplicationEvent<'a> {
    /// Replication into this target is starting.
    Started(&'a RepositoryRef),
    /// Replication into a target finished.
    Finished(&'a ReplicationResult),
}

/// Replicates a resolved pull request into targets through a forge.
#[derive(Clone)]
pub struct Replicator {
    forge: Arc<dyn Forge>,
    blob_concurrency: usize,
}

impl fmt::Debug for Replicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replicator")
            .field("forge", &self.forge.name())
            .field("blob_concurrency", &self.blob_concurrency)
            .finish()
    }
}

impl Replicator {
    /// Create a replicator with the default blob concurrency.
    pub fn new(forge: Arc<dyn Forge>) -> Self {
        Self {
            forge,
            blob_concurrency: DEFAULT_BLOB_CONCURRENCY,
        }
    }

    /// Set the maximum number of blob uploads in flight; at least one.
    pub fn with_blob_concurrency(mut self, blob_concurrency: usize) -> Self {
        self.blob_concurrency = blob_concurrency.max(1);
        self
    }

    /// Replicate into each target in order, stopping after the first failure.
    ///
    /// The returned results cover every target that was attempted; targets
    /// after a failing one are not attempted and do not appear.
    pub async fn replicate_all(
        &self,
        targets: &[RepositoryRef],
        source: &PullRequestSummary,
        files: &[PullRequestFile],
        mut on_event: impl FnMut(ReplicationEvent<'_>),
    ) -> Vec<ReplicationResult> {
        let mut results = Vec::with_capacity(targets.len());

        for target in targets {
            on_event(ReplicationEvent::Started(target));
            let result = self.replicate(target, source, files).await;
            on_event(ReplicationEvent::Finished(&result));

            let failed = !result.is_success();
            results.push(result);
            if failed {
                let remaining = targets.len() - results.len();
                if remaining > 0 {
                    warn!("stopping; {} target(s) not attempted", remaining);
                }
                break;
            }
        }

        results
    }

    /// Replicate into a single target.
    pub async fn replicate(
        &self,
        target: &RepositoryRef,
        source: &PullRequestSummary,
        files: &[PullRequestFile],
    ) -> ReplicationResult {
        let outcome = self.run(target, source, files).await;
        match &outcome {
            Ok(pr) => info!("{}: opened {}", target, pr.url),
            Err(e) => warn!("{}", e),
        }
        ReplicationResult {
            target: target.clone(),
            outcome,
        }
    }

    async fn run(
        &self,
        target: &RepositoryRef,
        source: &PullRequestSummary,
        files: &[PullRequestFile],
    ) -> Result<ReplicatedPullRequest, ReplicationError> {
        let forge = self.forge.as_ref();
        let fail = |step: ReplicationStep| {
            let target = target.clone();
            move |source: ForgeError| ReplicationError {
                target,
                step,
                source,
            }
        };

        let repository = forge
            .get_repository(target)
            .await
            .map_err(fail(ReplicationStep::GetRepository))?;
        let base = repository.default_branch.clone();
        debug!(
            "{}: default branch {}, visibility {}",
            target, base, repository.visibility
        );

        // Branch off the tip of the default branch.
        let base_ref = branch_ref(&base);
        let base_tip = forge
            .get_ref(target, &base_ref)
            .await
            .map_err(fail(ReplicationStep::GetBaseRef(base_ref.clone())))?;

        let head_ref = branch_ref(&source.head_ref);
        let branch = forge
            .create_ref(target, &head_ref, &base_tip.object.sha)
            .await
            .map_err(fail(ReplicationStep::CreateBranch(head_ref.clone())))?;

        let parent = forge
            .get_commit(target, &branch.object.sha)
            .await
            .map_err(fail(ReplicationStep::GetParentCommit))?;

        let entries = self.upload_blobs(target, files).await?;

        let tree = forge
            .create_tree(target, &parent.tree_sha, entries)
            .await
            .map_err(fail(ReplicationStep::CreateTree))?;

        let commit = forge
            .create_commit(
                target,
                NewCommit {
                    message: source.title.clone(),
                    tree,
                    parents: vec![parent.sha],
                },
            )
            .await
            .map_err(fail(ReplicationStep::CreateCommit))?;

        // The branch starts at the base tip, so the move is not a fast-forward.
        forge
            .update_ref(target, &head_ref, &commit, true)
            .await
            .map_err(fail(ReplicationStep::UpdateRef(head_ref.clone())))?;

        let pr = forge
            .create_pull_request(
                target,
                CreatePrRequest {
                    head: source.head_ref.clone(),
                    base,
                    title: source.title.clone(),
                    body: Some(source.body.clone()).filter(|b| !b.is_empty()),
                    draft: !repository.is_private(),
                },
            )
            .await
            .map_err(fail(ReplicationStep::CreatePullRequest))?;

        Ok(ReplicatedPullRequest {
            url: pr.url,
            is_draft: pr.is_draft,
        })
    }

    /// Upload every file as a blob and return tree entries in file order.
    ///
    /// At most `blob_concurrency` uploads are in flight. The first failure
    /// aborts the uploads still running.
    async fn upload_blobs(
        &self,
        target: &RepositoryRef,
        files: &[PullRequestFile],
    ) -> Result<Vec<NewTreeEntry>, ReplicationError> {
        let mut shas: Vec<Option<String>> = vec![None; files.len()];
        let mut uploads = JoinSet::new();
        let mut pending = files.iter().enumerate();

        loop {
            while uploads.len() < self.blob_concurrency {
                let Some((index, file)) = pending.next() else {
                    break;
                };
                let forge = Arc::clone(&self.forge);
                let repo = target.clone();
                let blob = NewBlob {
                    content: file.content.clone().unwrap_or_default(),
                    encoding: file.encoding.clone(),
                    size: file.size,
                };
                uploads.spawn(async move { (index, forge.create_blob(&repo, blob).await) });
            }

            let Some(joined) = uploads.join_next().await else {
                break;
            };
            let (index, result) = match joined {
                Ok(done) => done,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    return Err(ReplicationError {
                        target: target.clone(),
                        step: ReplicationStep::UploadBlob(String::new()),
                        source: ForgeError::NetworkError(e.to_string()),
                    })
                }
            };

            match result {
                Ok(sha) => {
                    debug!("{}: uploaded {} as {}", target, files[index].path, sha);
                    shas[index] = Some(sha);
                }
                Err(source) => {
                    return Err(ReplicationError {
                        target: target.clone(),
                        step: ReplicationStep::UploadBlob(files[index].path.clone()),
                        source,
                    })
                }
            }
        }

        Ok(files
            .iter()
            .zip(shas)
            .filter_map(|(file, sha)| {
                sha.map(|sha| NewTreeEntry {
                    path: file.path.clone(),
                    mode: file.file_mode.clone(),
                    kind: file.object_type.clone(),
                    sha,
                })
            })
            .collect())
    }
}
