//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Design
//!
//! This module implements the `Forge` trait for GitHub (and GitHub
//! Enterprise via a custom API base). It uses:
//! - the Pulls API for pull request metadata, changed files and creation
//! - the Git Database API for trees, blobs, commits and refs
//! - the Repos API for default branch and visibility
//!
//! # Timeouts
//!
//! Every request carries a connect timeout and an overall request timeout,
//! both taken from [`Config`]. A timeout surfaces as
//! `ForgeError::NetworkError`.
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation:
//! - Returns `ForgeError::RateLimited` when limits are hit
//! - Does not retry anything (caller's responsibility)
//!
//! # Example
//!
//! ```ignore
//! use pr_bullet::core::config::Config;
//! use pr_bullet::forge::github::GitHubForge;
//!
//! let config = Config::load()?;
//! let forge = GitHubForge::from_config(&config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::traits::{
    Blob, Commit, CreatePrRequest, Forge, ForgeError, GitObject, GitRef, NewBlob, NewCommit,
    NewTreeEntry, PullRequest, PullRequestDetails, PullRequestHead, Repository, TreeEntry,
};
use crate::core::config::{
    Config, DEFAULT_API_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
use crate::core::types::RepositoryRef;

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("pr-bullet/", env!("CARGO_PKG_VERSION"));

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Bearer token
    token: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("has_token", &!self.token.is_empty())
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubForge {
    /// Create a GitHub forge with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::NetworkError` if the HTTP client cannot be built.
    pub fn new(
        token: impl Into<String>,
        api_base: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ForgeError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a GitHub forge for api.github.com with default timeouts.
    pub fn with_token(token: impl Into<String>) -> Result<Self, ForgeError> {
        Self::new(
            token,
            DEFAULT_API_URL,
            DEFAULT_CONNECT_TIMEOUT,
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    /// Create a GitHub forge from resolved configuration.
    pub fn from_config(config: &Config) -> Result<Self, ForgeError> {
        Self::new(
            config.token(),
            config.api_url(),
            config.connect_timeout(),
            config.request_timeout(),
        )
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a single-ref endpoint, percent-encoding each segment
    /// of the ref name.
    fn ref_url(
        &self,
        repo: &RepositoryRef,
        endpoint: &str,
        ref_name: &str,
    ) -> Result<String, ForgeError> {
        let base = self.repo_url(repo, endpoint);
        let mut url = Url::parse(&base)
            .map_err(|e| ForgeError::NetworkError(format!("invalid URL {}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| ForgeError::NetworkError(format!("invalid URL {}", base)))?
            .extend(short_ref(ref_name).split('/'));
        Ok(url.into())
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, repo: &RepositoryRef, path: &str) -> String {
        if path.is_empty() {
            format!("{}/repos/{}/{}", self.api_base, repo.owner, repo.name)
        } else {
            format!(
                "{}/repos/{}/{}/{}",
                self.api_base, repo.owner, repo.name, path
            )
        }
    }

    /// Start a request with auth headers attached.
    fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ForgeError> {
        debug!("{} {}", method, url);
        Ok(self.client.request(method, url).headers(self.headers()?))
    }

    /// Send a request and decode the JSON response.
    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ForgeError> {
        let response = request.send().await.map_err(map_transport_error)?;
        self.handle_response(response).await
    }

    /// GET a JSON resource.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, ForgeError> {
        self.send(self.request(Method::GET, url)?).await
    }

    /// Send a JSON body and decode the JSON response.
    async fn send_json<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        url: &str,
        body: &B,
    ) -> Result<T, ForgeError> {
        self.send(self.request(method, url)?.json(body)).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(error_from_response(response, status).await)
        }
    }
}

/// Map a reqwest transport failure to a forge error.
fn map_transport_error(err: reqwest::Error) -> ForgeError {
    if err.is_timeout() {
        ForgeError::NetworkError(format!("request timed out: {}", err))
    } else {
        ForgeError::NetworkError(err.to_string())
    }
}

/// Map an error response from the API to a forge error.
async fn error_from_response(response: Response, status: StatusCode) -> ForgeError {
    // GitHub Apps use X-Accepted-GitHub-Permissions, classic OAuth uses X-Accepted-OAuth-Scopes.
    let headers = response.headers();
    let required_permissions = headers
        .get("X-Accepted-GitHub-Permissions")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let required_scopes = headers
        .get("X-Accepted-OAuth-Scopes")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let rate_limit_exhausted = headers
        .get("X-RateLimit-Remaining")
        .and_then(|v| v.to_str().ok())
        == Some("0");

    let message = match response.json::<GitHubErrorResponse>().await {
        Ok(err) => err.message,
        Err(_) => "Unknown error".to_string(),
    };

    match status {
        StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
        StatusCode::FORBIDDEN if rate_limit_exhausted => ForgeError::RateLimited,
        StatusCode::FORBIDDEN => {
            let mut err_msg = format!("Permission denied: {}", message);

            if let Some(perms) = required_permissions.filter(|p| !p.is_empty()) {
                err_msg.push_str(&format!(" [required: {}]", perms));
            } else if let Some(scopes) = required_scopes.filter(|s| !s.is_empty()) {
                err_msg.push_str(&format!(" [required scopes: {}]", scopes));
            }

            ForgeError::AuthFailed(err_msg)
        }
        StatusCode::NOT_FOUND => ForgeError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
        _ if status.is_server_error() => ForgeError::ApiError {
            status: status.as_u16(),
            message: format!("GitHub server error: {}", message),
        },
        _ => ForgeError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

/// Strip the leading `refs/` for the single-ref endpoints.
fn short_ref(ref_name: &str) -> &str {
    ref_name.strip_prefix("refs/").unwrap_or(ref_name)
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get_pull_request(
        &self,
        repo: &RepositoryRef,
        number: u64,
    ) -> Result<PullRequestDetails, ForgeError> {
        let url = self.repo_url(repo, &format!("pulls/{}", number));
        let pr: GitHubPullRequest = self.get_json(&url).await?;
        Ok(pr.into())
    }

    async fn list_pull_request_files(
        &self,
        repo: &RepositoryRef,
        number: u64,
        per_page: u32,
    ) -> Result<Vec<String>, ForgeError> {
        let url = self.repo_url(
            repo,
            &format!("pulls/{}/files?per_page={}", number, per_page),
        );
        let files: Vec<GitHubPullRequestFile> = self.get_json(&url).await?;
        Ok(files.into_iter().map(|f| f.filename).collect())
    }

    async fn get_tree(
        &self,
        repo: &RepositoryRef,
        sha: &str,
        recursive: bool,
    ) -> Result<Vec<TreeEntry>, ForgeError> {
        let path = if recursive {
            format!("git/trees/{}?recursive=1", sha)
        } else {
            format!("git/trees/{}", sha)
        };
        let tree: GitHubTree = self.get_json(&self.repo_url(repo, &path)).await?;
        if tree.truncated {
            warn!(
                "tree {} of {} was truncated by the API; some paths may be missing",
                sha, repo
            );
        }
        Ok(tree.tree)
    }

    async fn get_blob(&self, repo: &RepositoryRef, sha: &str) -> Result<Blob, ForgeError> {
        let url = self.repo_url(repo, &format!("git/blobs/{}", sha));
        let blob: GitHubBlob = self.get_json(&url).await?;
        Ok(Blob {
            content: blob.content,
            encoding: blob.encoding,
        })
    }

    async fn get_repository(&self, repo: &RepositoryRef) -> Result<Repository, ForgeError> {
        let info: GitHubRepository = self.get_json(&self.repo_url(repo, "")).await?;
        Ok(info.into())
    }

    async fn get_ref(&self, repo: &RepositoryRef, ref_name: &str) -> Result<GitRef, ForgeError> {
        let url = self.ref_url(repo, "git/ref", ref_name)?;
        let git_ref: GitHubRef = self.get_json(&url).await?;
        Ok(git_ref.into())
    }

    async fn create_ref(
        &self,
        repo: &RepositoryRef,
        ref_name: &str,
        sha: &str,
    ) -> Result<GitRef, ForgeError> {
        let body = CreateRefBody { ref_name, sha };
        let git_ref: GitHubRef = self
            .send_json(Method::POST, &self.repo_url(repo, "git/refs"), &body)
            .await?;
        Ok(git_ref.into())
    }

    async fn create_blob(
        &self,
        repo: &RepositoryRef,
        blob: NewBlob,
    ) -> Result<String, ForgeError> {
        let body = CreateBlobBody {
            content: &blob.content,
            encoding: &blob.encoding,
        };
        let created: GitHubSha = self
            .send_json(Method::POST, &self.repo_url(repo, "git/blobs"), &body)
            .await?;
        Ok(created.sha)
    }

    async fn create_tree(
        &self,
        repo: &RepositoryRef,
        base_tree: &str,
        entries: Vec<NewTreeEntry>,
    ) -> Result<String, ForgeError> {
        let body = CreateTreeBody {
            base_tree,
            tree: &entries,
        };
        let created: GitHubSha = self
            .send_json(Method::POST, &self.repo_url(repo, "git/trees"), &body)
            .await?;
        Ok(created.sha)
    }

    async fn get_commit(&self, repo: &RepositoryRef, sha: &str) -> Result<Commit, ForgeError> {
        let url = self.repo_url(repo, &format!("git/commits/{}", sha));
        let commit: GitHubCommit = self.get_json(&url).await?;
        Ok(Commit {
            sha: commit.sha,
            tree_sha: commit.tree.sha,
        })
    }

    async fn create_commit(
        &self,
        repo: &RepositoryRef,
        commit: NewCommit,
    ) -> Result<String, ForgeError> {
        let body = CreateCommitBody {
            message: &commit.message,
            tree: &commit.tree,
            parents: &commit.parents,
        };
        let created: GitHubSha = self
            .send_json(Method::POST, &self.repo_url(repo, "git/commits"), &body)
            .await?;
        Ok(created.sha)
    }

    async fn update_ref(
        &self,
        repo: &RepositoryRef,
        ref_name: &str,
        sha: &str,
        force: bool,
    ) -> Result<GitRef, ForgeError> {
        let url = self.ref_url(repo, "git/refs", ref_name)?;
        let body = UpdateRefBody { sha, force };
        let git_ref: GitHubRef = self.send_json(Method::PATCH, &url, &body).await?;
        Ok(git_ref.into())
    }

    async fn create_pull_request(
        &self,
        repo: &RepositoryRef,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        let body = CreatePrBody {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: request.body.as_deref(),
            draft: request.draft,
        };
        let pr: GitHubCreatedPullRequest = self
            .send_json(Method::POST, &self.repo_url(repo, "pulls"), &body)
            .await?;
        Ok(PullRequest {
            number: pr.number,
            url: pr.html_url,
            is_draft: pr.draft.unwrap_or(request.draft),
        })
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for creating a ref.
#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    ref_name: &'a str,
    sha: &'a str,
}

/// Request body for updating a ref.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// Request body for creating a blob.
#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: &'a str,
    encoding: &'a str,
}

/// Request body for creating a tree.
#[derive(Serialize)]
struct CreateTreeBody<'a> {
    base_tree: &'a str,
    tree: &'a [NewTreeEntry],
}

/// Request body for creating a commit.
#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: &'a [String],
}

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    draft: bool,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Any response that only matters for its `sha`.
#[derive(Deserialize)]
struct GitHubSha {
    sha: String,
}

/// GitHub PR response format.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    title: String,
    body: Option<String>,
    head: GitHubHead,
}

/// GitHub PR head format.
#[derive(Deserialize)]
struct GitHubHead {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
    /// Repository info (None for deleted forks)
    repo: Option<GitHubRepoInfo>,
    user: GitHubOwnerInfo,
}

/// Minimal GitHub repository info.
#[derive(Deserialize)]
struct GitHubRepoInfo {
    name: String,
    owner: GitHubOwnerInfo,
}

/// Minimal GitHub owner info.
#[derive(Deserialize)]
struct GitHubOwnerInfo {
    login: String,
}

impl From<GitHubPullRequest> for PullRequestDetails {
    fn from(pr: GitHubPullRequest) -> Self {
        let (repo_owner, repo_name) = match pr.head.repo {
            Some(repo) => (repo.owner.login, repo.name),
            None => (String::new(), String::new()),
        };

        PullRequestDetails {
            number: pr.number,
            title: pr.title,
            body: pr.body,
            head: PullRequestHead {
                ref_name: pr.head.ref_name,
                sha: pr.head.sha,
                repo_owner,
                repo_name,
                user_login: pr.head.user.login,
            },
        }
    }
}

/// GitHub PR file list item.
#[derive(Deserialize)]
struct GitHubPullRequestFile {
    filename: String,
}

/// GitHub tree response.
#[derive(Deserialize)]
struct GitHubTree {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

/// GitHub blob response.
#[derive(Deserialize)]
struct GitHubBlob {
    content: String,
    encoding: String,
}

/// GitHub repository response.
#[derive(Deserialize)]
struct GitHubRepository {
    default_branch: String,
    /// Missing on older GitHub Enterprise versions
    visibility: Option<String>,
    #[serde(default)]
    private: bool,
}

impl From<GitHubRepository> for Repository {
    fn from(repo: GitHubRepository) -> Self {
        let visibility = repo.visibility.unwrap_or_else(|| {
            if repo.private {
                "private".to_string()
            } else {
                "public".to_string()
            }
        });

        Repository {
            default_branch: repo.default_branch,
            visibility,
        }
    }
}

/// GitHub ref response.
#[derive(Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    ref_name: String,
    url: String,
    object: GitHubObject,
}

/// GitHub ref target.
#[derive(Deserialize)]
struct GitHubObject {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

impl From<GitHubRef> for GitRef {
    fn from(r: GitHubRef) -> Self {
        GitRef {
            ref_name: r.ref_name,
            url: r.url,
            object: GitObject {
                sha: r.object.sha,
                kind: r.object.kind,
            },
        }
    }
}

/// GitHub commit response.
#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    tree: GitHubSha,
}

/// GitHub created PR response.
#[derive(Deserialize)]
struct GitHubCreatedPullRequest {
    number: u64,
    html_url: String,
    draft: Option<bool>,
}
