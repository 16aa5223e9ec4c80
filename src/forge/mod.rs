//! forge
//!
//! Abstraction over the remote hosting service.
//!
//! # Architecture
//!
//! The `Forge` trait exposes the repository, git-object and pull-request
//! primitives the engine is built on. The engine only ever holds an
//! `Arc<dyn Forge>`, so the GitHub client and the mock are interchangeable.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation over the REST API
//! - [`mock`]: In-memory implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use pr_bullet::core::types::RepositoryRef;
//! use pr_bullet::forge::github::GitHubForge;
//! use pr_bullet::forge::Forge;
//!
//! let forge = GitHubForge::from_config(&config)?;
//! let repo = forge.get_repository(&RepositoryRef::new("acme", "widgets")).await?;
//! println!("default branch: {}", repo.default_branch);
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
