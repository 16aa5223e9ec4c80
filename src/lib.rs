//! pr-bullet - copy a pull request into many repositories
//!
//! Given a source pull request and a list of target repositories, pr-bullet
//! re-creates the pull request's changed files in each target as a new
//! branch, commit and pull request. No local clone is involved; everything
//! goes through the hosting service's git-object API.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (args, stdin, prompts, progress)
//! - [`engine`] - Resolve the source, validate targets, replicate
//! - [`core`] - Domain types, identifier parsing, configuration
//! - [`forge`] - Abstraction over the hosting service (GitHub, mock)
//! - [`ui`] - Output formatting and confirmation
//!
//! # Guarantees
//!
//! 1. Every changed path is resolved to a blob, or resolution fails
//! 2. File modes and object types are carried over unchanged
//! 3. The new branch is named after the source head branch and never overwrites an existing one
//! 4. Pull requests are drafts unless the target repository is private

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod ui;
