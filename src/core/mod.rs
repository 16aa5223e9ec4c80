//! core
//!
//! Domain types, identifier parsing, and configuration for pr-bullet.
//!
//! # Modules
//!
//! - [`types`] - Repository, pull request and file value types
//! - [`identifier`] - Parse `owner/repo[/pull/N]` identifiers
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Nothing here performs network I/O
//! - Values are immutable once produced

pub mod config;
pub mod identifier;
pub mod types;
