//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`prompts`] - Interactive confirmation
//! - [`output`] - Summary and progress formatting
//!
//! # Design
//!
//! Everything shown to the operator goes through this module so quiet mode
//! is honoured in one place. Diagnostics go through the `log` facade instead.

pub mod output;
pub mod prompts;
