//! CLI Module Organization
//!
//! This module organizes the CLI functionality into cohesive sub-modules:
//! - args: CLI argument structures and value parsers
//! - commands: command execution logic
//! - output: table I/O and terminal rendering

pub mod args;
pub mod commands;
pub mod output;

// Re-export commonly used items for convenience
pub use args::*;
pub use commands::*;
