//! CLI module for Nova
//!
//! Handles command-line argument parsing and the one-shot memory commands.

pub mod args;
pub mod commands;

pub use args::{Args, Commands, Verbosity};
