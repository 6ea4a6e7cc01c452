//! World record history CLI library.
//!
//! This crate provides the CLI interface for the record history tools.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, TimeAction};
pub use config::Config;
