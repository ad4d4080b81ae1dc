//! CivicSphere CLI library.
//!
//! Command-line front end for the city services assistant: an interactive
//! chat loop, one-shot questions, rulebook inspection and stored history.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod repl;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
