//! Command Line Interface for newtp
// (c) 2024 Ross Younger
mod args;
pub(crate) use args::{CliArgs, Mode};
mod cli_main;
pub use cli_main::cli;
