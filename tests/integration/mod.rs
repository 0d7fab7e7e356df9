//! Integration tests for kubectl-assistant

mod cli_binary;
mod command_runner;
mod stores;
mod test_utils;

pub use test_utils::*;
