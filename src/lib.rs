//! kubectl-assistant: natural-language troubleshooting for Kubernetes clusters
//!
//! A kubectl plugin that hands a question to an LLM agent whose only tool runs
//! `kubectl`. The reusable core is the tool boundary: sandboxed command execution,
//! operator-facing display of each call, and per-user persistence of the conversation
//! and provider settings.

pub mod agent;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod provider;
pub mod runner;
pub mod settings;
pub mod transcript;
