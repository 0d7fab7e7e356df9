//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{rewrite_implicit_query, Cli, Commands, ConfigArgs, SessionArgs, KNOWN_COMMANDS};
pub use presentation::{format_config_view, format_history, format_history_cleared};
pub use route::RunContext;
