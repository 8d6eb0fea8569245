//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, TemplateCommands};
pub use presentation::{format_page_list_json, format_page_list_text};
pub use route::RunContext;
