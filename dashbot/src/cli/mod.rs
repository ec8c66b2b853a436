//! Command line: configuration from flags or environment, and the
//! `serve`, `search` and `render` subcommands.

mod args;
mod commands;

pub use args::Cli;
pub use commands::execute;
