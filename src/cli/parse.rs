//! CLI parse: clap types for pageforge. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pageforge - generate, validate and serve single-file web pages from prompts
#[derive(Parser, Debug)]
#[command(name = "pageforge")]
#[command(about = "Generate, validate and serve single-file web pages from natural-language prompts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP front-end, the generation worker and the interactive console
    Serve {
        /// Serve without reading prompts from stdin
        #[arg(long)]
        no_console: bool,
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate one page and print its name
    Generate {
        /// Page description
        prompt: String,
    },
    /// List published pages, newest first
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print a published page document
    Show {
        /// Page name (without .html)
        name: String,
    },
    /// Print the effective configuration as TOML
    Config,
    /// Send a one-line test message to the text-generation provider
    Ping,
    /// Prompt template commands
    Templates {
        #[command(subcommand)]
        command: TemplateCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// Write the built-in templates to a directory for editing
    Export {
        /// Target directory (default: generation.templates_dir or ./prompts)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}
