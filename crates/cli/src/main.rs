//! Serene Pub prompt engine CLI: the main entry point.
//!
//! Commands:
//! - `compile`: Compile a chat snapshot into a prompt
//! - `count`: Count tokens with a named counter
//! - `formats`: List prompt formats and their block markers
//! - `template`: Print the built-in prompt template
//! - `config`: Show, validate, or initialize engine configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "serene",
    about = "Serene Pub: token-budgeted prompt compiler",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Use this engine config instead of ~/.serene-pub/engine.toml
    #[arg(short, long, global = true, env = "SERENE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a request (JSON) into a prompt
    Compile(commands::compile::CompileArgs),

    /// Count the tokens in a text file (or `-` for stdin)
    Count {
        /// Input file, `-` for stdin
        #[arg(default_value = "-")]
        input: String,

        /// Token counter name (estimate, cl100k, o200k, p50k, hf:<path>)
        #[arg(short, long)]
        tokenizer: Option<String>,
    },

    /// List prompt formats
    Formats,

    /// Print the built-in prompt template
    Template,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Check the configuration for errors
    Validate,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Compile(args) => commands::compile::run(config_path, args).await?,
        Commands::Count { input, tokenizer } => {
            commands::count::run(config_path, &input, tokenizer).await?
        }
        Commands::Formats => commands::formats::run(),
        Commands::Template => println!("{}", serene_prompt::DEFAULT_TEMPLATE),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
            ConfigAction::Path => commands::config_cmd::path(config_path),
            ConfigAction::Init => commands::config_cmd::init()?,
        },
    }

    Ok(())
}
