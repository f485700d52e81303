//! mrdigest CLI, the main entry point.
//!
//! Commands:
//! - `diff`    : Fit a merge request's changes into a token budget
//! - `locate`  : Map a quoted line back to its patch position
//! - `config`  : Show, locate, or validate the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod source;

#[derive(Parser)]
#[command(
    name = "mrdigest",
    about = "mrdigest: bounded merge request diffs for language models",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a merge request's diff within the token budget
    Diff(commands::diff::DiffArgs),

    /// Find the patch position and new-file line of a quoted line
    Locate {
        /// Merge request JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// File the line belongs to
        #[arg(short, long)]
        file: String,

        /// The quoted line
        #[arg(short, long)]
        line: String,

        /// Print the location as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show {
        /// Print built-in defaults instead of the loaded file
        #[arg(long)]
        defaults: bool,
    },
    /// Print the configuration file path
    Path,
    /// Validate the configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so the rendered diff can be piped
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Diff(args) => commands::diff::run(args).await?,
        Commands::Locate {
            input,
            file,
            line,
            json,
        } => commands::locate::run(input, file, line, json).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show { defaults } => commands::config_cmd::show(defaults).await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}
