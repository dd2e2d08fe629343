//! draftloop CLI: the main entry point.
//!
//! Commands:
//! - `refine`  — Draft a text on a topic, then critique and refine it
//! - `onboard` — Initialize config
//! - `config`  — Validate, show or locate the config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "draftloop",
    about = "draftloop — draft, critique and refine text with LLMs",
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
    /// Initialize configuration
    Onboard,

    /// Write a draft on TOPIC and refine it until the critic approves
    Refine {
        /// What to write about
        topic: String,

        /// Maximum critique/refine passes (overrides config)
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,

        /// Review each draft yourself instead of the LLM critic
        #[arg(short, long)]
        interactive: bool,

        /// Approve when the critique contains the token, not only on exact match
        #[arg(long)]
        contains_token: bool,

        /// Override the model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Check the config file for errors
    Validate,
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
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
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Refine {
            topic,
            max_iterations,
            interactive,
            contains_token,
            model,
        } => {
            commands::refine::run(commands::refine::RefineOptions {
                topic,
                max_iterations,
                interactive,
                contains_token,
                model,
            })
            .await?
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_refine_flags() {
        let cli = Cli::parse_from([
            "draftloop",
            "-v",
            "refine",
            "cats",
            "-n",
            "3",
            "--contains-token",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Refine {
                topic,
                max_iterations,
                interactive,
                contains_token,
                model,
            } => {
                assert_eq!(topic, "cats");
                assert_eq!(max_iterations, Some(3));
                assert!(!interactive);
                assert!(contains_token);
                assert!(model.is_none());
            }
            _ => panic!("expected refine"),
        }
    }

    #[test]
    fn parses_config_action() {
        let cli = Cli::parse_from(["draftloop", "config", "path"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Path
            }
        ));
    }
}
