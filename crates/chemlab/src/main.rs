//! Chemlab - virtual chemistry bench driven from the terminal.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chemlab")]
#[command(about = "Virtual chemistry lab with live AI safety analysis", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the user then system config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the reagent shelf
    Catalog {
        /// Only show one category (acid, base, metal, ...)
        #[arg(long)]
        category: Option<String>,
    },

    /// Analyse a mixture once and print the result
    Analyze {
        /// Reagent ids, in the order they are added
        #[arg(required = true)]
        reagents: Vec<String>,

        /// Flask temperature in °C
        #[arg(long, default_value_t = chemlab_common::AMBIENT_TEMPERATURE)]
        temperature: u32,

        /// Print the interpreted result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive bench session (add, heat, cool, clear, status, quit)
    Session,

    /// Show the effective configuration, or write a default file
    Config {
        /// Write a default config to the user config path
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Catalog { category } => commands::catalog(config_path, category),
        Commands::Analyze {
            reagents,
            temperature,
            json,
        } => commands::analyze(config_path, reagents, temperature, json).await,
        Commands::Session => commands::session(config_path).await,
        Commands::Config { init } => commands::config(config_path, init),
    }
}
