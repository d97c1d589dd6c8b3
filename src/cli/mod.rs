//! Command-line interface for redwing
//!
//! Provides `index`, `localize`, `evaluate` and `completions` subcommands.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod evaluate;
mod guided;
mod index;
mod localize;
mod utils;

/// Rank source files by how likely they are to contain a reported bug
#[derive(Parser)]
#[command(name = "redwing")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, encode and store a repository's embeddings
    Index(Box<index::IndexArgs>),

    /// Rank a repository's files for one bug report
    Localize(Box<localize::LocalizeArgs>),

    /// Evaluate ranking quality over a bug dataset
    Evaluate(Box<evaluate::EvaluateArgs>),

    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Index(args) => index::run(*args),
        Commands::Localize(args) => localize::run(*args),
        Commands::Evaluate(args) => evaluate::run(*args),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "redwing", &mut std::io::stdout());
            Ok(())
        }
    }
}
