mod commands;
mod config;
mod tui;

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::Config;

#[derive(Parser)]
#[command(name = "eventsite")]
#[command(about = "Fetch the group's calendar events and render them into the static site")]
struct Cli {
    /// Config file (defaults to ./eventsite.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch events from the calendar and save them as JSON
    Fetch {
        /// Where to write the events document
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after this many events (at least 1)
        #[arg(long)]
        max_results: Option<NonZeroUsize>,
    },
    /// Render event listings into the include fragments
    Render {
        /// Events document to read
        #[arg(short, long)]
        events: Option<PathBuf>,

        /// Fetch from the calendar instead of reading the document
        #[arg(long, conflicts_with = "events")]
        live: bool,

        /// Directory to write the fragments to
        #[arg(long)]
        includes: Option<PathBuf>,
    },
    /// Build the site locally, with listings filled into the pages
    Build {
        /// Events document to read
        #[arg(short, long)]
        events: Option<PathBuf>,

        /// Fetch from the calendar instead of reading the document
        #[arg(long, conflicts_with = "events")]
        live: bool,

        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch {
            output,
            max_results,
        } => commands::fetch::run(&config, output, max_results.map(NonZeroUsize::get)).await,
        Commands::Render {
            events,
            live,
            includes,
        } => commands::render::run(&config, events, live, includes).await,
        Commands::Build { events, live, out } => {
            commands::build::run(&config, events, live, out).await
        }
    }
}
