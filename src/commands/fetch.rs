use std::path::PathBuf;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use crate::config::Config;
use crate::tui::plural;

pub async fn run(config: &Config, output: Option<PathBuf>, max_results: Option<usize>) -> Result<()> {
    let output = output.unwrap_or_else(|| config.output.events_json.clone());

    let collection = super::fetch_events(config, max_results)
        .await
        .context("Failed to fetch events")?;

    collection
        .save(&output)
        .with_context(|| format!("Failed to write events to {}", output.display()))?;

    println!(
        "{} {} upcoming {}, {} past {}",
        "✓".green(),
        collection.upcoming.len().bold(),
        plural(collection.upcoming.len(), "event"),
        collection.past.len().bold(),
        plural(collection.past.len(), "event"),
    );
    println!("  saved to {}", output.display().dimmed());

    Ok(())
}
