use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use eventsite_core::IncludeDir;
use owo_colors::OwoColorize;

use crate::config::Config;
use crate::tui::render_report;

/// Render both sections into the include fragments.
pub async fn run(
    config: &Config,
    events: Option<PathBuf>,
    live: bool,
    includes: Option<PathBuf>,
) -> Result<()> {
    let events = events.unwrap_or_else(|| config.output.events_json.clone());
    let includes = includes.unwrap_or_else(|| config.output.includes_dir.clone());

    let renderer = super::renderer(config).context("Invalid display settings")?;
    let source = super::load_events(config, &events, live).await;

    let mut target = IncludeDir::new(&includes);
    let report = renderer.render(&source, &mut target);

    println!("Rendered into {}", includes.display().bold());
    println!("{}", render_report(&report));

    let failed: Vec<_> = report
        .write_failures()
        .map(|(section, _)| target.path_for(section).display().to_string())
        .collect();
    if !failed.is_empty() {
        bail!("Could not write {}", failed.join(", "));
    }

    Ok(())
}
