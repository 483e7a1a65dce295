use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use eventsite_core::{EventCollection, EventSiteResult, Page, RenderReport, Renderer};
use owo_colors::OwoColorize;
use tracing::warn;

use crate::config::Config;
use crate::tui::render_report;

/// Build the site into `out`: pages with includes expanded and event
/// listings filled in, then assets and the includes directory.
pub async fn run(
    config: &Config,
    events: Option<PathBuf>,
    live: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let events = events.unwrap_or_else(|| config.output.events_json.clone());
    let out = out.unwrap_or_else(|| config.site.output_dir.clone());
    let includes = &config.output.includes_dir;

    let renderer = super::renderer(config).context("Invalid display settings")?;
    let source = super::load_events(config, &events, live).await;

    std::fs::create_dir_all(&out)
        .with_context(|| format!("Failed to create output directory {}", out.display()))?;

    for page in &config.site.pages {
        if !page.exists() {
            warn!(page = %page.display(), "Skipping page (not found)");
            continue;
        }

        let Some(name) = page.file_name() else {
            warn!(page = %page.display(), "Skipping page without a file name");
            continue;
        };
        let target = out.join(name);

        let report = build_page(page, &target, includes, &renderer, &source)?;
        println!("{} {}", "✓".green(), target.display().bold());
        println!("{}", render_report(&report));
    }

    for asset in &config.site.assets {
        let Some(name) = asset.file_name() else {
            continue;
        };
        match std::fs::copy(asset, out.join(name)) {
            Ok(_) => println!("{} Copied {}", "✓".green(), asset.display()),
            Err(e) => warn!(asset = %asset.display(), "Could not copy asset: {e}"),
        }
    }

    if includes.is_dir() {
        let target = out.join(includes.file_name().unwrap_or(includes.as_os_str()));
        copy_dir(includes, &target)
            .with_context(|| format!("Failed to copy {}", includes.display()))?;
        println!("{} Copied {}", "✓".green(), includes.display());
    }

    println!("\nSite built in {}", out.display().bold());
    Ok(())
}

/// Assemble one page and write it to `target`.
fn build_page(
    page_path: &Path,
    target: &Path,
    includes: &Path,
    renderer: &Renderer,
    source: &EventSiteResult<EventCollection>,
) -> Result<RenderReport> {
    let html = std::fs::read_to_string(page_path)
        .with_context(|| format!("Failed to read {}", page_path.display()))?;

    let mut page = Page::new(html);
    page.strip_front_matter()?;
    page.expand_includes(includes)?;

    let report = renderer.render(source, &mut page);

    std::fs::write(target, page.html())
        .with_context(|| format!("Failed to write {}", target.display()))?;

    Ok(report)
}

fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
