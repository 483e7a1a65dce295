//! Terminal output helpers.

use eventsite_core::{RenderReport, Section, SectionOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["-", "\\", "|", "/"])
        .template("{msg} {spinner}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

fn section_label(section: Section) -> &'static str {
    match section {
        Section::Upcoming => "upcoming",
        Section::Past => "past",
    }
}

/// One line per section, e.g. `  upcoming  3 events`.
pub fn render_report(report: &RenderReport) -> String {
    Section::ALL
        .into_iter()
        .map(|section| {
            let label = format!("{:<9}", section_label(section));
            let status = match report.outcome(section) {
                SectionOutcome::Rendered { events } => {
                    format!("{} {}", events.green(), plural(*events, "event"))
                }
                SectionOutcome::LoadFailed => "error message shown".yellow().to_string(),
                SectionOutcome::Skipped => "no container".dimmed().to_string(),
                SectionOutcome::WriteFailed(err) => err.to_string().red().to_string(),
            };
            format!("  {label} {status}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}
