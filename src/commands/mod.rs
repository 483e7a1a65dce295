pub mod build;
pub mod fetch;
pub mod render;

use std::path::Path;

use eventsite_core::{EventCollection, EventSiteResult, Fetcher, Renderer, TimeFormatter};
use eventsite_provider_google::GoogleCalendar;

use crate::config::Config;
use crate::tui::create_spinner;

/// Provider for the configured calendar.
pub fn google_calendar(config: &Config, max_results: Option<usize>) -> EventSiteResult<GoogleCalendar> {
    let credentials = config.credentials()?;

    Ok(GoogleCalendar::new(credentials.calendar_id, credentials.api_key)
        .with_base_url(&config.calendar.base_url)
        .with_max_results(max_results.unwrap_or(config.calendar.max_results)))
}

/// Run one fetch cycle against the configured calendar.
pub async fn fetch_events(config: &Config, max_results: Option<usize>) -> EventSiteResult<EventCollection> {
    let fetcher = Fetcher::new(google_calendar(config, max_results)?, config.default_zone()?);

    let spinner = create_spinner("Fetching events".to_string());
    let result = fetcher.fetch().await;
    spinner.finish_and_clear();

    result
}

/// The events to render: fetched live, or read from the saved document.
pub async fn load_events(config: &Config, events: &Path, live: bool) -> EventSiteResult<EventCollection> {
    if live {
        fetch_events(config, None).await
    } else {
        EventCollection::load(events)
    }
}

pub fn renderer(config: &Config) -> EventSiteResult<Renderer> {
    Ok(Renderer::new(
        TimeFormatter::new(config.display.clock),
        config.viewer_zone()?,
    ))
}
