//! Read-only client for a public Google Calendar.

use std::collections::HashSet;

use async_trait::async_trait;
use eventsite_core::constants::DEFAULT_MAX_RESULTS;
use eventsite_core::{EventListing, EventProvider, EventSiteError, EventSiteResult};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::types::EventsPage;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Largest page the events endpoint will return.
const MAX_PAGE_SIZE: usize = 2500;

/// Longest slice of an error body kept in [`EventSiteError::Http`].
const ERROR_BODY_LIMIT: usize = 512;

/// Empty pages in a row that still point at a next page before giving up.
const MAX_EMPTY_PAGES: usize = 8;

/// Lists events of one calendar with an API key.
#[derive(Clone, Debug)]
pub struct GoogleCalendar {
    http: reqwest::Client,
    base_url: String,
    calendar_id: String,
    api_key: SecretString,
    max_results: usize,
}

impl GoogleCalendar {
    pub fn new(calendar_id: impl Into<String>, api_key: SecretString) -> Self {
        GoogleCalendar {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            calendar_id: calendar_id.into(),
            api_key,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Stop after this many events, across all pages.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    async fn fetch_page(
        &self,
        page_size: usize,
        page_token: Option<&str>,
    ) -> EventSiteResult<EventsPage> {
        let mut query = vec![
            ("key", self.api_key.expose_secret().to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("maxResults", page_size.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        debug!(calendar = %self.calendar_id, page_size, "Requesting events page");

        let resp = self
            .http
            .get(self.events_url())
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let body = resp.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(EventSiteError::Http {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| EventSiteError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl EventProvider for GoogleCalendar {
    async fn list_events(&self) -> EventSiteResult<EventListing> {
        let mut listing = EventListing::default();
        let mut received = 0usize;
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();
        let mut empty_pages = 0usize;

        loop {
            let remaining = self.max_results.saturating_sub(received);
            if remaining == 0 {
                break;
            }

            let page = self
                .fetch_page(remaining.min(MAX_PAGE_SIZE), page_token.as_deref())
                .await?;

            if listing.time_zone.is_none() {
                listing.time_zone = page.time_zone;
            }

            let items: Vec<_> = page.items.into_iter().take(remaining).collect();
            received += items.len();
            empty_pages = if items.is_empty() { empty_pages + 1 } else { 0 };
            listing
                .events
                .extend(items.into_iter().filter_map(|item| item.into_raw()));

            let Some(token) = page.next_page_token else {
                break;
            };
            if !seen_tokens.insert(token.clone()) {
                return Err(EventSiteError::MalformedResponse(format!(
                    "page token {token:?} was returned twice"
                )));
            }
            if empty_pages >= MAX_EMPTY_PAGES {
                return Err(EventSiteError::MalformedResponse(format!(
                    "{empty_pages} empty pages in a row still point at a next page"
                )));
            }
            debug!(token = %token, received, "Following next page");
            page_token = Some(token);
        }

        info!(
            calendar = %self.calendar_id,
            received,
            usable = listing.events.len(),
            "Fetched events"
        );

        Ok(listing)
    }
}

/// The request URL carries the API key, so it is left out of the message.
fn transport_error(err: reqwest::Error) -> EventSiteError {
    EventSiteError::Transport(err.without_url().to_string())
}
