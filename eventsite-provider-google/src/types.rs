//! Wire types for the Google Calendar events list endpoint.

use chrono::{DateTime, FixedOffset, NaiveDate};
use eventsite_core::{EventMarker, RawEvent};
use serde::Deserialize;
use tracing::warn;

/// One page of `GET /calendars/{id}/events`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
    pub next_page_token: Option<String>,
    /// The calendar's zone
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub html_link: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
}

/// `start`/`end`: either `dateTime` for timed events or `date` for whole-day ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: Option<DateTime<FixedOffset>>,
    pub date: Option<NaiveDate>,
    pub time_zone: Option<String>,
}

impl EventDateTime {
    fn marker(&self) -> Option<EventMarker> {
        self.date_time
            .map(EventMarker::DateTime)
            .or_else(|| self.date.map(EventMarker::Date))
    }
}

impl GoogleEvent {
    /// Convert to a provider-neutral record.
    ///
    /// Events without a usable start are dropped with a warning. A missing end
    /// is taken to be the start.
    pub fn into_raw(self) -> Option<RawEvent> {
        let Some(start) = self.start.as_ref().and_then(EventDateTime::marker) else {
            warn!(
                event = self.summary.as_deref().unwrap_or("<untitled>"),
                "Skipping event without a start time"
            );
            return None;
        };
        let end = self
            .end
            .as_ref()
            .and_then(EventDateTime::marker)
            .unwrap_or_else(|| start.clone());

        let time_zone = self
            .start
            .and_then(|s| s.time_zone)
            .or_else(|| self.end.and_then(|e| e.time_zone));

        Some(RawEvent {
            title: self.summary,
            start,
            end,
            time_zone,
            description: self.description,
            location: self.location,
            link: self.html_link,
        })
    }
}
