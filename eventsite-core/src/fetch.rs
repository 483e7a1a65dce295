//! Fetch cycle: provider listing -> normalized, partitioned collection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::info;

use crate::collection::EventCollection;
use crate::error::EventSiteResult;
use crate::event::{NormalizedEvent, RawEvent};

/// Everything a provider returned for one calendar.
#[derive(Debug, Clone, Default)]
pub struct EventListing {
    /// Events in the provider's ascending start order
    pub events: Vec<RawEvent>,
    /// The calendar's own zone, used for events that declare none
    pub time_zone: Option<String>,
}

/// A source of calendar events.
#[async_trait]
pub trait EventProvider: Send + Sync {
    /// List the calendar's events, ordered by start time.
    async fn list_events(&self) -> EventSiteResult<EventListing>;
}

pub struct Fetcher<P> {
    provider: P,
    default_zone: Tz,
}

impl<P: EventProvider> Fetcher<P> {
    /// `default_zone` applies to events when neither the event nor its
    /// calendar names a zone.
    pub fn new(provider: P, default_zone: Tz) -> Self {
        Fetcher {
            provider,
            default_zone,
        }
    }

    /// Run one fetch cycle against the current time.
    pub async fn fetch(&self) -> EventSiteResult<EventCollection> {
        // Captured before the provider is contacted so the whole run shares one "now"
        let now = Utc::now();
        self.fetch_at(now).await
    }

    /// Run one fetch cycle, classifying events against `now`.
    pub async fn fetch_at(&self, now: DateTime<Utc>) -> EventSiteResult<EventCollection> {
        let listing = self.provider.list_events().await?;

        let calendar_zone = listing
            .time_zone
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(self.default_zone);

        let events = listing
            .events
            .into_iter()
            .map(|raw| NormalizedEvent::from_raw(raw, calendar_zone));

        let collection = EventCollection::partition(events, now);

        info!(
            upcoming = collection.upcoming.len(),
            past = collection.past.len(),
            "Categorized events"
        );

        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EventSiteError;
    use crate::event::EventMarker;
    use chrono::{NaiveDate, TimeZone};

    struct FixedProvider(EventListing);

    #[async_trait]
    impl EventProvider for FixedProvider {
        async fn list_events(&self) -> EventSiteResult<EventListing> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl EventProvider for FailingProvider {
        async fn list_events(&self) -> EventSiteResult<EventListing> {
            Err(EventSiteError::Http {
                status: 403,
                body: "forbidden".to_string(),
            })
        }
    }

    fn whole_day(title: &str, y: i32, m: u32, d: u32) -> RawEvent {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        RawEvent {
            title: Some(title.to_string()),
            start: EventMarker::Date(date),
            end: EventMarker::Date(date.succ_opt().unwrap()),
            time_zone: None,
            description: None,
            location: None,
            link: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_partitions_against_snapshot() {
        let listing = EventListing {
            events: vec![
                whole_day("Spring social", 2025, 4, 1),
                whole_day("Summer reading kickoff", 2025, 7, 1),
                whole_day("Fall planning", 2025, 10, 1),
            ],
            time_zone: Some("America/Toronto".to_string()),
        };
        let fetcher = Fetcher::new(FixedProvider(listing), Tz::UTC);
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();

        let collection = fetcher.fetch_at(now).await.unwrap();

        let upcoming: Vec<_> = collection.upcoming.iter().map(|e| e.title.as_str()).collect();
        let past: Vec<_> = collection.past.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(upcoming, vec!["Fall planning"]);
        assert_eq!(past, vec!["Summer reading kickoff", "Spring social"]);
    }

    #[tokio::test]
    async fn test_calendar_zone_applies_to_events_without_zone() {
        let listing = EventListing {
            events: vec![whole_day("Picnic", 2025, 7, 1)],
            time_zone: Some("America/Toronto".to_string()),
        };
        let fetcher = Fetcher::new(FixedProvider(listing), Tz::UTC);

        let collection = fetcher.fetch_at(Utc::now()).await.unwrap();
        let event = collection.upcoming.iter().chain(&collection.past).next().unwrap();

        assert_eq!(event.time_zone, "America/Toronto");
        assert_eq!(event.start_instant.to_rfc3339(), "2025-07-01T04:00:00+00:00");
    }

    #[tokio::test]
    async fn test_default_zone_applies_without_calendar_zone() {
        let listing = EventListing {
            events: vec![whole_day("Picnic", 2025, 7, 1)],
            time_zone: None,
        };
        let fetcher = Fetcher::new(FixedProvider(listing), chrono_tz::Asia::Tokyo);

        let collection = fetcher.fetch_at(Utc::now()).await.unwrap();
        let event = collection.upcoming.iter().chain(&collection.past).next().unwrap();

        assert_eq!(event.time_zone, "Asia/Tokyo");
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_fetch() {
        let fetcher = Fetcher::new(FailingProvider, Tz::UTC);

        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, EventSiteError::Http { status: 403, .. }));
    }
}
