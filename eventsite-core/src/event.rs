//! Provider-neutral event types.
//!
//! Providers convert their API responses into [`RawEvent`]s. The fetcher turns
//! those into [`NormalizedEvent`]s, which are the only shape that gets
//! persisted to the events document and rendered into pages.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{CALENDAR_TEMPLATE_URL, UNTITLED_EVENT};
use crate::sanitize::sanitize_description;

/// Start or end of an event as sent by the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum EventMarker {
    /// A timestamped instant carrying the provider's UTC offset.
    DateTime(DateTime<FixedOffset>),
    /// A whole-day date with no time of day.
    Date(NaiveDate),
}

impl EventMarker {
    pub fn is_date(&self) -> bool {
        matches!(self, EventMarker::Date(_))
    }

    /// Resolve the marker to an instant. Whole-day dates become local
    /// midnight in `zone`.
    pub fn to_utc(&self, zone: Tz) -> DateTime<Utc> {
        match self {
            EventMarker::DateTime(dt) => dt.with_timezone(&Utc),
            EventMarker::Date(d) => local_midnight(*d, zone),
        }
    }
}

/// An event record as received from a calendar provider
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub title: Option<String>,
    pub start: EventMarker,
    pub end: EventMarker,
    /// IANA zone name declared on the event, if any
    pub time_zone: Option<String>,
    /// Free text or HTML, straight from the provider
    pub description: Option<String>,
    pub location: Option<String>,
    /// Provider's canonical link to the event
    pub link: Option<String>,
}

/// A canonicalized, sanitized event.
///
/// Field names are serialized in camelCase and form the contract of the
/// persisted events document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub title: String,
    pub start_instant: DateTime<Utc>,
    pub end_instant: DateTime<Utc>,
    /// True when the provider sent a date without a time of day
    #[serde(default)]
    pub all_day: bool,
    pub time_zone: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub calendar_link: String,
}

impl NormalizedEvent {
    /// Normalize a provider record.
    ///
    /// `fallback_zone` is used when the event declares no zone or an unknown one.
    pub fn from_raw(raw: RawEvent, fallback_zone: Tz) -> Self {
        let zone = match raw.time_zone.as_deref() {
            Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
                warn!(zone = name, "Unknown event time zone, using {}", fallback_zone.name());
                fallback_zone
            }),
            None => fallback_zone,
        };

        let title = non_blank(raw.title).unwrap_or_else(|| UNTITLED_EVENT.to_string());
        let start_instant = raw.start.to_utc(zone);
        let end_instant = raw.end.to_utc(zone);
        let description = raw
            .description
            .as_deref()
            .map(sanitize_description)
            .unwrap_or_default();
        let location = non_blank(raw.location);

        let calendar_link = match non_blank(raw.link) {
            Some(link) => link,
            None => add_to_calendar_link(
                &title,
                &description,
                location.as_deref().unwrap_or(""),
                start_instant,
                end_instant,
            ),
        };

        NormalizedEvent {
            title,
            start_instant,
            end_instant,
            all_day: raw.start.is_date(),
            time_zone: zone.name().to_string(),
            description,
            location,
            calendar_link,
        }
    }

    /// The event's zone. Documents edited by hand may carry names chrono-tz
    /// does not know; those display in UTC.
    pub fn zone(&self) -> Tz {
        self.time_zone.parse().unwrap_or(Tz::UTC)
    }
}

/// Midnight at the start of `date` in `zone`, as an instant.
///
/// Zones that skip midnight on a DST change resolve to the first hour that
/// exists on that date.
pub fn local_midnight(date: NaiveDate, zone: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);

    zone.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            zone.from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

/// Build a Google Calendar "add event" link for viewers without a canonical link.
pub fn add_to_calendar_link(
    title: &str,
    details: &str,
    location: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> String {
    format!(
        "{}?action=TEMPLATE&text={}&dates={}/{}&details={}&location={}&sf=true&output=xml",
        CALENDAR_TEMPLATE_URL,
        urlencoding::encode(title),
        compact_utc(start),
        compact_utc(end),
        urlencoding::encode(details),
        urlencoding::encode(location),
    )
}

/// `20250301T150000Z`
fn compact_utc(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_meeting() -> RawEvent {
        RawEvent {
            title: Some("Board Meeting".to_string()),
            start: EventMarker::DateTime(
                DateTime::parse_from_rfc3339("2025-03-01T10:00:00-05:00").unwrap(),
            ),
            end: EventMarker::DateTime(
                DateTime::parse_from_rfc3339("2025-03-01T11:00:00-05:00").unwrap(),
            ),
            time_zone: Some("America/Toronto".to_string()),
            description: Some("\\u003cb\\u003eImportant\\u003c/b\\u003e".to_string()),
            location: None,
            link: None,
        }
    }

    #[test]
    fn test_board_meeting_normalizes_to_utc_and_strips_bold() {
        let event = NormalizedEvent::from_raw(board_meeting(), Tz::UTC);

        assert_eq!(event.title, "Board Meeting");
        assert_eq!(event.start_instant.to_rfc3339(), "2025-03-01T15:00:00+00:00");
        assert_eq!(event.end_instant.to_rfc3339(), "2025-03-01T16:00:00+00:00");
        assert_eq!(event.time_zone, "America/Toronto");
        assert!(event.description.contains("Important"));
        assert!(!event.description.contains("<b>"));
        assert!(!event.all_day);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let raw = RawEvent {
            title: None,
            time_zone: None,
            description: None,
            location: Some("   ".to_string()),
            ..board_meeting()
        };

        let event = NormalizedEvent::from_raw(raw, chrono_tz::Europe::Helsinki);

        assert_eq!(event.title, UNTITLED_EVENT);
        assert_eq!(event.time_zone, "Europe/Helsinki");
        assert_eq!(event.description, "");
        assert_eq!(event.location, None);
    }

    #[test]
    fn test_unknown_zone_falls_back() {
        let raw = RawEvent {
            time_zone: Some("Mars/Olympus_Mons".to_string()),
            ..board_meeting()
        };

        let event = NormalizedEvent::from_raw(raw, chrono_tz::America::Vancouver);
        assert_eq!(event.time_zone, "America/Vancouver");
    }

    #[test]
    fn test_whole_day_is_local_midnight_in_event_zone() {
        let raw = RawEvent {
            start: EventMarker::Date(NaiveDate::from_ymd_opt(2025, 7, 4).unwrap()),
            end: EventMarker::Date(NaiveDate::from_ymd_opt(2025, 7, 5).unwrap()),
            ..board_meeting()
        };

        let event = NormalizedEvent::from_raw(raw, Tz::UTC);

        assert!(event.all_day);
        // Toronto is UTC-4 in July
        assert_eq!(event.start_instant.to_rfc3339(), "2025-07-04T04:00:00+00:00");
        assert_eq!(event.end_instant.to_rfc3339(), "2025-07-05T04:00:00+00:00");
    }

    #[test]
    fn test_midnight_skipped_by_dst_resolves_to_first_existing_hour() {
        // Santiago moved clocks from 00:00 to 01:00 on 2024-09-08
        let date = NaiveDate::from_ymd_opt(2024, 9, 8).unwrap();
        let instant = local_midnight(date, chrono_tz::America::Santiago);

        assert_eq!(instant.to_rfc3339(), "2024-09-08T04:00:00+00:00");
    }

    #[test]
    fn test_provider_link_is_preferred() {
        let raw = RawEvent {
            link: Some("https://www.google.com/calendar/event?eid=abc".to_string()),
            ..board_meeting()
        };

        let event = NormalizedEvent::from_raw(raw, Tz::UTC);
        assert_eq!(
            event.calendar_link,
            "https://www.google.com/calendar/event?eid=abc"
        );
    }

    #[test]
    fn test_synthesized_link_encodes_fields_and_uses_compact_utc() {
        let raw = RawEvent {
            title: Some("Book Swap & Social".to_string()),
            description: Some("Bring a book".to_string()),
            location: Some("Main Branch, Room 2".to_string()),
            ..board_meeting()
        };

        let event = NormalizedEvent::from_raw(raw, Tz::UTC);

        assert_eq!(
            event.calendar_link,
            "https://www.google.com/calendar/render?action=TEMPLATE\
             &text=Book%20Swap%20%26%20Social\
             &dates=20250301T150000Z/20250301T160000Z\
             &details=Bring%20a%20book\
             &location=Main%20Branch%2C%20Room%202\
             &sf=true&output=xml"
        );
    }

    #[test]
    fn test_document_field_names_are_camel_case() {
        let event = NormalizedEvent::from_raw(board_meeting(), Tz::UTC);
        let json = serde_json::to_value(&event).unwrap();
        let keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();

        for key in [
            "title",
            "startInstant",
            "endInstant",
            "allDay",
            "timeZone",
            "description",
            "calendarLink",
        ] {
            assert!(keys.contains(&key), "missing {key} in {keys:?}");
        }
        assert!(!keys.contains(&"location"));
    }
}
