//! Human-readable event time ranges.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::event::NormalizedEvent;

const DATE_FORMAT: &str = "%b %-d, %Y";

/// 12-hour (`10:00 AM`) or 24-hour (`10:00`) clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockStyle {
    #[default]
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

impl ClockStyle {
    fn time_format(self) -> &'static str {
        match self {
            ClockStyle::TwelveHour => "%-I:%M %p",
            ClockStyle::TwentyFourHour => "%H:%M",
        }
    }
}

/// An event's time range in its own zone and, when different, the viewer's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonedTimes {
    pub event_zone: String,
    pub viewer_zone: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TimeFormatter {
    clock: ClockStyle,
}

impl TimeFormatter {
    pub fn new(clock: ClockStyle) -> Self {
        TimeFormatter { clock }
    }

    /// Format a timed range in `zone`, e.g. `Mar 1, 2025, 10:00 AM - 11:00 AM EST`.
    ///
    /// The end repeats the date when it falls on another local day, and the
    /// start carries its own zone abbreviation when a DST change sits inside
    /// the range.
    pub fn format_range(&self, start: DateTime<Utc>, end: DateTime<Utc>, zone: Tz) -> String {
        let time_format = self.clock.time_format();
        let start = start.with_timezone(&zone);
        let end = end.with_timezone(&zone);
        let start_abbr = start.format("%Z").to_string();

        let mut out = format!("{}, {}", start.format(DATE_FORMAT), start.format(time_format));

        if end <= start {
            out.push(' ');
            out.push_str(&start_abbr);
            return out;
        }

        let end_abbr = end.format("%Z").to_string();
        if start_abbr != end_abbr {
            out.push(' ');
            out.push_str(&start_abbr);
        }

        out.push_str(" - ");
        if end.date_naive() != start.date_naive() {
            out.push_str(&format!("{}, ", end.format(DATE_FORMAT)));
        }
        out.push_str(&format!("{} {}", end.format(time_format), end_abbr));

        out
    }

    /// Format a whole-day range. `end` is exclusive, as calendar providers
    /// send it: a one-day event ends at the following midnight.
    pub fn format_all_day(&self, start: DateTime<Utc>, end: DateTime<Utc>, zone: Tz) -> String {
        let first = start.with_timezone(&zone).date_naive();
        let last = end
            .with_timezone(&zone)
            .date_naive()
            .pred_opt()
            .filter(|last| *last > first);

        match last {
            Some(last) => format!(
                "{} - {} (All day)",
                first.format(DATE_FORMAT),
                last.format(DATE_FORMAT)
            ),
            None => format!("{} (All day)", first.format(DATE_FORMAT)),
        }
    }

    /// Format an event in `zone`. Whole-day events always use their own zone,
    /// since their dates do not move with the viewer.
    pub fn format_event(&self, event: &NormalizedEvent, zone: Tz) -> String {
        if event.all_day {
            self.format_all_day(event.start_instant, event.end_instant, event.zone())
        } else {
            self.format_range(event.start_instant, event.end_instant, zone)
        }
    }

    /// Format an event in its own zone and in `viewer`.
    ///
    /// The viewer string is omitted for whole-day events and when the viewer
    /// already shares the event's zone.
    pub fn format_both(&self, event: &NormalizedEvent, viewer: Tz) -> ZonedTimes {
        let zone = event.zone();
        let event_zone = self.format_event(event, zone);

        let viewer_zone = if event.all_day || viewer == zone {
            None
        } else {
            Some(self.format_range(event.start_instant, event.end_instant, viewer))
        };

        ZonedTimes {
            event_zone,
            viewer_zone,
        }
    }
}
