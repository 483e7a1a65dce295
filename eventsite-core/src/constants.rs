/// Title used when the provider sends an event without a summary.
pub const UNTITLED_EVENT: &str = "Untitled Event";

/// Upper bound on events requested per fetch run.
pub const DEFAULT_MAX_RESULTS: usize = 2500;

/// Element id of the page section listing upcoming events.
pub const UPCOMING_CONTAINER_ID: &str = "upcoming-events";

/// Element id of the page section listing past events.
pub const PAST_CONTAINER_ID: &str = "past-events";

/// Shown in place of an empty event list.
pub const NO_EVENTS_PLACEHOLDER: &str = "No events to display.";

/// Google Calendar "add event" template endpoint.
pub const CALENDAR_TEMPLATE_URL: &str = "https://www.google.com/calendar/render";

/// Include fragment holding the rendered upcoming events.
pub const UPCOMING_INCLUDE: &str = "events-upcoming.html";

/// Include fragment holding the rendered past events.
pub const PAST_INCLUDE: &str = "events-past.html";
