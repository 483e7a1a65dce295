//! HTML rendering of event collections into page containers.

use chrono::SecondsFormat;
use chrono_tz::Tz;
use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::{info, warn};

use crate::collection::EventCollection;
use crate::constants::{
    NO_EVENTS_PLACEHOLDER, PAST_CONTAINER_ID, PAST_INCLUDE, UPCOMING_CONTAINER_ID,
    UPCOMING_INCLUDE,
};
use crate::error::{EventSiteError, EventSiteResult};
use crate::event::NormalizedEvent;
use crate::sanitize::{is_web_url, sanitize_description};
use crate::time_format::TimeFormatter;

/// One half of the events listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Upcoming,
    Past,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Upcoming, Section::Past];

    /// Id of the page element that receives this section.
    pub fn container_id(self) -> &'static str {
        match self {
            Section::Upcoming => UPCOMING_CONTAINER_ID,
            Section::Past => PAST_CONTAINER_ID,
        }
    }

    /// Name of the include fragment that holds this section.
    pub fn include_file(self) -> &'static str {
        match self {
            Section::Upcoming => UPCOMING_INCLUDE,
            Section::Past => PAST_INCLUDE,
        }
    }

    pub fn from_container_id(id: &str) -> Option<Section> {
        Section::ALL.into_iter().find(|s| s.container_id() == id)
    }

    /// Shown instead of the listing when events could not be loaded.
    pub fn error_message(self) -> &'static str {
        match self {
            Section::Upcoming => {
                "Unable to load upcoming events right now. Please check back later."
            }
            Section::Past => "Unable to load past events right now. Please check back later.",
        }
    }

    fn events(self, collection: &EventCollection) -> &[NormalizedEvent] {
        match self {
            Section::Upcoming => &collection.upcoming,
            Section::Past => &collection.past,
        }
    }
}

/// Somewhere rendered sections can be written, addressed by container id.
pub trait Containers {
    /// Whether a container with this id exists.
    fn contains(&self, id: &str) -> EventSiteResult<bool>;

    /// Replace the container's content with `html`.
    fn fill(&mut self, id: &str, html: &str) -> EventSiteResult<()>;
}

/// What happened to one section during a render.
#[derive(Debug)]
pub enum SectionOutcome {
    /// The listing was written with this many events
    Rendered { events: usize },
    /// Events could not be loaded; the error message was written instead
    LoadFailed,
    /// No container for this section
    Skipped,
    /// The container rejected the write
    WriteFailed(EventSiteError),
}

#[derive(Debug)]
pub struct RenderReport {
    pub upcoming: SectionOutcome,
    pub past: SectionOutcome,
}

impl RenderReport {
    pub fn outcome(&self, section: Section) -> &SectionOutcome {
        match section {
            Section::Upcoming => &self.upcoming,
            Section::Past => &self.past,
        }
    }

    /// Sections whose container could not be written.
    pub fn write_failures(&self) -> impl Iterator<Item = (Section, &EventSiteError)> {
        Section::ALL
            .into_iter()
            .filter_map(|section| match self.outcome(section) {
                SectionOutcome::WriteFailed(err) => Some((section, err)),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    formatter: TimeFormatter,
    viewer_zone: Option<Tz>,
}

impl Renderer {
    /// With a `viewer_zone`, timed events in another zone get a second line
    /// showing the viewer's local time.
    pub fn new(formatter: TimeFormatter, viewer_zone: Option<Tz>) -> Self {
        Renderer {
            formatter,
            viewer_zone,
        }
    }

    /// Render one event card.
    pub fn render_event(&self, event: &NormalizedEvent) -> String {
        let mut html = String::from("<article class=\"event-card\">\n");

        html.push_str(&format!("    <h3>{}</h3>\n", encode_text(&event.title)));

        let zone = event.zone();
        let times = match self.viewer_zone {
            Some(viewer) => self.formatter.format_both(event, viewer),
            None => self.formatter.format_both(event, zone),
        };
        html.push_str(&format!(
            "    <p class=\"event-time\"><time datetime=\"{}\" data-end=\"{}\">{}</time></p>\n",
            event.start_instant.to_rfc3339_opts(SecondsFormat::Secs, true),
            event.end_instant.to_rfc3339_opts(SecondsFormat::Secs, true),
            encode_text(&times.event_zone),
        ));
        if let Some(viewer) = &times.viewer_zone {
            html.push_str(&format!(
                "    <p class=\"event-local-time\"><strong>Your local time:</strong> {}</p>\n",
                encode_text(viewer)
            ));
        }

        if let Some(location) = &event.location {
            html.push_str(&format!(
                "    <p class=\"event-location\"><strong>Location:</strong> {}</p>\n",
                encode_text(location)
            ));
        }

        // Documents can be edited by hand between fetch and render
        let description = sanitize_description(&event.description);
        if !description.trim().is_empty() {
            html.push_str(&format!(
                "    <div class=\"event-description\">{description}</div>\n"
            ));
        }

        if is_web_url(&event.calendar_link) {
            html.push_str(&format!(
                "    <p class=\"event-link\"><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">Add to calendar</a></p>\n",
                encode_double_quoted_attribute(&event.calendar_link)
            ));
        }

        html.push_str("</article>\n");
        html
    }

    /// Render a list of events in order, or the placeholder when empty.
    pub fn render_list(&self, events: &[NormalizedEvent]) -> String {
        if events.is_empty() {
            return format!("<p class=\"no-events\">{NO_EVENTS_PLACEHOLDER}</p>\n");
        }
        events.iter().map(|event| self.render_event(event)).collect()
    }

    /// Fill every present container from `source`.
    ///
    /// Never fails: a load error is rendered into the containers and write
    /// errors are reported per section.
    pub fn render(
        &self,
        source: &EventSiteResult<EventCollection>,
        containers: &mut dyn Containers,
    ) -> RenderReport {
        if let Err(err) = source {
            warn!("Could not load events: {err}");
        }

        RenderReport {
            upcoming: self.render_section(Section::Upcoming, source, containers),
            past: self.render_section(Section::Past, source, containers),
        }
    }

    fn render_section(
        &self,
        section: Section,
        source: &EventSiteResult<EventCollection>,
        containers: &mut dyn Containers,
    ) -> SectionOutcome {
        let id = section.container_id();
        match containers.contains(id) {
            Ok(true) => {}
            Ok(false) => return SectionOutcome::Skipped,
            Err(err) => {
                warn!(container = id, "Could not look up events section: {err}");
                return SectionOutcome::WriteFailed(err);
            }
        }

        let (html, outcome) = match source {
            Ok(collection) => {
                let events = section.events(collection);
                (
                    self.render_list(events),
                    SectionOutcome::Rendered {
                        events: events.len(),
                    },
                )
            }
            Err(_) => (
                format!(
                    "<p class=\"events-error\">{}</p>\n",
                    section.error_message()
                ),
                SectionOutcome::LoadFailed,
            ),
        };

        match containers.fill(id, &html) {
            Ok(()) => {
                info!(container = id, "Rendered events section");
                outcome
            }
            Err(err) => {
                warn!(container = id, "Could not write events section: {err}");
                SectionOutcome::WriteFailed(err)
            }
        }
    }
}
