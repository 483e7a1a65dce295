//! Core of the eventsite tooling.
//!
//! This crate holds everything between a calendar provider and a page:
//! - `event` for raw and normalized event types
//! - `fetch` for the provider seam and the fetch cycle
//! - `collection` for the upcoming/past document
//! - `sanitize` and `time_format` for display-safe text
//! - `render` and `page` for writing listings into site pages

pub mod collection;
pub mod constants;
pub mod error;
pub mod event;
pub mod fetch;
pub mod page;
pub mod render;
pub mod sanitize;
pub mod time_format;

pub use collection::EventCollection;
pub use error::{EventSiteError, EventSiteResult};
pub use event::{EventMarker, NormalizedEvent, RawEvent};
pub use fetch::{EventListing, EventProvider, Fetcher};
pub use page::{IncludeDir, Page};
pub use render::{Containers, RenderReport, Renderer, Section, SectionOutcome};
pub use sanitize::sanitize_description;
pub use time_format::{ClockStyle, TimeFormatter, ZonedTimes};
