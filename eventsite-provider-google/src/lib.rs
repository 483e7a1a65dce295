//! Google Calendar as an event source for eventsite.

pub mod client;
pub mod types;

pub use client::{DEFAULT_BASE_URL, GoogleCalendar};
