//! The upcoming/past event document.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{EventSiteError, EventSiteResult};
use crate::event::NormalizedEvent;

/// Events split around a single snapshot of "now".
///
/// Serialized as `{ "upcoming": [...], "past": [...] }`, which is the shape of
/// the persisted events document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCollection {
    /// Earliest first, in provider order
    pub upcoming: Vec<NormalizedEvent>,
    /// Most recent first
    pub past: Vec<NormalizedEvent>,
}

impl EventCollection {
    /// Split events into upcoming (start at or after `now`) and past.
    ///
    /// Upcoming events keep their input order. Past events are stably sorted
    /// newest first, so ties keep their input order too.
    pub fn partition(events: impl IntoIterator<Item = NormalizedEvent>, now: DateTime<Utc>) -> Self {
        let (upcoming, mut past): (Vec<_>, Vec<_>) = events
            .into_iter()
            .partition(|event| event.start_instant >= now);

        past.sort_by(|a, b| b.start_instant.cmp(&a.start_instant));

        EventCollection { upcoming, past }
    }

    pub fn len(&self) -> usize {
        self.upcoming.len() + self.past.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upcoming.is_empty() && self.past.is_empty()
    }

    /// Read a previously saved document.
    pub fn load(path: &Path) -> EventSiteResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            EventSiteError::Serialization(format!("{}: {e}", path.display()))
        })
    }

    /// Write the document, replacing any previous one.
    ///
    /// The content goes to a temporary file next to `path` that is renamed
    /// over it, so readers never observe a partially written document and a
    /// failed save leaves the previous one in place.
    pub fn save(&self, path: &Path) -> EventSiteResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.write_all(b"\n")?;
        file.persist(path).map_err(|e| EventSiteError::Io(e.error))?;

        Ok(())
    }
}
