use anyhow::{Context, Result};
use chrono_tz::Tz;
use eventsite_core::constants::DEFAULT_MAX_RESULTS;
use eventsite_core::{ClockStyle, EventSiteError, EventSiteResult};
use eventsite_provider_google::DEFAULT_BASE_URL;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "eventsite.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub site: SiteConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarConfig {
    /// Calendar to list. `CALENDAR_ID` takes precedence.
    pub id: Option<String>,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Zone for events that name none, when the calendar names none either
    pub default_time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_events_json")]
    pub events_json: PathBuf,

    #[serde(default = "default_includes_dir")]
    pub includes_dir: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayConfig {
    #[serde(default)]
    pub clock: ClockStyle,

    /// Zone for the "your local time" line; no such line when unset
    pub viewer_time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_pages")]
    pub pages: Vec<PathBuf>,

    #[serde(default = "default_assets")]
    pub assets: Vec<PathBuf>,
}

/// What it takes to read the calendar.
pub struct Credentials {
    pub calendar_id: String,
    pub api_key: SecretString,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_events_json() -> PathBuf {
    PathBuf::from("events.json")
}

fn default_includes_dir() -> PathBuf {
    PathBuf::from("_includes")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("_site")
}

fn default_pages() -> Vec<PathBuf> {
    vec![PathBuf::from("index.html"), PathBuf::from("pastevents.html")]
}

fn default_assets() -> Vec<PathBuf> {
    vec![PathBuf::from("simple.css")]
}

impl Default for CalendarConfig {
    fn default() -> Self {
        CalendarConfig {
            id: None,
            max_results: default_max_results(),
            base_url: default_base_url(),
            default_time_zone: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            events_json: default_events_json(),
            includes_dir: default_includes_dir(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            output_dir: default_output_dir(),
            pages: default_pages(),
            assets: default_assets(),
        }
    }
}

impl Config {
    /// Load the config file and apply environment overrides.
    ///
    /// An explicitly named file must exist. Without one, `eventsite.toml` is
    /// used when present and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let mut config = match explicit {
            Some(path) => Self::read(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::read(path)?
                } else {
                    debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                    Config::default()
                }
            }
        };

        config.apply_env_with(|k| std::env::var(k).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file at {}", path.display()))?;

        Ok(config)
    }

    fn validate(&self) -> EventSiteResult<()> {
        if self.calendar.max_results == 0 {
            return Err(EventSiteError::Config(
                "[calendar] max_results must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides read through `get`.
    pub fn apply_env_with<F>(&mut self, mut get: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(id) = get("CALENDAR_ID").filter(|id| !id.trim().is_empty()) {
            self.calendar.id = Some(id);
        }
    }

    /// Calendar id and API key. The key only ever comes from the environment.
    pub fn credentials_with<F>(&self, mut get: F) -> EventSiteResult<Credentials>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let calendar_id = self
            .calendar
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                EventSiteError::Config(
                    "calendar id missing; set CALENDAR_ID or [calendar] id".into(),
                )
            })?;

        let api_key = ["GOOGLE_CALENDAR_API_KEY", "GOOGLE_API_KEY"]
            .into_iter()
            .find_map(|name| get(name).filter(|key| !key.trim().is_empty()))
            .ok_or_else(|| {
                EventSiteError::Config(
                    "API key missing; set GOOGLE_CALENDAR_API_KEY or GOOGLE_API_KEY".into(),
                )
            })?;

        Ok(Credentials {
            calendar_id,
            api_key: SecretString::new(api_key.into()),
        })
    }

    pub fn credentials(&self) -> EventSiteResult<Credentials> {
        self.credentials_with(|k| std::env::var(k).ok())
    }

    /// Zone for events when neither the event nor its calendar names one.
    pub fn default_zone(&self) -> EventSiteResult<Tz> {
        resolve_zone(self.calendar.default_time_zone.as_deref(), system_zone)
    }

    /// Zone of the people reading the site. Unlike [`Config::default_zone`]
    /// this never falls back to the host's zone.
    pub fn viewer_zone(&self) -> EventSiteResult<Option<Tz>> {
        self.display
            .viewer_time_zone
            .as_deref()
            .map(parse_zone)
            .transpose()
    }
}

/// A configured zone must be known; otherwise fall back to `fallback`.
fn resolve_zone(configured: Option<&str>, fallback: impl FnOnce() -> Tz) -> EventSiteResult<Tz> {
    match configured {
        Some(name) => parse_zone(name),
        None => Ok(fallback()),
    }
}

fn parse_zone(name: &str) -> EventSiteResult<Tz> {
    name.parse()
        .map_err(|_| EventSiteError::Config(format!("unknown time zone \"{name}\"")))
}

/// The host's zone, or UTC when it cannot be determined.
fn system_zone() -> Tz {
    match iana_time_zone::get_timezone() {
        Ok(name) => name.parse().unwrap_or_else(|_| {
            warn!(zone = %name, "System time zone is not a known IANA zone, using UTC");
            Tz::UTC
        }),
        Err(e) => {
            warn!("Could not determine system time zone ({e}), using UTC");
            Tz::UTC
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::default();

        assert_eq!(config.calendar.max_results, 2500);
        assert_eq!(config.calendar.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.output.events_json, PathBuf::from("events.json"));
        assert_eq!(config.output.includes_dir, PathBuf::from("_includes"));
        assert_eq!(config.display.clock, ClockStyle::TwelveHour);
        assert_eq!(config.site.pages.len(), 2);
    }

    #[test]
    fn test_parse_full_file() {
        let config: Config = toml::from_str(
            r#"
            [calendar]
            id = "group@example.org"
            max_results = 100
            default_time_zone = "America/Toronto"

            [output]
            events_json = "data/events.json"

            [display]
            clock = "24h"
            viewer_time_zone = "Europe/Paris"

            [site]
            output_dir = "public"
            pages = ["index.html"]
            assets = []
            "#,
        )
        .unwrap();

        assert_eq!(config.calendar.id.as_deref(), Some("group@example.org"));
        assert_eq!(config.calendar.max_results, 100);
        assert_eq!(config.calendar.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.output.events_json, PathBuf::from("data/events.json"));
        assert_eq!(config.output.includes_dir, PathBuf::from("_includes"));
        assert_eq!(config.display.clock, ClockStyle::TwentyFourHour);
        assert_eq!(config.default_zone().unwrap(), chrono_tz::America::Toronto);
        assert_eq!(config.viewer_zone().unwrap(), Some(chrono_tz::Europe::Paris));
        assert!(config.site.assets.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let res: Result<Config, _> = toml::from_str("[calendar]\ncalendar_id = \"x\"\n");
        assert!(res.is_err());
    }

    #[test]
    fn test_unset_viewer_zone_has_no_fallback() {
        assert_eq!(Config::default().viewer_zone().unwrap(), None);
    }

    #[test]
    fn test_unknown_zone_is_config_error() {
        let mut config = Config::default();
        config.display.viewer_time_zone = Some("Atlantis/Capital".to_string());

        assert!(matches!(config.viewer_zone(), Err(EventSiteError::Config(_))));
    }

    #[test]
    fn test_env_calendar_id_overrides_file() {
        let mut config = Config::default();
        config.calendar.id = Some("from-file".to_string());

        config.apply_env_with(|k| match k {
            "CALENDAR_ID" => Some("from-env".into()),
            _ => None,
        });

        assert_eq!(config.calendar.id.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_credentials_prefer_calendar_specific_key() {
        let mut config = Config::default();
        config.calendar.id = Some("group".to_string());

        let creds = config
            .credentials_with(|k| match k {
                "GOOGLE_CALENDAR_API_KEY" => Some("calendar-key".into()),
                "GOOGLE_API_KEY" => Some("general-key".into()),
                _ => None,
            })
            .unwrap();

        assert_eq!(creds.calendar_id, "group");
        assert_eq!(creds.api_key.expose_secret(), "calendar-key");
    }

    #[test]
    fn test_credentials_fall_back_to_general_key() {
        let mut config = Config::default();
        config.calendar.id = Some("group".to_string());

        let creds = config
            .credentials_with(|k| match k {
                "GOOGLE_API_KEY" => Some("general-key".into()),
                _ => None,
            })
            .unwrap();

        assert_eq!(creds.api_key.expose_secret(), "general-key");
    }

    #[test]
    fn test_missing_credentials() {
        let mut config = Config::default();
        assert!(config.credentials_with(|_| Some("key".into())).is_err());

        config.calendar.id = Some("group".to_string());
        assert!(config.credentials_with(|_| None).is_err());
        assert!(config.credentials_with(|_| Some("  ".into())).is_err());
    }

    #[test]
    fn test_zero_max_results_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eventsite.toml");
        std::fs::write(&path, "[calendar]\nmax_results = 0\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("max_results must be at least 1"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
