//! Timezone used to date events recorded without an explicit date
//!
//! Events carry a calendar date only, so the timezone matters for one thing:
//! which date "today" is when `add` is run without `--date`.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{MilestatError, Result};

/// The timezone that resolves "today"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneConfig {
    pub tz: Tz,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            tz: get_local_timezone(),
        }
    }
}

impl TimezoneConfig {
    /// Resolve `--utc` / `--timezone`, falling back to the system timezone
    pub fn from_cli(timezone: Option<&str>, utc: bool) -> Result<Self> {
        let tz = match (utc, timezone) {
            (true, _) => Tz::UTC,
            (false, Some(name)) => name.parse::<Tz>().map_err(|_| {
                MilestatError::Config(format!(
                    "unknown timezone '{name}', expected an IANA name such as 'Europe/Berlin' or 'UTC'"
                ))
            })?,
            (false, None) => return Ok(Self::default()),
        };
        Ok(Self { tz })
    }

    /// IANA name of the timezone
    pub fn display_name(&self) -> &'static str {
        self.tz.name()
    }

    /// The current calendar date in this timezone
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }
}

/// Detect the system timezone from `TZ`, then the platform; UTC if neither parses
pub fn get_local_timezone() -> Tz {
    let from_env = std::env::var("TZ").ok().and_then(|name| name.parse::<Tz>().ok());
    if let Some(tz) = from_env {
        debug!(timezone = tz.name(), "Timezone from TZ");
        return tz;
    }

    match iana_time_zone::get_timezone().map(|name| name.parse::<Tz>()) {
        Ok(Ok(tz)) => {
            debug!(timezone = tz.name(), "Timezone from system");
            tz
        }
        Ok(Err(_)) | Err(_) => {
            debug!("System timezone unavailable, dating events in UTC");
            Tz::UTC
        }
    }
}
