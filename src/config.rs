//! Runtime settings resolved from the command line and environment

use std::path::PathBuf;

use milestat_core::timezone::TimezoneConfig;
use milestat_core::{MilestatError, Result, WeekStart};

use crate::cli::Cli;

/// Name of the database file inside the data directory
pub const DEFAULT_DB_FILE: &str = "milestat.db";

/// Which store backs the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// SQLite database at the given path
    Sqlite(PathBuf),
    /// Process-local store, discarded on exit
    Memory,
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: StoreBackend,
    pub week_start: WeekStart,
    pub timezone: TimezoneConfig,
    pub json: bool,
    pub verbose: bool,
}

impl Settings {
    /// Resolve settings from parsed CLI arguments
    ///
    /// `--memory` wins over `--db`; without either the database lives in the
    /// platform data directory.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let backend = if cli.memory {
            StoreBackend::Memory
        } else {
            match &cli.db {
                Some(path) => StoreBackend::Sqlite(path.clone()),
                None => StoreBackend::Sqlite(default_db_path()?),
            }
        };

        Ok(Self {
            backend,
            week_start: cli.week_start,
            timezone: TimezoneConfig::from_cli(cli.timezone.as_deref(), cli.utc)?,
            json: cli.json,
            verbose: cli.verbose,
        })
    }

    /// Default tracing filter directive for this run
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "milestat=info"
        } else {
            "milestat=warn"
        }
    }
}

/// `<data dir>/milestat/milestat.db`
pub fn default_db_path() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join("milestat").join(DEFAULT_DB_FILE))
        .ok_or_else(|| {
            MilestatError::Config(
                "could not determine the data directory, pass --db <PATH>".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_memory_overrides_db() {
        let cli = Cli::parse_from(["milestat", "--memory", "--db", "/tmp/x.db", "--utc", "events"]);
        let settings = Settings::from_cli(&cli).unwrap();
        assert_eq!(settings.backend, StoreBackend::Memory);
        assert_eq!(settings.timezone.display_name(), "UTC");
    }

    #[test]
    fn test_explicit_db_path() {
        let cli = Cli::parse_from(["milestat", "--db", "/tmp/ledger.db", "--utc", "events"]);
        let settings = Settings::from_cli(&cli).unwrap();
        assert_eq!(
            settings.backend,
            StoreBackend::Sqlite(PathBuf::from("/tmp/ledger.db"))
        );
        assert_eq!(settings.log_directive(), "milestat=warn");
    }

    #[test]
    fn test_invalid_timezone() {
        let cli = Cli::parse_from(["milestat", "--memory", "-z", "Mars/Olympus", "events"]);
        assert!(matches!(
            Settings::from_cli(&cli),
            Err(MilestatError::Config(_))
        ));
    }

    #[test]
    fn test_verbose_directive() {
        let cli = Cli::parse_from(["milestat", "--memory", "--utc", "-v", "events"]);
        let settings = Settings::from_cli(&cli).unwrap();
        assert!(settings.verbose);
        assert_eq!(settings.log_directive(), "milestat=info");
    }
}
