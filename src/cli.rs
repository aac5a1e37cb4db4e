//! CLI interface for milestat
//!
//! This module defines the command-line interface using clap. Global flags
//! select the store, the week start, the timezone used for "today", and the
//! output format; subcommands record, delete, and report on events.
//!
//! # Example
//!
//! ```bash
//! # Record a trip driven for a company today
//! milestat add --start 12000 --end 12050 --pay 50 --company acme
//!
//! # Latest daily/weekly/monthly/yearly totals as JSON
//! milestat summary --json
//!
//! # Weekly buckets with ISO weeks
//! milestat --week-start monday buckets --granularity weekly
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use milestat_core::{CompanyName, Granularity, MilestatError, Money, Result, WeekStart};

/// Track mileage and pay with rolling period aggregates
#[derive(Parser, Debug, Clone)]
#[command(name = "milestat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Show informational output (default is quiet mode with only warnings and errors)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// SQLite database file
    #[arg(long, global = true, env = "MILESTAT_DB", value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Keep everything in memory for this run (nothing is persisted)
    #[arg(long, global = true)]
    pub memory: bool,

    /// First day of aggregation weeks
    /// A database keeps the week start it was first used with
    #[arg(
        long,
        global = true,
        env = "MILESTAT_WEEK_START",
        default_value = "sunday",
        value_name = "DAY"
    )]
    pub week_start: WeekStart,

    /// Timezone used to resolve today's date (e.g. "America/New_York", "UTC")
    /// If not specified, uses the system's local timezone
    #[arg(long, short = 'z', global = true)]
    pub timezone: Option<String>,

    /// Use UTC to resolve today's date (overrides --timezone)
    #[arg(long, global = true)]
    pub utc: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Record a trip and update its aggregates
    Add(AddArgs),

    /// Delete an event and reconcile its aggregates
    Delete {
        /// Event id as shown by `milestat events`
        id: i64,
    },

    /// List recorded events
    Events {
        /// Only events driven for this company
        #[arg(long, short = 'c', value_parser = parse_company)]
        company: Option<CompanyName>,
    },

    /// Show the latest bucket of every granularity
    Summary {
        /// Show a registered company's aggregates instead of the global ones
        #[arg(long, short = 'c', value_parser = parse_company)]
        company: Option<CompanyName>,
    },

    /// List aggregate buckets
    Buckets {
        /// Only buckets of this granularity (daily, weekly, monthly, yearly)
        #[arg(long, short = 'g')]
        granularity: Option<Granularity>,

        /// Show a registered company's aggregates instead of the global ones
        #[arg(long, short = 'c', value_parser = parse_company)]
        company: Option<CompanyName>,
    },

    /// Recompute the buckets containing a date
    Recompute {
        /// Reference date (YYYY-MM-DD); defaults to the most recent event's date
        #[arg(long, short = 'd', value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Recompute a registered company's aggregates instead of the global ones
        #[arg(long, short = 'c', value_parser = parse_company)]
        company: Option<CompanyName>,
    },

    /// Manage companies with their own aggregates
    #[command(subcommand)]
    Company(CompanyCommand),
}

/// Arguments for recording a trip
#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Odometer reading at the start of the trip
    #[arg(long)]
    pub start: i64,

    /// Odometer reading at the end of the trip
    #[arg(long)]
    pub end: i64,

    /// Pay earned for the trip (e.g. 50 or 50.25)
    #[arg(long)]
    pub pay: Money,

    /// Company the trip was driven for
    #[arg(long, short = 'c', value_parser = parse_company)]
    pub company: Option<CompanyName>,

    /// Date of the trip (YYYY-MM-DD); defaults to today
    #[arg(long, short = 'd', value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

/// Company registry commands
#[derive(Subcommand, Debug, Clone)]
pub enum CompanyCommand {
    /// Register a company and build its aggregates from existing events
    Add {
        #[arg(value_parser = parse_company)]
        name: CompanyName,
    },
    /// List registered companies
    List,
    /// Unregister a company and drop its aggregates
    Remove {
        #[arg(value_parser = parse_company)]
        name: CompanyName,
    },
}

/// Parse a date in YYYY-MM-DD format
///
/// # Examples
/// ```
/// use milestat::cli::parse_date;
/// use chrono::Datelike;
///
/// let date = parse_date("2024-03-01").unwrap();
/// assert_eq!(date.month(), 3);
/// assert!(parse_date("2024-02-30").is_err());
/// ```
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|_| {
        MilestatError::InvalidDate(format!(
            "Invalid date '{date_str}', expected YYYY-MM-DD"
        ))
    })
}

/// Parse a non-empty company name
pub fn parse_company(name: &str) -> Result<CompanyName> {
    CompanyName::parse(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["milestat", "--json", "summary"]);
        assert!(cli.json);
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Command::Summary { company: None }));
    }

    #[test]
    fn test_add_command() {
        let cli = Cli::parse_from([
            "milestat", "add", "--start", "100", "--end", "150", "--pay", "50.25", "--company",
            "acme", "--date", "2024-03-01",
        ]);
        let Command::Add(args) = cli.command else {
            panic!("expected add command");
        };
        assert_eq!(args.start, 100);
        assert_eq!(args.end, 150);
        assert_eq!(args.pay, Money::from_cents(5025));
        assert_eq!(args.company, Some(CompanyName::new("acme")));
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_add_rejects_bad_pay() {
        let result = Cli::try_parse_from([
            "milestat", "add", "--start", "1", "--end", "2", "--pay", "1.234",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "milestat",
            "buckets",
            "--granularity",
            "weekly",
            "--week-start",
            "monday",
            "--memory",
        ]);
        assert!(cli.memory);
        assert_eq!(cli.week_start, WeekStart::Monday);
        assert!(matches!(
            cli.command,
            Command::Buckets {
                granularity: Some(Granularity::Weekly),
                company: None
            }
        ));
    }

    #[test]
    fn test_company_subcommands() {
        let cli = Cli::parse_from(["milestat", "company", "add", "acme"]);
        assert!(matches!(
            cli.command,
            Command::Company(CompanyCommand::Add { ref name }) if name.as_str() == "acme"
        ));

        let cli = Cli::parse_from(["milestat", "company", "list"]);
        assert!(matches!(cli.command, Command::Company(CompanyCommand::List)));

        assert!(Cli::try_parse_from(["milestat", "company", "add", "  "]).is_err());
    }

    #[test]
    fn test_delete_and_recompute() {
        let cli = Cli::parse_from(["milestat", "delete", "7"]);
        assert!(matches!(cli.command, Command::Delete { id: 7 }));

        let cli = Cli::parse_from(["milestat", "recompute", "--date", "2024-01-31"]);
        let Command::Recompute { date, company } = cli.command else {
            panic!("expected recompute command");
        };
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert!(company.is_none());
    }

    #[test]
    fn test_date_parsing() {
        let date = parse_date("2024-01-15").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);

        assert!(parse_date("invalid").is_err());
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("2024-01").is_err());
    }
}
