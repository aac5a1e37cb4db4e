//! Output formatting module for milestat
//!
//! This module provides formatters for displaying ledger data in different formats:
//! - Table format for human-readable terminal output
//! - JSON format for machine-readable output and integration with other tools
//!
//! # Examples
//!
//! ```
//! use milestat_terminal::get_formatter;
//! use milestat_core::{AggregateBucket, Granularity, Money, Namespace};
//! use milestat_core::period::Calendar;
//! use chrono::NaiveDate;
//!
//! let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let period = Calendar::default().period(Granularity::Monthly, day);
//! let buckets = vec![AggregateBucket::new(Namespace::Global, period, 120, Money::from_cents(9000))];
//!
//! // Table formatter for human-readable output
//! let formatter = get_formatter(false);
//! println!("{}", formatter.format_buckets(&buckets));
//!
//! // JSON formatter for machine-readable output
//! let json_formatter = get_formatter(true);
//! println!("{}", json_formatter.format_buckets(&buckets));
//! ```

use colored::Colorize;
use milestat_core::{AggregateBucket, CompanyName, Event, Money, Namespace};
use prettytable::{Row, Table, format, row};
use serde_json::{Value, json};

/// Trait for output formatters
///
/// Implementations render ledger data for a particular audience
/// (terminal tables, JSON, ...).
pub trait OutputFormatter {
    /// Format raw events with a totals row
    fn format_events(&self, events: &[Event]) -> String;

    /// Format aggregate buckets
    fn format_buckets(&self, buckets: &[AggregateBucket]) -> String;

    /// Format the latest bucket of each granularity for one namespace
    fn format_summary(&self, namespace: &Namespace, latest: &[AggregateBucket]) -> String;

    /// Format the registered companies
    fn format_companies(&self, companies: &[CompanyName]) -> String;
}

/// Table formatter for human-readable output
///
/// Distances are shown with thousands separators and pay with a
/// currency sign.
#[derive(Debug, Default)]
pub struct TableFormatter;

impl TableFormatter {
    /// Create a new TableFormatter
    pub fn new() -> Self {
        Self
    }

    /// Format a number with thousands separators
    fn format_number(n: i64) -> String {
        let digits = n.unsigned_abs().to_string();
        let mut result = String::new();

        for (count, ch) in digits.chars().rev().enumerate() {
            if count > 0 && count % 3 == 0 {
                result.push(',');
            }
            result.push(ch);
        }
        if n < 0 {
            result.push('-');
        }

        result.chars().rev().collect()
    }

    /// Format money with a dollar sign
    fn format_money(amount: Money) -> String {
        match amount.to_string().strip_prefix('-') {
            Some(abs) => format!("-${abs}"),
            None => format!("${amount}"),
        }
    }

    fn format_rate(rate: f64) -> String {
        format!("${rate:.2}")
    }

    fn new_table() -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table
    }

    fn bucket_row(bucket: &AggregateBucket) -> Row {
        row![
            bucket.granularity,
            bucket.period().label(),
            r -> Self::format_number(bucket.total_distance),
            r -> Self::format_money(bucket.total_pay),
            r -> Self::format_rate(bucket.avg_per_distance())
        ]
    }
}

impl OutputFormatter for TableFormatter {
    fn format_events(&self, events: &[Event]) -> String {
        if events.is_empty() {
            return "No events recorded.\n".to_string();
        }

        let mut table = Self::new_table();
        table.set_titles(row![
            b -> "ID",
            b -> "Date",
            b -> "Company",
            b -> "Start",
            b -> "End",
            b -> "Distance",
            b -> "Pay"
        ]);

        for event in events {
            let company = event.company.as_ref().map_or("-", CompanyName::as_str);
            table.add_row(row![
                r -> event.id,
                event.occurred_at.format("%Y-%m-%d"),
                company,
                r -> Self::format_number(event.start_odometer),
                r -> Self::format_number(event.end_odometer),
                r -> Self::format_number(event.total_distance()),
                r -> Self::format_money(event.pay)
            ]);
        }

        let (total_distance, total_pay) = event_totals(events);
        table.add_row(row![
            b -> "TOTAL",
            "",
            "",
            "",
            "",
            rb -> Self::format_number(total_distance),
            rb -> Self::format_money(total_pay)
        ]);

        table.to_string()
    }

    fn format_buckets(&self, buckets: &[AggregateBucket]) -> String {
        if buckets.is_empty() {
            return "No aggregates recorded.\n".to_string();
        }

        let mut table = Self::new_table();
        table.set_titles(row![
            b -> "Granularity",
            b -> "Period",
            b -> "Distance",
            b -> "Pay",
            b -> "Avg/Distance"
        ]);
        for bucket in buckets {
            table.add_row(Self::bucket_row(bucket));
        }

        table.to_string()
    }

    fn format_summary(&self, namespace: &Namespace, latest: &[AggregateBucket]) -> String {
        let heading = match namespace {
            Namespace::Global => "Latest totals (all companies)".to_string(),
            Namespace::Company(name) => format!("Latest totals for {name}"),
        };
        let mut output = format!("{}\n", heading.bold());

        if latest.is_empty() {
            output.push_str("No aggregates recorded.\n");
            return output;
        }

        output.push_str(&self.format_buckets(latest));
        output
    }

    fn format_companies(&self, companies: &[CompanyName]) -> String {
        if companies.is_empty() {
            return "No companies registered.\n".to_string();
        }

        let mut table = Self::new_table();
        table.set_titles(row![b -> "Company"]);
        for company in companies {
            table.add_row(row![company]);
        }
        table.to_string()
    }
}

/// JSON formatter for machine-readable output
///
/// Pay is emitted both as integer cents and as a decimal string so
/// consumers never have to round floats.
pub struct JsonFormatter;

impl JsonFormatter {
    fn bucket_json(bucket: &AggregateBucket) -> Value {
        json!({
            "namespace": bucket.namespace.storage_key(),
            "granularity": bucket.granularity.as_str(),
            "start": bucket.start.format("%Y-%m-%d").to_string(),
            "end": bucket.end.format("%Y-%m-%d").to_string(),
            "total_distance": bucket.total_distance,
            "total_pay_cents": bucket.total_pay.cents(),
            "total_pay": bucket.total_pay.to_string(),
            "avg_per_distance": bucket.avg_per_distance(),
        })
    }

    fn render(value: Value) -> String {
        format!("{value:#}")
    }
}

/// Totals row for an event listing, clamped rather than overflowing
fn event_totals(events: &[Event]) -> (i64, Money) {
    events
        .iter()
        .fold((0i64, Money::ZERO), |(distance, pay), event| {
            (
                distance.saturating_add(event.total_distance()),
                pay.saturating_add(event.pay),
            )
        })
}

impl OutputFormatter for JsonFormatter {
    fn format_events(&self, events: &[Event]) -> String {
        let (total_distance, total_pay) = event_totals(events);

        Self::render(json!({
            "events": events.iter().map(|e| json!({
                "id": e.id.get(),
                "date": e.occurred_at.format("%Y-%m-%d").to_string(),
                "company": e.company.as_ref().map(CompanyName::as_str),
                "start_odometer": e.start_odometer,
                "end_odometer": e.end_odometer,
                "total_distance": e.total_distance(),
                "pay_cents": e.pay.cents(),
                "pay": e.pay.to_string(),
            })).collect::<Vec<_>>(),
            "totals": {
                "total_distance": total_distance,
                "total_pay_cents": total_pay.cents(),
                "total_pay": total_pay.to_string(),
            }
        }))
    }

    fn format_buckets(&self, buckets: &[AggregateBucket]) -> String {
        Self::render(json!({
            "buckets": buckets.iter().map(Self::bucket_json).collect::<Vec<_>>(),
        }))
    }

    fn format_summary(&self, namespace: &Namespace, latest: &[AggregateBucket]) -> String {
        let mut latest_by_granularity = serde_json::Map::new();
        for bucket in latest {
            latest_by_granularity.insert(
                bucket.granularity.as_str().to_string(),
                Self::bucket_json(bucket),
            );
        }

        Self::render(json!({
            "namespace": namespace.storage_key(),
            "latest": latest_by_granularity,
        }))
    }

    fn format_companies(&self, companies: &[CompanyName]) -> String {
        Self::render(json!({
            "companies": companies.iter().map(CompanyName::as_str).collect::<Vec<_>>(),
        }))
    }
}

/// Get the appropriate formatter for the `--json` flag
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter::new())
    }
}
