//! Core domain types for milestat
//!
//! This module contains the fundamental types used throughout the milestat
//! crates: strongly-typed identifiers, the money type, raw mileage/pay events,
//! aggregation granularities, namespaces, and aggregate buckets.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use crate::error::{MilestatError, Result};

/// Unique identifier of a stored event
///
/// # Examples
/// ```
/// use milestat_core::types::EventId;
///
/// let id = EventId::new(12);
/// assert_eq!(id.get(), 12);
/// assert_eq!(id.to_string(), "#12");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Create a new EventId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Strongly-typed company label
///
/// Company names are trimmed on construction; [`CompanyName::parse`] rejects
/// empty names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyName(String);

impl CompanyName {
    /// Create a new CompanyName from any string-like type
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    /// Parse a user-supplied company name
    pub fn parse(name: &str) -> Result<Self> {
        let company = Self::new(name);
        if company.0.is_empty() {
            return Err(MilestatError::InvalidArgument(
                "company name must not be empty".to_string(),
            ));
        }
        Ok(company)
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CompanyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Money amount held as integer cents
///
/// Pay is recorded with two decimal places, so keeping cents avoids the
/// residue that repeated float subtraction leaves behind during
/// reconciliation.
///
/// # Examples
/// ```
/// use milestat_core::types::Money;
///
/// let pay: Money = "50.25".parse().unwrap();
/// assert_eq!(pay.cents(), 5025);
/// assert_eq!(pay.to_string(), "50.25");
///
/// let total = pay + Money::from_cents(75);
/// assert_eq!(total.to_string(), "51.00");
/// ```
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Money = Money(0);

    /// Create from a number of cents
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Amount in cents
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Amount in currency units, for ratios and display
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Whether the amount is zero or below
    pub fn is_non_positive(&self) -> bool {
        self.0 <= 0
    }

    /// Sum of two amounts, `None` on overflow
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Sum of two amounts, clamped at the bounds
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = MilestatError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || MilestatError::InvalidAmount(format!("'{s}', expected e.g. 42 or 42.50"));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(invalid)?;

        Ok(Self(if negative { -cents } else { cents }))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Unvalidated input for a new mileage/pay event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Odometer reading at the start of the trip
    pub start_odometer: i64,
    /// Odometer reading at the end of the trip
    pub end_odometer: i64,
    /// Pay earned for the trip
    pub pay: Money,
    /// Company the trip was driven for
    pub company: Option<CompanyName>,
    /// Date the trip happened
    pub occurred_at: NaiveDate,
}

impl NewEvent {
    /// Check the odometer and pay constraints
    pub fn validate(&self) -> Result<()> {
        if self.start_odometer < 0 || self.end_odometer < 0 {
            return Err(MilestatError::InvalidEvent(format!(
                "odometer readings {}..{} must not be negative",
                self.start_odometer, self.end_odometer
            )));
        }
        if self.end_odometer < self.start_odometer {
            return Err(MilestatError::InvalidEvent(format!(
                "end odometer {} is below start odometer {}",
                self.end_odometer, self.start_odometer
            )));
        }
        if self.pay < Money::ZERO {
            return Err(MilestatError::InvalidEvent(format!(
                "pay {} must not be negative",
                self.pay
            )));
        }
        Ok(())
    }

    /// Distance driven, derived from the odometer readings
    pub fn total_distance(&self) -> i64 {
        self.end_odometer - self.start_odometer
    }

    /// Attach the id assigned by a store
    pub fn into_event(self, id: EventId) -> Event {
        Event {
            id,
            start_odometer: self.start_odometer,
            end_odometer: self.end_odometer,
            pay: self.pay,
            company: self.company,
            occurred_at: self.occurred_at,
        }
    }
}

/// A stored mileage/pay event
///
/// Events are immutable once inserted; the only mutation is deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned id
    pub id: EventId,
    /// Odometer reading at the start of the trip
    pub start_odometer: i64,
    /// Odometer reading at the end of the trip
    pub end_odometer: i64,
    /// Pay earned for the trip
    pub pay: Money,
    /// Company the trip was driven for
    pub company: Option<CompanyName>,
    /// Date the trip happened
    pub occurred_at: NaiveDate,
}

impl Event {
    /// Distance driven, derived from the odometer readings
    pub fn total_distance(&self) -> i64 {
        self.end_odometer - self.start_odometer
    }

    /// The totals a bucket holds when this event is its only member
    pub fn totals(&self) -> TotalsMatch {
        TotalsMatch {
            distance: self.total_distance(),
            pay: self.pay,
        }
    }

    /// Whether the event belongs to the given namespace
    pub fn belongs_to(&self, namespace: &Namespace) -> bool {
        match namespace {
            Namespace::Global => true,
            Namespace::Company(name) => self.company.as_ref() == Some(name),
        }
    }
}

/// Time granularity of an aggregate bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Granularity {
    /// All granularities, finest first
    pub const ALL: [Granularity; 4] = [
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Yearly,
    ];

    /// Stable lowercase name, used for storage and output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "yearly" | "year" => Ok(Self::Yearly),
            _ => Err(format!("Invalid granularity: {s}")),
        }
    }
}

/// First day of an aggregation week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    /// Weeks run Sunday through Saturday
    #[default]
    Sunday,
    /// ISO weeks, Monday through Sunday
    Monday,
}

impl WeekStart {
    /// The chrono weekday the week begins on
    pub fn weekday(&self) -> Weekday {
        match self {
            Self::Sunday => Weekday::Sun,
            Self::Monday => Weekday::Mon,
        }
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sunday => write!(f, "sunday"),
            Self::Monday => write!(f, "monday"),
        }
    }
}

impl FromStr for WeekStart {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sunday" | "sun" => Ok(Self::Sunday),
            "monday" | "mon" | "iso" => Ok(Self::Monday),
            _ => Err(format!("Invalid week start: {s} (expected sunday or monday)")),
        }
    }
}

/// Inclusive date range covered by one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// Whether `date` falls within the period
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Human-readable label: `2024-03-01`, `2024-02-25..2024-03-02`, `2024-03`, `2024`
    pub fn label(&self) -> String {
        match self.granularity {
            Granularity::Daily => self.start.format("%Y-%m-%d").to_string(),
            Granularity::Weekly => format!(
                "{}..{}",
                self.start.format("%Y-%m-%d"),
                self.end.format("%Y-%m-%d")
            ),
            Granularity::Monthly => self.start.format("%Y-%m").to_string(),
            Granularity::Yearly => self.start.format("%Y").to_string(),
        }
    }
}

/// Aggregate namespace
///
/// `Global` aggregates every event; `Company` aggregates only the events
/// labelled with that company.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Namespace {
    Global,
    Company(CompanyName),
}

impl Namespace {
    /// Namespace for an optional company filter
    pub fn for_company(company: Option<CompanyName>) -> Self {
        company.map_or(Self::Global, Self::Company)
    }

    /// Stable storage key: `global` or `company:<name>`
    pub fn storage_key(&self) -> String {
        match self {
            Self::Global => "global".to_string(),
            Self::Company(name) => format!("company:{name}"),
        }
    }

    /// Inverse of [`Namespace::storage_key`]
    pub fn from_storage_key(key: &str) -> Result<Self> {
        if key == "global" {
            return Ok(Self::Global);
        }
        key.strip_prefix("company:")
            .map(|name| Self::Company(CompanyName::new(name)))
            .ok_or_else(|| MilestatError::InvalidArgument(format!("unknown namespace key '{key}'")))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Identity of an aggregate bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub namespace: Namespace,
    pub granularity: Granularity,
    pub start: NaiveDate,
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.namespace,
            self.granularity,
            self.start.format("%Y-%m-%d")
        )
    }
}

/// Exact totals a bucket must hold to be treated as a single-event bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalsMatch {
    pub distance: i64,
    pub pay: Money,
}

/// Aggregate statistics for one (namespace, granularity, period)
///
/// The average pay per distance unit is always derived from the totals
/// and never stored.
///
/// # Examples
/// ```
/// use milestat_core::types::{AggregateBucket, Granularity, Money, Namespace, Period};
/// use chrono::NaiveDate;
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let period = Period { granularity: Granularity::Daily, start: day, end: day };
/// let bucket = AggregateBucket::new(Namespace::Global, period, 100, Money::from_cents(7500));
/// assert_eq!(bucket.avg_per_distance(), 0.75);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateBucket {
    pub namespace: Namespace,
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_distance: i64,
    pub total_pay: Money,
}

impl AggregateBucket {
    /// Create a bucket covering `period`
    pub fn new(namespace: Namespace, period: Period, total_distance: i64, total_pay: Money) -> Self {
        Self {
            namespace,
            granularity: period.granularity,
            start: period.start,
            end: period.end,
            total_distance,
            total_pay,
        }
    }

    /// The bucket's identity
    pub fn key(&self) -> BucketKey {
        BucketKey {
            namespace: self.namespace.clone(),
            granularity: self.granularity,
            start: self.start,
        }
    }

    /// The date range the bucket covers
    pub fn period(&self) -> Period {
        Period {
            granularity: self.granularity,
            start: self.start,
            end: self.end,
        }
    }

    /// Whether `date` falls within the bucket's range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.period().contains(date)
    }

    /// Pay per distance unit, or 0 when no distance has been recorded
    pub fn avg_per_distance(&self) -> f64 {
        if self.total_distance > 0 {
            self.total_pay.as_f64() / self.total_distance as f64
        } else {
            0.0
        }
    }

    /// A bucket with no distance and no pay must not be kept
    pub fn is_exhausted(&self) -> bool {
        self.total_distance <= 0 && self.total_pay.is_non_positive()
    }

    /// Whether the totals equal `totals` exactly
    pub fn matches(&self, totals: &TotalsMatch) -> bool {
        self.total_distance == totals.distance && self.total_pay == totals.pay
    }
}
