//! Calendar rules mapping a date to its aggregation period
//!
//! Bucket identity depends only on the granularity, the configured week
//! start, and a date inside the period. The event that triggered a
//! computation never influences the boundaries.
//!
//! # Examples
//!
//! ```
//! use milestat_core::period::Calendar;
//! use milestat_core::types::{Granularity, WeekStart};
//! use chrono::NaiveDate;
//!
//! let calendar = Calendar::new(WeekStart::Sunday);
//! let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(); // a Friday
//!
//! let week = calendar.period(Granularity::Weekly, day);
//! assert_eq!(week.start, NaiveDate::from_ymd_opt(2024, 2, 25).unwrap());
//! assert_eq!(week.end, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
//! ```

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::types::{BucketKey, Granularity, Namespace, Period, WeekStart};

/// Calendar rule set for all granularities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calendar {
    week_start: WeekStart,
}

impl Calendar {
    /// Create a calendar whose weeks begin on `week_start`
    pub fn new(week_start: WeekStart) -> Self {
        Self { week_start }
    }

    /// The configured first day of the week
    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    /// The period of `granularity` that contains `date`
    pub fn period(&self, granularity: Granularity, date: NaiveDate) -> Period {
        let (start, end) = match granularity {
            Granularity::Daily => (date, date),
            Granularity::Weekly => {
                let offset = match self.week_start {
                    WeekStart::Sunday => date.weekday().num_days_from_sunday(),
                    WeekStart::Monday => date.weekday().num_days_from_monday(),
                };
                let start = date
                    .checked_sub_days(Days::new(u64::from(offset)))
                    .unwrap_or(NaiveDate::MIN);
                let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
                (start, end)
            }
            Granularity::Monthly => {
                let start = date.with_day(1).unwrap_or(date);
                let end = start
                    .checked_add_months(Months::new(1))
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(NaiveDate::MAX);
                (start, end)
            }
            Granularity::Yearly => {
                let start = date.with_ordinal(1).unwrap_or(date);
                let end = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(NaiveDate::MAX);
                (start, end)
            }
        };

        Period {
            granularity,
            start,
            end,
        }
    }

    /// Every period containing `date`, finest first
    pub fn periods(&self, date: NaiveDate) -> [Period; 4] {
        Granularity::ALL.map(|granularity| self.period(granularity, date))
    }

    /// The canonical bucket key for `date` in `namespace`
    pub fn bucket_key(
        &self,
        namespace: &Namespace,
        granularity: Granularity,
        date: NaiveDate,
    ) -> BucketKey {
        BucketKey {
            namespace: namespace.clone(),
            granularity,
            start: self.period(granularity, date).start,
        }
    }
}
