//! Calendar points.
use super::error::PeriodError;
use super::period::{Period, Size};
use super::unit::DateUnit;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An immutable `(year, month, day)` triple, totally ordered.
///
/// Every `Instant` except [`Instant::MAX`] denotes a real calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Instant {
    year: i32,
    month: u32,
    day: u32,
}

impl Instant {
    /// Start of the eternity period.
    pub const MIN: Instant = Instant { year: 1, month: 1, day: 1 };
    /// Stop of the eternity period. Not a calendar date.
    pub const MAX: Instant = Instant { year: i32::MAX, month: 12, day: 31 };

    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, PeriodError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self::from_date)
            .ok_or_else(|| PeriodError::malformed_instant(format!("{:04}-{:02}-{:02}", year, month, day)))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month(), day: date.day() }
    }

    #[inline]
    pub fn year(&self) -> i32 { self.year }
    #[inline]
    pub fn month(&self) -> u32 { self.month }
    #[inline]
    pub fn day(&self) -> u32 { self.day }

    pub fn date(&self) -> Result<NaiveDate, PeriodError> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .ok_or(PeriodError::UnboundedPeriod { operation: "date" })
    }

    /// Moves the instant by `amount` whole units (negative moves backwards).
    ///
    /// Month and year steps clamp the day to the length of the target month,
    /// so `2014-01-31 + 1 month` is `2014-02-28`.
    pub fn offset(&self, amount: i64, unit: DateUnit) -> Result<Self, PeriodError> {
        let date = self.date()?;
        let shifted = match unit {
            DateUnit::Day | DateUnit::Weekday => shift_days(date, amount),
            DateUnit::Week => shift_days(date, amount.saturating_mul(7)),
            DateUnit::Month => shift_months(date, amount),
            DateUnit::Year => shift_months(date, amount.saturating_mul(12)),
            DateUnit::Eternity => return Err(PeriodError::UnboundedPeriod { operation: "offset" }),
        };
        shifted
            .map(Self::from_date)
            .ok_or_else(|| PeriodError::malformed_instant(format!("{} {:+} {}", self, amount, unit)))
    }

    /// First day of the `unit` containing this instant.
    pub fn first_of(&self, unit: DateUnit) -> Result<Self, PeriodError> {
        match unit {
            DateUnit::Day | DateUnit::Weekday => Ok(*self),
            DateUnit::Week => {
                let date = self.date()?;
                let back = i64::from(date.weekday().num_days_from_monday());
                self.offset(-back, DateUnit::Day)
            }
            DateUnit::Month => Ok(Self { day: 1, ..*self }),
            DateUnit::Year => Ok(Self { month: 1, day: 1, ..*self }),
            DateUnit::Eternity => Ok(Self::MIN),
        }
    }

    /// Last day of the `unit` containing this instant.
    pub fn last_of(&self, unit: DateUnit) -> Result<Self, PeriodError> {
        match unit {
            DateUnit::Day | DateUnit::Weekday => Ok(*self),
            DateUnit::Week => self.first_of(DateUnit::Week)?.offset(6, DateUnit::Day),
            DateUnit::Month => Ok(Self { day: days_in_month(self.year, self.month), ..*self }),
            DateUnit::Year => Ok(Self { month: 12, day: 31, ..*self }),
            DateUnit::Eternity => Ok(Self::MAX),
        }
    }

    /// The single-unit period starting at this instant.
    pub fn period(&self, unit: DateUnit) -> Period {
        if unit == DateUnit::Eternity {
            return Period::eternity();
        }
        Period::raw(unit, *self, Size::Units(1))
    }
}

fn shift_days(date: NaiveDate, amount: i64) -> Option<NaiveDate> {
    if amount >= 0 {
        date.checked_add_days(Days::new(amount as u64))
    } else {
        date.checked_sub_days(Days::new(amount.unsigned_abs()))
    }
}

fn shift_months(date: NaiveDate, amount: i64) -> Option<NaiveDate> {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for Instant {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parser::parse_instant(s)
    }
}

impl From<NaiveDate> for Instant {
    fn from(date: NaiveDate) -> Self { Self::from_date(date) }
}

impl Serialize for Instant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Instant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
