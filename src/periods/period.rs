//! Spans of calendar time: `(unit, start, size)`.
use super::error::PeriodError;
use super::instant::{days_in_month, Instant};
use super::unit::DateUnit;
use chrono::Datelike;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of units in a period. Only eternity is `Infinite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Size {
    Units(u32),
    Infinite,
}

impl Size {
    pub fn units(self) -> Option<u32> {
        match self {
            Size::Units(n) => Some(n),
            Size::Infinite => None,
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Size::Units(n) => write!(f, "{}", n),
            Size::Infinite => f.write_str("inf"),
        }
    }
}

/// An immutable calendar span.
///
/// Field order makes the derived `Ord` chronological first, which keeps
/// sorted cache listings readable. Granularity comparisons go through
/// [`key_period_size`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    start: Instant,
    unit: DateUnit,
    size: Size,
}

impl Period {
    pub(crate) fn raw(unit: DateUnit, start: Instant, size: Size) -> Self {
        Self { start, unit, size }
    }

    /// Builds a bounded period. `size` must be at least 1 and `start` a
    /// calendar date.
    pub fn new(unit: DateUnit, start: Instant, size: u32) -> Result<Self, PeriodError> {
        if unit == DateUnit::Eternity {
            return Ok(Self::eternity());
        }
        start.date()?;
        if size == 0 {
            return Err(PeriodError::malformed(format!("{}:{}:0", unit, start)));
        }
        Ok(Self::raw(unit, start, Size::Units(size)))
    }

    pub fn eternity() -> Self {
        Self::raw(DateUnit::Eternity, Instant::MIN, Size::Infinite)
    }

    /// The civil year `year`.
    pub fn year(year: i32) -> Result<Self, PeriodError> {
        Self::new(DateUnit::Year, Instant::new(year, 1, 1)?, 1)
    }

    /// The calendar month `year-month`.
    pub fn month(year: i32, month: u32) -> Result<Self, PeriodError> {
        Self::new(DateUnit::Month, Instant::new(year, month, 1)?, 1)
    }

    #[inline]
    pub fn unit(&self) -> DateUnit { self.unit }
    #[inline]
    pub fn start(&self) -> Instant { self.start }
    #[inline]
    pub fn size(&self) -> Size { self.size }

    pub fn is_eternity(&self) -> bool {
        self.unit == DateUnit::Eternity
    }

    /// True for single-unit periods such as `2021` or `2021-03`.
    pub fn is_atomic(&self) -> bool {
        self.size == Size::Units(1)
    }

    /// Last day of the period.
    ///
    /// Month and year spans step the month without clamping, then go back one
    /// day: `year:2012-02-29` stops on `2013-02-28`, `month:2012-02-29` on
    /// `2012-03-28`.
    pub fn stop(&self) -> Instant {
        let n = match self.size {
            Size::Units(n) => i64::from(n),
            Size::Infinite => return Instant::MAX,
        };
        let stop = match self.unit {
            DateUnit::Eternity => return Instant::MAX,
            DateUnit::Day | DateUnit::Weekday => self.start.offset(n - 1, DateUnit::Day),
            DateUnit::Week => self.start.offset(n * 7 - 1, DateUnit::Day),
            DateUnit::Month | DateUnit::Year => {
                let months = if self.unit == DateUnit::Year { n * 12 } else { n };
                let total = i64::from(self.start.year()) * 12 + i64::from(self.start.month()) - 1 + months;
                let year = i32::try_from(total.div_euclid(12)).unwrap_or(i32::MAX);
                let month = total.rem_euclid(12) as u32 + 1;
                Instant::new(year, month, 1)
                    .and_then(|first| first.offset(i64::from(self.start.day()) - 2, DateUnit::Day))
            }
        };
        stop.unwrap_or(Instant::MAX)
    }

    /// Shifts the start by `amount` units of `unit` (defaults to the period's own unit).
    pub fn offset(&self, amount: i64, unit: Option<DateUnit>) -> Result<Self, PeriodError> {
        if self.is_eternity() {
            return Ok(*self);
        }
        let start = self.start.offset(amount, unit.unwrap_or(self.unit))?;
        Ok(Self { start, ..*self })
    }

    /// Splits the period into consecutive single-unit periods of `unit`,
    /// anchored on the period's start.
    ///
    /// `month:2021-03:3` decomposed by month gives `2021-03`, `2021-04`,
    /// `2021-05`; `year:2021:2` decomposed by month gives 24 months.
    pub fn decompose(&self, unit: DateUnit) -> Result<Vec<Period>, PeriodError> {
        let n = match self.size {
            Size::Units(n) if unit != DateUnit::Eternity => i64::from(n),
            _ => return Err(PeriodError::UnboundedPeriod { operation: "decompose" }),
        };
        if self.unit.weight() < unit.weight() {
            return Err(PeriodError::InvalidDecomposition { period: self.to_string(), unit });
        }
        let after = self.start.offset(n, self.unit)?;
        let mut periods = Vec::new();
        let mut index = 0;
        loop {
            let start = self.start.offset(index, unit)?;
            if start >= after {
                break;
            }
            periods.push(Self::raw(unit, start, Size::Units(1)));
            index += 1;
        }
        Ok(periods)
    }

    pub fn size_in_days(&self) -> Result<u64, PeriodError> {
        match (self.unit, self.size) {
            (_, Size::Infinite) | (DateUnit::Eternity, _) => Err(PeriodError::UnboundedPeriod { operation: "size_in_days" }),
            (DateUnit::Day | DateUnit::Weekday, Size::Units(n)) => Ok(u64::from(n)),
            (DateUnit::Week, Size::Units(n)) => Ok(u64::from(n) * 7),
            _ => {
                let days = (self.stop().date()? - self.start.date()?).num_days() + 1;
                Ok(days.max(0) as u64)
            }
        }
    }

    pub fn size_in_months(&self) -> Result<u32, PeriodError> {
        match (self.unit, self.size) {
            (DateUnit::Year, Size::Units(n)) => Ok(n * 12),
            (DateUnit::Month, Size::Units(n)) => Ok(n),
            _ => Err(PeriodError::InvalidDecomposition { period: self.to_string(), unit: DateUnit::Month }),
        }
    }

    pub fn contains(&self, other: &Period) -> bool {
        self.start <= other.start && self.stop() >= other.stop()
    }

    /// Overlap with the closed window `[start, stop]` (`None` bounds are open).
    ///
    /// The result is expressed in years, then months, then days, whichever
    /// unit covers the overlap exactly. Unbounded overlaps return `self`.
    pub fn intersection(&self, start: Option<Instant>, stop: Option<Instant>) -> Option<Period> {
        if start.is_none() && stop.is_none() {
            return Some(*self);
        }
        let (period_start, period_stop) = (self.start, self.stop());
        let start = start.unwrap_or(period_start);
        let stop = stop.unwrap_or(period_stop);
        if stop < period_start || period_stop < start {
            return None;
        }
        let from = period_start.max(start);
        let to = period_stop.min(stop);
        if (from == period_start && to == period_stop) || to == Instant::MAX {
            return Some(*self);
        }
        if from.day() == 1 && from.month() == 1 && to.day() == 31 && to.month() == 12 {
            let years = u32::try_from(to.year() - from.year() + 1).ok()?;
            return Some(Self::raw(DateUnit::Year, from, Size::Units(years)));
        }
        if from.day() == 1 && to.day() == days_in_month(to.year(), to.month()) {
            let months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32 + 1;
            return Some(Self::raw(DateUnit::Month, from, Size::Units(u32::try_from(months).ok()?)));
        }
        let days = (to.date().ok()? - from.date().ok()?).num_days() + 1;
        Some(Self::raw(DateUnit::Day, from, Size::Units(u32::try_from(days).ok()?)))
    }

    /// True when the period overlaps the closed window `[start, stop]`.
    pub fn intersects(&self, start: Option<Instant>, stop: Option<Instant>) -> bool {
        start.map_or(true, |s| s <= self.stop()) && stop.map_or(true, |s| self.start <= s)
    }

    // --- Reference periods ---

    pub fn this_year(&self) -> Result<Period, PeriodError> {
        Ok(self.start.first_of(DateUnit::Year)?.period(DateUnit::Year))
    }

    pub fn first_month(&self) -> Result<Period, PeriodError> {
        Ok(self.start.first_of(DateUnit::Month)?.period(DateUnit::Month))
    }

    pub fn first_day(&self) -> Period {
        self.start.period(DateUnit::Day)
    }

    pub fn last_month(&self) -> Result<Period, PeriodError> {
        self.first_month()?.offset(-1, None)
    }

    pub fn last_3_months(&self) -> Result<Period, PeriodError> {
        let start = self.first_month()?.start;
        Self::new(DateUnit::Month, start, 3)?.offset(-3, None)
    }

    pub fn last_year(&self) -> Result<Period, PeriodError> {
        self.this_year()?.offset(-1, None)
    }

    pub fn n_2(&self) -> Result<Period, PeriodError> {
        self.this_year()?.offset(-2, None)
    }
}

/// Sort key combining the unit weight and the size, e.g. `"300_3"`.
pub fn key_period_size(period: &Period) -> String {
    format!("{}_{}", period.unit.weight(), period.size)
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = match (self.unit, self.size) {
            (DateUnit::Eternity, _) | (_, Size::Infinite) => return f.write_str("ETERNITY"),
            (_, Size::Units(n)) => n,
        };
        let s = self.start;
        let (year, month, day) = (s.year(), s.month(), s.day());
        match self.unit {
            DateUnit::Year => {
                let base = if month == 1 && day == 1 {
                    format!("{:04}", year)
                } else if day == 1 {
                    format!("{:04}-{:02}", year, month)
                } else {
                    s.to_string()
                };
                match (n, month == 1 && day == 1) {
                    (1, true) => f.write_str(&base),
                    (1, false) => write!(f, "year:{}", base),
                    _ => write!(f, "year:{}:{}", base, n),
                }
            }
            DateUnit::Month => match (n, day == 1) {
                (1, true) => write!(f, "{:04}-{:02}", year, month),
                (1, false) => write!(f, "month:{}", s),
                (_, true) => write!(f, "month:{:04}-{:02}:{}", year, month, n),
                (_, false) => write!(f, "month:{}:{}", s, n),
            },
            DateUnit::Day => match n {
                1 => write!(f, "{}", s),
                _ => write!(f, "day:{}:{}", s, n),
            },
            DateUnit::Week => {
                let date = s.date().map_err(|_| fmt::Error)?;
                let base = if date.weekday() == chrono::Weekday::Mon {
                    let week = date.iso_week();
                    format!("{:04}-W{:02}", week.year(), week.week())
                } else {
                    // Not aligned on an ISO week: keep the exact start.
                    return match n {
                        1 => write!(f, "week:{}", s),
                        _ => write!(f, "week:{}:{}", s, n),
                    };
                };
                match n {
                    1 => f.write_str(&base),
                    _ => write!(f, "week:{}:{}", base, n),
                }
            }
            DateUnit::Weekday => {
                let date = s.date().map_err(|_| fmt::Error)?;
                let week = date.iso_week();
                let base = format!(
                    "{:04}-W{:02}-{}",
                    week.year(),
                    week.week(),
                    date.weekday().number_from_monday()
                );
                match n {
                    1 => f.write_str(&base),
                    _ => write!(f, "weekday:{}:{}", base, n),
                }
            }
            DateUnit::Eternity => f.write_str("ETERNITY"),
        }
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parser::parse_period(s)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
