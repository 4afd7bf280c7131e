//! Session-scoped memo for period parsing and date conversion.
use super::error::PeriodError;
use super::instant::Instant;
use super::parser::parse_period;
use super::period::Period;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Memoizes `Instant -> NaiveDate` conversions and string parses.
///
/// Owned by a simulation; dropping the simulation drops the memo.
#[derive(Debug, Clone, Default)]
pub struct PeriodCache {
    dates: HashMap<Instant, NaiveDate>,
    periods: HashMap<String, Period>,
}

impl PeriodCache {
    pub fn new() -> Self { Self::default() }

    pub fn date(&mut self, instant: Instant) -> Result<NaiveDate, PeriodError> {
        if let Some(date) = self.dates.get(&instant) {
            return Ok(*date);
        }
        let date = instant.date()?;
        self.dates.insert(instant, date);
        Ok(date)
    }

    /// Parses `value`, remembering successful parses only.
    pub fn period(&mut self, value: &str) -> Result<Period, PeriodError> {
        if let Some(period) = self.periods.get(value) {
            return Ok(*period);
        }
        let period = parse_period(value)?;
        self.periods.insert(value.to_string(), period);
        Ok(period)
    }

    pub fn len(&self) -> usize {
        self.dates.len() + self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.dates.clear();
        self.periods.clear();
    }
}
