//! Text and value normalization into [`Instant`] and [`Period`].
//!
//! Grammar:
//! ```text
//! simple   := YYYY | YYYY-MM | YYYY-MM-DD | YYYY-Www | YYYY-Www-D
//! compound := unit ":" simple [ ":" size ]
//! ```
//! plus the literals `eternity` / `ETERNITY`.
use super::error::PeriodError;
use super::instant::Instant;
use super::period::{Period, Size};
use super::unit::DateUnit;
use chrono::{NaiveDate, Weekday};

/// Parses `YYYY`, `YYYY-MM` or `YYYY-MM-DD` into an instant.
pub fn parse_instant(value: &str) -> Result<Instant, PeriodError> {
    let fail = || PeriodError::malformed_instant(value);
    let parts: Vec<&str> = value.split('-').collect();
    if parts.len() > 3 || !is_digits(parts[0], 4, 4) {
        return Err(fail());
    }
    let mut fields = [1u32; 2];
    for (slot, part) in fields.iter_mut().zip(&parts[1..]) {
        if !is_digits(part, 2, 2) {
            return Err(fail());
        }
        *slot = part.parse().map_err(|_| fail())?;
    }
    let year: i32 = parts[0].parse().map_err(|_| fail())?;
    Instant::new(year, fields[0], fields[1]).map_err(|_| fail())
}

/// Parses a simple or compound period string.
pub fn parse_period(value: &str) -> Result<Period, PeriodError> {
    if value == "eternity" || value == "ETERNITY" {
        return Ok(Period::eternity());
    }
    if !value.contains(':') {
        return parse_simple(value).ok_or_else(|| PeriodError::malformed(value));
    }

    let components: Vec<&str> = value.split(':').collect();
    if components.len() > 3 {
        return Err(PeriodError::malformed(value));
    }
    let unit = match components[0].parse::<DateUnit>() {
        Ok(DateUnit::Eternity) | Err(()) => return Err(PeriodError::malformed(value)),
        Ok(unit) => unit,
    };
    let base = parse_simple(components[1]).ok_or_else(|| PeriodError::malformed(value))?;
    let size = match components.get(2) {
        None => 1,
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n > 0 && raw.bytes().all(|b| b.is_ascii_digit()) => n,
            _ => return Err(PeriodError::malformed(value)),
        },
    };

    // "month:2014" would silently mean "month:2014-01"; refuse it.
    if base.unit().weight() > unit.weight() {
        return Err(PeriodError::AmbiguousPeriod {
            value: value.to_string(),
            unit,
            base_unit: base.unit(),
        });
    }
    Ok(Period::raw(unit, base.start(), Size::Units(size)))
}

/// Parses a form without unit prefix into a single-unit period.
fn parse_simple(value: &str) -> Option<Period> {
    let parts: Vec<&str> = value.split('-').collect();
    if !is_digits(parts[0], 4, 4) {
        return None;
    }
    let year: i32 = parts[0].parse().ok()?;

    let iso_week = parts.get(1).and_then(|p| p.strip_prefix('W'));
    let (unit, start) = match (parts.len(), iso_week) {
        (1, _) => (DateUnit::Year, Instant::new(year, 1, 1).ok()?),
        (2, Some(week)) => (DateUnit::Week, iso_date(year, week, Weekday::Mon)?),
        (2, None) => {
            let month = parse_field(parts[1])?;
            (DateUnit::Month, Instant::new(year, month, 1).ok()?)
        }
        (3, Some(week)) => {
            if !is_digits(parts[2], 1, 1) {
                return None;
            }
            let weekday = match parts[2] {
                "1" => Weekday::Mon,
                "2" => Weekday::Tue,
                "3" => Weekday::Wed,
                "4" => Weekday::Thu,
                "5" => Weekday::Fri,
                "6" => Weekday::Sat,
                "7" => Weekday::Sun,
                _ => return None,
            };
            (DateUnit::Weekday, iso_date(year, week, weekday)?)
        }
        (3, None) => {
            let month = parse_field(parts[1])?;
            let day = parse_field(parts[2])?;
            (DateUnit::Day, Instant::new(year, month, day).ok()?)
        }
        _ => return None,
    };
    Some(Period::raw(unit, start, Size::Units(1)))
}

fn iso_date(year: i32, week: &str, weekday: Weekday) -> Option<Instant> {
    if !is_digits(week, 2, 2) {
        return None;
    }
    let week: u32 = week.parse().ok()?;
    NaiveDate::from_isoywd_opt(year, week, weekday).map(Instant::from_date)
}

fn parse_field(raw: &str) -> Option<u32> {
    if is_digits(raw, 1, 2) { raw.parse().ok() } else { None }
}

fn is_digits(raw: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&raw.len()) && raw.bytes().all(|b| b.is_ascii_digit())
}

// --- Normalization ---

/// Values that can be normalized into an [`Instant`].
pub trait IntoInstant {
    fn into_instant(self) -> Result<Instant, PeriodError>;
}

impl IntoInstant for Instant {
    fn into_instant(self) -> Result<Instant, PeriodError> { Ok(self) }
}

impl IntoInstant for &Instant {
    fn into_instant(self) -> Result<Instant, PeriodError> { Ok(*self) }
}

impl IntoInstant for Period {
    fn into_instant(self) -> Result<Instant, PeriodError> { Ok(self.start()) }
}

impl IntoInstant for &Period {
    fn into_instant(self) -> Result<Instant, PeriodError> { Ok(self.start()) }
}

impl IntoInstant for NaiveDate {
    fn into_instant(self) -> Result<Instant, PeriodError> { Ok(Instant::from_date(self)) }
}

impl IntoInstant for &str {
    fn into_instant(self) -> Result<Instant, PeriodError> { parse_instant(self) }
}

impl IntoInstant for String {
    fn into_instant(self) -> Result<Instant, PeriodError> { parse_instant(&self) }
}

impl IntoInstant for &String {
    fn into_instant(self) -> Result<Instant, PeriodError> { parse_instant(self) }
}

impl IntoInstant for i32 {
    fn into_instant(self) -> Result<Instant, PeriodError> { Instant::new(self, 1, 1) }
}

impl IntoInstant for (i32,) {
    fn into_instant(self) -> Result<Instant, PeriodError> { Instant::new(self.0, 1, 1) }
}

impl IntoInstant for (i32, u32) {
    fn into_instant(self) -> Result<Instant, PeriodError> { Instant::new(self.0, self.1, 1) }
}

impl IntoInstant for (i32, u32, u32) {
    fn into_instant(self) -> Result<Instant, PeriodError> { Instant::new(self.0, self.1, self.2) }
}

/// Values that can be normalized into a [`Period`].
pub trait IntoPeriod {
    fn into_period(self) -> Result<Period, PeriodError>;
}

impl IntoPeriod for Period {
    fn into_period(self) -> Result<Period, PeriodError> { Ok(self) }
}

impl IntoPeriod for &Period {
    fn into_period(self) -> Result<Period, PeriodError> { Ok(*self) }
}

impl IntoPeriod for Instant {
    fn into_period(self) -> Result<Period, PeriodError> { Ok(self.period(DateUnit::Day)) }
}

impl IntoPeriod for NaiveDate {
    fn into_period(self) -> Result<Period, PeriodError> {
        Ok(Instant::from_date(self).period(DateUnit::Day))
    }
}

impl IntoPeriod for i32 {
    fn into_period(self) -> Result<Period, PeriodError> { Period::year(self) }
}

impl IntoPeriod for &str {
    fn into_period(self) -> Result<Period, PeriodError> { parse_period(self) }
}

impl IntoPeriod for String {
    fn into_period(self) -> Result<Period, PeriodError> { parse_period(&self) }
}

impl IntoPeriod for &String {
    fn into_period(self) -> Result<Period, PeriodError> { parse_period(self) }
}

/// Normalizes `value` into an [`Instant`].
pub fn instant<I: IntoInstant>(value: I) -> Result<Instant, PeriodError> {
    value.into_instant()
}

/// Normalizes `value` into a [`Period`].
pub fn period<P: IntoPeriod>(value: P) -> Result<Period, PeriodError> {
    value.into_period()
}
