//! Calendar units and their granularity weights.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The unit a period is measured in.
///
/// Units are ordered by granularity through [`DateUnit::weight`]; the derived
/// `Ord` only exists so periods can be used as sorted map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateUnit {
    Weekday,
    Week,
    Day,
    Month,
    Year,
    Eternity,
}

impl DateUnit {
    /// Granularity weight. A compound period may only be built on a base whose
    /// weight does not exceed the requested unit's weight.
    pub fn weight(self) -> u32 {
        match self {
            DateUnit::Day | DateUnit::Week | DateUnit::Weekday => 100,
            DateUnit::Month => 200,
            DateUnit::Year => 300,
            DateUnit::Eternity => 400,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DateUnit::Weekday => "weekday",
            DateUnit::Week => "week",
            DateUnit::Day => "day",
            DateUnit::Month => "month",
            DateUnit::Year => "year",
            DateUnit::Eternity => "eternity",
        }
    }
}

impl fmt::Display for DateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekday" => Ok(DateUnit::Weekday),
            "week" => Ok(DateUnit::Week),
            "day" => Ok(DateUnit::Day),
            "month" => Ok(DateUnit::Month),
            "year" => Ok(DateUnit::Year),
            "eternity" => Ok(DateUnit::Eternity),
            _ => Err(()),
        }
    }
}
