//! Calendar instants, periods and their algebra.
pub mod cache;
pub mod error;
pub mod instant;
pub mod parser;
pub mod period;
pub mod unit;

pub use cache::PeriodCache;
pub use error::PeriodError;
pub use instant::Instant;
pub use parser::{instant, parse_instant, parse_period, period, IntoInstant, IntoPeriod};
pub use period::{key_period_size, Period, Size};
pub use unit::DateUnit;
