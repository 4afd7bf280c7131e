//! Human-readable reports.
pub mod trace;

pub use trace::format_trace;
