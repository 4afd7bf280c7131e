//! Temporal cache engine: holders, their ledgers and dated views.
pub mod dated;
pub mod holder;
mod json;
pub mod ledger;

pub use dated::DatedHolder;
pub use holder::Holder;
pub use ledger::{Array, CacheKey, Ledger, MemoryUsage};
