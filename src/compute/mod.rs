//! Formula contract, errors and array arithmetic.
pub mod error;
pub mod formula;
pub mod kernel;

pub use error::ComputationError;
pub use formula::{FnFormula, Formula};
