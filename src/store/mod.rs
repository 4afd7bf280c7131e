//! Variable declarations and the registry holding them.
pub mod registry;
pub mod types;

pub use registry::{Registry, RegistryError};
pub use types::*;
