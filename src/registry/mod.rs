//! Business registry
//!
//! Maps each registered business to its dedicated share ledger and the
//! wallet authorized to act on its behalf.

pub mod registry;

pub use registry::{Business, BusinessRegistry, RegistryError};
