//! Storage module for market persistence

pub mod persistence;

pub use persistence::{Storage, StorageConfig, StorageError};
