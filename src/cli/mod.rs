//! CLI module for operating the market locally

pub mod commands;

pub use commands::*;
