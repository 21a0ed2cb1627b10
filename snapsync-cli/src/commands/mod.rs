//! CLI command implementations.

pub mod config;
pub mod update;
pub mod versions;
