//! Subcommand implementations.

pub mod client;
pub mod migrate;
pub mod seed;
