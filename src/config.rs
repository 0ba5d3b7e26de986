//! Configuration loader and schema types.
//!
//! This module exposes the configuration schema used to drive runtime
//! behavior and helpers to resolve the config, library and log paths.

mod load;
mod schema;

pub use schema::*;

#[cfg(test)]
mod tests;
