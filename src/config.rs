//! Configuration loader and schema types.
//!
//! This module exposes the configuration schema used to drive scanning and
//! identity resolution, and helpers to load configuration from disk.

mod load;
mod schema;

pub use load::default_catalog_path;
pub use schema::*;
