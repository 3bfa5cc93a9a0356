//! Configuration for stitching projects
//!
//! Provides types and parsing for `stitch.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
