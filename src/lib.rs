//! tilegrid - Lay out image tiles for mosaic stitching
//!
//! This library provides functionality to:
//! - Expand filename templates and walk acquisition grids in every scan order
//! - Build tile sets from grids, directories, and tile configuration files
//! - Read and write the plain-text tile configuration format
//! - Drive a stitching run through pluggable registration and fusion backends

pub mod cli;
pub mod config;
pub mod layout;
pub mod models;
pub mod pattern;
pub mod probe;
pub mod registration;
pub mod stitch;
pub mod tile_config;
pub mod traversal;
