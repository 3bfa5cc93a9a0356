//! Configuration schema types for `stitch.toml`
//!
//! Defines the structure, defaults, and validation rules of a stitching
//! project. Every section and field is optional; defaults match a 2x3
//! row-by-row grid of `tile_{iii}.tif` files with 20% overlap.

use crate::layout::GridLayout;
use crate::tile_config::DEFAULT_FILE_NAME;
use crate::traversal::{Corner, GridType, TraversalOrder};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Grid acquisition scheme as written in `stitch.toml`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GridKind {
    #[default]
    RowByRow,
    ColumnByColumn,
    SnakeByRows,
    SnakeByColumns,
    /// Tiles named by column and row (`{xx}` / `{yy}` placeholders)
    FixedPosition,
}

impl GridKind {
    /// Combine with a starting corner into a grid type.
    pub fn with_corner(self, corner: Corner) -> GridType {
        let order = match self {
            GridKind::RowByRow => TraversalOrder::RowByRow,
            GridKind::ColumnByColumn => TraversalOrder::ColumnByColumn,
            GridKind::SnakeByRows => TraversalOrder::SnakeByRows,
            GridKind::SnakeByColumns => TraversalOrder::SnakeByColumns,
            GridKind::FixedPosition => return GridType::FixedPosition,
        };
        GridType::Sequential { order, corner }
    }
}

/// How overlapping tiles are blended into the mosaic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FusionMethod {
    #[default]
    LinearBlending,
    Average,
    Median,
    MaxIntensity,
    MinIntensity,
    /// Intensity of a random input tile
    RandomTile,
    /// Do not fuse; only write tile configurations
    None,
}

impl FusionMethod {
    pub fn fuses(&self) -> bool {
        *self != FusionMethod::None
    }
}

/// Trade-off between memory use and speed during registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryMode {
    /// Save memory (but be slower)
    #[default]
    SaveMemory,
    /// Save computation time (but use more RAM)
    SaveTime,
}

/// Grid section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Acquisition scheme
    #[serde(default, rename = "type")]
    pub kind: GridKind,
    /// Starting corner and direction
    #[serde(default)]
    pub order: Corner,
    #[serde(default = "default_size_x")]
    pub size_x: usize,
    #[serde(default = "default_size_y")]
    pub size_y: usize,
    /// Tile overlap in percent
    #[serde(default = "default_overlap")]
    pub overlap: f64,
    /// First value of the `{i}` placeholder
    #[serde(default = "default_first")]
    pub first_index: u64,
    /// First value of the `{x}` placeholder
    #[serde(default = "default_first")]
    pub first_x: u64,
    /// First value of the `{y}` placeholder
    #[serde(default = "default_first")]
    pub first_y: u64,
    /// Filename template
    #[serde(default = "default_file_names")]
    pub file_names: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            kind: GridKind::default(),
            order: Corner::default(),
            size_x: default_size_x(),
            size_y: default_size_y(),
            overlap: default_overlap(),
            first_index: default_first(),
            first_x: default_first(),
            first_y: default_first(),
            file_names: default_file_names(),
        }
    }
}

impl GridConfig {
    pub fn grid_type(&self) -> GridType {
        self.kind.with_corner(self.order)
    }

    /// Grid layout for tiles in `directory`.
    pub fn to_layout(&self, directory: &Path) -> GridLayout {
        GridLayout {
            grid_type: self.grid_type(),
            size_x: self.size_x,
            size_y: self.size_y,
            overlap: self.overlap / 100.0,
            first_index: self.first_index,
            first_x: self.first_x,
            first_y: self.first_y,
            file_names: self.file_names.clone(),
            directory: directory.to_path_buf(),
        }
    }
}

fn default_size_x() -> usize {
    2
}

fn default_size_y() -> usize {
    3
}

fn default_overlap() -> f64 {
    20.0
}

fn default_first() -> u64 {
    1
}

fn default_file_names() -> String {
    "tile_{iii}.tif".to_string()
}

/// Input section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory holding the tiles
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// File names to leave out when stitching a whole directory
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { directory: default_directory(), exclude: Vec::new() }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

/// Output section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Tile configuration written before registration (read in layout-file mode)
    #[serde(default = "default_tile_configuration")]
    pub tile_configuration: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { tile_configuration: default_tile_configuration() }
    }
}

fn default_tile_configuration() -> String {
    DEFAULT_FILE_NAME.to_string()
}

/// Registration section, handed unchanged to the registration backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchingParameters {
    #[serde(default)]
    pub fusion_method: FusionMethod,
    #[serde(default = "default_regression_threshold")]
    pub regression_threshold: f64,
    #[serde(default = "default_relative_threshold")]
    pub max_avg_displacement_threshold: f64,
    #[serde(default = "default_absolute_threshold")]
    pub absolute_displacement_threshold: f64,
    /// Refine offsets by registration; otherwise keep the approximate layout
    #[serde(default = "default_true")]
    pub compute_overlap: bool,
    #[serde(default = "default_true")]
    pub subpixel_accuracy: bool,
    #[serde(default)]
    pub memory_mode: MemoryMode,
}

impl Default for StitchingParameters {
    fn default() -> Self {
        Self {
            fusion_method: FusionMethod::default(),
            regression_threshold: default_regression_threshold(),
            max_avg_displacement_threshold: default_relative_threshold(),
            absolute_displacement_threshold: default_absolute_threshold(),
            compute_overlap: true,
            subpixel_accuracy: true,
            memory_mode: MemoryMode::default(),
        }
    }
}

fn default_regression_threshold() -> f64 {
    0.3
}

fn default_relative_threshold() -> f64 {
    2.5
}

fn default_absolute_threshold() -> f64 {
    3.5
}

fn default_true() -> bool {
    true
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StitchConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub registration: StitchingParameters,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "grid.size_x")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stitch.toml: '{}' {}", self.field, self.message)
    }
}

impl StitchConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ConfigValidationError { field: field.to_string(), message: message.to_string() })
        };

        if self.grid.size_x == 0 {
            push("grid.size_x", "must be a positive integer");
        }
        if self.grid.size_y == 0 {
            push("grid.size_y", "must be a positive integer");
        }
        if !(0.0..=100.0).contains(&self.grid.overlap) {
            push("grid.overlap", "must be a percentage between 0 and 100");
        }
        if self.grid.file_names.trim().is_empty() {
            push("grid.file_names", "must be a non-empty string");
        }
        if self.output.tile_configuration.trim().is_empty() {
            push("output.tile_configuration", "must be a non-empty string");
        }

        let thresholds = [
            ("registration.regression_threshold", self.registration.regression_threshold),
            ("registration.max_avg_displacement_threshold", self.registration.max_avg_displacement_threshold),
            ("registration.absolute_displacement_threshold", self.registration.absolute_displacement_threshold),
        ];
        for (field, value) in thresholds {
            if !(value >= 0.0) {
                push(field, "must be a non-negative number");
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
