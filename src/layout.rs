//! Building tile sets from grids, directories, and layout files
//!
//! There are three ways to arrive at a [`TileSet`]:
//!
//! - **Grid**: a filename template plus grid parameters. Tiles are named by
//!   expanding the template, placed by the grid traversal, and given offsets
//!   from the smallest tile extent and the overlap fraction.
//! - **Directory**: every eligible file in a directory, all at the origin.
//!   Registration has to find the arrangement from scratch.
//! - **Layout file**: a tile configuration that already lists each tile and
//!   its offset.
//!
//! Construction is all-or-nothing: the first problem aborts the build.

use crate::models::{Dimensionality, Tile, TileSet, TileSetError};
use crate::pattern::{self, INDEX_PLACEHOLDER};
use crate::probe::{probe_logged, ImageInfo, ImageProbe, PixelType, ProbeError};
use crate::tile_config::{read_tile_configuration, TileConfigError, TileConfiguration};
use crate::traversal::{row_major_positions, GridTraversal, GridType, TraversalError};
use glob::{glob_with, MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for tile set construction.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("grid size must be at least 1x1, got {size_x}x{size_y}")]
    InvalidGrid { size_x: usize, size_y: usize },
    #[error("tile overlap must be a fraction between 0 and 1, got {0}")]
    InvalidOverlap(f64),
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("cannot list '{}': {message}", dir.display())]
    Listing { dir: PathBuf, message: String },
    #[error("only {found} files found in '{}', you need at least 2", dir.display())]
    TooFewFiles { dir: PathBuf, found: usize },
    #[error("placeholder value {first} + {offset} is too large")]
    PlaceholderOverflow { first: u64, offset: u64 },
    #[error("only {0} files selected, you need at least 2")]
    TooFewSelected(usize),
    #[error("'{}' is {found}D but earlier tiles are {expected}D; some images are 2d, some are 3d", path.display())]
    MixedDimensionality { path: PathBuf, expected: Dimensionality, found: Dimensionality },
    #[error("'{}' has {found} channels but earlier tiles have {expected}", path.display())]
    ChannelMismatch { path: PathBuf, expected: u32, found: u32 },
    #[error("'{}' has {found} timepoints but earlier tiles have {expected}", path.display())]
    TimepointMismatch { path: PathBuf, expected: u32, found: u32 },
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Traversal(#[from] TraversalError),
    #[error(transparent)]
    TileSet(#[from] TileSetError),
    #[error("layout file '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: TileConfigError,
    },
}

/// Parameters of a regular grid of tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub grid_type: GridType,
    pub size_x: usize,
    pub size_y: usize,
    /// Fraction of a tile shared with its neighbour, `0.0..=1.0`
    pub overlap: f64,
    /// Value of the `{i}` placeholder for the first tile visited
    pub first_index: u64,
    /// Value of the `{x}` placeholder for column 0
    pub first_x: u64,
    /// Value of the `{y}` placeholder for row 0
    pub first_y: u64,
    /// Filename template, e.g. `tile_{iii}.tif` or `r{yy}_c{xx}.tif`
    pub file_names: String,
    /// Directory the tiles live in
    pub directory: PathBuf,
}

impl GridLayout {
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.size_x == 0 || self.size_y == 0 {
            return Err(LayoutError::InvalidGrid { size_x: self.size_x, size_y: self.size_y });
        }
        if !(0.0..=1.0).contains(&self.overlap) {
            return Err(LayoutError::InvalidOverlap(self.overlap));
        }
        Ok(())
    }
}

/// A named tile at a grid cell, before anything is known about its image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridEntry {
    /// Traversal step (sequential grids) or row-major position (fixed grids)
    pub index: usize,
    pub x: usize,
    pub y: usize,
    pub path: PathBuf,
}

/// What probing the tiles of a set revealed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSummary {
    pub dimensionality: Dimensionality,
    pub channels: u32,
    pub timepoints: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub min_depth: u32,
    /// Pixel type of each probed tile, in probing order
    pub pixel_types: Vec<PixelType>,
}

impl ImageSummary {
    fn first(info: &ImageInfo) -> Self {
        Self {
            dimensionality: info.dimensionality(),
            channels: info.channels,
            timepoints: info.timepoints,
            min_width: info.width,
            min_height: info.height,
            min_depth: info.depth,
            pixel_types: vec![info.pixel_type],
        }
    }
}

/// A tile set plus, when its images were probed, what they looked like.
#[derive(Debug, Clone)]
pub struct TileLayout {
    pub tiles: TileSet,
    pub summary: Option<ImageSummary>,
}

/// Accumulates probe results and rejects inconsistent tiles.
#[derive(Debug, Clone, Default)]
pub struct TileSurvey {
    summary: Option<ImageSummary>,
}

impl TileSurvey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one tile. Fails when it disagrees with the tiles seen so far in
    /// dimensionality, channel count, or timepoint count.
    pub fn record(&mut self, path: &Path, info: &ImageInfo) -> Result<(), LayoutError> {
        let summary = match self.summary.as_mut() {
            Some(summary) => summary,
            None => {
                self.summary = Some(ImageSummary::first(info));
                return Ok(());
            }
        };

        if info.dimensionality() != summary.dimensionality {
            return Err(LayoutError::MixedDimensionality {
                path: path.to_path_buf(),
                expected: summary.dimensionality,
                found: info.dimensionality(),
            });
        }
        if info.channels != summary.channels {
            return Err(LayoutError::ChannelMismatch {
                path: path.to_path_buf(),
                expected: summary.channels,
                found: info.channels,
            });
        }
        if info.timepoints != summary.timepoints {
            return Err(LayoutError::TimepointMismatch {
                path: path.to_path_buf(),
                expected: summary.timepoints,
                found: info.timepoints,
            });
        }

        summary.min_width = summary.min_width.min(info.width);
        summary.min_height = summary.min_height.min(info.height);
        summary.min_depth = summary.min_depth.min(info.depth);
        summary.pixel_types.push(info.pixel_type);
        Ok(())
    }

    pub fn finish(self) -> Option<ImageSummary> {
        self.summary
    }
}

/// Name and place every tile of a grid, in row-major order.
///
/// Sequential grids number tiles in traversal order; fixed-position grids
/// name them by column and row and never consult the traversal.
pub fn plan_grid(layout: &GridLayout) -> Result<Vec<GridEntry>, LayoutError> {
    layout.validate()?;

    let (size_x, size_y) = (layout.size_x, layout.size_y);
    let mut cells: Vec<Option<GridEntry>> = vec![None; size_x * size_y];

    match layout.grid_type {
        GridType::Sequential { order, corner } => {
            let traversal = GridTraversal::new(order, corner, size_x, size_y)?;
            for (index, (x, y)) in traversal.enumerate() {
                let value = placeholder_value(layout.first_index, index)?;
                let name = pattern::expand(&layout.file_names, INDEX_PLACEHOLDER, value);
                cells[y * size_x + x] = Some(GridEntry { index, x, y, path: layout.directory.join(name) });
            }
        }
        GridType::FixedPosition => {
            for (index, (x, y)) in row_major_positions(size_x, size_y).enumerate() {
                let column = placeholder_value(layout.first_x, x)?;
                let row = placeholder_value(layout.first_y, y)?;
                let name = pattern::expand_xy(&layout.file_names, column, row);
                cells[y * size_x + x] = Some(GridEntry { index, x, y, path: layout.directory.join(name) });
            }
        }
    }

    // A complete traversal visits every cell, so every slot is filled.
    let entries: Vec<GridEntry> = cells.into_iter().flatten().collect();
    if entries.len() != size_x * size_y {
        return Err(TraversalError::Exhausted { total: size_x * size_y }.into());
    }
    Ok(entries)
}

fn placeholder_value(first: u64, offset: usize) -> Result<u64, LayoutError> {
    let offset = offset as u64;
    first.checked_add(offset).ok_or(LayoutError::PlaceholderOverflow { first, offset })
}

/// Approximate offsets for a grid, in row-major order.
///
/// Neighbouring tiles are `round(extent * (1 - overlap))` apart along each
/// axis, accumulated step by step along each row and down the columns.
/// Grids are planar, so the z offset of a 3D tile is always 0.
pub fn grid_offsets(
    size_x: usize,
    size_y: usize,
    min_width: u32,
    min_height: u32,
    overlap: f64,
    dimensionality: Dimensionality,
) -> Vec<Vec<f64>> {
    let step_x = (f64::from(min_width) * (1.0 - overlap)).round();
    let step_y = (f64::from(min_height) * (1.0 - overlap)).round();

    let mut offsets = Vec::with_capacity(size_x * size_y);
    let mut y_offset = 0.0;

    for y in 0..size_y {
        if y > 0 {
            y_offset += step_y;
        }
        let mut x_offset = 0.0;
        for x in 0..size_x {
            if x > 0 {
                x_offset += step_x;
            }
            let mut offset = vec![x_offset, y_offset];
            if dimensionality == Dimensionality::Three {
                offset.push(0.0);
            }
            offsets.push(offset);
        }
    }

    offsets
}

/// Build a tile set from a regular grid.
pub fn build_grid(layout: &GridLayout, probe: &dyn ImageProbe) -> Result<TileLayout, LayoutError> {
    let entries = plan_grid(layout)?;
    tracing::info!(grid = %layout.grid_type, size_x = layout.size_x, size_y = layout.size_y, "building grid layout");

    let mut survey = TileSurvey::new();
    for entry in &entries {
        tracing::info!(x = entry.x, y = entry.y, path = %entry.path.display(), "loading tile");
        let info = probe_logged(probe, &entry.path)?;
        survey.record(&entry.path, &info)?;
    }
    let summary = survey.finish().ok_or(TileSetError::TooFewTiles(0))?;

    let dimensionality = summary.dimensionality;
    let offsets = grid_offsets(
        layout.size_x,
        layout.size_y,
        summary.min_width,
        summary.min_height,
        layout.overlap,
        dimensionality,
    );

    let tiles = entries
        .into_iter()
        .zip(offsets)
        .map(|(entry, offset)| {
            Tile::new(entry.path, entry.index, dimensionality)
                .with_offset(offset)
                .with_grid_position(entry.x, entry.y)
        })
        .collect();

    Ok(TileLayout { tiles: TileSet::new(tiles)?, summary: Some(summary) })
}

/// Whether a directory entry name is a tile candidate.
fn is_tile_candidate(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    !name.starts_with('.') && !name.to_ascii_lowercase().ends_with(".txt")
}

/// List the files of a directory that can be tiles.
///
/// Hidden files, subdirectories, `.txt` files (in any case), and names that
/// are not valid UTF-8 are skipped. Fails when the directory cannot be read,
/// and unless at least two files remain.
pub fn list_directory(dir: &Path) -> Result<Vec<PathBuf>, LayoutError> {
    if !dir.is_dir() {
        return Err(LayoutError::NotADirectory(dir.to_path_buf()));
    }

    let pattern = format!("{}/*", Pattern::escape(&dir.to_string_lossy()));
    // Leading dots are filtered by `is_tile_candidate`; glob's own check
    // panics on names that are not UTF-8.
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let paths = glob_with(&pattern, options)
        .map_err(|e| LayoutError::Listing { dir: dir.to_path_buf(), message: e.to_string() })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() && is_tile_candidate(&path) {
                    tracing::debug!(path = %path.display(), "found tile candidate");
                    files.push(path);
                }
            }
            Err(e) => {
                return Err(LayoutError::Listing { dir: dir.to_path_buf(), message: e.to_string() });
            }
        }
    }
    files.sort();

    tracing::info!(count = files.len(), dir = %dir.display(), "found files (hidden and .txt files are ignored)");

    if files.len() < 2 {
        return Err(LayoutError::TooFewFiles { dir: dir.to_path_buf(), found: files.len() });
    }
    Ok(files)
}

/// Build a tile set from explicitly chosen files, all placed at the origin.
///
/// Tile indices follow the order of `files`.
pub fn build_from_files(files: &[PathBuf], probe: &dyn ImageProbe) -> Result<TileLayout, LayoutError> {
    if files.len() < 2 {
        return Err(LayoutError::TooFewSelected(files.len()));
    }

    let mut survey = TileSurvey::new();
    let mut tiles = Vec::with_capacity(files.len());

    for (index, path) in files.iter().enumerate() {
        tracing::info!(path = %path.display(), "loading tile");
        let info = probe_logged(probe, path)?;
        survey.record(path, &info)?;
        tiles.push(Tile::new(path.clone(), index, info.dimensionality()));
    }

    Ok(TileLayout { tiles: TileSet::new(tiles)?, summary: survey.finish() })
}

/// Build a tile set from every eligible file in a directory.
pub fn build_from_directory(dir: &Path, probe: &dyn ImageProbe) -> Result<TileLayout, LayoutError> {
    let files = list_directory(dir)?;
    build_from_files(&files, probe)
}

/// Turn parsed configuration records into tiles located in `directory`.
pub fn tiles_from_configuration(directory: &Path, config: &TileConfiguration) -> Result<TileSet, LayoutError> {
    let tiles = config
        .records
        .iter()
        .map(|record| {
            let tile = if record.name.is_empty() {
                Tile::new(PathBuf::new(), record.index, config.dimensionality).with_image_name(&record.label)
            } else {
                Tile::new(directory.join(&record.name), record.index, config.dimensionality)
            };
            tile.with_offset(record.coordinates.clone())
        })
        .collect();

    Ok(TileSet::new(tiles)?)
}

/// Build a tile set from a tile configuration file in `directory`.
///
/// When a probe is given, every file-backed tile is opened and checked for
/// consistent channel and timepoint counts.
pub fn build_from_layout_file(
    directory: &Path,
    layout_file: &Path,
    probe: Option<&dyn ImageProbe>,
) -> Result<TileLayout, LayoutError> {
    let path = directory.join(layout_file);
    let config = read_tile_configuration(&path).map_err(|source| LayoutError::Config { path: path.clone(), source })?;
    let tiles = tiles_from_configuration(directory, &config)?;

    let summary = match probe {
        Some(probe) => {
            let mut survey = TileSurvey::new();
            for tile in tiles.iter().filter(|t| !t.path.as_os_str().is_empty()) {
                let info = probe_logged(probe, &tile.path)?;
                survey.record(&tile.path, &info)?;
            }
            survey.finish()
        }
        None => None,
    };

    Ok(TileLayout { tiles, summary })
}
