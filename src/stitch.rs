//! End-to-end stitching run
//!
//! Builds the tile set, records the approximate layout, registers, records
//! the registered layout, and hands the result to fusion.

use crate::config::{StitchConfig, StitchingParameters};
use crate::layout::{self, GridLayout, LayoutError, TileLayout};
use crate::models::TileSet;
use crate::probe::ImageProbe;
use crate::registration::{Fusion, FusionError, FusionRequest, GridRegistration, Registration, RegistrationError};
use crate::tile_config::{self, registered_path, TileConfigError};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StitchError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    TileConfig(#[from] TileConfigError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Fusion(#[from] FusionError),
    /// Fusion needs pixel types, which only probing reveals
    #[error("cannot fuse: none of the tiles could be probed")]
    NotProbed,
}

/// Where the tiles come from.
#[derive(Debug, Clone, PartialEq)]
pub enum TileSource {
    Grid(GridLayout),
    /// Every eligible file in `directory` except those named in `exclude`
    Directory { directory: PathBuf, exclude: Vec<String> },
    /// A tile configuration file in `directory`
    LayoutFile { directory: PathBuf, file: PathBuf },
}

impl TileSource {
    pub fn directory(&self) -> &Path {
        match self {
            TileSource::Grid(grid) => &grid.directory,
            TileSource::Directory { directory, .. } | TileSource::LayoutFile { directory, .. } => directory,
        }
    }

    /// Build the grid source described by a project configuration.
    pub fn grid_from_config(config: &StitchConfig) -> Self {
        TileSource::Grid(config.grid.to_layout(&config.input.directory))
    }

    /// Build the directory source described by a project configuration.
    pub fn directory_from_config(config: &StitchConfig) -> Self {
        TileSource::Directory { directory: config.input.directory.clone(), exclude: config.input.exclude.clone() }
    }

    /// Build the layout-file source described by a project configuration.
    pub fn layout_file_from_config(config: &StitchConfig) -> Self {
        TileSource::LayoutFile {
            directory: config.input.directory.clone(),
            file: PathBuf::from(&config.output.tile_configuration),
        }
    }
}

/// One stitching run.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchJob {
    pub source: TileSource,
    /// File name of the initial tile configuration, relative to the tile directory
    pub tile_configuration: String,
    pub parameters: StitchingParameters,
}

/// Files written and tiles placed by a run.
#[derive(Debug, Clone)]
pub struct StitchOutcome {
    pub tiles: TileSet,
    /// `None` when the tiles came from a layout file
    pub initial_configuration: Option<PathBuf>,
    /// `None` unless overlaps were computed
    pub registered_configuration: Option<PathBuf>,
    pub fused: bool,
}

/// The collaborators a run talks to.
pub struct Backends<'a> {
    pub probe: &'a dyn ImageProbe,
    pub registration: &'a dyn Registration,
    /// Without a fusion backend the run stops after registration
    pub fusion: Option<&'a dyn Fusion>,
}

fn build(source: &TileSource, probe: &dyn ImageProbe) -> Result<TileLayout, LayoutError> {
    match source {
        TileSource::Grid(grid) => layout::build_grid(grid, probe),
        TileSource::Directory { directory, exclude } => {
            let files: Vec<PathBuf> = layout::list_directory(directory)?
                .into_iter()
                .filter(|path| {
                    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                    !exclude.contains(&name)
                })
                .collect();
            layout::build_from_files(&files, probe)
        }
        TileSource::LayoutFile { directory, file } => layout::build_from_layout_file(directory, file, Some(probe)),
    }
}

/// Run the whole pipeline.
pub fn run(job: &StitchJob, backends: &Backends<'_>) -> Result<StitchOutcome, StitchError> {
    let started = Instant::now();
    let TileLayout { tiles, summary } = build(&job.source, backends.probe)?;
    tracing::info!(tiles = tiles.len(), dim = %tiles.dimensionality(), "tile set ready");

    let directory = job.source.directory();
    let (configuration, initial_configuration) = match &job.source {
        TileSource::LayoutFile { file, .. } => (directory.join(file), None),
        _ => {
            let path = directory.join(&job.tile_configuration);
            tile_config::write_initial(&path, &tiles)?;
            (path.clone(), Some(path))
        }
    };

    let parameters = &job.parameters;
    // Directory tiles all sit at the origin, so only registration can place them.
    let compute_overlap = parameters.compute_overlap || matches!(job.source, TileSource::Directory { .. });
    if compute_overlap && !parameters.compute_overlap {
        tracing::info!("directory tiles have no approximate layout, computing overlaps anyway");
    }
    let registered = if compute_overlap {
        backends.registration.register(tiles, parameters)?
    } else {
        tracing::info!("using approximate tile positions");
        GridRegistration.register(tiles, parameters)?
    };

    let registered_configuration = if compute_overlap {
        let path = registered_path(&configuration);
        tile_config::write_registered(&path, &registered)?;
        Some(path)
    } else {
        None
    };

    let mut fused = false;
    if parameters.fusion_method.fuses() {
        match backends.fusion {
            Some(fusion) => {
                let summary = summary.as_ref().ok_or(StitchError::NotProbed)?;
                let request = FusionRequest::new(&registered, summary, parameters.fusion_method)?;
                fusion.fuse(&request)?;
                fused = true;
            }
            None => tracing::info!("no fusion backend, skipping fusion"),
        }
    }

    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "finished stitching");

    Ok(StitchOutcome { tiles: registered, initial_configuration, registered_configuration, fused })
}
