//! Layout command implementations (grid, directory)

use std::path::Path;
use std::process::ExitCode;

use crate::config::{load_config, merge_cli_overrides, CliOverrides, ConfigError, StitchConfig};
use crate::probe::ImageFileProbe;
use crate::registration::GridRegistration;
use crate::stitch::{self, Backends, StitchJob, StitchOutcome, TileSource};

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

fn resolve_config(config_path: Option<&Path>, overrides: &CliOverrides) -> Result<StitchConfig, ExitCode> {
    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };

    if let Err(e) = merge_cli_overrides(&mut config, overrides) {
        eprintln!("Error: {}", e);
        let code = match e {
            ConfigError::Validation(_) => EXIT_INVALID_ARGS,
            _ => EXIT_ERROR,
        };
        return Err(ExitCode::from(code));
    }

    Ok(config)
}

fn execute(config: &StitchConfig, source: TileSource) -> ExitCode {
    let job = StitchJob {
        source,
        tile_configuration: config.output.tile_configuration.clone(),
        parameters: config.registration.clone(),
    };
    let backends = Backends { probe: &ImageFileProbe, registration: &GridRegistration, fusion: None };

    match stitch::run(&job, &backends) {
        Ok(outcome) => {
            report(&outcome);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn report(outcome: &StitchOutcome) {
    println!("{} tiles, {}D", outcome.tiles.len(), outcome.tiles.dimensionality());
    if let Some(path) = &outcome.initial_configuration {
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &outcome.registered_configuration {
        println!("Wrote {}", path.display());
    }
}

/// Execute the grid command
pub fn run_grid(config_path: Option<&Path>, overrides: &CliOverrides) -> ExitCode {
    let config = match resolve_config(config_path, overrides) {
        Ok(config) => config,
        Err(code) => return code,
    };

    println!("Grid: {}", config.grid.grid_type());
    execute(&config, TileSource::grid_from_config(&config))
}

/// Execute the directory command
pub fn run_directory(config_path: Option<&Path>, overrides: &CliOverrides, exclude: &[String]) -> ExitCode {
    let mut config = match resolve_config(config_path, overrides) {
        Ok(config) => config,
        Err(code) => return code,
    };
    config.input.exclude.extend(exclude.iter().cloned());

    execute(&config, TileSource::directory_from_config(&config))
}

/// Execute the layout command
///
/// The configuration named by `file` (or `output.tile_configuration`) is
/// read instead of written.
pub fn run_layout(config_path: Option<&Path>, overrides: &CliOverrides) -> ExitCode {
    let config = match resolve_config(config_path, overrides) {
        Ok(config) => config,
        Err(code) => return code,
    };

    execute(&config, TileSource::layout_file_from_config(&config))
}
