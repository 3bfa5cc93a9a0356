//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod inspect;
mod tiles;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::config::{CliOverrides, FusionMethod, GridKind};
use crate::traversal::Corner;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// tilegrid - lay out image tiles for mosaic stitching
#[derive(Parser)]
#[command(name = "tilegrid")]
#[command(about = "tilegrid - Lay out grids of image tiles and read/write tile configuration files")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by the commands that write tile configurations
#[derive(Args, Debug, Default)]
pub struct ProjectArgs {
    /// Project configuration file (default: nearest stitch.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Name of the tile configuration file to write
    #[arg(short, long)]
    pub output: Option<String>,

    /// Fusion method recorded for this run
    #[arg(long, value_enum)]
    pub fusion: Option<FusionMethod>,

    /// Keep approximate positions and skip the registered configuration
    /// (directory tiles are always registered)
    #[arg(long)]
    pub no_compute_overlap: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe the tiles of a regular grid and write its tile configuration
    Grid {
        /// Directory holding the tiles
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Acquisition scheme
        #[arg(long = "type", value_enum)]
        kind: Option<GridKind>,

        /// Starting corner, e.g. right-down or down-right
        #[arg(long)]
        order: Option<Corner>,

        /// Number of columns
        #[arg(long)]
        size_x: Option<usize>,

        /// Number of rows
        #[arg(long)]
        size_y: Option<usize>,

        /// Tile overlap in percent
        #[arg(long)]
        overlap: Option<f64>,

        /// First value of the {i} placeholder
        #[arg(long)]
        first_index: Option<u64>,

        /// First value of the {x} placeholder
        #[arg(long)]
        first_x: Option<u64>,

        /// First value of the {y} placeholder
        #[arg(long)]
        first_y: Option<u64>,

        /// Filename template, e.g. tile_{iii}.tif or r{yy}_c{xx}.png
        #[arg(long)]
        pattern: Option<String>,

        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Probe every image in a directory and write a tile configuration
    Directory {
        /// Directory holding the tiles
        dir: Option<PathBuf>,

        /// File name to leave out (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Load tiles from an existing tile configuration and write the registered one
    Layout {
        /// Tile configuration file inside the tile directory
        file: Option<String>,

        /// Directory holding the tiles and the configuration
        #[arg(short, long)]
        dir: Option<PathBuf>,

        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Parse a tile configuration file and print its records
    Check {
        /// Tile configuration file
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the order in which a grid is visited, one `index x y` line per tile
    Positions {
        /// Acquisition scheme
        #[arg(long = "type", value_enum, default_value = "row-by-row")]
        kind: GridKind,

        /// Starting corner
        #[arg(long, default_value = "right-down")]
        order: Corner,

        /// Number of columns
        #[arg(long)]
        size_x: usize,

        /// Number of rows
        #[arg(long)]
        size_y: usize,
    },
}

impl ProjectArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            tile_configuration: self.output.clone(),
            fusion_method: self.fusion,
            compute_overlap: if self.no_compute_overlap { Some(false) } else { None },
            ..Default::default()
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Grid {
            dir,
            kind,
            order,
            size_x,
            size_y,
            overlap,
            first_index,
            first_x,
            first_y,
            pattern,
            project,
        } => {
            let overrides = CliOverrides {
                directory: dir,
                kind,
                order,
                size_x,
                size_y,
                overlap,
                first_index,
                first_x,
                first_y,
                file_names: pattern,
                ..project.overrides()
            };
            tiles::run_grid(project.config.as_deref(), &overrides)
        }
        Commands::Directory { dir, exclude, project } => {
            let overrides = CliOverrides { directory: dir, ..project.overrides() };
            tiles::run_directory(project.config.as_deref(), &overrides, &exclude)
        }
        Commands::Layout { file, dir, project } => {
            let mut overrides = CliOverrides { directory: dir, ..project.overrides() };
            if file.is_some() {
                overrides.tile_configuration = file;
            }
            tiles::run_layout(project.config.as_deref(), &overrides)
        }
        Commands::Check { file, json } => inspect::run_check(&file, json),
        Commands::Positions { kind, order, size_x, size_y } => {
            inspect::run_positions(kind, order, size_x, size_y)
        }
    }
}
