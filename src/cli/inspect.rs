//! Inspection command implementations (check, positions)

use std::path::Path;
use std::process::ExitCode;

use crate::config::GridKind;
use crate::tile_config::{format_coordinate, read_tile_configuration, TileConfigError};
use crate::traversal::{row_major_positions, Corner, GridTraversal, GridType};

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the check command
pub fn run_check(file: &Path, json: bool) -> ExitCode {
    let config = match read_tile_configuration(file) {
        Ok(config) => config,
        Err(e) => {
            if json {
                let line = match &e {
                    TileConfigError::Format(format) => Some(format.line),
                    _ => None,
                };
                let report = serde_json::json!({
                    "valid": false,
                    "file": file.display().to_string(),
                    "line": line,
                    "error": e.to_string(),
                });
                println!("{}", report);
            } else {
                eprintln!("Error: {}: {}", file.display(), e);
            }
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if json {
        let report = serde_json::json!({
            "valid": true,
            "file": file.display().to_string(),
            "dim": config.dimensionality,
            "records": config.records,
        });
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    println!("{}: dim = {}, {} tiles", file.display(), config.dimensionality, config.records.len());
    for record in &config.records {
        let coordinates: Vec<String> = record.coordinates.iter().map(|c| format_coordinate(*c)).collect();
        let name = if record.name.is_empty() { &record.label } else { &record.name };
        println!("  {:>4}  {}  ({})", record.index, name, coordinates.join(", "));
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the positions command
pub fn run_positions(kind: GridKind, order: Corner, size_x: usize, size_y: usize) -> ExitCode {
    let positions: Vec<(usize, usize)> = match kind.with_corner(order) {
        GridType::Sequential { order, corner } => match GridTraversal::new(order, corner, size_x, size_y) {
            Ok(traversal) => traversal.collect(),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        },
        GridType::FixedPosition => {
            if size_x == 0 || size_y == 0 {
                eprintln!("Error: grid size must be at least 1x1, got {}x{}", size_x, size_y);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
            row_major_positions(size_x, size_y).collect()
        }
    };

    for (index, (x, y)) in positions.iter().enumerate() {
        println!("{} {} {}", index, x, y);
    }

    ExitCode::from(EXIT_SUCCESS)
}
