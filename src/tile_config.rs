//! Tile configuration files
//!
//! A tile configuration lists every tile of a mosaic with its position. The
//! same format describes the approximate layout before registration and the
//! refined layout after it:
//!
//! ```text
//! # Define the number of dimensions we are working on
//! dim = 2
//!
//! # Define the image coordinates
//! tile_01.tif; ; (0.0, 0.0)
//! tile_02.tif; ; (922.0, 0.0)
//! ```
//!
//! Each coordinate line has three `;`-separated fields: the file name, the
//! name of an already open image (used when the file name is empty), and a
//! parenthesised coordinate tuple with one value per dimension.

use crate::models::{Dimensionality, TileSet};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default file name for the initial tile configuration.
pub const DEFAULT_FILE_NAME: &str = "TileConfiguration.txt";

const DIM_COMMENT: &str = "# Define the number of dimensions we are working on";
const COORDINATES_COMMENT: &str = "# Define the image coordinates";

/// What is wrong with a line of a tile configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatErrorKind {
    #[error("header missing, should look like [dim = n]")]
    MissingHeader,
    #[error("does not look like [dim = n]")]
    MalformedHeader,
    #[error("cannot parse dimensionality '{0}'")]
    InvalidDimension(String),
    #[error("only dimensions of 2 and 3 are supported, got {0}")]
    UnsupportedDimension(i64),
    #[error("dimensionality is declared twice")]
    DuplicateHeader,
    #[error("expected 3 entries [fileName; ImageName; (x,y,...)], found {0}")]
    FieldCount(usize),
    #[error("a file name or an image name is required [fileName; ImageName; (x,y,...)]")]
    MissingName,
    #[error("wrong format of coordinates, expected (x,y,...)")]
    MalformedTuple,
    #[error("expected {expected} coordinates for dim = {expected}, found {found}")]
    TupleArity { expected: usize, found: usize },
    #[error("cannot parse number '{0}'")]
    InvalidNumber(String),
}

/// A malformed tile configuration line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}: {text}")]
pub struct ConfigFormatError {
    /// 1-indexed line number
    pub line: usize,
    pub kind: FormatErrorKind,
    /// The offending line, trimmed
    pub text: String,
}

/// Error type for reading and writing tile configurations.
#[derive(Debug, Error)]
pub enum TileConfigError {
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Format(#[from] ConfigFormatError),
    #[error("no [dim = n] header found")]
    NoHeader,
    #[error("tile {index} has no registered offset")]
    MissingRegistration { index: usize },
}

/// One tile line of a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigRecord {
    /// Position of the record in the file, starting at 0
    pub index: usize,
    /// File name, relative to the configuration's directory
    pub name: String,
    /// Name of an open image, empty for file-backed tiles
    pub label: String,
    pub coordinates: Vec<f64>,
}

/// Parsed contents of a tile configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileConfiguration {
    pub dimensionality: Dimensionality,
    pub records: Vec<ConfigRecord>,
}

/// Which offsets of a tile set to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetKind {
    /// Grid-derived offsets before registration
    Initial,
    /// Offsets found by registration
    Registered,
}

impl TileConfiguration {
    /// Collect the records for a tile set, in tile set order.
    pub fn from_tiles(tiles: &TileSet, kind: OffsetKind) -> Result<Self, TileConfigError> {
        let mut records = Vec::with_capacity(tiles.len());

        for (position, tile) in tiles.iter().enumerate() {
            let coordinates = match kind {
                OffsetKind::Initial => tile.offset.clone(),
                OffsetKind::Registered => tile
                    .registered
                    .clone()
                    .ok_or(TileConfigError::MissingRegistration { index: tile.index })?,
            };
            let name = tile.file_name();
            let label = if name.is_empty() { tile.image_name.clone().unwrap_or_default() } else { String::new() };
            records.push(ConfigRecord { index: position, name, label, coordinates });
        }

        Ok(Self { dimensionality: tiles.dimensionality(), records })
    }
}

/// Parse a tile configuration from a reader.
///
/// Blank lines, lines starting with `#`, and lines of three characters or
/// fewer are skipped. The first remaining line must declare `dim = 2` or
/// `dim = 3`. Parsing stops at the first malformed line.
pub fn parse_tile_configuration<R: BufRead>(reader: R) -> Result<TileConfiguration, TileConfigError> {
    let mut dimensionality: Option<Dimensionality> = None;
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_number = i + 1;
        let raw = line?;
        let line = raw.trim();

        if line.starts_with('#') || line.len() <= 3 {
            continue;
        }

        let fail = |kind| ConfigFormatError { line: line_number, kind, text: line.to_string() };

        if is_header_line(line) {
            if dimensionality.is_some() {
                return Err(fail(FormatErrorKind::DuplicateHeader).into());
            }
            dimensionality = Some(parse_header(line).map_err(fail)?);
            continue;
        }

        let dim = dimensionality.ok_or_else(|| fail(FormatErrorKind::MissingHeader))?;
        let (name, label, coordinates) = parse_record(line, dim).map_err(fail)?;
        records.push(ConfigRecord { index: records.len(), name, label, coordinates });
    }

    let dimensionality = dimensionality.ok_or(TileConfigError::NoHeader)?;
    Ok(TileConfiguration { dimensionality, records })
}

/// Parse a tile configuration from a string.
pub fn parse_tile_configuration_str(content: &str) -> Result<TileConfiguration, TileConfigError> {
    parse_tile_configuration(content.as_bytes())
}

/// Read and parse a tile configuration file.
pub fn read_tile_configuration(path: &Path) -> Result<TileConfiguration, TileConfigError> {
    let file = File::open(path)
        .map_err(|source| TileConfigError::Read { path: path.to_path_buf(), source })?;
    parse_tile_configuration(BufReader::new(file)).map_err(|e| match e {
        TileConfigError::Io(source) => TileConfigError::Read { path: path.to_path_buf(), source },
        other => other,
    })
}

fn is_header_line(line: &str) -> bool {
    // Coordinate lines always carry `;`, so a file named `dim...` stays a tile.
    line.starts_with("dim") && !line.contains(';')
}

fn parse_header(line: &str) -> Result<Dimensionality, FormatErrorKind> {
    let parts: Vec<&str> = line.split('=').collect();
    if parts.len() != 2 || parts[0].trim() != "dim" {
        return Err(FormatErrorKind::MalformedHeader);
    }

    let value = parts[1].trim();
    let dim: i64 = value.parse().map_err(|_| FormatErrorKind::InvalidDimension(value.to_string()))?;
    match dim {
        2 => Ok(Dimensionality::Two),
        3 => Ok(Dimensionality::Three),
        other => Err(FormatErrorKind::UnsupportedDimension(other)),
    }
}

fn parse_record(
    line: &str,
    dimensionality: Dimensionality,
) -> Result<(String, String, Vec<f64>), FormatErrorKind> {
    let fields: Vec<&str> = line.split(';').collect();
    if fields.len() != 3 {
        return Err(FormatErrorKind::FieldCount(fields.len()));
    }

    let name = fields[0].trim();
    let label = fields[1].trim();
    if name.is_empty() && label.is_empty() {
        return Err(FormatErrorKind::MissingName);
    }

    let tuple = fields[2].trim();
    let inner = tuple
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or(FormatErrorKind::MalformedTuple)?;

    let values: Vec<&str> = inner.split(',').collect();
    if values.len() != dimensionality.count() {
        return Err(FormatErrorKind::TupleArity {
            expected: dimensionality.count(),
            found: values.len(),
        });
    }

    let coordinates = values
        .iter()
        .map(|v| {
            let v = v.trim();
            v.parse::<f64>().map_err(|_| FormatErrorKind::InvalidNumber(v.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((name.to_string(), label.to_string(), coordinates))
}

/// Render a coordinate the way tile configurations store them.
///
/// Uses the shortest text that parses back to the same value, always with a
/// decimal point or exponent (`50.0`, `12.25`, `1e20`).
pub fn format_coordinate(value: f64) -> String {
    format!("{:?}", value)
}

/// Serialize a tile configuration.
pub fn write_tile_configuration<W: Write>(mut writer: W, config: &TileConfiguration) -> io::Result<()> {
    writeln!(writer, "{}", DIM_COMMENT)?;
    writeln!(writer, "dim = {}", config.dimensionality)?;
    writeln!(writer)?;
    writeln!(writer, "{}", COORDINATES_COMMENT)?;

    for record in &config.records {
        let coordinates: Vec<String> = record.coordinates.iter().map(|c| format_coordinate(*c)).collect();
        writeln!(writer, "{}; {}; ({})", record.name, record.label, coordinates.join(", "))?;
    }

    writer.flush()
}

/// Serialize a tile configuration to a string.
pub fn tile_configuration_to_string(config: &TileConfiguration) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_tile_configuration(&mut buffer, config);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Write a tile configuration file, replacing any existing file.
pub fn write_tile_configuration_file(path: &Path, config: &TileConfiguration) -> Result<(), TileConfigError> {
    let to_error = |source| TileConfigError::Write { path: path.to_path_buf(), source };
    let file = File::create(path).map_err(to_error)?;
    write_tile_configuration(BufWriter::new(file), config).map_err(to_error)?;
    tracing::info!(path = %path.display(), tiles = config.records.len(), "wrote tile configuration");
    Ok(())
}

/// Write the initial (pre-registration) configuration of a tile set.
pub fn write_initial(path: &Path, tiles: &TileSet) -> Result<(), TileConfigError> {
    write_tile_configuration_file(path, &TileConfiguration::from_tiles(tiles, OffsetKind::Initial)?)
}

/// Write the registered configuration of a tile set.
pub fn write_registered(path: &Path, tiles: &TileSet) -> Result<(), TileConfigError> {
    write_tile_configuration_file(path, &TileConfiguration::from_tiles(tiles, OffsetKind::Registered)?)
}

/// File name for the registered variant of a configuration file.
///
/// `TileConfiguration.txt` becomes `TileConfiguration.registered.txt`; a name
/// without the `.txt` suffix gets `.registered` appended.
pub fn registered_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let registered = match name.strip_suffix(".txt") {
        Some(stem) => format!("{}.registered.txt", stem),
        None => format!("{}.registered", name),
    };
    path.with_file_name(registered)
}
