//! Data models for tiles and tile sets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Number of spatial dimensions a tile is registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Dimensionality {
    Two,
    Three,
}

impl Dimensionality {
    /// Number of coordinates in an offset.
    pub fn count(&self) -> usize {
        match self {
            Dimensionality::Two => 2,
            Dimensionality::Three => 3,
        }
    }

    /// Zero offset of this dimensionality.
    pub fn origin(&self) -> Vec<f64> {
        vec![0.0; self.count()]
    }
}

impl TryFrom<usize> for Dimensionality {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Dimensionality::Two),
            3 => Ok(Dimensionality::Three),
            n => Err(format!("only 2 and 3 dimensions are supported, got {}", n)),
        }
    }
}

impl From<Dimensionality> for usize {
    fn from(d: Dimensionality) -> usize {
        d.count()
    }
}

impl fmt::Display for Dimensionality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

/// Column and row of a tile in a regular grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: usize,
    pub y: usize,
}

/// One imaging field to be placed in the mosaic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Source file; empty for tiles backed by an already open image
    pub path: PathBuf,
    /// Name of an open image standing in for `path`, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_name: Option<String>,
    /// Stable index used to match initial and registered offsets
    pub index: usize,
    pub dimensionality: Dimensionality,
    /// Approximate placement before registration
    pub offset: Vec<f64>,
    /// Placement found by registration
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub registered: Option<Vec<f64>>,
    /// Present only for tiles that came from a regular grid
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub grid_position: Option<GridPosition>,
}

impl Tile {
    /// A tile at the origin of its coordinate space.
    pub fn new(path: impl Into<PathBuf>, index: usize, dimensionality: Dimensionality) -> Self {
        Self {
            path: path.into(),
            image_name: None,
            index,
            dimensionality,
            offset: dimensionality.origin(),
            registered: None,
            grid_position: None,
        }
    }

    pub fn with_offset(mut self, offset: Vec<f64>) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_grid_position(mut self, x: usize, y: usize) -> Self {
        self.grid_position = Some(GridPosition { x, y });
        self
    }

    pub fn with_image_name(mut self, name: impl Into<String>) -> Self {
        self.image_name = Some(name.into());
        self
    }

    /// File name without its directory, as written to tile configurations.
    pub fn file_name(&self) -> String {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

/// Structural problems with a collection of tiles.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileSetError {
    #[error("a tile set needs at least 2 tiles, got {0}")]
    TooFewTiles(usize),
    #[error("tile {index} is {found}D but the set is {expected}D")]
    MixedDimensionality { index: usize, expected: Dimensionality, found: Dimensionality },
    #[error("tile {index} has {found} offset coordinates, expected {expected}")]
    OffsetLength { index: usize, expected: usize, found: usize },
    #[error("tile index {0} appears more than once")]
    DuplicateIndex(usize),
    #[error("tile index {index} is outside 0..{len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Ordered tiles ready for registration.
///
/// The order is the order tiles are written to a tile configuration and
/// handed to registration. Every tile shares one dimensionality and the
/// indices are a permutation of `0..len`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileSet {
    tiles: Vec<Tile>,
    dimensionality: Dimensionality,
}

impl TileSet {
    pub fn new(tiles: Vec<Tile>) -> Result<Self, TileSetError> {
        if tiles.len() < 2 {
            return Err(TileSetError::TooFewTiles(tiles.len()));
        }

        let dimensionality = tiles[0].dimensionality;
        let mut seen = vec![false; tiles.len()];

        for tile in &tiles {
            if tile.dimensionality != dimensionality {
                return Err(TileSetError::MixedDimensionality {
                    index: tile.index,
                    expected: dimensionality,
                    found: tile.dimensionality,
                });
            }
            check_offset(tile.index, dimensionality, &tile.offset)?;
            if let Some(registered) = &tile.registered {
                check_offset(tile.index, dimensionality, registered)?;
            }

            let slot = seen
                .get_mut(tile.index)
                .ok_or(TileSetError::IndexOutOfRange { index: tile.index, len: tiles.len() })?;
            if *slot {
                return Err(TileSetError::DuplicateIndex(tile.index));
            }
            *slot = true;
        }

        Ok(Self { tiles, dimensionality })
    }

    pub fn dimensionality(&self) -> Dimensionality {
        self.dimensionality
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }

    /// Tile with the given sequence index.
    pub fn by_index(&self, index: usize) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.index == index)
    }

    /// Store registered offsets, keyed by tile index.
    pub fn set_registered(&mut self, index: usize, offset: Vec<f64>) -> Result<(), TileSetError> {
        check_offset(index, self.dimensionality, &offset)?;
        let len = self.tiles.len();
        let tile = self
            .tiles
            .iter_mut()
            .find(|t| t.index == index)
            .ok_or(TileSetError::IndexOutOfRange { index, len })?;
        tile.registered = Some(offset);
        Ok(())
    }

    /// Whether every tile carries a registered offset.
    pub fn is_registered(&self) -> bool {
        self.tiles.iter().all(|t| t.registered.is_some())
    }

    pub fn into_tiles(self) -> Vec<Tile> {
        self.tiles
    }
}

impl<'a> IntoIterator for &'a TileSet {
    type Item = &'a Tile;
    type IntoIter = std::slice::Iter<'a, Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.iter()
    }
}

fn check_offset(index: usize, dimensionality: Dimensionality, offset: &[f64]) -> Result<(), TileSetError> {
    if offset.len() != dimensionality.count() {
        return Err(TileSetError::OffsetLength {
            index,
            expected: dimensionality.count(),
            found: offset.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(index: usize) -> Tile {
        Tile::new(format!("/data/tile_{}.tif", index), index, Dimensionality::Two)
    }

    #[test]
    fn test_dimensionality_try_from() {
        assert_eq!(Dimensionality::try_from(2), Ok(Dimensionality::Two));
        assert_eq!(Dimensionality::try_from(3), Ok(Dimensionality::Three));
        assert!(Dimensionality::try_from(4).is_err());
        assert_eq!(Dimensionality::Three.origin(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_tile_file_name_strips_directory() {
        assert_eq!(tile(3).file_name(), "tile_3.tif");
        assert_eq!(Tile::new("", 0, Dimensionality::Two).file_name(), "");
    }

    #[test]
    fn test_tile_set_requires_two_tiles() {
        assert_eq!(TileSet::new(vec![tile(0)]), Err(TileSetError::TooFewTiles(1)));
        assert!(TileSet::new(vec![tile(0), tile(1)]).is_ok());
    }

    #[test]
    fn test_tile_set_rejects_mixed_dimensionality() {
        let three = Tile::new("b.tif", 1, Dimensionality::Three);
        let err = TileSet::new(vec![tile(0), three]).unwrap_err();
        assert!(matches!(err, TileSetError::MixedDimensionality { index: 1, .. }));
    }

    #[test]
    fn test_tile_set_indices_are_a_permutation() {
        assert!(TileSet::new(vec![tile(1), tile(0)]).is_ok());
        assert_eq!(TileSet::new(vec![tile(0), tile(0)]), Err(TileSetError::DuplicateIndex(0)));
        assert_eq!(
            TileSet::new(vec![tile(0), tile(2)]),
            Err(TileSetError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_tile_set_checks_offset_length() {
        let bad = tile(1).with_offset(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            TileSet::new(vec![tile(0), bad]),
            Err(TileSetError::OffsetLength { index: 1, expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_set_registered() {
        let mut set = TileSet::new(vec![tile(1), tile(0)]).unwrap();
        assert!(!set.is_registered());
        set.set_registered(0, vec![1.5, 2.5]).unwrap();
        set.set_registered(1, vec![3.0, 4.0]).unwrap();
        assert!(set.is_registered());
        assert_eq!(set.by_index(0).unwrap().registered, Some(vec![1.5, 2.5]));
        assert!(set.set_registered(0, vec![1.0]).is_err());
        assert!(set.set_registered(7, vec![1.0, 1.0]).is_err());
    }
}
