//! Registration and fusion backends
//!
//! Computing pairwise overlaps and blending pixels is out of scope for this
//! crate; both are reached through the [`Registration`] and [`Fusion`]
//! traits. [`GridRegistration`] is the pass-through used when overlaps are
//! not computed: every tile keeps its approximate offset.

use crate::config::{FusionMethod, StitchingParameters};
use crate::layout::ImageSummary;
use crate::models::{Dimensionality, TileSet, TileSetError};
use crate::probe::PixelType;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("registration failed: {0}")]
    Failed(String),
    #[error(transparent)]
    TileSet(#[from] TileSetError),
}

#[derive(Debug, Error, PartialEq)]
pub enum FusionError {
    #[error("unknown pixel type: tiles must be 8-bit, 16-bit or 32-bit")]
    UnknownPixelType,
    #[error("tile {index} has no registered offset")]
    MissingRegistration { index: usize },
    #[error("fusion failed: {0}")]
    Failed(String),
}

/// Finds the final position of every tile.
///
/// Implementations receive the tiles with their approximate offsets and
/// return them with `registered` filled in for every tile. The tile set
/// carries its own dimensionality.
pub trait Registration {
    fn register(&self, tiles: TileSet, parameters: &StitchingParameters) -> Result<TileSet, RegistrationError>;
}

/// Registration that trusts the approximate layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridRegistration;

impl Registration for GridRegistration {
    fn register(&self, mut tiles: TileSet, _parameters: &StitchingParameters) -> Result<TileSet, RegistrationError> {
        let offsets: Vec<(usize, Vec<f64>)> = tiles.iter().map(|t| (t.index, t.offset.clone())).collect();
        for (index, offset) in offsets {
            tiles.set_registered(index, offset)?;
        }
        Ok(tiles)
    }
}

/// Output sample type of the fused image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FusionPixelType {
    Gray8,
    Gray16,
    Float32,
}

impl FusionPixelType {
    /// The widest type present among the tiles.
    pub fn select(types: &[PixelType]) -> Result<Self, FusionError> {
        if types.contains(&PixelType::Float32) {
            Ok(FusionPixelType::Float32)
        } else if types.contains(&PixelType::Gray16) {
            Ok(FusionPixelType::Gray16)
        } else if types.contains(&PixelType::Gray8) {
            Ok(FusionPixelType::Gray8)
        } else {
            Err(FusionError::UnknownPixelType)
        }
    }
}

/// Final translation of one tile at one timepoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileModel {
    pub index: usize,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    /// 1-based
    pub timepoint: u32,
    pub translation: Vec<f64>,
}

/// Everything a fusion backend needs to render the mosaic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionRequest {
    pub method: FusionMethod,
    pub pixel_type: FusionPixelType,
    pub dimensionality: Dimensionality,
    pub channels: u32,
    pub timepoints: u32,
    pub models: Vec<TileModel>,
}

impl FusionRequest {
    /// Build a request from registered tiles, one model per tile per timepoint.
    pub fn new(tiles: &TileSet, summary: &ImageSummary, method: FusionMethod) -> Result<Self, FusionError> {
        let pixel_type = FusionPixelType::select(&summary.pixel_types)?;
        let timepoints = summary.timepoints.max(1);

        let mut models = Vec::with_capacity(tiles.len() * timepoints as usize);
        for timepoint in 1..=timepoints {
            for tile in tiles {
                let translation =
                    tile.registered.clone().ok_or(FusionError::MissingRegistration { index: tile.index })?;
                models.push(TileModel {
                    index: tile.index,
                    path: tile.path.clone(),
                    image_name: tile.image_name.clone(),
                    timepoint,
                    translation,
                });
            }
        }

        Ok(Self {
            method,
            pixel_type,
            dimensionality: tiles.dimensionality(),
            channels: summary.channels,
            timepoints,
            models,
        })
    }
}

/// Blends registered tiles into one image.
pub trait Fusion {
    fn fuse(&self, request: &FusionRequest) -> Result<(), FusionError>;
}
