//! Reading tile shape information from image files
//!
//! The layout builder never touches pixels. It only needs to know how large
//! each tile is and whether it is a 2D image or a 3D stack, which is what an
//! [`ImageProbe`] reports.

use crate::models::Dimensionality;
use image::codecs::jpeg::JpegDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::tiff::TiffDecoder;
use image::io::Reader;
use image::{ColorType, ImageDecoder, ImageFormat};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Errors from probing a single image.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot open '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Sample type of an image, used to pick the output type of fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelType {
    Gray8,
    Gray16,
    Float32,
    Other,
}

impl PixelType {
    pub fn from_color(color: ColorType) -> Self {
        match color {
            ColorType::L8 => PixelType::Gray8,
            ColorType::L16 => PixelType::Gray16,
            ColorType::Rgb32F | ColorType::Rgba32F => PixelType::Float32,
            _ => PixelType::Other,
        }
    }
}

/// Shape of one tile image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Number of z slices; 1 for a plain 2D image
    pub depth: u32,
    pub channels: u32,
    pub timepoints: u32,
    pub pixel_type: PixelType,
}

impl ImageInfo {
    /// A single-channel, single-timepoint 2D image.
    pub fn planar(width: u32, height: u32, pixel_type: PixelType) -> Self {
        Self { width, height, depth: 1, channels: 1, timepoints: 1, pixel_type }
    }

    /// A single-channel, single-timepoint 3D stack.
    pub fn stack(width: u32, height: u32, depth: u32, pixel_type: PixelType) -> Self {
        Self { width, height, depth, channels: 1, timepoints: 1, pixel_type }
    }

    pub fn dimensionality(&self) -> Dimensionality {
        if self.depth > 1 {
            Dimensionality::Three
        } else {
            Dimensionality::Two
        }
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dimensionality() {
            Dimensionality::Three => write!(f, "{}x{}x{}px", self.width, self.height, self.depth)?,
            Dimensionality::Two => write!(f, "{}x{}px", self.width, self.height)?,
        }
        write!(f, ", channels={}, timepoints={}", self.channels, self.timepoints)
    }
}

/// Something that can report the shape of a tile image.
pub trait ImageProbe {
    fn probe(&self, path: &Path) -> Result<ImageInfo, ProbeError>;
}

impl<F> ImageProbe for F
where
    F: Fn(&Path) -> Result<ImageInfo, ProbeError>,
{
    fn probe(&self, path: &Path) -> Result<ImageInfo, ProbeError> {
        self(path)
    }
}

/// Probe plain image files (PNG, TIFF, JPEG, ...) through the `image` crate.
///
/// Every file is a single 2D plane with one timepoint; colour images report
/// one channel per colour component. PNG, TIFF and JPEG tiles are read up to
/// their header only. Other formats are decoded in full.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileProbe;

fn header<'a, D: ImageDecoder<'a>>(decoder: D) -> (u32, u32, ColorType) {
    let (width, height) = decoder.dimensions();
    (width, height, decoder.color_type())
}

impl ImageProbe for ImageFileProbe {
    fn probe(&self, path: &Path) -> Result<ImageInfo, ProbeError> {
        if !path.is_file() {
            return Err(ProbeError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }

        let io_error = |source| ProbeError::Io { path: path.to_path_buf(), source };
        let image_error = |source| ProbeError::Image { path: path.to_path_buf(), source };

        let reader = Reader::open(path).map_err(io_error)?.with_guessed_format().map_err(io_error)?;
        let (width, height, color) = match reader.format() {
            Some(ImageFormat::Png) => header(PngDecoder::new(reader.into_inner()).map_err(image_error)?),
            Some(ImageFormat::Tiff) => header(TiffDecoder::new(reader.into_inner()).map_err(image_error)?),
            Some(ImageFormat::Jpeg) => header(JpegDecoder::new(reader.into_inner()).map_err(image_error)?),
            _ => {
                let image = reader.decode().map_err(image_error)?;
                (image.width(), image.height(), image.color())
            }
        };

        Ok(ImageInfo {
            width,
            height,
            depth: 1,
            channels: u32::from(color.channel_count()),
            timepoints: 1,
            pixel_type: PixelType::from_color(color),
        })
    }
}

/// Probe one tile and log what was found.
pub(crate) fn probe_logged<P: ImageProbe + ?Sized>(
    probe: &P,
    path: &Path,
) -> Result<ImageInfo, ProbeError> {
    let started = Instant::now();
    let info = probe.probe(path)?;
    tracing::info!(
        path = %path.display(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "loaded {}",
        info
    );
    Ok(info)
}
