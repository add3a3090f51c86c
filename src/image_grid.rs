//! RGB pixel grids and the image decoder collaborator.
//!
//! The image layout only needs a width, a height and a row-major grid of
//! RGB values. Decoding is behind [`ImageDecoder`] so the engine can be
//! driven from memory in tests; [`FileDecoder`] reads files through the
//! `image` crate.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::error::DecodeError;

/// A decoded RGB image.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbGrid {
    image: RgbImage,
}

impl RgbGrid {
    /// Wrap an already decoded image.
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a grid by evaluating `f(x, y)` for every pixel, returning
    /// `0xRRGGBB`.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u32) -> Self {
        let image = RgbImage::from_fn(width, height, |x, y| {
            let [_, r, g, b] = f(x, y).to_be_bytes();
            Rgb([r, g, b])
        });
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Pixel at `(x, y)` as `0xRRGGBB`.
    #[inline]
    pub fn rgb(&self, x: u32, y: u32) -> u32 {
        let Rgb([r, g, b]) = *self.image.get_pixel(x, y);
        (r as u32) << 16 | (g as u32) << 8 | b as u32
    }

    /// Size the grid would have when scaled to fit a `side` x `side` box,
    /// keeping the aspect ratio. Either dimension may round down to zero.
    pub fn fitted_size(&self, side: u32) -> (u32, u32) {
        let (w, h) = (self.width() as f32, self.height() as f32);
        let scale = (side as f32 / w).min(side as f32 / h);
        ((w * scale) as u32, (h * scale) as u32)
    }

    /// Resample to exactly `width` x `height` with bicubic filtering.
    pub fn resized(&self, width: u32, height: u32) -> RgbGrid {
        if (width, height) == (self.width(), self.height()) {
            return self.clone();
        }
        RgbGrid {
            image: imageops::resize(&self.image, width, height, FilterType::CatmullRom),
        }
    }
}

/// Turns a path into an [`RgbGrid`].
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<RgbGrid, DecodeError>;
}

/// Decodes PNG and JPEG files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDecoder;

impl ImageDecoder for FileDecoder {
    fn decode(&self, path: &Path) -> Result<RgbGrid, DecodeError> {
        let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = image::load_from_memory(&bytes)?;
        let grid = RgbGrid::new(decoded.into_rgb8());
        if grid.is_empty() {
            return Err(DecodeError::Empty);
        }
        log::info!(
            "decoded image {} ({}x{})",
            path.display(),
            grid.width(),
            grid.height()
        );
        Ok(grid)
    }
}
