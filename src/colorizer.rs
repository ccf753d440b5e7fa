use image::{GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Inclusive intensity range mapped onto the 8-bit display range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    bottom: i32,
    top: i32,
}

impl Default for Window {
    fn default() -> Self {
        Self { bottom: 0, top: 400 }
    }
}

impl Window {
    pub fn new(bottom: i32, top: i32) -> Result<Self> {
        if bottom >= top {
            return Err(EngineError::InvalidWindow { bottom, top });
        }
        Ok(Self { bottom, top })
    }

    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    /// Move the lower bound. Rejected, leaving the window untouched, unless it
    /// stays below `top`.
    pub fn set_bottom(&mut self, bottom: i32) -> Result<()> {
        *self = Self::new(bottom, self.top)?;
        Ok(())
    }

    pub fn set_top(&mut self, top: i32) -> Result<()> {
        *self = Self::new(self.bottom, top)?;
        Ok(())
    }

    #[inline]
    pub fn normalize_to_u8(&self, value: i16) -> u8 {
        let bottom = i64::from(self.bottom);
        let clipped = i64::from(value).clamp(bottom, i64::from(self.top));
        (255 * (clipped - bottom) / (i64::from(self.top) - bottom)) as u8
    }
}

/// Overlay colours; label `L` uses entry `(L - 1) mod n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette(Vec<[u8; 3]>);

impl Default for Palette {
    fn default() -> Self {
        Self(vec![
            [255, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
            [255, 255, 0],
            [0, 255, 255],
        ])
    }
}

impl Palette {
    pub fn new(colors: Vec<[u8; 3]>) -> Self {
        Self(colors)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct colours in use: the palette size clamped to
    /// `[1, label_count]`.
    pub fn active_colors(&self, label_count: usize) -> usize {
        self.len().min(label_count).max(1)
    }

    /// RGBA for a label; background is fully transparent.
    pub fn color(&self, label: u8, label_count: usize, alpha: Option<u8>) -> [u8; 4] {
        if label == 0 || self.is_empty() {
            return [0, 0, 0, 0];
        }
        let n = self.active_colors(label_count);
        let [r, g, b] = self.0[(usize::from(label) - 1) % n];
        [r, g, b, alpha.unwrap_or(u8::MAX)]
    }
}

pub(crate) struct Colorizer;

impl Colorizer {
    pub(crate) fn intensity_to_image(
        slice: &ArrayView2<'_, i16>,
        window: &Window,
    ) -> Option<GrayImage> {
        let (height, width) = slice.dim();
        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .map(|&v| window.normalize_to_u8(v))
            .collect();
        ImageBuffer::<Luma<u8>, _>::from_raw(width as u32, height as u32, pixel_data)
    }

    pub(crate) fn labels_to_image(
        slice: &ArrayView2<'_, u8>,
        palette: &Palette,
        label_count: usize,
        alpha: Option<u8>,
    ) -> Option<RgbaImage> {
        let (height, width) = slice.dim();
        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .flat_map_iter(|&label| palette.color(label, label_count, alpha))
            .collect();
        ImageBuffer::<Rgba<u8>, _>::from_raw(width as u32, height as u32, pixel_data)
    }
}
