//! Image tensors: height × width × channels arrays of `f32` intensities.
//!
//! Pixels are stored row-major with interleaved channels (`HWC`), which is the
//! same memory order as an `imgref::ImgVec<RGB<f32>>`. Tensors handed to the
//! calculator are expected to hold values near `[-1, 1]`.

use std::fmt;

use imgref::ImgRef;
use rgb::{RGB, RGB8, RGBA};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// BT.601 luma weights.
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Dimensions of an [`ImageTensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    /// Number of rows.
    pub height: usize,
    /// Number of columns.
    pub width: usize,
    /// Number of interleaved channels per pixel.
    pub channels: usize,
}

impl Shape {
    /// Create a shape from `(height, width, channels)`.
    #[must_use]
    pub const fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Total number of scalar elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.height * self.width * self.channels
    }

    /// True if any dimension is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// An owned `H × W × C` image tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    shape: Shape,
    data: Vec<f32>,
}

impl ImageTensor {
    /// Create a tensor from interleaved row-major data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the shape has a zero dimension, if
    /// `data.len()` does not match the shape, or if any value is NaN or infinite.
    pub fn new(shape: Shape, data: Vec<f32>) -> Result<Self> {
        if shape.is_empty() {
            return Err(Error::InvalidInput(format!(
                "tensor shape {shape} has a zero dimension"
            )));
        }
        if data.len() != shape.len() {
            return Err(Error::InvalidInput(format!(
                "shape {shape} needs {} elements, got {}",
                shape.len(),
                data.len()
            )));
        }
        if let Some(index) = data.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "non-finite value {} at index {index}",
                data[index]
            )));
        }
        Ok(Self { shape, data })
    }

    /// Create a tensor where every element is `value`.
    pub fn filled(shape: Shape, value: f32) -> Result<Self> {
        Self::new(shape, vec![value; shape.len()])
    }

    /// Create a tensor by evaluating `f(y, x, c)` for every element.
    pub fn from_fn(shape: Shape, mut f: impl FnMut(usize, usize, usize) -> f32) -> Result<Self> {
        let mut data = Vec::with_capacity(shape.len());
        for y in 0..shape.height {
            for x in 0..shape.width {
                for c in 0..shape.channels {
                    data.push(f(y, x, c));
                }
            }
        }
        Self::new(shape, data)
    }

    /// Build a tensor from an RGB float image in `[-1, 1]`.
    pub fn from_rgb_f32(img: ImgRef<'_, RGB<f32>>) -> Result<Self> {
        let data = img.pixels().flat_map(|p| [p.r, p.g, p.b]).collect();
        Self::new(Shape::new(img.height(), img.width(), 3), data)
    }

    /// Build a three-channel tensor from an RGBA float image, dropping alpha.
    pub fn from_rgba_f32(img: ImgRef<'_, RGBA<f32>>) -> Result<Self> {
        let data = img.pixels().flat_map(|p| [p.r, p.g, p.b]).collect();
        Self::new(Shape::new(img.height(), img.width(), 3), data)
    }

    /// Build a tensor from 8-bit RGB, mapping `0..=255` onto `[-1, 1]`.
    pub fn from_rgb8(img: ImgRef<'_, RGB8>) -> Result<Self> {
        let data = img
            .pixels()
            .flat_map(|p| [p.r, p.g, p.b])
            .map(|v| f32::from(v) / 127.5 - 1.0)
            .collect();
        Self::new(Shape::new(img.height(), img.width(), 3), data)
    }

    /// Tensor dimensions.
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.shape.height
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.shape.width
    }

    /// Number of interleaved channels.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.shape.channels
    }

    /// Interleaved element data.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume the tensor, returning its element data.
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Element at row `y`, column `x`, channel `c`.
    #[must_use]
    pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f32> {
        if y >= self.shape.height || x >= self.shape.width || c >= self.shape.channels {
            return None;
        }
        Some(self.data[(y * self.shape.width + x) * self.shape.channels + c])
    }

    /// Copy one channel out as a row-major `f64` plane.
    ///
    /// # Panics
    ///
    /// Panics if `c >= self.channels()`.
    #[must_use]
    pub fn channel_plane(&self, c: usize) -> Vec<f64> {
        assert!(c < self.shape.channels, "channel {c} out of range");
        self.data
            .iter()
            .skip(c)
            .step_by(self.shape.channels)
            .map(|&v| f64::from(v))
            .collect()
    }

    /// Collapse to a single luma channel using BT.601 weights.
    ///
    /// Single-channel tensors are returned unchanged. Four-channel tensors
    /// are treated as RGBA and the alpha channel is ignored.
    pub fn to_luma(&self) -> Result<Self> {
        match self.shape.channels {
            1 => Ok(self.clone()),
            3 | 4 => {
                let data = self
                    .data
                    .chunks_exact(self.shape.channels)
                    .map(|px| {
                        let y: f64 = px
                            .iter()
                            .zip(LUMA_WEIGHTS)
                            .map(|(&v, w)| f64::from(v) * w)
                            .sum();
                        y as f32
                    })
                    .collect();
                Self::new(Shape::new(self.shape.height, self.shape.width, 1), data)
            }
            n => Err(Error::InvalidInput(format!(
                "cannot derive luma from a {n}-channel tensor"
            ))),
        }
    }

    /// Apply `f` to every element, keeping the shape.
    pub(crate) fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            shape: self.shape,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}
