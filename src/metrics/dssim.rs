//! DSSIM cross-check metric.
//!
//! Wraps the `dssim-core` crate. Its multi-scale, L*a*b*-based score is an
//! independent reference point next to the plain windowed SSIM.

use dssim_core::Dssim;
use imgref::ImgVec;
use rgb::RGBA;

use crate::error::{Error, Result};
use crate::tensor::ImageTensor;

/// Compute DSSIM between two `[0, 1]` tensors.
///
/// Values are read as sRGB-encoded and linearised before comparison.
/// Single-channel tensors are replicated to grey RGB.
///
/// # Returns
///
/// DSSIM value where 0 = identical, higher = more different.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the shapes differ,
/// [`Error::InvalidInput`] for channel counts other than 1, 3 or 4, and
/// [`Error::MetricCalculation`] if `dssim-core` rejects the images.
pub fn calculate_dssim(reference: &ImageTensor, test: &ImageTensor) -> Result<f64> {
    if reference.shape() != test.shape() {
        return Err(Error::ShapeMismatch {
            expected: reference.shape(),
            actual: test.shape(),
        });
    }

    let dssim = Dssim::new();

    let ref_image = dssim
        .create_image(&tensor_to_linear_rgba(reference)?)
        .ok_or_else(|| Error::MetricCalculation {
            metric: "DSSIM".to_string(),
            reason: "Failed to create reference image".to_string(),
        })?;

    let test_image = dssim
        .create_image(&tensor_to_linear_rgba(test)?)
        .ok_or_else(|| Error::MetricCalculation {
            metric: "DSSIM".to_string(),
            reason: "Failed to create test image".to_string(),
        })?;

    let (dssim_val, _ssim_maps) = dssim.compare(&ref_image, test_image);

    Ok(f64::from(dssim_val))
}

fn tensor_to_linear_rgba(tensor: &ImageTensor) -> Result<ImgVec<RGBA<f32>>> {
    let channels = tensor.channels();
    let pixels: Vec<RGBA<f32>> = match channels {
        1 => tensor
            .as_slice()
            .iter()
            .map(|&v| {
                let l = srgb_to_linear(v);
                RGBA::new(l, l, l, 1.0)
            })
            .collect(),
        3 | 4 => tensor
            .as_slice()
            .chunks_exact(channels)
            .map(|px| {
                RGBA::new(
                    srgb_to_linear(px[0]),
                    srgb_to_linear(px[1]),
                    srgb_to_linear(px[2]),
                    if channels == 4 { px[3] } else { 1.0 },
                )
            })
            .collect(),
        n => {
            return Err(Error::InvalidInput(format!(
                "DSSIM needs 1, 3 or 4 channels, got {n}"
            )));
        }
    };
    Ok(ImgVec::new(pixels, tensor.width(), tensor.height()))
}

/// Apply sRGB gamma decoding to a `[0, 1]` value.
#[inline]
fn srgb_to_linear(s: f32) -> f32 {
    if s <= 0.04045 {
        s / 12.92
    } else {
        ((s + 0.055) / 1.055).powf(2.4)
    }
}
