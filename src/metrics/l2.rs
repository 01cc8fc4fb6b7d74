//! Pixel-difference metrics: L2 norm, MSE and PSNR.

use crate::error::{Error, Result};
use crate::tensor::ImageTensor;

fn squared_error_sum(x: &ImageTensor, y: &ImageTensor) -> Result<f64> {
    if x.shape() != y.shape() {
        return Err(Error::ShapeMismatch {
            expected: x.shape(),
            actual: y.shape(),
        });
    }
    Ok(x
        .as_slice()
        .iter()
        .zip(y.as_slice())
        .map(|(a, b)| {
            let d = f64::from(*a) - f64::from(*b);
            d * d
        })
        .sum())
}

/// Euclidean norm of the element-wise difference, `sqrt(Σ (xᵢ - yᵢ)²)`.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the shapes differ.
pub fn l2_norm(x: &ImageTensor, y: &ImageTensor) -> Result<f64> {
    Ok(squared_error_sum(x, y)?.sqrt())
}

/// Mean squared error over all elements.
pub fn mse(x: &ImageTensor, y: &ImageTensor) -> Result<f64> {
    Ok(squared_error_sum(x, y)? / x.shape().len() as f64)
}

/// Peak signal-to-noise ratio in dB for values spanning `data_range`.
///
/// Returns `f64::INFINITY` if the tensors are identical.
pub fn psnr(x: &ImageTensor, y: &ImageTensor, data_range: f64) -> Result<f64> {
    let mse = mse(x, y)?;
    if mse == 0.0 {
        Ok(f64::INFINITY)
    } else {
        Ok(10.0 * (data_range * data_range / mse).log10())
    }
}
