//! # image-metrics
//!
//! SSIM and L2 distance between image tensors.
//!
//! Tensors are `height × width × channels` arrays of `f32` values in
//! `[-1, 1]`. They are rescaled onto `[0, 1]` (clamping stragglers), then
//! compared with windowed SSIM and the Euclidean norm of their difference.
//!
//! ## Quick Start
//!
//! ```rust
//! use image_metrics::{ImageTensor, Shape, ssim_and_l2};
//!
//! let shape = Shape::new(8, 8, 3);
//! let generated = ImageTensor::from_fn(shape, |y, x, _| if (x + y) % 2 == 0 { -1.0 } else { 1.0 })?;
//! let target = ImageTensor::filled(shape, 0.0)?;
//!
//! let (ssim, l2) = ssim_and_l2(&generated, &target)?;
//! assert!(ssim < 1.0);
//! assert!(l2 > 0.0);
//! # Ok::<(), image_metrics::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`tensor`]: Image tensor type and imgref conversions
//! - [`range`]: `[-1, 1]` to `[0, 1]` rescaling with clamp or reject
//! - [`metrics`]: SSIM, L2/MSE/PSNR and DSSIM
//! - [`calculator`]: The configurable calculator and one-call helpers

pub mod calculator;
pub mod error;
pub mod metrics;
pub mod range;
pub mod tensor;

// Re-export commonly used types
pub use calculator::{CalculatorConfig, ImageMetricCalculator, ssim_and_l2, ssim_and_l2_with};
pub use error::{Error, Result};
pub use metrics::ssim::{SsimConfig, SsimScore};
pub use metrics::{MetricConfig, MetricResult};
pub use range::RangePolicy;
pub use tensor::{ImageTensor, Shape};
