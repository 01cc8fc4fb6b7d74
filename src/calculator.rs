//! The image metric calculator.
//!
//! [`ImageMetricCalculator`] rescales a generated and a target tensor from
//! `[-1, 1]` onto `[0, 1]`, then scores them with windowed SSIM and the L2
//! norm of their difference (plus any extras enabled in [`MetricConfig`]).
//!
//! # Example
//!
//! ```rust
//! use image_metrics::{ImageTensor, Shape, ssim_and_l2};
//!
//! let generated = ImageTensor::filled(Shape::new(4, 4, 3), 0.0)?;
//! let target = generated.clone();
//!
//! let (ssim, l2) = ssim_and_l2(&generated, &target)?;
//! assert!((ssim - 1.0).abs() < 1e-6);
//! assert_eq!(l2, 0.0);
//! # Ok::<(), image_metrics::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::ssim::{self, SsimConfig};
use crate::metrics::{MetricConfig, MetricResult, l2};
use crate::range::{self, RangePolicy};
use crate::tensor::ImageTensor;

/// Configuration for an [`ImageMetricCalculator`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    /// Treatment of inputs outside `[-1, 1]`.
    pub range_policy: RangePolicy,
    /// SSIM parameters.
    pub ssim: SsimConfig,
    /// Optional metrics.
    pub metrics: MetricConfig,
}

impl CalculatorConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// ```rust
    /// use image_metrics::{CalculatorConfig, RangePolicy};
    ///
    /// let config = CalculatorConfig::from_json(
    ///     r#"{"range_policy": "reject", "ssim": {"window_size": 11}}"#,
    /// )?;
    /// assert_eq!(config.range_policy, RangePolicy::Reject);
    /// assert_eq!(config.ssim.window_size, 11);
    /// assert_eq!(config.ssim.data_range, 1.0);
    /// # Ok::<(), image_metrics::Error>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the SSIM parameters and metric availability.
    pub fn validate(&self) -> Result<()> {
        self.ssim.validate()?;
        if self.metrics.dssim && !cfg!(feature = "dssim") {
            return Err(Error::config(
                "metrics.dssim",
                "built without the `dssim` feature",
            ));
        }
        Ok(())
    }
}

/// Compares generated images against targets.
///
/// The calculator holds only its configuration; every call to
/// [`evaluate`](Self::evaluate) is independent.
#[derive(Debug, Clone, Default)]
pub struct ImageMetricCalculator {
    config: CalculatorConfig,
}

impl ImageMetricCalculator {
    /// Create a calculator after validating `config`.
    pub fn new(config: CalculatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// Score `generated` against `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] before any computation if the shapes
    /// differ, and [`Error::InvalidRange`] under [`RangePolicy::Reject`].
    pub fn evaluate(&self, generated: &ImageTensor, target: &ImageTensor) -> Result<MetricResult> {
        if generated.shape() != target.shape() {
            return Err(Error::ShapeMismatch {
                expected: generated.shape(),
                actual: target.shape(),
            });
        }

        let generated = range::to_unit_range(generated, self.config.range_policy)?;
        let target = range::to_unit_range(target, self.config.range_policy)?;
        let (x, y) = (generated.tensor(), target.tensor());

        let score = ssim::structural_similarity(x, y, &self.config.ssim)?;
        let l2_norm = l2::l2_norm(x, y)?;

        let psnr = if self.config.metrics.psnr {
            Some(l2::psnr(x, y, self.config.ssim.data_range)?)
        } else {
            None
        };

        let dssim = if self.config.metrics.dssim {
            Some(self.dssim(x, y)?)
        } else {
            None
        };

        log::debug!(
            "evaluated {}: ssim {:.6}, l2 {:.6}",
            x.shape(),
            score.mean,
            l2_norm
        );

        Ok(MetricResult {
            ssim: score.mean,
            ssim_per_channel: score.per_channel,
            window_size: score.window_size,
            l2_norm,
            psnr,
            dssim,
            clamped_generated: generated.clamped(),
            clamped_target: target.clamped(),
        })
    }

    #[cfg(feature = "dssim")]
    fn dssim(&self, x: &ImageTensor, y: &ImageTensor) -> Result<f64> {
        crate::metrics::dssim::calculate_dssim(x, y)
    }

    #[cfg(not(feature = "dssim"))]
    fn dssim(&self, _x: &ImageTensor, _y: &ImageTensor) -> Result<f64> {
        Err(Error::config(
            "metrics.dssim",
            "built without the `dssim` feature",
        ))
    }
}

/// SSIM and L2 norm of `generated` against `target` with default settings.
///
/// Inputs are expected in `[-1, 1]`; out-of-range values are clamped.
pub fn ssim_and_l2(generated: &ImageTensor, target: &ImageTensor) -> Result<(f64, f64)> {
    ImageMetricCalculator::default()
        .evaluate(generated, target)
        .map(|r| r.pair())
}

/// SSIM and L2 norm of `generated` against `target` with explicit settings.
pub fn ssim_and_l2_with(
    generated: &ImageTensor,
    target: &ImageTensor,
    config: &CalculatorConfig,
) -> Result<(f64, f64)> {
    ImageMetricCalculator::new(config.clone())?
        .evaluate(generated, target)
        .map(|r| r.pair())
}
