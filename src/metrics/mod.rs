//! Quality metrics for image tensor comparison.
//!
//! SSIM and the L2 norm are always computed. Supported extras:
//!
//! - **PSNR**: Peak Signal-to-Noise Ratio (higher is better)
//! - **DSSIM**: dssim-core structural dissimilarity (lower is better, 0 = identical)
//!
//! | Metric | Identical | Range |
//! |--------|-----------|-------|
//! | SSIM | 1.0 | [-1, 1] |
//! | L2 | 0.0 | [0, ∞) |
//! | PSNR | ∞ | (0, ∞] dB |
//! | DSSIM | 0.0 | [0, ∞) |

#[cfg(feature = "dssim")]
pub mod dssim;
pub mod l2;
pub mod ssim;

use serde::{Deserialize, Serialize};

/// Configuration for which optional metrics to calculate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    /// Calculate PSNR over the unit-range tensors.
    pub psnr: bool,
    /// Calculate DSSIM (requires the `dssim` feature).
    pub dssim: bool,
}

impl MetricConfig {
    /// SSIM and L2 only.
    #[must_use]
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Every available metric.
    #[must_use]
    pub fn all() -> Self {
        Self {
            psnr: true,
            dssim: cfg!(feature = "dssim"),
        }
    }
}

/// Results from metric calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Mean SSIM over windows and channels.
    pub ssim: f64,
    /// Mean SSIM of each channel.
    pub ssim_per_channel: Vec<f64>,
    /// Window side the SSIM was computed with.
    pub window_size: usize,
    /// Euclidean norm of the difference.
    pub l2_norm: f64,
    /// PSNR value in dB.
    pub psnr: Option<f64>,
    /// DSSIM value.
    pub dssim: Option<f64>,
    /// Elements of the generated tensor clipped during rescaling.
    pub clamped_generated: usize,
    /// Elements of the target tensor clipped during rescaling.
    pub clamped_target: usize,
}

impl MetricResult {
    /// The `(ssim, l2_norm)` pair.
    #[must_use]
    pub fn pair(&self) -> (f64, f64) {
        (self.ssim, self.l2_norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_config_minimal() {
        let config = MetricConfig::minimal();
        assert!(!config.psnr);
        assert!(!config.dssim);
    }

    #[test]
    fn test_metric_config_all() {
        let config = MetricConfig::all();
        assert!(config.psnr);
        assert_eq!(config.dssim, cfg!(feature = "dssim"));
    }

    #[test]
    fn test_metric_config_partial_json() {
        let config: MetricConfig = serde_json::from_str(r#"{"psnr": true}"#).unwrap();
        assert!(config.psnr);
        assert!(!config.dssim);
    }
}
