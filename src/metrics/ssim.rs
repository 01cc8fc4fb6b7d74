//! Windowed SSIM (Structural Similarity Index).
//!
//! Local means, variances and covariance are taken over a sliding window
//! (uniform 7×7 by default, optionally Gaussian weighted) that is evaluated
//! only where it fits entirely inside the image. Each window position yields
//!
//! ```text
//! l = (2·μx·μy + C1) / (μx² + μy² + C1)
//! c = (2·σx·σy + C2) / (σx² + σy² + C2)
//! s = (σxy + C3) / (σx·σy + C3)
//! SSIM = l^α · c^β · s^γ
//! ```
//!
//! with `C1 = (K1·L)²`, `C2 = (K2·L)²`, `C3 = C2 / 2` and `L` the data range.
//! The window values are averaged per channel, and in multichannel mode the
//! channel means are averaged again.

use std::borrow::Cow;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tensor::ImageTensor;

/// Gaussian kernels extend this many standard deviations from the centre.
const GAUSSIAN_TRUNCATE: f64 = 3.5;

/// Largest accepted Gaussian sigma (a 7169-pixel window).
pub const MAX_SIGMA: f64 = 1024.0;

/// Parameters of the SSIM computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsimConfig {
    /// Dynamic range `L` of the pixel values.
    pub data_range: f64,
    /// Side of the uniform window. Must be odd and at least 3.
    pub window_size: usize,
    /// Luminance stabiliser factor, `C1 = (K1·L)²`.
    pub k1: f64,
    /// Contrast stabiliser factor, `C2 = (K2·L)²`.
    pub k2: f64,
    /// Luminance exponent.
    pub alpha: f64,
    /// Contrast exponent.
    pub beta: f64,
    /// Structure exponent.
    pub gamma: f64,
    /// Weight each window with a Gaussian instead of uniformly.
    pub gaussian_weights: bool,
    /// Standard deviation of the Gaussian window.
    pub sigma: f64,
    /// Normalise covariances by `N - 1` instead of `N`.
    pub use_sample_covariance: bool,
    /// Average per-channel SSIM; when false the tensor is reduced to luma first.
    pub multichannel: bool,
}

impl Default for SsimConfig {
    fn default() -> Self {
        Self {
            data_range: 1.0,
            window_size: 7,
            k1: 0.01,
            k2: 0.03,
            alpha: 1.0,
            beta: 1.0,
            gamma: 1.0,
            gaussian_weights: false,
            sigma: 1.5,
            use_sample_covariance: true,
            multichannel: true,
        }
    }
}

impl SsimConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> SsimConfigBuilder {
        SsimConfigBuilder::default()
    }

    /// Settings of Wang et al. (2004): 11×11 Gaussian window with σ = 1.5
    /// and population covariance.
    #[must_use]
    pub fn gaussian() -> Self {
        Self {
            gaussian_weights: true,
            use_sample_covariance: false,
            ..Self::default()
        }
    }

    /// `C1 = (K1·L)²`.
    #[must_use]
    pub fn c1(&self) -> f64 {
        (self.k1 * self.data_range).powi(2)
    }

    /// `C2 = (K2·L)²`.
    #[must_use]
    pub fn c2(&self) -> f64 {
        (self.k2 * self.data_range).powi(2)
    }

    /// `C3 = C2 / 2`.
    #[must_use]
    pub fn c3(&self) -> f64 {
        self.c2() / 2.0
    }

    /// Window side before it is fitted to an image.
    #[must_use]
    pub fn nominal_window(&self) -> usize {
        if self.gaussian_weights {
            2 * (GAUSSIAN_TRUNCATE * self.sigma).round() as usize + 1
        } else {
            self.window_size
        }
    }

    /// Window side used for an image of `height × width`.
    ///
    /// Shrinks to the largest odd side that fits when the image is smaller
    /// than the nominal window.
    #[must_use]
    pub fn window_for(&self, height: usize, width: usize) -> usize {
        let fit = height.min(width).max(1);
        let nominal = self.nominal_window();
        if nominal <= fit {
            nominal
        } else if fit % 2 == 1 {
            fit
        } else {
            fit - 1
        }
    }

    /// Check every parameter against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if !(self.data_range.is_finite() && self.data_range > 0.0) {
            return Err(Error::config(
                "data_range",
                format!("must be positive, got {}", self.data_range),
            ));
        }
        if self.window_size < 3 || self.window_size % 2 == 0 {
            return Err(Error::config(
                "window_size",
                format!("must be odd and >= 3, got {}", self.window_size),
            ));
        }
        for (name, k) in [("k1", self.k1), ("k2", self.k2)] {
            if !(k.is_finite() && k > 0.0) {
                return Err(Error::config(name, format!("must be positive, got {k}")));
            }
        }
        for (name, e) in [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)] {
            if !(e.is_finite() && e >= 0.0) {
                return Err(Error::config(name, format!("must be non-negative, got {e}")));
            }
        }
        if self.gaussian_weights && !(self.sigma > 0.0 && self.sigma <= MAX_SIGMA) {
            return Err(Error::config(
                "sigma",
                format!("must be in (0, {MAX_SIGMA}], got {}", self.sigma),
            ));
        }
        Ok(())
    }

    fn unit_exponents(&self) -> bool {
        self.alpha == 1.0 && self.beta == 1.0 && self.gamma == 1.0
    }
}

/// Builder for [`SsimConfig`].
#[derive(Debug, Default)]
pub struct SsimConfigBuilder {
    config: SsimConfig,
}

impl SsimConfigBuilder {
    /// Set the data range `L`.
    #[must_use]
    pub fn data_range(mut self, data_range: f64) -> Self {
        self.config.data_range = data_range;
        self
    }

    /// Set the uniform window side.
    #[must_use]
    pub fn window_size(mut self, window_size: usize) -> Self {
        self.config.window_size = window_size;
        self
    }

    /// Set the stabiliser factors `K1` and `K2`.
    #[must_use]
    pub fn constants(mut self, k1: f64, k2: f64) -> Self {
        self.config.k1 = k1;
        self.config.k2 = k2;
        self
    }

    /// Set the luminance, contrast and structure exponents.
    #[must_use]
    pub fn exponents(mut self, alpha: f64, beta: f64, gamma: f64) -> Self {
        self.config.alpha = alpha;
        self.config.beta = beta;
        self.config.gamma = gamma;
        self
    }

    /// Use a Gaussian window with standard deviation `sigma`.
    #[must_use]
    pub fn gaussian_weights(mut self, sigma: f64) -> Self {
        self.config.gaussian_weights = true;
        self.config.sigma = sigma;
        self
    }

    /// Normalise covariances by `N - 1` (true) or `N` (false).
    #[must_use]
    pub fn sample_covariance(mut self, enabled: bool) -> Self {
        self.config.use_sample_covariance = enabled;
        self
    }

    /// Average per-channel SSIM (true) or compare luma only (false).
    #[must_use]
    pub fn multichannel(mut self, enabled: bool) -> Self {
        self.config.multichannel = enabled;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<SsimConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Aggregated SSIM of two tensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsimScore {
    /// Mean SSIM over all windows and channels.
    pub mean: f64,
    /// Mean SSIM of each channel (one entry when not multichannel).
    pub per_channel: Vec<f64>,
    /// Window side that was actually used.
    pub window_size: usize,
}

/// Per-window SSIM values over the valid region.
#[derive(Debug, Clone, PartialEq)]
pub struct SsimMap {
    /// Rows of valid window centres.
    pub height: usize,
    /// Columns of valid window centres.
    pub width: usize,
    /// Number of channels.
    pub channels: usize,
    /// Window side that was used.
    pub window_size: usize,
    /// One row-major plane per channel.
    pub planes: Vec<Vec<f64>>,
}

impl SsimMap {
    /// Mean SSIM of each plane.
    #[must_use]
    pub fn channel_means(&self) -> Vec<f64> {
        self.planes
            .iter()
            .map(|p| p.iter().sum::<f64>() / p.len() as f64)
            .collect()
    }
}

/// Compute the mean SSIM between `x` and `y`.
///
/// Both tensors must already be in the range described by
/// [`SsimConfig::data_range`].
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the shapes differ,
/// [`Error::InvalidConfig`] for an invalid configuration and
/// [`Error::InvalidInput`] when luma reduction is impossible.
pub fn structural_similarity(
    x: &ImageTensor,
    y: &ImageTensor,
    config: &SsimConfig,
) -> Result<SsimScore> {
    let map = ssim_map(x, y, config)?;
    let per_channel = map.channel_means();
    let mean = per_channel.iter().sum::<f64>() / per_channel.len() as f64;
    log::trace!(
        "ssim {mean:.6} over {} channel(s), window {}",
        per_channel.len(),
        map.window_size
    );
    Ok(SsimScore {
        mean,
        per_channel,
        window_size: map.window_size,
    })
}

/// Compute the per-window SSIM map between `x` and `y`.
pub fn ssim_map(x: &ImageTensor, y: &ImageTensor, config: &SsimConfig) -> Result<SsimMap> {
    if x.shape() != y.shape() {
        return Err(Error::ShapeMismatch {
            expected: x.shape(),
            actual: y.shape(),
        });
    }
    config.validate()?;

    let (x, y): (Cow<'_, ImageTensor>, Cow<'_, ImageTensor>) =
        if config.multichannel || x.channels() == 1 {
            (Cow::Borrowed(x), Cow::Borrowed(y))
        } else {
            (Cow::Owned(x.to_luma()?), Cow::Owned(y.to_luma()?))
        };

    let (height, width) = (x.height(), x.width());
    let window = config.window_for(height, width);
    if window != config.nominal_window() {
        log::debug!(
            "image {height}x{width} smaller than {0}x{0} window, using {window}x{window}",
            config.nominal_window()
        );
    }
    let kernel = window_kernel(config, window);
    let stats = WindowStats {
        height,
        width,
        kernel: &kernel,
        cov_norm: covariance_norm(config, window),
        c1: config.c1(),
        c2: config.c2(),
        c3: config.c3(),
        config,
    };

    let channels: Vec<usize> = (0..x.channels()).collect();
    let eval = |&c: &usize| stats.channel(&x.channel_plane(c), &y.channel_plane(c));
    #[cfg(feature = "rayon")]
    let planes: Vec<Vec<f64>> = channels.par_iter().map(eval).collect();
    #[cfg(not(feature = "rayon"))]
    let planes: Vec<Vec<f64>> = channels.iter().map(eval).collect();

    Ok(SsimMap {
        height: height - window + 1,
        width: width - window + 1,
        channels: planes.len(),
        window_size: window,
        planes,
    })
}

/// Normalised 1-D window weights of length `window`.
fn window_kernel(config: &SsimConfig, window: usize) -> Vec<f64> {
    if !config.gaussian_weights {
        return vec![1.0 / window as f64; window];
    }
    let radius = (window / 2) as f64;
    let weights: Vec<f64> = (0..window)
        .map(|i| {
            let d = i as f64 - radius;
            (-0.5 * d * d / (config.sigma * config.sigma)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

fn covariance_norm(config: &SsimConfig, window: usize) -> f64 {
    let np = (window * window) as f64;
    if config.use_sample_covariance && np > 1.0 {
        np / (np - 1.0)
    } else {
        1.0
    }
}

struct WindowStats<'a> {
    height: usize,
    width: usize,
    kernel: &'a [f64],
    cov_norm: f64,
    c1: f64,
    c2: f64,
    c3: f64,
    config: &'a SsimConfig,
}

impl WindowStats<'_> {
    fn channel(&self, x: &[f64], y: &[f64]) -> Vec<f64> {
        let xx: Vec<f64> = x.iter().map(|v| v * v).collect();
        let yy: Vec<f64> = y.iter().map(|v| v * v).collect();
        let xy: Vec<f64> = x.iter().zip(y).map(|(a, b)| a * b).collect();

        let ux = self.filter(x);
        let uy = self.filter(y);
        let uxx = self.filter(&xx);
        let uyy = self.filter(&yy);
        let uxy = self.filter(&xy);

        (0..ux.len())
            .map(|i| {
                let vx = self.cov_norm * (uxx[i] - ux[i] * ux[i]);
                let vy = self.cov_norm * (uyy[i] - uy[i] * uy[i]);
                let vxy = self.cov_norm * (uxy[i] - ux[i] * uy[i]);
                if self.config.unit_exponents() {
                    self.collapsed(ux[i], uy[i], vx, vy, vxy)
                } else {
                    self.three_term(ux[i], uy[i], vx, vy, vxy)
                }
            })
            .collect()
    }

    /// `l·c·s` with `C3 = C2/2` folded into a single contrast-structure term.
    fn collapsed(&self, ux: f64, uy: f64, vx: f64, vy: f64, vxy: f64) -> f64 {
        ((2.0 * ux * uy + self.c1) * (2.0 * vxy + self.c2))
            / ((ux * ux + uy * uy + self.c1) * (vx + vy + self.c2))
    }

    fn three_term(&self, ux: f64, uy: f64, vx: f64, vy: f64, vxy: f64) -> f64 {
        let sx = vx.max(0.0).sqrt();
        let sy = vy.max(0.0).sqrt();
        let l = (2.0 * ux * uy + self.c1) / (ux * ux + uy * uy + self.c1);
        let c = (2.0 * sx * sy + self.c2) / (vx + vy + self.c2);
        let s = (vxy + self.c3) / (sx * sy + self.c3);
        signed_pow(l, self.config.alpha)
            * signed_pow(c, self.config.beta)
            * signed_pow(s, self.config.gamma)
    }

    /// Separable weighted sum over the valid region.
    fn filter(&self, plane: &[f64]) -> Vec<f64> {
        let k = self.kernel;
        let win = k.len();
        let out_w = self.width - win + 1;
        let out_h = self.height - win + 1;

        let mut rows: Vec<f64> = Vec::with_capacity(self.height * out_w);
        for row in plane.chunks_exact(self.width) {
            for ox in 0..out_w {
                rows.push(row[ox..ox + win].iter().zip(k).map(|(v, w)| v * w).sum::<f64>());
            }
        }

        let mut out = Vec::with_capacity(out_h * out_w);
        for oy in 0..out_h {
            for ox in 0..out_w {
                out.push(
                    k.iter()
                        .enumerate()
                        .map(|(i, w)| rows[(oy + i) * out_w + ox] * w)
                        .sum::<f64>(),
                );
            }
        }
        out
    }
}

/// `|v|^e` carrying the sign of `v`, so negative structure terms stay defined.
fn signed_pow(v: f64, e: f64) -> f64 {
    if e == 1.0 {
        v
    } else {
        v.signum() * v.abs().powf(e)
    }
}
