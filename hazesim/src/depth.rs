//! Procedural depth map generation.
//!
//! A depth map assigns each pixel a relative scene distance in `[0, 1]`
//! (0 = near, 1 = far) that modulates how much haze reaches it. Real depth
//! is not available for arbitrary photographs, so the map is synthesised
//! from one of four spatial patterns:
//!
//! | pattern | field before normalization |
//! |---|---|
//! | `uniform` | `0.5 + 0.5 * blur(noise, 30)` |
//! | `center` | distance from the image centre over centre-to-corner distance |
//! | `random` | `blur(noise, 20)` |
//! | `horizontal` | `0.7 * x / (W - 1) + 0.3 * blur(noise, 30)` |
//!
//! Every field is then min-max normalized to `[0, 1]` and multiplied by the
//! depth scale. A constant field (e.g. a single pixel) normalizes to zeros.

use crate::error::HazeError;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use shared::algo::normalize_unit_range;
use shared::image_proc::smoothed_uniform_noise;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Blur sigma for the low-frequency `uniform` and `horizontal` noise
pub const LOW_FREQUENCY_SIGMA: f64 = 30.0;

/// Blur sigma for the `random` pattern
pub const RANDOM_SIGMA: f64 = 20.0;

/// Base level and noise amplitude of the `uniform` pattern
const UNIFORM_BASE: f64 = 0.5;
const UNIFORM_NOISE_WEIGHT: f64 = 0.5;

/// Share of the linear gradient in the `horizontal` pattern
const HORIZONTAL_GRADIENT_WEIGHT: f64 = 0.7;

/// Values allowed to stray outside `[0, 1]` through rounding
const RANGE_TOLERANCE: f64 = 1e-9;

/// Spatial layout of a synthetic depth field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthPattern {
    /// Near-constant depth with gentle large-scale variation
    Uniform,
    /// Radial: nearest at the centre, farthest at the corners
    Center,
    /// Patchy medium-scale variation
    Random,
    /// Near on the left, far on the right
    Horizontal,
}

impl DepthPattern {
    /// Every supported pattern, in a stable order
    pub const ALL: [DepthPattern; 4] = [
        DepthPattern::Uniform,
        DepthPattern::Center,
        DepthPattern::Random,
        DepthPattern::Horizontal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DepthPattern::Uniform => "uniform",
            DepthPattern::Center => "center",
            DepthPattern::Random => "random",
            DepthPattern::Horizontal => "horizontal",
        }
    }
}

impl fmt::Display for DepthPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsing never fails: unrecognised names fall back to `Uniform`.
impl FromStr for DepthPattern {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let pattern = DepthPattern::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .unwrap_or_else(|| {
                log::debug!("Unrecognised depth pattern '{}', using uniform", s);
                DepthPattern::Uniform
            });
        Ok(pattern)
    }
}

/// Relative scene depth per pixel, every value in `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap(Array2<f64>);

impl DepthMap {
    /// Wrap an externally supplied field, checking that it lies in `[0, 1]`.
    ///
    /// # Errors
    /// `InvalidParameter` for an empty field, a non-finite value, or a value
    /// outside `[0, 1]`.
    pub fn from_array(field: Array2<f64>) -> Result<Self, HazeError> {
        if field.is_empty() {
            return Err(HazeError::invalid("depth map must not be empty"));
        }
        if let Some(bad) = field
            .iter()
            .find(|v| !v.is_finite() || **v < -RANGE_TOLERANCE || **v > 1.0 + RANGE_TOLERANCE)
        {
            return Err(HazeError::invalid(format!(
                "depth value {bad} outside [0, 1]"
            )));
        }
        Ok(Self(field.mapv(|v| v.clamp(0.0, 1.0))))
    }

    /// A map with the same depth everywhere; `depth` is clamped to `[0, 1]`.
    pub fn constant(shape: (usize, usize), depth: f64) -> Self {
        Self(Array2::from_elem(shape, depth.clamp(0.0, 1.0)))
    }

    /// (height, width)
    pub fn dim(&self) -> (usize, usize) {
        self.0.dim()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.0.view()
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.0
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.0
    }
}

/// Generate a normalized depth map.
///
/// # Arguments
/// * `height`, `width` - Grid size in pixels, both non-zero
/// * `pattern` - Spatial layout of the field
/// * `depth_scale` - Factor in `(0, 1]` applied after normalization
/// * `rng` - Caller-owned generator; the only source of randomness
///
/// # Errors
/// `InvalidParameter` for a zero dimension or a depth scale outside `(0, 1]`.
pub fn generate<R: rand::Rng + ?Sized>(
    height: usize,
    width: usize,
    pattern: DepthPattern,
    depth_scale: f64,
    rng: &mut R,
) -> Result<DepthMap, HazeError> {
    if height == 0 || width == 0 {
        return Err(HazeError::invalid(format!(
            "depth map dimensions must be non-zero, got {height}x{width}"
        )));
    }
    validate_depth_scale(depth_scale)?;

    let raw = raw_field((height, width), pattern, rng);
    let normalized = normalize_unit_range(&raw)
        .map_err(|e| HazeError::invalid(format!("depth field not normalizable: {e}")))?;

    Ok(DepthMap(normalized * depth_scale))
}

pub(crate) fn validate_depth_scale(depth_scale: f64) -> Result<(), HazeError> {
    if depth_scale > 0.0 && depth_scale <= 1.0 {
        Ok(())
    } else {
        Err(HazeError::invalid(format!(
            "depth scale must lie in (0, 1], got {depth_scale}"
        )))
    }
}

fn raw_field<R: rand::Rng + ?Sized>(
    shape: (usize, usize),
    pattern: DepthPattern,
    rng: &mut R,
) -> Array2<f64> {
    match pattern {
        DepthPattern::Uniform => {
            smoothed_uniform_noise(shape, LOW_FREQUENCY_SIGMA, rng) * UNIFORM_NOISE_WEIGHT
                + UNIFORM_BASE
        }
        DepthPattern::Center => radial_field(shape),
        DepthPattern::Random => smoothed_uniform_noise(shape, RANDOM_SIGMA, rng),
        DepthPattern::Horizontal => {
            let noise = smoothed_uniform_noise(shape, LOW_FREQUENCY_SIGMA, rng);
            horizontal_gradient(shape) * HORIZONTAL_GRADIENT_WEIGHT
                + noise * (1.0 - HORIZONTAL_GRADIENT_WEIGHT)
        }
    }
}

/// Distance from the image centre divided by the centre-to-corner distance.
fn radial_field((height, width): (usize, usize)) -> Array2<f64> {
    let cy = (height as f64 - 1.0) / 2.0;
    let cx = (width as f64 - 1.0) / 2.0;
    let corner = cy.hypot(cx);

    if corner == 0.0 {
        return Array2::zeros((height, width));
    }

    Array2::from_shape_fn((height, width), |(y, x)| {
        (y as f64 - cy).hypot(x as f64 - cx) / corner
    })
}

/// 0 at the left column rising linearly to 1 at the right column.
fn horizontal_gradient((height, width): (usize, usize)) -> Array2<f64> {
    let denom = width.saturating_sub(1).max(1) as f64;
    Array2::from_shape_fn((height, width), |(_, x)| x as f64 / denom)
}
