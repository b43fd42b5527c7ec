//! Atmospheric scattering compositor (Koschmieder's law).
//!
//! Light from a scene point at depth `d` is attenuated by the transmission
//! `t = exp(-beta * d)` and replaced by scattered ambient light `A`:
//!
//! ```text
//! I(x) = J(x) * t(x) + A * (1 - t(x))
//! ```
//!
//! where `J` is the clear image, `I` the hazy one and `beta` the extinction
//! coefficient. Large `beta` or large depth drives `t` towards 0 and the
//! pixel towards `A`; `t = 1` leaves the pixel untouched.

use crate::depth::DepthMap;
use crate::error::HazeError;
use crate::Image;
use ndarray::{Array2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Depth values allowed to stray outside `[0, 1]` through rounding
const DEPTH_TOLERANCE: f64 = 1e-9;

/// Colour of the haze veil: one value for every channel, or one per RGB channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtmosphericLight {
    Scalar(f64),
    PerChannel([f64; 3]),
}

impl AtmosphericLight {
    /// Build from a slice of one (scalar) or three (RGB) values.
    ///
    /// # Errors
    /// `InvalidParameter` for any other arity or a non-finite value.
    pub fn from_slice(values: &[f64]) -> Result<Self, HazeError> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(HazeError::invalid("atmospheric light must be finite"));
        }
        match *values {
            [a] => Ok(Self::Scalar(a)),
            [r, g, b] => Ok(Self::PerChannel([r, g, b])),
            _ => Err(HazeError::invalid(format!(
                "atmospheric light needs 1 or 3 values, got {}",
                values.len()
            ))),
        }
    }

    /// Light applied to channel `c`.
    ///
    /// For `PerChannel`, `c` must be below 3.
    pub fn channel(&self, c: usize) -> f64 {
        match self {
            Self::Scalar(a) => *a,
            Self::PerChannel(rgb) => rgb[c],
        }
    }

    /// Copy with every component rounded to `digits` decimals, for labels.
    pub fn rounded(&self, digits: i32) -> Self {
        match self {
            Self::Scalar(a) => Self::Scalar(round_to(*a, digits)),
            Self::PerChannel(rgb) => Self::PerChannel(rgb.map(|v| round_to(v, digits))),
        }
    }
}

pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Fraction of scene light surviving `depth` units of haze with extinction `beta`.
///
/// In `(0, 1]` for `beta > 0` and `depth >= 0`; strictly decreasing in both.
pub fn transmission(beta: f64, depth: f64) -> f64 {
    (-beta * depth).exp()
}

/// Per-pixel transmission for a whole depth map.
pub fn transmission_map(depth: &DepthMap, beta: f64) -> Array2<f64> {
    depth.as_array().mapv(|d| transmission(beta, d))
}

/// Composite haze onto a clear image.
///
/// # Arguments
/// * `clear` - `(H, W, C)` image in `[0, 1]` with `C` of 1 or 3
/// * `depth` - `(H, W)` depth map
/// * `beta` - Extinction coefficient, finite and `> 0`
/// * `light` - Atmospheric light; `PerChannel` requires `C == 3`
///
/// # Returns
/// The hazy image, clamped to `[0, 1]`.
///
/// # Errors
/// `InvalidParameter` when any argument violates the constraints above.
pub fn composite(
    clear: &Image,
    depth: &DepthMap,
    beta: f64,
    light: &AtmosphericLight,
) -> Result<Image, HazeError> {
    validate(clear, depth, beta, light)?;

    let tmap = transmission_map(depth, beta);
    let mut hazy = clear.clone();

    Zip::from(hazy.lanes_mut(Axis(2)))
        .and(&tmap)
        .par_for_each(|mut pixel, &t| {
            for (c, value) in pixel.iter_mut().enumerate() {
                *value = (*value * t + light.channel(c) * (1.0 - t)).clamp(0.0, 1.0);
            }
        });

    Ok(hazy)
}

fn validate(
    clear: &Image,
    depth: &DepthMap,
    beta: f64,
    light: &AtmosphericLight,
) -> Result<(), HazeError> {
    if !(beta.is_finite() && beta > 0.0) {
        return Err(HazeError::invalid(format!(
            "extinction coefficient must be finite and > 0, got {beta}"
        )));
    }

    let (height, width, channels) = clear.dim();
    if channels != 1 && channels != 3 {
        return Err(HazeError::invalid(format!(
            "image must have 1 or 3 channels, got {channels}"
        )));
    }
    if depth.dim() != (height, width) {
        return Err(HazeError::invalid(format!(
            "depth map {:?} does not match image {}x{}",
            depth.dim(),
            height,
            width
        )));
    }

    match light {
        AtmosphericLight::PerChannel(rgb) if channels != 3 => {
            return Err(HazeError::invalid(format!(
                "per-channel atmospheric light {rgb:?} given for a {channels}-channel image"
            )));
        }
        AtmosphericLight::Scalar(a) if !a.is_finite() => {
            return Err(HazeError::invalid("atmospheric light must be finite"));
        }
        AtmosphericLight::PerChannel(rgb) if rgb.iter().any(|v| !v.is_finite()) => {
            return Err(HazeError::invalid("atmospheric light must be finite"));
        }
        _ => {}
    }

    if depth
        .as_array()
        .iter()
        .any(|&d| !(-DEPTH_TOLERANCE..=1.0 + DEPTH_TOLERANCE).contains(&d))
    {
        return Err(HazeError::invalid("depth values must lie in [0, 1]"));
    }

    Ok(())
}
