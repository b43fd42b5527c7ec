//! Low-light post effect for the night haze variant.
//!
//! Darkens the image and pulls it towards a dim blue:
//!
//! ```text
//! out = clamp((1 - w) * (img * brightness) + w * tint)
//! ```
//!
//! with `brightness = 0.4`, `tint = (0, 0, 0.1)` and `w = 0.3` by default.
//! The operation is lossy, so applying it twice darkens further.

use crate::Image;
use ndarray::{Axis, Zip};

/// Darkening plus cool-tint blend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NightEffect {
    /// Multiplier applied before blending
    pub brightness: f64,
    /// RGB colour blended in; grayscale images use its mean
    pub tint: [f64; 3],
    /// Weight of the tint in the blend
    pub tint_weight: f64,
}

impl Default for NightEffect {
    fn default() -> Self {
        Self {
            brightness: 0.4,
            tint: [0.0, 0.0, 0.1],
            tint_weight: 0.3,
        }
    }
}

impl NightEffect {
    /// Apply the effect to a 1- or 3-channel image in `[0, 1]`.
    pub fn apply(&self, image: &Image) -> Image {
        let channels = image.len_of(Axis(2));
        let gray_tint = self.tint.iter().sum::<f64>() / 3.0;
        let keep = 1.0 - self.tint_weight;

        let mut out = image.clone();
        Zip::from(out.lanes_mut(Axis(2))).par_for_each(|mut pixel| {
            for (c, value) in pixel.iter_mut().enumerate() {
                let tint = if channels == 3 { self.tint[c] } else { gray_tint };
                *value = (keep * (*value * self.brightness) + self.tint_weight * tint)
                    .clamp(0.0, 1.0);
            }
        });
        out
    }
}
