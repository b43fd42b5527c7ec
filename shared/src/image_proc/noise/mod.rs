//! Noise processing module
//!
//! - **generate**: seeded uniform and Gaussian-smoothed noise fields

pub mod generate;

pub use generate::{smoothed_uniform_noise, uniform_noise_field};
