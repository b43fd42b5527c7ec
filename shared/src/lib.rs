//! Shared components and utilities for the haze synthesis workspace.
//!
//! This crate contains the generic ndarray image helpers that carry no
//! haze-specific knowledge: seeded parallel iteration, min/max scanning and
//! unit-range normalization, separable Gaussian smoothing, random noise
//! fields, and conversions between ndarray grids and the `image` crate.

pub mod algo;
pub mod image_proc;
