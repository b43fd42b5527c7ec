//! Image processing primitives on ndarray grids.
//!
//! # Module Organization
//!
//! - **convolve**: separable Gaussian smoothing with configurable edge modes
//! - **noise**: seeded uniform and smoothed noise fields
//! - **image**: conversions between ndarray grids and `image` crate buffers
//! - **io**: directory discovery, decoding, and JPEG/PNG encoding
//!
//! Grids are `f64` with samples in `[0, 1]`; 2D arrays are indexed
//! `[row, col]` and colour images `[row, col, channel]`.

pub mod convolve;
pub mod image;
pub mod io;
pub mod noise;

pub use convolve::{gaussian_blur, gaussian_kernel_1d, EdgeMode};
pub use image::{
    array2_to_gray_image, array3_to_dynamic_image, dynamic_image_to_array3, unit_to_u8,
    ConversionError,
};
pub use io::{ensure_dir, list_images, load_rgb, save_gray_field, save_jpeg, ImageIoError};
pub use noise::{smoothed_uniform_noise, uniform_noise_field};
