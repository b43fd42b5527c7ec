//! Image format conversion utilities.
//!
//! Conversion functions between ndarray grids of normalized `f64` samples
//! and `image` crate buffers of 8-bit samples. Everything numeric happens on
//! the ndarray side in `[0, 1]`; 8-bit values only exist at this boundary.
//!
//! # Coordinate System Conversions
//!
//! - **ndarray**: matrix indexing `[row, col, channel]` = `[y, x, c]`
//! - **image crate**: graphics indexing `(x, y)` with (width, height) dimensions

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::{Array2, Array3};
use thiserror::Error;

/// Errors converting between ndarray grids and image buffers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Unsupported channel count {0}, expected 1 or 3")]
    UnsupportedChannels(usize),
    #[error("Image dimensions {0}x{1} exceed the u32 range")]
    TooLarge(usize, usize),
}

/// Map a normalized sample to 8 bits, clamping out-of-range input.
pub fn unit_to_u8(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Map an 8-bit sample to `[0, 1]`.
pub fn u8_to_unit(value: u8) -> f64 {
    value as f64 / 255.0
}

/// Convert an RGB buffer to a `(height, width, 3)` grid in `[0, 1]`.
pub fn rgb_image_to_array3(img: &RgbImage) -> Array3<f64> {
    let (width, height) = img.dimensions();
    Array3::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
        u8_to_unit(img.get_pixel(x as u32, y as u32)[c])
    })
}

/// Convert a grayscale buffer to a `(height, width, 1)` grid in `[0, 1]`.
pub fn gray_image_to_array3(img: &GrayImage) -> Array3<f64> {
    let (width, height) = img.dimensions();
    Array3::from_shape_fn((height as usize, width as usize, 1), |(y, x, _)| {
        u8_to_unit(img.get_pixel(x as u32, y as u32)[0])
    })
}

/// Decode any `DynamicImage` into the canonical RGB channel order.
pub fn dynamic_image_to_array3(img: &DynamicImage) -> Array3<f64> {
    rgb_image_to_array3(&img.to_rgb8())
}

/// Convert a 1- or 3-channel grid in `[0, 1]` to an 8-bit `DynamicImage`.
///
/// Samples are clamped and rounded to the nearest 8-bit value.
pub fn array3_to_dynamic_image(arr: &Array3<f64>) -> Result<DynamicImage, ConversionError> {
    let (height, width, channels) = arr.dim();
    let (w, h) = checked_dims(width, height)?;

    match channels {
        1 => Ok(DynamicImage::ImageLuma8(ImageBuffer::from_fn(w, h, |x, y| {
            Luma([unit_to_u8(arr[[y as usize, x as usize, 0]])])
        }))),
        3 => Ok(DynamicImage::ImageRgb8(ImageBuffer::from_fn(w, h, |x, y| {
            let (y, x) = (y as usize, x as usize);
            Rgb([
                unit_to_u8(arr[[y, x, 0]]),
                unit_to_u8(arr[[y, x, 1]]),
                unit_to_u8(arr[[y, x, 2]]),
            ])
        }))),
        other => Err(ConversionError::UnsupportedChannels(other)),
    }
}

/// Convert a `[0, 1]` scalar field (e.g. a depth map) to a GrayImage.
pub fn array2_to_gray_image(arr: &Array2<f64>) -> Result<GrayImage, ConversionError> {
    let (height, width) = arr.dim();
    let (w, h) = checked_dims(width, height)?;

    Ok(ImageBuffer::from_fn(w, h, |x, y| {
        Luma([unit_to_u8(arr[[y as usize, x as usize]])])
    }))
}

fn checked_dims(width: usize, height: usize) -> Result<(u32, u32), ConversionError> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(ConversionError::TooLarge(width, height)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_to_u8_clamps_and_rounds() {
        assert_eq!(unit_to_u8(0.0), 0);
        assert_eq!(unit_to_u8(1.0), 255);
        assert_eq!(unit_to_u8(1.3), 255);
        assert_eq!(unit_to_u8(-0.2), 0);
        assert_eq!(unit_to_u8(0.1), 26); // 25.5 rounds away from zero
    }

    #[test]
    fn test_rgb_orientation() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 0, Rgb([255, 0, 51]));

        let arr = rgb_image_to_array3(&img);
        assert_eq!(arr.dim(), (2, 3, 3));
        assert_eq!(arr[[0, 2, 0]], 1.0);
        assert_eq!(arr[[0, 2, 1]], 0.0);
        assert!((arr[[0, 2, 2]] - 0.2).abs() < 1e-12);
        assert_eq!(arr[[1, 0, 0]], 0.0);

        let back = array3_to_dynamic_image(&arr).unwrap().to_rgb8();
        assert_eq!(back, img);
    }

    #[test]
    fn test_gray_conversion() {
        let img = GrayImage::from_fn(4, 2, |x, y| Luma([(x * 10 + y) as u8]));
        let arr = gray_image_to_array3(&img);
        assert_eq!(arr.dim(), (2, 4, 1));

        match array3_to_dynamic_image(&arr).unwrap() {
            DynamicImage::ImageLuma8(back) => assert_eq!(back, img),
            other => panic!("expected Luma8, got {:?}", other.color()),
        }
    }

    #[test]
    fn test_dynamic_gray_promotes_to_rgb() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([128])));
        let arr = dynamic_image_to_array3(&img);
        assert_eq!(arr.dim(), (2, 2, 3));
        assert_eq!(arr[[1, 1, 0]], arr[[1, 1, 2]]);
    }

    #[test]
    fn test_unsupported_channels() {
        let arr = Array3::<f64>::zeros((2, 2, 4));
        assert_eq!(
            array3_to_dynamic_image(&arr).unwrap_err(),
            ConversionError::UnsupportedChannels(4)
        );
    }

    #[test]
    fn test_depth_field_to_gray() {
        let field = Array2::from_shape_fn((2, 3), |(_, x)| x as f64 / 2.0);
        let img = array2_to_gray_image(&field).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(0, 1)[0], 0);
        assert_eq!(img.get_pixel(1, 1)[0], 128);
        assert_eq!(img.get_pixel(2, 0)[0], 255);
    }
}
