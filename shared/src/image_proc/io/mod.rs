//! Image I/O utilities for loading and saving image data
//!
//! Thin wrappers around the `image` crate: directory discovery, decoding to
//! normalized RGB grids with optional resizing, and JPEG/PNG encoding from
//! normalized grids. No pixel math lives here beyond the 8-bit conversion.

use crate::image_proc::image::{
    array2_to_gray_image, array3_to_dynamic_image, dynamic_image_to_array3, ConversionError,
};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use ndarray::{Array2, Array3};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions recognised as raster images (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// Errors that can occur while reading or writing image files
#[derive(Error, Debug)]
pub enum ImageIoError {
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl ImageIoError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Check whether a path carries one of [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// List the image files directly inside `dir`, sorted by path.
///
/// Subdirectories are not descended into.
pub fn list_images<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, ImageIoError> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|e| ImageIoError::io(dir, e))?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ImageIoError::io(dir, e))?.path();
        if path.is_file() && is_supported_image(&path) {
            images.push(path);
        }
    }

    images.sort();
    Ok(images)
}

/// Decode an image file into a `(height, width, 3)` RGB grid in `[0, 1]`.
///
/// # Arguments
/// * `path` - Image file to decode
/// * `resize` - Optional `(width, height)`; resampled with Lanczos3 when set
pub fn load_rgb<P: AsRef<Path>>(
    path: P,
    resize: Option<(u32, u32)>,
) -> Result<Array3<f64>, ImageIoError> {
    let path = path.as_ref();
    let mut img = image::open(path).map_err(|source| ImageIoError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some((width, height)) = resize {
        if img.width() != width || img.height() != height {
            img = img.resize_exact(width, height, FilterType::Lanczos3);
        }
    }

    Ok(dynamic_image_to_array3(&img))
}

/// Create a directory and its parents; existing directories are reused.
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<(), ImageIoError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| ImageIoError::io(dir, e))
}

/// Encode a 1- or 3-channel grid in `[0, 1]` as JPEG.
///
/// `quality` is clamped to `1..=100`.
pub fn save_jpeg<P: AsRef<Path>>(
    image: &Array3<f64>,
    path: P,
    quality: u8,
) -> Result<(), ImageIoError> {
    let path = path.as_ref();
    let img = array3_to_dynamic_image(image)?;

    let file = File::create(path).map_err(|e| ImageIoError::io(path, e))?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality.clamp(1, 100));
    img.write_with_encoder(encoder)
        .map_err(|source| ImageIoError::Encode {
            path: path.to_path_buf(),
            source,
        })
}

/// Save a `[0, 1]` scalar field as an 8-bit grayscale image.
///
/// The format follows the file extension.
pub fn save_gray_field<P: AsRef<Path>>(field: &Array2<f64>, path: P) -> Result<(), ImageIoError> {
    let path = path.as_ref();
    array2_to_gray_image(field)?
        .save(path)
        .map_err(|source| ImageIoError::Encode {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_image(Path::new("a/b/photo.JPG")));
        assert!(is_supported_image(Path::new("scan.tiff")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("no_extension")));
    }

    #[test]
    fn test_list_images_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.png", "a.jpg", "readme.md", "c.JPEG"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<String> = list_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "c.JPEG"]);
    }

    #[test]
    fn test_list_missing_dir_errors() {
        let dir = TempDir::new().unwrap();
        let result = list_images(dir.path().join("missing"));
        assert!(matches!(result, Err(ImageIoError::Io { .. })));
    }

    #[test]
    fn test_jpeg_roundtrip_of_flat_color() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flat.jpg");
        let mut image = Array3::zeros((16, 16, 3));
        image.fill(1.0);

        save_jpeg(&image, &path, 95).unwrap();
        let loaded = load_rgb(&path, None).unwrap();

        assert_eq!(loaded.dim(), (16, 16, 3));
        assert!(loaded.iter().all(|&v| v > 0.98));
    }

    #[test]
    fn test_load_with_resize() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small.png");
        save_gray_field(&Array2::from_elem((6, 10), 0.5), &path).unwrap();

        let loaded = load_rgb(&path, Some((4, 3))).unwrap();
        assert_eq!(loaded.dim(), (3, 4, 3));
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        assert!(matches!(
            load_rgb(&path, None),
            Err(ImageIoError::Decode { .. })
        ));
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("light").join("deeper");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
