//! Filesystem implementations of the pipeline collaborators.
//!
//! Layout written by [`DirectorySink`]:
//!
//! ```text
//! <root>/<profile>/<stem>.jpg
//! <root>/depth/<profile>/<stem>.png    (with write_depth)
//! <root>/haze_parameters.json          (write_manifest)
//! ```

use crate::error::HazeError;
use crate::pipeline::{BatchReport, ImageSource, ResultSink, SynthesisResult};
use crate::Image;
use log::{debug, warn};
use shared::image_proc::{
    ensure_dir, list_images, load_rgb, save_gray_field, save_jpeg, ImageIoError,
};
use std::path::{Path, PathBuf};

/// JPEG quality used when none is configured
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// File name of the parameter manifest inside the output root
pub const MANIFEST_FILE: &str = "haze_parameters.json";

/// Subdirectory holding exported depth maps
pub const DEPTH_DIR: &str = "depth";

/// An image file decoded on demand
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
    name: String,
    resize: Option<(u32, u32)>,
}

impl FileImageSource {
    /// Source named after the file stem, optionally resized to `(width, height)`.
    pub fn new<P: Into<PathBuf>>(path: P, resize: Option<(u32, u32)>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, name, resize }
    }

    /// Every supported image directly inside `dir`, sorted by path.
    pub fn discover<P: AsRef<Path>>(
        dir: P,
        resize: Option<(u32, u32)>,
    ) -> Result<Vec<Self>, HazeError> {
        let sources: Vec<Self> = list_images(dir.as_ref())?
            .into_iter()
            .map(|path| Self::new(path, resize))
            .collect();

        for pair in sources.windows(2) {
            if pair[0].name == pair[1].name {
                warn!(
                    "{} and {} share the stem '{}'; outputs will overwrite each other",
                    pair[0].path.display(),
                    pair[1].path.display(),
                    pair[0].name
                );
            }
        }

        debug!("Found {} images in {}", sources.len(), dir.as_ref().display());
        Ok(sources)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for FileImageSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Image, HazeError> {
        load_rgb(&self.path, self.resize).map_err(|e| HazeError::UnreadableInput {
            name: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Writes results as JPEG files, one directory per profile
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    quality: u8,
    write_depth: bool,
}

impl DirectorySink {
    pub fn new<P: Into<PathBuf>>(root: P, quality: u8, write_depth: bool) -> Self {
        Self {
            root: root.into(),
            quality: quality.clamp(1, 100),
            write_depth,
        }
    }

    /// Create the output directories for `profiles`; existing ones are reused.
    pub fn prepare<S: AsRef<str>>(&self, profiles: &[S]) -> Result<(), HazeError> {
        for profile in profiles {
            ensure_dir(self.root.join(profile.as_ref()))?;
            if self.write_depth {
                ensure_dir(self.root.join(DEPTH_DIR).join(profile.as_ref()))?;
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the hazy image for (`source`, `profile`) is written.
    pub fn output_path(&self, source: &str, profile: &str) -> PathBuf {
        self.root.join(profile).join(format!("{source}.jpg"))
    }

    /// Where the depth map for (`source`, `profile`) is written.
    pub fn depth_path(&self, source: &str, profile: &str) -> PathBuf {
        self.root
            .join(DEPTH_DIR)
            .join(profile)
            .join(format!("{source}.png"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }
}

impl ResultSink for DirectorySink {
    fn persist(&self, source: &str, result: &SynthesisResult) -> Result<(), HazeError> {
        let path = self.output_path(source, &result.profile);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        save_jpeg(&result.image, &path, self.quality)?;

        if self.write_depth {
            let depth_path = self.depth_path(source, &result.profile);
            if let Some(parent) = depth_path.parent() {
                ensure_dir(parent)?;
            }
            save_gray_field(result.depth.as_array(), &depth_path)?;
        }

        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Save the batch report as pretty-printed JSON.
pub fn write_manifest<P: AsRef<Path>>(path: P, report: &BatchReport) -> Result<(), HazeError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|source| {
        HazeError::Io(ImageIoError::Io {
            path: path.to_path_buf(),
            source,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::{DepthMap, DepthPattern};
    use crate::profile::HazeParameters;
    use crate::scattering::AtmosphericLight;
    use ndarray::Array3;
    use tempfile::TempDir;

    fn result(profile: &str) -> SynthesisResult {
        SynthesisResult {
            profile: profile.to_string(),
            image: Array3::from_elem((8, 12, 3), 0.5),
            depth: DepthMap::constant((8, 12), 0.25),
            parameters: HazeParameters {
                transmission_target: 0.5,
                beta: 2.0_f64.ln(),
                light: AtmosphericLight::Scalar(1.1),
                depth_scale: 1.0,
                pattern: DepthPattern::Center,
            },
        }
    }

    #[test]
    fn test_source_named_after_stem() {
        let source = FileImageSource::new("/data/in/street.scene.png", None);
        assert_eq!(source.name(), "street.scene");
    }

    #[test]
    fn test_unreadable_file_maps_to_unreadable_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();

        let err = FileImageSource::new(&path, None).load().unwrap_err();
        assert!(matches!(err, HazeError::UnreadableInput { .. }));
    }

    #[test]
    fn test_sink_writes_image_and_depth() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path(), DEFAULT_JPEG_QUALITY, true);
        sink.prepare(&["light"]).unwrap();
        sink.persist("frame", &result("light")).unwrap();

        let jpg = dir.path().join("light").join("frame.jpg");
        let png = dir.path().join("depth").join("light").join("frame.png");
        assert!(jpg.is_file());
        assert!(png.is_file());

        let decoded = image::open(&jpg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 8));
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path(), 80, false);
        sink.prepare(&["gray", "night"]).unwrap();
        sink.prepare(&["gray", "night"]).unwrap();
        assert!(dir.path().join("gray").is_dir());
        assert!(!dir.path().join(DEPTH_DIR).exists());
    }

    #[test]
    fn test_manifest_contents() {
        let dir = TempDir::new().unwrap();
        let report = BatchReport {
            seed: 42,
            images_processed: 3,
            batch_parameters: vec![result("heavy").parameters.label("heavy")],
            ..BatchReport::default()
        };
        let path = dir.path().join(MANIFEST_FILE);
        write_manifest(&path, &report).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["seed"], 42);
        assert_eq!(json["sampling"], "per-batch");
        assert_eq!(json["batch_parameters"][0]["profile"], "heavy");
        let beta = json["batch_parameters"][0]["beta"].as_f64().unwrap();
        assert!((beta - 0.693).abs() < 1e-12);
        assert_eq!(json["batch_parameters"][0]["pattern"], "center");
        assert!(json.get("image_parameters").is_none());
    }
}
