//! Synthetic atmospheric haze for image augmentation.
//!
//! Clear images are turned into hazy variants with the single-scattering
//! model `I = J * t + A * (1 - t)`, `t = exp(-beta * depth)`, over a
//! procedurally generated depth map. Named [`profile`]s map haze categories
//! to parameter ranges, and the [`pipeline`] runs profiles over batches of
//! images in parallel.
//!
//! ```
//! use hazesim::{depth, scattering, DepthPattern, PatternChoice, ProfileTable};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let table = ProfileTable::default();
//! let params = hazesim::profile::sample(
//!     "medium", &table, PatternChoice::Fixed(DepthPattern::Center), 1.0, &mut rng,
//! ).unwrap();
//!
//! let clear = ndarray::Array3::from_elem((32, 48, 3), 0.5);
//! let depth = depth::generate(32, 48, params.pattern, params.depth_scale, &mut rng).unwrap();
//! let hazy = scattering::composite(&clear, &depth, params.beta, &params.light).unwrap();
//! assert_eq!(hazy.dim(), (32, 48, 3));
//! ```

pub mod depth;
pub mod error;
pub mod io;
pub mod night;
pub mod pipeline;
pub mod profile;
pub mod scattering;

/// `(height, width, channels)` image with samples in `[0, 1]`
pub type Image = ndarray::Array3<f64>;

pub use depth::{DepthMap, DepthPattern};
pub use error::HazeError;
pub use io::{write_manifest, DirectorySink, FileImageSource};
pub use night::NightEffect;
pub use pipeline::{
    synthesize, BatchReport, BatchSynthesisPipeline, ImageSource, PipelineConfig, ResultSink,
    SamplingPolicy, SynthesisResult,
};
pub use profile::{HazeParameters, HazeProfile, LightRange, PatternChoice, ProfileTable};
pub use scattering::{composite, transmission, AtmosphericLight};
