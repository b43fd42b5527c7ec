//! Batch orchestration over (image, profile) pairs.
//!
//! The pipeline owns no I/O. Images come from an [`ImageSource`] and results
//! go to a [`ResultSink`]; both are traits so the filesystem implementations
//! in [`crate::io`] can be swapped for in-memory ones.
//!
//! Images are processed in parallel, each with its own `StdRng` seeded from
//! the batch seed plus the image index, so a given seed reproduces the same
//! outputs however rayon schedules the work.

use crate::depth::{self, validate_depth_scale, DepthMap};
use crate::error::HazeError;
use crate::night::NightEffect;
use crate::profile::{
    sample_profile, HazeParameters, HazeProfile, ParameterLabel, PatternChoice, ProfileTable,
};
use crate::scattering::composite;
use crate::Image;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use shared::algo::par_map_seeded;
use std::fmt;
use std::str::FromStr;

/// When haze parameters are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingPolicy {
    /// Once per profile before any image is processed; shared by all images
    #[default]
    PerBatch,
    /// Freshly for every (image, profile) pair
    PerImage,
}

impl fmt::Display for SamplingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingPolicy::PerBatch => f.write_str("per-batch"),
            SamplingPolicy::PerImage => f.write_str("per-image"),
        }
    }
}

impl FromStr for SamplingPolicy {
    type Err = HazeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "per-batch" | "batch" => Ok(SamplingPolicy::PerBatch),
            "per-image" | "image" => Ok(SamplingPolicy::PerImage),
            other => Err(HazeError::invalid(format!(
                "unknown sampling policy '{other}', expected per-batch or per-image"
            ))),
        }
    }
}

/// Settings for one batch run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Profiles to synthesize, in output order. Empty selects the whole table.
    pub profiles: Vec<String>,
    pub sampling: SamplingPolicy,
    pub pattern: PatternChoice,
    /// Factor in `(0, 1]` applied to every generated depth map
    pub depth_scale: f64,
    /// Base seed; drawn from the thread RNG and logged when `None`
    pub seed: Option<u64>,
    pub night: NightEffect,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            sampling: SamplingPolicy::default(),
            pattern: PatternChoice::default(),
            depth_scale: 1.0,
            seed: None,
            night: NightEffect::default(),
        }
    }
}

/// One hazy image together with what produced it
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub profile: String,
    pub image: Image,
    pub depth: DepthMap,
    pub parameters: HazeParameters,
}

/// Supplier of clear input images
pub trait ImageSource: Sync {
    /// Stable identifier, used for output naming and reporting
    fn name(&self) -> &str;

    /// Decode the image as `(H, W, C)` in `[0, 1]`.
    ///
    /// Failures should be reported as [`HazeError::UnreadableInput`]; the
    /// batch skips the image and carries on.
    fn load(&self) -> Result<Image, HazeError>;

    /// Measured depth for this image, used instead of a generated map.
    fn depth_map(&self) -> Option<DepthMap> {
        None
    }
}

/// Consumer of synthesis results
pub trait ResultSink: Sync {
    fn persist(&self, source: &str, result: &SynthesisResult) -> Result<(), HazeError>;
}

/// Haze one image with already sampled parameters.
///
/// Uses `supplied_depth` when given, otherwise generates a map of the image
/// size with `rng`. The night effect runs after compositing when `night` is
/// set.
pub fn synthesize<R: Rng + ?Sized>(
    image: &Image,
    profile: &str,
    parameters: &HazeParameters,
    night: Option<&NightEffect>,
    supplied_depth: Option<&DepthMap>,
    rng: &mut R,
) -> Result<SynthesisResult, HazeError> {
    let (height, width, _) = image.dim();

    let depth = match supplied_depth {
        Some(depth) => depth.clone(),
        None => depth::generate(
            height,
            width,
            parameters.pattern,
            parameters.depth_scale,
            rng,
        )?,
    };

    let hazy = composite(image, &depth, parameters.beta, &parameters.light)?;
    let image = match night {
        Some(effect) => effect.apply(&hazy),
        None => hazy,
    };

    Ok(SynthesisResult {
        profile: profile.to_string(),
        image,
        depth,
        parameters: *parameters,
    })
}

/// An input that could not be loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedInput {
    pub image: String,
    pub reason: String,
}

/// An (image, profile) pair that failed to synthesize or persist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedWrite {
    pub image: String,
    pub profile: String,
    pub reason: String,
}

/// Parameters drawn for one image under [`SamplingPolicy::PerImage`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageParameters {
    pub image: String,
    pub parameters: Vec<ParameterLabel>,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub seed: u64,
    pub sampling: SamplingPolicy,
    pub images_processed: usize,
    pub results_written: usize,
    pub skipped: Vec<SkippedInput>,
    pub failed_writes: Vec<FailedWrite>,
    /// Shared parameters per profile; empty for per-image sampling
    pub batch_parameters: Vec<ParameterLabel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_parameters: Vec<ImageParameters>,
}

enum ImageOutcome {
    Skipped(SkippedInput),
    Processed {
        written: usize,
        failures: Vec<FailedWrite>,
        parameters: ImageParameters,
    },
}

/// Runs every selected profile over a set of images
pub struct BatchSynthesisPipeline {
    profiles: Vec<HazeProfile>,
    config: PipelineConfig,
}

impl BatchSynthesisPipeline {
    /// Resolve the configured profile names against `table`.
    ///
    /// # Errors
    /// * `UnknownProfile` - a configured name is missing from the table
    /// * `InvalidParameter` - depth scale outside `(0, 1]`
    pub fn new(table: &ProfileTable, config: PipelineConfig) -> Result<Self, HazeError> {
        validate_depth_scale(config.depth_scale)?;

        let profiles = if config.profiles.is_empty() {
            table.iter().cloned().collect()
        } else {
            config
                .profiles
                .iter()
                .map(|name| table.require(name).cloned())
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self { profiles, config })
    }

    pub fn profiles(&self) -> &[HazeProfile] {
        &self.profiles
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Draw one parameter set per profile from a generator seeded with `seed`.
    pub fn sample_batch_parameters(&self, seed: u64) -> Vec<HazeParameters> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.profiles
            .iter()
            .map(|profile| {
                sample_profile(profile, self.config.pattern, self.config.depth_scale, &mut rng)
            })
            .collect()
    }

    pub fn run<S, K>(&self, sources: &[S], sink: &K) -> BatchReport
    where
        S: ImageSource,
        K: ResultSink,
    {
        self.run_with_progress(sources, sink, |_| {})
    }

    /// Run the batch, calling `progress` with each image name once it is done.
    pub fn run_with_progress<S, K, P>(&self, sources: &[S], sink: &K, progress: P) -> BatchReport
    where
        S: ImageSource,
        K: ResultSink,
        P: Fn(&str) + Send + Sync,
    {
        let seed = self.config.seed.unwrap_or_else(|| {
            let seed = rand::thread_rng().gen();
            info!("No seed supplied, using {}", seed);
            seed
        });

        let batch = match self.config.sampling {
            SamplingPolicy::PerBatch => {
                let parameters = self.sample_batch_parameters(seed);
                for (profile, params) in self.profiles.iter().zip(&parameters) {
                    info!(
                        "{}: beta={} t={:.3} A={:?} pattern={}",
                        profile.name,
                        params.beta_rounded(),
                        params.transmission_target,
                        params.light.rounded(3),
                        params.pattern
                    );
                }
                Some(parameters)
            }
            SamplingPolicy::PerImage => None,
        };

        info!(
            "Synthesizing {} images x {} profiles ({} sampling, seed {})",
            sources.len(),
            self.profiles.len(),
            self.config.sampling,
            seed
        );

        let outcomes = par_map_seeded(sources, seed.wrapping_add(1), |_, source, rng| {
            let outcome = self.process_image(source, sink, batch.as_deref(), rng);
            progress(source.name());
            outcome
        });

        let mut report = BatchReport {
            seed,
            sampling: self.config.sampling,
            batch_parameters: batch
                .iter()
                .flatten()
                .zip(&self.profiles)
                .map(|(params, profile)| params.label(&profile.name))
                .collect(),
            ..BatchReport::default()
        };

        for outcome in outcomes {
            match outcome {
                ImageOutcome::Skipped(skipped) => report.skipped.push(skipped),
                ImageOutcome::Processed {
                    written,
                    failures,
                    parameters,
                } => {
                    report.images_processed += 1;
                    report.results_written += written;
                    report.failed_writes.extend(failures);
                    if self.config.sampling == SamplingPolicy::PerImage {
                        report.image_parameters.push(parameters);
                    }
                }
            }
        }

        info!(
            "Batch done: {} images processed, {} results written, {} skipped, {} failed",
            report.images_processed,
            report.results_written,
            report.skipped.len(),
            report.failed_writes.len()
        );
        report
    }

    fn process_image<S, K>(
        &self,
        source: &S,
        sink: &K,
        batch: Option<&[HazeParameters]>,
        rng: &mut StdRng,
    ) -> ImageOutcome
    where
        S: ImageSource,
        K: ResultSink,
    {
        let name = source.name();
        let image = match source.load() {
            Ok(image) => image,
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                return ImageOutcome::Skipped(SkippedInput {
                    image: name.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        let supplied_depth = source.depth_map();

        let mut written = 0;
        let mut failures = Vec::new();
        let mut labels = Vec::with_capacity(self.profiles.len());

        for (index, profile) in self.profiles.iter().enumerate() {
            let parameters = match batch.and_then(|b| b.get(index)) {
                Some(params) => *params,
                None => sample_profile(profile, self.config.pattern, self.config.depth_scale, rng),
            };
            debug!(
                "{} / {}: beta={} pattern={}",
                name,
                profile.name,
                parameters.beta_rounded(),
                parameters.pattern
            );
            labels.push(parameters.label(&profile.name));

            let night = profile.applies_night().then_some(&self.config.night);
            let result = synthesize(
                &image,
                &profile.name,
                &parameters,
                night,
                supplied_depth.as_ref(),
                rng,
            )
            .and_then(|result| sink.persist(name, &result));

            match result {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!("Failed {} / {}: {}", name, profile.name, e);
                    failures.push(FailedWrite {
                        image: name.to_string(),
                        profile: profile.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        ImageOutcome::Processed {
            written,
            failures,
            parameters: ImageParameters {
                image: name.to_string(),
                parameters: labels,
            },
        }
    }
}
