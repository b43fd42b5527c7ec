//! Haze severity profiles and parameter sampling.
//!
//! A [`HazeProfile`] names a category of haze ("light", "yellow", ...) by
//! the ranges its physical parameters are drawn from. Sampling a profile
//! yields one concrete [`HazeParameters`]:
//!
//! 1. a target transmission `t ~ U[t_min, t_max]`,
//! 2. the extinction coefficient `beta = -ln(t)`, so that `t` is reached at
//!    depth 1,
//! 3. atmospheric light from its scalar or per-channel range,
//! 4. a depth pattern, fixed by the caller or drawn uniformly.
//!
//! `beta` keeps full precision for compositing; [`HazeParameters::label`]
//! gives the 3-decimal rounding used for logs and manifests.

use crate::depth::{validate_depth_scale, DepthPattern};
use crate::error::HazeError;
use crate::scattering::{round_to, AtmosphericLight};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Decimal digits kept in parameter labels
pub const LABEL_DIGITS: i32 = 3;

/// Name of the profile that receives the night effect by default
pub const NIGHT_PROFILE: &str = "night";

/// Sampling range of the atmospheric light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightRange {
    /// `[min, max]` for a single value shared by all channels
    Scalar([f64; 2]),
    /// `[[r, g, b] min, [r, g, b] max]`, drawn independently per channel
    PerChannel([[f64; 3]; 2]),
}

impl LightRange {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> AtmosphericLight {
        match self {
            LightRange::Scalar([lo, hi]) => AtmosphericLight::Scalar(draw(*lo, *hi, rng)),
            LightRange::PerChannel([lo, hi]) => {
                AtmosphericLight::PerChannel([0, 1, 2].map(|c| draw(lo[c], hi[c], rng)))
            }
        }
    }

    fn validate(&self, profile: &str) -> Result<(), HazeError> {
        let bounds: Vec<(f64, f64)> = match self {
            LightRange::Scalar([lo, hi]) => vec![(*lo, *hi)],
            LightRange::PerChannel([lo, hi]) => (0..3).map(|c| (lo[c], hi[c])).collect(),
        };

        for (lo, hi) in bounds {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(HazeError::InvalidProfile(format!(
                    "{profile}: atmospheric light range [{lo}, {hi}] is not an ordered finite interval"
                )));
            }
        }
        Ok(())
    }
}

/// Named sampling ranges for one haze category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazeProfile {
    pub name: String,
    /// Target transmission range `[t_min, t_max]` at depth 1
    pub transmission: [f64; 2],
    pub light: LightRange,
    /// Apply the night effect after compositing
    #[serde(default)]
    pub night: bool,
}

impl HazeProfile {
    /// Create a profile; the night flag is set for the profile named `night`.
    pub fn new(name: impl Into<String>, transmission: [f64; 2], light: LightRange) -> Self {
        let name = name.into();
        let night = name == NIGHT_PROFILE;
        Self {
            name,
            transmission,
            light,
            night,
        }
    }

    /// Whether the night effect follows compositing for this profile.
    pub fn applies_night(&self) -> bool {
        self.night || self.name == NIGHT_PROFILE
    }

    fn validate(&self) -> Result<(), HazeError> {
        if self.name.trim().is_empty() {
            return Err(HazeError::InvalidProfile("profile name is empty".into()));
        }

        let [t_min, t_max] = self.transmission;
        if !(t_min > 0.0 && t_min <= t_max && t_max < 1.0) {
            return Err(HazeError::InvalidProfile(format!(
                "{}: transmission range [{t_min}, {t_max}] must satisfy 0 < min <= max < 1",
                self.name
            )));
        }

        self.light.validate(&self.name)
    }
}

/// Ordered, validated collection of haze profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<HazeProfile>", into = "Vec<HazeProfile>")]
pub struct ProfileTable {
    profiles: Vec<HazeProfile>,
}

impl Default for ProfileTable {
    /// The seven built-in categories, lightest to darkest.
    fn default() -> Self {
        use LightRange::{PerChannel, Scalar};

        Self {
            profiles: vec![
                HazeProfile::new("light", [0.65, 0.75], Scalar([1.00, 1.08])),
                HazeProfile::new("medium", [0.45, 0.65], Scalar([1.09, 1.19])),
                HazeProfile::new("heavy", [0.35, 0.45], Scalar([1.20, 1.30])),
                HazeProfile::new("severe", [0.20, 0.30], Scalar([1.35, 1.50])),
                HazeProfile::new(
                    "yellow",
                    [0.30, 0.50],
                    PerChannel([[0.85, 0.75, 0.40], [0.95, 0.85, 0.50]]),
                ),
                HazeProfile::new(
                    "gray",
                    [0.30, 0.50],
                    PerChannel([[0.6, 0.6, 0.6], [0.9, 0.9, 0.9]]),
                ),
                HazeProfile::new(NIGHT_PROFILE, [0.45, 0.65], Scalar([1.10, 1.20])),
            ],
        }
    }
}

impl TryFrom<Vec<HazeProfile>> for ProfileTable {
    type Error = HazeError;

    fn try_from(profiles: Vec<HazeProfile>) -> Result<Self, Self::Error> {
        Self::new(profiles)
    }
}

impl From<ProfileTable> for Vec<HazeProfile> {
    fn from(table: ProfileTable) -> Self {
        table.profiles
    }
}

impl ProfileTable {
    /// Build a table, rejecting malformed ranges and duplicate names.
    pub fn new(profiles: Vec<HazeProfile>) -> Result<Self, HazeError> {
        if profiles.is_empty() {
            return Err(HazeError::InvalidProfile("profile table is empty".into()));
        }

        let mut seen = HashSet::new();
        for profile in &profiles {
            profile.validate()?;
            if !seen.insert(profile.name.as_str()) {
                return Err(HazeError::InvalidProfile(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }

        Ok(Self { profiles })
    }

    pub fn from_json_str(json: &str) -> Result<Self, HazeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a table from a JSON array of profiles.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HazeError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| {
            HazeError::Io(shared::image_proc::ImageIoError::Io {
                path: path.to_path_buf(),
                source,
            })
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, HazeError> {
        Ok(serde_json::to_string_pretty(&self.profiles)?)
    }

    pub fn get(&self, name: &str) -> Option<&HazeProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Look up a profile, failing with `UnknownProfile`.
    pub fn require(&self, name: &str) -> Result<&HazeProfile, HazeError> {
        self.get(name)
            .ok_or_else(|| HazeError::UnknownProfile(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HazeProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// How the depth pattern of a sample is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternChoice {
    /// Uniformly from [`DepthPattern::ALL`]
    #[default]
    Random,
    Fixed(DepthPattern),
}

/// One concrete draw of physical haze parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazeParameters {
    /// Transmission the haze reaches at depth 1
    pub transmission_target: f64,
    /// Extinction coefficient, full precision
    pub beta: f64,
    pub light: AtmosphericLight,
    /// Factor applied to the normalized depth map
    pub depth_scale: f64,
    pub pattern: DepthPattern,
}

/// Rounded, serializable view of [`HazeParameters`] for logs and manifests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterLabel {
    pub profile: String,
    pub beta: f64,
    pub transmission_target: f64,
    pub atmospheric_light: AtmosphericLight,
    pub depth_scale: f64,
    pub pattern: DepthPattern,
}

impl HazeParameters {
    /// `beta` rounded to [`LABEL_DIGITS`] decimals. Not for compositing.
    pub fn beta_rounded(&self) -> f64 {
        round_to(self.beta, LABEL_DIGITS)
    }

    pub fn label(&self, profile: &str) -> ParameterLabel {
        ParameterLabel {
            profile: profile.to_string(),
            beta: self.beta_rounded(),
            transmission_target: round_to(self.transmission_target, LABEL_DIGITS),
            atmospheric_light: self.light.rounded(LABEL_DIGITS),
            depth_scale: round_to(self.depth_scale, LABEL_DIGITS),
            pattern: self.pattern,
        }
    }
}

/// Sample parameters for the profile called `profile_name`.
///
/// # Errors
/// * `UnknownProfile` - no profile of that name in `table`
/// * `InvalidParameter` - `depth_scale` outside `(0, 1]`
pub fn sample<R: Rng + ?Sized>(
    profile_name: &str,
    table: &ProfileTable,
    pattern: PatternChoice,
    depth_scale: f64,
    rng: &mut R,
) -> Result<HazeParameters, HazeError> {
    let profile = table.require(profile_name)?;
    validate_depth_scale(depth_scale)?;
    Ok(sample_profile(profile, pattern, depth_scale, rng))
}

/// Sample parameters from an already validated profile.
///
/// Draw order is fixed (transmission, light, pattern) so a seeded RNG
/// reproduces the same parameters.
pub fn sample_profile<R: Rng + ?Sized>(
    profile: &HazeProfile,
    pattern: PatternChoice,
    depth_scale: f64,
    rng: &mut R,
) -> HazeParameters {
    let [t_min, t_max] = profile.transmission;
    let transmission_target = draw(t_min, t_max, rng);
    let beta = -transmission_target.ln();
    let light = profile.light.sample(rng);
    let pattern = match pattern {
        PatternChoice::Fixed(p) => p,
        PatternChoice::Random => *DepthPattern::ALL
            .choose(rng)
            .unwrap_or(&DepthPattern::Uniform),
    };

    HazeParameters {
        transmission_target,
        beta,
        light,
        depth_scale,
        pattern,
    }
}

fn draw<R: Rng + ?Sized>(lo: f64, hi: f64, rng: &mut R) -> f64 {
    if lo >= hi {
        return lo;
    }
    Uniform::new_inclusive(lo, hi).sample(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_table_contents() {
        let table = ProfileTable::default();
        assert_eq!(
            table.names(),
            vec!["light", "medium", "heavy", "severe", "yellow", "gray", "night"]
        );

        let severe = table.get("severe").unwrap();
        assert_eq!(severe.transmission, [0.20, 0.30]);
        assert_eq!(severe.light, LightRange::Scalar([1.35, 1.50]));

        let night: Vec<&str> = table
            .iter()
            .filter(|p| p.applies_night())
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(night, vec!["night"]);
    }

    #[test]
    fn test_samples_stay_in_range() {
        let table = ProfileTable::default();
        let mut rng = StdRng::seed_from_u64(2024);

        for profile in table.iter() {
            for _ in 0..200 {
                let params = sample_profile(profile, PatternChoice::Random, 1.0, &mut rng);
                let [t_min, t_max] = profile.transmission;

                assert!(params.transmission_target >= t_min);
                assert!(params.transmission_target <= t_max);
                assert_relative_eq!(params.beta, -params.transmission_target.ln());
                assert!(params.beta > 0.0);

                match (profile.light, params.light) {
                    (LightRange::Scalar([lo, hi]), AtmosphericLight::Scalar(a)) => {
                        assert!(a >= lo && a <= hi);
                    }
                    (LightRange::PerChannel([lo, hi]), AtmosphericLight::PerChannel(rgb)) => {
                        for c in 0..3 {
                            assert!(rgb[c] >= lo[c] && rgb[c] <= hi[c]);
                        }
                    }
                    (range, light) => panic!("light {light:?} does not match range {range:?}"),
                }
            }
        }
    }

    #[test]
    fn test_random_pattern_covers_all() {
        let profile = ProfileTable::default().get("light").unwrap().clone();
        let mut rng = StdRng::seed_from_u64(8);
        let seen: HashSet<DepthPattern> = (0..200)
            .map(|_| sample_profile(&profile, PatternChoice::Random, 1.0, &mut rng).pattern)
            .collect();
        assert_eq!(seen.len(), DepthPattern::ALL.len());
    }

    #[test]
    fn test_fixed_pattern_and_seed_reproducible() {
        let table = ProfileTable::default();
        let choice = PatternChoice::Fixed(DepthPattern::Center);
        let a = sample("yellow", &table, choice, 0.8, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = sample("yellow", &table, choice, 0.8, &mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.pattern, DepthPattern::Center);
        assert_eq!(a.depth_scale, 0.8);
    }

    #[test]
    fn test_degenerate_range_returns_bound() {
        let profile = HazeProfile::new("fixed", [0.25, 0.25], LightRange::Scalar([1.4, 1.4]));
        let params = sample_profile(
            &profile,
            PatternChoice::Random,
            1.0,
            &mut StdRng::seed_from_u64(0),
        );

        assert_eq!(params.transmission_target, 0.25);
        assert_relative_eq!(params.beta, 4.0_f64.ln(), epsilon = 1e-15);
        assert_eq!(params.beta_rounded(), 1.386);
        assert_eq!(params.light, AtmosphericLight::Scalar(1.4));
    }

    #[test]
    fn test_label_rounds_but_parameters_do_not() {
        let params = HazeParameters {
            transmission_target: 0.333333,
            beta: -(0.333333_f64).ln(),
            light: AtmosphericLight::Scalar(1.123456),
            depth_scale: 1.0,
            pattern: DepthPattern::Random,
        };
        let label = params.label("medium");

        assert_eq!(label.beta, 1.099);
        assert_eq!(label.transmission_target, 0.333);
        assert_eq!(label.atmospheric_light, AtmosphericLight::Scalar(1.123));
        assert!(params.beta != label.beta);
    }

    #[test]
    fn test_unknown_profile_and_bad_scale() {
        let table = ProfileTable::default();
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            sample("fog", &table, PatternChoice::Random, 1.0, &mut rng),
            Err(HazeError::UnknownProfile(name)) if name == "fog"
        ));
        assert!(matches!(
            sample("light", &table, PatternChoice::Random, 0.0, &mut rng),
            Err(HazeError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_table_validation() {
        let ok = HazeProfile::new("a", [0.2, 0.3], LightRange::Scalar([1.0, 1.1]));

        assert!(ProfileTable::new(vec![]).is_err());
        assert!(ProfileTable::new(vec![ok.clone(), ok.clone()]).is_err());
        for transmission in [[0.0, 0.5], [0.6, 0.5], [0.5, 1.0]] {
            let bad = HazeProfile::new("b", transmission, LightRange::Scalar([1.0, 1.1]));
            assert!(matches!(
                ProfileTable::new(vec![bad]),
                Err(HazeError::InvalidProfile(_))
            ));
        }
        let bad_light = HazeProfile::new(
            "c",
            [0.2, 0.3],
            LightRange::PerChannel([[0.5, 0.9, 0.5], [0.6, 0.8, 0.6]]),
        );
        assert!(ProfileTable::new(vec![bad_light]).is_err());
    }

    #[test]
    fn test_json_roundtrip_and_validation() {
        let table = ProfileTable::default();
        let json = table.to_json_pretty().unwrap();
        assert_eq!(ProfileTable::from_json_str(&json).unwrap(), table);

        let custom = r#"[
            {"name": "dusk", "transmission": [0.4, 0.5], "light": {"scalar": [0.9, 1.0]}, "night": true},
            {"name": "smog", "transmission": [0.3, 0.4],
             "light": {"per_channel": [[0.7, 0.6, 0.5], [0.8, 0.7, 0.6]]}}
        ]"#;
        let parsed = ProfileTable::from_json_str(custom).unwrap();
        assert!(parsed.get("dusk").unwrap().applies_night());
        assert!(!parsed.get("smog").unwrap().applies_night());

        let invalid = r#"[{"name": "x", "transmission": [0.9, 0.1], "light": {"scalar": [1.0, 1.0]}}]"#;
        assert!(ProfileTable::from_json_str(invalid).is_err());
    }
}
