//! Batch haze synthesizer
//!
//! Reads every image in an input directory, composites each selected haze
//! profile over it and writes the results as JPEG files, one directory per
//! profile, plus a JSON manifest of the sampled parameters.
//!
//! Usage:
//! ```
//! cargo run --release --bin haze_synth -- --input clear/ --output hazy/ [OPTIONS]
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use hazesim::io::DEFAULT_JPEG_QUALITY;
use hazesim::{
    write_manifest, BatchSynthesisPipeline, DepthPattern, DirectorySink, FileImageSource,
    PatternChoice, PipelineConfig, ProfileTable, SamplingPolicy,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::PathBuf;

/// Command-line arguments for haze synthesis
#[derive(Parser, Debug)]
#[clap(author, version, about = "Synthesize hazy variants of clear images")]
struct Args {
    /// Directory of clear input images
    #[clap(short = 'i', long)]
    input: Option<PathBuf>,

    /// Output root; one subdirectory is created per profile
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,

    /// Comma-separated profiles to generate (default: every profile in the table)
    #[clap(short = 'p', long, value_delimiter = ',')]
    profiles: Vec<String>,

    /// JSON profile table replacing the built-in one
    #[clap(long)]
    profile_table: Option<PathBuf>,

    /// Force a depth pattern (uniform, center, random, horizontal); random choice when unset
    #[clap(long)]
    pattern: Option<DepthPattern>,

    /// Factor in (0, 1] applied to generated depth maps
    #[clap(long, default_value = "1.0")]
    depth_scale: f64,

    /// Random seed for reproducibility (optional)
    #[clap(long)]
    seed: Option<u64>,

    /// Resize inputs to WIDTHxHEIGHT before synthesis
    #[clap(long, value_parser = parse_size)]
    size: Option<(u32, u32)>,

    /// When to sample haze parameters: per-batch or per-image
    #[clap(long, default_value = "per-batch")]
    sampling: SamplingPolicy,

    /// JPEG quality (1-100)
    #[clap(short = 'q', long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// Also save each depth map as a grayscale PNG under <output>/depth/<profile>/
    #[clap(long)]
    write_depth: bool,

    /// Print the active profile table as JSON and exit
    #[clap(long)]
    print_profiles: bool,
}

/// Parse a `WIDTHxHEIGHT` size such as `640x480`.
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width: u32 = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let height: u32 = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    if width == 0 || height == 0 {
        return Err(format!("size must be non-zero, got {width}x{height}"));
    }
    Ok((width, height))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let table = match &args.profile_table {
        Some(path) => ProfileTable::load(path)
            .with_context(|| format!("loading profile table {}", path.display()))?,
        None => ProfileTable::default(),
    };

    if args.print_profiles {
        println!("{}", table.to_json_pretty()?);
        return Ok(());
    }

    let (Some(input), Some(output)) = (&args.input, &args.output) else {
        bail!("--input and --output are required unless --print-profiles is given");
    };

    let config = PipelineConfig {
        profiles: args.profiles.clone(),
        sampling: args.sampling,
        pattern: args
            .pattern
            .map(PatternChoice::Fixed)
            .unwrap_or(PatternChoice::Random),
        depth_scale: args.depth_scale,
        seed: args.seed,
        ..PipelineConfig::default()
    };
    let pipeline = BatchSynthesisPipeline::new(&table, config)?;

    let sources = FileImageSource::discover(input, args.size)
        .with_context(|| format!("reading input directory {}", input.display()))?;
    if sources.is_empty() {
        warn!("No images found in {}", input.display());
    }

    let sink = DirectorySink::new(output, args.quality, args.write_depth);
    let profile_names: Vec<&str> = pipeline.profiles().iter().map(|p| p.name.as_str()).collect();
    sink.prepare(&profile_names)
        .with_context(|| format!("creating output directories under {}", output.display()))?;

    let progress_style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
        .progress_chars("█▉▊▋▌▍▎▏ ");
    let pb = ProgressBar::new(sources.len() as u64);
    pb.set_style(progress_style);
    pb.set_message("Hazing");

    let report = pipeline.run_with_progress(&sources, &sink, |_| pb.inc(1));
    pb.finish_with_message("Done");

    let manifest = sink.manifest_path();
    write_manifest(&manifest, &report)
        .with_context(|| format!("writing manifest {}", manifest.display()))?;

    info!(
        "Wrote {} images to {} (seed {}), manifest at {}",
        report.results_written,
        output.display(),
        report.seed,
        manifest.display()
    );
    for skipped in &report.skipped {
        warn!("Skipped {}: {}", skipped.image, skipped.reason);
    }

    Ok(())
}
