//! Random field generation for procedural image synthesis.
//!
//! Provides the noise primitives used to build smooth random surfaces:
//! - i.i.d. uniform noise over a grid
//! - Gaussian-smoothed uniform noise, whose correlation length is set by
//!   the blur sigma
//!
//! Every generator takes the caller's RNG. A single `u64` is drawn from it
//! to seed the parallel row chunks, so the output is reproducible from the
//! caller's RNG state alone and independent of the rayon thread count.

use crate::algo::process_array_in_parallel_chunks;
use crate::image_proc::convolve::{gaussian_blur, EdgeMode};
use ndarray::Array2;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Rows handed to each parallel noise chunk
const NOISE_CHUNK_ROWS: usize = 64;

/// Generate a field of independent samples from `U[0, 1)`.
///
/// # Arguments
/// * `size` - Tuple of (height, width) for the output array
/// * `rng` - Source of the chunk seed; advanced by exactly one `u64`
pub fn uniform_noise_field<R: Rng + ?Sized>(size: (usize, usize), rng: &mut R) -> Array2<f64> {
    let seed = rng.next_u64();
    let unit = Uniform::new(0.0, 1.0);

    process_array_in_parallel_chunks(
        Array2::zeros(size),
        seed,
        Some(NOISE_CHUNK_ROWS),
        |chunk, chunk_rng| {
            chunk
                .iter_mut()
                .for_each(|pixel| *pixel = unit.sample(chunk_rng));
        },
    )
}

/// Generate low-frequency noise: uniform noise blurred with a Gaussian.
///
/// Larger `sigma` yields smoother, larger-scale structure. Edges use
/// reflection so the field has no dark border.
///
/// # Arguments
/// * `size` - Tuple of (height, width) for the output array
/// * `sigma` - Gaussian standard deviation in pixels
/// * `rng` - Caller-owned random number generator
pub fn smoothed_uniform_noise<R: Rng + ?Sized>(
    size: (usize, usize),
    sigma: f64,
    rng: &mut R,
) -> Array2<f64> {
    let noise = uniform_noise_field(size, rng);
    gaussian_blur(&noise, sigma, EdgeMode::Reflect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uniform_noise_statistics() {
        let mut rng = StdRng::seed_from_u64(42);
        let noise = uniform_noise_field((200, 200), &mut rng);

        assert!(noise.iter().all(|&v| (0.0..1.0).contains(&v)));
        assert_relative_eq!(noise.mean().unwrap(), 0.5, epsilon = 0.01);
    }

    #[test]
    fn test_deterministic_output() {
        let a = uniform_noise_field((70, 33), &mut StdRng::seed_from_u64(7));
        let b = uniform_noise_field((70, 33), &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_caller_rng_advances() {
        let mut rng = StdRng::seed_from_u64(3);
        let first = uniform_noise_field((8, 8), &mut rng);
        let second = uniform_noise_field((8, 8), &mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn test_smoothing_reduces_variance() {
        let raw = uniform_noise_field((128, 128), &mut StdRng::seed_from_u64(11));
        let smooth = smoothed_uniform_noise((128, 128), 4.0, &mut StdRng::seed_from_u64(11));

        assert!(smooth.std(0.0) < raw.std(0.0) / 2.0);
        assert_relative_eq!(smooth.mean().unwrap(), raw.mean().unwrap(), epsilon = 0.02);
    }
}
