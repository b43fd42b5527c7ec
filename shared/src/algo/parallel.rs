//! Parallel processing utilities for image and array operations
//!
//! Both helpers give every unit of parallel work its own `StdRng`, seeded
//! from a base seed plus the work index. Results therefore depend only on
//! the base seed, never on how rayon schedules the work.

use ndarray::{Array2, ArrayViewMut2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Process an Array2 in parallel row chunks with deterministic seeding
///
/// Each chunk of `chunk_size` rows (64 when `None`) gets an RNG seeded with
/// `seed + chunk_index`.
///
/// # Arguments
/// * `array` - The 2D array to process
/// * `seed` - Base seed for random number generation
/// * `chunk_size` - Optional number of rows per chunk
/// * `processor` - Closure that fills one chunk using its own RNG
///
/// # Returns
/// The processed array
pub fn process_array_in_parallel_chunks<F>(
    mut array: Array2<f64>,
    seed: u64,
    chunk_size: Option<usize>,
    processor: F,
) -> Array2<f64>
where
    F: Fn(&mut ArrayViewMut2<f64>, &mut StdRng) + Send + Sync,
{
    let chunk_size = chunk_size.unwrap_or(64).max(1);

    array
        .axis_chunks_iter_mut(Axis(0), chunk_size)
        .into_par_iter()
        .enumerate()
        .for_each(|(chunk_idx, mut chunk)| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(chunk_idx as u64));
            processor(&mut chunk, &mut rng);
        });

    array
}

/// Map a slice in parallel, handing each item its own seeded RNG.
///
/// Item `i` receives an RNG seeded with `seed + i` together with its index,
/// and the output preserves input order.
///
/// # Example
/// ```
/// use rand::Rng;
/// use shared::algo::par_map_seeded;
///
/// let items = vec![10, 20, 30];
/// let first = par_map_seeded(&items, 7, |_, item, rng| item + rng.gen_range(0..5));
/// let second = par_map_seeded(&items, 7, |_, item, rng| item + rng.gen_range(0..5));
/// assert_eq!(first, second);
/// ```
pub fn par_map_seeded<T, U, F>(items: &[T], seed: u64, worker: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T, &mut StdRng) -> U + Send + Sync,
{
    items
        .par_iter()
        .enumerate()
        .map(|(index, item)| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
            worker(index, item, &mut rng)
        })
        .collect()
}
