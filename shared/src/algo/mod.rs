//! Numeric helpers used by the image processing routines
//!
//! - **min_max_scan**: NaN-aware range scanning and unit-range normalization
//! - **parallel**: rayon helpers that hand every task its own seeded RNG

pub mod min_max_scan;
pub mod parallel;

pub use min_max_scan::{normalize_unit_range, MinMaxError, MinMaxScan};
pub use parallel::{par_map_seeded, process_array_in_parallel_chunks};
