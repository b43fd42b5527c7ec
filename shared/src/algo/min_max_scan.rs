//! MinMaxScan - range scanning for floating point grids
//!
//! Computes the minimum and maximum of a sequence of floating point values,
//! refusing to produce a range when a NaN is present. The scan backs
//! [`normalize_unit_range`], which rescales any ndarray field onto `[0, 1]`
//! and treats a constant field as a defined degenerate case instead of
//! dividing by zero.

use ndarray::{Array, ArrayBase, Data, Dimension};
use num_traits::float::Float;
use thiserror::Error;

/// Error types for MinMaxScan operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MinMaxError {
    #[error("NaN value encountered at index {0}")]
    NaNEncountered(usize),
    #[error("No data provided (empty input)")]
    NoData,
}

/// Minimum and maximum of a NaN-free, non-empty sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScan<T: Float> {
    min: T,
    max: T,
}

impl<T: Float> MinMaxScan<T> {
    /// Scan a sequence of values for its range.
    ///
    /// # Errors
    /// * `MinMaxError::NaNEncountered(index)` - first NaN position in iteration order
    /// * `MinMaxError::NoData` - the sequence was empty
    ///
    /// # Example
    /// ```
    /// use shared::algo::MinMaxScan;
    ///
    /// let scan = MinMaxScan::scan([3.0, 1.0, 4.0].iter()).unwrap();
    /// assert_eq!(scan.min(), 1.0);
    /// assert_eq!(scan.max(), 4.0);
    /// ```
    pub fn scan<'a, I>(values: I) -> Result<Self, MinMaxError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut bounds: Option<(T, T)> = None;

        for (index, &value) in values.into_iter().enumerate() {
            if value.is_nan() {
                return Err(MinMaxError::NaNEncountered(index));
            }
            bounds = Some(match bounds {
                None => (value, value),
                Some((lo, hi)) => (lo.min(value), hi.max(value)),
            });
        }

        let (min, max) = bounds.ok_or(MinMaxError::NoData)?;
        Ok(Self { min, max })
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    /// Width of the scanned range (`max - min`)
    pub fn span(&self) -> T {
        self.max - self.min
    }

    /// True when the range is too narrow to divide by.
    ///
    /// The threshold is relative to the magnitude of the values so that a
    /// field sitting at a large constant offset is still recognised.
    pub fn is_degenerate(&self) -> bool {
        let scale = self.max.abs().max(self.min.abs()).max(T::one());
        self.span() <= T::epsilon() * scale
    }
}

/// Rescale a field so its minimum maps to 0 and its maximum to 1.
///
/// A constant field (see [`MinMaxScan::is_degenerate`]) becomes all zeros.
/// The output is clamped to `[0, 1]` so rounding never leaves the unit range.
///
/// # Errors
/// Propagates `MinMaxError` when the field is empty or contains NaN.
pub fn normalize_unit_range<S, D>(field: &ArrayBase<S, D>) -> Result<Array<f64, D>, MinMaxError>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let scan = MinMaxScan::scan(field.iter())?;

    if scan.is_degenerate() {
        log::debug!(
            "Constant field at {:.6} cannot be normalized, emitting zeros",
            scan.min()
        );
        return Ok(Array::zeros(field.raw_dim()));
    }

    let min = scan.min();
    let span = scan.span();
    Ok(field.mapv(|value| ((value - min) / span).clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_basic_min_max_f64() {
        let scan = MinMaxScan::<f64>::scan([3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0].iter()).unwrap();

        assert_eq!(scan.min(), 1.0);
        assert_eq!(scan.max(), 9.0);
        assert_eq!(scan.span(), 8.0);
    }

    #[test]
    fn test_basic_min_max_f32() {
        let scan = MinMaxScan::<f32>::scan([3.0, -1.0, 4.0].iter()).unwrap();

        assert_eq!(scan.min(), -1.0);
        assert_eq!(scan.max(), 4.0);
    }

    #[test]
    fn test_nan_reports_first_index() {
        let result = MinMaxScan::<f64>::scan([1.0, 2.0, f64::NAN, 3.0, f64::NAN].iter());
        assert_eq!(result, Err(MinMaxError::NaNEncountered(2)));
    }

    #[test]
    fn test_empty_input() {
        let empty: [f64; 0] = [];
        assert_eq!(MinMaxScan::scan(empty.iter()), Err(MinMaxError::NoData));
    }

    #[test]
    fn test_normalize_hits_both_ends() {
        let field = array![[2.0, 4.0], [6.0, 10.0]];
        let normalized = normalize_unit_range(&field).unwrap();

        assert_eq!(normalized[[0, 0]], 0.0);
        assert_eq!(normalized[[1, 1]], 1.0);
        assert!((normalized[[0, 1]] - 0.25).abs() < 1e-12);
        assert!((normalized[[1, 0]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_constant_field_is_zero() {
        let field = Array2::from_elem((5, 7), 0.5);
        let normalized = normalize_unit_range(&field).unwrap();

        assert_eq!(normalized.dim(), (5, 7));
        assert!(normalized.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_normalize_large_offset_constant_field() {
        let field = Array2::from_elem((3, 3), 1.0e9);
        let normalized = normalize_unit_range(&field).unwrap();
        assert!(normalized.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_normalize_rejects_nan() {
        let field = array![[0.0, f64::NAN]];
        assert!(normalize_unit_range(&field).is_err());
    }
}
