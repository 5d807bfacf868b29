//! Synthetic precipitation and motion test fields.
//!
//! All generators are deterministic and return arrays of shape
//! (height, width), row 0 first.

use ndarray::{Array2, Array3, Axis};

/// Storm cells as (x fraction, y fraction, sigma fraction, peak rate in mm/h).
const STORM_CELLS: [(f32, f32, f32, f32); 3] = [
    (0.30, 0.40, 0.14, 8.0),
    (0.65, 0.60, 0.09, 5.0),
    (0.50, 0.20, 0.05, 3.0),
];

/// Amplitude of the small-scale texture added on top of the storm cells.
const TEXTURE_AMPLITUDE: f32 = 0.5;

/// Creates a precipitation-like field of shape (height, width).
///
/// The field is a few Gaussian storm cells plus deterministic small-scale
/// texture, so it has variance at every scale. `shift` moves the whole
/// pattern `shift` columns to the right (the texture moves in whole pixels).
///
/// # Example
///
/// ```
/// use test_utils::create_precipitation_field;
///
/// let field = create_precipitation_field(32, 24, 0.0);
/// assert_eq!(field.shape(), &[24, 32]);
/// assert!(field.iter().all(|v| *v >= 0.0));
/// ```
pub fn create_precipitation_field(width: usize, height: usize, shift: f32) -> Array2<f32> {
    let scale = width.min(height).max(1) as f32;
    Array2::from_shape_fn((height, width), |(row, col)| {
        let x = col as f32 - shift;
        let y = row as f32;

        let mut value = 0.0;
        for (fx, fy, fs, peak) in STORM_CELLS {
            let dx = x - fx * width as f32;
            let dy = y - fy * height as f32;
            let sigma = fs * scale;
            value += peak * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
        }

        let hash = simple_hash(x.round() as i32 as u32, row as u32, 7);
        value + TEXTURE_AMPLITUDE * (hash % 1000) as f32 / 1000.0
    })
}

/// Creates `count` precipitation fields of shape (count, height, width).
///
/// Field `t` is [`create_precipitation_field`] shifted by
/// `t * shift_per_step` columns, emulating an NWP run advecting eastwards.
pub fn create_precipitation_sequence(
    count: usize,
    width: usize,
    height: usize,
    shift_per_step: f32,
) -> Array3<f32> {
    let mut fields = Array3::<f32>::zeros((count, height, width));
    for (t, mut field) in fields.axis_iter_mut(Axis(0)).enumerate() {
        field.assign(&create_precipitation_field(
            width,
            height,
            t as f32 * shift_per_step,
        ));
    }
    fields
}

/// Creates a single Gaussian blob centred at column `cx`, row `cy`.
pub fn create_gaussian_blob(
    width: usize,
    height: usize,
    cx: f32,
    cy: f32,
    sigma: f32,
    amplitude: f32,
) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(row, col)| {
        let dx = col as f32 - cx;
        let dy = row as f32 - cy;
        amplitude * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
    })
}

/// Creates a sparse, mostly dry precipitation field.
///
/// Roughly a quarter of the pixels carry rain (0 to 50 mm); the rest are 0.
/// Different seeds give different patterns.
pub fn create_sparse_precipitation_field(width: usize, height: usize, seed: u32) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(row, col)| {
        let hash = simple_hash(col as u32, row as u32, seed);
        if hash % 4 == 0 {
            (hash % 5000) as f32 / 100.0
        } else {
            0.0
        }
    })
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precipitation_field_shape_and_range() {
        let field = create_precipitation_field(40, 30, 0.0);
        assert_eq!(field.shape(), &[30, 40]);
        assert!(field.iter().all(|v| v.is_finite() && *v >= 0.0));
        let max = field.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(max > 5.0);
    }

    #[test]
    fn test_integer_shift_translates_field() {
        let base = create_precipitation_field(40, 30, 0.0);
        let shifted = create_precipitation_field(40, 30, 2.0);
        for row in 0..30 {
            for col in 2..40 {
                assert!((shifted[[row, col]] - base[[row, col - 2]]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_sequence_steps() {
        let fields = create_precipitation_sequence(4, 16, 12, 1.0);
        assert_eq!(fields.shape(), &[4, 12, 16]);
        assert_eq!(
            fields.index_axis(Axis(0), 2),
            create_precipitation_field(16, 12, 2.0)
        );
    }

    #[test]
    fn test_gaussian_blob_peak() {
        let blob = create_gaussian_blob(21, 11, 10.0, 5.0, 2.0, 3.0);
        assert_eq!(blob.shape(), &[11, 21]);
        assert_eq!(blob[[5, 10]], 3.0);
        assert!(blob[[0, 0]] < 0.01);
    }

    #[test]
    fn test_sparse_field_deterministic() {
        let a = create_sparse_precipitation_field(100, 100, 42);
        let b = create_sparse_precipitation_field(100, 100, 42);
        assert_eq!(a, b, "Same seed should produce same data");

        let c = create_sparse_precipitation_field(100, 100, 43);
        assert_ne!(a, c, "Different seed should produce different data");
    }
}
