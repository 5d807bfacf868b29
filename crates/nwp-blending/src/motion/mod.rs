//! Motion (optical-flow) estimation capability.

mod lucas_kanade;

pub use lucas_kanade::LucasKanade;

use ndarray::{Array3, ArrayView3};

use crate::error::Result;

/// Estimates a (2, H, W) displacement field from a short window of fields.
///
/// Channel 0 is the column (x) displacement, channel 1 the row (y)
/// displacement, both in grid cells per step.
pub trait MotionEstimator: Send + Sync {
    /// Number of consecutive fields consumed per estimate.
    fn window_size(&self) -> usize {
        2
    }

    /// Estimate motion for the last field of `window` (shape (K, H, W), oldest
    /// first). Windows at the start of a sequence may hold fewer than
    /// [`window_size`](Self::window_size) fields, but never fewer than two.
    fn estimate(&self, window: ArrayView3<'_, f32>) -> Result<Array3<f32>>;
}

impl<M: MotionEstimator + ?Sized> MotionEstimator for &M {
    fn window_size(&self) -> usize {
        (**self).window_size()
    }

    fn estimate(&self, window: ArrayView3<'_, f32>) -> Result<Array3<f32>> {
        (**self).estimate(window)
    }
}
