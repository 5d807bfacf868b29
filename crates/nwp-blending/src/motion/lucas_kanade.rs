//! Dense Lucas-Kanade optical flow.
//!
//! Solves the brightness-constancy least-squares problem over a square
//! window around every pixel, using integral images for the window sums.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

use super::MotionEstimator;
use crate::error::{BlendingError, Result};

/// Default half-width of the least-squares window.
pub const DEFAULT_WINDOW_RADIUS: usize = 7;

/// Determinant threshold, relative to the squared trace of the structure
/// tensor, below which a pixel falls back to the domain-wide solution.
const CONDITION_TOLERANCE: f64 = 1e-6;

/// Dense Lucas-Kanade estimator on the two most recent fields of a window.
#[derive(Debug, Clone, Copy)]
pub struct LucasKanade {
    window_radius: usize,
}

impl Default for LucasKanade {
    fn default() -> Self {
        Self {
            window_radius: DEFAULT_WINDOW_RADIUS,
        }
    }
}

impl LucasKanade {
    /// Create an estimator with the given least-squares window half-width.
    pub fn new(window_radius: usize) -> Self {
        Self { window_radius }
    }

    pub fn window_radius(&self) -> usize {
        self.window_radius
    }
}

/// Summed-area table with a zero row and column in front.
struct Integral {
    table: Array2<f64>,
}

impl Integral {
    fn new(values: &Array2<f64>) -> Self {
        let (h, w) = values.dim();
        let mut table = Array2::<f64>::zeros((h + 1, w + 1));
        for r in 0..h {
            let mut row_sum = 0.0;
            for c in 0..w {
                row_sum += values[[r, c]];
                table[[r + 1, c + 1]] = table[[r, c + 1]] + row_sum;
            }
        }
        Self { table }
    }

    /// Sum over rows `r0..r1` and columns `c0..c1` (exclusive ends).
    fn sum(&self, r0: usize, r1: usize, c0: usize, c1: usize) -> f64 {
        self.table[[r1, c1]] - self.table[[r0, c1]] - self.table[[r1, c0]] + self.table[[r0, c0]]
    }

    fn total(&self) -> f64 {
        let (h, w) = self.table.dim();
        self.table[[h - 1, w - 1]]
    }
}

/// Solve the 2x2 normal equations; `None` when ill-conditioned.
fn solve(sxx: f64, syy: f64, sxy: f64, sxt: f64, syt: f64) -> Option<(f64, f64)> {
    let det = sxx * syy - sxy * sxy;
    let trace = sxx + syy;
    if trace <= 0.0 || det <= CONDITION_TOLERANCE * trace * trace {
        return None;
    }
    let u = (-syy * sxt + sxy * syt) / det;
    let v = (sxy * sxt - sxx * syt) / det;
    Some((u, v))
}

/// Central differences in the interior, one-sided at the borders.
fn gradient(field: &Array2<f64>, axis: Axis) -> Array2<f64> {
    let (h, w) = field.dim();
    let n = if axis == Axis(0) { h } else { w };
    Array2::from_shape_fn((h, w), |(r, c)| {
        let i = if axis == Axis(0) { r } else { c };
        let at = |j: usize| {
            if axis == Axis(0) {
                field[[j, c]]
            } else {
                field[[r, j]]
            }
        };
        if i == 0 {
            at(1) - at(0)
        } else if i == n - 1 {
            at(n - 1) - at(n - 2)
        } else {
            0.5 * (at(i + 1) - at(i - 1))
        }
    })
}

fn to_f64(view: ArrayView2<'_, f32>) -> Array2<f64> {
    view.mapv(|v| v as f64)
}

impl MotionEstimator for LucasKanade {
    fn estimate(&self, window: ArrayView3<'_, f32>) -> Result<Array3<f32>> {
        let (k, h, w) = window.dim();
        if k < 2 {
            return Err(BlendingError::motion_estimation(format!(
                "need at least two fields, got {}",
                k
            )));
        }
        if h < 2 || w < 2 {
            return Err(BlendingError::motion_estimation(format!(
                "grid {}x{} is too small for gradients",
                h, w
            )));
        }
        if window.iter().any(|v| !v.is_finite()) {
            return Err(BlendingError::motion_estimation(
                "fields contain non-finite values",
            ));
        }

        let prev = to_f64(window.index_axis(Axis(0), k - 2));
        let next = to_f64(window.index_axis(Axis(0), k - 1));
        let mean = (&prev + &next) * 0.5;

        let ix = gradient(&mean, Axis(1));
        let iy = gradient(&mean, Axis(0));
        let it = &next - &prev;

        let sxx = Integral::new(&(&ix * &ix));
        let syy = Integral::new(&(&iy * &iy));
        let sxy = Integral::new(&(&ix * &iy));
        let sxt = Integral::new(&(&ix * &it));
        let syt = Integral::new(&(&iy * &it));

        let global = solve(
            sxx.total(),
            syy.total(),
            sxy.total(),
            sxt.total(),
            syt.total(),
        )
        .unwrap_or((0.0, 0.0));

        let radius = self.window_radius;
        let mut flow = Array3::<f32>::zeros((2, h, w));
        for r in 0..h {
            let r0 = r.saturating_sub(radius);
            let r1 = (r + radius + 1).min(h);
            for c in 0..w {
                let c0 = c.saturating_sub(radius);
                let c1 = (c + radius + 1).min(w);
                let (u, v) = solve(
                    sxx.sum(r0, r1, c0, c1),
                    syy.sum(r0, r1, c0, c1),
                    sxy.sum(r0, r1, c0, c1),
                    sxt.sum(r0, r1, c0, c1),
                    syt.sum(r0, r1, c0, c1),
                )
                .unwrap_or(global);
                flow[[0, r, c]] = u as f32;
                flow[[1, r, c]] = v as f32;
            }
        }

        Ok(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, stack};
    use test_utils::create_gaussian_blob;

    #[test]
    fn test_identical_fields_have_no_motion() {
        let blob = create_gaussian_blob(32, 32, 16.0, 16.0, 4.0, 10.0);
        let window = stack![Axis(0), blob, blob];
        let flow = LucasKanade::default().estimate(window.view()).unwrap();
        assert_eq!(flow.shape(), &[2, 32, 32]);
        assert!(flow.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_translation_along_columns() {
        let before = create_gaussian_blob(32, 32, 15.5, 16.0, 4.0, 10.0);
        let after = create_gaussian_blob(32, 32, 16.5, 16.0, 4.0, 10.0);
        let window = stack![Axis(0), before, after];
        let flow = LucasKanade::default().estimate(window.view()).unwrap();

        let core_u = flow.slice(s![0, 12..21, 12..21]);
        let core_v = flow.slice(s![1, 12..21, 12..21]);
        let mean_u = core_u.mean().unwrap();
        let mean_v = core_v.mean().unwrap();
        assert!(mean_u > 0.6 && mean_u < 1.4, "u = {}", mean_u);
        assert!(mean_v.abs() < 0.2, "v = {}", mean_v);
    }

    #[test]
    fn test_uses_last_two_fields_of_window() {
        let a = create_gaussian_blob(24, 24, 8.0, 12.0, 3.0, 5.0);
        let b = create_gaussian_blob(24, 24, 12.0, 12.0, 3.0, 5.0);
        let window = stack![Axis(0), a, b, b];
        let flow = LucasKanade::default().estimate(window.view()).unwrap();
        assert!(flow.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_rejects_short_windows_and_bad_values() {
        let lk = LucasKanade::new(3);
        let single = Array3::<f32>::zeros((1, 8, 8));
        assert!(matches!(
            lk.estimate(single.view()),
            Err(BlendingError::MotionEstimation(_))
        ));

        let mut bad = Array3::<f32>::zeros((2, 8, 8));
        bad[[1, 2, 2]] = f32::INFINITY;
        assert!(lk.estimate(bad.view()).is_err());

        let thin = Array3::<f32>::zeros((2, 1, 8));
        assert!(lk.estimate(thin.view()).is_err());
    }
}
