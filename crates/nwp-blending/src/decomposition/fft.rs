//! FFT-based Gaussian band-pass filter bank.
//!
//! Filters are Gaussians in log-wavenumber space with central wavenumbers
//! spaced geometrically between 1 and half the longest grid side. At every
//! wavenumber the weights are normalized to sum to one, so the spatial-domain
//! levels sum back to the input field.

use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use tracing::debug;

use super::{Decomposer, Decomposition, DecompositionOptions, Recomposer};
use crate::error::{BlendingError, Result};
use crate::types::Domain;

/// Default width of each Gaussian filter in log-wavenumber units.
pub const DEFAULT_GAUSS_SCALE: f64 = 0.5;

/// Relative standard deviation below which a level counts as constant.
const ZERO_STD_TOLERANCE: f64 = 1e-9;

/// Gaussian band-pass filter bank evaluated with 2-D FFTs.
#[derive(Debug, Clone, Copy)]
pub struct FftFilterBank {
    gauss_scale: f64,
}

impl Default for FftFilterBank {
    fn default() -> Self {
        Self {
            gauss_scale: DEFAULT_GAUSS_SCALE,
        }
    }
}

impl FftFilterBank {
    /// Create a filter bank with a custom Gaussian width.
    pub fn with_gauss_scale(gauss_scale: f64) -> Result<Self> {
        if !(gauss_scale.is_finite() && gauss_scale > 0.0) {
            return Err(BlendingError::Config(format!(
                "gauss_scale must be positive, got {}",
                gauss_scale
            )));
        }
        Ok(Self { gauss_scale })
    }

    /// Central wavenumbers of the filters, one per level.
    pub fn central_wavenumbers(height: usize, width: usize, num_levels: usize) -> Vec<f64> {
        let max_length = height.max(width) as f64;
        let q = (0.5 * max_length).powf(1.0 / num_levels as f64);
        (1..=num_levels)
            .map(|k| 0.5 * (q.powi(k as i32 - 1) + q.powi(k as i32)))
            .collect()
    }

    /// Normalized filter weights, one (H, W) array per level, laid out like
    /// an unshifted 2-D FFT.
    pub fn filter_weights(&self, height: usize, width: usize, num_levels: usize) -> Vec<Array2<f64>> {
        let max_length = height.max(width) as f64;
        let log_centres: Vec<f64> = Self::central_wavenumbers(height, width, num_levels)
            .into_iter()
            .map(f64::ln)
            .collect();

        let log_radius = Array2::from_shape_fn((height, width), |(row, col)| {
            let ky = fft_frequency(row, height) * max_length;
            let kx = fft_frequency(col, width) * max_length;
            let r = (kx * kx + ky * ky).sqrt();
            if r > 0.0 {
                r.ln()
            } else {
                0.0
            }
        });

        let two_s2 = 2.0 * self.gauss_scale * self.gauss_scale;
        let mut weights: Vec<Array2<f64>> = log_centres
            .iter()
            .map(|&rc| log_radius.mapv(|lr| (-(lr - rc).powi(2) / two_s2).exp()))
            .collect();

        let mut total = Array2::<f64>::zeros((height, width));
        for w in &weights {
            total += w;
        }
        for w in &mut weights {
            *w /= &total;
        }

        weights
    }
}

impl Decomposer for FftFilterBank {
    fn decompose(
        &self,
        field: ArrayView2<'_, f32>,
        num_levels: usize,
        options: &DecompositionOptions,
    ) -> Result<Decomposition> {
        let (height, width) = field.dim();

        if options.domain == Domain::Spectral {
            return Err(BlendingError::decomposition(
                "the FFT filter bank only produces spatial-domain levels",
            ));
        }
        if num_levels == 0 {
            return Err(BlendingError::decomposition("num_levels must be > 0"));
        }
        if num_levels > height.min(width) {
            return Err(BlendingError::decomposition(format!(
                "{} levels do not fit a {}x{} grid",
                num_levels, height, width
            )));
        }
        if field.iter().any(|v| !v.is_finite()) {
            return Err(BlendingError::decomposition(
                "field contains non-finite values",
            ));
        }

        let mut planner = FftPlanner::new();
        let mut spectrum: Vec<Complex<f64>> =
            field.iter().map(|&v| Complex::new(v as f64, 0.0)).collect();
        fft2(&mut planner, &mut spectrum, height, width, false);

        let weights = self.filter_weights(height, width, num_levels);
        let with_stats = options.compute_stats || options.normalize;

        let mut levels = Array3::<f32>::zeros((num_levels, height, width));
        let mut means = Array1::<f32>::zeros(num_levels);
        let mut stds = Array1::<f32>::ones(num_levels);

        for (k, w) in weights.iter().enumerate() {
            let mut band: Vec<Complex<f64>> = spectrum
                .iter()
                .zip(w.iter())
                .map(|(s, w)| *s * *w)
                .collect();
            fft2(&mut planner, &mut band, height, width, true);

            let mut values: Vec<f64> = band.iter().map(|c| c.re).collect();
            if with_stats {
                let (mean, mut std) = mean_std(&values);
                // Round-off on a constant band is not variance.
                if std <= ZERO_STD_TOLERANCE * mean.abs().max(1.0) {
                    std = 0.0;
                }
                if options.normalize {
                    for v in &mut values {
                        *v -= mean;
                        if std > 0.0 {
                            *v /= std;
                        }
                    }
                }
                means[k] = mean as f32;
                stds[k] = std as f32;
            }

            for (dst, src) in levels.index_axis_mut(Axis(0), k).iter_mut().zip(&values) {
                *dst = *src as f32;
            }
        }

        debug!(height, width, num_levels, "Decomposed field");

        Ok(Decomposition {
            levels,
            means,
            stds,
        })
    }
}

impl Recomposer for FftFilterBank {
    fn recompose(
        &self,
        levels: ArrayView3<'_, f32>,
        domain: Domain,
        normalized: bool,
    ) -> Result<Array2<f32>> {
        if domain != Domain::Spatial {
            return Err(BlendingError::recomposition(format!(
                "cannot recompose {} levels with the FFT filter bank",
                domain
            )));
        }
        if normalized {
            return Err(BlendingError::recomposition(
                "levels must be de-normalized before summation",
            ));
        }
        if levels.shape()[0] == 0 {
            return Err(BlendingError::recomposition("no cascade levels to recompose"));
        }
        Ok(levels.sum_axis(Axis(0)))
    }
}

/// Sample frequency of bin `index` in an FFT of length `n`, in cycles per sample.
fn fft_frequency(index: usize, n: usize) -> f64 {
    let signed = if index < (n + 1) / 2 {
        index as f64
    } else {
        index as f64 - n as f64
    };
    signed / n as f64
}

/// In-place 2-D FFT of a row-major (height, width) buffer. The inverse is
/// scaled by `1 / (height * width)`.
fn fft2(
    planner: &mut FftPlanner<f64>,
    data: &mut [Complex<f64>],
    height: usize,
    width: usize,
    inverse: bool,
) {
    let (row_fft, col_fft) = if inverse {
        (planner.plan_fft_inverse(width), planner.plan_fft_inverse(height))
    } else {
        (planner.plan_fft_forward(width), planner.plan_fft_forward(height))
    };

    // rustfft transforms consecutive chunks of the FFT length.
    row_fft.process(data);

    let mut columns = vec![Complex::new(0.0, 0.0); height * width];
    for row in 0..height {
        for col in 0..width {
            columns[col * height + row] = data[row * width + col];
        }
    }
    col_fft.process(&mut columns);
    for row in 0..height {
        for col in 0..width {
            data[row * width + col] = columns[col * height + row];
        }
    }

    if inverse {
        let scale = 1.0 / (height * width) as f64;
        for v in data.iter_mut() {
            *v *= scale;
        }
    }
}

/// Mean and population standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, create_precipitation_field};

    fn spatial(normalize: bool) -> DecompositionOptions {
        DecompositionOptions {
            normalize,
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_weights_sum_to_one() {
        let bank = FftFilterBank::default();
        let weights = bank.filter_weights(24, 32, 6);
        assert_eq!(weights.len(), 6);
        for row in 0..24 {
            for col in 0..32 {
                let total: f64 = weights.iter().map(|w| w[[row, col]]).sum();
                assert_approx_eq!(total, 1.0, 1e-12);
            }
        }
    }

    #[test]
    fn test_central_wavenumbers_ascend() {
        let centres = FftFilterBank::central_wavenumbers(64, 64, 8);
        assert_eq!(centres.len(), 8);
        assert!(centres.windows(2).all(|w| w[0] < w[1]));
        assert!(centres[7] < 32.0);
    }

    #[test]
    fn test_unnormalized_levels_sum_to_field() {
        let field = create_precipitation_field(32, 40, 0.0);
        let bank = FftFilterBank::default();
        let decomp = bank.decompose(field.view(), 8, &spatial(false)).unwrap();
        assert_eq!(decomp.levels.shape(), &[8, 40, 32]);

        let recomposed = bank
            .recompose(decomp.levels.view(), Domain::Spatial, false)
            .unwrap();
        for (a, b) in recomposed.iter().zip(field.iter()) {
            assert_approx_eq!(*a, *b, 1e-3);
        }
    }

    #[test]
    fn test_normalized_levels_are_standardized() {
        let field = create_precipitation_field(32, 32, 3.0);
        let bank = FftFilterBank::default();
        let decomp = bank.decompose(field.view(), 6, &spatial(true)).unwrap();

        for level in decomp.levels.outer_iter() {
            let values: Vec<f64> = level.iter().map(|v| *v as f64).collect();
            let (mean, std) = mean_std(&values);
            assert_approx_eq!(mean, 0.0, 1e-4);
            assert_approx_eq!(std, 1.0, 1e-3);
        }
        assert!(decomp.stds.iter().all(|s| *s > 0.0));
    }

    #[test]
    fn test_constant_field_has_zero_std_levels() {
        let field = Array2::<f32>::from_elem((16, 16), 4.5);
        let bank = FftFilterBank::default();
        let decomp = bank.decompose(field.view(), 4, &spatial(true)).unwrap();

        assert!(decomp.stds.iter().all(|s| *s == 0.0));
        assert!(decomp.levels.iter().all(|v| v.is_finite()));
        let total_mean: f32 = decomp.means.sum();
        assert_approx_eq!(total_mean, 4.5, 1e-4);
    }

    #[test]
    fn test_rejects_invalid_requests() {
        let bank = FftFilterBank::default();
        let small = Array2::<f32>::zeros((4, 4));
        assert!(matches!(
            bank.decompose(small.view(), 8, &spatial(true)),
            Err(BlendingError::Decomposition(_))
        ));
        assert!(bank.decompose(small.view(), 0, &spatial(true)).is_err());

        let mut nan_field = Array2::<f32>::zeros((16, 16));
        nan_field[[3, 3]] = f32::NAN;
        assert!(bank.decompose(nan_field.view(), 2, &spatial(true)).is_err());

        let spectral = DecompositionOptions {
            domain: Domain::Spectral,
            ..Default::default()
        };
        let field = Array2::<f32>::zeros((16, 16));
        assert!(bank.decompose(field.view(), 2, &spectral).is_err());
    }

    #[test]
    fn test_recompose_rejects_domain_and_normalization() {
        let bank = FftFilterBank::default();
        let levels = Array3::<f32>::zeros((3, 8, 8));
        assert!(matches!(
            bank.recompose(levels.view(), Domain::Spectral, false),
            Err(BlendingError::Recomposition(_))
        ));
        assert!(bank.recompose(levels.view(), Domain::Spatial, true).is_err());
        let empty = Array3::<f32>::zeros((0, 8, 8));
        assert!(bank.recompose(empty.view(), Domain::Spatial, false).is_err());
    }

    #[test]
    fn test_gauss_scale_validation() {
        assert!(FftFilterBank::with_gauss_scale(0.25).is_ok());
        assert!(FftFilterBank::with_gauss_scale(0.0).is_err());
        assert!(FftFilterBank::with_gauss_scale(f64::NAN).is_err());
    }
}
