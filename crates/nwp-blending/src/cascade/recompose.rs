use ndarray::{Array2, Array3, ArrayView1, ArrayView3, Axis};

use crate::decomposition::Recomposer;
use crate::error::{BlendingError, Result};
use crate::types::Domain;

/// De-normalize `levels` (shape (L, H, W)) with their per-level statistics
/// and recompose them into one (H, W) field.
///
/// Level `k` becomes `levels[k] * stds[k] + means[k]` before the recomposer
/// sums the bands.
pub fn recompose_cascade<R: Recomposer>(
    levels: ArrayView3<'_, f32>,
    means: ArrayView1<'_, f32>,
    stds: ArrayView1<'_, f32>,
    domain: Domain,
    recomposer: &R,
) -> Result<Array2<f32>> {
    let num_levels = levels.len_of(Axis(0));
    if means.len() != num_levels || stds.len() != num_levels {
        return Err(BlendingError::shape_mismatch(format!(
            "{} levels but {} means and {} stds",
            num_levels,
            means.len(),
            stds.len()
        )));
    }

    let mut denormalized: Array3<f32> = levels.to_owned();
    for ((mut level, &mean), &std) in denormalized
        .outer_iter_mut()
        .zip(means.iter())
        .zip(stds.iter())
    {
        level.mapv_inplace(|x| x * std + mean);
    }

    recomposer.recompose(denormalized.view(), domain, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::{Decomposer, DecompositionOptions, FftFilterBank};
    use ndarray::{array, Array1};
    use test_utils::{assert_approx_eq, assert_arrays_approx_eq, create_precipitation_field};

    #[test]
    fn test_denormalizes_before_summing() {
        let levels = array![[[1.0_f32, -1.0]], [[0.5, 0.0]]];
        let means = array![10.0_f32, 1.0];
        let stds = array![2.0_f32, 4.0];
        let field = recompose_cascade(
            levels.view(),
            means.view(),
            stds.view(),
            Domain::Spatial,
            &FftFilterBank::default(),
        )
        .unwrap();
        assert_eq!(field.shape(), &[1, 2]);
        assert_approx_eq!(field[[0, 0]], 12.0 + 3.0, 1e-6);
        assert_approx_eq!(field[[0, 1]], 8.0 + 1.0, 1e-6);
    }

    #[test]
    fn test_round_trip_reproduces_field() {
        let field = create_precipitation_field(48, 40, 0.0);
        let bank = FftFilterBank::default();
        let decomposition = bank
            .decompose(field.view(), 6, &DecompositionOptions::default())
            .unwrap();

        let recomposed = recompose_cascade(
            decomposition.levels.view(),
            decomposition.means.view(),
            decomposition.stds.view(),
            Domain::Spatial,
            &bank,
        )
        .unwrap();
        assert_arrays_approx_eq!(recomposed, field, 1e-3);
    }

    #[test]
    fn test_statistics_length_mismatch() {
        let levels = Array3::<f32>::zeros((3, 2, 2));
        let short = Array1::<f32>::zeros(2);
        let ok = Array1::<f32>::ones(3);
        let result = recompose_cascade(
            levels.view(),
            short.view(),
            ok.view(),
            Domain::Spatial,
            &FftFilterBank::default(),
        );
        assert!(matches!(result, Err(BlendingError::ShapeMismatch(_))));
    }

    #[test]
    fn test_recomposer_rejection_surfaces() {
        let levels = Array3::<f32>::zeros((2, 2, 2));
        let stats = Array1::<f32>::ones(2);
        let result = recompose_cascade(
            levels.view(),
            stats.view(),
            stats.view(),
            Domain::Spectral,
            &FftFilterBank::default(),
        );
        assert!(matches!(result, Err(BlendingError::Recomposition(_))));
    }
}
