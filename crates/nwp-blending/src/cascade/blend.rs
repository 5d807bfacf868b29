//! Weighted blending of cascades and motion fields across sources.
//!
//! Both blends are plain weighted sums. Weights are never renormalized, so a
//! column that does not sum to one rescales the result.

use ndarray::{s, Array3, ArrayView2, ArrayView4, ArrayViewD, Axis};

use crate::error::{BlendingError, Result};

/// Blend S normalized cascades of shape (S, L, H, W) with weights (S, L).
///
/// Level `k` of the result is `sum_s weights[s, k] * cascades_norm[s, k]`.
pub fn blend_cascades(
    cascades_norm: ArrayView4<'_, f32>,
    weights: ArrayView2<'_, f32>,
) -> Result<Array3<f32>> {
    let (sources, levels, height, width) = cascades_norm.dim();
    if weights.dim() != (sources, levels) {
        return Err(BlendingError::shape_mismatch(format!(
            "weights {:?} do not match {} sources of {} levels",
            weights.shape(),
            sources,
            levels
        )));
    }

    let mut blended = Array3::<f32>::zeros((levels, height, width));
    for source in 0..sources {
        for (k, mut level) in blended.outer_iter_mut().enumerate() {
            level.scaled_add(weights[[source, k]], &cascades_norm.slice(s![source, k, .., ..]));
        }
    }
    Ok(blended)
}

/// Blend S motion fields of shape (S, 2, H, W) with one weight per source.
///
/// `weights` has shape (S,) or (S, 1); each weight applies to both vector
/// components over the whole grid.
pub fn blend_optical_flows(
    flows: ArrayView4<'_, f32>,
    weights: ArrayViewD<'_, f32>,
) -> Result<Array3<f32>> {
    let (sources, components, height, width) = flows.dim();
    if components != 2 {
        return Err(BlendingError::shape_mismatch(format!(
            "flows have {} components, expected 2",
            components
        )));
    }
    let per_source: Vec<f32> = match weights.shape() {
        [n] | [n, 1] if *n == sources => weights.iter().copied().collect(),
        other => {
            return Err(BlendingError::shape_mismatch(format!(
                "weights {:?} do not match {} flow sources",
                other, sources
            )))
        }
    };

    let mut blended = Array3::<f32>::zeros((components, height, width));
    for (flow, weight) in flows.axis_iter(Axis(0)).zip(per_source) {
        blended.scaled_add(weight, &flow);
    }
    Ok(blended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, stack, Array2, Array4};
    use test_utils::assert_arrays_approx_eq;

    fn sample_cascades() -> Array4<f32> {
        Array4::from_shape_fn((2, 3, 4, 5), |(s, k, r, c)| {
            (s as f32 + 1.0) * (k * 20 + r * 5 + c) as f32
        })
    }

    #[test]
    fn test_equal_weights_average_cascades() {
        let cascades = sample_cascades();
        let weights = Array2::from_elem((2, 3), 0.5_f32);
        let blended = blend_cascades(cascades.view(), weights.view()).unwrap();

        let mean = (&cascades.index_axis(Axis(0), 0) + &cascades.index_axis(Axis(0), 1)) / 2.0;
        assert_eq!(blended.shape(), &[3, 4, 5]);
        assert_arrays_approx_eq!(blended, mean, 1e-5);
    }

    #[test]
    fn test_per_level_weights_select_sources() {
        let cascades = sample_cascades();
        let weights = array![[1.0_f32, 0.0, 0.25], [0.0, 1.0, 0.75]];
        let blended = blend_cascades(cascades.view(), weights.view()).unwrap();

        assert_eq!(blended.index_axis(Axis(0), 0), cascades.slice(s![0, 0, .., ..]));
        assert_eq!(blended.index_axis(Axis(0), 1), cascades.slice(s![1, 1, .., ..]));
        let expected = &cascades.slice(s![0, 2, .., ..]) * 0.25 + &cascades.slice(s![1, 2, .., ..]) * 0.75;
        assert_arrays_approx_eq!(blended.index_axis(Axis(0), 2), expected, 1e-4);
    }

    #[test]
    fn test_unnormalized_weights_scale() {
        let cascades = sample_cascades();
        let weights = Array2::from_elem((2, 3), 1.0_f32);
        let blended = blend_cascades(cascades.view(), weights.view()).unwrap();
        let sum = &cascades.index_axis(Axis(0), 0) + &cascades.index_axis(Axis(0), 1);
        assert_arrays_approx_eq!(blended, sum, 1e-4);
    }

    #[test]
    fn test_cascade_weight_shape_mismatch() {
        let cascades = sample_cascades();
        let too_many_sources = Array2::from_elem((3, 3), 0.5_f32);
        let too_few_levels = Array2::from_elem((2, 2), 0.5_f32);
        assert!(matches!(
            blend_cascades(cascades.view(), too_many_sources.view()),
            Err(BlendingError::ShapeMismatch(_))
        ));
        assert!(blend_cascades(cascades.view(), too_few_levels.view()).is_err());
    }

    #[test]
    fn test_equal_weights_average_flows() {
        let a = Array3::from_shape_fn((2, 3, 3), |(c, r, col)| (c + r + col) as f32);
        let b = Array3::from_shape_fn((2, 3, 3), |(c, r, col)| (c * r * col) as f32 - 1.0);
        let flows = stack![Axis(0), a, b];

        let weights = array![0.5_f32, 0.5];
        let blended = blend_optical_flows(flows.view(), weights.view().into_dyn()).unwrap();
        let mean = (&a + &b) / 2.0;
        assert_arrays_approx_eq!(blended, mean, 1e-6);

        let column = array![[0.5_f32], [0.5]];
        let from_column = blend_optical_flows(flows.view(), column.view().into_dyn()).unwrap();
        assert_eq!(blended, from_column);
    }

    #[test]
    fn test_flow_weight_shape_mismatch() {
        let flows = Array4::<f32>::zeros((2, 2, 3, 3));
        let three = array![0.2_f32, 0.3, 0.5];
        let matrix = Array2::<f32>::from_elem((2, 2), 0.5);
        assert!(matches!(
            blend_optical_flows(flows.view(), three.view().into_dyn()),
            Err(BlendingError::ShapeMismatch(_))
        ));
        assert!(blend_optical_flows(flows.view(), matrix.view().into_dyn()).is_err());
    }

    #[test]
    fn test_flows_need_two_components() {
        let weights = array![0.5_f32, 0.5];
        for components in [1, 3] {
            let flows = Array4::<f32>::zeros((2, components, 3, 3));
            assert!(matches!(
                blend_optical_flows(flows.view(), weights.view().into_dyn()),
                Err(BlendingError::ShapeMismatch(_))
            ));
        }
    }
}
