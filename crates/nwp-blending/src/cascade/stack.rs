//! Stacking per-time cascade records into dense arrays.

use ndarray::{Array2, Array4, Axis};

use crate::error::{BlendingError, Result};
use crate::types::CascadeRecord;

/// Dense cascades of T records.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedCascades {
    /// Levels, shape (T, L, H, W).
    pub levels: Array4<f32>,
    /// De-normalization means, shape (T, L).
    pub means: Array2<f32>,
    /// De-normalization standard deviations, shape (T, L).
    pub stds: Array2<f32>,
}

/// Stack `records` into (T, L, H, W) levels and (T, L) statistics.
///
/// With `renormalize`, records stored un-normalized are normalized level by
/// level with their own statistics; a level whose std is zero only has its
/// mean removed. The returned statistics are always the records' own.
pub fn stack_cascades(records: &[CascadeRecord], renormalize: bool) -> Result<StackedCascades> {
    let first = records
        .first()
        .ok_or_else(|| BlendingError::shape_mismatch("no cascade records to stack"))?;
    let num_levels = first.num_levels();
    let (height, width) = first.grid_shape();

    for (t, record) in records.iter().enumerate() {
        record.validate()?;
        if record.num_levels() != num_levels || record.grid_shape() != (height, width) {
            return Err(BlendingError::shape_mismatch(format!(
                "record {} has {} levels on a {:?} grid, expected {} levels on {:?}",
                t,
                record.num_levels(),
                record.grid_shape(),
                num_levels,
                (height, width)
            )));
        }
    }

    let count = records.len();
    let mut levels = Array4::<f32>::zeros((count, num_levels, height, width));
    let mut means = Array2::<f32>::zeros((count, num_levels));
    let mut stds = Array2::<f32>::zeros((count, num_levels));

    for (t, record) in records.iter().enumerate() {
        let mut dst = levels.index_axis_mut(Axis(0), t);
        dst.assign(&record.cascade_levels);

        if renormalize && !record.normalized {
            for (k, mut level) in dst.outer_iter_mut().enumerate() {
                let mean = record.means[k];
                let std = record.stds[k];
                if std != 0.0 {
                    level.mapv_inplace(|x| (x - mean) / std);
                } else {
                    level.mapv_inplace(|x| x - mean);
                }
            }
        }

        means.row_mut(t).assign(&record.means);
        stds.row_mut(t).assign(&record.stds);
    }

    Ok(StackedCascades {
        levels,
        means,
        stds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Domain;
    use chrono::{TimeZone, Utc};
    use ndarray::{array, Array1, Array3};

    fn record(levels: Array3<f32>, means: Vec<f32>, stds: Vec<f32>, normalized: bool) -> CascadeRecord {
        CascadeRecord {
            domain: Domain::Spatial,
            normalized,
            compact_output: false,
            valid_times: vec![Utc.with_ymd_and_hms(2021, 7, 4, 12, 0, 0).unwrap()],
            cascade_levels: levels,
            means: Array1::from(means),
            stds: Array1::from(stds),
        }
    }

    #[test]
    fn test_stack_shapes() {
        for (t, l, h, w) in [(1, 1, 1, 1), (4, 8, 6, 5), (2, 3, 10, 1)] {
            let records: Vec<_> = (0..t)
                .map(|_| record(Array3::zeros((l, h, w)), vec![0.0; l], vec![1.0; l], true))
                .collect();
            let stacked = stack_cascades(&records, false).unwrap();
            assert_eq!(stacked.levels.shape(), &[t, l, h, w]);
            assert_eq!(stacked.means.shape(), &[t, l]);
            assert_eq!(stacked.stds.shape(), &[t, l]);
        }
    }

    #[test]
    fn test_stack_without_renormalize_keeps_values() {
        let levels = Array3::from_shape_fn((2, 2, 2), |(k, r, c)| (k * 4 + r * 2 + c) as f32);
        let records = vec![record(levels.clone(), vec![1.0, 2.0], vec![2.0, 4.0], false)];
        let stacked = stack_cascades(&records, false).unwrap();
        assert_eq!(stacked.levels.index_axis(Axis(0), 0), levels);
        assert_eq!(stacked.means.row(0), array![1.0_f32, 2.0]);
    }

    #[test]
    fn test_renormalize_unnormalized_records() {
        let levels = array![[[3.0_f32, 5.0]], [[10.0, 14.0]]];
        let records = vec![record(levels, vec![1.0, 2.0], vec![2.0, 4.0], false)];
        let stacked = stack_cascades(&records, true).unwrap();
        assert_eq!(stacked.levels[[0, 0, 0, 0]], 1.0);
        assert_eq!(stacked.levels[[0, 0, 0, 1]], 2.0);
        assert_eq!(stacked.levels[[0, 1, 0, 0]], 2.0);
        assert_eq!(stacked.levels[[0, 1, 0, 1]], 3.0);
        // Statistics are still the de-normalization keys.
        assert_eq!(stacked.stds.row(0), array![2.0_f32, 4.0]);
    }

    #[test]
    fn test_renormalize_skips_already_normalized() {
        let levels = array![[[3.0_f32, 5.0]]];
        let records = vec![record(levels.clone(), vec![1.0], vec![2.0], true)];
        let stacked = stack_cascades(&records, true).unwrap();
        assert_eq!(stacked.levels.index_axis(Axis(0), 0), levels);
    }

    #[test]
    fn test_zero_std_level_only_removes_mean() {
        let levels = array![[[4.0_f32, 4.0]]];
        let records = vec![record(levels, vec![4.0], vec![0.0], false)];
        let stacked = stack_cascades(&records, true).unwrap();
        assert!(stacked.levels.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_mismatched_records_rejected() {
        let a = record(Array3::zeros((3, 4, 4)), vec![0.0; 3], vec![1.0; 3], true);
        let b = record(Array3::zeros((2, 4, 4)), vec![0.0; 2], vec![1.0; 2], true);
        let c = record(Array3::zeros((3, 4, 5)), vec![0.0; 3], vec![1.0; 3], true);
        assert!(matches!(
            stack_cascades(&[a.clone(), b], false),
            Err(BlendingError::ShapeMismatch(_))
        ));
        assert!(stack_cascades(&[a.clone(), c], false).is_err());

        let mut bad_stats = a;
        bad_stats.means = Array1::zeros(2);
        assert!(stack_cascades(&[bad_stats], false).is_err());
        assert!(stack_cascades(&[], false).is_err());
    }
}
