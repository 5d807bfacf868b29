//! Estimates and persists the motion fields of an NWP run.

use ndarray::{s, Array4, ArrayView3, Axis};
use rayon::prelude::*;
use tracing::info;

use super::metadata::{MotionArtifactMetadata, FORMAT_VERSION};
use super::{with_worker_pool, zarr_io, StoredArtifact};
use crate::config::StoreConfig;
use crate::error::{BlendingError, Result};
use crate::motion::MotionEstimator;
use crate::naming::{ArtifactNaming, TimestampNaming};
use crate::types::{ArtifactKey, MotionSequence};

/// Writes one motion artifact per NWP run.
pub struct MotionStore<M, N = TimestampNaming> {
    estimator: M,
    naming: N,
    config: StoreConfig,
}

impl<M: MotionEstimator> MotionStore<M> {
    /// Create a store using the default artifact naming.
    pub fn new(estimator: M, config: StoreConfig) -> Self {
        Self::with_naming(estimator, TimestampNaming, config)
    }
}

impl<M: MotionEstimator, N: ArtifactNaming> MotionStore<M, N> {
    /// Create a store with a custom naming strategy.
    pub fn with_naming(estimator: M, naming: N, config: StoreConfig) -> Self {
        Self {
            estimator,
            naming,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Estimate one motion field per lead time of `fields` (shape (T, H, W)).
    ///
    /// Index `i > 0` is estimated from the window ending at field `i`; index 0
    /// has no predecessor and repeats index 1, so the result stays aligned
    /// with the fields.
    pub fn compute_motion(&self, fields: ArrayView3<'_, f32>) -> Result<MotionSequence> {
        let (count, height, width) = fields.dim();
        if count < 2 {
            return Err(BlendingError::invalid_input(format!(
                "motion needs at least two fields, got {}",
                count
            )));
        }
        let window = self.estimator.window_size().max(2);
        let expected = [2, height, width];

        let estimates = with_worker_pool(self.config.num_workers, || {
            (1..count)
                .into_par_iter()
                .map(|i| {
                    let start = (i + 1).saturating_sub(window);
                    let flow = self.estimator.estimate(fields.slice(s![start..=i, .., ..]))?;
                    if flow.shape() != expected {
                        return Err(BlendingError::motion_estimation(format!(
                            "estimate for index {} has shape {:?}, expected {:?}",
                            i,
                            flow.shape(),
                            expected
                        )));
                    }
                    Ok(flow)
                })
                .collect::<Result<Vec<_>>>()
        })??;

        let mut sequence = Array4::<f32>::zeros((count, 2, height, width));
        sequence.index_axis_mut(Axis(0), 0).assign(&estimates[0]);
        for (i, flow) in estimates.iter().enumerate() {
            sequence.index_axis_mut(Axis(0), i + 1).assign(flow);
        }
        Ok(sequence)
    }

    /// Estimate the run's motion and persist it as a single artifact keyed by
    /// the analysis time.
    pub fn store_motion(
        &self,
        fields: ArrayView3<'_, f32>,
        key: &ArtifactKey,
    ) -> Result<StoredArtifact> {
        self.config.validate().map_err(BlendingError::Config)?;

        let sequence = self.compute_motion(fields)?;
        let (count, _, height, width) = sequence.dim();

        let metadata = MotionArtifactMetadata {
            format_version: FORMAT_VERSION,
            model: key.model_name.clone(),
            analysis_time: key.analysis_time,
            num_fields: count,
        };
        let attributes = metadata.to_attributes()?;
        let data: Vec<f32> = sequence.iter().copied().collect();
        let shape = [count as u64, 2, height as u64, width as u64];
        let chunk_shape = [1, 2, height.max(1) as u64, width.max(1) as u64];

        let name = self.naming.motion_name(key);
        let mut bytes_written = 0;
        let path = zarr_io::write_atomically(&self.config.output_path, &name, |staging| {
            bytes_written =
                zarr_io::write_array(staging, &shape, &chunk_shape, &data, attributes, &self.config)?;
            Ok(())
        })?;

        info!(
            model = %key.model_name,
            analysis_time = %key.analysis_time,
            fields = count,
            path = %path.display(),
            bytes = bytes_written,
            "Stored motion fields"
        );

        Ok(StoredArtifact {
            path,
            entries: count,
            bytes_written,
        })
    }
}
