//! Decomposes an NWP run once per lead time and persists the cascades.

use ndarray::{ArrayView3, Axis};
use rayon::prelude::*;
use tracing::{debug, info};

use super::metadata::{CascadeArtifactMetadata, FORMAT_VERSION};
use super::{with_worker_pool, zarr_io, StoredArtifact};
use crate::config::StoreConfig;
use crate::decomposition::{Decomposer, Decomposition, DecompositionOptions};
use crate::error::{BlendingError, Result};
use crate::naming::{ArtifactNaming, TimestampNaming};
use crate::types::{ArtifactKey, LeadTimes};

/// Writes one decomposition artifact per NWP run.
pub struct DecompositionStore<D, N = TimestampNaming> {
    decomposer: D,
    naming: N,
    num_levels: usize,
    options: DecompositionOptions,
    config: StoreConfig,
}

impl<D: Decomposer> DecompositionStore<D> {
    /// Create a store using the default artifact naming.
    pub fn new(
        decomposer: D,
        num_levels: usize,
        options: DecompositionOptions,
        config: StoreConfig,
    ) -> Self {
        Self::with_naming(decomposer, TimestampNaming, num_levels, options, config)
    }
}

impl<D: Decomposer, N: ArtifactNaming> DecompositionStore<D, N> {
    /// Create a store with a custom naming strategy.
    pub fn with_naming(
        decomposer: D,
        naming: N,
        num_levels: usize,
        options: DecompositionOptions,
        config: StoreConfig,
    ) -> Self {
        Self {
            decomposer,
            naming,
            num_levels,
            options,
            config,
        }
    }

    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    pub fn options(&self) -> &DecompositionOptions {
        &self.options
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Decompose every field of `fields` (shape (T, H, W), one field per lead
    /// time) and persist the run as a single artifact.
    ///
    /// Either the whole run is written or nothing is.
    pub fn store_decomposition(
        &self,
        fields: ArrayView3<'_, f32>,
        key: &ArtifactKey,
        lead_times: &LeadTimes,
    ) -> Result<StoredArtifact> {
        let (count, height, width) = fields.dim();
        if count == 0 {
            return Err(BlendingError::invalid_input("no fields to decompose"));
        }
        if count != lead_times.len() {
            return Err(BlendingError::shape_mismatch(format!(
                "{} fields but {} lead times",
                count,
                lead_times.len()
            )));
        }
        self.config.validate().map_err(BlendingError::Config)?;

        let decompositions = self.decompose_all(fields)?;

        let mut data = Vec::with_capacity(count * self.num_levels * height * width);
        let mut means = Vec::with_capacity(count);
        let mut stds = Vec::with_capacity(count);
        for decomposition in &decompositions {
            data.extend(decomposition.levels.iter().copied());
            means.push(decomposition.means.to_vec());
            stds.push(decomposition.stds.to_vec());
        }

        let metadata = CascadeArtifactMetadata {
            format_version: FORMAT_VERSION,
            model: key.model_name.clone(),
            analysis_time: key.analysis_time,
            valid_times: lead_times.valid_times(key.analysis_time),
            domain: self.options.domain,
            normalized: self.options.normalize,
            compact_output: self.options.compact_output,
            num_levels: self.num_levels,
            means,
            stds,
        };
        let attributes = metadata.to_attributes()?;

        let shape = [
            count as u64,
            self.num_levels as u64,
            height as u64,
            width as u64,
        ];
        let chunk_shape = [1, 1, height.max(1) as u64, width.max(1) as u64];

        let name = self.naming.decomposition_name(key);
        let mut bytes_written = 0;
        let path = zarr_io::write_atomically(&self.config.output_path, &name, |staging| {
            bytes_written =
                zarr_io::write_array(staging, &shape, &chunk_shape, &data, attributes, &self.config)?;
            Ok(())
        })?;

        info!(
            model = %key.model_name,
            analysis_time = %key.analysis_time,
            lead_times = count,
            levels = self.num_levels,
            path = %path.display(),
            bytes = bytes_written,
            "Stored cascade decomposition"
        );

        Ok(StoredArtifact {
            path,
            entries: count,
            bytes_written,
        })
    }

    /// Decompose each field in parallel, returning results in lead-time order.
    fn decompose_all(&self, fields: ArrayView3<'_, f32>) -> Result<Vec<Decomposition>> {
        let (count, height, width) = fields.dim();
        let expected = [self.num_levels, height, width];

        with_worker_pool(self.config.num_workers, || {
            (0..count)
                .into_par_iter()
                .map(|i| {
                    let decomposition = self.decomposer.decompose(
                        fields.index_axis(Axis(0), i),
                        self.num_levels,
                        &self.options,
                    )?;
                    if decomposition.levels.shape() != expected
                        || decomposition.means.len() != self.num_levels
                        || decomposition.stds.len() != self.num_levels
                    {
                        return Err(BlendingError::decomposition(format!(
                            "lead time {} decomposed into levels {:?} with {} means and {} stds, expected {:?}",
                            i,
                            decomposition.levels.shape(),
                            decomposition.means.len(),
                            decomposition.stds.len(),
                            expected
                        )));
                    }
                    if decomposition
                        .means
                        .iter()
                        .chain(decomposition.stds.iter())
                        .any(|v| !v.is_finite())
                    {
                        return Err(BlendingError::decomposition(format!(
                            "lead time {} has non-finite level statistics",
                            i
                        )));
                    }
                    debug!(index = i, "Decomposed lead time");
                    Ok(decomposition)
                })
                .collect::<Result<Vec<_>>>()
        })?
    }
}
