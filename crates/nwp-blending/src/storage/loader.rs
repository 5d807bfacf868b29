//! Time-window loader: serves a stored NWP run to a nowcast issue time.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array4};
use tracing::debug;

use super::metadata::{CascadeArtifactMetadata, MotionArtifactMetadata};
use super::zarr_io;
use crate::error::{BlendingError, Result};
use crate::naming::{ArtifactNaming, TimestampNaming};
use crate::types::{ArtifactKey, CascadeRecord, MotionSequence};

/// Time-aligned records and motion fields for one nowcast issue time.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedWindow {
    /// `n_timesteps + 1` records, the first valid at the requested start time.
    pub records: Vec<CascadeRecord>,
    /// Motion fields aligned with `records`, shape (n_timesteps + 1, 2, H, W).
    pub motion: MotionSequence,
}

impl LoadedWindow {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Valid times of the loaded records.
    pub fn valid_times(&self) -> Vec<DateTime<Utc>> {
        self.records.iter().filter_map(|r| r.valid_time()).collect()
    }
}

/// Read only the attributes of a decomposition artifact.
pub fn read_cascade_metadata(path: &Path) -> Result<CascadeArtifactMetadata> {
    let array = zarr_io::open_array(path)?;
    let metadata = CascadeArtifactMetadata::from_attributes(array.attributes())?;
    metadata.validate(array.shape())?;
    Ok(metadata)
}

/// Read only the attributes of a motion artifact.
pub fn read_motion_metadata(path: &Path) -> Result<MotionArtifactMetadata> {
    let array = zarr_io::open_array(path)?;
    let metadata = MotionArtifactMetadata::from_attributes(array.attributes())?;
    metadata.validate(array.shape())?;
    Ok(metadata)
}

/// Load the records valid from `start_time` onwards, `n_timesteps` steps
/// beyond it, together with the matching motion fields.
///
/// The start index is found by exact valid-time match; records are then
/// taken positionally from both artifacts. The artifacts are never modified.
pub fn load_window(
    decomposition_path: &Path,
    motion_path: &Path,
    start_time: DateTime<Utc>,
    n_timesteps: usize,
) -> Result<LoadedWindow> {
    let cascade_array = zarr_io::open_array(decomposition_path)?;
    let metadata = CascadeArtifactMetadata::from_attributes(cascade_array.attributes())?;
    metadata.validate(cascade_array.shape())?;

    let start_index = metadata
        .valid_times
        .iter()
        .position(|t| *t == start_time)
        .ok_or(BlendingError::TimeNotFound {
            requested: start_time,
        })?;

    let available = metadata.len();
    let count = n_timesteps.saturating_add(1);
    let fits = n_timesteps
        .checked_add(1)
        .and_then(|count| start_index.checked_add(count))
        .map_or(false, |end| end <= available);
    if !fits {
        return Err(BlendingError::InsufficientHorizon {
            start_index,
            requested: count,
            available,
        });
    }

    let shape = cascade_array.shape().to_vec();
    let (levels, height, width) = (shape[1] as usize, shape[2] as usize, shape[3] as usize);

    let motion_array = zarr_io::open_array(motion_path)?;
    let motion_metadata = MotionArtifactMetadata::from_attributes(motion_array.attributes())?;
    motion_metadata.validate(motion_array.shape())?;
    let motion_shape = motion_array.shape();
    if motion_metadata.num_fields != available {
        return Err(BlendingError::shape_mismatch(format!(
            "motion artifact holds {} fields but the decomposition holds {} records",
            motion_metadata.num_fields, available
        )));
    }
    if motion_shape[2] as usize != height || motion_shape[3] as usize != width {
        return Err(BlendingError::shape_mismatch(format!(
            "motion grid {}x{} differs from cascade grid {}x{}",
            motion_shape[2], motion_shape[3], height, width
        )));
    }

    let values = zarr_io::read_subset(
        &cascade_array,
        vec![start_index as u64, 0, 0, 0],
        vec![count as u64, shape[1], shape[2], shape[3]],
    )?;
    let cascades = Array4::from_shape_vec((count, levels, height, width), values)?;

    let records = cascades
        .outer_iter()
        .enumerate()
        .map(|(offset, levels_view)| {
            let index = start_index + offset;
            CascadeRecord {
                domain: metadata.domain,
                normalized: metadata.normalized,
                compact_output: metadata.compact_output,
                valid_times: vec![metadata.valid_times[index]],
                cascade_levels: levels_view.to_owned(),
                means: Array1::from(metadata.means[index].clone()),
                stds: Array1::from(metadata.stds[index].clone()),
            }
        })
        .collect();

    let motion_values = zarr_io::read_subset(
        &motion_array,
        vec![start_index as u64, 0, 0, 0],
        vec![count as u64, 2, height as u64, width as u64],
    )?;
    let motion = Array4::from_shape_vec((count, 2, height, width), motion_values)?;

    debug!(
        model = %metadata.model,
        start_time = %start_time,
        start_index,
        records = count,
        "Loaded NWP window"
    );

    Ok(LoadedWindow { records, motion })
}

/// Resolves artifact keys through a naming strategy and loads windows.
#[derive(Debug, Clone)]
pub struct ArtifactLoader<N = TimestampNaming> {
    root: PathBuf,
    naming: N,
}

impl ArtifactLoader {
    /// Loader for artifacts under `root` with the default naming.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_naming(root, TimestampNaming)
    }
}

impl<N: ArtifactNaming> ArtifactLoader<N> {
    pub fn with_naming(root: impl Into<PathBuf>, naming: N) -> Self {
        Self {
            root: root.into(),
            naming,
        }
    }

    /// Decomposition and motion artifact paths of `key`.
    pub fn paths(&self, key: &ArtifactKey) -> (PathBuf, PathBuf) {
        (
            self.naming.decomposition_path(&self.root, key),
            self.naming.motion_path(&self.root, key),
        )
    }

    /// [`load_window`] for the run identified by `key`.
    pub fn load_window(
        &self,
        key: &ArtifactKey,
        start_time: DateTime<Utc>,
        n_timesteps: usize,
    ) -> Result<LoadedWindow> {
        let (decomposition, motion) = self.paths(key);
        load_window(&decomposition, &motion, start_time, n_timesteps)
    }
}
