//! Mapping from artifact keys to storage locations.

use std::path::{Path, PathBuf};

use crate::types::ArtifactKey;

/// Fixed-width, sortable analysis-time stamp used in artifact names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Strategy that names a run's artifacts.
///
/// Returned names are relative to the store's output directory and must be
/// unique per key.
pub trait ArtifactNaming: Send + Sync {
    /// Name of the decomposition artifact for `key`.
    fn decomposition_name(&self, key: &ArtifactKey) -> String;

    /// Name of the motion artifact for `key`.
    fn motion_name(&self, key: &ArtifactKey) -> String;

    /// Full path of the decomposition artifact under `root`.
    fn decomposition_path(&self, root: &Path, key: &ArtifactKey) -> PathBuf {
        root.join(self.decomposition_name(key))
    }

    /// Full path of the motion artifact under `root`.
    fn motion_path(&self, root: &Path, key: &ArtifactKey) -> PathBuf {
        root.join(self.motion_name(key))
    }
}

/// Default naming: `cascade_<model>_<YYYYmmddHHMMSS>.zarr` and
/// `motion_<model>_<YYYYmmddHHMMSS>.zarr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampNaming;

impl TimestampNaming {
    fn stamp(key: &ArtifactKey) -> String {
        key.analysis_time.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl ArtifactNaming for TimestampNaming {
    fn decomposition_name(&self, key: &ArtifactKey) -> String {
        format!("cascade_{}_{}.zarr", key.model_name, Self::stamp(key))
    }

    fn motion_name(&self, key: &ArtifactKey) -> String {
        format!("motion_{}_{}.zarr", key.model_name, Self::stamp(key))
    }
}

impl<N: ArtifactNaming + ?Sized> ArtifactNaming for &N {
    fn decomposition_name(&self, key: &ArtifactKey) -> String {
        (**self).decomposition_name(key)
    }

    fn motion_name(&self, key: &ArtifactKey) -> String {
        (**self).motion_name(key)
    }
}
