//! Persisted NWP artifacts: decomposition and motion stores, and the
//! time-window loader that serves them to nowcast issue times.

mod decomposition_store;
mod loader;
mod metadata;
mod motion_store;
pub mod zarr_io;

pub use decomposition_store::DecompositionStore;
pub use loader::{
    load_window, read_cascade_metadata, read_motion_metadata, ArtifactLoader, LoadedWindow,
};
pub use metadata::{CascadeArtifactMetadata, MotionArtifactMetadata, FORMAT_VERSION};
pub use motion_store::MotionStore;

use std::path::PathBuf;

use crate::error::{BlendingError, Result};

/// Result of persisting one artifact.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    /// Final location of the artifact.
    pub path: PathBuf,
    /// Number of time entries written.
    pub entries: usize,
    /// Payload bytes written (before compression).
    pub bytes_written: u64,
}

/// Run `job` on a dedicated pool of `num_workers` threads, or on the global
/// rayon pool when unset.
pub(crate) fn with_worker_pool<T, F>(num_workers: Option<usize>, job: F) -> Result<T>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    match num_workers {
        Some(workers) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| BlendingError::Config(e.to_string()))?;
            Ok(pool.install(job))
        }
        None => Ok(job()),
    }
}
