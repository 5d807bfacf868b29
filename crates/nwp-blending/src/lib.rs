//! NWP Cascade Storage and Blending
//!
//! This crate stores the scale decompositions and motion fields of numerical
//! weather prediction (NWP) runs so that a nowcasting system can blend them
//! with radar extrapolation at any later issue time. It provides:
//!
//! - **One-pass ingestion**: every lead time of a run is decomposed once and
//!   written to a single Zarr V3 artifact keyed by model and analysis time
//! - **Aligned motion**: one motion field per lead time, stored alongside
//! - **Time-window loads**: partial reads of exactly the records a nowcast
//!   issued at some valid time needs
//! - **Cascade algebra**: stacking, weighted blending and recomposition
//!
//! # Architecture
//!
//! ```text
//! NWP run (T, H, W)
//!      │
//!      ├─► DecompositionStore::store_decomposition
//!      │         │
//!      │         ├─► Decomposer per lead time (rayon)
//!      │         └─► cascade_<model>_<YYYYMMDDHHMMSS>.zarr   (T, L, H, W)
//!      │
//!      └─► MotionStore::store_motion
//!                │
//!                ├─► MotionEstimator per index window (rayon)
//!                └─► motion_<model>_<YYYYMMDDHHMMSS>.zarr    (T, 2, H, W)
//!
//! Nowcast issue time
//!      │
//!      ▼
//! load_window(start_time, n_timesteps)
//!      │
//!      ├─► stack_cascades ──► blend_cascades ──► recompose_cascade
//!      │
//!      └─► blend_optical_flows
//! ```
//!
//! # Example
//!
//! ```ignore
//! use nwp_blending::{
//!     ArtifactKey, ArtifactLoader, DecompositionOptions, DecompositionStore,
//!     FftFilterBank, LeadTimes, StoreConfig,
//! };
//!
//! let config = StoreConfig::from_env();
//! let key = ArtifactKey::new("icon", analysis_time)?;
//! let store = DecompositionStore::new(
//!     FftFilterBank::default(),
//!     8,
//!     DecompositionOptions::default(),
//!     config.clone(),
//! );
//! store.store_decomposition(fields.view(), &key, &LeadTimes::regular(5, 13)?)?;
//!
//! let window = ArtifactLoader::new(&config.output_path).load_window(&key, issue_time, 3)?;
//! ```

pub mod cascade;
pub mod config;
pub mod decomposition;
pub mod error;
pub mod motion;
pub mod naming;
pub mod storage;
pub mod types;

// Re-export commonly used types at crate root
pub use cascade::{
    blend_cascades, blend_optical_flows, check_no_rain, recompose_cascade, stack_cascades,
    StackedCascades,
};
pub use config::{StoreConfig, ZarrCompression};
pub use decomposition::{
    Decomposer, Decomposition, DecompositionOptions, FftFilterBank, Recomposer,
};
pub use error::{BlendingError, Result};
pub use motion::{LucasKanade, MotionEstimator};
pub use naming::{ArtifactNaming, TimestampNaming};
pub use storage::{
    load_window, read_cascade_metadata, read_motion_metadata, ArtifactLoader,
    CascadeArtifactMetadata, DecompositionStore, LoadedWindow, MotionArtifactMetadata,
    MotionStore, StoredArtifact,
};
pub use storage::zarr_io::{read_field_stack, write_field_stack};
pub use types::{ArtifactKey, CascadeRecord, Domain, LeadTimes, MotionSequence};
