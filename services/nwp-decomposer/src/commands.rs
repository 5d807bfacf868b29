//! Subcommand implementations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use nwp_blending::{
    load_window, read_field_stack, ArtifactKey, DecompositionOptions, DecompositionStore,
    FftFilterBank, LeadTimes, LoadedWindow, LucasKanade, MotionStore, StoreConfig,
};

/// Parameters of one NWP run ingestion.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub input: PathBuf,
    pub model: String,
    pub analysis_time: DateTime<Utc>,
    pub timestep_minutes: i64,
    pub num_levels: usize,
}

/// Paths of the artifacts written by one ingestion.
#[derive(Debug, Serialize)]
pub struct IngestSummary {
    pub model: String,
    pub analysis_time: DateTime<Utc>,
    pub lead_times: usize,
    pub decomposition: PathBuf,
    pub motion: PathBuf,
}

/// Decompose a (T, H, W) field stack and estimate its motion, writing both
/// artifacts under `config.output_path`.
pub fn ingest(request: &IngestRequest, config: StoreConfig) -> Result<IngestSummary> {
    let (fields, _) = read_field_stack(&request.input)
        .with_context(|| format!("Failed to read field stack {}", request.input.display()))?;
    let count = fields.shape()[0];
    info!(
        input = %request.input.display(),
        lead_times = count,
        height = fields.shape()[1],
        width = fields.shape()[2],
        "Read NWP run"
    );

    let key = ArtifactKey::new(request.model.clone(), request.analysis_time)?;
    let lead_times = LeadTimes::regular(request.timestep_minutes, count)?;

    let decomposition = DecompositionStore::new(
        FftFilterBank::default(),
        request.num_levels,
        DecompositionOptions::default(),
        config.clone(),
    )
    .store_decomposition(fields.view(), &key, &lead_times)
    .context("Failed to store decomposition")?;

    let motion = MotionStore::new(LucasKanade::default(), config)
        .store_motion(fields.view(), &key)
        .context("Failed to store motion fields")?;

    Ok(IngestSummary {
        model: key.model_name,
        analysis_time: key.analysis_time,
        lead_times: count,
        decomposition: decomposition.path,
        motion: motion.path,
    })
}

/// JSON view of a loaded window.
#[derive(Debug, Serialize)]
pub struct WindowSummary {
    pub start_time: DateTime<Utc>,
    pub records: usize,
    pub valid_times: Vec<DateTime<Utc>>,
    pub num_levels: usize,
    pub grid_shape: (usize, usize),
    pub motion_shape: Vec<usize>,
    pub normalized: bool,
    pub domain: String,
}

impl WindowSummary {
    fn from_window(start_time: DateTime<Utc>, window: &LoadedWindow) -> Option<Self> {
        let first = window.records.first()?;
        Some(Self {
            start_time,
            records: window.len(),
            valid_times: window.valid_times(),
            num_levels: first.num_levels(),
            grid_shape: first.grid_shape(),
            motion_shape: window.motion.shape().to_vec(),
            normalized: first.normalized,
            domain: first.domain.to_string(),
        })
    }
}

/// Load the window starting at `start_time` and summarize it.
pub fn inspect(
    decomposition: &Path,
    motion: &Path,
    start_time: DateTime<Utc>,
    steps: usize,
) -> nwp_blending::Result<Option<WindowSummary>> {
    let window = load_window(decomposition, motion, start_time, steps)?;
    Ok(WindowSummary::from_window(start_time, &window))
}
