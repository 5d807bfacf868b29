//! Core record types shared by the stores, the loader and the blender.

use chrono::{DateTime, Duration, Utc};
use ndarray::{Array1, Array3, Array4};
use serde::{Deserialize, Serialize};

use crate::error::{BlendingError, Result};

/// Representation domain of stored cascade levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Spatial,
    Spectral,
}

impl Default for Domain {
    fn default() -> Self {
        Self::Spatial
    }
}

impl Domain {
    /// Get the domain tag as stored in artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spatial => "spatial",
            Self::Spectral => "spectral",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The decomposition of one field at one valid time.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeRecord {
    pub domain: Domain,
    pub normalized: bool,
    pub compact_output: bool,
    /// The field's own valid time (always one entry).
    pub valid_times: Vec<DateTime<Utc>>,
    /// Levels with shape (L, H, W).
    pub cascade_levels: Array3<f32>,
    /// Per-level means, length L.
    pub means: Array1<f32>,
    /// Per-level standard deviations, length L.
    pub stds: Array1<f32>,
}

impl CascadeRecord {
    /// Number of cascade levels.
    pub fn num_levels(&self) -> usize {
        self.cascade_levels.shape()[0]
    }

    /// Grid shape (H, W).
    pub fn grid_shape(&self) -> (usize, usize) {
        let shape = self.cascade_levels.shape();
        (shape[1], shape[2])
    }

    /// The valid time of the decomposed field.
    pub fn valid_time(&self) -> Option<DateTime<Utc>> {
        self.valid_times.first().copied()
    }

    /// Check that levels, means and stds agree on L.
    pub fn validate(&self) -> Result<()> {
        let levels = self.num_levels();
        if self.means.len() != levels || self.stds.len() != levels {
            return Err(BlendingError::shape_mismatch(format!(
                "record has {} levels but {} means and {} stds",
                levels,
                self.means.len(),
                self.stds.len()
            )));
        }
        Ok(())
    }
}

/// A run's motion fields, shape (N, 2, H, W), positionally aligned with
/// the run's lead times.
pub type MotionSequence = Array4<f32>;

/// Identity of one NWP run's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub model_name: String,
    pub analysis_time: DateTime<Utc>,
}

impl ArtifactKey {
    /// Create a key, rejecting model names that cannot be part of a file name.
    pub fn new(model_name: impl Into<String>, analysis_time: DateTime<Utc>) -> Result<Self> {
        let model_name = model_name.into();
        if model_name.is_empty() {
            return Err(BlendingError::invalid_input("model name must not be empty"));
        }
        if model_name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control())
        {
            return Err(BlendingError::invalid_input(format!(
                "model name {:?} contains path separators or whitespace",
                model_name
            )));
        }
        Ok(Self {
            model_name,
            analysis_time,
        })
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.model_name, self.analysis_time.to_rfc3339())
    }
}

/// Ascending forecast lead times of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadTimes(Vec<Duration>);

impl LeadTimes {
    /// Wrap lead times, which must be non-negative and strictly ascending.
    pub fn new(lead_times: Vec<Duration>) -> Result<Self> {
        if lead_times.iter().any(|lt| *lt < Duration::zero()) {
            return Err(BlendingError::invalid_input("lead times must not be negative"));
        }
        if lead_times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(BlendingError::invalid_input(
                "lead times must be strictly ascending",
            ));
        }
        Ok(Self(lead_times))
    }

    /// `n` lead times spaced `timestep_minutes` apart, starting at zero.
    pub fn regular(timestep_minutes: i64, n: usize) -> Result<Self> {
        if timestep_minutes <= 0 {
            return Err(BlendingError::invalid_input("timestep must be positive"));
        }
        Self::new(
            (0..n as i64)
                .map(|i| Duration::minutes(i * timestep_minutes))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Duration] {
        &self.0
    }

    /// Valid times of these lead times for a run analysed at `analysis_time`.
    pub fn valid_times(&self, analysis_time: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        self.0.iter().map(|lt| analysis_time + *lt).collect()
    }
}
