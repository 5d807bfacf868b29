//! Attribute schemas of the persisted artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BlendingError, Result};
use crate::types::Domain;

/// Version written into every artifact's attributes.
pub const FORMAT_VERSION: u32 = 1;

type Attributes = serde_json::Map<String, serde_json::Value>;

fn to_attributes<T: Serialize>(value: &T) -> Result<Attributes> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(BlendingError::invalid_artifact(format!(
            "metadata serialized to a non-object: {}",
            other
        ))),
    }
}

fn check_version(found: u32) -> Result<()> {
    if found != FORMAT_VERSION {
        return Err(BlendingError::invalid_artifact(format!(
            "unsupported artifact format version {} (expected {})",
            found, FORMAT_VERSION
        )));
    }
    Ok(())
}

/// Attributes of a decomposition artifact (array shape (T, L, H, W)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeArtifactMetadata {
    pub format_version: u32,
    pub model: String,
    pub analysis_time: DateTime<Utc>,
    /// One valid time per stored record, ascending.
    pub valid_times: Vec<DateTime<Utc>>,
    pub domain: Domain,
    pub normalized: bool,
    pub compact_output: bool,
    pub num_levels: usize,
    /// Per-record, per-level means, shape (T, L).
    pub means: Vec<Vec<f32>>,
    /// Per-record, per-level standard deviations, shape (T, L).
    pub stds: Vec<Vec<f32>>,
}

impl CascadeArtifactMetadata {
    /// Serialize into array attributes.
    pub fn to_attributes(&self) -> Result<Attributes> {
        to_attributes(self)
    }

    /// Deserialize from array attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self> {
        let metadata: Self = serde_json::from_value(serde_json::Value::Object(attributes.clone()))?;
        check_version(metadata.format_version)?;
        Ok(metadata)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.valid_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid_times.is_empty()
    }

    /// Check the metadata against the stored array shape.
    pub fn validate(&self, shape: &[u64]) -> Result<()> {
        let records = self.len();
        if shape.len() != 4 {
            return Err(BlendingError::invalid_artifact(format!(
                "decomposition array must be 4-D, found shape {:?}",
                shape
            )));
        }
        if shape[0] as usize != records || shape[1] as usize != self.num_levels {
            return Err(BlendingError::invalid_artifact(format!(
                "array shape {:?} disagrees with {} records of {} levels",
                shape, records, self.num_levels
            )));
        }
        let stats_ok = |stats: &Vec<Vec<f32>>| {
            stats.len() == records && stats.iter().all(|row| row.len() == self.num_levels)
        };
        if !stats_ok(&self.means) || !stats_ok(&self.stds) {
            return Err(BlendingError::invalid_artifact(
                "means/stds do not match the record and level counts",
            ));
        }
        if self.valid_times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(BlendingError::invalid_artifact(
                "valid times are not strictly ascending",
            ));
        }
        Ok(())
    }
}

/// Attributes of a motion artifact (array shape (N, 2, H, W)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionArtifactMetadata {
    pub format_version: u32,
    pub model: String,
    pub analysis_time: DateTime<Utc>,
    pub num_fields: usize,
}

impl MotionArtifactMetadata {
    /// Serialize into array attributes.
    pub fn to_attributes(&self) -> Result<Attributes> {
        to_attributes(self)
    }

    /// Deserialize from array attributes.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self> {
        let metadata: Self = serde_json::from_value(serde_json::Value::Object(attributes.clone()))?;
        check_version(metadata.format_version)?;
        Ok(metadata)
    }

    /// Check the metadata against the stored array shape.
    pub fn validate(&self, shape: &[u64]) -> Result<()> {
        if shape.len() != 4 || shape[1] != 2 || shape[0] as usize != self.num_fields {
            return Err(BlendingError::invalid_artifact(format!(
                "motion array shape {:?} does not hold {} two-channel fields",
                shape, self.num_fields
            )));
        }
        Ok(())
    }
}
