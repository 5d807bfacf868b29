//! Decomposition and recomposition capabilities.
//!
//! The stores and the recomposer only see these traits. [`FftFilterBank`] is
//! the bundled implementation.

mod fft;

pub use fft::FftFilterBank;

use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Domain;

/// Options forwarded to the decomposition capability and recorded in every
/// stored cascade record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionOptions {
    /// Domain of the returned levels.
    pub domain: Domain,
    /// Normalize each level to zero mean and unit variance.
    pub normalize: bool,
    /// Compute per-level statistics. Implied by `normalize`.
    pub compute_stats: bool,
    /// Store spectral levels compacted.
    pub compact_output: bool,
}

impl Default for DecompositionOptions {
    fn default() -> Self {
        Self {
            domain: Domain::Spatial,
            normalize: true,
            compute_stats: true,
            compact_output: false,
        }
    }
}

/// Output of one field's decomposition.
///
/// When statistics are not computed, `means` are zero and `stds` one so
/// de-normalization stays an identity.
#[derive(Debug, Clone)]
pub struct Decomposition {
    /// Levels with shape (L, H, W).
    pub levels: Array3<f32>,
    pub means: Array1<f32>,
    pub stds: Array1<f32>,
}

/// Splits a 2-D field into `num_levels` frequency bands.
pub trait Decomposer: Send + Sync {
    fn decompose(
        &self,
        field: ArrayView2<'_, f32>,
        num_levels: usize,
        options: &DecompositionOptions,
    ) -> Result<Decomposition>;
}

/// Merges cascade levels back into one field.
pub trait Recomposer: Send + Sync {
    /// `normalized` tells the capability whether `levels` still carry the
    /// per-level normalization.
    fn recompose(
        &self,
        levels: ArrayView3<'_, f32>,
        domain: Domain,
        normalized: bool,
    ) -> Result<Array2<f32>>;
}

impl<D: Decomposer + ?Sized> Decomposer for &D {
    fn decompose(
        &self,
        field: ArrayView2<'_, f32>,
        num_levels: usize,
        options: &DecompositionOptions,
    ) -> Result<Decomposition> {
        (**self).decompose(field, num_levels, options)
    }
}

impl<R: Recomposer + ?Sized> Recomposer for &R {
    fn recompose(
        &self,
        levels: ArrayView3<'_, f32>,
        domain: Domain,
        normalized: bool,
    ) -> Result<Array2<f32>> {
        (**self).recompose(levels, domain, normalized)
    }
}
