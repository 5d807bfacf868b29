//! Cascade algebra over loaded windows: stacking, blending, recomposition
//! and dry-field screening.

mod blend;
mod recompose;
mod screening;
mod stack;

pub use blend::{blend_cascades, blend_optical_flows};
pub use recompose::recompose_cascade;
pub use screening::check_no_rain;
pub use stack::{stack_cascades, StackedCascades};
