//! Feature definitions and the pure predicates over them.

mod constraints;
mod models;
mod segments;
mod variant;

pub use constraints::{
    eval_constraint, evaluate_constraints, ConstraintsResult, EvaluatedConstraint,
};
pub use models::*;
pub use segments::{evaluate_segments, resolve_segments, EvaluatedSegment, SegmentsResult};
pub use variant::{select_variant, Variant};
