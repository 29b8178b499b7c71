//! Segment resolution and evaluation.

use serde::Serialize;

use crate::features::constraints::{evaluate_constraints, EvaluatedConstraint};
use crate::repository::Repository;
use crate::{Context, Segment, SegmentId, Str, Timestamp};

/// A segment together with its per-constraint detail and resolved boolean.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedSegment {
    pub id: SegmentId,
    pub name: Str,
    pub constraints: Vec<EvaluatedConstraint>,
    pub result: bool,
}

/// Outcome of evaluating resolved segments: the AND over all of them plus per-segment detail.
///
/// An empty list evaluates to `true`.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentsResult {
    pub result: bool,
    pub segments: Vec<EvaluatedSegment>,
}

/// Resolve segment references through the repository.
///
/// Ids that do not resolve are dropped from evaluation instead of failing the strategy; only the
/// segments that could be resolved take part in the AND. Each dropped reference is logged.
pub fn resolve_segments<'a>(
    repository: &'a dyn Repository,
    ids: &[SegmentId],
    feature_name: &str,
) -> Vec<&'a Segment> {
    ids.iter()
        .filter_map(|&id| {
            let segment = repository.get_segment(id);
            if segment.is_none() {
                log::warn!(target: "toggle",
                           segment_id = id,
                           feature_name;
                           "dropping reference to unresolvable segment");
            }
            segment
        })
        .collect()
}

pub fn evaluate_segments(
    context: &Context,
    segments: &[&Segment],
    now: Timestamp,
) -> SegmentsResult {
    let segments: Vec<EvaluatedSegment> = segments
        .iter()
        .map(|segment| {
            let constraints = evaluate_constraints(context, &segment.constraints, now);
            EvaluatedSegment {
                id: segment.id,
                name: segment.name.clone(),
                constraints: constraints.constraints,
                result: constraints.result,
            }
        })
        .collect();
    let result = segments.iter().all(|it| it.result);
    SegmentsResult { result, segments }
}
