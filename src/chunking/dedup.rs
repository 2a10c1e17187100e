use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::types::CandidateSegment;

/// Highest score first; equal scores keep the earlier start first
fn rank(a: &CandidateSegment, b: &CandidateSegment) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.span.start.total_cmp(&b.span.start))
}

/// Merge pooled candidates from overlapping windows.
///
/// Greedy by score: a candidate is accepted only if no already accepted one
/// starts within `proximity` seconds of it. Only start times are compared, so
/// two candidates with distant starts but overlapping bodies both survive.
pub fn reconcile(
    candidates: Vec<CandidateSegment>,
    proximity: f64,
    max_count: usize,
) -> Vec<CandidateSegment> {
    let pooled = candidates.len();
    let mut ranked: Vec<CandidateSegment> = candidates
        .into_iter()
        .filter(|candidate| {
            let usable = candidate.score.is_finite() && candidate.span.start.is_finite();
            if !usable {
                warn!(
                    score = candidate.score,
                    start = candidate.span.start,
                    "dropping candidate with non-finite score or start"
                );
            }
            usable
        })
        .collect();
    ranked.sort_by(rank);

    let mut accepted: Vec<CandidateSegment> = Vec::with_capacity(max_count.min(ranked.len()));
    for candidate in ranked {
        if accepted.len() >= max_count {
            break;
        }
        let near_accepted = accepted
            .iter()
            .any(|kept| (kept.span.start - candidate.span.start).abs() < proximity);
        if !near_accepted {
            accepted.push(candidate);
        }
    }

    debug!(pooled, accepted = accepted.len(), proximity, "reconciled candidates");
    accepted
}
