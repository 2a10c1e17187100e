use tracing::{debug, warn};

use crate::config::{PlannerConfig, ScoringWeights};
use crate::signals::SignalIndex;
use crate::types::CutPointSequence;

use super::scorer::{BoundaryScorer, SearchWindow, EPS};

enum PlannerState {
    Scanning { cursor: f64 },
    Done,
}

/// Greedy forward planner: one pass over the timeline, never revisiting a
/// boundary once chosen.
pub struct SegmentPlanner<'a> {
    config: &'a PlannerConfig,
    scorer: BoundaryScorer<'a>,
}

impl<'a> SegmentPlanner<'a> {
    pub fn new(
        config: &'a PlannerConfig,
        weights: &'a ScoringWeights,
        signals: &'a SignalIndex,
    ) -> Self {
        Self {
            config,
            scorer: BoundaryScorer::new(signals, weights),
        }
    }

    pub fn plan(&self, total_duration: f64) -> CutPointSequence {
        let mut points = vec![0.0];
        if !total_duration.is_finite() || total_duration <= 0.0 {
            warn!(total_duration, "timeline has no usable length; nothing to plan");
            return CutPointSequence { points };
        }

        let mut state = PlannerState::Scanning { cursor: 0.0 };
        while let PlannerState::Scanning { cursor } = state {
            state = self.step(cursor, total_duration, &mut points);
        }
        debug!(spans = points.len() - 1, "segment plan complete");
        CutPointSequence { points }
    }

    fn step(&self, cursor: f64, total_duration: f64, points: &mut Vec<f64>) -> PlannerState {
        let earliest = cursor + self.config.min_duration;
        if earliest >= total_duration {
            if total_duration - cursor > EPS {
                points.push(total_duration);
            }
            return PlannerState::Done;
        }

        let window = SearchWindow {
            origin: cursor,
            min: earliest,
            max: (cursor + self.config.max_duration).min(total_duration),
            step: self.config.scan_step,
            ideal_duration: self.config.ideal_duration,
        };
        let chosen = self.scorer.best_in(&window);
        debug!(
            cursor,
            boundary = chosen.time,
            score = chosen.score,
            "selected cut point"
        );
        if total_duration - chosen.time <= EPS {
            points.push(total_duration);
            PlannerState::Done
        } else {
            points.push(chosen.time);
            PlannerState::Scanning {
                cursor: chosen.time,
            }
        }
    }
}

/// Plan cut points for a whole timeline
pub fn plan_cut_points(
    signals: &SignalIndex,
    config: &PlannerConfig,
    weights: &ScoringWeights,
    total_duration: f64,
) -> CutPointSequence {
    SegmentPlanner::new(config, weights, signals).plan(total_duration)
}
