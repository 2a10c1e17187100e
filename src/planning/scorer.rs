use crate::config::ScoringWeights;
use crate::signals::SignalIndex;

pub(super) const EPS: f64 = 1e-9;

/// Range of instants the scorer may choose from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchWindow {
    /// Start of the span the boundary closes
    pub origin: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub ideal_duration: f64,
}

impl SearchWindow {
    /// Scan instants `min + k * step`, computed by index so rounding never drifts
    fn instants(&self) -> impl Iterator<Item = f64> + '_ {
        let count = ((self.max - self.min) / self.step + EPS).floor().max(0.0) as usize;
        (0..=count).map(move |k| self.min + k as f64 * self.step)
    }

    fn holds(&self, time: f64) -> bool {
        time >= self.min - EPS && time <= self.max + EPS
    }
}

/// Chosen instant and its score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredInstant {
    pub time: f64,
    pub score: f64,
}

/// Weighted multi-signal cut-point scorer
///
/// Pure and deterministic: the same window over the same signals always yields
/// the same instant.
pub struct BoundaryScorer<'a> {
    signals: &'a SignalIndex,
    weights: &'a ScoringWeights,
}

impl<'a> BoundaryScorer<'a> {
    pub fn new(signals: &'a SignalIndex, weights: &'a ScoringWeights) -> Self {
        Self { signals, weights }
    }

    /// Best instant in the window; the first instant reaching the maximum wins
    pub fn best_in(&self, window: &SearchWindow) -> ScoredInstant {
        let mut best: Option<ScoredInstant> = None;
        for time in window.instants() {
            let candidate = self.score_at(time, window);
            if best.map_or(true, |current| candidate.score > current.score) {
                best = Some(candidate);
            }
        }
        // A window narrower than zero steps still has its lower bound
        best.unwrap_or_else(|| self.score_at(window.min, window))
    }

    /// Score a single instant, possibly snapping it to a sentence end
    pub fn score_at(&self, time: f64, window: &SearchWindow) -> ScoredInstant {
        let w = self.weights;
        let mut score = 0.0;

        if self.in_silence(time) {
            score += w.silence_bonus;
        }
        if let Some(confidence) = self.topic_confidence(time) {
            score += w.topic_weight * confidence;
        }
        score += self.pause_reward(time);

        let mut time = time;
        if let Some(sentence_end) = self.sentence_end_near(time) {
            score += w.sentence_bonus;
            if (sentence_end - time).abs() < w.snap_radius && window.holds(sentence_end) {
                time = sentence_end;
            }
        }

        if self.inside_speech(time) {
            score -= w.mid_speech_penalty;
        }
        let edge_distance = (time - window.min).min(window.max - time);
        if edge_distance < w.edge_margin {
            score -= w.edge_penalty;
        }
        score += self.duration_preference(time, window);

        ScoredInstant { time, score }
    }

    fn in_silence(&self, time: f64) -> bool {
        let pad = self.weights.silence_pad;
        self.signals
            .silences()
            .iter()
            .any(|s| time >= s.start - pad && time <= s.end + pad)
    }

    fn topic_confidence(&self, time: f64) -> Option<f64> {
        self.signals
            .topics()
            .iter()
            .find(|t| (t.timestamp - time).abs() < self.weights.topic_tolerance)
            .map(|t| t.confidence)
    }

    fn pause_reward(&self, time: f64) -> f64 {
        let w = self.weights;
        self.signals
            .pauses()
            .iter()
            .filter(|p| p.gap() > w.pause_min_gap)
            .filter(|p| time >= p.start - w.pause_margin && time <= p.end + w.pause_margin)
            .map(|p| w.pause_weight * p.gap().min(w.pause_gap_cap))
            .sum()
    }

    fn sentence_end_near(&self, time: f64) -> Option<f64> {
        self.signals
            .cues()
            .iter()
            .find(|cue| {
                (cue.end - time).abs() <= self.weights.sentence_tolerance && cue.ends_sentence()
            })
            .map(|cue| cue.end)
    }

    fn inside_speech(&self, time: f64) -> bool {
        self.signals.cues().iter().any(|cue| {
            time > cue.start
                && time < cue.end
                && cue.text.trim().chars().count() > self.weights.mid_speech_min_chars
        })
    }

    fn duration_preference(&self, time: f64, window: &SearchWindow) -> f64 {
        let w = self.weights;
        let deviation = (time - window.origin - window.ideal_duration).abs();
        (w.duration_peak - deviation / w.duration_decay).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cue, SilenceInterval, TopicChangePoint};
    use approx::assert_relative_eq;

    fn window(origin: f64, min: f64, max: f64) -> SearchWindow {
        SearchWindow {
            origin,
            min,
            max,
            step: 1.0,
            ideal_duration: 70.0,
        }
    }

    #[test]
    fn empty_signals_peak_at_ideal_duration() {
        let signals = SignalIndex::default();
        let weights = ScoringWeights::default();
        let best = BoundaryScorer::new(&signals, &weights).best_in(&window(0.0, 60.0, 80.0));
        assert_relative_eq!(best.time, 70.0);
        assert_relative_eq!(best.score, 1.5);
    }

    #[test]
    fn silence_pulls_boundary_away_from_ideal() {
        let silences = vec![SilenceInterval {
            start: 64.0,
            end: 65.0,
        }];
        let signals = SignalIndex::new(&[], &silences, &[]);
        let weights = ScoringWeights::default();
        let best = BoundaryScorer::new(&signals, &weights).best_in(&window(0.0, 60.0, 80.0));
        // 63..66 earn the padded silence bonus; 66 is closest to the ideal
        assert_relative_eq!(best.time, 66.0);
        assert_relative_eq!(best.score, 3.0 + 1.5 - 4.0 / 20.0);
    }

    #[test]
    fn topic_bonus_scales_with_confidence() {
        let topics = vec![TopicChangePoint {
            timestamp: 75.0,
            confidence: 0.4,
        }];
        let signals = SignalIndex::new(&[], &[], &topics);
        let weights = ScoringWeights::default();
        let scorer = BoundaryScorer::new(&signals, &weights);
        let scored = scorer.score_at(72.0, &window(0.0, 60.0, 80.0));
        assert_relative_eq!(scored.score, 2.5 * 0.4 + 1.5 - 2.0 / 20.0);
    }

    #[test]
    fn sentence_end_snaps_candidate() {
        let cues = vec![Cue::new(60.0, 68.4, "That is the whole story.")];
        let signals = SignalIndex::new(&cues, &[], &[]);
        let weights = ScoringWeights::default();
        let scorer = BoundaryScorer::new(&signals, &weights);
        let scored = scorer.score_at(68.0, &window(0.0, 60.0, 80.0));
        assert_relative_eq!(scored.time, 68.4);
        assert_relative_eq!(scored.score, 4.0 + 1.5 - 1.6 / 20.0);
    }

    #[test]
    fn snap_never_leaves_window() {
        let cues = vec![Cue::new(50.0, 59.5, "Out of range.")];
        let signals = SignalIndex::new(&cues, &[], &[]);
        let weights = ScoringWeights::default();
        let scorer = BoundaryScorer::new(&signals, &weights);
        let scored = scorer.score_at(60.0, &window(0.0, 60.0, 80.0));
        assert_relative_eq!(scored.time, 60.0);
    }

    #[test]
    fn mid_speech_is_penalized_only_for_substantial_text() {
        let cues = vec![
            Cue::new(60.0, 75.0, "a long sentence that keeps going"),
            Cue::new(75.0, 80.0, "uh"),
        ];
        let signals = SignalIndex::new(&cues, &[], &[]);
        let weights = ScoringWeights::default();
        let scorer = BoundaryScorer::new(&signals, &weights);
        let w = window(0.0, 60.0, 90.0);
        assert_relative_eq!(scorer.score_at(70.0, &w).score, 1.5 - 3.0);
        assert_relative_eq!(scorer.score_at(77.0, &w).score, 1.5 - 7.0 / 20.0);
    }

    #[test]
    fn natural_pause_reward_is_capped() {
        let cues = vec![Cue::new(60.0, 66.0, "before"), Cue::new(71.0, 80.0, "after")];
        let signals = SignalIndex::new(&cues, &[], &[]);
        let weights = ScoringWeights::default();
        let scorer = BoundaryScorer::new(&signals, &weights);
        let scored = scorer.score_at(68.0, &window(0.0, 60.0, 80.0));
        assert_relative_eq!(scored.score, 3.5 * 2.0 + 1.5 - 2.0 / 20.0);
    }

    #[test]
    fn edges_are_penalized() {
        let signals = SignalIndex::default();
        let weights = ScoringWeights::default();
        let scorer = BoundaryScorer::new(&signals, &weights);
        let scored = scorer.score_at(61.0, &window(0.0, 60.0, 80.0));
        assert_relative_eq!(scored.score, 1.5 - 9.0 / 20.0 - 1.0);
    }

    #[test]
    fn ties_resolve_to_first_instant() {
        let signals = SignalIndex::default();
        let weights = ScoringWeights {
            duration_peak: 0.0,
            edge_penalty: 0.0,
            ..ScoringWeights::default()
        };
        let best = BoundaryScorer::new(&signals, &weights).best_in(&window(0.0, 60.0, 80.0));
        assert_relative_eq!(best.time, 60.0);
        assert_relative_eq!(best.score, 0.0);
    }

    #[test]
    fn repeated_scans_agree() {
        let cues: Vec<Cue> = (0..40)
            .map(|i| Cue::new(i as f64 * 3.0, i as f64 * 3.0 + 2.2, "some words here."))
            .collect();
        let signals = SignalIndex::new(&cues, &[], &[]);
        let weights = ScoringWeights::default();
        let scorer = BoundaryScorer::new(&signals, &weights);
        let w = window(0.0, 60.0, 80.0);
        let first = scorer.best_in(&w);
        for _ in 0..5 {
            assert_eq!(scorer.best_in(&w), first);
        }
    }
}
