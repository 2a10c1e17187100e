//! Signal aggregation: turns raw detector output and the cue track into the
//! sorted, sanitized indices the boundary scorer reads.
//!
//! Malformed entries are dropped with a warning instead of failing the job.

use tracing::warn;

use crate::types::{Cue, JobInput, SilenceInterval, TopicChangePoint};

/// Gap between two consecutive cues
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pause {
    /// End of the earlier cue
    pub start: f64,
    /// Start of the following cue
    pub end: f64,
}

impl Pause {
    pub fn gap(self) -> f64 {
        self.end - self.start
    }
}

/// Immutable, normalized view of every signal the scorer consults
#[derive(Debug, Clone, Default)]
pub struct SignalIndex {
    cues: Vec<Cue>,
    silences: Vec<SilenceInterval>,
    topics: Vec<TopicChangePoint>,
    pauses: Vec<Pause>,
}

impl SignalIndex {
    pub fn new(
        cues: &[Cue],
        silences: &[SilenceInterval],
        topics: &[TopicChangePoint],
    ) -> Self {
        let cues = normalize_cues(cues);
        let pauses = collect_pauses(&cues);
        Self {
            silences: normalize_silences(silences),
            topics: normalize_topics(topics),
            cues,
            pauses,
        }
    }

    pub fn from_input(input: &JobInput) -> Self {
        Self::new(&input.cues, &input.silences, &input.topic_changes)
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn silences(&self) -> &[SilenceInterval] {
        &self.silences
    }

    pub fn topics(&self) -> &[TopicChangePoint] {
        &self.topics
    }

    pub fn pauses(&self) -> &[Pause] {
        &self.pauses
    }
}

/// Sort cues by start and drop entries with non-finite or inverted timing
pub fn normalize_cues(cues: &[Cue]) -> Vec<Cue> {
    let mut kept: Vec<Cue> = cues
        .iter()
        .filter(|cue| cue.start.is_finite() && cue.end.is_finite() && cue.end >= cue.start)
        .cloned()
        .collect();
    report_dropped("cue", cues.len(), kept.len());
    kept.sort_by(|a, b| a.start.total_cmp(&b.start));
    kept
}

fn normalize_silences(silences: &[SilenceInterval]) -> Vec<SilenceInterval> {
    let mut kept: Vec<SilenceInterval> = silences
        .iter()
        .copied()
        .filter(|s| s.start.is_finite() && s.end.is_finite() && s.end >= s.start)
        .collect();
    report_dropped("silence interval", silences.len(), kept.len());
    kept.sort_by(|a, b| a.start.total_cmp(&b.start));
    kept
}

fn normalize_topics(topics: &[TopicChangePoint]) -> Vec<TopicChangePoint> {
    let mut kept: Vec<TopicChangePoint> = topics
        .iter()
        .filter(|t| t.timestamp.is_finite() && t.confidence.is_finite())
        .map(|t| TopicChangePoint {
            timestamp: t.timestamp,
            confidence: t.confidence.clamp(0.0, 1.0),
        })
        .collect();
    report_dropped("topic change", topics.len(), kept.len());
    kept.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    kept
}

fn collect_pauses(cues: &[Cue]) -> Vec<Pause> {
    cues.windows(2)
        .map(|pair| Pause {
            start: pair[0].end,
            end: pair[1].start,
        })
        .filter(|pause| pause.gap() > 0.0)
        .collect()
}

fn report_dropped(kind: &str, before: usize, after: usize) {
    if after < before {
        warn!(dropped = before - after, "ignoring malformed {} entries", kind);
    }
}
