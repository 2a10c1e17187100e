//! Core types for the cutline segmentation pipeline

use serde::{Deserialize, Serialize};

/// A half-open stretch of the source timeline, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    /// Build a span, rejecting empty, inverted or non-finite ranges
    pub fn new(start: f64, end: f64) -> Option<Self> {
        (start.is_finite() && end.is_finite() && end > start).then_some(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }
}

/// Sub-timing of a single spoken token inside a cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub start: f64,
    pub end: f64,
    #[serde(alias = "word")]
    pub token: String,
}

/// A timed caption entry on the global (absolute) timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub start: f64, // seconds
    pub end: f64,   // seconds
    pub text: String,
    /// Optional per-word timings used for progressive highlight
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<WordTiming>,
}

impl Cue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            words: Vec::new(),
        }
    }

    pub fn with_words(mut self, words: Vec<WordTiming>) -> Self {
        self.words = words;
        self
    }

    /// True when the trimmed text closes a sentence
    pub fn ends_sentence(&self) -> bool {
        matches!(self.text.trim_end().chars().last(), Some('.' | '!' | '?'))
    }
}

/// A stretch of detected silence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilenceInterval {
    pub start: f64,
    pub end: f64,
}

/// A point where the content shifts subject
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicChangePoint {
    pub timestamp: f64,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
}

/// Ordered cut points `0 = t0 < t1 < ... < tn = duration`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CutPointSequence {
    pub points: Vec<f64>,
}

impl CutPointSequence {
    pub fn spans(&self) -> Vec<TimeSpan> {
        self.points
            .windows(2)
            .filter_map(|pair| TimeSpan::new(pair[0], pair[1]))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Descriptive fields a judge attaches to a candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashtags: Vec<String>,
    /// Index of the analysis window that produced the candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_window: Option<usize>,
}

/// A scored span returned by a judge for one analysis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSegment {
    #[serde(flatten)]
    pub span: TimeSpan,
    pub score: f64,
    #[serde(default)]
    pub metadata: SegmentMetadata,
}

/// Span produced by the greedy planner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequentialSegment {
    pub number: usize,
    pub span: TimeSpan,
}

/// Span ranked by judge score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSegment {
    pub span: TimeSpan,
    pub score: f64,
    pub metadata: SegmentMetadata,
}

/// Judged span whose boundaries were refined to natural pauses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgedSegment {
    pub span: TimeSpan,
    /// Span as returned by the judge, before refinement
    pub proposed: TimeSpan,
    pub score: f64,
    pub metadata: SegmentMetadata,
}

/// Result of any segmentation mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Sequential(SequentialSegment),
    Scored(ScoredSegment),
    Judged(JudgedSegment),
}

impl Segment {
    pub fn span(&self) -> TimeSpan {
        match self {
            Segment::Sequential(segment) => segment.span,
            Segment::Scored(segment) => segment.span,
            Segment::Judged(segment) => segment.span,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Segment::Sequential(_) => None,
            Segment::Scored(segment) => Some(segment.score),
            Segment::Judged(segment) => Some(segment.score),
        }
    }

    pub fn metadata(&self) -> Option<&SegmentMetadata> {
        match self {
            Segment::Sequential(_) => None,
            Segment::Scored(segment) => Some(&segment.metadata),
            Segment::Judged(segment) => Some(&segment.metadata),
        }
    }
}

/// Everything loaded once per job: timeline length, cue track and detector signals
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobInput {
    /// Total timeline length; falls back to the last cue end when absent
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub cues: Vec<Cue>,
    #[serde(default, alias = "silence")]
    pub silences: Vec<SilenceInterval>,
    #[serde(default, alias = "topicChanges")]
    pub topic_changes: Vec<TopicChangePoint>,
}

impl JobInput {
    pub fn total_duration(&self) -> f64 {
        self.duration.unwrap_or_else(|| {
            self.cues
                .iter()
                .map(|cue| cue.end)
                .filter(|end| end.is_finite())
                .fold(0.0, f64::max)
        })
    }
}
