//! End-to-end run: signals in, clip spans with captions out, job record kept
//! up to date along the way.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::captions::{render_clip, CaptionDocument};
use crate::chunking::{refine_to_natural_pauses, ChunkCoordinator, Judge};
use crate::config::PipelineConfig;
use crate::error::ConfigError;
use crate::jobs::{ClipSummary, JobRecord, JobRepository, JobUpdate};
use crate::planning::plan_cut_points;
use crate::signals::SignalIndex;
use crate::types::{
    CutPointSequence, JobInput, JudgedSegment, ScoredSegment, Segment, SequentialSegment, TimeSpan,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Greedy boundary planning over the whole timeline
    Sequential,
    /// Judge-ranked candidates, spans used as returned
    Ranked,
    /// Judge-ranked candidates refined to natural pauses
    Refined,
}

impl ProcessingMode {
    pub fn needs_judge(self) -> bool {
        !matches!(self, ProcessingMode::Sequential)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClipPlan {
    pub number: usize,
    pub segment: Segment,
    /// Span actually cut, which may be wider than the segment span
    pub clip_span: TimeSpan,
    #[serde(skip)]
    pub captions: CaptionDocument,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub job_id: String,
    pub mode: ProcessingMode,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut_points: Option<CutPointSequence>,
    pub clips: Vec<ClipPlan>,
    pub warnings: Vec<String>,
}

pub struct Pipeline {
    config: PipelineConfig,
    jobs: Arc<dyn JobRepository>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, jobs: Arc<dyn JobRepository>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, jobs })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn job(&self, id: &str) -> Result<JobRecord> {
        Ok(self.jobs.get(id)?)
    }

    /// Run one job to completion. Any error marks the job failed before it is
    /// returned.
    pub async fn run(
        &self,
        job_id: &str,
        input: &JobInput,
        mode: ProcessingMode,
        judge: Option<&dyn Judge>,
    ) -> Result<PipelineOutput> {
        self.jobs
            .create(job_id)
            .with_context(|| format!("Failed to register job {}", job_id))?;
        info!(job = job_id, ?mode, "job started");

        match self.execute(job_id, input, mode, judge).await {
            Ok(output) => {
                let clips = output.clips.iter().map(summarize).collect();
                self.jobs.update(job_id, JobUpdate::Complete { clips })?;
                info!(job = job_id, clips = output.clips.len(), "job completed");
                Ok(output)
            }
            Err(err) => {
                let message = format!("{:#}", err);
                warn!(job = job_id, error = %message, "job failed");
                self.jobs.update(job_id, JobUpdate::Fail { message })?;
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        job_id: &str,
        input: &JobInput,
        mode: ProcessingMode,
        judge: Option<&dyn Judge>,
    ) -> Result<PipelineOutput> {
        self.jobs
            .update(job_id, JobUpdate::progress("loading signals", 10))?;
        let signals = SignalIndex::from_input(input);
        let duration = input.total_duration();
        if !duration.is_finite() || duration <= 0.0 {
            bail!("Timeline duration must be positive, got {}", duration);
        }

        let mut warnings = Vec::new();
        let mut cut_points = None;
        let segments = match mode {
            ProcessingMode::Sequential => {
                self.jobs
                    .update(job_id, JobUpdate::progress("planning cut points", 30))?;
                let points = plan_cut_points(
                    &signals,
                    &self.config.planner,
                    &self.config.weights,
                    duration,
                );
                let segments = sequential_segments(&points);
                cut_points = Some(points);
                segments
            }
            ProcessingMode::Ranked | ProcessingMode::Refined => {
                let Some(judge) = judge else {
                    bail!("Processing mode {:?} requires a judge", mode);
                };
                self.jobs
                    .update(job_id, JobUpdate::progress("judging content", 30))?;
                let coordinator = ChunkCoordinator::new(&self.config.chunking, judge);
                let report = coordinator
                    .select(signals.cues(), duration, self.config.chunking.max_clips)
                    .await;
                for message in &report.warnings {
                    self.jobs
                        .update(job_id, JobUpdate::Warning(message.clone()))?;
                }
                warnings.extend(report.warnings);

                let tolerance = self.config.chunking.refine_tolerance;
                report
                    .candidates
                    .into_iter()
                    .map(|candidate| {
                        if mode == ProcessingMode::Refined {
                            Segment::Judged(JudgedSegment {
                                span: refine_to_natural_pauses(
                                    candidate.span,
                                    signals.cues(),
                                    tolerance,
                                ),
                                proposed: candidate.span,
                                score: candidate.score,
                                metadata: candidate.metadata,
                            })
                        } else {
                            Segment::Scored(ScoredSegment {
                                span: candidate.span,
                                score: candidate.score,
                                metadata: candidate.metadata,
                            })
                        }
                    })
                    .collect()
            }
        };

        self.jobs
            .update(job_id, JobUpdate::progress("rendering captions", 70))?;
        let spans: Vec<TimeSpan> = segments.iter().map(Segment::span).collect();
        let clip_spans = if mode == ProcessingMode::Sequential {
            apply_cut_margin(&spans, self.config.captions.cut_margin, duration)
        } else {
            spans
        };

        let captions = &self.config.captions;
        let clips = segments
            .into_iter()
            .zip(clip_spans)
            .enumerate()
            .map(|(idx, (segment, clip_span))| ClipPlan {
                number: idx + 1,
                captions: render_clip(
                    signals.cues(),
                    clip_span,
                    captions.format,
                    captions.words_per_line,
                ),
                segment,
                clip_span,
            })
            .collect();

        Ok(PipelineOutput {
            job_id: job_id.to_string(),
            mode,
            duration,
            cut_points,
            clips,
            warnings,
        })
    }
}

fn sequential_segments(points: &CutPointSequence) -> Vec<Segment> {
    points
        .spans()
        .into_iter()
        .enumerate()
        .map(|(idx, span)| {
            Segment::Sequential(SequentialSegment {
                number: idx + 1,
                span,
            })
        })
        .collect()
}

/// Widen interior clip edges by `margin` so neighbouring clips share a little
/// context. The outer edges of the first and last clip stay put.
pub fn apply_cut_margin(spans: &[TimeSpan], margin: f64, duration: f64) -> Vec<TimeSpan> {
    let last = spans.len().saturating_sub(1);
    spans
        .iter()
        .enumerate()
        .map(|(idx, span)| {
            let start = if idx == 0 {
                span.start
            } else {
                (span.start - margin).max(0.0)
            };
            let end = if idx == last {
                span.end
            } else {
                (span.end + margin).min(duration)
            };
            TimeSpan { start, end }
        })
        .collect()
}

fn summarize(clip: &ClipPlan) -> ClipSummary {
    ClipSummary {
        number: clip.number,
        start: clip.clip_span.start,
        end: clip.clip_span.end,
        score: clip.segment.score(),
        title: clip.segment.metadata().and_then(|m| m.title.clone()),
    }
}
