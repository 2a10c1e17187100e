//! Long-input analysis: split the timeline into overlapping windows, ask a
//! judge about each one with bounded fan-out, then merge the pooled answers.

mod dedup;
mod judge;
mod refine;
mod windows;


use futures_util::future::join_all;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ChunkingConfig;
use crate::error::JudgeError;
use crate::types::{CandidateSegment, Cue};

pub use dedup::reconcile;
pub use judge::{parse_response, CommandJudge, Judge, JudgeRequest};
pub use refine::refine_to_natural_pauses;
pub use windows::{build_windows, partition, whole_track, AnalysisWindow};

/// Outcome of one selection run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoordinatorReport {
    /// Final candidates, best first when chunking was used
    pub candidates: Vec<CandidateSegment>,
    /// One entry per window whose judge call failed or timed out
    pub warnings: Vec<String>,
    pub chunked: bool,
    pub windows_judged: usize,
}

/// Candidates requested from each window when chunking
pub fn per_window_request(max_clips: usize) -> usize {
    max_clips.div_ceil(2) + 2
}

pub struct ChunkCoordinator<'a> {
    config: &'a ChunkingConfig,
    judge: &'a dyn Judge,
}

impl<'a> ChunkCoordinator<'a> {
    pub fn new(config: &'a ChunkingConfig, judge: &'a dyn Judge) -> Self {
        Self { config, judge }
    }

    /// Pick up to `max_clips` candidates for a timeline of `duration` seconds
    pub async fn select(&self, cues: &[Cue], duration: f64, max_clips: usize) -> CoordinatorReport {
        if cues.is_empty() {
            warn!("no cues to judge");
            return CoordinatorReport {
                warnings: vec!["no cues to judge".to_string()],
                ..CoordinatorReport::default()
            };
        }
        if duration <= self.config.long_input_threshold {
            self.single_pass(cues, duration, max_clips).await
        } else {
            self.chunked(cues, duration, max_clips).await
        }
    }

    async fn single_pass(&self, cues: &[Cue], duration: f64, max_clips: usize) -> CoordinatorReport {
        let mut report = CoordinatorReport::default();
        let Some(window) = whole_track(cues, duration) else {
            warn!(duration, "timeline has no usable length");
            report.warnings.push(format!("timeline length {duration} is not usable"));
            return report;
        };
        info!(duration, max_clips, "judging whole track in one call");

        report.windows_judged = 1;
        match self.judge_window(&window, max_clips).await {
            Ok(mut candidates) => {
                candidates.truncate(max_clips);
                report.candidates = candidates;
            }
            Err(err) => {
                warn!(error = %err, "judge call failed");
                report.warnings.push(err.to_string());
            }
        }
        report
    }

    async fn chunked(&self, cues: &[Cue], duration: f64, max_clips: usize) -> CoordinatorReport {
        let windows = build_windows(
            cues,
            duration,
            self.config.window_length,
            self.config.overlap,
        );
        let per_window = per_window_request(max_clips);
        info!(
            duration,
            windows = windows.len(),
            per_window,
            fan_out = self.config.max_parallel,
            "judging timeline in overlapping windows"
        );

        let mut pooled = Vec::new();
        let mut warnings = Vec::new();
        for batch in windows.chunks(self.config.max_parallel.max(1)) {
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|window| self.judge_window(window, per_window)),
            )
            .await;

            // Outcomes come back in batch order regardless of completion order
            for (window, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(found) => {
                        debug!(window = window.index, found = found.len(), "window judged");
                        pooled.extend(found);
                    }
                    Err(err) => {
                        warn!(window = window.index, error = %err, "window skipped");
                        warnings.push(err.to_string());
                    }
                }
            }
        }

        let candidates = reconcile(pooled, self.config.proximity_threshold, max_clips);
        info!(
            selected = candidates.len(),
            failed = warnings.len(),
            "chunked selection finished"
        );
        CoordinatorReport {
            candidates,
            warnings,
            chunked: true,
            windows_judged: windows.len(),
        }
    }

    async fn judge_window(
        &self,
        window: &AnalysisWindow,
        max_candidates: usize,
    ) -> Result<Vec<CandidateSegment>, JudgeError> {
        let request = window.request(max_candidates);
        let after = self.config.judge_timeout();
        let mut candidates = match timeout(after, self.judge.judge(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(JudgeError::Timeout {
                    window: window.index,
                    after,
                })
            }
        };
        for candidate in &mut candidates {
            candidate.metadata.source_window = Some(window.index);
        }
        Ok(candidates)
    }
}
