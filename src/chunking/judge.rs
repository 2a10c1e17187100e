//! The external content judge seam and a process-backed implementation.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::JudgeError;
use crate::types::{CandidateSegment, Cue, TimeSpan};

/// Everything a judge sees for one window
#[derive(Debug, Clone, Serialize)]
pub struct JudgeRequest {
    pub window_index: usize,
    pub span: TimeSpan,
    pub text: String,
    pub cues: Vec<Cue>,
    /// Upper bound on the number of candidates wanted back
    pub max_candidates: usize,
}

/// Opaque scorer of a content window
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, request: &JudgeRequest) -> Result<Vec<CandidateSegment>, JudgeError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JudgeResponse {
    Bare(Vec<CandidateSegment>),
    Wrapped {
        #[serde(alias = "clips", alias = "blocks")]
        candidates: Vec<CandidateSegment>,
        #[serde(default)]
        warnings: Vec<String>,
    },
}

/// Runs an external program per window: request JSON on stdin, candidates JSON
/// on stdout. The child is killed if the call is dropped (e.g. on timeout).
#[derive(Debug, Clone)]
pub struct CommandJudge {
    program: String,
    args: Vec<String>,
    min_score: f64,
}

impl CommandJudge {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            min_score: 6.0,
        }
    }

    /// Build from a whitespace separated command line
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }
}

#[async_trait]
impl Judge for CommandJudge {
    async fn judge(&self, request: &JudgeRequest) -> Result<Vec<CandidateSegment>, JudgeError> {
        let window = request.window_index;
        let io_error = |source| JudgeError::Io { window, source };
        let payload = serde_json::to_vec(request)
            .map_err(|source| JudgeError::InvalidResponse { window, source })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(io_error)?;

        // Feed stdin while stdout and stderr drain, or a chatty judge fills its
        // pipes and never reads the rest of the request
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload).await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(io_error)?;
        match fed {
            // A judge may legitimately exit without reading all of its input
            Err(err) if err.kind() != std::io::ErrorKind::BrokenPipe => {
                return Err(io_error(err));
            }
            _ => {}
        }
        if !output.status.success() {
            return Err(JudgeError::Failed {
                window,
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        let candidates = parse_response(window, &raw)?;
        let total = candidates.len();
        let kept: Vec<CandidateSegment> = candidates
            .into_iter()
            .filter(|candidate| candidate.score >= self.min_score)
            .collect();
        debug!(
            window,
            total,
            kept = kept.len(),
            min_score = self.min_score,
            "judge response filtered"
        );
        Ok(kept)
    }
}

/// Decode a judge reply, tolerating a surrounding markdown code fence
pub fn parse_response(window: usize, raw: &str) -> Result<Vec<CandidateSegment>, JudgeError> {
    let body = strip_code_fence(raw);
    let response: JudgeResponse = serde_json::from_str(body)
        .map_err(|source| JudgeError::InvalidResponse { window, source })?;
    let candidates = match response {
        JudgeResponse::Bare(candidates) => candidates,
        JudgeResponse::Wrapped {
            candidates,
            warnings,
        } => {
            for message in warnings {
                warn!(window, "judge warning: {}", message);
            }
            candidates
        }
    };
    Ok(candidates
        .into_iter()
        .filter(|c| c.score.is_finite() && TimeSpan::new(c.span.start, c.span.end).is_some())
        .collect())
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
