use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::captions::{srt, AssStyle, CaptionFormat};
use crate::config::PipelineConfig;
use crate::pipeline::ProcessingMode;
use crate::types::{CandidateSegment, Cue, JobInput};

/// cutline - find good cut points in long recordings and caption the clips
#[derive(Parser, Debug)]
#[command(name = "cutline")]
#[command(version = "0.1.0")]
#[command(about = "Timeline segmentation and clip captioning", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan sequential cut points for a job input.
    Plan(PlanArgs),
    /// Extract one clip's captions from a cue track.
    Captions(CaptionArgs),
    /// Merge a pooled candidate list offline.
    Reconcile(ReconcileArgs),
    /// Run the whole pipeline and write a plan plus per-clip captions.
    Run(RunArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CueFormat {
    /// JSON array of cues, or an object with a `cues` field
    Json,
    /// Line-form caption document
    Srt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaptionStyle {
    Srt,
    Ass,
    Karaoke,
    WordByWord,
}

impl From<CaptionStyle> for CaptionFormat {
    fn from(style: CaptionStyle) -> Self {
        match style {
            CaptionStyle::Srt => CaptionFormat::Srt,
            CaptionStyle::Ass => CaptionFormat::Ass(AssStyle::Standard),
            CaptionStyle::Karaoke => CaptionFormat::Ass(AssStyle::Karaoke),
            CaptionStyle::WordByWord => CaptionFormat::Ass(AssStyle::WordByWord),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Sequential,
    Ranked,
    Refined,
}

impl From<ModeArg> for ProcessingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sequential => ProcessingMode::Sequential,
            ModeArg::Ranked => ProcessingMode::Ranked,
            ModeArg::Refined => ProcessingMode::Refined,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON pipeline configuration; missing fields keep their defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Minimum clip duration in seconds.
    #[arg(long)]
    pub min_duration: Option<f64>,
    /// Maximum clip duration in seconds.
    #[arg(long)]
    pub max_duration: Option<f64>,
    /// Preferred clip duration in seconds.
    #[arg(long)]
    pub ideal_duration: Option<f64>,
    /// Caption output format.
    #[arg(long, value_enum)]
    pub format: Option<CaptionStyle>,
}

impl ConfigArgs {
    /// Load the config file, apply flag overrides, validate
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;
        if let Some(min) = self.min_duration {
            config.planner.min_duration = min;
        }
        if let Some(max) = self.max_duration {
            config.planner.max_duration = max;
        }
        if let Some(ideal) = self.ideal_duration {
            config.planner.ideal_duration = ideal;
        }
        if let Some(format) = self.format {
            config.captions.format = format.into();
        }
        config.validate().context("Invalid pipeline configuration")?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Job input JSON (duration, cues, silences, topic changes).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Write the cut points as JSON to this file.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CaptionArgs {
    /// Cue track to cut from.
    #[arg(value_name = "CUES")]
    pub cues: PathBuf,
    /// How the cue track is encoded.
    #[arg(long, value_enum)]
    pub cue_format: CueFormat,
    /// Clip start (seconds or HH:MM:SS.mmm).
    #[arg(long, value_name = "TIME")]
    pub start: String,
    /// Clip end (seconds or HH:MM:SS.mmm).
    #[arg(long, value_name = "TIME")]
    pub end: String,
    #[arg(long, value_enum, default_value_t = CaptionStyle::Srt)]
    pub format: CaptionStyle,
    #[arg(long, default_value_t = 4)]
    pub words_per_line: usize,
    /// Write captions to this file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

impl CaptionArgs {
    pub fn clip_range(&self) -> Result<(f64, f64)> {
        let start = parse_time_to_seconds(&self.start)
            .with_context(|| format!("Invalid start time '{}'", self.start))?;
        let end = parse_time_to_seconds(&self.end)
            .with_context(|| format!("Invalid end time '{}'", self.end))?;
        ensure!(end > start, "End time must be greater than start time");
        ensure!(self.words_per_line > 0, "words-per-line must be at least 1");
        Ok((start, end))
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    /// JSON array of candidates pooled from several windows.
    #[arg(value_name = "CANDIDATES")]
    pub candidates: PathBuf,
    /// Candidates starting closer than this are duplicates.
    #[arg(long, default_value_t = 10.0)]
    pub proximity: f64,
    #[arg(long, default_value_t = 10)]
    pub max_clips: usize,
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Job input JSON.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
    /// Directory receiving plan.json, caption files and the job record.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = ModeArg::Sequential)]
    pub mode: ModeArg,
    /// Judge command line; receives request JSON on stdin.
    #[arg(long, value_name = "COMMAND")]
    pub judge_cmd: Option<String>,
    /// Replace the input's cues with a separate cue track.
    #[arg(long, value_name = "PATH", requires = "cue_format")]
    pub cues: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub cue_format: Option<CueFormat>,
    /// Job identifier; defaults to the input file stem, suffixed when taken.
    #[arg(long)]
    pub job_id: Option<String>,
    #[arg(long)]
    pub max_clips: Option<usize>,
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl RunArgs {
    /// An explicit `--job-id` is used as is. Otherwise the input stem, then
    /// `stem-2`, `stem-3`, ... until `taken` reports a free id.
    pub fn job_id(&self, taken: impl Fn(&str) -> bool) -> String {
        if let Some(id) = &self.job_id {
            return id.clone();
        }
        let stem = self
            .input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "job".to_string());
        if !taken(&stem) {
            return stem;
        }
        let mut n = 2usize;
        loop {
            let id = format!("{}-{}", stem, n);
            if !taken(&id) {
                return id;
            }
            n += 1;
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CueDocument {
    Bare(Vec<Cue>),
    Wrapped { cues: Vec<Cue> },
}

pub fn load_job_input(path: &Path) -> Result<JobInput> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read job input {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse job input {:?}", path))
}

pub fn load_cues(path: &Path, format: CueFormat) -> Result<Vec<Cue>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read cue file {:?}", path))?;
    match format {
        CueFormat::Srt => Ok(srt::parse(&raw)),
        CueFormat::Json => {
            let doc: CueDocument = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse cue JSON {:?}", path))?;
            Ok(match doc {
                CueDocument::Bare(cues) | CueDocument::Wrapped { cues } => cues,
            })
        }
    }
}

pub fn load_candidates(path: &Path) -> Result<Vec<CandidateSegment>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read candidates {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse candidates {:?}", path))
}

pub fn parse_time_to_seconds(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.contains(':') {
        return parse_hms_time(raw);
    }

    let seconds: f64 = raw
        .parse()
        .with_context(|| format!("Failed to parse seconds value '{}'", raw))?;
    ensure!(
        seconds.is_finite() && seconds >= 0.0,
        "Time values must be non-negative"
    );
    Ok(seconds)
}

fn parse_hms_time(raw: &str) -> Result<f64> {
    let parts: Vec<&str> = raw.split(':').collect();
    ensure!(
        (2..=3).contains(&parts.len()),
        "Time format must be MM:SS or HH:MM:SS"
    );

    let component = |value: &str, label: &str| -> Result<f64> {
        let parsed = value
            .parse::<f64>()
            .with_context(|| format!("Invalid {} component '{}'", label, value))?;
        ensure!(parsed >= 0.0, "{} must be non-negative", label);
        Ok(parsed)
    };

    let n = parts.len();
    let seconds = component(parts[n - 1], "seconds")?;
    let minutes = component(parts[n - 2], "minutes")?;
    let hours = if n == 3 {
        component(parts[0], "hours")?
    } else {
        0.0
    };

    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_time_seconds() {
        assert_eq!(parse_time_to_seconds("12.5").unwrap(), 12.5);
    }

    #[test]
    fn parse_time_hms() {
        let result = parse_time_to_seconds("01:02:03.5").unwrap();
        let expected = 3600.0 + 120.0 + 3.5;
        assert!((result - expected).abs() < 1e-6);
        assert!((parse_time_to_seconds("2:30").unwrap() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn parse_time_rejects_garbage() {
        assert!(parse_time_to_seconds("-4").is_err());
        assert!(parse_time_to_seconds("1:2:3:4").is_err());
        assert!(parse_time_to_seconds("ab:10").is_err());
    }

    #[test]
    fn captions_require_explicit_cue_format() {
        let missing = Cli::try_parse_from([
            "cutline", "captions", "cues.json", "--start", "0", "--end", "5",
        ]);
        assert!(missing.is_err());

        let cli = Cli::try_parse_from([
            "cutline",
            "captions",
            "talk.srt",
            "--cue-format",
            "srt",
            "--start",
            "00:01:00",
            "--end",
            "90",
            "--format",
            "word-by-word",
        ])
        .unwrap();
        let Command::Captions(args) = cli.command else {
            panic!("expected captions subcommand");
        };
        assert_eq!(args.cue_format, CueFormat::Srt);
        assert_eq!(args.clip_range().unwrap(), (60.0, 90.0));
        assert_eq!(
            CaptionFormat::from(args.format),
            CaptionFormat::Ass(AssStyle::WordByWord)
        );
    }

    #[test]
    fn run_defaults_and_overrides() {
        let cli = Cli::try_parse_from([
            "cutline",
            "run",
            "episode-12.json",
            "out",
            "--mode",
            "refined",
            "--min-duration",
            "30",
            "--max-duration",
            "45",
            "--ideal-duration",
            "40",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.job_id(|_| false), "episode-12");
        assert_eq!(ProcessingMode::from(args.mode), ProcessingMode::Refined);
        let config = args.config.resolve().unwrap();
        assert_eq!(config.planner.min_duration, 30.0);
        assert_eq!(config.planner.max_duration, 45.0);
    }

    #[test]
    fn default_job_id_skips_taken_names() {
        let cli = Cli::try_parse_from(["cutline", "run", "talk.json", "out"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        let taken = ["talk", "talk-2"];
        assert_eq!(args.job_id(|id| taken.contains(&id)), "talk-3");

        let cli = Cli::try_parse_from(["cutline", "run", "talk.json", "out", "--job-id", "talk"])
            .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.job_id(|id| taken.contains(&id)), "talk");
    }

    #[test]
    fn inverted_duration_override_is_rejected() {
        let args = ConfigArgs {
            min_duration: Some(90.0),
            ..ConfigArgs::default()
        };
        assert!(args.resolve().is_err());
    }
}
