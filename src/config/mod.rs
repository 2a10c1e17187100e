use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::captions::CaptionFormat;
use crate::error::ConfigError;

/// Span limits and scan resolution for the greedy planner
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub min_duration: f64, // seconds
    pub max_duration: f64, // seconds
    pub ideal_duration: f64,
    pub scan_step: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_duration: 60.0,
            max_duration: 80.0,
            ideal_duration: 70.0,
            scan_step: 1.0,
        }
    }
}

/// Tunable constants of the boundary score
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub silence_bonus: f64,
    pub silence_pad: f64,
    pub topic_weight: f64,
    pub topic_tolerance: f64,
    pub pause_weight: f64,
    pub pause_min_gap: f64,
    pub pause_gap_cap: f64,
    pub pause_margin: f64,
    pub sentence_bonus: f64,
    pub sentence_tolerance: f64,
    pub snap_radius: f64,
    pub mid_speech_penalty: f64,
    pub mid_speech_min_chars: usize,
    pub edge_penalty: f64,
    pub edge_margin: f64,
    pub duration_peak: f64,
    pub duration_decay: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            silence_bonus: 3.0,
            silence_pad: 1.0,
            topic_weight: 2.5,
            topic_tolerance: 5.0,
            pause_weight: 3.5,
            pause_min_gap: 0.3,
            pause_gap_cap: 2.0,
            pause_margin: 0.5,
            sentence_bonus: 4.0,
            sentence_tolerance: 2.0,
            snap_radius: 1.0,
            mid_speech_penalty: 3.0,
            mid_speech_min_chars: 10,
            edge_penalty: 1.0,
            edge_margin: 5.0,
            duration_peak: 1.5,
            duration_decay: 20.0,
        }
    }
}

/// Long-input windowing and judge dispatch settings
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub long_input_threshold: f64,
    pub window_length: f64,
    pub overlap: f64,
    pub max_parallel: usize,
    pub proximity_threshold: f64,
    pub judge_timeout_secs: f64,
    pub max_clips: usize,
    /// Tolerance used when refining judged spans to natural pauses
    pub refine_tolerance: f64,
}

impl ChunkingConfig {
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.judge_timeout_secs)
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            long_input_threshold: 1200.0,
            window_length: 300.0,
            overlap: 30.0,
            max_parallel: 3,
            proximity_threshold: 10.0,
            judge_timeout_secs: 120.0,
            max_clips: 10,
            refine_tolerance: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub format: CaptionFormat,
    /// Extra context added to interior clip edges of sequential plans
    pub cut_margin: f64,
    pub words_per_line: usize,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            format: CaptionFormat::Srt,
            cut_margin: 1.5,
            words_per_line: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub planner: PlannerConfig,
    pub weights: ScoringWeights,
    pub chunking: ChunkingConfig,
    pub captions: CaptionConfig,
}

impl PipelineConfig {
    /// Load from an optional JSON file; missing fields keep their defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        Self::from_json(&raw).with_context(|| format!("failed to parse config file {:?}", path))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("invalid pipeline config JSON")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let planner = &self.planner;
        positive("planner.min_duration", planner.min_duration)?;
        positive("planner.max_duration", planner.max_duration)?;
        positive("planner.scan_step", planner.scan_step)?;
        if planner.min_duration >= planner.max_duration {
            return Err(ConfigError::DurationRange {
                min: planner.min_duration,
                max: planner.max_duration,
            });
        }
        positive("weights.duration_decay", self.weights.duration_decay)?;

        let chunking = &self.chunking;
        positive("chunking.window_length", chunking.window_length)?;
        positive("chunking.judge_timeout_secs", chunking.judge_timeout_secs)?;
        if chunking.overlap < 0.0 || chunking.window_length <= chunking.overlap {
            return Err(ConfigError::WindowOverlap {
                window: chunking.window_length,
                overlap: chunking.overlap,
            });
        }
        if chunking.max_parallel == 0 {
            return Err(ConfigError::Zero {
                field: "chunking.max_parallel",
            });
        }
        if chunking.max_clips == 0 {
            return Err(ConfigError::Zero {
                field: "chunking.max_clips",
            });
        }
        if self.captions.words_per_line == 0 {
            return Err(ConfigError::Zero {
                field: "captions.words_per_line",
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::AssStyle;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.planner.ideal_duration, 70.0);
        assert_eq!(config.chunking.judge_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn rejects_inverted_duration_range() {
        let mut config = PipelineConfig::default();
        config.planner.min_duration = 80.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::DurationRange {
                min: 80.0,
                max: 80.0
            })
        );
    }

    #[test]
    fn rejects_overlap_longer_than_window() {
        let mut config = PipelineConfig::default();
        config.chunking.overlap = 300.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WindowOverlap { .. })
        ));
    }

    #[test]
    fn rejects_zero_fan_out() {
        let mut config = PipelineConfig::default();
        config.chunking.max_parallel = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Zero { .. })));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(
            r#"{"planner": {"min_duration": 20, "max_duration": 40},
                "captions": {"format": {"ass": "karaoke"}}}"#,
        )
        .unwrap();
        assert_eq!(config.planner.min_duration, 20.0);
        assert_eq!(config.planner.scan_step, 1.0);
        assert_eq!(config.chunking.window_length, 300.0);
        assert_eq!(config.captions.format, CaptionFormat::Ass(AssStyle::Karaoke));
    }

    #[test]
    fn load_without_path_uses_defaults() {
        let config = PipelineConfig::load(None).unwrap();
        assert_eq!(config.chunking.max_parallel, 3);
    }
}
