//! Per-clip caption extraction and the two caption serializations
//!
//! The output format is always chosen explicitly by the caller through
//! [`CaptionFormat`]; nothing here looks at file names.

pub mod ass;
pub mod srt;
pub mod timecode;
pub mod window;

use serde::{Deserialize, Serialize};

use crate::types::{Cue, TimeSpan};

pub use window::{extract_span, extract_window, ClipCue};

/// Highlight behaviour of the styled form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssStyle {
    /// One event per cue with its full text
    #[default]
    Standard,
    /// One event per cue, word durations encoded as `\kf` markup
    Karaoke,
    /// One event per word, current word highlighted within its line
    WordByWord,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionFormat {
    /// Line form: index, `HH:MM:SS,mmm --> HH:MM:SS,mmm`, text
    #[default]
    Srt,
    /// Styled form with a style header and `Dialogue:` events
    Ass(AssStyle),
}

impl CaptionFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CaptionFormat::Srt => "srt",
            CaptionFormat::Ass(_) => "ass",
        }
    }
}

/// Rendered captions together with the format they were rendered in
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionDocument {
    pub format: CaptionFormat,
    pub cue_count: usize,
    pub body: String,
}

pub fn render(cues: &[ClipCue], format: CaptionFormat, words_per_line: usize) -> CaptionDocument {
    let body = match format {
        CaptionFormat::Srt => srt::render(cues),
        CaptionFormat::Ass(style) => ass::render(cues, style, words_per_line),
    };
    CaptionDocument {
        format,
        cue_count: cues.len(),
        body,
    }
}

/// Extract the clip's window from the global track and render it
pub fn render_clip(
    cues: &[Cue],
    span: TimeSpan,
    format: CaptionFormat,
    words_per_line: usize,
) -> CaptionDocument {
    render(&extract_span(cues, span), format, words_per_line)
}
