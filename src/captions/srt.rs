//! Line-oriented caption form: index, `start --> end`, text, blank line.

use tracing::warn;

use super::timecode::{format_line_time, parse_line_time};
use super::window::ClipCue;
use crate::types::Cue;

pub fn render(cues: &[ClipCue]) -> String {
    if cues.is_empty() {
        return String::new();
    }
    let blocks: Vec<String> = cues
        .iter()
        .map(|clip_cue| {
            format!(
                "{}\n{} --> {}\n{}",
                clip_cue.index,
                format_line_time(clip_cue.cue.start),
                format_line_time(clip_cue.cue.end),
                block_text(&clip_cue.cue.text)
            )
        })
        .collect();
    blocks.join("\n\n") + "\n"
}

/// A blank line ends a block, so cue text keeps only its non-empty lines
fn block_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read a line-form document into a cue list.
///
/// Blocks without a readable timing line are skipped. Consecutive blocks with
/// identical text collapse into one cue spanning both.
pub fn parse(content: &str) -> Vec<Cue> {
    let normalized = content.replace("\r\n", "\n");
    let mut cues: Vec<Cue> = Vec::new();
    let mut skipped = 0usize;

    for block in normalized.split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }
        match parse_block(block) {
            Some(cue) => cues.push(cue),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "skipped unreadable caption blocks");
    }
    cues.sort_by(|a, b| a.start.total_cmp(&b.start));
    consolidate_repeats(cues)
}

fn parse_block(block: &str) -> Option<Cue> {
    let lines: Vec<&str> = block.trim_matches('\n').lines().collect();
    // The index line is optional; locate the timing line directly
    let timing_idx = lines.iter().position(|line| line.contains("-->"))?;
    let (raw_start, raw_end) = lines[timing_idx].split_once("-->")?;
    let start = parse_line_time(raw_start)?;
    // Trailing position settings may follow the end time
    let end = parse_line_time(raw_end.split_whitespace().next()?)?;
    if end < start {
        return None;
    }
    let text = lines[timing_idx + 1..].join("\n").trim().to_string();
    if text.is_empty() {
        return None;
    }
    Some(Cue::new(start, end, text))
}

fn consolidate_repeats(cues: Vec<Cue>) -> Vec<Cue> {
    let mut merged: Vec<Cue> = Vec::with_capacity(cues.len());
    for cue in cues {
        match merged.last_mut() {
            Some(last) if last.text == cue.text => last.end = last.end.max(cue.end),
            _ => merged.push(cue),
        }
    }
    merged
}
