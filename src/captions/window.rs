use crate::types::{Cue, TimeSpan, WordTiming};

/// A cue re-expressed on a clip's own timeline, numbered from 1
#[derive(Debug, Clone, PartialEq)]
pub struct ClipCue {
    pub index: usize,
    pub cue: Cue,
}

/// Retime the global cue track onto the clip `[clip_start, clip_end)`.
///
/// Cues outside the clip are dropped, cues straddling an edge are truncated,
/// and survivors are renumbered. Word timings are shifted but not clamped, so a
/// highlight may overrun a truncated edge slightly.
pub fn extract_window(cues: &[Cue], clip_start: f64, clip_end: f64) -> Vec<ClipCue> {
    let clip_length = clip_end - clip_start;
    cues.iter()
        .filter(|cue| cue.end > clip_start && cue.start < clip_end)
        .filter_map(|cue| {
            let start = (cue.start - clip_start).max(0.0);
            let end = clip_length.min(cue.end - clip_start);
            (end > start).then(|| Cue {
                start,
                end,
                text: cue.text.clone(),
                words: shift_words(&cue.words, clip_start),
            })
        })
        .enumerate()
        .map(|(idx, cue)| ClipCue {
            index: idx + 1,
            cue,
        })
        .collect()
}

pub fn extract_span(cues: &[Cue], span: TimeSpan) -> Vec<ClipCue> {
    extract_window(cues, span.start, span.end)
}

fn shift_words(words: &[WordTiming], offset: f64) -> Vec<WordTiming> {
    words
        .iter()
        .map(|word| WordTiming {
            start: word.start - offset,
            end: word.end - offset,
            token: word.token.clone(),
        })
        .collect()
}
