use crate::types::{Cue, TimeSpan};

use super::judge::JudgeRequest;

/// One overlapping slice of a long timeline, with the cues that start inside it
#[derive(Debug, Clone)]
pub struct AnalysisWindow {
    /// Position of the window in the partition
    pub index: usize,
    pub span: TimeSpan,
    pub cues: Vec<Cue>,
}

impl AnalysisWindow {
    pub fn request(&self, max_candidates: usize) -> JudgeRequest {
        JudgeRequest {
            window_index: self.index,
            span: self.span,
            text: joined_text(&self.cues),
            cues: self.cues.clone(),
            max_candidates,
        }
    }
}

/// Split `[0, duration]` into fixed-length windows, each starting `overlap`
/// seconds before the previous one ended. Expects `window_length > overlap`.
pub fn partition(duration: f64, window_length: f64, overlap: f64) -> Vec<TimeSpan> {
    let mut spans = Vec::new();
    if !duration.is_finite() || duration <= 0.0 || window_length <= overlap {
        return spans;
    }
    let mut start = 0.0;
    loop {
        let end = (start + window_length).min(duration);
        if let Some(span) = TimeSpan::new(start, end) {
            spans.push(span);
        }
        if end >= duration {
            break;
        }
        start = end - overlap;
    }
    spans
}

/// Partition the timeline and attach cues by start time; windows left without
/// cues are dropped since there is nothing to judge in them.
pub fn build_windows(
    cues: &[Cue],
    duration: f64,
    window_length: f64,
    overlap: f64,
) -> Vec<AnalysisWindow> {
    partition(duration, window_length, overlap)
        .into_iter()
        .enumerate()
        .filter_map(|(index, span)| {
            let window_cues: Vec<Cue> = cues
                .iter()
                .filter(|cue| span.contains(cue.start))
                .cloned()
                .collect();
            (!window_cues.is_empty()).then_some(AnalysisWindow {
                index,
                span,
                cues: window_cues,
            })
        })
        .collect()
}

/// Single window covering the whole track, used when chunking is bypassed
pub fn whole_track(cues: &[Cue], duration: f64) -> Option<AnalysisWindow> {
    let span = TimeSpan::new(0.0, duration)?;
    Some(AnalysisWindow {
        index: 0,
        span,
        cues: cues.to_vec(),
    })
}

fn joined_text(cues: &[Cue]) -> String {
    cues.iter()
        .map(|cue| cue.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_with_overlap() {
        let spans = partition(1300.0, 300.0, 30.0);
        let bounds: Vec<(f64, f64)> = spans.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(
            bounds,
            vec![
                (0.0, 300.0),
                (270.0, 570.0),
                (540.0, 840.0),
                (810.0, 1110.0),
                (1080.0, 1300.0),
            ]
        );
    }

    #[test]
    fn every_instant_is_covered() {
        let spans = partition(2345.6, 300.0, 30.0);
        assert_eq!(spans.first().map(|s| s.start), Some(0.0));
        assert_eq!(spans.last().map(|s| s.end), Some(2345.6));
        for pair in spans.windows(2) {
            assert!((pair[0].end - pair[1].start - 30.0).abs() < 1e-9);
        }
    }

    #[test]
    fn degenerate_inputs_produce_no_windows() {
        assert!(partition(0.0, 300.0, 30.0).is_empty());
        assert!(partition(1000.0, 30.0, 30.0).is_empty());
    }

    #[test]
    fn cues_are_assigned_by_start_and_empty_windows_skipped() {
        let cues = vec![
            Cue::new(10.0, 20.0, "early"),
            Cue::new(280.0, 290.0, "overlap zone"),
            Cue::new(1250.0, 1260.0, "late"),
        ];
        let windows = build_windows(&cues, 1300.0, 300.0, 30.0);
        let summary: Vec<(usize, usize)> =
            windows.iter().map(|w| (w.index, w.cues.len())).collect();
        // Window 2 (540-840) and 3 (810-1110) hold no cue starts
        assert_eq!(summary, vec![(0, 2), (1, 1), (4, 1)]);
        assert_eq!(windows[0].request(4).text, "early overlap zone");
        assert_eq!(windows[0].request(4).max_candidates, 4);
    }
}
