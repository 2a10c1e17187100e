use crate::types::{Cue, TimeSpan};

/// Nudge a judged span onto natural pauses: the start moves to a nearby cue
/// start, the end to a nearby cue end that closes a sentence. A side with no
/// match within `tolerance` stays where the judge put it.
pub fn refine_to_natural_pauses(span: TimeSpan, cues: &[Cue], tolerance: f64) -> TimeSpan {
    let start = cues
        .iter()
        .find(|cue| (cue.start - span.start).abs() <= tolerance)
        .map_or(span.start, |cue| cue.start);
    let end = cues
        .iter()
        .find(|cue| cue.ends_sentence() && (cue.end - span.end).abs() <= tolerance)
        .map_or(span.end, |cue| cue.end);

    // Snapping both sides toward each other must not collapse the span
    TimeSpan::new(start, end).unwrap_or(span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cues() -> Vec<Cue> {
        vec![
            Cue::new(98.4, 103.0, "So here is the thing"),
            Cue::new(103.5, 158.8, "it all came down to timing."),
            Cue::new(159.5, 162.0, "and then"),
        ]
    }

    #[test]
    fn snaps_both_edges() {
        let span = TimeSpan::new(100.0, 160.0).unwrap();
        let refined = refine_to_natural_pauses(span, &cues(), 2.0);
        assert_eq!(refined, TimeSpan::new(98.4, 158.8).unwrap());
    }

    #[test]
    fn end_ignores_cues_without_terminal_punctuation() {
        let span = TimeSpan::new(100.0, 162.5).unwrap();
        let refined = refine_to_natural_pauses(span, &cues(), 2.0);
        // 162.0 is close but "and then" does not end a sentence
        assert_eq!(refined.end, 162.5);
        assert_eq!(refined.start, 98.4);
    }

    #[test]
    fn out_of_tolerance_keeps_proposal() {
        let span = TimeSpan::new(120.0, 140.0).unwrap();
        assert_eq!(refine_to_natural_pauses(span, &cues(), 2.0), span);
    }
}
