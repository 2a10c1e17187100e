//! Styled caption form with optional progressive highlight markup.

use super::timecode::{centiseconds, format_styled_time};
use super::window::ClipCue;
use super::AssStyle;
use crate::types::WordTiming;

// Colours are &HAABBGGRR
const PRIMARY_COLOUR: &str = "&H00FFFFFF";
const SECONDARY_COLOUR: &str = "&H0000FFFF";
const OUTLINE_COLOUR: &str = "&H00000000";
const BACK_COLOUR: &str = "&H80000000";

const HIGHLIGHT_ON: &str = r"{\c&H00FFFF&\b1}";
const HIGHLIGHT_OFF: &str = r"{\c&HFFFFFF&\b1}";
const DIM_ON: &str = r"{\alpha&H80&}";
const DIM_OFF: &str = r"{\alpha&H00&}";

pub fn header() -> String {
    format!(
        "[Script Info]\n\
         Title: Clip Captions\n\
         ScriptType: v4.00+\n\
         PlayResX: 1080\n\
         PlayResY: 1920\n\
         WrapStyle: 0\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Default,Arial,48,{p},{s},{o},{b},1,0,0,0,100,100,0,0,1,3,1,2,10,10,60,1\n\
         Style: Highlight,Arial,48,{s},{p},{o},{b},1,0,0,0,100,100,0,0,1,3,1,2,10,10,60,1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
        p = PRIMARY_COLOUR,
        s = SECONDARY_COLOUR,
        o = OUTLINE_COLOUR,
        b = BACK_COLOUR,
    )
}

/// Render a full styled document: header plus one or more events per cue
pub fn render(cues: &[ClipCue], style: AssStyle, words_per_line: usize) -> String {
    let mut document = header();
    for clip_cue in cues {
        let cue = &clip_cue.cue;
        match style {
            AssStyle::Karaoke if !cue.words.is_empty() => {
                push_event(&mut document, cue.start, cue.end, &karaoke_text(&cue.words));
            }
            AssStyle::WordByWord if !cue.words.is_empty() => {
                for line in cue.words.chunks(words_per_line.max(1)) {
                    for (current, word) in line.iter().enumerate() {
                        push_event(&mut document, word.start, word.end, &highlight_text(line, current));
                    }
                }
            }
            _ => push_event(&mut document, cue.start, cue.end, &plain_text(&cue.text)),
        }
    }
    document
}

/// `Dialogue: Layer,Start,End,Style,Name,MarginL,MarginR,MarginV,Effect,Text`
pub fn dialogue_line(start: f64, end: f64, text: &str) -> String {
    format!(
        "Dialogue: 0,{},{},Default,,0,0,0,,{}",
        format_styled_time(start),
        format_styled_time(end),
        text
    )
}

fn push_event(document: &mut String, start: f64, end: f64, text: &str) {
    document.push_str(&dialogue_line(start, end, text));
    document.push('\n');
}

fn plain_text(text: &str) -> String {
    text.trim().lines().map(str::trim).collect::<Vec<_>>().join(r"\N")
}

/// `{\kfNN}word` per word, NN being the word duration in centiseconds
fn karaoke_text(words: &[WordTiming]) -> String {
    words
        .iter()
        .map(|word| {
            format!(
                r"{{\kf{}}}{}",
                centiseconds(word.end - word.start),
                word.token.trim()
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole line visible: spoken words plain, current word highlighted, upcoming dimmed
fn highlight_text(line: &[WordTiming], current: usize) -> String {
    line.iter()
        .enumerate()
        .map(|(idx, word)| {
            let token = word.token.trim();
            if idx == current {
                format!("{}{}{}", HIGHLIGHT_ON, token, HIGHLIGHT_OFF)
            } else if idx < current {
                token.to_string()
            } else {
                format!("{}{}{}", DIM_ON, token, DIM_OFF)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::window::extract_window;
    use crate::types::Cue;

    fn word(start: f64, end: f64, token: &str) -> WordTiming {
        WordTiming {
            start,
            end,
            token: token.to_string(),
        }
    }

    fn events(document: &str) -> Vec<&str> {
        document
            .lines()
            .filter(|line| line.starts_with("Dialogue:"))
            .collect()
    }

    #[test]
    fn header_declares_styles_and_event_format() {
        let header = header();
        assert!(header.starts_with("[Script Info]\n"));
        assert!(header.contains("\nStyle: Default,Arial,48,&H00FFFFFF,&H0000FFFF,"));
        assert!(header.contains("\nStyle: Highlight,Arial,48,&H0000FFFF,&H00FFFFFF,"));
        assert!(header.ends_with(
            "[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n"
        ));
    }

    #[test]
    fn standard_style_emits_one_event_per_cue() {
        let cues = vec![
            Cue::new(10.0, 12.5, "first\nsecond line"),
            Cue::new(13.0, 14.0, "next"),
        ];
        let doc = render(&extract_window(&cues, 10.0, 20.0), AssStyle::Standard, 4);
        assert_eq!(
            events(&doc),
            vec![
                r"Dialogue: 0,0:00:00.00,0:00:02.50,Default,,0,0,0,,first\Nsecond line",
                "Dialogue: 0,0:00:03.00,0:00:04.00,Default,,0,0,0,,next",
            ]
        );
    }

    #[test]
    fn karaoke_encodes_word_durations() {
        let cue = Cue::new(0.0, 1.2, "hey you").with_words(vec![
            word(0.0, 0.45, "hey"),
            word(0.5, 1.2, "you"),
        ]);
        let doc = render(&extract_window(&[cue], 0.0, 5.0), AssStyle::Karaoke, 4);
        assert_eq!(
            events(&doc),
            vec![r"Dialogue: 0,0:00:00.00,0:00:01.20,Default,,0,0,0,,{\kf45}hey {\kf70}you"]
        );
    }

    #[test]
    fn karaoke_without_words_falls_back_to_text() {
        let cue = Cue::new(0.0, 2.0, "no timings");
        let doc = render(&extract_window(&[cue], 0.0, 5.0), AssStyle::Karaoke, 4);
        assert_eq!(
            events(&doc),
            vec!["Dialogue: 0,0:00:00.00,0:00:02.00,Default,,0,0,0,,no timings"]
        );
    }

    #[test]
    fn word_by_word_highlights_each_word_in_its_line() {
        let cue = Cue::new(0.0, 1.5, "one two three").with_words(vec![
            word(0.0, 0.5, "one"),
            word(0.5, 1.0, "two"),
            word(1.0, 1.5, "three"),
        ]);
        let doc = render(&extract_window(&[cue], 0.0, 5.0), AssStyle::WordByWord, 2);
        let lines = events(&doc);
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            r"Dialogue: 0,0:00:00.00,0:00:00.50,Default,,0,0,0,,{\c&H00FFFF&\b1}one{\c&HFFFFFF&\b1} {\alpha&H80&}two{\alpha&H00&}"
        );
        assert_eq!(
            lines[1],
            r"Dialogue: 0,0:00:00.50,0:00:01.00,Default,,0,0,0,,one {\c&H00FFFF&\b1}two{\c&HFFFFFF&\b1}"
        );
        // Third word starts a new line of its own
        assert_eq!(
            lines[2],
            r"Dialogue: 0,0:00:01.00,0:00:01.50,Default,,0,0,0,,{\c&H00FFFF&\b1}three{\c&HFFFFFF&\b1}"
        );
    }

    #[test]
    fn empty_window_is_header_only() {
        assert_eq!(render(&[], AssStyle::Standard, 4), header());
    }
}
