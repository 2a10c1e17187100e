//! Timestamp formatting for both caption serializations.
//!
//! Times are rounded to the nearest unit of the target precision; negative
//! times clamp to zero.

/// `HH:MM:SS,mmm`
pub fn format_line_time(seconds: f64) -> String {
    let total_ms = to_units(seconds, 1000.0);
    let (hours, minutes, secs) = split_hms(total_ms / 1000);
    format!(
        "{:02}:{:02}:{:02},{:03}",
        hours,
        minutes,
        secs,
        total_ms % 1000
    )
}

/// `H:MM:SS.cc`
pub fn format_styled_time(seconds: f64) -> String {
    let total_cs = to_units(seconds, 100.0);
    let (hours, minutes, secs) = split_hms(total_cs / 100);
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, total_cs % 100)
}

/// Whole centiseconds covered by a duration, as used by karaoke markup
pub fn centiseconds(duration: f64) -> u64 {
    to_units(duration, 100.0)
}

/// Parse `HH:MM:SS,mmm`, also accepting `.` as the fraction separator
pub fn parse_line_time(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *s),
        [m, s] => (0, m.parse::<u64>().ok()?, *s),
        _ => return None,
    };
    let seconds: f64 = seconds.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some((hours * 3600 + minutes * 60) as f64 + seconds)
}

fn to_units(seconds: f64, per_second: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * per_second).round() as u64
    } else {
        0
    }
}

fn split_hms(total_secs: u64) -> (u64, u64, u64) {
    (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60)
}
