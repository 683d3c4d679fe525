//! Human-readable speed and duration strings.

pub const ZERO_SPEED: &str = "0 B/s";
pub const NO_DURATION: &str = "--:--";

const UNITS: [&str; 8] = ["", "K", "M", "G", "T", "P", "E", "Z"];

/// Binary (1024) steps, one decimal digit. Missing, negative or non-finite
/// input renders as [`ZERO_SPEED`].
pub fn format_bytes_per_second(value: Option<f64>) -> String {
    let mut num = match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => return ZERO_SPEED.to_string(),
    };
    for unit in UNITS {
        if num < 1024.0 {
            return format!("{num:.1} {unit}B/s");
        }
        num /= 1024.0;
    }
    format!("{num:.1} YB/s")
}

/// `MM:SS` under an hour, `HH:MM:SS` otherwise. Fractional seconds are
/// truncated; zero, missing and infinite input render as [`NO_DURATION`].
pub fn format_duration(seconds: Option<f64>) -> String {
    let secs = match seconds {
        Some(s) if s.is_finite() && s > 0.0 => s as u64,
        _ => return NO_DURATION.to_string(),
    };
    let (m, s) = (secs / 60, secs % 60);
    let (h, m) = (m / 60, m % 60);
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
