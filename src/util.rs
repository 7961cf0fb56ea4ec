//! Formatting helpers for media times.

/// Formats a media time in seconds as `m:ss` or `h:mm:ss`.
///
/// Infinite times are live sources and print as `live`; negative and
/// non-number times clamp to zero.
///
/// # Examples
///
/// ```rust
/// use sharecast::util::format_time;
///
/// assert_eq!(format_time(75.4), "1:15");
/// assert_eq!(format_time(3725.0), "1:02:05");
/// assert_eq!(format_time(f64::INFINITY), "live");
/// ```
#[must_use]
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_time(seconds: f64) -> String {
    if seconds.is_infinite() && seconds > 0.0 {
        return "live".to_owned();
    }

    let total = if seconds.is_finite() {
        seconds.max(0.0) as u64
    } else {
        0
    };
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Formats a playback position against its duration, e.g. `0:42/3:00`.
#[must_use]
pub fn format_progress(position: f64, duration: f64) -> String {
    format!("{}/{}", format_time(position), format_time(duration))
}
