//! Human-readable duration formatting
//!
//! Provides consistent elapsed/ETA display across gqa progress output.

/// Format thresholds (seconds)
const SECONDS_FORMAT_MAX: f64 = 60.0; // < 1m → X.Xs
const MINUTES_FORMAT_MAX: f64 = 3600.0; // < 1h → Mm Ss
                                        // >= 1h → Hh Mm

/// Format seconds as a short human-readable duration.
///
/// - Under a minute: one decimal place (`12.3s`)
/// - Under an hour: whole minutes and seconds (`4m 5s`)
/// - Otherwise: whole hours and minutes (`1h 2m`)
///
/// Negative and non-finite inputs are clamped to zero.
///
/// # Examples
///
/// ```
/// use gqa_common::human_time::format_duration;
///
/// assert_eq!(format_duration(12.34), "12.3s");
/// assert_eq!(format_duration(245.0), "4m 5s");
/// assert_eq!(format_duration(3720.0), "1h 2m");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };

    if seconds < SECONDS_FORMAT_MAX {
        format!("{:.1}s", seconds)
    } else if seconds < MINUTES_FORMAT_MAX {
        let total = seconds as u64;
        format!("{}m {}s", total / 60, total % 60)
    } else {
        let total = seconds as u64;
        format!("{}h {}m", total / 3600, (total % 3600) / 60)
    }
}

/// Format a rate as items per second with two decimals (`3.25 rows/s`)
///
/// Returns `None` when no time has elapsed.
pub fn format_throughput(items: usize, elapsed_seconds: f64, unit: &str) -> Option<String> {
    if elapsed_seconds > 0.0 {
        Some(format!("{:.2} {}/s", items as f64 / elapsed_seconds, unit))
    } else {
        None
    }
}
