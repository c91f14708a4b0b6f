/// Clamps `value` into `[min, max]`, mapping NaN to `min`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// Non-negative finite seconds, with anything else mapped to zero.
pub fn sanitize_seconds(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Formats seconds as `m:ss`, or `h:mm:ss` past the hour.
pub fn format_clock(seconds: f64) -> String {
    let total = sanitize_seconds(seconds).floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

pub fn epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
