use chrono::TimeDelta;

/// Format an elapsed time as `H:MM:SS`, dropping fractional seconds.
///
/// Negative values get a leading `-`.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let negative = elapsed < TimeDelta::zero();
    let secs = elapsed.abs().num_seconds();

    let (mins, secs) = (secs / 60, secs % 60);
    let (hours, mins) = (mins / 60, mins % 60);

    let sign = if negative { "-" } else { "" };
    format!("{sign}{hours}:{mins:02}:{secs:02}")
}

/// Like [format_elapsed], with `none` used when there is nothing to format.
pub fn format_elapsed_opt(elapsed: Option<TimeDelta>, none: &str) -> String {
    elapsed.map(format_elapsed).unwrap_or_else(|| none.to_string())
}
