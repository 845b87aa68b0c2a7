/// Formats a duration in seconds as `m:ss`.
///
/// # Example
///
/// ```
/// use baixabot::core::utils::format_duration;
///
/// assert_eq!(format_duration(185), "3:05");
/// ```
pub fn format_duration(seconds: u32) -> String {
    let minutes = seconds / 60;
    let secs = seconds % 60;
    format!("{}:{:02}", minutes, secs)
}

/// Formats a byte count as megabytes with one decimal, e.g. `12.3`.
pub fn format_size_mb(bytes: u64) -> String {
    format!("{:.1}", bytes as f64 / (1024.0 * 1024.0))
}
