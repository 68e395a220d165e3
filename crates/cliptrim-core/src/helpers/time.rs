// crates/cliptrim-core/src/helpers/time.rs

/// Format a playhead position as `M:SS.d` for the transport readout.
///
/// ```
/// use cliptrim_core::helpers::time::format_time;
/// assert_eq!(format_time(0.0), "0:00.0");
/// assert_eq!(format_time(65.43), "1:05.4");
/// assert_eq!(format_time(600.0), "10:00.0");
/// ```
pub fn format_time(secs: f64) -> String {
    let secs = secs.max(0.0);
    let m = (secs / 60.0) as u64;
    let s = secs % 60.0;
    format!("{}:{:04.1}", m, s)
}

/// Format a clip duration as `M:SS`, whole seconds.
///
/// ```
/// use cliptrim_core::helpers::time::format_duration;
/// assert_eq!(format_duration(9.7), "0:10");
/// assert_eq!(format_duration(83.0), "1:23");
/// ```
pub fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format a byte count with one decimal, `KB` through `GB`.
///
/// ```
/// use cliptrim_core::helpers::time::format_size;
/// assert_eq!(format_size(512), "0.5 KB");
/// assert_eq!(format_size(48_234_496), "46.0 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= MB * 1024.0 {
        format!("{:.1} GB", b / (MB * 1024.0))
    } else if b >= MB {
        format!("{:.1} MB", b / MB)
    } else {
        format!("{:.1} KB", b / 1024.0)
    }
}
