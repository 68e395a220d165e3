// crates/cliptrim-ui/src/helpers/log.rs
//
// In release builds with `windows_subsystem = "windows"` (double-click
// launch) there is no console, so `eprintln!` goes nowhere. Everything
// the UI crate wants to log lands in %TEMP%\cliptrim.log instead, via
// `clog` or the `cliptrim_log!` macro.

use std::fs::File;
use std::io::Write;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Log file, opened once per session and appended to for its lifetime.
/// `None` when the temp dir is unwritable; logging then degrades to a
/// no-op rather than an error.
static LOG_FILE: OnceLock<Option<Mutex<File>>> = OnceLock::new();

/// Append one line, prefixed with a wall-clock `HH:MM:SS` (UTC). Never
/// panics.
pub fn clog(msg: &str) {
    let file = LOG_FILE.get_or_init(|| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(std::env::temp_dir().join("cliptrim.log"))
            .ok()
            .map(Mutex::new)
    });
    let Some(file) = file else { return };

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    if let Ok(mut f) = file.lock() {
        let _ = writeln!(f, "{} {msg}", clock(secs));
    }
}

/// `HH:MM:SS` within the current UTC day.
fn clock(epoch_secs: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        (epoch_secs / 3600) % 24,
        (epoch_secs / 60) % 60,
        epoch_secs % 60
    )
}

/// Formats like `eprintln!` but routes through `clog`.
#[macro_export]
macro_rules! cliptrim_log {
    ($($arg:tt)*) => {
        $crate::helpers::log::clog(&format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formats_within_the_day() {
        assert_eq!(clock(0), "00:00:00");
        assert_eq!(clock(3_661), "01:01:01");
        assert_eq!(clock(86_399), "23:59:59");
        // Day rollover wraps the hours.
        assert_eq!(clock(86_400), "00:00:00");
    }
}
