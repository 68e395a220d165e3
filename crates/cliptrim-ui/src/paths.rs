// src/paths.rs
// Where clips live by default, and how to reveal the export folder.

use std::path::{Path, PathBuf};

/// `%USERPROFILE%\Videos\Clips` on Windows, `~/Videos/Clips` elsewhere.
/// Falls back to the current directory when no home can be resolved.
pub fn default_clips_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let base = std::env::var("USERPROFILE").map(PathBuf::from);
    #[cfg(not(target_os = "windows"))]
    let base = std::env::var("HOME").map(PathBuf::from);

    base.map(|h| h.join("Videos").join("Clips"))
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Open `dir` in the platform file manager. Fire-and-forget; failures are
/// logged, never surfaced.
pub fn open_in_file_manager(dir: &Path) {
    #[cfg(target_os = "windows")]
    let result = std::process::Command::new("explorer").arg(dir).spawn();
    #[cfg(target_os = "macos")]
    let result = std::process::Command::new("open").arg(dir).spawn();
    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    let result = std::process::Command::new("xdg-open").arg(dir).spawn();

    if let Err(e) = result {
        crate::cliptrim_log!("[paths] open {}: {e}", dir.display());
    }
}
