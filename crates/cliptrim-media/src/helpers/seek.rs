// crates/cliptrim-media/src/helpers/seek.rs
//
// Seek helper wrapping avformat seek with consistent soft-fail behaviour.
//
// A backward seek (`..=seek_ts`) lands on the keyframe BEFORE the target,
// and the caller's PTS filter discards the pre-roll, so the first usable
// frame is exactly at the target. A forward seek could land a whole GOP
// late. Seeks to 0 are skipped entirely: `avformat_seek_file(max_ts=0)`
// returns EPERM on Windows on a freshly-opened context, and the demuxer
// starts at position 0 anyway.

use ffmpeg_the_third as ffmpeg;

/// Seek `ictx` to `target_secs` from the start of the file.
///
/// Returns `false` on failure — the demuxer stays where it is and the
/// caller's PTS-based frame filtering handles the pre-roll. Failure is
/// logged but never fatal.
pub fn seek_to_secs(
    ictx: &mut ffmpeg::format::context::Input,
    target_secs: f64,
    label: &str,
) -> bool {
    if target_secs <= 0.0 {
        return true;
    }

    let seek_ts = (target_secs * ffmpeg::ffi::AV_TIME_BASE as f64) as i64;
    match ictx.seek(seek_ts, ..=seek_ts) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("[seek] soft-fail in {label} at {target_secs:.3}s: {e}");
            false
        }
    }
}
