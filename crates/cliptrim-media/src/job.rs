// crates/cliptrim-media/src/job.rs
//
// Pure transcode job builder: export settings in, fully-resolved job out.
// No I/O happens here — transcode.rs interprets the job. Keeping the
// arithmetic side-effect-free is what makes the size math unit-testable.

use std::path::PathBuf;

use uuid::Uuid;

use cliptrim_core::clip::{AudioTrackSettings, TRACK_COUNT};
use cliptrim_core::media_types::SizeTarget;

/// Fixed AAC bitrate for every sized export.
pub const AUDIO_KBPS: u32 = 128;

/// Floor for the video bitrate — below this H.264 falls apart completely,
/// so a too-small target size yields a slightly-over-budget file instead
/// of an unwatchable one.
pub const MIN_VIDEO_KBPS: u32 = 500;

/// Fraction of the size target given to the streams; the rest absorbs MP4
/// container overhead.
const MUX_OVERHEAD: f64 = 0.85;

/// CRF used when re-encoding without a size target (fps/resolution
/// override on an "original quality" export).
const QUALITY_CRF: u8 = 18;

/// What the UI hands the worker when the user hits Export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub job_id: Uuid,
    pub input: PathBuf,
    pub clips_dir: PathBuf,
    /// Output filename without extension, used as-is.
    pub filename: String,
    pub trim_start: f64,
    /// Caller guarantees `trim_end > trim_start` (the trim model's
    /// invariant); the builder does not re-validate.
    pub trim_end: f64,
    pub target: SizeTarget,
    pub tracks: [AudioTrackSettings; TRACK_COUNT],
    pub fps: Option<u32>,
    pub resolution: Option<(u32, u32)>,
}

/// Everything transcode.rs needs, with all policy already decided.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    pub job_id: Uuid,
    pub input: PathBuf,
    pub seek: f64,
    pub duration: f64,
    pub video: VideoMode,
    pub audio: AudioMode,
    pub fps: Option<u32>,
    pub resolution: Option<(u32, u32)>,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VideoMode {
    /// Stream copy, no decode.
    Copy,
    Encode { rate: RateControl },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateControl {
    /// Quality-targeted VBR; used when re-encoding is forced without a
    /// size budget.
    Crf(u8),
    Bitrate {
        video_kbps: u32,
        maxrate_kbps: u32,
        bufsize_kbps: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioMode {
    /// No audio stream in the output.
    Silent,
    /// Stream-copy the nth audio stream (single track at unity volume).
    Copy { stream: usize },
    /// Decode, apply per-track gain, mix, AAC 128k stereo.
    /// `gains[slot]` is None for excluded tracks.
    Encode { gains: [Option<f32>; TRACK_COUNT] },
}

/// Resolve an export request into a transcode job. Pure.
pub fn build(req: &ExportRequest) -> TranscodeJob {
    let duration = req.trim_end - req.trim_start;

    let video = match req.target.megabytes() {
        None if req.fps.is_none() && req.resolution.is_none() => VideoMode::Copy,
        None => VideoMode::Encode { rate: RateControl::Crf(QUALITY_CRF) },
        Some(mb) => {
            let target_kbits = mb * 8192.0 * MUX_OVERHEAD;
            let total_kbps = (target_kbits / duration).floor() as i64;
            let video_kbps = (total_kbps - AUDIO_KBPS as i64).max(MIN_VIDEO_KBPS as i64) as u32;
            VideoMode::Encode {
                rate: RateControl::Bitrate {
                    video_kbps,
                    maxrate_kbps: (video_kbps as f64 * 1.5) as u32,
                    bufsize_kbps: video_kbps * 2,
                },
            }
        }
    };

    TranscodeJob {
        job_id: req.job_id,
        input: req.input.clone(),
        seek: req.trim_start,
        duration,
        video,
        audio: audio_mode(&req.tracks),
        fps: req.fps,
        resolution: req.resolution,
        output: output_path(&req.clips_dir, &req.filename),
    }
}

/// Pick the audio pipeline from the enabled/volume combination. Mute is a
/// monitoring control and deliberately plays no part here.
pub fn audio_mode(tracks: &[AudioTrackSettings; TRACK_COUNT]) -> AudioMode {
    let enabled: Vec<usize> =
        (0..TRACK_COUNT).filter(|&i| tracks[i].enabled).collect();
    match enabled.as_slice() {
        [] => AudioMode::Silent,
        [i] if (tracks[*i].volume - 1.0).abs() < 1e-3 => AudioMode::Copy { stream: *i },
        [i] => {
            let mut gains = [None; TRACK_COUNT];
            gains[*i] = Some(tracks[*i].volume);
            AudioMode::Encode { gains }
        }
        _ => {
            let mut gains = [None; TRACK_COUNT];
            for &i in &enabled {
                gains[i] = Some(tracks[i].volume);
            }
            AudioMode::Encode { gains }
        }
    }
}

/// Exports always land in the `exported-clips` subfolder of the clips
/// directory. The filename is the user's, verbatim.
pub fn output_path(clips_dir: &std::path::Path, filename: &str) -> PathBuf {
    clips_dir.join("exported-clips").join(format!("{filename}.mp4"))
}

/// Parse a `"1920x1080"` style resolution string.
///
/// ```
/// use cliptrim_media::job::parse_resolution;
/// assert_eq!(parse_resolution("1920x1080"), Some((1920, 1080)));
/// assert_eq!(parse_resolution("original"), None);
/// assert_eq!(parse_resolution("1920x"), None);
/// ```
pub fn parse_resolution(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn request(target: SizeTarget, start: f64, end: f64) -> ExportRequest {
        ExportRequest {
            job_id: Uuid::new_v4(),
            input: PathBuf::from("/clips/a.mp4"),
            clips_dir: PathBuf::from("/clips"),
            filename: "out".into(),
            trim_start: start,
            trim_end: end,
            target,
            tracks: Default::default(),
            fps: None,
            resolution: None,
        }
    }

    fn video_kbps(job: &TranscodeJob) -> u32 {
        match job.video {
            VideoMode::Encode { rate: RateControl::Bitrate { video_kbps, .. } } => video_kbps,
            other => panic!("expected bitrate encode, got {other:?}"),
        }
    }

    #[test]
    fn fifty_mb_over_sixty_seconds() {
        let job = build(&request(SizeTarget::Mb50, 0.0, 60.0));
        // 50 * 8192 * 0.85 = 348160 kbit; /60 = 5802 total; -128 audio.
        assert_eq!(video_kbps(&job), 5674);
    }

    #[test]
    fn tiny_budget_clamps_to_floor() {
        let job = build(&request(SizeTarget::Mb10, 0.0, 3000.0));
        // 10 MB over 50 minutes works out below the floor.
        assert_eq!(video_kbps(&job), MIN_VIDEO_KBPS);
    }

    #[test]
    fn maxrate_and_bufsize_ratios() {
        let job = build(&request(SizeTarget::Mb50, 10.0, 70.0));
        match job.video {
            VideoMode::Encode {
                rate: RateControl::Bitrate { video_kbps, maxrate_kbps, bufsize_kbps },
            } => {
                assert_eq!(maxrate_kbps, (video_kbps as f64 * 1.5) as u32);
                assert_eq!(bufsize_kbps, video_kbps * 2);
            }
            other => panic!("expected bitrate encode, got {other:?}"),
        }
        assert_eq!(job.seek, 10.0);
        assert_eq!(job.duration, 60.0);
    }

    #[test]
    fn original_target_copies_video() {
        let job = build(&request(SizeTarget::Original, 0.0, 60.0));
        assert_eq!(job.video, VideoMode::Copy);
    }

    #[test]
    fn override_forces_reencode_of_original() {
        let mut req = request(SizeTarget::Original, 0.0, 60.0);
        req.fps = Some(30);
        let job = build(&req);
        assert_eq!(job.video, VideoMode::Encode { rate: RateControl::Crf(18) });
    }

    #[test]
    fn audio_graph_selection() {
        let on = AudioTrackSettings::default();
        let off = AudioTrackSettings { enabled: false, ..on };
        let quiet = AudioTrackSettings { volume: 0.5, ..on };

        assert_eq!(audio_mode(&[off, off]), AudioMode::Silent);
        assert_eq!(audio_mode(&[on, off]), AudioMode::Copy { stream: 0 });
        assert_eq!(audio_mode(&[off, on]), AudioMode::Copy { stream: 1 });
        assert_eq!(
            audio_mode(&[quiet, off]),
            AudioMode::Encode { gains: [Some(0.5), None] }
        );
        assert_eq!(
            audio_mode(&[on, quiet]),
            AudioMode::Encode { gains: [Some(1.0), Some(0.5)] }
        );
    }

    #[test]
    fn muted_track_still_exports() {
        // Mute silences the preview, not the export.
        let muted = AudioTrackSettings { muted: true, ..Default::default() };
        let off = AudioTrackSettings { enabled: false, ..Default::default() };
        assert_eq!(audio_mode(&[muted, off]), AudioMode::Copy { stream: 0 });
    }

    #[test]
    fn builder_is_a_pure_function() {
        let req = request(SizeTarget::Mb50, 5.0, 25.0);
        assert_eq!(build(&req), build(&req));
    }

    #[test]
    fn output_lands_in_export_subfolder() {
        let out = output_path(Path::new("/clips"), "my clip!!");
        assert_eq!(out, PathBuf::from("/clips/exported-clips/my clip!!.mp4"));
    }
}
