// crates/cliptrim-core/src/media_types.rs
//
// Everything that crosses the channel between the media worker and the UI.
// Lives in core so neither side depends on the other's crates.

use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

/// Export size target. `Original` means video stream copy when no fps or
/// resolution override is in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeTarget {
    #[default]
    Original,
    Mb10,
    Mb50,
    Mb100,
}

impl SizeTarget {
    pub fn megabytes(self) -> Option<f64> {
        match self {
            SizeTarget::Original => None,
            SizeTarget::Mb10 => Some(10.0),
            SizeTarget::Mb50 => Some(50.0),
            SizeTarget::Mb100 => Some(100.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SizeTarget::Original => "Original quality",
            SizeTarget::Mb10 => "10 MB",
            SizeTarget::Mb50 => "50 MB",
            SizeTarget::Mb100 => "100 MB",
        }
    }

    pub const ALL: [SizeTarget; 4] =
        [SizeTarget::Original, SizeTarget::Mb10, SizeTarget::Mb50, SizeTarget::Mb100];
}

/// Decoded interleaved stereo f32 PCM at 44.1 kHz. Shared between the
/// mixer's live sources and the context cache without copying.
#[derive(Debug, Clone)]
pub struct TrackPcm {
    pub samples: Arc<Vec<f32>>,
}

impl TrackPcm {
    pub const SAMPLE_RATE: u32 = 44_100;
    pub const CHANNELS: u16 = 2;

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / (Self::SAMPLE_RATE as f64 * Self::CHANNELS as f64)
    }
}

/// One decoded RGBA frame from the playback thread, tagged with its
/// presentation time so the UI can gate promotion against the app clock.
#[derive(Debug, Clone)]
pub struct PlaybackFrame {
    pub clip_id: Uuid,
    pub pts_secs: f64,
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

/// Results flowing back from MediaWorker threads, drained once per UI frame.
#[derive(Debug)]
pub enum MediaResult {
    /// Probe finished: container duration plus video geometry.
    ClipProbed {
        id: Uuid,
        duration: f64,
        width: u32,
        height: u32,
        fps: f64,
    },
    /// 320px-wide RGBA thumbnail for the library grid.
    Thumbnail {
        id: Uuid,
        width: usize,
        height: usize,
        rgba: Vec<u8>,
    },
    /// One-shot frame for a paused scrub.
    ScrubFrame(PlaybackFrame),
    /// Audio tracks extracted (or re-extracted after a trim-in-place).
    /// A `None` slot means that stream is absent or failed to decode.
    AudioTracks {
        id: Uuid,
        generation: u64,
        tracks: [Option<TrackPcm>; crate::clip::TRACK_COUNT],
    },
    TranscodeProgress {
        job_id: Uuid,
        percent: f32,
    },
    TranscodeDone {
        job_id: Uuid,
        output: PathBuf,
    },
    TranscodeError {
        job_id: Uuid,
        msg: String,
    },
    /// Trim-in-place landed: the file at the clip's path now has this
    /// duration and a fresh mtime.
    TrimApplied {
        job_id: Uuid,
        id: Uuid,
        new_duration: f64,
    },
    /// Trim-in-place failed; the source file is untouched.
    TrimFailed {
        job_id: Uuid,
        id: Uuid,
        msg: String,
    },
    Error {
        id: Uuid,
        msg: String,
    },
}
