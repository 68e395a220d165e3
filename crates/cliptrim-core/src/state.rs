// crates/cliptrim-core/src/state.rs
//
// Top-level app state. Only the user's settings serialize; everything
// else is rebuilt from the clips directory and the media worker on launch.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clip::{AudioTrackSettings, ClipInfo, ClipMetadata, TRACK_COUNT};
use crate::playback::PlaybackState;
use crate::trim::TrimModel;

pub const DEFAULT_SKIP_SECONDS: f64 = 5.0;

#[derive(Serialize, Deserialize)]
pub struct AppState {
    pub clips_dir: PathBuf,
    pub skip_seconds: f64,

    #[serde(skip)]
    pub library: Vec<ClipInfo>,
    #[serde(skip)]
    pub editor: Option<EditorSession>,

    // ── Job status (mutually exclusive: at most one of export/trim) ──
    #[serde(skip)]
    pub export_job: Option<Uuid>,
    #[serde(skip)]
    pub trim_job: Option<Uuid>,
    #[serde(skip)]
    pub export_progress: f32,
    #[serde(skip)]
    pub export_done: Option<PathBuf>,
    #[serde(skip)]
    pub export_error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            clips_dir: PathBuf::new(),
            skip_seconds: DEFAULT_SKIP_SECONDS,
            library: Vec::new(),
            editor: None,
            export_job: None,
            trim_job: None,
            export_progress: 0.0,
            export_done: None,
            export_error: None,
        }
    }
}

impl AppState {
    pub fn job_running(&self) -> bool {
        self.export_job.is_some() || self.trim_job.is_some()
    }

    pub fn clip(&self, id: Uuid) -> Option<&ClipInfo> {
        self.library.iter().find(|c| c.id == id)
    }
}

/// Everything scoped to the clip currently open in the editor. Dropped
/// wholesale on CloseEditor; the sidecar store is the only thing that
/// outlives it.
pub struct EditorSession {
    pub clip_id: Uuid,
    pub path: PathBuf,
    pub name: String,
    pub fps: f64,
    pub trim: TrimModel,
    pub playback: PlaybackState,
    pub tracks: [AudioTrackSettings; TRACK_COUNT],
    /// Bumped after trim-in-place so stale frames and PCM from the old
    /// file bytes are recognizably dead.
    pub source_generation: u64,
}

impl EditorSession {
    pub fn open(clip: &ClipInfo, meta: Option<&ClipMetadata>) -> Self {
        let mut trim = TrimModel::new(clip.duration);
        let mut tracks: [AudioTrackSettings; TRACK_COUNT] = Default::default();
        let mut playhead = 0.0;
        if let Some(m) = meta {
            trim.set_end(m.trim.end);
            trim.set_start(m.trim.start);
            tracks = m.audio;
            playhead = m.playhead_position.clamp(0.0, clip.duration);
        }
        Self {
            clip_id: clip.id,
            path: clip.path.clone(),
            name: clip.name.clone(),
            fps: 60.0,
            trim,
            playback: PlaybackState { current_time: playhead, ..Default::default() },
            tracks,
            source_generation: 0,
        }
    }

    pub fn metadata(&self) -> ClipMetadata {
        ClipMetadata {
            trim: crate::clip::TrimSpan { start: self.trim.start(), end: self.trim.end() },
            audio: self.tracks,
            playhead_position: self.playback.current_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(duration: f64) -> ClipInfo {
        let mut c = ClipInfo::from_path(PathBuf::from("/clips/a.mp4"), 1);
        c.duration = duration;
        c
    }

    #[test]
    fn open_without_sidecar_uses_defaults() {
        let s = EditorSession::open(&clip(42.0), None);
        assert_eq!(s.trim.start(), 0.0);
        assert_eq!(s.trim.end(), 42.0);
        assert!(!s.playback.is_playing);
        assert!(s.tracks[0].enabled);
    }

    #[test]
    fn open_restores_sidecar_within_bounds() {
        let meta = ClipMetadata {
            trim: crate::clip::TrimSpan { start: 5.0, end: 30.0 },
            playhead_position: 99.0,
            ..Default::default()
        };
        let s = EditorSession::open(&clip(42.0), Some(&meta));
        assert_eq!(s.trim.start(), 5.0);
        assert_eq!(s.trim.end(), 30.0);
        // Sidecar from before the clip was shortened: clamped, not trusted.
        assert_eq!(s.playback.current_time, 42.0);
    }

    #[test]
    fn metadata_round_trips_session() {
        let mut s = EditorSession::open(&clip(42.0), None);
        s.trim.set_start(3.0);
        s.tracks[1].enabled = false;
        let reopened = EditorSession::open(&clip(42.0), Some(&s.metadata()));
        assert_eq!(reopened.trim.start(), 3.0);
        assert!(!reopened.tracks[1].enabled);
    }
}
