// crates/cliptrim-core/src/clip.rs
//
// Library entries, per-track audio settings, and the sidecar metadata
// shape. Older sidecars stored a track as a bare bool; the untagged repr
// below normalizes that to the full struct at deserialize time so the
// ambiguous shape never reaches the rest of the app.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Slot 0 = desktop audio, slot 1 = microphone.
pub const TRACK_COUNT: usize = 2;

pub const TRACK_LABELS: [&str; TRACK_COUNT] = ["Desktop", "Microphone"];

/// Namespace for filename-derived clip ids, so the same file maps to the
/// same id across runs and rescans.
const CLIP_NS: Uuid = Uuid::from_bytes([
    0x6b, 0x1f, 0x42, 0xd3, 0x8c, 0x0a, 0x4e, 0x77, //
    0x9d, 0x25, 0xc4, 0x51, 0x0e, 0xaa, 0x39, 0x60,
]);

#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    pub id: Uuid,
    pub path: PathBuf,
    pub name: String,
    /// Seconds; 0.0 until the probe result lands.
    pub duration: f64,
    pub size_bytes: u64,
}

impl ClipInfo {
    pub fn from_path(path: PathBuf, size_bytes: u64) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip".to_string());
        let id = Uuid::new_v5(&CLIP_NS, name.as_bytes());
        Self { id, path, name, duration: 0.0, size_bytes }
    }
}

// ── Per-track audio settings ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "TrackSettingsRepr")]
pub struct AudioTrackSettings {
    pub enabled: bool,
    pub muted: bool,
    pub volume: f32,
}

impl Default for AudioTrackSettings {
    fn default() -> Self {
        Self { enabled: true, muted: false, volume: 1.0 }
    }
}

impl AudioTrackSettings {
    /// Preview gain for this track. Export gain ignores `muted` — mute is
    /// a monitoring control, not an export decision.
    pub fn gain(&self) -> f32 {
        if !self.enabled || self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Setting a non-zero volume also unmutes; dragging the slider is the
    /// natural "I want to hear this again" gesture.
    pub fn set_volume(&mut self, v: f32) {
        self.volume = v.clamp(0.0, 1.0);
        if self.volume > 0.0 {
            self.muted = false;
        }
    }
}

/// Legacy sidecars stored `"track1": true`; current ones store the full
/// object, possibly with fields missing.
#[derive(Deserialize)]
#[serde(untagged)]
enum TrackSettingsRepr {
    Flag(bool),
    Full {
        #[serde(default = "default_enabled")]
        enabled: bool,
        #[serde(default)]
        muted: bool,
        #[serde(default = "default_volume")]
        volume: f32,
    },
}

fn default_enabled() -> bool {
    true
}

fn default_volume() -> f32 {
    1.0
}

impl From<TrackSettingsRepr> for AudioTrackSettings {
    fn from(repr: TrackSettingsRepr) -> Self {
        match repr {
            TrackSettingsRepr::Flag(enabled) => Self { enabled, ..Self::default() },
            TrackSettingsRepr::Full { enabled, muted, volume } => {
                Self { enabled, muted, volume: volume.clamp(0.0, 1.0) }
            }
        }
    }
}

// ── Sidecar metadata ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimSpan {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipMetadata {
    pub trim: TrimSpan,
    #[serde(default)]
    pub audio: [AudioTrackSettings; TRACK_COUNT],
    #[serde(default)]
    pub playhead_position: f64,
}

impl Default for ClipMetadata {
    fn default() -> Self {
        Self {
            trim: TrimSpan { start: 0.0, end: 0.0 },
            audio: Default::default(),
            playhead_position: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_id_is_stable_per_name() {
        let a = ClipInfo::from_path(PathBuf::from("/clips/round-7.mp4"), 10);
        let b = ClipInfo::from_path(PathBuf::from("/clips/round-7.mp4"), 99);
        assert_eq!(a.id, b.id);
        let c = ClipInfo::from_path(PathBuf::from("/clips/round-8.mp4"), 10);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn gain_rules() {
        let mut t = AudioTrackSettings::default();
        assert_eq!(t.gain(), 1.0);
        t.volume = 0.4;
        assert_eq!(t.gain(), 0.4);
        t.muted = true;
        assert_eq!(t.gain(), 0.0);
        t.muted = false;
        t.enabled = false;
        assert_eq!(t.gain(), 0.0);
    }

    #[test]
    fn volume_drag_unmutes() {
        let mut t = AudioTrackSettings { muted: true, ..Default::default() };
        t.set_volume(0.7);
        assert!(!t.muted);
        assert_eq!(t.volume, 0.7);
        t.muted = true;
        t.set_volume(0.0);
        assert!(t.muted);
    }

    #[test]
    fn legacy_bool_track_deserializes() {
        let t: AudioTrackSettings = serde_json::from_str("false").unwrap();
        assert_eq!(t, AudioTrackSettings { enabled: false, muted: false, volume: 1.0 });
        let t: AudioTrackSettings = serde_json::from_str("true").unwrap();
        assert_eq!(t, AudioTrackSettings::default());
    }

    #[test]
    fn partial_object_track_fills_defaults() {
        let t: AudioTrackSettings = serde_json::from_str(r#"{"volume": 0.25}"#).unwrap();
        assert!(t.enabled);
        assert!(!t.muted);
        assert_eq!(t.volume, 0.25);
        // Out-of-range persisted volume is clamped, not rejected.
        let t: AudioTrackSettings = serde_json::from_str(r#"{"volume": 4.0}"#).unwrap();
        assert_eq!(t.volume, 1.0);
    }

    #[test]
    fn sidecar_round_trip() {
        let meta = ClipMetadata {
            trim: TrimSpan { start: 3.0, end: 21.5 },
            audio: [
                AudioTrackSettings::default(),
                AudioTrackSettings { enabled: false, muted: false, volume: 0.5 },
            ],
            playhead_position: 7.25,
        };
        let json = serde_json::to_string(&meta).unwrap();
        let back: ClipMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
    }
}
