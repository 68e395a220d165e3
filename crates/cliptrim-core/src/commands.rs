// crates/cliptrim-core/src/commands.rs
//
// Every user action the UI can emit. Modules push these into a queue
// during the frame; the app drains and executes them afterwards, so UI
// code never mutates state directly.

use std::path::PathBuf;

use uuid::Uuid;

use crate::media_types::SizeTarget;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    // ── Library ─────────────────────────────────────────────
    PickClipsDirectory,
    RescanClips,
    OpenClip(Uuid),
    CloseEditor,

    // ── Transport ───────────────────────────────────────────
    Play,
    Pause,
    Seek(f64),
    /// Signed seconds relative to the playhead.
    SkipBy(f64),
    /// Signed frame count; 1/fps per step.
    StepFrame(i32),
    SetSkipSeconds(f64),

    // ── Trim handles ────────────────────────────────────────
    SetTrimStart(f64),
    SetTrimEnd(f64),

    // ── Audio tracks ────────────────────────────────────────
    SetTrackEnabled { track: usize, enabled: bool },
    SetTrackMuted { track: usize, muted: bool },
    SetTrackVolume { track: usize, volume: f32 },

    // ── Export / trim-in-place ──────────────────────────────
    StartExport {
        filename: String,
        target: SizeTarget,
        fps: Option<u32>,
        resolution: Option<(u32, u32)>,
    },
    StartTrimInPlace,
    /// Dismiss the done-popup or error banner.
    ClearExportStatus,
    OpenExportsFolder,
    CopyExportPath(PathBuf),
}
