// crates/cliptrim-ui/src/context.rs
//
// AppContext: everything runtime-only that the update loop threads through
// the modules — the media worker, GPU caches, playback bookkeeping, and the
// audio device. None of it serializes; it is rebuilt every launch.

use egui::TextureHandle;
use uuid::Uuid;

use cliptrim_core::clip::TRACK_COUNT;
use cliptrim_core::media_types::{MediaResult, PlaybackFrame, TrackPcm};
use cliptrim_core::playback::AudioCmd;
use cliptrim_core::state::AppState;
use cliptrim_media::MediaWorker;

use crate::cliptrim_log;
use crate::metadata::MetadataStore;
use crate::modules::ThumbnailCache;

// ── Sub-contexts ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct CacheContext {
    pub thumbnails: ThumbnailCache,
    /// Freshest decoded frame for the open clip — scrub result while
    /// paused, promoted playback frame while playing.
    pub frame: Option<TextureHandle>,
    /// One-slot buffer between the playback channel and the canvas; frames
    /// wait here until the app clock catches up to their PTS.
    pub pending_pb_frame: Option<PlaybackFrame>,
}

#[derive(Default)]
pub struct PlaybackContext {
    /// Timestamp of the last scrub frame request, so a stationary playhead
    /// doesn't re-request every frame.
    pub last_frame_req: Option<f64>,
    pub prev_playing: bool,
    /// Clip the decode thread is currently playing, if any.
    pub playing_clip: Option<Uuid>,
    /// Source generation that playback was started against; a mismatch
    /// after trim-in-place forces a restart on the new file bytes.
    pub playing_generation: u64,
}

#[derive(Default)]
pub struct AudioContext {
    pub stream: Option<rodio::OutputStream>,
    /// Ticks to wait after stream creation before connecting sinks
    /// (WASAPI registers its session asynchronously).
    pub warmup_ticks: u8,
    pub sinks: [Option<rodio::Sink>; TRACK_COUNT],
    /// Decoded PCM per track for the open clip; None = absent stream.
    pub pcm: [Option<TrackPcm>; TRACK_COUNT],
    pub pcm_generation: u64,
    /// Deferred audio action from the last SyncPlan; the mixer executes it
    /// once the output stream is ready.
    pub pending: Option<AudioCmd>,
}

pub struct AppContext {
    pub media_worker: MediaWorker,
    pub cache: CacheContext,
    pub playback: PlaybackContext,
    pub audio: AudioContext,
}

impl AppContext {
    pub fn new() -> Self {
        Self {
            media_worker: MediaWorker::new(),
            cache: CacheContext::default(),
            playback: PlaybackContext::default(),
            audio: AudioContext::default(),
        }
    }

    /// Drop every per-clip cache. Called when the editor opens or closes a
    /// clip and after trim-in-place rewrites the file.
    pub fn reset_clip_caches(&mut self) {
        self.cache.frame = None;
        self.cache.pending_pb_frame = None;
        self.playback.last_frame_req = None;
        self.playback.playing_clip = None;
        self.audio.pcm = Default::default();
        self.audio.sinks = Default::default();
        self.audio.pending = None;
    }

    // ── Result ingestion ─────────────────────────────────────────────────────
    /// Drain both worker channels. Scrub frames first — they are the most
    /// latency-sensitive thing the worker produces.
    pub fn ingest_media_results(
        &mut self,
        state: &mut AppState,
        store: &mut MetadataStore,
        egui_ctx: &egui::Context,
    ) {
        while let Ok(MediaResult::ScrubFrame(f)) = self.media_worker.scrub_rx.try_recv() {
            let Some(session) = &state.editor else { continue };
            // While playing, the playback pipeline owns the canvas.
            if f.clip_id == session.clip_id && !session.playback.is_playing {
                self.cache.frame = Some(load_frame_texture(egui_ctx, &f));
                egui_ctx.request_repaint();
            }
        }

        while let Ok(result) = self.media_worker.rx.try_recv() {
            match result {
                MediaResult::ClipProbed { id, duration, fps, .. } => {
                    if let Some(clip) = state.library.iter_mut().find(|c| c.id == id) {
                        clip.duration = duration;
                    }
                    if let Some(session) = state.editor.as_mut() {
                        if session.clip_id == id {
                            if fps > 0.0 {
                                session.fps = fps;
                            }
                            session.trim.set_duration(duration);
                        }
                    }
                }

                MediaResult::Thumbnail { id, width, height, rgba } => {
                    let tex = egui_ctx.load_texture(
                        format!("thumb-{id}"),
                        egui::ColorImage::from_rgba_unmultiplied([width, height], &rgba),
                        egui::TextureOptions::LINEAR,
                    );
                    self.cache.thumbnails.insert(id, tex);
                    egui_ctx.request_repaint();
                }

                // Never arrives on the shared channel, but keep the drain total.
                MediaResult::ScrubFrame(_) => {}

                MediaResult::AudioTracks { id, generation, tracks } => {
                    let Some(session) = &state.editor else { continue };
                    if session.clip_id != id || generation != session.source_generation {
                        continue; // raced a clip switch or a trim
                    }
                    self.audio.pcm = tracks;
                    self.audio.pcm_generation = generation;
                    if session.playback.is_playing {
                        // PCM arrived mid-playback: start the mixer late.
                        self.audio.pending =
                            Some(AudioCmd::Start(session.playback.current_time));
                    }
                }

                MediaResult::TranscodeProgress { job_id, percent } => {
                    if state.export_job == Some(job_id) {
                        state.export_progress = percent;
                    }
                }
                MediaResult::TranscodeDone { job_id, output } => {
                    if state.export_job == Some(job_id) {
                        state.export_progress = 100.0;
                        state.export_done = Some(output);
                    }
                }
                MediaResult::TranscodeError { job_id, msg } => {
                    if state.export_job == Some(job_id) {
                        cliptrim_log!("[export] {job_id}: {msg}");
                        state.export_error = Some(msg);
                    }
                }

                MediaResult::TrimApplied { job_id, id, new_duration } => {
                    if state.trim_job != Some(job_id) {
                        continue;
                    }
                    state.trim_job = None;
                    if let Some(clip) = state.library.iter_mut().find(|c| c.id == id) {
                        clip.duration = new_duration;
                        if let Ok(m) = std::fs::metadata(&clip.path) {
                            clip.size_bytes = m.len();
                        }
                    }
                    let Some(session) = state.editor.as_mut() else { continue };
                    if session.clip_id != id {
                        continue;
                    }
                    // The file under our feet changed: new duration, fresh
                    // trim window, everything decoded so far is stale.
                    session.trim.reset(new_duration);
                    session.playback.current_time = 0.0;
                    session.source_generation += 1;
                    self.reset_clip_caches();
                    self.media_worker.extract_tracks(
                        id,
                        session.path.clone(),
                        session.source_generation,
                        store.dir().to_path_buf(),
                        true,
                    );
                    self.media_worker.request_frame(id, session.path.clone(), 0.0);
                    self.playback.last_frame_req = Some(0.0);
                    store.mark_dirty(id, session.metadata());
                }
                MediaResult::TrimFailed { job_id, id, msg } => {
                    if state.trim_job == Some(job_id) {
                        state.trim_job = None;
                        cliptrim_log!("[trim] {id}: {msg}");
                        state.export_error = Some(format!("Trim failed: {msg}"));
                    }
                }

                MediaResult::Error { id, msg } => {
                    cliptrim_log!("[media] {id}: {msg}");
                }
            }
        }
    }
}

pub fn load_frame_texture(egui_ctx: &egui::Context, f: &PlaybackFrame) -> TextureHandle {
    egui_ctx.load_texture(
        format!("frame-{}", f.clip_id),
        egui::ColorImage::from_rgba_unmultiplied([f.width, f.height], &f.rgba),
        egui::TextureOptions::LINEAR,
    )
}
