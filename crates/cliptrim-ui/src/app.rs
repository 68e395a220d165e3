// crates/cliptrim-ui/src/app.rs
//
// ClipTrimApp: the eframe::App impl. Owns AppState (persisted), the
// runtime AppContext, the sidecar store, and every module. One frame:
//
//   housekeeping → debounced sidecar writes, playback frame promotion,
//                  worker result ingestion
//   panels      → modules read state and queue EditorCommands
//   modals      → job progress / error / export popup, painted on top
//   clock       → advance the playhead, feed Tick/Ended into PlaybackState
//   commands    → drain the queue; the only place state is mutated
//   ticks       → VideoModule (decode pipeline) and MixerModule (rodio)

use uuid::Uuid;

use cliptrim_core::clip::ClipInfo;
use cliptrim_core::commands::EditorCommand;
use cliptrim_core::playback::{AudioCmd, PlaybackEvent, SyncPlan};
use cliptrim_core::state::{AppState, EditorSession};
use cliptrim_media::{build, ExportRequest};

use crate::cliptrim_log;
use crate::context::AppContext;
use crate::metadata::MetadataStore;
use crate::modules::export_module::ExportModule;
use crate::modules::library::LibraryModule;
use crate::modules::mixer::MixerModule;
use crate::modules::player::PlayerModule;
use crate::modules::preview_popup::PreviewPopup;
use crate::modules::{video_module, EditorModule};
use crate::{paths, theme};

const CLIP_EXTENSIONS: [&str; 3] = ["mp4", "mov", "mkv"];

pub struct ClipTrimApp {
    state: AppState,
    ctx: AppContext,
    store: MetadataStore,

    library: LibraryModule,
    player: PlayerModule,
    mixer: MixerModule,
    export: ExportModule,
    popup: PreviewPopup,

    cmd_queue: Vec<EditorCommand>,
}

impl ClipTrimApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        theme::configure_style(&cc.egui_ctx);
        cc.egui_ctx.set_theme(egui::ThemePreference::Dark);

        let mut state: AppState = cc
            .storage
            .and_then(|s| eframe::get_value(s, eframe::APP_KEY))
            .unwrap_or_default();
        if state.clips_dir.as_os_str().is_empty() {
            state.clips_dir = paths::default_clips_dir();
        }

        let ctx = AppContext::new();
        let store = MetadataStore::new(&state.clips_dir);

        let mut app = Self {
            state,
            ctx,
            store,
            library: LibraryModule::new(),
            player: PlayerModule::new(),
            mixer: MixerModule::new(),
            export: ExportModule::default(),
            popup: PreviewPopup::new(),
            cmd_queue: Vec::new(),
        };
        app.scan_clips();
        app
    }

    // ── Library scanning ──────────────────────────────────────────────────────

    fn scan_clips(&mut self) {
        self.state.library.clear();
        let rd = match std::fs::read_dir(&self.state.clips_dir) {
            Ok(rd) => rd,
            Err(e) => {
                cliptrim_log!("[app] read {}: {e}", self.state.clips_dir.display());
                return;
            }
        };

        let mut clips: Vec<ClipInfo> = rd
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let name = path.file_name()?.to_string_lossy().into_owned();
                // Dotfiles include our own in-flight trim temp files.
                if name.starts_with('.') {
                    return None;
                }
                let ext = path.extension()?.to_string_lossy().to_lowercase();
                if !CLIP_EXTENSIONS.contains(&ext.as_str()) {
                    return None;
                }
                let size = entry.metadata().ok()?.len();
                Some(ClipInfo::from_path(path, size))
            })
            .collect();
        clips.sort_by(|a, b| a.name.cmp(&b.name));

        for clip in &clips {
            self.ctx.media_worker.probe_clip(clip.id, clip.path.clone());
        }
        cliptrim_log!(
            "[app] scanned {}: {} clips",
            self.state.clips_dir.display(),
            clips.len()
        );
        self.state.library = clips;
    }

    // ── Playback plumbing ─────────────────────────────────────────────────────

    /// Run one playback event through the state machine and act on the
    /// returned plan.
    fn apply_event(&mut self, ev: PlaybackEvent) {
        let Some(session) = self.state.editor.as_mut() else { return };
        let plan = session.playback.apply(&session.trim, ev);
        self.execute_plan(plan);
    }

    fn execute_plan(&mut self, plan: SyncPlan) {
        let Some(session) = &self.state.editor else { return };

        if let Some(t) = plan.seek_video {
            if session.playback.is_playing {
                // Restart the decode pipeline at the new position.
                self.ctx.playback.playing_clip = Some(session.clip_id);
                self.ctx.playback.playing_generation = session.source_generation;
                self.ctx.cache.pending_pb_frame = None;
                self.ctx
                    .media_worker
                    .start_playback(session.clip_id, session.path.clone(), t);
            } else {
                self.ctx.playback.last_frame_req = Some(t);
                self.ctx
                    .media_worker
                    .request_frame(session.clip_id, session.path.clone(), t);
            }
        }

        match plan.audio {
            AudioCmd::None => {}
            cmd => self.ctx.audio.pending = Some(cmd),
        }

        // Playhead and trim state ride the same debounced sidecar write.
        self.store.mark_dirty(session.clip_id, session.metadata());
    }

    /// Advance the playhead by wall-clock time and detect end of media.
    fn advance_clock(&mut self, egui_ctx: &egui::Context) {
        let ev = {
            let Some(session) = &self.state.editor else { return };
            if !session.playback.is_playing {
                return;
            }
            let dt = egui_ctx.input(|i| i.stable_dt) as f64;
            let t = session.playback.current_time + dt;
            if t >= session.trim.duration() {
                PlaybackEvent::Ended
            } else {
                PlaybackEvent::Tick { video_time: t }
            }
        };
        self.apply_event(ev);
    }

    // ── Command processing ────────────────────────────────────────────────────

    fn process_command(&mut self, cmd: EditorCommand, egui_ctx: &egui::Context) {
        match cmd {
            // ── Library ─────────────────────────────────────────
            EditorCommand::PickClipsDirectory => {
                if let Some(dir) = rfd::FileDialog::new()
                    .set_directory(&self.state.clips_dir)
                    .pick_folder()
                {
                    self.close_editor();
                    self.state.clips_dir = dir;
                    self.store.set_clips_dir(&self.state.clips_dir);
                    self.scan_clips();
                }
            }
            EditorCommand::RescanClips => {
                // Keep any open editor; the session holds its own path.
                let open_id = self.state.editor.as_ref().map(|s| s.clip_id);
                self.scan_clips();
                if let Some(id) = open_id {
                    if self.state.clip(id).is_none() {
                        // The open clip vanished from disk.
                        self.close_editor();
                    }
                }
            }
            EditorCommand::OpenClip(id) => self.open_clip(id),
            EditorCommand::CloseEditor => self.close_editor(),

            // ── Transport ───────────────────────────────────────
            EditorCommand::Play => self.apply_event(PlaybackEvent::Play),
            EditorCommand::Pause => self.apply_event(PlaybackEvent::Pause),
            EditorCommand::Seek(target) => self.apply_event(PlaybackEvent::Seek { target }),
            EditorCommand::SkipBy(delta) => {
                if let Some(session) = &self.state.editor {
                    let target = session.playback.current_time + delta;
                    self.apply_event(PlaybackEvent::Seek { target });
                }
            }
            EditorCommand::StepFrame(frames) => {
                if let Some(session) = &self.state.editor {
                    let step = frames as f64 / session.fps.max(1.0);
                    let target = session.playback.current_time + step;
                    self.apply_event(PlaybackEvent::Seek { target });
                }
            }
            EditorCommand::SetSkipSeconds(secs) => {
                self.state.skip_seconds = secs.clamp(0.5, 30.0);
            }

            // ── Trim handles ────────────────────────────────────
            EditorCommand::SetTrimStart(t) => {
                if let Some(session) = self.state.editor.as_mut() {
                    session.trim.set_start(t);
                    self.store.mark_dirty(session.clip_id, session.metadata());
                }
            }
            EditorCommand::SetTrimEnd(t) => {
                if let Some(session) = self.state.editor.as_mut() {
                    session.trim.set_end(t);
                    self.store.mark_dirty(session.clip_id, session.metadata());
                }
            }

            // ── Audio tracks ────────────────────────────────────
            EditorCommand::SetTrackEnabled { track, enabled } => {
                if let Some(session) = self.state.editor.as_mut() {
                    if let Some(settings) = session.tracks.get_mut(track) {
                        settings.enabled = enabled;
                        self.store.mark_dirty(session.clip_id, session.metadata());
                    }
                }
            }
            EditorCommand::SetTrackMuted { track, muted } => {
                if let Some(session) = self.state.editor.as_mut() {
                    if let Some(settings) = session.tracks.get_mut(track) {
                        settings.muted = muted;
                        self.store.mark_dirty(session.clip_id, session.metadata());
                    }
                }
            }
            EditorCommand::SetTrackVolume { track, volume } => {
                if let Some(session) = self.state.editor.as_mut() {
                    if let Some(settings) = session.tracks.get_mut(track) {
                        settings.set_volume(volume);
                        self.store.mark_dirty(session.clip_id, session.metadata());
                    }
                }
            }

            // ── Export / trim-in-place ──────────────────────────
            EditorCommand::StartExport { filename, target, fps, resolution } => {
                self.start_export(filename, target, fps, resolution);
            }
            EditorCommand::StartTrimInPlace => self.start_trim_in_place(),
            EditorCommand::ClearExportStatus => {
                self.state.export_job = None;
                self.state.export_progress = 0.0;
                self.state.export_done = None;
                self.state.export_error = None;
            }
            EditorCommand::OpenExportsFolder => {
                let dir = self.state.clips_dir.join("exported-clips");
                paths::open_in_file_manager(&dir);
            }
            EditorCommand::CopyExportPath(path) => {
                egui_ctx.copy_text(path.display().to_string());
            }
        }
    }

    fn open_clip(&mut self, id: Uuid) {
        self.store.flush();
        let Some(clip) = self.state.clip(id).cloned() else { return };
        if clip.duration <= 0.0 {
            return; // probe hasn't landed yet
        }

        let meta = self.store.load(id);
        let session = EditorSession::open(&clip, meta.as_ref());

        self.ctx.reset_clip_caches();
        self.ctx.media_worker.extract_tracks(
            id,
            clip.path.clone(),
            session.source_generation,
            self.store.dir().to_path_buf(),
            false,
        );
        self.ctx
            .media_worker
            .request_frame(id, clip.path.clone(), session.playback.current_time);
        self.ctx.playback.last_frame_req = Some(session.playback.current_time);

        self.state.editor = Some(session);
    }

    fn close_editor(&mut self) {
        if let Some(session) = &self.state.editor {
            self.store.mark_dirty(session.clip_id, session.metadata());
        }
        self.store.flush();
        self.ctx.media_worker.stop_playback();
        self.ctx.reset_clip_caches();
        self.state.editor = None;
    }

    fn start_export(
        &mut self,
        filename: String,
        target: cliptrim_core::media_types::SizeTarget,
        fps: Option<u32>,
        resolution: Option<(u32, u32)>,
    ) {
        if self.state.job_running() {
            return;
        }
        let Some(session) = &self.state.editor else { return };

        let req = ExportRequest {
            job_id: Uuid::new_v4(),
            input: session.path.clone(),
            clips_dir: self.state.clips_dir.clone(),
            filename,
            trim_start: session.trim.start(),
            trim_end: session.trim.end(),
            target,
            tracks: session.tracks,
            fps,
            resolution,
        };
        let job = build(&req);
        cliptrim_log!(
            "[app] export {}: {:.2}s..{:.2}s → {}",
            req.job_id,
            req.trim_start,
            req.trim_end,
            job.output.display()
        );

        self.state.export_progress = 0.0;
        self.state.export_done = None;
        self.state.export_error = None;
        self.state.export_job = Some(req.job_id);
        self.ctx.media_worker.start_export(job);
    }

    fn start_trim_in_place(&mut self) {
        if self.state.job_running() {
            return;
        }
        // Stop playback first: the decode threads hold an open handle on
        // the file the trim is about to rename over.
        self.apply_event(PlaybackEvent::Pause);
        self.ctx.media_worker.stop_playback();
        self.ctx.playback.playing_clip = None;

        let Some(session) = &self.state.editor else { return };
        if !session.trim.has_trim_range() {
            return;
        }

        let job_id = Uuid::new_v4();
        self.state.export_error = None;
        self.state.trim_job = Some(job_id);
        self.ctx.media_worker.start_trim(
            job_id,
            session.clip_id,
            session.path.clone(),
            session.trim.start(),
            session.trim.end(),
        );
    }
}

// ── eframe::App ──────────────────────────────────────────────────────────────

impl eframe::App for ClipTrimApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ── Housekeeping ──────────────────────────────────────────────
        self.store.tick();
        video_module::poll_playback(&self.state, &mut self.ctx, ctx);
        self.ctx
            .ingest_media_results(&mut self.state, &mut self.store, ctx);

        // Hand the freshest decoded frame to the player before panels run.
        self.player.current_frame = self.ctx.cache.frame.clone();

        let mut cmd = std::mem::take(&mut self.cmd_queue);

        // ── Panels ────────────────────────────────────────────────────
        if self.state.editor.is_some() {
            egui::SidePanel::right("export_panel")
                .resizable(false)
                .exact_width(250.0)
                .show(ctx, |ui| {
                    self.export
                        .ui(ui, &self.state, &mut self.ctx.cache.thumbnails, &mut cmd);
                });
            egui::TopBottomPanel::bottom("mixer_panel")
                .exact_height(96.0)
                .show(ctx, |ui| {
                    self.mixer
                        .ui(ui, &self.state, &mut self.ctx.cache.thumbnails, &mut cmd);
                });
            egui::CentralPanel::default().show(ctx, |ui| {
                self.player
                    .ui(ui, &self.state, &mut self.ctx.cache.thumbnails, &mut cmd);
            });
        } else {
            egui::CentralPanel::default().show(ctx, |ui| {
                self.library
                    .ui(ui, &self.state, &mut self.ctx.cache.thumbnails, &mut cmd);
            });
        }

        // ── Modals (painted over the panels) ──────────────────────────
        self.export.show_job_modal(ctx, &self.state, &mut cmd);
        self.popup.show(
            ctx,
            &self.state,
            &self.ctx.media_worker,
            &self.ctx.cache.thumbnails,
            &mut cmd,
        );

        // ── Clock ─────────────────────────────────────────────────────
        self.advance_clock(ctx);

        // ── Commands ──────────────────────────────────────────────────
        for c in cmd.drain(..) {
            self.process_command(c, ctx);
        }
        self.cmd_queue = cmd;

        // ── Module ticks ──────────────────────────────────────────────
        video_module::tick(&self.state, &mut self.ctx);
        self.mixer.tick(&self.state, &mut self.ctx);

        if self
            .state
            .editor
            .as_ref()
            .map(|s| s.playback.is_playing)
            .unwrap_or(false)
        {
            ctx.request_repaint();
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.state);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(session) = &self.state.editor {
            self.store.mark_dirty(session.clip_id, session.metadata());
        }
        self.store.flush();
        self.ctx.media_worker.shutdown();
        self.ctx.audio.sinks = Default::default();
    }
}
