// crates/cliptrim-ui/src/modules/export_module.rs
//
// ExportModule: right-panel UI for configuring an MP4 export or applying
// the trim window destructively to the source file.
//
// State machine (driven by AppState job fields, set by ingest_media_results):
//
//   Idle       → user clicks "Export MP4"
//                → app.rs builds the transcode job, state.export_job = Some(id)
//
//   Exporting  → TranscodeProgress results update state.export_progress
//                → modal shows percent (no cancel — jobs run to completion)
//
//   Done       → state.export_done = Some(path)
//                → the preview popup takes over (see preview_popup.rs)
//
//   Error      → state.export_error = Some(msg) → modal shows ✗ card
//
// Trim-in-place reuses the same modal with its own spinner card while
// state.trim_job is set. The button is two-stage: first click arms a 5 s
// confirmation window, second click fires. It rewrites the file on disk.

use std::time::Instant;

use egui::{Color32, Context, Margin, RichText, Stroke, Ui};

use cliptrim_core::commands::EditorCommand;
use cliptrim_core::helpers::time::format_time;
use cliptrim_core::media_types::SizeTarget;
use cliptrim_core::state::AppState;
use cliptrim_media::job;

use super::EditorModule;
use crate::modules::ThumbnailCache;
use crate::theme::{ACCENT, DARK_BG_2, DARK_BG_3, DARK_BORDER, DARK_TEXT_DIM};

// ── Colour palette extensions (local to this module) ─────────────────────────

/// Muted red used for error banners and the armed trim button.
const RED_DIM: Color32 = Color32::from_rgb(200, 80, 80);
/// Background fill for the progress bar track.
const TRACK_BG: Color32 = Color32::from_rgb(32, 34, 40);

/// Resolution override presets, parsed by `job::parse_resolution`
/// ("original" parses to None = keep source resolution).
const RES_PRESETS: [&str; 3] = ["original", "1920x1080", "1280x720"];

pub struct ExportModule {
    filename: String,
    /// Clip the filename default was derived for; re-derive on clip change.
    filename_for: Option<uuid::Uuid>,
    target: SizeTarget,
    fps: Option<u32>,
    resolution: &'static str,
    /// Timestamp of the first "Trim file" click. `None` = normal state,
    /// `Some(t)` = waiting for confirmation within 5 s, then auto-expires.
    trim_confirm_at: Option<Instant>,
    /// When the current error banner first appeared; it auto-clears after
    /// ERROR_TIMEOUT_SECS so a failed background job never wedges the UI.
    error_shown_at: Option<Instant>,
}

/// How long a job error stays on screen before clearing itself.
const ERROR_TIMEOUT_SECS: f32 = 8.0;

impl Default for ExportModule {
    fn default() -> Self {
        Self {
            filename: "clip".into(),
            filename_for: None,
            target: SizeTarget::Original,
            fps: None,
            resolution: RES_PRESETS[0],
            trim_confirm_at: None,
            error_shown_at: None,
        }
    }
}

impl EditorModule for ExportModule {
    fn name(&self) -> &str {
        "Export"
    }

    fn ui(
        &mut self,
        ui: &mut Ui,
        state: &AppState,
        _thumb_cache: &mut ThumbnailCache,
        cmd: &mut Vec<EditorCommand>,
    ) {
        let Some(session) = &state.editor else { return };

        if self.filename_for != Some(session.clip_id) {
            self.filename_for = Some(session.clip_id);
            self.filename = format!("{}-trim", session.name);
            self.trim_confirm_at = None;
        }

        let busy = state.job_running();

        ui.vertical(|ui| {
            // ── Header ────────────────────────────────────────────────────
            egui::Frame::new()
                .fill(DARK_BG_2)
                .inner_margin(Margin { left: 8, right: 8, top: 6, bottom: 6 })
                .show(ui, |ui| {
                    ui.label(RichText::new("🚀 Export").size(12.0).strong());
                });

            ui.separator();

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.add_space(4.0);
                    self.settings_ui(ui, state, cmd, busy);
                });
        });
    }
}

impl ExportModule {
    fn settings_ui(&mut self, ui: &mut Ui, state: &AppState, cmd: &mut Vec<EditorCommand>, busy: bool) {
        let Some(session) = &state.editor else { return };
        let span = session.trim.span();

        // ── Filename ──────────────────────────────────────────────────────
        ui.label(RichText::new("Output Name").size(11.0).color(DARK_TEXT_DIM));
        ui.add_space(2.0);
        let name_resp = ui.add_enabled(
            !busy,
            egui::TextEdit::singleline(&mut self.filename)
                .desired_width(f32::INFINITY)
                .hint_text("filename…"),
        );
        // Consume Enter so Windows doesn't beep when the field is confirmed.
        if name_resp.has_focus() {
            ui.input_mut(|i| {
                i.events.retain(|e| {
                    !matches!(
                        e,
                        egui::Event::Key { key: egui::Key::Enter, pressed: true, .. }
                    )
                })
            });
        }

        ui.add_space(10.0);

        // ── Size target ───────────────────────────────────────────────────
        ui.label(RichText::new("Size Target").size(11.0).color(DARK_TEXT_DIM));
        ui.add_space(2.0);
        ui.add_enabled_ui(!busy, |ui| {
            egui::ComboBox::from_id_salt("size_target")
                .selected_text(self.target.label())
                .width(ui.available_width())
                .show_ui(ui, |ui| {
                    for t in SizeTarget::ALL {
                        ui.selectable_value(&mut self.target, t, t.label());
                    }
                });
        });

        ui.add_space(10.0);

        // ── Frame rate ────────────────────────────────────────────────────
        ui.label(RichText::new("Frame Rate").size(11.0).color(DARK_TEXT_DIM));
        ui.add_space(2.0);
        ui.add_enabled_ui(!busy, |ui| {
            ui.horizontal(|ui| {
                for (value, label) in [(None, "Source"), (Some(30u32), "30 fps"), (Some(60u32), "60 fps")] {
                    let selected = self.fps == value;
                    let btn = egui::Button::new(
                        RichText::new(label)
                            .size(11.0)
                            .color(if selected { ACCENT } else { DARK_TEXT_DIM }),
                    )
                    .stroke(Stroke::new(1.0, if selected { ACCENT } else { DARK_BORDER }))
                    .fill(if selected { DARK_BG_3 } else { DARK_BG_2 });
                    if ui.add(btn).clicked() {
                        self.fps = value;
                    }
                }
            });
        });

        ui.add_space(10.0);

        // ── Resolution ────────────────────────────────────────────────────
        ui.label(RichText::new("Resolution").size(11.0).color(DARK_TEXT_DIM));
        ui.add_space(2.0);
        ui.add_enabled_ui(!busy, |ui| {
            egui::ComboBox::from_id_salt("export_resolution")
                .selected_text(res_label(self.resolution))
                .width(ui.available_width())
                .show_ui(ui, |ui| {
                    for preset in RES_PRESETS {
                        ui.selectable_value(&mut self.resolution, preset, res_label(preset));
                    }
                });
        });

        ui.add_space(10.0);

        // ── Summary ───────────────────────────────────────────────────────
        let forced_reencode = self.fps.is_some() || self.resolution != RES_PRESETS[0];
        let video_line = match (self.target, forced_reencode) {
            (SizeTarget::Original, false) => "stream copy (lossless)".to_string(),
            (SizeTarget::Original, true) => "re-encode, CRF 18".to_string(),
            (t, _) => format!("re-encode, ~{} budget", t.label()),
        };
        let audio_line = match job::audio_mode(&session.tracks) {
            job::AudioMode::Silent => "none (all tracks off)".to_string(),
            job::AudioMode::Copy { stream } => format!("track {} copied", stream + 1),
            job::AudioMode::Encode { gains } => {
                let n = gains.iter().flatten().count();
                format!("{n} track{} mixed, AAC 128k", if n == 1 { "" } else { "s" })
            }
        };

        egui::Frame::new()
            .fill(DARK_BG_3)
            .stroke(Stroke::new(1.0, DARK_BORDER))
            .corner_radius(egui::CornerRadius::same(4))
            .inner_margin(Margin::same(8))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(
                    RichText::new(format!(
                        "Range:   {} → {}",
                        format_time(session.trim.start()),
                        format_time(session.trim.end())
                    ))
                    .size(11.0)
                    .monospace(),
                );
                ui.label(RichText::new(format!("Length:  {:.1}s", span)).size(11.0).monospace());
                ui.label(RichText::new(format!("Video:   {video_line}")).size(11.0).monospace());
                ui.label(RichText::new(format!("Audio:   {audio_line}")).size(11.0).monospace());
            });

        ui.add_space(12.0);

        // ── Export button ─────────────────────────────────────────────────
        let export_btn = egui::Button::new(
            RichText::new("⚡ Export MP4")
                .size(13.0)
                .strong()
                .color(if busy { Color32::DARK_GRAY } else { Color32::BLACK }),
        )
        .fill(if busy { DARK_BG_3 } else { ACCENT })
        .stroke(Stroke::NONE)
        .min_size(egui::vec2(ui.available_width(), 34.0));

        if ui.add_enabled(!busy, export_btn).clicked() {
            let filename = self.filename.trim();
            cmd.push(EditorCommand::StartExport {
                filename: if filename.is_empty() { "clip".into() } else { filename.into() },
                target: self.target,
                fps: self.fps,
                resolution: job::parse_resolution(self.resolution),
            });
        }

        ui.add_space(14.0);
        ui.separator();
        ui.add_space(8.0);

        // ── Two-stage trim-in-place button ────────────────────────────────
        // First click arms the 5 s window; second click fires
        // StartTrimInPlace; after 5 s the button resets with no action.
        // This overwrites the source file, so it earns the extra click.
        let has_range = session.trim.has_trim_range();

        if busy {
            self.trim_confirm_at = None;
        }
        if let Some(started) = self.trim_confirm_at {
            if started.elapsed().as_secs_f32() >= 5.0 {
                self.trim_confirm_at = None;
            }
        }
        let in_confirm = self.trim_confirm_at.is_some();

        let btn_label: String = if let Some(started) = self.trim_confirm_at {
            let secs_left = (5.0_f32 - started.elapsed().as_secs_f32()).ceil() as u32;
            // Drive the countdown without relying on input events.
            ui.ctx()
                .request_repaint_after(std::time::Duration::from_millis(250));
            format!("⚠ Overwrite source? {}s", secs_left)
        } else {
            "✂ Trim file in place".into()
        };

        let (text_color, fill, border) = if in_confirm {
            (RED_DIM, Color32::from_rgb(55, 18, 18), Color32::from_rgb(160, 50, 50))
        } else {
            (DARK_TEXT_DIM, DARK_BG_3, DARK_BORDER)
        };

        let trim_btn = egui::Button::new(RichText::new(&btn_label).size(11.0).color(text_color))
            .fill(fill)
            .stroke(Stroke::new(1.0, border))
            .min_size(egui::vec2(ui.available_width(), 28.0));

        let hover_tip = if in_confirm {
            "Click again to cut everything outside the trim window from the file — cannot be undone"
        } else if !has_range {
            "Set a trim window first"
        } else {
            "Rewrite this clip keeping only the trim window (frees disk space)"
        };

        if ui
            .add_enabled(!busy && has_range, trim_btn)
            .on_hover_text(hover_tip)
            .clicked()
        {
            if in_confirm {
                cmd.push(EditorCommand::StartTrimInPlace);
                self.trim_confirm_at = None;
            } else {
                self.trim_confirm_at = Some(Instant::now());
            }
        }
    }

    // ── Job modal ─────────────────────────────────────────────────────────────
    /// Full-screen overlay for export progress, trim progress, and errors.
    /// Call from app.rs::update() *after* all panels so it paints on top.
    /// The done state is handled by PreviewPopup instead.
    pub fn show_job_modal(&mut self, ctx: &Context, state: &AppState, cmd: &mut Vec<EditorCommand>) {
        let exporting = state.export_job.is_some() && state.export_done.is_none();
        let trimming = state.trim_job.is_some();
        let error = state.export_error.is_some();
        if !exporting && !trimming && !error {
            self.error_shown_at = None;
            return;
        }

        if error {
            let since = *self.error_shown_at.get_or_insert_with(Instant::now);
            if since.elapsed().as_secs_f32() >= ERROR_TIMEOUT_SECS {
                self.error_shown_at = None;
                cmd.push(EditorCommand::ClearExportStatus);
                return;
            }
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        } else {
            self.error_shown_at = None;
        }

        let screen = ctx.screen_rect();

        // Scrim under the card; both on the Foreground layer, scrim first.
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("job_modal_scrim"),
        ));
        painter.rect_filled(screen, 0.0, Color32::from_black_alpha(128));

        const CARD_W: f32 = 420.0;
        const CARD_H: f32 = 220.0;
        const PAD: f32 = 26.0;

        let card_rect = egui::Rect::from_center_size(screen.center(), egui::vec2(CARD_W, CARD_H));
        let inner_rect = card_rect.shrink(PAD);
        let border_col = if error { RED_DIM } else { ACCENT };

        egui::Area::new(egui::Id::new("job_modal_content"))
            .order(egui::Order::Foreground)
            .fixed_pos(card_rect.min)
            .show(ctx, |ui| {
                ui.set_min_size(card_rect.size());
                ui.set_max_size(card_rect.size());

                // Card background painted in the same layer as the widgets
                // so it's always behind them.
                ui.painter().rect(
                    card_rect,
                    0.0,
                    Color32::from_rgba_unmultiplied(10, 10, 16, 179),
                    Stroke::new(1.0, border_col),
                    egui::StrokeKind::Inside,
                );

                let mut child = ui.new_child(egui::UiBuilder::new().max_rect(inner_rect));

                if error {
                    self.modal_error(&mut child, state, cmd);
                } else if trimming {
                    self.modal_trimming(&mut child);
                    ctx.request_repaint();
                } else {
                    self.modal_exporting(&mut child, state);
                    ctx.request_repaint();
                }
            });
    }

    fn modal_exporting(&self, ui: &mut Ui, state: &AppState) {
        let fraction = (state.export_progress / 100.0).clamp(0.0, 1.0);
        let pct = (fraction * 100.0) as u32;

        ui.label(RichText::new("Exporting…").size(13.0).strong().color(Color32::WHITE));
        ui.add_space(12.0);
        ui.label(RichText::new(format!("{pct}%")).size(42.0).strong().color(ACCENT));
        ui.add_space(10.0);

        let (bar_rect, _) =
            ui.allocate_exact_size(egui::vec2(ui.available_width(), 8.0), egui::Sense::hover());
        let p = ui.painter();
        p.rect_filled(bar_rect, 4.0, TRACK_BG);
        if fraction > 0.0 {
            let mut fill = bar_rect;
            fill.max.x = bar_rect.min.x + bar_rect.width() * fraction;
            p.rect_filled(fill, 4.0, ACCENT);
        }
        ui.add_space(10.0);
        ui.label(
            RichText::new("Runs to completion — the editor unlocks when it's done")
                .size(10.0)
                .color(DARK_TEXT_DIM),
        );
    }

    fn modal_trimming(&self, ui: &mut Ui) {
        ui.label(RichText::new("Applying trim…").size(13.0).strong().color(Color32::WHITE));
        ui.add_space(16.0);

        let t = ui.input(|i| i.time) as f32;
        let center = ui.available_rect_before_wrap().center_top() + egui::vec2(0.0, 24.0);
        let r = 16.0_f32;
        let p = ui.painter();
        p.circle_stroke(center, r, Stroke::new(2.0, TRACK_BG));
        let a = t * 4.0;
        p.line_segment(
            [center, center + egui::vec2(a.cos() * r, a.sin() * r)],
            Stroke::new(2.5, ACCENT),
        );

        ui.add_space(56.0);
        ui.label(
            RichText::new("Rewriting the source file — this only takes a moment")
                .size(10.0)
                .color(DARK_TEXT_DIM),
        );
    }

    fn modal_error(&self, ui: &mut Ui, state: &AppState, cmd: &mut Vec<EditorCommand>) {
        let msg = state.export_error.as_deref().unwrap_or("");

        ui.label(RichText::new("Job failed").size(13.0).strong().color(Color32::WHITE));
        ui.add_space(14.0);

        egui::Frame::new()
            .fill(Color32::from_rgb(60, 25, 25))
            .stroke(Stroke::new(1.0, RED_DIM))
            .corner_radius(egui::CornerRadius::same(4))
            .inner_margin(Margin::same(8))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(format!("💥  {msg}")).size(11.0).color(RED_DIM));
            });

        ui.add_space(14.0);

        let dismiss = egui::Button::new(RichText::new("Dismiss").size(11.0).color(DARK_TEXT_DIM))
            .stroke(Stroke::new(1.0, DARK_BORDER))
            .fill(DARK_BG_2)
            .min_size(egui::vec2(ui.available_width(), 28.0));
        if ui.add(dismiss).clicked() {
            cmd.push(EditorCommand::ClearExportStatus);
        }
    }
}

fn res_label(preset: &str) -> &'static str {
    match preset {
        "1920x1080" => "1080p — 1920×1080",
        "1280x720" => "720p — 1280×720",
        _ => "Source resolution",
    }
}
