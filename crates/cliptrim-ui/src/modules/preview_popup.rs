// crates/cliptrim-ui/src/modules/preview_popup.rs
//
// PreviewPopup: the "export finished" card. Shows a thumbnail of the
// rendered file (probed like any library clip, under a throwaway id), the
// final size on disk, and quick actions. Auto-closes after 30 s so a
// finished export never blocks the editor overnight.

use std::path::PathBuf;
use std::time::Instant;

use egui::{Color32, Context, Pos2, Rect, RichText, Stroke, Vec2};
use uuid::Uuid;

use cliptrim_core::commands::EditorCommand;
use cliptrim_core::helpers::time::format_size;
use cliptrim_core::state::AppState;
use cliptrim_media::MediaWorker;

use super::ThumbnailCache;
use crate::theme::{DARK_BG_2, DARK_BORDER, DARK_TEXT_DIM};

const AUTO_CLOSE_SECS: f32 = 30.0;

/// Muted green for the success border.
const GREEN_DIM: Color32 = Color32::from_rgb(80, 190, 120);

pub struct PreviewPopup {
    shown_for: Option<PathBuf>,
    opened_at: Option<Instant>,
    /// Id the exported file was probed under; its thumbnail lands in the
    /// shared cache like any other.
    thumb_id: Option<Uuid>,
    size_bytes: u64,
}

impl PreviewPopup {
    pub fn new() -> Self {
        Self { shown_for: None, opened_at: None, thumb_id: None, size_bytes: 0 }
    }

    pub fn show(
        &mut self,
        ctx: &Context,
        state: &AppState,
        worker: &MediaWorker,
        thumbs: &ThumbnailCache,
        cmd: &mut Vec<EditorCommand>,
    ) {
        let Some(output) = &state.export_done else {
            self.shown_for = None;
            self.opened_at = None;
            self.thumb_id = None;
            return;
        };

        // First frame with this result: kick off the thumbnail probe and
        // capture the file size once.
        if self.shown_for.as_ref() != Some(output) {
            self.shown_for = Some(output.clone());
            self.opened_at = Some(Instant::now());
            let id = Uuid::new_v4();
            self.thumb_id = Some(id);
            self.size_bytes = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
            worker.probe_clip(id, output.clone());
        }

        let elapsed = self.opened_at.map(|t| t.elapsed().as_secs_f32()).unwrap_or(0.0);
        if elapsed >= AUTO_CLOSE_SECS {
            cmd.push(EditorCommand::ClearExportStatus);
            return;
        }
        // Drive the countdown label.
        ctx.request_repaint_after(std::time::Duration::from_millis(250));

        let screen = ctx.screen_rect();
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("export_popup_scrim"),
        ));
        painter.rect_filled(screen, 0.0, Color32::from_black_alpha(128));

        const CARD_W: f32 = 460.0;
        const CARD_H: f32 = 340.0;
        const PAD: f32 = 24.0;

        let card_rect = Rect::from_center_size(screen.center(), Vec2::new(CARD_W, CARD_H));
        let inner_rect = card_rect.shrink(PAD);

        egui::Area::new(egui::Id::new("export_popup_content"))
            .order(egui::Order::Foreground)
            .fixed_pos(card_rect.min)
            .show(ctx, |ui| {
                ui.set_min_size(card_rect.size());
                ui.set_max_size(card_rect.size());

                ui.painter().rect(
                    card_rect,
                    0.0,
                    Color32::from_rgba_unmultiplied(10, 10, 16, 196),
                    Stroke::new(1.0, GREEN_DIM),
                    egui::StrokeKind::Inside,
                );

                let mut ui = ui.new_child(egui::UiBuilder::new().max_rect(inner_rect));

                let label = output
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();

                ui.label(
                    RichText::new("Export complete")
                        .size(13.0)
                        .strong()
                        .color(Color32::WHITE),
                );
                ui.add_space(10.0);

                // ── Thumbnail of the rendered file ────────────────────
                let thumb_rect = Rect::from_min_size(
                    ui.cursor().min,
                    Vec2::new(inner_rect.width(), 160.0),
                );
                ui.allocate_rect(thumb_rect, egui::Sense::hover());
                ui.painter().rect_filled(thumb_rect, 3.0, Color32::BLACK);
                let tex = self.thumb_id.and_then(|id| thumbs.get(&id));
                if let Some(tex) = tex {
                    ui.painter().image(
                        tex.id(),
                        thumb_rect,
                        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                        Color32::WHITE,
                    );
                } else {
                    ui.painter().text(
                        thumb_rect.center(),
                        egui::Align2::CENTER_CENTER,
                        "⏳",
                        egui::FontId::proportional(22.0),
                        Color32::from_gray(70),
                    );
                }
                ui.add_space(8.0);

                ui.label(
                    RichText::new(format!("🎉  {label}  ({})", format_size(self.size_bytes)))
                        .size(11.0)
                        .color(GREEN_DIM),
                );
                ui.add_space(12.0);

                // ── Actions ───────────────────────────────────────────
                ui.horizontal(|ui| {
                    let w = (ui.available_width() - 12.0) / 3.0;
                    let btn = |text: &str| {
                        egui::Button::new(RichText::new(text).size(11.0))
                            .stroke(Stroke::new(1.0, DARK_BORDER))
                            .fill(DARK_BG_2)
                            .min_size(egui::vec2(w, 28.0))
                    };
                    if ui.add(btn("📋 Copy Path")).clicked() {
                        cmd.push(EditorCommand::CopyExportPath(output.clone()));
                    }
                    if ui.add(btn("📂 Open Folder")).clicked() {
                        cmd.push(EditorCommand::OpenExportsFolder);
                    }
                    if ui.add(btn("Dismiss")).clicked() {
                        cmd.push(EditorCommand::ClearExportStatus);
                    }
                });

                ui.add_space(8.0);
                let secs_left = (AUTO_CLOSE_SECS - elapsed).ceil() as u32;
                ui.label(
                    RichText::new(format!("Closes in {secs_left}s"))
                        .size(9.0)
                        .color(DARK_TEXT_DIM),
                );
            });

        // Click outside dismisses too.
        let clicked_outside = ctx.input(|i| {
            i.pointer.any_click()
                && i.pointer
                    .interact_pos()
                    .map(|p| !card_rect.contains(p))
                    .unwrap_or(false)
        });
        if clicked_outside {
            cmd.push(EditorCommand::ClearExportStatus);
        }
    }
}
