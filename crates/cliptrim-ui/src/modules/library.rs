// crates/cliptrim-ui/src/modules/library.rs
use egui::{Align, Color32, Layout, Pos2, Rect, RichText, Sense, Stroke, Ui, Vec2};

use cliptrim_core::commands::EditorCommand;
use cliptrim_core::helpers::time::{format_duration, format_size};
use cliptrim_core::state::AppState;

use super::EditorModule;
use crate::helpers::format::truncate;
use crate::modules::ThumbnailCache;
use crate::theme::{ACCENT, DARK_BG_2, DARK_BG_3, DARK_BORDER, DARK_TEXT_DIM};

const CARD_W:  f32 = 172.0;
const THUMB_H: f32 = 97.0;
const CARD_H:  f32 = THUMB_H + 40.0;

pub struct LibraryModule;

impl LibraryModule {
    pub fn new() -> Self {
        Self
    }
}

impl EditorModule for LibraryModule {
    fn name(&self) -> &str {
        "Clip Library"
    }

    fn ui(
        &mut self,
        ui: &mut Ui,
        state: &AppState,
        thumb_cache: &mut ThumbnailCache,
        cmd: &mut Vec<EditorCommand>,
    ) {
        ui.vertical(|ui| {
            // ── Header ──────────────────────────────────────────────────────
            egui::Frame::new()
                .fill(DARK_BG_2)
                .inner_margin(egui::Margin { left: 8, right: 8, top: 6, bottom: 6 })
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new("🗂 Clips").size(12.0).strong());
                        ui.label(
                            RichText::new(state.clips_dir.display().to_string())
                                .size(10.0)
                                .color(DARK_TEXT_DIM),
                        );
                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            if ui.button(RichText::new("⟳ Rescan").size(11.0)).clicked() {
                                cmd.push(EditorCommand::RescanClips);
                            }
                            if ui.button(RichText::new("📁 Change…").size(11.0)).clicked() {
                                cmd.push(EditorCommand::PickClipsDirectory);
                            }
                        });
                    });
                });

            ui.separator();

            if !state.library.is_empty() {
                ui.horizontal(|ui| {
                    ui.add_space(6.0);
                    ui.label(
                        RichText::new(format!("{} clips", state.library.len()))
                            .size(10.0)
                            .color(DARK_TEXT_DIM),
                    );
                });
            }

            // ── Clip grid ───────────────────────────────────────────────────
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(4.0);

                if state.library.is_empty() {
                    ui.add_space(40.0);
                    ui.vertical_centered(|ui| {
                        ui.label(RichText::new("🎮").size(32.0));
                        ui.add_space(6.0);
                        ui.label(
                            RichText::new("No clips found.\nPoint ClipTrim at your capture folder.")
                                .size(11.0)
                                .color(DARK_TEXT_DIM),
                        );
                        ui.add_space(10.0);
                        if ui.button("📁 Choose folder…").clicked() {
                            cmd.push(EditorCommand::PickClipsDirectory);
                        }
                    });
                    return;
                }

                ui.horizontal_wrapped(|ui| {
                    ui.spacing_mut().item_spacing = egui::vec2(6.0, 6.0);

                    for clip in &state.library {
                        let (card_rect, resp) = ui.allocate_exact_size(
                            Vec2::new(CARD_W, CARD_H),
                            Sense::click(),
                        );
                        let probed = clip.duration > 0.0;
                        let border = if resp.hovered() && probed { ACCENT } else { DARK_BORDER };

                        let painter = ui.painter();
                        painter.rect(
                            card_rect,
                            4.0,
                            DARK_BG_3,
                            Stroke::new(1.0, border),
                            egui::StrokeKind::Inside,
                        );

                        // Thumbnail strip across the card top.
                        let thumb_rect = Rect::from_min_size(
                            card_rect.min + egui::vec2(1.0, 1.0),
                            Vec2::new(CARD_W - 2.0, THUMB_H),
                        );
                        painter.rect_filled(thumb_rect, 3.0, Color32::BLACK);
                        if let Some(tex) = thumb_cache.get(&clip.id) {
                            painter.image(
                                tex.id(),
                                thumb_rect,
                                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                                Color32::WHITE,
                            );
                        } else {
                            painter.text(
                                thumb_rect.center(),
                                egui::Align2::CENTER_CENTER,
                                "🎬",
                                egui::FontId::proportional(20.0),
                                Color32::from_gray(60),
                            );
                        }

                        // Duration badge.
                        if probed {
                            let badge = format_duration(clip.duration);
                            let badge_pos = thumb_rect.max - egui::vec2(4.0, 4.0);
                            painter.text(
                                badge_pos,
                                egui::Align2::RIGHT_BOTTOM,
                                badge,
                                egui::FontId::monospace(10.0),
                                Color32::WHITE,
                            );
                        }

                        // Name + size row.
                        painter.text(
                            Pos2::new(card_rect.min.x + 6.0, thumb_rect.max.y + 5.0),
                            egui::Align2::LEFT_TOP,
                            truncate(&clip.name, 24),
                            egui::FontId::proportional(11.0),
                            Color32::from_gray(210),
                        );
                        painter.text(
                            Pos2::new(card_rect.min.x + 6.0, thumb_rect.max.y + 20.0),
                            egui::Align2::LEFT_TOP,
                            format_size(clip.size_bytes),
                            egui::FontId::proportional(9.0),
                            DARK_TEXT_DIM,
                        );

                        if resp.clicked() && probed {
                            cmd.push(EditorCommand::OpenClip(clip.id));
                        }
                        if probed {
                            resp.on_hover_text("Open in editor");
                        } else {
                            resp.on_hover_text("Probing…");
                        }
                    }
                });
            });
        });
    }
}
