// crates/cliptrim-ui/src/modules/player.rs
//
// PlayerModule: preview canvas, transport bar, and the trim ruler. The
// ruler is the one place trim handles and the playhead are dragged; it
// emits SetTrimStart/SetTrimEnd/Seek and never touches the model itself.

use egui::{Color32, Pos2, Rect, RichText, Sense, Stroke, Ui, Vec2};

use cliptrim_core::commands::EditorCommand;
use cliptrim_core::helpers::time::format_time;
use cliptrim_core::state::AppState;

use super::EditorModule;
use crate::helpers::format::truncate;
use crate::modules::ThumbnailCache;
use crate::theme::{
    ACCENT, DARK_BG_2, DARK_BG_3, DARK_BORDER, DARK_TEXT_DIM, TRIM_CUT, TRIM_WINDOW,
};

// ── Transport bar layout constants ───────────────────────────────────────────
const BAR_H:    f32 = 48.0;
const BTN_SIZE: f32 = 30.0;
const BTN_R:    f32 = 4.0;
const ICON_SZ:  f32 = 9.0;
const GAP:      f32 = 4.0;
const SEP:      f32 = 18.0;
// skip(30)+gap+step(30)+gap+play(30)+gap+step(30)+gap+skip(30) = 166
//   + sep(18) + timecode(130) + sep(18) + skipsecs(70)         = 236
const CONTENT_W: f32 = 402.0;

// ── Ruler layout ─────────────────────────────────────────────────────────────
const RULER_H:    f32 = 34.0;
/// Half-width of the grab zone around each trim handle, in pixels.
const HANDLE_PAD: f32 = 7.0;

#[derive(Clone, Copy, PartialEq)]
enum DragTarget {
    Playhead,
    InPoint,
    OutPoint,
}

pub struct PlayerModule {
    /// Freshest decoded frame, handed over by app.rs before ui() runs.
    pub current_frame: Option<egui::TextureHandle>,
    /// Last good frame, held across scrub decode latency so the canvas
    /// never flashes back to the thumbnail.
    held_frame: Option<egui::TextureHandle>,
    drag: Option<DragTarget>,
}

impl PlayerModule {
    pub fn new() -> Self {
        Self { current_frame: None, held_frame: None, drag: None }
    }
}

impl EditorModule for PlayerModule {
    fn name(&self) -> &str {
        "Player"
    }

    fn ui(
        &mut self,
        ui: &mut Ui,
        state: &AppState,
        thumb_cache: &mut ThumbnailCache,
        cmd: &mut Vec<EditorCommand>,
    ) {
        let Some(session) = &state.editor else {
            self.held_frame = None;
            return;
        };
        let playing = session.playback.is_playing;
        let playhead = session.playback.current_time;

        // ── Hotkeys ──────────────────────────────────────────────────────
        let typing = ui.ctx().memory(|m| m.focused().is_some());
        if !typing {
            ui.input(|i| {
                if i.key_pressed(egui::Key::Space) {
                    cmd.push(if playing { EditorCommand::Pause } else { EditorCommand::Play });
                }
                if i.key_pressed(egui::Key::ArrowLeft) {
                    cmd.push(EditorCommand::SkipBy(-state.skip_seconds));
                }
                if i.key_pressed(egui::Key::ArrowRight) {
                    cmd.push(EditorCommand::SkipBy(state.skip_seconds));
                }
                if i.key_pressed(egui::Key::Comma) {
                    cmd.push(EditorCommand::StepFrame(-1));
                }
                if i.key_pressed(egui::Key::Period) {
                    cmd.push(EditorCommand::StepFrame(1));
                }
                if i.key_pressed(egui::Key::I) {
                    cmd.push(EditorCommand::SetTrimStart(playhead));
                }
                if i.key_pressed(egui::Key::O) {
                    cmd.push(EditorCommand::SetTrimEnd(playhead));
                }
            });
        }

        ui.vertical(|ui| {
            // ── Header ───────────────────────────────────────────────────
            egui::Frame::new()
                .fill(DARK_BG_2)
                .inner_margin(egui::Margin { left: 8, right: 8, top: 5, bottom: 5 })
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new("🎮").size(12.0));
                        ui.label(RichText::new(truncate(&session.name, 48)).size(12.0).strong());
                        ui.with_layout(
                            egui::Layout::right_to_left(egui::Align::Center),
                            |ui| {
                                if ui
                                    .button(RichText::new("← Library").size(11.0))
                                    .on_hover_text("Back to the clip library  (saves trim settings)")
                                    .clicked()
                                {
                                    cmd.push(EditorCommand::CloseEditor);
                                }
                            },
                        );
                    });
                });

            ui.add_space(4.0);

            // ── Video Canvas ─────────────────────────────────────────────
            let panel_w = ui.available_width();
            let panel_h = (ui.available_height() - BAR_H - RULER_H - 24.0).max(80.0);
            let ratio = 16.0 / 9.0;
            let (canvas_w, canvas_h) = {
                let h = panel_w / ratio;
                if h <= panel_h { (panel_w, h) } else { (panel_h * ratio, panel_h) }
            };

            let (outer_rect, _) =
                ui.allocate_exact_size(Vec2::new(panel_w, canvas_h), Sense::hover());
            let canvas = Rect::from_center_size(outer_rect.center(), Vec2::new(canvas_w, canvas_h));
            let painter = ui.painter();

            if playing {
                painter.rect_stroke(
                    canvas.expand(2.0),
                    4.0,
                    Stroke::new(1.5, ACCENT.gamma_multiply(0.55)),
                    egui::StrokeKind::Outside,
                );
            } else {
                painter.rect_stroke(
                    canvas.expand(1.0),
                    4.0,
                    Stroke::new(1.0, DARK_BORDER),
                    egui::StrokeKind::Outside,
                );
            }
            painter.rect_filled(canvas, 3.0, Color32::BLACK);

            if self.current_frame.is_some() {
                self.held_frame = self.current_frame.clone();
            }
            let canvas_tex = self.held_frame.as_ref().or_else(|| thumb_cache.get(&session.clip_id));
            if let Some(tex) = canvas_tex {
                painter.image(
                    tex.id(),
                    canvas,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );
            } else {
                // First frame not decoded yet — name + spinner.
                painter.text(
                    canvas.center() - egui::vec2(0.0, 20.0),
                    egui::Align2::CENTER_CENTER,
                    &session.name,
                    egui::FontId::proportional(13.0),
                    Color32::from_gray(70),
                );
                let t = ui.input(|i| i.time) as f32;
                let cx = canvas.center() + egui::vec2(0.0, 20.0);
                let r = 12.0_f32;
                painter.circle_stroke(cx, r, Stroke::new(1.5, Color32::from_gray(35)));
                let a = t * 3.5;
                painter.line_segment(
                    [cx, cx + egui::vec2(a.cos() * r, a.sin() * r)],
                    Stroke::new(2.0, ACCENT),
                );
                ui.ctx().request_repaint();
            }

            ui.add_space(6.0);
            self.transport_bar(ui, state, cmd);
            ui.add_space(6.0);
            self.trim_ruler(ui, state, cmd);

            // Keep the ruler's playhead moving while playing.
            if playing {
                ui.ctx().request_repaint();
            }
        });
    }
}

impl PlayerModule {
    // ── Transport bar ─────────────────────────────────────────────────────────
    // Full-width bar; every control placed with coordinate math from the
    // bar center so buttons are always the same pixel size.
    fn transport_bar(&mut self, ui: &mut Ui, state: &AppState, cmd: &mut Vec<EditorCommand>) {
        let Some(session) = &state.editor else { return };
        let playing = session.playback.is_playing;

        let bar_w = ui.available_width();
        let (bar_rect, _) = ui.allocate_exact_size(Vec2::new(bar_w, BAR_H), Sense::hover());

        let painter = ui.painter();
        painter.rect_filled(bar_rect, BTN_R, DARK_BG_3);
        painter.rect_stroke(bar_rect, BTN_R, Stroke::new(1.0, DARK_BORDER), egui::StrokeKind::Outside);

        let cy = bar_rect.center().y;
        let mut x = bar_rect.center().x - CONTENT_W / 2.0;

        // ── Helper: one fixed-size transport button ───────────────────
        macro_rules! tbtn {
            ($id:expr, $active:expr, $tip:expr, $draw_icon:expr) => {{
                let r = Rect::from_min_size(
                    Pos2::new(x, cy - BTN_SIZE / 2.0),
                    Vec2::splat(BTN_SIZE),
                );
                let resp = ui
                    .interact(r, ui.id().with($id), Sense::click())
                    .on_hover_text($tip);
                let (bg, icol) = if resp.is_pointer_button_down_on() {
                    (DARK_BG_2.gamma_multiply(0.6), Color32::WHITE)
                } else if resp.hovered() {
                    (DARK_BG_2, ACCENT.linear_multiply(1.2))
                } else if $active {
                    (DARK_BG_3, ACCENT)
                } else {
                    (DARK_BG_3, Color32::from_gray(175))
                };
                painter.rect_filled(r, BTN_R, bg);
                if resp.hovered() || $active {
                    painter.rect_stroke(
                        r,
                        BTN_R,
                        Stroke::new(1.0, ACCENT.gamma_multiply(0.35)),
                        egui::StrokeKind::Outside,
                    );
                }
                let c = r.center();
                $draw_icon(c, icol);
                x += BTN_SIZE;
                resp.clicked()
            }};
        }

        let skip = state.skip_seconds;

        // ── Skip back ─────────────────────────────────────────────────
        if tbtn!("skip_back", false, format!("Back {skip:.0}s  (←)"), |c: Pos2, col: Color32| {
            for ox in [-ICON_SZ * 0.55, ICON_SZ * 0.45] {
                painter.add(egui::Shape::convex_polygon(
                    vec![
                        Pos2::new(c.x + ox - ICON_SZ * 0.5, c.y),
                        Pos2::new(c.x + ox + ICON_SZ * 0.5, c.y - ICON_SZ + 2.0),
                        Pos2::new(c.x + ox + ICON_SZ * 0.5, c.y + ICON_SZ - 2.0),
                    ],
                    col,
                    Stroke::NONE,
                ));
            }
        }) {
            cmd.push(EditorCommand::SkipBy(-skip));
        }
        x += GAP;

        // ── Frame back ────────────────────────────────────────────────
        if tbtn!("frame_back", false, "Previous frame  (,)", |c: Pos2, col: Color32| {
            painter.rect_filled(
                Rect::from_center_size(Pos2::new(c.x - ICON_SZ * 0.6, c.y), Vec2::new(2.5, ICON_SZ * 1.6)),
                0.5,
                col,
            );
            painter.add(egui::Shape::convex_polygon(
                vec![
                    Pos2::new(c.x - ICON_SZ * 0.1, c.y),
                    Pos2::new(c.x + ICON_SZ * 0.8, c.y - ICON_SZ + 2.0),
                    Pos2::new(c.x + ICON_SZ * 0.8, c.y + ICON_SZ - 2.0),
                ],
                col,
                Stroke::NONE,
            ));
        }) {
            cmd.push(EditorCommand::StepFrame(-1));
        }
        x += GAP;

        // ── Play / Pause ──────────────────────────────────────────────
        if tbtn!("play_pause", playing, "Play / Pause  (Space)", |c: Pos2, col: Color32| {
            if playing {
                for ox in [-ICON_SZ * 0.45, ICON_SZ * 0.45] {
                    painter.rect_filled(
                        Rect::from_center_size(Pos2::new(c.x + ox, c.y), Vec2::new(3.0, ICON_SZ * 1.8)),
                        1.0,
                        col,
                    );
                }
            } else {
                painter.add(egui::Shape::convex_polygon(
                    vec![
                        Pos2::new(c.x - ICON_SZ * 0.5, c.y - ICON_SZ),
                        Pos2::new(c.x - ICON_SZ * 0.5, c.y + ICON_SZ),
                        Pos2::new(c.x + ICON_SZ, c.y),
                    ],
                    col,
                    Stroke::NONE,
                ));
            }
        }) {
            cmd.push(if playing { EditorCommand::Pause } else { EditorCommand::Play });
        }
        x += GAP;

        // ── Frame forward ─────────────────────────────────────────────
        if tbtn!("frame_fwd", false, "Next frame  (.)", |c: Pos2, col: Color32| {
            painter.add(egui::Shape::convex_polygon(
                vec![
                    Pos2::new(c.x + ICON_SZ * 0.1, c.y),
                    Pos2::new(c.x - ICON_SZ * 0.8, c.y - ICON_SZ + 2.0),
                    Pos2::new(c.x - ICON_SZ * 0.8, c.y + ICON_SZ - 2.0),
                ],
                col,
                Stroke::NONE,
            ));
            painter.rect_filled(
                Rect::from_center_size(Pos2::new(c.x + ICON_SZ * 0.6, c.y), Vec2::new(2.5, ICON_SZ * 1.6)),
                0.5,
                col,
            );
        }) {
            cmd.push(EditorCommand::StepFrame(1));
        }
        x += GAP;

        // ── Skip forward ──────────────────────────────────────────────
        if tbtn!("skip_fwd", false, format!("Forward {skip:.0}s  (→)"), |c: Pos2, col: Color32| {
            for ox in [-ICON_SZ * 0.45, ICON_SZ * 0.55] {
                painter.add(egui::Shape::convex_polygon(
                    vec![
                        Pos2::new(c.x + ox + ICON_SZ * 0.5, c.y),
                        Pos2::new(c.x + ox - ICON_SZ * 0.5, c.y - ICON_SZ + 2.0),
                        Pos2::new(c.x + ox - ICON_SZ * 0.5, c.y + ICON_SZ - 2.0),
                    ],
                    col,
                    Stroke::NONE,
                ));
            }
        }) {
            cmd.push(EditorCommand::SkipBy(skip));
        }
        x += SEP;

        // ── Timecode ──────────────────────────────────────────────────
        painter.text(
            Pos2::new(x, cy),
            egui::Align2::LEFT_CENTER,
            format!(
                "{} / {}",
                format_time(session.playback.current_time),
                format_time(session.trim.duration())
            ),
            egui::FontId::monospace(12.0),
            ACCENT,
        );
        x += 130.0 + SEP;

        // ── Skip amount ───────────────────────────────────────────────
        let drag_rect =
            Rect::from_min_size(Pos2::new(x, cy - BTN_SIZE / 2.0), Vec2::new(70.0, BTN_SIZE));
        let mut skip_secs = state.skip_seconds;
        let resp = ui.put(
            drag_rect,
            egui::DragValue::new(&mut skip_secs)
                .range(0.5..=30.0)
                .speed(0.5)
                .suffix(" s"),
        );
        if resp.changed() {
            cmd.push(EditorCommand::SetSkipSeconds(skip_secs));
        }
        resp.on_hover_text("Skip distance for ← / →");
    }

    // ── Trim ruler ────────────────────────────────────────────────────────────
    fn trim_ruler(&mut self, ui: &mut Ui, state: &AppState, cmd: &mut Vec<EditorCommand>) {
        let Some(session) = &state.editor else { return };
        let duration = session.trim.duration();
        let (t_start, t_end) = (session.trim.start(), session.trim.end());

        let ruler_w = ui.available_width();
        let (rect, resp) = ui.allocate_exact_size(
            Vec2::new(ruler_w, RULER_H),
            Sense::click_and_drag(),
        );
        let to_x = |t: f64| rect.min.x + (t / duration.max(1e-9)) as f32 * rect.width();
        let to_t = |px: f32| {
            (((px - rect.min.x) / rect.width().max(1.0)) as f64 * duration).clamp(0.0, duration)
        };

        let painter = ui.painter();

        // Track: cut regions dim red, kept window teal.
        painter.rect_filled(rect, 3.0, TRIM_CUT);
        let window = Rect::from_min_max(
            Pos2::new(to_x(t_start), rect.min.y),
            Pos2::new(to_x(t_end), rect.max.y),
        );
        painter.rect_filled(window, 0.0, TRIM_WINDOW);
        painter.rect_stroke(rect, 3.0, Stroke::new(1.0, DARK_BORDER), egui::StrokeKind::Outside);

        // Trim handles.
        for (t, label) in [(t_start, "in"), (t_end, "out")] {
            let hx = to_x(t);
            painter.rect_filled(
                Rect::from_center_size(Pos2::new(hx, rect.center().y), Vec2::new(4.0, RULER_H)),
                1.0,
                ACCENT,
            );
            painter.text(
                Pos2::new(hx, rect.max.y + 2.0),
                egui::Align2::CENTER_TOP,
                format!("{label} {}", format_time(t)),
                egui::FontId::monospace(9.0),
                DARK_TEXT_DIM,
            );
        }

        // Playhead.
        let px = to_x(session.playback.current_time);
        painter.line_segment(
            [Pos2::new(px, rect.min.y - 3.0), Pos2::new(px, rect.max.y + 3.0)],
            Stroke::new(2.0, Color32::WHITE),
        );
        painter.add(egui::Shape::convex_polygon(
            vec![
                Pos2::new(px - 5.0, rect.min.y - 3.0),
                Pos2::new(px + 5.0, rect.min.y - 3.0),
                Pos2::new(px, rect.min.y + 4.0),
            ],
            Color32::WHITE,
            Stroke::NONE,
        ));

        // ── Interaction ───────────────────────────────────────────────
        // Drag target is locked on press: nearest handle within
        // HANDLE_PAD, otherwise the playhead. Keeps a drag from hopping
        // between handle and playhead when they cross.
        if resp.drag_started() || resp.clicked() {
            let target = resp
                .interact_pointer_pos()
                .map(|p| {
                    if (p.x - to_x(t_start)).abs() <= HANDLE_PAD {
                        DragTarget::InPoint
                    } else if (p.x - to_x(t_end)).abs() <= HANDLE_PAD {
                        DragTarget::OutPoint
                    } else {
                        DragTarget::Playhead
                    }
                })
                .unwrap_or(DragTarget::Playhead);
            self.drag = Some(target);
        }

        if let (Some(target), Some(pos)) = (self.drag, resp.interact_pointer_pos()) {
            let t = to_t(pos.x);
            match target {
                DragTarget::Playhead => cmd.push(EditorCommand::Seek(t)),
                DragTarget::InPoint => cmd.push(EditorCommand::SetTrimStart(t)),
                DragTarget::OutPoint => cmd.push(EditorCommand::SetTrimEnd(t)),
            }
        }

        if !ui.input(|i| i.pointer.primary_down()) {
            self.drag = None;
        }
    }
}
