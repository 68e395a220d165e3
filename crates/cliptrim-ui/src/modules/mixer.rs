// crates/cliptrim-ui/src/modules/mixer.rs
//
// MixerModule: the two-track strip at the bottom of the editor, plus all
// rodio playback logic in tick(). Each track gets its own Sink fed by a
// TrackSource over the extracted PCM, so per-track volume is just
// Sink::set_volume — no remixing on a settings change.

use std::sync::Arc;
use std::time::Duration;

use egui::{RichText, Ui};
use rodio::{ChannelCount, SampleRate, Source};

use cliptrim_core::clip::{TRACK_COUNT, TRACK_LABELS};
use cliptrim_core::commands::EditorCommand;
use cliptrim_core::media_types::TrackPcm;
use cliptrim_core::playback::AudioCmd;
use cliptrim_core::state::AppState;

use super::EditorModule;
use crate::cliptrim_log;
use crate::context::AppContext;
use crate::modules::ThumbnailCache;
use crate::theme::{ACCENT, DARK_BG_2, DARK_TEXT_DIM};

// ── TrackSource ──────────────────────────────────────────────────────────────

/// rodio source over one track's interleaved stereo f32 PCM, starting at a
/// sample offset. The Arc is shared with the context cache — starting
/// playback never copies the buffer.
pub struct TrackSource {
    samples: Arc<Vec<f32>>,
    pos: usize,
}

impl TrackSource {
    pub fn from_offset(pcm: &TrackPcm, secs: f64) -> Self {
        let frame = (secs.max(0.0) * TrackPcm::SAMPLE_RATE as f64) as usize;
        // Keep the offset frame-aligned or left/right channels swap.
        let pos = (frame * TrackPcm::CHANNELS as usize).min(pcm.samples.len());
        Self { samples: Arc::clone(&pcm.samples), pos }
    }
}

impl Iterator for TrackSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let s = self.samples.get(self.pos).copied();
        self.pos += 1;
        s
    }
}

impl Source for TrackSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> ChannelCount {
        TrackPcm::CHANNELS
    }

    fn sample_rate(&self) -> SampleRate {
        TrackPcm::SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        let remaining = self.samples.len().saturating_sub(self.pos);
        Some(Duration::from_secs_f64(
            remaining as f64 / (TrackPcm::SAMPLE_RATE as f64 * TrackPcm::CHANNELS as f64),
        ))
    }
}

// ── Module ───────────────────────────────────────────────────────────────────

pub struct MixerModule {
    /// Which tracks actually decoded, set by app.rs from the context each
    /// frame so ui() can grey out absent streams.
    pub track_present: [bool; TRACK_COUNT],
}

impl MixerModule {
    pub fn new() -> Self {
        Self { track_present: [false; TRACK_COUNT] }
    }

    fn start_sinks(ctx: &mut AppContext, gains: [f32; TRACK_COUNT], offset: f64) {
        let Some(stream) = &ctx.audio.stream else { return };
        for slot in 0..TRACK_COUNT {
            ctx.audio.sinks[slot] = ctx.audio.pcm[slot].as_ref().map(|pcm| {
                let sink = rodio::Sink::connect_new(stream.mixer());
                sink.append(TrackSource::from_offset(pcm, offset));
                sink.set_volume(gains[slot]);
                sink.play();
                sink
            });
        }
    }
}

impl EditorModule for MixerModule {
    fn name(&self) -> &str {
        "Mixer"
    }

    fn ui(
        &mut self,
        ui: &mut Ui,
        state: &AppState,
        _thumb_cache: &mut ThumbnailCache,
        cmd: &mut Vec<EditorCommand>,
    ) {
        let Some(session) = &state.editor else { return };

        egui::Frame::new()
            .fill(DARK_BG_2)
            .inner_margin(egui::Margin { left: 8, right: 8, top: 5, bottom: 5 })
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("🎚 Audio Tracks").size(12.0).strong());
                });
            });
        ui.add_space(4.0);

        for (track, label) in TRACK_LABELS.iter().enumerate() {
            let settings = session.tracks[track];
            let present = self.track_present[track];

            ui.horizontal(|ui| {
                ui.add_space(6.0);

                let mut enabled = settings.enabled;
                if ui
                    .checkbox(&mut enabled, RichText::new(*label).size(11.0))
                    .on_hover_text("Include this track in exports")
                    .changed()
                {
                    cmd.push(EditorCommand::SetTrackEnabled { track, enabled });
                }

                // Fixed label column so the sliders line up.
                let used = ui.min_rect().width();
                ui.add_space((140.0 - used).max(0.0));

                let mute_label = if settings.muted { "🔇" } else { "🔊" };
                let mute_color = if settings.muted {
                    egui::Color32::from_rgb(200, 70, 70)
                } else {
                    DARK_TEXT_DIM
                };
                if ui
                    .add_enabled(
                        settings.enabled,
                        egui::Button::new(RichText::new(mute_label).size(12.0).color(mute_color)),
                    )
                    .on_hover_text("Mute preview only — exports are unaffected")
                    .clicked()
                {
                    cmd.push(EditorCommand::SetTrackMuted { track, muted: !settings.muted });
                }

                let mut volume = settings.volume;
                let slider = egui::Slider::new(&mut volume, 0.0_f32..=1.0_f32)
                    .show_value(false)
                    .trailing_fill(true);
                if ui.add_enabled(settings.enabled, slider).changed() {
                    cmd.push(EditorCommand::SetTrackVolume { track, volume });
                }
                ui.label(
                    RichText::new(format!("{:>3.0}%", settings.volume * 100.0))
                        .size(10.0)
                        .monospace()
                        .color(if settings.enabled { ACCENT } else { DARK_TEXT_DIM }),
                );

                if !present {
                    ui.label(RichText::new("no audio stream").size(10.0).color(DARK_TEXT_DIM));
                }
            });
        }
    }

    /// Owns the audio device. Lazy stream init, warmup, deferred
    /// AudioCmd execution, and continuous gain sync.
    fn tick(&mut self, state: &AppState, ctx: &mut AppContext) {
        // Lazy init: the stream is created on the first tick rather than
        // at AppContext::new() time. In Windows GUI-subsystem mode,
        // WASAPI needs the Win32 message loop running first.
        if ctx.audio.stream.is_none() {
            match rodio::OutputStreamBuilder::open_default_stream() {
                Ok(stream) => {
                    ctx.audio.stream = Some(stream);
                    // ~83 ms at 60 fps for WASAPI session registration.
                    ctx.audio.warmup_ticks = 5;
                }
                Err(e) => {
                    cliptrim_log!("[mixer] stream init failed: {e}");
                    return;
                }
            }
        }
        if ctx.audio.warmup_ticks > 0 {
            ctx.audio.warmup_ticks -= 1;
            return;
        }

        let Some(session) = &state.editor else {
            ctx.audio.sinks = Default::default();
            return;
        };
        self.track_present = [
            ctx.audio.pcm[0].is_some(),
            ctx.audio.pcm[1].is_some(),
        ];

        let gains = [session.tracks[0].gain(), session.tracks[1].gain()];

        // Execute the deferred plan from the last transport event.
        if let Some(pending) = ctx.audio.pending.take() {
            match pending {
                AudioCmd::Start(offset) => {
                    // PCM may still be extracting; keep the command queued
                    // and the mixer joins in when it lands.
                    if ctx.audio.pcm.iter().any(|p| p.is_some()) {
                        Self::start_sinks(ctx, gains, offset);
                    } else {
                        ctx.audio.pending = Some(AudioCmd::Start(offset));
                    }
                }
                AudioCmd::Stop => {
                    // Dropping a Sink stops its playback.
                    ctx.audio.sinks = Default::default();
                }
                AudioCmd::None => {}
            }
            return;
        }

        // Volume/mute changes apply live without rebuilding sinks.
        if session.playback.is_playing {
            for slot in 0..TRACK_COUNT {
                if let Some(sink) = &ctx.audio.sinks[slot] {
                    sink.set_volume(gains[slot]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(frames: usize) -> TrackPcm {
        // Interleaved stereo: left = frame index, right = negative.
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            samples.push(i as f32);
            samples.push(-(i as f32));
        }
        TrackPcm { samples: Arc::new(samples) }
    }

    #[test]
    fn offset_is_frame_aligned() {
        let p = pcm(44_100 * 2);
        let mut src = TrackSource::from_offset(&p, 1.0);
        // First sample at 1.0s must be a left-channel sample (non-negative).
        let first = src.next().unwrap();
        assert_eq!(first, 44_100.0);
        let second = src.next().unwrap();
        assert_eq!(second, -44_100.0);
    }

    #[test]
    fn offset_past_end_is_empty() {
        let p = pcm(100);
        let mut src = TrackSource::from_offset(&p, 10.0);
        assert_eq!(src.next(), None);
    }

    #[test]
    fn negative_offset_clamps_to_start() {
        let p = pcm(100);
        let mut src = TrackSource::from_offset(&p, -3.0);
        assert_eq!(src.next(), Some(0.0));
    }

    #[test]
    fn total_duration_tracks_remaining_samples() {
        let p = pcm(44_100);
        let src = TrackSource::from_offset(&p, 0.5);
        let d = src.total_duration().unwrap().as_secs_f64();
        assert!((d - 0.5).abs() < 1e-6);
    }
}
