// crates/cliptrim-ui/src/modules/video_module.rs
//
// All scrub/playback frame plumbing. Not a panel — poll_playback() and
// tick() are called every frame from app.rs and drive the decode pipeline
// behind whatever the player canvas shows.

use cliptrim_core::media_types::PlaybackFrame;
use cliptrim_core::state::AppState;

use crate::context::{load_frame_texture, AppContext};

// ── poll_playback ─────────────────────────────────────────────────────────

/// PTS-gated playback frame consumption. Call before ingesting worker
/// results.
///
/// The decode thread pre-fills a 32-frame channel as fast as FFmpeg can
/// go. Draining it and showing the last frame races ahead at decode
/// speed. Instead, a one-slot pending buffer holds the next frame and
/// it is only promoted to the canvas once the app clock has caught up
/// to its PTS.
pub fn poll_playback(state: &AppState, ctx: &mut AppContext, egui_ctx: &egui::Context) {
    let Some(session) = &state.editor else { return };
    if !session.playback.is_playing {
        return;
    }
    let t = session.playback.current_time;

    // Discard a pending frame that can never be promoted: one from a
    // previous clip, or one so far behind the clock (seek landed, burn
    // overshot) that waiting for it would freeze the canvas.
    if let Some(pending) = &ctx.cache.pending_pb_frame {
        let wrong_clip = pending.clip_id != session.clip_id;
        let too_old = pending.pts_secs < t - 3.0;
        if wrong_clip || too_old {
            ctx.cache.pending_pb_frame = None;
        }
    }

    // Step 1: fill the pending slot if empty.
    if ctx.cache.pending_pb_frame.is_none() {
        if let Ok(f) = ctx.media_worker.pb_rx.try_recv() {
            ctx.cache.pending_pb_frame = Some(f);
        }
    }

    // Step 2: fast-forward past overdue frames. After a seek this
    // drains the early-GOP frames in a single tick.
    while ctx
        .cache
        .pending_pb_frame
        .as_ref()
        .map(|f: &PlaybackFrame| f.pts_secs < t - (1.0 / 30.0))
        .unwrap_or(false)
    {
        match ctx.media_worker.pb_rx.try_recv() {
            Ok(newer) => ctx.cache.pending_pb_frame = Some(newer),
            Err(_) => break,
        }
    }

    // Step 3: promote when due. Upper bound: never show a frame more
    // than one tick early. Lower bound: 3 s covers the worst-case GOP
    // burn after a keyframe seek.
    let frame_due = ctx
        .cache
        .pending_pb_frame
        .as_ref()
        .map(|f| {
            f.clip_id == session.clip_id
                && f.pts_secs <= t + (1.0 / 60.0)
                && f.pts_secs >= t - 3.0
        })
        .unwrap_or(false);

    if frame_due {
        if let Some(f) = ctx.cache.pending_pb_frame.take() {
            ctx.cache.frame = Some(load_frame_texture(egui_ctx, &f));
            egui_ctx.request_repaint();
            // Pre-pull the next frame so it's ready for the next tick.
            if let Ok(next) = ctx.media_worker.pb_rx.try_recv() {
                ctx.cache.pending_pb_frame = Some(next);
            }
        }
    }
}

// ── tick ──────────────────────────────────────────────────────────────────

/// Playback start/stop edges plus paused-scrub frame requests. Call
/// every frame after commands are processed.
pub fn tick(state: &AppState, ctx: &mut AppContext) {
    let Some(session) = &state.editor else {
        if ctx.playback.prev_playing {
            ctx.media_worker.stop_playback();
        }
        ctx.playback.prev_playing = false;
        ctx.playback.playing_clip = None;
        return;
    };

    let playing = session.playback.is_playing;
    let just_started = playing && !ctx.playback.prev_playing;
    let just_stopped = !playing && ctx.playback.prev_playing;
    ctx.playback.prev_playing = playing;

    // A trim job is about to rename over the source; no new decoder may
    // open it until TrimApplied/TrimFailed lands and the caches reset.
    if state.trim_job.is_some() {
        return;
    }

    if playing {
        let clip_changed = ctx.playback.playing_clip != Some(session.clip_id);
        let gen_changed = ctx.playback.playing_generation != session.source_generation;
        if just_started || clip_changed || gen_changed {
            ctx.playback.playing_clip = Some(session.clip_id);
            ctx.playback.playing_generation = session.source_generation;
            ctx.cache.pending_pb_frame = None;
            ctx.media_worker.start_playback(
                session.clip_id,
                session.path.clone(),
                session.playback.current_time,
            );
        }
        return;
    }

    if just_stopped {
        ctx.media_worker.stop_playback();
        ctx.playback.playing_clip = None;
        ctx.cache.pending_pb_frame = None;
        // Force a scrub request at the pause position so the canvas
        // shows exactly where the playhead stopped.
        ctx.playback.last_frame_req = None;
    }

    // Paused scrub: any position change over ~10 ms fires a request.
    // The worker's latest-wins slot is the rate limiter.
    let t = session.playback.current_time;
    let moved = ctx
        .playback
        .last_frame_req
        .map(|last| (last - t).abs() > 0.010)
        .unwrap_or(true);
    if moved {
        ctx.playback.last_frame_req = Some(t);
        ctx.media_worker
            .request_frame(session.clip_id, session.path.clone(), t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliptrim_core::clip::ClipInfo;
    use cliptrim_core::state::EditorSession;
    use std::path::PathBuf;

    #[test]
    fn tick_requests_no_frames_while_a_trim_runs() {
        let mut clip = ClipInfo::from_path(PathBuf::from("game.mp4"), 1024);
        clip.duration = 30.0;
        let mut state = AppState::default();
        state.editor = Some(EditorSession::open(&clip, None));
        state.trim_job = Some(uuid::Uuid::new_v4());

        let mut ctx = AppContext::new();
        tick(&state, &mut ctx);

        // Without the guard the paused-scrub path would have fired a
        // request at the playhead and recorded it here.
        assert_eq!(ctx.playback.last_frame_req, None);
    }
}
