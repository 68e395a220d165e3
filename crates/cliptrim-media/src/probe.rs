// crates/cliptrim-media/src/probe.rs
//
// In-process FFmpeg probing: duration, video geometry + fps, thumbnail.

use std::path::PathBuf;

use crossbeam_channel::Sender;
use ffmpeg_the_third as ffmpeg;
use uuid::Uuid;

use ffmpeg::format::{input, Pixel};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};

use cliptrim_core::media_types::MediaResult;

use crate::helpers::seek::seek_to_secs;

/// Container duration in seconds, falling back to the best stream's own
/// duration when the container header doesn't carry one.
pub fn probe_duration(path: &PathBuf) -> Result<f64, String> {
    let ctx = input(path).map_err(|e| format!("open: {e}"))?;
    let dur = ctx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64;
    if dur > 0.0 {
        return Ok(dur);
    }
    if let Some(stream) = ctx
        .streams()
        .best(Type::Video)
        .or_else(|| ctx.streams().best(Type::Audio))
    {
        let tb = stream.time_base();
        let d = stream.duration() as f64 * tb.numerator() as f64 / tb.denominator() as f64;
        if d > 0.0 {
            return Ok(d);
        }
    }
    Err("duration unknown".into())
}

/// Full library probe: duration, video geometry, fps, and a 320-wide
/// thumbnail grabbed ~10% into the clip, all sent over `tx`.
pub fn probe_clip(path: &PathBuf, id: Uuid, tx: &Sender<MediaResult>) {
    let duration = match probe_duration(path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[probe] {}: {e}", path.display());
            let _ = tx.send(MediaResult::Error { id, msg: e });
            return;
        }
    };

    let Ok(mut ictx) = input(path) else { return };
    let video_idx = match ictx.streams().best(Type::Video) {
        Some(s) => s.index(),
        None => {
            // Audio-only file: still report the duration so the library
            // shows something sensible.
            let _ = tx.send(MediaResult::ClipProbed {
                id,
                duration,
                width: 0,
                height: 0,
                fps: 0.0,
            });
            return;
        }
    };

    let (raw_w, raw_h, fps) = {
        let stream = ictx.stream(video_idx).unwrap();
        let (w, h) = unsafe {
            let p = stream.parameters().as_ptr();
            ((*p).width as u32, (*p).height as u32)
        };
        let r = stream.avg_frame_rate();
        let fps = if r.denominator() > 0 {
            r.numerator() as f64 / r.denominator() as f64
        } else {
            0.0
        };
        (w, h, fps)
    };

    eprintln!(
        "[probe] {:.2}s {raw_w}x{raw_h} @{fps:.2} ← {}",
        duration,
        path.display()
    );
    let _ = tx.send(MediaResult::ClipProbed {
        id,
        duration,
        width: raw_w,
        height: raw_h,
        fps,
    });

    // Grab the thumbnail away from the opening black frame.
    let thumb_at = if duration > 2.0 { (duration * 0.1).max(1.0) } else { 0.0 };
    seek_to_secs(&mut ictx, thumb_at, "probe_clip");

    // Second context for decoder params (Parameters borrows from ictx).
    let Ok(ictx2) = input(path) else { return };
    let Some(stream2) = ictx2.stream(video_idx) else { return };
    let dec_ctx = match ffmpeg::codec::context::Context::from_parameters(stream2.parameters()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[probe] codec ctx: {e}");
            return;
        }
    };
    let Ok(mut decoder) = dec_ctx.decoder().video() else { return };

    let thumb_w: u32 = 320;
    let thumb_h: u32 =
        ((thumb_w as f64 * raw_h as f64 / raw_w.max(1) as f64) as u32).max(2) & !1;

    let mut scaler = match SwsContext::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        Pixel::RGBA,
        thumb_w,
        thumb_h,
        Flags::BILINEAR,
    ) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[probe] thumbnail scaler: {e}");
            return;
        }
    };

    'outer: for (stream, packet) in ictx.packets().flatten() {
        if stream.index() != video_idx {
            continue;
        }
        if decoder.send_packet(&packet).is_err() {
            continue;
        }
        let mut decoded = ffmpeg::util::frame::video::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgba_frame = ffmpeg::util::frame::video::Video::empty();
            if scaler.run(&decoded, &mut rgba_frame).is_err() {
                continue;
            }
            // Copy only visible pixels, not stride padding.
            let stride = rgba_frame.stride(0);
            let raw = rgba_frame.data(0);
            let row_bytes = thumb_w as usize * 4;
            let rgba: Vec<u8> = (0..thumb_h as usize)
                .flat_map(|row| &raw[row * stride..row * stride + row_bytes])
                .copied()
                .collect();
            let _ = tx.send(MediaResult::Thumbnail {
                id,
                width: thumb_w as usize,
                height: thumb_h as usize,
                rgba,
            });
            break 'outer;
        }
    }
}
