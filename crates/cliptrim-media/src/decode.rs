// crates/cliptrim-media/src/decode.rs
//
// LiveDecoder: stateful per-clip decoder that avoids re-open/seek on every
// frame. Used by both the playback thread (sequential next_frame calls)
// and the scrub thread (burn/advance to an exact position).

use std::path::PathBuf;

use anyhow::Result;
use ffmpeg_the_third as ffmpeg;

use ffmpeg::format::{input, Pixel};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};

/// Preview frames are scaled down to at most this wide; the editor canvas
/// never shows more pixels than that and full-res RGBA copies are ~8 MB
/// per frame at 1440p.
const PREVIEW_MAX_W: u32 = 960;

pub struct LiveDecoder {
    pub path: PathBuf,
    ictx: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::video::Video,
    video_idx: usize,
    pub last_pts: i64,
    tb_num: i32,
    tb_den: i32,
    out_w: u32,
    out_h: u32,
    scaler: SwsContext,
}

impl LiveDecoder {
    pub fn open(path: &PathBuf, timestamp: f64) -> Result<Self> {
        let mut ictx = input(path)?;
        let video_idx = ictx
            .streams()
            .best(Type::Video)
            .ok_or_else(|| anyhow::anyhow!("no video stream"))?
            .index();

        let (tb_num, tb_den, seek_ts, raw_w, raw_h) = {
            let stream = ictx.stream(video_idx).unwrap();
            let tb = stream.time_base();
            let seek_ts = (timestamp * tb.denominator() as f64 / tb.numerator() as f64) as i64;
            let (w, h) = unsafe {
                let p = stream.parameters().as_ptr();
                ((*p).width as u32, (*p).height as u32)
            };
            (tb.numerator(), tb.denominator(), seek_ts, w, h)
        };

        if seek_ts > 0 {
            let _ = ictx.seek(seek_ts, ..=seek_ts);
        }

        // Second context for decoder params (Parameters borrows from Stream/ictx).
        let ictx2 = input(path)?;
        let stream2 = ictx2.stream(video_idx).unwrap();
        let dec_ctx = ffmpeg::codec::context::Context::from_parameters(stream2.parameters())?;
        let decoder = dec_ctx.decoder().video()?;

        let out_w = raw_w.clamp(2, PREVIEW_MAX_W) & !1;
        let out_h = ((out_w as f64 * raw_h as f64 / raw_w.max(1) as f64) as u32).max(2) & !1;

        let scaler = SwsContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGBA,
            out_w,
            out_h,
            Flags::BILINEAR,
        )?;

        Ok(Self {
            path: path.clone(),
            ictx,
            decoder,
            video_idx,
            last_pts: seek_ts,
            tb_num,
            tb_den,
            out_w,
            out_h,
            scaler,
        })
    }

    pub fn ts_to_pts(&self, t: f64) -> i64 {
        (t * self.tb_den as f64 / self.tb_num as f64) as i64
    }

    pub fn pts_to_secs(&self, pts: i64) -> f64 {
        pts as f64 * self.tb_num as f64 / self.tb_den as f64
    }

    /// Decode (without scaling) until we pass `target_pts`. The keyframe
    /// seek in `open` lands early; this burns through the GOP so the next
    /// `next_frame` call returns a frame at the requested position. Decode
    /// without scale is ~4x cheaper than advancing frame-by-frame.
    pub fn burn_to_pts(&mut self, target_pts: i64) {
        if self.last_pts >= target_pts {
            return;
        }
        for (stream, packet) in self.ictx.packets().flatten() {
            if stream.index() != self.video_idx {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            let mut decoded = ffmpeg::util::frame::video::Video::empty();
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.pts().unwrap_or(self.last_pts + 1);
                self.last_pts = pts;
                if pts >= target_pts {
                    return;
                }
            }
        }
    }

    /// Decode the next frame sequentially. Returns `(rgba, w, h, secs)`,
    /// or None at EOF.
    pub fn next_frame(&mut self) -> Option<(Vec<u8>, u32, u32, f64)> {
        for (stream, packet) in self.ictx.packets().flatten() {
            if stream.index() != self.video_idx {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            let mut decoded = ffmpeg::util::frame::video::Video::empty();
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.pts().unwrap_or(self.last_pts + 1);
                self.last_pts = pts;
                let secs = self.pts_to_secs(pts);
                let rgba = self.scale_rgba(&decoded)?;
                return Some((rgba, self.out_w, self.out_h, secs));
            }
        }
        None
    }

    /// Read forward until a frame at or past `target_pts`, scaling along
    /// the way. Falls back to the last decoded frame at EOF.
    pub fn advance_to(&mut self, target_pts: i64) -> Option<(Vec<u8>, u32, u32)> {
        let mut last_good: Option<Vec<u8>> = None;
        for (stream, packet) in self.ictx.packets().flatten() {
            if stream.index() != self.video_idx {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            let mut decoded = ffmpeg::util::frame::video::Video::empty();
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.pts().unwrap_or(self.last_pts + 1);
                self.last_pts = pts;
                let Some(rgba) = self.scale_rgba(&decoded) else {
                    return last_good.map(|d| (d, self.out_w, self.out_h));
                };
                if pts < target_pts {
                    last_good = Some(rgba);
                    continue;
                }
                return Some((rgba, self.out_w, self.out_h));
            }
        }
        last_good.map(|d| (d, self.out_w, self.out_h))
    }

    fn scale_rgba(&mut self, decoded: &ffmpeg::util::frame::video::Video) -> Option<Vec<u8>> {
        let mut out = ffmpeg::util::frame::video::Video::empty();
        self.scaler.run(decoded, &mut out).ok()?;
        let stride = out.stride(0);
        let raw = out.data(0);
        let row_bytes = self.out_w as usize * 4;
        Some(
            (0..self.out_h as usize)
                .flat_map(|row| &raw[row * stride..row * stride + row_bytes])
                .copied()
                .collect(),
        )
    }
}
