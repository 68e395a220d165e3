// crates/cliptrim-media/src/transcode.rs
//
// Executes a TranscodeJob built by job.rs, plus the stream-copy remux used
// by trim-in-place. Blocking — run on a dedicated thread.
//
// Output stream layout:
//   Stream 0 — video: stream copy, or H.264 (YUV420P, preset fast) with
//              either CRF or the size-targeted bitrate from the job.
//   Stream 1 — audio: absent, stream copy, or AAC (FLTP stereo, 44100 Hz,
//              128 kbps) fed by the per-track gain + mix FIFOs.
//
// PTS strategy for encoded streams mirrors the playback-from-zero rule:
//   Video: output frame counter in 1/fps.
//   Audio: output sample counter in 1/44100.
// Copied streams instead subtract the timestamp of the first kept video
// packet, so a copy-trimmed file also starts near zero.

use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use ffmpeg_the_third as ffmpeg;

use ffmpeg::codec::{self, Id as CodecId};
use ffmpeg::encoder;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::{input as open_input, output as open_output, Pixel, Sample};
use ffmpeg::media::Type as MediaType;
use ffmpeg::software::resampling;
use ffmpeg::software::scaling::{Context as ScaleCtx, Flags as ScaleFlags};
use ffmpeg::util::channel_layout::{ChannelLayout, ChannelLayoutMask};
use ffmpeg::util::frame::audio::Audio as AudioFrame;
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::util::rational::Rational;
use ffmpeg::Packet;

use cliptrim_core::media_types::MediaResult;

use crate::helpers::seek::seek_to_secs;
use crate::job::{AudioMode, RateControl, TranscodeJob, VideoMode};

/// Send a progress update every this many encoded video frames.
const PROGRESS_INTERVAL: i64 = 15;

const AUDIO_RATE: i32 = 44_100;
const AUDIO_BITRATE: usize = 128_000;

/// Run `job` to completion, reporting progress / done / error over `tx`.
/// The path in `TranscodeDone` is the one actually written, which gets a
/// numeric suffix when the requested name is already taken.
pub fn run_transcode(job: TranscodeJob, tx: Sender<MediaResult>) {
    let output = unique_output(&job.output);
    match execute(&job, &output, &tx) {
        Ok(()) => {
            eprintln!("[transcode] done → {}", output.display());
            let _ = tx.send(MediaResult::TranscodeDone { job_id: job.job_id, output });
        }
        Err(e) => {
            eprintln!("[transcode] failed: {e}");
            // Never leave a half-written file behind.
            let _ = std::fs::remove_file(&output);
            let _ = tx.send(MediaResult::TranscodeError { job_id: job.job_id, msg: e });
        }
    }
}

/// First free variant of `path`: `clip.mp4`, then `clip-1.mp4`,
/// `clip-2.mp4`, … Re-exporting under the same filename must never
/// truncate an earlier export.
fn unique_output(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".into());
    let ext = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".into());
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}-{n}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

// ── Per-track audio state ───────────────────────────────────────────────

/// Stereo FLTP sample buffer with the track's export gain baked in at
/// push time.
struct TrackFifo {
    left: Vec<f32>,
    right: Vec<f32>,
    gain: f32,
}

impl TrackFifo {
    fn len(&self) -> usize {
        self.left.len()
    }

    /// Append one FLTP frame, scaling by the track gain. Mono frames are
    /// duplicated to both channels.
    fn push(&mut self, frame: &AudioFrame) {
        let n = frame.samples();
        if n == 0 {
            return;
        }
        unsafe {
            let l = std::slice::from_raw_parts(frame.data(0).as_ptr() as *const f32, n);
            self.left.extend(l.iter().map(|s| s * self.gain));

            let r_plane = if frame.ch_layout().channels() >= 2 {
                frame.data(1)
            } else {
                frame.data(0)
            };
            let r = std::slice::from_raw_parts(r_plane.as_ptr() as *const f32, n);
            self.right.extend(r.iter().map(|s| s * self.gain));
        }
    }
}

/// One source audio stream feeding the mix.
struct MixTrack {
    stream_idx: usize,
    decoder: ffmpeg::decoder::audio::Audio,
    in_tb: Rational,
    resampler: Option<resampling::Context>,
    fifo: TrackFifo,
    /// Set once this stream's PTS passes the trim out-point; the fifo
    /// remainder is zero-padded from then on.
    ended: bool,
}

impl MixTrack {
    /// Decode, resample to FLTP stereo 44100, gain, buffer.
    fn ingest(&mut self, frame: &AudioFrame) {
        let target_fmt = Sample::F32(SampleType::Planar);
        let needs_resample = frame.format() != target_fmt
            || frame.rate() != AUDIO_RATE as u32
            || frame.ch_layout().channels() != 2;

        if needs_resample {
            let rs = self.resampler.get_or_insert_with(|| {
                let src_layout = if frame.ch_layout().channels() >= 2 {
                    frame.ch_layout()
                } else {
                    ChannelLayout::MONO
                };
                resampling::Context::get2(
                    frame.format(),
                    src_layout,
                    frame.rate(),
                    target_fmt,
                    ChannelLayout::STEREO,
                    AUDIO_RATE as u32,
                )
                .expect("create export audio resampler")
            });
            let mut resampled = AudioFrame::empty();
            if rs.run(frame, &mut resampled).is_ok() && resampled.samples() > 0 {
                self.fifo.push(&resampled);
            }
        } else {
            self.fifo.push(frame);
        }
    }
}

/// AAC encoder plus the tracks feeding it. Mixing sums the per-track
/// FIFOs sample-by-sample; a short or ended track contributes silence.
struct MixState {
    tracks: Vec<MixTrack>,
    encoder: ffmpeg::encoder::Audio,
    out_sample_idx: i64,
    frame_size: usize,
    audio_tb: Rational,
    ost_tb: Rational,
    out_stream: usize,
}

impl MixState {
    fn drain(
        &mut self,
        octx: &mut ffmpeg::format::context::Output,
        flush: bool,
    ) -> Result<(), String> {
        loop {
            let buffered = self.tracks.iter().map(|t| t.fifo.len()).max().unwrap_or(0);
            if buffered == 0 {
                return Ok(());
            }
            let ready = self
                .tracks
                .iter()
                .all(|t| t.fifo.len() >= self.frame_size || t.ended);
            if !flush && (!ready || buffered < self.frame_size) {
                return Ok(());
            }

            let n = self.frame_size;
            let mut mix_l = vec![0f32; n];
            let mut mix_r = vec![0f32; n];
            for t in &mut self.tracks {
                let take = t.fifo.len().min(n);
                for i in 0..take {
                    mix_l[i] += t.fifo.left[i];
                    mix_r[i] += t.fifo.right[i];
                }
                t.fifo.left.drain(..take);
                t.fifo.right.drain(..take);
            }

            let mut frame = AudioFrame::new(
                Sample::F32(SampleType::Planar),
                n,
                ChannelLayoutMask::STEREO,
            );
            frame.set_rate(AUDIO_RATE as u32);
            frame.set_pts(Some(self.out_sample_idx));
            unsafe {
                let l = std::slice::from_raw_parts_mut(
                    frame.data_mut(0).as_mut_ptr() as *mut f32,
                    n,
                );
                l.copy_from_slice(&mix_l);
                let r = std::slice::from_raw_parts_mut(
                    frame.data_mut(1).as_mut_ptr() as *mut f32,
                    n,
                );
                r.copy_from_slice(&mix_r);
            }
            self.out_sample_idx += n as i64;

            self.encoder
                .send_frame(&frame)
                .map_err(|e| format!("send audio frame to encoder: {e}"))?;
            self.drain_packets(octx)?;
        }
    }

    fn drain_packets(
        &mut self,
        octx: &mut ffmpeg::format::context::Output,
    ) -> Result<(), String> {
        let mut pkt = Packet::empty();
        while self.encoder.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(self.out_stream);
            pkt.rescale_ts(self.audio_tb, self.ost_tb);
            pkt.write_interleaved(octx)
                .map_err(|e| format!("write audio packet: {e}"))?;
        }
        Ok(())
    }

    fn finish(&mut self, octx: &mut ffmpeg::format::context::Output) -> Result<(), String> {
        for t in &mut self.tracks {
            let _ = t.decoder.send_eof();
            let mut raw = AudioFrame::empty();
            while t.decoder.receive_frame(&mut raw).is_ok() {
                if !t.ended {
                    t.ingest(&raw);
                }
            }
            t.ended = true;
        }
        self.drain(octx, true)?;
        self.encoder
            .send_eof()
            .map_err(|e| format!("send EOF to audio encoder: {e}"))?;
        self.drain_packets(octx)
    }
}

// ── Export execution ────────────────────────────────────────────────────

fn execute(job: &TranscodeJob, output: &Path, tx: &Sender<MediaResult>) -> Result<(), String> {
    let mut ictx = open_input(&job.input)
        .map_err(|e| format!("open '{}': {e}", job.input.display()))?;

    let video_in_idx = ictx
        .streams()
        .best(MediaType::Video)
        .ok_or_else(|| format!("no video stream in '{}'", job.input.display()))?
        .index();
    let audio_in: Vec<usize> = ictx
        .streams()
        .filter(|s| s.parameters().medium() == MediaType::Audio)
        .map(|s| s.index())
        .collect();

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("create '{}': {e}", parent.display()))?;
    }
    let mut octx = open_output(&output.to_path_buf())
        .map_err(|e| format!("open output '{}': {e}", output.display()))?;

    // ── Video geometry / rate ───────────────────────────────────────────
    // Display dimensions, not coded — H.264 pads height to macroblocks.
    let (src_w, src_h, src_fps) = {
        let stream = ictx.stream(video_in_idx).unwrap();
        let params = stream.parameters();
        let r = stream.avg_frame_rate();
        let fps = if r.denominator() > 0 {
            (r.numerator() as f64 / r.denominator() as f64).round().max(1.0) as u32
        } else {
            60
        };
        (params.width() as u32, params.height() as u32, fps)
    };
    let out_fps = job.fps.unwrap_or(src_fps).max(1);
    let (out_w, out_h) = match job.resolution {
        Some((w, h)) => (w.max(2) & !1, h.max(2) & !1),
        None => (src_w.max(2) & !1, src_h.max(2) & !1),
    };

    // ── Video stream 0 ──────────────────────────────────────────────────
    let frame_tb = Rational::new(1, out_fps as i32);
    let mut video_encoder: Option<ffmpeg::encoder::video::Video> = None;

    match job.video {
        VideoMode::Copy => {
            let ist = ictx.stream(video_in_idx).unwrap();
            let mut ost = octx
                .add_stream(encoder::find(CodecId::None))
                .map_err(|e| format!("add copy video stream: {e}"))?;
            ost.set_parameters(ist.parameters());
            unsafe {
                (*ost.parameters().as_mut_ptr()).codec_tag = 0;
            }
        }
        VideoMode::Encode { rate } => {
            let h264 = encoder::find(CodecId::H264)
                .ok_or_else(|| "H.264 encoder not found".to_string())?;

            let mut ost = octx
                .add_stream(h264)
                .map_err(|e| format!("add video stream: {e}"))?;
            ost.set_time_base(frame_tb);

            let enc_ctx = codec::context::Context::new_with_codec(h264);
            let mut enc = enc_ctx
                .encoder()
                .video()
                .map_err(|e| format!("create video encoder: {e}"))?;
            enc.set_width(out_w);
            enc.set_height(out_h);
            enc.set_format(Pixel::YUV420P);
            enc.set_time_base(frame_tb);
            enc.set_frame_rate(Some(Rational::new(out_fps as i32, 1)));

            let mut opts = ffmpeg::Dictionary::new();
            opts.set("preset", "fast");
            match rate {
                RateControl::Crf(crf) => {
                    enc.set_bit_rate(0); // CRF drives quality
                    opts.set("crf", &crf.to_string());
                }
                RateControl::Bitrate { video_kbps, maxrate_kbps, bufsize_kbps } => {
                    enc.set_bit_rate(video_kbps as usize * 1000);
                    enc.set_max_bit_rate(maxrate_kbps as usize * 1000);
                    // No safe setter for the VBV buffer.
                    unsafe {
                        (*enc.as_mut_ptr()).rc_buffer_size = bufsize_kbps as i32 * 1000;
                    }
                }
            }

            let mut opened = enc
                .open_as_with(h264, opts)
                .map_err(|e| format!("open H.264 encoder: {e}"))?;
            // Must be set after open — libavcodec resets the SAR during init.
            opened.set_aspect_ratio(Rational::new(1, 1));

            unsafe {
                let ret = ffmpeg::ffi::avcodec_parameters_from_context(
                    (**(*octx.as_mut_ptr()).streams.add(0)).codecpar,
                    opened.as_ptr() as *mut ffmpeg::ffi::AVCodecContext,
                );
                if ret < 0 {
                    return Err(format!("avcodec_parameters_from_context (video): {ret}"));
                }
            }
            video_encoder = Some(opened);
        }
    }

    // ── Audio stream 1 ──────────────────────────────────────────────────
    let audio_tb = Rational::new(1, AUDIO_RATE);
    let mut audio_copy_in: Option<usize> = None;
    let mut mix: Option<MixState> = None;

    match job.audio {
        AudioMode::Silent => {}
        AudioMode::Copy { stream } => {
            let in_idx = *audio_in
                .get(stream)
                .ok_or_else(|| format!("source has no audio stream {stream}"))?;
            let ist = ictx.stream(in_idx).unwrap();
            let mut ost = octx
                .add_stream(encoder::find(CodecId::None))
                .map_err(|e| format!("add copy audio stream: {e}"))?;
            ost.set_parameters(ist.parameters());
            unsafe {
                (*ost.parameters().as_mut_ptr()).codec_tag = 0;
            }
            audio_copy_in = Some(in_idx);
        }
        AudioMode::Encode { gains } => {
            let aac = encoder::find(CodecId::AAC)
                .ok_or_else(|| "AAC encoder not found".to_string())?;
            let mut ost = octx
                .add_stream(aac)
                .map_err(|e| format!("add audio stream: {e}"))?;
            ost.set_time_base(audio_tb);
            let out_stream = ost.index();

            let enc_ctx = codec::context::Context::new_with_codec(aac);
            let mut enc = enc_ctx
                .encoder()
                .audio()
                .map_err(|e| format!("create audio encoder: {e}"))?;
            enc.set_rate(AUDIO_RATE);
            enc.set_ch_layout(ChannelLayout::STEREO);
            enc.set_format(Sample::F32(SampleType::Planar));
            enc.set_bit_rate(AUDIO_BITRATE);

            let opened = enc
                .open_as_with(aac, ffmpeg::Dictionary::new())
                .map_err(|e| format!("open AAC encoder: {e}"))?;
            let frame_size = (opened.frame_size() as usize).max(1024);

            unsafe {
                let ret = ffmpeg::ffi::avcodec_parameters_from_context(
                    (**(*octx.as_mut_ptr()).streams.add(out_stream)).codecpar,
                    opened.as_ptr() as *mut ffmpeg::ffi::AVCodecContext,
                );
                if ret < 0 {
                    return Err(format!("avcodec_parameters_from_context (audio): {ret}"));
                }
            }

            let mut tracks = Vec::new();
            for (slot, gain) in gains.iter().enumerate() {
                let Some(gain) = gain else { continue };
                let Some(&in_idx) = audio_in.get(slot) else {
                    eprintln!("[transcode] source has no audio stream {slot}, skipping");
                    continue;
                };
                let ist = ictx.stream(in_idx).unwrap();
                let in_tb = ist.time_base();
                let dec_ctx = codec::context::Context::from_parameters(ist.parameters())
                    .map_err(|e| format!("audio decoder params: {e}"))?;
                let decoder = dec_ctx
                    .decoder()
                    .audio()
                    .map_err(|e| format!("open audio decoder: {e}"))?;
                tracks.push(MixTrack {
                    stream_idx: in_idx,
                    decoder,
                    in_tb,
                    resampler: None,
                    fifo: TrackFifo { left: Vec::new(), right: Vec::new(), gain: *gain },
                    ended: false,
                });
            }

            let ost_tb = octx.stream(out_stream).unwrap().time_base();
            mix = Some(MixState {
                tracks,
                encoder: opened,
                out_sample_idx: 0,
                frame_size,
                audio_tb,
                ost_tb,
                out_stream,
            });
        }
    }

    octx.write_header()
        .map_err(|e| format!("write output header: {e}"))?;

    // ── Decoder for the encode path ─────────────────────────────────────
    let in_video_tb = ictx.stream(video_in_idx).unwrap().time_base();
    let mut video_decoder = match job.video {
        VideoMode::Encode { .. } => {
            let ctx = codec::context::Context::from_parameters(
                ictx.stream(video_in_idx).unwrap().parameters(),
            )
            .map_err(|e| format!("video decoder params: {e}"))?;
            Some(
                ctx.decoder()
                    .video()
                    .map_err(|e| format!("open video decoder: {e}"))?,
            )
        }
        VideoMode::Copy => None,
    };
    let mut video_scaler: Option<ScaleCtx> = None;

    seek_to_secs(&mut ictx, job.seek, "transcode");

    let end = job.seek + job.duration;
    let half_frame = 0.5 / out_fps as f64;
    let ost_video_tb = octx.stream(0).unwrap().time_base();

    // Copy mode: timestamps are rebased on the first kept video packet,
    // which after a backward seek is the keyframe at or before job.seek.
    let mut copy_base_secs: Option<f64> = None;
    let mut out_frame_idx: i64 = 0;
    let mut copied_packets: i64 = 0;

    'packet_loop: for result in ictx.packets() {
        let (stream, mut packet) = match result {
            Ok(p) => p,
            Err(e) => return Err(format!("read packet: {e}")),
        };
        let sidx = stream.index();

        // ── Video ───────────────────────────────────────────────────────
        if sidx == video_in_idx {
            let pts_secs = packet
                .pts()
                .or(packet.dts())
                .map(|pts| pts as f64 * f64::from(in_video_tb))
                .unwrap_or(0.0);

            if let Some(ref mut decoder) = video_decoder {
                // Encode path: decode, retime to the output fps, encode.
                if decoder.send_packet(&packet).is_err() {
                    continue;
                }
                let mut decoded = VideoFrame::empty();
                while decoder.receive_frame(&mut decoded).is_ok() {
                    let frame_secs = decoded
                        .pts()
                        .map(|pts| pts as f64 * f64::from(in_video_tb))
                        .unwrap_or(0.0);
                    if frame_secs < job.seek - half_frame {
                        continue;
                    }
                    if frame_secs >= end {
                        break 'packet_loop;
                    }

                    let sc = video_scaler.get_or_insert_with(|| {
                        ScaleCtx::get(
                            decoded.format(),
                            src_w,
                            src_h,
                            Pixel::YUV420P,
                            out_w,
                            out_h,
                            ScaleFlags::BILINEAR,
                        )
                        .expect("create export scaler")
                    });
                    let mut yuv = VideoFrame::empty();
                    sc.run(&decoded, &mut yuv)
                        .map_err(|e| format!("scale video frame: {e}"))?;

                    // Retime: emit the frame into every output slot it
                    // covers. Duplicates when the source is slower than
                    // out_fps, drops when it is faster.
                    let rel = frame_secs - job.seek;
                    while (out_frame_idx as f64 / out_fps as f64) <= rel + half_frame {
                        encode_video_frame(
                            &mut yuv,
                            video_encoder.as_mut().unwrap(),
                            &mut octx,
                            out_frame_idx,
                            frame_tb,
                            ost_video_tb,
                        )?;
                        out_frame_idx += 1;
                        if out_frame_idx % PROGRESS_INTERVAL == 0 {
                            send_progress(tx, job, rel);
                        }
                    }
                }
            } else {
                // Copy path: keyframe-aligned, timestamps rebased.
                if pts_secs >= end {
                    break 'packet_loop;
                }
                let base = *copy_base_secs.get_or_insert(pts_secs);
                let off = (base * in_video_tb.denominator() as f64
                    / in_video_tb.numerator() as f64) as i64;
                if let Some(pts) = packet.pts() {
                    packet.set_pts(Some(pts - off));
                }
                if let Some(dts) = packet.dts() {
                    packet.set_dts(Some(dts - off));
                }
                packet.set_stream(0);
                packet.rescale_ts(in_video_tb, ost_video_tb);
                packet
                    .write_interleaved(&mut octx)
                    .map_err(|e| format!("write copied video packet: {e}"))?;
                copied_packets += 1;
                if copied_packets % 32 == 0 {
                    send_progress(tx, job, pts_secs - job.seek);
                }
            }
            continue;
        }

        // ── Audio copy ──────────────────────────────────────────────────
        if Some(sidx) == audio_copy_in {
            let in_tb = stream.time_base();
            let pts_secs = packet
                .pts()
                .or(packet.dts())
                .map(|pts| pts as f64 * f64::from(in_tb))
                .unwrap_or(0.0);
            // Rebase against the same origin as the video so A/V stay in
            // sync; before the first video packet there is no origin yet.
            let Some(base) = copy_base_secs.or(if video_decoder.is_some() {
                Some(job.seek)
            } else {
                None
            }) else {
                continue;
            };
            if pts_secs < base || pts_secs >= end {
                continue;
            }
            let off = (base * in_tb.denominator() as f64 / in_tb.numerator() as f64) as i64;
            if let Some(pts) = packet.pts() {
                packet.set_pts(Some(pts - off));
            }
            if let Some(dts) = packet.dts() {
                packet.set_dts(Some(dts - off));
            }
            packet.set_stream(1);
            packet.rescale_ts(in_tb, octx.stream(1).unwrap().time_base());
            packet
                .write_interleaved(&mut octx)
                .map_err(|e| format!("write copied audio packet: {e}"))?;
            continue;
        }

        // ── Audio mix ───────────────────────────────────────────────────
        if let Some(ref mut m) = mix {
            // Mixed samples count from out_sample_idx 0, so the cut-in
            // must share the video's origin. Copied video keeps its
            // leading GOP; starting the mix at job.seek instead would
            // make the audio lead by up to a full GOP.
            let Some(origin) = mix_origin(video_decoder.is_some(), job.seek, copy_base_secs)
            else {
                continue;
            };
            if let Some(t) = m.tracks.iter_mut().find(|t| t.stream_idx == sidx) {
                if t.ended || t.decoder.send_packet(&packet).is_err() {
                    continue;
                }
                let mut raw = AudioFrame::empty();
                while t.decoder.receive_frame(&mut raw).is_ok() {
                    let pts_secs = raw
                        .pts()
                        .map(|pts| pts as f64 * f64::from(t.in_tb))
                        .unwrap_or(0.0);
                    // Generous in-point window so a frame spanning the
                    // boundary isn't silenced.
                    if pts_secs < origin - 0.05 {
                        continue;
                    }
                    if pts_secs >= end {
                        t.ended = true;
                        break;
                    }
                    t.ingest(&raw);
                }
                m.drain(&mut octx, false)?;
            }
        }
    }

    // ── Flush ───────────────────────────────────────────────────────────
    if let Some(mut enc) = video_encoder {
        if let Some(ref mut decoder) = video_decoder {
            let _ = decoder.send_eof();
            let mut decoded = VideoFrame::empty();
            while decoder.receive_frame(&mut decoded).is_ok() {}
        }
        enc.send_eof()
            .map_err(|e| format!("send EOF to video encoder: {e}"))?;
        let mut pkt = Packet::empty();
        while enc.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(0);
            pkt.rescale_ts(frame_tb, ost_video_tb);
            pkt.write_interleaved(&mut octx)
                .map_err(|e| format!("write flush video packet: {e}"))?;
        }
    }
    if let Some(ref mut m) = mix {
        m.finish(&mut octx)?;
    }

    octx.write_trailer()
        .map_err(|e| format!("write trailer: {e}"))?;
    let _ = tx.send(MediaResult::TranscodeProgress { job_id: job.job_id, percent: 100.0 });
    Ok(())
}

fn encode_video_frame(
    yuv: &mut VideoFrame,
    enc: &mut ffmpeg::encoder::video::Video,
    octx: &mut ffmpeg::format::context::Output,
    out_frame_idx: i64,
    frame_tb: Rational,
    ost_tb: Rational,
) -> Result<(), String> {
    yuv.set_pts(Some(out_frame_idx));
    // swscale inherits the source SAR; force square pixels. No safe
    // setter on the frame.
    unsafe {
        (*yuv.as_mut_ptr()).sample_aspect_ratio = ffmpeg::ffi::AVRational { num: 1, den: 1 };
    }
    enc.send_frame(yuv)
        .map_err(|e| format!("send video frame to encoder: {e}"))?;
    let mut pkt = Packet::empty();
    while enc.receive_packet(&mut pkt).is_ok() {
        pkt.set_stream(0);
        pkt.rescale_ts(frame_tb, ost_tb);
        pkt.write_interleaved(octx)
            .map_err(|e| format!("write video packet: {e}"))?;
    }
    Ok(())
}

fn send_progress(tx: &Sender<MediaResult>, job: &TranscodeJob, rel_secs: f64) {
    let percent = ((rel_secs / job.duration.max(0.001)) * 100.0).clamp(0.0, 99.0) as f32;
    let _ = tx.send(MediaResult::TranscodeProgress { job_id: job.job_id, percent });
}

/// Source-time origin for mixed audio, matching the video stream's own
/// origin. Re-encoded video drops everything before the seek point;
/// copied video starts at the keyframe the seek landed on, which is only
/// known once the first kept video packet has been seen.
fn mix_origin(video_reencoded: bool, seek: f64, copy_base_secs: Option<f64>) -> Option<f64> {
    if video_reencoded {
        Some(seek)
    } else {
        copy_base_secs
    }
}

// ── Trim-in-place remux ─────────────────────────────────────────────────

/// Copy every stream of `input` within `[start, start + duration)` into
/// `output`. No re-encode; the cut is keyframe-aligned at the in-point.
/// Used by the trim-in-place worker, which writes to a temp file and
/// renames over the source only after this returns Ok.
pub fn remux_range(
    input: &Path,
    output: &Path,
    start: f64,
    duration: f64,
) -> Result<(), String> {
    let mut ictx = open_input(input).map_err(|e| format!("open '{}': {e}", input.display()))?;
    let mut octx =
        open_output(output).map_err(|e| format!("open output '{}': {e}", output.display()))?;

    let video_in_idx = ictx
        .streams()
        .best(MediaType::Video)
        .map(|s| s.index())
        .unwrap_or(usize::MAX);

    // Map every input stream straight across.
    let mut in_tbs = Vec::new();
    for ist in ictx.streams() {
        let mut ost = octx
            .add_stream(encoder::find(CodecId::None))
            .map_err(|e| format!("add stream: {e}"))?;
        ost.set_parameters(ist.parameters());
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = 0;
        }
        in_tbs.push(ist.time_base());
    }

    octx.write_header()
        .map_err(|e| format!("write output header: {e}"))?;

    seek_to_secs(&mut ictx, start, "remux_range");

    let end = start + duration;
    // Rebase on the first kept video packet (the keyframe the seek landed
    // on) so all streams share one origin.
    let mut base_secs: Option<f64> = None;

    for result in ictx.packets() {
        let (stream, mut packet) = match result {
            Ok(p) => p,
            Err(e) => return Err(format!("read packet: {e}")),
        };
        let sidx = stream.index();
        let in_tb = in_tbs[sidx];
        let pts_secs = packet
            .pts()
            .or(packet.dts())
            .map(|pts| pts as f64 * f64::from(in_tb))
            .unwrap_or(0.0);

        let base = match base_secs {
            Some(b) => b,
            None if sidx == video_in_idx => *base_secs.insert(pts_secs),
            None => continue,
        };

        if pts_secs < base {
            continue;
        }
        if pts_secs >= end {
            if sidx == video_in_idx {
                break;
            }
            continue;
        }

        let off = (base * in_tb.denominator() as f64 / in_tb.numerator() as f64) as i64;
        if let Some(pts) = packet.pts() {
            packet.set_pts(Some(pts - off));
        }
        if let Some(dts) = packet.dts() {
            packet.set_dts(Some(dts - off));
        }
        packet.set_stream(sidx);
        packet.rescale_ts(in_tb, octx.stream(sidx).unwrap().time_base());
        packet
            .write_interleaved(&mut octx)
            .map_err(|e| format!("write packet: {e}"))?;
    }

    octx.write_trailer().map_err(|e| format!("write trailer: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_anchors_to_seek_when_video_is_reencoded() {
        assert_eq!(mix_origin(true, 4.2, None), Some(4.2));
        // A known copy base is irrelevant once video re-encodes.
        assert_eq!(mix_origin(true, 4.2, Some(2.5)), Some(4.2));
    }

    #[test]
    fn mix_anchors_to_the_copied_keyframe() {
        // Copied video keeps the GOP from the keyframe at 2.5 s even
        // though the cut asked for 4.2 s; audio sample 0 must be 2.5 s.
        assert_eq!(mix_origin(false, 4.2, Some(2.5)), Some(2.5));
    }

    #[test]
    fn mix_waits_for_the_first_copied_video_packet() {
        assert_eq!(mix_origin(false, 4.2, None), None);
    }

    #[test]
    fn unique_output_keeps_a_free_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        assert_eq!(unique_output(&path), path);
    }

    #[test]
    fn unique_output_suffixes_past_existing_exports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"x").unwrap();
        assert_eq!(unique_output(&path), dir.path().join("clip-1.mp4"));

        std::fs::write(dir.path().join("clip-1.mp4"), b"x").unwrap();
        assert_eq!(unique_output(&path), dir.path().join("clip-2.mp4"));
    }
}
