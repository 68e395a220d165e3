// crates/cliptrim-media/src/tracks.rs
//
// Per-track audio extraction for the preview mixer. Game captures carry
// two audio streams — 0 = desktop, 1 = microphone — and each is decoded
// to 44.1 kHz interleaved stereo f32 and cached as a WAV next to the
// sidecar metadata. A cache hit reads the WAV instead of re-demuxing the
// whole MP4; trim-in-place invalidates by passing `refresh`.
//
// Any single track failing to decode leaves that slot silent. The editor
// stays usable either way.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::Sender;
use ffmpeg_the_third as ffmpeg;
use uuid::Uuid;

use ffmpeg::format::input;
use ffmpeg::format::sample::{Sample, Type as SampleType};
use ffmpeg::media::Type as MediaType;
use ffmpeg::software::resampling;
use ffmpeg::util::channel_layout::ChannelLayout;
use ffmpeg::util::frame::audio::Audio as AudioFrame;

use cliptrim_core::clip::TRACK_COUNT;
use cliptrim_core::media_types::{MediaResult, TrackPcm};

const OUT_RATE: u32 = TrackPcm::SAMPLE_RATE;
const OUT_FMT: Sample = Sample::F32(SampleType::Packed);
const OUT_LAYOUT: ChannelLayout = ChannelLayout::STEREO;

/// Extract (or load from cache) both audio tracks and send the result.
/// `generation` is echoed back so the UI can drop results that raced a
/// trim-in-place.
pub fn extract_tracks(
    path: &PathBuf,
    id: Uuid,
    generation: u64,
    cache_dir: &Path,
    refresh: bool,
    tx: &Sender<MediaResult>,
) {
    if let Err(e) = std::fs::create_dir_all(cache_dir) {
        eprintln!("[tracks] cache dir: {e}");
    }

    let mut tracks: [Option<TrackPcm>; TRACK_COUNT] = Default::default();
    for (slot, out) in tracks.iter_mut().enumerate() {
        let wav = cache_dir.join(format!("{id}-track{slot}.wav"));
        if refresh {
            let _ = std::fs::remove_file(&wav);
        }

        let pcm = if wav.is_file() {
            read_wav(&wav).map_err(|e| format!("cache read: {e}"))
        } else {
            decode_stream_pcm(path, slot).map(|pcm| {
                if let Err(e) = write_wav(&wav, &pcm) {
                    eprintln!("[tracks] cache write {}: {e}", wav.display());
                    let _ = std::fs::remove_file(&wav);
                }
                pcm
            })
        };

        match pcm {
            Ok(samples) if !samples.is_empty() => {
                *out = Some(TrackPcm { samples: Arc::new(samples) });
            }
            Ok(_) => eprintln!("[tracks] track {slot} empty ← {}", path.display()),
            Err(e) => eprintln!("[tracks] track {slot} failed ← {}: {e}", path.display()),
        }
    }

    eprintln!(
        "[tracks] gen {generation}: desktop={} mic={} ← {}",
        tracks[0].is_some(),
        tracks[1].is_some(),
        path.display()
    );
    let _ = tx.send(MediaResult::AudioTracks { id, generation, tracks });
}

/// Decode the nth audio stream of `src` to interleaved stereo f32 @ 44.1 kHz.
fn decode_stream_pcm(src: &PathBuf, slot: usize) -> Result<Vec<f32>, String> {
    let mut ictx = input(src).map_err(|e| format!("open: {e}"))?;

    let stream_idx = ictx
        .streams()
        .filter(|s| s.parameters().medium() == MediaType::Audio)
        .nth(slot)
        .ok_or_else(|| format!("no audio stream {slot}"))?
        .index();

    let stream = ictx.stream(stream_idx).unwrap();
    let dec_ctx = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
        .map_err(|e| format!("codec context: {e}"))?;
    let mut decoder = dec_ctx
        .decoder()
        .audio()
        .map_err(|e| format!("audio decoder: {e}"))?;

    // Resampler built lazily on the first decoded frame — we only know the
    // real source format/layout/rate once a frame is out.
    let mut resampler: Option<resampling::Context> = None;
    let mut pcm: Vec<f32> = Vec::new();

    for result in ictx.packets() {
        let (stream, packet) = match result {
            Ok(p) => p,
            Err(_) => continue,
        };
        if stream.index() != stream_idx {
            continue;
        }
        if decoder.send_packet(&packet).is_err() {
            continue;
        }
        let mut frame = AudioFrame::empty();
        while decoder.receive_frame(&mut frame).is_ok() {
            append_resampled(&frame, &mut resampler, &mut pcm)?;
        }
    }

    let _ = decoder.send_eof();
    let mut frame = AudioFrame::empty();
    while decoder.receive_frame(&mut frame).is_ok() {
        append_resampled(&frame, &mut resampler, &mut pcm)?;
    }

    if pcm.is_empty() {
        return Err("no audio samples decoded".into());
    }
    Ok(pcm)
}

fn append_resampled(
    frame: &AudioFrame,
    resampler: &mut Option<resampling::Context>,
    out: &mut Vec<f32>,
) -> Result<(), String> {
    let src_channels = frame.ch_layout().channels();
    let needs_resample =
        frame.format() != OUT_FMT || frame.rate() != OUT_RATE || src_channels != 2;

    if needs_resample {
        let rs = resampler.get_or_insert_with(|| {
            // Mono sources must be declared as MONO or swr misinterprets
            // the channel count.
            let src_layout = if src_channels >= 2 {
                frame.ch_layout()
            } else {
                ChannelLayout::MONO
            };
            resampling::Context::get2(
                frame.format(),
                src_layout,
                frame.rate(),
                OUT_FMT,
                OUT_LAYOUT,
                OUT_RATE,
            )
            .expect("create audio resampler for track extraction")
        });
        let mut resampled = AudioFrame::empty();
        if rs.run(frame, &mut resampled).is_ok() && resampled.samples() > 0 {
            append_packed_f32(&resampled, out);
        }
    } else {
        append_packed_f32(frame, out);
    }
    Ok(())
}

/// OUT_FMT is packed (interleaved), so all channel data is in plane 0.
fn append_packed_f32(frame: &AudioFrame, out: &mut Vec<f32>) {
    let data = frame.data(0);
    out.extend(
        data.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
    );
}

// ── WAV cache format ────────────────────────────────────────────────────
// Plain 44-byte RIFF header, format tag 3 (IEEE_FLOAT), stereo f32le at
// 44100. Written and read only by this module.

const WAV_CHANNELS: u16 = 2;
const WAV_BITS: u16 = 32;
const WAV_FORMAT_FLOAT: u16 = 3;
const WAV_BLOCK_ALIGN: u16 = WAV_CHANNELS * (WAV_BITS / 8);

fn write_wav(path: &Path, samples: &[f32]) -> std::io::Result<()> {
    let data_size = (samples.len() * 4) as u32;
    let byte_rate = OUT_RATE * WAV_BLOCK_ALIGN as u32;

    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);

    w.write_all(b"RIFF")?;
    w.write_all(&(36u32 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")?;

    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&WAV_FORMAT_FLOAT.to_le_bytes())?;
    w.write_all(&WAV_CHANNELS.to_le_bytes())?;
    w.write_all(&OUT_RATE.to_le_bytes())?;
    w.write_all(&byte_rate.to_le_bytes())?;
    w.write_all(&WAV_BLOCK_ALIGN.to_le_bytes())?;
    w.write_all(&WAV_BITS.to_le_bytes())?;

    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for s in samples {
        w.write_all(&s.to_le_bytes())?;
    }
    w.flush()
}

fn read_wav(path: &Path) -> std::io::Result<Vec<f32>> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;

    let bad = |msg: &str| std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string());
    if bytes.len() < 44 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(bad("not a WAV file"));
    }
    let format = u16::from_le_bytes([bytes[20], bytes[21]]);
    let channels = u16::from_le_bytes([bytes[22], bytes[23]]);
    let rate = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
    if format != WAV_FORMAT_FLOAT || channels != WAV_CHANNELS || rate != OUT_RATE {
        return Err(bad("unexpected WAV format in track cache"));
    }

    Ok(bytes[44..]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.wav");
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 500.0) - 1.0).collect();
        write_wav(&path, &samples).unwrap();
        assert_eq!(read_wav(&path).unwrap(), samples);
    }

    #[test]
    fn read_wav_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.wav");
        std::fs::write(&path, b"definitely not riff data").unwrap();
        assert!(read_wav(&path).is_err());
    }
}
