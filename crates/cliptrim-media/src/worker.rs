// crates/cliptrim-media/src/worker.rs
//
// MediaWorker: owns the scrub frame-request slot, the playback decode
// thread, and every background job thread. All public API that
// cliptrim-ui calls lives here.
//
// Export and trim jobs are deliberately not cancellable: once submitted
// they run to TranscodeDone/TrimApplied or their error counterpart, and
// the UI keeps its buttons disabled until one of those arrives.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Condvar, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use uuid::Uuid;

use cliptrim_core::media_types::{MediaResult, PlaybackFrame};

use crate::decode::LiveDecoder;
use crate::job::TranscodeJob;
use crate::probe::{probe_clip, probe_duration};
use crate::tracks::extract_tracks;
use crate::transcode::{remux_range, run_transcode};

// ── Internal types ──────────────────────────────────────────────────────

struct FrameRequest {
    id: Uuid,
    path: PathBuf,
    timestamp: f64,
}

/// What the latest-wins scrub slot can carry. `Release` makes the scrub
/// thread drop its cached decoder and ack; `Shutdown` ends the thread.
enum ScrubReq {
    Frame(FrameRequest),
    Release(Sender<()>),
    Shutdown,
}

enum PlaybackCmd {
    Start { id: Uuid, path: PathBuf, ts: f64 },
    Stop,
    /// Drop the decoder and ack. Unlike `Stop`, the sender can wait on
    /// the ack to know the file handle is actually closed.
    Release(Sender<()>),
}

// ── MediaWorker ─────────────────────────────────────────────────────────

pub struct MediaWorker {
    /// Shared result channel: probes, tracks, transcode progress.
    pub rx: Receiver<MediaResult>,
    tx: Sender<MediaResult>,

    /// Dedicated channel for scrub frames so their latency is independent
    /// of probe/export traffic on the shared channel. Capacity 8: the slot
    /// below is latest-wins, so only bursts of back-to-back requests ever
    /// queue here.
    pub scrub_rx: Receiver<MediaResult>,

    /// Latest-wins slot for on-demand scrub frames.
    frame_req: Arc<(Mutex<Option<ScrubReq>>, Condvar)>,
    /// Dedicated playback pipeline.
    pb_tx: Sender<PlaybackCmd>,
    pub pb_rx: Receiver<PlaybackFrame>,
    shutdown: Arc<AtomicBool>,
    /// Limits concurrent probe threads: (active_count, Condvar).
    probe_sem: Arc<(Mutex<u32>, Condvar)>,
}

impl MediaWorker {
    pub fn new() -> Self {
        let (tx, rx) = bounded(512);
        let (scrub_tx, scrub_rx) = bounded(8);

        let frame_req: Arc<(Mutex<Option<ScrubReq>>, Condvar)> =
            Arc::new((Mutex::new(None), Condvar::new()));

        // ── Scrub frame decode thread ───────────────────────────────────
        // Blocks on the latest-wins slot; reuses the LiveDecoder when the
        // request is a small forward step.
        let scrub_result_tx = scrub_tx;
        let slot = Arc::clone(&frame_req);
        thread::spawn(move || {
            let mut live: Option<LiveDecoder> = None;
            loop {
                let req = {
                    let (lock, cvar) = &*slot;
                    let mut guard = lock.lock().unwrap();
                    while guard.is_none() {
                        guard = cvar.wait(guard).unwrap();
                    }
                    guard.take().unwrap()
                };

                let req = match req {
                    ScrubReq::Frame(r) => r,
                    ScrubReq::Release(ack) => {
                        // Close the cached decoder's file handle before
                        // acking; a trim-in-place rename is waiting on it.
                        live = None;
                        let _ = ack.send(());
                        continue;
                    }
                    ScrubReq::Shutdown => return,
                };

                // Re-open when:
                //   a) different file (or different bytes after a trim)
                //   b) any backward movement — advance_to only goes forward
                //   c) forward jump > 2 s — advancing would decode dozens
                //      of frames; a fresh keyframe seek is cheaper.
                let needs_reset = live
                    .as_ref()
                    .map(|d| {
                        let tpts = d.ts_to_pts(req.timestamp);
                        let two_secs = d.ts_to_pts(2.0);
                        d.path != req.path
                            || tpts <= d.last_pts
                            || tpts > d.last_pts + two_secs
                    })
                    .unwrap_or(true);

                if needs_reset {
                    match LiveDecoder::open(&req.path, req.timestamp) {
                        Ok(mut d) => {
                            // Burn through the GOP so the frame we send is
                            // at the requested position, not the keyframe.
                            d.burn_to_pts(d.ts_to_pts(req.timestamp));
                            if let Some((rgba, w, h, secs)) = d.next_frame() {
                                let _ = scrub_result_tx.send(MediaResult::ScrubFrame(
                                    PlaybackFrame {
                                        clip_id: req.id,
                                        pts_secs: secs,
                                        width: w as usize,
                                        height: h as usize,
                                        rgba,
                                    },
                                ));
                            }
                            live = Some(d);
                        }
                        Err(e) => eprintln!("[scrub] open: {e}"),
                    }
                } else if let Some(d) = &mut live {
                    let tpts = d.ts_to_pts(req.timestamp);
                    if let Some((rgba, w, h)) = d.advance_to(tpts) {
                        let _ = scrub_result_tx.send(MediaResult::ScrubFrame(PlaybackFrame {
                            clip_id: req.id,
                            pts_secs: req.timestamp,
                            width: w as usize,
                            height: h as usize,
                            rgba,
                        }));
                    }
                }
            }
        });

        // ── Dedicated playback decode thread ────────────────────────────
        // Decodes ahead of the UI into a bounded channel; the blocking
        // send is the rate limiter, no sleeps.
        let (pb_tx, pb_cmd_rx) = bounded::<PlaybackCmd>(4);
        let (pb_frame_tx, pb_rx) = bounded::<PlaybackFrame>(32);

        thread::spawn(move || {
            let mut decoder: Option<(Uuid, LiveDecoder)> = None;
            loop {
                if let Some((id, ref mut d)) = decoder {
                    match pb_cmd_rx.try_recv() {
                        Ok(PlaybackCmd::Start { id: new_id, path, ts }) => {
                            match open_playback(&path, ts) {
                                Some(nd) => decoder = Some((new_id, nd)),
                                None => decoder = None,
                            }
                            continue;
                        }
                        Ok(PlaybackCmd::Stop) => {
                            decoder = None;
                            continue;
                        }
                        Ok(PlaybackCmd::Release(ack)) => {
                            decoder = None;
                            let _ = ack.send(());
                            continue;
                        }
                        Err(TryRecvError::Disconnected) => return,
                        Err(TryRecvError::Empty) => {}
                    }
                    match d.next_frame() {
                        Some((rgba, w, h, secs)) => {
                            let f = PlaybackFrame {
                                clip_id: id,
                                pts_secs: secs,
                                width: w as usize,
                                height: h as usize,
                                rgba,
                            };
                            if pb_frame_tx.send(f).is_err() {
                                return;
                            }
                        }
                        None => decoder = None, // EOF
                    }
                } else {
                    match pb_cmd_rx.recv() {
                        Ok(PlaybackCmd::Start { id, path, ts }) => {
                            decoder = open_playback(&path, ts).map(|d| (id, d));
                        }
                        Ok(PlaybackCmd::Stop) => {}
                        Ok(PlaybackCmd::Release(ack)) => {
                            let _ = ack.send(());
                        }
                        Err(_) => return,
                    }
                }
            }
        });

        Self {
            rx,
            tx,
            scrub_rx,
            frame_req,
            pb_tx,
            pb_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
            probe_sem: Arc::new((Mutex::new(0), Condvar::new())),
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Wake the scrub thread so it exits instead of blocking on the
        // condvar forever.
        let (lock, cvar) = &*self.frame_req;
        *lock.lock().unwrap() = Some(ScrubReq::Shutdown);
        cvar.notify_one();
    }

    /// Probe duration / geometry / thumbnail on a background thread, at
    /// most four at a time.
    pub fn probe_clip(&self, id: Uuid, path: PathBuf) {
        let tx = self.tx.clone();
        let sd = self.shutdown.clone();
        let sem = self.probe_sem.clone();

        // The gatekeeper acquires the semaphore before the real work, so
        // at most PROBE_CONCURRENCY probes run however many clips a rescan
        // queues up.
        thread::spawn(move || {
            const PROBE_CONCURRENCY: u32 = 4;
            {
                let (lock, cvar) = &*sem;
                let mut count = lock.lock().unwrap();
                while *count >= PROBE_CONCURRENCY {
                    count = cvar.wait(count).unwrap();
                }
                *count += 1;
            }
            struct SemGuard(Arc<(Mutex<u32>, Condvar)>);
            impl Drop for SemGuard {
                fn drop(&mut self) {
                    let (lock, cvar) = &*self.0;
                    *lock.lock().unwrap() -= 1;
                    cvar.notify_one();
                }
            }
            let _guard = SemGuard(sem);

            if sd.load(Ordering::Relaxed) {
                return;
            }
            probe_clip(&path, id, &tx);
        });
    }

    /// One-shot frame for a paused scrub. Overwrites any pending request —
    /// the decode thread always gets the freshest position.
    pub fn request_frame(&self, id: Uuid, path: PathBuf, timestamp: f64) {
        let (lock, cvar) = &*self.frame_req;
        *lock.lock().unwrap() = Some(ScrubReq::Frame(FrameRequest { id, path, timestamp }));
        cvar.notify_one();
    }

    /// Start the dedicated playback pipeline at `ts` seconds into `path`.
    pub fn start_playback(&self, id: Uuid, path: PathBuf, ts: f64) {
        // Flush stale frames from the previous playback session.
        while self.pb_rx.try_recv().is_ok() {}
        let _ = self.pb_tx.try_send(PlaybackCmd::Start { id, path, ts });
    }

    /// Stop the playback pipeline, dropping the decoder (and its open file
    /// handle — required before trim-in-place can rename over the source).
    pub fn stop_playback(&self) {
        let _ = self.pb_tx.try_send(PlaybackCmd::Stop);
        // The decode thread may be parked in its bounded frame send while
        // the UI is paused and nothing drains pb_rx. Drain here so it
        // wakes up, sees the Stop, and drops the decoder now rather than
        // whenever playback next starts.
        while self.pb_rx.try_recv().is_ok() {}
    }

    /// Extract (or re-extract) the clip's audio tracks for the mixer.
    pub fn extract_tracks(
        &self,
        id: Uuid,
        path: PathBuf,
        generation: u64,
        cache_dir: PathBuf,
        refresh: bool,
    ) {
        let tx = self.tx.clone();
        let sd = self.shutdown.clone();
        thread::spawn(move || {
            if sd.load(Ordering::Relaxed) {
                return;
            }
            extract_tracks(&path, id, generation, &cache_dir, refresh, &tx);
        });
    }

    /// Spawn a background thread running an export job to completion.
    pub fn start_export(&self, job: TranscodeJob) {
        let tx = self.tx.clone();
        let sd = self.shutdown.clone();
        thread::spawn(move || {
            if sd.load(Ordering::Relaxed) {
                let _ = tx.send(MediaResult::TranscodeError {
                    job_id: job.job_id,
                    msg: "worker shutting down".into(),
                });
                return;
            }
            run_transcode(job, tx);
        });
    }

    /// Trim `[start, end)` of the clip at `path` in place: remux to a temp
    /// file beside the source, atomically rename over it, re-probe the new
    /// duration. The source is untouched unless every step succeeds.
    pub fn start_trim(&self, job_id: Uuid, id: Uuid, path: PathBuf, start: f64, end: f64) {
        let tx = self.tx.clone();
        let pb_tx = self.pb_tx.clone();
        let pb_rx = self.pb_rx.clone();
        let slot = Arc::clone(&self.frame_req);
        thread::spawn(move || {
            let fail = |msg: String| {
                eprintln!("[trim] failed: {msg}");
                let _ = tx.send(MediaResult::TrimFailed { job_id, id, msg });
            };

            // Both decode threads can hold an open handle on the source
            // (the playback thread even while "stopped", if it is parked
            // in its frame send; the scrub thread via its cached
            // decoder). Renaming over an open file fails on Windows, so
            // wait for both to drop their decoders and ack first.
            if !release_decoders(&pb_tx, &pb_rx, &slot) {
                return fail("decoder did not release the source file".into());
            }

            let parent = match path.parent() {
                Some(p) => p.to_path_buf(),
                None => return fail("source has no parent directory".into()),
            };
            // Temp file in the same directory so the rename never crosses
            // a filesystem.
            let tmp = match tempfile::Builder::new()
                .prefix(".cliptrim-trim-")
                .suffix(".mp4")
                .tempfile_in(&parent)
            {
                Ok(t) => t.into_temp_path(),
                Err(e) => return fail(format!("temp file: {e}")),
            };

            if let Err(e) = remux_range(&path, &tmp, start, end - start) {
                // TempPath removes the partial output on drop.
                return fail(e);
            }
            if let Err(e) = tmp.persist(&path) {
                return fail(format!("rename over source: {e}"));
            }

            // Past this point the source is rewritten; the result must
            // say so even if the duration probe comes back empty-handed.
            let new_duration = applied_duration(probe_duration(&path), start, end);
            eprintln!(
                "[trim] applied: {:.2}s..{:.2}s → {:.2}s ← {}",
                start,
                end,
                new_duration,
                path.display()
            );
            let _ = tx.send(MediaResult::TrimApplied { job_id, id, new_duration });
        });
    }
}

/// Duration to report once the rename over the source has landed. A
/// failed re-probe degrades to the arithmetic cut length; reporting the
/// trim as failed here would leave the UI holding coordinates for a file
/// that no longer exists.
fn applied_duration(probed: Result<f64, String>, start: f64, end: f64) -> f64 {
    match probed {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[trim] re-probe: {e}; reporting cut length");
            (end - start).max(0.0)
        }
    }
}

/// Make both decode threads drop their decoders and ack. Drains `pb_rx`
/// in the wait loop so a playback thread parked in its bounded frame
/// send gets unstuck and can see the commands. Returns false if either
/// ack is still missing after two seconds.
fn release_decoders(
    pb_tx: &Sender<PlaybackCmd>,
    pb_rx: &Receiver<PlaybackFrame>,
    slot: &(Mutex<Option<ScrubReq>>, Condvar),
) -> bool {
    let (pb_ack_tx, pb_ack_rx) = bounded::<()>(1);
    let (scrub_ack_tx, scrub_ack_rx) = bounded::<()>(1);

    {
        let (lock, cvar) = slot;
        *lock.lock().unwrap() = Some(ScrubReq::Release(scrub_ack_tx));
        cvar.notify_one();
    }

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut pb_cmd = Some(PlaybackCmd::Release(pb_ack_tx));
    let mut pb_done = false;
    let mut scrub_done = false;
    while !(pb_done && scrub_done) {
        if Instant::now() >= deadline {
            return false;
        }
        // Free a slot in the frame channel in case the decode thread is
        // parked mid-send.
        while pb_rx.try_recv().is_ok() {}

        // The command channel is bounded too; keep retrying until the
        // release fits.
        if let Some(cmd) = pb_cmd.take() {
            match pb_tx.try_send(cmd) {
                Ok(()) => {}
                Err(TrySendError::Full(cmd)) => pb_cmd = Some(cmd),
                Err(TrySendError::Disconnected(_)) => pb_done = true,
            }
        }

        // A dropped ack sender means the thread is gone, which releases
        // the handle just the same.
        if !pb_done && pb_cmd.is_none() {
            match pb_ack_rx.recv_timeout(Duration::from_millis(5)) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => pb_done = true,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        if !scrub_done {
            match scrub_ack_rx.recv_timeout(Duration::from_millis(5)) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => scrub_done = true,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
    true
}

fn open_playback(path: &PathBuf, ts: f64) -> Option<LiveDecoder> {
    match LiveDecoder::open(path, ts) {
        Ok(mut d) => {
            // Burn synchronously before entering the send loop so the
            // first frame sent is at the requested position. The channel
            // is empty here, nothing useful is blocked.
            d.burn_to_pts(d.ts_to_pts(ts));
            Some(d)
        }
        Err(e) => {
            eprintln!("[pb] open: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Neither decode thread opens a file until it gets a Start/Frame
    // request, so a fresh worker exercises the release handshake without
    // any media on disk.
    #[test]
    fn release_decoders_acks_on_idle_pipelines() {
        let w = MediaWorker::new();
        assert!(release_decoders(&w.pb_tx, &w.pb_rx, &w.frame_req));
        // Repeatable: the threads survive a release and ack again.
        assert!(release_decoders(&w.pb_tx, &w.pb_rx, &w.frame_req));
        w.shutdown();
    }

    #[test]
    fn stop_playback_drains_the_frame_channel() {
        let w = MediaWorker::new();
        w.stop_playback();
        assert!(w.pb_rx.is_empty());
        w.shutdown();
    }

    #[test]
    fn applied_duration_prefers_the_probed_value() {
        assert_eq!(applied_duration(Ok(7.48), 2.0, 8.0), 7.48);
    }

    #[test]
    fn applied_duration_falls_back_to_cut_length() {
        // The rename already happened; a failed re-probe must not turn
        // into a failed trim.
        assert_eq!(applied_duration(Err("open: boom".into()), 2.0, 8.0), 6.0);
        assert_eq!(applied_duration(Err("open: boom".into()), 5.0, 4.0), 0.0);
    }
}
