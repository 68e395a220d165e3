// crates/cliptrim-core/src/playback.rs
//
// Playback loop-region state machine. The app clock feeds Tick events in;
// every event returns a SyncPlan telling the caller what to do with the
// video decoder and the audio sinks. Nothing here touches a device, which
// is what makes the loop semantics unit-testable.
//
// The one subtle rule: `loop_intent` is latched on Play/Seek/Ended and is
// NOT recomputed on Tick. A viewer who seeks past the out-point and hits
// play wants to watch the tail, not get yanked back to the in-point.

use crate::trim::TrimModel;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackState {
    pub current_time: f64,
    pub is_playing: bool,
    pub(crate) loop_intent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    Play,
    Pause,
    /// Clock advance while playing. `video_time` is the authoritative
    /// playback clock, not a user intent.
    Tick { video_time: f64 },
    /// Natural end of the media.
    Ended,
    /// Any user-initiated reposition: scrub, skip, frame-step.
    Seek { target: f64 },
}

/// What the caller must do to the real video/audio pipelines after an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncPlan {
    /// Reposition the video decoder to this time.
    pub seek_video: Option<f64>,
    pub audio: AudioCmd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioCmd {
    None,
    /// Hard resync: drop any queued audio and restart from this offset.
    Start(f64),
    Stop,
}

impl SyncPlan {
    const NOOP: Self = Self { seek_video: None, audio: AudioCmd::None };
}

impl PlaybackState {
    pub fn loop_intent(&self) -> bool {
        self.loop_intent
    }

    pub fn apply(&mut self, trim: &TrimModel, ev: PlaybackEvent) -> SyncPlan {
        match ev {
            PlaybackEvent::Play => {
                self.is_playing = true;
                self.loop_intent = trim.contains(self.current_time);
                SyncPlan {
                    seek_video: None,
                    audio: AudioCmd::Start(self.current_time),
                }
            }
            PlaybackEvent::Pause => {
                self.is_playing = false;
                self.loop_intent = false;
                SyncPlan { seek_video: None, audio: AudioCmd::Stop }
            }
            PlaybackEvent::Tick { video_time } => {
                if self.loop_intent && video_time >= trim.end() {
                    self.current_time = trim.start();
                    SyncPlan {
                        seek_video: Some(trim.start()),
                        audio: AudioCmd::Start(trim.start()),
                    }
                } else {
                    self.current_time = video_time;
                    SyncPlan::NOOP
                }
            }
            PlaybackEvent::Ended => {
                // Whole-clip wrap. Loop intent is recomputed at 0 so a trim
                // window starting at 0 re-arms, one starting later doesn't.
                self.current_time = 0.0;
                self.loop_intent = trim.contains(0.0);
                SyncPlan {
                    seek_video: Some(0.0),
                    audio: AudioCmd::Start(0.0),
                }
            }
            PlaybackEvent::Seek { target } => {
                let t = target.clamp(0.0, trim.duration());
                self.current_time = t;
                if self.is_playing {
                    self.loop_intent = trim.contains(t);
                    SyncPlan { seek_video: Some(t), audio: AudioCmd::Start(t) }
                } else {
                    // Paused: publish position and show the frame, but do
                    // not start audio.
                    SyncPlan { seek_video: Some(t), audio: AudioCmd::None }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trimmed(duration: f64, start: f64, end: f64) -> TrimModel {
        let mut m = TrimModel::new(duration);
        m.set_start(start);
        m.set_end(end);
        m
    }

    #[test]
    fn play_inside_window_arms_loop() {
        let trim = trimmed(60.0, 5.0, 15.0);
        let mut pb = PlaybackState { current_time: 8.0, ..Default::default() };
        let plan = pb.apply(&trim, PlaybackEvent::Play);
        assert!(pb.is_playing);
        assert!(pb.loop_intent());
        assert_eq!(plan.audio, AudioCmd::Start(8.0));
    }

    #[test]
    fn tick_past_out_point_loops_back() {
        let trim = trimmed(60.0, 5.0, 15.0);
        let mut pb = PlaybackState { current_time: 14.0, ..Default::default() };
        pb.apply(&trim, PlaybackEvent::Play);
        let plan = pb.apply(&trim, PlaybackEvent::Tick { video_time: 15.02 });
        assert_eq!(plan.seek_video, Some(5.0));
        assert_eq!(plan.audio, AudioCmd::Start(5.0));
        assert_eq!(pb.current_time, 5.0);
    }

    #[test]
    fn playback_started_outside_window_never_wraps() {
        let trim = trimmed(60.0, 5.0, 15.0);
        let mut pb = PlaybackState::default();
        pb.apply(&trim, PlaybackEvent::Seek { target: 20.0 });
        pb.apply(&trim, PlaybackEvent::Play);
        assert!(!pb.loop_intent());
        let plan = pb.apply(&trim, PlaybackEvent::Tick { video_time: 30.0 });
        assert_eq!(plan, SyncPlan::NOOP);
        assert_eq!(pb.current_time, 30.0);
    }

    #[test]
    fn tick_does_not_rearm_loop() {
        // Entering the window mid-flight must not flip loop_intent on.
        let trim = trimmed(60.0, 25.0, 35.0);
        let mut pb = PlaybackState::default();
        pb.apply(&trim, PlaybackEvent::Play); // at 0, outside window
        assert!(!pb.loop_intent());
        pb.apply(&trim, PlaybackEvent::Tick { video_time: 30.0 });
        assert!(!pb.loop_intent());
        let plan = pb.apply(&trim, PlaybackEvent::Tick { video_time: 36.0 });
        assert_eq!(plan, SyncPlan::NOOP);
    }

    #[test]
    fn seek_while_playing_resyncs_audio() {
        let trim = trimmed(60.0, 5.0, 15.0);
        let mut pb = PlaybackState::default();
        pb.apply(&trim, PlaybackEvent::Play);
        let plan = pb.apply(&trim, PlaybackEvent::Seek { target: 10.0 });
        assert!(pb.loop_intent());
        assert_eq!(plan.seek_video, Some(10.0));
        assert_eq!(plan.audio, AudioCmd::Start(10.0));
    }

    #[test]
    fn seek_while_paused_is_silent() {
        let trim = trimmed(60.0, 5.0, 15.0);
        let mut pb = PlaybackState::default();
        let plan = pb.apply(&trim, PlaybackEvent::Seek { target: 10.0 });
        assert_eq!(plan.seek_video, Some(10.0));
        assert_eq!(plan.audio, AudioCmd::None);
        assert!(!pb.is_playing);
    }

    #[test]
    fn seek_clamps_to_clip_bounds() {
        let trim = TrimModel::new(60.0);
        let mut pb = PlaybackState::default();
        pb.apply(&trim, PlaybackEvent::Seek { target: -3.0 });
        assert_eq!(pb.current_time, 0.0);
        pb.apply(&trim, PlaybackEvent::Seek { target: 500.0 });
        assert_eq!(pb.current_time, 60.0);
    }

    #[test]
    fn ended_wraps_and_keeps_playing() {
        let trim = TrimModel::new(60.0);
        let mut pb = PlaybackState::default();
        pb.apply(&trim, PlaybackEvent::Play);
        let plan = pb.apply(&trim, PlaybackEvent::Ended);
        assert!(pb.is_playing);
        assert_eq!(pb.current_time, 0.0);
        assert_eq!(plan.seek_video, Some(0.0));
        assert_eq!(plan.audio, AudioCmd::Start(0.0));
        // Whole-clip window means the loop re-arms at 0.
        assert!(pb.loop_intent());
    }

    #[test]
    fn ended_with_late_window_does_not_rearm() {
        let trim = trimmed(60.0, 10.0, 20.0);
        let mut pb = PlaybackState { current_time: 55.0, ..Default::default() };
        pb.apply(&trim, PlaybackEvent::Play);
        pb.apply(&trim, PlaybackEvent::Ended);
        assert!(!pb.loop_intent());
    }

    #[test]
    fn pause_stops_audio_and_cancels_loop() {
        let trim = trimmed(60.0, 5.0, 15.0);
        let mut pb = PlaybackState { current_time: 8.0, ..Default::default() };
        pb.apply(&trim, PlaybackEvent::Play);
        let plan = pb.apply(&trim, PlaybackEvent::Pause);
        assert_eq!(plan.audio, AudioCmd::Stop);
        assert!(!pb.loop_intent());
    }
}
