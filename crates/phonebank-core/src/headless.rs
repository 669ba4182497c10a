//! Mixer that produces no sound. One-shot cues stop once the clock passes
//! their nominal length; every start is recorded so drivers and tests can
//! inspect what would have been heard.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{CueId, PlayMode};
use glam::Vec3;

use crate::assets::CueTimings;
use crate::audio::{AudioMixer, ListenerPose, PlayingCue};

#[derive(Debug, Clone, PartialEq)]
pub struct PlayRecord {
    pub cue: CueId,
    pub at: Vec3,
    pub gain: f32,
    pub mode: PlayMode,
    pub started_at: f64,
    pub stopped_at: Option<f64>,
}

#[derive(Debug)]
struct VoiceState {
    record: usize,
    mode: PlayMode,
    remaining: f32,
    position: Vec3,
    stopped: bool,
}

#[derive(Debug, Clone)]
pub struct HeadlessHandle {
    state: Arc<Mutex<VoiceState>>,
}

impl HeadlessHandle {
    fn lock(&self) -> MutexGuard<'_, VoiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlayingCue for HeadlessHandle {
    fn set_position(&self, at: Vec3) {
        self.lock().position = at;
    }

    fn stop(&self) {
        self.lock().stopped = true;
    }

    fn is_stopped(&self) -> bool {
        self.lock().stopped
    }
}

#[derive(Debug, Default)]
pub struct HeadlessMixer {
    timings: CueTimings,
    clock: f64,
    active: Vec<HeadlessHandle>,
    history: Vec<PlayRecord>,
    listener: Option<ListenerPose>,
}

impl HeadlessMixer {
    pub fn new(timings: CueTimings) -> Self {
        Self {
            timings,
            ..Self::default()
        }
    }

    /// Advance the mixer clock, ending one-shot cues that ran out.
    pub fn advance(&mut self, elapsed: f32) {
        self.close_stopped();
        self.clock += f64::from(elapsed);
        for handle in &self.active {
            let mut voice = handle.lock();
            if voice.stopped || voice.mode == PlayMode::Loop {
                continue;
            }
            voice.remaining -= elapsed;
            if voice.remaining <= 0.0 {
                voice.stopped = true;
                if let Some(record) = self.history.get_mut(voice.record) {
                    record.stopped_at = Some(self.clock);
                }
            }
        }
        self.active.retain(|handle| !handle.is_stopped());
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Every cue started since construction, in start order. The record is
    /// never pruned, so memory grows with the number of cues a run plays;
    /// bounded CLI runs and tests stay in the low thousands.
    pub fn history(&self) -> &[PlayRecord] {
        &self.history
    }

    pub fn listener(&self) -> Option<ListenerPose> {
        self.listener
    }

    /// Cues currently audible.
    pub fn audible(&self) -> Vec<CueId> {
        self.active
            .iter()
            .filter_map(|handle| {
                let voice = handle.lock();
                (!voice.stopped).then(|| self.history[voice.record].cue)
            })
            .collect()
    }

    /// Stamp cues stopped through their handle since the last advance.
    fn close_stopped(&mut self) {
        for handle in &self.active {
            let voice = handle.lock();
            if voice.stopped {
                if let Some(record) = self.history.get_mut(voice.record) {
                    record.stopped_at.get_or_insert(self.clock);
                }
            }
        }
        self.active.retain(|handle| !handle.is_stopped());
    }
}

impl AudioMixer for HeadlessMixer {
    type Handle = HeadlessHandle;

    fn play(&mut self, cue: CueId, at: Vec3, gain: f32, mode: PlayMode) -> HeadlessHandle {
        let record = self.history.len();
        self.history.push(PlayRecord {
            cue,
            at,
            gain,
            mode,
            started_at: self.clock,
            stopped_at: None,
        });
        let handle = HeadlessHandle {
            state: Arc::new(Mutex::new(VoiceState {
                record,
                mode,
                remaining: self.timings.duration(cue),
                position: at,
                stopped: false,
            })),
        };
        self.active.push(handle.clone());
        handle
    }

    fn set_listener(&mut self, pose: ListenerPose) {
        self.listener = Some(pose);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::PhoneId;

    #[test]
    fn one_shot_stops_after_nominal_length() {
        let mut mixer = HeadlessMixer::default();
        let cue = CueId::Click { phone: PhoneId(0) };
        let handle = mixer.play(cue, Vec3::ZERO, 1.0, PlayMode::Once);
        mixer.advance(0.1);
        assert!(!handle.is_stopped());
        mixer.advance(0.2);
        assert!(handle.is_stopped());
        assert_eq!(mixer.history()[0].stopped_at, Some(mixer.clock()));
    }

    #[test]
    fn loops_play_until_stopped() {
        let mut mixer = HeadlessMixer::default();
        let cue = CueId::RingBasic { phone: PhoneId(1) };
        let handle = mixer.play(cue, Vec3::ONE, 1.0, PlayMode::Loop);
        mixer.advance(100.0);
        assert!(!handle.is_stopped());
        assert_eq!(mixer.audible(), vec![cue]);
        handle.stop();
        mixer.advance(0.5);
        assert!(mixer.audible().is_empty());
        assert_eq!(mixer.history()[0].stopped_at, Some(100.0));
    }

    #[test]
    fn handles_retarget_position() {
        let mut mixer = HeadlessMixer::default();
        let handle = mixer.play(
            CueId::RingBasic { phone: PhoneId(0) },
            Vec3::ZERO,
            1.0,
            PlayMode::Loop,
        );
        handle.set_position(Vec3::X);
        assert_eq!(handle.lock().position, Vec3::X);
    }
}
