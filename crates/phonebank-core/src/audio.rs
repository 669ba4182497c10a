//! Mixer contract and the per-phone cue queue.
//!
//! The mixer plays samples on its own schedule; the core only learns that a
//! cue finished by polling its handle once per frame.

use std::collections::VecDeque;

use contracts::{CueId, PlayMode};
use glam::Vec3;
use tracing::debug;

/// Handle to a sample the mixer is playing.
pub trait PlayingCue {
    fn set_position(&self, at: Vec3);
    fn stop(&self);
    /// True once playback ended on its own or was stopped.
    fn is_stopped(&self) -> bool;
}

/// Listener placement for spatialized playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerPose {
    pub position: Vec3,
    pub right: Vec3,
}

pub trait AudioMixer {
    type Handle: PlayingCue;

    fn play(&mut self, cue: CueId, at: Vec3, gain: f32, mode: PlayMode) -> Self::Handle;

    fn set_listener(&mut self, _pose: ListenerPose) {}
}

/// Strict FIFO of one-shot cues for a single phone. At most one cue plays at a
/// time; the next starts on the first frame after the previous one stopped.
#[derive(Debug)]
pub struct AudioQueue<H> {
    pending: VecDeque<CueId>,
    playing: Option<H>,
}

impl<H> Default for AudioQueue<H> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            playing: None,
        }
    }
}

impl<H: PlayingCue> AudioQueue<H> {
    pub fn push(&mut self, cue: CueId) {
        self.pending.push_back(cue);
    }

    pub fn pending(&self) -> impl Iterator<Item = &CueId> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    /// Nothing queued and nothing playing.
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.playing.is_none()
    }

    /// Release a finished cue and start the next one. Returns the cue started
    /// this call, if any.
    pub fn pump<M>(&mut self, mixer: &mut M, at: Vec3, gain: f32) -> Option<CueId>
    where
        M: AudioMixer<Handle = H>,
    {
        if self.playing.as_ref().is_some_and(|cue| cue.is_stopped()) {
            self.playing = None;
        }
        if self.playing.is_some() {
            return None;
        }
        let cue = self.pending.pop_front()?;
        debug!(?cue, remaining = self.pending.len(), "starting queued cue");
        self.playing = Some(mixer.play(cue, at, gain, PlayMode::Once));
        Some(cue)
    }
}
