//! Per-phone runtime state, ring escalation, and the registry the session
//! iterates each frame.

use contracts::{CueId, PhoneId, PhoneSnapshot, PlayMode, RingStage};
use glam::Vec3;
use tracing::debug;

use crate::audio::{AudioMixer, AudioQueue, PlayingCue};

#[derive(Debug)]
struct RingLoop<H> {
    stage: RingStage,
    handle: H,
}

/// Ring stages a phone crossed during one update. A long frame or a short
/// ring can cross several at once; they happened in field order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingUpdate {
    pub started: bool,
    pub escalated: bool,
    /// The ring ran out unanswered.
    pub missed: bool,
}

impl RingUpdate {
    pub fn is_quiet(&self) -> bool {
        !self.started && !self.escalated && !self.missed
    }
}

/// Gains and thresholds a phone needs during its update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingTuning {
    pub strong_threshold: f32,
    pub ring_gain: f32,
    pub cue_gain: f32,
}

#[derive(Debug)]
pub struct Phone<H> {
    id: PhoneId,
    name: String,
    anchor: Vec3,
    /// Seconds until an unanswered ring is missed; zero when idle.
    ring_time: f32,
    ring_loop: Option<RingLoop<H>>,
    audio: AudioQueue<H>,
}

impl<H: PlayingCue> Phone<H> {
    pub fn new(id: PhoneId, name: impl Into<String>, anchor: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            anchor,
            ring_time: 0.0,
            ring_loop: None,
            audio: AudioQueue::default(),
        }
    }

    pub fn id(&self) -> PhoneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper-case color used in prompts and menus ("WHITE" for "Phone.White").
    pub fn display_name(&self) -> String {
        self.name
            .split_once('.')
            .map_or(self.name.as_str(), |(_, color)| color)
            .to_uppercase()
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    pub fn ring_time(&self) -> f32 {
        self.ring_time
    }

    pub fn ring_stage(&self) -> Option<RingStage> {
        self.ring_loop.as_ref().map(|ring| ring.stage)
    }

    pub fn is_ringing(&self) -> bool {
        self.ring_time > 0.0
    }

    /// Not ringing, nothing queued, nothing mid-playback.
    pub fn is_idle(&self) -> bool {
        !self.is_ringing() && self.audio.is_drained()
    }

    pub fn audio(&self) -> &AudioQueue<H> {
        &self.audio
    }

    pub fn enqueue(&mut self, cue: CueId) {
        self.audio.push(cue);
    }

    /// Start a ring lasting `ring_time` seconds. Busy phones are left alone.
    pub fn arm(&mut self, ring_time: f32) -> bool {
        if !self.is_idle() || ring_time <= 0.0 {
            return false;
        }
        self.ring_time = ring_time;
        true
    }

    /// Pick up: the ring stops immediately without scoring a miss.
    pub fn answer(&mut self) {
        self.ring_time = 0.0;
        if let Some(ring) = self.ring_loop.take() {
            ring.handle.stop();
        }
    }

    /// Advance the ring: start the basic loop, swap to the strong loop under
    /// the threshold, and report a miss when time runs out.
    pub fn update_ring<M>(&mut self, elapsed: f32, mixer: &mut M, tuning: RingTuning) -> RingUpdate
    where
        M: AudioMixer<Handle = H>,
    {
        if !self.is_ringing() {
            return RingUpdate::default();
        }
        let mut update = RingUpdate::default();
        if self.ring_loop.is_none() {
            let handle = mixer.play(
                CueId::RingBasic { phone: self.id },
                self.anchor,
                tuning.ring_gain,
                PlayMode::Loop,
            );
            self.ring_loop = Some(RingLoop {
                stage: RingStage::Basic,
                handle,
            });
            update.started = true;
        }

        self.ring_time -= elapsed;

        if self.ring_time <= tuning.strong_threshold && self.ring_stage() != Some(RingStage::Strong) {
            if let Some(ring) = self.ring_loop.take() {
                ring.handle.stop();
            }
            let handle = mixer.play(
                CueId::RingStrong { phone: self.id },
                self.anchor,
                tuning.ring_gain,
                PlayMode::Loop,
            );
            self.ring_loop = Some(RingLoop {
                stage: RingStage::Strong,
                handle,
            });
            debug!(phone = %self.id, ring_time = self.ring_time, "ring escalated");
            update.escalated = true;
        }

        if self.ring_time <= 0.0 {
            self.ring_time = 0.0;
            if let Some(ring) = self.ring_loop.take() {
                ring.handle.stop();
            }
            // Fire and forget; the end cue is not part of the phone's queue.
            let _ = mixer.play(
                CueId::RingEnd { phone: self.id },
                self.anchor,
                tuning.ring_gain,
                PlayMode::Once,
            );
            update.missed = true;
        }
        update
    }

    /// Advance this phone's cue queue.
    pub fn pump_audio<M>(&mut self, mixer: &mut M, gain: f32) -> Option<CueId>
    where
        M: AudioMixer<Handle = H>,
    {
        self.audio.pump(mixer, self.anchor, gain)
    }

    pub fn snapshot(&self) -> PhoneSnapshot {
        PhoneSnapshot {
            phone: self.id,
            name: self.name.clone(),
            anchor: self.anchor.to_array(),
            ring_time: self.ring_time,
            ring_stage: self.ring_stage(),
            queued_cues: self.audio.pending_len(),
            playing: self.audio.is_playing(),
        }
    }
}

// ---------------------------------------------------------------------------
// PhoneRegistry
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct PhoneRegistry<H> {
    phones: Vec<Phone<H>>,
}

impl<H: PlayingCue> PhoneRegistry<H> {
    /// Phones are indexed in the order given.
    pub fn new<I, S>(layout: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec3)>,
        S: Into<String>,
    {
        let phones = layout
            .into_iter()
            .enumerate()
            .map(|(index, (name, anchor))| Phone::new(PhoneId(index as u32), name, anchor))
            .collect();
        Self { phones }
    }

    pub fn len(&self) -> usize {
        self.phones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phones.is_empty()
    }

    pub fn get(&self, id: PhoneId) -> Option<&Phone<H>> {
        self.phones.get(id.index())
    }

    pub fn get_mut(&mut self, id: PhoneId) -> Option<&mut Phone<H>> {
        self.phones.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Phone<H>> {
        self.phones.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Phone<H>> {
        self.phones.iter_mut()
    }

    /// Phone the camera can interact with: within `radius` of `at` and with
    /// `dot(anchor - at, forward) > facing`. The offset is not normalized. When
    /// several qualify the last in index order wins.
    pub fn nearest_interactable(
        &self,
        at: Vec3,
        forward: Vec3,
        radius: f32,
        facing: f32,
    ) -> Option<PhoneId> {
        let mut found = None;
        for phone in &self.phones {
            let offset = phone.anchor - at;
            if offset.length() < radius && offset.dot(forward) > facing {
                found = Some(phone.id);
            }
        }
        found
    }
}
