//! Ring spawning and call resolution.
//!
//! A single countdown decides when to try ringing a phone. Answering a ringing
//! phone either completes a check-in on the spot or hands the player a relay
//! task for some other phone. Every random draw comes from the generator the
//! caller passes in, in a fixed order, so a seeded session replays exactly.

use contracts::{CueId, PhoneId, RelayTargetSampling, SecondsRange, SessionConfig, Task, VoiceId};
use rand::Rng;
use tracing::{debug, warn};

use crate::assets::PhoneBankAssets;
use crate::audio::PlayingCue;
use crate::phone::{Phone, PhoneRegistry};

/// Result of one spawn-timer tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnOutcome {
    Waiting,
    Armed { phone: PhoneId, ring_time: f32 },
    /// The timer fired on a busy phone; the attempt is spent anyway.
    Skipped { phone: PhoneId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallResolution {
    CheckIn { voice: VoiceId, line: u32 },
    Relay { voice: VoiceId, task: Task },
}

/// Draw a relay target other than `origin` from `phone_count` phones.
///
/// Both strategies draw from `0..phone_count - 1` and never return `origin`;
/// they differ in which draws are shifted up by one.
pub fn pick_relay_target<R: Rng + ?Sized>(
    origin: PhoneId,
    phone_count: usize,
    sampling: RelayTargetSampling,
    rng: &mut R,
) -> PhoneId {
    let draw = rng.gen_range(0..phone_count.saturating_sub(1).max(1)) as u32;
    let target = match sampling {
        RelayTargetSampling::ShiftOnCollision if draw == origin.0 => draw + 1,
        RelayTargetSampling::ShiftAtOrAbove if draw >= origin.0 => draw + 1,
        _ => draw,
    };
    PhoneId(target)
}

#[derive(Debug, Clone)]
pub struct TaskScheduler {
    spawn_timer: f32,
    ring_duration: SecondsRange,
    respawn_delay: SecondsRange,
    check_in_probability: f64,
    sampling: RelayTargetSampling,
    tasks: Vec<Task>,
}

impl TaskScheduler {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            spawn_timer: config.initial_spawn_delay,
            ring_duration: config.ring_duration,
            respawn_delay: config.respawn_delay,
            check_in_probability: config.check_in_probability,
            sampling: config.relay_target_sampling,
            tasks: Vec::new(),
        }
    }

    pub fn spawn_timer(&self) -> f32 {
        self.spawn_timer
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Count down the spawn timer; on expiry try to ring a random phone and
    /// reschedule whether or not the phone was free.
    pub fn tick<R, H>(&mut self, elapsed: f32, phones: &mut PhoneRegistry<H>, rng: &mut R) -> SpawnOutcome
    where
        R: Rng + ?Sized,
        H: PlayingCue,
    {
        self.spawn_timer -= elapsed;
        if self.spawn_timer > 0.0 || phones.is_empty() {
            return SpawnOutcome::Waiting;
        }

        let phone_id = PhoneId(rng.gen_range(0..phones.len()) as u32);
        let mut outcome = SpawnOutcome::Skipped { phone: phone_id };
        if let Some(phone) = phones.get_mut(phone_id) {
            if phone.is_idle() {
                let ring_time = self.ring_duration.lerp(rng.gen::<f32>());
                phone.arm(ring_time);
                debug!(phone = %phone_id, ring_time, "phone armed");
                outcome = SpawnOutcome::Armed {
                    phone: phone_id,
                    ring_time,
                };
            } else {
                warn!(phone = %phone_id, "spawn attempt landed on a busy phone");
            }
        }

        self.spawn_timer += self.respawn_delay.lerp(rng.gen::<f32>());
        outcome
    }

    /// Pick up a ringing phone and queue the caller's lines on it.
    pub fn answer_call<R, H>(
        &mut self,
        phone: &mut Phone<H>,
        phone_count: usize,
        assets: &PhoneBankAssets,
        rng: &mut R,
    ) -> CallResolution
    where
        R: Rng + ?Sized,
        H: PlayingCue,
    {
        let here = phone.id();
        phone.answer();
        phone.enqueue(CueId::Click { phone: here });

        let voice = VoiceId(rng.gen_range(0..assets.voices.len().max(1)) as u32);
        let check_lines = assets.voice(voice).map_or(1, |set| set.check_lines.max(1));

        let check_in = phone_count < 2 || rng.gen_bool(self.check_in_probability);
        let resolution = if check_in {
            let line = rng.gen_range(0..check_lines);
            phone.enqueue(CueId::Check {
                voice,
                variant: line,
            });
            CallResolution::CheckIn { voice, line }
        } else {
            let target = pick_relay_target(here, phone_count, self.sampling, rng);
            let messages = assets
                .voice(voice)
                .and_then(|set| set.say_lines.get(target.index()).copied())
                .unwrap_or(1)
                .max(1);
            let task = Task {
                phone: target,
                say: rng.gen_range(0..messages),
            };
            phone.enqueue(CueId::TaskLine {
                voice,
                phone: target,
            });
            phone.enqueue(CueId::Say {
                voice,
                phone: target,
                message: task.say,
            });
            self.tasks.push(task);
            debug!(from = %here, to = %target, say = task.say, "relay task assigned");
            CallResolution::Relay { voice, task }
        };

        phone.enqueue(CueId::Click { phone: here });
        resolution
    }

    /// Remove one pending task equal to `task`. False when none matches.
    pub fn deliver(&mut self, task: Task) -> bool {
        match self.tasks.iter().position(|pending| *pending == task) {
            Some(index) => {
                self.tasks.remove(index);
                true
            }
            None => false,
        }
    }
}
