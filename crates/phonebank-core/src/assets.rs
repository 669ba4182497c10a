//! Read-only voice, ring and message tables handed to a session at
//! construction.

use contracts::{
    CueId, PhoneId, VoiceId, CHECK_LINES_PER_VOICE, MESSAGES_PER_PHONE, PHONE_COUNT,
};
use serde::{Deserialize, Serialize};

use crate::error::AssetError;

pub const VOICE_NAMES: [&str; 3] = ["A", "B", "C"];

/// Spoken labels for each phone's message variants, in say-sample order.
pub const MESSAGE_LABELS: [[&str; MESSAGES_PER_PHONE]; PHONE_COUNT] = [
    ["CATFISH", "PERCH", "BASS", "SALMON"],
    ["BENCH", "CHAIR", "DESK", "TABLE"],
    ["OAK", "MAPLE", "GINGKO", "SPRUCE"],
    ["KALE", "ROMAINE", "CABBAGE", "SPINACH"],
];

/// Line counts for one caller voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSet {
    pub name: String,
    pub check_lines: u32,
    /// One "call phone N" line per phone.
    pub task_lines: u32,
    /// Message variants per phone.
    pub say_lines: Vec<u32>,
}

/// Nominal sample lengths, used by headless mixers to decide when a one-shot
/// cue has finished.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CueTimings {
    pub click: f32,
    pub ring_end: f32,
    pub check: f32,
    pub task: f32,
    pub say: f32,
}

impl Default for CueTimings {
    fn default() -> Self {
        Self {
            click: 0.25,
            ring_end: 1.0,
            check: 1.5,
            task: 1.25,
            say: 1.0,
        }
    }
}

impl CueTimings {
    /// Length of a single playthrough. Loops report their period.
    pub fn duration(&self, cue: CueId) -> f32 {
        match cue {
            CueId::RingBasic { .. } | CueId::RingStrong { .. } => 1.0,
            CueId::RingEnd { .. } => self.ring_end,
            CueId::Click { .. } => self.click,
            CueId::Check { .. } => self.check,
            CueId::TaskLine { .. } => self.task,
            CueId::Say { .. } => self.say,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneBankAssets {
    pub voices: Vec<VoiceSet>,
    pub message_labels: Vec<Vec<String>>,
    pub timings: CueTimings,
}

impl Default for PhoneBankAssets {
    fn default() -> Self {
        Self::standard()
    }
}

impl PhoneBankAssets {
    /// The stock phone bank: voices A, B and C, four phones, four messages each.
    pub fn standard() -> Self {
        let voices = VOICE_NAMES
            .iter()
            .map(|name| VoiceSet {
                name: (*name).to_string(),
                check_lines: CHECK_LINES_PER_VOICE as u32,
                task_lines: PHONE_COUNT as u32,
                say_lines: vec![MESSAGES_PER_PHONE as u32; PHONE_COUNT],
            })
            .collect();
        let message_labels = MESSAGE_LABELS
            .iter()
            .map(|labels| labels.iter().map(|label| (*label).to_string()).collect())
            .collect();
        Self {
            voices,
            message_labels,
            timings: CueTimings::default(),
        }
    }

    /// Check that every table lines up with `phone_count` phones.
    pub fn validate(&self, phone_count: usize) -> Result<(), AssetError> {
        if self.voices.is_empty() {
            return Err(AssetError::NoVoices);
        }
        for voice in &self.voices {
            if voice.check_lines == 0 {
                return Err(AssetError::NoCheckLines {
                    voice: voice.name.clone(),
                });
            }
            if voice.task_lines as usize != phone_count {
                return Err(AssetError::TaskLineCount {
                    voice: voice.name.clone(),
                    expected: phone_count,
                    found: voice.task_lines as usize,
                });
            }
            if voice.say_lines.len() != phone_count {
                return Err(AssetError::SayTableShape {
                    voice: voice.name.clone(),
                    expected: phone_count,
                    found: voice.say_lines.len(),
                });
            }
            for (phone, &count) in voice.say_lines.iter().enumerate() {
                if count == 0 {
                    return Err(AssetError::NoMessages { phone });
                }
                let labels = self.message_labels.get(phone).map_or(0, Vec::len);
                if labels != count as usize {
                    return Err(AssetError::MessageLabelCount {
                        voice: voice.name.clone(),
                        phone,
                        expected: count as usize,
                        found: labels,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn voice(&self, voice: VoiceId) -> Option<&VoiceSet> {
        self.voices.get(voice.index())
    }

    /// Message variants known for `phone`.
    pub fn messages_for(&self, phone: PhoneId) -> u32 {
        self.message_labels
            .get(phone.index())
            .map_or(0, |labels| labels.len() as u32)
    }

    pub fn message_label(&self, phone: PhoneId, message: u32) -> Option<&str> {
        self.message_labels
            .get(phone.index())
            .and_then(|labels| labels.get(message as usize))
            .map(String::as_str)
    }

    /// Sample path for a cue, relative to the data directory.
    pub fn sample_path(&self, cue: CueId) -> Option<String> {
        let voice_name = |voice: VoiceId| self.voice(voice).map(|set| set.name.clone());
        let path = match cue {
            CueId::RingBasic { phone } => format!("samples/ring-{}.wav", phone.0 + 1),
            CueId::RingStrong { phone } => format!("samples/ring-{}-strong.wav", phone.0 + 1),
            CueId::RingEnd { phone } => format!("samples/ring-{}-end.wav", phone.0 + 1),
            CueId::Click { phone } => format!("samples/click-{}.wav", phone.0 + 1),
            CueId::Check { voice, variant } => {
                format!("samples/{}-check-{}.wav", voice_name(voice)?, variant + 1)
            }
            CueId::TaskLine { voice, phone } => {
                format!("samples/{}-task-{}.wav", voice_name(voice)?, phone.0 + 1)
            }
            CueId::Say {
                voice,
                phone,
                message,
            } => {
                let set = self.voice(voice)?;
                let before = set
                    .say_lines
                    .iter()
                    .take(phone.index())
                    .copied()
                    .sum::<u32>();
                format!("samples/{}-say-{}.wav", set.name, before + message + 1)
            }
        };
        Some(path)
    }
}
