//! v1 cross-boundary contracts for the phone-bank core, its session driver, and the CLI.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod serde_u64_string;

pub const SCHEMA_VERSION_V1: &str = "1.0";

/// Number of phones a phone-bank scene must provide.
pub const PHONE_COUNT: usize = 4;
/// Message variants a voice can ask the player to relay, per phone.
pub const MESSAGES_PER_PHONE: usize = 4;
/// Voice sets available to callers.
pub const VOICE_COUNT: usize = 3;
/// "Check" lines per voice set.
pub const CHECK_LINES_PER_VOICE: usize = 2;

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Index of a phone in the fixed scene order (White, Black, Cyan, Magenta).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PhoneId(pub u32);

impl PhoneId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PhoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phone:{}", self.0)
    }
}

/// Index of a caller voice set (A, B, C).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct VoiceId(pub u32);

impl VoiceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A relay obligation: go to `phone` and say message `say`.
///
/// Equality is structural; the pending list may hold duplicates and resolving
/// one removes exactly one of them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Task {
    pub phone: PhoneId,
    pub say: u32,
}

// ---------------------------------------------------------------------------
// Audio cues
// ---------------------------------------------------------------------------

/// Structural reference to a sample. The asset tables resolve it to a file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum CueId {
    RingBasic { phone: PhoneId },
    RingStrong { phone: PhoneId },
    RingEnd { phone: PhoneId },
    Click { phone: PhoneId },
    Check { voice: VoiceId, variant: u32 },
    TaskLine { voice: VoiceId, phone: PhoneId },
    Say { voice: VoiceId, phone: PhoneId, message: u32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    Loop,
    Once,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RingStage {
    Basic,
    Strong,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How a relay target is drawn from the phones other than the answering one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelayTargetSampling {
    /// Draw from `0..N-1`; a draw equal to the answering phone moves up by one.
    /// The phone after the answering one is picked twice as often and the last
    /// phone is only reachable from its predecessor.
    #[default]
    ShiftOnCollision,
    /// Draw from `0..N-1`; every draw at or above the answering phone moves up
    /// by one. Uniform over the other phones.
    ShiftAtOrAbove,
}

/// Closed-open range of seconds used for randomized timers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SecondsRange {
    pub min: f32,
    pub max: f32,
}

impl SecondsRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Map a unit sample in `[0, 1)` into the range.
    pub fn lerp(&self, unit: f32) -> f32 {
        self.min + unit * self.span()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    pub schema_version: String,
    pub session_id: String,
    #[serde(with = "serde_u64_string")]
    pub seed: u64,
    /// Player walking speed, units per second.
    pub walk_speed: f32,
    /// Camera mount height above the walk point.
    pub camera_height: f32,
    pub camera_fovy_degrees: f32,
    pub pitch_limit_degrees: f32,
    /// A phone is interactable only within this distance of the camera.
    pub interact_radius: f32,
    /// Minimum dot product between camera forward and the offset to the phone.
    pub facing_threshold: f32,
    /// Remaining ring time below which the loop escalates to the strong sample.
    pub strong_ring_threshold: f32,
    pub initial_spawn_delay: f32,
    pub ring_duration: SecondsRange,
    pub respawn_delay: SecondsRange,
    /// Chance that an answered call is a plain check-in rather than a relay.
    pub check_in_probability: f64,
    pub merit_goal: u32,
    pub demerit_limit: u32,
    pub ring_gain: f32,
    pub cue_gain: f32,
    #[serde(default)]
    pub relay_target_sampling: RelayTargetSampling,
    pub notes: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: "session_local_001".to_string(),
            seed: 1337,
            walk_speed: 5.0,
            camera_height: 1.6,
            camera_fovy_degrees: 60.0,
            pitch_limit_degrees: 90.0,
            interact_radius: 2.0,
            facing_threshold: 0.2,
            strong_ring_threshold: 4.0,
            initial_spawn_delay: 5.0,
            ring_duration: SecondsRange::new(10.0, 13.0),
            respawn_delay: SecondsRange::new(10.0, 15.0),
            check_in_probability: 0.5,
            merit_goal: 10,
            demerit_limit: 3,
            ring_gain: 1.0,
            cue_gain: 1.0,
            relay_target_sampling: RelayTargetSampling::default(),
            notes: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Forward,
    Backward,
    Left,
    Right,
    Escape,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    KeyDown { key: Key, repeat: bool },
    KeyUp { key: Key },
    /// Relative pointer motion in pixels.
    PointerMotion { dx: f32, dy: f32 },
    PointerPress,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

// ---------------------------------------------------------------------------
// Menus and transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MenuAction {
    HangUp,
    Say { message: u32 },
    Exit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    /// `None` marks a non-selectable title line.
    pub action: Option<MenuAction>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuKind {
    Phone { phone: PhoneId },
    Terminal { verdict: Verdict },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuDescriptor {
    pub kind: MenuKind,
    pub items: Vec<MenuItem>,
    pub selected: usize,
}

impl MenuDescriptor {
    pub fn selected_action(&self) -> Option<MenuAction> {
        self.items.get(self.selected).and_then(|item| item.action)
    }
}

/// What the outer driver should do after an input or update call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum Transition {
    Continue,
    Menu { menu: MenuDescriptor },
    Exit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventResponse {
    pub handled: bool,
    pub transition: Transition,
}

impl EventResponse {
    pub fn ignored() -> Self {
        Self {
            handled: false,
            transition: Transition::Continue,
        }
    }

    pub fn handled() -> Self {
        Self {
            handled: true,
            transition: Transition::Continue,
        }
    }

    pub fn with_transition(transition: Transition) -> Self {
        Self {
            handled: true,
            transition,
        }
    }
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventType {
    PointerCaptured,
    PointerReleased,
    PhoneArmed,
    SpawnSkipped,
    RingStarted,
    RingEscalated,
    CallMissed,
    CallAnswered,
    CheckInCompleted,
    RelayAssigned,
    MenuOpened,
    HungUp,
    MessageDelivered,
    MessageRejected,
    CueStarted,
    MeritAwarded,
    DemeritAwarded,
    SessionWon,
    SessionLost,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEvent {
    pub schema_version: String,
    pub event_id: String,
    pub session_id: String,
    pub frame: u64,
    pub sequence_in_frame: u64,
    pub event_type: SessionEventType,
    pub phone: Option<PhoneId>,
    pub details: Option<Value>,
}

// ---------------------------------------------------------------------------
// Status and snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    Playing,
    AwaitingChoice { phone: PhoneId },
    Finished { verdict: Verdict },
}

impl SessionPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionPhase::Finished { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStatus {
    pub schema_version: String,
    pub session_id: String,
    pub frame: u64,
    pub elapsed_seconds: f64,
    pub phase: SessionPhase,
    pub merits: u32,
    pub demerits: u32,
    pub pending_tasks: usize,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session_id={} frame={} elapsed={:.2}s phase={:?} merits={} demerits={} pending_tasks={}",
            self.session_id,
            self.frame,
            self.elapsed_seconds,
            self.phase,
            self.merits,
            self.demerits,
            self.pending_tasks
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSnapshot {
    pub position: [f32; 3],
    /// Quaternion as `[x, y, z, w]`.
    pub orientation: [f32; 4],
    pub elevation: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhoneSnapshot {
    pub phone: PhoneId,
    pub name: String,
    pub anchor: [f32; 3],
    pub ring_time: f32,
    pub ring_stage: Option<RingStage>,
    pub queued_cues: usize,
    pub playing: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreSnapshot {
    pub merits: u32,
    pub demerits: u32,
    pub merit_goal: u32,
    pub demerit_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub schema_version: String,
    pub status: SessionStatus,
    #[serde(with = "serde_u64_string")]
    pub seed: u64,
    pub spawn_timer: f32,
    pub player: PlayerSnapshot,
    pub phones: Vec<PhoneSnapshot>,
    pub tasks: Vec<Task>,
    pub score: ScoreSnapshot,
    pub close_phone: Option<PhoneId>,
    #[serde(with = "serde_u64_string")]
    pub replay_hash: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let config = SessionConfig::default();
        let encoded = serde_json::to_string(&config).expect("serialize");
        assert!(encoded.contains(r#""seed":"1337""#));
        let decoded: SessionConfig = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(config, decoded);
    }

    #[test]
    fn relay_sampling_defaults_when_field_is_missing() {
        let mut value = serde_json::to_value(SessionConfig::default()).expect("to value");
        value
            .as_object_mut()
            .expect("object")
            .remove("relay_target_sampling");
        let decoded: SessionConfig = serde_json::from_value(value).expect("from value");
        assert_eq!(
            decoded.relay_target_sampling,
            RelayTargetSampling::ShiftOnCollision
        );
    }

    #[test]
    fn cue_ids_serialize_with_tag() {
        let cue = CueId::Say {
            voice: VoiceId(2),
            phone: PhoneId(1),
            message: 3,
        };
        let encoded = serde_json::to_value(cue).expect("serialize");
        assert_eq!(encoded["cue"], "say");
        assert_eq!(encoded["phone"], 1);
        let decoded: CueId = serde_json::from_value(encoded).expect("deserialize");
        assert_eq!(decoded, cue);
    }

    #[test]
    fn seconds_range_lerp_covers_endpoints() {
        let range = SecondsRange::new(10.0, 13.0);
        assert_eq!(range.lerp(0.0), 10.0);
        assert!((range.lerp(0.5) - 11.5).abs() < 1e-6);
        assert!((range.span() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn menu_selected_action_skips_titles() {
        let menu = MenuDescriptor {
            kind: MenuKind::Terminal {
                verdict: Verdict::Won,
            },
            items: vec![
                MenuItem {
                    label: "YOU WIN".to_string(),
                    action: None,
                },
                MenuItem {
                    label: "EXIT".to_string(),
                    action: Some(MenuAction::Exit),
                },
            ],
            selected: 1,
        };
        assert_eq!(menu.selected_action(), Some(MenuAction::Exit));
    }
}
