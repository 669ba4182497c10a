//! Phone bank gameplay core: surface-constrained locomotion, per-phone ring
//! and audio sequencing, relay task scheduling and the merit/demerit loop.
//!
//! [`GameSession`] ties the pieces together. Rendering, sample decoding and
//! the menu widgets live with the driver; the core only hands it
//! [`contracts::Transition`] values and mixer calls.

pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod headless;
pub mod locomotion;
pub mod menu;
pub mod phone;
pub mod scene;
pub mod scheduler;
pub mod score;
pub mod session;
pub mod walkmesh;

pub use assets::{CueTimings, PhoneBankAssets, VoiceSet};
pub use audio::{AudioMixer, AudioQueue, ListenerPose, PlayingCue};
pub use config::{load_config, time_seed, validate_config, CONFIG_PATH_ENV};
pub use error::{AssetError, ConfigError, SceneError, SessionError};
pub use events::{replay_hash_of_events, EventLog};
pub use headless::{HeadlessHandle, HeadlessMixer, PlayRecord};
pub use locomotion::{
    pointer_to_angles, reorient, shortest_arc, CameraMount, CameraPose, MoveIntent, Player,
    SurfaceLocomotion, WalkSurface,
};
pub use phone::{Phone, PhoneRegistry, RingTuning, RingUpdate};
pub use scene::{
    PhoneLayout, SceneDescription, SceneTransform, SessionScene, PHONE_NAMES, SCENE_PATH_ENV,
};
pub use scheduler::{pick_relay_target, CallResolution, SpawnOutcome, TaskScheduler};
pub use score::ScoreState;
pub use session::{GameSession, HINT_CAPTURED, HINT_RELEASED};
pub use walkmesh::{TriangleWalkMesh, WalkMeshDescription, WalkPoint};

/// Session over the reference walk mesh with the silent mixer.
pub type HeadlessSession = GameSession<TriangleWalkMesh, HeadlessMixer>;

/// Build a headless session over `scene` with the standard asset tables.
pub fn headless_session(
    config: contracts::SessionConfig,
    scene: &SceneDescription,
) -> Result<HeadlessSession, SessionError> {
    let scene = scene.build()?;
    let assets = PhoneBankAssets::standard();
    let mixer = HeadlessMixer::new(assets.timings);
    GameSession::new(config, scene, mixer, assets)
}

/// Build a headless session over the built-in phone bank scene.
pub fn default_headless_session(
    config: contracts::SessionConfig,
) -> Result<HeadlessSession, SessionError> {
    headless_session(config, &SceneDescription::default_phone_bank())
}
