//! Gameplay session: owns the player, phones, tasks, score and the random
//! stream, and turns input events plus frame updates into transitions for an
//! outer driver.

use contracts::{
    CueId, EventResponse, InputEvent, Key, MenuAction, MenuDescriptor, MenuKind, PhoneId,
    PlayerSnapshot, SessionConfig, SessionEvent, SessionEventType, SessionPhase, SessionSnapshot,
    SessionStatus, Task, Transition, Verdict, WindowSize, SCHEMA_VERSION_V1,
};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::assets::PhoneBankAssets;
use crate::audio::{AudioMixer, ListenerPose};
use crate::config::validate_config;
use crate::error::SessionError;
use crate::events::EventLog;
use crate::locomotion::{
    pointer_to_angles, CameraMount, CameraPose, MoveIntent, Player, SurfaceLocomotion, WalkSurface,
};
use crate::menu::{phone_menu, terminal_menu};
use crate::phone::{PhoneRegistry, RingTuning};
use crate::scene::SessionScene;
use crate::scheduler::{CallResolution, SpawnOutcome, TaskScheduler};
use crate::score::ScoreState;

pub const HINT_CAPTURED: &str = "ESCAPE TO UNGRAB MOUSE * WASD MOVE";
pub const HINT_RELEASED: &str = "CLICK TO GRAB MOUSE * ESCAPE QUIT";

pub struct GameSession<S: WalkSurface, M: AudioMixer> {
    config: SessionConfig,
    surface: S,
    mixer: M,
    assets: PhoneBankAssets,
    locomotion: SurfaceLocomotion,
    player: Player<S::WalkPoint>,
    controls: MoveIntent,
    pointer_captured: bool,
    phones: PhoneRegistry<M::Handle>,
    scheduler: TaskScheduler,
    score: ScoreState,
    rng: StdRng,
    phase: SessionPhase,
    open_menu: Option<MenuDescriptor>,
    close_phone: Option<PhoneId>,
    frame: u64,
    elapsed_total: f64,
    log: EventLog,
}

impl<S: WalkSurface, M: AudioMixer> GameSession<S, M> {
    pub fn new(
        config: SessionConfig,
        scene: SessionScene<S>,
        mixer: M,
        assets: PhoneBankAssets,
    ) -> Result<Self, SessionError> {
        validate_config(&config)?;
        assets.validate(scene.phones.len())?;

        let SessionScene {
            surface,
            phones,
            spawn,
        } = scene;
        let locomotion = SurfaceLocomotion::new(
            config.walk_speed,
            CameraMount::new(config.camera_height, config.pitch_limit_degrees),
        );
        let player = Player::spawn(&surface, spawn);
        info!(
            session_id = %config.session_id,
            seed = config.seed,
            phones = phones.len(),
            "session created"
        );

        Ok(Self {
            scheduler: TaskScheduler::new(&config),
            score: ScoreState::new(config.merit_goal, config.demerit_limit),
            rng: StdRng::seed_from_u64(config.seed),
            phones: PhoneRegistry::new(phones.iter()),
            log: EventLog::new(config.session_id.clone()),
            config,
            surface,
            mixer,
            assets,
            locomotion,
            player,
            controls: MoveIntent::default(),
            pointer_captured: false,
            phase: SessionPhase::Playing,
            open_menu: None,
            close_phone: None,
            frame: 0,
            elapsed_total: 0.0,
        })
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Apply one input event. Input is only consumed while playing; menus are
    /// resolved through [`GameSession::choose`].
    pub fn handle_event(&mut self, event: InputEvent, window: WindowSize) -> EventResponse {
        if self.phase != SessionPhase::Playing {
            return EventResponse::ignored();
        }
        match event {
            InputEvent::KeyDown { repeat: true, .. } => EventResponse::ignored(),
            InputEvent::KeyDown {
                key: Key::Escape, ..
            } => {
                if self.pointer_captured {
                    self.pointer_captured = false;
                    self.record(SessionEventType::PointerReleased, None, None);
                    EventResponse::handled()
                } else {
                    EventResponse::with_transition(Transition::Exit)
                }
            }
            InputEvent::KeyUp { key: Key::Escape } => EventResponse::ignored(),
            InputEvent::KeyDown { key, .. } => {
                self.set_movement(key, true);
                EventResponse::handled()
            }
            InputEvent::KeyUp { key } => {
                self.set_movement(key, false);
                EventResponse::handled()
            }
            InputEvent::PointerMotion { dx, dy } => {
                if !self.pointer_captured {
                    return EventResponse::ignored();
                }
                let fovy = self.config.camera_fovy_degrees.to_radians();
                let (yaw, pitch) = pointer_to_angles(dx, dy, window.height, fovy);
                self.locomotion
                    .look(&self.surface, &mut self.player, yaw, pitch);
                EventResponse::handled()
            }
            InputEvent::PointerPress => {
                if self.pointer_captured {
                    EventResponse::with_transition(self.activate_phone())
                } else {
                    self.pointer_captured = true;
                    self.record(SessionEventType::PointerCaptured, None, None);
                    EventResponse::handled()
                }
            }
        }
    }

    fn set_movement(&mut self, key: Key, down: bool) {
        match key {
            Key::Forward => self.controls.forward = down,
            Key::Backward => self.controls.backward = down,
            Key::Left => self.controls.left = down,
            Key::Right => self.controls.right = down,
            Key::Escape => {}
        }
    }

    /// Interact with the phone in front of the camera, if any.
    fn activate_phone(&mut self) -> Transition {
        let Some(phone_id) = self.close_phone else {
            return Transition::Continue;
        };
        let phone_count = self.phones.len();
        let Some(phone) = self.phones.get_mut(phone_id) else {
            return Transition::Continue;
        };

        if phone.is_ringing() {
            let resolution =
                self.scheduler
                    .answer_call(phone, phone_count, &self.assets, &mut self.rng);
            self.record(SessionEventType::CallAnswered, Some(phone_id), None);
            match resolution {
                CallResolution::CheckIn { voice, line } => {
                    self.record(
                        SessionEventType::CheckInCompleted,
                        Some(phone_id),
                        Some(json!({ "voice": voice.0, "line": line })),
                    );
                    self.award_merit(Some(phone_id));
                }
                CallResolution::Relay { voice, task } => {
                    self.record(
                        SessionEventType::RelayAssigned,
                        Some(phone_id),
                        Some(json!({ "voice": voice.0, "target": task.phone.0, "say": task.say })),
                    );
                }
            }
            return self.terminal_transition();
        }

        phone.enqueue(CueId::Click { phone: phone_id });
        let assets = &self.assets;
        let labels = (0..assets.messages_for(phone_id))
            .filter_map(|message| assets.message_label(phone_id, message));
        let menu = phone_menu(phone_id, &phone.display_name(), labels);
        self.record(SessionEventType::MenuOpened, Some(phone_id), None);
        self.phase = SessionPhase::AwaitingChoice { phone: phone_id };
        self.open_menu = Some(menu.clone());
        Transition::Menu { menu }
    }

    // -----------------------------------------------------------------------
    // Menus
    // -----------------------------------------------------------------------

    /// Resolve the open menu with `action`.
    pub fn choose(&mut self, action: MenuAction) -> Transition {
        match (self.phase, action) {
            (_, MenuAction::Exit) if self.open_menu.is_some() => {
                info!("exit chosen");
                Transition::Exit
            }
            (SessionPhase::AwaitingChoice { phone }, MenuAction::HangUp) => {
                self.close_menu();
                self.record(SessionEventType::HungUp, Some(phone), None);
                Transition::Continue
            }
            (SessionPhase::AwaitingChoice { phone }, MenuAction::Say { message }) => {
                self.close_menu();
                let task = Task { phone, say: message };
                if self.scheduler.deliver(task) {
                    self.record(
                        SessionEventType::MessageDelivered,
                        Some(phone),
                        Some(json!({ "say": message })),
                    );
                    self.award_merit(Some(phone));
                } else {
                    self.record(
                        SessionEventType::MessageRejected,
                        Some(phone),
                        Some(json!({ "say": message })),
                    );
                    self.award_demerit(Some(phone));
                }
                self.terminal_transition()
            }
            (phase, action) => {
                warn!(?phase, ?action, "menu action does not apply");
                self.open_menu
                    .clone()
                    .map_or(Transition::Continue, |menu| Transition::Menu { menu })
            }
        }
    }

    /// Back out of the open menu. A phone menu closes like hang-up; the
    /// terminal menu stays open.
    pub fn escape_menu(&mut self) -> Transition {
        match self.phase {
            SessionPhase::AwaitingChoice { .. } => self.choose(MenuAction::HangUp),
            _ => self
                .open_menu
                .clone()
                .map_or(Transition::Continue, |menu| Transition::Menu { menu }),
        }
    }

    fn close_menu(&mut self) {
        self.open_menu = None;
        self.phase = SessionPhase::Playing;
    }

    fn terminal_transition(&self) -> Transition {
        match (self.phase, &self.open_menu) {
            (SessionPhase::Finished { .. }, Some(menu)) => Transition::Menu { menu: menu.clone() },
            _ => Transition::Continue,
        }
    }

    // -----------------------------------------------------------------------
    // Frame update
    // -----------------------------------------------------------------------

    /// Advance one frame: spawn tick, walk, nearest phone, listener, phones.
    /// Nothing advances while a menu is open or the session is finished.
    pub fn update(&mut self, elapsed: f32) -> Transition {
        if self.phase != SessionPhase::Playing {
            return Transition::Continue;
        }
        self.frame += 1;
        self.elapsed_total += f64::from(elapsed);

        match self.scheduler.tick(elapsed, &mut self.phones, &mut self.rng) {
            SpawnOutcome::Waiting => {}
            SpawnOutcome::Armed { phone, ring_time } => self.record(
                SessionEventType::PhoneArmed,
                Some(phone),
                Some(json!({ "ring_time": ring_time })),
            ),
            SpawnOutcome::Skipped { phone } => {
                self.record(SessionEventType::SpawnSkipped, Some(phone), None)
            }
        }

        self.locomotion
            .advance(&self.surface, &mut self.player, self.controls, elapsed);

        let camera = self.camera_pose();
        self.close_phone = self.phones.nearest_interactable(
            camera.position,
            camera.forward(),
            self.config.interact_radius,
            self.config.facing_threshold,
        );
        self.mixer.set_listener(ListenerPose {
            position: camera.position,
            right: camera.right(),
        });

        self.update_phones(elapsed);
        self.terminal_transition()
    }

    fn update_phones(&mut self, elapsed: f32) {
        let tuning = RingTuning {
            strong_threshold: self.config.strong_ring_threshold,
            ring_gain: self.config.ring_gain,
            cue_gain: self.config.cue_gain,
        };
        for index in 0..self.phones.len() {
            let id = PhoneId(index as u32);
            let Some(phone) = self.phones.get_mut(id) else {
                continue;
            };
            let ring = phone.update_ring(elapsed, &mut self.mixer, tuning);
            let started = phone.pump_audio(&mut self.mixer, tuning.cue_gain);

            if ring.started {
                self.record(SessionEventType::RingStarted, Some(id), None);
            }
            if ring.escalated {
                self.record(SessionEventType::RingEscalated, Some(id), None);
            }
            if ring.missed {
                self.record(SessionEventType::CallMissed, Some(id), None);
                self.award_demerit(Some(id));
            }
            if let Some(cue) = started {
                let mut details = json!(cue);
                if let (Some(object), Some(sample)) =
                    (details.as_object_mut(), self.assets.sample_path(cue))
                {
                    object.insert("sample".to_string(), Value::String(sample));
                }
                self.record(SessionEventType::CueStarted, Some(id), Some(details));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    fn award_merit(&mut self, phone: Option<PhoneId>) {
        if self.phase.is_finished() {
            return;
        }
        let verdict = self.score.add_merit();
        self.record(
            SessionEventType::MeritAwarded,
            phone,
            Some(json!({ "merits": self.score.merits() })),
        );
        if let Some(verdict) = verdict {
            self.finish(verdict);
        }
    }

    fn award_demerit(&mut self, phone: Option<PhoneId>) {
        if self.phase.is_finished() {
            return;
        }
        let verdict = self.score.add_demerit();
        self.record(
            SessionEventType::DemeritAwarded,
            phone,
            Some(json!({ "demerits": self.score.demerits() })),
        );
        if let Some(verdict) = verdict {
            self.finish(verdict);
        }
    }

    fn finish(&mut self, verdict: Verdict) {
        let event_type = match verdict {
            Verdict::Won => SessionEventType::SessionWon,
            Verdict::Lost => SessionEventType::SessionLost,
        };
        self.record(event_type, None, None);
        info!(?verdict, frame = self.frame, "session finished");
        self.phase = SessionPhase::Finished { verdict };
        self.open_menu = Some(terminal_menu(verdict));
    }

    fn record(&mut self, event_type: SessionEventType, phone: Option<PhoneId>, details: Option<Value>) {
        debug!(frame = self.frame, ?event_type, ?phone, "session event");
        self.log.push(self.frame, event_type, phone, details);
    }

    // -----------------------------------------------------------------------
    // Driver hooks
    // -----------------------------------------------------------------------

    /// Ring `phone` now, outside the spawn schedule. Busy phones are left
    /// alone.
    pub fn ring_phone(&mut self, phone: PhoneId, ring_time: f32) -> bool {
        let armed = self
            .phones
            .get_mut(phone)
            .is_some_and(|target| target.arm(ring_time));
        if armed {
            self.record(
                SessionEventType::PhoneArmed,
                Some(phone),
                Some(json!({ "ring_time": ring_time })),
            );
        }
        armed
    }

    /// Respawn the player at the surface point nearest `position`.
    pub fn place_player(&mut self, position: Vec3) {
        self.player = Player::spawn(&self.surface, position);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn open_menu(&self) -> Option<&MenuDescriptor> {
        self.open_menu.as_ref()
    }

    pub fn close_phone(&self) -> Option<PhoneId> {
        self.close_phone
    }

    pub fn pointer_captured(&self) -> bool {
        self.pointer_captured
    }

    pub fn player(&self) -> &Player<S::WalkPoint> {
        &self.player
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn camera_pose(&self) -> CameraPose {
        self.player.camera_pose(&self.locomotion.mount)
    }

    pub fn phones(&self) -> &PhoneRegistry<M::Handle> {
        &self.phones
    }

    pub fn tasks(&self) -> &[Task] {
        self.scheduler.tasks()
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    pub fn assets(&self) -> &PhoneBankAssets {
        &self.assets
    }

    pub fn mixer(&self) -> &M {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut M {
        &mut self.mixer
    }

    pub fn events(&self) -> &[SessionEvent] {
        self.log.events()
    }

    pub fn event_count(&self, event_type: SessionEventType) -> usize {
        self.log.count(event_type)
    }

    pub fn replay_hash(&self) -> u64 {
        self.log.replay_hash()
    }

    pub fn hud_lines(&self) -> [String; 2] {
        self.score.hud_lines()
    }

    pub fn capture_hint(&self) -> &'static str {
        if self.pointer_captured {
            HINT_CAPTURED
        } else {
            HINT_RELEASED
        }
    }

    /// Interaction prompt for the phone in front of the camera.
    pub fn prompt(&self) -> Option<[String; 2]> {
        let phone = self.phones.get(self.close_phone?)?;
        Some([
            "CLICK FOR".to_string(),
            format!("{} PHONE", phone.display_name()),
        ])
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: self.config.session_id.clone(),
            frame: self.frame,
            elapsed_seconds: self.elapsed_total,
            phase: self.phase,
            merits: self.score.merits(),
            demerits: self.score.demerits(),
            pending_tasks: self.scheduler.tasks().len(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            status: self.status(),
            seed: self.config.seed,
            spawn_timer: self.scheduler.spawn_timer(),
            player: PlayerSnapshot {
                position: self.player.position.to_array(),
                orientation: self.player.orientation.to_array(),
                elevation: self.player.elevation,
            },
            phones: self.phones.iter().map(|phone| phone.snapshot()).collect(),
            tasks: self.scheduler.tasks().to_vec(),
            score: self.score.snapshot(),
            close_phone: self.close_phone,
            replay_hash: self.log.replay_hash(),
        }
    }

    /// Phone a menu belongs to, when the open menu is a phone menu.
    pub fn menu_phone(&self) -> Option<PhoneId> {
        match self.open_menu.as_ref()?.kind {
            MenuKind::Phone { phone } => Some(phone),
            MenuKind::Terminal { .. } => None,
        }
    }
}
