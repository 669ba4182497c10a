use contracts::{
    CueId, InputEvent, Key, PhoneId, RelayTargetSampling, SessionConfig, SessionEventType,
    VoiceId, WindowSize,
};
use glam::Vec3;
use phonebank_core::{
    default_headless_session, AudioQueue, CameraMount, HeadlessHandle, HeadlessMixer, MoveIntent,
    PhoneBankAssets, PhoneRegistry, Player, SceneDescription, SurfaceLocomotion, TaskScheduler,
    WalkSurface,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const DT: f32 = 1.0 / 60.0;

fn base_config(seed: u64) -> SessionConfig {
    SessionConfig {
        seed,
        ..SessionConfig::default()
    }
}

fn four_phones() -> PhoneRegistry<HeadlessHandle> {
    PhoneRegistry::new([
        ("Phone.White", Vec3::new(-5.0, 5.0, 1.0)),
        ("Phone.Black", Vec3::new(5.0, 5.0, 1.0)),
        ("Phone.Cyan", Vec3::new(0.0, -5.0, 1.0)),
        ("Phone.Magenta", Vec3::new(0.0, 11.5, 2.0)),
    ])
}

/// Unit sphere of radius 3 centred on the origin.
#[derive(Debug)]
struct Sphere;

const SPHERE_RADIUS: f32 = 3.0;

impl WalkSurface for Sphere {
    type WalkPoint = Vec3;

    fn start(&self, position: Vec3) -> Vec3 {
        let direction = position.normalize_or_zero();
        if direction == Vec3::ZERO {
            Vec3::Z
        } else {
            direction
        }
    }

    fn walk(&self, point: &mut Vec3, step: Vec3) {
        let moved = (*point * SPHERE_RADIUS + step).normalize_or_zero();
        if moved != Vec3::ZERO {
            *point = moved;
        }
    }

    fn world_point(&self, point: &Vec3) -> Vec3 {
        *point * SPHERE_RADIUS
    }

    fn world_normal(&self, point: &Vec3) -> Vec3 {
        *point
    }
}

fn intent_from_bits(bits: u8) -> MoveIntent {
    MoveIntent {
        forward: bits & 1 != 0,
        backward: bits & 2 != 0,
        left: bits & 4 != 0,
        right: bits & 8 != 0,
    }
}

fn assert_frame_matches_surface<S: WalkSurface>(surface: &S, player: &Player<S::WalkPoint>) {
    let normal = surface.world_normal(&player.walk_point);
    assert!((player.orientation.length() - 1.0).abs() < 1e-4);
    assert!(player.up().dot(normal) > 0.999, "up {} vs normal {normal}", player.up());
    assert!(player.right().dot(player.up()).abs() < 1e-3);
    assert!(player.forward().dot(player.up()).abs() < 1e-3);
    assert!(player.elevation.abs() <= std::f32::consts::FRAC_PI_2 + 1e-5);
}

/// Scripted input that exercises capture, turning and walking.
fn scripted_inputs(frame: u32) -> Vec<InputEvent> {
    match frame % 240 {
        0 => vec![InputEvent::PointerPress],
        10 => vec![InputEvent::KeyDown {
            key: Key::Forward,
            repeat: false,
        }],
        70 => vec![InputEvent::PointerMotion { dx: 90.0, dy: -12.0 }],
        120 => vec![InputEvent::KeyUp { key: Key::Forward }],
        150 => vec![InputEvent::PointerPress],
        _ => Vec::new(),
    }
}

#[test]
fn property_1_relay_tasks_never_target_their_origin_over_ten_thousand_draws() {
    let assets = PhoneBankAssets::standard();
    for sampling in [
        RelayTargetSampling::ShiftOnCollision,
        RelayTargetSampling::ShiftAtOrAbove,
    ] {
        let mut config = base_config(20_240);
        config.check_in_probability = 0.0;
        config.relay_target_sampling = sampling;
        let mut scheduler = TaskScheduler::new(&config);
        let mut phones = four_phones();
        let mut rng = StdRng::seed_from_u64(config.seed);

        for draw in 0..10_000_u32 {
            let origin = PhoneId(draw % 4);
            let phone = phones.get_mut(origin).expect("phone exists");
            scheduler.answer_call(phone, 4, &assets, &mut rng);
            let task = *scheduler.tasks().last().expect("relay task");
            assert_ne!(task.phone, origin, "draw {draw} with {sampling:?}");
            assert!(task.phone.0 < 4);
            assert!(task.say < 4);
        }
        assert_eq!(scheduler.tasks().len(), 10_000);
    }
}

#[test]
fn property_2_audio_queue_plays_in_order_without_overlap() {
    let mut mixer = HeadlessMixer::default();
    let mut queue = AudioQueue::<HeadlessHandle>::default();
    let voice = VoiceId(1);
    let cues = [
        CueId::Check { voice, variant: 0 },
        CueId::TaskLine {
            voice,
            phone: PhoneId(3),
        },
        CueId::Say {
            voice,
            phone: PhoneId(3),
            message: 2,
        },
    ];
    for cue in cues {
        queue.push(cue);
    }
    for _ in 0..1_000 {
        queue.pump(&mut mixer, Vec3::ZERO, 1.0);
        mixer.advance(DT);
        if queue.is_drained() {
            break;
        }
    }
    assert!(queue.is_drained());

    let history = mixer.history();
    assert_eq!(history.iter().map(|record| record.cue).collect::<Vec<_>>(), cues);
    for pair in history.windows(2) {
        let stopped = pair[0].stopped_at.expect("earlier cue finished");
        assert!(pair[1].started_at >= stopped, "{pair:?}");
    }
}

#[test]
fn property_3_same_seed_and_inputs_replay_identically() {
    let mut a = default_headless_session(base_config(77)).expect("session");
    let mut b = default_headless_session(base_config(77)).expect("session");
    for frame in 0..1_800 {
        for event in scripted_inputs(frame) {
            a.handle_event(event, WindowSize::default());
            b.handle_event(event, WindowSize::default());
        }
        a.mixer_mut().advance(DT);
        b.mixer_mut().advance(DT);
        a.update(DT);
        b.update(DT);
        if a.open_menu().is_some() {
            a.escape_menu();
            b.escape_menu();
        }
    }
    assert_eq!(a.events(), b.events());
    assert_eq!(a.replay_hash(), b.replay_hash());
    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn property_4_different_seeds_diverge() {
    let mut a = default_headless_session(base_config(1)).expect("session");
    let mut b = default_headless_session(base_config(2)).expect("session");
    for _ in 0..(60 * 30) {
        a.update(DT);
        b.update(DT);
    }
    assert_ne!(a.replay_hash(), b.replay_hash());
}

#[test]
fn property_5_unattended_session_misses_its_first_call() {
    let mut session = default_headless_session(base_config(5)).expect("session");
    for _ in 0..(60 * 20) {
        session.mixer_mut().advance(DT);
        session.update(DT);
    }
    // The second spawn lands at 15s at the earliest and rings for 10s.
    assert!(session.event_count(SessionEventType::PhoneArmed) >= 1);
    assert_eq!(session.event_count(SessionEventType::CallMissed), 1);
    assert_eq!(session.score().demerits(), 1);
    assert_eq!(session.score().merits(), 0);

    let missed = session
        .events()
        .iter()
        .find(|event| event.event_type == SessionEventType::CallMissed)
        .and_then(|event| event.phone)
        .expect("missed phone");
    let cues = session
        .mixer()
        .history()
        .iter()
        .map(|record| record.cue)
        .filter(|cue| match cue {
            CueId::RingBasic { phone } | CueId::RingStrong { phone } | CueId::RingEnd { phone } => {
                *phone == missed
            }
            _ => false,
        })
        .take(3)
        .collect::<Vec<_>>();
    assert_eq!(
        cues,
        [
            CueId::RingBasic { phone: missed },
            CueId::RingStrong { phone: missed },
            CueId::RingEnd { phone: missed },
        ]
    );
}

proptest! {
    #[test]
    fn property_6_orientation_tracks_sphere_normal(
        moves in proptest::collection::vec((0_u8..16, -0.5_f32..0.5, -0.3_f32..0.3, 0.001_f32..0.1), 1..120),
    ) {
        let surface = Sphere;
        let locomotion = SurfaceLocomotion::new(5.0, CameraMount::new(1.6, 90.0));
        let mut player = Player::spawn(&surface, Vec3::new(0.3, -0.2, 1.0));
        assert_frame_matches_surface(&surface, &player);
        for (bits, yaw, pitch, elapsed) in moves {
            locomotion.look(&surface, &mut player, yaw, pitch);
            locomotion.advance(&surface, &mut player, intent_from_bits(bits), elapsed);
            assert_frame_matches_surface(&surface, &player);
            prop_assert!((player.position.length() - SPHERE_RADIUS).abs() < 1e-3);
        }
    }

    #[test]
    fn property_7_orientation_tracks_walk_mesh_normal(
        moves in proptest::collection::vec((0_u8..16, -0.5_f32..0.5, 0.001_f32..0.1), 1..160),
    ) {
        let scene = SceneDescription::default_phone_bank().build().expect("scene");
        let surface = scene.surface;
        let locomotion = SurfaceLocomotion::new(5.0, CameraMount::new(1.6, 90.0));
        let mut player = Player::spawn(&surface, Vec3::new(0.0, 4.0, 0.0));
        for (bits, yaw, elapsed) in moves {
            locomotion.look(&surface, &mut player, yaw, 0.0);
            locomotion.advance(&surface, &mut player, intent_from_bits(bits), elapsed);
            assert_frame_matches_surface(&surface, &player);
            let at = player.position;
            prop_assert!(at.x.abs() <= 6.0 + 1e-3 && at.y >= -6.0 - 1e-3 && at.y <= 12.0 + 1e-3);
        }
    }

    #[test]
    fn property_8_deterministic_replay_for_any_seed(seed in 1_u64..10_000, frames in 1_u32..900) {
        let mut a = default_headless_session(base_config(seed)).expect("session");
        let mut b = default_headless_session(base_config(seed)).expect("session");
        for _ in 0..frames {
            a.mixer_mut().advance(DT);
            b.mixer_mut().advance(DT);
            a.update(DT);
            b.update(DT);
        }
        prop_assert_eq!(a.events(), b.events());
        prop_assert_eq!(a.replay_hash(), b.replay_hash());
    }

    #[test]
    fn property_9_no_self_relay_for_any_seed(seed in any::<u64>(), origin in 0_u32..4) {
        let assets = PhoneBankAssets::standard();
        let mut config = base_config(seed);
        config.check_in_probability = 0.0;
        let mut scheduler = TaskScheduler::new(&config);
        let mut phones = four_phones();
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..200 {
            let phone = phones.get_mut(PhoneId(origin)).expect("phone");
            scheduler.answer_call(phone, 4, &assets, &mut rng);
        }
        prop_assert!(scheduler.tasks().iter().all(|task| task.phone != PhoneId(origin)));
    }

    #[test]
    fn property_10_config_round_trip_with_variations(
        seed in any::<u64>(),
        probability in 0.0_f64..=1.0,
        goal in 1_u32..50,
    ) {
        let mut config = SessionConfig::default();
        config.seed = seed;
        config.check_in_probability = probability;
        config.merit_goal = goal;
        let encoded = serde_json::to_string(&config).expect("serialize");
        let decoded: SessionConfig = serde_json::from_str(&encoded).expect("deserialize");
        prop_assert_eq!(config, decoded);
    }
}
