use contracts::{
    InputEvent, MenuAction, PhoneId, SessionConfig, SessionEventType, SessionPhase, Task,
    Transition, WindowSize,
};
use glam::Vec3;
use phonebank_core::{
    GameSession, HeadlessMixer, HeadlessSession, PhoneBankAssets, SceneDescription, SceneTransform,
};

const DT: f32 = 1.0 / 60.0;

fn relay_config(seed: u64) -> SessionConfig {
    SessionConfig {
        seed,
        check_in_probability: 0.0,
        // Keep random spawns out of the scripted calls.
        initial_spawn_delay: 600.0,
        ..SessionConfig::default()
    }
}

fn session_with_spawn(config: SessionConfig, spawn: [f32; 3]) -> HeadlessSession {
    let mut scene = SceneDescription::default_phone_bank();
    scene.transforms.push(SceneTransform {
        name: "Player".to_string(),
        position: spawn,
    });
    let built = scene.build().expect("scene");
    let assets = PhoneBankAssets::standard();
    GameSession::new(config, built, HeadlessMixer::new(assets.timings), assets).expect("session")
}

fn press(session: &mut HeadlessSession) -> Transition {
    session
        .handle_event(InputEvent::PointerPress, WindowSize::default())
        .transition
}

/// Stand half a unit short of `phone`, facing it.
fn walk_up_to(session: &mut HeadlessSession, phone: PhoneId) {
    let anchor = session.phones().get(phone).expect("phone").anchor();
    session.place_player(Vec3::new(anchor.x, anchor.y - 0.5, anchor.z - 1.0));
    session.update(DT);
    assert_eq!(session.close_phone(), Some(phone));
}

/// Phone 2 rings, the player answers and gets a relay task.
fn answer_relay_at_cyan(seed: u64) -> (HeadlessSession, Task) {
    let mut session = session_with_spawn(relay_config(seed), [0.0, -5.5, 0.0]);
    press(&mut session);
    assert!(session.ring_phone(PhoneId(2), 12.0));
    session.update(DT);
    assert_eq!(session.close_phone(), Some(PhoneId(2)));
    assert_eq!(press(&mut session), Transition::Continue);

    assert_eq!(session.tasks().len(), 1);
    let task = session.tasks()[0];
    assert_ne!(task.phone, PhoneId(2));
    assert_eq!(session.event_count(SessionEventType::RelayAssigned), 1);
    (session, task)
}

#[test]
fn relayed_message_at_target_phone_earns_a_merit() {
    for seed in [3, 17, 256, 9_001] {
        let (mut session, task) = answer_relay_at_cyan(seed);
        walk_up_to(&mut session, task.phone);

        let Transition::Menu { menu } = press(&mut session) else {
            panic!("expected the phone menu");
        };
        assert_eq!(menu.selected, 1);
        let say_item = &menu.items[task.say as usize + 2];
        assert_eq!(say_item.action, Some(MenuAction::Say { message: task.say }));

        assert_eq!(
            session.choose(MenuAction::Say { message: task.say }),
            Transition::Continue
        );
        assert!(session.tasks().is_empty());
        assert_eq!(session.score().merits(), 1);
        assert_eq!(session.score().demerits(), 0);
        assert_eq!(session.phase(), SessionPhase::Playing);
    }
}

#[test]
fn wrong_message_keeps_task_and_costs_a_demerit() {
    let (mut session, task) = answer_relay_at_cyan(44);
    walk_up_to(&mut session, task.phone);
    press(&mut session);
    let wrong = (task.say + 1) % 4;
    session.choose(MenuAction::Say { message: wrong });
    assert_eq!(session.tasks(), &[task]);
    assert_eq!(session.score().demerits(), 1);
    assert_eq!(session.score().merits(), 0);
}

#[test]
fn delivering_twice_only_counts_once() {
    let (mut session, task) = answer_relay_at_cyan(8);
    walk_up_to(&mut session, task.phone);
    press(&mut session);
    session.choose(MenuAction::Say { message: task.say });
    press(&mut session);
    session.choose(MenuAction::Say { message: task.say });
    assert_eq!(session.score().merits(), 1);
    assert_eq!(session.score().demerits(), 1);
}

#[test]
fn message_at_the_answering_phone_is_rejected() {
    let (mut session, task) = answer_relay_at_cyan(99);
    // Wait for the call's cues to finish so Cyan is idle again.
    for _ in 0..600 {
        session.mixer_mut().advance(DT);
        session.update(DT);
    }
    assert_eq!(session.close_phone(), Some(PhoneId(2)));
    let Transition::Menu { .. } = press(&mut session) else {
        panic!("expected the phone menu");
    };
    session.choose(MenuAction::Say { message: task.say });
    assert_eq!(session.tasks(), &[task]);
    assert_eq!(session.score().demerits(), 1);
}

#[test]
fn answered_call_plays_click_task_say_click_in_order() {
    let (mut session, task) = answer_relay_at_cyan(12);
    for _ in 0..600 {
        session.mixer_mut().advance(DT);
        session.update(DT);
    }
    let played = session
        .events()
        .iter()
        .filter(|event| event.event_type == SessionEventType::CueStarted)
        .filter(|event| event.phone == Some(PhoneId(2)))
        .filter_map(|event| event.details.as_ref())
        .filter_map(|details| details.get("cue").and_then(|cue| cue.as_str()))
        .map(str::to_string)
        .collect::<Vec<_>>();
    assert_eq!(played, ["click", "task_line", "say", "click"]);

    let samples = session
        .events()
        .iter()
        .filter(|event| event.event_type == SessionEventType::CueStarted)
        .filter(|event| event.phone == Some(PhoneId(2)))
        .filter_map(|event| event.details.as_ref())
        .filter_map(|details| details.get("sample").and_then(|sample| sample.as_str()))
        .map(str::to_string)
        .collect::<Vec<_>>();
    assert_eq!(samples.len(), 4);
    assert_eq!(samples[0], "samples/click-3.wav");
    assert_eq!(samples[3], "samples/click-3.wav");
    assert!(samples[1].contains("-task-"), "{samples:?}");
    assert!(samples[2].contains("-say-"), "{samples:?}");

    let records = session
        .mixer()
        .history()
        .iter()
        .filter(|record| record.at == session.phones().get(PhoneId(2)).expect("cyan").anchor())
        .filter(|record| record.mode == contracts::PlayMode::Once)
        .collect::<Vec<_>>();
    for pair in records.windows(2) {
        let stopped = pair[0].stopped_at.expect("finished");
        assert!(pair[1].started_at >= stopped);
    }
    assert_eq!(task, session.tasks()[0]);
}
