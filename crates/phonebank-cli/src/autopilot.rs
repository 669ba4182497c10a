//! Scripted player for headless runs: walks to ringing phones, answers them,
//! and carries relay messages to their target phones. It only produces the
//! same input events a person at the keyboard would.

use contracts::{InputEvent, Key, MenuAction, MenuDescriptor, MenuKind, PhoneId, WindowSize};
use glam::{Vec2, Vec3};
use phonebank_core::{AudioMixer, GameSession, WalkSurface};

/// Turn limit per frame, radians.
const MAX_TURN: f32 = 0.2;
/// Heading error under which the autopilot walks forward.
const WALK_CONE: f32 = 0.35;
/// Horizontal distance at which the autopilot stops in front of a phone.
const STOP_DISTANCE: f32 = 1.0;
/// Walkable ground beyond this y is the ramp or the raised platform.
const UPPER_LEVEL_Y: f32 = 6.0;
const RAMP_FOOT: Vec2 = Vec2::new(0.0, 5.0);
const RAMP_DESCENT: Vec2 = Vec2::new(0.0, 5.5);

#[derive(Debug, Clone)]
pub struct Autopilot {
    window: WindowSize,
    forward_held: bool,
}

impl Autopilot {
    pub fn new(window: WindowSize) -> Self {
        Self {
            window,
            forward_held: false,
        }
    }

    /// Phone the autopilot is heading for: the ringing phone closest to
    /// running out, otherwise the oldest relay target.
    pub fn goal<S: WalkSurface, M: AudioMixer>(&self, session: &GameSession<S, M>) -> Option<PhoneId> {
        let ringing = session
            .phones()
            .iter()
            .filter(|phone| phone.is_ringing())
            .min_by(|a, b| a.ring_time().total_cmp(&b.ring_time()))
            .map(|phone| phone.id());
        ringing.or_else(|| session.tasks().first().map(|task| task.phone))
    }

    /// Input for the coming frame.
    pub fn plan<S: WalkSurface, M: AudioMixer>(&mut self, session: &GameSession<S, M>) -> Vec<InputEvent> {
        let mut events = Vec::new();
        if !session.pointer_captured() {
            events.push(InputEvent::PointerPress);
            return events;
        }

        if let Some(close) = session.close_phone() {
            let ringing = session.phones().get(close).is_some_and(|phone| phone.is_ringing());
            let has_task = session.tasks().iter().any(|task| task.phone == close);
            if ringing || has_task {
                self.set_forward(false, &mut events);
                events.push(InputEvent::PointerPress);
                return events;
            }
        }

        let Some(goal) = self.goal(session) else {
            self.set_forward(false, &mut events);
            return events;
        };
        let Some(anchor) = session.phones().get(goal).map(|phone| phone.anchor()) else {
            return events;
        };

        let player = session.player();
        let waypoint = route(player.position, anchor);
        let offset = waypoint - player.position;
        let up = player.up();
        let flat = offset - up * offset.dot(up);
        let angle = flat.dot(player.right()).atan2(flat.dot(player.forward()));

        let fovy = session.config().camera_fovy_degrees.to_radians();
        let pixels_per_radian = self.window.height.max(1) as f32 / fovy;
        let turn = angle.clamp(-MAX_TURN, MAX_TURN);
        let level = player.elevation;
        if turn.abs() > 1e-3 || level.abs() > 1e-3 {
            events.push(InputEvent::PointerMotion {
                dx: turn * pixels_per_radian,
                dy: level * pixels_per_radian,
            });
        }

        let arrived = waypoint == anchor && flat.length() < STOP_DISTANCE;
        self.set_forward(angle.abs() < WALK_CONE && !arrived, &mut events);
        events
    }

    /// Answer for an open menu: deliver the pending message for a phone
    /// menu, hang up when there is none, exit a terminal menu.
    pub fn choose<S: WalkSurface, M: AudioMixer>(
        &self,
        session: &GameSession<S, M>,
        menu: &MenuDescriptor,
    ) -> MenuAction {
        match menu.kind {
            MenuKind::Terminal { .. } => MenuAction::Exit,
            MenuKind::Phone { phone } => session
                .tasks()
                .iter()
                .find(|task| task.phone == phone)
                .map_or(MenuAction::HangUp, |task| MenuAction::Say { message: task.say }),
        }
    }

    fn set_forward(&mut self, held: bool, events: &mut Vec<InputEvent>) {
        if held == self.forward_held {
            return;
        }
        self.forward_held = held;
        events.push(if held {
            InputEvent::KeyDown {
                key: Key::Forward,
                repeat: false,
            }
        } else {
            InputEvent::KeyUp { key: Key::Forward }
        });
    }
}

/// Next point to walk toward. Changing level goes through the ramp.
fn route(position: Vec3, anchor: Vec3) -> Vec3 {
    let player_upper = position.y > UPPER_LEVEL_Y;
    let goal_upper = anchor.y > UPPER_LEVEL_Y;
    let via = |point: Vec2| Vec3::new(point.x, point.y, position.z);
    match (player_upper, goal_upper) {
        (false, true) if !(position.x.abs() < 1.0 && position.y > RAMP_FOOT.y - 1.0) => via(RAMP_FOOT),
        (true, false) if position.y > RAMP_DESCENT.y + 1.0 => via(RAMP_DESCENT),
        _ => anchor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SessionConfig, SessionEventType, Transition};
    use phonebank_core::default_headless_session;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn first_input_grabs_the_pointer() {
        let session = default_headless_session(SessionConfig::default()).expect("session");
        let mut pilot = Autopilot::new(WindowSize::default());
        assert_eq!(pilot.plan(&session), vec![InputEvent::PointerPress]);
    }

    #[test]
    fn route_goes_through_the_ramp() {
        let floor = Vec3::new(-5.0, 0.0, 0.0);
        let magenta = Vec3::new(0.0, 11.5, 2.0);
        assert_eq!(route(floor, magenta), Vec3::new(0.0, 5.0, 0.0));
        let at_foot = Vec3::new(0.2, 5.0, 0.0);
        assert_eq!(route(at_foot, magenta), magenta);
        let platform = Vec3::new(1.0, 11.0, 1.0);
        let white = Vec3::new(-5.0, 5.0, 1.0);
        assert_eq!(route(platform, white), Vec3::new(0.0, 5.5, 1.0));
    }

    #[test]
    fn autopilot_walks_over_and_answers_a_ringing_phone() {
        let mut config = SessionConfig::default();
        config.initial_spawn_delay = 600.0;
        let mut session = default_headless_session(config).expect("session");
        let mut pilot = Autopilot::new(WindowSize::default());
        assert!(session.ring_phone(PhoneId(2), 13.0));

        for _ in 0..(60 * 12) {
            for event in pilot.plan(&session) {
                let response = session.handle_event(event, WindowSize::default());
                if let Transition::Menu { menu } = response.transition {
                    let action = pilot.choose(&session, &menu);
                    session.choose(action);
                }
            }
            session.mixer_mut().advance(DT);
            session.update(DT);
            if session.event_count(SessionEventType::CallAnswered) > 0 {
                break;
            }
        }
        assert_eq!(session.event_count(SessionEventType::CallAnswered), 1);
        assert_eq!(session.event_count(SessionEventType::CallMissed), 0);
    }

    #[test]
    fn menu_choice_delivers_pending_message() {
        let session = default_headless_session(SessionConfig::default()).expect("session");
        let pilot = Autopilot::new(WindowSize::default());
        let menu = phonebank_core::menu::phone_menu(PhoneId(1), "BLACK", ["BENCH"]);
        assert_eq!(pilot.choose(&session, &menu), MenuAction::HangUp);
        let terminal = phonebank_core::menu::terminal_menu(contracts::Verdict::Won);
        assert_eq!(pilot.choose(&session, &terminal), MenuAction::Exit);
    }
}
