mod autopilot;

use std::env;
use std::path::{Path, PathBuf};

use contracts::serde_u64_string::parse_u64_text;
use contracts::{SessionConfig, SessionPhase, Transition, WindowSize};
use phonebank_core::{
    headless_session, load_config, time_seed, HeadlessSession, SceneDescription, CONFIG_PATH_ENV,
    SCENE_PATH_ENV,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::autopilot::Autopilot;

const FRAME_STEP: f32 = 1.0 / 60.0;
const DEFAULT_SECONDS: u64 = 300;

fn print_usage() {
    println!("phonebank-cli [--log-level <level>] <command>");
    println!("commands:");
    println!("  status [config_path] [scene_path]");
    println!("  config");
    println!("    prints the default session config as JSON");
    println!("  simulate <seed|auto> [seconds] [config_path] [scene_path]");
    println!("    runs a session with no player input");
    println!("  autoplay <seed|auto> [seconds] [config_path] [scene_path]");
    println!("    runs a session driven by the autopilot");
    println!("config_path falls back to ${CONFIG_PATH_ENV}, scene_path to ${SCENE_PATH_ENV}");
    println!("without a scene the built-in phone bank is used; default seconds: {DEFAULT_SECONDS}");
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Pull `--log-level <level>` out of the argument list.
fn take_log_level(args: &mut Vec<String>) -> Result<Option<String>, String> {
    let Some(index) = args.iter().position(|arg| arg == "--log-level") else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        return Err("missing value for --log-level".to_string());
    }
    let level = args.remove(index + 1);
    args.remove(index);
    Ok(Some(level))
}

fn parse_seed(value: Option<&String>) -> Result<u64, String> {
    let raw = value.ok_or_else(|| "missing seed".to_string())?;
    if raw == "auto" {
        return Ok(time_seed());
    }
    parse_u64_text(raw).map_err(|_| format!("invalid seed: {raw}"))
}

fn parse_seconds(value: Option<&String>) -> Result<u64, String> {
    value
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|_| format!("invalid seconds: {raw}"))
        })
        .transpose()
        .map(|seconds| seconds.unwrap_or(DEFAULT_SECONDS))
}

/// Path from the argument, else from `env_key`. Blank values mean none.
fn path_arg(value: Option<&String>, env_key: &str) -> Option<PathBuf> {
    value
        .map(String::to_string)
        .or_else(|| env::var(env_key).ok())
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

fn resolve_config(path: Option<&Path>) -> Result<SessionConfig, String> {
    match path {
        Some(path) => load_config(path).map_err(|err| err.to_string()),
        None => Ok(SessionConfig {
            seed: time_seed(),
            ..SessionConfig::default()
        }),
    }
}

fn resolve_scene(path: Option<&Path>) -> Result<SceneDescription, String> {
    match path {
        Some(path) => SceneDescription::load(path).map_err(|err| err.to_string()),
        None => Ok(SceneDescription::default_phone_bank()),
    }
}

fn build_session(args: &[String]) -> Result<(HeadlessSession, u64), String> {
    let seed = parse_seed(args.get(2))?;
    let seconds = parse_seconds(args.get(3))?;
    let mut config = resolve_config(path_arg(args.get(4), CONFIG_PATH_ENV).as_deref())?;
    config.seed = seed;
    let scene = resolve_scene(path_arg(args.get(5), SCENE_PATH_ENV).as_deref())?;
    let session = headless_session(config, &scene).map_err(|err| err.to_string())?;
    Ok((session, seconds))
}

/// Step the session at a fixed rate until time runs out or it ends.
fn run_session(
    session: &mut HeadlessSession,
    seconds: u64,
    mut pilot: Option<&mut Autopilot>,
) -> Result<(), String> {
    let window = WindowSize::default();
    let frames = seconds.saturating_mul(60);
    for _ in 0..frames {
        if let Some(pilot) = pilot.as_deref_mut() {
            for event in pilot.plan(session) {
                let response = session.handle_event(event, window);
                match response.transition {
                    Transition::Continue => {}
                    Transition::Exit => return Ok(()),
                    Transition::Menu { menu } => {
                        let action = pilot.choose(session, &menu);
                        if session.choose(action) == Transition::Exit {
                            return Ok(());
                        }
                    }
                }
            }
        }

        session.mixer_mut().advance(FRAME_STEP);
        if let Transition::Menu { menu } = session.update(FRAME_STEP) {
            info!(title = %menu.items.first().map_or("", |item| item.label.as_str()), "terminal menu");
        }
        if let SessionPhase::Finished { verdict } = session.phase() {
            info!(?verdict, "session ended");
            return Ok(());
        }
    }
    Ok(())
}

fn print_report(label: &str, session: &HeadlessSession) -> Result<(), String> {
    let snapshot = session.snapshot();
    let [merits, demerits] = session.hud_lines();
    println!(
        "{label} seed={} replay_hash={} {} | {merits} {demerits}",
        snapshot.seed,
        session.replay_hash(),
        snapshot.status
    );
    let encoded = serde_json::to_string_pretty(&snapshot)
        .map_err(|err| format!("failed to encode snapshot: {err}"))?;
    println!("{encoded}");
    Ok(())
}

fn run_command(args: &[String]) -> Result<(), String> {
    match args.get(1).map(String::as_str) {
        Some("status") => {
            let config = resolve_config(path_arg(args.get(2), CONFIG_PATH_ENV).as_deref())?;
            let scene = resolve_scene(path_arg(args.get(3), SCENE_PATH_ENV).as_deref())?;
            let session = headless_session(config, &scene).map_err(|err| err.to_string())?;
            println!("{}", session.status());
            println!("{}", session.capture_hint());
            Ok(())
        }
        Some("config") => {
            let encoded = serde_json::to_string_pretty(&SessionConfig::default())
                .map_err(|err| format!("failed to encode config: {err}"))?;
            println!("{encoded}");
            Ok(())
        }
        Some("simulate") => {
            let (mut session, seconds) = build_session(args)?;
            run_session(&mut session, seconds, None)?;
            print_report("simulated", &session)
        }
        Some("autoplay") => {
            let (mut session, seconds) = build_session(args)?;
            let mut pilot = Autopilot::new(WindowSize::default());
            run_session(&mut session, seconds, Some(&mut pilot))?;
            print_report("autoplayed", &session)
        }
        Some(other) => Err(format!("unknown command: {other}")),
        None => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    let mut args: Vec<String> = env::args().collect();
    let level = match take_log_level(&mut args) {
        Ok(level) => level,
        Err(err) => {
            eprintln!("error: {err}");
            print_usage();
            std::process::exit(2);
        }
    };
    init_tracing(level.as_deref());

    if let Err(err) = run_command(&args) {
        warn!(error = %err, "command failed");
        eprintln!("error: {err}");
        print_usage();
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn log_level_flag_is_removed_from_args() {
        let mut argv = args(&["phonebank-cli", "--log-level", "debug", "simulate", "7"]);
        assert_eq!(take_log_level(&mut argv), Ok(Some("debug".to_string())));
        assert_eq!(argv, args(&["phonebank-cli", "simulate", "7"]));
        let mut dangling = args(&["phonebank-cli", "--log-level"]);
        assert!(take_log_level(&mut dangling).is_err());
    }

    #[test]
    fn seeds_accept_decimal_and_hex() {
        assert_eq!(parse_seed(Some(&"42".to_string())), Ok(42));
        assert_eq!(parse_seed(Some(&"0x2A".to_string())), Ok(42));
        assert!(parse_seed(Some(&"forty-two".to_string())).is_err());
        assert!(parse_seed(None).is_err());
    }

    #[test]
    fn seconds_default_when_absent() {
        assert_eq!(parse_seconds(None), Ok(DEFAULT_SECONDS));
        assert_eq!(parse_seconds(Some(&"12".to_string())), Ok(12));
        assert!(parse_seconds(Some(&"-1".to_string())).is_err());
    }

    #[test]
    fn simulate_runs_to_completion_deterministically() {
        let argv = args(&["phonebank-cli", "simulate", "11", "40", "", ""]);
        let (mut a, seconds) = build_session(&argv).expect("session");
        let (mut b, _) = build_session(&argv).expect("session");
        run_session(&mut a, seconds, None).expect("run");
        run_session(&mut b, seconds, None).expect("run");
        assert_eq!(a.replay_hash(), b.replay_hash());
        assert!(a.score().demerits() >= 1);
        assert_eq!(a.score().merits(), 0);
    }

    #[test]
    fn scene_argument_is_loaded_from_disk() {
        let mut scene = SceneDescription::default_phone_bank();
        for transform in &mut scene.transforms {
            if transform.name == "Phone.Cyan" {
                transform.position = [1.0, -4.0, 1.0];
            }
        }
        let path = env::temp_dir().join(format!(
            "phonebank_cli_scene_{}_{}.json",
            std::process::id(),
            time_seed()
        ));
        std::fs::write(&path, serde_json::to_string(&scene).expect("encode")).expect("write");
        let scene_arg = path.to_string_lossy().to_string();
        let argv = args(&["phonebank-cli", "simulate", "3", "1", "", &scene_arg]);
        let built = build_session(&argv);
        let _ = std::fs::remove_file(&path);
        let (session, _) = built.expect("session");
        let cyan = session.phones().get(contracts::PhoneId(2)).expect("cyan");
        assert_eq!(cyan.anchor(), glam::Vec3::new(1.0, -4.0, 1.0));
    }

    #[test]
    fn missing_scene_file_is_an_error() {
        let argv = args(&[
            "phonebank-cli",
            "simulate",
            "3",
            "1",
            "",
            "/definitely/not/a/scene.json",
        ]);
        let err = build_session(&argv).err().expect("missing scene");
        assert!(err.contains("scene.json"), "{err}");
    }
}
