//! Session configuration loading and validation.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use contracts::{SecondsRange, SessionConfig, SCHEMA_VERSION_V1};
use tracing::info;

use crate::error::ConfigError;

pub const CONFIG_PATH_ENV: &str = "PHONEBANK_CONFIG";

/// Read a JSON config file and validate it.
pub fn load_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: SessionConfig =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    validate_config(&config)?;
    info!(path = %path.display(), seed = config.seed, "loaded session config");
    Ok(config)
}

pub fn validate_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.schema_version != SCHEMA_VERSION_V1 {
        return Err(ConfigError::SchemaVersion {
            found: config.schema_version.clone(),
            expected: SCHEMA_VERSION_V1,
        });
    }
    positive("walk_speed", config.walk_speed)?;
    positive("camera_fovy_degrees", config.camera_fovy_degrees)?;
    positive("interact_radius", config.interact_radius)?;
    non_negative("camera_height", config.camera_height)?;
    non_negative("initial_spawn_delay", config.initial_spawn_delay)?;
    non_negative("strong_ring_threshold", config.strong_ring_threshold)?;
    non_negative("ring_gain", config.ring_gain)?;
    non_negative("cue_gain", config.cue_gain)?;
    if !(0.0..=90.0).contains(&config.pitch_limit_degrees) {
        return Err(invalid(
            "pitch_limit_degrees",
            format!("{} is outside [0, 90]", config.pitch_limit_degrees),
        ));
    }
    if !(0.0..=1.0).contains(&config.check_in_probability) {
        return Err(invalid(
            "check_in_probability",
            format!("{} is outside [0, 1]", config.check_in_probability),
        ));
    }
    range("ring_duration", config.ring_duration)?;
    range("respawn_delay", config.respawn_delay)?;
    if config.ring_duration.min <= 0.0 {
        return Err(invalid(
            "ring_duration",
            "a ring must last longer than zero seconds".to_string(),
        ));
    }
    if config.respawn_delay.min <= 0.0 {
        return Err(invalid(
            "respawn_delay",
            "spawn attempts need a positive delay".to_string(),
        ));
    }
    if config.merit_goal == 0 {
        return Err(invalid("merit_goal", "must be at least 1".to_string()));
    }
    if config.demerit_limit == 0 {
        return Err(invalid("demerit_limit", "must be at least 1".to_string()));
    }
    Ok(())
}

/// Seed derived from the wall clock, for sessions that do not pin one.
pub fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0)
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} must be positive")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} must be non-negative")))
    }
}

fn range(field: &'static str, value: SecondsRange) -> Result<(), ConfigError> {
    if !value.min.is_finite() || !value.max.is_finite() || value.min > value.max {
        return Err(invalid(
            field,
            format!("[{}, {}] is not a valid range", value.min, value.max),
        ));
    }
    Ok(())
}
