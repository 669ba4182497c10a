//! Load-time error taxonomy. Everything here is fatal to session construction;
//! runtime game-logic failures are scored, never raised.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported config schema version {found} (expected {expected})")]
    SchemaVersion { found: String, expected: &'static str },
    #[error("invalid config field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scene {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("scene has {found} phones, expected {expected}")]
    PhoneCount { expected: usize, found: usize },
    #[error("phone slot {slot} holds {found:?}, expected {expected:?}")]
    PhoneOrder {
        slot: usize,
        expected: &'static str,
        found: String,
    },
    #[error("walk mesh has no triangles")]
    EmptyWalkMesh,
    #[error("triangle {triangle} references vertex {index} but only {vertex_count} exist")]
    VertexIndex {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("triangle {triangle} is degenerate")]
    DegenerateTriangle { triangle: usize },
    #[error("walk mesh has {found} normals for {expected} vertices")]
    NormalCount { expected: usize, found: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("voice bank is empty")]
    NoVoices,
    #[error("voice {voice} has no check lines")]
    NoCheckLines { voice: String },
    #[error("voice {voice} has {found} task lines for {expected} phones")]
    TaskLineCount {
        voice: String,
        expected: usize,
        found: usize,
    },
    #[error("voice {voice} has say lines for {found} phones, expected {expected}")]
    SayTableShape {
        voice: String,
        expected: usize,
        found: usize,
    },
    #[error("phone {phone} has {found} message labels but voice {voice} records {expected}")]
    MessageLabelCount {
        voice: String,
        phone: usize,
        expected: usize,
        found: usize,
    },
    #[error("phone {phone} has no message variants")]
    NoMessages { phone: usize },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}
