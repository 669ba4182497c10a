//! Scene description loading and phone layout validation.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SceneError;
use crate::walkmesh::{TriangleWalkMesh, WalkMeshDescription};

/// Phone names in index order. Sample tables are authored against this order.
pub const PHONE_NAMES: [&str; contracts::PHONE_COUNT] =
    ["Phone.White", "Phone.Black", "Phone.Cyan", "Phone.Magenta"];

/// Environment variable naming a scene JSON file for drivers.
pub const SCENE_PATH_ENV: &str = "PHONEBANK_SCENE";

const PHONE_PREFIX: &str = "Phone";
const PLAYER_SPAWN: &str = "Player";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneTransform {
    pub name: String,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneDescription {
    pub transforms: Vec<SceneTransform>,
    pub walk_mesh: WalkMeshDescription,
}

impl SceneDescription {
    /// Read a scene from a JSON file. Phone and mesh validation happen in
    /// [`SceneDescription::build`].
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let raw = fs::read_to_string(path).map_err(|source| SceneError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let scene: Self = serde_json::from_str(&raw).map_err(|source| SceneError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), transforms = scene.transforms.len(), "read scene file");
        Ok(scene)
    }

    /// Built-in floor with a ramp up to a raised platform; one phone per
    /// corner of the room and one on the platform.
    pub fn default_phone_bank() -> Self {
        let vertices = vec![
            [-6.0, -6.0, 0.0],
            [-2.0, -6.0, 0.0],
            [2.0, -6.0, 0.0],
            [6.0, -6.0, 0.0],
            [-6.0, 6.0, 0.0],
            [-2.0, 6.0, 0.0],
            [2.0, 6.0, 0.0],
            [6.0, 6.0, 0.0],
            [-2.0, 10.0, 1.0],
            [2.0, 10.0, 1.0],
            [-2.0, 12.0, 1.0],
            [2.0, 12.0, 1.0],
        ];
        let triangles = vec![
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            // ramp
            [5, 6, 9],
            [5, 9, 8],
            // platform
            [8, 9, 11],
            [8, 11, 10],
        ];
        let transform = |name: &str, position: [f32; 3]| SceneTransform {
            name: name.to_string(),
            position,
        };
        Self {
            transforms: vec![
                transform("Room", [0.0, 0.0, 0.0]),
                transform("Phone.Black", [5.0, 5.0, 1.0]),
                transform("Phone.Cyan", [0.0, -5.0, 1.0]),
                transform("Phone.Magenta", [0.0, 11.5, 2.0]),
                transform("Phone.White", [-5.0, 5.0, 1.0]),
            ],
            walk_mesh: WalkMeshDescription {
                vertices,
                normals: None,
                triangles,
            },
        }
    }

    /// Position of the `Player` transform, or the origin.
    pub fn player_spawn(&self) -> Vec3 {
        self.transforms
            .iter()
            .find(|transform| transform.name == PLAYER_SPAWN)
            .map_or(Vec3::ZERO, |transform| Vec3::from_array(transform.position))
    }

    /// Validate phones and build the reference walk mesh.
    pub fn build(&self) -> Result<SessionScene<TriangleWalkMesh>, SceneError> {
        let phones = PhoneLayout::from_scene(self)?;
        let surface = TriangleWalkMesh::from_description(&self.walk_mesh)?;
        info!(
            phones = phones.len(),
            triangles = surface.triangle_count(),
            "scene loaded"
        );
        Ok(SessionScene {
            surface,
            phones,
            spawn: self.player_spawn(),
        })
    }
}

/// Phones in index order, validated against [`PHONE_NAMES`].
#[derive(Debug, Clone, PartialEq)]
pub struct PhoneLayout {
    phones: Vec<(String, Vec3)>,
}

impl PhoneLayout {
    /// Collect every transform named `Phone*`, sort by name, then rotate the
    /// last one to the front so the order is White, Black, Cyan, Magenta.
    pub fn from_scene(scene: &SceneDescription) -> Result<Self, SceneError> {
        let mut phones = scene
            .transforms
            .iter()
            .filter(|transform| transform.name.starts_with(PHONE_PREFIX))
            .map(|transform| (transform.name.clone(), Vec3::from_array(transform.position)))
            .collect::<Vec<_>>();
        if phones.len() != PHONE_NAMES.len() {
            return Err(SceneError::PhoneCount {
                expected: PHONE_NAMES.len(),
                found: phones.len(),
            });
        }
        phones.sort_by(|a, b| a.0.cmp(&b.0));
        phones.rotate_right(1);
        for (slot, ((name, _), expected)) in phones.iter().zip(PHONE_NAMES).enumerate() {
            if name != expected {
                return Err(SceneError::PhoneOrder {
                    slot,
                    expected,
                    found: name.clone(),
                });
            }
        }
        Ok(Self { phones })
    }

    pub fn len(&self) -> usize {
        self.phones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Vec3)> {
        self.phones.iter().map(|(name, anchor)| (name.as_str(), *anchor))
    }
}

/// Everything a session needs from the scene: a walkable surface, the phone
/// layout and the player spawn point.
#[derive(Debug, Clone)]
pub struct SessionScene<S> {
    pub surface: S,
    pub phones: PhoneLayout,
    pub spawn: Vec3,
}
