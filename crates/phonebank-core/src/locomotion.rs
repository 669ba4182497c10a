//! Surface-constrained locomotion.
//!
//! The player stands on a walkable surface owned by an external walker. Each
//! frame the movement intent becomes a step in the player's local right/forward
//! plane, the walker slides the walk point, and the stored orientation is
//! carried onto the new surface normal with the shortest-arc rotation so the
//! heading survives slope changes without being re-derived from scratch.

use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;

use glam::{Mat3, Quat, Vec3};
use tracing::warn;

/// `1 + dot(old_up, new_up)` at or below this is treated as a half-turn.
const ANTIPARALLEL_EPSILON: f32 = 1e-6;

// ---------------------------------------------------------------------------
// External walker contract
// ---------------------------------------------------------------------------

/// Surface-walking collaborator. Implementations resolve edge crossings and
/// boundary sliding; callers never see an off-surface point.
pub trait WalkSurface {
    type WalkPoint: Clone + fmt::Debug;

    /// Walk point nearest to `position`.
    fn start(&self, position: Vec3) -> Self::WalkPoint;

    /// Move `point` by `step`, sliding along or across triangle edges.
    fn walk(&self, point: &mut Self::WalkPoint, step: Vec3);

    fn world_point(&self, point: &Self::WalkPoint) -> Vec3;

    /// Unit surface normal at `point`.
    fn world_normal(&self, point: &Self::WalkPoint) -> Vec3;
}

// ---------------------------------------------------------------------------
// Player state
// ---------------------------------------------------------------------------

/// Held movement keys, in player-local axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveIntent {
    pub fn is_idle(&self) -> bool {
        self.forward == self.backward && self.left == self.right
    }
}

/// Camera attachment relative to the player frame. The camera looks down its
/// local -Z, so the mount adds a quarter turn about X to face player +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMount {
    pub offset: Vec3,
    pub pitch_limit: f32,
}

impl CameraMount {
    pub fn new(height: f32, pitch_limit_degrees: f32) -> Self {
        Self {
            offset: Vec3::new(0.0, 0.0, height),
            pitch_limit: pitch_limit_degrees.to_radians(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player<P> {
    pub position: Vec3,
    /// Local X is right, local Y forward, local Z the surface normal.
    pub orientation: Quat,
    /// Camera pitch. Never folded into `orientation`.
    pub elevation: f32,
    pub walk_point: P,
}

impl<P: Clone + fmt::Debug> Player<P> {
    /// Place a player on `surface` near `position`, already aligned to the
    /// local normal.
    pub fn spawn<S>(surface: &S, position: Vec3) -> Self
    where
        S: WalkSurface<WalkPoint = P>,
    {
        let walk_point = surface.start(position);
        let position = surface.world_point(&walk_point);
        let orientation = reorient(Quat::IDENTITY, surface.world_normal(&walk_point));
        Self {
            position,
            orientation,
            elevation: 0.0,
            walk_point,
        }
    }

    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Z
    }

    /// Camera rotation relative to the player frame.
    pub fn camera_local_rotation(&self) -> Quat {
        Quat::from_axis_angle(Vec3::X, self.elevation + FRAC_PI_2)
    }

    pub fn camera_pose(&self, mount: &CameraMount) -> CameraPose {
        CameraPose {
            position: self.position + self.orientation * mount.offset,
            rotation: self.orientation * self.camera_local_rotation(),
        }
    }
}

/// World-space camera transform derived from the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl CameraPose {
    pub fn forward(&self) -> Vec3 {
        -(self.rotation * Vec3::Z)
    }

    pub fn right(&self) -> Vec3 {
        (self.rotation * Vec3::X).normalize_or_zero()
    }
}

// ---------------------------------------------------------------------------
// Orientation math
// ---------------------------------------------------------------------------

/// Minimal rotation taking unit vector `from` onto unit vector `to`.
///
/// Opposite vectors have no unique shortest arc; a half-turn about an axis
/// orthogonal to `from` is used instead.
pub fn shortest_arc(from: Vec3, to: Vec3) -> Quat {
    let w = 1.0 + from.dot(to);
    if w <= ANTIPARALLEL_EPSILON {
        warn!(?from, ?to, "antiparallel surface normals; using half-turn fallback");
        return Quat::from_axis_angle(from.any_orthonormal_vector(), PI);
    }
    let axis = from.cross(to);
    Quat::from_xyzw(axis.x, axis.y, axis.z, w).normalize()
}

/// Carry `orientation` onto a frame whose up axis is `new_up`, preserving the
/// heading of the old right axis.
pub fn reorient(orientation: Quat, new_up: Vec3) -> Quat {
    let new_up = new_up.normalize_or_zero();
    if new_up == Vec3::ZERO {
        return orientation;
    }
    let directions = Mat3::from_quat(orientation);
    let rotation = shortest_arc(directions.z_axis, new_up);

    let carried = rotation * directions.x_axis;
    let mut new_right = (carried - new_up * carried.dot(new_up)).normalize_or_zero();
    if new_right == Vec3::ZERO {
        new_right = new_up.any_orthonormal_vector();
    }
    let new_forward = new_up.cross(new_right);

    Quat::from_mat3(&Mat3::from_cols(new_right, new_forward, new_up)).normalize()
}

/// Pointer delta in pixels to (yaw, pitch) radians. Moving right or down turns
/// the view right or down.
pub fn pointer_to_angles(dx: f32, dy: f32, window_height: u32, fovy: f32) -> (f32, f32) {
    let radians_per_pixel = fovy / window_height.max(1) as f32;
    (-dx * radians_per_pixel, -dy * radians_per_pixel)
}

// ---------------------------------------------------------------------------
// SurfaceLocomotion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceLocomotion {
    pub speed: f32,
    pub mount: CameraMount,
}

impl SurfaceLocomotion {
    pub fn new(speed: f32, mount: CameraMount) -> Self {
        Self { speed, mount }
    }

    /// Step the player along the surface and realign its frame.
    pub fn advance<S: WalkSurface>(
        &self,
        surface: &S,
        player: &mut Player<S::WalkPoint>,
        intent: MoveIntent,
        elapsed: f32,
    ) {
        let directions = Mat3::from_quat(player.orientation);
        let amount = self.speed * elapsed;
        let mut step = Vec3::ZERO;
        if intent.left {
            step -= amount * directions.x_axis;
        }
        if intent.right {
            step += amount * directions.x_axis;
        }
        if intent.backward {
            step -= amount * directions.y_axis;
        }
        if intent.forward {
            step += amount * directions.y_axis;
        }

        surface.walk(&mut player.walk_point, step);
        player.position = surface.world_point(&player.walk_point);
        player.orientation = reorient(player.orientation, surface.world_normal(&player.walk_point));
    }

    /// Apply a view delta: yaw turns about the current surface normal, pitch
    /// only moves the clamped camera elevation.
    pub fn look<S: WalkSurface>(
        &self,
        surface: &S,
        player: &mut Player<S::WalkPoint>,
        yaw: f32,
        pitch: f32,
    ) {
        let limit = self.mount.pitch_limit;
        player.elevation = (player.elevation + pitch).clamp(-limit, limit);

        let up = surface.world_normal(&player.walk_point).normalize_or_zero();
        if up == Vec3::ZERO {
            return;
        }
        player.orientation = (Quat::from_axis_angle(up, yaw) * player.orientation).normalize();
    }
}
