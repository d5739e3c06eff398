//! Remote player smoothing
//!
//! Network updates arrive at ~20 Hz; each rendered frame moves the displayed
//! pose a fraction of the way toward the latest target so motion reads as
//! continuous instead of stepping.

use std::f32::consts::{PI, TAU};

use crate::ws::protocol::{PlayerId, PlayerView, Vec3};

/// Exponential approach rate per second
pub const SMOOTHING_RATE: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    id: PlayerId,
    position: Vec3,
    rotation: f32,
    target_position: Vec3,
    target_rotation: f32,
}

impl RemotePlayer {
    pub fn new(view: &PlayerView) -> Self {
        let position = view.position();
        Self {
            id: view.id.clone(),
            position,
            rotation: view.rotation,
            target_position: position,
            target_rotation: view.rotation,
        }
    }

    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    /// Displayed position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Displayed yaw in radians
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn target_position(&self) -> Vec3 {
        self.target_position
    }

    pub fn set_target(&mut self, position: Vec3, rotation: f32) {
        self.target_position = position;
        self.target_rotation = rotation;
    }

    /// Jump straight to a pose (respawn)
    pub fn snap_to(&mut self, position: Vec3, rotation: f32) {
        self.set_target(position, rotation);
        self.position = position;
        self.rotation = rotation;
    }

    /// Move toward the target by `min(1, rate * dt)` of the remaining gap
    pub fn advance(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let t = (SMOOTHING_RATE * dt).min(1.0);

        self.position = lerp(self.position, self.target_position, t);
        self.rotation += shortest_arc(self.rotation, self.target_rotation) * t;
    }
}

fn lerp(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    Vec3::new(
        from.x + (to.x - from.x) * t,
        from.y + (to.y - from.y) * t,
        from.z + (to.z - from.z) * t,
    )
}

/// Signed angle from `from` to `to`, wrapped into [-PI, PI]
fn shortest_arc(from: f32, to: f32) -> f32 {
    let mut delta = (to - from) % TAU;
    if delta > PI {
        delta -= TAU;
    } else if delta < -PI {
        delta += TAU;
    }
    delta
}
