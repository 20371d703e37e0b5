//! What the camera needs from the entity it follows
//!
//! The controller never owns the player; it reads this interface once per
//! frame. Look-at targets are plain snapshots handed over by triggers.

use crate::math::{Vec2, Vec3};
use crate::world::Aabb;

/// Entity the camera follows
pub trait CameraOwner {
    /// Feet position in world space
    fn position(&self) -> Vec3;

    /// Room the owner is standing in
    fn room(&self) -> usize;

    /// World-space bounding box
    fn bounding_box(&self) -> Aabb;

    /// Movement speed this frame, zero when standing still
    fn velocity(&self) -> f32;

    /// Facing as (pitch, yaw, roll) radians
    fn angle(&self) -> Vec3;

    /// Facing direction on the ground plane
    fn direction(&self) -> Vec3 {
        let a = self.angle();
        Vec3::new(a.y.sin(), 0.0, a.y.cos())
    }

    /// Entity the owner itself wants to look at (aiming, dialogue)
    fn view_target(&self) -> Option<LookTarget> {
        None
    }

    /// No weapons drawn. Drawn weapons switch the camera to combat distance.
    fn empty_hands(&self) -> bool;

    fn is_alive(&self) -> bool;

    /// Swimming. Keeps the view point at body height.
    fn is_underwater(&self) -> bool;

    /// Eye position for the first-person view
    fn head_position(&self) -> Vec3;
}

/// Snapshot of an entity the camera may turn toward
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookTarget {
    pub room: usize,
    pub bounds: Aabb,
    pub visible: bool,
}

impl LookTarget {
    pub fn new(room: usize, bounds: Aabb) -> Self {
        Self { room, bounds, visible: true }
    }

    pub fn position(&self) -> Vec3 {
        self.bounds.center()
    }
}

/// Manual look input for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraInput {
    /// Pointer movement since last frame in pixels, while the look button is held
    pub pointer_delta: Vec2,
    /// Look button held
    pub pointer_held: bool,
    /// Right analog stick, each axis in [-1, 1]
    pub stick: Vec2,
}
