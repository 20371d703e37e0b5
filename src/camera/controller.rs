//! Per-frame camera state machine
//!
//! Follow and combat chase the owner from behind, static views hold a fixed
//! position chosen by a trigger, cutscenes play back key frames. First person
//! is a flag on top of any of them.

use std::f32::consts::PI;

use crate::math::{
    clamp_angle, lerp, mat4_inverse_rigid, mat4_look_at, mat4_mul, mat4_perspective, mat4_position,
    mat4_rotation_y, mat4_transform_point, mat4_translation, Mat4, Vec3,
};
use crate::visibility::PortalView;
use crate::world::{CameraKeyframe, Level, Location, SECTOR_SIZE};

use super::config::CameraConfig;
use super::owner::{CameraInput, CameraOwner, LookTarget};
use super::tracer::{smoothing_factor, CameraTracer, WALL_MARGIN};

/// Cutscene key frames per second
const CUTSCENE_FPS: f32 = 30.0;
/// Key frames further apart than this on any axis are a cut, not a pan
const CUTSCENE_JUMP: f32 = 512.0;
/// Room size in sectors to metres, for reverb
const SECTOR_METRES: f32 = 2.419;
/// Target rise rate per second while smoothing
const TARGET_RISE_RATE: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraMode {
    /// Behind the owner at follow distance
    Follow,
    /// Behind the owner at combat distance (weapons drawn)
    Combat,
    /// Fixed view placed in the level, held for `timer` seconds
    Static { view_index: usize, timer: f32 },
    /// Key frame playback, `timer` counts frames
    Cutscene { timer: f32 },
}

/// Requests the camera makes of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEvent {
    /// A cutscene-only level finished playing
    LoadNextLevel,
}

/// Matrices handed to the renderer
#[derive(Debug, Clone, Copy)]
pub struct CameraView {
    pub view: Mat4,
    pub view_inv: Mat4,
    pub projection: Mat4,
    pub view_proj: Mat4,
    pub position: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
}

impl CameraView {
    pub fn portal_view(&self) -> PortalView {
        PortalView { position: self.position, view_proj: self.view_proj }
    }
}

pub struct CameraController {
    config: CameraConfig,
    mode: CameraMode,
    first_person: bool,

    eye: Location,
    target: Location,

    /// Manual look offset (pitch, yaw, roll) on top of the owner's facing
    look_offset: Vec3,
    target_angle: Vec3,
    /// Recentre countdown. Negative while the player is steering the view.
    recenter_timer: f32,

    speed: f32,
    smooth: bool,
    shake: f32,

    /// Look-at target requested by a trigger
    view_target: Option<LookTarget>,
    /// Look-at target actually in use this frame
    look_at: Option<LookTarget>,
    last_view_index: Option<usize>,

    /// Places cutscene key frames in the world
    cut_matrix: Mat4,
    view_inv: Mat4,

    fov: f32,
    near: f32,
    aspect: f32,
}

impl CameraController {
    pub fn new(config: CameraConfig, level: &Level, owner: &dyn CameraOwner) -> Self {
        let mode = if level.cutscene {
            CameraMode::Cutscene { timer: 0.0 }
        } else {
            CameraMode::Follow
        };

        let pos = owner.position();
        let room = owner.room();
        let eye = Location::new(room, pos + Vec3::new(0.0, 0.0, -100.0));
        let target = Location::new(room, pos + Vec3::new(0.0, -SECTOR_SIZE, 0.0));

        let mut controller = Self {
            speed: config.follow_speed,
            fov: config.fov,
            near: config.near,
            config,
            mode,
            first_person: false,
            eye,
            target,
            look_offset: Vec3::ZERO,
            target_angle: Vec3::ZERO,
            recenter_timer: 0.0,
            smooth: false,
            shake: 0.0,
            view_target: None,
            look_at: None,
            last_view_index: None,
            cut_matrix: crate::math::mat4_identity(),
            view_inv: mat4_look_at(eye.pos, target.pos, Vec3::UP),
            aspect: 4.0 / 3.0,
        };
        controller.set_first_person(false);
        controller.recenter_timer = -controller.config.recenter_delay;
        controller
    }

    // ========================================================================
    // Trigger requests
    // ========================================================================

    /// Switch to a fixed view for `timer` seconds. `speed` 0 cuts straight
    /// to it, larger values pan.
    pub fn set_view(&mut self, view_index: usize, timer: f32, speed: f32) {
        tracing::debug!(view_index, timer, speed, "static view requested");
        self.last_view_index = Some(view_index);
        self.smooth = speed > 0.0;
        self.mode = CameraMode::Static { view_index, timer };
        self.speed = speed * self.config.static_speed_scale;
    }

    /// Entity to turn toward. Cleared at the end of every follow frame, so
    /// triggers keep setting it while active.
    pub fn set_view_target(&mut self, target: Option<LookTarget>) {
        self.view_target = target;
    }

    /// Back to following the owner
    pub fn reset_target(&mut self) {
        self.smooth = self.speed > 0.0;
        self.mode = CameraMode::Follow;
        self.view_target = None;
        self.speed = self.config.follow_speed;
    }

    /// Start key frame playback, placing the frames at `origin` turned by
    /// `rotation` radians around Y
    pub fn start_cutscene(&mut self, origin: Vec3, rotation: f32) {
        tracing::debug!(?origin, rotation, "cutscene started");
        self.cut_matrix = mat4_mul(&mat4_translation(origin), &mat4_rotation_y(rotation));
        self.mode = CameraMode::Cutscene { timer: 0.0 };
    }

    pub fn set_first_person(&mut self, first_person: bool) {
        self.first_person = first_person;
        if first_person {
            self.smooth = false;
        }
        self.look_offset = Vec3::ZERO;
        self.recenter_timer = 0.0;

        if first_person {
            self.fov = self.config.first_person_fov;
            self.near = self.config.first_person_near;
        } else {
            self.fov = self.config.fov;
            self.near = self.config.near;
        }
    }

    /// Shake the view, decaying over `intensity` seconds
    pub fn shake(&mut self, intensity: f32) {
        self.shake = intensity.max(0.0);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn is_first_person(&self) -> bool {
        self.first_person
    }

    pub fn eye(&self) -> Location {
        self.eye
    }

    pub fn target(&self) -> Location {
        self.target
    }

    pub fn look_offset(&self) -> Vec3 {
        self.look_offset
    }

    pub fn target_angle(&self) -> Vec3 {
        self.target_angle
    }

    pub fn look_at(&self) -> Option<LookTarget> {
        self.look_at
    }

    pub fn last_view_index(&self) -> Option<usize> {
        self.last_view_index
    }

    pub fn shake_intensity(&self) -> f32 {
        self.shake
    }

    /// Room the eye is in after flip substitution
    pub fn room(&self, level: &Level) -> usize {
        level.effective_room(self.eye.room)
    }

    pub fn is_underwater(&self, level: &Level) -> bool {
        level.is_underwater(self.eye.room)
    }

    /// Eye room dimensions in metres, for reverb
    pub fn room_size(&self, level: &Level) -> Vec3 {
        level.room_extent(self.eye.room) * SECTOR_METRES
    }

    /// Matrices for this frame
    pub fn view(&self) -> CameraView {
        let mut view = mat4_inverse_rigid(&self.view_inv);
        if self.shake > 0.0 {
            let offset = (self.shake * PI * 7.0).sin() * self.shake * 48.0;
            view = mat4_mul(&view, &mat4_translation(Vec3::new(0.0, offset, 0.0)));
        }
        let projection = mat4_perspective(self.fov, self.aspect, self.near, self.config.far);
        CameraView {
            view,
            view_inv: self.view_inv,
            projection,
            view_proj: mat4_mul(&projection, &view),
            position: mat4_position(&self.view_inv),
            fov: self.fov,
        }
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Advance one frame
    pub fn update(&mut self, level: &Level, owner: &dyn CameraOwner, input: &CameraInput, dt: f32) -> Vec<CameraEvent> {
        let mut events = Vec::new();

        if self.shake > 0.0 {
            self.shake = (self.shake - dt).max(0.0);
        }

        match self.mode {
            CameraMode::Cutscene { timer } => self.update_cutscene(level, owner, timer + dt * CUTSCENE_FPS, &mut events),
            _ => self.update_chase(level, owner, input, dt),
        }

        self.smooth = true;
        events
    }

    fn update_cutscene(&mut self, level: &Level, owner: &dyn CameraOwner, timer: f32, events: &mut Vec<CameraEvent>) {
        self.mode = CameraMode::Cutscene { timer };

        let frames = &level.camera_frames;
        let Some(last) = frames.len().checked_sub(1) else {
            tracing::warn!("cutscene without camera frames");
            self.reset_target();
            return;
        };

        let index_a = (timer as usize).min(last);
        let index_b = (index_a + 1).min(last);
        let t = timer.fract();

        if index_a == last {
            if level.cutscene {
                events.push(CameraEvent::LoadNextLevel);
            } else if owner.is_alive() {
                tracing::debug!("cutscene finished");
                self.mode = CameraMode::Follow;
            }
        }

        if self.first_person {
            self.update_first_person(level, owner);
        } else {
            let (eye, target, fov) = interpolate_frames(&frames[index_a], &frames[index_b], t);
            self.eye.pos = mat4_transform_point(&self.cut_matrix, eye);
            self.target.pos = mat4_transform_point(&self.cut_matrix, target);
            self.fov = fov;
        }

        self.view_inv = mat4_look_at(self.eye.pos, self.target.pos, Vec3::UP);

        if let Some(room) = level.find_room_at(self.eye.pos) {
            self.eye.room = room;
        }
    }

    fn update_chase(&mut self, level: &Level, owner: &dyn CameraOwner, input: &CameraInput, dt: f32) {
        if matches!(self.mode, CameraMode::Follow | CameraMode::Combat) {
            if owner.empty_hands() {
                self.mode = CameraMode::Follow;
                self.speed = self.config.follow_speed;
            } else {
                self.mode = CameraMode::Combat;
                self.speed = self.config.combat_speed;
            }
        }

        self.look_at = self.resolve_look_at(owner);
        self.update_look_offset(owner, input, dt);

        let max_pitch = self.config.max_pitch.to_radians();
        self.target_angle = owner.angle() + self.look_offset;
        self.target_angle.x = self.target_angle.x.clamp(-max_pitch, max_pitch);

        let is_static = matches!(self.mode, CameraMode::Static { .. });
        if self.first_person && !is_static {
            self.update_first_person(level, owner);
            return;
        }

        if let CameraMode::Static { timer, .. } = &mut self.mode {
            if *timer > 0.0 {
                *timer -= dt;
                if *timer <= 0.0 {
                    self.reset_target();
                }
            }
        }

        let tracer = CameraTracer::new(level);
        let to = match self.static_view(level) {
            Some(to) => {
                self.target = match self.look_at {
                    Some(look) => Location::new(look.room, look.position()),
                    None => Location::new(owner.room(), owner.position() + Vec3::new(0.0, -512.0, 0.0)),
                };
                to
            }
            None => self.chase_point(&tracer, owner, dt),
        };

        let t = smoothing_factor(self.smooth, self.speed, dt);
        tracer.settle_eye(&mut self.eye, &self.target, &to, t);

        match self.mode {
            CameraMode::Static { timer, .. } if timer <= 0.0 => self.reset_target(),
            CameraMode::Static { .. } => {}
            _ => self.view_target = None,
        }

        self.view_inv = mat4_look_at(self.eye.pos, self.target.pos, Vec3::UP);
    }

    /// Owner override first, then a visible trigger target inside the cone
    /// in front of the owner. Static views always use the trigger target.
    fn resolve_look_at(&self, owner: &dyn CameraOwner) -> Option<LookTarget> {
        if matches!(self.mode, CameraMode::Static { .. }) {
            return self.view_target;
        }
        if let Some(target) = owner.view_target() {
            return Some(target);
        }
        self.view_target.filter(|target| {
            let to_target = (target.position() - owner.position()).normalize();
            target.visible && to_target.dot(owner.direction()) > self.config.look_at_cone
        })
    }

    /// Manual look input and the recentre countdown
    fn update_look_offset(&mut self, owner: &dyn CameraOwner, input: &CameraInput, dt: f32) {
        let old = self.look_offset;

        if input.pointer_held {
            self.look_offset.x -= input.pointer_delta.y * self.config.pointer_sensitivity;
            self.look_offset.y += input.pointer_delta.x * self.config.pointer_sensitivity;
        }
        self.look_offset.x -= input.stick.y * self.config.stick_rate * dt;
        self.look_offset.y += input.stick.x * self.config.stick_rate * dt;

        if old == self.look_offset {
            if self.recenter_timer > 0.0 {
                self.recenter_timer = (self.recenter_timer - dt).max(0.0);
            }
        } else {
            self.recenter_timer = -self.config.recenter_delay;
        }

        // Countdown only starts once the owner moves off
        if owner.velocity() != 0.0 && self.recenter_timer < 0.0 && !input.pointer_held {
            self.recenter_timer = -self.recenter_timer;
        }

        if self.recenter_timer == 0.0 && self.look_offset != Vec3::ZERO {
            let t = (self.config.recenter_rate * dt).min(1.0);
            self.look_offset.x = lerp(clamp_angle(self.look_offset.x), 0.0, t);
            self.look_offset.y = lerp(clamp_angle(self.look_offset.y), 0.0, t);
        }
    }

    /// Eye goal for the active static view, if any
    fn static_view(&mut self, level: &Level) -> Option<Location> {
        let CameraMode::Static { view_index, .. } = self.mode else {
            return None;
        };
        match level.fixed_views.get(view_index) {
            Some(view) => Some(Location::new(view.room, view.pos)),
            None => {
                tracing::warn!(view_index, "static view does not exist");
                self.reset_target();
                None
            }
        }
    }

    /// Point on the owner the chase camera aims at
    fn view_point(&self, owner: &dyn CameraOwner) -> Vec3 {
        let bounds = owner.bounding_box();
        let center = bounds.center();
        let mut pos = owner.position();

        if self.config.center_view {
            pos.x = center.x;
            pos.z = center.z;
        }

        pos.y = if matches!(self.mode, CameraMode::Static { .. }) {
            center.y
        } else {
            bounds.max.y + (bounds.min.y - bounds.max.y) * 0.75
        };

        if !owner.is_underwater() {
            pos.y -= WALL_MARGIN;
        }
        pos
    }

    /// Eye goal behind the owner, already clipped against the level
    fn chase_point(&mut self, tracer: &CameraTracer, owner: &dyn CameraOwner, dt: f32) -> Location {
        let p = self.view_point(owner);
        self.target.room = owner.room();
        self.target.pos.x = p.x;
        self.target.pos.z = p.z;
        if self.smooth {
            self.target.pos.y += (p.y - self.target.pos.y) * (dt * TARGET_RISE_RATE).min(1.0);
        } else {
            self.target.pos.y = p.y;
        }

        let distance = match self.mode {
            CameraMode::Combat => self.config.combat_offset,
            _ => self.config.follow_offset,
        };
        let offset = distance * self.target_angle.x.cos();
        let dir = Vec3::from_angles(self.target_angle.x, self.target_angle.y) * offset;

        let mut to = Location::new(self.target.room, self.target.pos - dir);
        tracer.trace_clip(offset, &self.target, &mut to);
        to
    }

    fn update_first_person(&mut self, level: &Level, owner: &dyn CameraOwner) {
        let head = owner.head_position();
        let dir = Vec3::from_angles(self.target_angle.x, self.target_angle.y);

        self.eye = Location::new(owner.room(), head);
        self.target = Location::new(owner.room(), head + dir * SECTOR_SIZE);
        self.view_inv = mat4_look_at(head, self.target.pos, Vec3::UP);

        level.resolve_sector(&mut self.eye.room, head);
    }
}

/// Eye, target and fov between two key frames. Frames too far apart are a
/// hard cut, so the first one is used as is.
fn interpolate_frames(a: &CameraKeyframe, b: &CameraKeyframe, t: f32) -> (Vec3, Vec3, f32) {
    let d = a.pos - b.pos;
    if d.x.abs() > CUTSCENE_JUMP || d.y.abs() > CUTSCENE_JUMP || d.z.abs() > CUTSCENE_JUMP {
        (a.pos, a.target, a.fov)
    } else {
        (a.pos.lerp(b.pos, t), a.target.lerp(b.target, t), lerp(a.fov, b.fov, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::world::{create_test_level, Aabb, FixedView};

    struct TestOwner {
        pos: Vec3,
        room: usize,
        angle: Vec3,
        velocity: f32,
        empty_hands: bool,
        alive: bool,
        underwater: bool,
        view_target: Option<LookTarget>,
    }

    impl TestOwner {
        fn at(room: usize, pos: Vec3) -> Self {
            Self {
                pos,
                room,
                angle: Vec3::ZERO,
                velocity: 0.0,
                empty_hands: true,
                alive: true,
                underwater: false,
                view_target: None,
            }
        }
    }

    impl CameraOwner for TestOwner {
        fn position(&self) -> Vec3 {
            self.pos
        }
        fn room(&self) -> usize {
            self.room
        }
        fn bounding_box(&self) -> Aabb {
            Aabb::new(self.pos + Vec3::new(-200.0, -762.0, -200.0), self.pos + Vec3::new(200.0, 0.0, 200.0))
        }
        fn velocity(&self) -> f32 {
            self.velocity
        }
        fn angle(&self) -> Vec3 {
            self.angle
        }
        fn view_target(&self) -> Option<LookTarget> {
            self.view_target
        }
        fn empty_hands(&self) -> bool {
            self.empty_hands
        }
        fn is_alive(&self) -> bool {
            self.alive
        }
        fn is_underwater(&self) -> bool {
            self.underwater
        }
        fn head_position(&self) -> Vec3 {
            self.pos + Vec3::new(0.0, -700.0, 0.0)
        }
    }

    const DT: f32 = 1.0 / 30.0;

    fn owner_in_room0() -> TestOwner {
        TestOwner::at(0, Vec3::new(2560.0, 0.0, 3584.0))
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).len() < 1e-2
    }

    #[test]
    fn test_follow_places_eye_behind_owner() {
        let level = create_test_level();
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);

        let events = camera.update(&level, &owner, &CameraInput::default(), DT);
        assert!(events.is_empty());
        assert_eq!(camera.mode(), CameraMode::Follow);

        let eye = camera.eye();
        assert_eq!(eye.room, 0);
        assert!(approx(eye.pos, Vec3::new(2560.0, -827.5, 2048.0)), "eye at {:?}", eye.pos);
        assert!(approx(camera.target().pos, Vec3::new(2560.0, -827.5, 3584.0)));
    }

    #[test]
    fn test_drawn_weapons_switch_to_combat() {
        let level = create_test_level();
        let mut owner = owner_in_room0();
        owner.empty_hands = false;
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.update(&level, &owner, &CameraInput::default(), DT);
        assert_eq!(camera.mode(), CameraMode::Combat);

        owner.empty_hands = true;
        camera.update(&level, &owner, &CameraInput::default(), DT);
        assert_eq!(camera.mode(), CameraMode::Follow);
    }

    #[test]
    fn test_eye_never_leaves_room_box() {
        let level = create_test_level();
        let mut owner = TestOwner::at(0, Vec3::new(1536.0, 0.0, 1536.0));
        owner.empty_hands = false;
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        for i in 0..8 {
            owner.angle.y = i as f32 * PI / 4.0;
            camera.update(&level, &owner, &CameraInput::default(), DT);
            let eye = camera.eye().pos;
            assert!(eye.x > 1024.0 && eye.x < 4096.0, "eye {:?}", eye);
            assert!(eye.z > 1024.0 && eye.z < 4096.0, "eye {:?}", eye);
            assert!(eye.y <= -WALL_MARGIN && eye.y >= -2048.0 + WALL_MARGIN);
        }
    }

    #[test]
    fn test_static_view_expires() {
        let mut level = create_test_level();
        level.fixed_views.push(FixedView { room: 0, pos: Vec3::new(1536.0, -1536.0, 1536.0) });
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);

        camera.set_view(0, 0.5, 0.0);
        camera.update(&level, &owner, &CameraInput::default(), 0.25);
        assert_eq!(camera.mode(), CameraMode::Static { view_index: 0, timer: 0.25 });
        assert!(approx(camera.eye().pos, Vec3::new(1536.0, -1536.0, 1536.0)));
        assert!(approx(camera.target().pos, Vec3::new(2560.0, -512.0, 3584.0)));

        camera.update(&level, &owner, &CameraInput::default(), 0.25);
        assert_eq!(camera.mode(), CameraMode::Follow);
        assert_eq!(camera.last_view_index(), Some(0));
    }

    #[test]
    fn test_missing_static_view_falls_back_to_follow() {
        let level = create_test_level();
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.set_view(7, 2.0, 1.0);
        camera.update(&level, &owner, &CameraInput::default(), DT);
        assert_eq!(camera.mode(), CameraMode::Follow);
    }

    fn cutscene_level(cutscene_only: bool) -> Level {
        let mut level = create_test_level();
        level.cutscene = cutscene_only;
        let frame = |x: f32| CameraKeyframe {
            target: Vec3::new(x, -1024.0, 3584.0),
            pos: Vec3::new(x, -1024.0, 1536.0),
            fov: 60.0,
        };
        level.camera_frames = vec![frame(1536.0), frame(1800.0), frame(2048.0)];
        level
    }

    #[test]
    fn test_cutscene_plays_and_returns_to_follow() {
        let level = cutscene_level(false);
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.start_cutscene(Vec3::ZERO, 0.0);

        let events = camera.update(&level, &owner, &CameraInput::default(), 1.5 / 30.0);
        assert!(events.is_empty());
        assert!(matches!(camera.mode(), CameraMode::Cutscene { .. }));
        assert!(approx(camera.eye().pos, Vec3::new(1924.0, -1024.0, 1536.0)));
        assert_eq!(camera.view().fov, 60.0);

        camera.update(&level, &owner, &CameraInput::default(), 1.0 / 30.0);
        assert_eq!(camera.mode(), CameraMode::Follow);
    }

    #[test]
    fn test_cutscene_level_requests_next_level() {
        let level = cutscene_level(true);
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        assert!(matches!(camera.mode(), CameraMode::Cutscene { .. }));

        let events = camera.update(&level, &owner, &CameraInput::default(), 3.0 / 30.0);
        assert_eq!(events, vec![CameraEvent::LoadNextLevel]);
        assert!(matches!(camera.mode(), CameraMode::Cutscene { .. }));
    }

    #[test]
    fn test_cutscene_dead_owner_stays_in_cutscene() {
        let level = cutscene_level(false);
        let mut owner = owner_in_room0();
        owner.alive = false;
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.start_cutscene(Vec3::ZERO, 0.0);
        camera.update(&level, &owner, &CameraInput::default(), 3.0 / 30.0);
        assert!(matches!(camera.mode(), CameraMode::Cutscene { .. }));
    }

    #[test]
    fn test_cutscene_jump_cuts_instead_of_panning() {
        let mut level = cutscene_level(false);
        level.camera_frames[1].pos = Vec3::new(7000.0, -1024.0, 2560.0);
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.start_cutscene(Vec3::ZERO, 0.0);
        camera.update(&level, &owner, &CameraInput::default(), 0.5 / 30.0);
        assert!(approx(camera.eye().pos, level.camera_frames[0].pos));
    }

    #[test]
    fn test_cutscene_tracks_eye_room() {
        let mut level = cutscene_level(false);
        for frame in &mut level.camera_frames {
            frame.pos = Vec3::new(7000.0, -1024.0, 2560.0);
        }
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.start_cutscene(Vec3::ZERO, 0.0);
        camera.update(&level, &owner, &CameraInput::default(), DT);
        assert_eq!(camera.eye().room, 1);
    }

    #[test]
    fn test_cutscene_origin_and_rotation_applied() {
        let level = cutscene_level(false);
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.start_cutscene(Vec3::new(100.0, 0.0, 0.0), PI);
        camera.update(&level, &owner, &CameraInput::default(), 0.0);
        // Half turn about Y negates x and z before the shift
        assert!(approx(camera.eye().pos, Vec3::new(100.0 - 1536.0, -1024.0, -1536.0)));
    }

    #[test]
    fn test_recenter_after_owner_moves() {
        let level = create_test_level();
        let mut owner = owner_in_room0();
        owner.velocity = 20.0;
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);

        let steer = CameraInput { stick: Vec2::new(1.0, 0.0), ..CameraInput::default() };
        camera.update(&level, &owner, &steer, 0.1);
        assert!((camera.look_offset().y - 0.2).abs() < 1e-5);

        for _ in 0..15 {
            camera.update(&level, &owner, &CameraInput::default(), 0.1);
        }
        assert_eq!(camera.look_offset(), Vec3::ZERO);
    }

    #[test]
    fn test_no_recenter_while_pointer_held() {
        let level = create_test_level();
        let mut owner = owner_in_room0();
        owner.velocity = 20.0;
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);

        let drag = CameraInput { pointer_delta: Vec2::new(30.0, 0.0), pointer_held: true, ..CameraInput::default() };
        camera.update(&level, &owner, &drag, 0.1);
        let held = CameraInput { pointer_held: true, ..CameraInput::default() };
        for _ in 0..15 {
            camera.update(&level, &owner, &held, 0.1);
        }
        assert!((camera.look_offset().y - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_pitch_clamped() {
        let level = create_test_level();
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        let drag = CameraInput { pointer_delta: Vec2::new(0.0, -1000.0), pointer_held: true, ..CameraInput::default() };
        camera.update(&level, &owner, &drag, DT);
        assert!((camera.target_angle().x - 85f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn test_look_at_cone() {
        let level = create_test_level();
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);

        let ahead = LookTarget::new(0, Aabb::new(Vec3::new(2460.0, -200.0, 3900.0), Vec3::new(2660.0, 0.0, 4000.0)));
        camera.set_view_target(Some(ahead));
        camera.update(&level, &owner, &CameraInput::default(), DT);
        assert_eq!(camera.look_at(), Some(ahead));
        // Trigger targets last one frame
        camera.update(&level, &owner, &CameraInput::default(), DT);
        assert_eq!(camera.look_at(), None);

        let behind = LookTarget::new(0, Aabb::new(Vec3::new(2460.0, -200.0, 1500.0), Vec3::new(2660.0, 0.0, 1600.0)));
        camera.set_view_target(Some(behind));
        camera.update(&level, &owner, &CameraInput::default(), DT);
        assert_eq!(camera.look_at(), None);
    }

    #[test]
    fn test_owner_view_target_wins() {
        let level = create_test_level();
        let mut owner = owner_in_room0();
        let own = LookTarget::new(0, Aabb::new(Vec3::new(1100.0, -200.0, 1100.0), Vec3::new(1200.0, 0.0, 1200.0)));
        owner.view_target = Some(own);
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.update(&level, &owner, &CameraInput::default(), DT);
        assert_eq!(camera.look_at(), Some(own));
    }

    #[test]
    fn test_first_person_uses_head() {
        let level = create_test_level();
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.set_first_person(true);
        camera.update(&level, &owner, &CameraInput::default(), DT);

        assert!(camera.is_first_person());
        assert_eq!(camera.eye().pos, owner.head_position());
        let view = camera.view();
        assert_eq!(view.fov, 90.0);
        assert!(approx(view.position, owner.head_position()));

        camera.set_first_person(false);
        assert_eq!(camera.view().fov, 65.0);
    }

    #[test]
    fn test_shake_decays_and_offsets_view() {
        let level = create_test_level();
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.update(&level, &owner, &CameraInput::default(), DT);
        let steady = camera.view();

        camera.shake(0.55);
        let shaken = camera.view();
        assert!((shaken.view[1][3] - steady.view[1][3]).abs() > 1.0);

        camera.update(&level, &owner, &CameraInput::default(), 0.5);
        camera.update(&level, &owner, &CameraInput::default(), 0.5);
        assert_eq!(camera.shake_intensity(), 0.0);
    }

    #[test]
    fn test_audio_outputs() {
        let mut level = create_test_level();
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.update(&level, &owner, &CameraInput::default(), DT);

        assert!(!camera.is_underwater(&level));
        assert!(approx(camera.room_size(&level), Vec3::new(5.0, 2.0, 5.0) * SECTOR_METRES));

        level.set_flipped(true);
        assert!(camera.is_underwater(&level));
        assert_eq!(camera.room(&level), 3);
    }

    #[test]
    fn test_set_aspect_scales_horizontal_projection() {
        let level = create_test_level();
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.update(&level, &owner, &CameraInput::default(), DT);

        camera.set_aspect(1.0);
        let square = camera.view().projection;
        camera.set_aspect(2.0);
        let wide = camera.view().projection;
        assert!((wide[0][0] * 2.0 - square[0][0]).abs() < 1e-5);
        assert_eq!(wide[1][1], square[1][1]);
    }

    #[test]
    fn test_view_proj_projects_target_to_centre() {
        let level = create_test_level();
        let owner = owner_in_room0();
        let mut camera = CameraController::new(CameraConfig::default(), &level, &owner);
        camera.update(&level, &owner, &CameraInput::default(), DT);

        let view = camera.view();
        let clip = crate::math::mat4_transform_vec4(&view.view_proj, crate::math::Vec4::from_point(camera.target().pos));
        assert!(clip.w > 0.0);
        assert!((clip.x / clip.w).abs() < 1e-3);
        assert!((clip.y / clip.w).abs() < 1e-3);
    }
}
