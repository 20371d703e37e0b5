//! Camera collision tracer
//!
//! Walks the eye line sector by sector and pulls the camera back out of
//! walls, floors and ceilings. Everything here works on the sector grid:
//! probes sit one unit inside the far edge of each cell so they never land
//! exactly on a boundary.

use crate::math::{sign, Vec3};
use crate::world::{BoxSide, Level, Location, NavBox, Sector, CLICK, SECTOR_SIZE};

/// Distance kept between the camera and any wall, floor or ceiling
pub const WALL_MARGIN: f32 = CLICK;

/// Deltas shorter than this along an axis are not traced on that axis
const TRACE_EPSILON: f32 = 1e-4;

/// Below this squared distance a box corner counts as reached (256 units)
const CORNER_RADIUS_SQ: f32 = 256.0 * 256.0;

/// Outcome of tracing the eye line along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisTrace {
    /// Ran into a blocked sector; `to` is the blocked probe point
    Blocked,
    /// Stopped in front of a blocked neighbour; `to` is the last open probe
    Clamped,
    /// Reached the destination
    Clear,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Z,
}

impl Axis {
    fn get(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Z => v.z,
        }
    }

    fn set(self, v: &mut Vec3, value: f32) {
        match self {
            Axis::X => v.x = value,
            Axis::Z => v.z = value,
        }
    }

    fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::new(1.0, 0.0, 0.0),
            Axis::Z => Vec3::new(0.0, 0.0, 1.0),
        }
    }
}

/// Box edges for `clip_slide`, already oriented: `x0` is the edge the camera
/// crossed, `z0` the edge on the camera's side of the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideBox {
    pub x0: f32,
    pub x1: f32,
    pub z0: f32,
    pub z1: f32,
}

/// Interpolation factor for moving the eye toward its goal this frame
pub fn smoothing_factor(smooth: bool, speed: f32, dt: f32) -> f32 {
    if smooth && speed > 0.0 {
        (30.0 / speed * dt).min(1.0)
    } else {
        1.0
    }
}

/// Slide the camera along the box edge it crossed so it stays roughly
/// `offset` away from the target. Returns the new (x, z) in the oriented
/// frame of `b`.
///
/// Takes the point on `x0` at distance `offset` from the target when one
/// exists, otherwise snaps to a corner.
pub fn clip_slide(offset: f32, target_x: f32, target_z: f32, b: &SlideBox) -> (f32, f32) {
    let sq_min_z = (target_z - b.z0) * (target_z - b.z0);
    let sq_max_z = (target_z - b.z1) * (target_z - b.z1);
    let sq_min_x = (target_x - b.x0) * (target_x - b.x0);
    let offset_sq = offset * offset;

    let h = sq_min_x + sq_min_z;
    if h > CORNER_RADIUS_SQ {
        let z = if offset_sq > h || offset_sq < sq_min_x {
            b.z0
        } else {
            target_z + (offset_sq - sq_min_x).sqrt() * sign(b.z0 - b.z1)
        };
        return (b.x0, z);
    }

    let h = sq_min_x + sq_max_z;
    if h > CORNER_RADIUS_SQ {
        let z = if offset_sq > h || offset_sq < sq_min_x {
            b.z1
        } else {
            target_z - (offset_sq - sq_min_x).sqrt() * sign(b.z0 - b.z1)
        };
        return (b.x0, z);
    }

    // Target hugs the crossed edge: slide along z0 instead
    let h = sq_min_z;
    let x = if offset_sq > h || offset_sq < sq_min_z {
        b.x1
    } else {
        target_x - (offset_sq - sq_min_z).sqrt() * sign(b.x0 - b.x1)
    };
    (x, b.z0)
}

/// Read-only collision queries against one level
pub struct CameraTracer<'a> {
    level: &'a Level,
}

impl<'a> CameraTracer<'a> {
    pub fn new(level: &'a Level) -> Self {
        Self { level }
    }

    /// Trace the eye line from `from` to `to`, clamping `to` at the first
    /// obstruction. Returns true when the whole line is clear.
    ///
    /// The axis with the larger delta goes first (X on ties). If that axis
    /// stops in front of a wall the other one is not traced at all. The skip
    /// is on `AxisTrace::Clamped` only; `Blocked` still traces the second axis.
    pub fn trace(&self, from: &Location, to: &mut Location) -> bool {
        let dx = (to.pos.x - from.pos.x).abs();
        let dz = (to.pos.z - from.pos.z).abs();

        let (rx, rz) = if dx < dz {
            let rz = self.trace_z(from, to);
            if rz == AxisTrace::Clamped {
                return false;
            }
            (self.trace_x(from, to), rz)
        } else {
            let rx = self.trace_x(from, to);
            if rx == AxisTrace::Clamped {
                return false;
            }
            (rx, self.trace_z(from, to))
        };

        let sector = self.level.resolve_sector(&mut to.room, to.pos).clone();
        self.clip_height(from, to, &sector) && rx == AxisTrace::Clear && rz == AxisTrace::Clear
    }

    pub fn trace_x(&self, from: &Location, to: &mut Location) -> AxisTrace {
        self.trace_axis(Axis::X, from, to)
    }

    pub fn trace_z(&self, from: &Location, to: &mut Location) -> AxisTrace {
        self.trace_axis(Axis::Z, from, to)
    }

    /// Step along `axis` one sector at a time, probing the last unit of each
    /// cell and the first unit of the next.
    fn trace_axis(&self, axis: Axis, from: &Location, to: &mut Location) -> AxisTrace {
        let delta = to.pos - from.pos;
        let along = axis.get(delta);
        if along.abs() < TRACE_EPSILON {
            return AxisTrace::Clear;
        }

        // One step covers a full sector along the axis
        let step = delta * (SECTOR_SIZE / along);

        let start = axis.get(from.pos);
        let mut edge = (start / SECTOR_SIZE).floor() * SECTOR_SIZE;
        if along > 0.0 {
            edge += SECTOR_SIZE - 1.0;
        }

        let mut p = from.pos + step * ((edge - start) / SECTOR_SIZE);
        axis.set(&mut p, edge);

        let s = sign(along);
        let step = step * s;
        let end = axis.get(to.pos);
        let nudge = axis.unit() * s;

        let mut room = from.room;
        while (axis.get(p) - end) * s < 0.0 {
            if self.level.is_blocked(&mut room, p) {
                to.pos = p;
                to.room = room;
                return AxisTrace::Blocked;
            }

            to.room = room;
            if self.level.is_blocked(&mut room, p + nudge) {
                to.pos = p;
                return AxisTrace::Clamped;
            }

            p += step;
        }

        to.room = room;
        AxisTrace::Clear
    }

    /// Clamp `to` onto the floor or ceiling plane the segment crosses.
    /// Returns true when the segment stays between them.
    pub fn clip_height(&self, from: &Location, to: &mut Location, sector: &Sector) -> bool {
        let dir = to.pos - from.pos;

        let mut y = sector.floor_at(to.pos);
        if to.pos.y <= y || from.pos.y >= y {
            y = sector.ceiling_at(to.pos);
            if to.pos.y >= y || from.pos.y <= y {
                return true;
            }
        }

        debug_assert!(dir.y != 0.0, "height clip with a level segment");
        if dir.y == 0.0 {
            to.pos.y = y;
            return false;
        }

        let d = (y - from.pos.y) / dir.y;
        to.pos = Vec3::new(from.pos.x + dir.x * d, y, from.pos.z + dir.z * d);
        false
    }

    /// Fit `nav_box` to the cell around `pos`: sides facing a blocked
    /// neighbour shrink to the cell border, open sides take in the
    /// neighbour's box.
    pub fn clip_box(&self, room: usize, pos: Vec3, nav_box: &mut NavBox) {
        let cell_x = (pos.x / SECTOR_SIZE).floor() * SECTOR_SIZE;
        let cell_z = (pos.z / SECTOR_SIZE).floor() * SECTOR_SIZE;

        let border = NavBox::new(
            cell_x - 1.0,
            cell_x + SECTOR_SIZE,
            cell_z - 1.0,
            cell_z + SECTOR_SIZE,
            nav_box.floor,
        );

        for side in BoxSide::ALL {
            let edge = border.side(side);
            let mut p = pos;
            if side.is_x() {
                p.x = edge;
            } else {
                p.z = edge;
            }

            let mut probe_room = room;
            if self.level.is_blocked(&mut probe_room, p) {
                *nav_box.side_mut(side) = edge;
                continue;
            }

            let neighbour = self.level.sector_at(room, p.x, p.z);
            if let Some(other) = self.level.sector_box(neighbour) {
                let current = nav_box.side(side);
                let other = other.side(side);
                *nav_box.side_mut(side) = if side.is_max() { current.max(other) } else { current.min(other) };
            }
        }
    }

    /// Trace from `target` toward `to`, then keep `to` inside the navigation
    /// box around it, sliding along the crossed edge to hold `offset`.
    pub fn trace_clip(&self, offset: f32, target: &Location, to: &mut Location) {
        self.trace(target, to);

        let mut target_room = target.room;
        let owner_box = self
            .level
            .resolve_sector(&mut target_room, target.pos)
            .box_index
            .and_then(|i| self.level.boxes.get(i))
            .copied();
        let camera_box = self
            .level
            .resolve_sector(&mut to.room, to.pos)
            .box_index
            .and_then(|i| self.level.boxes.get(i))
            .copied();

        let mut b = match (camera_box, owner_box) {
            (Some(cam), Some(own)) if !own.contains(to.pos.x, to.pos.z) => cam,
            (_, Some(own)) => own,
            (Some(cam), None) => cam,
            (None, None) => {
                tracing::trace!(room = to.room, "no navigation box around camera");
                return;
            }
        };

        self.clip_box(to.room, to.pos, &mut b);
        b.expand(-WALL_MARGIN);

        // Work in a frame where the crossed edge is constant-x
        let swapped = to.pos.z < b.min_z || to.pos.z > b.max_z;
        let (to_x, to_z, target_x, target_z, mut slide) = if swapped {
            (to.pos.z, to.pos.x, target.pos.z, target.pos.x, SlideBox { x0: b.min_z, x1: b.max_z, z0: b.min_x, z1: b.max_x })
        } else {
            (to.pos.x, to.pos.z, target.pos.x, target.pos.z, SlideBox { x0: b.min_x, x1: b.max_x, z0: b.min_z, z1: b.max_z })
        };

        if to_x >= slide.x0 && to_x <= slide.x1 {
            return;
        }

        if to_x > slide.x1 {
            std::mem::swap(&mut slide.x0, &mut slide.x1);
        }
        if to_z > target_z {
            std::mem::swap(&mut slide.z0, &mut slide.z1);
        }

        let (x, z) = clip_slide(offset, target_x, target_z, &slide);
        if swapped {
            to.pos.z = x;
            to.pos.x = z;
        } else {
            to.pos.x = x;
            to.pos.z = z;
        }

        self.level.resolve_sector(&mut to.room, to.pos);
    }

    /// Move `eye` a fraction `t` of the way to `to`, then keep it at least
    /// `WALL_MARGIN` below the ceiling and above the floor. When the gap is
    /// narrower than that the eye sits halfway between the two.
    pub fn settle_eye(&self, eye: &mut Location, target: &Location, to: &Location, t: f32) {
        eye.pos = eye.pos.lerp(to.pos, t);
        eye.room = to.room;

        let mut floor = self.level.resolve_sector(&mut eye.room, eye.pos).floor_at(eye.pos) - WALL_MARGIN;

        if to.pos.y >= floor && eye.pos.y >= floor {
            self.trace(target, eye);
            floor = self.level.resolve_sector(&mut eye.room, eye.pos).floor_at(eye.pos) - WALL_MARGIN;
        }

        let mut ceiling = self.level.resolve_sector(&mut eye.room, eye.pos).ceiling_at(eye.pos) + WALL_MARGIN;
        if floor < ceiling {
            floor = (floor + ceiling) * 0.5;
            ceiling = floor;
        }

        eye.pos.y = eye.pos.y.min(floor).max(ceiling);

        self.level.resolve_sector(&mut eye.room, eye.pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{create_empty_level, create_test_level};

    fn loc(room: usize, x: f32, y: f32, z: f32) -> Location {
        Location::new(room, Vec3::new(x, y, z))
    }

    #[test]
    fn test_smoothing_factor() {
        assert_eq!(smoothing_factor(false, 12.0, 0.1), 1.0);
        assert_eq!(smoothing_factor(true, 0.0, 0.1), 1.0);
        assert!((smoothing_factor(true, 12.0, 1.0 / 30.0) - 1.0 / 12.0).abs() < 1e-6);
        assert_eq!(smoothing_factor(true, 12.0, 10.0), 1.0);
    }

    #[test]
    fn test_trace_clear_inside_room() {
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        let from = loc(0, 1536.0, -1024.0, 1536.0);
        let mut to = loc(0, 3500.0, -1024.0, 2500.0);
        assert!(tracer.trace(&from, &mut to));
        assert_eq!(to.room, 0);
        assert_eq!(to.pos, Vec3::new(3500.0, -1024.0, 2500.0));
    }

    #[test]
    fn test_trace_clamps_at_wall() {
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        let from = loc(0, 1536.0, -1024.0, 1536.0);
        let mut to = loc(0, 5000.0, -1024.0, 1536.0);
        assert!(!tracer.trace(&from, &mut to));
        assert!((to.pos.x - 4096.0).abs() <= 1.0);
        assert_eq!(to.pos.z, 1536.0);
        assert_eq!(to.room, 0);
    }

    #[test]
    fn test_trace_follows_doorway_into_next_room() {
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        let from = loc(0, 2560.0, -1024.0, 2560.0);
        let mut to = loc(0, 6656.0, -1024.0, 2560.0);
        assert!(tracer.trace(&from, &mut to));
        assert_eq!(to.room, 1);
    }

    #[test]
    fn test_trace_stops_at_closed_door() {
        let mut level = create_test_level();
        assert!(level.set_box_blocked(1, true));
        let tracer = CameraTracer::new(&level);
        let from = loc(0, 2560.0, -1024.0, 2560.0);
        let mut to = loc(0, 6656.0, -1024.0, 2560.0);
        assert!(!tracer.trace(&from, &mut to));
        assert!((to.pos.x - 4096.0).abs() <= 1.0);
    }

    #[test]
    fn test_trace_flipped_leaves_target_unchanged() {
        let mut level = create_test_level();
        level.set_flipped(true);
        let tracer = CameraTracer::new(&level);
        let from = loc(0, 1536.0, -1024.0, 1536.0);
        let before = loc(0, 1800.0, -1024.0, 1700.0);
        let mut to = before;
        assert!(tracer.trace(&from, &mut to));
        assert_eq!(to, before);
    }

    #[test]
    fn test_settle_eye_flipped_keeps_base_room() {
        let mut level = create_test_level();
        level.set_flipped(true);
        let target = loc(0, 1536.0, -1024.0, 1536.0);
        let to = loc(0, 2560.0, -1024.0, 2560.0);
        let mut eye = to;
        CameraTracer::new(&level).settle_eye(&mut eye, &target, &to, 1.0);
        assert_eq!(eye.room, 0);
        assert!(level.is_underwater(eye.room));

        level.set_flipped(false);
        assert!(!level.is_underwater(eye.room));
    }

    #[test]
    fn test_trace_stays_local() {
        // Every clamp lands on the segment between the endpoints
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        let from = loc(0, 2560.0, -1024.0, 2560.0);
        for (x, z) in [(500.0, 2560.0), (2560.0, 300.0), (-800.0, -900.0), (4800.0, 4700.0)] {
            let mut to = loc(0, x, -1024.0, z);
            tracer.trace(&from, &mut to);
            let min_x = from.pos.x.min(x) - 1.0;
            let max_x = from.pos.x.max(x) + 1.0;
            let min_z = from.pos.z.min(z) - 1.0;
            let max_z = from.pos.z.max(z) + 1.0;
            assert!(to.pos.x >= min_x && to.pos.x <= max_x, "x {} out of segment", to.pos.x);
            assert!(to.pos.z >= min_z && to.pos.z <= max_z, "z {} out of segment", to.pos.z);
        }
    }

    #[test]
    fn test_clip_height_floor() {
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        let from = loc(0, 2048.0, -1024.0, 2560.0);
        let mut to = loc(0, 3072.0, 1024.0, 2560.0);
        let sector = level.sector_at(0, to.pos.x, to.pos.z).clone();
        assert!(!tracer.clip_height(&from, &mut to, &sector));
        assert_eq!(to.pos.y, 0.0);
        assert!((to.pos.x - 2560.0).abs() < 1e-3);
    }

    #[test]
    fn test_clip_height_ceiling() {
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        let from = loc(0, 2048.0, -1024.0, 2560.0);
        let mut to = loc(0, 2048.0, -3072.0, 3584.0);
        let sector = level.sector_at(0, to.pos.x, to.pos.z).clone();
        assert!(!tracer.clip_height(&from, &mut to, &sector));
        assert_eq!(to.pos.y, -2048.0);
        assert!((to.pos.z - 3072.0).abs() < 1e-3);
    }

    #[test]
    fn test_clip_height_inside_gap() {
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        let from = loc(0, 2048.0, -1024.0, 2560.0);
        let mut to = loc(0, 2560.0, -1500.0, 2560.0);
        let sector = level.sector_at(0, to.pos.x, to.pos.z).clone();
        assert!(tracer.clip_height(&from, &mut to, &sector));
        assert_eq!(to.pos.y, -1500.0);
    }

    #[test]
    fn test_clip_box_open_cell_keeps_box() {
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        let mut b = level.boxes[0];
        tracer.clip_box(0, Vec3::new(2560.0, -1024.0, 2560.0), &mut b);
        assert_eq!(b, level.boxes[0]);
    }

    #[test]
    fn test_clip_box_wall_shrinks_to_cell_border() {
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        let mut b = level.boxes[0];
        tracer.clip_box(0, Vec3::new(1536.0, -1024.0, 2560.0), &mut b);
        assert_eq!(b.min_x, 1023.0);
        assert_eq!(b.max_x, 4096.0);
    }

    #[test]
    fn test_clip_box_contains_probe_position() {
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        for ix in 0..12 {
            for iz in 0..12 {
                let pos = Vec3::new(1100.0 + ix as f32 * 250.0, -1024.0, 1100.0 + iz as f32 * 250.0);
                let mut b = level.boxes[0];
                tracer.clip_box(0, pos, &mut b);
                assert!(b.contains(pos.x, pos.z), "box {:?} misses {:?}", b, pos);
            }
        }
    }

    #[test]
    fn test_clip_slide_stays_on_long_edge() {
        let slide = SlideBox { x0: 1000.0, x1: 3000.0, z0: 0.0, z1: 2000.0 };
        let (x, z) = clip_slide(800.0, 1500.0, 1000.0, &slide);
        assert_eq!(x, 1000.0);
        assert!(z > slide.z0 && z < slide.z1);
        let dist = ((x - 1500.0).powi(2) + (z - 1000.0).powi(2)).sqrt();
        assert!((dist - 800.0).abs() < 1e-2);
    }

    #[test]
    fn test_clip_slide_corner_when_offset_too_long() {
        let slide = SlideBox { x0: 1000.0, x1: 3000.0, z0: 0.0, z1: 2000.0 };
        let (x, z) = clip_slide(5000.0, 1500.0, 1000.0, &slide);
        assert_eq!((x, z), (1000.0, 0.0));
    }

    #[test]
    fn test_trace_clip_slides_along_wall() {
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        let target = loc(0, 2560.0, -1024.0, 2560.0);
        let mut to = loc(0, 500.0, -1024.0, 2560.0);
        tracer.trace_clip(1536.0, &target, &mut to);

        assert_eq!(to.pos.x, 1024.0 - 1.0 + WALL_MARGIN);
        assert!(to.pos.z > 1280.0 && to.pos.z < 2560.0);
        let dx = to.pos.x - target.pos.x;
        let dz = to.pos.z - target.pos.z;
        assert!(((dx * dx + dz * dz).sqrt() - 1536.0).abs() < 1e-1);
        assert_eq!(to.room, 0);
    }

    #[test]
    fn test_trace_clip_leaves_free_camera_alone() {
        let level = create_test_level();
        let tracer = CameraTracer::new(&level);
        let target = loc(0, 2560.0, -1024.0, 2560.0);
        let mut to = loc(0, 2560.0, -1024.0, 1536.0);
        tracer.trace_clip(1024.0, &target, &mut to);
        assert_eq!(to.pos, Vec3::new(2560.0, -1024.0, 1536.0));
    }

    #[test]
    fn test_settle_eye_keeps_margin() {
        let level = create_empty_level();
        let tracer = CameraTracer::new(&level);
        let target = loc(0, 1536.0, -1024.0, 1536.0);
        let to = loc(0, 1536.0, -100.0, 1536.0);
        let mut eye = to;
        tracer.settle_eye(&mut eye, &target, &to, 1.0);
        assert_eq!(eye.pos.y, -WALL_MARGIN);

        let to = loc(0, 1536.0, -2000.0, 1536.0);
        let mut eye = to;
        tracer.settle_eye(&mut eye, &target, &to, 1.0);
        assert_eq!(eye.pos.y, -2048.0 + WALL_MARGIN);
    }

    #[test]
    fn test_settle_eye_low_gap_uses_midpoint() {
        let mut level = create_empty_level();
        assert!(level.set_floor_height(0, 1, 1, -1024.0));
        assert!(level.set_ceiling_height(0, 1, 1, -1280.0));
        let tracer = CameraTracer::new(&level);

        let target = loc(0, 1536.0, -1100.0, 1536.0);
        let to = target;
        let mut eye = target;
        tracer.settle_eye(&mut eye, &target, &to, 1.0);
        assert_eq!(eye.pos.y, -1152.0);
    }

    #[test]
    fn test_settle_eye_smoothing_moves_part_way() {
        let level = create_empty_level();
        let tracer = CameraTracer::new(&level);
        let target = loc(0, 1536.0, -1024.0, 1536.0);
        let to = loc(0, 1536.0, -1024.0, 1900.0);
        let mut eye = loc(0, 1536.0, -1024.0, 1100.0);
        tracer.settle_eye(&mut eye, &target, &to, 0.5);
        assert!((eye.pos.z - 1500.0).abs() < 1e-3);
    }
}
