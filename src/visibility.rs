//! Portal-based room visibility
//!
//! Depth-first walk from the camera's room through portal adjacency. Each
//! portal that survives back-face culling is projected to the screen and its
//! bounding rectangle is intersected with the rectangle inherited from the
//! parent portal; the walk only continues through portals with a non-empty
//! intersection.
//!
//! Portal graphs can loop back on themselves. Termination comes from two
//! rules: a room is reported at most once per call, and recursion stops
//! past `MAX_PORTAL_DEPTH`. A room reached again through another portal is
//! still expanded (its portals may be visible through the new opening), it
//! just isn't reported twice.

use crate::math::{mat4_transform_vec4, Mat4, Vec3, Vec4};
use crate::world::{Level, Portal, Room};

/// Deepest portal nesting that is still expanded
pub const MAX_PORTAL_DEPTH: usize = 16;

/// Screen-space rectangle in normalized device coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl ClipRect {
    /// The whole viewport
    pub const FULL: ClipRect = ClipRect { min_x: -1.0, min_y: -1.0, max_x: 1.0, max_y: 1.0 };

    /// Inverted rectangle, the identity for `extend`
    pub const EMPTY: ClipRect = ClipRect {
        min_x: f32::INFINITY,
        min_y: f32::INFINITY,
        max_x: f32::NEG_INFINITY,
        max_y: f32::NEG_INFINITY,
    };

    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Grow to include a point
    pub fn extend(&mut self, x: f32, y: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn is_degenerate(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn overlaps(&self, other: &ClipRect) -> bool {
        !(self.min_x > other.max_x
            || self.min_y > other.max_y
            || self.max_x < other.min_x
            || self.max_y < other.min_y)
    }

    pub fn intersect(&self, other: &ClipRect) -> ClipRect {
        ClipRect {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        }
    }
}

/// Camera data the traversal needs
#[derive(Debug, Clone, Copy)]
pub struct PortalView {
    /// Eye position in world space
    pub position: Vec3,
    /// Projection * view
    pub view_proj: Mat4,
}

/// Visibility crossed between a water room and a dry room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterCrossing {
    pub from: usize,
    pub to: usize,
}

/// Receives water/dry boundary crossings as the traversal finds them
pub trait WaterCrossingListener {
    fn on_crossing(&mut self, crossing: WaterCrossing);
}

impl<F: FnMut(WaterCrossing)> WaterCrossingListener for F {
    fn on_crossing(&mut self, crossing: WaterCrossing) {
        self(crossing)
    }
}

/// Result of one visibility pass
#[derive(Debug, Clone, Default)]
pub struct VisibleRooms {
    /// Visible rooms in discovery order, each at most once
    pub rooms: Vec<usize>,
    /// Clip rectangle each room was first reached through (parallel to `rooms`)
    pub clip_rects: Vec<ClipRect>,
    /// Water/dry boundaries crossed on the way
    pub crossings: Vec<WaterCrossing>,
    /// Deepest portal nesting actually expanded
    pub max_depth: usize,
    /// Some path was cut off by the depth cap
    pub truncated: bool,
}

impl VisibleRooms {
    pub fn contains(&self, room: usize) -> bool {
        self.rooms.contains(&room)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Rooms with the clip rectangle they were first seen through
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ClipRect)> {
        self.rooms.iter().copied().zip(self.clip_rects.iter())
    }
}

/// Screen rectangle of `portal` as seen through `viewport`, or None when the
/// portal is back-facing, fully behind the near plane, or off the viewport.
///
/// When only some corners are behind the near plane the rectangle is widened
/// to the screen edge on every side a crossing edge heads toward. This is a
/// deliberate over-estimate; rooms behind such portals must not be dropped.
pub fn check_portal(room: &Room, portal: &Portal, view: &PortalView, viewport: &ClipRect) -> Option<ClipRect> {
    let to_viewer = view.position - (room.origin + portal.vertices[0]);
    if portal.normal.dot(to_viewer) <= 0.0 {
        return None;
    }

    let mut clip = ClipRect::EMPTY;
    let mut behind = 0;
    let mut p = [Vec4::default(); 4];

    for (i, v) in portal.vertices.iter().enumerate() {
        p[i] = mat4_transform_vec4(&view.view_proj, Vec4::from_point(room.origin + *v));

        if p[i].w > 0.0 {
            let inv_w = 1.0 / p[i].w;
            p[i].x *= inv_w;
            p[i].y *= inv_w;
            p[i].z *= inv_w;
            clip.extend(p[i].x, p[i].y);
        } else {
            behind += 1;
        }
    }

    if behind == 4 {
        return None;
    }

    if behind > 0 {
        for i in 0..4 {
            let a = p[i];
            let b = p[(i + 1) % 4];

            if (a.w > 0.0) == (b.w > 0.0) {
                continue;
            }

            if a.x < 0.0 && b.x < 0.0 {
                clip.min_x = -1.0;
            } else if a.x > 0.0 && b.x > 0.0 {
                clip.max_x = 1.0;
            } else {
                clip.min_x = -1.0;
                clip.max_x = 1.0;
            }

            if a.y < 0.0 && b.y < 0.0 {
                clip.min_y = -1.0;
            } else if a.y > 0.0 && b.y > 0.0 {
                clip.max_y = 1.0;
            } else {
                clip.min_y = -1.0;
                clip.max_y = 1.0;
            }
        }
    }

    if clip.is_degenerate() || !clip.overlaps(viewport) {
        return None;
    }

    Some(clip.intersect(viewport))
}

/// Per-call traversal state. The visited set lives here, never on the rooms.
struct Traversal<'a, 'l> {
    level: &'a Level,
    view: &'a PortalView,
    visited: Vec<bool>,
    out: VisibleRooms,
    listener: Option<&'l mut dyn WaterCrossingListener>,
}

impl Traversal<'_, '_> {
    fn visit(&mut self, from: Option<usize>, to: usize, viewport: ClipRect, depth: usize) {
        if depth > MAX_PORTAL_DEPTH {
            tracing::trace!(room = to, depth, "portal depth cap reached");
            self.out.truncated = true;
            return;
        }
        self.out.max_depth = self.out.max_depth.max(depth);

        let level = self.level;
        let to = level.effective_room(to);
        let room = &level.rooms[to];

        if !self.visited[to] {
            if let Some(from) = from {
                if level.rooms[from].water != room.water {
                    let crossing = WaterCrossing { from, to };
                    self.out.crossings.push(crossing);
                    if let Some(listener) = self.listener.as_deref_mut() {
                        listener.on_crossing(crossing);
                    }
                }
            }

            self.visited[to] = true;
            self.out.rooms.push(to);
            self.out.clip_rects.push(viewport);
        }

        for portal in &room.portals {
            if from == Some(portal.target_room) {
                continue;
            }
            if let Some(clip) = check_portal(room, portal, self.view, &viewport) {
                self.visit(Some(to), portal.target_room, clip, depth + 1);
            }
        }
    }
}

/// Rooms visible from `start_room` through the portal graph
pub fn compute_visible_rooms(level: &Level, start_room: usize, view: &PortalView) -> VisibleRooms {
    run(level, start_room, view, None)
}

/// Same as `compute_visible_rooms`, also reporting water crossings to
/// `listener` as they are found
pub fn compute_visible_rooms_with(
    level: &Level,
    start_room: usize,
    view: &PortalView,
    listener: &mut dyn WaterCrossingListener,
) -> VisibleRooms {
    run(level, start_room, view, Some(listener))
}

fn run(
    level: &Level,
    start_room: usize,
    view: &PortalView,
    listener: Option<&mut dyn WaterCrossingListener>,
) -> VisibleRooms {
    let mut traversal = Traversal {
        level,
        view,
        visited: vec![false; level.rooms.len()],
        out: VisibleRooms::default(),
        listener,
    };
    traversal.visit(None, start_room, ClipRect::FULL, 0);

    tracing::trace!(
        start_room,
        visible = traversal.out.rooms.len(),
        depth = traversal.out.max_depth,
        "visible rooms computed"
    );
    traversal.out
}
