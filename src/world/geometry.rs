//! Core spatial types for TR1-style levels
//!
//! Rooms contain a 2D grid of sectors. Each sector carries floor and ceiling
//! planes, links to the rooms stacked above and below it, an optional
//! floor-data portal to a horizontally adjacent room, and the navigation box
//! it belongs to. World Y grows downward: floors are numerically larger than
//! the ceilings above them.

use serde::{Serialize, Deserialize};
use crate::math::Vec3;

/// Sector size in world units
pub const SECTOR_SIZE: f32 = 1024.0;

/// One "click" of height (quarter sector)
pub const CLICK: f32 = 256.0;

/// Height reported for a missing floor or ceiling.
///
/// Any point is above this floor and below this ceiling at once, so a sector
/// without planes behaves as solid wall.
pub const WALL_HEIGHT: f32 = -127.0 * 256.0;

/// Floor or ceiling of a sector, with per-corner heights for slopes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorPlane {
    /// Absolute world Y at corners [NW, NE, SE, SW]
    /// NW = (-X, -Z), NE = (+X, -Z), SE = (+X, +Z), SW = (-X, +Z)
    pub heights: [f32; 4],
}

impl SectorPlane {
    /// Create a flat plane at the given height
    pub fn flat(height: f32) -> Self {
        Self { heights: [height; 4] }
    }

    /// Create a sloped plane with per-corner heights
    pub fn sloped(heights: [f32; 4]) -> Self {
        Self { heights }
    }

    pub fn is_flat(&self) -> bool {
        let h = self.heights[0];
        self.heights.iter().all(|&x| (x - h).abs() < 0.001)
    }

    /// Interpolate height at a normalized position inside the sector.
    ///
    /// `u` runs West (0) to East (1), `v` runs North (0) to South (1). The
    /// quad is split along the NW-SE diagonal so slopes stay planar per
    /// triangle.
    pub fn interpolate_height(&self, u: f32, v: f32) -> f32 {
        if self.is_flat() {
            return self.heights[0];
        }

        let [nw, ne, se, sw] = self.heights;
        let u = u.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);

        if u >= v {
            // Triangle NW, NE, SE
            nw + (ne - nw) * u + (se - ne) * v
        } else {
            // Triangle NW, SE, SW
            nw + (sw - nw) * v + (se - sw) * u
        }
    }
}

/// A single sector in the room grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    /// Floor plane (None = no floor, solid)
    #[serde(default)]
    pub floor: Option<SectorPlane>,
    /// Ceiling plane (None = no ceiling, solid)
    #[serde(default)]
    pub ceiling: Option<SectorPlane>,
    /// Room stacked above this sector's ceiling
    #[serde(default)]
    pub room_above: Option<usize>,
    /// Room stacked below this sector's floor
    #[serde(default)]
    pub room_below: Option<usize>,
    /// Floor-data portal: the room that actually owns this cell
    #[serde(default)]
    pub portal_room: Option<usize>,
    /// Navigation box this sector belongs to (None = not walkable)
    #[serde(default)]
    pub box_index: Option<usize>,
}

impl Sector {
    /// Solid wall sector (no planes, no box)
    pub fn wall() -> Self {
        Self::default()
    }

    /// Open sector between a floor and a ceiling
    pub fn open(floor: f32, ceiling: f32, box_index: usize) -> Self {
        Self {
            floor: Some(SectorPlane::flat(floor)),
            ceiling: Some(SectorPlane::flat(ceiling)),
            box_index: Some(box_index),
            ..Default::default()
        }
    }

    /// Wall cell whose floor data points into a neighbouring room
    pub fn portal_to(room: usize) -> Self {
        Self {
            portal_room: Some(room),
            ..Default::default()
        }
    }

    pub fn with_room_above(mut self, room: usize) -> Self {
        self.room_above = Some(room);
        self
    }

    pub fn with_room_below(mut self, room: usize) -> Self {
        self.room_below = Some(room);
        self
    }

    pub fn is_wall(&self) -> bool {
        self.floor.is_none() && self.ceiling.is_none()
    }

    /// Floor height under a world position, or `WALL_HEIGHT` without a floor.
    /// Room origins are grid aligned, so the in-cell offset comes straight
    /// from the world coordinates.
    pub fn floor_at(&self, pos: Vec3) -> f32 {
        match &self.floor {
            Some(plane) => {
                let (u, v) = cell_uv(pos);
                plane.interpolate_height(u, v)
            }
            None => WALL_HEIGHT,
        }
    }

    /// Ceiling height above a world position, or `WALL_HEIGHT` without one
    pub fn ceiling_at(&self, pos: Vec3) -> f32 {
        match &self.ceiling {
            Some(plane) => {
                let (u, v) = cell_uv(pos);
                plane.interpolate_height(u, v)
            }
            None => WALL_HEIGHT,
        }
    }
}

/// Normalized position inside the containing grid cell
fn cell_uv(pos: Vec3) -> (f32, f32) {
    (
        pos.x.rem_euclid(SECTOR_SIZE) / SECTOR_SIZE,
        pos.z.rem_euclid(SECTOR_SIZE) / SECTOR_SIZE,
    )
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Get center of the box
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }
}

/// Side of a navigation box, used to address its four edges uniformly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxSide {
    MinZ,
    MaxZ,
    MinX,
    MaxX,
}

impl BoxSide {
    pub const ALL: [BoxSide; 4] = [BoxSide::MinZ, BoxSide::MaxZ, BoxSide::MinX, BoxSide::MaxX];

    /// Edges on the X axis (constant X along the edge)
    pub fn is_x(self) -> bool {
        matches!(self, BoxSide::MinX | BoxSide::MaxX)
    }

    pub fn is_max(self) -> bool {
        matches!(self, BoxSide::MaxZ | BoxSide::MaxX)
    }
}

/// Coarse navigation rectangle in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavBox {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
    /// Floor height shared by the box (world Y)
    pub floor: f32,
    /// Index into the overlap list used by path-finding
    #[serde(default)]
    pub overlap_index: u16,
    /// Can a door close this box off
    #[serde(default)]
    pub blockable: bool,
    /// Currently closed off by a door
    #[serde(default)]
    pub blocked: bool,
}

impl NavBox {
    pub fn new(min_x: f32, max_x: f32, min_z: f32, max_z: f32, floor: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
            floor,
            overlap_index: 0,
            blockable: false,
            blocked: false,
        }
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// Grow (positive) or shrink (negative) every side by `amount`
    pub fn expand(&mut self, amount: f32) {
        self.min_x -= amount;
        self.min_z -= amount;
        self.max_x += amount;
        self.max_z += amount;
    }

    pub fn side(&self, side: BoxSide) -> f32 {
        match side {
            BoxSide::MinZ => self.min_z,
            BoxSide::MaxZ => self.max_z,
            BoxSide::MinX => self.min_x,
            BoxSide::MaxX => self.max_x,
        }
    }

    pub fn side_mut(&mut self, side: BoxSide) -> &mut f32 {
        match side {
            BoxSide::MinZ => &mut self.min_z,
            BoxSide::MaxZ => &mut self.max_z,
            BoxSide::MinX => &mut self.min_x,
            BoxSide::MaxX => &mut self.max_x,
        }
    }

    /// Navigation may pass through this box
    pub fn is_open(&self) -> bool {
        !(self.blockable && self.blocked)
    }
}

/// Portal connecting two rooms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    /// Target room index
    pub target_room: usize,
    /// Portal corners relative to the owning room's origin, wound in order
    pub vertices: [Vec3; 4],
    /// Portal facing direction (points back into the owning room)
    pub normal: Vec3,
}

impl Portal {
    pub fn new(target_room: usize, vertices: [Vec3; 4], normal: Vec3) -> Self {
        Self {
            target_room,
            vertices,
            normal: normal.normalize(),
        }
    }
}

/// A room in the level - contains a 2D grid of sectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier (matches its index in `Level::rooms`)
    pub id: usize,
    /// World offset of the sector grid corner. Portal vertices are relative
    /// to it; sector heights are absolute.
    pub origin: Vec3,
    /// Grid width (number of sectors in X direction)
    pub width: usize,
    /// Grid depth (number of sectors in Z direction)
    pub depth: usize,
    /// 2D array of sectors [x][z]
    pub sectors: Vec<Vec<Sector>>,
    /// Portals to adjacent rooms
    #[serde(default)]
    pub portals: Vec<Portal>,
    /// Room is filled with water
    #[serde(default)]
    pub water: bool,
    /// Room swapped in while the level is flipped
    #[serde(default)]
    pub alternate_room: Option<usize>,
    /// Highest ceiling (world Y)
    #[serde(default)]
    pub y_top: f32,
    /// Lowest floor (world Y)
    #[serde(default)]
    pub y_bottom: f32,
}

impl Room {
    /// Create a new room with every sector solid
    pub fn new(id: usize, origin: Vec3, width: usize, depth: usize) -> Self {
        let sectors = (0..width)
            .map(|_| (0..depth).map(|_| Sector::wall()).collect())
            .collect();

        Self {
            id,
            origin,
            width,
            depth,
            sectors,
            portals: Vec::new(),
            water: false,
            alternate_room: None,
            y_top: 0.0,
            y_bottom: 0.0,
        }
    }

    /// Get mutable sector at grid position
    pub fn get_sector_mut(&mut self, x: usize, z: usize) -> Option<&mut Sector> {
        self.sectors.get_mut(x)?.get_mut(z)
    }

    /// Set sector at grid position
    pub fn set_sector(&mut self, x: usize, z: usize, sector: Sector) {
        if let Some(slot) = self.get_sector_mut(x, z) {
            *slot = sector;
        }
    }

    /// Fill every sector strictly inside the outer ring, leaving the border
    /// as walls
    pub fn fill_interior(&mut self, floor: f32, ceiling: f32, box_index: usize) {
        for x in 1..self.width.saturating_sub(1) {
            for z in 1..self.depth.saturating_sub(1) {
                self.sectors[x][z] = Sector::open(floor, ceiling, box_index);
            }
        }
        self.recalculate_bounds();
    }

    /// Recompute `y_top` / `y_bottom` from the sector planes (call after
    /// editing sectors)
    pub fn recalculate_bounds(&mut self) {
        let mut top = f32::MAX;
        let mut bottom = f32::MIN;
        for (_, _, sector) in self.iter_sectors() {
            if let Some(ceiling) = &sector.ceiling {
                top = ceiling.heights.iter().fold(top, |a, &h| a.min(h));
            }
            if let Some(floor) = &sector.floor {
                bottom = floor.heights.iter().fold(bottom, |a, &h| a.max(h));
            }
        }
        if top <= bottom {
            self.y_top = top;
            self.y_bottom = bottom;
        }
    }

    /// Add a portal to another room
    pub fn add_portal(&mut self, target_room: usize, vertices: [Vec3; 4], normal: Vec3) {
        self.portals.push(Portal::new(target_room, vertices, normal));
    }

    /// Grid cell containing a world position, clamped into the room
    pub fn grid_clamped(&self, world_x: f32, world_z: f32) -> (usize, usize) {
        let sx = ((world_x - self.origin.x) / SECTOR_SIZE).floor();
        let sz = ((world_z - self.origin.z) / SECTOR_SIZE).floor();
        let sx = sx.clamp(0.0, self.width.saturating_sub(1) as f32) as usize;
        let sz = sz.clamp(0.0, self.depth.saturating_sub(1) as f32) as usize;
        (sx, sz)
    }

    /// Inside the room's horizontal footprint (border walls included) and
    /// between its top and bottom
    pub fn contains_point(&self, point: Vec3) -> bool {
        let min_x = self.origin.x;
        let min_z = self.origin.z;
        let max_x = min_x + self.width as f32 * SECTOR_SIZE;
        let max_z = min_z + self.depth as f32 * SECTOR_SIZE;
        point.x >= min_x && point.x < max_x
            && point.z >= min_z && point.z < max_z
            && point.y >= self.y_top && point.y <= self.y_bottom
    }

    pub fn iter_sectors(&self) -> impl Iterator<Item = (usize, usize, &Sector)> {
        self.sectors.iter().enumerate().flat_map(|(x, col)| {
            col.iter().enumerate().map(move |(z, s)| (x, z, s))
        })
    }
}

/// A (room, position) pair, the unit the tracer reasons in
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Location {
    pub room: usize,
    pub pos: Vec3,
}

impl Location {
    pub fn new(room: usize, pos: Vec3) -> Self {
        Self { room, pos }
    }
}

/// Fixed camera placed by the level designer, selected by triggers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedView {
    pub room: usize,
    pub pos: Vec3,
}

/// Cutscene key frame (sampled at 30 fps)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraKeyframe {
    pub target: Vec3,
    pub pos: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
}

/// The entire level: rooms, navigation boxes and camera data, addressed by
/// index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub boxes: Vec<NavBox>,
    /// Trigger-selectable fixed cameras
    #[serde(default)]
    pub fixed_views: Vec<FixedView>,
    /// Cutscene camera track
    #[serde(default)]
    pub camera_frames: Vec<CameraKeyframe>,
    /// Alternate rooms are active
    #[serde(default)]
    pub flipped: bool,
    /// Level consists of a single cutscene and loads the next level at its end
    #[serde(default)]
    pub cutscene: bool,
}

impl Level {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a room and return its index
    pub fn add_room(&mut self, mut room: Room) -> usize {
        let id = self.rooms.len();
        room.id = id;
        self.rooms.push(room);
        id
    }

    /// Add a navigation box and return its index
    pub fn add_box(&mut self, nav_box: NavBox) -> usize {
        self.boxes.push(nav_box);
        self.boxes.len() - 1
    }

    /// Upper bound on room hops for floor-data and vertical chains
    fn hop_limit(&self) -> usize {
        self.rooms.len() + 1
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Room actually in use for `room` given the flip state
    pub fn effective_room(&self, room: usize) -> usize {
        if self.flipped {
            if let Some(alt) = self.rooms[room].alternate_room {
                return alt;
            }
        }
        room
    }

    /// Sector under a world position in the effective room, clamped to the grid
    pub fn sector_at(&self, room: usize, x: f32, z: f32) -> &Sector {
        let room = &self.rooms[self.effective_room(room)];
        let (sx, sz) = room.grid_clamped(x, z);
        &room.sectors[sx][sz]
    }

    /// Sector that really contains `pos`, starting the search in `room`.
    ///
    /// Follows floor-data portals horizontally, then the rooms stacked above
    /// and below. `room` is updated only when one of those links moves to
    /// another room; flip substitution stays inside the lookup, so `room`
    /// always holds an unflipped index. Chains longer than the room count
    /// are cut off.
    pub fn resolve_sector(&self, room: &mut usize, pos: Vec3) -> &Sector {
        let limit = self.hop_limit();
        let mut hops = 0;

        let mut sector = self.sector_at(*room, pos.x, pos.z);

        while let Some(next) = sector.portal_room {
            if hops >= limit {
                tracing::warn!(room = *room, "floor-data portal chain does not terminate");
                break;
            }
            hops += 1;
            *room = next;
            sector = self.sector_at(*room, pos.x, pos.z);
        }

        while let Some(above) = sector.room_above {
            if hops >= limit || pos.y >= sector.ceiling_at(pos) {
                break;
            }
            hops += 1;
            *room = above;
            sector = self.sector_at(*room, pos.x, pos.z);
        }

        while let Some(below) = sector.room_below {
            if hops >= limit || pos.y < sector.floor_at(pos) {
                break;
            }
            hops += 1;
            *room = below;
            sector = self.sector_at(*room, pos.x, pos.z);
        }

        sector
    }

    /// Navigation box of a sector, if it has a valid one
    pub fn sector_box(&self, sector: &Sector) -> Option<&NavBox> {
        sector.box_index.and_then(|i| self.boxes.get(i))
    }

    /// Can the camera not occupy `pos`?
    ///
    /// Resolves the sector first (updating `room`), then reports a wall when
    /// the sector has no usable box or `pos` is outside its floor/ceiling gap.
    pub fn is_blocked(&self, room: &mut usize, pos: Vec3) -> bool {
        let sector = self.resolve_sector(room, pos);
        let open_box = self.sector_box(sector).map_or(false, NavBox::is_open);
        !open_box || pos.y >= sector.floor_at(pos) || pos.y <= sector.ceiling_at(pos)
    }

    /// Find which room contains a point (linear search)
    pub fn find_room_at(&self, point: Vec3) -> Option<usize> {
        self.rooms.iter().position(|room| room.contains_point(point))
    }

    /// Room dimensions in sectors (width, height, depth), for reverb sizing
    pub fn room_extent(&self, room: usize) -> Vec3 {
        let r = &self.rooms[self.effective_room(room)];
        let height = ((r.y_bottom - r.y_top) / SECTOR_SIZE).trunc();
        Vec3::new(r.width as f32, height, r.depth as f32)
    }

    pub fn is_underwater(&self, room: usize) -> bool {
        self.rooms[self.effective_room(room)].water
    }

    // ========================================================================
    // Trigger mutations (applied before the camera and visibility passes)
    // ========================================================================

    /// Make a sector floor flat at `height`. Returns false for bad indices.
    pub fn set_floor_height(&mut self, room: usize, x: usize, z: usize, height: f32) -> bool {
        match self.rooms.get_mut(room).and_then(|r| r.get_sector_mut(x, z)) {
            Some(sector) => {
                tracing::debug!(room, x, z, height, "floor height changed");
                sector.floor = Some(SectorPlane::flat(height));
                true
            }
            None => false,
        }
    }

    /// Make a sector ceiling flat at `height`. Returns false for bad indices.
    pub fn set_ceiling_height(&mut self, room: usize, x: usize, z: usize, height: f32) -> bool {
        match self.rooms.get_mut(room).and_then(|r| r.get_sector_mut(x, z)) {
            Some(sector) => {
                tracing::debug!(room, x, z, height, "ceiling height changed");
                sector.ceiling = Some(SectorPlane::flat(height));
                true
            }
            None => false,
        }
    }

    /// Open or close a blockable box. Returns false if the box does not
    /// exist or cannot be blocked.
    pub fn set_box_blocked(&mut self, index: usize, blocked: bool) -> bool {
        match self.boxes.get_mut(index) {
            Some(b) if b.blockable => {
                tracing::debug!(index, blocked, "box block state changed");
                b.blocked = blocked;
                true
            }
            _ => false,
        }
    }

    pub fn set_flipped(&mut self, flipped: bool) {
        if self.flipped != flipped {
            tracing::debug!(flipped, "level flip state changed");
        }
        self.flipped = flipped;
    }

    pub fn toggle_flip(&mut self) {
        self.set_flipped(!self.flipped);
    }
}
