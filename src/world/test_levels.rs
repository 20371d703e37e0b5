//! Built-in levels for tests, demos and the CLI
//!
//! Adjacent rooms overlap by two sector columns, as in TR1 data: the wall
//! ring of one room lies over the first interior column of its neighbour,
//! and the doorway cells in each ring hand over to the other room through
//! floor-data portals.

use crate::math::Vec3;
use super::{Level, NavBox, Room, Sector, SECTOR_SIZE};

/// Floor height of the test level's ground rooms
pub const TEST_FLOOR: f32 = 0.0;
/// Ceiling height of the test level's ground rooms
pub const TEST_CEILING: f32 = -2048.0;

/// A walled room with an open interior of `width - 2` by `depth - 2` sectors
pub fn create_box_room(origin: Vec3, width: usize, depth: usize, floor: f32, ceiling: f32, box_index: usize) -> Room {
    let mut room = Room::new(0, origin, width, depth);
    room.fill_interior(floor, ceiling, box_index);
    room
}

/// Navigation box covering a room's interior
fn interior_box(origin: Vec3, width: usize, depth: usize, floor: f32) -> NavBox {
    NavBox::new(
        origin.x + SECTOR_SIZE,
        origin.x + (width - 1) as f32 * SECTOR_SIZE,
        origin.z + SECTOR_SIZE,
        origin.z + (depth - 1) as f32 * SECTOR_SIZE,
        floor,
    )
}

/// Rectangular portal quad on a constant-X plane, room-relative
fn portal_x(x: f32, z0: f32, z1: f32, top: f32, bottom: f32) -> [Vec3; 4] {
    [
        Vec3::new(x, top, z0),
        Vec3::new(x, top, z1),
        Vec3::new(x, bottom, z1),
        Vec3::new(x, bottom, z0),
    ]
}

/// Horizontal portal quad on a constant-Y plane, room-relative
fn portal_y(y: f32, x0: f32, x1: f32, z0: f32, z1: f32) -> [Vec3; 4] {
    [
        Vec3::new(x0, y, z0),
        Vec3::new(x1, y, z0),
        Vec3::new(x1, y, z1),
        Vec3::new(x0, y, z1),
    ]
}

/// Create an empty level with a single 3x3 walled room
pub fn create_empty_level() -> Level {
    let mut level = Level::new();
    let origin = Vec3::ZERO;
    let b = level.add_box(interior_box(origin, 3, 3, TEST_FLOOR));
    level.add_room(create_box_room(origin, 3, 3, TEST_FLOOR, TEST_CEILING, b));
    level
}

/// Four rooms exercising every lookup the camera and visibility code use:
///
/// * room 0: 5x5 ground room at the origin, doorway east at z row 2
/// * room 1: 5x5 ground room east of room 0; its first interior column is a
///   blockable door box and cell (2, 2) opens up into room 2
/// * room 2: upper room stacked over room 1
/// * room 3: flooded alternate of room 0, active while the level is flipped
pub fn create_test_level() -> Level {
    let mut level = Level::new();

    let origin0 = Vec3::ZERO;
    let origin1 = Vec3::new(3.0 * SECTOR_SIZE, 0.0, 0.0);

    let box0 = level.add_box(interior_box(origin0, 5, 5, TEST_FLOOR));
    let mut door = NavBox::new(
        origin1.x + SECTOR_SIZE,
        origin1.x + 2.0 * SECTOR_SIZE,
        SECTOR_SIZE,
        4.0 * SECTOR_SIZE,
        TEST_FLOOR,
    );
    door.blockable = true;
    let door = level.add_box(door);
    let box1 = level.add_box(NavBox::new(
        origin1.x + 2.0 * SECTOR_SIZE,
        origin1.x + 4.0 * SECTOR_SIZE,
        SECTOR_SIZE,
        4.0 * SECTOR_SIZE,
        TEST_FLOOR,
    ));
    let box2 = level.add_box(interior_box(origin1, 5, 5, TEST_CEILING));

    // Room 0 and its flooded twin share geometry
    let build_room0 = |water: bool| {
        let mut room = create_box_room(origin0, 5, 5, TEST_FLOOR, TEST_CEILING, box0);
        room.set_sector(4, 2, Sector::portal_to(1));
        room.add_portal(
            1,
            portal_x(4.0 * SECTOR_SIZE, 2.0 * SECTOR_SIZE, 3.0 * SECTOR_SIZE, TEST_CEILING, TEST_FLOOR),
            Vec3::new(-1.0, 0.0, 0.0),
        );
        room.water = water;
        room
    };

    let mut room0 = build_room0(false);
    let room3 = build_room0(true);

    let mut room1 = create_box_room(origin1, 5, 5, TEST_FLOOR, TEST_CEILING, box1);
    for z in 1..4 {
        room1.set_sector(1, z, Sector::open(TEST_FLOOR, TEST_CEILING, door));
    }
    room1.set_sector(0, 2, Sector::portal_to(0));
    room1.set_sector(2, 2, Sector::open(TEST_FLOOR, TEST_CEILING, box1).with_room_above(2));
    room1.add_portal(
        0,
        portal_x(SECTOR_SIZE, 2.0 * SECTOR_SIZE, 3.0 * SECTOR_SIZE, TEST_CEILING, TEST_FLOOR),
        Vec3::new(1.0, 0.0, 0.0),
    );
    room1.add_portal(
        2,
        portal_y(TEST_CEILING, 2.0 * SECTOR_SIZE, 3.0 * SECTOR_SIZE, 2.0 * SECTOR_SIZE, 3.0 * SECTOR_SIZE),
        Vec3::new(0.0, 1.0, 0.0),
    );

    let mut room2 = create_box_room(origin1, 5, 5, TEST_CEILING, 2.0 * TEST_CEILING, box2);
    room2.set_sector(2, 2, Sector::open(TEST_CEILING, 2.0 * TEST_CEILING, box2).with_room_below(1));
    room2.add_portal(
        1,
        portal_y(TEST_CEILING, 2.0 * SECTOR_SIZE, 3.0 * SECTOR_SIZE, 2.0 * SECTOR_SIZE, 3.0 * SECTOR_SIZE),
        Vec3::new(0.0, -1.0, 0.0),
    );

    room0.alternate_room = Some(3);

    level.add_room(room0);
    level.add_room(room1);
    level.add_room(room2);
    level.add_room(room3);
    level
}
