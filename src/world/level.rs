//! Scene loading, saving and validation
//!
//! Uses RON (Rusty Object Notation) for human-readable scene files.
//! Supports both compressed (brotli) and uncompressed RON files.
//! - Reading: Auto-detects format by checking for valid RON start
//! - Writing: Always uses brotli compression
//!
//! Every load path runs `validate_level`, so the hot-path lookups can index
//! rooms, sectors and boxes directly.

use std::fs;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use super::{Level, Room, Sector, SectorPlane, SECTOR_SIZE};

/// Validation limits to prevent resource exhaustion from malicious files
pub mod limits {
    /// Maximum number of rooms in a level
    pub const MAX_ROOMS: usize = 256;
    /// Maximum grid dimension (width or depth) for a room
    pub const MAX_ROOM_SIZE: usize = 128;
    /// Maximum number of navigation boxes
    pub const MAX_BOXES: usize = 4096;
    /// Maximum coordinate value (prevents overflow issues)
    pub const MAX_COORD: f32 = 1_000_000.0;
}

/// Error type for scene loading and validation
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Check if a float is valid (not NaN or Inf)
fn is_valid_float(f: f32) -> bool {
    f.is_finite() && f.abs() <= limits::MAX_COORD
}

fn check_room_ref(index: usize, total_rooms: usize, context: &str, what: &str) -> Result<(), String> {
    if index >= total_rooms {
        return Err(format!("{}: invalid {} {} (only {} rooms)", context, what, index, total_rooms));
    }
    Ok(())
}

fn validate_plane(plane: &SectorPlane, context: &str) -> Result<(), String> {
    for (i, h) in plane.heights.iter().enumerate() {
        if !is_valid_float(*h) {
            return Err(format!("{}: invalid height[{}] = {}", context, i, h));
        }
    }
    Ok(())
}

/// Validate a sector's planes and references
fn validate_sector(sector: &Sector, context: &str, level: &Level) -> Result<(), String> {
    if let Some(floor) = &sector.floor {
        validate_plane(floor, &format!("{} floor", context))?;
    }
    if let Some(ceiling) = &sector.ceiling {
        validate_plane(ceiling, &format!("{} ceiling", context))?;
    }

    // Y grows downward: a floor may never be above its ceiling
    if let (Some(floor), Some(ceiling)) = (&sector.floor, &sector.ceiling) {
        for i in 0..4 {
            if floor.heights[i] < ceiling.heights[i] {
                return Err(format!("{}: floor {} above ceiling {} at corner {}",
                    context, floor.heights[i], ceiling.heights[i], i));
            }
        }
    }

    let total = level.rooms.len();
    if let Some(r) = sector.room_above {
        check_room_ref(r, total, context, "room_above")?;
    }
    if let Some(r) = sector.room_below {
        check_room_ref(r, total, context, "room_below")?;
    }
    if let Some(r) = sector.portal_room {
        check_room_ref(r, total, context, "portal_room")?;
    }
    if let Some(b) = sector.box_index {
        if b >= level.boxes.len() {
            return Err(format!("{}: invalid box_index {} (only {} boxes)", context, b, level.boxes.len()));
        }
    }

    Ok(())
}

/// Validate a room
fn validate_room(room: &Room, room_idx: usize, level: &Level) -> Result<(), String> {
    let context = format!("room[{}]", room_idx);
    let total_rooms = level.rooms.len();

    if room.width == 0 || room.depth == 0 {
        return Err(format!("{}: empty grid ({}x{})", context, room.width, room.depth));
    }
    if room.width > limits::MAX_ROOM_SIZE {
        return Err(format!("{}: width too large ({} > {})",
            context, room.width, limits::MAX_ROOM_SIZE));
    }
    if room.depth > limits::MAX_ROOM_SIZE {
        return Err(format!("{}: depth too large ({} > {})",
            context, room.depth, limits::MAX_ROOM_SIZE));
    }

    if !is_valid_float(room.origin.x) || !is_valid_float(room.origin.y) || !is_valid_float(room.origin.z) {
        return Err(format!("{}: invalid origin ({}, {}, {})",
            context, room.origin.x, room.origin.y, room.origin.z));
    }
    if room.origin.x % SECTOR_SIZE != 0.0 || room.origin.z % SECTOR_SIZE != 0.0 {
        return Err(format!("{}: origin ({}, {}) not aligned to the {} unit grid",
            context, room.origin.x, room.origin.z, SECTOR_SIZE));
    }

    // Check sectors array matches dimensions
    if room.sectors.len() != room.width {
        return Err(format!("{}: sectors array width mismatch ({} != {})",
            context, room.sectors.len(), room.width));
    }
    for (x, col) in room.sectors.iter().enumerate() {
        if col.len() != room.depth {
            return Err(format!("{}: sectors[{}] depth mismatch ({} != {})",
                context, x, col.len(), room.depth));
        }
    }

    if let Some(alt) = room.alternate_room {
        check_room_ref(alt, total_rooms, &context, "alternate_room")?;
        if alt == room_idx {
            return Err(format!("{}: room is its own alternate", context));
        }
    }

    for (i, portal) in room.portals.iter().enumerate() {
        let portal_ctx = format!("{} portal[{}]", context, i);
        check_room_ref(portal.target_room, total_rooms, &portal_ctx, "target_room")?;
        for (j, v) in portal.vertices.iter().enumerate() {
            if !is_valid_float(v.x) || !is_valid_float(v.y) || !is_valid_float(v.z) {
                return Err(format!("{} vertex[{}]: invalid coordinates ({}, {}, {})",
                    portal_ctx, j, v.x, v.y, v.z));
            }
        }
        let n = portal.normal;
        if !is_valid_float(n.x) || !is_valid_float(n.y) || !is_valid_float(n.z) || n.len2() == 0.0 {
            return Err(format!("{}: invalid normal", portal_ctx));
        }
    }

    for (x, z, sector) in room.iter_sectors() {
        validate_sector(sector, &format!("{} sector[{},{}]", context, x, z), level)?;
    }

    Ok(())
}

/// Reject room-to-room cycles along one vertical direction
fn check_vertical_chain<F>(level: &Level, link: F, what: &str) -> Result<(), String>
where
    F: Fn(&Sector) -> Option<usize>,
{
    // Room graph: an edge for every distinct room a sector links to
    let edges: Vec<Vec<usize>> = level.rooms.iter()
        .map(|room| {
            let mut targets: Vec<usize> = room.iter_sectors().filter_map(|(_, _, s)| link(s)).collect();
            targets.sort_unstable();
            targets.dedup();
            targets
        })
        .collect();

    // 0 = unvisited, 1 = on stack, 2 = done
    let mut state = vec![0u8; edges.len()];
    for start in 0..edges.len() {
        if state[start] != 0 {
            continue;
        }
        let mut stack = vec![(start, 0usize)];
        state[start] = 1;
        while let Some((node, next)) = stack.pop() {
            if let Some(&target) = edges[node].get(next) {
                stack.push((node, next + 1));
                match state[target] {
                    0 => {
                        state[target] = 1;
                        stack.push((target, 0));
                    }
                    1 => return Err(format!("{} chain loops back to room {}", what, target)),
                    _ => {}
                }
            } else {
                state[node] = 2;
            }
        }
    }
    Ok(())
}

/// Validate an entire level
pub fn validate_level(level: &Level) -> Result<(), LevelError> {
    if level.rooms.len() > limits::MAX_ROOMS {
        return Err(LevelError::Validation(format!(
            "too many rooms ({} > {})", level.rooms.len(), limits::MAX_ROOMS
        )));
    }
    if level.boxes.len() > limits::MAX_BOXES {
        return Err(LevelError::Validation(format!(
            "too many boxes ({} > {})", level.boxes.len(), limits::MAX_BOXES
        )));
    }

    for (i, b) in level.boxes.iter().enumerate() {
        let sides = [b.min_x, b.max_x, b.min_z, b.max_z, b.floor];
        if sides.iter().any(|&v| !is_valid_float(v)) {
            return Err(LevelError::Validation(format!("box[{}]: invalid coordinates", i)));
        }
        if b.min_x > b.max_x || b.min_z > b.max_z {
            return Err(LevelError::Validation(format!("box[{}]: inverted extents", i)));
        }
    }

    for (i, room) in level.rooms.iter().enumerate() {
        validate_room(room, i, level).map_err(LevelError::Validation)?;
    }

    check_vertical_chain(level, |s| s.room_above, "room_above").map_err(LevelError::Validation)?;
    check_vertical_chain(level, |s| s.room_below, "room_below").map_err(LevelError::Validation)?;

    for (i, view) in level.fixed_views.iter().enumerate() {
        check_room_ref(view.room, level.rooms.len(), &format!("fixed_view[{}]", i), "room")
            .map_err(LevelError::Validation)?;
    }
    for (i, frame) in level.camera_frames.iter().enumerate() {
        let values = [frame.pos.x, frame.pos.y, frame.pos.z, frame.target.x, frame.target.y, frame.target.z, frame.fov];
        if values.iter().any(|&v| !is_valid_float(v)) {
            return Err(LevelError::Validation(format!("camera_frame[{}]: invalid values", i)));
        }
    }

    Ok(())
}

/// Decode raw file bytes into RON text, decompressing when needed
fn decode_contents(bytes: &[u8]) -> Result<String, LevelError> {
    // Detect format: RON files start with '(' or whitespace, brotli is binary
    let is_plain_ron = bytes.first().map(|&b| b == b'(' || b == b' ' || b == b'\n' || b == b'\r' || b == b'\t').unwrap_or(false);

    let raw = if is_plain_ron {
        bytes.to_vec()
    } else {
        let mut decompressed = Vec::new();
        brotli::BrotliDecompress(&mut Cursor::new(bytes), &mut decompressed)
            .map_err(|e| LevelError::Compression(format!("brotli decompression failed: {}", e)))?;
        decompressed
    };

    String::from_utf8(raw).map_err(|e| LevelError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid UTF-8: {}", e),
    )))
}

/// Parse, validate and finish a level from RON text
fn parse_contents(contents: &str, origin: &str) -> Result<Level, LevelError> {
    let mut level: Level = match ron::from_str(contents) {
        Ok(l) => l,
        Err(e) => {
            let pos = e.position;
            let line = contents.lines().nth(pos.line.saturating_sub(1)).unwrap_or("");
            tracing::error!(origin, line = pos.line, col = pos.col, context = line.trim(), "RON parse error: {}", e.code);
            return Err(e.into());
        }
    };

    validate_level(&level)?;

    for room in &mut level.rooms {
        room.recalculate_bounds();
    }

    tracing::info!(origin, rooms = level.rooms.len(), boxes = level.boxes.len(), "scene loaded");
    Ok(level)
}

/// Load a level from a RON file (supports both compressed and uncompressed)
pub fn load_level<P: AsRef<Path>>(path: P) -> Result<Level, LevelError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let contents = decode_contents(&bytes)?;
    parse_contents(&contents, &path.display().to_string())
}

/// Parse level data from bytes (plain or compressed)
pub fn parse_level_data(bytes: &[u8]) -> Result<Level, LevelError> {
    let contents = decode_contents(bytes)?;
    parse_contents(&contents, "<bytes>")
}

/// Load a level from a RON string (for embedded levels or testing)
pub fn load_level_from_str(s: &str) -> Result<Level, LevelError> {
    parse_contents(s, "<string>")
}

/// Serialize a level to compressed bytes
pub fn serialize_level(level: &Level) -> Result<Vec<u8>, LevelError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(6)
        .indentor("  ".to_string());

    let ron_string = ron::ser::to_string_pretty(level, config)?;

    // Compress with brotli (quality 6, window 22 - good balance of speed/ratio)
    let mut compressed = Vec::new();
    brotli::BrotliCompress(&mut Cursor::new(ron_string.as_bytes()), &mut compressed, &brotli::enc::BrotliEncoderParams {
        quality: 6,
        lgwin: 22,
        ..Default::default()
    }).map_err(|e| LevelError::Compression(format!("brotli compression failed: {}", e)))?;

    Ok(compressed)
}

/// Save a level to a compressed RON file (brotli)
pub fn save_level<P: AsRef<Path>>(level: &Level, path: P) -> Result<(), LevelError> {
    let data = serialize_level(level)?;
    fs::write(path, data)?;
    Ok(())
}
