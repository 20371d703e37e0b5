//! World module - TR1-style room-based spatial model
//!
//! - Rooms with sector grids and portal connectivity
//! - Navigation boxes used to keep the camera off walls
//! - Flip state swapping rooms for their alternates
//! - Scene files (RON, optionally brotli-compressed) with validation

mod geometry;
mod level;
mod test_levels;

pub use geometry::*;
pub use level::*;
pub use test_levels::*;
