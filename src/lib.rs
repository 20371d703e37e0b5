//! roomtrace: what a TR1-style camera sees and where it may stand
//!
//! - Portal visibility: rooms visible from the camera through portal openings
//! - Camera tracer: keeps the eye out of walls, floors and ceilings
//! - Camera controller: follow, combat, static-view and cutscene modes

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod camera;
pub mod math;
pub mod visibility;
pub mod world;

pub use camera::{CameraConfig, CameraController, CameraMode, CameraOwner, CameraTracer, CameraView};
pub use visibility::{compute_visible_rooms, compute_visible_rooms_with, PortalView, VisibleRooms};
pub use world::{Level, Location};
