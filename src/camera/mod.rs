//! Camera module - follow/combat/static/cutscene camera with level collision
//!
//! - `tracer`: eye line tracing against the sector grid and navigation boxes
//! - `controller`: per-frame mode state machine producing view matrices
//! - `owner`: interface to the followed entity and look-at targets
//! - `config`: RON tuning file

mod config;
mod controller;
mod owner;
mod tracer;

pub use config::*;
pub use controller::*;
pub use owner::*;
pub use tracer::*;
