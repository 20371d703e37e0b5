//! roomtrace command line
//!
//! Usage:
//!   roomtrace validate level.ron
//!   roomtrace visible level.ron --room 0 --eye 2560,-1024,2560 --target 8000,-1024,2560
//!   roomtrace trace level.ron --from 0:1536,-1024,1536 --to 0:5000,-1024,1536
//!   roomtrace demo out.ron

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use roomtrace::camera::{CameraConfig, CameraTracer};
use roomtrace::math::{mat4_inverse_rigid, mat4_look_at, mat4_mul, mat4_perspective, Vec3};
use roomtrace::visibility::{compute_visible_rooms, PortalView};
use roomtrace::world::{create_test_level, load_level, save_level, Location};

#[derive(Parser)]
#[command(name = "roomtrace")]
#[command(version = roomtrace::VERSION)]
#[command(about = "Portal visibility and camera tracing for room-based levels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a level and run every validation check
    Validate {
        level: PathBuf,
    },
    /// List the rooms visible from a viewpoint
    Visible {
        level: PathBuf,
        /// Room the eye is in
        #[arg(long)]
        room: usize,
        /// Eye position as x,y,z
        #[arg(long, value_parser = parse_vec3)]
        eye: Vec3,
        /// Point looked at as x,y,z
        #[arg(long, value_parser = parse_vec3)]
        target: Vec3,
        /// Vertical field of view in degrees (overrides the config)
        #[arg(long)]
        fov: Option<f32>,
        #[arg(long, default_value_t = 4.0 / 3.0)]
        aspect: f32,
        /// Camera config (RON) for fov and clip planes
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Trace the camera eye line between two locations
    Trace {
        level: PathBuf,
        /// Start as room:x,y,z
        #[arg(long, value_parser = parse_location)]
        from: Location,
        /// End as room:x,y,z
        #[arg(long, value_parser = parse_location)]
        to: Location,
    },
    /// Write the built-in test level
    Demo {
        out: PathBuf,
    },
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z, got '{}'", s));
    }
    let mut v = [0.0f32; 3];
    for (slot, part) in v.iter_mut().zip(&parts) {
        *slot = part.trim().parse().map_err(|e| format!("bad coordinate '{}': {}", part, e))?;
    }
    Ok(Vec3::new(v[0], v[1], v[2]))
}

fn parse_location(s: &str) -> Result<Location, String> {
    let (room, pos) = s.split_once(':').ok_or_else(|| format!("expected room:x,y,z, got '{}'", s))?;
    let room = room.trim().parse().map_err(|e| format!("bad room '{}': {}", room, e))?;
    Ok(Location::new(room, parse_vec3(pos)?))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { level } => validate(&level),
        Commands::Visible { level, room, eye, target, fov, aspect, config } => {
            visible(&level, room, eye, target, fov, aspect, config.as_deref())
        }
        Commands::Trace { level, from, to } => trace(&level, from, to),
        Commands::Demo { out } => demo(&out),
    }
}

fn load(path: &Path) -> Result<roomtrace::Level> {
    load_level(path).with_context(|| format!("Failed to load level {}", path.display()))
}

fn validate(path: &Path) -> Result<()> {
    let level = load(path)?;
    println!(
        "{}: ok ({} rooms, {} boxes, {} fixed views, {} camera frames)",
        path.display(),
        level.rooms.len(),
        level.boxes.len(),
        level.fixed_views.len(),
        level.camera_frames.len(),
    );
    Ok(())
}

fn visible(
    path: &Path,
    room: usize,
    eye: Vec3,
    target: Vec3,
    fov: Option<f32>,
    aspect: f32,
    config: Option<&Path>,
) -> Result<()> {
    let level = load(path)?;
    if room >= level.rooms.len() {
        anyhow::bail!("room {} does not exist ({} rooms)", room, level.rooms.len());
    }

    let config = match config {
        Some(p) => CameraConfig::load(p).with_context(|| format!("Failed to load camera config {}", p.display()))?,
        None => CameraConfig::default(),
    };

    let view = mat4_inverse_rigid(&mat4_look_at(eye, target, Vec3::UP));
    let proj = mat4_perspective(fov.unwrap_or(config.fov), aspect, config.near, config.far);
    let portal_view = PortalView { position: eye, view_proj: mat4_mul(&proj, &view) };

    let visible = compute_visible_rooms(&level, room, &portal_view);
    for (room, clip) in visible.iter() {
        println!(
            "room {:3}  clip [{:+.3}, {:+.3}] .. [{:+.3}, {:+.3}]",
            room, clip.min_x, clip.min_y, clip.max_x, clip.max_y
        );
    }
    for crossing in &visible.crossings {
        println!("water crossing {} -> {}", crossing.from, crossing.to);
    }
    println!("{} visible, depth {}{}", visible.len(), visible.max_depth, if visible.truncated { " (truncated)" } else { "" });
    Ok(())
}

fn trace(path: &Path, from: Location, mut to: Location) -> Result<()> {
    let level = load(path)?;
    for loc in [&from, &to] {
        if loc.room >= level.rooms.len() {
            anyhow::bail!("room {} does not exist ({} rooms)", loc.room, level.rooms.len());
        }
    }

    let clear = CameraTracer::new(&level).trace(&from, &mut to);
    println!(
        "{} -> room {} at ({:.1}, {:.1}, {:.1})",
        if clear { "clear" } else { "blocked" },
        to.room,
        to.pos.x,
        to.pos.y,
        to.pos.z
    );
    Ok(())
}

fn demo(out: &Path) -> Result<()> {
    let level = create_test_level();
    save_level(&level, out).with_context(|| format!("Failed to write {}", out.display()))?;
    tracing::info!(path = %out.display(), rooms = level.rooms.len(), "test level written");
    Ok(())
}
