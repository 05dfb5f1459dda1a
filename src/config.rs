use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use glam::Vec2;

use crate::clock::{Cadence, DEFAULT_FRAME_TICK};
use crate::motion::{DEFAULT_AMPLITUDE, DEFAULT_SPEED};

/// Edge length of the mascot window, in logical pixels.
pub const DEFAULT_SIZE: u32 = 200;
/// Where the mascot's centre starts.
pub const DEFAULT_START: Vec2 = Vec2::new(100.0, 300.0);
/// Still shown at startup and whenever something fails.
pub const DEFAULT_STILL: &str = "main";
/// Stills a tap picks from while idle.
pub const IDLE_VARIANTS: [&str; 3] = ["main", "main2", "main3"];
/// Base name of the patrol animations (`<base>_r`, `<base>_l`).
pub const DEFAULT_PATROL_ASSET: &str = "patoka";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CadenceArg {
    /// Advance every 100ms regardless of the file's delays
    Fixed,
    /// Honour each frame's own delay
    PerFrame,
}

#[derive(Debug, Parser)]
#[command(name = "desktop-mascot")]
#[command(author, version, about = "Animated GIF mascot that lives on your desktop", long_about = None)]
pub struct Cli {
    /// Directory holding the .gif and .png assets
    #[arg(short, long, default_value = "assets")]
    pub assets: PathBuf,

    /// Frame pacing for animations
    #[arg(long, value_enum, default_value_t = CadenceArg::Fixed)]
    pub cadence: CadenceArg,

    /// Patrol speed in pixels per motion tick
    #[arg(long, default_value_t = DEFAULT_SPEED, value_parser = parse_speed)]
    pub speed: f32,

    /// Vertical bob in pixels
    #[arg(long, default_value_t = DEFAULT_AMPLITUDE, value_parser = parse_amplitude)]
    pub amplitude: f32,

    /// Base name of the left/right patrol animations
    #[arg(long, default_value = DEFAULT_PATROL_ASSET)]
    pub patrol_asset: String,

    /// Window edge length in pixels
    #[arg(long, default_value_t = DEFAULT_SIZE, value_parser = clap::value_parser!(u32).range(16..=2048))]
    pub size: u32,
}

fn parse_finite(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{s} is not a finite number"))
    }
}

fn parse_speed(s: &str) -> Result<f32, String> {
    let value = parse_finite(s)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(format!("speed must be positive, got {value}"))
    }
}

fn parse_amplitude(s: &str) -> Result<f32, String> {
    parse_finite(s)
}

/// Everything the app needs, after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub assets: PathBuf,
    pub cadence: Cadence,
    pub speed: f32,
    pub amplitude: f32,
    pub patrol_asset: String,
    pub size: u32,
    pub start: Vec2,
    pub default_still: String,
    pub idle_variants: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets: PathBuf::from("assets"),
            cadence: Cadence::Fixed(DEFAULT_FRAME_TICK),
            speed: DEFAULT_SPEED,
            amplitude: DEFAULT_AMPLITUDE,
            patrol_asset: DEFAULT_PATROL_ASSET.to_string(),
            size: DEFAULT_SIZE,
            start: DEFAULT_START,
            default_still: DEFAULT_STILL.to_string(),
            idle_variants: IDLE_VARIANTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let cadence = match cli.cadence {
            CadenceArg::Fixed => Cadence::Fixed(DEFAULT_FRAME_TICK),
            CadenceArg::PerFrame => Cadence::PerFrame,
        };
        Self {
            assets: cli.assets,
            cadence,
            speed: cli.speed,
            amplitude: cli.amplitude,
            patrol_asset: cli.patrol_asset,
            size: cli.size,
            ..Self::default()
        }
    }
}
