use std::time::Duration;

use glam::Vec2;

use crate::assets::AssetRequest;

/// Patrol tick interval.
pub const MOTION_TICK: Duration = Duration::from_millis(50);
/// Horizontal pixels per tick.
pub const DEFAULT_SPEED: f32 = 3.0;
/// Vertical bob, in pixels either side of the centreline.
pub const DEFAULT_AMPLITUDE: f32 = 10.0;
/// Phase advance of the bob per tick (radians).
const WAVE_STEP: f64 = 0.2;

/// Usable screen rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self::new(origin, origin + size)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::from_origin_size(Vec2::ZERO, Vec2::new(1920.0, 1080.0))
    }
}

/// Which way the mascot is walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Right,
    Left,
}

impl Heading {
    pub fn sign(self) -> f32 {
        match self {
            Heading::Right => 1.0,
            Heading::Left => -1.0,
        }
    }

    /// Asset-name suffix for animations facing this way.
    pub fn suffix(self) -> &'static str {
        match self {
            Heading::Right => "_r",
            Heading::Left => "_l",
        }
    }
}

/// Everything the bounce needs between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionState {
    pub position: Vec2,
    pub heading: Heading,
    pub speed: f32,
    pub wave_counter: f64,
    pub wave_amplitude: f32,
    pub centerline: f32,
}

/// Walks the mascot back and forth across the visible area with a sine
/// bob, asking for the matching left/right animation at each turn.
pub struct BounceController {
    state: MotionState,
    bounds: Bounds,
    half_width: f32,
    base: String,
}

impl BounceController {
    pub fn new(base: impl Into<String>, position: Vec2, speed: f32, amplitude: f32, width: f32) -> Self {
        Self {
            state: MotionState {
                position,
                heading: Heading::Right,
                speed,
                wave_counter: 0.0,
                wave_amplitude: amplitude,
                centerline: position.y,
            },
            bounds: Bounds::default(),
            half_width: width / 2.0,
            base: base.into(),
        }
    }

    /// Start a patrol from the current position: face right, bob around
    /// the current height, and pull x inside the lane if it drifted out.
    pub fn begin(&mut self, bounds: Bounds) {
        self.bounds = bounds;
        let (lo, hi) = self.lane();
        let s = &mut self.state;
        s.heading = Heading::Right;
        s.centerline = s.position.y;
        s.position.x = s.position.x.clamp(lo, hi);
    }

    /// Allowed range for the centre x.
    pub fn lane(&self) -> (f32, f32) {
        let lo = self.bounds.min.x + self.half_width;
        let hi = self.bounds.max.x - self.half_width;
        if lo <= hi {
            (lo, hi)
        } else {
            // area narrower than the mascot: pin to the middle
            let mid = (self.bounds.min.x + self.bounds.max.x) / 2.0;
            (mid, mid)
        }
    }

    /// One patrol tick. Returns the facing animation when the heading flipped.
    pub fn step(&mut self) -> Option<AssetRequest> {
        let (lo, hi) = self.lane();
        let s = &mut self.state;
        s.position.x += s.speed * s.heading.sign();

        let mut turned = false;
        if s.position.x > hi || s.position.x < lo {
            let heading = if s.position.x > hi {
                Heading::Left
            } else {
                Heading::Right
            };
            s.position.x = s.position.x.clamp(lo, hi);
            turned = heading != s.heading;
            s.heading = heading;
        }

        s.wave_counter += WAVE_STEP;
        s.position.y = s.centerline + s.wave_amplitude * s.wave_counter.sin() as f32;

        turned.then(|| self.facing_request())
    }

    /// Animation for the current heading, e.g. `patoka_l`.
    pub fn facing_request(&self) -> AssetRequest {
        AssetRequest::animated(format!("{}{}", self.base, self.state.heading.suffix()))
    }

    /// Move by a drag delta; while patrolling the bob follows.
    pub fn nudge(&mut self, delta: Vec2) {
        self.state.position += delta;
        self.state.centerline += delta.y;
    }

    pub fn position(&self) -> Vec2 {
        self.state.position
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}
