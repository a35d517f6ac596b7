//! Simulation configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `apiary.ron` file (if exists)
//! 3. Environment variables prefixed with `APIARY_`
//!
//! Example environment variable: `APIARY_PHYSICS__GRAVITY=2.5`
//!
//! Every tunable the tick loop consumes lives here; the session validates the
//! whole surface once at construction and treats the values as read-only
//! afterwards.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Full simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimConfig {
    #[serde(default)]
    pub physics: PhysicsConfig,

    #[serde(default)]
    pub track: TrackConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub world: WorldConfig,

    #[serde(default)]
    pub sprites: SpriteConfig,

    /// Seed for the obstacle-generation RNG
    #[serde(default)]
    pub seed: u64,
}

/// Flier kinematics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Gravity coefficient in the displacement quadratic (pixels/tick^2)
    pub gravity: f32,
    /// Upward velocity applied by a flap (pixels/tick)
    pub flap_impulse: f32,
    /// Maximum downward displacement per tick
    pub terminal_velocity: f32,
    /// Extra displacement subtracted while rising (sharper rise than fall)
    pub upward_drag_bias: f32,
    /// Tilt snapped to this angle while rising (degrees)
    pub max_tilt_up: f32,
    /// Tilt decay per tick while falling (degrees), floored at -90
    pub tilt_decay: f32,
    /// Horizontal spawn position (constant for the flier's lifetime)
    pub spawn_x: f32,
    /// Vertical spawn position
    pub spawn_y: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 3.0,
            flap_impulse: 10.0,
            terminal_velocity: 16.0,
            upward_drag_bias: 1.0,
            max_tilt_up: 25.0,
            tilt_decay: 20.0,
            spawn_x: 230.0,
            spawn_y: 350.0,
        }
    }
}

/// Obstacle track and gap-generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Vertical size of the passable opening
    pub gap_size: f32,
    /// Leftward scroll distance per tick
    pub scroll_speed: f32,
    /// Maximum |delta| between consecutive gap tops
    pub spread: f32,
    /// Lowest allowed gap top
    pub gap_top_min: f32,
    /// Highest allowed gap top
    pub gap_top_max: f32,
    /// Width of the safe sub-range used when a draw lands outside the bounds
    pub resample_margin: f32,
    /// Gap top of the first obstacle (no previous value to vary from)
    pub seed_gap_top: f32,
    /// Spawn x for obstacles created mid-session
    pub spawn_x: f32,
    /// Spawn x for the session's first obstacle
    pub first_spawn_x: f32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            gap_size: 200.0,
            scroll_speed: 5.0,
            spread: 120.0,
            gap_top_min: 50.0,
            gap_top_max: 450.0,
            resample_margin: 40.0,
            seed_gap_top: 250.0,
            spawn_x: 550.0,
            first_spawn_x: 700.0,
        }
    }
}

/// Fitness and score settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Fitness accrued by each alive flier every tick
    pub survival_bonus: f32,
    /// Fitness awarded to each alive flier when an obstacle is passed
    pub pass_bonus: f32,
    /// Decision-function output above which a flap is issued
    pub flap_threshold: f32,
    /// Minimum session score before a brain is eligible for checkpointing
    pub min_checkpoint_score: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            survival_bonus: 0.1,
            pass_bonus: 5.0,
            flap_threshold: 0.5,
            min_checkpoint_score: 20,
        }
    }
}

/// Vertical play-area bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Fliers with y above this are removed (fell out of the play area)
    pub lower_bound: f32,
    /// Fliers with y below this are removed (flew over the top)
    pub upper_bound: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            lower_bound: 650.0,
            upper_bound: -50.0,
        }
    }
}

/// Collision-footprint dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteConfig {
    pub flier_width: u32,
    pub flier_height: u32,
    pub obstacle_width: u32,
    pub obstacle_height: u32,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            flier_width: 50,
            flier_height: 50,
            obstacle_width: 400,
            obstacle_height: 450,
        }
    }
}

/// Rejected configuration values, fatal at session construction
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be positive (got {value})")]
    NotPositive { name: &'static str, value: f32 },

    #[error("{name} must not be negative (got {value})")]
    Negative { name: &'static str, value: f32 },

    #[error("{name} must be finite")]
    NotFinite { name: &'static str },

    #[error("gap range is empty: gap_top_min {min} >= gap_top_max {max}")]
    EmptyGapRange { min: f32, max: f32 },

    #[error("resample_margin {margin} does not fit inside the gap range (span {span})")]
    MarginTooWide { margin: f32, span: f32 },

    #[error("seed_gap_top {value} lies outside [{min}, {max}]")]
    SeedGapOutOfRange { value: f32, min: f32, max: f32 },

    #[error("vertical bounds are inverted: upper_bound {upper} >= lower_bound {lower}")]
    InvertedBounds { upper: f32, lower: f32 },

    #[error("spawn_y {value} lies outside the vertical bounds ({upper}, {lower})")]
    SpawnOutOfBounds { value: f32, upper: f32, lower: f32 },

    #[error("sprite {name} must have non-zero dimensions")]
    EmptySprite { name: &'static str },
}

impl SimConfig {
    /// Check every parameter the tick loop depends on.
    ///
    /// Called once at session construction; no tick runs on a config that
    /// fails here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        let t = &self.track;
        let s = &self.scoring;
        let w = &self.world;

        for (name, value) in [
            ("physics.gravity", p.gravity),
            ("physics.flap_impulse", p.flap_impulse),
            ("physics.terminal_velocity", p.terminal_velocity),
            ("physics.tilt_decay", p.tilt_decay),
            ("track.gap_size", t.gap_size),
            ("track.scroll_speed", t.scroll_speed),
            ("track.resample_margin", t.resample_margin),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name });
            }
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        for (name, value) in [
            ("physics.upward_drag_bias", p.upward_drag_bias),
            ("track.spread", t.spread),
            ("scoring.survival_bonus", s.survival_bonus),
            ("scoring.pass_bonus", s.pass_bonus),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name });
            }
            if value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }

        if !s.flap_threshold.is_finite() {
            return Err(ConfigError::NotFinite {
                name: "scoring.flap_threshold",
            });
        }

        if t.gap_top_min >= t.gap_top_max {
            return Err(ConfigError::EmptyGapRange {
                min: t.gap_top_min,
                max: t.gap_top_max,
            });
        }
        let span = t.gap_top_max - t.gap_top_min;
        if t.resample_margin > span {
            return Err(ConfigError::MarginTooWide {
                margin: t.resample_margin,
                span,
            });
        }
        if t.seed_gap_top < t.gap_top_min || t.seed_gap_top > t.gap_top_max {
            return Err(ConfigError::SeedGapOutOfRange {
                value: t.seed_gap_top,
                min: t.gap_top_min,
                max: t.gap_top_max,
            });
        }

        if w.upper_bound >= w.lower_bound {
            return Err(ConfigError::InvertedBounds {
                upper: w.upper_bound,
                lower: w.lower_bound,
            });
        }
        if p.spawn_y <= w.upper_bound || p.spawn_y >= w.lower_bound {
            return Err(ConfigError::SpawnOutOfBounds {
                value: p.spawn_y,
                upper: w.upper_bound,
                lower: w.lower_bound,
            });
        }

        let sp = &self.sprites;
        if sp.flier_width == 0 || sp.flier_height == 0 {
            return Err(ConfigError::EmptySprite { name: "flier" });
        }
        if sp.obstacle_width == 0 || sp.obstacle_height == 0 {
            return Err(ConfigError::EmptySprite { name: "obstacle" });
        }

        Ok(())
    }

    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `apiary.ron` file (if exists)
    /// 3. Environment variables prefixed with `APIARY_` (highest priority)
    pub fn load() -> Result<Self> {
        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("physics.gravity", 3.0)?
            .set_default("physics.flap_impulse", 10.0)?
            .set_default("physics.terminal_velocity", 16.0)?
            .set_default("physics.upward_drag_bias", 1.0)?
            .set_default("physics.max_tilt_up", 25.0)?
            .set_default("physics.tilt_decay", 20.0)?
            .set_default("physics.spawn_x", 230.0)?
            .set_default("physics.spawn_y", 350.0)?
            .set_default("track.gap_size", 200.0)?
            .set_default("track.scroll_speed", 5.0)?
            .set_default("track.spread", 120.0)?
            .set_default("track.gap_top_min", 50.0)?
            .set_default("track.gap_top_max", 450.0)?
            .set_default("track.resample_margin", 40.0)?
            .set_default("track.seed_gap_top", 250.0)?
            .set_default("track.spawn_x", 550.0)?
            .set_default("track.first_spawn_x", 700.0)?
            .set_default("scoring.survival_bonus", 0.1)?
            .set_default("scoring.pass_bonus", 5.0)?
            .set_default("scoring.flap_threshold", 0.5)?
            .set_default("scoring.min_checkpoint_score", 20_i64)?
            .set_default("world.lower_bound", 650.0)?
            .set_default("world.upper_bound", -50.0)?
            .set_default("sprites.flier_width", 50_i64)?
            .set_default("sprites.flier_height", 50_i64)?
            .set_default("sprites.obstacle_width", 400_i64)?
            .set_default("sprites.obstacle_height", 450_i64)?
            .set_default("seed", 0_i64)?
            // Layer 2: Config file (optional, won't error if missing)
            .add_source(
                File::with_name("apiary")
                    .format(config::FileFormat::Ron)
                    .required(false),
            )
            // Layer 3: Environment variables (APIARY_PHYSICS__GRAVITY, etc.)
            .add_source(Environment::with_prefix("APIARY").separator("__"));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
