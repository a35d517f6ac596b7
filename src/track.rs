//! Obstacle track: scrolling gap pairs and their generation policy
//!
//! The track owns the continuity state between spawns (the previous gap
//! top) and a seeded RNG, so a session's course is reproducible from its
//! config. Each pass spawns a replacement obstacle; obstacles are retired
//! once fully off-screen to the left.

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::config::TrackConfig;

/// One gap pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    /// Left edge of the sprite pair
    pub x: f32,
    /// Top of the passable opening
    pub gap_top: f32,
    /// Set once, the first tick the lead flier is beyond the midpoint
    pub passed: bool,
}

impl Obstacle {
    /// Top edge of the upper sprite
    pub fn top_edge(&self, upper_sprite_height: u32) -> f32 {
        self.gap_top - upper_sprite_height as f32
    }

    /// Bottom of the passable opening (top edge of the lower sprite)
    pub fn bottom_edge(&self, gap_size: f32) -> f32 {
        self.gap_top + gap_size
    }

    /// Horizontal midpoint used by the pass test
    pub fn midpoint(&self, width: u32) -> f32 {
        self.x + width as f32 / 2.0
    }
}

/// Ordered sequence of live obstacles, leftmost first
#[derive(Debug, Clone)]
pub struct ObstacleTrack {
    config: TrackConfig,
    obstacle_width: u32,
    obstacles: Vec<Obstacle>,
    prev_gap_top: f32,
    rng: Xoshiro256PlusPlus,
}

impl ObstacleTrack {
    /// Create a track with its first obstacle in place
    pub fn new(config: TrackConfig, obstacle_width: u32, seed: u64) -> Self {
        let first = Obstacle {
            x: config.first_spawn_x,
            gap_top: config.seed_gap_top,
            passed: false,
        };
        Self {
            prev_gap_top: config.seed_gap_top,
            obstacles: vec![first],
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            obstacle_width,
            config,
        }
    }

    /// Draw the next gap top: bounded delta from the previous one, resampled
    /// into a safe sub-range when a draw lands outside the bounds (never
    /// clamped to the exact bound).
    fn draw_gap_top(&mut self) -> f32 {
        let t = &self.config;
        let mut gap = self.prev_gap_top + self.rng.random_range(-t.spread..=t.spread);

        if gap < t.gap_top_min {
            gap = self
                .rng
                .random_range(t.gap_top_min..=t.gap_top_min + t.resample_margin);
        } else if gap > t.gap_top_max {
            gap = self
                .rng
                .random_range(t.gap_top_max - t.resample_margin..=t.gap_top_max);
        }

        self.prev_gap_top = gap;
        gap
    }

    fn spawn(&mut self) {
        let gap_top = self.draw_gap_top();
        self.obstacles.push(Obstacle {
            x: self.config.spawn_x,
            gap_top,
            passed: false,
        });
    }

    /// Scroll, fire pass transitions against the lead flier, spawn
    /// replacements, retire off-screen obstacles. Runs once per tick after
    /// all flier updates. Returns how many obstacles were newly passed.
    pub fn advance(&mut self, lead_x: Option<f32>) -> u32 {
        for obstacle in &mut self.obstacles {
            obstacle.x -= self.config.scroll_speed;
        }

        let mut passes = 0;
        if let Some(lead_x) = lead_x {
            for obstacle in &mut self.obstacles {
                if !obstacle.passed && obstacle.midpoint(self.obstacle_width) < lead_x {
                    obstacle.passed = true;
                    passes += 1;
                }
            }
        }
        for _ in 0..passes {
            self.spawn();
        }

        let width = self.obstacle_width as f32;
        self.obstacles.retain(|o| o.x + width > 0.0);
        if self.obstacles.is_empty() {
            self.spawn();
        }

        passes
    }

    /// Obstacle the whole population observes this tick: the nearest one the
    /// lead flier has not yet passed.
    pub fn observation_target(&self) -> &Obstacle {
        self.obstacles
            .iter()
            .find(|o| !o.passed)
            .unwrap_or_else(|| &self.obstacles[self.obstacles.len() - 1])
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn obstacle_width(&self) -> u32 {
        self.obstacle_width
    }

    pub fn gap_size(&self) -> f32 {
        self.config.gap_size
    }
}
