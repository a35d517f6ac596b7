//! Session orchestration: one play-through or one generation
//!
//! A session ties the population, obstacle track, and sprite masks into a
//! tick loop. `tick()` is the only mutation point: it advances the whole
//! world exactly one discrete step and returns a report, leaving input
//! polling and frame pacing entirely to the caller. A stop request is
//! observed at tick boundaries only.

use std::rc::Rc;

use glam::Vec2;

use crate::brain::DecisionFunction;
use crate::config::{ConfigError, SimConfig};
use crate::population::{FitnessCell, PopulationController};
use crate::sprite::SpriteSet;
use crate::store::BestTracker;
use crate::track::ObstacleTrack;

/// Session lifecycle; there is no pause state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Terminated,
}

/// Result of advancing one tick
#[derive(Debug, Clone, Copy)]
pub struct TickReport {
    pub score: u32,
    pub alive: usize,
    /// Obstacles newly passed this tick
    pub passes: u32,
    pub terminated: bool,
}

/// Read-only world state for an external renderer
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub fliers: Vec<FlierView>,
    pub obstacles: Vec<ObstacleView>,
    pub score: u32,
    pub generation: u32,
}

/// Drawable flier state
#[derive(Debug, Clone, Copy)]
pub struct FlierView {
    pub position: Vec2,
    pub tilt: f32,
}

/// Drawable obstacle state
#[derive(Debug, Clone, Copy)]
pub struct ObstacleView {
    pub x: f32,
    pub top_edge: f32,
    pub bottom_edge: f32,
    pub passed: bool,
}

/// One simulation run over a fixed roster of decision functions
pub struct SimulationSession {
    config: SimConfig,
    population: PopulationController,
    track: ObstacleTrack,
    sprites: SpriteSet,
    state: SessionState,
    generation: u32,
    ticks: u64,
}

impl SimulationSession {
    /// Build a session with procedurally generated sprite masks. The config
    /// is validated here; no tick runs on a bad config.
    pub fn new(
        config: SimConfig,
        roster: Vec<(Box<dyn DecisionFunction>, FitnessCell)>,
        generation: u32,
        best: Option<Rc<BestTracker>>,
    ) -> Result<Self, ConfigError> {
        let sprites = SpriteSet::procedural(&config.sprites);
        Self::with_sprites(config, roster, generation, best, sprites)
    }

    /// Build a session with caller-supplied sprite masks (e.g. loaded from
    /// PNG alpha channels)
    pub fn with_sprites(
        config: SimConfig,
        roster: Vec<(Box<dyn DecisionFunction>, FitnessCell)>,
        generation: u32,
        best: Option<Rc<BestTracker>>,
        sprites: SpriteSet,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let population = PopulationController::new(roster, &config, best);
        let track = ObstacleTrack::new(
            config.track.clone(),
            config.sprites.obstacle_width,
            config.seed,
        );
        log::info!(
            "Session start: generation {generation}, population {}",
            population.len()
        );
        Ok(Self {
            config,
            population,
            track,
            sprites,
            state: SessionState::Running,
            generation,
            ticks: 0,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    pub fn score(&self) -> u32 {
        self.population.score()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// External stop signal. Takes effect immediately; ticks are atomic, so
    /// nothing is ever discarded mid-update.
    pub fn stop(&mut self) {
        if self.state == SessionState::Running {
            log::info!(
                "Session stopped at score {} after {} ticks",
                self.population.score(),
                self.ticks
            );
            self.state = SessionState::Terminated;
        }
    }

    /// Advance the world one tick: all fliers in index order, then the
    /// track's scroll/pass/spawn/retire pass, then removal compaction.
    pub fn tick(&mut self) -> TickReport {
        if self.state == SessionState::Terminated {
            return self.report(0);
        }

        self.population.step(&self.track, &self.sprites, &self.config);
        let passes = self.track.advance(self.population.lead_x());
        self.population
            .record_passes(passes, self.config.scoring.pass_bonus);
        self.population.compact();
        self.ticks += 1;

        if self.population.is_empty() {
            log::info!(
                "Population exhausted at score {} after {} ticks",
                self.population.score(),
                self.ticks
            );
            self.state = SessionState::Terminated;
        }

        self.report(passes)
    }

    fn report(&self, passes: u32) -> TickReport {
        TickReport {
            score: self.population.score(),
            alive: self.population.len(),
            passes,
            terminated: self.state == SessionState::Terminated,
        }
    }

    /// Read-only world state for drawing; dead fliers are omitted
    pub fn snapshot(&self) -> SessionSnapshot {
        let upper_height = self.sprites.obstacle_upper.height();
        let gap_size = self.track.gap_size();
        SessionSnapshot {
            fliers: self
                .population
                .fliers()
                .iter()
                .filter(|f| f.alive)
                .map(|f| FlierView {
                    position: Vec2::new(f.x, f.y),
                    tilt: f.tilt,
                })
                .collect(),
            obstacles: self
                .track
                .obstacles()
                .iter()
                .map(|o| ObstacleView {
                    x: o.x,
                    top_edge: o.top_edge(upper_height),
                    bottom_edge: o.bottom_edge(gap_size),
                    passed: o.passed,
                })
                .collect(),
            score: self.population.score(),
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::Observation;
    use anyhow::Result;

    struct ConstantBrain(f32);

    impl DecisionFunction for ConstantBrain {
        fn activate(&mut self, _observation: Observation) -> Result<f32> {
            Ok(self.0)
        }
    }

    fn roster_of(actions: &[f32]) -> Vec<(Box<dyn DecisionFunction>, FitnessCell)> {
        actions
            .iter()
            .map(|&a| {
                (
                    Box::new(ConstantBrain(a)) as Box<dyn DecisionFunction>,
                    FitnessCell::new(),
                )
            })
            .collect()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = SimConfig::default();
        config.physics.gravity = -1.0;
        let result = SimulationSession::new(config, roster_of(&[0.0]), 0, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_terminates_when_population_empties() {
        let mut session =
            SimulationSession::new(SimConfig::default(), roster_of(&[0.0, 0.0]), 0, None).unwrap();
        let mut last = session.tick();
        while !last.terminated {
            last = session.tick();
        }
        assert_eq!(last.alive, 0);
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.ticks(), 21);
    }

    #[test]
    fn test_stop_halts_without_further_physics() {
        let mut session =
            SimulationSession::new(SimConfig::default(), roster_of(&[0.0]), 0, None).unwrap();
        session.tick();
        let y_before = session.snapshot().fliers[0].position.y;

        session.stop();
        assert!(session.is_terminated());

        let report = session.tick();
        assert!(report.terminated);
        assert_eq!(session.snapshot().fliers[0].position.y, y_before);
        assert_eq!(session.ticks(), 1);
    }

    #[test]
    fn test_snapshot_contents() {
        let session =
            SimulationSession::new(SimConfig::default(), roster_of(&[0.0, 0.0]), 3, None).unwrap();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.generation, 3);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.fliers.len(), 2);
        assert_eq!(snapshot.obstacles.len(), 1);
        assert_eq!(snapshot.fliers[0].position, Vec2::new(230.0, 350.0));
        // Gap edges derive from the seed gap top
        assert_eq!(snapshot.obstacles[0].bottom_edge, 450.0);
    }

    #[test]
    fn test_tick_after_termination_is_inert() {
        let mut session =
            SimulationSession::new(SimConfig::default(), roster_of(&[0.0]), 0, None).unwrap();
        while !session.tick().terminated {}
        let ticks = session.ticks();
        let report = session.tick();
        assert!(report.terminated);
        assert_eq!(session.ticks(), ticks);
    }
}
