//! Population lifecycle for one generation
//!
//! The controller owns three parallel collections keyed by the same index:
//! decision functions, fliers, and fitness cells. Removal is mark-then-
//! compact: the per-tick scan only clears `alive` flags, and the compact
//! pass drops marked triples from all three collections together, so
//! several failures in one tick cannot shift indices mid-scan.

use std::cell::Cell;
use std::rc::Rc;

use crate::brain::{DecisionFunction, Observation};
use crate::collision::collides;
use crate::config::SimConfig;
use crate::flier::Flier;
use crate::sprite::SpriteSet;
use crate::store::BestTracker;
use crate::track::ObstacleTrack;

/// Shared fitness accumulator, supplied by the training driver so the value
/// outlives the removal of its triple.
#[derive(Debug, Clone, Default)]
pub struct FitnessCell(Rc<Cell<f32>>);

impl FitnessCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, delta: f32) {
        self.0.set(self.0.get() + delta);
    }

    pub fn get(&self) -> f32 {
        self.0.get()
    }
}

/// Parallel {decision function, flier, fitness} collections plus the shared
/// session score.
pub struct PopulationController {
    brains: Vec<Box<dyn DecisionFunction>>,
    fliers: Vec<Flier>,
    fitness: Vec<FitnessCell>,
    score: u32,
    best: Option<Rc<BestTracker>>,
}

impl PopulationController {
    /// Spawn one flier per supplied (decision function, fitness cell) pair
    pub fn new(
        roster: Vec<(Box<dyn DecisionFunction>, FitnessCell)>,
        config: &SimConfig,
        best: Option<Rc<BestTracker>>,
    ) -> Self {
        let mut brains = Vec::with_capacity(roster.len());
        let mut fitness = Vec::with_capacity(roster.len());
        let mut fliers = Vec::with_capacity(roster.len());
        for (brain, cell) in roster {
            brains.push(brain);
            fitness.push(cell);
            fliers.push(Flier::spawn(&config.physics));
        }
        Self {
            brains,
            fliers,
            fitness,
            score: 0,
            best,
        }
    }

    pub fn len(&self) -> usize {
        self.fliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fliers.is_empty()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn fliers(&self) -> &[Flier] {
        &self.fliers
    }

    pub fn fitness_cells(&self) -> &[FitnessCell] {
        &self.fitness
    }

    /// Horizontal position of the lead flier (first still-alive index)
    pub fn lead_x(&self) -> Option<f32> {
        self.fliers.iter().find(|f| f.alive).map(|f| f.x)
    }

    /// Advance every alive flier one tick: observe, act, move, then check
    /// removal conditions. Fliers are processed in index order; removals are
    /// only marked here.
    pub fn step(&mut self, track: &ObstacleTrack, sprites: &SpriteSet, config: &SimConfig) {
        self.assert_parallel();

        // One observation target for the whole tick
        let target = track.observation_target().clone();
        let gap_size = track.gap_size();
        let gap_bottom = target.bottom_edge(gap_size);

        for i in 0..self.fliers.len() {
            if !self.fliers[i].alive {
                continue;
            }

            let observation = Observation {
                height: self.fliers[i].y,
                gap_top_delta: self.fliers[i].y - target.gap_top,
                gap_bottom_delta: self.fliers[i].y - gap_bottom,
            };

            match self.brains[i].activate(observation) {
                Ok(action) => {
                    self.fitness[i].add(config.scoring.survival_bonus);
                    if action > config.scoring.flap_threshold {
                        self.fliers[i].flap(&config.physics);
                    }
                }
                Err(e) => {
                    // One bad decision function must not halt the rest of
                    // the population
                    log::warn!("Decision function {i} failed, removing flier: {e:#}");
                    self.mark_dead(i);
                    continue;
                }
            }

            self.fliers[i].advance(&config.physics);

            let flier = &self.fliers[i];
            let out_of_bounds =
                flier.y > config.world.lower_bound || flier.y < config.world.upper_bound;
            let hit = out_of_bounds
                || track
                    .obstacles()
                    .iter()
                    .any(|o| collides(flier, o, sprites, gap_size));
            if hit {
                self.mark_dead(i);
            }
        }
    }

    /// Record newly passed obstacles: bump the shared score and award the
    /// pass bonus to every flier still alive this tick (fliers marked dead
    /// earlier in the tick get nothing).
    pub fn record_passes(&mut self, passes: u32, pass_bonus: f32) {
        if passes == 0 {
            return;
        }
        self.score += passes;
        for (flier, fitness) in self.fliers.iter().zip(&self.fitness) {
            if flier.alive {
                fitness.add(pass_bonus * passes as f32);
            }
        }
    }

    /// Drop marked triples from all three collections
    pub fn compact(&mut self) {
        let before = self.fliers.len();
        let alive: Vec<bool> = self.fliers.iter().map(|f| f.alive).collect();

        let mut keep = alive.iter();
        self.brains.retain(|_| *keep.next().unwrap());
        let mut keep = alive.iter();
        self.fitness.retain(|_| *keep.next().unwrap());
        self.fliers.retain(|f| f.alive);

        self.assert_parallel();
        let removed = before - self.fliers.len();
        if removed > 0 {
            log::debug!(
                "Removed {removed} fliers at score {}, {} remain",
                self.score,
                self.fliers.len()
            );
        }
    }

    fn mark_dead(&mut self, index: usize) {
        self.fliers[index].alive = false;
        if let Some(best) = &self.best {
            best.offer(self.score, self.brains[index].as_ref());
        }
    }

    fn assert_parallel(&self) {
        assert_eq!(
            self.brains.len(),
            self.fliers.len(),
            "population collections out of sync"
        );
        assert_eq!(
            self.fitness.len(),
            self.fliers.len(),
            "population collections out of sync"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    /// Always emits the same action
    struct ConstantBrain(f32);

    impl DecisionFunction for ConstantBrain {
        fn activate(&mut self, _observation: Observation) -> Result<f32> {
            Ok(self.0)
        }
    }

    /// Errors from the given tick onward
    struct FaultyBrain {
        ticks_left: u32,
    }

    impl DecisionFunction for FaultyBrain {
        fn activate(&mut self, _observation: Observation) -> Result<f32> {
            if self.ticks_left == 0 {
                anyhow::bail!("genome produced no output");
            }
            self.ticks_left -= 1;
            Ok(0.0)
        }
    }

    fn setup(
        roster: Vec<(Box<dyn DecisionFunction>, FitnessCell)>,
    ) -> (PopulationController, ObstacleTrack, SpriteSet, SimConfig) {
        let config = SimConfig::default();
        let population = PopulationController::new(roster, &config, None);
        let track = ObstacleTrack::new(config.track.clone(), config.sprites.obstacle_width, 0);
        let sprites = SpriteSet::procedural(&config.sprites);
        (population, track, sprites, config)
    }

    fn sinkers(count: usize) -> Vec<(Box<dyn DecisionFunction>, FitnessCell)> {
        (0..count)
            .map(|_| {
                (
                    Box::new(ConstantBrain(0.0)) as Box<dyn DecisionFunction>,
                    FitnessCell::new(),
                )
            })
            .collect()
    }

    #[test]
    fn test_survival_bonus_accrues_per_tick() {
        let (mut population, track, sprites, config) = setup(sinkers(2));
        for _ in 0..5 {
            population.step(&track, &sprites, &config);
            population.compact();
        }
        for cell in population.fitness_cells() {
            assert!((cell.get() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_never_flapping_population_sinks_out() {
        let (mut population, mut track, sprites, config) = setup(sinkers(3));
        let mut ticks = 0;
        while !population.is_empty() {
            population.step(&track, &sprites, &config);
            track.advance(population.lead_x());
            population.compact();
            ticks += 1;
            assert!(ticks < 100, "population should fall out of bounds");
        }
        // All three fall identically and leave in the same tick with no score
        assert_eq!(ticks, 21);
        assert_eq!(population.score(), 0);
    }

    #[test]
    fn test_faulty_brain_removed_without_halting_others() {
        let cells: Vec<FitnessCell> = (0..3).map(|_| FitnessCell::new()).collect();
        let roster: Vec<(Box<dyn DecisionFunction>, FitnessCell)> = vec![
            (Box::new(ConstantBrain(0.0)), cells[0].clone()),
            (Box::new(FaultyBrain { ticks_left: 2 }), cells[1].clone()),
            (Box::new(ConstantBrain(0.0)), cells[2].clone()),
        ];
        let (mut population, track, sprites, config) = setup(roster);

        for _ in 0..3 {
            population.step(&track, &sprites, &config);
            population.compact();
        }

        assert_eq!(population.len(), 2);
        // The faulty brain accrued the bonus only for its two good ticks
        assert!((cells[1].get() - 0.2).abs() < 1e-6);
        assert!((cells[0].get() - 0.3).abs() < 1e-6);
        assert!((cells[2].get() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_compact_keeps_collections_parallel() {
        let (mut population, track, sprites, config) = setup(sinkers(5));
        // Drive everyone out of bounds in the same tick
        for _ in 0..21 {
            population.step(&track, &sprites, &config);
        }
        population.compact();
        assert!(population.is_empty());
        assert_eq!(population.fitness_cells().len(), 0);
    }

    #[test]
    fn test_pass_bonus_skips_fliers_marked_this_tick() {
        let cells: Vec<FitnessCell> = (0..2).map(|_| FitnessCell::new()).collect();
        let roster: Vec<(Box<dyn DecisionFunction>, FitnessCell)> = vec![
            (Box::new(ConstantBrain(0.0)), cells[0].clone()),
            (Box::new(ConstantBrain(0.0)), cells[1].clone()),
        ];
        let (mut population, track, sprites, config) = setup(roster);

        population.step(&track, &sprites, &config);
        // Simulate one flier having failed during the scan
        population.fliers[1].alive = false;
        population.record_passes(1, config.scoring.pass_bonus);

        assert_eq!(population.score(), 1);
        assert!(cells[0].get() > config.scoring.pass_bonus);
        assert!(cells[1].get() < 1.0);
    }

    #[test]
    fn test_fitness_survives_removal() {
        let cell = FitnessCell::new();
        let roster: Vec<(Box<dyn DecisionFunction>, FitnessCell)> =
            vec![(Box::new(ConstantBrain(0.0)), cell.clone())];
        let (mut population, track, sprites, config) = setup(roster);

        for _ in 0..30 {
            population.step(&track, &sprites, &config);
            population.compact();
        }
        assert!(population.is_empty());
        // 21 survived ticks * 0.1
        assert!((cell.get() - 2.1).abs() < 1e-5);
    }

    #[test]
    fn test_lead_x_skips_marked_fliers() {
        let (mut population, _track, _sprites, _config) = setup(sinkers(2));
        assert_eq!(population.lead_x(), Some(230.0));
        population.fliers[0].alive = false;
        assert_eq!(population.lead_x(), Some(230.0));
        population.fliers[1].alive = false;
        assert_eq!(population.lead_x(), None);
    }
}
