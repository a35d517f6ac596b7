//! Decision functions: the per-tick action source for a flier
//!
//! Every flier is driven through the same capability interface, whether the
//! action comes from a learned network or from an operator's key press. The
//! training driver owns creation and destruction of decision functions; the
//! core only calls `activate` and, on checkpointing, `snapshot`.

use anyhow::Result;
use ndarray::{array, Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

/// What a flier knows about the world this tick
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    /// The flier's own vertical position
    pub height: f32,
    /// Signed distance from the flier to the top of the gap opening
    pub gap_top_delta: f32,
    /// Signed distance from the flier to the bottom of the gap opening
    pub gap_bottom_delta: f32,
}

impl Observation {
    fn to_inputs(self) -> Array1<f32> {
        array![self.height, self.gap_top_delta, self.gap_bottom_delta]
    }
}

/// Maps an observation to an action scalar; outputs above the configured
/// flap threshold trigger a flap.
pub trait DecisionFunction {
    /// Produce the action for this tick. An `Err` marks the owning flier as
    /// failed for the tick without aborting the rest of the population.
    fn activate(&mut self, observation: Observation) -> Result<f32>;

    /// Serializable copy for the best-performer store, if this decision
    /// function supports one.
    fn snapshot(&self) -> Option<NetworkBrain> {
        None
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

/// Fixed-topology feed-forward network: 3 inputs, one tanh hidden layer,
/// sigmoid output. Weights are proposed by the external optimizer; the core
/// never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkBrain {
    w_hidden: Array2<f32>,
    b_hidden: Array1<f32>,
    w_out: Array1<f32>,
    b_out: f32,
}

impl NetworkBrain {
    pub const INPUTS: usize = 3;

    /// Build from explicit weights. `w_hidden` is `(hidden, 3)`, `b_hidden`
    /// and `w_out` are `(hidden,)`.
    pub fn new(w_hidden: Array2<f32>, b_hidden: Array1<f32>, w_out: Array1<f32>, b_out: f32) -> Self {
        assert_eq!(w_hidden.ncols(), Self::INPUTS);
        assert_eq!(w_hidden.nrows(), b_hidden.len());
        assert_eq!(w_hidden.nrows(), w_out.len());
        Self {
            w_hidden,
            b_hidden,
            w_out,
            b_out,
        }
    }

    /// Uniform random weights in [-1, 1], for seeding an initial generation
    pub fn random(hidden: usize, rng: &mut impl Rng) -> Self {
        Self {
            w_hidden: Array2::from_shape_fn((hidden, Self::INPUTS), |_| {
                rng.random_range(-1.0..=1.0)
            }),
            b_hidden: Array1::from_shape_fn(hidden, |_| rng.random_range(-1.0..=1.0)),
            w_out: Array1::from_shape_fn(hidden, |_| rng.random_range(-1.0..=1.0)),
            b_out: rng.random_range(-1.0..=1.0),
        }
    }

    fn forward(&self, inputs: &Array1<f32>) -> f32 {
        let hidden = (self.w_hidden.dot(inputs) + &self.b_hidden).mapv(f32::tanh);
        sigmoid(self.w_out.dot(&hidden) + self.b_out)
    }
}

impl DecisionFunction for NetworkBrain {
    fn activate(&mut self, observation: Observation) -> Result<f32> {
        Ok(self.forward(&observation.to_inputs()))
    }

    fn snapshot(&self) -> Option<NetworkBrain> {
        Some(self.clone())
    }
}

/// One-shot flap latch for the human-controlled flier. The input loop sets
/// the latch before a tick; activation consumes it.
#[derive(Debug, Clone, Default)]
pub struct PilotHandle(Rc<Cell<bool>>);

impl PilotHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a flap for the next tick
    pub fn press(&self) {
        self.0.set(true);
    }
}

/// Decision function driven by a [`PilotHandle`]
#[derive(Debug)]
pub struct PilotBrain {
    handle: PilotHandle,
}

impl PilotBrain {
    pub fn new() -> (Self, PilotHandle) {
        let handle = PilotHandle::new();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl DecisionFunction for PilotBrain {
    fn activate(&mut self, _observation: Observation) -> Result<f32> {
        Ok(if self.handle.0.take() { 1.0 } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn observation() -> Observation {
        Observation {
            height: 350.0,
            gap_top_delta: 100.0,
            gap_bottom_delta: -100.0,
        }
    }

    #[test]
    fn test_network_output_in_unit_interval() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        for _ in 0..20 {
            let mut brain = NetworkBrain::random(4, &mut rng);
            let action = brain.activate(observation()).unwrap();
            assert!((0.0..=1.0).contains(&action));
        }
    }

    #[test]
    fn test_network_is_deterministic() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let mut brain = NetworkBrain::random(4, &mut rng);
        let a = brain.activate(observation()).unwrap();
        let b = brain.activate(observation()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_explicit_weights() {
        // Zero weights leave only the output bias: sigmoid(0) = 0.5,
        // sigmoid(large) ~ 1
        let mut flat = NetworkBrain::new(
            Array2::zeros((2, 3)),
            Array1::zeros(2),
            Array1::zeros(2),
            0.0,
        );
        assert_eq!(flat.activate(observation()).unwrap(), 0.5);

        let mut eager = NetworkBrain::new(
            Array2::zeros((2, 3)),
            Array1::zeros(2),
            Array1::zeros(2),
            10.0,
        );
        assert!(eager.activate(observation()).unwrap() > 0.99);
    }

    #[test]
    fn test_network_snapshot_matches() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let brain = NetworkBrain::random(4, &mut rng);
        let mut snapshot = brain.snapshot().expect("network brains snapshot");
        let mut original = brain.clone();
        assert_eq!(
            snapshot.activate(observation()).unwrap(),
            original.activate(observation()).unwrap()
        );
    }

    #[test]
    fn test_pilot_latch_is_one_shot() {
        let (mut brain, handle) = PilotBrain::new();
        assert_eq!(brain.activate(observation()).unwrap(), 0.0);

        handle.press();
        assert_eq!(brain.activate(observation()).unwrap(), 1.0);
        // Consumed: no flap next tick unless pressed again
        assert_eq!(brain.activate(observation()).unwrap(), 0.0);
    }
}
