//! Flier-population obstacle-course simulator
//!
//! This crate implements the simulation and fitness-evaluation engine for a
//! population of fliers navigating a horizontally-scrolling course of gap
//! pairs:
//! - Flap/gravity kinematics with asymmetric drag
//! - Procedural obstacle generation with bounded vertical continuity
//! - Pixel-mask collision detection
//! - Per-tick fitness accrual and population lifecycle
//! - Best-performer checkpointing
//!
//! The evolutionary optimizer, renderer, and input loop are external
//! collaborators: they supply decision functions and fitness cells, read
//! per-tick snapshots, and drive the session's tick loop.

pub mod brain;
pub mod collision;
pub mod config;
pub mod flier;
pub mod population;
pub mod session;
pub mod sprite;
pub mod store;
pub mod track;

// Re-export main types for convenience
pub use brain::{DecisionFunction, NetworkBrain, Observation, PilotBrain, PilotHandle};
pub use config::{ConfigError, SimConfig};
pub use flier::Flier;
pub use population::{FitnessCell, PopulationController};
pub use session::{SessionSnapshot, SessionState, SimulationSession, TickReport};
pub use sprite::{SpriteMask, SpriteSet};
pub use store::{BestTracker, BrainStore, FileBrainStore};
pub use track::{Obstacle, ObstacleTrack};
