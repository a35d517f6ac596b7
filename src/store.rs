//! Best-performer checkpointing
//!
//! The population offers a removed flier's decision function to a
//! [`BestTracker`] along with the session score at removal time. The tracker
//! persists a snapshot when the score beats both the checkpoint threshold
//! and every previously recorded best in this process.

use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::brain::{DecisionFunction, NetworkBrain};

/// Durable storage boundary for the best-performer record
pub trait BrainStore {
    fn save(&self, brain: &NetworkBrain) -> Result<()>;
    fn load(&self) -> Result<NetworkBrain>;
}

/// Single-file store using the checkpoint wire format
pub struct FileBrainStore {
    path: PathBuf,
}

impl FileBrainStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BrainStore for FileBrainStore {
    fn save(&self, brain: &NetworkBrain) -> Result<()> {
        let data = bincode_next::serde::encode_to_vec(brain, bincode_next::config::standard())
            .context("Failed to serialize brain")?;
        fs::write(&self.path, data)
            .with_context(|| format!("Failed to write brain file {}", self.path.display()))?;
        Ok(())
    }

    fn load(&self) -> Result<NetworkBrain> {
        let data = fs::read(&self.path)
            .with_context(|| format!("Failed to read brain file {}", self.path.display()))?;
        let (brain, _) =
            bincode_next::serde::decode_from_slice(&data, bincode_next::config::standard())
                .context("Failed to deserialize brain")?;
        Ok(brain)
    }
}

/// Process-lifetime record of the highest-scoring decision function
pub struct BestTracker {
    min_score: u32,
    best: Cell<Option<u32>>,
    store: Box<dyn BrainStore>,
}

impl BestTracker {
    pub fn new(min_score: u32, store: Box<dyn BrainStore>) -> Self {
        Self {
            min_score,
            best: Cell::new(None),
            store,
        }
    }

    /// Best score recorded so far, if any
    pub fn best_score(&self) -> Option<u32> {
        self.best.get()
    }

    /// Consider a removed flier's brain for checkpointing. Returns true if
    /// it became the new best. A store write failure is logged and does not
    /// fail the session.
    pub fn offer(&self, score: u32, brain: &dyn DecisionFunction) -> bool {
        if score <= self.min_score {
            return false;
        }
        if let Some(best) = self.best.get() {
            if score <= best {
                return false;
            }
        }
        let Some(snapshot) = brain.snapshot() else {
            log::debug!("Best candidate at score {score} has no serializable snapshot");
            return false;
        };

        match self.store.save(&snapshot) {
            Ok(()) => log::info!("Checkpointed new best brain at score {score}"),
            Err(e) => log::warn!("Failed to checkpoint best brain at score {score}: {e:#}"),
        }
        self.best.set(Some(score));
        true
    }
}
