use std::rc::Rc;

use clap::Parser;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use apiary::{
    BestTracker, BrainStore, DecisionFunction, FileBrainStore, FitnessCell, NetworkBrain,
    SimConfig, SimulationSession,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Population size for a single-generation evaluation
    #[arg(long, default_value = "50")]
    population: usize,

    /// Hidden-layer size of the randomly initialized networks
    #[arg(long, default_value = "4")]
    hidden: usize,

    /// Generation number reported in logs and snapshots
    #[arg(long, default_value = "0")]
    generation: u32,

    /// Override the configured RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Safety cap on ticks per session
    #[arg(long, default_value = "100000")]
    max_ticks: u64,

    /// Checkpoint file for the best-performing brain
    #[arg(long, default_value = "best.brain")]
    best: String,

    /// Replay a stored brain instead of evaluating a fresh batch
    #[arg(long)]
    replay: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut config = SimConfig::load()?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    match &args.replay {
        Some(path) => run_replay(config, path, args.max_ticks, args.generation),
        None => run_evaluation(config, &args),
    }
}

/// Evaluate one generation of randomly initialized networks. This is a
/// stand-in for the external evolutionary driver: it supplies the batch of
/// decision functions and fitness cells, then reads the results back.
fn run_evaluation(config: SimConfig, args: &Args) -> anyhow::Result<()> {
    log::info!("Starting evaluation");
    log::info!("  Generation: {}", args.generation);
    log::info!("  Population: {}", args.population);
    log::info!("  Seed: {}", config.seed);

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
    let cells: Vec<FitnessCell> = (0..args.population).map(|_| FitnessCell::new()).collect();
    let roster: Vec<(Box<dyn DecisionFunction>, FitnessCell)> = cells
        .iter()
        .map(|cell| {
            (
                Box::new(NetworkBrain::random(args.hidden, &mut rng)) as Box<dyn DecisionFunction>,
                cell.clone(),
            )
        })
        .collect();

    let tracker = Rc::new(BestTracker::new(
        config.scoring.min_checkpoint_score,
        Box::new(FileBrainStore::new(&args.best)),
    ));

    let mut session =
        SimulationSession::new(config, roster, args.generation, Some(tracker.clone()))?;

    let mut report = session.tick();
    while !report.terminated {
        if session.ticks() >= args.max_ticks {
            log::warn!("Tick cap {} reached, stopping session", args.max_ticks);
            session.stop();
            break;
        }
        report = session.tick();
    }

    let best_fitness = cells.iter().map(FitnessCell::get).fold(f32::MIN, f32::max);
    let avg_fitness =
        cells.iter().map(FitnessCell::get).sum::<f32>() / cells.len().max(1) as f32;

    log::info!(
        "Gen {}: score={}, best={:.2}, avg={:.2}, ticks={}",
        args.generation,
        session.score(),
        best_fitness,
        avg_fitness,
        session.ticks()
    );
    if let Some(best_score) = tracker.best_score() {
        log::info!("Best brain checkpointed to {} (score {})", args.best, best_score);
    }

    Ok(())
}

/// Run a single stored brain headlessly and report how far it gets
fn run_replay(
    config: SimConfig,
    path: &str,
    max_ticks: u64,
    generation: u32,
) -> anyhow::Result<()> {
    log::info!("Replaying stored brain from {path}");

    let brain = FileBrainStore::new(path).load()?;
    let cell = FitnessCell::new();
    let roster: Vec<(Box<dyn DecisionFunction>, FitnessCell)> =
        vec![(Box::new(brain), cell.clone())];

    let mut session = SimulationSession::new(config, roster, generation, None)?;

    let mut report = session.tick();
    while !report.terminated {
        if session.ticks() >= max_ticks {
            log::warn!("Tick cap {max_ticks} reached, stopping replay");
            session.stop();
            break;
        }
        report = session.tick();
    }

    log::info!(
        "Replay finished: score={}, fitness={:.2}, ticks={}",
        session.score(),
        cell.get(),
        session.ticks()
    );
    Ok(())
}
