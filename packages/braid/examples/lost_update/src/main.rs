#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use braid_lost_update::{Register, simulate};
use clap::Parser;
use thiserror::Error;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Sweep scheduler seeds looking for lost updates to a shared register"
)]
struct Args {
    /// Number of consecutive seeds to run
    #[arg(long, default_value_t = 64)]
    seeds: u64,

    /// First seed of the sweep. Defaults to BRAID_SEED (a number, or `random`
    /// for a fresh one), or 0
    #[arg(long, value_name = "SEED")]
    first_seed: Option<u64>,

    #[arg(long, default_value_t = 2)]
    mutators: usize,

    /// Increments performed by each mutator
    #[arg(long, default_value_t = 2)]
    mutations: usize,

    /// Let the register answer reads while a write is outstanding
    #[arg(long)]
    racy: bool,
}

#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Braid(#[from] braid::Error),
    #[error("{failing} of {total} seeds lost updates")]
    LostUpdates { failing: usize, total: u64 },
}

fn main() -> Result<(), Error> {
    pretty_env_logger::init();

    let args = Args::parse();
    let first = args.first_seed.unwrap_or_else(braid::random::initial_seed);
    let kind = if args.racy {
        Register::Racy
    } else {
        Register::Serialized
    };

    println!(
        "Sweeping {} seeds from {first}: {kind} register, {} mutators x {} mutations",
        args.seeds, args.mutators, args.mutations,
    );

    let mut failing = vec![];

    for seed in first..first.saturating_add(args.seeds) {
        let report = simulate(seed, kind, args.mutators, args.mutations)?;
        log::debug!(
            "seed={seed} value={} completed={} steps={}",
            report.value,
            report.completed,
            report.steps
        );

        if report.lost_updates.is_empty() {
            continue;
        }

        println!(
            "seed={seed}: value={} after {} steps",
            report.value, report.steps
        );
        for lost in &report.lost_updates {
            println!("    expected {} but {} was written", lost.expected, lost.written);
        }
        failing.push(seed);
    }

    let Some(replay) = failing.first() else {
        println!("No lost updates");
        return Ok(());
    };

    println!(
        "Replay with: BRAID_SEED={replay} lost_update --seeds 1{}",
        if args.racy { " --racy" } else { "" },
    );

    Err(Error::LostUpdates {
        failing: failing.len(),
        total: args.seeds,
    })
}
