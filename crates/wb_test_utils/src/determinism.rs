//! Replay checks for the combat simulation.
//!
//! A seeded fight must replay exactly so balance runs and bug reports can be
//! reproduced from a seed. The simulation guarantees this by keeping every
//! quantity in [`wb_core::math::Fixed`], visiting nodes and gems in a fixed
//! order and drawing all randomness from an injected
//! [`wb_core::rng::RandomSource`]. The helpers here catch regressions:
//!
//! - [`replay`] runs the same setup several times over one `dt` sequence
//! - [`replay_on_threads`] does the same on scoped threads
//! - [`first_divergence`] steps two copies in lockstep and reports the first
//!   tick whose events or state hash differ
//! - [`snapshot_survives_bytes`] checks the bincode snapshot round-trip

use std::thread;

use wb_core::events::TickEvents;
use wb_core::math::Fixed;
use wb_core::simulation::{CombatSimulation, CombatSnapshot};

/// Final state hashes of repeated runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// One hash per run, in run order.
    pub hashes: Vec<u64>,
    /// Ticks each run was stepped.
    pub ticks: usize,
}

impl ReplayReport {
    /// Whether every run ended in the same state.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Distinct final hashes (1 when deterministic).
    #[must_use]
    pub fn distinct(&self) -> usize {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique.len()
    }

    /// Fail the test with the hash list if runs disagreed.
    ///
    /// # Panics
    ///
    /// Panics if the runs did not all end in the same state.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic(),
            "combat replay diverged: {} runs of {} ticks gave {} distinct hashes {:?}",
            self.hashes.len(),
            self.ticks,
            self.distinct(),
            self.hashes
        );
    }
}

/// First tick at which two copies of a fight disagreed.
#[derive(Debug, Clone, PartialEq)]
pub struct Divergence {
    /// Tick number, starting at 1 (0 means the setups already differed).
    pub tick: usize,
    /// Events of the left copy on that tick.
    pub left: TickEvents,
    /// Events of the right copy on that tick.
    pub right: TickEvents,
}

fn step_all(sim: &mut CombatSimulation, dts: &[Fixed]) {
    for dt in dts {
        sim.tick(*dt);
    }
}

/// Run `setup` `runs` times over `dts` and collect the final hashes.
pub fn replay<F>(setup: F, dts: &[Fixed], runs: usize) -> ReplayReport
where
    F: Fn() -> CombatSimulation,
{
    let hashes = (0..runs)
        .map(|_| {
            let mut sim = setup();
            step_all(&mut sim, dts);
            sim.state_hash()
        })
        .collect();
    ReplayReport {
        hashes,
        ticks: dts.len(),
    }
}

/// Like [`replay`], one scoped thread per run.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn replay_on_threads<F>(setup: F, dts: &[Fixed], runs: usize) -> ReplayReport
where
    F: Fn() -> CombatSimulation + Sync,
{
    let setup = &setup;
    let hashes = thread::scope(|s| {
        let workers: Vec<_> = (0..runs)
            .map(|_| {
                s.spawn(move || {
                    let mut sim = setup();
                    step_all(&mut sim, dts);
                    sim.state_hash()
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().expect("replay worker panicked"))
            .collect()
    });
    ReplayReport {
        hashes,
        ticks: dts.len(),
    }
}

/// Step two copies in lockstep; `None` if they never disagree.
pub fn first_divergence<F>(setup: F, dts: &[Fixed]) -> Option<Divergence>
where
    F: Fn() -> CombatSimulation,
{
    let mut left = setup();
    let mut right = setup();
    if left.state_hash() != right.state_hash() {
        return Some(Divergence {
            tick: 0,
            left: TickEvents::default(),
            right: TickEvents::default(),
        });
    }

    for (i, dt) in dts.iter().enumerate() {
        let a = left.tick(*dt);
        let b = right.tick(*dt);
        if a != b || left.state_hash() != right.state_hash() {
            return Some(Divergence {
                tick: i + 1,
                left: a,
                right: b,
            });
        }
    }
    None
}

/// Whether a snapshot taken after `dts` decodes back to itself.
pub fn snapshot_survives_bytes<F>(setup: F, dts: &[Fixed]) -> bool
where
    F: Fn() -> CombatSimulation,
{
    let mut sim = setup();
    step_all(&mut sim, dts);
    let snapshot = sim.snapshot();
    snapshot
        .to_bytes()
        .and_then(|bytes| CombatSnapshot::from_bytes(&bytes))
        .is_ok_and(|decoded| decoded == snapshot)
}

/// `n` copies of `dt`.
#[must_use]
pub fn steady(dt: Fixed, n: usize) -> Vec<Fixed> {
    vec![dt; n]
}
