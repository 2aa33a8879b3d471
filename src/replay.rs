use std::fmt;

use tracing::info;

use crate::{
    cache::{Cache, Geometry, Stats},
    error::Result,
    replace::AccessResult,
    trace::{Access, AccessKind},
};

/// Cache accesses performed for one trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replayed {
    /// Instruction fetches never touch the data cache.
    Skipped,
    Once(AccessResult),
    /// A modify: the load, then the store to the same address.
    Twice(AccessResult, AccessResult),
}

impl Replayed {
    pub fn results(self) -> impl Iterator<Item = AccessResult> {
        let (first, second) = match self {
            Replayed::Skipped => (None, None),
            Replayed::Once(r) => (Some(r), None),
            Replayed::Twice(load, store) => (Some(load), Some(store)),
        };
        first.into_iter().chain(second)
    }
}

/// Formats as the tail of a verbose trace line, e.g. ` miss eviction hit`.
impl fmt::Display for Replayed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in self.results() {
            write!(f, " {result}")?;
        }
        Ok(())
    }
}

/// One simulation run: owns the cache and its counters until `finish`.
#[derive(Debug)]
pub struct Simulation {
    cache: Cache,
}

impl Simulation {
    pub fn new(geometry: Geometry) -> Result<Self> {
        info!(%geometry, "building cache");
        Ok(Simulation {
            cache: Cache::new(geometry)?,
        })
    }

    pub fn replay_record(&mut self, access: &Access) -> Replayed {
        match access.kind {
            AccessKind::Instruction => Replayed::Skipped,
            AccessKind::Load | AccessKind::Store => Replayed::Once(self.cache.access(access.addr)),
            AccessKind::Modify => {
                let load = self.cache.access(access.addr);
                let store = self.cache.access(access.addr);
                Replayed::Twice(load, store)
            }
        }
    }

    /// Replays records strictly in order, reporting each one to `observe`.
    /// Stops at the first read error or the first error from `observe`.
    pub fn replay<I, F>(&mut self, records: I, mut observe: F) -> Result<()>
    where
        I: IntoIterator<Item = Result<Access>>,
        F: FnMut(&Access, Replayed) -> Result<()>,
    {
        for access in records {
            let access = access?;
            let replayed = self.replay_record(&access);
            observe(&access, replayed)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> Stats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Ends the run, releasing the cache.
    pub fn finish(self) -> Stats {
        let stats = self.cache.stats();
        info!(
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            "simulation finished"
        );
        stats
    }
}

/// Runs an in-memory trace against a fresh cache.
pub fn simulate(geometry: Geometry, records: &[Access]) -> Result<Stats> {
    let mut sim = Simulation::new(geometry)?;
    for access in records {
        sim.replay_record(access);
    }
    Ok(sim.finish())
}
