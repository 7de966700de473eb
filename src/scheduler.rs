use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracing::{debug, warn};

use crate::catalog::{self, Catalog, MediaEntry, ScanOptions};

/// Where a drained queue gets its next lap from.
#[derive(Debug, Clone)]
pub enum RefillSource {
    /// Reuse the catalog the scheduler was built with.
    Fixed,
    /// Rescan the media directory; fall back to the last catalog on failure.
    Rescan { root: PathBuf, options: ScanOptions },
}

/// Hands out media in shuffled laps.
///
/// Every cataloged entry is returned exactly once per lap. The lap is
/// reshuffled only when the queue has been fully drained, so a repeat can
/// only happen across a lap boundary.
pub struct RotationScheduler {
    state: Mutex<RotationState>,
    source: RefillSource,
}

struct RotationState {
    catalog: Catalog,
    queue: VecDeque<MediaEntry>,
    rng: StdRng,
    cycle: u64,
}

impl RotationScheduler {
    pub fn new(catalog: Catalog, source: RefillSource, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            state: Mutex::new(RotationState {
                catalog,
                queue: VecDeque::new(),
                rng,
                cycle: 0,
            }),
            source,
        }
    }

    /// Pop the next entry, reshuffling a fresh lap if the queue is drained.
    ///
    /// A rescan walks the media tree with the lock released; only the
    /// catalog swap and reshuffle happen under it.
    pub fn take_next(&self) -> MediaEntry {
        let seen_cycle = {
            let mut state = self.lock();
            if let Some(entry) = state.queue.pop_front() {
                return entry;
            }
            state.cycle
        };

        let fresh = self.rescan(seen_cycle);
        let mut state = self.lock();
        self.refill(&mut state, seen_cycle, fresh);
        // The catalog is never empty, so a refilled queue always has a head.
        match state.queue.pop_front() {
            Some(entry) => entry,
            None => unreachable!("refilled rotation queue is empty"),
        }
    }

    /// Entries left in the current lap.
    pub fn remaining(&self) -> usize {
        self.lock().queue.len()
    }

    /// Number of laps started so far.
    pub fn cycle(&self) -> u64 {
        self.lock().cycle
    }

    pub fn catalog_len(&self) -> usize {
        self.lock().catalog.len()
    }

    fn lock(&self) -> MutexGuard<'_, RotationState> {
        // Queue state is always consistent between statements, so a poisoned
        // lock is still safe to keep using.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rescan(&self, seen_cycle: u64) -> Option<Catalog> {
        let RefillSource::Rescan { root, options } = &self.source else {
            return None;
        };
        // The first lap uses the catalog from startup.
        if seen_cycle == 0 {
            return None;
        }
        match catalog::scan(root, options) {
            Ok(fresh) => Some(fresh),
            Err(err) => {
                warn!(error = %err, "rescan failed; reusing previous catalog");
                None
            }
        }
    }

    /// Start a new lap unless another caller already did since `seen_cycle`.
    /// `fresh` replaces the catalog only for the caller that starts the lap.
    fn refill(&self, state: &mut RotationState, seen_cycle: u64, fresh: Option<Catalog>) {
        if !state.queue.is_empty() {
            return;
        }
        if state.cycle == seen_cycle
            && let Some(fresh) = fresh
        {
            state.catalog = fresh;
        }

        let mut lap = state.catalog.entries().to_vec();
        lap.shuffle(&mut state.rng);
        state.queue = lap.into();
        state.cycle += 1;
        debug!(
            cycle = state.cycle,
            entries = state.queue.len(),
            "rotation queue reshuffled"
        );
    }
}
