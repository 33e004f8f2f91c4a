//! Dynamic job pool: groups of lanes claim batches from a shared cursor
//!
//! Group `g` starts on the batch at `g * workgroup_size`; the cursor starts right behind the
//! last initial batch. Every iteration each lane processes `base + lane`, then lane 0 claims
//! the next batch for the whole group with one `fetch_add`. Indices past the end of the
//! workload behave like sentinels, so trailing batches may be partially empty.
//!
//! Per batch a group passes two barriers. The first one follows the construction of the
//! group's shared table (when lane 0 builds it), the second one follows the publication of the
//! next base. Lane 0 writes the table only between the second and the first barrier, the other
//! lanes read it only between the first and the second.
//!
//! A panicking lane still passes both barriers of its batch so that its group never blocks.
//! The first payload is kept, lane 0 of every group stops claiming batches once it sees the
//! failure, and the payload is rethrown after all lanes have joined.

use super::{Launch, ResultBuffer, TableSharing, Tables};
use crate::board::{Constellation, ForbiddenTable, Jkl, Mask};
use crate::search::{Lane, SearchStats};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex, PoisonError, RwLock};
use tracing::debug;

struct Group<M: Mask> {
    barrier: Barrier,
    base: AtomicUsize,
    /// Table of the current batch and the triple it was built for
    table: RwLock<Option<(Option<Jkl>, ForbiddenTable<M>)>>,
}

pub(crate) fn run<M: Mask>(
    launch: &Launch,
    constellations: &[Constellation<M>],
    tables: &Tables<M>,
    results: &ResultBuffer,
) -> SearchStats {
    if constellations.is_empty() {
        return SearchStats::default();
    }

    let lanes = launch.workgroup_size;
    let cursor = AtomicUsize::new(launch.workgroups * lanes);
    let groups: Vec<Group<M>> = (0..launch.workgroups)
        .map(|g| Group {
            barrier: Barrier::new(lanes),
            base: AtomicUsize::new(g * lanes),
            table: RwLock::new(None),
        })
        .collect();

    debug!(
        groups = launch.workgroups,
        lanes_per_group = lanes,
        constellations = constellations.len(),
        "starting job pool"
    );

    let pool = Pool {
        launch,
        constellations,
        tables,
        results,
        cursor: &cursor,
        failed: AtomicBool::new(false),
        panic: Mutex::new(None),
    };
    let total = std::thread::scope(|scope| {
        let handles: Vec<_> = groups
            .iter()
            .enumerate()
            .flat_map(|(g, group)| (0..lanes).map(move |lane| (g, group, lane)))
            .map(|(g, group, lane)| {
                let pool = &pool;
                scope.spawn(move || pool.lane(g, group, lane))
            })
            .collect();

        let mut total = SearchStats::default();
        for handle in handles {
            match handle.join() {
                Ok(stats) => total += stats,
                Err(payload) => panic::resume_unwind(payload),
            }
        }
        total
    });

    let payload = pool.panic.into_inner().unwrap_or_else(PoisonError::into_inner);
    if let Some(payload) = payload {
        panic::resume_unwind(payload);
    }
    total
}

struct Pool<'a, M: Mask> {
    launch: &'a Launch,
    constellations: &'a [Constellation<M>],
    tables: &'a Tables<M>,
    results: &'a ResultBuffer,
    cursor: &'a AtomicUsize,
    failed: AtomicBool,
    panic: Mutex<Option<Box<dyn Any + Send>>>,
}

impl<M: Mask> Pool<'_, M> {
    fn lane(&self, g: usize, group: &Group<M>, lane: usize) -> SearchStats {
        let n = self.launch.n;
        let lanes = self.launch.workgroup_size;
        let max_index = self.constellations.len() - 1;
        let leader_builds = self.launch.table_sharing == TableSharing::GroupLeader;

        let mut searcher = Lane::<M>::new(n, self.launch.variant);
        let mut stats = SearchStats::default();
        let mut batches = 0usize;

        loop {
            let base = group.base.load(Ordering::Acquire);
            if base > max_index {
                break;
            }

            if leader_builds && lane == 0 {
                self.guarded(|| self.build_shared_table(group, base));
            }
            group.barrier.wait();

            let index = base + lane;
            if index <= max_index && !self.results.is_solved(index) {
                let constellation = &self.constellations[index];
                let found = self.guarded(|| {
                    let found = if leader_builds {
                        self.solve_shared(group, &mut searcher, constellation)
                    } else {
                        self.tables.solve(&mut searcher, constellation)
                    };
                    self.results.write(index, found.solutions);
                    found
                });
                stats += found.unwrap_or_default();
            }

            if lane == 0 {
                if self.failed.load(Ordering::Acquire) {
                    group.base.store(usize::MAX, Ordering::Release);
                    debug!(group = g, batch = base, "stopping after a lane panicked");
                } else {
                    let next = self.cursor.fetch_add(lanes, Ordering::Relaxed);
                    group.base.store(next, Ordering::Release);
                    debug!(group = g, batch = base, next, "claimed next batch");
                }
            }
            group.barrier.wait();
            batches += 1;
        }

        if lane == 0 {
            debug!(group = g, batches, "group finished");
        }
        stats
    }

    /// Run one step of a lane, keeping the first panic payload instead of unwinding
    fn guarded<T>(&self, step: impl FnOnce() -> T) -> Option<T> {
        match panic::catch_unwind(AssertUnwindSafe(step)) {
            Ok(value) => Some(value),
            Err(payload) => {
                let mut first = self.panic.lock().unwrap_or_else(PoisonError::into_inner);
                first.get_or_insert(payload);
                self.failed.store(true, Ordering::Release);
                None
            }
        }
    }

    fn build_shared_table(&self, group: &Group<M>, base: usize) {
        let end = (base + self.launch.workgroup_size).min(self.constellations.len());
        let key = self.constellations[base..end]
            .iter()
            .find(|c| !c.is_sentinel())
            .map(|c| c.jkl());

        let mut shared = group.table.write().unwrap_or_else(PoisonError::into_inner);
        // a batch of sentinels keeps the previous table
        if let Some(jkl) = key {
            if shared.as_ref().map(|(built, _)| *built) != Some(jkl) {
                let table = match jkl {
                    Some(jkl) => ForbiddenTable::build(self.launch.n, jkl),
                    None => ForbiddenTable::unrestricted(self.launch.n),
                };
                *shared = Some((jkl, table));
            }
        }
    }

    fn solve_shared(
        &self,
        group: &Group<M>,
        searcher: &mut Lane<M>,
        constellation: &Constellation<M>,
    ) -> SearchStats {
        if constellation.is_sentinel() {
            return SearchStats::default();
        }
        {
            let shared = group.table.read().unwrap_or_else(PoisonError::into_inner);
            if let Some((jkl, table)) = shared.as_ref() {
                if *jkl == constellation.jkl() {
                    return searcher.solve(constellation, table);
                }
            }
        }
        debug!(constellation = %constellation, "triple differs from batch, building private table");
        let table = ForbiddenTable::for_constellation(self.launch.n, constellation);
        searcher.solve(constellation, &table)
    }
}
