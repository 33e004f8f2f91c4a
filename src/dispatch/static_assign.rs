//! One constellation per lane, no shared mutable state beyond the result cells

use super::{Launch, ResultBuffer, Tables};
use crate::board::{Constellation, Mask};
use crate::search::{Lane, SearchStats};
use rayon::prelude::*;
use tracing::debug;

pub(crate) fn run<M: Mask>(
    launch: &Launch,
    constellations: &[Constellation<M>],
    tables: &Tables<M>,
    results: &ResultBuffer,
) -> SearchStats {
    debug!(lanes = constellations.len(), "static assignment");

    constellations
        .par_iter()
        .enumerate()
        .filter(|(index, _)| !results.is_solved(*index))
        .map_init(
            || Lane::new(launch.n, launch.variant),
            |lane, (index, constellation)| {
                let stats = tables.solve(lane, constellation);
                results.write(index, stats.solutions);
                stats
            },
        )
        .reduce(SearchStats::default, |mut total, stats| {
            total += stats;
            total
        })
}
