//! Distribution of constellations over lanes
//!
//! A [`Launch`] describes how a workload is spread: either every constellation is handed to
//! its own lane up front ([`DistributionMode::Static`]), or groups of lanes repeatedly claim
//! batches from a shared cursor ([`DistributionMode::JobPool`]). Both write one count per
//! constellation into a [`ResultBuffer`].

pub mod job_pool;
pub mod results;
pub mod static_assign;

pub use results::{ResultBuffer, UNSOLVED};

use crate::board::{Constellation, ForbiddenTable, Jkl, Mask, TableSet};
use crate::config::Settings;
use crate::error::LaunchError;
use crate::search::{Lane, SearchStats, SearchVariant};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    /// One constellation per lane
    Static,
    /// Groups of lanes claim batches from a shared cursor
    #[default]
    JobPool,
}

/// Where lanes get their forbidden-cell tables from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TableSharing {
    /// Every lane builds its own table
    PerLane,
    /// One table per distinct triple, built before the launch
    Precomputed,
    /// Lane 0 of each group builds the table of the current batch
    #[default]
    GroupLeader,
}

/// Parameters of one launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub n: u32,
    pub mode: DistributionMode,
    pub workgroup_size: usize,
    pub workgroups: usize,
    pub table_sharing: TableSharing,
    pub local_memory_bytes: usize,
    pub variant: SearchVariant,
}

impl Launch {
    pub fn new(n: u32) -> Self {
        Self {
            n,
            mode: DistributionMode::default(),
            workgroup_size: 8,
            workgroups: 4,
            table_sharing: TableSharing::default(),
            local_memory_bytes: 48 * 1024,
            variant: SearchVariant::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let distribution = &settings.distribution;
        Self {
            n: settings.board.n,
            mode: distribution.mode,
            workgroup_size: distribution.workgroup_size,
            workgroups: distribution.workgroups,
            table_sharing: distribution.table_sharing,
            local_memory_bytes: distribution.local_memory_bytes,
            variant: settings.search.variant,
        }
    }

    /// Local memory one workgroup occupies: a lane stack per lane plus one shared table
    pub fn local_memory_required<M: Mask>(&self) -> usize {
        let row = std::mem::size_of::<M>();
        let frame = 4 * row;
        let n = self.n as usize;
        self.workgroup_size * n * frame + n * row
    }

    /// Reject launch parameters that cannot run with `M`-wide masks
    pub fn validate<M: Mask>(&self) -> Result<(), LaunchError> {
        if self.n == 0 {
            return Err(LaunchError::EmptyBoard(self.n));
        }
        if self.n > M::BITS {
            return Err(LaunchError::BoardTooWide { n: self.n, bits: M::BITS });
        }
        if self.workgroup_size == 0 {
            return Err(LaunchError::EmptyWorkgroup);
        }
        if self.workgroups == 0 {
            return Err(LaunchError::NoWorkgroups);
        }
        let required = self.local_memory_required::<M>();
        if required > self.local_memory_bytes {
            return Err(LaunchError::LocalMemoryExceeded {
                lanes: self.workgroup_size,
                required,
                available: self.local_memory_bytes,
            });
        }
        if self.table_sharing == TableSharing::GroupLeader && self.mode == DistributionMode::Static {
            return Err(LaunchError::SharingNeedsGroups);
        }
        Ok(())
    }

    /// Validate everything and allocate the result cells for a workload
    pub fn prepare<M: Mask>(
        &self,
        constellations: &[Constellation<M>],
        previous: Option<&[Option<u64>]>,
    ) -> Result<ResultBuffer, LaunchError> {
        self.validate::<M>()?;
        for (index, constellation) in constellations.iter().enumerate() {
            constellation.validate(self.n, index)?;
        }
        match previous {
            Some(previous) if previous.len() != constellations.len() => Err(LaunchError::ResumeLengthMismatch {
                given: previous.len(),
                expected: constellations.len(),
            }),
            Some(previous) => Ok(ResultBuffer::resume(previous)),
            None => Ok(ResultBuffer::new(constellations.len())),
        }
    }

    /// Search every unsolved constellation and write its count into `results`
    ///
    /// `results` must come from [`Launch::prepare`] for the same workload.
    pub fn execute<M: Mask>(&self, constellations: &[Constellation<M>], results: &ResultBuffer) -> SearchStats {
        assert_eq!(constellations.len(), results.len(), "result buffer does not match the workload");

        let tables = match self.table_sharing {
            TableSharing::Precomputed => {
                let set = TableSet::build(self.n, constellations);
                info!(tables = set.len(), "precomputed forbidden tables");
                Tables::Precomputed(set)
            }
            TableSharing::PerLane | TableSharing::GroupLeader => Tables::PerLane,
        };

        match self.mode {
            DistributionMode::Static => static_assign::run(self, constellations, &tables, results),
            DistributionMode::JobPool => job_pool::run(self, constellations, &tables, results),
        }
    }

    /// Validate, search and collect the counts of a workload
    pub fn run<M: Mask>(
        &self,
        constellations: &[Constellation<M>],
        previous: Option<&[Option<u64>]>,
    ) -> Result<LaunchReport, LaunchError> {
        let results = self.prepare(constellations, previous)?;
        info!(
            n = self.n,
            mode = ?self.mode,
            constellations = constellations.len(),
            resumed = results.solved(),
            "launching"
        );

        let started = Instant::now();
        let stats = self.execute(constellations, &results);
        let report = LaunchReport::new(self.n, constellations, results.into_counts(), stats, started.elapsed());

        info!(
            solutions = report.total(),
            descents = stats.descents,
            elapsed_ms = report.duration.as_millis() as u64,
            "launch finished"
        );
        Ok(report)
    }
}

/// Table source shared by all lanes of a launch
pub(crate) enum Tables<M: Mask> {
    PerLane,
    Precomputed(TableSet<M>),
}

impl<M: Mask> Tables<M> {
    fn table_for(&self, n: u32, constellation: &Constellation<M>) -> Cow<'_, ForbiddenTable<M>> {
        if let Tables::Precomputed(set) = self {
            match set.get(constellation.jkl()) {
                Ok(table) => return Cow::Borrowed(table),
                Err(err) => warn!(%err, "building table in lane"),
            }
        }
        Cow::Owned(ForbiddenTable::for_constellation(n, constellation))
    }

    /// Search one constellation; sentinels are answered without touching the lane
    pub(crate) fn solve(&self, lane: &mut Lane<M>, constellation: &Constellation<M>) -> SearchStats {
        if constellation.is_sentinel() {
            return SearchStats::default();
        }
        let table = self.table_for(lane.n(), constellation);
        lane.solve(constellation, &table)
    }
}

/// Counts of all constellations sharing one `(j, k, l)` triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleSummary {
    /// `None` for constellations without border queens
    pub jkl: Option<Jkl>,
    pub constellations: usize,
    pub solutions: u64,
}

/// Outcome of a launch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchReport {
    pub n: u32,
    /// One count per input constellation, sentinels included
    pub counts: Vec<u64>,
    pub stats: SearchStats,
    pub duration: Duration,
    pub triples: Vec<TripleSummary>,
}

impl LaunchReport {
    pub fn new<M: Mask>(
        n: u32,
        constellations: &[Constellation<M>],
        counts: Vec<u64>,
        stats: SearchStats,
        duration: Duration,
    ) -> Self {
        let mut grouped: BTreeMap<Option<Jkl>, (usize, u64)> = BTreeMap::new();
        for (constellation, count) in constellations.iter().zip(&counts) {
            if constellation.is_sentinel() {
                continue;
            }
            let entry = grouped.entry(constellation.jkl()).or_default();
            entry.0 += 1;
            entry.1 += count;
        }
        let triples = grouped
            .into_iter()
            .map(|(jkl, (constellations, solutions))| TripleSummary { jkl, constellations, solutions })
            .collect();

        Self { n, counts, stats, duration, triples }
    }

    /// Plain sum of the per-constellation counts
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of real constellations searched or resumed
    pub fn constellations(&self) -> usize {
        self.triples.iter().map(|t| t.constellations).sum()
    }
}
