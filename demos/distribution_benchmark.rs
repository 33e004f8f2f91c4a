//! Benchmark comparing static assignment against the job pool
//!
//! Per-constellation search trees differ wildly in size. This tool runs the same workload
//! through every distribution/table-sharing combination and reports how long each takes.

use anyhow::{Context, Result};
use nqueens_faf::{
    board::{enumerate, pad_to_workgroups},
    dispatch::{DistributionMode, TableSharing},
    search::SearchVariant,
    Constellation, Launch,
};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct BenchmarkResult {
    mode: DistributionMode,
    sharing: TableSharing,
    variant: SearchVariant,
    run_times: Vec<Duration>,
    average_time: Duration,
    min_time: Duration,
    max_time: Duration,
    solutions: u64,
}

impl BenchmarkResult {
    fn new(mode: DistributionMode, sharing: TableSharing, variant: SearchVariant) -> Self {
        Self {
            mode,
            sharing,
            variant,
            run_times: Vec::new(),
            average_time: Duration::ZERO,
            min_time: Duration::MAX,
            max_time: Duration::ZERO,
            solutions: 0,
        }
    }

    fn add_run(&mut self, duration: Duration, solutions: u64) {
        self.run_times.push(duration);
        self.solutions = solutions;
        self.min_time = self.min_time.min(duration);
        self.max_time = self.max_time.max(duration);

        let total: Duration = self.run_times.iter().sum();
        self.average_time = total / self.run_times.len() as u32;
    }

    fn format_time(duration: Duration) -> String {
        format!("{:.3}s", duration.as_secs_f64())
    }

    fn display(&self) -> String {
        format!(
            "  {:?} / {:?} / {:?}:\n    Runs: [{}]\n    Avg: {} | Min: {} | Max: {} | Raw sum: {}",
            self.mode,
            self.sharing,
            self.variant,
            self.run_times
                .iter()
                .map(|d| Self::format_time(*d))
                .collect::<Vec<_>>()
                .join(", "),
            Self::format_time(self.average_time),
            Self::format_time(self.min_time),
            Self::format_time(self.max_time),
            self.solutions
        )
    }
}

struct BenchmarkSuite {
    results: Vec<BenchmarkResult>,
    n: u32,
    preset_rows: u32,
    runs_per_config: usize,
}

impl BenchmarkSuite {
    fn new(n: u32, preset_rows: u32, runs_per_config: usize) -> Self {
        Self {
            results: Vec::new(),
            n,
            preset_rows,
            runs_per_config,
        }
    }

    fn run(&mut self) -> Result<()> {
        println!("🚀 Starting distribution benchmark");
        println!("Board: n = {} ({} preset rows, {} runs per config)\n", self.n, self.preset_rows, self.runs_per_config);

        let constellations = enumerate::<u32>(self.n, self.preset_rows)?;
        let configs = [
            (DistributionMode::Static, TableSharing::PerLane, SearchVariant::Canonical),
            (DistributionMode::Static, TableSharing::Precomputed, SearchVariant::Canonical),
            (DistributionMode::JobPool, TableSharing::Precomputed, SearchVariant::Canonical),
            (DistributionMode::JobPool, TableSharing::GroupLeader, SearchVariant::Canonical),
            (DistributionMode::JobPool, TableSharing::GroupLeader, SearchVariant::LastRowLookahead),
        ];

        for (mode, sharing, variant) in configs {
            println!("🔄 Testing {:?} / {:?} / {:?}...", mode, sharing, variant);

            let launch = Launch {
                mode,
                table_sharing: sharing,
                variant,
                workgroup_size: 8,
                workgroups: 4,
                ..Launch::new(self.n)
            };
            let workload: Vec<Constellation<u32>> = if sharing == TableSharing::GroupLeader {
                pad_to_workgroups(constellations.clone(), launch.workgroup_size)
            } else {
                constellations.clone()
            };

            let mut result = BenchmarkResult::new(mode, sharing, variant);
            for run in 1..=self.runs_per_config {
                print!("  Run {}/{}: ", run, self.runs_per_config);

                let start = Instant::now();
                let report = launch
                    .run(&workload, None)
                    .with_context(|| format!("Launch {:?} / {:?} failed", mode, sharing))?;
                let duration = start.elapsed();

                println!("✅ {} ({} solutions)", BenchmarkResult::format_time(duration), report.total());
                result.add_run(duration, report.total());
            }

            self.results.push(result);
            println!();
        }

        Ok(())
    }

    fn generate_report(&self) {
        println!("═══════════════════════════════════════════════════════════");
        println!("📊 DISTRIBUTION BENCHMARK RESULTS");
        println!("═══════════════════════════════════════════════════════════");

        for result in &self.results {
            println!("{}", result.display());
        }
        println!();

        if let (Some(fixed), Some(pooled)) = (
            self.results.iter().find(|r| r.mode == DistributionMode::Static),
            self.results
                .iter()
                .filter(|r| r.mode == DistributionMode::JobPool)
                .min_by_key(|r| r.average_time),
        ) {
            let speedup = fixed.average_time.as_secs_f64() / pooled.average_time.as_secs_f64();
            println!("Best job pool vs static: {:.2}x", speedup);
        }

        let sums: Vec<u64> = self.results.iter().map(|r| r.solutions).collect();
        if sums.windows(2).all(|w| w[0] == w[1]) {
            println!("✅ All configurations agree");
        } else {
            println!("❌ Configurations disagree: {:?}", sums);
        }
    }
}

fn main() -> Result<()> {
    let mut benchmark = BenchmarkSuite::new(13, 3, 3);

    benchmark.run().context("Failed to run benchmark suite")?;
    benchmark.generate_report();

    Ok(())
}
