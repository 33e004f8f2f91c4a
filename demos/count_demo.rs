//! Counting a board constellation by constellation
//!
//! Shows the pieces of the library in order: enumeration, forbidden tables, a single lane
//! searching one constellation, and a full launch over the whole workload.

use nqueens_faf::{
    board::{enumerate, ForbiddenTable},
    dispatch::{DistributionMode, TableSharing},
    search::{count_solutions, Lane, SearchVariant},
    Launch,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n = 10;
    println!("=== Constellation counting for n = {} ===\n", n);

    let constellations = enumerate::<u32>(n, 2)?;
    println!("Enumerated {} constellations", constellations.len());

    let first = constellations.first().ok_or("no constellations")?;
    println!("First constellation: {}", first);

    let table = ForbiddenTable::<u32>::for_constellation(n, first);
    println!("\nIts forbidden cells:\n{}", table);

    let mut lane = Lane::<u32>::new(n, SearchVariant::Canonical);
    let stats = lane.solve(first, &table);
    println!(
        "One lane: {} solutions, {} descents, {} ascents\n",
        stats.solutions, stats.descents, stats.ascents
    );

    let launch = Launch {
        mode: DistributionMode::JobPool,
        table_sharing: TableSharing::Precomputed,
        ..Launch::new(n)
    };
    let report = launch.run(&constellations, None)?;
    let expected = count_solutions(n);

    println!("Launch: {} solutions in {:.3}s", report.total(), report.duration.as_secs_f64());
    println!("Reference: {} solutions", expected);

    if report.total() != expected {
        return Err("launch and reference disagree".into());
    }
    println!("✅ Counts match");
    Ok(())
}
