//! Main CLI application for the N-Queens constellation counter

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nqueens_faf::{
    board::{create_example_workloads, Jkl, Workload},
    config::{CliOverrides, MaskWidth, OutputFormat, Settings},
    dispatch::{DistributionMode, TableSharing},
    search::{count_solutions, SearchVariant},
    utils::{ColorOutput, ProgressIndicator, ReportFormatter},
    board_constellations, count_board, Constellation, ForbiddenTable, Launch, LaunchReport, Mask,
    ResultBuffer,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nqueens_faf")]
#[command(about = "N-Queens constellation counter")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Launch parameters shared by the counting commands
#[derive(clap::Args)]
struct LaunchArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Work distribution (overrides config)
    #[arg(short, long, value_enum)]
    mode: Option<DistributionMode>,

    /// Lanes per workgroup (overrides config)
    #[arg(short = 'w', long)]
    workgroup_size: Option<usize>,

    /// Number of workgroups (overrides config)
    #[arg(short = 'g', long)]
    workgroups: Option<usize>,

    /// Forbidden table sharing (overrides config)
    #[arg(long, value_enum)]
    table_sharing: Option<TableSharing>,

    /// Search variant (overrides config)
    #[arg(long, value_enum)]
    variant: Option<SearchVariant>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl LaunchArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            mode: self.mode,
            workgroup_size: self.workgroup_size,
            workgroups: self.workgroups,
            table_sharing: self.table_sharing,
            variant: self.variant,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate all constellations of a board and count its solutions
    Count {
        #[command(flatten)]
        launch: LaunchArgs,

        /// Board size (overrides config)
        #[arg(short, long)]
        n: Option<u32>,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of (j, k, l) triples to list
        #[arg(long, default_value_t = 0)]
        show_triples: usize,
    },

    /// Count the constellations of a workload file and store the results in it
    Solve {
        #[command(flatten)]
        launch: LaunchArgs,

        /// Workload file (overrides config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Where to write the solved workload, defaults to the input file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save partial results every this many percent, 0 disables (overrides config)
        #[arg(long)]
        auto_save_step: Option<u32>,
    },

    /// Compare launch counts against a plain recursive solver
    Verify {
        #[command(flatten)]
        launch: LaunchArgs,

        /// Smallest board size
        #[arg(long, default_value_t = 4)]
        from: u32,

        /// Largest board size
        #[arg(long, default_value_t = 10)]
        to: u32,
    },

    /// Print the forbidden-cell table of a border configuration
    Table {
        /// Board size
        #[arg(short, long)]
        n: u32,

        /// Column of the last-row queen
        #[arg(short)]
        j: u32,

        /// Row of the left-border queen
        #[arg(short)]
        k: u32,

        /// Row of the right-border queen
        #[arg(short)]
        l: u32,
    },

    /// Create example configuration and workload files
    Setup {
        /// Directory to create files in
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Count { launch, n, output, show_triples } => {
            init_tracing(launch.verbose);
            count_command(launch, n, output, show_triples)
        }
        Commands::Solve { launch, input, output, auto_save_step } => {
            init_tracing(launch.verbose);
            solve_command(launch, input, output, auto_save_step)
        }
        Commands::Verify { launch, from, to } => {
            init_tracing(launch.verbose);
            verify_command(launch, from, to)
        }
        Commands::Table { n, j, k, l } => table_command(n, Jkl { j, k, l }),
        Commands::Setup { directory, force } => setup_command(directory, force),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // a subscriber may already be installed when running inside tests
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

fn load_settings(args: &LaunchArgs, overrides: &CliOverrides) -> Result<Settings> {
    let mut settings = if args.config.exists() {
        Settings::from_file(&args.config)
            .with_context(|| format!("Failed to load config from {}", args.config.display()))?
    } else {
        println!(
            "{}",
            ColorOutput::warning(&format!("Config file {} not found, using defaults", args.config.display()))
        );
        Settings::default()
    };

    settings.merge_with_cli(overrides);
    settings.validate().context("Configuration validation failed")?;

    if args.verbose {
        println!("Configuration:");
        println!("  Board: n = {} ({:?})", settings.board.n, settings.board.mask_width);
        println!(
            "  Distribution: {:?}, {} x {} lanes, {:?} tables",
            settings.distribution.mode,
            settings.distribution.workgroups,
            settings.distribution.workgroup_size,
            settings.distribution.table_sharing
        );
        println!("  Variant: {:?}", settings.search.variant);
        println!("  Output dir: {}", settings.output.output_directory.display());
        println!();
    }

    Ok(settings)
}

/// Writes the partial results of a workload back to disk each time another step of progress
/// has been made
struct AutoSave {
    workload: Workload,
    path: PathBuf,
    step: usize,
    saved_at: usize,
}

impl AutoSave {
    /// `None` when `step` is 0
    fn new(workload: Workload, path: PathBuf, step: u32) -> Option<Self> {
        if step == 0 {
            return None;
        }
        let step = step as usize;
        let len = workload.constellations.len().max(1);
        let solved = workload.solutions.iter().filter(|count| count.is_some()).count();
        let saved_at = solved * 100 / len / step * step;
        Some(Self { workload, path, step, saved_at })
    }

    /// Save if progress reached the next step; a finished buffer is left to the caller
    fn check(&mut self, results: &ResultBuffer) -> Result<bool> {
        if results.is_empty() {
            return Ok(false);
        }
        let percent = results.solved() * 100 / results.len();
        if percent >= 100 || percent < self.saved_at + self.step {
            return Ok(false);
        }

        self.workload.solutions = results.snapshot();
        self.workload
            .save(&self.path)
            .with_context(|| format!("Auto-save at {}% failed", percent))?;
        self.saved_at = percent;
        Ok(true)
    }
}

/// Run a launch on a worker thread while the current thread reports progress
fn run_with_progress<M: Mask>(
    launch: &Launch,
    constellations: &[Constellation<M>],
    previous: Option<&[Option<u64>]>,
    mut auto_save: Option<AutoSave>,
) -> Result<LaunchReport> {
    let results = launch.prepare(constellations, previous)?;
    let started = Instant::now();

    let stats = std::thread::scope(|scope| -> Result<_> {
        let worker = scope.spawn(|| launch.execute(constellations, &results));

        let mut progress = ProgressIndicator::new(results.len());
        while !worker.is_finished() {
            progress.update(results.solved());
            if let Some(saver) = auto_save.as_mut() {
                saver.check(&results)?;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        progress.finish();

        match worker.join() {
            Ok(stats) => Ok(stats),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })?;

    Ok(LaunchReport::new(
        launch.n,
        constellations,
        results.into_counts(),
        stats,
        started.elapsed(),
    ))
}

fn count_command(args: LaunchArgs, n: Option<u32>, output_dir: Option<PathBuf>, show_triples: usize) -> Result<()> {
    println!("{}", ColorOutput::info("♛ Starting N-Queens constellation counter"));

    let overrides = CliOverrides { n, output_dir, ..args.overrides() };
    let settings = load_settings(&args, &overrides)?;

    let report = match settings.board.mask_width.resolve(settings.board.n) {
        MaskWidth::Bits32 => count_with::<u32>(&settings)?,
        _ => count_with::<u64>(&settings)?,
    };

    println!(
        "{}",
        ColorOutput::success(&format!(
            "✅ {} solutions for n = {} in {:.3}s",
            report.total(),
            report.n,
            report.duration.as_secs_f64()
        ))
    );
    println!("\n{}", ReportFormatter::format_report(&report));
    if show_triples > 0 {
        println!("{}", ReportFormatter::format_triple_summary(&report, show_triples));
    }

    if settings.output.save_results {
        ReportFormatter::save_report(&report, &settings.output.output_directory, settings.output.format)
            .context("Failed to save report")?;
        println!(
            "{}",
            ColorOutput::success(&format!("Report saved to {}", settings.output.output_directory.display()))
        );
    }

    Ok(())
}

fn count_with<M: Mask>(settings: &Settings) -> Result<LaunchReport> {
    let launch = Launch::from_settings(settings);
    let constellations = board_constellations::<M>(settings)?;
    println!(
        "{}",
        ColorOutput::info(&format!("🧮 Searching {} constellations...", constellations.len()))
    );
    run_with_progress(&launch, &constellations, None, None)
}

fn solve_command(
    args: LaunchArgs,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    auto_save_step: Option<u32>,
) -> Result<()> {
    println!("{}", ColorOutput::info("♛ Solving workload"));

    let overrides = CliOverrides {
        constellations_file: input,
        auto_save_percentage_step: auto_save_step,
        ..args.overrides()
    };
    let mut settings = load_settings(&args, &overrides)?;

    let input = settings
        .input
        .constellations_file
        .clone()
        .context("No workload file given (use --input or input.constellations_file)")?;
    let mut workload = Workload::load(&input)?;

    // the board size comes from the workload
    settings.board.n = workload.n;
    settings.validate().context("Configuration does not fit the workload")?;

    if workload.previous().is_some() {
        println!(
            "{}",
            ColorOutput::info(&format!("Resuming at {:.1}% solved", workload.progress() * 100.0))
        );
    }

    let output = output.unwrap_or(input);
    let auto_save = AutoSave::new(
        workload.clone(),
        output.clone(),
        settings.output.auto_save_percentage_step,
    );

    let launch = Launch::from_settings(&settings);
    let report = match settings.board.mask_width.resolve(workload.n) {
        MaskWidth::Bits32 => {
            run_with_progress(&launch, &workload.unpack::<u32>(), workload.previous(), auto_save)?
        }
        _ => run_with_progress(&launch, &workload.unpack::<u64>(), workload.previous(), auto_save)?,
    };
    workload.record(&report.counts);
    workload.save(&output)?;

    println!(
        "{}",
        ColorOutput::success(&format!("✅ Raw sum {} written to {}", report.total(), output.display()))
    );
    println!("\n{}", ReportFormatter::format_report(&report));
    Ok(())
}

fn verify_command(args: LaunchArgs, from: u32, to: u32) -> Result<()> {
    println!("{}", ColorOutput::info(&format!("🔍 Verifying n = {}..={}", from, to)));

    let settings = load_settings(&args, &args.overrides())?;
    let mut failures = 0;

    for n in from.max(1)..=to {
        let mut board_settings = settings.clone();
        board_settings.board.n = n;
        board_settings.validate().with_context(|| format!("Configuration invalid for n = {n}"))?;

        let report = count_board(&board_settings)?;
        let expected = count_solutions(n);

        if report.total() == expected {
            println!("{}", ColorOutput::success(&format!("  n = {:2}: {} ✓", n, expected)));
        } else {
            failures += 1;
            println!(
                "{}",
                ColorOutput::error(&format!("  n = {:2}: got {}, expected {}", n, report.total(), expected))
            );
        }
    }

    if failures > 0 {
        anyhow::bail!("{} board size(s) disagree with the reference solver", failures);
    }
    println!("{}", ColorOutput::success("✅ All counts match"));
    Ok(())
}

fn table_command(n: u32, jkl: Jkl) -> Result<()> {
    if n == 0 || n > 64 {
        anyhow::bail!("Board size must be in 1..=64, got {}", n);
    }
    if jkl.j >= n || jkl.k >= n || jkl.l >= n {
        anyhow::bail!("j, k and l must be smaller than n = {}", n);
    }

    let table = ForbiddenTable::<u64>::build(n, jkl);
    println!("Forbidden cells for n = {} ({}):", n, jkl);
    println!("{}", ReportFormatter::format_table_with_coords(&table));
    Ok(())
}

fn setup_command(directory: PathBuf, force: bool) -> Result<()> {
    println!("{}", ColorOutput::info("🛠️  Setting up project structure..."));

    // Create directories
    let config_dir = directory.join("config");
    let input_dir = directory.join("input/workloads");
    let output_dir = directory.join("output/results");

    for dir in [&config_dir, &input_dir, &output_dir] {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    // Create default configuration
    let config_path = config_dir.join("default.yaml");
    if !config_path.exists() || force {
        let default_settings = Settings::default();
        default_settings
            .to_file(&config_path)
            .context("Failed to create default configuration")?;
        println!("Created: {}", config_path.display());
    } else {
        println!("Skipped: {} (already exists)", config_path.display());
    }

    create_example_workloads(&input_dir).context("Failed to create example workloads")?;
    println!("Created example workloads in: {}", input_dir.display());

    // Create example configuration variants
    let examples_dir = config_dir.join("examples");
    std::fs::create_dir_all(&examples_dir)?;

    let mut static_config = Settings::default();
    static_config.distribution.mode = DistributionMode::Static;
    static_config.distribution.table_sharing = TableSharing::Precomputed;
    static_config.to_file(&examples_dir.join("static.yaml"))?;

    let mut workload_config = Settings::default();
    workload_config.board.n = 10;
    workload_config.input.constellations_file = Some(PathBuf::from("input/workloads/board_10.json"));
    workload_config.output.format = OutputFormat::Json;
    workload_config.to_file(&examples_dir.join("workload.yaml"))?;

    println!("Created example configurations in: {}", examples_dir.display());

    println!("\n{}", ColorOutput::success("✅ Setup complete!"));
    println!("\nNext steps:");
    println!("1. Edit configuration files in {}", config_dir.display());
    println!("2. Run: cargo run -- count --n 12");
    println!("3. Run: cargo run -- solve --input input/workloads/board_10.json");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "nqueens_faf",
            "count",
            "--config",
            "test.yaml",
            "--n",
            "10",
            "--mode",
            "static",
            "--table-sharing",
            "precomputed",
        ]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["nqueens_faf", "verify", "--variant", "last-row-lookahead"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["nqueens_faf", "count", "--mode", "round-robin"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_setup_command() {
        let temp_dir = tempdir().unwrap();
        let result = setup_command(temp_dir.path().to_path_buf(), false);

        assert!(result.is_ok());
        assert!(temp_dir.path().join("config/default.yaml").exists());
        assert!(temp_dir.path().join("input/workloads/board_8.json").exists());
    }

    fn pool_args(temp_dir: &tempfile::TempDir) -> LaunchArgs {
        LaunchArgs {
            config: temp_dir.path().join("missing.yaml"),
            mode: Some(DistributionMode::JobPool),
            workgroup_size: Some(4),
            workgroups: Some(2),
            table_sharing: Some(TableSharing::PerLane),
            variant: None,
            verbose: false,
        }
    }

    #[test]
    fn test_solve_fresh_workload() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("board_8.json");

        let constellations = nqueens_faf::board::enumerate::<u32>(8, 2).unwrap();
        let mut workload = Workload::new(8, &constellations).unwrap();
        workload.save(&path).unwrap();

        solve_command(pool_args(&temp_dir), Some(path.clone()), None, None).unwrap();

        workload = Workload::load(&path).unwrap();
        assert_eq!(workload.total(), 92);
        assert_eq!(workload.progress(), 1.0);
    }

    #[test]
    fn test_auto_save_writes_steps() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("board_8.json");

        let constellations = nqueens_faf::board::enumerate::<u32>(8, 2).unwrap();
        let workload = Workload::new(8, &constellations).unwrap();
        let results = ResultBuffer::new(constellations.len());
        let mut saver = AutoSave::new(workload, path.clone(), 25).unwrap();

        assert!(!saver.check(&results).unwrap());
        assert!(!path.exists());

        let quarter = constellations.len().div_ceil(4);
        for index in 0..quarter {
            results.write(index, 0);
        }
        assert!(saver.check(&results).unwrap());
        assert!(!saver.check(&results).unwrap());

        let saved = Workload::load(&path).unwrap();
        assert_eq!(saved.solutions.iter().filter(|count| count.is_some()).count(), quarter);

        for index in quarter..constellations.len() {
            results.write(index, 0);
        }
        // completion is saved by the caller, not by the auto-saver
        assert!(!saver.check(&results).unwrap());
        assert!(AutoSave::new(saved, path, 0).is_none());
    }

    #[test]
    fn test_solve_resumes_auto_saved_workload() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("board_8.json");

        let constellations = nqueens_faf::board::enumerate::<u32>(8, 2).unwrap();
        let expected = Launch::new(8).run(&constellations, None).unwrap().counts;

        // interrupt a launch after the first half of the constellations
        let results = ResultBuffer::new(constellations.len());
        let half = constellations.len() / 2;
        for (index, count) in expected.iter().enumerate().take(half) {
            results.write(index, *count);
        }
        let workload = Workload::new(8, &constellations).unwrap();
        let mut saver = AutoSave::new(workload, path.clone(), 10).unwrap();
        assert!(saver.check(&results).unwrap());

        let partial = Workload::load(&path).unwrap();
        assert!(partial.previous().is_some());
        assert!(partial.progress() > 0.0 && partial.progress() < 1.0);

        solve_command(pool_args(&temp_dir), Some(path.clone()), None, Some(0)).unwrap();

        let solved = Workload::load(&path).unwrap();
        assert_eq!(solved.total(), 92);
        assert_eq!(solved.progress(), 1.0);
        let counts: Vec<u64> = solved.solutions.iter().flatten().copied().collect();
        assert_eq!(counts, expected);
    }

    #[test]
    fn test_verify_command() {
        let temp_dir = tempdir().unwrap();
        let args = LaunchArgs {
            config: temp_dir.path().join("missing.yaml"),
            mode: None,
            workgroup_size: None,
            workgroups: None,
            table_sharing: None,
            variant: Some(SearchVariant::LastRowLookahead),
            verbose: false,
        };
        assert!(verify_command(args, 1, 8).is_ok());
    }
}
