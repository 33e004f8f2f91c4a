//! Display and output formatting utilities

use crate::board::{ForbiddenTable, Mask};
use crate::config::OutputFormat;
use crate::dispatch::LaunchReport;
use anyhow::{Context, Result};
use std::path::Path;

/// Format launch reports for display
pub struct ReportFormatter;

impl ReportFormatter {
    /// Format the outcome of one launch for console output
    pub fn format_report(report: &LaunchReport) -> String {
        let mut output = String::new();

        output.push_str(&format!("=== N = {} ===\n", report.n));
        output.push_str(&format!("Solutions: {}\n", report.total()));
        output.push_str(&format!(
            "Constellations: {} ({} cells incl. padding)\n",
            report.constellations(),
            report.counts.len()
        ));
        output.push_str(&format!("Distinct (j, k, l): {}\n", report.triples.len()));
        output.push_str(&format!("Solve Time: {:.3}s\n", report.duration.as_secs_f64()));
        output.push_str(&format!(
            "Steps: {} descents, {} ascents\n",
            report.stats.descents, report.stats.ascents
        ));

        output
    }

    /// Format the per-triple counts as a table
    pub fn format_triple_summary(report: &LaunchReport, limit: usize) -> String {
        let mut output = String::new();

        output.push_str("Triple Summary:\n");
        output.push_str("  j |  k |  l | Constellations | Solutions\n");
        output.push_str("----|----|----|----------------|----------\n");

        for triple in report.triples.iter().take(limit) {
            match triple.jkl {
                Some(jkl) => output.push_str(&format!("{:3} |{:3} |{:3} ", jkl.j, jkl.k, jkl.l)),
                None => output.push_str("  - |  - |  - "),
            }
            output.push_str(&format!("| {:14} | {}\n", triple.constellations, triple.solutions));
        }
        if report.triples.len() > limit {
            output.push_str(&format!("... {} more\n", report.triples.len() - limit));
        }

        output
    }

    /// Format a forbidden table with row and column numbers
    pub fn format_table_with_coords<M: Mask>(table: &ForbiddenTable<M>) -> String {
        let mut output = String::new();

        output.push_str("   ");
        for x in 0..table.n() {
            output.push_str(&format!("{:2}", x % 10));
        }
        output.push('\n');

        for (y, line) in table.to_string().lines().enumerate() {
            output.push_str(&format!("{:2} ", y));
            for cell in line.chars() {
                output.push(cell);
                output.push(cell);
            }
            output.push('\n');
        }

        output
    }

    /// Save a report to the output directory based on output format
    pub fn save_report<P: AsRef<Path>>(report: &LaunchReport, output_dir: P, format: OutputFormat) -> Result<()> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

        match format {
            OutputFormat::Text => {
                let filepath = output_dir.join(format!("board_{}.txt", report.n));
                let mut content = Self::format_report(report);
                content.push('\n');
                content.push_str(&Self::format_triple_summary(report, usize::MAX));
                std::fs::write(&filepath, content)
                    .with_context(|| format!("Failed to write {}", filepath.display()))?;
            }
            OutputFormat::Json => {
                let filepath = output_dir.join(format!("board_{}.json", report.n));
                let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
                std::fs::write(&filepath, json)
                    .with_context(|| format!("Failed to write {}", filepath.display()))?;
            }
        }

        Ok(())
    }
}

/// Progress indicator for long-running operations
pub struct ProgressIndicator {
    total: usize,
    current: usize,
    last_update: std::time::Instant,
    start_time: std::time::Instant,
}

impl ProgressIndicator {
    /// Create a new progress indicator
    pub fn new(total: usize) -> Self {
        let now = std::time::Instant::now();
        Self {
            total,
            current: 0,
            last_update: now,
            start_time: now,
        }
    }

    /// Update progress and optionally display
    pub fn update(&mut self, current: usize) {
        self.current = current.min(self.total);
        let now = std::time::Instant::now();

        // Update display every 100ms
        if now.duration_since(self.last_update).as_millis() > 100 {
            self.display();
            self.last_update = now;
        }
    }

    pub fn fraction(&self) -> f64 {
        if self.total > 0 {
            self.current as f64 / self.total as f64
        } else {
            0.0
        }
    }

    /// Display current progress
    pub fn display(&self) {
        let elapsed = self.start_time.elapsed();
        let eta = if self.current > 0 {
            let rate = self.current as f64 / elapsed.as_secs_f64();
            let remaining = (self.total - self.current) as f64 / rate;
            format!("ETA: {:.1}s", remaining)
        } else {
            "ETA: --".to_string()
        };

        print!(
            "\rProgress: {}/{} ({:.1}%) - {}",
            self.current,
            self.total,
            self.fraction() * 100.0,
            eta
        );
        std::io::Write::flush(&mut std::io::stdout()).ok();
    }

    /// Finish and clear the progress line
    pub fn finish(&self) {
        println!(
            "\rCompleted: {}/{} (100.0%) - Total time: {:.1}s",
            self.total,
            self.total,
            self.start_time.elapsed().as_secs_f64()
        );
    }
}

/// Color output utilities
pub struct ColorOutput;

impl ColorOutput {
    /// Format text with color (if terminal supports it)
    pub fn colored(text: &str, color: Color) -> String {
        if Self::supports_color() {
            format!("\x1b[{}m{}\x1b[0m", color.code(), text)
        } else {
            text.to_string()
        }
    }

    /// Check if terminal supports color
    fn supports_color() -> bool {
        std::env::var("NO_COLOR").is_err() && (std::env::var("TERM").unwrap_or_default() != "dumb")
    }

    /// Format success message
    pub fn success(text: &str) -> String {
        Self::colored(text, Color::Green)
    }

    /// Format error message
    pub fn error(text: &str) -> String {
        Self::colored(text, Color::Red)
    }

    /// Format warning message
    pub fn warning(text: &str) -> String {
        Self::colored(text, Color::Yellow)
    }

    /// Format info message
    pub fn info(text: &str) -> String {
        Self::colored(text, Color::Blue)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Color {
    fn code(self) -> u8 {
        match self {
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
        }
    }
}
