//! Configuration settings for the constellation counter

use crate::dispatch::{DistributionMode, Launch, TableSharing};
use crate::search::SearchVariant;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub board: BoardConfig,
    pub distribution: DistributionConfig,
    pub search: SearchConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub n: u32,
    pub mask_width: MaskWidth,
}

/// Register width of the occupancy masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MaskWidth {
    /// 32-bit masks up to n = 32, 64-bit masks above
    Auto,
    Bits32,
    Bits64,
}

impl MaskWidth {
    /// The concrete width used for an `n`-board
    pub fn resolve(self, n: u32) -> MaskWidth {
        match self {
            MaskWidth::Auto if n <= 32 => MaskWidth::Bits32,
            MaskWidth::Auto => MaskWidth::Bits64,
            width => width,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub mode: DistributionMode,
    pub workgroup_size: usize,
    pub workgroups: usize,
    pub table_sharing: TableSharing,
    pub local_memory_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub variant: SearchVariant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Workload file to solve; the board is enumerated when absent
    pub constellations_file: Option<PathBuf>,
    /// Rows placed below row 0 when enumerating
    pub preset_rows: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub save_results: bool,
    pub output_directory: PathBuf,
    /// Percentage step after which `solve` writes the partial results back to the workload
    /// file; 0 turns auto-saving off
    #[serde(default = "default_auto_save_step")]
    pub auto_save_percentage_step: u32,
}

fn default_auto_save_step() -> u32 {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            board: BoardConfig {
                n: 8,
                mask_width: MaskWidth::Auto,
            },
            distribution: DistributionConfig {
                mode: DistributionMode::JobPool,
                workgroup_size: 8,
                workgroups: 4,
                table_sharing: TableSharing::GroupLeader,
                local_memory_bytes: 48 * 1024,
            },
            search: SearchConfig {
                variant: SearchVariant::Canonical,
            },
            input: InputConfig {
                constellations_file: None,
                preset_rows: 3,
            },
            output: OutputConfig {
                format: OutputFormat::Text,
                save_results: true,
                output_directory: PathBuf::from("output/results"),
                auto_save_percentage_step: default_auto_save_step(),
            },
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a YAML file
    pub fn to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize settings")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        let n = self.board.n;
        if n > 64 {
            anyhow::bail!("Board size {} exceeds the widest supported masks (64)", n);
        }

        let launch = Launch::from_settings(self);
        let checked = match self.board.mask_width.resolve(n) {
            MaskWidth::Bits32 => launch.validate::<u32>(),
            _ => launch.validate::<u64>(),
        };
        checked.context("Invalid launch configuration")?;

        if self.output.auto_save_percentage_step > 100 {
            anyhow::bail!(
                "Auto-save step {}% is larger than 100%",
                self.output.auto_save_percentage_step
            );
        }

        if let Some(ref file) = self.input.constellations_file {
            if !file.exists() {
                anyhow::bail!("Constellations file does not exist: {}", file.display());
            }
        }

        Ok(())
    }

    /// Merge settings with command line overrides
    pub fn merge_with_cli(&mut self, cli_overrides: &CliOverrides) {
        if let Some(n) = cli_overrides.n {
            self.board.n = n;
        }
        if let Some(mode) = cli_overrides.mode {
            self.distribution.mode = mode;
        }
        if let Some(workgroup_size) = cli_overrides.workgroup_size {
            self.distribution.workgroup_size = workgroup_size;
        }
        if let Some(workgroups) = cli_overrides.workgroups {
            self.distribution.workgroups = workgroups;
        }
        if let Some(table_sharing) = cli_overrides.table_sharing {
            self.distribution.table_sharing = table_sharing;
        }
        if let Some(variant) = cli_overrides.variant {
            self.search.variant = variant;
        }
        if let Some(ref file) = cli_overrides.constellations_file {
            self.input.constellations_file = Some(file.clone());
        }
        if let Some(ref output_dir) = cli_overrides.output_dir {
            self.output.output_directory = output_dir.clone();
        }
        if let Some(step) = cli_overrides.auto_save_percentage_step {
            self.output.auto_save_percentage_step = step;
        }
    }
}

/// Command line overrides for settings
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub n: Option<u32>,
    pub mode: Option<DistributionMode>,
    pub workgroup_size: Option<usize>,
    pub workgroups: Option<usize>,
    pub table_sharing: Option<TableSharing>,
    pub variant: Option<SearchVariant>,
    pub constellations_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub auto_save_percentage_step: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config/default.yaml");

        let mut settings = Settings::default();
        settings.board.n = 12;
        settings.search.variant = SearchVariant::LastRowLookahead;
        settings.to_file(&path).unwrap();

        let loaded = Settings::from_file(&path).unwrap();
        assert_eq!(loaded.board.n, 12);
        assert_eq!(loaded.search.variant, SearchVariant::LastRowLookahead);
        assert_eq!(loaded.distribution.table_sharing, TableSharing::GroupLeader);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("mode: job_pool"));
        assert!(content.contains("variant: last_row_lookahead"));
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let mut settings = Settings::default();
        settings.board.n = 40;
        settings.board.mask_width = MaskWidth::Bits32;
        assert!(settings.validate().is_err());

        settings.board.mask_width = MaskWidth::Auto;
        settings.distribution.workgroup_size = 2;
        assert!(settings.validate().is_ok());

        settings.distribution.mode = DistributionMode::Static;
        assert!(settings.validate().is_err());

        settings.distribution.table_sharing = TableSharing::PerLane;
        settings.input.constellations_file = Some(PathBuf::from("does/not/exist.json"));
        assert!(settings.validate().is_err());

        settings.input.constellations_file = None;
        settings.output.auto_save_percentage_step = 150;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_auto_save_step_defaults_when_missing() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("old.yaml");

        let yaml = serde_yaml::to_string(&Settings::default()).unwrap();
        let without_step: String = yaml
            .lines()
            .filter(|line| !line.contains("auto_save_percentage_step"))
            .map(|line| format!("{line}\n"))
            .collect();
        std::fs::write(&path, without_step).unwrap();

        let loaded = Settings::from_file(&path).unwrap();
        assert_eq!(loaded.output.auto_save_percentage_step, 10);
    }

    #[test]
    fn test_mask_width_resolution() {
        assert_eq!(MaskWidth::Auto.resolve(32), MaskWidth::Bits32);
        assert_eq!(MaskWidth::Auto.resolve(33), MaskWidth::Bits64);
        assert_eq!(MaskWidth::Bits64.resolve(8), MaskWidth::Bits64);
    }

    #[test]
    fn test_cli_overrides() {
        let mut settings = Settings::default();
        settings.merge_with_cli(&CliOverrides {
            n: Some(10),
            mode: Some(DistributionMode::Static),
            table_sharing: Some(TableSharing::Precomputed),
            auto_save_percentage_step: Some(25),
            ..Default::default()
        });

        assert_eq!(settings.board.n, 10);
        assert_eq!(settings.distribution.mode, DistributionMode::Static);
        assert_eq!(settings.distribution.table_sharing, TableSharing::Precomputed);
        assert_eq!(settings.distribution.workgroups, 4);
        assert_eq!(settings.output.auto_save_percentage_step, 25);
    }
}
