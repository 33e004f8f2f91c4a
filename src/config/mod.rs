//! Configuration management for the constellation counter

pub mod settings;

pub use settings::{
    BoardConfig, CliOverrides, DistributionConfig, InputConfig, MaskWidth, OutputConfig, OutputFormat,
    SearchConfig, Settings,
};
