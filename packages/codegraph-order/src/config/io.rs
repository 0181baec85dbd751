//! Configuration I/O
//!
//! YAML schema types. Loading and export live in analysis_config.rs.

use super::analysis_config::{AnalysisMode, SeedStrategy};
use serde::{Deserialize, Serialize};

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: Option<u32>,

    /// Base preset
    pub preset: String,

    /// Fine-grained overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ConfigOverrides>,
}

/// Configuration overrides on top of a preset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AnalysisMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_strategy: Option<SeedStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_configurations: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_automaton: Option<bool>,
}
