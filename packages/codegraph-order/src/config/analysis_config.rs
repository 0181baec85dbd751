//! Order analysis configuration
//!
//! Selects the engine (sequential walker, intraprocedural or
//! interprocedural WPDS), the seeding strategy and the saturation budget.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, ConfigResult};
use super::io::{ConfigExportV1, ConfigOverrides};
use super::preset::Preset;

/// Supported YAML schema versions
const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Upper bound for `max_iterations`
pub const MAX_ITERATIONS_LIMIT: usize = 10_000_000;

/// Analysis engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// WPDS with push/pop rules, all control-flow successors
    Interprocedural,

    /// WPDS without push/pop rules, first successor at branches
    Intraprocedural,

    /// Per-procedure NFA walk along the CFG
    SequentialWalker,
}

impl AnalysisMode {
    pub fn uses_wpds(&self) -> bool {
        !matches!(self, AnalysisMode::SequentialWalker)
    }
}

/// Initial configuration strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedStrategy {
    /// Earliest statement that leaves the START typestate, per variable
    FirstEvent,

    /// Every variable declaration
    Declarations,
}

/// Order analysis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Preset this configuration started from
    pub preset: Preset,

    pub mode: AnalysisMode,

    pub seed_strategy: SeedStrategy,

    /// Saturation worklist budget
    pub max_iterations: usize,

    /// Include raw per-configuration findings in reports
    pub report_configurations: bool,

    /// Keep the saturated automaton in reports
    pub keep_automaton: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::from_preset(Preset::default())
    }
}

impl AnalysisConfig {
    pub fn from_preset(preset: Preset) -> Self {
        let (mode, max_iterations) = match preset {
            Preset::Fast => (AnalysisMode::SequentialWalker, 10_000),
            Preset::Balanced => (AnalysisMode::Intraprocedural, 100_000),
            Preset::Thorough => (AnalysisMode::Interprocedural, 1_000_000),
        };
        Self {
            preset,
            mode,
            seed_strategy: SeedStrategy::FirstEvent,
            max_iterations,
            report_configurations: false,
            keep_automaton: false,
        }
    }

    pub fn mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn seed_strategy(mut self, strategy: SeedStrategy) -> Self {
        self.seed_strategy = strategy;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn report_configurations(mut self, enabled: bool) -> Self {
        self.report_configurations = enabled;
        self
    }

    pub fn keep_automaton(mut self, enabled: bool) -> Self {
        self.keep_automaton = enabled;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_iterations == 0 || self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(ConfigError::range_with_hint(
                "max_iterations",
                self.max_iterations,
                1,
                MAX_ITERATIONS_LIMIT,
                "Saturation needs a finite, positive iteration budget",
            ));
        }

        if self.mode == AnalysisMode::SequentialWalker
            && (self.report_configurations || self.keep_automaton)
        {
            return Err(ConfigError::Conflict {
                issue: "the sequential walker produces no pushdown configurations".to_string(),
                fix: "disable report_configurations/keep_automaton or pick a WPDS mode"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Load from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        let version = export.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = Preset::from_str(&export.preset)
            .map_err(|_| ConfigError::UnknownPreset(export.preset.clone()))?;

        let mut config = Self::from_preset(preset);
        if let Some(overrides) = export.overrides {
            config.apply(overrides);
        }

        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(strategy) = overrides.seed_strategy {
            self.seed_strategy = strategy;
        }
        if let Some(n) = overrides.max_iterations {
            self.max_iterations = n;
        }
        if let Some(enabled) = overrides.report_configurations {
            self.report_configurations = enabled;
        }
        if let Some(enabled) = overrides.keep_automaton {
            self.keep_automaton = enabled;
        }
    }

    /// Export as YAML v1 (preset plus the fields that differ from it)
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let base = Self::from_preset(self.preset);
        let overrides = ConfigOverrides {
            mode: (self.mode != base.mode).then_some(self.mode),
            seed_strategy: (self.seed_strategy != base.seed_strategy)
                .then_some(self.seed_strategy),
            max_iterations: (self.max_iterations != base.max_iterations)
                .then_some(self.max_iterations),
            report_configurations: (self.report_configurations != base.report_configurations)
                .then_some(self.report_configurations),
            keep_automaton: (self.keep_automaton != base.keep_automaton)
                .then_some(self.keep_automaton),
        };
        let has_overrides = overrides.mode.is_some()
            || overrides.seed_strategy.is_some()
            || overrides.max_iterations.is_some()
            || overrides.report_configurations.is_some()
            || overrides.keep_automaton.is_some();

        let export = ConfigExportV1 {
            version: Some(1),
            preset: self.preset.as_str().to_string(),
            overrides: has_overrides.then_some(overrides),
        };
        Ok(serde_yaml::to_string(&export)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(
            AnalysisConfig::from_preset(Preset::Fast).mode,
            AnalysisMode::SequentialWalker
        );
        assert_eq!(
            AnalysisConfig::from_preset(Preset::Balanced).mode,
            AnalysisMode::Intraprocedural
        );
        assert_eq!(AnalysisConfig::default().mode, AnalysisMode::Interprocedural);
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_range() {
        let config = AnalysisConfig::default().max_iterations(0);
        assert!(matches!(config.validate(), Err(ConfigError::Range { .. })));

        let config = AnalysisConfig::default().max_iterations(MAX_ITERATIONS_LIMIT + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_walker_conflicts_with_automaton() {
        let config = AnalysisConfig::from_preset(Preset::Fast).keep_automaton(true);
        assert!(matches!(config.validate(), Err(ConfigError::Conflict { .. })));
    }

    #[test]
    fn test_uses_wpds() {
        assert!(AnalysisMode::Interprocedural.uses_wpds());
        assert!(!AnalysisMode::SequentialWalker.uses_wpds());
    }
}
