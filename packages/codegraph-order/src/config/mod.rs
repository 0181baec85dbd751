//! Configuration
//!
//! Two-tier configuration:
//! - Preset: `AnalysisConfig::from_preset(Preset::Thorough)`
//! - Overrides: builder methods or a versioned YAML file
//!
//! ```rust,ignore
//! use codegraph_order::config::{AnalysisConfig, Preset, SeedStrategy};
//!
//! let config = AnalysisConfig::from_preset(Preset::Balanced)
//!     .seed_strategy(SeedStrategy::Declarations);
//!
//! let config = AnalysisConfig::from_yaml("order-analysis.yaml")?;
//! ```

pub mod analysis_config;
pub mod error;
pub mod io;
pub mod preset;

pub use analysis_config::{AnalysisConfig, AnalysisMode, SeedStrategy, MAX_ITERATIONS_LIMIT};
pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigExportV1, ConfigOverrides};
pub use preset::Preset;
