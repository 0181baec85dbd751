/*
 * Codegraph Order - Call Order / Typestate Analysis
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (Span, program graph)
 * - features/    : order_analysis (NFA → weights → WPDS → post-* → verdicts)
 * - config/      : Presets and YAML configuration
 * - errors       : Error taxonomy
 *
 * Performance:
 * - Rayon parallelism across independent order rules
 * - Weights bounded by one NFA's transition set
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Rule construction needs the full call context
#![allow(clippy::type_complexity)] // Nested index maps in saturation
#![allow(clippy::should_implement_trait)] // from_str naming intentional
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::collapsible_if)] // Readability over brevity
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Configuration (presets, YAML)
pub mod config;

/// Error types
pub mod errors;

/// Feature modules
pub mod features;

/// Shared models
pub mod shared;

pub use config::{AnalysisConfig, AnalysisMode, Preset, SeedStrategy};
pub use errors::{OrderAnalysisError, Result};
pub use features::order_analysis::{
    NfaBuilder, OperationRegistry, OrderAnalyzer, OrderExpr, OrderPolicy, OrderReport, OrderRule,
    OrderVerdict, OrderViolation, PolicyParser, ProgramGraphProvider, ViolationKind,
};
pub use shared::models::{CallSite, Operand, Procedure, ProgramGraph, ProgramNodeKind, Span};
