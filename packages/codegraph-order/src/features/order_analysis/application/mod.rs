/*
 * Order Analysis Application Layer
 *
 * Analyzer orchestration and the sequential walker engine.
 */

mod analyzer;
mod sequential_walker;

pub use analyzer::OrderAnalyzer;
pub use sequential_walker::{SequentialWalker, WalkResult};
