//! Common test utilities for codegraph-order
//!
//! This module provides shared fixtures and builders for integration
//! tests.

mod builders;
mod fixtures;

// Re-export all utilities
#[allow(unused_imports)]
pub use builders::*;
#[allow(unused_imports)]
pub use fixtures::*;
