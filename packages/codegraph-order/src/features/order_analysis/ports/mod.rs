/*
 * Order Analysis Ports
 *
 * Interfaces for external integration: program graph front ends and
 * policy sources.
 */

use crate::features::order_analysis::domain::OrderRule;
use crate::features::order_analysis::infrastructure::OperationRegistry;
use crate::shared::models::{Procedure, ProgramGraph};

/// Program graph provider
///
/// Supplies, per procedure, an entry node and control-flow successor edges
/// over statement nodes. Implementations are read-only.
pub trait ProgramGraphProvider: Sync {
    fn procedures(&self) -> &[Procedure];

    fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures().iter().find(|p| p.name == name)
    }
}

impl ProgramGraphProvider for ProgramGraph {
    fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }
}

/// Source of order rules and the operation table they refer to
pub trait OrderRuleSource {
    fn rules(&self) -> Vec<OrderRule>;

    fn registry(&self) -> OperationRegistry;
}
