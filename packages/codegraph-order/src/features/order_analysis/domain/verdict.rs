/*
 * Order Verdicts
 *
 * Findings of one order rule against one program:
 *   per tracked variable   PASS | VIOLATION | NOT_APPLICABLE
 *   per configuration      optional raw findings of the saturated automaton
 */

use serde::{Deserialize, Serialize};

use super::automaton::WeightedAutomaton;
use super::pushdown::{RuleCounts, Stmt, Val};
use super::weight::Weight;
use crate::shared::models::Span;

/// Default message of an `InvalidOrder` violation
pub const INVALID_ORDER_MESSAGE: &str = "operation not allowed in the current state";

/// Default message of an `IncompleteSequence` violation
pub const INCOMPLETE_SEQUENCE_MESSAGE: &str = "object not correctly terminated";

/// Violation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Operation not allowed in the current typestate
    InvalidOrder,

    /// Object leaves its scope before the order is complete
    IncompleteSequence,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::InvalidOrder => write!(f, "Invalid Order"),
            ViolationKind::IncompleteSequence => write!(f, "Incomplete Sequence"),
        }
    }
}

/// Order violation at a control location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderViolation {
    /// Tracked variable
    pub variable: String,

    /// Enclosing procedure of the violating location
    pub scope: String,

    /// Source text of the violating statement
    pub location: String,

    pub span: Option<Span>,

    pub kind: ViolationKind,

    /// Operations that would have been legal here
    pub expected: Vec<String>,

    pub message: String,
}

impl OrderViolation {
    pub fn new(
        variable: impl Into<String>,
        stmt: &Stmt,
        kind: ViolationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            scope: stmt.scope.clone(),
            location: stmt.code.clone(),
            span: stmt.span,
            kind,
            expected: Vec::new(),
            message: message.into(),
        }
    }

    pub fn with_expected(mut self, expected: Vec<String>) -> Self {
        self.expected = expected;
        self
    }

    pub fn line(&self) -> Option<u32> {
        self.span.map(|s| s.start_line)
    }

    pub fn format_message(&self) -> String {
        let line = self
            .line()
            .map(|l| format!("Line {}", l))
            .unwrap_or_else(|| "Line ?".to_string());
        let mut msg = format!(
            "{}: {} on '{}' at '{}' - {}",
            line, self.kind, self.variable, self.location, self.message
        );
        if !self.expected.is_empty() {
            msg.push_str(&format!(" (expected one of: {})", self.expected.join(", ")));
        }
        msg
    }
}

impl std::fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format_message())
    }
}

/// Verdict for one tracked variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderVerdict {
    Pass,
    Violation(OrderViolation),

    /// No operation of the rule was observed on this variable
    NotApplicable,
}

impl OrderVerdict {
    pub fn is_violation(&self) -> bool {
        matches!(self, OrderVerdict::Violation(_))
    }

    pub fn violation(&self) -> Option<&OrderViolation> {
        match self {
            OrderVerdict::Violation(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedVerdict {
    pub val: Val,
    pub verdict: OrderVerdict,
}

/// Raw per-configuration finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FindingKind {
    /// Error typestate reachable
    Violation,

    /// Only accepting typestates reachable
    Pass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationFinding {
    pub val: Val,
    pub stmt: Stmt,
    pub kind: FindingKind,

    /// Names of the typestates reachable at this configuration
    pub states: Vec<String>,
}

/// Analysis statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// NFA size
    pub nfa_states: usize,
    pub nfa_transitions: usize,

    pub rules: RuleCounts,

    /// Number of initial configurations
    pub seeds: usize,

    /// Saturation (or walker) worklist iterations
    pub iterations: usize,

    /// Transitions in the saturated automaton
    pub automaton_transitions: usize,

    pub tracked_variables: usize,

    /// Analysis time (milliseconds)
    pub analysis_time_ms: u64,
}

/// Result of checking one order rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReport {
    pub rule_name: String,

    /// Per tracked variable, sorted by scope and name
    pub verdicts: Vec<TrackedVerdict>,

    /// Only filled when configured
    #[serde(default)]
    pub configurations: Vec<ConfigurationFinding>,

    /// Saturated automaton (WPDS modes only)
    #[serde(skip)]
    pub automaton: Option<WeightedAutomaton<Weight>>,

    pub stats: AnalysisStats,
}

impl OrderReport {
    pub fn new(rule_name: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            verdicts: Vec::new(),
            configurations: Vec::new(),
            automaton: None,
            stats: AnalysisStats::default(),
        }
    }

    pub fn violations(&self) -> Vec<&OrderViolation> {
        self.verdicts
            .iter()
            .filter_map(|v| v.verdict.violation())
            .collect()
    }

    pub fn has_violations(&self) -> bool {
        self.verdicts.iter().any(|v| v.verdict.is_violation())
    }

    /// Verdict of a variable in a scope
    pub fn verdict_for(&self, variable: &str, scope: &str) -> Option<&OrderVerdict> {
        self.verdicts
            .iter()
            .find(|v| v.val.variable == variable && v.val.scope == scope)
            .map(|v| &v.verdict)
    }

    /// Violation if any variable violates, PASS if any passes, else NOT_APPLICABLE
    pub fn overall(&self) -> OrderVerdict {
        if let Some(v) = self.violations().first() {
            return OrderVerdict::Violation((*v).clone());
        }
        if self
            .verdicts
            .iter()
            .any(|v| matches!(v.verdict, OrderVerdict::Pass))
        {
            OrderVerdict::Pass
        } else {
            OrderVerdict::NotApplicable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt() -> Stmt {
        Stmt::new("main", 2, "c.start()", Some(Span::line(7)))
    }

    #[test]
    fn test_violation_format() {
        let v = OrderViolation::new("c", &stmt(), ViolationKind::InvalidOrder, "not allowed")
            .with_expected(vec!["Cipher.create".to_string()]);
        let msg = v.format_message();
        assert!(msg.contains("Line 7"));
        assert!(msg.contains("Invalid Order"));
        assert!(msg.contains("expected one of: Cipher.create"));
    }

    #[test]
    fn test_overall_prefers_violation() {
        let mut report = OrderReport::new("r");
        assert_eq!(report.overall(), OrderVerdict::NotApplicable);

        report.verdicts.push(TrackedVerdict {
            val: Val::new("a", "main"),
            verdict: OrderVerdict::Pass,
        });
        assert_eq!(report.overall(), OrderVerdict::Pass);

        report.verdicts.push(TrackedVerdict {
            val: Val::new("b", "main"),
            verdict: OrderVerdict::Violation(OrderViolation::new(
                "b",
                &stmt(),
                ViolationKind::IncompleteSequence,
                "not correctly terminated",
            )),
        });
        assert!(report.overall().is_violation());
        assert_eq!(report.violations().len(), 1);
        assert_eq!(report.verdict_for("a", "main"), Some(&OrderVerdict::Pass));
    }

    #[test]
    fn test_verdict_json_tag() {
        let json = serde_json::to_string(&OrderVerdict::NotApplicable).unwrap();
        assert_eq!(json, r#"{"verdict":"NOT_APPLICABLE"}"#);
    }
}
