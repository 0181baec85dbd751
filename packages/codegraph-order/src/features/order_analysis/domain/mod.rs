/*
 * Order Analysis Domain Models
 *
 * Core types: order expressions, the typestate NFA, the weight semiring,
 * the weighted pushdown system and verdicts.
 */

mod automaton;
mod nfa;
mod order_expr;
mod pushdown;
mod verdict;
mod weight;

pub use automaton::{AutState, AutTransition, WeightedAutomaton};
pub use nfa::{
    Nfa, NfaTransition, StateId, StateNode, StateSignature, END_OP, ERROR_OP, START_OP,
};
pub use order_expr::{OrderExpr, OrderRule, RepetitionOp};
pub use pushdown::{
    NormalRule, PopRule, PushRule, Rule, RuleCounts, Stmt, Val, Wpds, EPSILON, RETURN_SLOT,
};
pub use verdict::{
    AnalysisStats, ConfigurationFinding, FindingKind, OrderReport, OrderVerdict, OrderViolation,
    TrackedVerdict, ViolationKind, INCOMPLETE_SEQUENCE_MESSAGE, INVALID_ORDER_MESSAGE,
};
pub use weight::{Semiring, Weight};
