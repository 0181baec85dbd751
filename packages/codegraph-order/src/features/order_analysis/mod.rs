/*
 * Order (Typestate) Analysis
 *
 * Checks that operations on an object follow a required call order,
 * e.g. `create, init, (start, process*, finish)+, reset?`.
 *
 * Architecture:
 * - Domain: order expressions, typestate NFA, weight semiring, WPDS, verdicts
 * - Application: OrderAnalyzer, sequential NFA walker
 * - Infrastructure: NFA compiler, rule builder, post-* saturation,
 *   result interpreter, policy parser
 * - Ports: ProgramGraphProvider, OrderRuleSource
 *
 * Algorithm (pushdown modes):
 * - Each order becomes an NFA; NFA transitions are the weights
 * - Program statements become normal/push/pop rules over (variable, statement)
 * - Post-* saturation from the first operation of each variable
 * - ERROR reachable → violation; non-accepting state at exit → incomplete
 *
 * References:
 * - Reps, Schwoon, Jha, Melski (2005) "Weighted pushdown systems and their
 *   application to interprocedural dataflow analysis"
 * - Strom & Yellin (1993) "Typestate"
 */

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{
    Nfa, OrderExpr, OrderReport, OrderRule, OrderVerdict, OrderViolation, RepetitionOp, Semiring,
    ViolationKind, Weight,
};

pub use application::{OrderAnalyzer, SequentialWalker};

pub use infrastructure::{NfaBuilder, OperationRegistry, OrderPolicy, PolicyParseError, PolicyParser};

pub use ports::{OrderRuleSource, ProgramGraphProvider};
