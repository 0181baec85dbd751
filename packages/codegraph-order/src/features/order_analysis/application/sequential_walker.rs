/*
 * Sequential NFA Walker
 *
 * Intraprocedural engine: walks each procedure's statements along the CFG
 * and steps the NFA for every operation on a tracked variable.
 *
 * # Algorithm
 * - Forward dataflow per procedure: (statement, variable) → set of NFA states
 * - Merge at join points by union (may-analysis); an untouched variable is
 *   in START
 * - An operation with no transition from any current state is reported
 *   ("not allowed, expected one of ...") and the variable moves to ERROR
 * - At exits, a variable in a non-accepting state is reported as not
 *   correctly terminated
 *
 * No aliasing beyond direct `lhs = rhs` copies and no calls into other
 * procedures. Cheaper than the pushdown engine, and less precise.
 */

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, warn};

use crate::features::order_analysis::domain::{
    Nfa, OrderVerdict, OrderViolation, StateId, Stmt, TrackedVerdict, Val, ViolationKind, Weight,
    INCOMPLETE_SEQUENCE_MESSAGE, INVALID_ORDER_MESSAGE,
};
use crate::features::order_analysis::infrastructure::{stmt_of, OperationRegistry, RuleBuilder};
use crate::features::order_analysis::ports::ProgramGraphProvider;
use crate::shared::models::{NodeId, Operand, Procedure, ProgramNodeKind};

/// Variable → possible NFA states
type StateMap = BTreeMap<String, BTreeSet<StateId>>;

/// Walker result for one rule
#[derive(Debug, Clone, Default)]
pub struct WalkResult {
    pub verdicts: Vec<TrackedVerdict>,

    /// Worklist iterations over all procedures
    pub iterations: usize,
}

pub struct SequentialWalker<'a> {
    nfa: &'a Nfa,
    rules: RuleBuilder<'a>,
    max_iterations: usize,
    message: Option<&'a str>,
}

impl<'a> SequentialWalker<'a> {
    pub fn new(nfa: &'a Nfa, registry: &'a OperationRegistry, max_iterations: usize) -> Self {
        Self {
            nfa,
            rules: RuleBuilder::new(nfa, registry).interprocedural(false),
            max_iterations,
            message: None,
        }
    }

    pub fn with_message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }

    pub fn walk<G: ProgramGraphProvider + ?Sized>(&self, graph: &G) -> WalkResult {
        let mut result = WalkResult::default();
        for procedure in graph.procedures() {
            let (verdicts, iterations) = self.walk_procedure(procedure);
            result.verdicts.extend(verdicts);
            result.iterations += iterations;
        }
        result
    }

    fn walk_procedure(&self, procedure: &Procedure) -> (Vec<TrackedVerdict>, usize) {
        let entry = procedure.entry();
        let mut in_states: FxHashMap<NodeId, StateMap> = FxHashMap::default();
        in_states.insert(entry, StateMap::new());

        // variable → earliest violation
        let mut violations: BTreeMap<String, OrderViolation> = BTreeMap::new();
        let mut tracked: BTreeSet<String> = BTreeSet::new();
        let escaped = copied_variables(procedure);
        let mut out_states: FxHashMap<NodeId, StateMap> = FxHashMap::default();

        let mut worklist: VecDeque<NodeId> = VecDeque::from([entry]);
        let mut iterations = 0;

        while let Some(id) = worklist.pop_front() {
            iterations += 1;
            if iterations > self.max_iterations {
                warn!(
                    procedure = %procedure.name,
                    max_iterations = self.max_iterations,
                    "Sequential walker stopped before reaching a fixed point"
                );
                break;
            }

            let mut states = in_states.get(&id).cloned().unwrap_or_default();
            self.transfer(procedure, id, &mut states, &mut tracked, &mut violations);

            if out_states.get(&id) == Some(&states) {
                continue;
            }
            out_states.insert(id, states.clone());

            for next in procedure.statement_successors(id) {
                let changed = match in_states.get_mut(&next) {
                    Some(incoming) => merge(incoming, &states) || !out_states.contains_key(&next),
                    None => {
                        in_states.insert(next, states.clone());
                        true
                    }
                };
                if changed && !worklist.contains(&next) {
                    worklist.push_back(next);
                }
            }
        }

        for exit in procedure.exits() {
            let Some(states) = out_states.get(&exit) else {
                continue;
            };
            for (variable, current) in states {
                if violations.contains_key(variable) || escaped.contains(variable) {
                    continue;
                }
                let pending: BTreeSet<StateId> = current
                    .iter()
                    .copied()
                    .filter(|s| *s != StateId::START && *s != StateId::ERROR && !self.nfa.is_end(*s))
                    .collect();
                if pending.is_empty() {
                    continue;
                }
                let stmt = stmt_of(procedure, exit);
                violations.insert(
                    variable.clone(),
                    OrderViolation::new(
                        variable.as_str(),
                        &stmt,
                        ViolationKind::IncompleteSequence,
                        self.message.unwrap_or(INCOMPLETE_SEQUENCE_MESSAGE),
                    )
                    .with_expected(self.nfa.expected_ops(&pending)),
                );
            }
        }

        let verdicts = tracked
            .into_iter()
            .map(|variable| {
                let verdict = match violations.remove(&variable) {
                    Some(violation) => OrderVerdict::Violation(violation),
                    None if self.reaches_end(&variable, &out_states) => OrderVerdict::Pass,
                    None => OrderVerdict::NotApplicable,
                };
                TrackedVerdict {
                    val: Val::new(variable, procedure.name.as_str()),
                    verdict,
                }
            })
            .collect();

        debug!(procedure = %procedure.name, iterations, "Sequential walk finished");
        (verdicts, iterations)
    }

    fn transfer(
        &self,
        procedure: &Procedure,
        id: NodeId,
        states: &mut StateMap,
        tracked: &mut BTreeSet<String>,
        violations: &mut BTreeMap<String, OrderViolation>,
    ) {
        let Some(node) = procedure.node(id) else {
            return;
        };

        let mut apply = |variable: &str, weight: &Weight, states: &mut StateMap| {
            let Some(transitions) = weight.transitions() else {
                return;
            };
            tracked.insert(variable.to_string());
            let current = states
                .get(variable)
                .cloned()
                .unwrap_or_else(|| BTreeSet::from([StateId::START]));
            if current.contains(&StateId::ERROR) {
                return;
            }
            let next: BTreeSet<StateId> = transitions
                .iter()
                .filter(|t| current.contains(&t.source))
                .map(|t| t.target)
                .collect();
            if next.is_empty() {
                let stmt: Stmt = stmt_of(procedure, id);
                let violation = OrderViolation::new(
                    variable,
                    &stmt,
                    ViolationKind::InvalidOrder,
                    self.message.unwrap_or(INVALID_ORDER_MESSAGE),
                )
                .with_expected(self.nfa.expected_ops(&current));
                let earlier = violations
                    .get(variable)
                    .and_then(|v| v.span)
                    .zip(stmt.span)
                    .map(|(old, new)| old.start() <= new.start())
                    .unwrap_or(false);
                if !earlier {
                    violations.insert(variable.to_string(), violation);
                }
                states.insert(variable.to_string(), BTreeSet::from([StateId::ERROR]));
            } else {
                states.insert(variable.to_string(), next);
            }
        };

        match &node.kind {
            ProgramNodeKind::MemberCall { base, op, .. } => {
                apply(base, &self.rules.weight_for(op), states);
            }
            ProgramNodeKind::Call(call) => {
                let weight = self.rules.weight_for(&call.callee);
                for arg in &call.args {
                    apply(arg, &weight, states);
                }
            }
            ProgramNodeKind::Declaration { lhs, rhs } => {
                states.remove(lhs);
                match rhs {
                    Some(Operand::Variable { name }) => copy_state(states, name, lhs),
                    Some(Operand::Call(call)) => {
                        apply(lhs, &self.rules.weight_for(&call.callee), states);
                    }
                    _ => {}
                }
            }
            ProgramNodeKind::Assignment { lhs, rhs } => {
                states.remove(lhs);
                match rhs {
                    Operand::Variable { name } => copy_state(states, name, lhs),
                    Operand::Call(call) => {
                        apply(lhs, &self.rules.weight_for(&call.callee), states);
                    }
                    Operand::Other => {}
                }
            }
            _ => {}
        }
    }

    fn reaches_end(&self, variable: &str, out_states: &FxHashMap<NodeId, StateMap>) -> bool {
        out_states
            .values()
            .filter_map(|states| states.get(variable))
            .flatten()
            .any(|s| *s != StateId::START && self.nfa.is_end(*s))
    }
}

/// Variables copied into another variable somewhere in the procedure
fn copied_variables(procedure: &Procedure) -> BTreeSet<String> {
    procedure
        .nodes
        .iter()
        .filter_map(|node| match &node.kind {
            ProgramNodeKind::Declaration {
                rhs: Some(Operand::Variable { name }),
                ..
            }
            | ProgramNodeKind::Assignment {
                rhs: Operand::Variable { name },
                ..
            } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

fn copy_state(states: &mut StateMap, from: &str, to: &str) {
    if let Some(current) = states.get(from).cloned() {
        states.insert(to.to_string(), current);
    }
}

/// Union `other` into `target`; a variable missing on one side is in START
fn merge(target: &mut StateMap, other: &StateMap) -> bool {
    let mut changed = false;
    for (variable, states) in target.iter_mut() {
        if !other.contains_key(variable) {
            changed |= states.insert(StateId::START);
        }
    }
    for (variable, states) in other {
        match target.get_mut(variable) {
            Some(entry) => {
                for state in states {
                    changed |= entry.insert(*state);
                }
            }
            None => {
                let mut joined = states.clone();
                joined.insert(StateId::START);
                target.insert(variable.clone(), joined);
                changed = true;
            }
        }
    }
    changed
}
