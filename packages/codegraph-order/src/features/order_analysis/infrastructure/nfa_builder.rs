/*
 * Order Expression → NFA compiler
 *
 * Frontier construction: the frontier is the set of states the next
 * terminal attaches to. It starts as {START}.
 *
 *   Terminal      new state n, frontier → n, frontier = {n}
 *   Sequence      left, then right from the updated frontier
 *   e?            frontier ∪= frontier before e
 *   e+            after e, frontier → every head of e (loop back)
 *   e*            as e+, plus frontier ∪= frontier before e
 *   l | r         both from the same frontier, union of results
 *
 * A head of a sub-expression is a state created inside it that received
 * an edge from the frontier it started with.
 *
 * The final frontier becomes accepting. The successor graph is then
 * determinised (subset construction, grouping successors by entity and
 * op), so one source has at most one target per label and a set of
 * typestates always means a set of paths. Accepting states are connected
 * to a fake END state, START's successors are marked start states and the
 * graph is flattened into labeled transitions (breadth-first, successors
 * sorted by name, label = target op).
 *
 * Unknown expression kinds are logged and skipped.
 */

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, warn};

use crate::features::order_analysis::domain::{
    Nfa, NfaTransition, OrderExpr, RepetitionOp, StateId, END_OP,
};

type Frontier = BTreeSet<StateId>;

/// Compiles order expressions into NFAs
pub struct NfaBuilder;

impl NfaBuilder {
    /// Compile one order expression
    pub fn build(expr: &OrderExpr) -> Nfa {
        let mut raw = Nfa::empty();

        let frontier = Self::add_expr(&mut raw, expr, BTreeSet::from([StateId::START]));
        for state in &frontier {
            if let Some(node) = raw.state_mut(*state) {
                node.is_end = true;
            }
        }

        let mut nfa = Self::determinize(&raw);

        let accepting: Vec<StateId> = nfa
            .states()
            .iter()
            .filter(|s| s.is_end)
            .map(|s| s.id)
            .collect();
        let end = nfa.add_state(None, END_OP);
        if let Some(node) = nfa.state_mut(end) {
            node.is_end = true;
            node.is_fake = true;
        }
        for state in accepting {
            nfa.add_successor(state, end);
        }

        let first: Vec<StateId> = nfa
            .state(StateId::START)
            .map(|s| s.successors.iter().copied().collect())
            .unwrap_or_default();
        for state in first {
            if let Some(node) = nfa.state_mut(state) {
                if !node.is_fake {
                    node.is_start = true;
                }
            }
        }

        let transitions = Self::populate_transitions(&nfa);
        nfa.set_transitions(transitions);

        debug!(
            raw_states = raw.states().len(),
            states = nfa.states().len(),
            transitions = nfa.transitions().len(),
            "Compiled order expression: {}",
            expr
        );
        nfa
    }

    fn add_expr(nfa: &mut Nfa, expr: &OrderExpr, frontier: Frontier) -> Frontier {
        match expr {
            OrderExpr::Terminal { entity, op } => {
                let n = nfa.add_state(Some(entity.clone()), op.clone());
                for state in &frontier {
                    nfa.add_successor(*state, n);
                }
                BTreeSet::from([n])
            }

            OrderExpr::Sequence { left, right } => {
                let frontier = Self::add_expr(nfa, left, frontier);
                Self::add_expr(nfa, right, frontier)
            }

            OrderExpr::Repetition { inner, op } => {
                let before = frontier.clone();
                let first_new = StateId(nfa.states().len() as u32);
                let mut after = Self::add_expr(nfa, inner, frontier);

                match op {
                    RepetitionOp::Optional => {}
                    RepetitionOp::OneOrMore | RepetitionOp::ZeroOrMore => {
                        let heads = Self::heads(nfa, &before, first_new);
                        for state in &after {
                            for head in &heads {
                                nfa.add_successor(*state, *head);
                            }
                        }
                    }
                }

                if matches!(op, RepetitionOp::Optional | RepetitionOp::ZeroOrMore) {
                    after.extend(before);
                }
                after
            }

            OrderExpr::Alternative { left, right } => {
                let mut left_frontier = Self::add_expr(nfa, left, frontier.clone());
                let right_frontier = Self::add_expr(nfa, right, frontier);
                left_frontier.extend(right_frontier);
                left_frontier
            }

            OrderExpr::Unsupported => {
                warn!("Skipping unsupported order expression node");
                frontier
            }
        }
    }

    /// Subset construction over the successor graph of `raw`
    ///
    /// Successors of a subset are grouped by `(entity, op)`; every group
    /// becomes one state. A state is accepting if any member is.
    fn determinize(raw: &Nfa) -> Nfa {
        let mut dfa = Nfa::empty();
        let initial = BTreeSet::from([StateId::START]);
        if raw.is_end(StateId::START) {
            if let Some(node) = dfa.state_mut(StateId::START) {
                node.is_end = true;
            }
        }

        let mut subsets: BTreeMap<BTreeSet<StateId>, StateId> = BTreeMap::new();
        subsets.insert(initial.clone(), StateId::START);
        let mut queue = VecDeque::from([initial]);

        while let Some(subset) = queue.pop_front() {
            let Some(from) = subsets.get(&subset).copied() else {
                continue;
            };

            let mut groups: BTreeMap<(Option<String>, String), Frontier> = BTreeMap::new();
            for member in subset.iter().filter_map(|s| raw.state(*s)) {
                for succ in &member.successors {
                    if let Some(node) = raw.state(*succ) {
                        groups
                            .entry((node.base.clone(), node.op.clone()))
                            .or_default()
                            .insert(*succ);
                    }
                }
            }

            for ((base, op), target) in groups {
                let to = match subsets.get(&target) {
                    Some(id) => *id,
                    None => {
                        let id = dfa.add_state(base, op);
                        if target.iter().any(|s| raw.is_end(*s)) {
                            if let Some(node) = dfa.state_mut(id) {
                                node.is_end = true;
                            }
                        }
                        subsets.insert(target.clone(), id);
                        queue.push_back(target);
                        id
                    }
                };
                dfa.add_successor(from, to);
            }
        }
        dfa
    }

    /// States created at or after `first_new` entered from `before`
    fn heads(nfa: &Nfa, before: &Frontier, first_new: StateId) -> Frontier {
        before
            .iter()
            .filter_map(|s| nfa.state(*s))
            .flat_map(|s| s.successors.iter().copied())
            .filter(|succ| *succ >= first_new)
            .collect()
    }

    fn populate_transitions(nfa: &Nfa) -> Vec<NfaTransition> {
        let mut transitions = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([StateId::START]);

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = nfa.state(id) else {
                continue;
            };
            let mut successors: Vec<(String, StateId)> = node
                .successors
                .iter()
                .map(|s| (nfa.state_name(*s), *s))
                .collect();
            successors.sort();

            for (_, succ) in successors {
                let label = nfa
                    .state(succ)
                    .map(|s| s.op.clone())
                    .unwrap_or_default();
                let transition = NfaTransition::new(id, succ, label);
                if !transitions.contains(&transition) {
                    transitions.push(transition);
                }
                if !seen.contains(&succ) {
                    queue.push_back(succ);
                }
            }
        }
        transitions
    }
}
