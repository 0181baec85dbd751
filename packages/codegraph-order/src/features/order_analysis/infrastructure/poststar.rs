/*
 * Post-* Saturation
 *
 * Extends a weighted configuration automaton until it accepts every
 * configuration reachable from the initial ones, each with the combined
 * weight of all paths reaching it.
 *
 * For a transition (Control(p), γ, q) with weight l:
 *   normal (p, γ) → (p', γ')       add (p', γ', q)                 l ⊗ w
 *   push   (p, γ) → (p', γ' γ'')   add (p', γ', Gen(p', γ'))       ONE
 *                                  add (Gen(p', γ'), γ'', q)       l ⊗ w
 *   pop    (p, γ) → (p', ε)        add ε-edge (p', q)              l ⊗ w
 *
 * An ε-edge (p', q) with weight e and a transition (q, γ, q') with weight
 * l yield (p', γ, q') with l ⊗ e: caller prefix, then callee body.
 *
 * Weights only grow under combine and the domain is finite, so the
 * worklist drains. Running again on a saturated automaton changes nothing.
 */

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::debug;

use crate::errors::{OrderAnalysisError, Result};
use crate::features::order_analysis::domain::{
    AutState, AutTransition, Rule, Semiring, Val, WeightedAutomaton, Wpds,
};

/// Pending saturation step
#[derive(Debug, Clone)]
enum WorkItem {
    Transition(AutTransition),
    Epsilon(Val, AutState),
}

/// Saturation state: the automaton plus lookup indices for ε-combination
struct Saturation<'a, W: Semiring> {
    wpds: &'a Wpds<W>,
    automaton: WeightedAutomaton<W>,
    worklist: VecDeque<WorkItem>,

    /// Transitions leaving each non-control state
    outgoing: FxHashMap<AutState, FxHashSet<AutTransition>>,

    /// Sources of the ε-edges entering each state
    epsilons_into: FxHashMap<AutState, FxHashSet<Val>>,
}

impl<'a, W: Semiring> Saturation<'a, W> {
    fn new(wpds: &'a Wpds<W>, automaton: WeightedAutomaton<W>) -> Self {
        let mut saturation = Self {
            wpds,
            automaton: WeightedAutomaton::new(),
            worklist: VecDeque::new(),
            outgoing: FxHashMap::default(),
            epsilons_into: FxHashMap::default(),
        };
        for (transition, weight) in automaton.transitions() {
            saturation.add_transition(transition.clone(), weight.clone());
        }
        for ((from, to), weight) in automaton.epsilons() {
            saturation.add_epsilon(from.clone(), to.clone(), weight.clone());
        }
        saturation
    }

    fn add_transition(&mut self, transition: AutTransition, weight: W) {
        if weight.is_zero() {
            return;
        }
        if !matches!(transition.from, AutState::Control(_)) {
            self.outgoing
                .entry(transition.from.clone())
                .or_default()
                .insert(transition.clone());
        }
        if self.automaton.add_transition(transition.clone(), weight) {
            self.worklist.push_back(WorkItem::Transition(transition));
        }
    }

    fn add_epsilon(&mut self, from: Val, to: AutState, weight: W) {
        if weight.is_zero() {
            return;
        }
        self.epsilons_into
            .entry(to.clone())
            .or_default()
            .insert(from.clone());
        if self.automaton.add_epsilon(from.clone(), to.clone(), weight) {
            self.worklist.push_back(WorkItem::Epsilon(from, to));
        }
    }

    fn run(mut self, max_iterations: usize) -> Result<(WeightedAutomaton<W>, usize)> {
        let mut iterations = 0usize;

        while let Some(item) = self.worklist.pop_front() {
            iterations += 1;
            if iterations > max_iterations {
                return Err(OrderAnalysisError::IterationLimit {
                    iterations,
                    max_iterations,
                });
            }
            match item {
                WorkItem::Transition(transition) => self.process_transition(transition),
                WorkItem::Epsilon(from, to) => self.process_epsilon(from, to),
            }
        }

        debug!(
            iterations,
            transitions = self.automaton.len(),
            epsilons = self.automaton.epsilon_len(),
            "Post-* saturation finished"
        );
        Ok((self.automaton, iterations))
    }

    fn process_transition(&mut self, transition: AutTransition) {
        let Some(weight) = self.automaton.weight(&transition).cloned() else {
            return;
        };

        match &transition.from {
            AutState::Control(val) => {
                let rules: Vec<Rule<W>> = self
                    .wpds
                    .rules_from(val, &transition.stmt)
                    .cloned()
                    .collect();
                for rule in rules {
                    self.apply_rule(rule, &transition.to, &weight);
                }
            }
            state => {
                let sources: Vec<Val> = self
                    .epsilons_into
                    .get(state)
                    .map(|s| s.iter().cloned().collect())
                    .unwrap_or_default();
                for source in sources {
                    let Some(eps) = self.automaton.epsilon_weight(&source, state).cloned() else {
                        continue;
                    };
                    self.add_transition(
                        AutTransition::new(
                            AutState::Control(source),
                            transition.stmt.clone(),
                            transition.to.clone(),
                        ),
                        weight.extend(&eps),
                    );
                }
            }
        }
    }

    fn apply_rule(&mut self, rule: Rule<W>, target: &AutState, weight: &W) {
        match rule {
            Rule::Normal(r) => {
                self.add_transition(
                    AutTransition::new(AutState::Control(r.to_val), r.to_stmt, target.clone()),
                    weight.extend(&r.weight),
                );
            }
            Rule::Push(r) => {
                let generated = AutState::Generated(r.to_val.clone(), r.callee_entry.clone());
                self.add_transition(
                    AutTransition::new(
                        AutState::Control(r.to_val),
                        r.callee_entry,
                        generated.clone(),
                    ),
                    W::one(),
                );
                self.add_transition(
                    AutTransition::new(generated, r.return_site, target.clone()),
                    weight.extend(&r.weight),
                );
            }
            Rule::Pop(r) => {
                self.add_epsilon(r.to_val, target.clone(), weight.extend(&r.weight));
            }
        }
    }

    fn process_epsilon(&mut self, from: Val, to: AutState) {
        let Some(eps) = self.automaton.epsilon_weight(&from, &to).cloned() else {
            return;
        };

        let continuations: Vec<AutTransition> = self
            .outgoing
            .get(&to)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        for transition in continuations {
            let Some(weight) = self.automaton.weight(&transition).cloned() else {
                continue;
            };
            self.add_transition(
                AutTransition::new(
                    AutState::Control(from.clone()),
                    transition.stmt,
                    transition.to,
                ),
                weight.extend(&eps),
            );
        }
    }
}

/// Saturate `initial` under the rules of `wpds`
///
/// Returns the saturated automaton and the number of worklist steps, or
/// `IterationLimit` when `max_iterations` steps were not enough.
pub fn poststar<W: Semiring>(
    wpds: &Wpds<W>,
    initial: WeightedAutomaton<W>,
    max_iterations: usize,
) -> Result<(WeightedAutomaton<W>, usize)> {
    Saturation::new(wpds, initial).run(max_iterations)
}
