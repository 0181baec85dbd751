/*
 * Result Interpreter
 *
 * Reads typestates off a saturated automaton.
 *
 * The weight of a configuration (v, s) is the combined weight of its
 * accepting paths. A path through Generated(..) states belongs to a
 * pending call: the edges after the first carry the caller prefix and the
 * first edge the callee part, so the full weight is
 *   full(Control(v) -s-> q) = out(q) ⊗ w      out(Accept) = ONE
 *   out(q) = ⊕ { out(q') ⊗ w' | q -γ-> q' with weight w' }
 *
 * Per configuration:
 *   ERROR reachable      VIOLATION finding
 *   only END reachable   PASS finding
 *   otherwise            no finding
 *
 * Per tracked variable:
 *   ERROR reachable anywhere                   VIOLATION (InvalidOrder), earliest location
 *   non-accepting state at a procedure exit    VIOLATION (IncompleteSequence),
 *     unless the object escapes through a call or a copy
 *   END reached                                PASS
 *   otherwise                                  NOT_APPLICABLE
 *
 * Only configurations whose statement lies in the variable's own scope are
 * read; exit slots and the uninitialized marker are never reported.
 */

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::features::order_analysis::domain::{
    AutState, ConfigurationFinding, FindingKind, Nfa, OrderVerdict, OrderViolation, Semiring,
    StateId, Stmt, TrackedVerdict, Val, ViolationKind, Weight, WeightedAutomaton, Wpds,
    INCOMPLETE_SEQUENCE_MESSAGE, INVALID_ORDER_MESSAGE,
};
use crate::features::order_analysis::ports::ProgramGraphProvider;

/// Verdicts and raw findings for one saturated automaton
#[derive(Debug, Clone, Default)]
pub struct Interpretation {
    pub verdicts: Vec<TrackedVerdict>,
    pub configurations: Vec<ConfigurationFinding>,
}

pub struct ResultInterpreter<'a> {
    nfa: &'a Nfa,
    wpds: &'a Wpds<Weight>,
    message: Option<&'a str>,
}

impl<'a> ResultInterpreter<'a> {
    pub fn new(nfa: &'a Nfa, wpds: &'a Wpds<Weight>) -> Self {
        Self {
            nfa,
            wpds,
            message: None,
        }
    }

    /// Message used for violations instead of the generic one
    pub fn with_message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }

    pub fn interpret<G: ProgramGraphProvider + ?Sized>(
        &self,
        automaton: &WeightedAutomaton<Weight>,
        graph: &G,
    ) -> Interpretation {
        let weights = Self::configuration_weights(automaton);

        let mut per_variable: BTreeMap<Val, Vec<(&Stmt, &Weight)>> = BTreeMap::new();
        for ((val, stmt), weight) in &weights {
            if val.is_synthetic() || val.scope != stmt.scope {
                continue;
            }
            per_variable.entry(val.clone()).or_default().push((stmt, weight));
        }

        let mut interpretation = Interpretation::default();
        for (val, mut configs) in per_variable {
            configs.sort_by_key(|(stmt, _)| stmt.position_key());
            for (stmt, weight) in &configs {
                if let Some(finding) = self.configuration_finding(&val, stmt, weight) {
                    interpretation.configurations.push(finding);
                }
            }
            let verdict = self.verdict(&val, &configs, &weights, graph);
            debug!("Verdict for {}: {:?}", val, verdict);
            interpretation.verdicts.push(TrackedVerdict { val, verdict });
        }
        interpretation
    }

    /// Full weight per configuration `(val, stmt)`
    pub fn configuration_weights(
        automaton: &WeightedAutomaton<Weight>,
    ) -> FxHashMap<(Val, Stmt), Weight> {
        let suffixes = Self::suffix_weights(automaton);

        let mut weights: FxHashMap<(Val, Stmt), Weight> = FxHashMap::default();
        for (transition, weight) in automaton.configurations() {
            let Some((val, stmt)) = transition.configuration() else {
                continue;
            };
            let full = match &transition.to {
                AutState::Accept => weight.clone(),
                state => match suffixes.get(state) {
                    Some(suffix) => suffix.extend(weight),
                    None => continue,
                },
            };
            if full.is_zero() {
                continue;
            }
            let entry = weights
                .entry((val.clone(), stmt.clone()))
                .or_insert_with(Weight::zero);
            *entry = entry.combine(&full);
        }
        weights
    }

    /// Caller-side weight of every Generated state (fixpoint, recursion allowed)
    fn suffix_weights(automaton: &WeightedAutomaton<Weight>) -> FxHashMap<AutState, Weight> {
        let generated: Vec<_> = automaton
            .transitions()
            .filter(|(t, _)| matches!(t.from, AutState::Generated(..)))
            .collect();

        let mut suffixes: FxHashMap<AutState, Weight> = FxHashMap::default();
        let mut changed = true;
        while changed {
            changed = false;
            for (transition, weight) in &generated {
                let tail = match &transition.to {
                    AutState::Accept => Weight::one(),
                    state => match suffixes.get(state) {
                        Some(w) => w.clone(),
                        None => continue,
                    },
                };
                let contribution = tail.extend(weight);
                let entry = suffixes
                    .entry(transition.from.clone())
                    .or_insert_with(Weight::zero);
                let combined = entry.combine(&contribution);
                if combined != *entry {
                    *entry = combined;
                    changed = true;
                }
            }
        }
        suffixes
    }

    fn configuration_finding(&self, val: &Val, stmt: &Stmt, weight: &Weight) -> Option<ConfigurationFinding> {
        let targets = weight.targets();
        let kind = if targets.contains(&StateId::ERROR) {
            FindingKind::Violation
        } else if targets.iter().any(|s| *s != StateId::START)
            && targets.iter().all(|s| self.nfa.is_end(*s))
        {
            FindingKind::Pass
        } else {
            return None;
        };
        Some(ConfigurationFinding {
            val: val.clone(),
            stmt: stmt.clone(),
            kind,
            states: targets.iter().map(|s| self.nfa.state_name(*s)).collect(),
        })
    }

    fn verdict<G: ProgramGraphProvider + ?Sized>(
        &self,
        val: &Val,
        configs: &[(&Stmt, &Weight)],
        weights: &FxHashMap<(Val, Stmt), Weight>,
        graph: &G,
    ) -> OrderVerdict {
        // configs are sorted by position
        if let Some((stmt, _)) = configs.iter().find(|(_, w)| w.reaches_error()) {
            let expected = self.nfa.expected_ops(&self.states_before(val, stmt, weights));
            return OrderVerdict::Violation(
                OrderViolation::new(
                    val.variable.as_str(),
                    stmt,
                    ViolationKind::InvalidOrder,
                    self.message.unwrap_or(INVALID_ORDER_MESSAGE),
                )
                .with_expected(expected),
            );
        }

        if let Some(violation) = self.incomplete_at_exit(val, configs, graph) {
            return OrderVerdict::Violation(violation);
        }

        let reaches_end = configs
            .iter()
            .any(|(_, w)| w.targets().iter().any(|s| *s != StateId::START && self.nfa.is_end(*s)));
        if reaches_end {
            OrderVerdict::Pass
        } else {
            OrderVerdict::NotApplicable
        }
    }

    /// First exit where the object is still in a non-accepting state
    fn incomplete_at_exit<G: ProgramGraphProvider + ?Sized>(
        &self,
        val: &Val,
        configs: &[(&Stmt, &Weight)],
        graph: &G,
    ) -> Option<OrderViolation> {
        let procedure = graph.procedure(&val.scope)?;
        if self.escapes(val) {
            return None;
        }

        configs.iter().find_map(|(stmt, weight)| {
            if !procedure.is_exit(stmt.node) || self.wpds.has_pop_from(val, stmt) {
                return None;
            }
            let pending: BTreeSet<StateId> = weight
                .targets()
                .into_iter()
                .filter(|s| *s != StateId::START && !self.nfa.is_end(*s))
                .collect();
            if pending.is_empty() {
                return None;
            }
            Some(
                OrderViolation::new(
                    val.variable.as_str(),
                    stmt,
                    ViolationKind::IncompleteSequence,
                    self.message.unwrap_or(INCOMPLETE_SEQUENCE_MESSAGE),
                )
                .with_expected(self.nfa.expected_ops(&pending)),
            )
        })
    }

    /// Whether the object is copied into another variable, which then owns completion
    fn escapes(&self, val: &Val) -> bool {
        self.wpds
            .normal_rules()
            .any(|r| r.from_val == *val && r.to_val != *val && !r.to_val.is_synthetic())
    }

    /// Legal typestates on the configurations flowing into `(val, stmt)`
    fn states_before(
        &self,
        val: &Val,
        stmt: &Stmt,
        weights: &FxHashMap<(Val, Stmt), Weight>,
    ) -> BTreeSet<StateId> {
        self.wpds
            .normal_rules()
            .filter(|r| r.to_val == *val && r.to_stmt == *stmt)
            .filter_map(|r| weights.get(&(r.from_val.clone(), r.from_stmt.clone())))
            .flat_map(|w| w.targets())
            .filter(|s| *s != StateId::ERROR)
            .collect()
    }
}
