/*
 * Weighted configuration automaton (P-automaton)
 *
 * Represents a (possibly infinite) set of pushdown configurations:
 * `(p, γ1 γ2 ... γn)` is accepted if there is a path
 * Control(p) -γ1-> q1 -γ2-> ... -γn-> Accept. Each transition carries the
 * combined weight of all derivations that produced it.
 *
 * Post-* adds Generated(p', γ') states for push rules and ε-transitions
 * for pop rules.
 */

use std::collections::BTreeMap;

use super::pushdown::{Stmt, Val};
use super::weight::Semiring;

/// Automaton state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AutState {
    /// Pushdown control location
    Control(Val),

    /// Mid-state created for push rule target `(val, callee_entry)`
    Generated(Val, Stmt),

    /// Final state
    Accept,
}

impl AutState {
    pub fn control_val(&self) -> Option<&Val> {
        match self {
            AutState::Control(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for AutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutState::Control(v) => write!(f, "{}", v),
            AutState::Generated(v, s) => write!(f, "<{}; {}>", v, s),
            AutState::Accept => write!(f, "ACCEPT"),
        }
    }
}

/// Labeled automaton edge `from -stmt-> to`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AutTransition {
    pub from: AutState,
    pub stmt: Stmt,
    pub to: AutState,
}

impl AutTransition {
    pub fn new(from: AutState, stmt: Stmt, to: AutState) -> Self {
        Self { from, stmt, to }
    }

    /// Configuration `(val, stmt)` read by this edge, if it leaves a control state
    pub fn configuration(&self) -> Option<(&Val, &Stmt)> {
        self.from.control_val().map(|v| (v, &self.stmt))
    }
}

impl std::fmt::Display for AutTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -- {} --> {}", self.from, self.stmt, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedAutomaton<W: Semiring> {
    transitions: BTreeMap<AutTransition, W>,

    /// ε-edges `Control(p) -ε-> q` created by pop rules
    epsilons: BTreeMap<(Val, AutState), W>,
}

impl<W: Semiring> Default for WeightedAutomaton<W> {
    fn default() -> Self {
        Self {
            transitions: BTreeMap::new(),
            epsilons: BTreeMap::new(),
        }
    }
}

impl<W: Semiring> WeightedAutomaton<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine `weight` into the edge; returns true if the stored weight changed
    pub fn add_transition(&mut self, transition: AutTransition, weight: W) -> bool {
        Self::update(&mut self.transitions, transition, weight)
    }

    pub fn add_epsilon(&mut self, from: Val, to: AutState, weight: W) -> bool {
        Self::update(&mut self.epsilons, (from, to), weight)
    }

    fn update<K: Ord>(map: &mut BTreeMap<K, W>, key: K, weight: W) -> bool {
        match map.get_mut(&key) {
            Some(existing) => {
                let combined = existing.combine(&weight);
                if combined == *existing {
                    false
                } else {
                    *existing = combined;
                    true
                }
            }
            None => {
                map.insert(key, weight);
                true
            }
        }
    }

    pub fn weight(&self, transition: &AutTransition) -> Option<&W> {
        self.transitions.get(transition)
    }

    pub fn epsilon_weight(&self, from: &Val, to: &AutState) -> Option<&W> {
        self.epsilons.get(&(from.clone(), to.clone()))
    }

    pub fn transitions(&self) -> impl Iterator<Item = (&AutTransition, &W)> {
        self.transitions.iter()
    }

    pub fn epsilons(&self) -> impl Iterator<Item = (&(Val, AutState), &W)> {
        self.epsilons.iter()
    }

    pub fn outgoing<'a>(&'a self, from: &'a AutState) -> impl Iterator<Item = (&'a AutTransition, &'a W)> + 'a {
        self.transitions.iter().filter(move |(t, _)| t.from == *from)
    }

    /// Edges reading a configuration `(val, stmt)` directly
    pub fn configurations(&self) -> impl Iterator<Item = (&AutTransition, &W)> {
        self.transitions
            .iter()
            .filter(|(t, _)| matches!(t.from, AutState::Control(_)))
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn epsilon_len(&self) -> usize {
        self.epsilons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.epsilons.is_empty()
    }
}

impl<W: Semiring + std::fmt::Display> std::fmt::Display for WeightedAutomaton<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (t, w) in &self.transitions {
            writeln!(f, "\t{} ({})", t, w)?;
        }
        for ((from, to), w) in &self.epsilons {
            writeln!(f, "\t{} -- ε --> {} ({})", from, to, w)?;
        }
        Ok(())
    }
}
