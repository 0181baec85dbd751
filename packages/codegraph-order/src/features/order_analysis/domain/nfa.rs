/*
 * Typestate NFA
 *
 * Finite automaton compiled from an order expression. The compiler
 * determinises it, so a source has at most one target per label.
 * States live in an arena and are addressed by `StateId`; successor sets
 * are index sets, so `+`/`*` loops never create reference cycles.
 *
 * Fixed states:
 *   StateId::START  synthetic start (pseudo-state, op "START")
 *   StateId::ERROR  synthetic error typestate (is_error = true)
 *
 * Every transition is labeled with the operation of its target state.
 * Transitions into the fake END state (label "END") only mark acceptance.
 */

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use crate::errors::{OrderAnalysisError, Result};

/// Pseudo-operation of the START state
pub const START_OP: &str = "START";

/// Pseudo-operation of the fake END state
pub const END_OP: &str = "END";

/// Pseudo-operation of the ERROR state
pub const ERROR_OP: &str = "ERROR";

/// Index of a state in the NFA arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub u32);

impl StateId {
    pub const START: StateId = StateId(0);
    pub const ERROR: StateId = StateId(1);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// NFA state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateNode {
    pub id: StateId,

    /// Entity name (None for pseudo-states)
    pub base: Option<String>,

    /// Operation name, or START/END/ERROR for pseudo-states
    pub op: String,

    pub is_start: bool,
    pub is_end: bool,

    /// Synthetic begin/end marker
    pub is_fake: bool,

    pub is_error: bool,

    pub successors: BTreeSet<StateId>,
}

impl StateNode {
    fn new(id: StateId, base: Option<String>, op: impl Into<String>) -> Self {
        Self {
            id,
            base,
            op: op.into(),
            is_start: false,
            is_end: false,
            is_fake: false,
            is_error: false,
            successors: BTreeSet::new(),
        }
    }

    /// `base.op`, or just `op` for pseudo-states
    pub fn name(&self) -> String {
        match &self.base {
            Some(base) => format!("{}.{}", base, self.op),
            None => self.op.clone(),
        }
    }
}

impl std::fmt::Display for StateNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())?;
        if self.is_end {
            write!(f, " (E)")?;
        }
        Ok(())
    }
}

/// Structural identity of a state: shape plus successor names.
///
/// Two independently compiled automata for the same expression yield the
/// same multiset of signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateSignature {
    pub base: Option<String>,
    pub op: String,
    pub is_start: bool,
    pub is_end: bool,
    pub is_fake: bool,
    pub is_error: bool,
    pub successors: Vec<String>,
}

/// Labeled NFA edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NfaTransition {
    pub source: StateId,
    pub target: StateId,
    pub label: String,
}

impl NfaTransition {
    pub fn new(source: StateId, target: StateId, label: impl Into<String>) -> Self {
        Self {
            source,
            target,
            label: label.into(),
        }
    }
}

/// Typestate automaton
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nfa {
    states: Vec<StateNode>,
    transitions: Vec<NfaTransition>,
}

impl Nfa {
    /// Automaton with only the START and ERROR states
    pub(crate) fn empty() -> Self {
        let mut start = StateNode::new(StateId::START, None, START_OP);
        start.is_fake = true;
        let mut error = StateNode::new(StateId::ERROR, None, ERROR_OP);
        error.is_error = true;
        Self {
            states: vec![start, error],
            transitions: Vec::new(),
        }
    }

    pub(crate) fn add_state(&mut self, base: Option<String>, op: impl Into<String>) -> StateId {
        let id = StateId(self.states.len() as u32);
        self.states.push(StateNode::new(id, base, op));
        id
    }

    pub(crate) fn add_successor(&mut self, from: StateId, to: StateId) {
        if let Some(node) = self.states.get_mut(from.index()) {
            node.successors.insert(to);
        }
    }

    pub(crate) fn state_mut(&mut self, id: StateId) -> Option<&mut StateNode> {
        self.states.get_mut(id.index())
    }

    pub(crate) fn set_transitions(&mut self, transitions: Vec<NfaTransition>) {
        self.transitions = transitions;
    }

    pub fn start(&self) -> StateId {
        StateId::START
    }

    pub fn error(&self) -> StateId {
        StateId::ERROR
    }

    pub fn state(&self, id: StateId) -> Option<&StateNode> {
        self.states.get(id.index())
    }

    pub fn states(&self) -> &[StateNode] {
        &self.states
    }

    /// Name of a state, or `?<id>` for unknown ids
    pub fn state_name(&self, id: StateId) -> String {
        self.state(id)
            .map(|s| s.name())
            .unwrap_or_else(|| format!("?{}", id.0))
    }

    pub fn is_end(&self, id: StateId) -> bool {
        self.state(id).map(|s| s.is_end).unwrap_or(false)
    }

    pub fn is_error(&self, id: StateId) -> bool {
        self.state(id).map(|s| s.is_error).unwrap_or(false)
    }

    /// Explicit transition set, in breadth-first order from START
    pub fn transitions(&self) -> &[NfaTransition] {
        &self.transitions
    }

    /// Transitions leaving the synthetic START state
    pub fn initial_transitions(&self) -> Vec<&NfaTransition> {
        self.transitions
            .iter()
            .filter(|t| t.source == StateId::START)
            .collect()
    }

    /// Transitions an operation may trigger (never the fake END edges)
    pub fn transitions_into<F>(&self, mut triggers: F) -> BTreeSet<NfaTransition>
    where
        F: FnMut(&StateNode) -> bool,
    {
        self.transitions
            .iter()
            .filter(|t| match self.state(t.target) {
                Some(target) => !target.is_fake && !target.is_error && triggers(target),
                None => false,
            })
            .cloned()
            .collect()
    }

    /// Transitions labeled with `op`
    pub fn transitions_labeled(&self, op: &str) -> BTreeSet<NfaTransition> {
        self.transitions_into(|target| target.op == op)
    }

    /// States reached from `current` by one `op` step
    pub fn step(&self, current: &BTreeSet<StateId>, op: &str) -> BTreeSet<StateId> {
        self.transitions
            .iter()
            .filter(|t| current.contains(&t.source) && t.label == op)
            .filter(|t| self.state(t.target).map(|s| !s.is_fake).unwrap_or(false))
            .map(|t| t.target)
            .collect()
    }

    /// Whether the operation sequence is a complete word of the order
    pub fn accepts<S: AsRef<str>>(&self, ops: &[S]) -> bool {
        let mut current: BTreeSet<StateId> = BTreeSet::from([StateId::START]);
        for op in ops {
            current = self.step(&current, op.as_ref());
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|s| self.is_end(*s))
    }

    /// Operations that are legal next from any of `states`, sorted
    pub fn expected_ops(&self, states: &BTreeSet<StateId>) -> Vec<String> {
        let ops: BTreeSet<String> = self
            .transitions
            .iter()
            .filter(|t| states.contains(&t.source))
            .filter_map(|t| self.state(t.target))
            .filter(|s| !s.is_fake && !s.is_error)
            .map(|s| s.name())
            .collect();
        ops.into_iter().collect()
    }

    pub fn state_signature(&self, id: StateId) -> Option<StateSignature> {
        let node = self.state(id)?;
        let mut successors: Vec<String> = node
            .successors
            .iter()
            .map(|s| self.state_name(*s))
            .collect();
        successors.sort();
        Some(StateSignature {
            base: node.base.clone(),
            op: node.op.clone(),
            is_start: node.is_start,
            is_end: node.is_end,
            is_fake: node.is_fake,
            is_error: node.is_error,
            successors,
        })
    }

    /// Sorted signatures of all states
    pub fn signatures(&self) -> Vec<StateSignature> {
        let mut sigs: Vec<StateSignature> = self
            .states
            .iter()
            .filter_map(|s| self.state_signature(s.id))
            .collect();
        sigs.sort();
        sigs
    }

    /// States reachable from START along explicit transitions
    pub fn reachable_states(&self) -> BTreeSet<StateId> {
        let mut seen = BTreeSet::from([StateId::START]);
        let mut queue = VecDeque::from([StateId::START]);
        while let Some(state) = queue.pop_front() {
            for t in self.transitions.iter().filter(|t| t.source == state) {
                if seen.insert(t.target) {
                    queue.push_back(t.target);
                }
            }
        }
        seen
    }

    /// Whether an accepting state is reachable from `from`
    pub fn reaches_end(&self, from: StateId) -> bool {
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([from]);
        while let Some(state) = queue.pop_front() {
            if !seen.insert(state) {
                continue;
            }
            if self.is_end(state) {
                return true;
            }
            for t in self.transitions.iter().filter(|t| t.source == state) {
                queue.push_back(t.target);
            }
        }
        false
    }

    /// Check structural invariants of a compiled automaton
    pub fn validate(&self) -> Result<()> {
        for (idx, node) in self.states.iter().enumerate() {
            if node.id.index() != idx {
                return Err(OrderAnalysisError::InvariantViolation(format!(
                    "state '{}' stored at index {} but has id {}",
                    node.name(),
                    idx,
                    node.id.0
                )));
            }
            if node.is_error && (node.is_end || node.is_start) {
                return Err(OrderAnalysisError::InvariantViolation(format!(
                    "error state '{}' is also marked start/end",
                    node.name()
                )));
            }
            if node.is_fake && node.base.is_some() {
                return Err(OrderAnalysisError::InvariantViolation(format!(
                    "fake state '{}' carries an entity",
                    node.name()
                )));
            }
            if let Some(dangling) = node.successors.iter().find(|s| self.state(**s).is_none()) {
                return Err(OrderAnalysisError::InvariantViolation(format!(
                    "state '{}' has dangling successor {}",
                    node.name(),
                    dangling.0
                )));
            }
        }
        if let Some(t) = self
            .transitions
            .iter()
            .find(|t| self.state(t.source).is_none() || self.state(t.target).is_none())
        {
            return Err(OrderAnalysisError::InvariantViolation(format!(
                "transition {} -> {} references an unknown state",
                t.source.0, t.target.0
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Nfa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for t in &self.transitions {
            writeln!(
                f,
                "\t{} -- [{}] --> {}",
                self.state_name(t.source),
                t.label,
                self.state_name(t.target)
            )?;
        }
        Ok(())
    }
}
