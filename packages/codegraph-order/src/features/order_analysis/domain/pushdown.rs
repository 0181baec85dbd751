/*
 * Weighted Pushdown System
 *
 * Control locations are dataflow facts (`Val`: variable in a scope), stack
 * symbols are statements (`Stmt`). A configuration `(v, s)` reads
 * "variable v holds the tracked object once statement s has executed";
 * the rest of the stack holds return sites of pending calls.
 *
 * Rule shapes:
 *   Normal  (p, γ)  -> (p', γ')         same stack height
 *   Push    (p, γ)  -> (p', γ' γ'')     call, γ'' = return site
 *   Pop     (p, γ)  -> (p', ε)          return
 */

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use super::weight::Semiring;
use crate::shared::models::{NodeId, Span};

/// Name of the "uninitialized" marker variable
pub const EPSILON: &str = "ε";

/// Exit slot carrying a procedure's return value back to its call sites
pub const RETURN_SLOT: &str = "return";

/// Dataflow fact: a variable in its enclosing scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Val {
    pub variable: String,

    /// Enclosing procedure
    pub scope: String,
}

impl Val {
    pub fn new(variable: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            scope: scope.into(),
        }
    }

    /// Uninitialized marker of a scope (source of declarations)
    pub fn marker(scope: impl Into<String>) -> Self {
        Self::new(EPSILON, scope)
    }

    pub fn is_marker(&self) -> bool {
        self.variable == EPSILON
    }

    /// Fact a callee pops into at its exits; rebound to the caller's
    /// variable at the call site
    pub fn exit_slot(procedure: impl Into<String>, slot: &str) -> Self {
        Self::new(format!("<{}>", slot), procedure)
    }

    /// Marker or exit slot; never reported
    pub fn is_synthetic(&self) -> bool {
        self.is_marker() || self.variable.starts_with('<')
    }
}

impl std::fmt::Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.variable, self.scope)
    }
}

/// Control location: a statement of a procedure
///
/// Two statements are equal when they denote the same node of the same
/// procedure and, if both carry a source region, start at the same place.
/// Source text is not part of identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    pub scope: String,
    pub node: NodeId,
    pub code: String,
    pub span: Option<Span>,
}

impl Stmt {
    pub fn new(
        scope: impl Into<String>,
        node: NodeId,
        code: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self {
            scope: scope.into(),
            node,
            code: code.into(),
            span,
        }
    }

    /// Sort key: source position first, node id as tie breaker
    pub fn position_key(&self) -> (u32, u32, NodeId) {
        match self.span {
            Some(span) => (span.start_line, span.start_col, self.node),
            None => (u32::MAX, u32::MAX, self.node),
        }
    }
}

impl PartialEq for Stmt {
    fn eq(&self, other: &Self) -> bool {
        if self.scope != other.scope || self.node != other.node {
            return false;
        }
        match (&self.span, &other.span) {
            (Some(a), Some(b)) => a.start() == b.start(),
            _ => true,
        }
    }
}

impl Eq for Stmt {}

impl Hash for Stmt {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scope.hash(state);
        self.node.hash(state);
    }
}

impl PartialOrd for Stmt {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stmt {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.scope, self.node).cmp(&(&other.scope, other.node))
    }
}

impl std::fmt::Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{} [{}:{}]", self.code, self.scope, span.start_line),
            None => write!(f, "{} [{}#{}]", self.code, self.scope, self.node),
        }
    }
}

/// Same-height rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalRule<W> {
    pub from_val: Val,
    pub from_stmt: Stmt,
    pub to_val: Val,
    pub to_stmt: Stmt,
    pub weight: W,
}

/// Call rule; `return_site` stays on the stack below `callee_entry`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PushRule<W> {
    pub from_val: Val,
    pub call_site: Stmt,
    pub to_val: Val,
    pub callee_entry: Stmt,
    pub return_site: Stmt,
    pub weight: W,
}

/// Return rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PopRule<W> {
    pub from_val: Val,
    pub from_stmt: Stmt,
    pub to_val: Val,
    pub weight: W,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rule<W> {
    Normal(NormalRule<W>),
    Push(PushRule<W>),
    Pop(PopRule<W>),
}

impl<W> Rule<W> {
    pub fn from_val(&self) -> &Val {
        match self {
            Rule::Normal(r) => &r.from_val,
            Rule::Push(r) => &r.from_val,
            Rule::Pop(r) => &r.from_val,
        }
    }

    pub fn from_stmt(&self) -> &Stmt {
        match self {
            Rule::Normal(r) => &r.from_stmt,
            Rule::Push(r) => &r.call_site,
            Rule::Pop(r) => &r.from_stmt,
        }
    }

    pub fn to_val(&self) -> &Val {
        match self {
            Rule::Normal(r) => &r.to_val,
            Rule::Push(r) => &r.to_val,
            Rule::Pop(r) => &r.to_val,
        }
    }

    /// Statement on top of the stack after the rule fires (None for pop)
    pub fn to_stmt(&self) -> Option<&Stmt> {
        match self {
            Rule::Normal(r) => Some(&r.to_stmt),
            Rule::Push(r) => Some(&r.callee_entry),
            Rule::Pop(_) => None,
        }
    }

    pub fn weight(&self) -> &W {
        match self {
            Rule::Normal(r) => &r.weight,
            Rule::Push(r) => &r.weight,
            Rule::Pop(r) => &r.weight,
        }
    }
}

impl<W: std::fmt::Display> std::fmt::Display for Rule<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::Normal(r) => write!(
                f,
                "<{}; {}> -> <{}; {}>({})",
                r.from_val, r.from_stmt, r.to_val, r.to_stmt, r.weight
            ),
            Rule::Push(r) => write!(
                f,
                "<{}; {}> -> <{}; {} . {}>({})",
                r.from_val, r.call_site, r.to_val, r.callee_entry, r.return_site, r.weight
            ),
            Rule::Pop(r) => write!(
                f,
                "<{}; {}> -> <{}; ε>({})",
                r.from_val, r.from_stmt, r.to_val, r.weight
            ),
        }
    }
}

/// Rule counts by shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCounts {
    pub normal: usize,
    pub push: usize,
    pub pop: usize,
}

/// Deduplicated rule set indexed by left-hand side
#[derive(Debug, Clone)]
pub struct Wpds<W: Semiring> {
    rules: Vec<Rule<W>>,
    seen: FxHashSet<Rule<W>>,
    by_lhs: FxHashMap<(Val, Stmt), Vec<usize>>,
}

impl<W: Semiring> Default for Wpds<W> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            seen: FxHashSet::default(),
            by_lhs: FxHashMap::default(),
        }
    }
}

impl<W: Semiring> Wpds<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule; returns false if an identical rule already exists
    pub fn add_rule(&mut self, rule: Rule<W>) -> bool {
        if !self.seen.insert(rule.clone()) {
            return false;
        }
        let key = (rule.from_val().clone(), rule.from_stmt().clone());
        self.by_lhs.entry(key).or_default().push(self.rules.len());
        self.rules.push(rule);
        true
    }

    pub fn add_normal(&mut self, rule: NormalRule<W>) -> bool {
        self.add_rule(Rule::Normal(rule))
    }

    pub fn add_push(&mut self, rule: PushRule<W>) -> bool {
        self.add_rule(Rule::Push(rule))
    }

    pub fn add_pop(&mut self, rule: PopRule<W>) -> bool {
        self.add_rule(Rule::Pop(rule))
    }

    pub fn rules(&self) -> &[Rule<W>] {
        &self.rules
    }

    /// Rules whose left-hand side is `(val, stmt)`
    pub fn rules_from<'a>(&'a self, val: &Val, stmt: &Stmt) -> impl Iterator<Item = &'a Rule<W>> + 'a {
        let indices: &'a [usize] = self
            .by_lhs
            .get(&(val.clone(), stmt.clone()))
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        indices.iter().filter_map(move |i| self.rules.get(*i))
    }

    pub fn normal_rules(&self) -> impl Iterator<Item = &NormalRule<W>> {
        self.rules.iter().filter_map(|r| match r {
            Rule::Normal(n) => Some(n),
            _ => None,
        })
    }

    pub fn push_rules(&self) -> impl Iterator<Item = &PushRule<W>> {
        self.rules.iter().filter_map(|r| match r {
            Rule::Push(p) => Some(p),
            _ => None,
        })
    }

    pub fn pop_rules(&self) -> impl Iterator<Item = &PopRule<W>> {
        self.rules.iter().filter_map(|r| match r {
            Rule::Pop(p) => Some(p),
            _ => None,
        })
    }

    /// Whether a pop rule leaves `(val, stmt)`
    pub fn has_pop_from(&self, val: &Val, stmt: &Stmt) -> bool {
        self.rules_from(val, stmt).any(|r| matches!(r, Rule::Pop(_)))
    }

    pub fn counts(&self) -> RuleCounts {
        let mut counts = RuleCounts::default();
        for rule in &self.rules {
            match rule {
                Rule::Normal(_) => counts.normal += 1,
                Rule::Push(_) => counts.push += 1,
                Rule::Pop(_) => counts.pop += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
