//! Program graph types
//!
//! Minimal statement-level view of a program consumed by order analysis:
//! one graph per procedure, an entry node and control-flow successor edges.
//! Front ends (parsers, CPG builders) produce these; order analysis only
//! reads them.

use serde::{Deserialize, Serialize};

use super::Span;

/// Index of a node inside its procedure's node arena
pub type NodeId = u32;

/// A call expression (`callee(args)`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Callee operation name as written at the call site
    pub callee: String,

    /// Argument variable names (non-variable arguments use their source text)
    #[serde(default)]
    pub args: Vec<String>,

    /// Name of the procedure this call resolves to, if its body is part of the graph
    #[serde(default)]
    pub resolved: Option<String>,
}

impl CallSite {
    pub fn new(callee: impl Into<String>) -> Self {
        Self {
            callee: callee.into(),
            args: Vec::new(),
            resolved: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn resolved_to(mut self, procedure: impl Into<String>) -> Self {
        self.resolved = Some(procedure.into());
        self
    }
}

/// Right-hand side of a declaration or assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operand {
    /// Another variable (`x = y`)
    Variable { name: String },

    /// Result of a call (`x = create()`)
    Call(CallSite),

    /// Anything else (literals, arithmetic); carries no object flow
    Other,
}

/// Statement kinds relevant to order analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgramNodeKind {
    /// Procedure entry marker
    Entry,

    /// Method call on a receiver (`base.op(args)`)
    MemberCall {
        base: String,
        op: String,
        #[serde(default)]
        args: Vec<String>,
    },

    /// Free function call (`callee(args)`)
    Call(CallSite),

    /// Variable declaration, optionally initialized
    Declaration {
        lhs: String,
        #[serde(default)]
        rhs: Option<Operand>,
    },

    /// Assignment to an existing variable
    Assignment { lhs: String, rhs: Operand },

    /// Return statement
    Return {
        #[serde(default)]
        value: Option<String>,
    },

    /// Branch/loop condition
    Branch,

    /// Sub-expression node; never turned into a pushdown rule
    Expression,

    /// Any other statement
    Other,
}

/// Node of a procedure's control-flow graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramNode {
    pub id: NodeId,

    /// Source text
    pub code: String,

    #[serde(default)]
    pub span: Option<Span>,

    pub kind: ProgramNodeKind,

    /// Control-flow successors, in evaluation order
    #[serde(default)]
    pub successors: Vec<NodeId>,
}

impl ProgramNode {
    /// Whether this node is a statement (as opposed to a sub-expression)
    pub fn is_statement(&self) -> bool {
        !matches!(self.kind, ProgramNodeKind::Expression)
    }
}

/// A procedure: node arena plus entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub name: String,

    #[serde(default)]
    pub params: Vec<String>,

    #[serde(default)]
    pub span: Option<Span>,

    /// Nodes indexed by `NodeId`; node 0 is the entry
    pub nodes: Vec<ProgramNode>,
}

impl Procedure {
    /// Create a procedure containing only its entry node
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let entry = ProgramNode {
            id: 0,
            code: name.clone(),
            span: None,
            kind: ProgramNodeKind::Entry,
            successors: Vec::new(),
        };
        Self {
            name,
            params: Vec::new(),
            span: None,
            nodes: vec![entry],
        }
    }

    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        if let Some(entry) = self.nodes.first_mut() {
            entry.span = Some(span);
        }
        self
    }

    pub fn entry(&self) -> NodeId {
        0
    }

    /// Add an unconnected node and return its id
    pub fn add_node(
        &mut self,
        kind: ProgramNodeKind,
        code: impl Into<String>,
        span: Option<Span>,
    ) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(ProgramNode {
            id,
            code: code.into(),
            span,
            kind,
            successors: Vec::new(),
        });
        id
    }

    /// Add a control-flow edge (ignored if either endpoint is unknown)
    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        if (to as usize) >= self.nodes.len() {
            return;
        }
        if let Some(node) = self.nodes.get_mut(from as usize) {
            if !node.successors.contains(&to) {
                node.successors.push(to);
            }
        }
    }

    /// Add a node as the successor of `after`
    pub fn append(
        &mut self,
        after: NodeId,
        kind: ProgramNodeKind,
        code: impl Into<String>,
        span: Option<Span>,
    ) -> NodeId {
        let id = self.add_node(kind, code, span);
        self.connect(after, id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&ProgramNode> {
        self.nodes.get(id as usize)
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|n| n.successors.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes where control leaves the procedure: returns and nodes without successors
    pub fn exits(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| {
                matches!(n.kind, ProgramNodeKind::Return { .. })
                    || (n.successors.is_empty() && n.id != 0)
            })
            .map(|n| n.id)
            .collect()
    }

    pub fn is_exit(&self, id: NodeId) -> bool {
        match self.node(id) {
            Some(n) => {
                matches!(n.kind, ProgramNodeKind::Return { .. })
                    || (n.successors.is_empty() && n.id != 0)
            }
            None => false,
        }
    }

    /// Statements following `id` in evaluation order, looking through
    /// sub-expression nodes
    pub fn statement_successors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = rustc_hash::FxHashSet::default();
        let mut stack: Vec<NodeId> = self.successors(id).iter().rev().copied().collect();

        while let Some(candidate) = stack.pop() {
            if !seen.insert(candidate) {
                continue;
            }
            match self.node(candidate) {
                Some(node) if node.is_statement() => {
                    if !out.contains(&candidate) {
                        out.push(candidate);
                    }
                }
                Some(_) => stack.extend(self.successors(candidate).iter().rev().copied()),
                None => {}
            }
        }
        out
    }
}

/// Whole-program view: the set of procedures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramGraph {
    pub procedures: Vec<Procedure>,
}

impl ProgramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_procedure(mut self, procedure: Procedure) -> Self {
        self.procedures.push(procedure);
        self
    }

    pub fn add_procedure(&mut self, procedure: Procedure) {
        self.procedures.push(procedure);
    }

    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.name == name)
    }
}
