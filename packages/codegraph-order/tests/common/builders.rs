//! Test data builders
//!
//! Straight-line procedures, one statement per source line.

#![allow(dead_code)]

use codegraph_order::shared::models::{
    CallSite, NodeId, Operand, Procedure, ProgramGraph, ProgramNodeKind, Span,
};

/// Builder for a procedure whose statements run in sequence
#[derive(Debug)]
pub struct ProcedureBuilder {
    procedure: Procedure,
    last: NodeId,
    line: u32,
}

impl ProcedureBuilder {
    /// Create a new builder; the first statement lands on `first_line`
    pub fn new(name: &str, first_line: u32) -> Self {
        let procedure = Procedure::new(name).with_span(Span::line(first_line.saturating_sub(1)));
        Self {
            procedure,
            last: 0,
            line: first_line,
        }
    }

    pub fn with_params(mut self, params: &[&str]) -> Self {
        self.procedure = self.procedure.with_params(params.iter().copied());
        self
    }

    fn push(mut self, kind: ProgramNodeKind, code: String) -> Self {
        self.last = self
            .procedure
            .append(self.last, kind, code, Some(Span::line(self.line)));
        self.line += 1;
        self
    }

    /// `base.op()`
    pub fn with_call(self, base: &str, op: &str) -> Self {
        self.push(
            ProgramNodeKind::MemberCall {
                base: base.to_string(),
                op: op.to_string(),
                args: Vec::new(),
            },
            format!("{}.{}()", base, op),
        )
    }

    /// Several member calls on the same base
    pub fn with_calls(self, base: &str, ops: &[&str]) -> Self {
        ops.iter().fold(self, |builder, op| builder.with_call(base, op))
    }

    /// Unresolved free function call `callee(args..)`
    pub fn with_free_call(self, callee: &str, args: &[&str]) -> Self {
        self.push(
            ProgramNodeKind::Call(CallSite::new(callee).with_args(args.iter().copied())),
            format!("{}({})", callee, args.join(", ")),
        )
    }

    /// Call of another procedure of the graph
    pub fn with_invoke(self, procedure: &str, args: &[&str]) -> Self {
        self.push(
            ProgramNodeKind::Call(
                CallSite::new(procedure)
                    .with_args(args.iter().copied())
                    .resolved_to(procedure),
            ),
            format!("{}({})", procedure, args.join(", ")),
        )
    }

    /// `T lhs;`
    pub fn with_declaration(self, lhs: &str) -> Self {
        self.push(
            ProgramNodeKind::Declaration {
                lhs: lhs.to_string(),
                rhs: None,
            },
            format!("T {};", lhs),
        )
    }

    /// `T lhs = rhs;`
    pub fn with_alias(self, lhs: &str, rhs: &str) -> Self {
        self.push(
            ProgramNodeKind::Declaration {
                lhs: lhs.to_string(),
                rhs: Some(Operand::Variable {
                    name: rhs.to_string(),
                }),
            },
            format!("T {} = {};", lhs, rhs),
        )
    }

    /// `lhs = procedure(args..)` with a resolved callee
    pub fn with_assigned_invoke(self, lhs: &str, procedure: &str, args: &[&str]) -> Self {
        self.push(
            ProgramNodeKind::Assignment {
                lhs: lhs.to_string(),
                rhs: Operand::Call(
                    CallSite::new(procedure)
                        .with_args(args.iter().copied())
                        .resolved_to(procedure),
                ),
            },
            format!("{} = {}({})", lhs, procedure, args.join(", ")),
        )
    }

    /// `lhs = callee(args..)` with an unresolved callee
    pub fn with_assigned_call(self, lhs: &str, callee: &str, args: &[&str]) -> Self {
        self.push(
            ProgramNodeKind::Assignment {
                lhs: lhs.to_string(),
                rhs: Operand::Call(CallSite::new(callee).with_args(args.iter().copied())),
            },
            format!("{} = {}({})", lhs, callee, args.join(", ")),
        )
    }

    /// `return value;`
    pub fn with_return(self, value: Option<&str>) -> Self {
        let code = match value {
            Some(v) => format!("return {};", v),
            None => "return;".to_string(),
        };
        self.push(
            ProgramNodeKind::Return {
                value: value.map(str::to_string),
            },
            code,
        )
    }

    /// Line the next statement will get
    pub fn next_line(&self) -> u32 {
        self.line
    }

    pub fn build(self) -> Procedure {
        self.procedure
    }
}

/// Graph with one procedure `main`
pub fn single_procedure(build: impl FnOnce(ProcedureBuilder) -> ProcedureBuilder) -> ProgramGraph {
    ProgramGraph::new().with_procedure(build(ProcedureBuilder::new("main", 2)).build())
}
