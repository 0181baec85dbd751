//! Shared models

mod program;
mod span;

pub use program::{CallSite, NodeId, Operand, Procedure, ProgramGraph, ProgramNode, ProgramNodeKind};
pub use span::{Location, Span};
