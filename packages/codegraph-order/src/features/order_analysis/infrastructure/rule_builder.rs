/*
 * Pushdown Rule Builder
 *
 * Translates a program graph into weighted pushdown rules. For every
 * control-flow edge (prev → cur) between statements of a procedure:
 *
 *   base.op(..)          (base, prev) → (base, cur)     weight(op)
 *   op(x, ..)            (x, prev)    → (x, cur)        weight(op)      unresolved call
 *   lhs = rhs_var        (rhs, prev)  → (lhs, cur)      ONE
 *   lhs = op(..)         (ε, prev)    → (lhs, cur)      weight(op)      unresolved call
 *   T lhs;               (ε, prev)    → (lhs, cur)      ONE
 *   any other variable   (v, prev)    → (v, cur)        ONE             pass-through
 *
 * weight(op) is the set of NFA transitions whose target operation is
 * implemented by `op` (ONE when there is none). Transition labels are
 * target ops, so these are exactly the transitions labeled `op`. The assigned variable is
 * killed: it only receives flow from the right-hand side.
 *
 * Resolved calls (interprocedural mode):
 *   push   (arg, prev) → (param, callee entry · cur)           ONE
 *   pop    (param, exit) → (<param>@callee, ε)                 ONE
 *   pop    (ret, return) → (<return>@callee, ε)                ONE
 *   normal (<param>@callee, cur) → (arg, cur)                  ONE
 *   normal (<return>@callee, cur) → (lhs, cur)                 ONE
 * Arguments do not bypass the callee; they come back through the exit
 * slots, which are rebound per call site.
 *
 * Intraprocedural mode emits no push/pop rules and follows only the first
 * control-flow successor at branches.
 */

use rustc_hash::FxHashSet;
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

use crate::features::order_analysis::domain::{
    Nfa, NormalRule, PopRule, PushRule, Stmt, Val, Weight, Wpds, RETURN_SLOT,
};
use crate::features::order_analysis::infrastructure::OperationRegistry;
use crate::features::order_analysis::ports::ProgramGraphProvider;
use crate::shared::models::{CallSite, NodeId, Operand, Procedure, ProgramNodeKind};

/// Builds the WPDS for one NFA over a program graph
pub struct RuleBuilder<'a> {
    nfa: &'a Nfa,
    registry: &'a OperationRegistry,
    interprocedural: bool,
}

impl<'a> RuleBuilder<'a> {
    pub fn new(nfa: &'a Nfa, registry: &'a OperationRegistry) -> Self {
        Self {
            nfa,
            registry,
            interprocedural: true,
        }
    }

    pub fn interprocedural(mut self, enabled: bool) -> Self {
        self.interprocedural = enabled;
        self
    }

    /// NFA transitions triggered by calling `callee` (ONE if none)
    pub fn weight_for(&self, callee: &str) -> Weight {
        let transitions = self
            .nfa
            .transitions_into(|target| self.registry.triggers(target.base.as_deref(), &target.op, callee));
        if transitions.is_empty() {
            Weight::One
        } else {
            Weight::Transitions(transitions)
        }
    }

    pub fn build<G: ProgramGraphProvider + ?Sized>(&self, graph: &G) -> Wpds<Weight> {
        let mut wpds = Wpds::new();

        for procedure in graph.procedures() {
            self.build_procedure(graph, procedure, &mut wpds);
        }

        if self.interprocedural {
            self.build_returns(graph, &mut wpds);
        }

        let counts = wpds.counts();
        debug!(
            normal = counts.normal,
            push = counts.push,
            pop = counts.pop,
            "Built pushdown system"
        );
        wpds
    }

    fn build_procedure<G: ProgramGraphProvider + ?Sized>(
        &self,
        graph: &G,
        procedure: &Procedure,
        wpds: &mut Wpds<Weight>,
    ) {
        let scope = procedure.name.as_str();
        let variables = Self::variables(procedure);

        for (prev, cur) in self.statement_edges(procedure) {
            let Some(node) = procedure.node(cur) else {
                continue;
            };
            let from = stmt_of(procedure, prev);
            let to = stmt_of(procedure, cur);
            let mut handled: FxHashSet<String> = FxHashSet::default();

            match &node.kind {
                ProgramNodeKind::MemberCall { base, op, .. } => {
                    let val = Val::new(base.as_str(), scope);
                    add_normal(wpds, val.clone(), &from, val, &to, self.weight_for(op));
                    handled.insert(base.clone());
                }

                ProgramNodeKind::Call(call) => {
                    self.call_rules(graph, scope, call, None, &from, &to, &mut handled, wpds);
                }

                ProgramNodeKind::Declaration { lhs, rhs } => {
                    handled.insert(lhs.clone());
                    let target = Val::new(lhs.as_str(), scope);
                    match rhs {
                        None | Some(Operand::Other) => {
                            add_normal(wpds, Val::marker(scope), &from, target, &to, Weight::One);
                        }
                        Some(Operand::Variable { name }) => {
                            add_normal(wpds, Val::new(name.as_str(), scope), &from, target, &to, Weight::One);
                        }
                        Some(Operand::Call(call)) => {
                            self.call_rules(graph, scope, call, Some(lhs), &from, &to, &mut handled, wpds);
                        }
                    }
                }

                ProgramNodeKind::Assignment { lhs, rhs } => {
                    handled.insert(lhs.clone());
                    let target = Val::new(lhs.as_str(), scope);
                    match rhs {
                        Operand::Other => {}
                        Operand::Variable { name } => {
                            add_normal(wpds, Val::new(name.as_str(), scope), &from, target, &to, Weight::One);
                        }
                        Operand::Call(call) => {
                            self.call_rules(graph, scope, call, Some(lhs), &from, &to, &mut handled, wpds);
                        }
                    }
                }

                _ => {}
            }

            for variable in variables.iter().filter(|v| !handled.contains(*v)) {
                let val = Val::new(variable.as_str(), scope);
                add_normal(wpds, val.clone(), &from, val, &to, Weight::One);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn call_rules<G: ProgramGraphProvider + ?Sized>(
        &self,
        graph: &G,
        scope: &str,
        call: &CallSite,
        lhs: Option<&String>,
        from: &Stmt,
        to: &Stmt,
        handled: &mut FxHashSet<String>,
        wpds: &mut Wpds<Weight>,
    ) {
        let callee = if self.interprocedural {
            call.resolved.as_deref().and_then(|name| graph.procedure(name))
        } else {
            None
        };

        match callee {
            Some(callee) => {
                let entry = stmt_of(callee, callee.entry());
                for (arg, param) in call.args.iter().zip(callee.params.iter()) {
                    if !is_variable_name(arg) {
                        continue;
                    }
                    let arg_val = Val::new(arg.as_str(), scope);
                    wpds.add_push(PushRule {
                        from_val: arg_val.clone(),
                        call_site: from.clone(),
                        to_val: Val::new(param.as_str(), callee.name.as_str()),
                        callee_entry: entry.clone(),
                        return_site: to.clone(),
                        weight: Weight::One,
                    });
                    add_normal(
                        wpds,
                        Val::exit_slot(callee.name.as_str(), param),
                        to,
                        arg_val,
                        to,
                        Weight::One,
                    );
                    handled.insert(arg.clone());
                }
                if let Some(lhs) = lhs {
                    add_normal(
                        wpds,
                        Val::exit_slot(callee.name.as_str(), RETURN_SLOT),
                        to,
                        Val::new(lhs.as_str(), scope),
                        to,
                        Weight::One,
                    );
                }
            }
            None => {
                let weight = self.weight_for(&call.callee);
                if let Some(lhs) = lhs {
                    add_normal(
                        wpds,
                        Val::marker(scope),
                        from,
                        Val::new(lhs.as_str(), scope),
                        to,
                        weight.clone(),
                    );
                }
                for arg in call.args.iter().filter(|a| is_variable_name(a)) {
                    let val = Val::new(arg.as_str(), scope);
                    add_normal(wpds, val.clone(), from, val, to, weight.clone());
                    handled.insert(arg.clone());
                }
            }
        }
    }

    /// Pop rules at the exits of every procedure targeted by a resolved call
    fn build_returns<G: ProgramGraphProvider + ?Sized>(&self, graph: &G, wpds: &mut Wpds<Weight>) {
        let called: BTreeSet<&str> = graph
            .procedures()
            .iter()
            .flat_map(|p| p.nodes.iter())
            .filter_map(|n| match &n.kind {
                ProgramNodeKind::Call(call) => call.resolved.as_deref(),
                ProgramNodeKind::Declaration {
                    rhs: Some(Operand::Call(call)),
                    ..
                } => call.resolved.as_deref(),
                ProgramNodeKind::Assignment {
                    rhs: Operand::Call(call),
                    ..
                } => call.resolved.as_deref(),
                _ => None,
            })
            .collect();

        for name in called {
            let Some(callee) = graph.procedure(name) else {
                continue;
            };
            for exit in callee.exits() {
                let exit_stmt = stmt_of(callee, exit);
                for param in &callee.params {
                    wpds.add_pop(PopRule {
                        from_val: Val::new(param.as_str(), name),
                        from_stmt: exit_stmt.clone(),
                        to_val: Val::exit_slot(name, param),
                        weight: Weight::One,
                    });
                }
                if let Some(ProgramNodeKind::Return { value: Some(value) }) =
                    callee.node(exit).map(|n| &n.kind)
                {
                    if is_variable_name(value) {
                        wpds.add_pop(PopRule {
                            from_val: Val::new(value.as_str(), name),
                            from_stmt: exit_stmt.clone(),
                            to_val: Val::exit_slot(name, RETURN_SLOT),
                            weight: Weight::One,
                        });
                    }
                }
            }
        }
    }

    /// Statement-level CFG edges reachable from the entry
    fn statement_edges(&self, procedure: &Procedure) -> Vec<(NodeId, NodeId)> {
        let mut edges = Vec::new();
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([procedure.entry()]);

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            for next in self.next_statements(procedure, id) {
                edges.push((id, next));
                queue.push_back(next);
            }
        }
        edges
    }

    /// Statements following `id`; only the first one in intraprocedural mode
    fn next_statements(&self, procedure: &Procedure, id: NodeId) -> Vec<NodeId> {
        let mut next = procedure.statement_successors(id);
        if !self.interprocedural {
            next.truncate(1);
        }
        next
    }

    /// Variables of a procedure (flow-insensitive)
    fn variables(procedure: &Procedure) -> BTreeSet<String> {
        let mut vars: BTreeSet<String> = procedure.params.iter().cloned().collect();
        for node in &procedure.nodes {
            match &node.kind {
                ProgramNodeKind::MemberCall { base, args, .. } => {
                    vars.insert(base.clone());
                    vars.extend(args.iter().cloned());
                }
                ProgramNodeKind::Call(call) => vars.extend(call.args.iter().cloned()),
                ProgramNodeKind::Declaration { lhs, rhs } => {
                    vars.insert(lhs.clone());
                    if let Some(rhs) = rhs {
                        Self::operand_variables(rhs, &mut vars);
                    }
                }
                ProgramNodeKind::Assignment { lhs, rhs } => {
                    vars.insert(lhs.clone());
                    Self::operand_variables(rhs, &mut vars);
                }
                ProgramNodeKind::Return { value: Some(value) } => {
                    vars.insert(value.clone());
                }
                _ => {}
            }
        }
        vars.retain(|v| is_variable_name(v));
        vars
    }

    fn operand_variables(operand: &Operand, vars: &mut BTreeSet<String>) {
        match operand {
            Operand::Variable { name } => {
                vars.insert(name.clone());
            }
            Operand::Call(call) => vars.extend(call.args.iter().cloned()),
            Operand::Other => {}
        }
    }
}

fn add_normal(wpds: &mut Wpds<Weight>, from_val: Val, from: &Stmt, to_val: Val, to: &Stmt, weight: Weight) {
    wpds.add_normal(NormalRule {
        from_val,
        from_stmt: from.clone(),
        to_val,
        to_stmt: to.clone(),
        weight,
    });
}

pub(crate) fn stmt_of(procedure: &Procedure, id: NodeId) -> Stmt {
    match procedure.node(id) {
        Some(node) => Stmt::new(procedure.name.as_str(), id, node.code.as_str(), node.span),
        None => Stmt::new(procedure.name.as_str(), id, "", None),
    }
}

/// Identifier-shaped argument (literals carry no object)
fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.')
}
