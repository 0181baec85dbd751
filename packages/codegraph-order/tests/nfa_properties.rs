//! Property tests for the order compiler and the weight domain
//!
//! - Every compiled automaton passes its structural checks
//! - Compilation is deterministic
//! - A word built from the expression is accepted, and every engine
//!   analyses it as PASS
//! - Semiring laws of `Weight`

mod common;

use common::*;
use std::collections::BTreeSet;

use codegraph_order::features::order_analysis::domain::{
    NfaTransition, RepetitionOp, Semiring, StateId, Weight,
};
use codegraph_order::{NfaBuilder, OrderAnalyzer, OrderExpr, OrderRule, OrderVerdict};
use proptest::prelude::*;

fn t(op: &str) -> OrderExpr {
    OrderExpr::terminal("Obj", op)
}

// ============================================================================
// Fixed expressions
// ============================================================================

#[test]
fn test_optional_accepts_zero_or_one() {
    let nfa = NfaBuilder::build(&OrderExpr::seq(OrderExpr::optional(t("a")), t("b")));
    assert!(nfa.accepts(&["b"]));
    assert!(nfa.accepts(&["a", "b"]));
    assert!(!nfa.accepts(&["a", "a", "b"]));
    assert!(!nfa.accepts(&["a"]));
}

#[test]
fn test_one_or_more_needs_one() {
    let nfa = NfaBuilder::build(&OrderExpr::seq(OrderExpr::one_or_more(t("a")), t("b")));
    assert!(!nfa.accepts(&["b"]));
    assert!(nfa.accepts(&["a", "b"]));
    assert!(nfa.accepts(&["a", "a", "a", "b"]));
}

#[test]
fn test_zero_or_more() {
    let nfa = NfaBuilder::build(&OrderExpr::seq(OrderExpr::zero_or_more(t("a")), t("b")));
    assert!(nfa.accepts(&["b"]));
    assert!(nfa.accepts(&["a", "a", "b"]));
    assert!(!nfa.accepts(&["b", "a"]));
}

#[test]
fn test_alternative() {
    let nfa = NfaBuilder::build(&OrderExpr::seq(OrderExpr::alt(t("a"), t("b")), t("c")));
    assert!(nfa.accepts(&["a", "c"]));
    assert!(nfa.accepts(&["b", "c"]));
    assert!(!nfa.accepts(&["a", "b", "c"]));
}

#[test]
fn test_repeated_group_loops_to_its_head() {
    // (start, process*, finish)+
    let group = OrderExpr::seq(
        OrderExpr::seq(t("start"), OrderExpr::zero_or_more(t("process"))),
        t("finish"),
    );
    let nfa = NfaBuilder::build(&OrderExpr::one_or_more(group));

    assert!(nfa.accepts(&["start", "finish"]));
    assert!(nfa.accepts(&["start", "process", "finish", "start", "finish"]));
    assert!(!nfa.accepts(&["start", "finish", "process"]));
    assert!(!nfa.accepts(&["start", "process"]));
}

#[test]
fn test_error_state_is_never_a_transition_target() {
    let nfa = NfaBuilder::build(&OrderExpr::seq(t("a"), OrderExpr::zero_or_more(t("b"))));
    assert!(nfa.transitions().iter().all(|tr| tr.target != StateId::ERROR));
    assert!(nfa.is_error(nfa.error()));
    assert!(!nfa.is_end(nfa.error()));
}

// ============================================================================
// Generated expressions
// ============================================================================

fn arb_expr() -> impl Strategy<Value = OrderExpr> {
    let leaf = "[a-e]".prop_map(|op| OrderExpr::terminal("Obj", op));
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| OrderExpr::seq(l, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| OrderExpr::alt(l, r)),
            (
                inner,
                prop_oneof![
                    Just(RepetitionOp::Optional),
                    Just(RepetitionOp::OneOrMore),
                    Just(RepetitionOp::ZeroOrMore),
                ]
            )
                .prop_map(|(e, op)| OrderExpr::repeat(e, op)),
        ]
    })
}

/// One word of the expression: left alternatives, one iteration per repetition
fn sample_word(expr: &OrderExpr, out: &mut Vec<String>) {
    match expr {
        OrderExpr::Terminal { op, .. } => out.push(op.clone()),
        OrderExpr::Sequence { left, right } => {
            sample_word(left, out);
            sample_word(right, out);
        }
        OrderExpr::Alternative { left, .. } => sample_word(left, out),
        OrderExpr::Repetition { inner, .. } => sample_word(inner, out),
        OrderExpr::Unsupported => {}
    }
}

proptest! {
    #[test]
    fn prop_compiled_nfa_is_well_formed(expr in arb_expr()) {
        let nfa = NfaBuilder::build(&expr);
        prop_assert!(nfa.validate().is_ok());
        prop_assert!(!nfa.initial_transitions().is_empty());
        for (_, op) in expr.terminals() {
            prop_assert!(nfa.transitions().iter().any(|tr| tr.label == op));
        }
    }

    #[test]
    fn prop_compilation_is_deterministic(expr in arb_expr()) {
        let first = NfaBuilder::build(&expr);
        let second = NfaBuilder::build(&expr);
        prop_assert_eq!(first.signatures(), second.signatures());
        prop_assert_eq!(first.transitions(), second.transitions());
    }

    #[test]
    fn prop_sample_word_is_accepted(expr in arb_expr()) {
        let nfa = NfaBuilder::build(&expr);
        let mut word = Vec::new();
        sample_word(&expr, &mut word);
        prop_assert!(nfa.accepts(&word), "{} rejects {:?}", expr, word);
    }

    #[test]
    fn prop_one_target_per_label(expr in arb_expr()) {
        let nfa = NfaBuilder::build(&expr);
        let mut seen = BTreeSet::new();
        for tr in nfa.transitions() {
            prop_assert!(
                seen.insert((tr.source, tr.label.clone())),
                "state {} has two '{}' transitions in {}",
                nfa.state_name(tr.source),
                tr.label,
                expr
            );
        }
    }

    #[test]
    fn prop_every_reachable_state_can_finish(expr in arb_expr()) {
        let nfa = NfaBuilder::build(&expr);
        for state in nfa.reachable_states() {
            prop_assert!(nfa.reaches_end(state), "state {} of {}", nfa.state_name(state), expr);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_accepted_word_passes_in_every_mode(expr in arb_expr()) {
        let mut word = Vec::new();
        sample_word(&expr, &mut word);
        prop_assume!(!word.is_empty());

        let ops: Vec<&str> = word.iter().map(String::as_str).collect();
        let graph = single_procedure(|p| p.with_calls("obj", &ops));
        let rule = OrderRule::new("sampled", expr.clone());

        for config in all_modes() {
            let mode = config.mode;
            let report = OrderAnalyzer::new(config).unwrap().analyze(&rule, &graph).unwrap();
            prop_assert_eq!(
                report.verdict_for("obj", "main"),
                Some(&OrderVerdict::Pass),
                "{:?}: {} on {:?}",
                mode,
                expr,
                word
            );
        }
    }
}

// ============================================================================
// Weight semiring
// ============================================================================

fn arb_transitions() -> impl Strategy<Value = Weight> {
    prop::collection::btree_set((0u32..5, 0u32..5, "[abc]"), 1..6).prop_map(|set| {
        Weight::from_transitions(
            set.into_iter()
                .map(|(from, to, label)| NfaTransition::new(StateId(from), StateId(to), label)),
        )
    })
}

fn arb_weight() -> impl Strategy<Value = Weight> {
    prop_oneof![
        1 => Just(Weight::Zero),
        1 => Just(Weight::One),
        6 => arb_transitions(),
    ]
}

proptest! {
    #[test]
    fn prop_one_is_neutral_for_extend(a in arb_weight()) {
        prop_assert_eq!(a.extend(&Weight::one()), a.clone());
        prop_assert_eq!(Weight::one().extend(&a), a);
    }

    #[test]
    fn prop_zero_annihilates(a in arb_weight()) {
        prop_assert!(a.extend(&Weight::zero()).is_zero());
        prop_assert!(Weight::zero().extend(&a).is_zero());
        prop_assert_eq!(a.combine(&Weight::zero()), a);
    }

    #[test]
    fn prop_combine_is_idempotent_and_commutative(a in arb_weight(), b in arb_weight()) {
        prop_assert_eq!(a.combine(&a), a.clone());
        prop_assert_eq!(a.combine(&b), b.combine(&a));
    }

    #[test]
    fn prop_combine_is_associative(a in arb_weight(), b in arb_weight(), c in arb_weight()) {
        prop_assert_eq!(a.combine(&b).combine(&c), a.combine(&b.combine(&c)));
    }

    #[test]
    fn prop_extend_is_associative(a in arb_weight(), b in arb_weight(), c in arb_weight()) {
        prop_assert_eq!(a.extend(&b).extend(&c), a.extend(&b.extend(&c)));
    }

    #[test]
    fn prop_extend_distributes_from_the_right(
        a in arb_transitions(),
        b in arb_transitions(),
        c in arb_transitions(),
    ) {
        prop_assert_eq!(a.combine(&b).extend(&c), a.extend(&c).combine(&b.extend(&c)));
    }

    #[test]
    fn prop_error_is_sticky(a in arb_transitions(), b in arb_weight()) {
        prop_assume!(!b.is_zero());
        let errors: Vec<_> = a
            .transitions()
            .into_iter()
            .flatten()
            .filter(|tr| tr.target == StateId::ERROR)
            .map(|tr| tr.source)
            .collect();
        let composed = a.extend(&b);
        for source in errors {
            prop_assert!(composed
                .transitions()
                .into_iter()
                .flatten()
                .any(|tr| tr.source == source && tr.target == StateId::ERROR));
        }
    }
}
