//! Saturation tests on programs built from source-like statements

mod common;

use common::*;
use pretty_assertions::assert_eq;

use codegraph_order::config::{AnalysisConfig, AnalysisMode, Preset, SeedStrategy};
use codegraph_order::features::order_analysis::domain::{FindingKind, Nfa, Val, Weight, Wpds};
use codegraph_order::features::order_analysis::infrastructure::{
    poststar, InitialConfiguration, ResultInterpreter, RuleBuilder,
};
use codegraph_order::{NfaBuilder, OperationRegistry, OrderAnalysisError, OrderAnalyzer, ProgramGraph};

fn helper_program() -> ProgramGraph {
    let main = ProcedureBuilder::new("main", 2)
        .with_calls("c", &["create", "init"])
        .with_invoke("cycle", &["c"])
        .with_invoke("cycle", &["c"])
        .with_call("c", "reset")
        .build();
    let cycle = ProcedureBuilder::new("cycle", 20)
        .with_params(&["k"])
        .with_calls("k", &["start", "process", "finish"])
        .build();
    ProgramGraph::new().with_procedure(main).with_procedure(cycle)
}

fn system(nfa: &Nfa, graph: &ProgramGraph, registry: &OperationRegistry) -> Wpds<Weight> {
    RuleBuilder::new(nfa, registry).interprocedural(true).build(graph)
}

#[test]
fn test_saturation_reaches_a_fixed_point() {
    let nfa = NfaBuilder::build(&cipher_lifecycle().order);
    let registry = OperationRegistry::new();
    let graph = helper_program();
    let wpds = system(&nfa, &graph, &registry);
    let initial = InitialConfiguration::create(SeedStrategy::FirstEvent, &wpds);
    assert!(!initial.is_empty());

    let (once, _) = poststar(&wpds, initial.automaton, 100_000).unwrap();
    let (twice, _) = poststar(&wpds, once.clone(), 100_000).unwrap();

    let interpreter = ResultInterpreter::new(&nfa, &wpds);
    assert_eq!(
        ResultInterpreter::configuration_weights(&once),
        ResultInterpreter::configuration_weights(&twice)
    );
    assert_eq!(once, twice);
}

#[test]
fn test_repeated_callee_passes() {
    let nfa = NfaBuilder::build(&cipher_lifecycle().order);
    let registry = OperationRegistry::new();
    let graph = helper_program();
    let wpds = system(&nfa, &graph, &registry);
    let initial = InitialConfiguration::create(SeedStrategy::FirstEvent, &wpds);

    let (automaton, _) = poststar(&wpds, initial.automaton, 100_000).unwrap();
    let interpretation = ResultInterpreter::new(&nfa, &wpds).interpret(&automaton, &graph);

    let c = interpretation
        .verdicts
        .iter()
        .find(|v| v.val == Val::new("c", "main"))
        .expect("c is tracked");
    assert!(!c.verdict.is_violation(), "{:?}", c.verdict);
    assert!(interpretation
        .configurations
        .iter()
        .all(|f| f.kind != FindingKind::Violation));
}

#[test]
fn test_no_initial_configuration_gives_empty_automaton() {
    let nfa = NfaBuilder::build(&start_finish().order);
    let registry = OperationRegistry::new();
    let graph = single_procedure(|p| p.with_call("s", "toString"));
    let wpds = system(&nfa, &graph, &registry);

    let initial = InitialConfiguration::create(SeedStrategy::FirstEvent, &wpds);
    assert!(initial.is_empty());

    let (automaton, iterations) = poststar(&wpds, initial.automaton, 10).unwrap();
    assert!(automaton.is_empty());
    assert_eq!(iterations, 0);
}

#[test]
fn test_iteration_budget_is_an_error() {
    let config = AnalysisConfig::from_preset(Preset::Thorough).max_iterations(3);
    let analyzer = OrderAnalyzer::new(config).unwrap();

    let result = analyzer.analyze(&cipher_lifecycle(), &helper_program());
    assert!(matches!(
        result,
        Err(OrderAnalysisError::IterationLimit {
            max_iterations: 3,
            ..
        })
    ));
}

#[test]
fn test_configuration_findings_are_reported() {
    let config = AnalysisConfig::from_preset(Preset::Thorough)
        .mode(AnalysisMode::Intraprocedural)
        .report_configurations(true);
    let analyzer = OrderAnalyzer::new(config).unwrap();
    let graph = single_procedure(|p| p.with_calls("c", &["start", "start", "finish"]));

    let report = analyzer.analyze(&start_finish(), &graph).unwrap();

    let violations: Vec<_> = report
        .configurations
        .iter()
        .filter(|f| f.kind == FindingKind::Violation)
        .collect();
    assert!(!violations.is_empty());
    assert!(violations.iter().all(|f| f.val == Val::new("c", "main")));
    assert!(violations.iter().all(|f| f.states.contains(&"ERROR".to_string())));
}
