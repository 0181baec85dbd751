/*
 * Order Analyzer
 *
 * Checks order rules against a program graph with the configured engine.
 *
 * # Pipeline (pushdown modes)
 * 1. Compile the order expression into an NFA
 * 2. Translate the program graph into weighted pushdown rules
 * 3. Select initial configurations
 * 4. Saturate (post-*)
 * 5. Interpret the saturated automaton into per-variable verdicts
 *
 * The sequential walker mode replaces steps 2-5 by a direct NFA walk over
 * each procedure.
 *
 * # Example
 * ```ignore
 * let policy = PolicyParser::from_file("policies/crypto.yaml")?;
 * let analyzer = OrderAnalyzer::new(AnalysisConfig::default())?.with_source(&policy);
 *
 * for report in analyzer.analyze_all(&policy.rules, &graph)? {
 *     for violation in report.violations() {
 *         println!("{}", violation);
 *     }
 * }
 * ```
 */

use std::time::Instant;
use tracing::{debug, info};

use crate::config::{AnalysisConfig, AnalysisMode};
use crate::errors::Result;
use crate::features::order_analysis::domain::{AnalysisStats, OrderReport, OrderRule};
use crate::features::order_analysis::infrastructure::{
    poststar, InitialConfiguration, NfaBuilder, OperationRegistry, ResultInterpreter, RuleBuilder,
};
use crate::features::order_analysis::ports::{OrderRuleSource, ProgramGraphProvider};

use super::sequential_walker::SequentialWalker;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Order analyzer
///
/// Holds the configuration and the operation registry of one analysis run.
pub struct OrderAnalyzer {
    config: AnalysisConfig,
    registry: OperationRegistry,
}

impl OrderAnalyzer {
    /// Create an analyzer; fails on an invalid configuration
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: OperationRegistry::new(),
        })
    }

    pub fn with_registry(mut self, registry: OperationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Use the operation table of a rule source
    pub fn with_source<S: OrderRuleSource + ?Sized>(self, source: &S) -> Self {
        self.with_registry(source.registry())
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Check one rule
    pub fn analyze<G: ProgramGraphProvider + ?Sized>(
        &self,
        rule: &OrderRule,
        graph: &G,
    ) -> Result<OrderReport> {
        let start_time = Instant::now();
        info!(rule = %rule.name, mode = ?self.config.mode, "Analyzing order rule");

        let nfa = NfaBuilder::build(&rule.order);
        nfa.validate()?;

        let mut report = OrderReport::new(rule.name.as_str());
        let mut stats = AnalysisStats {
            nfa_states: nfa.states().len(),
            nfa_transitions: nfa.transitions().len(),
            ..AnalysisStats::default()
        };
        let message = rule.message.as_deref();

        match self.config.mode {
            AnalysisMode::SequentialWalker => {
                let walk = SequentialWalker::new(&nfa, &self.registry, self.config.max_iterations)
                    .with_message(message)
                    .walk(graph);
                stats.iterations = walk.iterations;
                report.verdicts = walk.verdicts;
            }
            mode => {
                let wpds = RuleBuilder::new(&nfa, &self.registry)
                    .interprocedural(mode == AnalysisMode::Interprocedural)
                    .build(graph);
                stats.rules = wpds.counts();

                let initial = InitialConfiguration::create(self.config.seed_strategy, &wpds);
                stats.seeds = initial.seeds.len();

                let (automaton, iterations) =
                    poststar(&wpds, initial.automaton, self.config.max_iterations)?;
                stats.iterations = iterations;
                stats.automaton_transitions = automaton.len();
                debug!(rule = %rule.name, "Saturated automaton:\n{}", automaton);

                let interpretation = ResultInterpreter::new(&nfa, &wpds)
                    .with_message(message)
                    .interpret(&automaton, graph);
                report.verdicts = interpretation.verdicts;
                if self.config.report_configurations {
                    report.configurations = interpretation.configurations;
                }
                if self.config.keep_automaton {
                    report.automaton = Some(automaton);
                }
            }
        }

        stats.tracked_variables = report.verdicts.len();
        stats.analysis_time_ms = start_time.elapsed().as_millis() as u64;
        report.stats = stats;

        info!(
            rule = %rule.name,
            verdicts = report.verdicts.len(),
            violations = report.violations().len(),
            iterations = report.stats.iterations,
            "Order rule analyzed"
        );
        Ok(report)
    }

    /// Check independent rules; reports keep the order of `rules`
    pub fn analyze_all<G: ProgramGraphProvider + ?Sized>(
        &self,
        rules: &[OrderRule],
        graph: &G,
    ) -> Result<Vec<OrderReport>> {
        #[cfg(feature = "parallel")]
        let reports = rules.par_iter().map(|rule| self.analyze(rule, graph)).collect();

        #[cfg(not(feature = "parallel"))]
        let reports = rules.iter().map(|rule| self.analyze(rule, graph)).collect();

        reports
    }

    /// Check every rule of a source against the graph
    pub fn analyze_source<S, G>(&self, source: &S, graph: &G) -> Result<Vec<OrderReport>>
    where
        S: OrderRuleSource + ?Sized,
        G: ProgramGraphProvider + ?Sized,
    {
        self.analyze_all(&source.rules(), graph)
    }
}
