/*
 * Order Analysis Infrastructure
 *
 * NFA compilation, pushdown rule construction, seeding, post-* saturation
 * and result interpretation, plus policy loading.
 */

mod initial_config;
mod nfa_builder;
mod policy_parser;
mod poststar;
mod registry;
mod result_interpreter;
mod rule_builder;

pub use initial_config::{InitialConfiguration, Seed};
pub use nfa_builder::NfaBuilder;
pub use policy_parser::{OrderPolicy, PolicyParseError, PolicyParser};
pub use poststar::poststar;
pub use registry::OperationRegistry;
pub use result_interpreter::{Interpretation, ResultInterpreter};
pub use rule_builder::RuleBuilder;

pub(crate) use rule_builder::stmt_of;
