/*
 * Order Policy Parser
 *
 * Load order rules and their entity operation tables from YAML/JSON.
 *
 * # Schema
 * ```yaml
 * policy: crypto
 * entities:
 *   Cipher:
 *     create: [EVP_CIPHER_CTX_new]
 *     init: [EVP_EncryptInit, EVP_DecryptInit]
 * rules:
 *   - name: cipher-order
 *     message: cipher used out of order
 *     order:
 *       kind: sequence
 *       left:  { kind: terminal, entity: Cipher, op: create }
 *       right: { kind: terminal, entity: Cipher, op: init }
 * ```
 *
 * The order is the already-parsed expression tree. Unknown `kind` values
 * become unsupported nodes and are skipped when compiling.
 *
 * # Validation
 * - Rule names are non-empty and unique
 * - Every order has at least one terminal
 * - If entities are declared, every terminal refers to a declared entity
 */

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::warn;

use crate::features::order_analysis::domain::OrderRule;
use crate::features::order_analysis::infrastructure::OperationRegistry;
use crate::features::order_analysis::ports::OrderRuleSource;

/// Order policy (YAML/JSON schema)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPolicy {
    /// Policy name
    pub policy: String,

    /// entity → op → implementing callee names
    #[serde(default)]
    pub entities: BTreeMap<String, BTreeMap<String, Vec<String>>>,

    pub rules: Vec<OrderRule>,
}

impl OrderPolicy {
    pub fn rule(&self, name: &str) -> Option<&OrderRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Operation registry built from the entity section
    pub fn operation_registry(&self) -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        for (entity, ops) in &self.entities {
            for (op, callees) in ops {
                registry.register(entity, op, callees.iter().cloned());
            }
        }
        registry
    }
}

impl OrderRuleSource for OrderPolicy {
    fn rules(&self) -> Vec<OrderRule> {
        self.rules.clone()
    }

    fn registry(&self) -> OperationRegistry {
        self.operation_registry()
    }
}

/// Policy parser
pub struct PolicyParser;

/// Parse error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyParseError {
    /// YAML/JSON syntax error
    SyntaxError(String),

    /// Schema validation error
    ValidationError(String),

    /// File could not be read
    IoError(String),
}

impl std::fmt::Display for PolicyParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyParseError::SyntaxError(msg) => write!(f, "Syntax error: {}", msg),
            PolicyParseError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            PolicyParseError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for PolicyParseError {}

impl PolicyParser {
    /// Parse policy from YAML
    pub fn from_yaml(yaml: &str) -> Result<OrderPolicy, PolicyParseError> {
        let policy: OrderPolicy = serde_yaml::from_str(yaml)
            .map_err(|e| PolicyParseError::SyntaxError(format!("YAML parse error: {}", e)))?;

        Self::validate(&policy)?;
        Ok(policy)
    }

    /// Parse policy from JSON
    pub fn from_json(json: &str) -> Result<OrderPolicy, PolicyParseError> {
        let policy: OrderPolicy = serde_json::from_str(json)
            .map_err(|e| PolicyParseError::SyntaxError(format!("JSON parse error: {}", e)))?;

        Self::validate(&policy)?;
        Ok(policy)
    }

    /// Parse a policy file; `.json` is read as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<OrderPolicy, PolicyParseError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PolicyParseError::IoError(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    fn validate(policy: &OrderPolicy) -> Result<(), PolicyParseError> {
        let mut names = BTreeSet::new();

        for rule in &policy.rules {
            if rule.name.trim().is_empty() {
                return Err(PolicyParseError::ValidationError(
                    "Rule name must not be empty".to_string(),
                ));
            }
            if !names.insert(rule.name.as_str()) {
                return Err(PolicyParseError::ValidationError(format!(
                    "Duplicate rule name '{}'",
                    rule.name
                )));
            }

            let terminals = rule.order.terminals();
            if terminals.is_empty() {
                return Err(PolicyParseError::ValidationError(format!(
                    "Rule '{}' has no operations in its order",
                    rule.name
                )));
            }

            if !policy.entities.is_empty() {
                if let Some((entity, op)) = terminals
                    .iter()
                    .find(|(entity, _)| !policy.entities.contains_key(*entity))
                {
                    return Err(PolicyParseError::ValidationError(format!(
                        "Rule '{}' refers to undeclared entity '{}' (in {}.{})",
                        rule.name, entity, entity, op
                    )));
                }
            }

            let entities: BTreeSet<&str> = terminals.iter().map(|(entity, _)| *entity).collect();
            if entities.len() > 1 {
                warn!(
                    rule = %rule.name,
                    "Order mixes entities {:?}; operations are tracked per variable",
                    entities
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::order_analysis::domain::OrderExpr;

    const POLICY: &str = r#"
policy: crypto
entities:
  Cipher:
    init: [EVP_EncryptInit, EVP_DecryptInit]
rules:
  - name: cipher-order
    message: cipher used out of order
    order:
      kind: sequence
      left:
        kind: terminal
        entity: Cipher
        op: init
      right:
        kind: repetition
        op: "+"
        inner:
          kind: terminal
          entity: Cipher
          op: update
"#;

    #[test]
    fn test_parse_yaml_policy() {
        let policy = PolicyParser::from_yaml(POLICY).unwrap();
        assert_eq!(policy.policy, "crypto");
        let rule = policy.rule("cipher-order").unwrap();
        assert_eq!(rule.message.as_deref(), Some("cipher used out of order"));
        assert_eq!(rule.order.to_string(), "Cipher.init, Cipher.update+");

        let registry = policy.operation_registry();
        assert!(registry.triggers(Some("Cipher"), "init", "EVP_DecryptInit"));
        assert!(registry.triggers(Some("Cipher"), "update", "update"));
    }

    #[test]
    fn test_parse_json_policy() {
        let json = r#"{
          "policy": "files",
          "rules": [
            {"name": "open-close", "order": {"kind": "sequence",
              "left": {"kind": "terminal", "entity": "File", "op": "open"},
              "right": {"kind": "terminal", "entity": "File", "op": "close"}}}
          ]
        }"#;
        let policy = PolicyParser::from_json(json).unwrap();
        assert_eq!(
            policy.rules[0].order,
            OrderExpr::seq(
                OrderExpr::terminal("File", "open"),
                OrderExpr::terminal("File", "close")
            )
        );
        assert_eq!(policy.rules().len(), 1);
    }

    #[test]
    fn test_syntax_error() {
        let result = PolicyParser::from_yaml("policy: [unterminated");
        assert!(matches!(result, Err(PolicyParseError::SyntaxError(_))));
    }

    #[test]
    fn test_duplicate_rule_names() {
        let yaml = r#"
policy: p
rules:
  - name: r
    order: { kind: terminal, entity: A, op: a }
  - name: r
    order: { kind: terminal, entity: A, op: b }
"#;
        let err = PolicyParser::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate rule name 'r'"));
    }

    #[test]
    fn test_undeclared_entity() {
        let yaml = r#"
policy: p
entities:
  A:
    a: [do_a]
rules:
  - name: r
    order: { kind: terminal, entity: B, op: b }
"#;
        let err = PolicyParser::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, PolicyParseError::ValidationError(_)));
    }

    #[test]
    fn test_order_without_terminals() {
        let yaml = r#"
policy: p
rules:
  - name: r
    order: { kind: lookahead }
"#;
        assert!(PolicyParser::from_yaml(yaml).is_err());
    }
}
