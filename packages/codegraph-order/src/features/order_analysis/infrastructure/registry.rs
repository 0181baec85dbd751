/*
 * Entity/Operation Registry
 *
 * Maps an order operation (`Entity.op`) to the callee names that implement
 * it, e.g. `Cipher.init` → {EVP_EncryptInit, EVP_DecryptInit}. Operations
 * without an entry are implemented by a callee of the same name.
 *
 * Constructed per analysis run and passed in explicitly.
 */

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    /// entity → op → callee names
    entities: FxHashMap<String, FxHashMap<String, BTreeSet<String>>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register callees for `entity.op` (builder style)
    pub fn with_operation<I, S>(mut self, entity: &str, op: &str, callees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(entity, op, callees);
        self
    }

    pub fn register<I, S>(&mut self, entity: &str, op: &str, callees: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities
            .entry(entity.to_string())
            .or_default()
            .entry(op.to_string())
            .or_default()
            .extend(callees.into_iter().map(Into::into));
    }

    /// Registered callees of `entity.op`
    pub fn callees(&self, entity: &str, op: &str) -> Option<&BTreeSet<String>> {
        self.entities.get(entity).and_then(|ops| ops.get(op))
    }

    pub fn has_entity(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    /// Whether calling `callee` performs `entity.op`
    ///
    /// Qualified callee names (`pkg.Type.method`, `ns::func`) match on their
    /// last segment.
    pub fn triggers(&self, entity: Option<&str>, op: &str, callee: &str) -> bool {
        let short = Self::short_name(callee);
        match entity.and_then(|e| self.callees(e, op)) {
            Some(callees) if !callees.is_empty() => callees
                .iter()
                .any(|c| c == callee || Self::short_name(c) == short),
            _ => short == op,
        }
    }

    fn short_name(name: &str) -> &str {
        let after_colons = name.rsplit("::").next().unwrap_or(name);
        after_colons.rsplit('.').next().unwrap_or(after_colons)
    }

    pub fn len(&self) -> usize {
        self.entities.values().map(|ops| ops.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_op_matches_by_name() {
        let registry = OperationRegistry::new();
        assert!(registry.triggers(Some("Cipher"), "start", "start"));
        assert!(registry.triggers(Some("Cipher"), "start", "javax.crypto.Cipher.start"));
        assert!(!registry.triggers(Some("Cipher"), "start", "finish"));
    }

    #[test]
    fn test_registered_callees() {
        let registry = OperationRegistry::new().with_operation(
            "Cipher",
            "init",
            ["EVP_EncryptInit", "EVP_DecryptInit"],
        );
        assert!(registry.triggers(Some("Cipher"), "init", "EVP_EncryptInit"));
        assert!(registry.triggers(Some("Cipher"), "init", "ossl::EVP_DecryptInit"));
        assert!(!registry.triggers(Some("Cipher"), "init", "init"));
        assert_eq!(registry.len(), 1);
        assert!(registry.has_entity("Cipher"));
    }

    #[test]
    fn test_pseudo_states_without_entity() {
        let registry = OperationRegistry::new().with_operation("Cipher", "init", ["x"]);
        assert!(registry.triggers(None, "init", "init"));
    }
}
