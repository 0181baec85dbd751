//! Shared fixtures: order rules and policy texts

#![allow(dead_code)]

use codegraph_order::config::{AnalysisConfig, AnalysisMode, Preset};
use codegraph_order::features::order_analysis::domain::{OrderExpr, OrderRule};

/// `start, finish`
pub fn start_finish() -> OrderRule {
    OrderRule::new(
        "start-finish",
        OrderExpr::seq(
            OrderExpr::terminal("Cipher", "start"),
            OrderExpr::terminal("Cipher", "finish"),
        ),
    )
}

/// `create, init, (start, process*, finish)+, reset?`
pub fn cipher_lifecycle() -> OrderRule {
    let cycle = OrderExpr::one_or_more(
        OrderExpr::seq_all([
            OrderExpr::terminal("Cipher", "start"),
            OrderExpr::zero_or_more(OrderExpr::terminal("Cipher", "process")),
            OrderExpr::terminal("Cipher", "finish"),
        ])
        .expect("non-empty sequence"),
    );
    let order = OrderExpr::seq_all([
        OrderExpr::terminal("Cipher", "create"),
        OrderExpr::terminal("Cipher", "init"),
        cycle,
        OrderExpr::optional(OrderExpr::terminal("Cipher", "reset")),
    ])
    .expect("non-empty sequence");
    OrderRule::new("cipher-lifecycle", order).with_message("Cipher used out of order")
}

/// `(a, b) | (a, c)`
pub fn shared_prefix_alternative() -> OrderRule {
    let t = |op: &str| OrderExpr::terminal("Cipher", op);
    OrderRule::new(
        "shared-prefix",
        OrderExpr::alt(OrderExpr::seq(t("a"), t("b")), OrderExpr::seq(t("a"), t("c"))),
    )
}

/// `a?, a`
pub fn optional_prefix_of_same_op() -> OrderRule {
    let t = |op: &str| OrderExpr::terminal("Cipher", op);
    OrderRule::new("optional-prefix", OrderExpr::seq(OrderExpr::optional(t("a")), t("a")))
}

/// All three engines
pub fn all_modes() -> Vec<AnalysisConfig> {
    [
        AnalysisMode::SequentialWalker,
        AnalysisMode::Intraprocedural,
        AnalysisMode::Interprocedural,
    ]
    .into_iter()
    .map(|mode| AnalysisConfig::from_preset(Preset::Thorough).mode(mode))
    .collect()
}

pub const CRYPTO_POLICY: &str = r#"
policy: crypto
entities:
  Cipher:
    create: [EVP_CIPHER_CTX_new]
    init: [EVP_EncryptInit_ex]
    update: [EVP_EncryptUpdate]
    finish: [EVP_EncryptFinal_ex]
rules:
  - name: evp-encrypt
    message: EVP cipher context used out of order
    order:
      kind: sequence
      left:
        kind: sequence
        left: { kind: terminal, entity: Cipher, op: init }
        right:
          kind: repetition
          op: "*"
          inner: { kind: terminal, entity: Cipher, op: update }
      right: { kind: terminal, entity: Cipher, op: finish }
"#;
