/*
 * Order Expression AST
 *
 * Regular expression over operation names describing the allowed call
 * order on one object:
 *   Terminal     entity.op
 *   Sequence     l, r
 *   Repetition   e?  e+  e*
 *   Alternative  l | r
 *
 * Parsing the surface syntax happens elsewhere; policies supply this tree
 * directly (see infrastructure::policy_parser for the YAML/JSON schema).
 */

use serde::{Deserialize, Serialize};

/// Repetition operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepetitionOp {
    /// `?` - zero or one
    #[serde(rename = "?", alias = "optional")]
    Optional,

    /// `+` - one or more
    #[serde(rename = "+", alias = "one_or_more")]
    OneOrMore,

    /// `*` - zero or more
    #[serde(rename = "*", alias = "zero_or_more")]
    ZeroOrMore,
}

impl std::fmt::Display for RepetitionOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepetitionOp::Optional => write!(f, "?"),
            RepetitionOp::OneOrMore => write!(f, "+"),
            RepetitionOp::ZeroOrMore => write!(f, "*"),
        }
    }
}

/// Order expression node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderExpr {
    /// Single operation `entity.op`
    Terminal { entity: String, op: String },

    /// `left, right`
    Sequence {
        left: Box<OrderExpr>,
        right: Box<OrderExpr>,
    },

    /// `inner?`, `inner+`, `inner*`
    Repetition {
        inner: Box<OrderExpr>,
        op: RepetitionOp,
    },

    /// `left | right`
    Alternative {
        left: Box<OrderExpr>,
        right: Box<OrderExpr>,
    },

    /// Node kind the compiler does not understand (skipped during compilation)
    #[serde(other)]
    Unsupported,
}

impl OrderExpr {
    pub fn terminal(entity: impl Into<String>, op: impl Into<String>) -> Self {
        OrderExpr::Terminal {
            entity: entity.into(),
            op: op.into(),
        }
    }

    pub fn seq(left: OrderExpr, right: OrderExpr) -> Self {
        OrderExpr::Sequence {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Left-nested sequence of all items; `None` for an empty list
    pub fn seq_all<I>(items: I) -> Option<Self>
    where
        I: IntoIterator<Item = OrderExpr>,
    {
        items.into_iter().reduce(OrderExpr::seq)
    }

    pub fn alt(left: OrderExpr, right: OrderExpr) -> Self {
        OrderExpr::Alternative {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn repeat(inner: OrderExpr, op: RepetitionOp) -> Self {
        OrderExpr::Repetition {
            inner: Box::new(inner),
            op,
        }
    }

    pub fn optional(inner: OrderExpr) -> Self {
        Self::repeat(inner, RepetitionOp::Optional)
    }

    pub fn one_or_more(inner: OrderExpr) -> Self {
        Self::repeat(inner, RepetitionOp::OneOrMore)
    }

    pub fn zero_or_more(inner: OrderExpr) -> Self {
        Self::repeat(inner, RepetitionOp::ZeroOrMore)
    }

    /// All `(entity, op)` terminals in left-to-right order
    pub fn terminals(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        self.collect_terminals(&mut out);
        out
    }

    fn collect_terminals<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        match self {
            OrderExpr::Terminal { entity, op } => out.push((entity.as_str(), op.as_str())),
            OrderExpr::Sequence { left, right } | OrderExpr::Alternative { left, right } => {
                left.collect_terminals(out);
                right.collect_terminals(out);
            }
            OrderExpr::Repetition { inner, .. } => inner.collect_terminals(out),
            OrderExpr::Unsupported => {}
        }
    }

    /// Entity of the first terminal (the instance the order talks about)
    pub fn primary_entity(&self) -> Option<&str> {
        self.terminals().first().map(|(entity, _)| *entity)
    }

    fn precedence(&self) -> u8 {
        match self {
            OrderExpr::Alternative { .. } => 0,
            OrderExpr::Sequence { .. } => 1,
            _ => 2,
        }
    }

    fn fmt_child(
        child: &OrderExpr,
        min: u8,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        if child.precedence() < min {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

impl std::fmt::Display for OrderExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderExpr::Terminal { entity, op } => write!(f, "{}.{}", entity, op),
            OrderExpr::Sequence { left, right } => {
                Self::fmt_child(left, 1, f)?;
                write!(f, ", ")?;
                Self::fmt_child(right, 1, f)
            }
            OrderExpr::Alternative { left, right } => {
                Self::fmt_child(left, 0, f)?;
                write!(f, " | ")?;
                Self::fmt_child(right, 0, f)
            }
            OrderExpr::Repetition { inner, op } => {
                Self::fmt_child(inner, 2, f)?;
                write!(f, "{}", op)
            }
            OrderExpr::Unsupported => write!(f, "<unsupported>"),
        }
    }
}

/// Named order rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRule {
    pub name: String,

    pub order: OrderExpr,

    /// Message attached to violations
    #[serde(default)]
    pub message: Option<String>,
}

impl OrderRule {
    pub fn new(name: impl Into<String>, order: OrderExpr) -> Self {
        Self {
            name: name.into(),
            order,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Entity the rule constrains
    pub fn entity(&self) -> Option<&str> {
        self.order.primary_entity()
    }
}
