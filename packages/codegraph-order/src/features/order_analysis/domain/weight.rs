/*
 * Typestate Weight Domain
 *
 * Bounded idempotent semiring over sets of NFA transitions:
 *   ZERO   no valid path (absorbing under extend, identity of combine)
 *   ONE    no typestate change (identity of extend)
 *   {t}    transitions triggered along a pushdown rule
 *
 * extend  = relational composition ("apply w1, then w2")
 * combine = set union
 *
 * Composition is total: a transition s→t of the left operand with no
 * continuation from t in the right operand becomes s→ERROR, and ERROR
 * never leaves ERROR. An out-of-order operation therefore shows up as a
 * reachable error state instead of silently disappearing.
 *
 * Weights are bounded by the (finite) transition set of one NFA, which
 * guarantees termination of saturation.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;

use super::nfa::{NfaTransition, StateId, ERROR_OP};

/// Semiring interface used by the pushdown system and saturation
///
/// Laws (checked by property tests):
/// - `a.extend(one) == a`, `one.extend(a) == a`
/// - `a.extend(zero) == zero`, `zero.extend(a) == zero`
/// - `a.combine(a) == a`
/// - `a.combine(b) == b.combine(a)`
/// - `a.combine(zero) == a`
pub trait Semiring: Clone + Eq + Hash + Debug {
    /// Neutral element of `combine`, absorbing for `extend`
    fn zero() -> Self;

    /// Neutral element of `extend`
    fn one() -> Self;

    /// Sequential composition (`self` then `other`)
    fn extend(&self, other: &Self) -> Self;

    /// Join of two alternative paths
    fn combine(&self, other: &Self) -> Self;

    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    fn is_one(&self) -> bool {
        *self == Self::one()
    }
}

/// Typestate weight
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weight {
    Zero,
    One,
    Transitions(BTreeSet<NfaTransition>),
}

impl Weight {
    pub fn from_transitions<I>(transitions: I) -> Self
    where
        I: IntoIterator<Item = NfaTransition>,
    {
        Weight::Transitions(transitions.into_iter().collect())
    }

    /// Seed weight of an initial configuration: `(START→START, "constructor")`
    pub fn constructor() -> Self {
        Weight::from_transitions([NfaTransition::new(
            StateId::START,
            StateId::START,
            "constructor",
        )])
    }

    /// Transition set, `None` for ZERO/ONE
    pub fn transitions(&self) -> Option<&BTreeSet<NfaTransition>> {
        match self {
            Weight::Transitions(set) => Some(set),
            _ => None,
        }
    }

    /// Typestates this weight leads to
    pub fn targets(&self) -> BTreeSet<StateId> {
        match self {
            Weight::Transitions(set) => set.iter().map(|t| t.target).collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Whether some transition leaves the START state
    pub fn leaves_start(&self) -> bool {
        match self {
            Weight::Transitions(set) => set.iter().any(|t| t.source == StateId::START),
            _ => false,
        }
    }

    /// Whether the ERROR typestate is a target
    pub fn reaches_error(&self) -> bool {
        self.targets().contains(&StateId::ERROR)
    }

    fn compose(
        left: &BTreeSet<NfaTransition>,
        right: &BTreeSet<NfaTransition>,
    ) -> BTreeSet<NfaTransition> {
        let mut result = BTreeSet::new();
        for mine in left {
            if mine.target == StateId::ERROR {
                result.insert(mine.clone());
                continue;
            }
            let mut continued = false;
            for theirs in right.iter().filter(|t| t.source == mine.target) {
                continued = true;
                result.insert(NfaTransition::new(
                    mine.source,
                    theirs.target,
                    mine.label.clone(),
                ));
            }
            if !continued {
                result.insert(NfaTransition::new(
                    mine.source,
                    StateId::ERROR,
                    mine.label.clone(),
                ));
            }
        }
        result
    }
}

impl Semiring for Weight {
    fn zero() -> Self {
        Weight::Zero
    }

    fn one() -> Self {
        Weight::One
    }

    fn extend(&self, other: &Self) -> Self {
        match (self, other) {
            (Weight::One, w) | (w, Weight::One) => w.clone(),
            (Weight::Zero, _) | (_, Weight::Zero) => Weight::Zero,
            (Weight::Transitions(left), Weight::Transitions(right)) => {
                Weight::Transitions(Weight::compose(left, right))
            }
        }
    }

    fn combine(&self, other: &Self) -> Self {
        match (self, other) {
            (Weight::Zero, w) | (w, Weight::Zero) => w.clone(),
            (Weight::One, Weight::One) => Weight::One,
            (Weight::One, w @ Weight::Transitions(_)) | (w @ Weight::Transitions(_), Weight::One) => {
                w.clone()
            }
            (Weight::Transitions(left), Weight::Transitions(right)) => {
                Weight::Transitions(left.union(right).cloned().collect())
            }
        }
    }
}

impl Default for Weight {
    fn default() -> Self {
        Weight::Zero
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Weight::Zero => write!(f, "ZERO"),
            Weight::One => write!(f, "ONE"),
            Weight::Transitions(set) => {
                let parts: Vec<String> = set
                    .iter()
                    .map(|t| {
                        let target = if t.target == StateId::ERROR {
                            ERROR_OP.to_string()
                        } else {
                            t.target.0.to_string()
                        };
                        format!("{}-[{}]->{}", t.source.0, t.label, target)
                    })
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}
