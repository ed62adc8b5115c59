//! Traversal predicates
//!
//! [`GremlinPredicates`] is the capability every output form implements;
//! [`Predicate`] is the flavor-neutral value produced by
//! [`NeutralPredicates`] and stored inside neutral traversal steps.

use cygnet_core::Value;
use serde::{Deserialize, Serialize};

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// A constant known at translation time
    Value(Value),
    /// A query parameter, bound by name at execution
    Parameter(String),
    /// A path label, compared against the labelled object
    Label(String),
}

impl Operand {
    pub fn value<V: Into<Value>>(value: V) -> Self {
        Operand::Value(value.into())
    }

    pub fn parameter<S: Into<String>>(name: S) -> Self {
        Operand::Parameter(name.into())
    }

    pub fn label<S: Into<String>>(name: S) -> Self {
        Operand::Label(name.into())
    }
}

/// Flavor-neutral predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Eq(Operand),
    Neq(Operand),
    Gt(Operand),
    Gte(Operand),
    Lt(Operand),
    Lte(Operand),
    /// Inclusive low, exclusive high
    Between(Operand, Operand),
    Within(Operand),
    Without(Operand),
    StartsWith(Operand),
    EndsWith(Operand),
    Contains(Operand),
}

impl Predicate {
    /// Operands referenced by this predicate
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Predicate::Between(low, high) => vec![low, high],
            Predicate::Eq(o)
            | Predicate::Neq(o)
            | Predicate::Gt(o)
            | Predicate::Gte(o)
            | Predicate::Lt(o)
            | Predicate::Lte(o)
            | Predicate::Within(o)
            | Predicate::Without(o)
            | Predicate::StartsWith(o)
            | Predicate::EndsWith(o)
            | Predicate::Contains(o) => vec![o],
        }
    }

    /// True for the string-matching predicates that no stock Gremlin `P` covers
    pub fn is_custom(&self) -> bool {
        matches!(
            self,
            Predicate::StartsWith(_) | Predicate::EndsWith(_) | Predicate::Contains(_)
        )
    }

    /// Replay this predicate onto another predicate factory
    pub fn replay<P: GremlinPredicates>(&self, target: &P) -> P::Output {
        match self {
            Predicate::Eq(o) => target.is_eq(o.clone()),
            Predicate::Neq(o) => target.neq(o.clone()),
            Predicate::Gt(o) => target.gt(o.clone()),
            Predicate::Gte(o) => target.gte(o.clone()),
            Predicate::Lt(o) => target.lt(o.clone()),
            Predicate::Lte(o) => target.lte(o.clone()),
            Predicate::Between(low, high) => target.between(low.clone(), high.clone()),
            Predicate::Within(o) => target.within(o.clone()),
            Predicate::Without(o) => target.without(o.clone()),
            Predicate::StartsWith(o) => target.starts_with(o.clone()),
            Predicate::EndsWith(o) => target.ends_with(o.clone()),
            Predicate::Contains(o) => target.contains(o.clone()),
        }
    }
}

/// Factory for comparison, membership and string-matching predicates
pub trait GremlinPredicates {
    type Output;

    fn is_eq(&self, value: Operand) -> Self::Output;
    fn neq(&self, value: Operand) -> Self::Output;
    fn gt(&self, value: Operand) -> Self::Output;
    fn gte(&self, value: Operand) -> Self::Output;
    fn lt(&self, value: Operand) -> Self::Output;
    fn lte(&self, value: Operand) -> Self::Output;
    fn between(&self, low: Operand, high: Operand) -> Self::Output;
    fn within(&self, values: Operand) -> Self::Output;
    fn without(&self, values: Operand) -> Self::Output;
    fn starts_with(&self, prefix: Operand) -> Self::Output;
    fn ends_with(&self, suffix: Operand) -> Self::Output;
    fn contains(&self, infix: Operand) -> Self::Output;
}

/// Builds [`Predicate`] values
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralPredicates;

impl GremlinPredicates for NeutralPredicates {
    type Output = Predicate;

    fn is_eq(&self, value: Operand) -> Predicate {
        Predicate::Eq(value)
    }

    fn neq(&self, value: Operand) -> Predicate {
        Predicate::Neq(value)
    }

    fn gt(&self, value: Operand) -> Predicate {
        Predicate::Gt(value)
    }

    fn gte(&self, value: Operand) -> Predicate {
        Predicate::Gte(value)
    }

    fn lt(&self, value: Operand) -> Predicate {
        Predicate::Lt(value)
    }

    fn lte(&self, value: Operand) -> Predicate {
        Predicate::Lte(value)
    }

    fn between(&self, low: Operand, high: Operand) -> Predicate {
        Predicate::Between(low, high)
    }

    fn within(&self, values: Operand) -> Predicate {
        Predicate::Within(values)
    }

    fn without(&self, values: Operand) -> Predicate {
        Predicate::Without(values)
    }

    fn starts_with(&self, prefix: Operand) -> Predicate {
        Predicate::StartsWith(prefix)
    }

    fn ends_with(&self, suffix: Operand) -> Predicate {
        Predicate::EndsWith(suffix)
    }

    fn contains(&self, infix: Operand) -> Predicate {
        Predicate::Contains(infix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_is_identity_for_neutral() {
        let predicates = [
            Predicate::Eq(Operand::parameter("name")),
            Predicate::Between(Operand::value(27), Operand::value(32)),
            Predicate::Within(Operand::value(Value::List(vec![Value::from("a")]))),
            Predicate::StartsWith(Operand::label("x")),
        ];
        for predicate in predicates {
            assert_eq!(predicate.replay(&NeutralPredicates), predicate);
        }
    }

    #[test]
    fn test_custom_predicates() {
        assert!(Predicate::Contains(Operand::value("a")).is_custom());
        assert!(!Predicate::Gt(Operand::value(1)).is_custom());
    }

    #[test]
    fn test_operands() {
        let between = Predicate::Between(Operand::value(1), Operand::parameter("high"));
        assert_eq!(between.operands().len(), 2);
    }
}
