//! Traversal steps
//!
//! [`GremlinSteps`] is the step capability shared by every output form.
//! [`Traversal`] implements it by recording [`Step`] values; it is what the
//! lowering engine produces and what the native flavor hands out. Any
//! recorded traversal can be replayed onto another implementation, which
//! is how the script flavor renders text.

use crate::predicate::{GremlinPredicates, NeutralPredicates, Predicate};
use crate::predicate::Operand;
use cygnet_core::Value;
use serde::{Deserialize, Serialize};

/// Argument of `skip`, `limit` and `range`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    Literal(i64),
    Parameter(String),
}

/// Map column selector for `select(keys)` / `select(values)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column {
    Keys,
    Values,
}

/// Sort direction of an `order().by()` modulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

/// A single recorded step
///
/// Modulators (`by`, `from`, `to`) are steps of their own and follow the
/// step they modulate, exactly as they appear in a Gremlin traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Step {
    // Start
    V,
    Inject(Vec<Value>),

    // Filters
    HasLabel(Vec<String>),
    Has(String),
    HasPredicate(String, Predicate),
    HasNot(String),
    Is(Predicate),
    Where(Traversal),
    WherePredicate(Predicate),
    Not(Traversal),
    And(Vec<Traversal>),
    Or(Vec<Traversal>),

    // Edges
    OutE(Vec<String>),
    InE(Vec<String>),
    BothE(Vec<String>),
    InV,
    OutV,
    OtherV,

    // Binding and access
    As(String),
    Select(String),
    SelectColumn(Column),
    Values(String),
    Properties(String),
    Value,
    Id,
    Label,
    Constant(Operand),

    // Projection and aggregation
    Project(Vec<String>),
    By(Traversal),
    ByOrder(Traversal, Order),
    Unfold,
    Fold,
    Count,
    Sum,
    Min,
    Max,
    Mean,
    Dedup,
    Group,

    // Ordering and paging
    OrderBy,
    Skip(Bound),
    Limit(Bound),
    Range(Bound, Bound),

    // Branching
    Union(Vec<Traversal>),
    Choose(Traversal, Traversal, Traversal),
    Coalesce(Vec<Traversal>),
    FlatMap(Traversal),
    Identity,
    Barrier,

    // Mutation
    AddV(Option<String>),
    AddE(String),
    From(String),
    To(String),
    Property(String, Traversal),
}

impl Step {
    /// Traversals nested directly inside this step
    pub fn children(&self) -> Vec<&Traversal> {
        match self {
            Step::Where(t)
            | Step::Not(t)
            | Step::By(t)
            | Step::ByOrder(t, _)
            | Step::FlatMap(t)
            | Step::Property(_, t) => vec![t],
            Step::And(ts) | Step::Or(ts) | Step::Union(ts) | Step::Coalesce(ts) => {
                ts.iter().collect()
            }
            Step::Choose(c, t, f) => vec![c, t, f],
            _ => Vec::new(),
        }
    }

    /// Predicate carried by this step, if any
    pub fn predicate(&self) -> Option<&Predicate> {
        match self {
            Step::HasPredicate(_, p) | Step::Is(p) | Step::WherePredicate(p) => Some(p),
            _ => None,
        }
    }

    /// Replay this step onto another step implementation
    pub fn replay<S: GremlinSteps>(&self, target: S) -> S {
        let nested = |t: &Traversal, like: &S| t.replay(like.anonymous());
        let nested_all = |ts: &[Traversal], like: &S| {
            ts.iter().map(|t| t.replay(like.anonymous())).collect::<Vec<_>>()
        };

        match self {
            Step::V => target.v(),
            Step::Inject(values) => target.inject(values.clone()),
            Step::HasLabel(labels) => target.has_label(labels.clone()),
            Step::Has(key) => target.has(key),
            Step::HasPredicate(key, p) => {
                let p = p.replay(&target.predicates());
                target.has_predicate(key, p)
            }
            Step::HasNot(key) => target.has_not(key),
            Step::Is(p) => {
                let p = p.replay(&target.predicates());
                target.is(p)
            }
            Step::Where(t) => {
                let inner = nested(t, &target);
                target.where_(inner)
            }
            Step::WherePredicate(p) => {
                let p = p.replay(&target.predicates());
                target.where_predicate(p)
            }
            Step::Not(t) => {
                let inner = nested(t, &target);
                target.not(inner)
            }
            Step::And(ts) => {
                let inner = nested_all(ts, &target);
                target.and(inner)
            }
            Step::Or(ts) => {
                let inner = nested_all(ts, &target);
                target.or(inner)
            }
            Step::OutE(labels) => target.out_e(labels.clone()),
            Step::InE(labels) => target.in_e(labels.clone()),
            Step::BothE(labels) => target.both_e(labels.clone()),
            Step::InV => target.in_v(),
            Step::OutV => target.out_v(),
            Step::OtherV => target.other_v(),
            Step::As(label) => target.as_(label),
            Step::Select(label) => target.select(label),
            Step::SelectColumn(column) => target.select_column(*column),
            Step::Values(key) => target.values(key),
            Step::Properties(key) => target.properties(key),
            Step::Value => target.value(),
            Step::Id => target.id(),
            Step::Label => target.label(),
            Step::Constant(operand) => target.constant(operand.clone()),
            Step::Project(keys) => target.project(keys.clone()),
            Step::By(t) => {
                let inner = nested(t, &target);
                target.by(inner)
            }
            Step::ByOrder(t, order) => {
                let inner = nested(t, &target);
                target.by_order(inner, *order)
            }
            Step::Unfold => target.unfold(),
            Step::Fold => target.fold(),
            Step::Count => target.count(),
            Step::Sum => target.sum(),
            Step::Min => target.min(),
            Step::Max => target.max(),
            Step::Mean => target.mean(),
            Step::Dedup => target.dedup(),
            Step::Group => target.group(),
            Step::OrderBy => target.order(),
            Step::Skip(bound) => target.skip(bound.clone()),
            Step::Limit(bound) => target.limit(bound.clone()),
            Step::Range(low, high) => target.range(low.clone(), high.clone()),
            Step::Union(ts) => {
                let inner = nested_all(ts, &target);
                target.union(inner)
            }
            Step::Choose(c, t, f) => {
                let (c, t, f) = (nested(c, &target), nested(t, &target), nested(f, &target));
                target.choose(c, t, f)
            }
            Step::Coalesce(ts) => {
                let inner = nested_all(ts, &target);
                target.coalesce(inner)
            }
            Step::FlatMap(t) => {
                let inner = nested(t, &target);
                target.flat_map(inner)
            }
            Step::Identity => target.identity(),
            Step::Barrier => target.barrier(),
            Step::AddV(label) => target.add_v(label.clone()),
            Step::AddE(label) => target.add_e(label),
            Step::From(label) => target.from(label),
            Step::To(label) => target.to(label),
            Step::Property(key, t) => {
                let inner = nested(t, &target);
                target.property(key, inner)
            }
        }
    }
}

/// Predicate type produced by a step implementation's predicate factory
pub type PredicateOf<S> = <<S as GremlinSteps>::Predicates as GremlinPredicates>::Output;

/// Step capability: every method appends one step and returns the fragment
pub trait GremlinSteps: Sized {
    type Predicates: GremlinPredicates;

    /// The predicate factory matching this implementation
    fn predicates(&self) -> Self::Predicates;

    /// A new, empty anonymous traversal of the same kind
    fn anonymous(&self) -> Self;

    fn v(self) -> Self;
    fn inject(self, values: Vec<Value>) -> Self;

    fn has_label(self, labels: Vec<String>) -> Self;
    fn has(self, key: &str) -> Self;
    fn has_predicate(self, key: &str, predicate: PredicateOf<Self>) -> Self;
    fn has_not(self, key: &str) -> Self;
    fn is(self, predicate: PredicateOf<Self>) -> Self;
    fn where_(self, traversal: Self) -> Self;
    fn where_predicate(self, predicate: PredicateOf<Self>) -> Self;
    fn not(self, traversal: Self) -> Self;
    fn and(self, traversals: Vec<Self>) -> Self;
    fn or(self, traversals: Vec<Self>) -> Self;

    fn out_e(self, labels: Vec<String>) -> Self;
    fn in_e(self, labels: Vec<String>) -> Self;
    fn both_e(self, labels: Vec<String>) -> Self;
    fn in_v(self) -> Self;
    fn out_v(self) -> Self;
    fn other_v(self) -> Self;

    fn as_(self, label: &str) -> Self;
    fn select(self, label: &str) -> Self;
    fn select_column(self, column: Column) -> Self;
    fn values(self, key: &str) -> Self;
    fn properties(self, key: &str) -> Self;
    fn value(self) -> Self;
    fn id(self) -> Self;
    fn label(self) -> Self;
    fn constant(self, value: Operand) -> Self;

    fn project(self, keys: Vec<String>) -> Self;
    fn by(self, traversal: Self) -> Self;
    fn by_order(self, traversal: Self, order: Order) -> Self;
    fn unfold(self) -> Self;
    fn fold(self) -> Self;
    fn count(self) -> Self;
    fn sum(self) -> Self;
    fn min(self) -> Self;
    fn max(self) -> Self;
    fn mean(self) -> Self;
    fn dedup(self) -> Self;
    fn group(self) -> Self;

    fn order(self) -> Self;
    fn skip(self, bound: Bound) -> Self;
    fn limit(self, bound: Bound) -> Self;
    fn range(self, low: Bound, high: Bound) -> Self;

    fn union(self, traversals: Vec<Self>) -> Self;
    fn choose(self, condition: Self, then: Self, otherwise: Self) -> Self;
    fn coalesce(self, traversals: Vec<Self>) -> Self;
    fn flat_map(self, traversal: Self) -> Self;
    fn identity(self) -> Self;
    fn barrier(self) -> Self;

    fn add_v(self, label: Option<String>) -> Self;
    fn add_e(self, label: &str) -> Self;
    fn from(self, label: &str) -> Self;
    fn to(self, label: &str) -> Self;
    fn property(self, key: &str, value: Self) -> Self;
}

/// A flavor-neutral traversal: an ordered list of steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Traversal {
    steps: Vec<Step>,
}

impl Traversal {
    /// An empty (identity) traversal
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Append all steps of another traversal
    pub fn append(&mut self, other: Traversal) {
        self.steps.extend(other.steps);
    }

    /// Append and return, for chaining
    pub fn then(mut self, other: Traversal) -> Self {
        self.append(other);
        self
    }

    fn with(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Replay every step onto another implementation
    pub fn replay<S: GremlinSteps>(&self, target: S) -> S {
        self.steps.iter().fold(target, |acc, step| step.replay(acc))
    }

    /// Visit every step, descending into nested traversals
    pub fn walk<'a, F: FnMut(&'a Step)>(&'a self, visit: &mut F) {
        for step in &self.steps {
            visit(step);
            for child in step.children() {
                child.walk(visit);
            }
        }
    }

    /// Parameter names referenced anywhere in the traversal, in first-use order
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut add = |name: &String| {
            if !names.contains(name) {
                names.push(name.clone());
            }
        };
        self.walk(&mut |step| {
            if let Some(predicate) = step.predicate() {
                for operand in predicate.operands() {
                    if let Operand::Parameter(name) = operand {
                        add(name);
                    }
                }
            }
            match step {
                Step::Constant(Operand::Parameter(name)) => add(name),
                Step::Skip(Bound::Parameter(name)) | Step::Limit(Bound::Parameter(name)) => {
                    add(name)
                }
                Step::Range(low, high) => {
                    for bound in [low, high] {
                        if let Bound::Parameter(name) = bound {
                            add(name);
                        }
                    }
                }
                _ => {}
            }
        });
        names
    }
}

impl GremlinSteps for Traversal {
    type Predicates = NeutralPredicates;

    fn predicates(&self) -> NeutralPredicates {
        NeutralPredicates
    }

    fn anonymous(&self) -> Self {
        Traversal::new()
    }

    fn v(self) -> Self {
        self.with(Step::V)
    }

    fn inject(self, values: Vec<Value>) -> Self {
        self.with(Step::Inject(values))
    }

    fn has_label(self, labels: Vec<String>) -> Self {
        self.with(Step::HasLabel(labels))
    }

    fn has(self, key: &str) -> Self {
        self.with(Step::Has(key.to_string()))
    }

    fn has_predicate(self, key: &str, predicate: Predicate) -> Self {
        self.with(Step::HasPredicate(key.to_string(), predicate))
    }

    fn has_not(self, key: &str) -> Self {
        self.with(Step::HasNot(key.to_string()))
    }

    fn is(self, predicate: Predicate) -> Self {
        self.with(Step::Is(predicate))
    }

    fn where_(self, traversal: Self) -> Self {
        self.with(Step::Where(traversal))
    }

    fn where_predicate(self, predicate: Predicate) -> Self {
        self.with(Step::WherePredicate(predicate))
    }

    fn not(self, traversal: Self) -> Self {
        self.with(Step::Not(traversal))
    }

    fn and(self, traversals: Vec<Self>) -> Self {
        self.with(Step::And(traversals))
    }

    fn or(self, traversals: Vec<Self>) -> Self {
        self.with(Step::Or(traversals))
    }

    fn out_e(self, labels: Vec<String>) -> Self {
        self.with(Step::OutE(labels))
    }

    fn in_e(self, labels: Vec<String>) -> Self {
        self.with(Step::InE(labels))
    }

    fn both_e(self, labels: Vec<String>) -> Self {
        self.with(Step::BothE(labels))
    }

    fn in_v(self) -> Self {
        self.with(Step::InV)
    }

    fn out_v(self) -> Self {
        self.with(Step::OutV)
    }

    fn other_v(self) -> Self {
        self.with(Step::OtherV)
    }

    fn as_(self, label: &str) -> Self {
        self.with(Step::As(label.to_string()))
    }

    fn select(self, label: &str) -> Self {
        self.with(Step::Select(label.to_string()))
    }

    fn select_column(self, column: Column) -> Self {
        self.with(Step::SelectColumn(column))
    }

    fn values(self, key: &str) -> Self {
        self.with(Step::Values(key.to_string()))
    }

    fn properties(self, key: &str) -> Self {
        self.with(Step::Properties(key.to_string()))
    }

    fn value(self) -> Self {
        self.with(Step::Value)
    }

    fn id(self) -> Self {
        self.with(Step::Id)
    }

    fn label(self) -> Self {
        self.with(Step::Label)
    }

    fn constant(self, value: Operand) -> Self {
        self.with(Step::Constant(value))
    }

    fn project(self, keys: Vec<String>) -> Self {
        self.with(Step::Project(keys))
    }

    fn by(self, traversal: Self) -> Self {
        self.with(Step::By(traversal))
    }

    fn by_order(self, traversal: Self, order: Order) -> Self {
        self.with(Step::ByOrder(traversal, order))
    }

    fn unfold(self) -> Self {
        self.with(Step::Unfold)
    }

    fn fold(self) -> Self {
        self.with(Step::Fold)
    }

    fn count(self) -> Self {
        self.with(Step::Count)
    }

    fn sum(self) -> Self {
        self.with(Step::Sum)
    }

    fn min(self) -> Self {
        self.with(Step::Min)
    }

    fn max(self) -> Self {
        self.with(Step::Max)
    }

    fn mean(self) -> Self {
        self.with(Step::Mean)
    }

    fn dedup(self) -> Self {
        self.with(Step::Dedup)
    }

    fn group(self) -> Self {
        self.with(Step::Group)
    }

    fn order(self) -> Self {
        self.with(Step::OrderBy)
    }

    fn skip(self, bound: Bound) -> Self {
        self.with(Step::Skip(bound))
    }

    fn limit(self, bound: Bound) -> Self {
        self.with(Step::Limit(bound))
    }

    fn range(self, low: Bound, high: Bound) -> Self {
        self.with(Step::Range(low, high))
    }

    fn union(self, traversals: Vec<Self>) -> Self {
        self.with(Step::Union(traversals))
    }

    fn choose(self, condition: Self, then: Self, otherwise: Self) -> Self {
        self.with(Step::Choose(condition, then, otherwise))
    }

    fn coalesce(self, traversals: Vec<Self>) -> Self {
        self.with(Step::Coalesce(traversals))
    }

    fn flat_map(self, traversal: Self) -> Self {
        self.with(Step::FlatMap(traversal))
    }

    fn identity(self) -> Self {
        self.with(Step::Identity)
    }

    fn barrier(self) -> Self {
        self.with(Step::Barrier)
    }

    fn add_v(self, label: Option<String>) -> Self {
        self.with(Step::AddV(label))
    }

    fn add_e(self, label: &str) -> Self {
        self.with(Step::AddE(label.to_string()))
    }

    fn from(self, label: &str) -> Self {
        self.with(Step::From(label.to_string()))
    }

    fn to(self, label: &str) -> Self {
        self.with(Step::To(label.to_string()))
    }

    fn property(self, key: &str, value: Self) -> Self {
        self.with(Step::Property(key.to_string(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Traversal {
        let p = NeutralPredicates;
        Traversal::new()
            .v()
            .has_label(vec!["person".to_string()])
            .has_predicate("name", p.is_eq(Operand::parameter("name")))
            .as_("n")
            .project(vec!["age".to_string()])
            .by(Traversal::new()
                .select("n")
                .coalesce(vec![
                    Traversal::new().values("age"),
                    Traversal::new().constant(Operand::Value(Value::Null)),
                ]))
            .limit(Bound::Parameter("max".to_string()))
    }

    #[test]
    fn test_builder_records_steps() {
        let t = sample();
        assert_eq!(t.steps()[0], Step::V);
        assert_eq!(t.steps()[1], Step::HasLabel(vec!["person".to_string()]));
        assert_eq!(t.len(), 7);
    }

    #[test]
    fn test_replay_onto_traversal_is_identity() {
        let t = sample();
        assert_eq!(t.replay(Traversal::new()), t);
    }

    #[test]
    fn test_walk_visits_nested_steps() {
        let mut count = 0;
        sample().walk(&mut |_| count += 1);
        // 7 top-level + select + coalesce + values + constant
        assert_eq!(count, 11);
    }

    #[test]
    fn test_parameter_names_in_first_use_order() {
        assert_eq!(
            sample().parameter_names(),
            vec!["name".to_string(), "max".to_string()]
        );
    }
}
