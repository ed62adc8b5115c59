//! Embedded traversal execution
//!
//! Runs native and compatible programs against the in-memory graph with
//! Gremlin semantics: traversers carry a path of labelled objects,
//! `select` looks in the current map first and then at the most recent
//! path label, and modulators (`by`, `from`, `to`) belong to the step
//! before them. Execution is eager: each step consumes the whole stream.

use crate::predicate::{Operand, Predicate};
use crate::step::{Bound, Column, Order, Step, Traversal};
use cygnet_core::{Direction, EdgeId, Error, ParameterMap, Properties, Result, Value, VertexId};
use cygnet_graph::Graph;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Object carried by a traverser
#[derive(Debug, Clone, PartialEq)]
enum Obj {
    /// A scalar (never a list or map)
    Value(Value),
    Vertex(VertexId),
    Edge(EdgeId),
    List(Vec<Obj>),
    Map(BTreeMap<String, Obj>),
    /// One entry of an unfolded map or group
    Entry(Box<Obj>, Box<Obj>),
    /// Result of `group()`: keys are arbitrary objects, in insertion order
    Groups(Vec<(Obj, Obj)>),
}

impl Obj {
    fn null() -> Self {
        Obj::Value(Value::Null)
    }

    fn is_null(&self) -> bool {
        matches!(self, Obj::Value(Value::Null))
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::List(items) => Obj::List(items.into_iter().map(Obj::from_value).collect()),
            Value::Map(map) => Obj::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Obj::from_value(v)))
                    .collect(),
            ),
            other => Obj::Value(other),
        }
    }

    fn as_scalar(&self) -> Option<&Value> {
        match self {
            Obj::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Cypher equality over objects: elements compare by identity
fn obj_eq(a: &Obj, b: &Obj) -> Option<bool> {
    fn all(results: impl Iterator<Item = Option<bool>>) -> Option<bool> {
        let mut unknown = false;
        for result in results {
            match result {
                Some(false) => return Some(false),
                None => unknown = true,
                Some(true) => {}
            }
        }
        if unknown { None } else { Some(true) }
    }

    match (a, b) {
        (Obj::Value(x), Obj::Value(y)) => x.cypher_eq(y),
        (Obj::Value(Value::Null), _) | (_, Obj::Value(Value::Null)) => None,
        (Obj::Vertex(x), Obj::Vertex(y)) => Some(x == y),
        (Obj::Edge(x), Obj::Edge(y)) => Some(x == y),
        (Obj::List(x), Obj::List(y)) => {
            if x.len() != y.len() {
                return Some(false);
            }
            all(x.iter().zip(y).map(|(a, b)| obj_eq(a, b)))
        }
        (Obj::Map(x), Obj::Map(y)) => {
            if x.len() != y.len() || x.keys().ne(y.keys()) {
                return Some(false);
            }
            all(x.values().zip(y.values()).map(|(a, b)| obj_eq(a, b)))
        }
        (x, y) => Some(x == y),
    }
}

/// Comparison for range predicates; `None` when incomparable
fn obj_cmp(a: &Obj, b: &Obj) -> Option<Ordering> {
    match (a, b) {
        (Obj::Value(x), Obj::Value(y)) => x.cypher_cmp(y),
        (Obj::List(x), Obj::List(y)) => {
            for (a, b) in x.iter().zip(y) {
                match obj_cmp(a, b)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(x.len().cmp(&y.len()))
        }
        _ => None,
    }
}

/// Total order for `order()`, `min()` and `max()`
fn obj_order(a: &Obj, b: &Obj) -> Ordering {
    fn rank(obj: &Obj) -> u8 {
        match obj {
            Obj::Map(_) | Obj::Groups(_) | Obj::Entry(..) => 0,
            Obj::Vertex(_) => 1,
            Obj::Edge(_) => 2,
            Obj::List(_) => 3,
            Obj::Value(Value::Null) => 5,
            Obj::Value(_) => 4,
        }
    }

    match (a, b) {
        (Obj::Value(x), Obj::Value(y)) => x.order_cmp(y),
        (Obj::Vertex(x), Obj::Vertex(y)) => x.cmp(y),
        (Obj::Edge(x), Obj::Edge(y)) => x.cmp(y),
        (Obj::List(x), Obj::List(y)) => x
            .iter()
            .zip(y)
            .map(|(a, b)| obj_order(a, b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[derive(Debug, Clone)]
struct Traverser {
    obj: Obj,
    path: Vec<(String, Obj)>,
    /// Vertex an edge was reached from, for `otherV()`
    from_vertex: Option<VertexId>,
}

impl Traverser {
    fn seed() -> Self {
        Self::fresh(Obj::null())
    }

    fn fresh(obj: Obj) -> Self {
        Self {
            obj,
            path: Vec::new(),
            from_vertex: None,
        }
    }

    fn split(&self, obj: Obj) -> Self {
        Self {
            obj,
            path: self.path.clone(),
            from_vertex: self.from_vertex,
        }
    }

    /// Most recent object labelled `label`
    fn labelled(&self, label: &str) -> Option<&Obj> {
        self.path
            .iter()
            .rev()
            .find(|(l, _)| l == label)
            .map(|(_, obj)| obj)
    }
}

fn is_modulator(step: &Step) -> bool {
    matches!(step, Step::By(_) | Step::ByOrder(..) | Step::From(_) | Step::To(_))
}

fn takes_modulators(step: &Step) -> bool {
    matches!(step, Step::Project(_) | Step::Group | Step::OrderBy | Step::AddE(_))
}

/// Executes traversals against a shared graph
pub struct TraversalExecutor {
    graph: Arc<Graph>,
}

impl TraversalExecutor {
    pub fn new(graph: Arc<Graph>) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Run a traversal and export its results as plain values
    ///
    /// Vertices and edges are exported as maps holding their properties
    /// plus `_type`, `_id` and `_label` (and `_outV`/`_inV` for edges).
    pub fn execute(&self, traversal: &Traversal, parameters: &ParameterMap) -> Result<Vec<Value>> {
        let input = match traversal.steps().first() {
            Some(Step::Inject(_)) => Vec::new(),
            _ => vec![Traverser::seed()],
        };
        let run = Run {
            graph: &self.graph,
            parameters,
        };
        let output = run.steps(traversal.steps(), input)?;
        debug!(
            "Executed {} step(s) on graph {}: {} result(s)",
            traversal.len(),
            self.graph.name(),
            output.len()
        );
        output.iter().map(|t| run.export(&t.obj)).collect()
    }
}

/// State of one execution
struct Run<'a> {
    graph: &'a Graph,
    parameters: &'a ParameterMap,
}

impl Run<'_> {
    fn steps(&self, steps: &[Step], mut stream: Vec<Traverser>) -> Result<Vec<Traverser>> {
        let mut i = 0;
        while i < steps.len() {
            let step = &steps[i];
            i += 1;
            let start = i;
            if takes_modulators(step) {
                while i < steps.len() && is_modulator(&steps[i]) {
                    i += 1;
                }
            }
            stream = self.step(step, &steps[start..i], stream)?;
        }
        Ok(stream)
    }

    fn sub(&self, traversal: &Traversal, traverser: &Traverser) -> Result<Vec<Traverser>> {
        self.steps(traversal.steps(), vec![traverser.clone()])
    }

    fn first(&self, traversal: &Traversal, traverser: &Traverser) -> Result<Option<Obj>> {
        Ok(self.sub(traversal, traverser)?.into_iter().next().map(|t| t.obj))
    }

    fn filter<F>(stream: Vec<Traverser>, mut keep: F) -> Result<Vec<Traverser>>
    where
        F: FnMut(&Traverser) -> Result<bool>,
    {
        let mut out = Vec::with_capacity(stream.len());
        for t in stream {
            if keep(&t)? {
                out.push(t);
            }
        }
        Ok(out)
    }

    fn flat_map<F>(stream: Vec<Traverser>, mut map: F) -> Result<Vec<Traverser>>
    where
        F: FnMut(&Traverser) -> Result<Vec<Traverser>>,
    {
        let mut out = Vec::new();
        for t in &stream {
            out.extend(map(t)?);
        }
        Ok(out)
    }

    fn map<F>(stream: Vec<Traverser>, mut map: F) -> Result<Vec<Traverser>>
    where
        F: FnMut(&Traverser) -> Result<Option<Obj>>,
    {
        let mut out = Vec::with_capacity(stream.len());
        for t in &stream {
            if let Some(obj) = map(t)? {
                out.push(t.split(obj));
            }
        }
        Ok(out)
    }

    fn step(&self, step: &Step, modulators: &[Step], stream: Vec<Traverser>) -> Result<Vec<Traverser>> {
        match step {
            Step::V => {
                let vertices = self.graph.vertices()?;
                Self::flat_map(stream, |t| {
                    Ok(vertices.iter().map(|v| t.split(Obj::Vertex(v.id))).collect())
                })
            }
            Step::Inject(values) => {
                let mut stream = stream;
                stream.extend(values.iter().cloned().map(|v| Traverser::fresh(Obj::from_value(v))));
                Ok(stream)
            }

            // ========== Filters ==========
            Step::HasLabel(labels) => Self::filter(stream, |t| {
                Ok(self.label(&t.obj)?.is_some_and(|l| labels.contains(&l)))
            }),
            Step::Has(key) => Self::filter(stream, |t| Ok(self.property(&t.obj, key)?.is_some())),
            Step::HasNot(key) => Self::filter(stream, |t| Ok(self.property(&t.obj, key)?.is_none())),
            Step::HasPredicate(key, predicate) => Self::filter(stream, |t| {
                match self.property(&t.obj, key)? {
                    Some(value) => self.test(predicate, &Obj::from_value(value), t),
                    None => Ok(false),
                }
            }),
            Step::Is(predicate) | Step::WherePredicate(predicate) => {
                Self::filter(stream, |t| self.test(predicate, &t.obj, t))
            }
            Step::Where(traversal) => {
                Self::filter(stream, |t| Ok(!self.sub(traversal, t)?.is_empty()))
            }
            Step::Not(traversal) => Self::filter(stream, |t| Ok(self.sub(traversal, t)?.is_empty())),
            Step::And(traversals) => Self::filter(stream, |t| {
                for traversal in traversals {
                    if self.sub(traversal, t)?.is_empty() {
                        return Ok(false);
                    }
                }
                Ok(true)
            }),
            Step::Or(traversals) => Self::filter(stream, |t| {
                for traversal in traversals {
                    if !self.sub(traversal, t)?.is_empty() {
                        return Ok(true);
                    }
                }
                Ok(false)
            }),

            // ========== Edges ==========
            Step::OutE(labels) => self.edges(stream, Direction::Outgoing, labels),
            Step::InE(labels) => self.edges(stream, Direction::Incoming, labels),
            Step::BothE(labels) => self.edges(stream, Direction::Both, labels),
            Step::InV | Step::OutV | Step::OtherV => Self::map(stream, |t| {
                let Obj::Edge(id) = t.obj else {
                    return Ok(None);
                };
                let Some(edge) = self.graph.edge(id)? else {
                    return Ok(None);
                };
                let vertex = match step {
                    Step::InV => Some(edge.in_vertex),
                    Step::OutV => Some(edge.out_vertex),
                    _ => t.from_vertex.and_then(|from| edge.other(from)),
                };
                Ok(vertex.map(Obj::Vertex))
            }),

            // ========== Binding and access ==========
            Step::As(label) => Ok(stream
                .into_iter()
                .map(|mut t| {
                    t.path.push((label.clone(), t.obj.clone()));
                    t
                })
                .collect()),
            Step::Select(label) => Self::map(stream, |t| {
                if let Obj::Map(map) = &t.obj {
                    if let Some(value) = map.get(label) {
                        return Ok(Some(value.clone()));
                    }
                }
                Ok(t.labelled(label).cloned())
            }),
            Step::SelectColumn(column) => Self::map(stream, |t| {
                let pick = |k: &Obj, v: &Obj| match column {
                    Column::Keys => k.clone(),
                    Column::Values => v.clone(),
                };
                Ok(match &t.obj {
                    Obj::Entry(k, v) => Some(pick(k, v)),
                    Obj::Groups(groups) => Some(Obj::List(
                        groups.iter().map(|(k, v)| pick(k, v)).collect(),
                    )),
                    Obj::Map(map) => Some(Obj::List(
                        map.iter()
                            .map(|(k, v)| pick(&Obj::Value(Value::from(k.as_str())), v))
                            .collect(),
                    )),
                    _ => None,
                })
            }),
            Step::Values(key) | Step::Properties(key) => Self::map(stream, |t| {
                Ok(self.property(&t.obj, key)?.map(Obj::from_value))
            }),
            Step::Value | Step::Identity | Step::Barrier => Ok(stream),
            Step::Id => Self::map(stream, |t| {
                Ok(match t.obj {
                    Obj::Vertex(id) => Some(Obj::Value(Value::Integer(id.as_internal() as i64))),
                    Obj::Edge(id) => Some(Obj::Value(Value::Integer(id.as_internal() as i64))),
                    _ => None,
                })
            }),
            Step::Label => Self::map(stream, |t| {
                Ok(self.label(&t.obj)?.map(|l| Obj::Value(Value::String(l))))
            }),
            Step::Constant(operand) => Self::map(stream, |t| self.resolve(operand, t).map(Some)),

            // ========== Projection and aggregation ==========
            Step::Project(keys) => {
                let by = by_traversals(modulators);
                Self::map(stream, |t| {
                    let mut map = BTreeMap::new();
                    for (i, key) in keys.iter().enumerate() {
                        let value = match by.get(i % by.len().max(1)) {
                            Some(traversal) => self.first(traversal, t)?.unwrap_or_else(Obj::null),
                            None => t.obj.clone(),
                        };
                        map.insert(key.clone(), value);
                    }
                    Ok(Some(Obj::Map(map)))
                })
            }
            Step::Unfold => Ok(stream
                .iter()
                .flat_map(|t| {
                    let items: Vec<Obj> = match &t.obj {
                        Obj::List(items) => items.clone(),
                        Obj::Map(map) => map
                            .iter()
                            .map(|(k, v)| {
                                Obj::Entry(
                                    Box::new(Obj::Value(Value::from(k.as_str()))),
                                    Box::new(v.clone()),
                                )
                            })
                            .collect(),
                        Obj::Groups(groups) => groups
                            .iter()
                            .map(|(k, v)| Obj::Entry(Box::new(k.clone()), Box::new(v.clone())))
                            .collect(),
                        Obj::Value(Value::Null) => Vec::new(),
                        other => vec![other.clone()],
                    };
                    items.into_iter().map(|obj| t.split(obj)).collect::<Vec<_>>()
                })
                .collect()),
            Step::Fold => Ok(vec![Traverser::fresh(Obj::List(
                stream.into_iter().map(|t| t.obj).collect(),
            ))]),
            Step::Count => Ok(vec![Traverser::fresh(Obj::Value(Value::Integer(
                stream.len() as i64,
            )))]),
            Step::Sum => reduce(stream, sum),
            Step::Mean => reduce(stream, mean),
            Step::Min => reduce(stream, |objs| {
                Ok(objs.into_iter().min_by(|a, b| obj_order(a, b)))
            }),
            Step::Max => reduce(stream, |objs| {
                // nulls order last, so max must skip them explicitly
                Ok(objs
                    .into_iter()
                    .filter(|o| !o.is_null())
                    .max_by(|a, b| obj_order(a, b)))
            }),
            Step::Dedup => {
                let mut seen: Vec<Obj> = Vec::new();
                Ok(stream
                    .into_iter()
                    .filter(|t| {
                        if seen.contains(&t.obj) {
                            false
                        } else {
                            seen.push(t.obj.clone());
                            true
                        }
                    })
                    .collect())
            }
            Step::Group => self.group(stream, modulators),

            // ========== Ordering and paging ==========
            Step::OrderBy => self.order(stream, modulators),
            Step::Skip(bound) => {
                let n = self.bound(bound, "SKIP")?;
                Ok(stream.into_iter().skip(n).collect())
            }
            Step::Limit(bound) => {
                let n = self.bound(bound, "LIMIT")?;
                Ok(stream.into_iter().take(n).collect())
            }
            Step::Range(low, high) => {
                let low = self.bound(low, "range")?;
                let rest = stream.into_iter().skip(low);
                Ok(match high {
                    Bound::Literal(h) if *h < 0 => rest.collect(),
                    high => {
                        let high = self.bound(high, "range")?;
                        rest.take(high.saturating_sub(low)).collect()
                    }
                })
            }

            // ========== Branching ==========
            Step::Union(traversals) => Self::flat_map(stream, |t| {
                let mut out = Vec::new();
                for traversal in traversals {
                    out.extend(self.sub(traversal, t)?);
                }
                Ok(out)
            }),
            Step::Choose(condition, then, otherwise) => Self::flat_map(stream, |t| {
                if self.sub(condition, t)?.is_empty() {
                    self.sub(otherwise, t)
                } else {
                    self.sub(then, t)
                }
            }),
            Step::Coalesce(traversals) => Self::flat_map(stream, |t| {
                for traversal in traversals {
                    let out = self.sub(traversal, t)?;
                    if !out.is_empty() {
                        return Ok(out);
                    }
                }
                Ok(Vec::new())
            }),
            Step::FlatMap(traversal) => Self::flat_map(stream, |t| self.sub(traversal, t)),

            // ========== Mutation ==========
            Step::AddV(label) => Self::map(stream, |_| {
                let label = label.as_deref().unwrap_or("vertex");
                let vertex = self.graph.add_vertex(label, Properties::new())?;
                Ok(Some(Obj::Vertex(vertex.id)))
            }),
            Step::AddE(label) => Self::map(stream, |t| {
                let mut from = None;
                let mut to = None;
                for modulator in modulators {
                    match modulator {
                        Step::From(l) => from = t.labelled(l).cloned(),
                        Step::To(l) => to = t.labelled(l).cloned(),
                        _ => {}
                    }
                }
                let out = endpoint(from.as_ref().unwrap_or(&t.obj))?;
                let inv = endpoint(to.as_ref().unwrap_or(&t.obj))?;
                let edge = self.graph.add_edge(label.as_str(), out, inv, Properties::new())?;
                Ok(Some(Obj::Edge(edge.id)))
            }),
            Step::Property(key, traversal) => {
                for t in &stream {
                    let value = match self.first(traversal, t)? {
                        Some(obj) => self.export(&obj)?,
                        None => Value::Null,
                    };
                    match t.obj {
                        Obj::Vertex(id) => self.graph.set_vertex_property(id, key, value)?,
                        Obj::Edge(id) => self.graph.set_edge_property(id, key, value)?,
                        _ => {
                            return Err(Error::Execution(format!(
                                "Cannot set property `{}` on a non-element",
                                key
                            )));
                        }
                    }
                }
                Ok(stream)
            }

            Step::By(_) | Step::ByOrder(..) | Step::From(_) | Step::To(_) => Err(Error::Internal(
                format!("Modulator {:?} without a step to modulate", step),
            )),
        }
    }

    fn edges(&self, stream: Vec<Traverser>, direction: Direction, labels: &[String]) -> Result<Vec<Traverser>> {
        Self::flat_map(stream, |t| {
            let Obj::Vertex(vertex) = t.obj else {
                return Ok(Vec::new());
            };
            Ok(self
                .graph
                .incident_edges(vertex, direction, labels)?
                .into_iter()
                .map(|edge| {
                    let mut next = t.split(Obj::Edge(edge.id));
                    next.from_vertex = Some(vertex);
                    next
                })
                .collect())
        })
    }

    /// `group().by(key).by(value)`: groups keep first-seen order
    fn group(&self, stream: Vec<Traverser>, modulators: &[Step]) -> Result<Vec<Traverser>> {
        let by = by_traversals(modulators);
        let mut groups: Vec<(Obj, Vec<Traverser>)> = Vec::new();
        for t in stream {
            let key = match by.first() {
                Some(traversal) => self.first(traversal, &t)?.unwrap_or_else(Obj::null),
                None => t.obj.clone(),
            };
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(t),
                None => groups.push((key, vec![t])),
            }
        }

        let mut result = Vec::with_capacity(groups.len());
        for (key, members) in groups {
            let value = match by.get(1) {
                Some(traversal) => self
                    .steps(traversal.steps(), members)?
                    .into_iter()
                    .next()
                    .map(|t| t.obj)
                    .unwrap_or_else(Obj::null),
                None => Obj::List(members.into_iter().map(|t| t.obj).collect()),
            };
            result.push((key, value));
        }
        Ok(vec![Traverser::fresh(Obj::Groups(result))])
    }

    fn order(&self, stream: Vec<Traverser>, modulators: &[Step]) -> Result<Vec<Traverser>> {
        let comparators: Vec<(Option<&Traversal>, Order)> = if modulators.is_empty() {
            vec![(None, Order::Asc)]
        } else {
            modulators
                .iter()
                .filter_map(|m| match m {
                    Step::ByOrder(t, order) => Some((Some(t), *order)),
                    Step::By(t) => Some((Some(t), Order::Asc)),
                    _ => None,
                })
                .collect()
        };

        let mut keyed = Vec::with_capacity(stream.len());
        for t in stream {
            let mut keys = Vec::with_capacity(comparators.len());
            for (traversal, _) in &comparators {
                keys.push(match traversal {
                    Some(traversal) => self.first(traversal, &t)?.unwrap_or_else(Obj::null),
                    None => t.obj.clone(),
                });
            }
            keyed.push((keys, t));
        }

        keyed.sort_by(|(a, _), (b, _)| {
            for ((x, y), (_, order)) in a.iter().zip(b).zip(&comparators) {
                let ordering = match order {
                    Order::Asc => obj_order(x, y),
                    Order::Desc => obj_order(y, x),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        Ok(keyed.into_iter().map(|(_, t)| t).collect())
    }

    fn bound(&self, bound: &Bound, clause: &str) -> Result<usize> {
        let value = match bound {
            Bound::Literal(n) => Value::Integer(*n),
            Bound::Parameter(name) => self.parameter(name)?.clone(),
        };
        match value {
            Value::Integer(n) if n >= 0 => Ok(n as usize),
            other => Err(Error::InvalidRange {
                clause: clause.to_string(),
                reason: format!("expected a non-negative integer, got {}", other),
            }),
        }
    }

    fn parameter(&self, name: &str) -> Result<&Value> {
        self.parameters
            .get(name)
            .ok_or_else(|| Error::Execution(format!("Expected parameter `{}` to be provided", name)))
    }

    fn resolve(&self, operand: &Operand, t: &Traverser) -> Result<Obj> {
        Ok(match operand {
            Operand::Value(value) => Obj::from_value(value.clone()),
            Operand::Parameter(name) => Obj::from_value(self.parameter(name)?.clone()),
            Operand::Label(label) => t.labelled(label).cloned().unwrap_or_else(Obj::null),
        })
    }

    /// Gremlin predicate test; `eq(null)` matches null, other comparisons
    /// follow Cypher
    fn test(&self, predicate: &Predicate, obj: &Obj, t: &Traverser) -> Result<bool> {
        let other = |operand: &Operand| self.resolve(operand, t);
        let ordering = |operand: &Operand| -> Result<Option<Ordering>> {
            Ok(obj_cmp(obj, &other(operand)?))
        };

        Ok(match predicate {
            Predicate::Eq(operand) => {
                let other = other(operand)?;
                if other.is_null() {
                    obj.is_null()
                } else {
                    obj_eq(obj, &other) == Some(true)
                }
            }
            Predicate::Neq(operand) => {
                let other = other(operand)?;
                if other.is_null() {
                    !obj.is_null()
                } else {
                    obj_eq(obj, &other) == Some(false)
                }
            }
            Predicate::Gt(o) => ordering(o)? == Some(Ordering::Greater),
            Predicate::Gte(o) => matches!(ordering(o)?, Some(Ordering::Greater | Ordering::Equal)),
            Predicate::Lt(o) => ordering(o)? == Some(Ordering::Less),
            Predicate::Lte(o) => matches!(ordering(o)?, Some(Ordering::Less | Ordering::Equal)),
            Predicate::Between(low, high) => {
                matches!(ordering(low)?, Some(Ordering::Greater | Ordering::Equal))
                    && ordering(high)? == Some(Ordering::Less)
            }
            Predicate::Within(o) => member(obj, &other(o)?),
            Predicate::Without(o) => !obj.is_null() && !member(obj, &other(o)?),
            Predicate::StartsWith(o) => text(obj, &other(o)?, |s, p| s.starts_with(p)),
            Predicate::EndsWith(o) => text(obj, &other(o)?, |s, p| s.ends_with(p)),
            Predicate::Contains(o) => text(obj, &other(o)?, |s, p| s.contains(p)),
        })
    }

    fn label(&self, obj: &Obj) -> Result<Option<String>> {
        Ok(match obj {
            Obj::Vertex(id) => self.graph.vertex(*id)?.map(|v| v.label),
            Obj::Edge(id) => self.graph.edge(*id)?.map(|e| e.label),
            _ => None,
        })
    }

    fn property(&self, obj: &Obj, key: &str) -> Result<Option<Value>> {
        Ok(match obj {
            Obj::Vertex(id) => self
                .graph
                .vertex(*id)?
                .and_then(|v| v.property(key).cloned()),
            Obj::Edge(id) => self.graph.edge(*id)?.and_then(|e| e.property(key).cloned()),
            _ => None,
        })
    }

    fn export(&self, obj: &Obj) -> Result<Value> {
        Ok(match obj {
            Obj::Value(value) => value.clone(),
            Obj::Vertex(id) => {
                let vertex = self
                    .graph
                    .vertex(*id)?
                    .ok_or_else(|| Error::ElementNotFound(format!("vertex {}", id)))?;
                let mut map: BTreeMap<String, Value> = vertex
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                map.insert("_type".to_string(), Value::from("node"));
                map.insert("_id".to_string(), Value::Integer(id.as_internal() as i64));
                map.insert("_label".to_string(), Value::String(vertex.label));
                Value::Map(map)
            }
            Obj::Edge(id) => {
                let edge = self
                    .graph
                    .edge(*id)?
                    .ok_or_else(|| Error::ElementNotFound(format!("edge {}", id)))?;
                let mut map: BTreeMap<String, Value> = edge
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                map.insert("_type".to_string(), Value::from("relationship"));
                map.insert("_id".to_string(), Value::Integer(id.as_internal() as i64));
                map.insert("_label".to_string(), Value::String(edge.label));
                map.insert(
                    "_outV".to_string(),
                    Value::Integer(edge.out_vertex.as_internal() as i64),
                );
                map.insert(
                    "_inV".to_string(),
                    Value::Integer(edge.in_vertex.as_internal() as i64),
                );
                Value::Map(map)
            }
            Obj::List(items) => Value::List(
                items
                    .iter()
                    .map(|item| self.export(item))
                    .collect::<Result<_>>()?,
            ),
            Obj::Map(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.export(v)?);
                }
                Value::Map(out)
            }
            Obj::Entry(k, v) => entry(self.export(k)?, self.export(v)?),
            Obj::Groups(groups) => Value::List(
                groups
                    .iter()
                    .map(|(k, v)| -> Result<Value> { Ok(entry(self.export(k)?, self.export(v)?)) })
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

fn member(obj: &Obj, list: &Obj) -> bool {
    match list {
        Obj::List(items) => items.iter().any(|item| obj_eq(obj, item) == Some(true)),
        _ => false,
    }
}

fn text<F>(obj: &Obj, other: &Obj, matches: F) -> bool
where
    F: Fn(&str, &str) -> bool,
{
    match (obj.as_scalar(), other.as_scalar()) {
        (Some(Value::String(s)), Some(Value::String(p))) => matches(s, p),
        _ => false,
    }
}

fn entry(key: Value, value: Value) -> Value {
    let mut map = BTreeMap::new();
    map.insert("key".to_string(), key);
    map.insert("value".to_string(), value);
    Value::Map(map)
}

fn by_traversals(modulators: &[Step]) -> Vec<&Traversal> {
    modulators
        .iter()
        .filter_map(|m| match m {
            Step::By(t) | Step::ByOrder(t, _) => Some(t),
            _ => None,
        })
        .collect()
}

fn endpoint(obj: &Obj) -> Result<VertexId> {
    match obj {
        Obj::Vertex(id) => Ok(*id),
        other => Err(Error::Execution(format!(
            "Edge endpoint is not a vertex: {:?}",
            other
        ))),
    }
}

/// Reduce the whole stream to at most one object
fn reduce<F>(stream: Vec<Traverser>, f: F) -> Result<Vec<Traverser>>
where
    F: FnOnce(Vec<Obj>) -> Result<Option<Obj>>,
{
    let objs = stream.into_iter().map(|t| t.obj).collect();
    Ok(f(objs)?.map(Traverser::fresh).into_iter().collect())
}

fn numbers(objs: Vec<Obj>) -> Result<Vec<Value>> {
    objs.into_iter()
        .filter(|o| !o.is_null())
        .map(|o| match o {
            Obj::Value(v) if v.is_number() => Ok(v),
            other => Err(Error::Execution(format!(
                "Expected a number, got {:?}",
                other
            ))),
        })
        .collect()
}

fn sum(objs: Vec<Obj>) -> Result<Option<Obj>> {
    let values = numbers(objs)?;
    if values.is_empty() {
        return Ok(None);
    }
    let mut total = Value::Integer(0);
    for value in values {
        total = match (total, value) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(
                a.checked_add(b)
                    .ok_or_else(|| Error::Execution("Integer overflow in sum()".to_string()))?,
            ),
            (a, b) => Value::Float(a.as_float().unwrap_or(0.0) + b.as_float().unwrap_or(0.0)),
        };
    }
    Ok(Some(Obj::Value(total)))
}

fn mean(objs: Vec<Obj>) -> Result<Option<Obj>> {
    let values = numbers(objs)?;
    if values.is_empty() {
        return Ok(None);
    }
    let total: f64 = values.iter().filter_map(Value::as_float).sum();
    Ok(Some(Obj::Value(Value::Float(total / values.len() as f64))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::GremlinSteps;

    fn executor() -> TraversalExecutor {
        TraversalExecutor::new(Arc::new(Graph::modern().unwrap()))
    }

    #[test]
    fn test_names_of_people() {
        let t = Traversal::new()
            .v()
            .has_label(vec!["person".to_string()])
            .values("name");
        let result = executor().execute(&t, &ParameterMap::new()).unwrap();
        assert_eq!(result.len(), 4);
        assert!(result.contains(&Value::from("marko")));
    }

    #[test]
    fn test_select_is_map_first() {
        let t = Traversal::new()
            .inject(vec![Value::from(1)])
            .as_("x")
            .project(vec!["x".to_string()])
            .by(Traversal::new().constant(Operand::value(2)))
            .select("x");
        let result = executor().execute(&t, &ParameterMap::new()).unwrap();
        assert_eq!(result, vec![Value::Integer(2)]);
    }

    #[test]
    fn test_eq_null_matches_null() {
        let t = Traversal::new()
            .inject(vec![Value::Null, Value::from(1)])
            .is(Predicate::Eq(Operand::Value(Value::Null)));
        let result = executor().execute(&t, &ParameterMap::new()).unwrap();
        assert_eq!(result, vec![Value::Null]);
    }

    #[test]
    fn test_traverse_out_edges() {
        let t = Traversal::new()
            .v()
            .has_predicate("name", Predicate::Eq(Operand::value("marko")))
            .out_e(vec!["knows".to_string()])
            .in_v()
            .values("name")
            .order();
        let result = executor().execute(&t, &ParameterMap::new()).unwrap();
        assert_eq!(result, vec![Value::from("josh"), Value::from("vadas")]);
    }

    #[test]
    fn test_empty_sum_yields_nothing_but_count_is_zero() {
        let params = ParameterMap::new();
        let exec = executor();
        let empty = || Traversal::new().v().has_label(vec!["robot".to_string()]);

        assert!(exec.execute(&empty().values("age").sum(), &params).unwrap().is_empty());
        assert_eq!(
            exec.execute(&empty().count(), &params).unwrap(),
            vec![Value::Integer(0)]
        );
    }

    #[test]
    fn test_missing_parameter_is_execution_error() {
        let t = Traversal::new().v().limit(Bound::Parameter("n".to_string()));
        let err = executor().execute(&t, &ParameterMap::new()).unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
    }

    #[test]
    fn test_vertex_export() {
        let t = Traversal::new()
            .v()
            .has_predicate("name", Predicate::Eq(Operand::value("lop")));
        let result = executor().execute(&t, &ParameterMap::new()).unwrap();
        let map = result[0].as_map().unwrap();
        assert_eq!(map.get("_type"), Some(&Value::from("node")));
        assert_eq!(map.get("_label"), Some(&Value::from("software")));
        assert_eq!(map.get("lang"), Some(&Value::from("java")));
    }

    #[test]
    fn test_add_vertex_and_edge() {
        let graph = Arc::new(Graph::new("empty"));
        let exec = TraversalExecutor::new(graph.clone());
        let t = Traversal::new()
            .add_v(Some("person".to_string()))
            .as_("a")
            .property("name", Traversal::new().constant(Operand::value("a")))
            .add_v(Some("person".to_string()))
            .as_("b")
            .add_e("knows")
            .from("a")
            .to("b")
            .barrier()
            .limit(Bound::Literal(0));
        let result = exec.execute(&t, &ParameterMap::new()).unwrap();
        assert!(result.is_empty());
        assert_eq!(graph.vertex_count().unwrap(), 2);
        assert_eq!(graph.edge_count().unwrap(), 1);
    }
}
