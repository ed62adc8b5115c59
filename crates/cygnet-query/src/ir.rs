//! Query intermediate representation
//!
//! The IR is the AST with every variable resolved: each clause knows the
//! scope it reads from and the scope it produces, anonymous pattern
//! elements carry generated names, and projections are split into grouping
//! keys and aggregates. Nodes are never mutated after the builder returns.

use crate::ast::{Expression, RelationshipDirection};
use serde::{Deserialize, Serialize};

/// Shape of a bound variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingKind {
    /// A graph vertex
    Node,
    /// A graph edge
    Relationship,
    /// A property value or other scalar
    Scalar,
    /// A map
    Map,
    /// A list
    List,
    /// The result of an aggregate function
    Aggregate,
    /// Shape only known at execution (e.g. an unwound parameter)
    Value,
}

impl BindingKind {
    /// True for graph elements
    pub fn is_element(self) -> bool {
        matches!(self, BindingKind::Node | BindingKind::Relationship)
    }
}

/// A variable visible in a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
}

/// Index of a scope in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

/// Variables visible at one point of the query, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    bindings: Vec<Binding>,
    /// Recorded for debugging only; lookups never consult it
    pub parent: Option<ScopeId>,
}

impl Scope {
    /// An empty scope derived from `parent`
    pub fn with_parent(parent: ScopeId) -> Self {
        Self {
            bindings: Vec::new(),
            parent: Some(parent),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.name.clone()).collect()
    }

    /// Add or replace a binding; replacement keeps the original position
    pub fn bind<S: Into<String>>(&mut self, name: S, kind: BindingKind) {
        let name = name.into();
        match self.bindings.iter_mut().find(|b| b.name == name) {
            Some(existing) => existing.kind = kind,
            None => self.bindings.push(Binding { name, kind }),
        }
    }
}

/// Append-only scope storage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: Scope) -> ScopeId {
        self.scopes.push(scope);
        ScopeId(self.scopes.len() - 1)
    }

    /// Look up a scope; ids only come from `push`, so a miss yields an empty scope
    pub fn get(&self, id: ScopeId) -> &Scope {
        static EMPTY: Scope = Scope {
            bindings: Vec::new(),
            parent: None,
        };
        self.scopes.get(id.0).unwrap_or(&EMPTY)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

/// A node of a resolved pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrNodePattern {
    /// User or generated name
    pub name: String,
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expression)>,
    /// Bound before this element (earlier clause or earlier in the clause)
    pub bound: bool,
}

/// A relationship of a resolved pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrRelationshipPattern {
    pub name: String,
    pub types: Vec<String>,
    pub direction: RelationshipDirection,
    pub properties: Vec<(String, Expression)>,
    pub bound: bool,
}

/// A resolved pattern: node, (relationship, node)*
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrPattern {
    pub start: IrNodePattern,
    pub hops: Vec<(IrRelationshipPattern, IrNodePattern)>,
}

impl IrPattern {
    /// Name of the last element, the current object after matching
    pub fn end_name(&self) -> &str {
        match self.hops.last() {
            Some((_, node)) => &node.name,
            None => &self.start.name,
        }
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Collect,
}

impl AggregateFunction {
    /// Look up an aggregate by its (case-insensitive) Cypher name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "collect" => Some(AggregateFunction::Collect),
            _ => None,
        }
    }
}

/// One aggregate of an aggregating projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrAggregate {
    pub function: AggregateFunction,
    /// `None` for `count(*)`
    pub argument: Option<Expression>,
    pub distinct: bool,
}

/// What a projection item computes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrItemValue {
    /// A plain expression (a grouping key when the projection aggregates)
    Expression(Expression),
    Aggregate(IrAggregate),
}

/// A named projection item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrProjectionItem {
    pub name: String,
    pub value: IrItemValue,
}

/// ORDER BY item; `column` is set when the expression is a projected column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrOrderItem {
    pub expression: Expression,
    pub column: Option<String>,
    pub ascending: bool,
}

/// Whether a projection is a WITH or the final RETURN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionKind {
    With,
    Return,
}

/// A resolved WITH or RETURN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrProjection {
    pub kind: ProjectionKind,
    pub distinct: bool,
    pub items: Vec<IrProjectionItem>,
    pub order_by: Vec<IrOrderItem>,
    /// Scope ORDER BY expressions resolve against
    pub order_scope: ScopeId,
    pub skip: Option<Expression>,
    pub limit: Option<Expression>,
    /// WITH ... WHERE, evaluated in the projection's output scope
    pub filter: Option<Expression>,
}

impl IrProjection {
    pub fn is_aggregating(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item.value, IrItemValue::Aggregate(_)))
    }

    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|item| item.name.clone()).collect()
    }
}

/// Clause-specific IR data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrClause {
    Match {
        patterns: Vec<IrPattern>,
        filter: Option<Expression>,
    },
    Projection(IrProjection),
    Unwind {
        expression: Expression,
        variable: String,
    },
    Create {
        patterns: Vec<IrPattern>,
    },
}

impl IrClause {
    pub fn name(&self) -> &'static str {
        match self {
            IrClause::Match { .. } => "MATCH",
            IrClause::Projection(p) if p.kind == ProjectionKind::With => "WITH",
            IrClause::Projection(_) => "RETURN",
            IrClause::Unwind { .. } => "UNWIND",
            IrClause::Create { .. } => "CREATE",
        }
    }
}

/// A clause with its scopes and referenced parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrNode {
    pub clause: IrClause,
    pub scope_in: ScopeId,
    pub scope_out: ScopeId,
    /// Parameter names referenced by the clause, in first-use order
    pub parameters: Vec<String>,
}

/// A fully resolved query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIr {
    /// One branch per single query; more than one for UNION
    pub branches: Vec<Vec<IrNode>>,
    /// UNION (as opposed to UNION ALL) removes duplicate rows
    pub distinct_union: bool,
    pub scopes: ScopeArena,
    /// Result columns, empty for queries ending in CREATE
    pub columns: Vec<String>,
}

impl QueryIr {
    /// All parameter names referenced by the query
    pub fn parameters(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for node in self.branches.iter().flatten() {
            for name in &node.parameters {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_bind_replaces_in_place() {
        let mut scope = Scope::default();
        scope.bind("a", BindingKind::Node);
        scope.bind("b", BindingKind::Scalar);
        scope.bind("a", BindingKind::Map);

        assert_eq!(scope.names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(scope.get("a").unwrap().kind, BindingKind::Map);
        assert!(!scope.contains("c"));
    }

    #[test]
    fn test_arena_is_append_only() {
        let mut arena = ScopeArena::new();
        let first = arena.push(Scope::default());
        let mut child = Scope::with_parent(first);
        child.bind("x", BindingKind::Value);
        let second = arena.push(child);

        assert_eq!(arena.len(), 2);
        assert!(!arena.get(first).contains("x"));
        assert!(arena.get(second).contains("x"));
        assert_eq!(arena.get(second).parent, Some(first));
    }

    #[test]
    fn test_aggregate_lookup() {
        assert_eq!(AggregateFunction::from_name("COUNT"), Some(AggregateFunction::Count));
        assert_eq!(AggregateFunction::from_name("avg"), Some(AggregateFunction::Avg));
        assert_eq!(AggregateFunction::from_name("size"), None);
    }
}
