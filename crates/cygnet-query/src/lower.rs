//! Lowering: query IR to a flavor-neutral traversal
//!
//! Every clause appends steps to one traversal. After each clause the
//! traverser carries the row: bound variables are path labels (`as`), and
//! the current object is the last element matched or the last projected
//! value. WITH re-labels its output so later clauses select by name.

use crate::ast::{Expression, RelationshipDirection};
use crate::builder::GENERATED_PREFIX;
use crate::expression::{ExpressionLowering, constant_value};
use crate::ir::*;
use crate::params::validate_parameter_names;
use crate::predicate::{Operand, Predicate};
use crate::step::{Bound, Column, GremlinSteps, Order, Traversal};
use cygnet_core::{Error, ParameterMap, Result, Value};
use tracing::debug;

/// Seed value injected when a query does not start with MATCH
pub const START: &str = "  cypher.start";

/// Label holding the map produced by WITH while it is unpacked
pub const WITH_LABEL: &str = "  cypher.with";

/// A lowered query, ready for a flavor emitter
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredQuery {
    pub traversal: Traversal,
    /// Result columns, empty for queries ending in CREATE
    pub columns: Vec<String>,
    /// Every user-visible WITH/RETURN output name
    pub projected: Vec<String>,
}

/// Lower a resolved query to a neutral traversal
///
/// `parameters` are consulted for validation and null folding only; their
/// values are never inlined into the traversal.
pub fn lower_neutral(ir: &QueryIr, parameters: &ParameterMap) -> Result<LoweredQuery> {
    let names = ir.parameters();
    validate_parameter_names(names.iter().map(String::as_str))?;

    let mut branches = Vec::with_capacity(ir.branches.len());
    for branch in &ir.branches {
        branches.push(BranchLowering::new(ir, parameters).lower(branch)?);
    }

    let starts_with_match = |branch: &Vec<IrNode>| {
        matches!(branch.first().map(|n| &n.clause), Some(IrClause::Match { .. }))
    };

    let traversal = if branches.len() == 1 {
        let branch = branches.remove(0);
        if ir.branches.first().is_some_and(starts_with_match) {
            branch
        } else {
            Traversal::new()
                .inject(vec![Value::from(START)])
                .then(branch)
        }
    } else {
        let union = Traversal::new()
            .inject(vec![Value::from(START)])
            .union(branches);
        if ir.distinct_union {
            union.dedup()
        } else {
            union
        }
    };

    let mut projected = Vec::new();
    for node in ir.branches.iter().flatten() {
        if let IrClause::Projection(p) = &node.clause {
            for name in p.names() {
                if !name.starts_with(GENERATED_PREFIX) && !projected.contains(&name) {
                    projected.push(name);
                }
            }
        }
    }

    debug!(
        "Lowered {} branch(es) into {} step(s), {} parameter(s)",
        ir.branches.len(),
        traversal.len(),
        names.len()
    );

    Ok(LoweredQuery {
        traversal,
        columns: ir.columns.clone(),
        projected,
    })
}

/// Lowers the clauses of one single query
struct BranchLowering<'a> {
    ir: &'a QueryIr,
    parameters: &'a ParameterMap,
    traversal: Traversal,
    /// Variable the current object is bound to, if known
    current: Option<String>,
}

impl<'a> BranchLowering<'a> {
    fn new(ir: &'a QueryIr, parameters: &'a ParameterMap) -> Self {
        Self {
            ir,
            parameters,
            traversal: Traversal::new(),
            current: None,
        }
    }

    fn lower(mut self, nodes: &[IrNode]) -> Result<Traversal> {
        for node in nodes {
            match &node.clause {
                IrClause::Match { patterns, filter } => {
                    self.match_clause(node, patterns, filter.as_ref())?
                }
                IrClause::Projection(projection) => self.projection(node, projection)?,
                IrClause::Unwind {
                    expression,
                    variable,
                } => self.unwind(node, expression, variable)?,
                IrClause::Create { patterns } => self.create(node, patterns)?,
            }
        }

        if matches!(nodes.last().map(|n| &n.clause), Some(IrClause::Create { .. })) {
            self.push(Traversal::new().barrier().limit(Bound::Literal(0)));
        }
        Ok(self.traversal)
    }

    fn push(&mut self, steps: Traversal) {
        self.traversal.append(steps);
    }

    fn scope(&self, id: ScopeId) -> &'a Scope {
        self.ir.scopes.get(id)
    }

    // ========== MATCH ==========

    fn match_clause(
        &mut self,
        node: &IrNode,
        patterns: &[IrPattern],
        filter: Option<&Expression>,
    ) -> Result<()> {
        let scope = self.scope(node.scope_out);

        for pattern in patterns {
            self.match_node(&pattern.start, scope, true)?;
            for (rel, next) in &pattern.hops {
                self.match_relationship(rel, scope)?;
                self.match_node(next, scope, false)?;
            }
            self.current = Some(pattern.end_name().to_string());
        }

        if let Some(filter) = filter {
            let exprs =
                ExpressionLowering::new(scope, self.parameters, self.current.as_deref(), "WHERE");
            let cond = exprs.condition(filter)?;
            self.push(cond.into_filter());
        }
        Ok(())
    }

    fn match_node(&mut self, node: &IrNodePattern, scope: &Scope, start: bool) -> Result<()> {
        let mut t = Traversal::new();
        if start {
            t = if node.bound { t.select(&node.name) } else { t.v() };
        } else if node.bound {
            t = t.where_predicate(Predicate::Eq(Operand::label(&node.name)));
        }
        if !node.labels.is_empty() {
            t = t.has_label(node.labels.clone());
        }
        if !node.bound {
            t = t.as_(&node.name);
        }
        self.push(t);

        // constraints may compare against the element's own label
        self.property_constraints(&node.name, &node.properties, scope)
    }

    fn match_relationship(&mut self, rel: &IrRelationshipPattern, scope: &Scope) -> Result<()> {
        let types = rel.types.clone();
        let mut t = match rel.direction {
            RelationshipDirection::Outgoing => Traversal::new().out_e(types),
            RelationshipDirection::Incoming => Traversal::new().in_e(types),
            RelationshipDirection::Both => Traversal::new().both_e(types),
        };
        t = if rel.bound {
            t.where_predicate(Predicate::Eq(Operand::label(&rel.name)))
        } else {
            t.as_(&rel.name)
        };
        self.push(t);

        self.property_constraints(&rel.name, &rel.properties, scope)?;

        self.push(match rel.direction {
            RelationshipDirection::Outgoing => Traversal::new().in_v(),
            RelationshipDirection::Incoming => Traversal::new().out_v(),
            RelationshipDirection::Both => Traversal::new().other_v(),
        });
        Ok(())
    }

    /// `{k: v}` on a pattern element is `element.k = v` on the current object
    fn property_constraints(
        &mut self,
        element: &str,
        properties: &[(String, Expression)],
        scope: &Scope,
    ) -> Result<()> {
        let exprs = ExpressionLowering::new(scope, self.parameters, Some(element), "MATCH");
        for (key, value) in properties {
            let test = Expression::binary(
                Expression::property(Expression::variable(element), key),
                crate::ast::BinaryOp::Equals,
                value.clone(),
            );
            let cond = exprs.condition(&test)?;
            self.push(cond.into_filter());
        }
        Ok(())
    }

    // ========== UNWIND ==========

    fn unwind(&mut self, node: &IrNode, expression: &Expression, variable: &str) -> Result<()> {
        let scope = self.scope(node.scope_in);
        let exprs =
            ExpressionLowering::new(scope, self.parameters, self.current.as_deref(), "UNWIND");
        let items = exprs.value(expression)?.unfold();
        // an unwound map must not answer `select` for other variables
        self.push(
            Traversal::new()
                .flat_map(items)
                .as_(variable)
                .constant(Operand::value(START)),
        );
        self.current = None;
        Ok(())
    }

    // ========== CREATE ==========

    fn create(&mut self, node: &IrNode, patterns: &[IrPattern]) -> Result<()> {
        let scope = self.scope(node.scope_out);
        let exprs = ExpressionLowering::new(scope, self.parameters, None, "CREATE");

        for pattern in patterns {
            self.create_node(&pattern.start, &exprs)?;
            let mut previous = pattern.start.name.as_str();
            for (rel, next) in &pattern.hops {
                self.create_node(next, &exprs)?;

                let label = rel.types.first().ok_or_else(|| {
                    Error::InvalidQuery(
                        "Exactly one relationship type must be specified for CREATE".to_string(),
                    )
                })?;
                let (from, to) = match rel.direction {
                    RelationshipDirection::Incoming => (next.name.as_str(), previous),
                    _ => (previous, next.name.as_str()),
                };
                let t = Traversal::new()
                    .add_e(label)
                    .from(from)
                    .to(to)
                    .as_(&rel.name);
                self.push(t);
                self.create_properties(&rel.properties, &exprs)?;
                previous = next.name.as_str();
            }
            self.current = Some(pattern.end_name().to_string());
        }
        Ok(())
    }

    fn create_node(&mut self, node: &IrNodePattern, exprs: &ExpressionLowering<'_>) -> Result<()> {
        if node.bound {
            return Ok(());
        }
        self.push(
            Traversal::new()
                .add_v(node.labels.first().cloned())
                .as_(&node.name),
        );
        self.create_properties(&node.properties, exprs)
    }

    fn create_properties(
        &mut self,
        properties: &[(String, Expression)],
        exprs: &ExpressionLowering<'_>,
    ) -> Result<()> {
        for (key, value) in properties {
            // a null property is the same as no property
            if matches!(constant_value(value), Some(Value::Null)) {
                continue;
            }
            let value = exprs.value(value)?;
            self.push(Traversal::new().property(key, value));
        }
        Ok(())
    }

    // ========== WITH / RETURN ==========

    fn projection(&mut self, node: &IrNode, projection: &IrProjection) -> Result<()> {
        let clause = node.clause.name();
        let scope_in = self.scope(node.scope_in);
        let current = self.current.take();
        let exprs = ExpressionLowering::new(scope_in, self.parameters, current.as_deref(), clause);

        if projection.is_aggregating() {
            self.aggregate(projection, &exprs)?;
        } else {
            let mut t = Traversal::new().project(projection.names());
            for item in &projection.items {
                if let IrItemValue::Expression(expression) = &item.value {
                    t = t.by(exprs.value(expression)?);
                }
            }
            self.push(t);
        }

        if projection.distinct {
            self.push(Traversal::new().dedup());
        }

        if !projection.order_by.is_empty() {
            let order_scope = self.scope(projection.order_scope);
            let order_exprs = ExpressionLowering::new(order_scope, self.parameters, None, clause);
            let mut t = Traversal::new().order();
            for item in &projection.order_by {
                let by = match &item.column {
                    Some(column) => Traversal::new().select(column),
                    None => order_exprs.value(&item.expression)?,
                };
                let order = if item.ascending { Order::Asc } else { Order::Desc };
                t = t.by_order(by, order);
            }
            self.push(t);
        }

        if let Some(skip) = &projection.skip {
            let bound = self.bound(skip, "SKIP")?;
            self.push(Traversal::new().skip(bound));
        }
        if let Some(limit) = &projection.limit {
            let bound = self.bound(limit, "LIMIT")?;
            self.push(Traversal::new().limit(bound));
        }

        if projection.kind == ProjectionKind::With {
            // the row map stays current: its keys are exactly the new scope
            let mut t = Traversal::new().as_(WITH_LABEL);
            for name in projection.names() {
                t = t.select(WITH_LABEL).select(&name).as_(&name);
            }
            self.push(t.select(WITH_LABEL));

            if let Some(filter) = &projection.filter {
                let scope_out = self.scope(node.scope_out);
                let exprs = ExpressionLowering::new(
                    scope_out,
                    self.parameters,
                    self.current.as_deref(),
                    "WITH",
                );
                let cond = exprs.condition(filter)?;
                self.push(cond.into_filter());
            }
        }
        Ok(())
    }

    /// Grouping keys and aggregate arguments are projected first, then rows
    /// are grouped by the key map and each aggregate reduces its column
    fn aggregate(&mut self, projection: &IrProjection, exprs: &ExpressionLowering<'_>) -> Result<()> {
        let mut pre_keys = Vec::new();
        let mut pre_values = Vec::new();
        let mut keys = Vec::new();
        let mut aggregates = Vec::new();

        for item in &projection.items {
            match &item.value {
                IrItemValue::Expression(expression) => {
                    pre_keys.push(item.name.clone());
                    pre_values.push(exprs.value(expression)?);
                    keys.push(item.name.clone());
                }
                IrItemValue::Aggregate(aggregate) => {
                    let column = format!("{}agg_{}", GENERATED_PREFIX, aggregates.len());
                    pre_keys.push(column.clone());
                    pre_values.push(match &aggregate.argument {
                        Some(argument) => exprs.value(argument)?,
                        None => Traversal::new().constant(Operand::value(1)),
                    });
                    aggregates.push((item.name.clone(), column));
                }
            }
        }

        let mut pre = Traversal::new().project(pre_keys);
        for value in pre_values {
            pre = pre.by(value);
        }
        self.push(pre);

        let column_of = |name: &str| {
            aggregates
                .iter()
                .find(|(output, _)| output == name)
                .map(|(_, column)| column.as_str())
        };

        let mut t = Traversal::new();
        if keys.is_empty() {
            t = t.fold().project(projection.names());
            for item in &projection.items {
                if let (IrItemValue::Aggregate(aggregate), Some(column)) =
                    (&item.value, column_of(&item.name))
                {
                    t = t.by(
                        Traversal::new()
                            .unfold()
                            .select(column)
                            .then(aggregate_steps(aggregate)),
                    );
                }
            }
        } else {
            let mut key = Traversal::new().project(keys.clone());
            for name in &keys {
                key = key.by(Traversal::new().select(name));
            }
            t = t
                .group()
                .by(key)
                .by(Traversal::new().fold())
                .unfold()
                .project(projection.names());
            for item in &projection.items {
                let by = match (&item.value, column_of(&item.name)) {
                    (IrItemValue::Aggregate(aggregate), Some(column)) => Traversal::new()
                        .select_column(Column::Values)
                        .unfold()
                        .select(column)
                        .then(aggregate_steps(aggregate)),
                    _ => Traversal::new()
                        .select_column(Column::Keys)
                        .select(&item.name),
                };
                t = t.by(by);
            }
        }
        self.push(t);
        Ok(())
    }

    /// SKIP and LIMIT take a non-negative integer literal or a parameter
    fn bound(&self, expression: &Expression, clause: &str) -> Result<Bound> {
        let check = |value: &Value| match value {
            Value::Integer(n) if *n >= 0 => Ok(*n),
            other => Err(Error::InvalidRange {
                clause: clause.to_string(),
                reason: format!("expected a non-negative integer, got {}", other),
            }),
        };

        match expression {
            Expression::Parameter(name) => {
                if let Some(value) = self.parameters.get(name) {
                    check(value)?;
                }
                Ok(Bound::Parameter(name.clone()))
            }
            other => match constant_value(other) {
                Some(value) => Ok(Bound::Literal(check(&value)?)),
                None => Err(Error::unsupported(clause, format!("non-constant value `{}`", other))),
            },
        }
    }
}

/// Reduce the (unfolded) column of one aggregate; nulls never contribute
fn aggregate_steps(aggregate: &IrAggregate) -> Traversal {
    let mut t = Traversal::new().is(Predicate::Neq(Operand::Value(Value::Null)));
    if aggregate.distinct {
        t = t.dedup();
    }
    let or_else = |reduce: Traversal, empty: Value| {
        Traversal::new().fold().coalesce(vec![
            Traversal::new().unfold().then(reduce),
            Traversal::new().constant(Operand::Value(empty)),
        ])
    };
    match aggregate.function {
        AggregateFunction::Count => t.count(),
        AggregateFunction::Collect => t.fold(),
        AggregateFunction::Sum => t.then(or_else(Traversal::new().sum(), Value::Integer(0))),
        AggregateFunction::Avg => t.then(or_else(Traversal::new().mean(), Value::Null)),
        AggregateFunction::Min => t.then(or_else(Traversal::new().min(), Value::Null)),
        AggregateFunction::Max => t.then(or_else(Traversal::new().max(), Value::Null)),
    }
}
