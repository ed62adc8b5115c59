//! IR builder
//!
//! Turns an AST into [`QueryIr`]: checks the construct allow-list, resolves
//! every variable in the scope its expression runs in, names anonymous
//! pattern elements and splits projections into keys and aggregates.

use crate::ast::*;
use crate::expression::constant_value;
use crate::ir::*;
use cygnet_core::{Error, Result};
use tracing::debug;

/// Prefix of generated names; user variables can never start with a space
pub const GENERATED_PREFIX: &str = "  ";

/// Non-aggregate functions the translator understands: (name, min args, max args)
pub const SUPPORTED_FUNCTIONS: &[(&str, usize, usize)] = &[
    ("exists", 1, 1),
    ("id", 1, 1),
    ("type", 1, 1),
    ("labels", 1, 1),
    ("coalesce", 1, usize::MAX),
];

/// Build the IR for a parsed query
pub fn build(query: &Query) -> Result<QueryIr> {
    let mut builder = Builder::default();

    let (first, columns) = builder.build_branch(&query.clauses)?;
    let mut branches = vec![first];

    let distinct_union = match query.union.first() {
        Some(part) => !part.all,
        None => false,
    };
    if query.union.iter().any(|part| part.all == distinct_union) {
        return Err(Error::InvalidQuery(
            "Invalid combination of UNION and UNION ALL".to_string(),
        ));
    }

    for part in &query.union {
        let (branch, branch_columns) = builder.build_branch(&part.clauses)?;
        if branch_columns.is_empty() || columns.is_empty() {
            return Err(Error::InvalidQuery(
                "Every query combined with UNION must end with RETURN".to_string(),
            ));
        }
        if branch_columns != columns {
            return Err(Error::InvalidQuery(
                "All sub queries in a UNION must have the same column names".to_string(),
            ));
        }
        branches.push(branch);
    }

    debug!(
        "Built IR with {} branch(es), {} scope(s)",
        branches.len(),
        builder.scopes.len()
    );

    Ok(QueryIr {
        branches,
        distinct_union,
        scopes: builder.scopes,
        columns,
    })
}

#[derive(Default)]
struct Builder {
    scopes: ScopeArena,
    unnamed: usize,
}

impl Builder {
    fn generate_name(&mut self) -> String {
        let name = format!("{}UNNAMED{}", GENERATED_PREFIX, self.unnamed);
        self.unnamed += 1;
        name
    }

    fn build_branch(&mut self, clauses: &[Clause]) -> Result<(Vec<IrNode>, Vec<String>)> {
        for clause in clauses {
            if let Clause::OptionalMatch(_) | Clause::Delete(_) | Clause::Set(_) = clause {
                return Err(Error::unsupported(clause.name(), clause.name()));
            }
        }
        if let Some(pos) = clauses.iter().position(|c| matches!(c, Clause::Return(_))) {
            if pos + 1 != clauses.len() {
                return Err(Error::InvalidQuery(
                    "RETURN can only be used at the end of the query".to_string(),
                ));
            }
        }
        match clauses.last() {
            Some(Clause::Return(_)) | Some(Clause::Create(_)) => {}
            Some(other) => {
                return Err(Error::InvalidQuery(format!(
                    "Query cannot conclude with {} (must be RETURN or CREATE)",
                    other.name()
                )));
            }
            None => return Err(Error::InvalidQuery("Empty query".to_string())),
        }

        let mut current = self.scopes.push(Scope::default());
        let mut nodes = Vec::with_capacity(clauses.len());
        let mut columns = Vec::new();

        for clause in clauses {
            let node = match clause {
                Clause::Match(m) => self.build_match(m, current)?,
                Clause::OptionalMatch(_) | Clause::Delete(_) | Clause::Set(_) => {
                    return Err(Error::unsupported(clause.name(), clause.name()));
                }
                Clause::With(p) => self.build_projection(p, ProjectionKind::With, current)?,
                Clause::Return(p) => {
                    let node = self.build_projection(p, ProjectionKind::Return, current)?;
                    if let IrClause::Projection(projection) = &node.clause {
                        columns = projection.names();
                    }
                    node
                }
                Clause::Unwind(u) => self.build_unwind(u, current)?,
                Clause::Create(c) => self.build_create(c, current)?,
            };
            debug!(
                "Resolved {} ({:?} -> {:?})",
                node.clause.name(),
                node.scope_in,
                node.scope_out
            );
            current = node.scope_out;
            nodes.push(node);
        }

        Ok((nodes, columns))
    }

    fn derived_scope(&self, parent: ScopeId) -> Scope {
        let mut scope = Scope::with_parent(parent);
        for binding in self.scopes.get(parent).bindings() {
            scope.bind(binding.name.clone(), binding.kind);
        }
        scope
    }

    // ========== MATCH / CREATE ==========

    fn build_match(&mut self, clause: &MatchClause, scope_in: ScopeId) -> Result<IrNode> {
        let mut scope = self.derived_scope(scope_in);
        let mut parameters = Vec::new();
        let mut patterns = Vec::with_capacity(clause.patterns.len());

        for pattern in &clause.patterns {
            patterns.push(self.resolve_pattern(pattern, &mut scope, "MATCH", &mut parameters)?);
        }

        if let Some(filter) = &clause.where_clause {
            check_expression(filter, &scope, "MATCH")?;
            collect_parameters(filter, &mut parameters);
        }

        let scope_out = self.scopes.push(scope);
        Ok(IrNode {
            clause: IrClause::Match {
                patterns,
                filter: clause.where_clause.clone(),
            },
            scope_in,
            scope_out,
            parameters,
        })
    }

    fn build_create(&mut self, clause: &CreateClause, scope_in: ScopeId) -> Result<IrNode> {
        let mut scope = self.derived_scope(scope_in);
        let mut parameters = Vec::new();
        let mut patterns = Vec::with_capacity(clause.patterns.len());

        for pattern in &clause.patterns {
            let resolved = self.resolve_pattern(pattern, &mut scope, "CREATE", &mut parameters)?;
            check_creatable(&resolved)?;
            patterns.push(resolved);
        }

        let scope_out = self.scopes.push(scope);
        Ok(IrNode {
            clause: IrClause::Create { patterns },
            scope_in,
            scope_out,
            parameters,
        })
    }

    fn resolve_pattern(
        &mut self,
        pattern: &Pattern,
        scope: &mut Scope,
        clause: &str,
        parameters: &mut Vec<String>,
    ) -> Result<IrPattern> {
        if pattern.variable.is_some() {
            return Err(Error::unsupported(clause, "path variable"));
        }

        let mut start = None;
        let mut hops = Vec::new();
        let mut pending: Option<IrRelationshipPattern> = None;

        for element in &pattern.elements {
            match element {
                PatternElement::Node(node) => {
                    let name = match &node.variable {
                        Some(name) => name.clone(),
                        None => self.generate_name(),
                    };
                    let bound = bind_element(scope, &name, BindingKind::Node)?;
                    let properties = resolve_properties(&node.properties, scope, clause, parameters)?;
                    let resolved = IrNodePattern {
                        name,
                        labels: node.labels.clone(),
                        properties,
                        bound,
                    };
                    match pending.take() {
                        Some(rel) => hops.push((rel, resolved)),
                        None => start = Some(resolved),
                    }
                }
                PatternElement::Relationship(rel) => {
                    if rel.length.is_some() {
                        return Err(Error::unsupported(clause, "variable-length relationship"));
                    }
                    let name = match &rel.variable {
                        Some(name) => name.clone(),
                        None => self.generate_name(),
                    };
                    let bound = bind_element(scope, &name, BindingKind::Relationship)?;
                    let properties = resolve_properties(&rel.properties, scope, clause, parameters)?;
                    pending = Some(IrRelationshipPattern {
                        name,
                        types: rel.rel_types.clone(),
                        direction: rel.direction,
                        properties,
                        bound,
                    });
                }
            }
        }

        match (start, pending) {
            (Some(start), None) => Ok(IrPattern { start, hops }),
            _ => Err(Error::InvalidQuery(format!("Malformed pattern {}", pattern))),
        }
    }

    // ========== UNWIND ==========

    fn build_unwind(&mut self, clause: &UnwindClause, scope_in: ScopeId) -> Result<IrNode> {
        let mut scope = self.derived_scope(scope_in);
        check_expression(&clause.expression, &scope, "UNWIND")?;

        if scope.contains(&clause.variable) {
            return Err(Error::InvalidQuery(format!(
                "Variable `{}` already declared",
                clause.variable
            )));
        }
        scope.bind(clause.variable.clone(), BindingKind::Value);

        let mut parameters = Vec::new();
        collect_parameters(&clause.expression, &mut parameters);

        let scope_out = self.scopes.push(scope);
        Ok(IrNode {
            clause: IrClause::Unwind {
                expression: clause.expression.clone(),
                variable: clause.variable.clone(),
            },
            scope_in,
            scope_out,
            parameters,
        })
    }

    // ========== WITH / RETURN ==========

    fn build_projection(
        &mut self,
        clause: &ProjectionClause,
        kind: ProjectionKind,
        scope_in: ScopeId,
    ) -> Result<IrNode> {
        let clause_name = match kind {
            ProjectionKind::With => "WITH",
            ProjectionKind::Return => "RETURN",
        };
        let input = self.scopes.get(scope_in).clone();
        let mut parameters = Vec::new();

        let mut items: Vec<IrProjectionItem> = Vec::new();
        let mut output = Scope::with_parent(scope_in);

        for item in expand_star(&clause.items, &input, clause_name)? {
            if kind == ProjectionKind::With
                && item.alias.is_none()
                && !matches!(item.expression, Expression::Variable(_))
            {
                return Err(Error::InvalidQuery(format!(
                    "Expression in WITH must be aliased (use AS): {}",
                    item.expression
                )));
            }

            let name = item.output_name();
            let value = resolve_item(&item.expression, &input, clause_name)?;
            collect_parameters(&item.expression, &mut parameters);

            if let Some(existing) = items.iter().find(|i| i.name == name) {
                if existing.value == value {
                    continue;
                }
                return Err(Error::AmbiguousProjection {
                    name,
                    clause: clause_name.to_string(),
                });
            }

            let binding_kind = match &value {
                IrItemValue::Aggregate(_) => BindingKind::Aggregate,
                IrItemValue::Expression(expr) => infer_kind(expr, &input),
            };
            output.bind(name.clone(), binding_kind);
            items.push(IrProjectionItem { name, value });
        }

        let aggregating = items
            .iter()
            .any(|item| matches!(item.value, IrItemValue::Aggregate(_)));

        // ORDER BY sees the projected names first, then (unless aggregating)
        // the variables that were visible before the projection
        let mut order_scope = output.clone();
        if !aggregating {
            for binding in input.bindings() {
                if !order_scope.contains(&binding.name) {
                    order_scope.bind(binding.name.clone(), binding.kind);
                }
            }
        }

        let mut order_by = Vec::with_capacity(clause.order_by.len());
        for order in &clause.order_by {
            let column = items
                .iter()
                .find(|item| match (&order.expression, &item.value) {
                    (Expression::Variable(name), _) if *name == item.name => true,
                    (expr, IrItemValue::Expression(item_expr)) => expr == item_expr,
                    (expr, IrItemValue::Aggregate(_)) => {
                        resolve_item(expr, &input, clause_name).ok().as_ref() == Some(&item.value)
                    }
                })
                .map(|item| item.name.clone());
            if column.is_none() {
                check_expression(&order.expression, &order_scope, "ORDER BY")?;
            }
            collect_parameters(&order.expression, &mut parameters);
            order_by.push(IrOrderItem {
                expression: order.expression.clone(),
                column,
                ascending: order.ascending,
            });
        }
        let order_scope = self.scopes.push(order_scope);

        for (bound, keyword) in [(&clause.skip, "SKIP"), (&clause.limit, "LIMIT")] {
            match bound {
                None | Some(Expression::Literal(_)) => {}
                Some(Expression::Parameter(name)) => {
                    if !parameters.contains(name) {
                        parameters.push(name.clone());
                    }
                }
                Some(other) => {
                    return Err(Error::unsupported(
                        keyword,
                        format!("non-constant expression `{}`", other),
                    ));
                }
            }
        }

        if let Some(filter) = &clause.where_clause {
            check_expression(filter, &output, clause_name)?;
            collect_parameters(filter, &mut parameters);
        }

        let scope_out = self.scopes.push(output);
        Ok(IrNode {
            clause: IrClause::Projection(IrProjection {
                kind,
                distinct: clause.distinct,
                items,
                order_by,
                order_scope,
                skip: clause.skip.clone(),
                limit: clause.limit.clone(),
                filter: clause.where_clause.clone(),
            }),
            scope_in,
            scope_out,
            parameters,
        })
    }
}

/// Record a pattern element in the scope; returns whether it was bound before
fn bind_element(scope: &mut Scope, name: &str, kind: BindingKind) -> Result<bool> {
    match scope.get(name) {
        Some(existing) if existing.kind == kind => Ok(true),
        Some(existing) => Err(Error::TypeMismatch {
            expected: format!("{:?}", kind),
            found: format!("{:?} `{}`", existing.kind, name),
        }),
        None => {
            scope.bind(name, kind);
            Ok(false)
        }
    }
}

fn resolve_properties(
    properties: &Option<MapExpression>,
    scope: &Scope,
    clause: &str,
    parameters: &mut Vec<String>,
) -> Result<Vec<(String, Expression)>> {
    let Some(map) = properties else {
        return Ok(Vec::new());
    };
    for (_, value) in &map.entries {
        check_expression(value, scope, clause)?;
        collect_parameters(value, parameters);
    }
    Ok(map.entries.clone())
}

fn check_creatable(pattern: &IrPattern) -> Result<()> {
    let nodes = std::iter::once(&pattern.start).chain(pattern.hops.iter().map(|(_, n)| n));
    for node in nodes {
        if node.bound && (!node.labels.is_empty() || !node.properties.is_empty()) {
            return Err(Error::InvalidQuery(format!(
                "Can't create node `{}` with labels or properties here. The variable is already declared in this context",
                node.name
            )));
        }
        if node.labels.len() > 1 {
            return Err(Error::unsupported("CREATE", "multiple labels on a node"));
        }
    }
    for (rel, _) in &pattern.hops {
        if rel.bound {
            return Err(Error::InvalidQuery(format!(
                "Can't create relationship `{}`: the variable is already declared",
                rel.name
            )));
        }
        if rel.types.len() != 1 {
            return Err(Error::InvalidQuery(
                "A single relationship type must be specified for CREATE".to_string(),
            ));
        }
        if rel.direction == RelationshipDirection::Both {
            return Err(Error::InvalidQuery(
                "Only directed relationships are supported in CREATE".to_string(),
            ));
        }
    }
    Ok(())
}

/// Expand `*` into the visible user variables, in scope order
fn expand_star(items: &[ReturnItem], scope: &Scope, clause: &str) -> Result<Vec<ReturnItem>> {
    let mut expanded = Vec::with_capacity(items.len());
    for item in items {
        if item.expression != Expression::Star {
            expanded.push(item.clone());
            continue;
        }
        let visible: Vec<_> = scope
            .bindings()
            .iter()
            .filter(|b| !b.name.starts_with(GENERATED_PREFIX))
            .collect();
        if visible.is_empty() {
            return Err(Error::InvalidQuery(format!(
                "{} * is not allowed when there are no variables in scope",
                clause
            )));
        }
        for binding in visible {
            expanded.push(ReturnItem {
                expression: Expression::Variable(binding.name.clone()),
                alias: None,
            });
        }
    }
    Ok(expanded)
}

/// Classify a projection item as an aggregate or a plain expression
fn resolve_item(expression: &Expression, scope: &Scope, clause: &str) -> Result<IrItemValue> {
    if let Expression::Function {
        name,
        args,
        distinct,
    } = expression
    {
        if let Some(function) = AggregateFunction::from_name(name) {
            if args.len() != 1 {
                return Err(Error::InvalidQuery(format!(
                    "{}() takes exactly one argument",
                    name
                )));
            }
            let argument = match &args[0] {
                Expression::Star if function == AggregateFunction::Count => None,
                Expression::Star => {
                    return Err(Error::unsupported(clause, format!("{}(*)", name)));
                }
                arg => {
                    check_expression(arg, scope, clause)?;
                    Some(arg.clone())
                }
            };
            return Ok(IrItemValue::Aggregate(IrAggregate {
                function,
                argument,
                distinct: *distinct,
            }));
        }
    }

    check_expression(expression, scope, clause)?;
    Ok(IrItemValue::Expression(expression.clone()))
}

/// Check that an expression only uses supported constructs and bound names
fn check_expression(expression: &Expression, scope: &Scope, clause: &str) -> Result<()> {
    match expression {
        Expression::Literal(_) | Expression::Parameter(_) => Ok(()),
        Expression::Variable(name) => {
            if scope.contains(name) {
                Ok(())
            } else {
                Err(Error::unbound(name, clause))
            }
        }
        Expression::Property(base, _) => check_expression(base, scope, clause),
        Expression::Binary { left, op, right } => {
            if op.is_arithmetic() && constant_value(expression).is_none() {
                return Err(Error::unsupported(
                    clause,
                    format!("non-constant arithmetic `{}`", expression),
                ));
            }
            check_expression(left, scope, clause)?;
            check_expression(right, scope, clause)
        }
        Expression::Unary { op, operand } => {
            if *op == UnaryOp::Negate && constant_value(expression).is_none() {
                return Err(Error::unsupported(
                    clause,
                    format!("non-constant arithmetic `{}`", expression),
                ));
            }
            check_expression(operand, scope, clause)
        }
        Expression::Function { name, args, .. } => {
            if AggregateFunction::from_name(name).is_some() {
                return Err(Error::unsupported(
                    clause,
                    format!("aggregate `{}` inside another expression", expression),
                ));
            }

            let lower = name.to_ascii_lowercase();
            let Some((_, min, max)) = SUPPORTED_FUNCTIONS.iter().find(|(f, _, _)| *f == lower)
            else {
                return Err(Error::unsupported(clause, format!("function `{}`", name)));
            };
            if args.len() < *min || args.len() > *max {
                return Err(Error::InvalidQuery(format!(
                    "Wrong number of arguments to {}()",
                    name
                )));
            }
            if lower == "exists" && !matches!(args[0], Expression::Property(_, _)) {
                return Err(Error::unsupported(
                    clause,
                    format!("exists() of `{}`", args[0]),
                ));
            }
            args.iter()
                .try_for_each(|a| check_expression(a, scope, clause))
        }
        Expression::List(items) => items
            .iter()
            .try_for_each(|i| check_expression(i, scope, clause)),
        Expression::Map(map) => map
            .entries
            .iter()
            .try_for_each(|(_, v)| check_expression(v, scope, clause)),
        Expression::Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            if let Some(operand) = operand {
                check_expression(operand, scope, clause)?;
            }
            for (when, then) in when_clauses {
                check_expression(when, scope, clause)?;
                check_expression(then, scope, clause)?;
            }
            match else_clause {
                Some(other) => check_expression(other, scope, clause),
                None => Ok(()),
            }
        }
        Expression::Pattern(_) => Err(Error::unsupported(clause, "pattern expression")),
        Expression::ListComprehension { .. } => {
            Err(Error::unsupported(clause, "list comprehension"))
        }
        Expression::Star => Err(Error::unsupported(clause, "`*` outside a projection item")),
    }
}

/// Binding kind of a projected expression evaluated in `scope`
fn infer_kind(expression: &Expression, scope: &Scope) -> BindingKind {
    match expression {
        Expression::Variable(name) => scope
            .get(name)
            .map(|b| b.kind)
            .unwrap_or(BindingKind::Value),
        Expression::Literal(_) => BindingKind::Scalar,
        Expression::Parameter(_) => BindingKind::Value,
        Expression::Property(base, _) => match base.as_ref() {
            Expression::Variable(name)
                if scope.get(name).is_some_and(|b| b.kind.is_element()) =>
            {
                BindingKind::Scalar
            }
            _ => BindingKind::Value,
        },
        Expression::List(_) => BindingKind::List,
        Expression::Map(_) => BindingKind::Map,
        Expression::Function { name, .. } => match name.to_ascii_lowercase().as_str() {
            "labels" => BindingKind::List,
            "coalesce" => BindingKind::Value,
            _ => BindingKind::Scalar,
        },
        Expression::Binary { .. } | Expression::Unary { .. } => match constant_value(expression) {
            Some(cygnet_core::Value::List(_)) => BindingKind::List,
            Some(cygnet_core::Value::Map(_)) => BindingKind::Map,
            _ => BindingKind::Scalar,
        },
        _ => BindingKind::Value,
    }
}

/// Append the parameter names an expression references, without duplicates
pub(crate) fn collect_parameters(expression: &Expression, out: &mut Vec<String>) {
    match expression {
        Expression::Parameter(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        Expression::Literal(_) | Expression::Variable(_) | Expression::Star => {}
        Expression::Property(base, _) => collect_parameters(base, out),
        Expression::Binary { left, right, .. } => {
            collect_parameters(left, out);
            collect_parameters(right, out);
        }
        Expression::Unary { operand, .. } => collect_parameters(operand, out),
        Expression::Function { args, .. } | Expression::List(args) => {
            args.iter().for_each(|a| collect_parameters(a, out));
        }
        Expression::Map(map) => map
            .entries
            .iter()
            .for_each(|(_, v)| collect_parameters(v, out)),
        Expression::Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            if let Some(operand) = operand {
                collect_parameters(operand, out);
            }
            for (when, then) in when_clauses {
                collect_parameters(when, out);
                collect_parameters(then, out);
            }
            if let Some(other) = else_clause {
                collect_parameters(other, out);
            }
        }
        Expression::Pattern(_) | Expression::ListComprehension { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn build_text(query: &str) -> Result<QueryIr> {
        build(&parse(query).unwrap())
    }

    fn projection(node: &IrNode) -> &IrProjection {
        match &node.clause {
            IrClause::Projection(p) => p,
            other => panic!("expected projection, got {:?}", other),
        }
    }

    #[test]
    fn test_match_return_scopes() {
        let ir = build_text("MATCH (n:person)-[:knows]->(m) RETURN n.name, m").unwrap();
        let branch = &ir.branches[0];
        assert_eq!(branch.len(), 2);

        let match_scope = ir.scopes.get(branch[0].scope_out);
        assert!(match_scope.contains("n"));
        assert!(match_scope.contains("m"));
        assert!(match_scope.names().iter().any(|n| n.starts_with("  UNNAMED")));

        assert_eq!(ir.columns, vec!["n.name".to_string(), "m".to_string()]);
    }

    #[test]
    fn test_with_shadowing_is_total() {
        let err = build_text("MATCH (p) WITH p.name AS x RETURN p").unwrap_err();
        assert_eq!(err, Error::unbound("p", "RETURN"));
    }

    #[test]
    fn test_with_can_rebind_same_name() {
        let ir = build_text("MATCH (s) WITH s.name AS s RETURN s").unwrap();
        let with_scope = ir.scopes.get(ir.branches[0][1].scope_out);
        assert_eq!(with_scope.get("s").unwrap().kind, BindingKind::Scalar);
    }

    #[test]
    fn test_ambiguous_projection() {
        let err = build_text("MATCH (n) RETURN n.name AS x, n.age AS x").unwrap_err();
        assert!(matches!(err, Error::AmbiguousProjection { ref name, .. } if name == "x"));

        // identical expressions collapse
        let ir = build_text("MATCH (n) RETURN n.name AS x, n.name AS x").unwrap();
        assert_eq!(ir.columns, vec!["x".to_string()]);
    }

    #[test]
    fn test_unsupported_constructs() {
        let cases = [
            "OPTIONAL MATCH (n) RETURN n",
            "MATCH (n) DELETE n",
            "MATCH (n) SET n.x = 1",
            "MATCH (a)-[*1..2]->(b) RETURN b",
            "MATCH p = (a)-->(b) RETURN a",
            "MATCH (n) RETURN [x IN [1] | x] AS l",
            "MATCH (n) WHERE (n)-->() RETURN n",
            "MATCH (n) RETURN n.age + 1 AS x",
            "MATCH (n) RETURN toUpper(n.name) AS x",
            "MATCH (n) RETURN count(n) + 1 AS x",
        ];
        for query in cases {
            let err = build_text(query).unwrap_err();
            assert!(
                matches!(err, Error::UnsupportedConstruct { .. }),
                "{} gave {:?}",
                query,
                err
            );
        }
    }

    #[test]
    fn test_constant_arithmetic_allowed() {
        assert!(build_text("RETURN 1 + 2 AS x").is_ok());
    }

    #[test]
    fn test_structural_errors() {
        let cases = [
            "MATCH (n) RETURN n MATCH (m) RETURN m",
            "MATCH (n) WITH n AS m",
            "RETURN 1 AS x UNION RETURN 2 AS y",
            "RETURN 1 AS x UNION RETURN 2 AS x UNION ALL RETURN 3 AS x",
            "MATCH (n) WITH n.name RETURN 1",
        ];
        for query in cases {
            let err = build_text(query).unwrap_err();
            assert!(matches!(err, Error::InvalidQuery(_)), "{} gave {:?}", query, err);
        }
    }

    #[test]
    fn test_aggregation_split() {
        let ir = build_text("MATCH (n:person) RETURN n.age > 30 AS old, count(*) AS c, avg(n.age) AS a").unwrap();
        let ret = projection(&ir.branches[0][1]);
        assert!(ret.is_aggregating());
        assert!(matches!(ret.items[0].value, IrItemValue::Expression(_)));
        assert!(matches!(
            ret.items[1].value,
            IrItemValue::Aggregate(IrAggregate {
                function: AggregateFunction::Count,
                argument: None,
                ..
            })
        ));
    }

    #[test]
    fn test_order_by_scope() {
        // non-aggregating: old variables stay visible to ORDER BY
        let ir = build_text("MATCH (n) RETURN n.name AS name ORDER BY n.age").unwrap();
        let ret = projection(&ir.branches[0][1]);
        assert!(ret.order_by[0].column.is_none());

        // aggregating: only the projected names
        let err = build_text("MATCH (n) RETURN count(*) AS c ORDER BY n.age").unwrap_err();
        assert_eq!(err, Error::unbound("n", "ORDER BY"));

        let ir = build_text("MATCH (n) RETURN n.name AS name, count(*) AS c ORDER BY c DESC").unwrap();
        let ret = projection(&ir.branches[0][1]);
        assert_eq!(ret.order_by[0].column.as_deref(), Some("c"));
    }

    #[test]
    fn test_skip_limit_must_be_literal_or_parameter() {
        assert!(build_text("UNWIND [1] AS i RETURN i SKIP $s LIMIT 2").is_ok());
        let err = build_text("MATCH (n) RETURN n LIMIT n.age").unwrap_err();
        assert!(matches!(err, Error::UnsupportedConstruct { .. }));
    }

    #[test]
    fn test_parameters_collected() {
        let ir = build_text("MATCH (n {name: $name}) WHERE n.age IN $ages RETURN n LIMIT $max").unwrap();
        assert_eq!(
            ir.parameters(),
            vec!["name".to_string(), "ages".to_string(), "max".to_string()]
        );
    }

    #[test]
    fn test_star_expansion() {
        let ir = build_text("MATCH (a)-->(b) RETURN *").unwrap();
        assert_eq!(ir.columns, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_create_checks() {
        assert!(build_text("CREATE (a:person {name: 'x'})-[:knows]->(b:person)").is_ok());
        assert!(matches!(
            build_text("CREATE (a)-[:knows]-(b)").unwrap_err(),
            Error::InvalidQuery(_)
        ));
        assert!(matches!(
            build_text("MATCH (a) CREATE (a:person)").unwrap_err(),
            Error::InvalidQuery(_)
        ));
    }

    #[test]
    fn test_conflicting_binding_kind() {
        let err = build_text("MATCH (a)-[r]->(b) MATCH (r) RETURN r").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }
}
