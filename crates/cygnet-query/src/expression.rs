//! Expression lowering
//!
//! Expressions are lowered in two positions. In value position they become
//! a traversal that maps the current traverser to exactly one value (null
//! included). In condition position they become a [`Cond`]: a sequence of
//! filter steps in negation normal form, or a constant outcome when the
//! answer is known at translation time.

use crate::ast::{BinaryOp, Expression, Literal, UnaryOp};
use crate::ir::{BindingKind, Scope};
use crate::predicate::{Operand, Predicate};
use crate::step::{GremlinSteps, Traversal};
use cygnet_core::{Error, ParameterMap, Result, Value};
use std::collections::BTreeMap;

/// Label used to compare two runtime values
const COMPARE_LABEL: &str = "  cmp";

/// Outcome of lowering a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    Always,
    Never,
    /// Filter steps applied to the current traverser
    Test(Traversal),
}

impl Cond {
    /// All of the conditions must hold
    pub fn all(conds: Vec<Cond>) -> Cond {
        let mut steps = Traversal::new();
        for cond in conds {
            match cond {
                Cond::Never => return Cond::Never,
                Cond::Always => {}
                Cond::Test(t) => steps.append(t),
            }
        }
        if steps.is_empty() {
            Cond::Always
        } else {
            Cond::Test(steps)
        }
    }

    /// Any of the conditions must hold
    pub fn any(conds: Vec<Cond>) -> Cond {
        let mut tests = Vec::new();
        for cond in conds {
            match cond {
                Cond::Always => return Cond::Always,
                Cond::Never => {}
                Cond::Test(t) => tests.push(t),
            }
        }
        match tests.len() {
            0 => Cond::Never,
            1 => tests.pop().map(Cond::Test).unwrap_or(Cond::Never),
            _ => Cond::Test(Traversal::new().or(tests)),
        }
    }

    /// Filter steps for this condition; `Never` becomes `not(identity())`
    pub fn into_filter(self) -> Traversal {
        match self {
            Cond::Always => Traversal::new(),
            Cond::Never => Traversal::new().not(Traversal::new().identity()),
            Cond::Test(t) => t,
        }
    }
}

/// Evaluate an expression at translation time
///
/// Literals, literal lists and maps, and arithmetic over them fold to a
/// value; anything that depends on bindings or parameters does not.
pub fn constant_value(expression: &Expression) -> Option<Value> {
    match expression {
        Expression::Literal(literal) => Some(literal.to_value()),
        Expression::List(items) => items
            .iter()
            .map(constant_value)
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        Expression::Map(map) => map
            .entries
            .iter()
            .map(|(k, v)| constant_value(v).map(|v| (k.clone(), v)))
            .collect::<Option<BTreeMap<_, _>>>()
            .map(Value::Map),
        Expression::Unary {
            op: UnaryOp::Negate,
            operand,
        } => match constant_value(operand)? {
            Value::Integer(i) => i.checked_neg().map(Value::Integer),
            Value::Float(f) => Some(Value::Float(-f)),
            Value::Null => Some(Value::Null),
            _ => None,
        },
        Expression::Binary { left, op, right } if op.is_arithmetic() => {
            arithmetic(*op, constant_value(left)?, constant_value(right)?)
        }
        _ => None,
    }
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Option<Value> {
    use Value::*;
    if left.is_null() || right.is_null() {
        return Some(Null);
    }
    match (op, left, right) {
        (BinaryOp::Add, String(a), String(b)) => Some(String(a + &b)),
        (BinaryOp::Add, List(mut a), List(b)) => {
            a.extend(b);
            Some(List(a))
        }
        (BinaryOp::Add, Integer(a), Integer(b)) => a.checked_add(b).map(Integer),
        (BinaryOp::Subtract, Integer(a), Integer(b)) => a.checked_sub(b).map(Integer),
        (BinaryOp::Multiply, Integer(a), Integer(b)) => a.checked_mul(b).map(Integer),
        (BinaryOp::Divide, Integer(a), Integer(b)) => a.checked_div(b).map(Integer),
        (BinaryOp::Modulo, Integer(a), Integer(b)) => a.checked_rem(b).map(Integer),
        (op, a, b) => {
            let (a, b) = (a.as_float()?, b.as_float()?);
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                BinaryOp::Divide => a / b,
                BinaryOp::Modulo => a % b,
                BinaryOp::Power => a.powf(b),
                _ => return None,
            };
            Some(Float(result))
        }
    }
}

/// Comparison operators in normalized form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    fn from_op(op: BinaryOp) -> Option<Self> {
        match op {
            BinaryOp::Equals => Some(Comparison::Eq),
            BinaryOp::NotEquals => Some(Comparison::Neq),
            BinaryOp::LessThan => Some(Comparison::Lt),
            BinaryOp::LessEquals => Some(Comparison::Lte),
            BinaryOp::GreaterThan => Some(Comparison::Gt),
            BinaryOp::GreaterEquals => Some(Comparison::Gte),
            _ => None,
        }
    }

    /// `NOT (a op b)` is `a op' b`
    fn negate(self) -> Self {
        match self {
            Comparison::Eq => Comparison::Neq,
            Comparison::Neq => Comparison::Eq,
            Comparison::Lt => Comparison::Gte,
            Comparison::Lte => Comparison::Gt,
            Comparison::Gt => Comparison::Lte,
            Comparison::Gte => Comparison::Lt,
        }
    }

    /// `a op b` is `b op' a`
    fn mirror(self) -> Self {
        match self {
            Comparison::Lt => Comparison::Gt,
            Comparison::Lte => Comparison::Gte,
            Comparison::Gt => Comparison::Lt,
            Comparison::Gte => Comparison::Lte,
            other => other,
        }
    }

    fn predicate(self, operand: Operand) -> Predicate {
        match self {
            Comparison::Eq => Predicate::Eq(operand),
            Comparison::Neq => Predicate::Neq(operand),
            Comparison::Lt => Predicate::Lt(operand),
            Comparison::Lte => Predicate::Lte(operand),
            Comparison::Gt => Predicate::Gt(operand),
            Comparison::Gte => Predicate::Gte(operand),
        }
    }

    fn evaluate(self, left: &Value, right: &Value) -> Option<bool> {
        use std::cmp::Ordering::*;
        match self {
            Comparison::Eq => left.cypher_eq(right),
            Comparison::Neq => left.cypher_eq(right).map(|eq| !eq),
            Comparison::Lt => left.cypher_cmp(right).map(|o| o == Less),
            Comparison::Lte => left.cypher_cmp(right).map(|o| o != Greater),
            Comparison::Gt => left.cypher_cmp(right).map(|o| o == Greater),
            Comparison::Gte => left.cypher_cmp(right).map(|o| o != Less),
        }
    }
}

fn not_null() -> Predicate {
    Predicate::Neq(Operand::Value(Value::Null))
}

fn is_null() -> Predicate {
    Predicate::Eq(Operand::Value(Value::Null))
}

fn constant(value: Value) -> Traversal {
    Traversal::new().constant(Operand::Value(value))
}

/// Lowers expressions evaluated against one scope
pub struct ExpressionLowering<'a> {
    scope: &'a Scope,
    parameters: &'a ParameterMap,
    /// Label of the current object, when it is known to be a bound variable
    current: Option<&'a str>,
    clause: &'a str,
}

impl<'a> ExpressionLowering<'a> {
    pub fn new(
        scope: &'a Scope,
        parameters: &'a ParameterMap,
        current: Option<&'a str>,
        clause: &'a str,
    ) -> Self {
        Self {
            scope,
            parameters,
            current,
            clause,
        }
    }

    fn kind(&self, name: &str) -> Result<BindingKind> {
        self.scope
            .get(name)
            .map(|b| b.kind)
            .ok_or_else(|| Error::unbound(name, self.clause))
    }

    /// A translation-time operand: a constant or a parameter
    fn operand(&self, expression: &Expression) -> Option<Operand> {
        match expression {
            Expression::Parameter(name) => Some(Operand::Parameter(name.clone())),
            other => constant_value(other).map(Operand::Value),
        }
    }

    /// True for null literals and parameters supplied as null
    fn is_null_operand(&self, expression: &Expression) -> bool {
        match expression {
            Expression::Parameter(name) => {
                matches!(self.parameters.get(name), Some(Value::Null))
            }
            other => matches!(constant_value(other), Some(Value::Null)),
        }
    }

    /// `var.key` where `var` is a graph element
    fn element_property<'e>(&self, expression: &'e Expression) -> Option<(&'e str, &'e str)> {
        match expression {
            Expression::Property(base, key) => match base.as_ref() {
                Expression::Variable(name)
                    if self.scope.get(name).is_some_and(|b| b.kind.is_element()) =>
                {
                    Some((name.as_str(), key.as_str()))
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Apply element steps to a variable: directly when it is the current
    /// object, otherwise inside a `where(select(..))`
    fn on_element(&self, name: &str, steps: Traversal) -> Traversal {
        if self.current == Some(name) {
            steps
        } else {
            Traversal::new().where_(Traversal::new().select(name).then(steps))
        }
    }

    // ========== Value Position ==========

    /// Lower an expression to a traversal producing its value
    pub fn value(&self, expression: &Expression) -> Result<Traversal> {
        if let Some(value) = constant_value(expression) {
            return Ok(constant(value));
        }

        match expression {
            Expression::Literal(literal) => Ok(constant(literal.to_value())),
            Expression::Parameter(name) => {
                Ok(Traversal::new().constant(Operand::Parameter(name.clone())))
            }
            Expression::Variable(name) => {
                self.kind(name)?;
                Ok(Traversal::new().select(name))
            }
            Expression::Property(base, key) => self.property(base, key),
            Expression::List(items) => {
                let branches = items
                    .iter()
                    .map(|item| self.value(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Traversal::new().union(branches).fold())
            }
            Expression::Map(map) => {
                let keys = map.entries.iter().map(|(k, _)| k.clone()).collect();
                let mut t = Traversal::new().project(keys);
                for (_, value) in &map.entries {
                    t = t.by(self.value(value)?);
                }
                Ok(t)
            }
            Expression::Function { name, args, .. } => self.function(name, args, expression),
            Expression::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                let mut result = match else_clause {
                    Some(other) => self.value(other)?,
                    None => constant(Value::Null),
                };
                for (when, then) in when_clauses.iter().rev() {
                    let test = match operand {
                        Some(operand) => Expression::binary(
                            operand.as_ref().clone(),
                            BinaryOp::Equals,
                            when.clone(),
                        ),
                        None => when.clone(),
                    };
                    result = match self.condition(&test)? {
                        Cond::Always => self.value(then)?,
                        Cond::Never => result,
                        Cond::Test(filter) => {
                            Traversal::new().choose(filter, self.value(then)?, result)
                        }
                    };
                }
                Ok(result)
            }
            Expression::Binary { op, .. } if op.is_arithmetic() => Err(Error::unsupported(
                self.clause,
                format!("non-constant arithmetic `{}`", expression),
            )),
            Expression::Unary {
                op: UnaryOp::Negate,
                ..
            } => Err(Error::unsupported(
                self.clause,
                format!("non-constant arithmetic `{}`", expression),
            )),
            Expression::Binary { .. } | Expression::Unary { .. } => self.boolean(expression),
            Expression::Pattern(_) => Err(Error::unsupported(self.clause, "pattern expression")),
            Expression::ListComprehension { .. } => {
                Err(Error::unsupported(self.clause, "list comprehension"))
            }
            Expression::Star => Err(Error::unsupported(
                self.clause,
                "`*` outside a projection item",
            )),
        }
    }

    fn property(&self, base: &Expression, key: &str) -> Result<Traversal> {
        let kind = match base {
            Expression::Variable(name) => self.kind(name)?,
            Expression::Map(_) => BindingKind::Map,
            Expression::Parameter(_) | Expression::Property(_, _) | Expression::Case { .. } => {
                BindingKind::Value
            }
            Expression::Function { name, .. } if name.eq_ignore_ascii_case("coalesce") => {
                BindingKind::Value
            }
            Expression::List(_) => BindingKind::List,
            _ => BindingKind::Scalar,
        };

        let null = constant(Value::Null);
        let lookup = match kind {
            BindingKind::Node | BindingKind::Relationship => {
                vec![Traversal::new().values(key), null]
            }
            BindingKind::Map => vec![Traversal::new().select(key), null],
            BindingKind::Value => vec![
                Traversal::new().values(key),
                Traversal::new().select(key),
                null,
            ],
            other => {
                return Err(Error::TypeMismatch {
                    expected: "Node, Relationship or Map".to_string(),
                    found: format!("{:?} `{}`", other, base),
                });
            }
        };
        Ok(self.value(base)?.coalesce(lookup))
    }

    fn function(&self, name: &str, args: &[Expression], expression: &Expression) -> Result<Traversal> {
        let arg = |i: usize| {
            args.get(i).ok_or_else(|| {
                Error::InvalidQuery(format!("Missing argument to {}()", name))
            })
        };
        match name.to_ascii_lowercase().as_str() {
            "id" => Ok(self.value(arg(0)?)?.id()),
            "type" => Ok(self.value(arg(0)?)?.label()),
            "labels" => Ok(self.value(arg(0)?)?.label().fold()),
            "exists" => self.boolean(expression),
            "coalesce" => {
                let mut branches = Vec::with_capacity(args.len() + 1);
                for a in args {
                    branches.push(self.value(a)?.is(not_null()));
                }
                branches.push(constant(Value::Null));
                Ok(Traversal::new().coalesce(branches))
            }
            _ => Err(Error::unsupported(self.clause, format!("function `{}`", name))),
        }
    }

    /// Three-valued boolean: true, false or null
    fn boolean(&self, expression: &Expression) -> Result<Traversal> {
        let when_true = self.condition(expression)?;
        let when_false = self.negated_condition(expression)?;
        let t = || constant(Value::Boolean(true));
        let f = || constant(Value::Boolean(false));
        let null = || constant(Value::Null);

        Ok(match (when_true, when_false) {
            (Cond::Always, _) => t(),
            (Cond::Never, Cond::Always) => f(),
            (Cond::Never, Cond::Never) => null(),
            (Cond::Never, Cond::Test(ft)) => Traversal::new().choose(ft, f(), null()),
            (Cond::Test(tt), Cond::Always) => Traversal::new().choose(tt, t(), f()),
            (Cond::Test(tt), Cond::Never) => Traversal::new().choose(tt, t(), null()),
            (Cond::Test(tt), Cond::Test(ft)) => {
                Traversal::new().choose(tt, t(), Traversal::new().choose(ft, f(), null()))
            }
        })
    }

    // ========== Condition Position ==========

    /// Lower a condition that must evaluate to true
    pub fn condition(&self, expression: &Expression) -> Result<Cond> {
        self.lower_condition(expression, false)
    }

    /// Lower the negation of a condition (true only when it evaluates to false)
    pub fn negated_condition(&self, expression: &Expression) -> Result<Cond> {
        self.lower_condition(expression, true)
    }

    fn lower_condition(&self, expression: &Expression, negated: bool) -> Result<Cond> {
        match expression {
            Expression::Literal(Literal::Boolean(b)) => {
                Ok(if *b != negated { Cond::Always } else { Cond::Never })
            }
            Expression::Literal(Literal::Null) => Ok(Cond::Never),
            Expression::Literal(other) => Err(Error::TypeMismatch {
                expected: "Boolean".to_string(),
                found: other.to_value().type_name().to_string(),
            }),
            Expression::Parameter(name) => {
                if self.is_null_operand(expression) {
                    return Ok(Cond::Never);
                }
                Ok(Cond::Test(Traversal::new().where_(
                    Traversal::new()
                        .constant(Operand::Parameter(name.clone()))
                        .is(Predicate::Eq(Operand::Value(Value::Boolean(!negated)))),
                )))
            }
            Expression::Unary { op, operand } => match op {
                UnaryOp::Not => self.lower_condition(operand, !negated),
                UnaryOp::IsNull => self.null_check(operand, !negated),
                UnaryOp::IsNotNull => self.null_check(operand, negated),
                UnaryOp::Negate => self.truthy(expression, negated),
            },
            Expression::Binary { left, op, right } => match op {
                BinaryOp::And | BinaryOp::Or => {
                    // De Morgan: NOT (a AND b) = NOT a OR NOT b
                    let conjunction = (*op == BinaryOp::And) != negated;
                    if conjunction && !negated {
                        if let Some(range) = self.range(left, right)? {
                            return Ok(range);
                        }
                    }
                    let conds = vec![
                        self.lower_condition(left, negated)?,
                        self.lower_condition(right, negated)?,
                    ];
                    Ok(if conjunction {
                        Cond::all(conds)
                    } else {
                        Cond::any(conds)
                    })
                }
                BinaryOp::Xor => {
                    // a XOR b = (a AND NOT b) OR (NOT a AND b)
                    // NOT (a XOR b) = (a AND b) OR (NOT a AND NOT b)
                    let a = self.lower_condition(left, false)?;
                    let not_a = self.lower_condition(left, true)?;
                    let b = self.lower_condition(right, false)?;
                    let not_b = self.lower_condition(right, true)?;
                    Ok(if negated {
                        Cond::any(vec![Cond::all(vec![a, b]), Cond::all(vec![not_a, not_b])])
                    } else {
                        Cond::any(vec![Cond::all(vec![a, not_b]), Cond::all(vec![not_a, b])])
                    })
                }
                BinaryOp::StartsWith | BinaryOp::EndsWith | BinaryOp::Contains => {
                    self.string_match(left, *op, right, negated)
                }
                BinaryOp::In => self.membership(left, right, negated),
                _ => match Comparison::from_op(*op) {
                    Some(cmp) => {
                        let cmp = if negated { cmp.negate() } else { cmp };
                        self.comparison(left, cmp, right)
                    }
                    None => self.truthy(expression, negated),
                },
            },
            Expression::Function { name, args, .. } if name.eq_ignore_ascii_case("exists") => {
                match args.first() {
                    Some(arg) => self.null_check(arg, negated),
                    None => Err(Error::InvalidQuery("Missing argument to exists()".to_string())),
                }
            }
            other => self.truthy(other, negated),
        }
    }

    /// A boolean-valued runtime expression used as a condition
    fn truthy(&self, expression: &Expression, negated: bool) -> Result<Cond> {
        let value = self.value(expression)?;
        Ok(Cond::Test(Traversal::new().where_(
            value.is(Predicate::Eq(Operand::Value(Value::Boolean(!negated)))),
        )))
    }

    /// `x IS NULL` (when `want_null`) or `x IS NOT NULL`
    fn null_check(&self, operand: &Expression, want_null: bool) -> Result<Cond> {
        if let Some((name, key)) = self.element_property(operand) {
            let step = if want_null {
                Traversal::new().has_not(key)
            } else {
                Traversal::new().has(key)
            };
            return Ok(Cond::Test(self.on_element(name, step)));
        }

        if let Some(value) = constant_value(operand) {
            return Ok(if value.is_null() == want_null {
                Cond::Always
            } else {
                Cond::Never
            });
        }

        let predicate = if want_null { is_null() } else { not_null() };
        Ok(Cond::Test(
            Traversal::new().where_(self.value(operand)?.is(predicate)),
        ))
    }

    /// `left <cmp> right` with Cypher null semantics
    fn comparison(&self, left: &Expression, cmp: Comparison, right: &Expression) -> Result<Cond> {
        if self.is_null_operand(left) || self.is_null_operand(right) {
            return Ok(Cond::Never);
        }

        if let (Some(l), Some(r)) = (constant_value(left), constant_value(right)) {
            return Ok(match cmp.evaluate(&l, &r) {
                Some(true) => Cond::Always,
                _ => Cond::Never,
            });
        }

        // keep the runtime side on the left
        let (left, cmp, right) = match (self.operand(left), self.operand(right)) {
            (Some(_), None) => (right, cmp.mirror(), left),
            _ => (left, cmp, right),
        };

        match self.operand(right) {
            Some(operand) => Ok(Cond::Test(self.against_operand(left, cmp.predicate(operand))?)),
            None => Ok(Cond::Test(self.against_runtime(left, right, |label| {
                cmp.predicate(label)
            })?)),
        }
    }

    /// Filter `left` (runtime) with a predicate over a translation-time operand
    fn against_operand(&self, left: &Expression, predicate: Predicate) -> Result<Traversal> {
        if let Some((name, key)) = self.element_property(left) {
            return Ok(self.on_element(name, Traversal::new().has_predicate(key, predicate)));
        }
        Ok(Traversal::new().where_(self.value(left)?.is(not_null()).is(predicate)))
    }

    /// Filter comparing two runtime values: the right one is labelled first
    fn against_runtime<F>(&self, left: &Expression, right: &Expression, predicate: F) -> Result<Traversal>
    where
        F: FnOnce(Operand) -> Predicate,
    {
        let inner = self
            .value(right)?
            .is(not_null())
            .as_(COMPARE_LABEL)
            .then(self.value(left)?)
            .is(not_null())
            .where_predicate(predicate(Operand::Label(COMPARE_LABEL.to_string())));
        Ok(Traversal::new().where_(inner))
    }

    /// `lo <= x AND x < hi` fuses into `between(lo, hi)`
    fn range(&self, left: &Expression, right: &Expression) -> Result<Option<Cond>> {
        let (Some(lower), Some(upper)) = (self.bound(left, true), self.bound(right, false)) else {
            return Ok(None);
        };
        if lower.0 != upper.0 {
            return Ok(None);
        }
        let (subject, low, high) = (lower.0, lower.1, upper.1);
        if self.is_null_operand(low) || self.is_null_operand(high) {
            return Ok(Some(Cond::Never));
        }
        let (Some(low), Some(high)) = (self.operand(low), self.operand(high)) else {
            return Ok(None);
        };
        Ok(Some(Cond::Test(
            self.against_operand(subject, Predicate::Between(low, high))?,
        )))
    }

    /// Split `lo <= x` / `x >= lo` (lower) or `x < hi` / `hi > x` (upper)
    /// into (x, bound)
    fn bound<'e>(&self, expression: &'e Expression, lower: bool) -> Option<(&'e Expression, &'e Expression)> {
        let Expression::Binary { left, op, right } = expression else {
            return None;
        };
        let is_operand = |e: &Expression| self.operand(e).is_some();
        let runtime = |e: &Expression| self.operand(e).is_none();
        match (lower, op) {
            (true, BinaryOp::LessEquals) | (false, BinaryOp::GreaterThan)
                if is_operand(left) && runtime(right) =>
            {
                Some((right.as_ref(), left.as_ref()))
            }
            (true, BinaryOp::GreaterEquals) | (false, BinaryOp::LessThan)
                if runtime(left) && is_operand(right) =>
            {
                Some((left.as_ref(), right.as_ref()))
            }
            _ => None,
        }
    }

    /// STARTS WITH / ENDS WITH / CONTAINS
    fn string_match(
        &self,
        left: &Expression,
        op: BinaryOp,
        right: &Expression,
        negated: bool,
    ) -> Result<Cond> {
        if self.is_null_operand(left) || self.is_null_operand(right) {
            return Ok(Cond::Never);
        }
        for side in [left, right] {
            if let Some(value) = constant_value(side) {
                if !value.is_string() {
                    return Err(Error::TypeMismatch {
                        expected: "String".to_string(),
                        found: format!("{} in `{}`", value.type_name(), side),
                    });
                }
            }
        }

        let predicate = |operand: Operand| match op {
            BinaryOp::StartsWith => Predicate::StartsWith(operand),
            BinaryOp::EndsWith => Predicate::EndsWith(operand),
            _ => Predicate::Contains(operand),
        };

        let positive = match self.operand(right) {
            Some(operand) if self.operand(left).is_none() => {
                self.against_operand(left, predicate(operand))?
            }
            _ => self.against_runtime(left, right, predicate)?,
        };

        if !negated {
            return Ok(Cond::Test(positive));
        }
        Ok(Cond::all(vec![
            self.null_check(left, false)?,
            self.null_check(right, false)?,
            Cond::Test(Traversal::new().not(positive)),
        ]))
    }

    /// `x IN list`
    fn membership(&self, left: &Expression, right: &Expression, negated: bool) -> Result<Cond> {
        if self.is_null_operand(left) || self.is_null_operand(right) {
            return Ok(Cond::Never);
        }

        if let Some(list) = constant_value(right) {
            let items = match list {
                Value::List(items) => items,
                other => {
                    return Err(Error::TypeMismatch {
                        expected: "List".to_string(),
                        found: format!("{} in `{}`", other.type_name(), right),
                    });
                }
            };
            let has_null = items.iter().any(Value::is_null);
            if negated && has_null {
                // NOT (x IN [.., null]) is never true
                return Ok(Cond::Never);
            }
            let values: Vec<Value> = items.into_iter().filter(|v| !v.is_null()).collect();

            if let Some(l) = constant_value(left) {
                let found = values.iter().any(|v| l.cypher_eq(v) == Some(true));
                return Ok(if found != negated { Cond::Always } else { Cond::Never });
            }

            let operand = Operand::Value(Value::List(values));
            let predicate = if negated {
                Predicate::Without(operand)
            } else {
                Predicate::Within(operand)
            };
            return Ok(Cond::Test(self.against_operand(left, predicate)?));
        }

        if let Expression::Parameter(name) = right {
            let operand = Operand::Parameter(name.clone());
            let predicate = if negated {
                Predicate::Without(operand)
            } else {
                Predicate::Within(operand)
            };
            return Ok(Cond::Test(self.against_operand(left, predicate)?));
        }

        // runtime list: look the (labelled) element up in the unfolded list
        let lookup = self
            .value(left)?
            .is(not_null())
            .as_(COMPARE_LABEL)
            .then(self.value(right)?)
            .unfold()
            .where_predicate(Predicate::Eq(Operand::Label(COMPARE_LABEL.to_string())));
        let positive = Traversal::new().where_(lookup);
        if !negated {
            return Ok(Cond::Test(positive));
        }
        Ok(Cond::all(vec![
            self.null_check(left, false)?,
            Cond::Test(Traversal::new().not(positive)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Step;

    fn scope() -> Scope {
        let mut scope = Scope::default();
        scope.bind("n", BindingKind::Node);
        scope.bind("m", BindingKind::Map);
        scope.bind("x", BindingKind::Scalar);
        scope.bind("v", BindingKind::Value);
        scope
    }

    fn prop(var: &str, key: &str) -> Expression {
        Expression::property(Expression::variable(var), key)
    }

    #[test]
    fn test_constant_folding() {
        let expr = Expression::binary(Expression::literal(1), BinaryOp::Add, Expression::literal(2));
        assert_eq!(constant_value(&expr), Some(Value::Integer(3)));

        let expr = Expression::binary(
            Expression::literal("a"),
            BinaryOp::Add,
            Expression::literal("b"),
        );
        assert_eq!(constant_value(&expr), Some(Value::from("ab")));

        let expr = Expression::binary(prop("n", "age"), BinaryOp::Add, Expression::literal(1));
        assert_eq!(constant_value(&expr), None);

        let expr = Expression::binary(Expression::literal(1), BinaryOp::Divide, Expression::literal(0));
        assert_eq!(constant_value(&expr), None);
    }

    #[test]
    fn test_null_comparison_is_never() {
        let scope = scope();
        let params = ParameterMap::new();
        let lowering = ExpressionLowering::new(&scope, &params, None, "WHERE");

        let expr = Expression::binary(prop("n", "age"), BinaryOp::LessThan, Expression::literal(Literal::Null));
        assert_eq!(lowering.condition(&expr).unwrap(), Cond::Never);
        assert_eq!(lowering.negated_condition(&expr).unwrap(), Cond::Never);

        let filter = lowering.condition(&expr).unwrap().into_filter();
        assert_eq!(
            filter.steps(),
            &[Step::Not(Traversal::from_steps(vec![Step::Identity]))]
        );
    }

    #[test]
    fn test_null_parameter_folds_to_never() {
        let scope = scope();
        let mut params = ParameterMap::new();
        params.insert("p".to_string(), Value::Null);
        let lowering = ExpressionLowering::new(&scope, &params, None, "WHERE");

        let expr = Expression::binary(prop("n", "name"), BinaryOp::Equals, Expression::Parameter("p".to_string()));
        assert_eq!(lowering.condition(&expr).unwrap(), Cond::Never);
    }

    #[test]
    fn test_property_comparison_on_current_element_uses_has() {
        let scope = scope();
        let params = ParameterMap::new();
        let lowering = ExpressionLowering::new(&scope, &params, Some("n"), "WHERE");

        let expr = Expression::binary(prop("n", "name"), BinaryOp::Equals, Expression::Parameter("name".to_string()));
        let Cond::Test(t) = lowering.condition(&expr).unwrap() else {
            panic!("expected a test");
        };
        assert_eq!(
            t.steps(),
            &[Step::HasPredicate(
                "name".to_string(),
                Predicate::Eq(Operand::parameter("name"))
            )]
        );
    }

    #[test]
    fn test_negation_inverts_operator() {
        let scope = scope();
        let params = ParameterMap::new();
        let lowering = ExpressionLowering::new(&scope, &params, Some("n"), "WHERE");

        let expr = Expression::Unary {
            op: UnaryOp::Not,
            operand: Box::new(Expression::binary(prop("n", "age"), BinaryOp::LessThan, Expression::literal(30))),
        };
        let Cond::Test(t) = lowering.condition(&expr).unwrap() else {
            panic!("expected a test");
        };
        assert_eq!(
            t.steps(),
            &[Step::HasPredicate("age".to_string(), Predicate::Gte(Operand::value(30)))]
        );
    }

    #[test]
    fn test_literal_on_left_is_mirrored() {
        let scope = scope();
        let params = ParameterMap::new();
        let lowering = ExpressionLowering::new(&scope, &params, Some("n"), "WHERE");

        let expr = Expression::binary(Expression::literal(30), BinaryOp::LessThan, prop("n", "age"));
        let Cond::Test(t) = lowering.condition(&expr).unwrap() else {
            panic!("expected a test");
        };
        assert_eq!(
            t.steps(),
            &[Step::HasPredicate("age".to_string(), Predicate::Gt(Operand::value(30)))]
        );
    }

    #[test]
    fn test_range_fuses_to_between() {
        let scope = scope();
        let params = ParameterMap::new();
        let lowering = ExpressionLowering::new(&scope, &params, Some("n"), "WHERE");

        let expr = Expression::binary(
            Expression::binary(Expression::literal(27), BinaryOp::LessEquals, prop("n", "age")),
            BinaryOp::And,
            Expression::binary(prop("n", "age"), BinaryOp::LessThan, Expression::literal(32)),
        );
        let Cond::Test(t) = lowering.condition(&expr).unwrap() else {
            panic!("expected a test");
        };
        assert_eq!(
            t.steps(),
            &[Step::HasPredicate(
                "age".to_string(),
                Predicate::Between(Operand::value(27), Operand::value(32))
            )]
        );
    }

    #[test]
    fn test_or_and_de_morgan() {
        let scope = scope();
        let params = ParameterMap::new();
        let lowering = ExpressionLowering::new(&scope, &params, Some("n"), "WHERE");

        let a = Expression::binary(prop("n", "age"), BinaryOp::Equals, Expression::literal(1));
        let b = Expression::binary(prop("n", "age"), BinaryOp::Equals, Expression::literal(2));
        let or = Expression::binary(a, BinaryOp::Or, b);

        let Cond::Test(t) = lowering.condition(&or).unwrap() else {
            panic!("expected a test");
        };
        assert!(matches!(&t.steps()[0], Step::Or(branches) if branches.len() == 2));

        // NOT (a OR b) = NOT a AND NOT b
        let Cond::Test(t) = lowering.negated_condition(&or).unwrap() else {
            panic!("expected a test");
        };
        assert_eq!(t.len(), 2);
        assert_eq!(
            t.steps()[0],
            Step::HasPredicate("age".to_string(), Predicate::Neq(Operand::value(1)))
        );
    }

    #[test]
    fn test_string_predicate_type_mismatch() {
        let scope = scope();
        let params = ParameterMap::new();
        let lowering = ExpressionLowering::new(&scope, &params, None, "WHERE");

        let expr = Expression::binary(prop("n", "name"), BinaryOp::StartsWith, Expression::literal(1));
        assert!(matches!(lowering.condition(&expr), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_property_on_scalar_is_type_mismatch() {
        let scope = scope();
        let params = ParameterMap::new();
        let lowering = ExpressionLowering::new(&scope, &params, None, "RETURN");

        assert!(matches!(lowering.value(&prop("x", "k")), Err(Error::TypeMismatch { .. })));
        assert!(lowering.value(&prop("m", "k")).is_ok());
        assert!(lowering.value(&prop("v", "k")).is_ok());
    }

    #[test]
    fn test_exists_on_map_value() {
        let scope = scope();
        let params = ParameterMap::new();
        let lowering = ExpressionLowering::new(&scope, &params, None, "RETURN");

        let expr = Expression::Function {
            name: "exists".to_string(),
            args: vec![prop("m", "notName2")],
            distinct: false,
        };
        let t = lowering.value(&expr).unwrap();
        assert!(matches!(t.steps()[0], Step::Choose(..)));
    }

    #[test]
    fn test_in_list_with_null_negated_is_never() {
        let scope = scope();
        let params = ParameterMap::new();
        let lowering = ExpressionLowering::new(&scope, &params, Some("n"), "WHERE");

        let list = Expression::List(vec![Expression::literal(1), Expression::Literal(Literal::Null)]);
        let expr = Expression::binary(prop("n", "age"), BinaryOp::In, list);
        assert_eq!(lowering.negated_condition(&expr).unwrap(), Cond::Never);

        let Cond::Test(t) = lowering.condition(&expr).unwrap() else {
            panic!("expected a test");
        };
        assert_eq!(
            t.steps(),
            &[Step::HasPredicate(
                "age".to_string(),
                Predicate::Within(Operand::value(Value::List(vec![Value::Integer(1)])))
            )]
        );
    }

    #[test]
    fn test_cond_combinators() {
        let test = Cond::Test(Traversal::new().has("k"));
        assert_eq!(Cond::all(vec![Cond::Always, Cond::Always]), Cond::Always);
        assert_eq!(Cond::all(vec![test.clone(), Cond::Never]), Cond::Never);
        assert_eq!(Cond::any(vec![Cond::Never, test.clone()]), test);
        assert_eq!(Cond::any(vec![Cond::Never, Cond::Never]), Cond::Never);
    }
}
