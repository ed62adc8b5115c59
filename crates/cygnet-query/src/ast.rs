//! Abstract syntax tree for Cypher queries
//!
//! The tree is produced by [`crate::parser::parse`] and consumed read-only by
//! the IR builder. `Display` renders expressions back to Cypher text, which
//! is also how unaliased projection items get their column names.

use cygnet_core::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete query: one or more single queries joined by UNION
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Clauses of the first single query
    pub clauses: Vec<Clause>,
    /// Further single queries, each introduced by UNION or UNION ALL
    pub union: Vec<UnionPart>,
}

/// A single query following a UNION keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionPart {
    /// True for UNION ALL
    pub all: bool,
    pub clauses: Vec<Clause>,
}

impl Query {
    /// A query without UNION
    pub fn single(clauses: Vec<Clause>) -> Self {
        Self {
            clauses,
            union: Vec::new(),
        }
    }
}

/// A clause in a Cypher query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    /// MATCH clause with its optional WHERE
    Match(MatchClause),
    /// OPTIONAL MATCH clause
    OptionalMatch(MatchClause),
    /// WITH clause
    With(ProjectionClause),
    /// RETURN clause
    Return(ProjectionClause),
    /// UNWIND clause
    Unwind(UnwindClause),
    /// CREATE clause
    Create(CreateClause),
    /// DELETE clause
    Delete(DeleteClause),
    /// SET clause
    Set(SetClause),
}

impl Clause {
    /// Keyword naming this clause in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Clause::Match(_) => "MATCH",
            Clause::OptionalMatch(_) => "OPTIONAL MATCH",
            Clause::With(_) => "WITH",
            Clause::Return(_) => "RETURN",
            Clause::Unwind(_) => "UNWIND",
            Clause::Create(_) => "CREATE",
            Clause::Delete(_) => "DELETE",
            Clause::Set(_) => "SET",
        }
    }
}

/// MATCH clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchClause {
    pub patterns: Vec<Pattern>,
    pub where_clause: Option<Expression>,
}

/// A pattern (node-relationship chain)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Path variable, as in `p = (a)-->(b)`
    pub variable: Option<String>,
    pub elements: Vec<PatternElement>,
}

/// Element in a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternElement {
    Node(NodePattern),
    Relationship(RelationshipPattern),
}

/// Node pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Option<MapExpression>,
}

/// Relationship pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipPattern {
    pub variable: Option<String>,
    pub rel_types: Vec<String>,
    pub direction: RelationshipDirection,
    pub properties: Option<MapExpression>,
    pub length: Option<RelationshipLength>,
}

/// Relationship direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipDirection {
    Outgoing,
    Incoming,
    Both,
}

/// Variable-length relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipLength {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

/// WITH or RETURN body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionClause {
    pub distinct: bool,
    pub items: Vec<ReturnItem>,
    pub order_by: Vec<OrderItem>,
    pub skip: Option<Expression>,
    pub limit: Option<Expression>,
    /// Only legal on WITH
    pub where_clause: Option<Expression>,
}

impl ProjectionClause {
    /// A plain projection of the given items
    pub fn of(items: Vec<ReturnItem>) -> Self {
        Self {
            distinct: false,
            items,
            order_by: Vec::new(),
            skip: None,
            limit: None,
            where_clause: None,
        }
    }
}

/// Item of a WITH/RETURN projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub expression: Expression,
    pub alias: Option<String>,
}

impl ReturnItem {
    /// The column name this item produces
    pub fn output_name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.expression.to_string(),
        }
    }
}

/// UNWIND clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnwindClause {
    pub expression: Expression,
    pub variable: String,
}

/// CREATE clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateClause {
    pub patterns: Vec<Pattern>,
}

/// DELETE clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteClause {
    pub detach: bool,
    pub expressions: Vec<Expression>,
}

/// SET clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetClause {
    pub items: Vec<SetItem>,
}

/// Item in SET clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SetItem {
    Property {
        entity: String,
        property: String,
        value: Expression,
    },
    Labels {
        variable: String,
        labels: Vec<String>,
    },
    AllProperties {
        variable: String,
        value: Expression,
    },
}

/// Item in ORDER BY
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub expression: Expression,
    pub ascending: bool,
}

/// Expression in Cypher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Variable reference
    Variable(String),
    /// Property access (entity.property)
    Property(Box<Expression>, String),
    /// Parameter ($name)
    Parameter(String),
    /// Binary operation
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
    /// Unary operation
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    /// Function call
    Function {
        name: String,
        args: Vec<Expression>,
        distinct: bool,
    },
    /// List expression [a, b, c]
    List(Vec<Expression>),
    /// Map expression {a: 1, b: 2}
    Map(MapExpression),
    /// Case expression
    Case {
        operand: Option<Box<Expression>>,
        when_clauses: Vec<(Expression, Expression)>,
        else_clause: Option<Box<Expression>>,
    },
    /// Pattern expression, as in `WHERE (a)-->(b)`
    Pattern(Pattern),
    /// List comprehension [x IN list WHERE ... | expr]
    ListComprehension {
        variable: String,
        list: Box<Expression>,
        filter: Option<Box<Expression>>,
        projection: Option<Box<Expression>>,
    },
    /// Star (*) in projections and `count(*)`
    Star,
}

impl Expression {
    pub fn variable<S: Into<String>>(name: S) -> Self {
        Expression::Variable(name.into())
    }

    pub fn property<S: Into<String>>(base: Expression, key: S) -> Self {
        Expression::Property(Box::new(base), key.into())
    }

    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn literal<V: Into<Literal>>(value: V) -> Self {
        Expression::Literal(value.into())
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// The runtime value of this literal
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Integer(i)
    }
}

impl From<i32> for Literal {
    fn from(i: i32) -> Self {
        Literal::Integer(i as i64)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Boolean(b)
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Comparison
    Equals,
    NotEquals,
    LessThan,
    LessEquals,
    GreaterThan,
    GreaterEquals,
    // Logical
    And,
    Or,
    Xor,
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    // String
    Contains,
    StartsWith,
    EndsWith,
    // Other
    In,
}

impl BinaryOp {
    /// True for `=`, `<>`, `<`, `<=`, `>`, `>=`
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equals
                | BinaryOp::NotEquals
                | BinaryOp::LessThan
                | BinaryOp::LessEquals
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterEquals
        )
    }

    /// True for `+ - * / % ^`
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo
                | BinaryOp::Power
        )
    }

    /// Cypher spelling of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Equals => "=",
            BinaryOp::NotEquals => "<>",
            BinaryOp::LessThan => "<",
            BinaryOp::LessEquals => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterEquals => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "^",
            BinaryOp::Contains => "CONTAINS",
            BinaryOp::StartsWith => "STARTS WITH",
            BinaryOp::EndsWith => "ENDS WITH",
            BinaryOp::In => "IN",
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    IsNull,
    IsNotNull,
}

/// Map expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapExpression {
    pub entries: Vec<(String, Expression)>,
}

fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    if plain {
        write!(f, "{}", name)
    } else {
        write!(f, "`{}`", name)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl fmt::Display for MapExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write_name(f, key)?;
            write!(f, ": {}", value)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for NodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        if let Some(variable) = &self.variable {
            write_name(f, variable)?;
        }
        for label in &self.labels {
            write!(f, ":")?;
            write_name(f, label)?;
        }
        if let Some(properties) = &self.properties {
            write!(f, " {}", properties)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for RelationshipPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (left, right) = match self.direction {
            RelationshipDirection::Outgoing => ("-", "->"),
            RelationshipDirection::Incoming => ("<-", "-"),
            RelationshipDirection::Both => ("-", "-"),
        };
        write!(f, "{}[", left)?;
        if let Some(variable) = &self.variable {
            write_name(f, variable)?;
        }
        for (i, rel_type) in self.rel_types.iter().enumerate() {
            write!(f, "{}", if i == 0 { ":" } else { "|" })?;
            write_name(f, rel_type)?;
        }
        if let Some(length) = &self.length {
            write!(f, "*")?;
            if let Some(min) = length.min {
                write!(f, "{}", min)?;
            }
            if length.max != length.min {
                write!(f, "..")?;
                if let Some(max) = length.max {
                    write!(f, "{}", max)?;
                }
            }
        }
        if let Some(properties) = &self.properties {
            write!(f, " {}", properties)?;
        }
        write!(f, "]{}", right)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(variable) = &self.variable {
            write_name(f, variable)?;
            write!(f, " = ")?;
        }
        for element in &self.elements {
            match element {
                PatternElement::Node(node) => write!(f, "{}", node)?,
                PatternElement::Relationship(rel) => write!(f, "{}", rel)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(literal) => write!(f, "{}", literal),
            Expression::Variable(name) => write_name(f, name),
            Expression::Property(base, key) => {
                write!(f, "{}.", base)?;
                write_name(f, key)
            }
            Expression::Parameter(name) => {
                write!(f, "$")?;
                write_name(f, name)
            }
            Expression::Binary { left, op, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Expression::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "NOT {}", operand),
                UnaryOp::Negate => write!(f, "-{}", operand),
                UnaryOp::IsNull => write!(f, "{} IS NULL", operand),
                UnaryOp::IsNotNull => write!(f, "{} IS NOT NULL", operand),
            },
            Expression::Function {
                name,
                args,
                distinct,
            } => {
                write!(f, "{}(", name)?;
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                write_list(f, args)?;
                write!(f, ")")
            }
            Expression::List(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expression::Map(map) => write!(f, "{}", map),
            Expression::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                write!(f, "CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {}", operand)?;
                }
                for (when, then) in when_clauses {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(other) = else_clause {
                    write!(f, " ELSE {}", other)?;
                }
                write!(f, " END")
            }
            Expression::Pattern(pattern) => write!(f, "{}", pattern),
            Expression::ListComprehension {
                variable,
                list,
                filter,
                projection,
            } => {
                write!(f, "[")?;
                write_name(f, variable)?;
                write!(f, " IN {}", list)?;
                if let Some(filter) = filter {
                    write!(f, " WHERE {}", filter)?;
                }
                if let Some(projection) = projection {
                    write!(f, " | {}", projection)?;
                }
                write!(f, "]")
            }
            Expression::Star => write!(f, "*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name_uses_alias_or_text() {
        let item = ReturnItem {
            expression: Expression::property(Expression::variable("p"), "name"),
            alias: None,
        };
        assert_eq!(item.output_name(), "p.name");

        let item = ReturnItem {
            expression: Expression::literal(1),
            alias: Some("one".to_string()),
        };
        assert_eq!(item.output_name(), "one");
    }

    #[test]
    fn test_expression_display() {
        let expr = Expression::Function {
            name: "count".to_string(),
            args: vec![Expression::Star],
            distinct: false,
        };
        assert_eq!(expr.to_string(), "count(*)");

        let expr = Expression::binary(
            Expression::property(Expression::variable("n"), "name"),
            BinaryOp::StartsWith,
            Expression::Parameter("prefix".to_string()),
        );
        assert_eq!(expr.to_string(), "n.name STARTS WITH $prefix");

        let expr = Expression::literal(1);
        assert_eq!(expr.to_string(), "1");
    }

    #[test]
    fn test_pattern_display() {
        let pattern = Pattern {
            variable: None,
            elements: vec![
                PatternElement::Node(NodePattern {
                    variable: Some("a".to_string()),
                    labels: vec!["person".to_string()],
                    properties: None,
                }),
                PatternElement::Relationship(RelationshipPattern {
                    variable: None,
                    rel_types: vec!["knows".to_string()],
                    direction: RelationshipDirection::Outgoing,
                    properties: None,
                    length: None,
                }),
                PatternElement::Node(NodePattern {
                    variable: Some("b".to_string()),
                    labels: Vec::new(),
                    properties: None,
                }),
            ],
        };
        assert_eq!(pattern.to_string(), "(a:person)-[:knows]->(b)");
    }
}
