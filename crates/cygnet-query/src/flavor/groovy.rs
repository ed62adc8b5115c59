//! Groovy script rendering
//!
//! Renders traversals as the Gremlin-Groovy text a stock Gremlin server
//! evaluates: `g.V().hasLabel('person').as('n')...`. Parameters become bare
//! identifiers bound by the server, so they must not collide with Groovy
//! keywords or the names the script itself uses.

use super::{Flavor, FlavorEmitter, TraversalProgram};
use crate::lower::LoweredQuery;
use crate::predicate::{GremlinPredicates, Operand};
use crate::step::{Bound, Column, GremlinSteps, Order, Traversal};
use cygnet_core::{Error, IdentifierKind, ParameterMap, Result, Value};

/// Identifiers a parameter or projection may not use in a Groovy script
const RESERVED: &[&str] = &[
    "abstract", "as", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
    "const", "continue", "def", "default", "do", "double", "else", "enum", "extends", "false",
    "final", "finally", "float", "for", "goto", "if", "implements", "import", "in",
    "instanceof", "int", "interface", "long", "native", "new", "null", "package", "private",
    "protected", "public", "return", "short", "static", "strictfp", "super", "switch",
    "synchronized", "this", "threadsafe", "throw", "throws", "trait", "transient", "true",
    "try", "var", "void", "volatile", "while", "g", "P", "__", "Column", "Order",
    "CustomPredicate",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Quote a string as a single-quoted Groovy literal
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Render a value as a Groovy literal
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) if i32::try_from(*i).is_ok() => i.to_string(),
        Value::Integer(i) => format!("{}L", i),
        Value::Float(f) if f.is_nan() => "Double.NaN".to_string(),
        Value::Float(f) if f.is_infinite() && *f > 0.0 => "Double.POSITIVE_INFINITY".to_string(),
        Value::Float(f) if f.is_infinite() => "Double.NEGATIVE_INFINITY".to_string(),
        Value::Float(f) => format!("{:?}d", f),
        Value::String(s) => quote(s),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(map) if map.is_empty() => "[:]".to_string(),
        Value::Map(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), literal(v)))
                .collect();
            format!("[{}]", entries.join(", "))
        }
    }
}

fn operand(operand: &Operand) -> String {
    match operand {
        Operand::Value(value) => literal(value),
        Operand::Parameter(name) => name.clone(),
        Operand::Label(label) => quote(label),
    }
}

fn bound(bound: &Bound) -> String {
    match bound {
        Bound::Literal(n) => n.to_string(),
        Bound::Parameter(name) => name.clone(),
    }
}

fn strings(items: &[String]) -> String {
    items.iter().map(|s| quote(s)).collect::<Vec<_>>().join(", ")
}

/// Predicate factory producing Groovy `P` expressions
#[derive(Debug, Clone, Copy, Default)]
pub struct GroovyPredicates;

impl GroovyPredicates {
    fn call(name: &str, value: Operand) -> String {
        format!("{}({})", name, operand(&value))
    }
}

impl GremlinPredicates for GroovyPredicates {
    type Output = String;

    fn is_eq(&self, value: Operand) -> String {
        Self::call("P.eq", value)
    }

    fn neq(&self, value: Operand) -> String {
        Self::call("P.neq", value)
    }

    fn gt(&self, value: Operand) -> String {
        Self::call("P.gt", value)
    }

    fn gte(&self, value: Operand) -> String {
        Self::call("P.gte", value)
    }

    fn lt(&self, value: Operand) -> String {
        Self::call("P.lt", value)
    }

    fn lte(&self, value: Operand) -> String {
        Self::call("P.lte", value)
    }

    fn between(&self, low: Operand, high: Operand) -> String {
        format!("P.between({}, {})", operand(&low), operand(&high))
    }

    fn within(&self, values: Operand) -> String {
        Self::call("P.within", values)
    }

    fn without(&self, values: Operand) -> String {
        Self::call("P.without", values)
    }

    fn starts_with(&self, prefix: Operand) -> String {
        Self::call("CustomPredicate.cypherStartsWith", prefix)
    }

    fn ends_with(&self, suffix: Operand) -> String {
        Self::call("CustomPredicate.cypherEndsWith", suffix)
    }

    fn contains(&self, infix: Operand) -> String {
        Self::call("CustomPredicate.cypherContains", infix)
    }
}

/// Step implementation that accumulates Groovy text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroovySteps {
    text: String,
    /// Literal text when the fragment is exactly `__.constant(x)`
    constant: Option<String>,
}

impl GroovySteps {
    /// A traversal starting from the graph source `g`
    pub fn new() -> Self {
        Self {
            text: "g".to_string(),
            constant: None,
        }
    }

    /// An anonymous traversal `__`
    pub fn anonymous_traversal() -> Self {
        Self {
            text: "__".to_string(),
            constant: None,
        }
    }

    pub fn into_text(self) -> String {
        self.text
    }

    fn is_empty_anonymous(&self) -> bool {
        self.text == "__"
    }

    fn call(mut self, name: &str, args: &str) -> Self {
        self.constant = None;
        self.text.push_str(&format!(".{}({})", name, args));
        self
    }

    fn nested(fragment: Self) -> String {
        if fragment.is_empty_anonymous() {
            "__.identity()".to_string()
        } else {
            fragment.text
        }
    }

    fn nested_all(fragments: Vec<Self>) -> String {
        fragments
            .into_iter()
            .map(Self::nested)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for GroovySteps {
    fn default() -> Self {
        Self::new()
    }
}

impl GremlinSteps for GroovySteps {
    type Predicates = GroovyPredicates;

    fn predicates(&self) -> GroovyPredicates {
        GroovyPredicates
    }

    fn anonymous(&self) -> Self {
        Self::anonymous_traversal()
    }

    fn v(self) -> Self {
        self.call("V", "")
    }

    fn inject(self, values: Vec<Value>) -> Self {
        let args = values.iter().map(literal).collect::<Vec<_>>().join(", ");
        self.call("inject", &args)
    }

    fn has_label(self, labels: Vec<String>) -> Self {
        self.call("hasLabel", &strings(&labels))
    }

    fn has(self, key: &str) -> Self {
        self.call("has", &quote(key))
    }

    fn has_predicate(self, key: &str, predicate: String) -> Self {
        self.call("has", &format!("{}, {}", quote(key), predicate))
    }

    fn has_not(self, key: &str) -> Self {
        self.call("hasNot", &quote(key))
    }

    fn is(self, predicate: String) -> Self {
        self.call("is", &predicate)
    }

    fn where_(self, traversal: Self) -> Self {
        self.call("where", &Self::nested(traversal))
    }

    fn where_predicate(self, predicate: String) -> Self {
        self.call("where", &predicate)
    }

    fn not(self, traversal: Self) -> Self {
        self.call("not", &Self::nested(traversal))
    }

    fn and(self, traversals: Vec<Self>) -> Self {
        self.call("and", &Self::nested_all(traversals))
    }

    fn or(self, traversals: Vec<Self>) -> Self {
        self.call("or", &Self::nested_all(traversals))
    }

    fn out_e(self, labels: Vec<String>) -> Self {
        self.call("outE", &strings(&labels))
    }

    fn in_e(self, labels: Vec<String>) -> Self {
        self.call("inE", &strings(&labels))
    }

    fn both_e(self, labels: Vec<String>) -> Self {
        self.call("bothE", &strings(&labels))
    }

    fn in_v(self) -> Self {
        self.call("inV", "")
    }

    fn out_v(self) -> Self {
        self.call("outV", "")
    }

    fn other_v(self) -> Self {
        self.call("otherV", "")
    }

    fn as_(self, label: &str) -> Self {
        self.call("as", &quote(label))
    }

    fn select(self, label: &str) -> Self {
        self.call("select", &quote(label))
    }

    fn select_column(self, column: Column) -> Self {
        let column = match column {
            Column::Keys => "Column.keys",
            Column::Values => "Column.values",
        };
        self.call("select", column)
    }

    fn values(self, key: &str) -> Self {
        self.call("values", &quote(key))
    }

    fn properties(self, key: &str) -> Self {
        self.call("properties", &quote(key))
    }

    fn value(self) -> Self {
        self.call("value", "")
    }

    fn id(self) -> Self {
        self.call("id", "")
    }

    fn label(self) -> Self {
        self.call("label", "")
    }

    fn constant(self, value: Operand) -> Self {
        let rendered = operand(&value);
        let only = self.is_empty_anonymous();
        let mut next = self.call("constant", &rendered);
        if only {
            next.constant = Some(rendered);
        }
        next
    }

    fn project(self, keys: Vec<String>) -> Self {
        self.call("project", &strings(&keys))
    }

    fn by(self, traversal: Self) -> Self {
        self.call("by", &Self::nested(traversal))
    }

    fn by_order(self, traversal: Self, order: Order) -> Self {
        let order = match order {
            Order::Asc => "Order.asc",
            Order::Desc => "Order.desc",
        };
        self.call("by", &format!("{}, {}", Self::nested(traversal), order))
    }

    fn unfold(self) -> Self {
        self.call("unfold", "")
    }

    fn fold(self) -> Self {
        self.call("fold", "")
    }

    fn count(self) -> Self {
        self.call("count", "")
    }

    fn sum(self) -> Self {
        self.call("sum", "")
    }

    fn min(self) -> Self {
        self.call("min", "")
    }

    fn max(self) -> Self {
        self.call("max", "")
    }

    fn mean(self) -> Self {
        self.call("mean", "")
    }

    fn dedup(self) -> Self {
        self.call("dedup", "")
    }

    fn group(self) -> Self {
        self.call("group", "")
    }

    fn order(self) -> Self {
        self.call("order", "")
    }

    fn skip(self, n: Bound) -> Self {
        self.call("skip", &bound(&n))
    }

    fn limit(self, n: Bound) -> Self {
        self.call("limit", &bound(&n))
    }

    fn range(self, low: Bound, high: Bound) -> Self {
        self.call("range", &format!("{}, {}", bound(&low), bound(&high)))
    }

    fn union(self, traversals: Vec<Self>) -> Self {
        self.call("union", &Self::nested_all(traversals))
    }

    fn choose(self, condition: Self, then: Self, otherwise: Self) -> Self {
        let args = Self::nested_all(vec![condition, then, otherwise]);
        self.call("choose", &args)
    }

    fn coalesce(self, traversals: Vec<Self>) -> Self {
        self.call("coalesce", &Self::nested_all(traversals))
    }

    fn flat_map(self, traversal: Self) -> Self {
        self.call("flatMap", &Self::nested(traversal))
    }

    fn identity(self) -> Self {
        self.call("identity", "")
    }

    fn barrier(self) -> Self {
        self.call("barrier", "")
    }

    fn add_v(self, label: Option<String>) -> Self {
        match label {
            Some(label) => self.call("addV", &quote(&label)),
            None => self.call("addV", ""),
        }
    }

    fn add_e(self, label: &str) -> Self {
        self.call("addE", &quote(label))
    }

    fn from(self, label: &str) -> Self {
        self.call("from", &quote(label))
    }

    fn to(self, label: &str) -> Self {
        self.call("to", &quote(label))
    }

    fn property(self, key: &str, value: Self) -> Self {
        let value = match value.constant.clone() {
            Some(literal) => literal,
            None => Self::nested(value),
        };
        self.call("property", &format!("{}, {}", quote(key), value))
    }
}

/// Render a neutral traversal as Groovy text
pub fn render(traversal: &Traversal) -> String {
    traversal.replay(GroovySteps::new()).into_text()
}

/// Reject parameters and projected names that collide with reserved identifiers
pub fn check_identifiers(
    query: &LoweredQuery,
    parameters: &ParameterMap,
    flavor: Flavor,
) -> Result<()> {
    let reserved = |kind: IdentifierKind, name: &str| Error::ReservedIdentifier {
        kind,
        name: name.to_string(),
        flavor: flavor.name().to_string(),
    };

    let referenced = query.traversal.parameter_names();
    for name in referenced.iter().map(String::as_str).chain(parameters.keys().map(String::as_str)) {
        if is_reserved(name) {
            return Err(reserved(IdentifierKind::Parameter, name));
        }
    }
    for name in &query.projected {
        if is_reserved(name) {
            return Err(reserved(IdentifierKind::Projection, name));
        }
    }
    Ok(())
}

/// Emitter for the default `gremlin` flavor
#[derive(Debug, Clone, Copy, Default)]
pub struct GroovyEmitter;

impl FlavorEmitter for GroovyEmitter {
    fn flavor(&self) -> Flavor {
        Flavor::Gremlin
    }

    fn emit(&self, query: LoweredQuery, parameters: &ParameterMap) -> Result<TraversalProgram> {
        check_identifiers(&query, parameters, self.flavor())?;
        Ok(TraversalProgram::Script {
            text: render(&query.traversal),
            parameters: parameters.clone(),
            columns: query.columns,
        })
    }
}
