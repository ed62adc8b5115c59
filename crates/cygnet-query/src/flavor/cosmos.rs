//! Cosmos DB flavor
//!
//! Cosmos DB accepts Gremlin text but only a subset of the step library.
//! The neutral traversal is rewritten into that subset before rendering;
//! constructs with no equivalent are rejected rather than approximated.
//! Each step variant is matched explicitly, and map values are refused
//! wherever they occur: in constants, injected values and predicate operands,
//! including maps nested inside lists.

use super::groovy::{check_identifiers, render};
use super::{Flavor, FlavorEmitter, TraversalProgram};
use crate::lower::LoweredQuery;
use crate::predicate::{Operand, Predicate};
use crate::step::{Bound, Step, Traversal};
use cygnet_core::{Error, ParameterMap, Result, Value};
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
pub struct CosmosEmitter;

fn unsupported(construct: impl Into<String>) -> Error {
    let construct = construct.into();
    warn!("Rejecting `{}` for the cosmosdb flavor", construct);
    Error::UnsupportedInFlavor {
        construct,
        flavor: Flavor::CosmosDb.name().to_string(),
    }
}

fn contains_map(value: &Value) -> bool {
    match value {
        Value::Map(_) => true,
        Value::List(items) => items.iter().any(contains_map),
        _ => false,
    }
}

fn check_operand(operand: &Operand) -> Result<()> {
    match operand {
        Operand::Value(v) if contains_map(v) => Err(unsupported("map literal")),
        _ => Ok(()),
    }
}

fn check_predicate(predicate: &Predicate) -> Result<()> {
    match predicate {
        Predicate::StartsWith(_) => Err(unsupported("STARTS WITH")),
        Predicate::EndsWith(_) => Err(unsupported("ENDS WITH")),
        Predicate::Contains(_) => Err(unsupported("CONTAINS")),
        _ => predicate.operands().into_iter().try_for_each(check_operand),
    }
}

/// Group key modulators must project or select; values must fold
fn check_group_modulator(position: usize, traversal: &Traversal) -> Result<()> {
    let ok = match position {
        0 => matches!(
            traversal.steps().first(),
            Some(Step::Project(_)) | Some(Step::Select(_))
        ),
        _ => traversal.steps() == [Step::Fold],
    };
    if ok {
        Ok(())
    } else {
        Err(unsupported("group() modulator"))
    }
}

/// Rewrite a traversal into the Cosmos DB subset
pub fn rewrite(traversal: &Traversal) -> Result<Traversal> {
    let mut out = Vec::with_capacity(traversal.len());
    // modulators seen since the last group(), if any
    let mut group_by: Option<usize> = None;

    for step in traversal.steps() {
        if let Some(predicate) = step.predicate() {
            check_predicate(predicate)?;
        }

        match step {
            Step::Group => group_by = Some(0),
            Step::By(t) => {
                if let Some(position) = group_by {
                    check_group_modulator(position, t)?;
                    group_by = if position == 0 { Some(1) } else { None };
                }
            }
            _ => group_by = None,
        }

        // every variant is listed so a new step needs an explicit decision here
        match step {
            Step::Values(key) => {
                out.push(Step::Properties(key.clone()));
                out.push(Step::Value);
            }
            Step::Skip(Bound::Literal(n)) => {
                out.push(Step::Range(Bound::Literal(*n), Bound::Literal(-1)));
            }
            Step::Skip(Bound::Parameter(_)) => return Err(unsupported("SKIP with a parameter")),
            Step::Constant(operand) => {
                check_operand(operand)?;
                out.push(step.clone());
            }
            Step::Inject(values) => {
                if values.iter().any(contains_map) {
                    return Err(unsupported("map literal"));
                }
                out.push(step.clone());
            }
            Step::Where(t) => out.push(Step::Where(rewrite(t)?)),
            Step::Not(t) => out.push(Step::Not(rewrite(t)?)),
            Step::And(ts) => out.push(Step::And(rewrite_all(ts)?)),
            Step::Or(ts) => out.push(Step::Or(rewrite_all(ts)?)),
            Step::By(t) => out.push(Step::By(rewrite(t)?)),
            Step::ByOrder(t, order) => out.push(Step::ByOrder(rewrite(t)?, *order)),
            Step::Union(ts) => out.push(Step::Union(rewrite_all(ts)?)),
            Step::Coalesce(ts) => out.push(Step::Coalesce(rewrite_all(ts)?)),
            Step::Choose(c, t, f) => out.push(Step::Choose(rewrite(c)?, rewrite(t)?, rewrite(f)?)),
            Step::FlatMap(t) => out.push(Step::FlatMap(rewrite(t)?)),
            Step::Property(key, t) => out.push(Step::Property(key.clone(), rewrite(t)?)),
            Step::V
            | Step::HasLabel(_)
            | Step::Has(_)
            | Step::HasPredicate(..)
            | Step::HasNot(_)
            | Step::Is(_)
            | Step::WherePredicate(_)
            | Step::OutE(_)
            | Step::InE(_)
            | Step::BothE(_)
            | Step::InV
            | Step::OutV
            | Step::OtherV
            | Step::As(_)
            | Step::Select(_)
            | Step::SelectColumn(_)
            | Step::Properties(_)
            | Step::Value
            | Step::Id
            | Step::Label
            | Step::Project(_)
            | Step::Unfold
            | Step::Fold
            | Step::Count
            | Step::Sum
            | Step::Min
            | Step::Max
            | Step::Mean
            | Step::Dedup
            | Step::Group
            | Step::OrderBy
            | Step::Limit(_)
            | Step::Range(..)
            | Step::Identity
            | Step::Barrier
            | Step::AddV(_)
            | Step::AddE(_)
            | Step::From(_)
            | Step::To(_) => out.push(step.clone()),
        }
    }
    Ok(Traversal::from_steps(out))
}

fn rewrite_all(traversals: &[Traversal]) -> Result<Vec<Traversal>> {
    traversals.iter().map(rewrite).collect()
}

impl FlavorEmitter for CosmosEmitter {
    fn flavor(&self) -> Flavor {
        Flavor::CosmosDb
    }

    fn emit(&self, query: LoweredQuery, parameters: &ParameterMap) -> Result<TraversalProgram> {
        check_identifiers(&query, parameters, self.flavor())?;
        let traversal = rewrite(&query.traversal)?;
        Ok(TraversalProgram::Compatible {
            text: render(&traversal),
            traversal,
            parameters: parameters.clone(),
            columns: query.columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::GremlinSteps;

    #[test]
    fn test_values_become_properties_value() {
        let t = Traversal::new().v().values("name");
        let rewritten = rewrite(&t).unwrap();
        assert_eq!(
            rewritten.steps(),
            &[Step::V, Step::Properties("name".to_string()), Step::Value]
        );
    }

    #[test]
    fn test_skip_becomes_range() {
        let t = Traversal::new().v().skip(Bound::Literal(2));
        assert_eq!(render(&rewrite(&t).unwrap()), "g.V().range(2, -1)");
    }

    #[test]
    fn test_nested_rewrite() {
        let t = Traversal::new().v().where_(Traversal::new().values("age"));
        assert_eq!(
            render(&rewrite(&t).unwrap()),
            "g.V().where(__.properties('age').value())"
        );
    }

    #[test]
    fn test_string_predicates_rejected() {
        let t = Traversal::new().v().has_predicate("name", Predicate::StartsWith(Operand::value("m")));
        let err = rewrite(&t).unwrap_err();
        assert!(err.is_flavor_error());
    }

    #[test]
    fn test_parameter_skip_rejected() {
        let t = Traversal::new().v().skip(Bound::Parameter("n".to_string()));
        assert!(matches!(rewrite(&t), Err(Error::UnsupportedInFlavor { .. })));
    }

    #[test]
    fn test_group_modulators() {
        let ok = Traversal::new()
            .group()
            .by(Traversal::new().project(vec!["k".to_string()]).by(Traversal::new().select("k")))
            .by(Traversal::new().fold());
        assert!(rewrite(&ok).is_ok());

        let bad = Traversal::new().group().by(Traversal::new().values("k")).by(Traversal::new().count());
        assert!(rewrite(&bad).is_err());
    }

    fn row(key: &str, value: i64) -> Value {
        let mut map = std::collections::BTreeMap::new();
        map.insert(key.to_string(), Value::Integer(value));
        Value::Map(map)
    }

    #[test]
    fn test_map_inside_list_constant_rejected() {
        let items = Traversal::new()
            .constant(Operand::value(Value::List(vec![row("a", 1)])))
            .unfold();
        let t = Traversal::new().inject(vec![Value::Null]).flat_map(items);
        let err = rewrite(&t).unwrap_err();
        assert!(err.is_flavor_error());
    }

    #[test]
    fn test_map_inject_rejected() {
        let t = Traversal::new().inject(vec![Value::List(vec![row("a", 1)])]);
        assert!(matches!(rewrite(&t), Err(Error::UnsupportedInFlavor { .. })));
    }

    #[test]
    fn test_map_in_membership_operand_rejected() {
        let within = Predicate::Within(Operand::value(Value::List(vec![row("a", 1)])));
        let t = Traversal::new().v().values("name").is(within);
        assert!(rewrite(&t).is_err());

        let scalars = Predicate::Within(Operand::value(Value::List(vec![Value::Integer(1)])));
        let t = Traversal::new().v().values("age").is(scalars);
        assert!(rewrite(&t).is_ok());
    }
}
