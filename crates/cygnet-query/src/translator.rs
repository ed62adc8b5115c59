//! Translator facade
//!
//! One call runs the whole pipeline: parse, build the IR, lower to a
//! neutral traversal, emit in the configured flavor. The translator holds
//! no mutable state and can be shared across threads.

use crate::ast::Query;
use crate::builder::build;
use crate::flavor::{Flavor, TraversalProgram};
use crate::ir::QueryIr;
use crate::lower::lower_neutral;
use crate::parser::parse;
use cygnet_core::{ParameterMap, Result};
use tracing::debug;

/// Cypher to Gremlin translator for one flavor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Translator {
    flavor: Flavor,
}

impl Translator {
    pub fn new(flavor: Flavor) -> Self {
        Self { flavor }
    }

    /// Translator for a flavor name such as `"cosmosdb"` (case-insensitive)
    pub fn for_flavor_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Parse only
    pub fn parse(&self, query: &str) -> Result<Query> {
        parse(query)
    }

    /// Parse and resolve, without lowering
    pub fn analyze(&self, query: &str) -> Result<QueryIr> {
        build(&parse(query)?)
    }

    /// Translate a query; `parameters` are validated, never inlined
    pub fn translate(&self, query: &str, parameters: &ParameterMap) -> Result<TraversalProgram> {
        let ast = parse(query)?;
        let ir = build(&ast)?;
        let lowered = lower_neutral(&ir, parameters)?;
        let program = self.flavor.emitter().emit(lowered, parameters)?;
        debug!(
            "Translated query for flavor {} ({} column(s))",
            self.flavor,
            program.columns().len()
        );
        Ok(program)
    }
}

/// Translate with the default flavor
pub fn translate(query: &str, parameters: &ParameterMap) -> Result<TraversalProgram> {
    Translator::default().translate(query, parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cygnet_core::{Error, Value};
    use proptest::prelude::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_translator_is_send_sync() {
        assert_send_sync::<Translator>();
        assert_send_sync::<TraversalProgram>();
    }

    #[test]
    fn test_translate_gremlin_text() {
        let mut params = ParameterMap::new();
        params.insert("name".to_string(), Value::from("marko"));
        let program = translate(
            "MATCH (n:person) WHERE n.name = $name RETURN n.age",
            &params,
        )
        .unwrap();

        let text = program.text().unwrap();
        assert!(text.starts_with("g.V().hasLabel('person').as('n')"));
        assert!(text.contains("has('name', P.eq(name))"));
        assert!(text.contains("project('n.age')"));
        assert!(!text.contains("marko"));
        assert_eq!(program.columns(), ["n.age".to_string()]);
        assert_eq!(program.parameters(), &params);
    }

    #[test]
    fn test_unknown_flavor() {
        let err = Translator::for_flavor_name("sql").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFlavor { .. }));
    }

    #[test]
    fn test_cosmos_rejects_starts_with() {
        let translator = Translator::for_flavor_name("cosmosdb").unwrap();
        let err = translator
            .translate(
                "MATCH (n) WHERE n.name STARTS WITH 'ma' RETURN n",
                &ParameterMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedInFlavor { .. }));
    }

    #[test]
    fn test_reserved_parameter_name_in_gremlin_flavor() {
        let err = translate("MATCH (n) WHERE n.name = $goto RETURN n", &ParameterMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("Invalid parameter name: goto"));

        // the native flavor never renders identifiers
        let native = Translator::new(Flavor::Native);
        assert!(native
            .translate("MATCH (n) WHERE n.name = $goto RETURN n", &ParameterMap::new())
            .is_ok());
    }

    proptest! {
        #[test]
        fn prop_translation_is_deterministic(age in 0i64..120, name in "[a-z]{1,8}") {
            let query = format!(
                "MATCH (n:person) WHERE n.age > {} AND n.name <> '{}' RETURN n.name ORDER BY n.name LIMIT 3",
                age, name
            );
            let params = ParameterMap::new();
            let first = translate(&query, &params).unwrap();
            let second = translate(&query, &params).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
