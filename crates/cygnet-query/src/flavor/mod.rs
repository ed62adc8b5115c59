//! Output flavors
//!
//! A flavor turns a lowered, flavor-neutral traversal into the program a
//! particular kind of Gremlin endpoint accepts. Flavors are registered in a
//! fixed table; names are matched case-insensitively.

pub mod cosmos;
pub mod groovy;
pub mod native;

use crate::lower::LoweredQuery;
use crate::step::Traversal;
use cygnet_core::{Error, ParameterMap, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use cosmos::CosmosEmitter;
pub use groovy::{GroovyEmitter, GroovyPredicates, GroovySteps};
pub use native::NativeEmitter;

/// Supported output flavors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Groovy script text for a stock Gremlin server
    #[default]
    Gremlin,
    /// In-process traversal, no text rendering
    Native,
    /// Script text restricted to what Azure Cosmos DB accepts
    #[serde(rename = "cosmosdb")]
    CosmosDb,
}

fn gremlin_emitter() -> Box<dyn FlavorEmitter> {
    Box::new(GroovyEmitter)
}

fn native_emitter() -> Box<dyn FlavorEmitter> {
    Box::new(NativeEmitter)
}

fn cosmos_emitter() -> Box<dyn FlavorEmitter> {
    Box::new(CosmosEmitter)
}

type EmitterFactory = fn() -> Box<dyn FlavorEmitter>;

const REGISTRY: &[(&str, Flavor, EmitterFactory)] = &[
    ("gremlin", Flavor::Gremlin, gremlin_emitter),
    ("native", Flavor::Native, native_emitter),
    ("cosmosdb", Flavor::CosmosDb, cosmos_emitter),
];

impl Flavor {
    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, flavor, _)| *flavor == self)
            .map(|(name, _, _)| *name)
            .unwrap_or("gremlin")
    }

    /// Every registered flavor, in registry order
    pub fn all() -> Vec<Flavor> {
        REGISTRY.iter().map(|(_, flavor, _)| *flavor).collect()
    }

    /// Comma-separated list of registered names
    pub fn supported_names() -> String {
        REGISTRY
            .iter()
            .map(|(name, _, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// A fresh emitter for this flavor
    pub fn emitter(self) -> Box<dyn FlavorEmitter> {
        REGISTRY
            .iter()
            .find(|(_, flavor, _)| *flavor == self)
            .map(|(_, _, factory)| factory())
            .unwrap_or_else(gremlin_emitter)
    }
}

impl FromStr for Flavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        REGISTRY
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(s.trim()))
            .map(|(_, flavor, _)| *flavor)
            .ok_or_else(|| Error::UnsupportedFlavor {
                name: s.to_string(),
                supported: Flavor::supported_names(),
            })
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Renders a lowered query in one flavor
pub trait FlavorEmitter: Send + Sync {
    fn flavor(&self) -> Flavor;

    /// Produce the final program; `parameters` are passed through, never inlined
    fn emit(&self, query: LoweredQuery, parameters: &ParameterMap) -> Result<TraversalProgram>;
}

/// A translated query
#[derive(Debug, Clone, PartialEq)]
pub enum TraversalProgram {
    /// Script text with named parameter placeholders
    Script {
        text: String,
        parameters: ParameterMap,
        columns: Vec<String>,
    },
    /// A traversal for in-process execution
    Native {
        traversal: Traversal,
        parameters: ParameterMap,
        columns: Vec<String>,
    },
    /// Script text plus the restricted traversal it was rendered from
    Compatible {
        text: String,
        traversal: Traversal,
        parameters: ParameterMap,
        columns: Vec<String>,
    },
}

impl TraversalProgram {
    /// Script text, if this flavor renders one
    pub fn text(&self) -> Option<&str> {
        match self {
            TraversalProgram::Script { text, .. } | TraversalProgram::Compatible { text, .. } => {
                Some(text)
            }
            TraversalProgram::Native { .. } => None,
        }
    }

    /// Traversal, if this flavor keeps one
    pub fn traversal(&self) -> Option<&Traversal> {
        match self {
            TraversalProgram::Native { traversal, .. }
            | TraversalProgram::Compatible { traversal, .. } => Some(traversal),
            TraversalProgram::Script { .. } => None,
        }
    }

    pub fn parameters(&self) -> &ParameterMap {
        match self {
            TraversalProgram::Script { parameters, .. }
            | TraversalProgram::Native { parameters, .. }
            | TraversalProgram::Compatible { parameters, .. } => parameters,
        }
    }

    /// Result column names, in projection order
    pub fn columns(&self) -> &[String] {
        match self {
            TraversalProgram::Script { columns, .. }
            | TraversalProgram::Native { columns, .. }
            | TraversalProgram::Compatible { columns, .. } => columns,
        }
    }

    /// Script text for display; native programs are rendered as Groovy
    pub fn display_text(&self) -> String {
        match self {
            TraversalProgram::Script { text, .. } | TraversalProgram::Compatible { text, .. } => {
                text.clone()
            }
            TraversalProgram::Native { traversal, .. } => groovy::render(traversal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_from_str_is_case_insensitive() {
        assert_eq!("gremlin".parse::<Flavor>().unwrap(), Flavor::Gremlin);
        assert_eq!("CosmosDB".parse::<Flavor>().unwrap(), Flavor::CosmosDb);
        assert_eq!("NATIVE".parse::<Flavor>().unwrap(), Flavor::Native);
    }

    #[test]
    fn test_unknown_flavor_lists_supported() {
        let err = "neo4j".parse::<Flavor>().unwrap_err();
        assert_eq!(
            err,
            Error::UnsupportedFlavor {
                name: "neo4j".to_string(),
                supported: "gremlin, native, cosmosdb".to_string(),
            }
        );
    }

    #[test]
    fn test_registry_round_trip() {
        for flavor in Flavor::all() {
            assert_eq!(flavor.name().parse::<Flavor>().unwrap(), flavor);
            assert_eq!(flavor.emitter().flavor(), flavor);
        }
        assert_eq!(Flavor::default(), Flavor::Gremlin);
    }

    #[test]
    fn test_flavor_serde_names() {
        let json = serde_json::to_string(&Flavor::CosmosDb).unwrap();
        assert_eq!(json, "\"cosmosdb\"");
        let flavor: Flavor = serde_json::from_str("\"native\"").unwrap();
        assert_eq!(flavor, Flavor::Native);
    }
}
