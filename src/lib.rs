//! Cygnet - Cypher to Gremlin translation
//!
//! This is the main library crate that re-exports all Cygnet components.

pub use cygnet_client as client;
pub use cygnet_core as core;
pub use cygnet_graph as graph;
pub use cygnet_query as query;

// Re-export commonly used types
pub use cygnet_core::{Error, ParameterMap, Result, Value};

pub use cygnet_client::{ClientConfig, CypherGremlinClient, EmbeddedClient, GremlinExecutor, QueryResult};
pub use cygnet_graph::Graph;
pub use cygnet_query::{Flavor, TraversalProgram, Translator, translate};
