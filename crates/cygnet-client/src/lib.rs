//! Cygnet Client
//!
//! Accepts Cypher, translates it for the configured Gremlin flavor and
//! submits the result through a [`GremlinExecutor`].

pub mod client;
pub mod config;

pub use client::{CypherGremlinClient, EmbeddedClient, EmbeddedExecutor, GremlinExecutor, QueryResult};
pub use config::ClientConfig;
