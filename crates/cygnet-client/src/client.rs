//! Translating client
//!
//! Submits Cypher to a Gremlin endpoint: the query is translated with the
//! configured flavor and the resulting program is handed to a
//! [`GremlinExecutor`]. The bundled [`EmbeddedExecutor`] runs programs
//! against an in-memory graph.

use crate::config::ClientConfig;
use async_trait::async_trait;
use cygnet_core::{Error, ParameterMap, Result, Value};
use cygnet_graph::Graph;
use cygnet_query::params::validate_parameter_name;
use cygnet_query::{TraversalExecutor, TraversalProgram, Translator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Query execution result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,

    /// Result rows, keyed by column
    pub rows: Vec<BTreeMap<String, Value>>,
}

impl QueryResult {
    /// Build rows from raw traversal results
    ///
    /// Projected results are maps keyed by column; any other value is
    /// taken as the single column of its row.
    pub fn from_values(columns: &[String], values: Vec<Value>) -> Self {
        let rows = values
            .into_iter()
            .map(|value| match value {
                Value::Map(map) if columns.iter().all(|c| map.contains_key(c)) => map
                    .into_iter()
                    .filter(|(k, _)| columns.contains(k))
                    .collect(),
                other => {
                    let mut row = BTreeMap::new();
                    let column = columns.first().cloned().unwrap_or_default();
                    row.insert(column, other);
                    row
                }
            })
            .collect();
        Self {
            columns: columns.to_vec(),
            rows,
        }
    }

    /// Values of one column, in row order; missing cells are null
    pub fn column(&self, name: &str) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(name).cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub fn rows_as_maps(&self) -> &[BTreeMap<String, Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as a JSON array of objects
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.rows
                .iter()
                .map(|row| {
                    serde_json::Value::Object(
                        row.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
                    )
                })
                .collect(),
        )
    }
}

/// Execution boundary: something that can run a translated program
#[async_trait]
pub trait GremlinExecutor: Send + Sync {
    /// Execute a program and collect its rows
    async fn execute(&self, program: &TraversalProgram) -> Result<QueryResult>;
}

/// Runs native and compatible programs against an in-memory graph
pub struct EmbeddedExecutor {
    executor: TraversalExecutor,
}

impl EmbeddedExecutor {
    pub fn new(graph: Arc<Graph>) -> Self {
        Self {
            executor: TraversalExecutor::new(graph),
        }
    }

    /// Executor over a fresh copy of the TinkerPop "modern" graph
    pub fn modern() -> Result<Self> {
        Ok(Self::new(Arc::new(Graph::modern()?)))
    }

    pub fn graph(&self) -> &Arc<Graph> {
        self.executor.graph()
    }
}

#[async_trait]
impl GremlinExecutor for EmbeddedExecutor {
    async fn execute(&self, program: &TraversalProgram) -> Result<QueryResult> {
        let traversal = program.traversal().ok_or_else(|| {
            Error::Execution(
                "The embedded executor cannot evaluate script text; use the native or cosmosdb flavor"
                    .to_string(),
            )
        })?;
        let values = self.executor.execute(traversal, program.parameters())?;
        debug!("Embedded execution produced {} row(s)", values.len());
        Ok(QueryResult::from_values(program.columns(), values))
    }
}

/// Client that accepts Cypher and submits Gremlin
pub struct CypherGremlinClient<E: GremlinExecutor> {
    config: ClientConfig,
    translator: Translator,
    executor: E,
}

impl<E: GremlinExecutor> CypherGremlinClient<E> {
    /// Create a client; fails if the configured flavor is unknown
    pub fn new(config: ClientConfig, executor: E) -> Result<Self> {
        let translator = Translator::new(config.selected_flavor()?);
        Ok(Self {
            config,
            translator,
            executor,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Translate without executing
    pub fn translate(&self, query: &str, parameters: &ParameterMap) -> Result<TraversalProgram> {
        self.translator.translate(query, parameters)
    }

    /// Translate and execute a query
    pub async fn submit(&self, query: &str, parameters: &ParameterMap) -> Result<QueryResult> {
        for name in parameters.keys() {
            validate_parameter_name(name)?;
        }

        if self.config.strict_parameters {
            let ir = self.translator.analyze(query)?;
            if let Some(missing) = ir
                .parameters()
                .into_iter()
                .find(|name| !parameters.contains_key(name))
            {
                return Err(Error::Execution(format!(
                    "Expected parameter `{}` to be provided",
                    missing
                )));
            }
        }

        let program = self.translator.translate(query, parameters)?;
        info!(
            "Submitting query ({} flavor, {} parameter(s))",
            self.translator.flavor(),
            parameters.len()
        );
        self.executor.execute(&program).await
    }
}

/// Client running against the embedded graph
pub type EmbeddedClient = CypherGremlinClient<EmbeddedExecutor>;

impl EmbeddedClient {
    pub fn embedded(config: ClientConfig, graph: Arc<Graph>) -> Result<Self> {
        Self::new(config, EmbeddedExecutor::new(graph))
    }

    /// Client over the graph named by `config.graph_name`
    ///
    /// `modern` loads the TinkerPop sample graph; any other name starts empty.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let graph = match config.graph_name.as_str() {
            "modern" => Graph::modern()?,
            name => Graph::new(name),
        };
        debug!("Embedded graph `{}`", graph.name());
        Self::embedded(config, Arc::new(graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> EmbeddedClient {
        let graph = Arc::new(Graph::modern().unwrap());
        EmbeddedClient::embedded(ClientConfig::new("native"), graph).unwrap()
    }

    #[tokio::test]
    async fn test_submit_returns_rows() {
        let result = client()
            .submit(
                "MATCH (n:person) RETURN n.name AS name ORDER BY name",
                &ParameterMap::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["name".to_string()]);
        assert_eq!(
            result.column("name"),
            vec![
                Value::from("josh"),
                Value::from("marko"),
                Value::from("peter"),
                Value::from("vadas"),
            ]
        );
    }

    #[tokio::test]
    async fn test_from_config_selects_graph_by_name() {
        let modern = EmbeddedClient::from_config(ClientConfig::new("native").graph_name("modern")).unwrap();
        assert_eq!(modern.executor().graph().name(), "modern");
        let result = modern
            .submit("MATCH (n) RETURN count(n) AS c", &ParameterMap::new())
            .await
            .unwrap();
        assert_eq!(result.column("c"), vec![Value::Integer(6)]);

        let empty = EmbeddedClient::from_config(ClientConfig::new("native").graph_name("scratch")).unwrap();
        assert_eq!(empty.executor().graph().name(), "scratch");
        let result = empty
            .submit("MATCH (n) RETURN n.name AS name", &ParameterMap::new())
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_parameter_name_rejected_at_submission() {
        let mut params = ParameterMap::new();
        params.insert("a$b".to_string(), Value::from(1));
        let err = client().submit("RETURN 1 AS one", &params).await.unwrap_err();
        assert_eq!(err, Error::InvalidParameterName("a$b".to_string()));
    }

    #[tokio::test]
    async fn test_script_flavor_cannot_run_embedded() {
        let graph = Arc::new(Graph::modern().unwrap());
        let client = EmbeddedClient::embedded(ClientConfig::default(), graph).unwrap();
        let err = client
            .submit("MATCH (n) RETURN n", &ParameterMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
    }

    #[tokio::test]
    async fn test_strict_parameters() {
        let graph = Arc::new(Graph::modern().unwrap());
        let config = ClientConfig::new("native").strict_parameters(true);
        let client = EmbeddedClient::embedded(config, graph).unwrap();
        let err = client
            .submit("MATCH (n) WHERE n.name = $name RETURN n", &ParameterMap::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_query_result_helpers() {
        let mut row = BTreeMap::new();
        row.insert("x".to_string(), Value::from(1));
        let result = QueryResult::from_values(&["x".to_string()], vec![Value::Map(row), Value::from(2)]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.column("x"), vec![Value::from(1), Value::from(2)]);
        assert_eq!(result.to_json(), serde_json::json!([{"x": 1}, {"x": 2}]));
    }
}
