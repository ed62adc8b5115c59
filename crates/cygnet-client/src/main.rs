//! Cygnet command line entry point
//!
//! ```text
//! cygnet [--flavor NAME] [--params JSON] [--config FILE] [--demo] QUERY
//! ```
//!
//! Prints the translation of QUERY. With `--demo` the query is also run
//! against the TinkerPop "modern" graph and the rows are printed as JSON.

use clap::Parser;
use cygnet_client::{ClientConfig, EmbeddedClient};
use cygnet_core::{Error, ParameterMap, Result, Value};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Translate Cypher queries to Gremlin")]
struct Cli {
    /// Translation flavor, overriding the configuration file
    #[arg(long)]
    flavor: Option<String>,

    /// Query parameters as a JSON object
    #[arg(long)]
    params: Option<String>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<String>,

    /// Run the query against the "modern" sample graph
    #[arg(long)]
    demo: bool,

    /// Cypher query
    query: String,
}

fn parameters(json: Option<&str>) -> Result<ParameterMap> {
    let Some(json) = json else {
        return Ok(ParameterMap::new());
    };
    match Value::from_json(serde_json::from_str(json)?) {
        Value::Map(map) => Ok(map),
        other => Err(Error::Configuration(format!(
            "Parameters must be a JSON object, got {}",
            other.type_name()
        ))),
    }
}

async fn run(cli: Cli, mut config: ClientConfig) -> Result<()> {
    let query = cli.query;
    let params = parameters(cli.params.as_deref())?;

    if cli.demo {
        config = config.flavor("native").graph_name("modern");
    }

    let client = EmbeddedClient::from_config(config)?;

    let program = client.translate(&query, &params)?;
    println!("{}", program.display_text());
    info!("Columns: {}", program.columns().join(", "));

    if cli.demo {
        let result = client.submit(&query, &params).await?;
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => ClientConfig::from_file(path),
        None => Ok(ClientConfig::default()),
    };
    let config = match config {
        Ok(c) => match cli.flavor.as_deref() {
            Some(flavor) => c.flavor(flavor),
            None => c,
        },
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let level = config.log_level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    info!("Cygnet v{} ({} flavor)", env!("CARGO_PKG_VERSION"), config.flavor);

    if let Err(e) = run(cli, config).await {
        error!("Query failed: {}", e);
        std::process::exit(1);
    }
}
