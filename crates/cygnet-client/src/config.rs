//! Client configuration

use cygnet_core::{Error, Result};
use cygnet_query::Flavor;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Translation flavor name (case-insensitive)
    pub flavor: String,

    /// Log level used by the CLI when `RUST_LOG` is unset
    pub log_level: String,

    /// Require every referenced parameter to be supplied at submission
    pub strict_parameters: bool,

    /// Name of the embedded graph
    pub graph_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            flavor: Flavor::default().name().to_string(),
            log_level: "info".to_string(),
            strict_parameters: false,
            graph_name: "default".to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for a flavor
    pub fn new<S: Into<String>>(flavor: S) -> Self {
        Self {
            flavor: flavor.into(),
            ..Default::default()
        }
    }

    /// Create configuration for development: native flavor, verbose logs
    pub fn for_development() -> Self {
        Self {
            flavor: Flavor::Native.name().to_string(),
            log_level: "debug".to_string(),
            strict_parameters: true,
            ..Default::default()
        }
    }

    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the flavor name is known
    pub fn validate(&self) -> Result<()> {
        self.selected_flavor().map(|_| ())
    }

    /// The configured flavor
    pub fn selected_flavor(&self) -> Result<Flavor> {
        self.flavor.parse()
    }

    /// Builder: set flavor
    pub fn flavor(mut self, flavor: &str) -> Self {
        self.flavor = flavor.to_string();
        self
    }

    /// Builder: set log level
    pub fn log_level(mut self, level: &str) -> Self {
        self.log_level = level.to_string();
        self
    }

    /// Builder: require all parameters
    pub fn strict_parameters(mut self, strict: bool) -> Self {
        self.strict_parameters = strict;
        self
    }

    /// Builder: set graph name
    pub fn graph_name(mut self, name: &str) -> Self {
        self.graph_name = name.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.flavor, "gremlin");
        assert_eq!(config.selected_flavor().unwrap(), Flavor::Gremlin);
        assert!(!config.strict_parameters);
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("cosmosdb")
            .log_level("debug")
            .strict_parameters(true)
            .graph_name("modern");

        assert_eq!(config.selected_flavor().unwrap(), Flavor::CosmosDb);
        assert_eq!(config.log_level, "debug");
        assert!(config.strict_parameters);
        assert_eq!(config.graph_name, "modern");
    }

    #[test]
    fn test_from_json_with_defaults() {
        let config = ClientConfig::from_json(r#"{"flavor": "NATIVE"}"#).unwrap();
        assert_eq!(config.selected_flavor().unwrap(), Flavor::Native);
        assert_eq!(config.log_level, "info");

        let round_trip = ClientConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }

    #[test]
    fn test_unknown_flavor_rejected() {
        let err = ClientConfig::from_json(r#"{"flavor": "sparql"}"#).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFlavor { .. }));
    }

    #[test]
    fn test_development_config() {
        let config = ClientConfig::for_development();
        assert_eq!(config.selected_flavor().unwrap(), Flavor::Native);
        assert_eq!(config.log_level, "debug");
    }
}
