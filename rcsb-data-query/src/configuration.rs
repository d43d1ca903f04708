//! Logic for loading configuration in to an object model
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use displaydoc::Display;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

const DEFAULT_ENDPOINT: &str = "https://data.rcsb.org/graphql";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_MAX_INPUT_IDS: usize = 300;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const MAX_EDGE_WEIGHT: u32 = 1_000;

fn default_endpoint() -> Url {
    // The constant is a well-formed absolute URL.
    Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_weight_overrides() -> IndexMap<String, u32> {
    IndexMap::from([("CoreAssembly".to_owned(), 2)])
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not deserialize configuration: {0}
    DeserializeConfigError(String),
    /// {field} must be greater than zero
    MustBePositive { field: &'static str },
    /// edge weight override for type '{type_name}' must be between 1 and 1000, got {weight}
    InvalidWeight { type_name: String, weight: u32 },
}

/// The configuration for schema ingestion, path resolution and batched dispatch.
///
/// Can be created through `serde::Deserialize` from various formats, with
/// [`Configuration::from_str`] for YAML, or inline in Rust code with the builder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// GraphQL endpoint the default HTTP transport posts queries to.
    #[schemars(with = "String")]
    pub endpoint: Url,

    /// Timeout applied to every network call, in human-readable format; defaults to 10s
    #[serde(with = "humantime_serde", default = "default_timeout")]
    #[schemars(with = "String", default = "default_timeout")]
    pub timeout: Duration,

    /// Maximum number of identifiers sent in a single chunk query.
    pub batch_size: usize,

    /// Maximum number of identifiers accepted by a single (unbatched) query.
    pub max_input_ids: usize,

    /// Maximum number of chunk queries in flight at once.
    pub max_concurrency: usize,

    /// Weight given to the edges from a type to its fields, keyed by type name. Heavier types are
    /// avoided when several routes lead to the same field.
    pub weight_overrides: IndexMap<String, u32>,

    /// Local introspection document used when the endpoint can't be introspected.
    pub schema_fallback_path: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout: DEFAULT_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
            max_input_ids: DEFAULT_MAX_INPUT_IDS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            weight_overrides: default_weight_overrides(),
            schema_fallback_path: None,
        }
    }
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(
        endpoint: Option<Url>,
        timeout: Option<Duration>,
        batch_size: Option<usize>,
        max_input_ids: Option<usize>,
        max_concurrency: Option<usize>,
        weight_overrides: Option<IndexMap<String, u32>>,
        schema_fallback_path: Option<PathBuf>,
    ) -> Result<Self, ConfigurationError> {
        let configuration = Self {
            endpoint: endpoint.unwrap_or_else(default_endpoint),
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
            batch_size: batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            max_input_ids: max_input_ids.unwrap_or(DEFAULT_MAX_INPUT_IDS),
            max_concurrency: max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
            weight_overrides: weight_overrides.unwrap_or_else(default_weight_overrides),
            schema_fallback_path,
        };
        configuration.validate()?;
        Ok(configuration)
    }

    /// Checks the invariants serde can't express.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.batch_size == 0 {
            return Err(ConfigurationError::MustBePositive {
                field: "batch_size",
            });
        }
        if self.max_input_ids == 0 {
            return Err(ConfigurationError::MustBePositive {
                field: "max_input_ids",
            });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigurationError::MustBePositive {
                field: "max_concurrency",
            });
        }
        if let Some((type_name, weight)) = self
            .weight_overrides
            .iter()
            .find(|(_, weight)| !(1..=MAX_EDGE_WEIGHT).contains(*weight))
        {
            return Err(ConfigurationError::InvalidWeight {
                type_name: type_name.clone(),
                weight: *weight,
            });
        }
        Ok(())
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    /// Parses YAML configuration and validates it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let configuration: Self = serde_yaml::from_str(s)
            .map_err(|err| ConfigurationError::DeserializeConfigError(err.to_string()))?;
        configuration.validate()?;
        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn it_builds_default_configuration() {
        let configuration = Configuration::builder().build().unwrap();
        assert_eq!(configuration, Configuration::default());
        assert_eq!(configuration.batch_size, 50);
        assert_eq!(configuration.max_input_ids, 300);
        assert_eq!(configuration.timeout, Duration::from_secs(10));
        assert_eq!(configuration.weight_overrides.get("CoreAssembly"), Some(&2));
        assert_eq!(configuration.endpoint.as_str(), "https://data.rcsb.org/graphql");
    }

    #[test]
    fn it_json_parses_defaults_when_omitted() {
        let configuration: Configuration = serde_json::from_value(json!({})).unwrap();
        assert_eq!(configuration, Configuration::default());
    }

    #[test]
    fn it_parses_yaml_with_humantime_timeout() {
        let configuration = Configuration::from_str(
            r#"
timeout: 250ms
batch_size: 20
weight_overrides:
  CoreAssembly: 3
  CoreEntry: 2
"#,
        )
        .unwrap();
        assert_eq!(configuration.timeout, Duration::from_millis(250));
        assert_eq!(configuration.batch_size, 20);
        assert_eq!(
            configuration.weight_overrides.keys().collect::<Vec<_>>(),
            vec!["CoreAssembly", "CoreEntry"]
        );
    }

    #[test]
    fn it_rejects_unknown_fields() {
        let error = Configuration::from_str("batchsize: 10").unwrap_err();
        assert!(matches!(
            error,
            ConfigurationError::DeserializeConfigError(_)
        ));
    }

    #[test]
    fn it_rejects_zero_batch_size() {
        let error = Configuration::builder().batch_size(0).build().unwrap_err();
        assert_eq!(
            error,
            ConfigurationError::MustBePositive {
                field: "batch_size"
            }
        );
        assert_eq!(error.to_string(), "batch_size must be greater than zero");
    }

    #[test]
    fn it_rejects_zero_weight() {
        let error = Configuration::builder()
            .weight_overrides(IndexMap::from([("CoreAssembly".to_owned(), 0)]))
            .build()
            .unwrap_err();
        assert_eq!(
            error,
            ConfigurationError::InvalidWeight {
                type_name: "CoreAssembly".to_owned(),
                weight: 0
            }
        );
    }

    #[test]
    fn it_rejects_oversized_weights() {
        let error = Configuration::builder()
            .weight_overrides(IndexMap::from([("CoreEntry".to_owned(), u32::MAX)]))
            .build()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            format!(
                "edge weight override for type 'CoreEntry' must be between 1 and 1000, got {}",
                u32::MAX
            )
        );
        assert!(
            Configuration::builder()
                .weight_overrides(IndexMap::from([("CoreEntry".to_owned(), 1_000)]))
                .build()
                .is_ok()
        );
    }
}
