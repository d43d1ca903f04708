//! Fetching the introspection document, with a local file as fallback.
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing::warn;

use crate::Configuration;
use crate::DataApiSchema;
use crate::error::QueryError;
use crate::introspection::IntrospectionSchema;
use crate::transport::Transport;

/// Full introspection query. Type references are unwrapped up to seven levels deep.
pub const INTROSPECTION_QUERY: &str = r#"query IntrospectionQuery {
  __schema {
    queryType { name }
    types { ...FullType }
  }
}

fragment FullType on __Type {
  kind
  name
  description
  fields(includeDeprecated: true) {
    name
    description
    args { ...InputValue }
    type { ...TypeRef }
  }
  inputFields { ...InputValue }
  interfaces { ...TypeRef }
  enumValues(includeDeprecated: true) {
    name
    description
  }
  possibleTypes { ...TypeRef }
}

fragment InputValue on __InputValue {
  name
  description
  type { ...TypeRef }
  defaultValue
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType {
                kind
                name
              }
            }
          }
        }
      }
    }
  }
}"#;

/// Loads the introspection document through a [`Transport`].
#[derive(Clone)]
pub struct SchemaLoader {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    fallback_path: Option<PathBuf>,
}

impl std::fmt::Debug for SchemaLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaLoader")
            .field("timeout", &self.timeout)
            .field("fallback_path", &self.fallback_path)
            .finish_non_exhaustive()
    }
}

impl SchemaLoader {
    pub fn new(transport: Arc<dyn Transport>, configuration: &Configuration) -> Self {
        Self {
            transport,
            timeout: configuration.timeout,
            fallback_path: configuration.schema_fallback_path.clone(),
        }
    }

    /// Introspects the endpoint. If the request fails or the response carries GraphQL errors,
    /// the fallback file is read instead; without one the original error is returned.
    pub async fn load(&self) -> Result<IntrospectionSchema, QueryError> {
        let error = match self.fetch().await {
            Ok(schema) => return Ok(schema),
            Err(error @ (QueryError::Transport(_) | QueryError::GraphQl { .. })) => error,
            Err(error) => return Err(error),
        };
        let Some(path) = &self.fallback_path else {
            return Err(error);
        };
        warn!(%error, path = %path.display(), "introspection failed, loading schema from file");
        load_file(path).await
    }

    /// Loads and builds the schema in one step.
    pub async fn load_schema(
        &self,
        configuration: &Configuration,
    ) -> Result<DataApiSchema, QueryError> {
        DataApiSchema::new(&self.load().await?, configuration)
    }

    async fn fetch(&self) -> Result<IntrospectionSchema, QueryError> {
        let response = self
            .transport
            .execute(INTROSPECTION_QUERY, self.timeout)
            .await?;
        if !response.errors.is_empty() {
            return Err(QueryError::GraphQl {
                messages: response
                    .errors
                    .into_iter()
                    .map(|error| error.message)
                    .collect(),
            });
        }
        let data = response
            .data
            .ok_or_else(|| QueryError::schema_ingestion("introspection response has no data"))?;
        IntrospectionSchema::from_value(data)
    }
}

/// Reads an introspection document from disk.
pub async fn load_file(path: &Path) -> Result<IntrospectionSchema, QueryError> {
    info!(path = %path.display(), "loading schema from file");
    let json = tokio::fs::read_to_string(path).await.map_err(|err| {
        QueryError::schema_ingestion(format!("could not read {}: {err}", path.display()))
    })?;
    IntrospectionSchema::parse(&json)
}

#[cfg(test)]
mod tests {
    use apollo_compiler::ExecutableDocument;
    use apollo_compiler::Schema;

    use super::*;

    #[test]
    fn introspection_query_is_valid_graphql() {
        let schema = Schema::parse_and_validate("type Query { a: Int }", "schema.graphql").unwrap();
        ExecutableDocument::parse_and_validate(&schema, INTROSPECTION_QUERY, "introspection.graphql")
            .unwrap();
    }
}
