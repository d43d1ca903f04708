//! Splitting long identifier lists into chunk queries and merging their responses.
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::TryStreamExt;
use futures::stream;
use serde_json::Value;
use serde_json::json;
use tracing::trace;
use tracing::warn;

use crate::Configuration;
use crate::DataApiSchema;
use crate::error::QueryError;
use crate::operation::arguments::ArgumentValue;
use crate::operation::arguments::InputIds;
use crate::transport::Transport;
use crate::transport::TransportError;

/// Runs queries through a [`Transport`], batching identifier lists for plural root fields.
///
/// A plain identifier list for a plural root field, or an argument map whose only list argument
/// is longer than `batch_size`, is split into contiguous chunks of at most `batch_size`
/// identifiers. Every chunk query is synthesized before anything is sent, and up to
/// `max_concurrency` chunks are in flight at once. Results are merged in chunk order. The first
/// failing chunk fails the whole batch and drops the requests still pending.
#[derive(Clone)]
pub struct BatchCoordinator {
    schema: Arc<DataApiSchema>,
    transport: Arc<dyn Transport>,
    batch_size: usize,
    max_concurrency: usize,
    timeout: Duration,
}

impl std::fmt::Debug for BatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("batch_size", &self.batch_size)
            .field("max_concurrency", &self.max_concurrency)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl BatchCoordinator {
    pub fn new(
        schema: Arc<DataApiSchema>,
        transport: Arc<dyn Transport>,
        configuration: &Configuration,
    ) -> Result<Self, QueryError> {
        configuration.validate()?;
        Ok(Self {
            schema,
            transport,
            batch_size: configuration.batch_size,
            max_concurrency: configuration.max_concurrency,
            timeout: configuration.timeout,
        })
    }

    /// The queries [`BatchCoordinator::execute`] sends, in chunk order.
    pub fn chunk_queries<S: AsRef<str>>(
        &self,
        input_ids: &InputIds,
        input_type: &str,
        return_data_list: &[S],
    ) -> Result<Vec<String>, QueryError> {
        match input_ids {
            InputIds::Ids(ids) if self.schema.is_plural(input_type) && !ids.is_empty() => ids
                .chunks(self.batch_size)
                .map(|chunk| {
                    self.schema.construct_query_with_limit(
                        &InputIds::Ids(chunk.to_vec()),
                        input_type,
                        return_data_list,
                        usize::MAX,
                    )
                })
                .collect(),
            InputIds::Arguments(arguments) if self.schema.is_plural(input_type) => {
                let lists = arguments
                    .iter()
                    .filter_map(|(name, value)| match value {
                        ArgumentValue::List(ids) => Some((name, ids)),
                        ArgumentValue::String(_) => None,
                    })
                    .collect::<Vec<_>>();
                match lists.as_slice() {
                    [(name, ids)] if ids.len() > self.batch_size => ids
                        .chunks(self.batch_size)
                        .map(|chunk| {
                            let mut arguments = arguments.clone();
                            arguments.insert((*name).clone(), ArgumentValue::List(chunk.to_vec()));
                            self.schema.construct_query_with_limit(
                                &InputIds::Arguments(arguments),
                                input_type,
                                return_data_list,
                                usize::MAX,
                            )
                        })
                        .collect(),
                    _ => Ok(vec![self.schema.construct_query(
                        input_ids,
                        input_type,
                        return_data_list,
                    )?]),
                }
            }
            _ => Ok(vec![self.schema.construct_query(
                input_ids,
                input_type,
                return_data_list,
            )?]),
        }
    }

    /// Fetches `return_data_list` for `input_ids` and returns the merged response body,
    /// `{"data": {<input_type>: ...}}`.
    pub async fn execute<S: AsRef<str>>(
        &self,
        input_ids: &InputIds,
        input_type: &str,
        return_data_list: &[S],
    ) -> Result<Value, QueryError> {
        let queries = self.chunk_queries(input_ids, input_type, return_data_list)?;
        let plural = self.schema.is_plural(input_type);
        trace!(input_type, chunks = queries.len(), "dispatching queries");

        let results: Vec<Value> = stream::iter(queries.iter().enumerate())
            .map(|(index, query)| self.dispatch(index, query, input_type))
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        let merged = if plural {
            let mut merged = Vec::new();
            for result in results {
                match result {
                    Value::Array(items) => merged.extend(items),
                    Value::Null => {}
                    other => {
                        return Err(QueryError::MalformedResponse {
                            message: format!(
                                "expected a list for \"{input_type}\", got {}",
                                json_kind(&other)
                            ),
                        });
                    }
                }
            }
            if merged.is_empty() {
                warn!(input_type, "query returned no results");
            }
            Value::Array(merged)
        } else {
            let result = results.into_iter().next().unwrap_or(Value::Null);
            if result.is_null() {
                warn!(input_type, "query returned no results");
            }
            result
        };
        Ok(json!({ "data": { input_type: merged } }))
    }

    /// Sends one chunk query and returns the value under the root field.
    async fn dispatch(
        &self,
        index: usize,
        query: &str,
        input_type: &str,
    ) -> Result<Value, QueryError> {
        trace!(chunk = index, "sending chunk query");
        let response = tokio::time::timeout(self.timeout, self.transport.execute(query, self.timeout))
            .await
            .map_err(|_| TransportError::Timeout {
                target: format!("chunk {index} of \"{input_type}\""),
                timeout: self.timeout,
            })??;

        if !response.errors.is_empty() {
            return Err(QueryError::GraphQl {
                messages: response
                    .errors
                    .into_iter()
                    .map(|error| error.message)
                    .collect(),
            });
        }
        match response.data {
            Some(Value::Object(mut data)) => Ok(data.remove(input_type).unwrap_or(Value::Null)),
            Some(Value::Null) | None => Ok(Value::Null),
            Some(other) => Err(QueryError::MalformedResponse {
                message: format!("expected an object as \"data\", got {}", json_kind(&other)),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
