//! Errors raised while ingesting a schema, resolving return fields, synthesizing queries and
//! dispatching them.
use crate::configuration::ConfigurationError;
use crate::display_helpers::DisplaySlice;
use crate::transport::TransportError;

/// Every failure surfaced to callers of this crate.
///
/// Errors are raised immediately and carry enough detail for the caller to correct the request
/// (alternative field paths, unknown names, validator diagnostics). Nothing is silently
/// substituted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum QueryError {
    /// The introspection document is malformed or incomplete.
    #[error("Invalid introspection document: {message}")]
    SchemaIngestion { message: String },

    /// One or more requested names do not exist anywhere in the schema.
    #[error("Unknown item in return data list: {}", DisplaySlice(.names))]
    UnknownField { names: Vec<String> },

    /// The input type is not a field of the query root.
    #[error("Unknown input type \"{input_type}\"")]
    UnknownInputType { input_type: String },

    /// The requested field resolves to more than one equally short route.
    #[error(
        "\"{field}\" is not specific enough. Use one of these paths in the return data list instead:\n{}",
        .alternatives.join("\n")
    )]
    AmbiguousField {
        field: String,
        alternatives: Vec<String>,
    },

    /// The requested field exists but cannot be reached from the input type.
    #[error("\"{field}\" can't be reached from input type \"{input_type}\"")]
    UnreachableField { field: String, input_type: String },

    /// No sequence of fields in the schema matches the dotted path.
    #[error("Return data path is not valid: \"{path}\"")]
    InvalidPath { path: String },

    /// The identifiers or arguments don't fit the root field's arguments.
    #[error("Invalid input for \"{input_type}\": {message}")]
    InvalidInput { input_type: String, message: String },

    /// The synthesized document failed validation against the schema.
    #[error("Synthesized query failed validation:\n{}", .diagnostics.join("\n"))]
    QuerySynthesis {
        query: String,
        diagnostics: Vec<String>,
    },

    /// The GraphQL server answered with an `errors` payload.
    #[error("GraphQL response carried errors:\n{}", numbered(.messages))]
    GraphQl { messages: Vec<String> },

    /// The response data doesn't have the shape the query asked for.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("An internal error has occurred, please report this bug to us: {message}")]
    Internal { message: String },
}

impl QueryError {
    pub(crate) fn schema_ingestion(message: impl Into<String>) -> Self {
        Self::SchemaIngestion {
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_input(input_type: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            input_type: input_type.to_owned(),
            message: message.into(),
        }
    }
}

fn numbered(messages: &[String]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| format!("{}. {message}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
