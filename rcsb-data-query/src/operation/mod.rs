//! Query synthesis: merging resolved routes into one selection tree under a root field, printing it,
//! and validating the printed document against the client schema.
use std::fmt;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Schema;
use apollo_compiler::validation::Valid;
use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::display_helpers::State;
use crate::display_helpers::write_indented_lines;
use crate::error::QueryError;
use crate::query_graph::SchemaGraph;
use crate::query_graph::graph_path::ResolvedPath;
use crate::query_graph::path_tree::PathTree;
use crate::utils::logging::snapshot;

pub mod arguments;

use arguments::BoundArguments;

/// A single-root query document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SynthesizedQuery {
    root: String,
    arguments: BoundArguments,
    selection: PathTree,
}

impl SynthesizedQuery {
    pub(crate) fn new(
        graph: &SchemaGraph,
        root: NodeIndex,
        arguments: BoundArguments,
        resolved: &[ResolvedPath],
    ) -> Result<Self, QueryError> {
        let selection = PathTree::from_paths(graph, root, resolved)?;
        snapshot!(selection, "merged selection tree");
        Ok(Self {
            root: graph.field(root)?.name.clone(),
            arguments,
            selection,
        })
    }

    /// Prints the document and checks it against `schema`.
    pub(crate) fn to_validated_string(&self, schema: &Valid<Schema>) -> Result<String, QueryError> {
        let query = self.to_string();
        validate_query(schema, &query)?;
        Ok(query)
    }
}

impl fmt::Display for SynthesizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut state = State::new(f);
        state.write("{")?;
        write_indented_lines(&mut state, &[self], |state, query| {
            state.write(&query.root)?;
            if !query.arguments.0.is_empty() {
                state.write(format_args!("({})", query.arguments))?;
            }
            query.selection.write_selection_set(state)
        })?;
        state.write("}")
    }
}

/// Parses `query` and validates it against `schema`.
pub(crate) fn validate_query(schema: &Valid<Schema>, query: &str) -> Result<(), QueryError> {
    ExecutableDocument::parse_and_validate(schema, query, "query.graphql")
        .map(|_| ())
        .map_err(|with_errors| QueryError::QuerySynthesis {
            query: query.to_owned(),
            diagnostics: with_errors
                .errors
                .iter()
                .map(|diagnostic| diagnostic.to_string())
                .collect(),
        })
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use serde_json::json;

    use super::*;
    use crate::client_schema::build_client_schema;
    use crate::introspection::IntrospectionSchema;
    use crate::operation::arguments::ArgumentValue;
    use crate::query_graph::build_query_graph::build_schema_graph;

    fn introspection() -> IntrospectionSchema {
        let scalar = json!({"kind": "SCALAR", "name": "String"});
        IntrospectionSchema::from_value(json!({
            "queryType": {"name": "Query"},
            "types": [
                {"kind": "OBJECT", "name": "Query", "fields": [{
                    "name": "entry",
                    "args": [{"name": "entry_id", "type": {"kind": "NON_NULL", "ofType": scalar}}],
                    "type": {"kind": "OBJECT", "name": "Entry"}
                }]},
                {"kind": "OBJECT", "name": "Entry", "fields": [
                    {"name": "id", "type": scalar},
                    {"name": "info", "type": {"kind": "OBJECT", "name": "Info"}}
                ]},
                {"kind": "OBJECT", "name": "Info", "fields": [{"name": "title", "type": scalar}]},
                {"kind": "SCALAR", "name": "String"}
            ]
        }))
        .unwrap()
    }

    fn route(path: &[usize]) -> ResolvedPath {
        ResolvedPath {
            field: String::new(),
            path: path.iter().copied().map(NodeIndex::new).collect(),
            weight: 0,
        }
    }

    #[test]
    fn prints_and_validates_a_nested_document() {
        let introspection = introspection();
        let graph = build_schema_graph(&introspection, &IndexMap::new()).unwrap();
        let schema = build_client_schema(&introspection).unwrap();
        // Query 0, entry 1, Entry 2, id 3, info 4, Info 5, title 6
        let query = SynthesizedQuery::new(
            &graph,
            NodeIndex::new(1),
            BoundArguments(vec![(
                "entry_id".to_owned(),
                ArgumentValue::String("4HHB".to_owned()),
            )]),
            &[route(&[1, 2, 4, 5, 6]), route(&[1, 2, 3])],
        )
        .unwrap();
        let printed = query.to_validated_string(&schema).unwrap();
        insta::assert_snapshot!(printed, @r###"
        {
          entry(entry_id: "4HHB") {
            info {
              title
            }
            id
          }
        }
        "###);
    }

    #[test]
    fn invalid_documents_carry_diagnostics() {
        let schema = build_client_schema(&introspection()).unwrap();
        let error = validate_query(&schema, "{ entry(entry_id: \"4HHB\") { missing } }").unwrap_err();
        match error {
            QueryError::QuerySynthesis { query, diagnostics } => {
                assert!(query.contains("missing"));
                assert!(!diagnostics.is_empty());
            }
            other => panic!("expected a synthesis error, got {other:?}"),
        }
    }
}
