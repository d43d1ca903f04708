//! Query synthesis for the RCSB PDB Data API.
//!
//! An introspection document is turned into a directed graph of types and fields once, up front.
//! Requests then name a root field (the *input type*), the identifiers to look up, and the fields
//! to return. Return fields can be bare names, when the name is unique in the schema, or dotted
//! paths such as `citation.journal_abbrev`. Each one is resolved to the single shortest route from
//! the root field, and the routes are merged into one validated GraphQL document.
//!
//! ```ignore
//! let schema = DataApiSchema::from_json(&introspection_json, &Configuration::default())?;
//! let query = schema.construct_query(
//!     &InputIds::ids(["4HHB"]),
//!     "entries",
//!     &["exptl", "struct.title"],
//! )?;
//! ```
//!
//! [`BatchCoordinator`] sends such documents through a [`Transport`], splitting long identifier
//! lists into chunks, and [`SchemaLoader`] fetches the introspection document itself.

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod batching;
mod client_schema;
pub mod configuration;
mod display_helpers;
pub mod error;
pub mod introspection;
pub mod loader;
pub mod operation;
pub mod query_graph;
pub mod transport;
pub(crate) mod utils;

use apollo_compiler::Schema;
use apollo_compiler::validation::Valid;
use indexmap::IndexMap;
use tracing::debug;

pub use crate::batching::BatchCoordinator;
pub use crate::configuration::Configuration;
pub use crate::error::QueryError;
use crate::introspection::IntrospectionSchema;
pub use crate::introspection::RootEntry;
pub use crate::loader::SchemaLoader;
use crate::operation::SynthesizedQuery;
use crate::operation::arguments::bind_arguments;
pub use crate::operation::arguments::ArgumentValue;
pub use crate::operation::arguments::InputIds;
use crate::query_graph::SchemaGraph;
use crate::query_graph::catalog::IndexCatalog;
use crate::query_graph::graph_path::PathResolver;
pub use crate::query_graph::graph_path::ResolvedPath;
pub use crate::transport::HttpTransport;
pub use crate::transport::Transport;

/// The introspected Data API schema, ready to synthesize queries.
///
/// Everything is computed in [`DataApiSchema::new`]; afterwards the value is read-only and can be
/// shared between threads.
#[derive(Debug)]
pub struct DataApiSchema {
    graph: SchemaGraph,
    catalog: IndexCatalog,
    roots: IndexMap<String, RootEntry>,
    client_schema: Valid<Schema>,
    max_input_ids: usize,
}

impl DataApiSchema {
    pub fn new(
        introspection: &IntrospectionSchema,
        configuration: &Configuration,
    ) -> Result<Self, QueryError> {
        configuration.validate()?;
        let graph = query_graph::build_query_graph::build_schema_graph(
            introspection,
            &configuration.weight_overrides,
        )?;
        let catalog = IndexCatalog::new(&graph)?;
        let roots = introspection
            .root_entries()?
            .into_iter()
            .map(|root| (root.name.clone(), root))
            .collect::<IndexMap<_, _>>();
        let client_schema = client_schema::build_client_schema(introspection)?;
        debug!(
            roots = roots.len(),
            types = graph.types_to_nodes().len(),
            "initialized Data API schema"
        );
        Ok(Self {
            graph,
            catalog,
            roots,
            client_schema,
            max_input_ids: configuration.max_input_ids,
        })
    }

    /// Builds the schema from an introspection response in JSON.
    pub fn from_json(json: &str, configuration: &Configuration) -> Result<Self, QueryError> {
        Self::new(&IntrospectionSchema::parse(json)?, configuration)
    }

    /// Synthesizes a validated query returning `return_data_list` for `input_ids` from the root
    /// field `input_type`.
    pub fn construct_query<S: AsRef<str>>(
        &self,
        input_ids: &InputIds,
        input_type: &str,
        return_data_list: &[S],
    ) -> Result<String, QueryError> {
        self.construct_query_with_limit(input_ids, input_type, return_data_list, self.max_input_ids)
    }

    pub(crate) fn construct_query_with_limit<S: AsRef<str>>(
        &self,
        input_ids: &InputIds,
        input_type: &str,
        return_data_list: &[S],
        max_input_ids: usize,
    ) -> Result<String, QueryError> {
        let root = self.root_entry(input_type)?;
        if return_data_list.is_empty() {
            return Err(QueryError::invalid_input(
                input_type,
                "at least one return field is required",
            ));
        }
        let resolved = self.resolve_paths(input_type, return_data_list)?;
        let arguments = bind_arguments(root, input_ids, max_input_ids)?;
        let root_index = self.root_index(input_type)?;
        let query = SynthesizedQuery::new(&self.graph, root_index, arguments, &resolved)?
            .to_validated_string(&self.client_schema)?;
        debug!(input_type, query, "synthesized query");
        Ok(query)
    }

    /// Resolves each return field to its route from the root field `input_type`.
    pub fn resolve_paths<S: AsRef<str>>(
        &self,
        input_type: &str,
        return_data_list: &[S],
    ) -> Result<Vec<ResolvedPath>, QueryError> {
        self.root_entry(input_type)?;
        PathResolver::new(&self.graph, &self.catalog).resolve(input_type, return_data_list)
    }

    /// The field names along a resolved route, root field first.
    pub fn field_names(&self, resolved: &ResolvedPath) -> Result<Vec<String>, QueryError> {
        self.graph
            .field_vertices(&resolved.path)
            .into_iter()
            .map(|index| Ok(self.graph.field(index)?.name.clone()))
            .collect()
    }

    /// Every `<parent_field>.<field>` name that addresses a field called `field_name`. Matching is
    /// case-insensitive. Empty when the name is unique or unknown.
    pub fn get_unique_fields(&self, field_name: &str) -> Result<Vec<String>, QueryError> {
        self.catalog.get_unique_fields(&self.graph, field_name)
    }

    /// Argument names of the root field with their descriptions.
    pub fn get_input_id_dict(
        &self,
        input_type: &str,
    ) -> Result<IndexMap<String, Option<String>>, QueryError> {
        Ok(self
            .root_entry(input_type)?
            .arguments
            .iter()
            .map(|argument| (argument.name.clone(), argument.description.clone()))
            .collect())
    }

    /// Addressable field names containing `search` (case-insensitive) with their descriptions.
    pub fn find_field_names(
        &self,
        search: &str,
    ) -> Result<IndexMap<String, Option<String>>, QueryError> {
        let search = search.to_lowercase();
        let mut found = IndexMap::new();
        for (name, index) in self.catalog.addressable_fields() {
            if name.to_lowercase().contains(&search) {
                found.insert(name.to_owned(), self.graph.field(index)?.description.clone());
            }
        }
        if found.is_empty() {
            return Err(QueryError::UnknownField {
                names: vec![search],
            });
        }
        Ok(found)
    }

    pub fn root(&self, input_type: &str) -> Option<&RootEntry> {
        self.roots.get(input_type)
    }

    pub fn roots(&self) -> impl Iterator<Item = &RootEntry> {
        self.roots.values()
    }

    /// Whether the root field returns a list, and so takes a list of identifiers.
    pub fn is_plural(&self, input_type: &str) -> bool {
        self.root(input_type).is_some_and(|root| root.plural)
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn client_schema(&self) -> &Valid<Schema> {
        &self.client_schema
    }

    fn root_entry(&self, input_type: &str) -> Result<&RootEntry, QueryError> {
        self.root(input_type)
            .ok_or_else(|| QueryError::UnknownInputType {
                input_type: input_type.to_owned(),
            })
    }

    fn root_index(&self, input_type: &str) -> Result<petgraph::graph::NodeIndex, QueryError> {
        self.catalog.root_field(input_type).ok_or_else(|| {
            QueryError::internal(format!("Root field \"{input_type}\" has no vertex"))
        })
    }
}

const _: () = {
    const fn assert_thread_safe<T: Sync + Send>() {}

    assert_thread_safe::<DataApiSchema>();
    assert_thread_safe::<BatchCoordinator>();
};
