//! Resolution of requested return fields to vertex paths from a root field.
use itertools::Itertools;
use petgraph::graph::NodeIndex;
use serde::Serialize;
use tracing::debug;

use crate::error::QueryError;
use crate::query_graph::SchemaGraph;
use crate::query_graph::catalog::IndexCatalog;
use crate::query_graph::shortest_paths::all_shortest_paths;
use crate::utils::logging::snapshot;

/// A requested return field and the single route that reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPath {
    /// The return field as requested.
    pub field: String,
    /// Vertices from the root field to the target field, type vertices included.
    pub path: Vec<NodeIndex>,
    pub weight: u32,
}

/// Turns bare or dotted return field names into routes from a root field vertex.
///
/// Equally short routes are never picked between: they are reported back as an
/// [`QueryError::AmbiguousField`] listing every alternative.
pub(crate) struct PathResolver<'a> {
    graph: &'a SchemaGraph,
    catalog: &'a IndexCatalog,
}

impl<'a> PathResolver<'a> {
    pub(crate) fn new(graph: &'a SchemaGraph, catalog: &'a IndexCatalog) -> Self {
        Self { graph, catalog }
    }

    /// Resolves every return field from the root field `input_type`.
    ///
    /// All names are checked up front, so a single [`QueryError::UnknownField`] reports every
    /// unknown name of the request.
    pub(crate) fn resolve<S: AsRef<str>>(
        &self,
        input_type: &str,
        return_fields: &[S],
    ) -> Result<Vec<ResolvedPath>, QueryError> {
        let root = self.catalog.root_field(input_type).ok_or_else(|| {
            QueryError::UnknownInputType {
                input_type: input_type.to_owned(),
            }
        })?;

        let unknown = return_fields
            .iter()
            .flat_map(|field| field.as_ref().split('.'))
            .filter(|segment| !self.catalog.contains_field_name(segment))
            .unique()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            return Err(QueryError::UnknownField { names: unknown });
        }

        let resolved = return_fields
            .iter()
            .map(|field| {
                let field = field.as_ref();
                let resolved = if field.contains('.') {
                    self.resolve_dotted(root, input_type, field)?
                } else {
                    self.resolve_bare(root, input_type, field)?
                };
                let rendered = self.graph.dotted_name(&resolved.path)?;
                debug!(
                    input_type,
                    field,
                    path = %rendered,
                    weight = resolved.weight,
                    "resolved return field"
                );
                Ok(resolved)
            })
            .collect::<Result<Vec<_>, QueryError>>()?;
        snapshot!(resolved, "resolved return fields");
        Ok(resolved)
    }

    fn resolve_bare(
        &self,
        root: NodeIndex,
        input_type: &str,
        name: &str,
    ) -> Result<ResolvedPath, QueryError> {
        let Some(target) = self.catalog.dotted_field(name) else {
            let mut alternatives = self.catalog.get_unique_fields(self.graph, name)?;
            // Fields only declared on types no field leads to have no qualified form.
            if alternatives.is_empty() {
                return Err(QueryError::UnreachableField {
                    field: name.to_owned(),
                    input_type: input_type.to_owned(),
                });
            }
            alternatives.sort();
            return Err(QueryError::AmbiguousField {
                field: name.to_owned(),
                alternatives,
            });
        };
        let shortest = all_shortest_paths(self.graph.graph(), root, target).ok_or_else(|| {
            QueryError::UnreachableField {
                field: name.to_owned(),
                input_type: input_type.to_owned(),
            }
        })?;
        self.single_route(name, shortest.weight, shortest.paths)
    }

    /// Matches every literal chain of fields spelling the dotted path, then prefixes each chain
    /// with the shortest routes from the root to its first field. The lightest routes win.
    fn resolve_dotted(
        &self,
        root: NodeIndex,
        input_type: &str,
        dotted: &str,
    ) -> Result<ResolvedPath, QueryError> {
        let segments = dotted.split('.').collect::<Vec<_>>();
        let Some((first, rest)) = segments.split_first() else {
            return Err(QueryError::InvalidPath {
                path: dotted.to_owned(),
            });
        };

        let mut chains = Vec::new();
        'candidates: for start in self.catalog.field_indices(first) {
            let mut chain = vec![*start];
            let mut current = *start;
            for segment in rest {
                let Some(target) = self.graph.field_target(current) else {
                    continue 'candidates;
                };
                let Some(next) = self.graph.child_field(current, segment)? else {
                    continue 'candidates;
                };
                chain.push(target);
                chain.push(next);
                current = next;
            }
            chains.push(chain);
        }
        if chains.is_empty() {
            return Err(QueryError::InvalidPath {
                path: dotted.to_owned(),
            });
        }

        let mut routes: Vec<(u32, Vec<NodeIndex>)> = Vec::new();
        for chain in chains {
            let Some(shortest) = all_shortest_paths(self.graph.graph(), root, chain[0]) else {
                continue;
            };
            let tail_weight = self.graph.path_weight(&chain)?;
            for prefix in shortest.paths {
                let mut path = prefix;
                path.extend_from_slice(&chain[1..]);
                routes.push((shortest.weight + tail_weight, path));
            }
        }
        let Some(lightest) = routes.iter().map(|(weight, _)| *weight).min() else {
            return Err(QueryError::UnreachableField {
                field: dotted.to_owned(),
                input_type: input_type.to_owned(),
            });
        };
        let paths = routes
            .into_iter()
            .filter(|(weight, _)| *weight == lightest)
            .map(|(_, path)| path)
            .sorted()
            .dedup()
            .collect();
        self.single_route(dotted, lightest, paths)
    }

    fn single_route(
        &self,
        field: &str,
        weight: u32,
        mut paths: Vec<Vec<NodeIndex>>,
    ) -> Result<ResolvedPath, QueryError> {
        if paths.len() > 1 {
            let alternatives = paths
                .iter()
                .map(|path| self.graph.dotted_name(path))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .sorted()
                .dedup()
                .collect();
            return Err(QueryError::AmbiguousField {
                field: field.to_owned(),
                alternatives,
            });
        }
        let path = paths
            .pop()
            .ok_or_else(|| QueryError::internal(format!("No route computed for \"{field}\"")))?;
        Ok(ResolvedPath {
            field: field.to_owned(),
            path,
            weight,
        })
    }
}
