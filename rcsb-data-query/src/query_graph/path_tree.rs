use std::fmt;

use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::display_helpers::State;
use crate::display_helpers::write_indented_lines;
use crate::error::QueryError;
use crate::introspection::TypeKind;
use crate::query_graph::SchemaGraph;
use crate::query_graph::graph_path::ResolvedPath;

/// A merged prefix tree of field vertices hanging off a root field. Paths sharing a prefix share
/// the corresponding tree nodes, so every field appears at most once per selection set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct PathTree {
    /// Child fields in first-insertion order.
    childs: IndexMap<NodeIndex, PathTreeChild>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct PathTreeChild {
    name: String,
    tree: PathTree,
}

impl PathTree {
    /// Merges resolved routes starting at `root`. Routes ending on a composite field are extended
    /// with every leaf reachable below it without revisiting a type already on the route.
    pub(crate) fn from_paths(
        graph: &SchemaGraph,
        root: NodeIndex,
        resolved: &[ResolvedPath],
    ) -> Result<Self, QueryError> {
        let mut tree = PathTree::default();
        for resolved_path in resolved {
            let fields = graph.field_vertices(&resolved_path.path);
            let Some((first, rest)) = fields.split_first() else {
                return Err(QueryError::internal(format!(
                    "Empty route for \"{}\"",
                    resolved_path.field
                )));
            };
            if *first != root {
                return Err(QueryError::internal(format!(
                    "Route for \"{}\" doesn't start at the root field",
                    resolved_path.field
                )));
            }

            let mut node = &mut tree;
            for field in rest {
                node = node.child_mut(graph, *field)?;
            }

            let target = graph.field(*fields.last().unwrap_or(first))?;
            if let Some(target_type) = graph.field_target(target.index) {
                let ancestors = resolved_path
                    .path
                    .iter()
                    .copied()
                    .filter(|index| graph.type_node(*index).is_ok())
                    .collect::<Vec<_>>();
                // The requested field is always expanded, even when its type is already on the
                // route. Only the fields below it stop at known types.
                if let Some(expansion) = expand_type(graph, target_type, &ancestors)? {
                    node.merge(expansion);
                }
            }
        }
        Ok(tree)
    }

    fn child_mut(&mut self, graph: &SchemaGraph, field: NodeIndex) -> Result<&mut Self, QueryError> {
        let name = graph.field(field)?.name.clone();
        Ok(&mut self
            .childs
            .entry(field)
            .or_insert_with(|| PathTreeChild {
                name,
                tree: PathTree::default(),
            })
            .tree)
    }

    fn merge(&mut self, other: PathTree) {
        for (index, child) in other.childs {
            match self.childs.get_mut(&index) {
                Some(existing) => existing.tree.merge(child.tree),
                None => {
                    self.childs.insert(index, child);
                }
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.childs.is_empty()
    }

    /// Field names in depth-first order.
    #[cfg(test)]
    pub(crate) fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for child in self.childs.values() {
            names.push(child.name.as_str());
            names.extend(child.tree.field_names());
        }
        names
    }

    /// Writes ` { ... }` with one line per child, or nothing when there are no children.
    pub(crate) fn write_selection_set(&self, state: &mut State<'_, '_>) -> fmt::Result {
        if self.childs.is_empty() {
            return Ok(());
        }
        state.write(" {")?;
        let childs = self.childs.values().collect::<Vec<_>>();
        write_indented_lines(state, &childs, |state, child| {
            state.write(&child.name)?;
            child.tree.write_selection_set(state)
        })?;
        state.write("}")
    }
}

/// The leaves reachable below a composite field, or `None` if there are none.
///
/// `ancestors` holds the type vertices already entered above `field`; those types are not expanded
/// again, which cuts recursive references.
fn expand(
    graph: &SchemaGraph,
    field: NodeIndex,
    ancestors: &[NodeIndex],
) -> Result<Option<PathTree>, QueryError> {
    let Some(target) = graph.field_target(field) else {
        return Ok(None);
    };
    if ancestors.contains(&target) {
        return Ok(None);
    }
    expand_type(graph, target, ancestors)
}

/// The leaves reachable through the fields of the type vertex `target`. Union-typed fields have no
/// fields of their own and are left out.
fn expand_type(
    graph: &SchemaGraph,
    target: NodeIndex,
    ancestors: &[NodeIndex],
) -> Result<Option<PathTree>, QueryError> {
    let mut nested_ancestors = ancestors.to_vec();
    if !nested_ancestors.contains(&target) {
        nested_ancestors.push(target);
    }

    let mut tree = PathTree::default();
    for child in &graph.type_node(target)?.fields {
        let child_node = graph.field(*child)?;
        let subtree = if child_node.is_leaf() {
            PathTree::default()
        } else if child_node.element_kind == TypeKind::Union {
            continue;
        } else {
            match expand(graph, *child, &nested_ancestors)? {
                Some(subtree) => subtree,
                None => continue,
            }
        };
        tree.childs.insert(
            *child,
            PathTreeChild {
                name: child_node.name.clone(),
                tree: subtree,
            },
        );
    }
    Ok((!tree.is_empty()).then_some(tree))
}

impl fmt::Display for PathTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut state = State::new(f);
        state.write("{")?;
        let childs = self.childs.values().collect::<Vec<_>>();
        write_indented_lines(&mut state, &childs, |state, child| {
            state.write(&child.name)?;
            child.tree.write_selection_set(state)
        })?;
        state.write("}")
    }
}
