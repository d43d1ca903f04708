use std::fmt::Display;
use std::fmt::Formatter;

use indexmap::IndexMap;
use petgraph::Direction;
use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::error::QueryError;
use crate::introspection::TypeKind;

pub(crate) mod build_query_graph;
pub(crate) mod catalog;
pub mod graph_path;
pub(crate) mod path_tree;
pub(crate) mod shortest_paths;

/// A GraphQL type of the introspected schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeNode {
    pub name: String,
    pub index: NodeIndex,
    /// The field vertices owned by this type, in declaration order.
    pub fields: Vec<NodeIndex>,
}

/// A field declared on a [`TypeNode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldNode {
    pub name: String,
    /// The owning type vertex.
    pub parent: NodeIndex,
    /// The declared kind, which is `LIST` or `NON_NULL` for wrapped fields.
    pub kind: TypeKind,
    /// The kind of the named type once wrappers are stripped.
    pub element_kind: TypeKind,
    /// The named type the field resolves to.
    pub target_type: String,
    /// Whether the field name is declared by more than one type.
    pub redundant: bool,
    pub description: Option<String>,
    pub index: NodeIndex,
}

impl FieldNode {
    pub fn is_leaf(&self) -> bool {
        self.element_kind.is_leaf()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SchemaNode {
    Type(TypeNode),
    Field(FieldNode),
}

impl Display for SchemaNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaNode::Type(node) => write!(f, "{}", node.name),
            SchemaNode::Field(node) => write!(f, "{}: {}", node.name, node.target_type),
        }
    }
}

/// The schema as a directed graph: types own their fields (type → field edges), and composite
/// fields point at the type they resolve to (field → type edges).
///
/// Edges carry an integer weight used by path resolution; type → field edges of some types can be
/// made heavier so that routes through them lose ties.
///
/// The graph is built once and is read-only afterwards.
#[derive(Debug)]
pub struct SchemaGraph {
    graph: DiGraph<SchemaNode, u32>,
    /// Type vertices by type name.
    types_to_nodes: IndexMap<String, NodeIndex>,
    /// The vertex of the query root type.
    query_type: NodeIndex,
}

impl SchemaGraph {
    pub fn graph(&self) -> &DiGraph<SchemaNode, u32> {
        &self.graph
    }

    pub fn query_type(&self) -> NodeIndex {
        self.query_type
    }

    pub fn types_to_nodes(&self) -> &IndexMap<String, NodeIndex> {
        &self.types_to_nodes
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub(crate) fn node_weight(&self, node: NodeIndex) -> Result<&SchemaNode, QueryError> {
        self.graph
            .node_weight(node)
            .ok_or_else(|| QueryError::internal("Node unexpectedly missing"))
    }

    pub(crate) fn field(&self, node: NodeIndex) -> Result<&FieldNode, QueryError> {
        match self.node_weight(node)? {
            SchemaNode::Field(field) => Ok(field),
            SchemaNode::Type(ty) => Err(QueryError::internal(format!(
                "Expected a field vertex at {}, found type \"{}\"",
                node.index(),
                ty.name
            ))),
        }
    }

    pub(crate) fn type_node(&self, node: NodeIndex) -> Result<&TypeNode, QueryError> {
        match self.node_weight(node)? {
            SchemaNode::Type(ty) => Ok(ty),
            SchemaNode::Field(field) => Err(QueryError::internal(format!(
                "Expected a type vertex at {}, found field \"{}\"",
                node.index(),
                field.name
            ))),
        }
    }

    pub fn type_by_name(&self, name: &str) -> Option<&TypeNode> {
        let index = self.types_to_nodes.get(name)?;
        match self.graph.node_weight(*index)? {
            SchemaNode::Type(ty) => Some(ty),
            SchemaNode::Field(_) => None,
        }
    }

    /// The type vertex a composite field resolves to, if any.
    pub(crate) fn field_target(&self, field: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(field, Direction::Outgoing)
            .map(|edge| edge.target())
            .next()
    }

    /// The type vertex owning a field.
    pub(crate) fn field_parent(&self, field: NodeIndex) -> Result<NodeIndex, QueryError> {
        let mut parents = self.graph.neighbors_directed(field, Direction::Incoming);
        match (parents.next(), parents.next()) {
            (Some(parent), None) => Ok(parent),
            _ => Err(QueryError::internal(format!(
                "Field vertex {} must have exactly one owning type",
                field.index()
            ))),
        }
    }

    /// Fields of the type the given field resolves to, in declaration order. Empty for leaves.
    pub(crate) fn child_fields(&self, field: NodeIndex) -> Result<&[NodeIndex], QueryError> {
        match self.field_target(field) {
            Some(target) => Ok(&self.type_node(target)?.fields),
            None => Ok(&[]),
        }
    }

    /// The child field named `name` under the type `field` resolves to.
    pub(crate) fn child_field(
        &self,
        field: NodeIndex,
        name: &str,
    ) -> Result<Option<NodeIndex>, QueryError> {
        for child in self.child_fields(field)? {
            if self.field(*child)?.name == name {
                return Ok(Some(*child));
            }
        }
        Ok(None)
    }

    /// The weight of the edge between two adjacent vertices.
    pub(crate) fn weight_between(&self, from: NodeIndex, to: NodeIndex) -> Result<u32, QueryError> {
        let edge = self.graph.find_edge(from, to).ok_or_else(|| {
            QueryError::internal(format!(
                "No edge between vertices {} and {}",
                from.index(),
                to.index()
            ))
        })?;
        self.graph
            .edge_weight(edge)
            .copied()
            .ok_or_else(|| QueryError::internal("Edge unexpectedly missing"))
    }

    /// Total weight of a vertex path.
    pub(crate) fn path_weight(&self, path: &[NodeIndex]) -> Result<u32, QueryError> {
        path.windows(2)
            .map(|pair| self.weight_between(pair[0], pair[1]))
            .sum()
    }

    /// Keeps the field vertices of a vertex path.
    pub(crate) fn field_vertices(&self, path: &[NodeIndex]) -> Vec<NodeIndex> {
        path.iter()
            .copied()
            .filter(|index| matches!(self.graph.node_weight(*index), Some(SchemaNode::Field(_))))
            .collect()
    }

    /// Renders a path as its field names joined by `.`.
    pub(crate) fn dotted_name(&self, path: &[NodeIndex]) -> Result<String, QueryError> {
        let mut names = Vec::new();
        for index in path {
            if let SchemaNode::Field(field) = self.node_weight(*index)? {
                names.push(field.name.as_str());
            }
        }
        Ok(names.join("."))
    }
}

impl Display for SchemaGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for edge in self.graph.edge_references() {
            let (Some(source), Some(target)) = (
                self.graph.node_weight(edge.source()),
                self.graph.node_weight(edge.target()),
            ) else {
                continue;
            };
            writeln!(f, "{source} -[{}]-> {target}", edge.weight())?;
        }
        Ok(())
    }
}
