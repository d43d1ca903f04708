use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::Direction;
use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use tracing::debug;
use tracing::warn;

use crate::error::QueryError;
use crate::introspection::IntrospectionSchema;
use crate::introspection::field_name;
use crate::query_graph::FieldNode;
use crate::query_graph::SchemaGraph;
use crate::query_graph::SchemaNode;
use crate::query_graph::TypeNode;

const DEFAULT_EDGE_WEIGHT: u32 = 1;

/// Builds the schema graph of every type reachable from the query type.
///
/// `weight_overrides` sets the weight of the edges from the named types to their fields. Overrides
/// naming a type that isn't reachable are ignored.
pub(crate) fn build_schema_graph(
    introspection: &IntrospectionSchema,
    weight_overrides: &IndexMap<String, u32>,
) -> Result<SchemaGraph, QueryError> {
    let mut builder = SchemaGraphBuilder::new(introspection);
    let query_type = builder.add_type(&introspection.query_type.name)?;
    let mut graph = builder.graph;
    let types_to_nodes = builder.types_to_nodes;

    for (type_name, weight) in weight_overrides {
        let Some(type_index) = types_to_nodes.get(type_name) else {
            warn!(type_name, weight, "ignoring edge weight override for unknown type");
            continue;
        };
        let edges = graph
            .edges_directed(*type_index, Direction::Outgoing)
            .map(|edge| edge.id())
            .collect::<Vec<_>>();
        for edge in edges {
            if let Some(edge_weight) = graph.edge_weight_mut(edge) {
                *edge_weight = *weight;
            }
        }
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        types = types_to_nodes.len(),
        "built schema graph"
    );
    Ok(SchemaGraph {
        graph,
        types_to_nodes,
        query_type,
    })
}

struct SchemaGraphBuilder<'a> {
    introspection: &'a IntrospectionSchema,
    /// How many object and interface types declare each field name.
    field_counts: HashMap<&'a str, usize>,
    graph: DiGraph<SchemaNode, u32>,
    types_to_nodes: IndexMap<String, NodeIndex>,
}

impl<'a> SchemaGraphBuilder<'a> {
    fn new(introspection: &'a IntrospectionSchema) -> Self {
        Self {
            introspection,
            field_counts: introspection.field_name_counts(),
            graph: DiGraph::new(),
            types_to_nodes: IndexMap::new(),
        }
    }

    /// Adds a type vertex and all its field vertices, then recurses into the types composite
    /// fields resolve to. A type vertex is registered before its fields are visited, so cyclic
    /// references resolve to the existing vertex.
    fn add_type(&mut self, type_name: &str) -> Result<NodeIndex, QueryError> {
        let introspection = self.introspection;
        let full_type = introspection.get_type(type_name).ok_or_else(|| {
            QueryError::schema_ingestion(format!(
                "type \"{type_name}\" is referenced but not declared"
            ))
        })?;
        let type_index = self.graph.add_node(SchemaNode::Type(TypeNode {
            name: type_name.to_owned(),
            index: NodeIndex::end(),
            fields: Vec::new(),
        }));
        self.types_to_nodes.insert(type_name.to_owned(), type_index);

        let mut fields = Vec::with_capacity(full_type.fields().len());
        for field in full_type.fields() {
            let name = field_name(field, type_name)?;
            let owner = format!("field \"{type_name}.{name}\"");
            let ty = field
                .ty
                .as_ref()
                .ok_or_else(|| QueryError::schema_ingestion(format!("missing type of {owner}")))?
                .unwrap_type(&owner)?;
            let field_index = self.graph.add_node(SchemaNode::Field(FieldNode {
                name: name.to_owned(),
                parent: type_index,
                kind: ty.outer_kind(),
                element_kind: ty.kind,
                target_type: ty.name.clone(),
                redundant: self.field_counts.get(name).copied().unwrap_or_default() > 1,
                description: field.description.clone(),
                index: NodeIndex::end(),
            }));
            if let Some(SchemaNode::Field(node)) = self.graph.node_weight_mut(field_index) {
                node.index = field_index;
            }
            self.graph
                .add_edge(type_index, field_index, DEFAULT_EDGE_WEIGHT);
            fields.push((field_index, ty));
        }

        if let Some(SchemaNode::Type(node)) = self.graph.node_weight_mut(type_index) {
            node.index = type_index;
            node.fields = fields.iter().map(|(index, _)| *index).collect();
        }

        for (field_index, ty) in fields {
            if !ty.kind.is_composite() {
                continue;
            }
            let target_index = match self.types_to_nodes.get(&ty.name) {
                Some(index) => *index,
                None => self.add_type(&ty.name)?,
            };
            self.graph
                .add_edge(field_index, target_index, DEFAULT_EDGE_WEIGHT);
        }
        Ok(type_index)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::introspection::TypeKind;

    fn object(name: &str, fields: serde_json::Value) -> serde_json::Value {
        json!({"kind": "OBJECT", "name": name, "fields": fields})
    }

    fn field(name: &str, ty: serde_json::Value) -> serde_json::Value {
        json!({"name": name, "args": [], "type": ty})
    }

    fn cyclic_schema() -> IntrospectionSchema {
        IntrospectionSchema::from_value(json!({
            "queryType": {"name": "Query"},
            "types": [
                object("Query", json!([
                    field("entry", json!({"kind": "OBJECT", "name": "Entry"}))
                ])),
                object("Entry", json!([
                    field("id", json!({"kind": "NON_NULL", "ofType": {"kind": "SCALAR", "name": "String"}})),
                    field("entities", json!({"kind": "LIST", "ofType": {"kind": "OBJECT", "name": "Entity"}}))
                ])),
                object("Entity", json!([
                    field("id", json!({"kind": "SCALAR", "name": "String"})),
                    field("entry", json!({"kind": "OBJECT", "name": "Entry"}))
                ])),
                object("Unreachable", json!([
                    field("id", json!({"kind": "SCALAR", "name": "String"}))
                ]))
            ]
        }))
        .unwrap()
    }

    #[test]
    fn builds_types_depth_first() {
        let graph = build_schema_graph(&cyclic_schema(), &IndexMap::new()).unwrap();
        assert_eq!(
            graph.types_to_nodes().keys().collect::<Vec<_>>(),
            vec!["Query", "Entry", "Entity"]
        );
        // Query, entry, Entry, id, entities, Entity, id, entry
        assert_eq!(graph.node_count(), 8);
        // 5 ownership edges and 3 resolution edges, the cycle back to Entry included.
        assert_eq!(graph.edge_count(), 8);

        let entry = graph.type_by_name("Entry").unwrap();
        assert_eq!(entry.index, NodeIndex::new(2));
        assert_eq!(entry.fields, vec![NodeIndex::new(3), NodeIndex::new(4)]);

        let entities = graph.field(NodeIndex::new(4)).unwrap();
        assert_eq!(entities.kind, TypeKind::List);
        assert_eq!(entities.element_kind, TypeKind::Object);
        assert_eq!(entities.target_type, "Entity");
        assert_eq!(entities.parent, NodeIndex::new(2));
        assert_eq!(graph.field_target(NodeIndex::new(7)), Some(NodeIndex::new(2)));
    }

    #[test]
    fn marks_redundant_fields_across_all_types() {
        let graph = build_schema_graph(&cyclic_schema(), &IndexMap::new()).unwrap();
        let id = graph.field(NodeIndex::new(3)).unwrap();
        assert!(id.redundant);
        // `entry` is declared by Query and Entity.
        assert!(graph.field(NodeIndex::new(1)).unwrap().redundant);
        assert!(!graph.field(NodeIndex::new(4)).unwrap().redundant);
    }

    #[test]
    fn applies_weight_overrides_to_owned_fields() {
        let overrides = IndexMap::from([("Entity".to_owned(), 3), ("Missing".to_owned(), 5)]);
        let graph = build_schema_graph(&cyclic_schema(), &overrides).unwrap();
        let entity = graph.type_by_name("Entity").unwrap().index;
        for field in &graph.type_by_name("Entity").unwrap().fields {
            assert_eq!(graph.weight_between(entity, *field).unwrap(), 3);
        }
        // Edges into the type keep the default weight.
        assert_eq!(
            graph
                .weight_between(NodeIndex::new(4), entity)
                .unwrap(),
            1
        );
    }

    #[test]
    fn undeclared_types_are_reported() {
        let mut schema = cyclic_schema();
        schema.types.retain(|ty| ty.name != "Entity");
        let error = build_schema_graph(&schema, &IndexMap::new()).unwrap_err();
        assert_eq!(
            error,
            QueryError::schema_ingestion("type \"Entity\" is referenced but not declared")
        );
    }
}
