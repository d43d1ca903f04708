use indexmap::IndexMap;
use petgraph::Direction;
use petgraph::graph::NodeIndex;

use crate::error::QueryError;
use crate::query_graph::SchemaGraph;
use crate::query_graph::SchemaNode;

/// Name-based lookups over a built [`SchemaGraph`].
#[derive(Debug, Clone)]
pub(crate) struct IndexCatalog {
    /// Every field vertex carrying a given name, in vertex order.
    field_to_idx: IndexMap<String, Vec<NodeIndex>>,
    /// Addressable names: unique field names map to their vertex, redundant ones are keyed as
    /// `<parent_field>.<field>`.
    dotted: IndexMap<String, NodeIndex>,
    /// Root fields, keyed as `<query type>.<field>`.
    roots: IndexMap<String, NodeIndex>,
    query_type_name: String,
}

impl IndexCatalog {
    pub(crate) fn new(graph: &SchemaGraph) -> Result<Self, QueryError> {
        let query_type_name = graph.type_node(graph.query_type())?.name.clone();
        let mut field_to_idx: IndexMap<String, Vec<NodeIndex>> = IndexMap::new();
        let mut dotted = IndexMap::new();
        let mut roots = IndexMap::new();

        for index in graph.graph().node_indices() {
            let SchemaNode::Field(field) = graph.node_weight(index)? else {
                continue;
            };
            field_to_idx
                .entry(field.name.clone())
                .or_default()
                .push(index);

            let parent = graph.field_parent(index)?;
            if parent == graph.query_type() {
                roots.insert(format!("{query_type_name}.{}", field.name), index);
            }
            if !field.redundant {
                dotted.insert(field.name.clone(), index);
                continue;
            }
            let mut parent_fields = graph
                .graph()
                .neighbors_directed(parent, Direction::Incoming)
                .collect::<Vec<_>>();
            parent_fields.sort();
            for parent_field in parent_fields {
                let key = format!("{}.{}", graph.field(parent_field)?.name, field.name);
                dotted.entry(key).or_insert(index);
            }
        }

        Ok(Self {
            field_to_idx,
            dotted,
            roots,
            query_type_name,
        })
    }

    pub(crate) fn field_indices(&self, name: &str) -> &[NodeIndex] {
        self.field_to_idx
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn contains_field_name(&self, name: &str) -> bool {
        self.field_to_idx.contains_key(name)
    }

    pub(crate) fn dotted_field(&self, name: &str) -> Option<NodeIndex> {
        self.dotted.get(name).copied()
    }

    pub(crate) fn root_field(&self, name: &str) -> Option<NodeIndex> {
        self.roots
            .get(&format!("{}.{name}", self.query_type_name))
            .copied()
    }

    /// Root shortcuts followed by every unqualified or dotted field name.
    pub(crate) fn addressable_fields(&self) -> impl Iterator<Item = (&str, NodeIndex)> {
        self.roots
            .iter()
            .chain(&self.dotted)
            .map(|(name, index)| (name.as_str(), *index))
    }

    /// Every `<parent_field>.<field>` key for a redundant field name, compared case-insensitively.
    pub(crate) fn get_unique_fields(
        &self,
        graph: &SchemaGraph,
        name: &str,
    ) -> Result<Vec<String>, QueryError> {
        let mut unique_fields = Vec::new();
        for (key, index) in &self.dotted {
            let Some((_, suffix)) = key.split_once('.') else {
                continue;
            };
            if suffix.eq_ignore_ascii_case(name) && graph.field(*index)?.redundant {
                unique_fields.push(key.clone());
            }
        }
        Ok(unique_fields)
    }
}
