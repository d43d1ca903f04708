use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::dijkstra;
use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

/// Every minimum-weight path between two vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ShortestPaths {
    pub(crate) weight: u32,
    /// Vertex paths from source to target inclusive, sorted and deduplicated.
    pub(crate) paths: Vec<Vec<NodeIndex>>,
}

/// Computes all minimum-weight paths from `source` to `target`, or `None` if `target` is
/// unreachable.
///
/// Distances come from a single Dijkstra run; paths are then recovered by walking back from
/// `target` along every incoming edge that lies on some shortest path. Edge weights must be
/// positive.
pub(crate) fn all_shortest_paths<N>(
    graph: &DiGraph<N, u32>,
    source: NodeIndex,
    target: NodeIndex,
) -> Option<ShortestPaths> {
    let distances: HashMap<NodeIndex, u32> =
        dijkstra(graph, source, Some(target), |edge| *edge.weight());
    let weight = *distances.get(&target)?;

    let mut paths = Vec::new();
    // Partial paths, stored target first.
    let mut frontier = vec![vec![target]];
    while let Some(partial) = frontier.pop() {
        let Some(&head) = partial.last() else {
            continue;
        };
        if head == source {
            let mut path = partial;
            path.reverse();
            paths.push(path);
            continue;
        }
        let Some(&head_distance) = distances.get(&head) else {
            continue;
        };
        for edge in graph.edges_directed(head, Direction::Incoming) {
            let predecessor = edge.source();
            let on_shortest_path = distances
                .get(&predecessor)
                .is_some_and(|distance| distance + edge.weight() == head_distance);
            if on_shortest_path && !partial.contains(&predecessor) {
                let mut extended = partial.clone();
                extended.push(predecessor);
                frontier.push(extended);
            }
        }
    }
    paths.sort();
    paths.dedup();
    Some(ShortestPaths { weight, paths })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond(left: u32, right: u32) -> (DiGraph<&'static str, u32>, Vec<NodeIndex>) {
        let mut graph = DiGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        let d = graph.add_node("d");
        graph.add_edge(a, b, left);
        graph.add_edge(a, c, right);
        graph.add_edge(b, d, 1);
        graph.add_edge(c, d, 1);
        (graph, vec![a, b, c, d])
    }

    #[test]
    fn returns_every_tied_path() {
        let (graph, nodes) = diamond(1, 1);
        let shortest = all_shortest_paths(&graph, nodes[0], nodes[3]).unwrap();
        assert_eq!(shortest.weight, 2);
        assert_eq!(
            shortest.paths,
            vec![
                vec![nodes[0], nodes[1], nodes[3]],
                vec![nodes[0], nodes[2], nodes[3]],
            ]
        );
    }

    #[test]
    fn heavier_edges_break_ties() {
        let (graph, nodes) = diamond(1, 2);
        let shortest = all_shortest_paths(&graph, nodes[0], nodes[3]).unwrap();
        assert_eq!(shortest.weight, 2);
        assert_eq!(shortest.paths, vec![vec![nodes[0], nodes[1], nodes[3]]]);
    }

    #[test]
    fn unreachable_target_has_no_paths() {
        let (graph, nodes) = diamond(1, 1);
        assert_eq!(all_shortest_paths(&graph, nodes[3], nodes[0]), None);
    }

    #[test]
    fn source_is_its_own_shortest_path() {
        let (graph, nodes) = diamond(1, 1);
        let shortest = all_shortest_paths(&graph, nodes[1], nodes[1]).unwrap();
        assert_eq!(shortest.weight, 0);
        assert_eq!(shortest.paths, vec![vec![nodes[1]]]);
    }

    #[test]
    fn cycles_do_not_loop() {
        let (mut graph, nodes) = diamond(1, 1);
        graph.add_edge(nodes[3], nodes[0], 1);
        let shortest = all_shortest_paths(&graph, nodes[0], nodes[3]).unwrap();
        assert_eq!(shortest.paths.len(), 2);
    }
}
