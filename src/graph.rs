//! Module for creating and analysing the graph of regions connected by transmission links
use crate::link::LinkID;
use crate::region::RegionID;
use crate::topology::Topology;
use indexmap::IndexMap;
use petgraph::Undirected;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// A graph with a node per region and an edge per link
type RegionGraph = Graph<RegionID, LinkID, Undirected>;

/// Creates an undirected graph of the regions in `topology`.
///
/// Link direction and capacity are ignored: two regions are adjacent if any link joins them.
fn create_region_graph(topology: &Topology) -> RegionGraph {
    let mut graph = Graph::new_undirected();
    let nodes: HashMap<&RegionID, NodeIndex> = topology
        .regions()
        .keys()
        .map(|id| (id, graph.add_node(id.clone())))
        .collect();

    for link in topology.links().values() {
        graph.add_edge(
            nodes[&link.from_region],
            nodes[&link.to_region],
            link.id.clone(),
        );
    }

    graph
}

/// Find the groups of regions which are connected to one another by links.
///
/// Islands are returned in order of their first region, with regions in topology order.
pub fn find_islands(topology: &Topology) -> Vec<Vec<RegionID>> {
    let graph = create_region_graph(topology);
    let mut union_find = UnionFind::<usize>::new(graph.node_count());
    for edge in graph.edge_references() {
        union_find.union(edge.source().index(), edge.target().index());
    }

    let mut islands: IndexMap<usize, Vec<RegionID>> = IndexMap::new();
    for (node, label) in graph.node_indices().zip(union_find.into_labeling()) {
        islands.entry(label).or_default().push(graph[node].clone());
    }

    islands.into_values().collect()
}
