//! Shortest-path queries over the active part of a [`NetworkGraph`].
//!
//! Dijkstra with integer minute weights. Among several minimum-weight paths
//! the one whose stop-id sequence is lexicographically smallest wins, so the
//! answer does not depend on insertion order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::instrument;

use super::build::NetworkGraph;
use crate::error::RouteError;

/// One stop along a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteStop {
    pub id: String,
    pub name: String,
}

/// A successful route: stops from start to end inclusive and total minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub stops: Vec<RouteStop>,
    pub total_minutes: u64,
}

impl Route {
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.stops.iter().map(|s| s.id.as_str()).collect()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.stops.iter().map(|s| s.name.as_str()).collect()
    }

    /// Total duration as shown to users, e.g. `"5.0 min"`.
    #[must_use]
    pub fn duration_label(&self) -> String {
        format!("{}.0 min", self.total_minutes)
    }
}

/// Find the shortest route from `start` to `end` over active stops only.
///
/// Checks run in this order, so an inactive start is reported even when the
/// end is unknown:
///
/// 1. `start` unknown → [`RouteError::UnknownStop`]
/// 2. `start` inactive → [`RouteError::InactiveStop`]
/// 3. same two checks for `end`
/// 4. no active path → [`RouteError::NoPath`]
///
/// # Errors
///
/// Returns the [`RouteError`] describing why no route exists.
#[instrument(skip(graph))]
pub fn shortest_path(graph: &NetworkGraph, start: &str, end: &str) -> Result<Route, RouteError> {
    let start_idx = resolve_active(graph, start)?;
    let end_idx = resolve_active(graph, end)?;

    let Some((total, path)) = dijkstra(graph, start_idx, end_idx) else {
        return Err(RouteError::NoPath {
            from: start.to_string(),
            to: end.to_string(),
        });
    };

    let stops = path
        .into_iter()
        .map(|idx| {
            let node = &graph.graph[idx];
            RouteStop {
                id: node.id.clone(),
                name: node.name.clone(),
            }
        })
        .collect();

    Ok(Route {
        stops,
        total_minutes: total,
    })
}

fn resolve_active(graph: &NetworkGraph, stop_id: &str) -> Result<NodeIndex, RouteError> {
    let idx = graph
        .node_index(stop_id)
        .ok_or_else(|| RouteError::UnknownStop(stop_id.to_string()))?;
    if !graph.graph[idx].active {
        return Err(RouteError::InactiveStop(stop_id.to_string()));
    }
    Ok(idx)
}

/// Returns `(cost, node path)` or `None` when `end` is unreachable.
///
/// Heap entries order by cost then id sequence, so the first time a node is
/// popped it carries its lexicographically smallest minimum-cost path. This
/// relies on every weight being positive.
fn dijkstra(
    graph: &NetworkGraph,
    start: NodeIndex,
    end: NodeIndex,
) -> Option<(u64, Vec<NodeIndex>)> {
    type Entry<'g> = Reverse<(u64, Vec<&'g str>, Vec<NodeIndex>)>;

    let g = &graph.graph;
    let mut best: HashMap<NodeIndex, u64> = HashMap::new();
    let mut settled: HashSet<NodeIndex> = HashSet::new();
    let mut heap: BinaryHeap<Entry<'_>> = BinaryHeap::new();

    best.insert(start, 0);
    heap.push(Reverse((0, vec![g[start].id.as_str()], vec![start])));

    while let Some(Reverse((cost, ids, nodes))) = heap.pop() {
        let Some(&node) = nodes.last() else {
            continue;
        };
        if !settled.insert(node) {
            continue;
        }
        if node == end {
            return Some((cost, nodes));
        }

        for edge in g.edges(node) {
            let link = edge.weight();
            let next = if edge.source() == node {
                edge.target()
            } else {
                edge.source()
            };
            // Re-derive the active restriction rather than trusting edge tags.
            if !link.active || !g[next].active || settled.contains(&next) {
                continue;
            }
            let next_cost = cost + u64::from(link.weight);
            if best.get(&next).is_some_and(|&known| next_cost > known) {
                continue;
            }
            best.insert(next, next_cost);

            let mut next_ids = ids.clone();
            next_ids.push(g[next].id.as_str());
            let mut next_nodes = nodes.clone();
            next_nodes.push(next);
            heap.push(Reverse((next_cost, next_ids, next_nodes)));
        }
    }

    None
}
