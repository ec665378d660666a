//! Graph construction from the network store.
//!
//! # Overview
//!
//! [`NetworkGraph::build`] reads the store and produces an undirected
//! [`petgraph`] graph:
//!
//! - every stop becomes a node tagged with its active flag
//! - every connection whose two endpoints are active becomes an edge
//!
//! ## Parallel Edges
//!
//! The store is a multigraph (one row per stop pair per line). The search
//! graph is simple: parallel connections fold to one edge carrying the
//! minimum weight and the set of lines that serve the pair.
//!
//! ## Determinism
//!
//! Nodes are inserted in stop-id order and edges in canonical pair order, so
//! two builds of the same snapshot produce identical node and edge indices.
//!
//! ## Staleness
//!
//! The graph carries a BLAKE3 fingerprint of the snapshot it was built from.
//! It is never patched in place; [`NetworkGraph::is_current`] tells a caller
//! holding one across a mutation whether it must rebuild.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rusqlite::Connection;
use serde::Serialize;
use tracing::instrument;

use crate::db::query;
use crate::error::Result;
use crate::model::{Connection as StoredConnection, Coordinate, Stop, StopPair};

// ---------------------------------------------------------------------------
// Node and edge payloads
// ---------------------------------------------------------------------------

/// Node payload: one stop.
#[derive(Debug, Clone, PartialEq)]
pub struct StopNode {
    pub id: String,
    pub name: String,
    pub coordinate: Option<Coordinate>,
    pub active: bool,
}

/// Edge payload: the folded connections between two stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Fastest known travel time in minutes.
    pub weight: u32,
    /// Lines that connect the pair.
    pub lines: BTreeSet<String>,
    /// Always true: edges are only built between two active stops.
    pub active: bool,
}

// ---------------------------------------------------------------------------
// NetworkGraph
// ---------------------------------------------------------------------------

/// An undirected weighted graph of the tram network.
#[derive(Debug)]
pub struct NetworkGraph {
    /// Nodes = stops, edges = folded active connections.
    pub graph: UnGraph<StopNode, Link>,
    /// Mapping from stop id to petgraph `NodeIndex`.
    pub node_map: HashMap<String, NodeIndex>,
    /// BLAKE3 fingerprint of the snapshot this graph was built from.
    pub fingerprint: String,
}

impl NetworkGraph {
    /// Build a [`NetworkGraph`] from the current store snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if a store query fails.
    #[instrument(skip(conn))]
    pub fn build(conn: &Connection) -> Result<Self> {
        let stops = query::list_stop_details(conn)?;
        let connections = query::list_connections(conn, true)?;
        let graph = Self::from_parts(stops, &connections);
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            fingerprint = %graph.fingerprint,
            "built network graph"
        );
        Ok(graph)
    }

    /// Build a graph from already-loaded rows.
    ///
    /// Connections touching an unknown or inactive stop are skipped, so the
    /// result is the same whether or not the caller pre-filtered them.
    #[must_use]
    pub fn from_parts(mut stops: Vec<Stop>, connections: &[StoredConnection]) -> Self {
        stops.sort_by(|a, b| a.id.cmp(&b.id));

        let mut graph = UnGraph::<StopNode, Link>::with_capacity(stops.len(), connections.len());
        let mut node_map: HashMap<String, NodeIndex> = HashMap::with_capacity(stops.len());

        for stop in stops {
            let id = stop.id.clone();
            let idx = graph.add_node(StopNode {
                id: stop.id,
                name: stop.name,
                coordinate: stop.coordinate,
                active: stop.active,
            });
            node_map.insert(id, idx);
        }

        let is_active = |id: &str| {
            node_map
                .get(id)
                .is_some_and(|&idx| graph[idx].active)
        };

        let mut folded: BTreeMap<StopPair, Link> = BTreeMap::new();
        for conn in connections {
            if !is_active(&conn.from) || !is_active(&conn.to) {
                continue;
            }
            let pair = conn.pair();
            if pair.is_loop() {
                continue;
            }
            folded
                .entry(pair)
                .and_modify(|link| {
                    link.weight = link.weight.min(conn.weight);
                    link.lines.insert(conn.line.clone());
                })
                .or_insert_with(|| Link {
                    weight: conn.weight,
                    lines: BTreeSet::from([conn.line.clone()]),
                    active: true,
                });
        }

        let fingerprint = compute_fingerprint(&graph, &folded);

        for (pair, link) in folded {
            // Both endpoints were checked by `is_active` above.
            if let (Some(&lo), Some(&hi)) = (node_map.get(pair.lo()), node_map.get(pair.hi())) {
                graph.add_edge(lo, hi, link);
            }
        }

        Self {
            graph,
            node_map,
            fingerprint,
        }
    }

    /// Return the number of nodes (stops) in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of edges (folded connections) in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Look up the `NodeIndex` for a stop id.
    #[must_use]
    pub fn node_index(&self, stop_id: &str) -> Option<NodeIndex> {
        self.node_map.get(stop_id).copied()
    }

    #[must_use]
    pub fn stop(&self, stop_id: &str) -> Option<&StopNode> {
        self.node_index(stop_id).map(|idx| &self.graph[idx])
    }

    /// The folded edge between `a` and `b`, in either direction.
    #[must_use]
    pub fn link(&self, a: &str, b: &str) -> Option<&Link> {
        let (a, b) = (self.node_index(a)?, self.node_index(b)?);
        self.graph.find_edge(a, b).map(|edge| &self.graph[edge])
    }

    #[must_use]
    pub fn has_link(&self, a: &str, b: &str) -> bool {
        self.link(a, b).is_some()
    }

    /// Whether the store still holds the snapshot this graph was built from.
    ///
    /// # Errors
    ///
    /// Returns an error if a store query fails.
    pub fn is_current(&self, conn: &Connection) -> Result<bool> {
        Ok(Self::build(conn)?.fingerprint == self.fingerprint)
    }

    /// Wire view of the graph: nodes in id order, edges in pair order.
    #[must_use]
    pub fn to_view(&self) -> GraphView {
        let nodes = self
            .graph
            .node_indices()
            .map(|idx| {
                let node = &self.graph[idx];
                NodeView {
                    id: node.id.clone(),
                    label: node.name.clone(),
                    active: node.active,
                    x: node.coordinate.map(|c| c.lon),
                    y: node.coordinate.map(|c| c.lat),
                }
            })
            .collect();

        let edges = self
            .graph
            .edge_references()
            .map(|edge| EdgeView {
                from: self.graph[edge.source()].id.clone(),
                to: self.graph[edge.target()].id.clone(),
                weight: edge.weight().weight,
            })
            .collect();

        GraphView { nodes, edges }
    }
}

// ---------------------------------------------------------------------------
// Wire view
// ---------------------------------------------------------------------------

/// Serializable network graph: `{nodes: [...], edges: [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    pub active: bool,
    /// Longitude.
    pub x: Option<f64>,
    /// Latitude.
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeView {
    pub from: String,
    pub to: String,
    pub weight: u32,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// BLAKE3 over node ids with their active flag, then folded edges.
fn compute_fingerprint(graph: &UnGraph<StopNode, Link>, folded: &BTreeMap<StopPair, Link>) -> String {
    let mut hasher = blake3::Hasher::new();
    for node in graph.node_weights() {
        hasher.update(node.id.as_bytes());
        hasher.update(if node.active { b"\x01" } else { b"\x00" });
        hasher.update(b"\x00");
    }
    hasher.update(b"\xff");
    for (pair, link) in folded {
        hasher.update(pair.lo().as_bytes());
        hasher.update(b"\x00");
        hasher.update(pair.hi().as_bytes());
        hasher.update(b"\x00");
        hasher.update(&link.weight.to_le_bytes());
    }
    format!("blake3:{}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_in_memory, write};
    use crate::model::MANUAL_LINE;

    fn setup(stops: &[(&str, bool)]) -> Connection {
        let conn = open_in_memory().expect("in-memory store");
        for (id, active) in stops {
            write::upsert_stop(
                &conn,
                &Stop {
                    id: (*id).to_string(),
                    name: format!("Stop {id}"),
                    coordinate: None,
                    active: *active,
                },
            )
            .expect("insert stop");
        }
        conn
    }

    #[test]
    fn empty_store_produces_empty_graph() {
        let conn = setup(&[]);
        let graph = NetworkGraph::build(&conn).expect("build graph");
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.fingerprint.starts_with("blake3:"));
    }

    #[test]
    fn inactive_stops_are_nodes_without_edges() {
        let conn = setup(&[("P", true), ("Q", true), ("R", false)]);
        write::insert_connection(&conn, MANUAL_LINE, "P", "Q", 5).expect("P-Q");
        write::insert_connection(&conn, MANUAL_LINE, "Q", "R", 3).expect("Q-R");

        let graph = NetworkGraph::build(&conn).expect("build graph");
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_link("Q", "P"));
        assert!(!graph.has_link("Q", "R"));
        assert!(!graph.stop("R").expect("R is a node").active);
    }

    #[test]
    fn parallel_connections_fold_to_minimum_weight() {
        let conn = setup(&[("X", true), ("Y", true)]);
        write::upsert_line(&conn, "A", "").expect("line A");
        write::upsert_line(&conn, "B", "").expect("line B");
        write::insert_connection(&conn, "A", "X", "Y", 4).expect("line A edge");
        write::insert_connection(&conn, "B", "Y", "X", 2).expect("line B edge");

        let graph = NetworkGraph::build(&conn).expect("build graph");
        assert_eq!(graph.edge_count(), 1);
        let link = graph.link("X", "Y").expect("folded edge");
        assert_eq!(link.weight, 2);
        assert_eq!(link.lines, BTreeSet::from(["A".to_string(), "B".to_string()]));
    }

    #[test]
    fn fingerprint_tracks_mutations() {
        let conn = setup(&[("P", true), ("Q", true)]);
        write::insert_connection(&conn, MANUAL_LINE, "P", "Q", 5).expect("P-Q");

        let graph = NetworkGraph::build(&conn).expect("build graph");
        assert!(graph.is_current(&conn).expect("check"));

        write::set_stop_active(&conn, "Q", false).expect("deactivate");
        assert!(!graph.is_current(&conn).expect("check"));

        let rebuilt = NetworkGraph::build(&conn).expect("rebuild");
        assert!(!rebuilt.has_link("P", "Q"));
    }

    #[test]
    fn build_is_deterministic() {
        let conn = setup(&[("C", true), ("A", true), ("B", true)]);
        write::insert_connection(&conn, MANUAL_LINE, "C", "A", 1).expect("C-A");
        write::insert_connection(&conn, MANUAL_LINE, "B", "A", 2).expect("B-A");

        let first = NetworkGraph::build(&conn).expect("first");
        let second = NetworkGraph::build(&conn).expect("second");
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.to_view(), second.to_view());
        let ids: Vec<_> = first.to_view().nodes.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn view_maps_longitude_to_x_and_latitude_to_y() {
        let conn = setup(&[]);
        write::upsert_stop(
            &conn,
            &Stop {
                id: "S".into(),
                name: "Somewhere".into(),
                coordinate: Some(Coordinate::new(50.0, 19.9).expect("coordinate")),
                active: true,
            },
        )
        .expect("stop");

        let view = NetworkGraph::build(&conn).expect("build").to_view();
        assert_eq!(view.nodes[0].label, "Somewhere");
        assert_eq!(view.nodes[0].x, Some(19.9));
        assert_eq!(view.nodes[0].y, Some(50.0));
    }

    #[test]
    fn from_parts_skips_links_to_unknown_stops() {
        let stops = vec![Stop {
            id: "A".into(),
            name: "A".into(),
            coordinate: None,
            active: true,
        }];
        let links = vec![StoredConnection {
            line: MANUAL_LINE.into(),
            from: "A".into(),
            to: "ghost".into(),
            weight: 1,
        }];
        let graph = NetworkGraph::from_parts(stops, &links);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }
}
