//! Derived search graph for route queries.
//!
//! # Overview
//!
//! The graph is a disposable cache over the store, never authoritative:
//!
//! ```text
//! SQLite stops + connections
//!        ↓  build::NetworkGraph::build()
//! NetworkGraph (UnGraph, parallel edges folded to min weight)
//!        ↓  path::shortest_path()
//! Route | RouteError
//! ```
//!
//! Build a fresh graph at the start of every operation that needs one and
//! drop it afterwards. A graph held across a mutation can be checked with
//! [`NetworkGraph::is_current`].
//!
//! ## Typical Usage
//!
//! ```rust,ignore
//! use tramnet_core::graph::{NetworkGraph, shortest_path};
//!
//! let graph = NetworkGraph::build(&conn)?;
//! match shortest_path(&graph, "P", "Q") {
//!     Ok(route) => println!("{} ({})", route.names().join(" → "), route.duration_label()),
//!     Err(reason) => println!("no route: {reason}"),
//! }
//! ```

pub mod build;
pub mod path;

pub use build::{EdgeView, GraphView, Link, NetworkGraph, NodeView, StopNode};
pub use path::{Route, RouteStop, shortest_path};
