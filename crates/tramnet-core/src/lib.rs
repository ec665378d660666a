#![forbid(unsafe_code)]
//! tramnet-core library.
//!
//! Tram network store, graph builder, path finder and mutation operations.
//! The `SQLite` store is the only source of truth; graphs are rebuilt from it
//! whenever a caller needs one.
//!
//! # Conventions
//!
//! - **Errors**: store and mutation code returns [`error::Result`] with typed
//!   [`error::NetworkError`]s; route failures are [`error::RouteError`]
//!   values; `anyhow::Result` only at open/config boundaries.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod import;
pub mod model;
pub mod ops;

pub use error::{ErrorCode, NetworkError, RouteError};
pub use graph::{NetworkGraph, Route, shortest_path};
