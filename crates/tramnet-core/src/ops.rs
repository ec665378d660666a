//! Mutation operations and route queries used by every front-end.
//!
//! Each mutation validates its input, checks references, and only then
//! writes, so a rejected call leaves the store untouched. None of them
//! rebuilds a graph: callers that hold a [`NetworkGraph`] must build a new
//! one after mutating. [`find_route`] always builds its own.

use rusqlite::Connection;
use serde::Deserialize;
use tracing::instrument;

use crate::db::{query, write};
use crate::error::{EntityKind, NetworkError, Result, RouteError};
use crate::graph::{GraphView, NetworkGraph, Route, shortest_path};
use crate::model::{Coordinate, MANUAL_LINE, Stop};

/// Input for [`add_stop`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewStop {
    pub id: String,
    pub name: String,
    pub coordinate: Option<Coordinate>,
}

impl NewStop {
    /// A stop whose id is derived from its name.
    #[must_use]
    pub fn named(name: &str, coordinate: Option<Coordinate>) -> Self {
        Self {
            id: stop_id_from_name(name),
            name: name.trim().to_string(),
            coordinate,
        }
    }
}

/// Stop ids are compared after trimming surrounding whitespace, in every
/// operation that takes one.
fn stop_key(id: &str) -> &str {
    id.trim()
}

/// Id used when a stop is added by name only: the trimmed name upper-cased.
#[must_use]
pub fn stop_id_from_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Input for [`add_connection`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewConnection {
    #[serde(default = "manual_line")]
    pub line: String,
    pub from: String,
    pub to: String,
    /// Signed so that non-positive input can be reported rather than
    /// rejected by the parser.
    pub weight: i64,
}

fn manual_line() -> String {
    MANUAL_LINE.to_string()
}

impl NewConnection {
    /// A manually added connection.
    #[must_use]
    pub fn manual(from: &str, to: &str, weight: i64) -> Self {
        Self {
            line: manual_line(),
            from: from.to_string(),
            to: to.to_string(),
            weight,
        }
    }
}

/// Add a stop, or update name and coordinate of an existing one. The stop is
/// active afterwards.
///
/// # Errors
///
/// [`NetworkError::Validation`] for an empty id or name or an invalid
/// coordinate, or a storage error.
#[instrument(skip(conn, stop), fields(stop_id = %stop.id))]
pub fn add_stop(conn: &Connection, stop: &NewStop) -> Result<Stop> {
    let id = stop_key(&stop.id);
    let name = stop.name.trim();
    if name.is_empty() {
        return Err(NetworkError::validation("name", "must not be empty"));
    }
    if id.is_empty() {
        return Err(NetworkError::validation("id", "must not be empty"));
    }
    // Fields are public, so a caller may have skipped `Coordinate::new`.
    let coordinate = stop
        .coordinate
        .map(|c| Coordinate::new(c.lat, c.lon))
        .transpose()?;
    let row = Stop {
        id: id.to_string(),
        name: name.to_string(),
        coordinate,
        active: true,
    };
    write::upsert_stop(conn, &row)?;
    tracing::info!(stop_id = %row.id, "stop saved");
    Ok(row)
}

/// Delete a stop and every connection touching it. Unknown ids are a no-op.
/// Returns whether the stop existed.
///
/// # Errors
///
/// Returns a storage error; on failure nothing is removed.
pub fn delete_stop(conn: &Connection, stop_id: &str) -> Result<bool> {
    let stop_id = stop_key(stop_id);
    let existed = write::delete_stop(conn, stop_id)?;
    if existed {
        tracing::info!(stop_id, "stop deleted");
    }
    Ok(existed)
}

/// Add a connection after checking it against the current graph and store.
///
/// Rejections, in order:
/// - [`NetworkError::Validation`]: weight ≤ 0, empty ids, or `from == to`
/// - [`NetworkError::Reference`]: unknown stop or line
/// - [`NetworkError::DuplicateConnection`]: the pair is already linked in
///   either direction, on any line
///
/// # Errors
///
/// See above; storage failures surface as [`NetworkError::Storage`].
#[instrument(skip(conn))]
pub fn add_connection(conn: &Connection, new: &NewConnection) -> Result<()> {
    let weight = u32::try_from(new.weight)
        .ok()
        .filter(|w| *w > 0)
        .ok_or_else(|| {
            NetworkError::validation(
                "weight",
                format!("{} is not a positive number of minutes", new.weight),
            )
        })?;
    let (from, to, line) = (stop_key(&new.from), stop_key(&new.to), new.line.trim());
    if from.is_empty() || to.is_empty() {
        return Err(NetworkError::validation("stop", "both stop ids are required"));
    }
    if from == to {
        return Err(NetworkError::validation("to", "a stop cannot connect to itself"));
    }

    for stop_id in [from, to] {
        if !query::stop_exists(conn, stop_id)? {
            return Err(NetworkError::missing(EntityKind::Stop, stop_id));
        }
    }
    if !query::line_exists(conn, line)? {
        return Err(NetworkError::missing(EntityKind::Line, line));
    }

    let duplicate = || NetworkError::DuplicateConnection {
        a: from.to_string(),
        b: to.to_string(),
    };
    let graph = NetworkGraph::build(conn)?;
    if graph.has_link(from, to) {
        return Err(duplicate());
    }
    // Links touching an inactive stop are absent from the graph.
    if !query::connections_between(conn, from, to)?.is_empty() {
        return Err(duplicate());
    }

    write::insert_connection(conn, line, from, to, weight)?;
    tracing::info!(from, to, line, weight, "connection added");
    Ok(())
}

/// Remove every connection between two stops, either direction. Removing a
/// missing connection is a no-op. Returns the number of rows removed.
///
/// # Errors
///
/// Returns a storage error if the delete fails.
pub fn delete_connection(conn: &Connection, a: &str, b: &str) -> Result<usize> {
    let (a, b) = (stop_key(a), stop_key(b));
    let removed = write::delete_connection(conn, a, b)?;
    if removed > 0 {
        tracing::info!(a, b, removed, "connection removed");
    }
    Ok(removed)
}

/// Flip a stop's active flag. Does not rebuild any graph.
///
/// # Errors
///
/// [`NetworkError::Reference`] for an unknown stop, or a storage error.
pub fn set_active(conn: &Connection, stop_id: &str, active: bool) -> Result<()> {
    let stop_id = stop_key(stop_id);
    if !write::set_stop_active(conn, stop_id, active)? {
        return Err(NetworkError::missing(EntityKind::Stop, stop_id));
    }
    tracing::info!(stop_id, active, "stop status changed");
    Ok(())
}

/// Build a fresh graph and look up the shortest route.
///
/// The outer result carries storage failures; the inner one is the route
/// outcome, where "no route" is an ordinary value.
///
/// # Errors
///
/// Returns an error only if building the graph fails.
pub fn find_route(conn: &Connection, start: &str, end: &str) -> Result<Result<Route, RouteError>> {
    let graph = NetworkGraph::build(conn)?;
    Ok(shortest_path(&graph, stop_key(start), stop_key(end)))
}

/// Wire view of a freshly built graph.
///
/// # Errors
///
/// Returns an error if building the graph fails.
pub fn network_view(conn: &Connection) -> Result<(GraphView, String)> {
    let graph = NetworkGraph::build(conn)?;
    Ok((graph.to_view(), graph.fingerprint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn network() -> Connection {
        let conn = open_in_memory().expect("store");
        for id in ["P", "Q", "R"] {
            add_stop(&conn, &NewStop::named(id, None)).expect("stop");
        }
        conn
    }

    #[test]
    fn add_stop_rejects_empty_name() {
        let conn = network();
        let err = add_stop(
            &conn,
            &NewStop {
                id: "X".into(),
                name: "  ".into(),
                coordinate: None,
            },
        )
        .expect_err("empty name");
        assert!(matches!(err, NetworkError::Validation { field: "name", .. }));
    }

    #[test]
    fn re_adding_a_stop_reactivates_it() {
        let conn = network();
        set_active(&conn, "P", false).expect("deactivate");
        add_stop(&conn, &NewStop::named("p", None)).expect("re-add");
        assert!(query::get_stop(&conn, "P").expect("query").expect("exists").active);
    }

    #[test]
    fn stop_id_from_name_upper_cases() {
        assert_eq!(stop_id_from_name(" Rondo Mogilskie "), "RONDO MOGILSKIE");
    }

    #[test]
    fn add_connection_rejects_non_positive_weight() {
        let conn = network();
        for weight in [0, -3] {
            let err = add_connection(&conn, &NewConnection::manual("P", "Q", weight))
                .expect_err("bad weight");
            assert!(matches!(err, NetworkError::Validation { field: "weight", .. }));
        }
    }

    #[test]
    fn add_connection_checks_references_before_writing() {
        let conn = network();
        let err = add_connection(&conn, &NewConnection::manual("P", "ghost", 2))
            .expect_err("unknown stop");
        assert!(matches!(
            err,
            NetworkError::Reference {
                kind: EntityKind::Stop,
                ..
            }
        ));

        let mut on_missing_line = NewConnection::manual("P", "Q", 2);
        on_missing_line.line = "77".into();
        let err = add_connection(&conn, &on_missing_line).expect_err("unknown line");
        assert!(matches!(
            err,
            NetworkError::Reference {
                kind: EntityKind::Line,
                ..
            }
        ));
        assert_eq!(query::network_stats(&conn).expect("stats").total_connections, 0);
    }

    #[test]
    fn add_connection_rejects_reverse_duplicate_across_lines() {
        let conn = network();
        write::upsert_line(&conn, "4", "").expect("line");
        write::insert_connection(&conn, "4", "P", "Q", 5).expect("imported link");

        let err = add_connection(&conn, &NewConnection::manual("Q", "P", 3))
            .expect_err("duplicate of imported link");
        assert!(matches!(err, NetworkError::DuplicateConnection { .. }));
    }

    #[test]
    fn add_connection_rejects_duplicate_touching_inactive_stop() {
        let conn = network();
        add_connection(&conn, &NewConnection::manual("Q", "R", 3)).expect("first");
        set_active(&conn, "R", false).expect("deactivate");
        let err = add_connection(&conn, &NewConnection::manual("R", "Q", 3))
            .expect_err("stored duplicate");
        assert!(matches!(err, NetworkError::DuplicateConnection { .. }));
    }

    #[test]
    fn set_active_on_unknown_stop_is_a_reference_error() {
        let conn = network();
        assert!(matches!(
            set_active(&conn, "ghost", true),
            Err(NetworkError::Reference { .. })
        ));
    }

    #[test]
    fn find_route_reflects_latest_mutation() {
        let conn = network();
        add_connection(&conn, &NewConnection::manual("P", "Q", 5)).expect("P-Q");
        let route = find_route(&conn, "P", "Q").expect("storage").expect("route");
        assert_eq!(route.duration_label(), "5.0 min");

        set_active(&conn, "Q", false).expect("deactivate");
        assert_eq!(
            find_route(&conn, "P", "Q").expect("storage"),
            Err(RouteError::InactiveStop("Q".into()))
        );
    }

    #[test]
    fn add_stop_validates_coordinate_before_writing() {
        let conn = network();
        for coordinate in [
            Coordinate { lat: 500.0, lon: 0.0 },
            Coordinate { lat: f64::NAN, lon: 19.9 },
        ] {
            let err = add_stop(
                &conn,
                &NewStop {
                    id: "X".into(),
                    name: "Xylo".into(),
                    coordinate: Some(coordinate),
                },
            )
            .expect_err("invalid coordinate");
            assert!(matches!(err, NetworkError::Validation { field: "latitude", .. }));
        }
        assert!(query::get_stop(&conn, "X").expect("query").is_none());
    }

    #[test]
    fn padded_ids_address_the_same_stops_everywhere() {
        let conn = network();
        add_connection(&conn, &NewConnection::manual(" P", "Q ", 5)).expect("P-Q");

        let route = find_route(&conn, " P", "Q ").expect("storage").expect("route");
        assert_eq!(route.total_minutes, 5);
        set_active(&conn, " R ", false).expect("deactivate padded id");
        assert!(!query::get_stop(&conn, "R").expect("query").expect("exists").active);

        assert_eq!(delete_connection(&conn, " P", "Q ").expect("delete"), 1);
        assert_eq!(query::network_stats(&conn).expect("stats").total_connections, 0);
        assert!(delete_stop(&conn, " R").expect("delete stop"));
    }

    #[test]
    fn delete_connection_twice_is_harmless() {
        let conn = network();
        add_connection(&conn, &NewConnection::manual("P", "Q", 5)).expect("P-Q");
        assert_eq!(delete_connection(&conn, "Q", "P").expect("first"), 1);
        assert_eq!(delete_connection(&conn, "P", "Q").expect("second"), 0);
    }
}
