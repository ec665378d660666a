//! End-to-end scenarios over an on-disk store.
//!
//! Every test opens a fresh database in a temp dir, mutates it through
//! `ops`, and queries routes through a freshly built graph, the way the
//! front-ends do.

use rusqlite::Connection;
use tempfile::TempDir;

use tramnet_core::db::{self, query, write};
use tramnet_core::error::{NetworkError, RouteError};
use tramnet_core::graph::NetworkGraph;
use tramnet_core::model::MANUAL_LINE;
use tramnet_core::ops::{self, NewConnection, NewStop};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open() -> (TempDir, Connection) {
    let dir = tempfile::tempdir().expect("temp dir");
    let conn = db::open_store(&dir.path().join("tram_data.db")).expect("open store");
    (dir, conn)
}

fn add_stop(conn: &Connection, id: &str) {
    ops::add_stop(
        conn,
        &NewStop {
            id: id.to_string(),
            name: format!("Stop {id}"),
            coordinate: None,
        },
    )
    .expect("add stop");
}

/// Stops `{P: active, Q: active, R: inactive}`, edges `P-Q (5)`, `Q-R (3)`.
fn pqr(conn: &Connection) {
    for id in ["P", "Q", "R"] {
        add_stop(conn, id);
    }
    ops::add_connection(conn, &NewConnection::manual("P", "Q", 5)).expect("P-Q");
    ops::add_connection(conn, &NewConnection::manual("Q", "R", 3)).expect("Q-R");
    ops::set_active(conn, "R", false).expect("deactivate R");
}

// ---------------------------------------------------------------------------
// Route queries
// ---------------------------------------------------------------------------

#[test]
fn route_to_inactive_stop_is_refused() {
    let (_dir, conn) = open();
    pqr(&conn);

    let outcome = ops::find_route(&conn, "P", "R").expect("storage ok");
    assert_eq!(outcome, Err(RouteError::InactiveStop("R".into())));
}

#[test]
fn route_between_neighbours_reports_five_minutes() {
    let (_dir, conn) = open();
    pqr(&conn);

    let route = ops::find_route(&conn, "P", "Q")
        .expect("storage ok")
        .expect("route exists");
    assert_eq!(route.ids(), vec!["P", "Q"]);
    assert_eq!(route.total_minutes, 5);
    assert_eq!(route.duration_label(), "5.0 min");
}

#[test]
fn deactivating_a_stop_invalidates_held_graphs() {
    let (_dir, conn) = open();
    pqr(&conn);

    let held = NetworkGraph::build(&conn).expect("graph");
    ops::set_active(&conn, "Q", false).expect("deactivate Q");

    assert!(!held.is_current(&conn).expect("fingerprint check"));
    assert_eq!(
        ops::find_route(&conn, "P", "Q").expect("storage ok"),
        Err(RouteError::InactiveStop("Q".into()))
    );
}

#[test]
fn inactive_start_wins_even_with_a_raw_path() {
    let (_dir, conn) = open();
    pqr(&conn);

    assert_eq!(
        ops::find_route(&conn, "R", "Q").expect("storage ok"),
        Err(RouteError::InactiveStop("R".into()))
    );
}

#[test]
fn parallel_line_connections_fold_to_the_fastest() {
    let (_dir, conn) = open();
    add_stop(&conn, "X");
    add_stop(&conn, "Y");
    write::upsert_line(&conn, "lineA", "").expect("line A");
    write::upsert_line(&conn, "lineB", "").expect("line B");
    write::insert_connection(&conn, "lineA", "X", "Y", 4).expect("A");
    write::insert_connection(&conn, "lineB", "X", "Y", 2).expect("B");

    let graph = NetworkGraph::build(&conn).expect("graph");
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.link("X", "Y").expect("edge").weight, 2);

    let route = ops::find_route(&conn, "X", "Y")
        .expect("storage ok")
        .expect("route");
    assert_eq!(route.duration_label(), "2.0 min");
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[test]
fn deleting_a_stop_leaves_no_connection_behind() {
    let (_dir, conn) = open();
    pqr(&conn);
    add_stop(&conn, "S");
    ops::add_connection(&conn, &NewConnection::manual("S", "Q", 2)).expect("S-Q");

    assert!(ops::delete_stop(&conn, "Q").expect("delete Q"));

    for edge in query::list_edges(&conn, false).expect("edges") {
        assert_ne!(edge.from, "Q");
        assert_ne!(edge.to, "Q");
    }
    assert!(query::get_stop(&conn, "Q").expect("query").is_none());
    assert!(!ops::delete_stop(&conn, "Q").expect("second delete is a no-op"));
}

#[test]
fn reverse_connection_is_a_duplicate() {
    let (_dir, conn) = open();
    add_stop(&conn, "A");
    add_stop(&conn, "B");
    ops::add_connection(&conn, &NewConnection::manual("A", "B", 4)).expect("A-B");

    let err = ops::add_connection(&conn, &NewConnection::manual("B", "A", 7))
        .expect_err("B-A duplicates A-B");
    assert!(matches!(err, NetworkError::DuplicateConnection { .. }));
    assert_eq!(query::list_edges(&conn, false).expect("edges").len(), 1);
}

#[test]
fn deleting_a_connection_twice_changes_nothing_the_second_time() {
    let (_dir, conn) = open();
    pqr(&conn);

    assert_eq!(ops::delete_connection(&conn, "Q", "P").expect("first"), 1);
    let after_first = query::list_edges(&conn, false).expect("edges");
    assert_eq!(ops::delete_connection(&conn, "P", "Q").expect("second"), 0);
    assert_eq!(query::list_edges(&conn, false).expect("edges"), after_first);
}

#[test]
fn manual_connections_survive_reopening_the_store() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("tram_data.db");
    {
        let conn = db::open_store(&path).expect("first open");
        pqr(&conn);
    }
    let conn = db::open_store(&path).expect("reopen");
    let links = query::connections_between(&conn, "P", "Q").expect("links");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].line, MANUAL_LINE);
    assert!(!query::get_stop(&conn, "R").expect("q").expect("R").active);
}
