//! `SQLite` read helpers for the network store.
//!
//! All functions take a shared `&Connection` and return typed structs (never
//! raw rows). Each call is a single statement or a read inside one implicit
//! transaction; no state is kept between calls.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Weekday;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::instrument;

use crate::error::Result;
use crate::model::{
    Connection as Link, Coordinate, EdgeRow, Line, NetworkStats, Stop, StopConnection,
    StopSummary, StopsByStatus, TrafficSample,
};

const STOP_COLUMNS: &str = "stop_id, stop_name, latitude, longitude, active";

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn stop_from_row(row: &Row<'_>) -> rusqlite::Result<Stop> {
    let lat: Option<f64> = row.get(2)?;
    let lon: Option<f64> = row.get(3)?;
    let coordinate = match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinate { lat, lon }),
        _ => None,
    };
    Ok(Stop {
        id: row.get(0)?,
        name: row.get(1)?,
        coordinate,
        active: row.get::<_, i64>(4)? != 0,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<StopSummary> {
    Ok(StopSummary {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        line: row.get(0)?,
        from: row.get(1)?,
        to: row.get(2)?,
        weight: row.get(3)?,
    })
}

/// Weekday for a stored `day_of_week` index (Monday = 0).
pub(crate) const fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Stops
// ---------------------------------------------------------------------------

/// All stops as `(id, name)`, alphabetical by name.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_stops(conn: &Connection) -> Result<Vec<StopSummary>> {
    let mut stmt = conn.prepare(
        "SELECT stop_id, stop_name FROM stops ORDER BY stop_name COLLATE NOCASE, stop_id",
    )?;
    let rows = stmt
        .query_map([], summary_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// All stops with every column, ordered by id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_stop_details(conn: &Connection) -> Result<Vec<Stop>> {
    let mut stmt = conn.prepare(&format!("SELECT {STOP_COLUMNS} FROM stops ORDER BY stop_id"))?;
    let rows = stmt
        .query_map([], stop_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Active and inactive stops, each alphabetical by name.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_stops_by_status(conn: &Connection) -> Result<StopsByStatus> {
    let mut stmt = conn.prepare(
        "SELECT stop_id, stop_name, active FROM stops
         ORDER BY stop_name COLLATE NOCASE, stop_id",
    )?;
    let mut by_status = StopsByStatus::default();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let summary = summary_from_row(row)?;
        if row.get::<_, i64>(2)? != 0 {
            by_status.active.push(summary);
        } else {
            by_status.inactive.push(summary);
        }
    }
    Ok(by_status)
}

/// Fetch a single stop by exact id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_stop(conn: &Connection, stop_id: &str) -> Result<Option<Stop>> {
    let stop = conn
        .query_row(
            &format!("SELECT {STOP_COLUMNS} FROM stops WHERE stop_id = ?1"),
            params![stop_id],
            stop_from_row,
        )
        .optional()?;
    Ok(stop)
}

/// # Errors
///
/// Returns an error if the database query fails.
pub fn stop_exists(conn: &Connection, stop_id: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM stops WHERE stop_id = ?1)",
        params![stop_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Map of upper-cased stop name to the ids carrying that name.
///
/// Case folding happens in Rust so non-ASCII names match too.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn stop_ids_by_name(conn: &Connection) -> Result<HashMap<String, Vec<String>>> {
    let mut stmt = conn.prepare("SELECT stop_id, stop_name FROM stops ORDER BY stop_id")?;
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let summary = summary_from_row(row)?;
        index
            .entry(summary.name.to_uppercase())
            .or_default()
            .push(summary.id);
    }
    Ok(index)
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// Every stored connection, optionally only those between two active stops.
///
/// Ordered by canonical pair then line so downstream builds are deterministic.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip(conn))]
pub fn list_connections(conn: &Connection, active_only: bool) -> Result<Vec<Link>> {
    let sql = if active_only {
        "SELECT c.line_number, c.from_stop, c.to_stop, c.weight
         FROM connections c
         JOIN stops s1 ON c.from_stop = s1.stop_id AND s1.active = 1
         JOIN stops s2 ON c.to_stop = s2.stop_id AND s2.active = 1
         ORDER BY c.stop_lo, c.stop_hi, c.line_number"
    } else {
        "SELECT line_number, from_stop, to_stop, weight
         FROM connections
         ORDER BY stop_lo, stop_hi, line_number"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], link_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Edges as `(from, to, weight)`; with `active_only` both endpoints must be
/// active.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_edges(conn: &Connection, active_only: bool) -> Result<Vec<EdgeRow>> {
    Ok(list_connections(conn, active_only)?
        .into_iter()
        .map(|link| EdgeRow {
            from: link.from,
            to: link.to,
            weight: link.weight,
        })
        .collect())
}

/// Connections joining `a` and `b` in either direction, on any line.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn connections_between(conn: &Connection, a: &str, b: &str) -> Result<Vec<Link>> {
    let mut stmt = conn.prepare(
        "SELECT line_number, from_stop, to_stop, weight
         FROM connections
         WHERE (from_stop = ?1 AND to_stop = ?2) OR (from_stop = ?2 AND to_stop = ?1)
         ORDER BY line_number",
    )?;
    let rows = stmt
        .query_map(params![a, b], link_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Connections touching `stop_id`, with both endpoint names.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn connections_for_stop(conn: &Connection, stop_id: &str) -> Result<Vec<StopConnection>> {
    let mut stmt = conn.prepare(
        "SELECT c.from_stop, c.to_stop, c.weight, c.line_number, s1.stop_name, s2.stop_name
         FROM connections c
         JOIN stops s1 ON c.from_stop = s1.stop_id
         JOIN stops s2 ON c.to_stop = s2.stop_id
         WHERE c.from_stop = ?1 OR c.to_stop = ?1
         ORDER BY c.stop_lo, c.stop_hi, c.line_number",
    )?;
    let rows = stmt
        .query_map(params![stop_id], |row| {
            Ok(StopConnection {
                from: row.get(0)?,
                to: row.get(1)?,
                weight: row.get(2)?,
                line: row.get(3)?,
                from_name: row.get(4)?,
                to_name: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns an error if the database query fails.
pub fn line_exists(conn: &Connection, line_number: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tram_lines WHERE line_number = ?1)",
        params![line_number],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// All lines ordered by number.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_lines(conn: &Connection) -> Result<Vec<Line>> {
    let mut stmt = conn.prepare(
        "SELECT line_number, route_description FROM tram_lines
         ORDER BY length(line_number), line_number",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Line {
                number: row.get(0)?,
                route_description: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_line(conn: &Connection, line_number: &str) -> Result<Option<Line>> {
    let line = conn
        .query_row(
            "SELECT line_number, route_description FROM tram_lines WHERE line_number = ?1",
            params![line_number],
            |row| {
                Ok(Line {
                    number: row.get(0)?,
                    route_description: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(line)
}

/// Mapping `stop_id -> {line_number}` from stop-line memberships.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn stops_to_lines(conn: &Connection) -> Result<BTreeMap<String, BTreeSet<String>>> {
    let mut stmt = conn.prepare("SELECT stop_id, line_number FROM stop_line_relations")?;
    let mut mapping: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let stop_id: String = row.get(0)?;
        let line: String = row.get(1)?;
        mapping.entry(stop_id).or_default().insert(line);
    }
    Ok(mapping)
}

/// Lines serving `stop_id`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn lines_for_stop(conn: &Connection, stop_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT line_number FROM stop_line_relations WHERE stop_id = ?1
         ORDER BY length(line_number), line_number",
    )?;
    let rows = stmt
        .query_map(params![stop_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Traffic and aggregates
// ---------------------------------------------------------------------------

/// Congestion samples for `stop_id`, ordered by day then hour.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn traffic_for(conn: &Connection, stop_id: &str) -> Result<Vec<TrafficSample>> {
    let mut stmt = conn.prepare(
        "SELECT day_of_week, hour, congestion_percent FROM traffic_patterns
         WHERE stop_id = ?1
         ORDER BY day_of_week, hour",
    )?;
    let mut samples = Vec::new();
    let mut rows = stmt.query(params![stop_id])?;
    while let Some(row) = rows.next()? {
        let day_index: u8 = row.get(0)?;
        let Some(day) = weekday_from_index(day_index) else {
            tracing::warn!(stop_id, day_index, "skipping traffic row with bad weekday");
            continue;
        };
        samples.push(TrafficSample {
            stop_id: stop_id.to_string(),
            day,
            hour: row.get(1)?,
            congestion: row.get(2)?,
        });
    }
    Ok(samples)
}

/// Counts of stops, active stops, connections and lines in service.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn network_stats(conn: &Connection) -> Result<NetworkStats> {
    let (total_stops, active_stops): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(active), 0) FROM stops",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let (total_connections, total_lines): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT line_number) FROM connections",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(NetworkStats {
        total_stops: usize::try_from(total_stops).unwrap_or_default(),
        active_stops: usize::try_from(active_stops).unwrap_or_default(),
        total_connections: usize::try_from(total_connections).unwrap_or_default(),
        total_lines: usize::try_from(total_lines).unwrap_or_default(),
    })
}
