//! `SQLite` write helpers for the network store.
//!
//! Every function is atomic on its own: single statements rely on `SQLite`'s
//! implicit transaction, multi-statement writes open an explicit one. Inputs
//! are validated here as well as by the schema so callers get typed errors
//! rather than opaque constraint failures.

use rusqlite::{Connection, ErrorCode as SqliteCode, params};
use tracing::instrument;

use crate::error::{
    EntityKind, NetworkError, Result, classify_write_error, is_foreign_key_violation,
};
use crate::model::{Coordinate, MANUAL_LINE, Stop, StopPair, TrafficSample};

fn check_id(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(NetworkError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn check_link(a: &str, b: &str, weight: u32) -> Result<StopPair> {
    check_id("from", a)?;
    check_id("to", b)?;
    if weight == 0 {
        return Err(NetworkError::validation("weight", "must be a positive number of minutes"));
    }
    let pair = StopPair::new(a, b);
    if pair.is_loop() {
        return Err(NetworkError::validation("to", "a stop cannot connect to itself"));
    }
    Ok(pair)
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == SqliteCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ---------------------------------------------------------------------------
// Stops
// ---------------------------------------------------------------------------

/// Insert a stop or overwrite name, coordinates and active flag of an
/// existing one.
///
/// # Errors
///
/// Returns [`NetworkError::Validation`] for empty id/name, or a storage error.
#[instrument(skip(conn, stop), fields(stop_id = %stop.id))]
pub fn upsert_stop(conn: &Connection, stop: &Stop) -> Result<()> {
    check_id("id", &stop.id)?;
    check_id("name", &stop.name)?;
    let (lat, lon) = stop.coordinate.map_or((None, None), |c| (Some(c.lat), Some(c.lon)));
    conn.execute(
        "INSERT INTO stops (stop_id, stop_name, latitude, longitude, active)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(stop_id) DO UPDATE SET
             stop_name = excluded.stop_name,
             latitude = excluded.latitude,
             longitude = excluded.longitude,
             active = excluded.active",
        params![stop.id, stop.name, lat, lon, i64::from(stop.active)],
    )?;
    Ok(())
}

/// Insert a stop only when its id is unknown. Returns whether a row was added.
///
/// # Errors
///
/// Returns [`NetworkError::Validation`] for empty id/name, or a storage error.
pub fn insert_stop_if_absent(conn: &Connection, stop: &Stop) -> Result<bool> {
    check_id("id", &stop.id)?;
    check_id("name", &stop.name)?;
    let (lat, lon) = stop.coordinate.map_or((None, None), |c| (Some(c.lat), Some(c.lon)));
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO stops (stop_id, stop_name, latitude, longitude, active)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![stop.id, stop.name, lat, lon, i64::from(stop.active)],
    )?;
    Ok(inserted > 0)
}

/// Set the coordinates of an existing stop. Returns whether the stop exists.
///
/// # Errors
///
/// Returns a storage error if the update fails.
pub fn set_stop_coordinate(conn: &Connection, stop_id: &str, coordinate: Coordinate) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE stops SET latitude = ?2, longitude = ?3 WHERE stop_id = ?1",
        params![stop_id, coordinate.lat, coordinate.lon],
    )?;
    Ok(updated > 0)
}

/// Flip the active flag. Returns whether the stop exists.
///
/// # Errors
///
/// Returns a storage error if the update fails.
#[instrument(skip(conn))]
pub fn set_stop_active(conn: &Connection, stop_id: &str, active: bool) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE stops SET active = ?2 WHERE stop_id = ?1",
        params![stop_id, i64::from(active)],
    )?;
    Ok(updated > 0)
}

/// Remove a stop together with every connection touching it.
///
/// Line memberships and traffic samples go with it through `ON DELETE
/// CASCADE`. Deleting an unknown id is a no-op. Returns whether the stop
/// existed.
///
/// # Errors
///
/// Returns a storage error; on failure nothing is removed.
#[instrument(skip(conn))]
pub fn delete_stop(conn: &Connection, stop_id: &str) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let links = tx.execute(
        "DELETE FROM connections WHERE from_stop = ?1 OR to_stop = ?1",
        params![stop_id],
    )?;
    let stops = tx.execute("DELETE FROM stops WHERE stop_id = ?1", params![stop_id])?;
    tx.commit()?;
    tracing::debug!(stop_id, links, existed = stops > 0, "deleted stop");
    Ok(stops > 0)
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// Insert a connection on `line`.
///
/// The pair is stored canonically, so `(a, b)` and `(b, a)` on the same line
/// collide.
///
/// # Errors
///
/// - [`NetworkError::Validation`] for a zero weight or a self-loop
/// - [`NetworkError::Reference`] when a stop or the line is missing
/// - [`NetworkError::DuplicateConnection`] when the line already links the pair
#[instrument(skip(conn))]
pub fn insert_connection(conn: &Connection, line: &str, a: &str, b: &str, weight: u32) -> Result<()> {
    check_id("line", line)?;
    let pair = check_link(a, b, weight)?;
    conn.execute(
        "INSERT INTO connections (line_number, from_stop, to_stop, stop_lo, stop_hi, weight)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![line, a, b, pair.lo(), pair.hi(), weight],
    )
    .map_err(|error| {
        if is_unique_violation(&error) {
            NetworkError::DuplicateConnection {
                a: a.to_string(),
                b: b.to_string(),
            }
        } else {
            classify_write_error(error, &pair.to_string())
        }
    })?;
    Ok(())
}

/// Insert a connection or, when the line already links the pair, keep the
/// smaller of the two weights.
///
/// # Errors
///
/// Same as [`insert_connection`] minus the duplicate case.
pub fn upsert_connection_min(
    conn: &Connection,
    line: &str,
    a: &str,
    b: &str,
    weight: u32,
) -> Result<()> {
    check_id("line", line)?;
    let pair = check_link(a, b, weight)?;
    conn.execute(
        "INSERT INTO connections (line_number, from_stop, to_stop, stop_lo, stop_hi, weight)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(line_number, stop_lo, stop_hi)
         DO UPDATE SET weight = MIN(weight, excluded.weight)",
        params![line, a, b, pair.lo(), pair.hi(), weight],
    )
    .map_err(|error| classify_write_error(error, &pair.to_string()))?;
    Ok(())
}

/// Remove every connection between `a` and `b`, both directions, all lines.
/// Returns the number of rows removed.
///
/// # Errors
///
/// Returns a storage error if the delete fails.
#[instrument(skip(conn))]
pub fn delete_connection(conn: &Connection, a: &str, b: &str) -> Result<usize> {
    let pair = StopPair::new(a, b);
    let removed = conn.execute(
        "DELETE FROM connections WHERE stop_lo = ?1 AND stop_hi = ?2",
        params![pair.lo(), pair.hi()],
    )?;
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// Insert a line or replace its route description.
///
/// # Errors
///
/// Returns [`NetworkError::Validation`] for an empty number, or a storage error.
pub fn upsert_line(conn: &Connection, number: &str, route_description: &str) -> Result<()> {
    check_id("line", number)?;
    conn.execute(
        "INSERT INTO tram_lines (line_number, route_description) VALUES (?1, ?2)
         ON CONFLICT(line_number) DO UPDATE SET route_description = excluded.route_description",
        params![number, route_description],
    )?;
    Ok(())
}

/// Record that `line` serves `stop_id`. Repeats are ignored.
///
/// # Errors
///
/// Returns [`NetworkError::Reference`] if either side is missing.
pub fn add_stop_line(conn: &Connection, stop_id: &str, line: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO stop_line_relations (stop_id, line_number) VALUES (?1, ?2)",
        params![stop_id, line],
    )
    .map_err(|error| classify_write_error(error, &format!("{stop_id}/{line}")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Traffic and bulk resets
// ---------------------------------------------------------------------------

/// Store one congestion sample, replacing any previous value for the same
/// stop, day and hour.
///
/// # Errors
///
/// Returns [`NetworkError::Reference`] if the stop is missing.
pub fn upsert_traffic_sample(conn: &Connection, sample: &TrafficSample) -> Result<()> {
    conn.execute(
        "INSERT INTO traffic_patterns (stop_id, day_of_week, hour, congestion_percent)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(stop_id, day_of_week, hour)
         DO UPDATE SET congestion_percent = excluded.congestion_percent",
        params![
            sample.stop_id,
            sample.day.num_days_from_monday(),
            sample.hour,
            sample.congestion
        ],
    )
    .map_err(|error| {
        if is_foreign_key_violation(&error) {
            NetworkError::missing(EntityKind::Stop, sample.stop_id.clone())
        } else {
            NetworkError::Storage(error)
        }
    })?;
    Ok(())
}

/// Drop every traffic sample. Returns the number removed.
///
/// # Errors
///
/// Returns a storage error if the delete fails.
pub fn clear_traffic(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM traffic_patterns", [])?)
}

/// Empty the network: connections, memberships, traffic, stops and every
/// line except the manual sentinel.
///
/// # Errors
///
/// Returns a storage error; on failure nothing is removed.
#[instrument(skip(conn))]
pub fn reset_network(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "DELETE FROM connections;
         DELETE FROM stop_line_relations;
         DELETE FROM traffic_patterns;
         DELETE FROM stops;",
    )?;
    tx.execute(
        "DELETE FROM tram_lines WHERE line_number <> ?1",
        params![MANUAL_LINE],
    )?;
    tx.commit()?;
    Ok(())
}
