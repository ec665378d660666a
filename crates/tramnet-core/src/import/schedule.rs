//! Timetable XML import.
//!
//! Input is a directory with one sub-directory per line, each holding one or
//! more XML timetables:
//!
//! ```text
//! <root>/<line-folder>/*.xml
//! ```
//!
//! A document names its line in `linia@nazwa` and lists route variants as
//! `wariant` elements (`@nazwa`). Each variant's `czasy` element holds the
//! ordered `przystanek` stops with `@id`, `@nazwa` and `@czas`, the minute
//! offset from the start of the variant.
//!
//! Consecutive stops become a connection weighted by their time difference,
//! at least one minute. The same pair seen again on a line keeps the smaller
//! weight.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use rusqlite::Connection;
use serde::Serialize;
use tracing::instrument;

use super::ImportError;
use crate::db::write;
use crate::model::{Coordinate, Stop, StopPair, VARIANT_SEPARATOR};

const DEFAULT_VARIANT_NAME: &str = "Variant";

// ---------------------------------------------------------------------------
// Parsed timetable
// ---------------------------------------------------------------------------

/// One stop in a variant, with its minute offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedStop {
    pub id: String,
    pub name: String,
    pub minute: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub stops: Vec<TimedStop>,
}

/// Everything one or more timetable documents say about a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSchedule {
    pub line: String,
    pub variants: Vec<Variant>,
}

/// A connection derived from two consecutive timetable stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub from: String,
    pub to: String,
    pub weight: u32,
}

impl LineSchedule {
    /// Parse one timetable document.
    ///
    /// # Errors
    ///
    /// [`ImportError::Xml`] for unparsable XML, [`ImportError::Malformed`]
    /// when the line name is missing or a `@czas` is not an integer.
    pub fn parse(path: &Path, text: &str) -> Result<Self, ImportError> {
        let doc = Document::parse(text).map_err(|source| ImportError::Xml {
            path: path.to_path_buf(),
            source,
        })?;
        let malformed = |reason: String| ImportError::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        let line = doc
            .descendants()
            .find(|n| n.has_tag_name("linia"))
            .and_then(|n| n.attribute("nazwa"))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| malformed("missing linia@nazwa".to_string()))?
            .to_string();

        let mut variants = Vec::new();
        for node in doc.descendants().filter(|n| n.has_tag_name("wariant")) {
            let name = node
                .attribute("nazwa")
                .unwrap_or(DEFAULT_VARIANT_NAME)
                .to_string();
            let stops = variant_stops(node).map_err(malformed)?;
            variants.push(Variant { name, stops });
        }

        Ok(Self { line, variants })
    }

    /// Consecutive-stop hops over all variants, one per stop pair, keeping the
    /// minimum weight and the direction first seen.
    #[must_use]
    pub fn hops(&self) -> Vec<Hop> {
        let mut folded: BTreeMap<StopPair, Hop> = BTreeMap::new();
        for variant in &self.variants {
            for window in variant.stops.windows(2) {
                let (from, to) = (&window[0], &window[1]);
                let pair = StopPair::new(&from.id, &to.id);
                if pair.is_loop() {
                    continue;
                }
                let weight = u32::try_from(to.minute.saturating_sub(from.minute).max(1))
                    .unwrap_or(u32::MAX);
                folded
                    .entry(pair)
                    .and_modify(|hop| hop.weight = hop.weight.min(weight))
                    .or_insert_with(|| Hop {
                        from: from.id.clone(),
                        to: to.id.clone(),
                        weight,
                    });
            }
        }
        folded.into_values().collect()
    }

    /// `"<variant>: <id> → <id> … | <variant>: …"`.
    #[must_use]
    pub fn route_description(&self) -> String {
        self.variants
            .iter()
            .map(|variant| {
                let ids: Vec<&str> = variant.stops.iter().map(|s| s.id.as_str()).collect();
                format!("{}: {}", variant.name, ids.join(" → "))
            })
            .collect::<Vec<_>>()
            .join(VARIANT_SEPARATOR)
    }
}

fn variant_stops(variant: Node<'_, '_>) -> Result<Vec<TimedStop>, String> {
    let Some(times) = variant.descendants().find(|n| n.has_tag_name("czasy")) else {
        return Ok(Vec::new());
    };
    let mut stops = Vec::new();
    for stop in times.children().filter(|n| n.has_tag_name("przystanek")) {
        let (Some(id), Some(name)) = (stop.attribute("id"), stop.attribute("nazwa")) else {
            continue;
        };
        if id.trim().is_empty() || name.trim().is_empty() {
            continue;
        }
        let raw = stop.attribute("czas").unwrap_or("0").trim();
        let minute = raw
            .parse::<i64>()
            .map_err(|_| format!("przystanek {id} has non-integer czas '{raw}'"))?;
        stops.push(TimedStop {
            id: id.trim().to_string(),
            name: name.trim().to_string(),
            minute,
        });
    }
    Ok(stops)
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ScheduleOptions {
    /// Coordinates by stop id, applied to every imported stop found here.
    pub coordinates: HashMap<String, Coordinate>,
    /// Empty the network before importing.
    pub fresh: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub files_read: usize,
    pub lines: usize,
    pub stops_added: usize,
    pub stops_with_coordinates: usize,
    pub connections: usize,
    /// Files that could not be parsed, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Import every timetable under `root`.
///
/// Unreadable or malformed documents are logged and listed in
/// [`ScheduleSummary::skipped`]; the rest is written in one transaction.
///
/// # Errors
///
/// [`ImportError::Io`] if `root` or a line folder cannot be listed, or a
/// store error while writing.
#[instrument(skip(conn, options), fields(fresh = options.fresh))]
pub fn import_schedule(
    conn: &Connection,
    root: &Path,
    options: &ScheduleOptions,
) -> Result<ScheduleSummary, ImportError> {
    let mut summary = ScheduleSummary::default();
    let mut lines: BTreeMap<String, LineSchedule> = BTreeMap::new();

    for path in timetable_files(root)? {
        let parsed = fs::read_to_string(&path)
            .map_err(|e| ImportError::io(&path, e))
            .and_then(|text| LineSchedule::parse(&path, &text));
        match parsed {
            Ok(schedule) => {
                summary.files_read += 1;
                match lines.entry(schedule.line.clone()) {
                    Entry::Occupied(mut known) => known.get_mut().variants.extend(schedule.variants),
                    Entry::Vacant(slot) => {
                        slot.insert(schedule);
                    }
                }
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "skipping timetable");
                summary.skipped.push((path, error.to_string()));
            }
        }
    }

    let tx = conn.unchecked_transaction()?;
    if options.fresh {
        write::reset_network(&tx)?;
    }

    for schedule in lines.values() {
        write::upsert_line(&tx, &schedule.line, &schedule.route_description())?;

        for variant in &schedule.variants {
            for stop in &variant.stops {
                let coordinate = options.coordinates.get(&stop.id).copied();
                let row = Stop {
                    id: stop.id.clone(),
                    name: stop.name.clone(),
                    coordinate,
                    active: true,
                };
                if write::insert_stop_if_absent(&tx, &row)? {
                    summary.stops_added += 1;
                } else if let Some(coordinate) = coordinate {
                    write::set_stop_coordinate(&tx, &stop.id, coordinate)?;
                }
                write::add_stop_line(&tx, &stop.id, &schedule.line)?;
            }
        }

        for hop in schedule.hops() {
            write::upsert_connection_min(&tx, &schedule.line, &hop.from, &hop.to, hop.weight)?;
            summary.connections += 1;
        }
    }

    summary.stops_with_coordinates = tx.query_row(
        "SELECT COUNT(*) FROM stops WHERE latitude IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    tx.commit()?;

    summary.lines = lines.len();
    tracing::info!(
        files = summary.files_read,
        lines = summary.lines,
        stops_added = summary.stops_added,
        connections = summary.connections,
        skipped = summary.skipped.len(),
        "schedule import finished"
    );
    Ok(summary)
}

/// `<root>/<dir>/*.xml`, sorted for a stable import order.
fn timetable_files(root: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let mut files = Vec::new();
    for line_dir in sorted_entries(root)? {
        if !line_dir.is_dir() {
            continue;
        }
        for path in sorted_entries(&line_dir)? {
            let is_xml = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
            if is_xml && path.is_file() {
                files.push(path);
            }
        }
    }
    Ok(files)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let entries = fs::read_dir(dir).map_err(|e| ImportError::io(dir, e))?;
    let mut paths = entries
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| ImportError::io(dir, e))?;
    paths.sort();
    Ok(paths)
}
