//! Hourly congestion import from scraped JSON.
//!
//! ```json
//! [{"location": "Rondo Mogilskie",
//!   "traffic_data": [["poniedziałek", ["08:00: 42%", "09:00: 35%"]]]}]
//! ```
//!
//! Locations are matched to stops by case-insensitive name; one location may
//! feed several stops sharing that name. Day names may be Polish or English.
//! Previous samples are cleared first.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use chrono::Weekday;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ImportError;
use crate::db::{query, write};
use crate::model::TrafficSample;

#[derive(Debug, Deserialize)]
struct LocationTraffic {
    location: String,
    #[serde(default)]
    traffic_data: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrafficSummary {
    pub inserted: usize,
    pub locations_matched: usize,
    /// Locations with no stop of that name.
    pub missing: BTreeSet<String>,
    /// Entries with an unknown day or an unparsable hour line.
    pub skipped_entries: usize,
}

/// Weekday from a Polish or English day name, any case.
#[must_use]
pub fn parse_day(name: &str) -> Option<Weekday> {
    let lowered = name.trim().to_lowercase();
    let polish = match lowered.as_str() {
        "poniedziałek" => Some(Weekday::Mon),
        "wtorek" => Some(Weekday::Tue),
        "środa" => Some(Weekday::Wed),
        "czwartek" => Some(Weekday::Thu),
        "piątek" => Some(Weekday::Fri),
        "sobota" => Some(Weekday::Sat),
        "niedziela" => Some(Weekday::Sun),
        _ => None,
    };
    polish.or_else(|| Weekday::from_str(&lowered).ok())
}

/// Hour and percentage from an entry like `"08:00: 42%"`.
#[must_use]
pub fn parse_hour_entry(entry: &str) -> Option<(u8, f64)> {
    let (hour, rest) = entry.trim().split_once(':')?;
    let (minutes, rest) = rest.split_once(':')?;
    if hour.len() != 2 || minutes.len() != 2 {
        return None;
    }
    if !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour = hour.parse::<u8>().ok().filter(|h| *h <= 23)?;

    let rest = rest.trim_start();
    let digits_end = rest.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 || !rest[digits_end..].starts_with('%') {
        return None;
    }
    let percent = rest[..digits_end].parse::<f64>().ok()?;
    Some((hour, percent))
}

/// Replace all traffic samples with those read from `reader`.
///
/// # Errors
///
/// [`ImportError::Json`] for input that is not the expected shape, or a
/// store error while writing.
#[instrument(skip(conn, reader))]
pub fn import_traffic<R: Read>(conn: &Connection, reader: R) -> Result<TrafficSummary, ImportError> {
    let entries: Vec<LocationTraffic> = serde_json::from_reader(reader)?;
    let mut summary = TrafficSummary::default();

    let tx = conn.unchecked_transaction()?;
    let cleared = write::clear_traffic(&tx)?;
    let by_name = query::stop_ids_by_name(&tx)?;

    for entry in &entries {
        let Some(stop_ids) = by_name.get(&entry.location.trim().to_uppercase()) else {
            summary.missing.insert(entry.location.clone());
            continue;
        };
        summary.locations_matched += 1;

        for (day_name, hours) in &entry.traffic_data {
            let Some(day) = parse_day(day_name) else {
                summary.skipped_entries += hours.len();
                continue;
            };
            for line in hours {
                let Some((hour, percent)) = parse_hour_entry(line) else {
                    summary.skipped_entries += 1;
                    continue;
                };
                for stop_id in stop_ids {
                    match TrafficSample::new(stop_id.as_str(), day, hour, percent) {
                        Ok(sample) => {
                            write::upsert_traffic_sample(&tx, &sample)?;
                            summary.inserted += 1;
                        }
                        Err(error) => {
                            tracing::debug!(stop_id = %stop_id, %error, "skipping traffic sample");
                            summary.skipped_entries += 1;
                        }
                    }
                }
            }
        }
    }
    tx.commit()?;

    tracing::info!(
        cleared,
        inserted = summary.inserted,
        missing = summary.missing.len(),
        "traffic import finished"
    );
    Ok(summary)
}

/// [`import_traffic`] from a file.
///
/// # Errors
///
/// [`ImportError::Io`] if the file cannot be opened, otherwise as
/// [`import_traffic`].
pub fn import_traffic_file(conn: &Connection, path: &Path) -> Result<TrafficSummary, ImportError> {
    let file = File::open(path).map_err(|e| ImportError::io(path, e))?;
    import_traffic(conn, BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::model::Stop;

    fn store() -> Connection {
        let conn = open_in_memory().expect("store");
        for (id, name) in [("RM1", "Rondo Mogilskie"), ("RM2", "Rondo Mogilskie"), ("BZ", "Bieżanów")] {
            write::upsert_stop(
                &conn,
                &Stop {
                    id: id.into(),
                    name: name.into(),
                    coordinate: None,
                    active: true,
                },
            )
            .expect("stop");
        }
        conn
    }

    #[test]
    fn parse_day_accepts_polish_and_english() {
        assert_eq!(parse_day("Poniedziałek"), Some(Weekday::Mon));
        assert_eq!(parse_day("ŚRODA"), Some(Weekday::Wed));
        assert_eq!(parse_day("sunday"), Some(Weekday::Sun));
        assert_eq!(parse_day("someday"), None);
    }

    #[test]
    fn parse_hour_entry_reads_hour_and_percent() {
        assert_eq!(parse_hour_entry("08:00: 42%"), Some((8, 42.0)));
        assert_eq!(parse_hour_entry("23:00:7%."), Some((23, 7.0)));
        assert_eq!(parse_hour_entry("8:00: 42%"), None);
        assert_eq!(parse_hour_entry("24:00: 42%"), None);
        assert_eq!(parse_hour_entry("08:00: many"), None);
    }

    #[test]
    fn import_matches_names_case_insensitively_and_reports_missing() {
        let conn = store();
        let json = r#"[
            {"location": "RONDO MOGILSKIE", "traffic_data": [["wtorek", ["08:00: 40%", "junk"]]]},
            {"location": "bieżanów", "traffic_data": [["Friday", ["17:00: 90%"]]]},
            {"location": "Nowhere", "traffic_data": []}
        ]"#;
        let summary = import_traffic(&conn, json.as_bytes()).expect("import");
        assert_eq!(summary.inserted, 3);
        assert_eq!(summary.locations_matched, 2);
        assert_eq!(summary.skipped_entries, 1);
        assert_eq!(summary.missing, BTreeSet::from(["Nowhere".to_string()]));

        let samples = query::traffic_for(&conn, "RM2").expect("traffic");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].day, Weekday::Tue);
        assert_eq!(samples[0].hour, 8);
    }

    #[test]
    fn import_replaces_previous_samples() {
        let conn = store();
        let first = r#"[{"location": "Bieżanów", "traffic_data": [["sobota", ["10:00: 10%"]]]}]"#;
        let second = r#"[{"location": "Bieżanów", "traffic_data": [["niedziela", ["11:00: 20%"]]]}]"#;
        import_traffic(&conn, first.as_bytes()).expect("first");
        import_traffic(&conn, second.as_bytes()).expect("second");
        let samples = query::traffic_for(&conn, "BZ").expect("traffic");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].day, Weekday::Sun);
    }

    #[test]
    fn wrong_shape_is_a_json_error() {
        let conn = store();
        let err = import_traffic(&conn, "{\"location\": 1}".as_bytes()).expect_err("shape");
        assert!(matches!(err, ImportError::Json(_)));
    }
}
