//! Stop coordinates from the public stops CSV.
//!
//! Layout: a header row, then the stop code in column 1, latitude in column 3
//! and longitude in column 4 (zero-based). Short rows and rows whose
//! coordinates do not parse are skipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::ImportError;
use crate::model::Coordinate;

const CODE_COLUMN: usize = 1;
const LAT_COLUMN: usize = 3;
const LON_COLUMN: usize = 4;

/// Read a coordinates CSV from `reader`, keyed by stop code.
///
/// # Errors
///
/// Returns [`ImportError::Csv`] if the CSV itself cannot be read.
pub fn read_coordinates<R: Read>(reader: R) -> Result<HashMap<String, Coordinate>, ImportError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut coordinates = HashMap::new();
    let mut skipped = 0usize;
    for record in csv.records() {
        let record = record?;
        let (Some(code), Some(lat), Some(lon)) = (
            record.get(CODE_COLUMN),
            record.get(LAT_COLUMN),
            record.get(LON_COLUMN),
        ) else {
            skipped += 1;
            continue;
        };
        let code = code.trim();
        match Coordinate::parse(lat, lon) {
            Ok(coordinate) if !code.is_empty() => {
                coordinates.insert(code.to_string(), coordinate);
            }
            _ => skipped += 1,
        }
    }

    tracing::debug!(loaded = coordinates.len(), skipped, "read stop coordinates");
    Ok(coordinates)
}

/// Read a coordinates CSV file.
///
/// # Errors
///
/// Returns [`ImportError::Io`] if the file cannot be opened, or
/// [`ImportError::Csv`] if it is not valid CSV.
pub fn load_coordinates(path: &Path) -> Result<HashMap<String, Coordinate>, ImportError> {
    let file = File::open(path).map_err(|e| ImportError::io(path, e))?;
    read_coordinates(file)
}
