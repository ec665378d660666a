//! Bulk loaders that fill the store from schedule and traffic files.
//!
//! - [`schedule`]: per-line XML timetables → stops, lines, connections
//! - [`coords`]: stop-code CSV → coordinates used to enrich a schedule import
//! - [`traffic`]: scraped JSON → hourly congestion samples
//!
//! Every loader writes inside one transaction, so a failed import leaves the
//! store as it was.

pub mod coords;
pub mod schedule;
pub mod traffic;

use std::path::PathBuf;

use crate::error::{ErrorCode, NetworkError};

pub use coords::{load_coordinates, read_coordinates};
pub use schedule::{ScheduleOptions, ScheduleSummary, import_schedule};
pub use traffic::{TrafficSummary, import_traffic, import_traffic_file};

/// Failure of an import as a whole. Per-record problems are skipped and
/// reported in the summaries instead.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid XML in {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl ImportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Network(inner) => inner.code(),
            _ => ErrorCode::ImportFailed,
        }
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Network(NetworkError::Storage(error))
    }
}
