//! Error taxonomy shared by the store, mutation operations and front-ends.
//!
//! Two families are kept apart:
//! - [`NetworkError`] is a failure of an operation (bad input, dangling
//!   reference, duplicate link, storage failure) and is propagated with `?`.
//! - [`RouteError`] is an expected *outcome* of a route query and is returned
//!   as a value so callers can render "no route" without special control flow.
//!
//! Both map onto [`ErrorCode`] for stable, machine-readable reporting.

use std::fmt;

/// Machine-readable error codes surfaced by the CLI and the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InvalidInput,
    UnknownReference,
    DuplicateConnection,
    UnknownStop,
    InactiveStop,
    NoPath,
    StorageFailure,
    ImportFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidInput => "E2001",
            Self::UnknownReference => "E2002",
            Self::DuplicateConnection => "E2003",
            Self::UnknownStop => "E3001",
            Self::InactiveStop => "E3002",
            Self::NoPath => "E3003",
            Self::StorageFailure => "E5001",
            Self::ImportFailed => "E6001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Network database not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidInput => "Invalid input",
            Self::UnknownReference => "Referenced stop or line does not exist",
            Self::DuplicateConnection => "Connection already exists",
            Self::UnknownStop => "Unknown stop",
            Self::InactiveStop => "Stop is not active",
            Self::NoPath => "No route found",
            Self::StorageFailure => "Storage failure",
            Self::ImportFailed => "Import failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `tram init` or point --db at an existing database."),
            Self::ConfigParseError => Some("Fix syntax in tramnet.toml and retry."),
            Self::InvalidInput => None,
            Self::UnknownReference => Some("List stops with `tram stops list` and check the id."),
            Self::DuplicateConnection => {
                Some("Remove the existing connection first with `tram conn rm`.")
            }
            Self::UnknownStop => Some("List stops with `tram stops list` and check the id."),
            Self::InactiveStop => Some("Activate the stop with `tram stops activate <id>`."),
            Self::NoPath => Some("Check that the active stops between both ends are connected."),
            Self::StorageFailure => Some("Retry once. Check that the database file is writable."),
            Self::ImportFailed => Some("Check the input file format and retry."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Kind of entity a [`NetworkError::Reference`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Stop,
    Line,
    /// The engine rejected a foreign key without saying which side.
    StopOrLine,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => f.write_str("stop"),
            Self::Line => f.write_str("line"),
            Self::StopOrLine => f.write_str("stop or line"),
        }
    }
}

/// Failure of a store read/write or a mutation operation.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Bad input shape or range; rejected before any write.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The operation names a stop or line that does not exist.
    #[error("{kind} '{id}' does not exist")]
    Reference { kind: EntityKind, id: String },

    /// A connection between the two stops already exists (either direction).
    #[error("stops '{a}' and '{b}' are already connected")]
    DuplicateConnection { a: String, b: String },

    /// Underlying persistence failure, driver message attached.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl NetworkError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::Reference {
            kind,
            id: id.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::InvalidInput,
            Self::Reference { .. } => ErrorCode::UnknownReference,
            Self::DuplicateConnection { .. } => ErrorCode::DuplicateConnection,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }
}

/// Convenience alias for store and mutation results.
pub type Result<T, E = NetworkError> = std::result::Result<T, E>;

/// Typed failure outcome of a shortest-path query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("stop '{0}' does not exist")]
    UnknownStop(String),

    #[error("stop '{0}' is not active")]
    InactiveStop(String),

    #[error("no path exists between '{from}' and '{to}'")]
    NoPath { from: String, to: String },
}

impl RouteError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownStop(_) => ErrorCode::UnknownStop,
            Self::InactiveStop(_) => ErrorCode::InactiveStop,
            Self::NoPath { .. } => ErrorCode::NoPath,
        }
    }
}

/// Whether `error` is a foreign-key constraint violation.
pub(crate) fn is_foreign_key_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

/// Map a rusqlite failure from an insert into a [`NetworkError`], turning a
/// foreign-key violation into a reference error.
pub(crate) fn classify_write_error(error: rusqlite::Error, id: &str) -> NetworkError {
    if is_foreign_key_violation(&error) {
        return NetworkError::missing(EntityKind::StopOrLine, id);
    }
    NetworkError::Storage(error)
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, ErrorCode, NetworkError, RouteError};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::InvalidInput,
            ErrorCode::UnknownReference,
            ErrorCode::DuplicateConnection,
            ErrorCode::UnknownStop,
            ErrorCode::InactiveStop,
            ErrorCode::NoPath,
            ErrorCode::StorageFailure,
            ErrorCode::ImportFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::InactiveStop.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn each_failure_kind_has_a_distinct_message() {
        let network = [
            NetworkError::validation("weight", "must be positive"),
            NetworkError::missing(EntityKind::Stop, "X"),
            NetworkError::DuplicateConnection {
                a: "A".into(),
                b: "B".into(),
            },
        ];
        let route = [
            RouteError::UnknownStop("X".into()),
            RouteError::InactiveStop("X".into()),
            RouteError::NoPath {
                from: "A".into(),
                to: "B".into(),
            },
        ];

        let mut codes = HashSet::new();
        for err in &network {
            assert!(codes.insert(err.code()));
        }
        for err in &route {
            assert!(codes.insert(err.code()));
        }
        assert_eq!(
            NetworkError::missing(EntityKind::Line, "7").to_string(),
            "line '7' does not exist"
        );
    }
}
