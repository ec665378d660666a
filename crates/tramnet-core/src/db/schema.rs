//! Canonical SQLite schema for the tram network store.
//!
//! - `stops` holds every stop and its active flag
//! - `tram_lines` holds line identifiers and their route variant text
//! - `connections` is a multigraph: one row per unordered stop pair per line,
//!   keyed by the sorted pair `(stop_lo, stop_hi)`
//! - `stop_line_relations` and `traffic_patterns` hang off stops and vanish
//!   with them
//! - `store_meta` tracks the schema version

/// Migration v1: core tables, the manual sentinel line and store metadata.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stops (
    stop_id TEXT PRIMARY KEY CHECK (length(trim(stop_id)) > 0),
    stop_name TEXT NOT NULL CHECK (length(trim(stop_name)) > 0),
    latitude REAL,
    longitude REAL,
    active INTEGER NOT NULL DEFAULT 1 CHECK (active IN (0, 1)),
    CHECK ((latitude IS NULL) = (longitude IS NULL))
);

CREATE TABLE IF NOT EXISTS tram_lines (
    line_number TEXT PRIMARY KEY CHECK (length(trim(line_number)) > 0),
    route_description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS connections (
    connection_id INTEGER PRIMARY KEY AUTOINCREMENT,
    line_number TEXT NOT NULL REFERENCES tram_lines(line_number),
    from_stop TEXT NOT NULL REFERENCES stops(stop_id),
    to_stop TEXT NOT NULL REFERENCES stops(stop_id),
    stop_lo TEXT NOT NULL,
    stop_hi TEXT NOT NULL,
    weight INTEGER NOT NULL CHECK (weight > 0),
    UNIQUE (line_number, stop_lo, stop_hi),
    CHECK (stop_lo < stop_hi),
    CHECK ((from_stop = stop_lo AND to_stop = stop_hi) OR (from_stop = stop_hi AND to_stop = stop_lo))
);

CREATE TABLE IF NOT EXISTS stop_line_relations (
    stop_id TEXT NOT NULL REFERENCES stops(stop_id) ON DELETE CASCADE,
    line_number TEXT NOT NULL REFERENCES tram_lines(line_number) ON DELETE CASCADE,
    PRIMARY KEY (stop_id, line_number)
);

CREATE TABLE IF NOT EXISTS traffic_patterns (
    stop_id TEXT NOT NULL REFERENCES stops(stop_id) ON DELETE CASCADE,
    day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
    hour INTEGER NOT NULL CHECK (hour BETWEEN 0 AND 23),
    congestion_percent REAL NOT NULL CHECK (congestion_percent BETWEEN 0 AND 100),
    PRIMARY KEY (stop_id, day_of_week, hour)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);

INSERT OR IGNORE INTO tram_lines (line_number, route_description)
VALUES ('MANUAL', '');
"#;

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_connections_pair
    ON connections(stop_lo, stop_hi);

CREATE INDEX IF NOT EXISTS idx_connections_from
    ON connections(from_stop);

CREATE INDEX IF NOT EXISTS idx_connections_to
    ON connections(to_stop);

CREATE INDEX IF NOT EXISTS idx_stops_name
    ON stops(stop_name);

CREATE INDEX IF NOT EXISTS idx_stop_line_relations_line
    ON stop_line_relations(line_number, stop_id);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
"#;

/// Indexes expected by listing and graph-build query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_connections_pair",
    "idx_connections_from",
    "idx_connections_to",
    "idx_stops_name",
    "idx_stop_line_relations_line",
];
