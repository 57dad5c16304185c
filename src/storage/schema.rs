//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the export database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Host-owned content items (enumeration input)
CREATE TABLE IF NOT EXISTS content_items (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    slug TEXT NOT NULL,
    body TEXT NOT NULL,
    excerpt TEXT,
    permalink TEXT NOT NULL,
    author TEXT,
    published_at TEXT NOT NULL,
    taxonomies TEXT NOT NULL DEFAULT '{}',
    restricted INTEGER NOT NULL DEFAULT 0,
    noindex INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_content_items_kind
    ON content_items(kind, published_at);

-- Per-item upload records; the reuse-by-hash basis across runs
CREATE TABLE IF NOT EXISTS artifact_records (
    item_id INTEGER PRIMARY KEY,
    item_kind TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    artifact_url TEXT NOT NULL,
    uploaded_at TEXT NOT NULL,
    content_size INTEGER NOT NULL
);

-- Single-slot run state with sliding expiry
CREATE TABLE IF NOT EXISTS export_progress (
    slot INTEGER PRIMARY KEY CHECK (slot = 0),
    state TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

-- Generation metadata (last completed manifest)
CREATE TABLE IF NOT EXISTS export_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
