//! Content enumeration backed by the host's SQLite content store
//!
//! Enumeration is deterministic (newest-first by publication time, id as
//! tiebreaker), bounded per kind, and filtered by an exclusion predicate:
//! access-restricted items and items opted out of indexing are silently
//! dropped, never errored.

use crate::config::ExportSettings;
use crate::content::Item;
use crate::storage::initialize_schema;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading the content store
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for content source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Per-kind item counts for status reporting
#[derive(Debug, Clone)]
pub struct KindStats {
    pub kind: String,
    pub count: u64,
}

/// Trait for content enumeration backends
pub trait ContentSource {
    /// Enumerates exportable items of one kind in stable order
    fn enumerate(&self, kind: &str, options: &ExportSettings) -> SourceResult<Vec<Item>>;

    /// Fetches a single item by id (items may vanish mid-run)
    fn get_item(&self, id: i64) -> SourceResult<Option<Item>>;

    /// Counts stored items per kind
    fn content_stats(&self) -> SourceResult<Vec<KindStats>>;
}

/// SQLite-backed content source
pub struct SqliteContentSource {
    conn: Connection,
}

const ITEM_COLUMNS: &str = "id, kind, title, slug, body, excerpt, permalink, author, \
     published_at, taxonomies, restricted, noindex";

impl SqliteContentSource {
    /// Opens the content store at the given path, creating the schema if needed
    pub fn new(path: &Path) -> SourceResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory content store (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> SourceResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Host-side write API: inserts or replaces one content item
    pub fn insert_item(&self, item: &Item) -> SourceResult<()> {
        let taxonomies = serde_json::to_string(&item.taxonomies)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO content_items
             (id, kind, title, slug, body, excerpt, permalink, author, published_at, taxonomies, restricted, noindex)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                item.id,
                item.kind,
                item.title,
                item.slug,
                item.body,
                item.excerpt,
                item.permalink,
                item.author,
                item.published_at,
                taxonomies,
                item.restricted,
                item.noindex,
            ],
        )?;
        Ok(())
    }

    fn map_item(row: &Row<'_>) -> rusqlite::Result<Item> {
        let taxonomies_json: String = row.get(9)?;
        Ok(Item {
            id: row.get(0)?,
            kind: row.get(1)?,
            title: row.get(2)?,
            slug: row.get(3)?,
            body: row.get(4)?,
            excerpt: row.get(5)?,
            permalink: row.get(6)?,
            author: row.get(7)?,
            published_at: row.get(8)?,
            taxonomies: serde_json::from_str(&taxonomies_json).unwrap_or_default(),
            restricted: row.get(10)?,
            noindex: row.get(11)?,
        })
    }

    /// Exclusion predicate: restricted or noindex items never export
    fn should_include(item: &Item) -> bool {
        if item.restricted {
            tracing::debug!(item_id = item.id, "excluding item: access restricted");
            return false;
        }
        if item.noindex {
            tracing::debug!(item_id = item.id, "excluding item: marked noindex");
            return false;
        }
        true
    }
}

impl ContentSource for SqliteContentSource {
    fn enumerate(&self, kind: &str, options: &ExportSettings) -> SourceResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM content_items
             WHERE kind = ?1
             ORDER BY published_at DESC, id DESC
             LIMIT ?2"
        ))?;

        let items = stmt
            .query_map(params![kind, options.max_items_per_kind], Self::map_item)?
            .collect::<Result<Vec<_>, _>>()?;

        let total = items.len();
        let filtered: Vec<Item> = items.into_iter().filter(Self::should_include).collect();

        if filtered.len() != total {
            tracing::debug!(
                kind = %kind,
                excluded = total - filtered.len(),
                "items excluded by predicate"
            );
        }

        Ok(filtered)
    }

    fn get_item(&self, id: i64) -> SourceResult<Option<Item>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM content_items WHERE id = ?1"),
                params![id],
                Self::map_item,
            )
            .optional()?;
        Ok(item)
    }

    fn content_stats(&self) -> SourceResult<Vec<KindStats>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM content_items GROUP BY kind ORDER BY kind")?;

        let stats = stmt
            .query_map([], |row| {
                Ok(KindStats {
                    kind: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn test_item(id: i64, kind: &str, published_at: &str) -> Item {
        Item {
            id,
            kind: kind.to_string(),
            title: format!("Item {}", id),
            slug: format!("item-{}", id),
            body: "Some body text.".to_string(),
            excerpt: None,
            permalink: format!("https://example.com/item-{}", id),
            author: None,
            published_at: published_at.to_string(),
            taxonomies: BTreeMap::new(),
            restricted: false,
            noindex: false,
        }
    }

    #[test]
    fn test_enumerate_orders_newest_first() {
        let source = SqliteContentSource::new_in_memory().unwrap();
        source
            .insert_item(&test_item(1, "post", "2026-01-01T00:00:00Z"))
            .unwrap();
        source
            .insert_item(&test_item(2, "post", "2026-03-01T00:00:00Z"))
            .unwrap();
        source
            .insert_item(&test_item(3, "post", "2026-02-01T00:00:00Z"))
            .unwrap();

        let items = source
            .enumerate("post", &ExportSettings::default())
            .unwrap();
        let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_enumerate_bounded_by_limit() {
        let source = SqliteContentSource::new_in_memory().unwrap();
        for id in 1..=5 {
            source
                .insert_item(&test_item(id, "post", "2026-01-01T00:00:00Z"))
                .unwrap();
        }

        let options = ExportSettings {
            max_items_per_kind: 3,
            ..ExportSettings::default()
        };
        let items = source.enumerate("post", &options).unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_enumerate_filters_by_kind() {
        let source = SqliteContentSource::new_in_memory().unwrap();
        source
            .insert_item(&test_item(1, "post", "2026-01-01T00:00:00Z"))
            .unwrap();
        source
            .insert_item(&test_item(2, "page", "2026-01-01T00:00:00Z"))
            .unwrap();

        let items = source
            .enumerate("page", &ExportSettings::default())
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 2);
    }

    #[test]
    fn test_exclusion_predicate_drops_silently() {
        let source = SqliteContentSource::new_in_memory().unwrap();
        let mut restricted = test_item(1, "post", "2026-01-01T00:00:00Z");
        restricted.restricted = true;
        let mut noindex = test_item(2, "post", "2026-01-01T00:00:00Z");
        noindex.noindex = true;
        let visible = test_item(3, "post", "2026-01-01T00:00:00Z");

        source.insert_item(&restricted).unwrap();
        source.insert_item(&noindex).unwrap();
        source.insert_item(&visible).unwrap();

        let items = source
            .enumerate("post", &ExportSettings::default())
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 3);
    }

    #[test]
    fn test_get_item() {
        let source = SqliteContentSource::new_in_memory().unwrap();
        let mut item = test_item(7, "post", "2026-01-01T00:00:00Z");
        item.taxonomies
            .insert("Tags".to_string(), vec!["rust".to_string()]);
        source.insert_item(&item).unwrap();

        let loaded = source.get_item(7).unwrap().unwrap();
        assert_eq!(loaded.title, "Item 7");
        assert_eq!(loaded.taxonomies["Tags"], vec!["rust"]);

        assert!(source.get_item(999).unwrap().is_none());
    }

    #[test]
    fn test_content_stats() {
        let source = SqliteContentSource::new_in_memory().unwrap();
        source
            .insert_item(&test_item(1, "post", "2026-01-01T00:00:00Z"))
            .unwrap();
        source
            .insert_item(&test_item(2, "post", "2026-01-02T00:00:00Z"))
            .unwrap();
        source
            .insert_item(&test_item(3, "page", "2026-01-01T00:00:00Z"))
            .unwrap();

        let stats = source.content_stats().unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].kind, "page");
        assert_eq!(stats[0].count, 1);
        assert_eq!(stats[1].kind, "post");
        assert_eq!(stats[1].count, 2);
    }
}
