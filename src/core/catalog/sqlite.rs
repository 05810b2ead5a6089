//! SQLite catalog backend for persistent storage.

use super::{
    neighbor_buckets, normalize_collector_number, normalize_name, normalize_set_code, BucketQuery,
    CardRow, CatalogFingerprintRow, CatalogRepository, CatalogStats, CatalogStore, NameQuery,
};
use crate::error::CatalogError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

const FINGERPRINT_COLUMNS: &str = "card_id, set_code, collector_number, lang, art_variant,
     phash_hi, phash_lo, dhash_hi, dhash_lo, bucket16";

const CARD_COLUMNS: &str = "card_id, name, aliases, set_code, collector_number, lang";

/// SQLite-backed catalog
///
/// Uses WAL (Write-Ahead Logging) mode so recognition can keep reading
/// while an offline index run writes.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteCatalog {
    /// Open or create a catalog database at the given path
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CatalogError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| CatalogError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cards (
                card_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                aliases TEXT NOT NULL DEFAULT '[]',
                set_code TEXT NOT NULL,
                set_norm TEXT NOT NULL,
                collector_number TEXT NOT NULL,
                collector_norm TEXT NOT NULL,
                lang TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_cards_edition ON cards(set_norm, collector_norm);

            CREATE TABLE IF NOT EXISTS card_names (
                card_id TEXT NOT NULL,
                name_norm TEXT NOT NULL,
                PRIMARY KEY (card_id, name_norm)
            );
            CREATE INDEX IF NOT EXISTS idx_card_names_norm ON card_names(name_norm);

            CREATE TABLE IF NOT EXISTS card_fingerprints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id TEXT NOT NULL,
                set_code TEXT NOT NULL,
                set_norm TEXT NOT NULL,
                collector_number TEXT NOT NULL,
                collector_norm TEXT NOT NULL,
                lang TEXT NOT NULL,
                art_variant TEXT NOT NULL,
                phash_hi INTEGER NOT NULL,
                phash_lo INTEGER NOT NULL,
                dhash_hi INTEGER NOT NULL,
                dhash_lo INTEGER NOT NULL,
                bucket16 INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_fingerprints_bucket ON card_fingerprints(bucket16);
            CREATE INDEX IF NOT EXISTS idx_fingerprints_card ON card_fingerprints(card_id);

            CREATE TABLE IF NOT EXISTS catalog_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;

        info!(path = %path.display(), "opened card catalog");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn.lock().map_err(|_| CatalogError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    fn fingerprint_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogFingerprintRow> {
        Ok(CatalogFingerprintRow {
            card_id: row.get(0)?,
            set_code: row.get(1)?,
            collector_number: row.get(2)?,
            lang: row.get(3)?,
            art_variant: row.get(4)?,
            phash_hi: row.get::<_, i64>(5)? as u32,
            phash_lo: row.get::<_, i64>(6)? as u32,
            dhash_hi: row.get::<_, i64>(7)? as u32,
            dhash_lo: row.get::<_, i64>(8)? as u32,
            bucket16: row.get::<_, i64>(9)? as u16,
        })
    }

    fn card_from_row(row: &Row<'_>) -> rusqlite::Result<CardRow> {
        let aliases: String = row.get(2)?;
        Ok(CardRow {
            card_id: row.get(0)?,
            name: row.get(1)?,
            // A malformed alias list only loses aliases, not the card
            aliases: serde_json::from_str(&aliases).unwrap_or_default(),
            set_code: row.get(3)?,
            collector_number: row.get(4)?,
            lang: row.get(5)?,
        })
    }

    fn query_fingerprints(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<CatalogFingerprintRow>, CatalogError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        let rows = stmt
            .query_map(params, Self::fingerprint_from_row)
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        Ok(rows)
    }

    fn query_cards(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<CardRow>, CatalogError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        let rows = stmt
            .query_map(params, Self::card_from_row)
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        Ok(rows)
    }

    /// Cards whose normalized names satisfy `condition` (a SQL predicate on
    /// `n.name_norm` with `?1` bound to `pattern`)
    fn cards_by_name(
        conn: &Connection,
        condition: &str,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<CardRow>, CatalogError> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM cards
             WHERE card_id IN (SELECT n.card_id FROM card_names n WHERE {condition})
             ORDER BY card_id
             LIMIT ?2"
        );
        Self::query_cards(conn, &sql, params![pattern, limit as i64])
    }
}

impl CatalogRepository for SqliteCatalog {
    fn search_fingerprint_candidates_by_bucket(
        &self,
        bucket16: u16,
        query: &BucketQuery,
    ) -> Result<Vec<CatalogFingerprintRow>, CatalogError> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.connection()?;

        let set_norm = query.set_code.as_deref().map(normalize_set_code);
        let collector_norm = query.collector_number.as_deref().map(normalize_collector_number);

        let sql = format!(
            "SELECT {FINGERPRINT_COLUMNS} FROM card_fingerprints
             WHERE bucket16 = ?1
             ORDER BY CASE
                 WHEN (?2 IS NOT NULL OR ?3 IS NOT NULL)
                  AND (?2 IS NULL OR set_norm = ?2)
                  AND (?3 IS NULL OR collector_norm = ?3) THEN 0
                 ELSE 1
             END, id
             LIMIT ?4"
        );
        let mut rows = Self::query_fingerprints(
            &conn,
            &sql,
            params![bucket16 as i64, set_norm, collector_norm, query.limit as i64],
        )?;

        let neighbors = neighbor_buckets(bucket16, query.neighbor_range);
        if rows.len() < query.limit && !neighbors.is_empty() {
            let low = bucket16.saturating_sub(query.neighbor_range);
            let high = bucket16.saturating_add(query.neighbor_range);
            let sql = format!(
                "SELECT {FINGERPRINT_COLUMNS} FROM card_fingerprints
                 WHERE bucket16 BETWEEN ?1 AND ?2 AND bucket16 != ?3
                 ORDER BY ABS(bucket16 - ?3), bucket16, id
                 LIMIT ?4"
            );
            let remaining = query.limit - rows.len();
            rows.extend(Self::query_fingerprints(
                &conn,
                &sql,
                params![low as i64, high as i64, bucket16 as i64, remaining as i64],
            )?);
        }

        Ok(rows)
    }

    fn find_by_set_collector(
        &self,
        set_code: &str,
        collector_number: &str,
    ) -> Result<Vec<CardRow>, CatalogError> {
        let conn = self.connection()?;
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM cards
             WHERE set_norm = ?1 AND collector_norm = ?2
             ORDER BY card_id"
        );
        Self::query_cards(
            &conn,
            &sql,
            params![normalize_set_code(set_code), normalize_collector_number(collector_number)],
        )
    }

    fn search_by_name_normalized(
        &self,
        name: &str,
        query: &NameQuery,
    ) -> Result<Vec<CardRow>, CatalogError> {
        let needle = normalize_name(name);
        if needle.is_empty() || query.limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.connection()?;

        let exact = Self::cards_by_name(&conn, "n.name_norm = ?1", &needle, query.limit)?;
        if !exact.is_empty() {
            return Ok(exact);
        }
        // Normalized names hold only [a-z0-9 ], so no LIKE wildcards to escape
        if query.allow_prefix {
            let pattern = format!("{needle}%");
            let prefix = Self::cards_by_name(&conn, "n.name_norm LIKE ?1", &pattern, query.limit)?;
            if !prefix.is_empty() {
                return Ok(prefix);
            }
        }
        if query.allow_contains {
            let pattern = format!("%{needle}%");
            return Self::cards_by_name(&conn, "n.name_norm LIKE ?1", &pattern, query.limit);
        }
        Ok(Vec::new())
    }
}

impl CatalogStore for SqliteCatalog {
    fn upsert_card(&self, card: &CardRow) -> Result<(), CatalogError> {
        let mut conn = self.connection()?;
        let aliases =
            serde_json::to_string(&card.aliases).map_err(|e| CatalogError::QueryFailed(e.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        tx.execute(
            "INSERT OR REPLACE INTO cards
             (card_id, name, aliases, set_code, set_norm, collector_number, collector_norm, lang)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                card.card_id,
                card.name,
                aliases,
                card.set_code,
                normalize_set_code(&card.set_code),
                card.collector_number,
                normalize_collector_number(&card.collector_number),
                card.lang,
            ],
        )
        .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;

        tx.execute("DELETE FROM card_names WHERE card_id = ?", [&card.card_id])
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        for name in card.normalized_names() {
            tx.execute(
                "INSERT OR IGNORE INTO card_names (card_id, name_norm) VALUES (?, ?)",
                params![card.card_id, name],
            )
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        }

        tx.commit().map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    fn insert_fingerprints(&self, rows: &[CatalogFingerprintRow]) -> Result<(), CatalogError> {
        let mut conn = self.connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO card_fingerprints
                     (card_id, set_code, set_norm, collector_number, collector_norm, lang, art_variant,
                      phash_hi, phash_lo, dhash_hi, dhash_lo, bucket16)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;

            for row in rows {
                stmt.execute(params![
                    row.card_id,
                    row.set_code,
                    normalize_set_code(&row.set_code),
                    row.collector_number,
                    normalize_collector_number(&row.collector_number),
                    row.lang,
                    row.art_variant,
                    row.phash_hi as i64,
                    row.phash_lo as i64,
                    row.dhash_hi as i64,
                    row.dhash_lo as i64,
                    row.bucket16 as i64,
                ])
                .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
            }
        }

        tx.commit().map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    fn remove_fingerprints(&self, card_id: &str) -> Result<usize, CatalogError> {
        let conn = self.connection()?;
        conn.execute("DELETE FROM card_fingerprints WHERE card_id = ?", [card_id])
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))
    }

    fn mark_built(&self) -> Result<(), CatalogError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO catalog_meta (key, value) VALUES ('built_at', ?)",
            [Utc::now().to_rfc3339()],
        )
        .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CatalogError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "DELETE FROM card_fingerprints;
             DELETE FROM card_names;
             DELETE FROM cards;
             DELETE FROM catalog_meta;",
        )
        .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let conn = self.connection()?;

        let count = |sql: &str| -> Result<usize, CatalogError> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0).map(|v| v as usize))
                .map_err(|e| CatalogError::QueryFailed(e.to_string()))
        };

        let cards = count("SELECT COUNT(*) FROM cards")?;
        let fingerprints = count("SELECT COUNT(*) FROM card_fingerprints")?;
        let buckets = count("SELECT COUNT(DISTINCT bucket16) FROM card_fingerprints")?;

        let built_at: Option<String> = conn
            .query_row("SELECT value FROM catalog_meta WHERE key = 'built_at'", [], |row| row.get(0))
            .optional()
            .map_err(|e| CatalogError::QueryFailed(e.to_string()))?;
        let built_at = built_at
            .and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
            .map(|time| time.with_timezone(&Utc));

        Ok(CatalogStats {
            cards,
            fingerprints,
            buckets,
            built_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn card(id: &str, name: &str, set: &str, number: &str) -> CardRow {
        CardRow {
            card_id: id.into(),
            name: name.into(),
            aliases: vec![format!("{name} (alt)")],
            set_code: set.into(),
            collector_number: number.into(),
            lang: "en".into(),
        }
    }

    fn fp_row(id: &str, set: &str, number: &str, bucket16: u16, phash_lo: u32) -> CatalogFingerprintRow {
        CatalogFingerprintRow {
            card_id: id.into(),
            set_code: set.into(),
            collector_number: number.into(),
            lang: "en".into(),
            art_variant: "full".into(),
            phash_hi: ((bucket16 as u32) << 16) | 0xABCD,
            phash_lo,
            dhash_hi: u32::MAX,
            dhash_lo: 0x8000_0000,
            bucket16,
        }
    }

    #[test]
    fn sqlite_catalog_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("catalog.db");

        let catalog = SqliteCatalog::open(&db_path).unwrap();

        assert!(db_path.exists());
        assert_eq!(catalog.stats().unwrap(), CatalogStats::default());
    }

    #[test]
    fn fingerprints_round_trip_full_u32_range() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = SqliteCatalog::open(&temp_dir.path().join("catalog.db")).unwrap();

        let row = fp_row("a", "dmu", "7", 0xFFFF, 0xFFFF_FFFF);
        catalog.insert_fingerprints(std::slice::from_ref(&row)).unwrap();

        let found = catalog
            .search_fingerprint_candidates_by_bucket(0xFFFF, &BucketQuery::default())
            .unwrap();
        assert_eq!(found, vec![row]);
    }

    #[test]
    fn bucket_search_orders_hint_then_neighbors() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = SqliteCatalog::open(&temp_dir.path().join("catalog.db")).unwrap();
        catalog
            .insert_fingerprints(&[
                fp_row("far", "x", "1", 12, 0),
                fp_row("upper", "x", "1", 11, 0),
                fp_row("lower", "x", "1", 9, 0),
                fp_row("plain", "abc", "1", 10, 0),
                fp_row("hinted", "DMU", "007", 10, 0),
            ])
            .unwrap();

        let query = BucketQuery::new(10).edition(Some("dmu"), Some("7"));
        let ids: Vec<String> = catalog
            .search_fingerprint_candidates_by_bucket(10, &query)
            .unwrap()
            .into_iter()
            .map(|r| r.card_id)
            .collect();
        assert_eq!(ids, vec!["hinted", "plain", "lower", "upper"]);
    }

    #[test]
    fn name_search_and_edition_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = SqliteCatalog::open(&temp_dir.path().join("catalog.db")).unwrap();
        catalog.upsert_card(&card("b", "Lightning Bolt", "M10", "146")).unwrap();
        catalog.upsert_card(&card("h", "Lightning Helix", "RAV", "213")).unwrap();

        let exact = catalog.search_by_name_normalized("Lightning  BOLT", &NameQuery::default()).unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].aliases, vec!["Lightning Bolt (alt)".to_string()]);

        let alias = catalog.search_by_name_normalized("lightning helix alt", &NameQuery::exact(5)).unwrap();
        assert_eq!(alias[0].card_id, "h");

        let prefix = catalog.search_by_name_normalized("light", &NameQuery::default()).unwrap();
        assert_eq!(prefix.len(), 2);

        let contains = catalog.search_by_name_normalized("helix", &NameQuery::default()).unwrap();
        assert_eq!(contains[0].card_id, "h");

        let edition = catalog.find_by_set_collector("m10", "0146").unwrap();
        assert_eq!(edition.len(), 1);
        assert_eq!(edition[0].card_id, "b");
    }

    #[test]
    fn upsert_replaces_names() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = SqliteCatalog::open(&temp_dir.path().join("catalog.db")).unwrap();
        catalog.upsert_card(&card("b", "Old Name", "s", "1")).unwrap();
        catalog.upsert_card(&card("b", "New Name", "s", "1")).unwrap();

        assert!(catalog.search_by_name_normalized("old name", &NameQuery::exact(5)).unwrap().is_empty());
        assert_eq!(catalog.stats().unwrap().cards, 1);
    }

    #[test]
    fn stats_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = SqliteCatalog::open(&temp_dir.path().join("catalog.db")).unwrap();
        catalog.upsert_card(&card("a", "A", "s", "1")).unwrap();
        catalog
            .insert_fingerprints(&[fp_row("a", "s", "1", 1, 0), fp_row("a", "s", "1", 2, 0)])
            .unwrap();
        catalog.mark_built().unwrap();

        let stats = catalog.stats().unwrap();
        assert_eq!(stats.cards, 1);
        assert_eq!(stats.fingerprints, 2);
        assert_eq!(stats.buckets, 2);
        assert!(stats.built_at.is_some());

        assert_eq!(catalog.remove_fingerprints("a").unwrap(), 2);
        catalog.clear().unwrap();
        assert_eq!(catalog.stats().unwrap(), CatalogStats::default());
    }

    #[test]
    fn catalog_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("catalog.db");
        {
            let catalog = SqliteCatalog::open(&db_path).unwrap();
            catalog.insert_fingerprints(&[fp_row("a", "s", "1", 5, 1)]).unwrap();
        }
        let catalog = SqliteCatalog::open(&db_path).unwrap();
        assert_eq!(catalog.stats().unwrap().fingerprints, 1);
    }
}
