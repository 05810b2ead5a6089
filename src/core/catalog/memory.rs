//! In-memory catalog backend for testing.

use super::{
    neighbor_buckets, normalize_name, BucketQuery, CardRow, CatalogFingerprintRow, CatalogRepository,
    CatalogStats, CatalogStore, NameQuery,
};
use crate::error::CatalogError;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    /// Ordered by card id so name search results are deterministic
    cards: BTreeMap<String, CardRow>,
    /// Rows per bucket in insertion order
    buckets: HashMap<u16, Vec<CatalogFingerprintRow>>,
    built_at: Option<DateTime<Utc>>,
}

/// In-memory catalog backend
///
/// Useful for testing and for embedding a small catalog without SQLite.
#[derive(Default)]
pub struct InMemoryCatalog {
    tables: RwLock<Tables>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from cards and their fingerprint rows
    pub fn with_rows(cards: &[CardRow], rows: &[CatalogFingerprintRow]) -> Result<Self, CatalogError> {
        let catalog = Self::new();
        for card in cards {
            catalog.upsert_card(card)?;
        }
        catalog.insert_fingerprints(rows)?;
        Ok(catalog)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, CatalogError> {
        self.tables.read().map_err(|_| CatalogError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, CatalogError> {
        self.tables.write().map_err(|_| CatalogError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }
}

impl CatalogRepository for InMemoryCatalog {
    fn search_fingerprint_candidates_by_bucket(
        &self,
        bucket16: u16,
        query: &BucketQuery,
    ) -> Result<Vec<CatalogFingerprintRow>, CatalogError> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let tables = self.read()?;

        let mut rows: Vec<CatalogFingerprintRow> = tables.buckets.get(&bucket16).cloned().unwrap_or_default();
        // Stable sort: hint matches first, insertion order otherwise
        rows.sort_by_key(|row| !query.matches_row(row));
        rows.truncate(query.limit);

        for neighbor in neighbor_buckets(bucket16, query.neighbor_range) {
            if rows.len() >= query.limit {
                break;
            }
            if let Some(extra) = tables.buckets.get(&neighbor) {
                let remaining = query.limit - rows.len();
                rows.extend(extra.iter().take(remaining).cloned());
            }
        }

        Ok(rows)
    }

    fn find_by_set_collector(
        &self,
        set_code: &str,
        collector_number: &str,
    ) -> Result<Vec<CardRow>, CatalogError> {
        let tables = self.read()?;
        Ok(tables
            .cards
            .values()
            .filter(|card| card.is_edition(set_code, collector_number))
            .cloned()
            .collect())
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
        let tables = self.read()?;

        let tier = |matches: &dyn Fn(&str) -> bool| -> Vec<CardRow> {
            tables
                .cards
                .values()
                .filter(|card| card.normalized_names().iter().any(|n| matches(n.as_str())))
                .take(query.limit)
                .cloned()
                .collect()
        };

        let exact = tier(&|n: &str| n == needle);
        if !exact.is_empty() {
            return Ok(exact);
        }
        if query.allow_prefix {
            let prefix = tier(&|n: &str| n.starts_with(needle.as_str()));
            if !prefix.is_empty() {
                return Ok(prefix);
            }
        }
        if query.allow_contains {
            return Ok(tier(&|n: &str| n.contains(needle.as_str())));
        }
        Ok(Vec::new())
    }
}

impl CatalogStore for InMemoryCatalog {
    fn upsert_card(&self, card: &CardRow) -> Result<(), CatalogError> {
        let mut tables = self.write()?;
        tables.cards.insert(card.card_id.clone(), card.clone());
        Ok(())
    }

    fn insert_fingerprints(&self, rows: &[CatalogFingerprintRow]) -> Result<(), CatalogError> {
        let mut tables = self.write()?;
        for row in rows {
            tables.buckets.entry(row.bucket16).or_default().push(row.clone());
        }
        Ok(())
    }

    fn remove_fingerprints(&self, card_id: &str) -> Result<usize, CatalogError> {
        let mut tables = self.write()?;
        let mut removed = 0;
        for rows in tables.buckets.values_mut() {
            let before = rows.len();
            rows.retain(|row| row.card_id != card_id);
            removed += before - rows.len();
        }
        tables.buckets.retain(|_, rows| !rows.is_empty());
        Ok(removed)
    }

    fn mark_built(&self) -> Result<(), CatalogError> {
        self.write()?.built_at = Some(Utc::now());
        Ok(())
    }

    fn clear(&self) -> Result<(), CatalogError> {
        let mut tables = self.write()?;
        *tables = Tables::default();
        Ok(())
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let tables = self.read()?;
        Ok(CatalogStats {
            cards: tables.cards.len(),
            fingerprints: tables.buckets.values().map(Vec::len).sum(),
            buckets: tables.buckets.len(),
            built_at: tables.built_at,
        })
    }
}
