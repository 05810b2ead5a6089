//! Catalog backend trait definitions.

use super::{BucketQuery, CardRow, CatalogFingerprintRow, CatalogStats, NameQuery};
use crate::error::CatalogError;

/// Read-only catalog queries used during recognition.
///
/// Every method is side-effect free and may be called concurrently from
/// several variant resolutions.
pub trait CatalogRepository: Send + Sync {
    /// Fingerprint rows for `bucket16`.
    ///
    /// Rows in the exact bucket come first, hint-matching rows ahead of the
    /// rest. Neighbouring buckets (up to `query.neighbor_range` away,
    /// nearest first) are only consulted when the exact bucket yields fewer
    /// than `query.limit` rows.
    fn search_fingerprint_candidates_by_bucket(
        &self,
        bucket16: u16,
        query: &BucketQuery,
    ) -> Result<Vec<CatalogFingerprintRow>, CatalogError>;

    /// Printings with exactly this set code and collector number
    fn find_by_set_collector(
        &self,
        set_code: &str,
        collector_number: &str,
    ) -> Result<Vec<CardRow>, CatalogError>;

    /// Cards whose normalized name or alias matches `name`.
    ///
    /// Tries exact, then prefix (if allowed), then contains (if allowed),
    /// returning the first non-empty tier.
    fn search_by_name_normalized(
        &self,
        name: &str,
        query: &NameQuery,
    ) -> Result<Vec<CardRow>, CatalogError>;
}

/// Write side of a catalog, used when building it offline
pub trait CatalogStore: CatalogRepository {
    /// Insert or replace a card
    fn upsert_card(&self, card: &CardRow) -> Result<(), CatalogError>;

    /// Store fingerprint rows in a single transaction
    fn insert_fingerprints(&self, rows: &[CatalogFingerprintRow]) -> Result<(), CatalogError>;

    /// Drop every fingerprint of one card (before re-indexing it)
    fn remove_fingerprints(&self, card_id: &str) -> Result<usize, CatalogError>;

    /// Record that the catalog was (re)built now
    fn mark_built(&self) -> Result<(), CatalogError>;

    /// Remove everything
    fn clear(&self) -> Result<(), CatalogError>;

    fn stats(&self) -> Result<CatalogStats, CatalogError>;
}
