//! Integration tests for the SQLite catalog.
//!
//! These tests verify:
//! - Catalog contents persist across opens
//! - Rebuilding a card replaces its fingerprints
//! - Bucket, edition and name lookups through the read contract

use card_scan::core::catalog::{
    BucketQuery, CardRow, CatalogFingerprintRow, CatalogRepository, CatalogStore, NameQuery, SqliteCatalog,
};
use card_scan::core::hasher::Fingerprint;
use card_scan::core::orchestrator::{FrameInput, ScanOrchestrator, ScanPolicy};
use card_scan::core::result::NoneReason;
use std::sync::Arc;
use tempfile::TempDir;

fn card(id: &str, name: &str, set: &str, number: &str) -> CardRow {
    CardRow {
        card_id: id.into(),
        name: name.into(),
        aliases: Vec::new(),
        set_code: set.into(),
        collector_number: number.into(),
        lang: "en".into(),
    }
}

fn fingerprint_row(card: &CardRow, phash: u64) -> CatalogFingerprintRow {
    let fp = Fingerprint::from_hashes(phash, !phash, "base");
    CatalogFingerprintRow::from_fingerprint(card, "full", &fp)
}

#[test]
fn sqlite_catalog_persists_across_opens() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("catalog.db");

    let bolt = card("bolt-m10", "Lightning Bolt", "m10", "146");
    {
        let catalog = SqliteCatalog::open(&db_path).unwrap();
        catalog.upsert_card(&bolt).unwrap();
        catalog
            .insert_fingerprints(&[fingerprint_row(&bolt, 0xABCD_0000_1111_2222)])
            .unwrap();
        catalog.mark_built().unwrap();
    }

    let catalog = SqliteCatalog::open(&db_path).unwrap();
    let stats = catalog.stats().unwrap();
    assert_eq!(stats.cards, 1);
    assert_eq!(stats.fingerprints, 1);
    assert!(stats.built_at.is_some());

    let rows = catalog
        .search_fingerprint_candidates_by_bucket(0xABCD, &BucketQuery::default())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].card_id, "bolt-m10");
    assert_eq!(rows[0].phash_hi, 0xABCD_0000);
}

#[test]
fn reindexing_a_card_replaces_its_fingerprints() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = SqliteCatalog::open(&temp_dir.path().join("catalog.db")).unwrap();
    let saga = card("saga", "Urza's Saga", "mh2", "259");
    catalog.upsert_card(&saga).unwrap();
    catalog
        .insert_fingerprints(&[
            fingerprint_row(&saga, 0x1111_0000_0000_0001),
            fingerprint_row(&saga, 0x1111_0000_0000_0002),
        ])
        .unwrap();

    assert_eq!(catalog.remove_fingerprints("saga").unwrap(), 2);
    catalog
        .insert_fingerprints(&[fingerprint_row(&saga, 0x2222_0000_0000_0003)])
        .unwrap();

    assert_eq!(catalog.stats().unwrap().fingerprints, 1);
    assert!(catalog
        .search_fingerprint_candidates_by_bucket(0x1111, &BucketQuery::default().neighbor_range(0))
        .unwrap()
        .is_empty());
}

#[test]
fn edition_and_name_lookups() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = SqliteCatalog::open(&temp_dir.path().join("catalog.db")).unwrap();
    for row in [
        card("bolt-m10", "Lightning Bolt", "m10", "146"),
        card("bolt-lea", "Lightning Bolt", "lea", "161"),
        card("helix", "Lightning Helix", "rav", "213"),
    ] {
        catalog.upsert_card(&row).unwrap();
    }

    let found = catalog.find_by_set_collector("M10", "0146").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].card_id, "bolt-m10");

    let exact = catalog
        .search_by_name_normalized("lightning  BOLT", &NameQuery::exact(12))
        .unwrap();
    assert_eq!(exact.len(), 2);

    let prefix = catalog
        .search_by_name_normalized("Lightning", &NameQuery::prefix(12))
        .unwrap();
    assert_eq!(prefix.len(), 3);
}

#[test]
fn missing_frame_is_image_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(SqliteCatalog::open(&temp_dir.path().join("catalog.db")).unwrap());
    let orchestrator = ScanOrchestrator::fingerprint_only(catalog);

    let missing = orchestrator.resolve_scan(&FrameInput::default(), &ScanPolicy::fingerprint_only());
    assert_eq!(
        serde_json::to_value(&missing).unwrap(),
        serde_json::json!({ "status": "none", "reason": NoneReason::ImageUnavailable.as_str() })
    );
}
