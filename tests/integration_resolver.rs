//! Integration tests for fingerprint resolution against a catalog.
//!
//! These tests drive the resolver through the public catalog contract:
//! - A true match hidden among many same-bucket decoys
//! - Malformed fingerprints from untyped callers
//! - Near ties and edition hints
//! - Empty catalogs

use card_scan::core::catalog::{CardRow, CatalogFingerprintRow, InMemoryCatalog};
use card_scan::core::hasher::{Fingerprint, RawFingerprint};
use card_scan::core::resolver::{EditionHint, FingerprintResolver};
use card_scan::core::result::{MatchedBy, NoneReason};
use std::sync::Arc;

const PROBE_P: u64 = 0x4C1D_93A0_7E55_0F12;
const PROBE_D: u64 = 0x33CC_0FF0_5A5A_9669;

fn scanned() -> Fingerprint {
    Fingerprint::from_hashes(PROBE_P, PROBE_D, "base")
}

fn card(id: &str, set: &str, number: &str) -> CardRow {
    CardRow {
        card_id: id.into(),
        name: format!("Card {id}"),
        aliases: Vec::new(),
        set_code: set.into(),
        collector_number: number.into(),
        lang: "en".into(),
    }
}

/// A row for `card` whose hashes are the scanned print's with the given bits flipped.
/// Flips stay below bit 48, so the row lands in the scanned print's bucket.
fn row(card: &CardRow, p_flip: u64, d_flip: u64) -> CatalogFingerprintRow {
    let fp = Fingerprint::from_hashes(PROBE_P ^ p_flip, PROBE_D ^ d_flip, "base");
    CatalogFingerprintRow::from_fingerprint(card, "full", &fp)
}

fn low_bits(n: u32) -> u64 {
    if n == 0 {
        0
    } else {
        u64::MAX >> (64 - n)
    }
}

fn resolver(cards: &[CardRow], rows: &[CatalogFingerprintRow]) -> FingerprintResolver {
    let catalog = InMemoryCatalog::with_rows(cards, rows).unwrap();
    FingerprintResolver::with_defaults(Arc::new(catalog))
}

#[test]
fn exact_match_is_found_among_many_decoys() {
    let mut cards = Vec::new();
    let mut rows = Vec::new();
    for i in 0..70u32 {
        let decoy = card(&format!("decoy-{i:02}"), "dcy", &i.to_string());
        // 16 flipped pHash bits and 24 flipped dHash bits: far outside the hard filter
        rows.push(row(&decoy, 0xFFFF_0000u64 >> (i % 16), low_bits(24) << (i % 8)));
        cards.push(decoy);
    }
    let target = card("target", "neo", "88");
    rows.push(row(&target, 0, 0));
    cards.push(target);

    let resolver = resolver(&cards, &rows);
    let hint = EditionHint::new("NEO", "088");
    let resolution = resolver.resolve(&scanned(), Some(&hint));

    assert_eq!(resolution.result.card_id(), Some("target"));
    assert_eq!(resolution.result.matched_by(), Some(MatchedBy::FingerprintExact));
    assert_eq!(resolution.result.confidence(), 1.0);
    assert_eq!(resolution.diagnostics.shortlist_size, 71);
    assert_eq!(resolution.diagnostics.hard_survivors, 1);
}

#[test]
fn nan_fingerprint_serializes_as_unavailable() {
    let resolver = resolver(&[], &[]);
    let raw = RawFingerprint {
        phash_hi: Some(f64::NAN),
        ..RawFingerprint::from(&scanned())
    };

    let resolution = resolver.resolve_raw(&raw, None);
    let json = serde_json::to_value(&resolution.result).unwrap();

    assert_eq!(
        json,
        serde_json::json!({ "status": "none", "reason": "fingerprint_unavailable" })
    );
}

#[test]
fn untyped_fingerprint_from_json_resolves() {
    let target = card("target", "neo", "88");
    let resolver = resolver(&[target.clone()], &[row(&target, 0, 0)]);

    let text = serde_json::to_string(&RawFingerprint::from(&scanned())).unwrap();
    let raw: RawFingerprint = serde_json::from_str(&text).unwrap();

    assert_eq!(resolver.resolve_raw(&raw, None).result.card_id(), Some("target"));
}

#[test]
fn near_tie_is_ambiguous() {
    let a = card("a", "tst", "1");
    let b = card("b", "tst", "2");
    let resolver = resolver(
        &[a.clone(), b.clone()],
        &[row(&a, low_bits(2), low_bits(2)), row(&b, low_bits(2), low_bits(3))],
    );

    let resolution = resolver.resolve(&scanned(), None);

    assert!(resolution.result.is_ambiguous());
    assert_eq!(resolution.result.matched_by(), Some(MatchedBy::FingerprintAmbiguous));
    let ids: Vec<&str> = resolution.result.candidates().iter().map(|c| c.card_id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
}

#[test]
fn edition_hint_breaks_a_near_tie() {
    let a = card("a", "tst", "1");
    let b = card("b", "alt", "2");
    let resolver = resolver(
        &[a.clone(), b.clone()],
        &[row(&a, low_bits(3), low_bits(2)), row(&b, low_bits(3), low_bits(3))],
    );

    let hint = EditionHint::new("tst", "1");
    let resolution = resolver.resolve(&scanned(), Some(&hint));

    assert_eq!(resolution.result.card_id(), Some("a"));
    assert_eq!(
        resolution.result.matched_by(),
        Some(MatchedBy::FingerprintWithEditionHint)
    );
    assert!(resolution.diagnostics.narrowed_by_hint);
}

#[test]
fn empty_catalog_has_no_bucket_hits() {
    let resolution = resolver(&[], &[]).resolve(&scanned(), None);

    assert_eq!(resolution.result.status(), "none");
    assert_eq!(
        serde_json::to_value(&resolution.result).unwrap()["reason"],
        NoneReason::NoBucketHits.as_str()
    );
    assert_eq!(resolution.diagnostics.shortlist_size, 0);
}
