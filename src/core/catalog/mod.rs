//! # Catalog Module
//!
//! Local reference data the recognizer matches against.
//!
//! ## Contract
//! Recognition only needs three read operations (see [`CatalogRepository`]):
//! bucket shortlist, exact edition lookup, and normalized name search.
//!
//! ## Backends
//! - `SqliteCatalog` - Persistent storage using SQLite, built offline
//! - `InMemoryCatalog` - For testing and embedding

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryCatalog;
pub use sqlite::SqliteCatalog;
pub use traits::{CatalogRepository, CatalogStore};

use crate::core::hasher::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of shortlist rows requested per bucket lookup
pub const DEFAULT_SHORTLIST_LIMIT: usize = 128;

/// A printed card (one printing of one card name)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CardRow {
    pub card_id: String,
    pub name: String,
    /// Alternate names that should also resolve to this card
    #[serde(default)]
    pub aliases: Vec<String>,
    pub set_code: String,
    pub collector_number: String,
    #[serde(default)]
    pub lang: String,
}

impl CardRow {
    /// Whether this printing is the given edition
    pub fn is_edition(&self, set_code: &str, collector_number: &str) -> bool {
        normalize_set_code(&self.set_code) == normalize_set_code(set_code)
            && normalize_collector_number(&self.collector_number)
                == normalize_collector_number(collector_number)
    }

    /// Normalized name plus normalized aliases, without empties or repeats
    pub fn normalized_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(1 + self.aliases.len());
        for name in std::iter::once(&self.name).chain(self.aliases.iter()) {
            let normalized = normalize_name(name);
            if !normalized.is_empty() && !names.contains(&normalized) {
                names.push(normalized);
            }
        }
        names
    }
}

/// One reference fingerprint of one printing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFingerprintRow {
    pub card_id: String,
    pub set_code: String,
    pub collector_number: String,
    pub lang: String,
    /// Which art/crop this fingerprint was taken from (e.g. "full", "artwork")
    pub art_variant: String,
    pub phash_hi: u32,
    pub phash_lo: u32,
    pub dhash_hi: u32,
    pub dhash_lo: u32,
    pub bucket16: u16,
}

impl CatalogFingerprintRow {
    /// Build a catalog row for `card` from a computed fingerprint
    pub fn from_fingerprint(card: &CardRow, art_variant: &str, fingerprint: &Fingerprint) -> Self {
        Self {
            card_id: card.card_id.clone(),
            set_code: card.set_code.clone(),
            collector_number: card.collector_number.clone(),
            lang: card.lang.clone(),
            art_variant: art_variant.to_string(),
            phash_hi: fingerprint.phash_hi,
            phash_lo: fingerprint.phash_lo,
            dhash_hi: fingerprint.dhash_hi,
            dhash_lo: fingerprint.dhash_lo,
            bucket16: fingerprint.bucket16,
        }
    }
}

/// Options for [`CatalogRepository::search_fingerprint_candidates_by_bucket`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketQuery {
    /// Rows from this set are listed first within the exact bucket
    pub set_code: Option<String>,
    /// Rows with this collector number are listed first within the exact bucket
    pub collector_number: Option<String>,
    pub limit: usize,
    /// How many buckets either side to consult when the exact bucket under-fills
    pub neighbor_range: u16,
}

impl Default for BucketQuery {
    fn default() -> Self {
        Self {
            set_code: None,
            collector_number: None,
            limit: DEFAULT_SHORTLIST_LIMIT,
            neighbor_range: 1,
        }
    }
}

impl BucketQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn neighbor_range(mut self, range: u16) -> Self {
        self.neighbor_range = range;
        self
    }

    pub fn edition(mut self, set_code: Option<&str>, collector_number: Option<&str>) -> Self {
        self.set_code = set_code.map(str::to_string);
        self.collector_number = collector_number.map(str::to_string);
        self
    }

    pub fn has_edition(&self) -> bool {
        self.set_code.is_some() || self.collector_number.is_some()
    }

    /// Whether `row` matches every edition field this query carries.
    /// A query without edition fields matches nothing.
    pub fn matches_row(&self, row: &CatalogFingerprintRow) -> bool {
        if !self.has_edition() {
            return false;
        }
        let set_ok = self
            .set_code
            .as_deref()
            .map_or(true, |set| normalize_set_code(set) == normalize_set_code(&row.set_code));
        let number_ok = self.collector_number.as_deref().map_or(true, |number| {
            normalize_collector_number(number) == normalize_collector_number(&row.collector_number)
        });
        set_ok && number_ok
    }
}

/// Options for [`CatalogRepository::search_by_name_normalized`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameQuery {
    pub allow_prefix: bool,
    pub allow_contains: bool,
    pub limit: usize,
}

impl Default for NameQuery {
    fn default() -> Self {
        Self {
            allow_prefix: true,
            allow_contains: true,
            limit: 12,
        }
    }
}

impl NameQuery {
    pub fn exact(limit: usize) -> Self {
        Self {
            allow_prefix: false,
            allow_contains: false,
            limit,
        }
    }

    pub fn prefix(limit: usize) -> Self {
        Self {
            allow_prefix: true,
            allow_contains: false,
            limit,
        }
    }
}

/// Catalog statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub cards: usize,
    pub fingerprints: usize,
    /// Number of distinct non-empty buckets
    pub buckets: usize,
    /// When the catalog was last built
    pub built_at: Option<DateTime<Utc>>,
}

/// Neighbouring buckets to consult, nearest first, lower before higher
pub(crate) fn neighbor_buckets(bucket16: u16, range: u16) -> Vec<u16> {
    let mut buckets = Vec::with_capacity(range as usize * 2);
    for offset in 1..=range {
        if let Some(lower) = bucket16.checked_sub(offset) {
            buckets.push(lower);
        }
        if let Some(upper) = bucket16.checked_add(offset) {
            buckets.push(upper);
        }
    }
    buckets
}

/// Normalize a card name for lookup: lowercase ASCII, common Latin
/// diacritics folded, apostrophes dropped, any other punctuation or
/// whitespace run collapsed to a single space.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut gap = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            push_word_char(&mut out, &mut gap, c);
        } else if let Some(folded) = fold_diacritic(c) {
            for f in folded.chars() {
                push_word_char(&mut out, &mut gap, f);
            }
        } else if c == '\'' || c == '\u{2019}' {
            // "Urza's" and "Urzas" are the same lookup key
            continue;
        } else {
            gap = true;
        }
    }
    out
}

fn push_word_char(out: &mut String, gap: &mut bool, c: char) {
    if *gap && !out.is_empty() {
        out.push(' ');
    }
    *gap = false;
    out.push(c);
}

fn fold_diacritic(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'æ' => "ae",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'œ' => "oe",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}

/// Set codes compare case-insensitively
pub fn normalize_set_code(set_code: &str) -> String {
    set_code.trim().to_ascii_lowercase()
}

/// Collector numbers compare case-insensitively, without leading zeros and
/// without a trailing "/total"
pub fn normalize_collector_number(number: &str) -> String {
    let number = number.split('/').next().unwrap_or("").trim().to_ascii_lowercase();
    let stripped = number.trim_start_matches('0');
    if stripped.is_empty() && !number.is_empty() {
        "0".to_string()
    } else if stripped.starts_with(|c: char| !c.is_ascii_digit()) && !number.is_empty() {
        // "0a" keeps its zero so it stays distinct from "a"
        number
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(set: &str, number: &str) -> CatalogFingerprintRow {
        CatalogFingerprintRow {
            card_id: "c".into(),
            set_code: set.into(),
            collector_number: number.into(),
            lang: "en".into(),
            art_variant: "full".into(),
            phash_hi: 0,
            phash_lo: 0,
            dhash_hi: 0,
            dhash_lo: 0,
            bucket16: 0,
        }
    }

    #[test]
    fn name_normalization_folds_case_and_punctuation() {
        assert_eq!(normalize_name("Urza's  Saga!"), "urzas saga");
        assert_eq!(normalize_name("  Æther Vial "), "aether vial");
        assert_eq!(normalize_name("Jötun Grunt"), "jotun grunt");
        assert_eq!(normalize_name("Fire // Ice"), "fire ice");
        assert_eq!(normalize_name("---"), "");
    }

    #[test]
    fn collector_number_normalization() {
        assert_eq!(normalize_collector_number("007"), "7");
        assert_eq!(normalize_collector_number("123/280"), "123");
        assert_eq!(normalize_collector_number("045A"), "45a");
        assert_eq!(normalize_collector_number("000"), "0");
        assert_eq!(normalize_collector_number(""), "");
    }

    #[test]
    fn neighbors_are_nearest_first_and_in_range() {
        assert_eq!(neighbor_buckets(10, 2), vec![9, 11, 8, 12]);
        assert_eq!(neighbor_buckets(0, 1), vec![1]);
        assert_eq!(neighbor_buckets(u16::MAX, 1), vec![u16::MAX - 1]);
        assert!(neighbor_buckets(5, 0).is_empty());
    }

    #[test]
    fn bucket_query_edition_matching() {
        let query = BucketQuery::default().edition(Some("DMU"), Some("07"));
        assert!(query.matches_row(&row("dmu", "7")));
        assert!(!query.matches_row(&row("dmu", "8")));
        assert!(!BucketQuery::default().matches_row(&row("dmu", "7")));

        let set_only = BucketQuery::default().edition(Some("dmu"), None);
        assert!(set_only.matches_row(&row("DMU", "200")));
    }

    #[test]
    fn card_names_include_aliases_once() {
        let card = CardRow {
            card_id: "a".into(),
            name: "Lightning Bolt".into(),
            aliases: vec!["lightning bolt".into(), "Blitzschlag".into()],
            ..Default::default()
        };
        assert_eq!(card.normalized_names(), vec!["lightning bolt", "blitzschlag"]);
    }
}
