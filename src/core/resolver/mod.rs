//! # Resolver Module
//!
//! Matches one fingerprint against a catalog shortlist.
//!
//! ## Decision ladder
//! 1. Hard filter: pHash distance <= 10 and dHash distance <= 12
//! 2. Nothing survives: loose fallback over the best 8 rows, or nothing
//!    at all if even those are further than 24 bits away
//! 3. Survivors: narrow by edition hint, then score a confidence from the
//!    top candidate's combined distance
//! 4. First rung that holds wins: exact, confident, edition hint,
//!    otherwise ambiguous
//!
//! The thresholds are fixed constants. Changing any of them changes which
//! cards get identified, so they are not configuration.

mod edition;

pub use edition::EditionHint;

use crate::core::catalog::{BucketQuery, CatalogFingerprintRow, CatalogRepository, DEFAULT_SHORTLIST_LIMIT};
use crate::core::hasher::{hamming_distance64, Fingerprint, RawFingerprint};
use crate::core::result::{MatchEvidence, MatchedBy, NoneReason, ScanCandidate, ScanResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hard filter: maximum pHash distance for a row to be a real candidate
pub const HARD_MAX_PHASH_DISTANCE: u32 = 10;
/// Hard filter: maximum dHash distance for a row to be a real candidate
pub const HARD_MAX_DHASH_DISTANCE: u32 = 12;
/// Rows kept by the loose fallback
pub const LOOSE_CANDIDATE_COUNT: usize = 8;
/// Loose fallback gives up above this combined distance
pub const LOOSE_MAX_SCORE: u32 = 24;
pub const LOOSE_CONFIDENCE: f64 = 0.62;
/// Combined distance at which confidence reaches zero
pub const CONFIDENCE_DISTANCE_SCALE: f64 = 30.0;
pub const EXACT_MIN_CONFIDENCE: f64 = 0.86;
pub const CONFIDENT_MIN_CONFIDENCE: f64 = 0.83;
/// Runner-up must trail the top candidate by at least this much
pub const CONFIDENT_MIN_SEPARATION: u32 = 2;
pub const CONFIDENT_MAX_PHASH_DISTANCE: u32 = 12;
pub const CONFIDENT_MAX_DHASH_DISTANCE: u32 = 14;
pub const EDITION_HINT_MIN_CONFIDENCE: f64 = 0.82;

/// Confidence of a match at the given distances
pub fn confidence_for(phash_distance: u32, dhash_distance: u32) -> f64 {
    let combined = (phash_distance + dhash_distance) as f64;
    (1.0 - (combined / CONFIDENCE_DISTANCE_SCALE).min(1.0)).max(0.0)
}

/// A catalog row scored against the query fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub row: CatalogFingerprintRow,
    pub phash_distance: u32,
    pub dhash_distance: u32,
    /// `phash_distance + dhash_distance`
    pub score: u32,
}

impl ScoredCandidate {
    pub fn score(fingerprint: &Fingerprint, row: &CatalogFingerprintRow) -> Self {
        let phash_distance =
            hamming_distance64(fingerprint.phash_hi, fingerprint.phash_lo, row.phash_hi, row.phash_lo);
        let dhash_distance =
            hamming_distance64(fingerprint.dhash_hi, fingerprint.dhash_lo, row.dhash_hi, row.dhash_lo);
        Self {
            row: row.clone(),
            phash_distance,
            dhash_distance,
            score: phash_distance + dhash_distance,
        }
    }

    pub fn confidence(&self) -> f64 {
        confidence_for(self.phash_distance, self.dhash_distance)
    }

    fn passes_hard_filter(&self) -> bool {
        self.phash_distance <= HARD_MAX_PHASH_DISTANCE && self.dhash_distance <= HARD_MAX_DHASH_DISTANCE
    }

    pub fn to_scan_candidate(&self) -> ScanCandidate {
        ScanCandidate {
            card_id: self.row.card_id.clone(),
            name: None,
            set_code: Some(self.row.set_code.clone()),
            collector_number: Some(self.row.collector_number.clone()),
            lang: Some(self.row.lang.clone()),
            art_variant: Some(self.row.art_variant.clone()),
            phash_distance: Some(self.phash_distance),
            dhash_distance: Some(self.dhash_distance),
            score: Some(self.score),
        }
    }

    fn evidence(&self, variant_tag: &str) -> MatchEvidence {
        MatchEvidence {
            variant_tag: Some(variant_tag.to_string()),
            phash_distance: Some(self.phash_distance),
            dhash_distance: Some(self.dhash_distance),
            set_code: Some(self.row.set_code.clone()),
            collector_number: Some(self.row.collector_number.clone()),
            text: None,
        }
    }
}

/// Shortlist lookup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Rows requested from the catalog per lookup
    pub shortlist_limit: usize,
    /// Neighbouring buckets either side consulted when the exact bucket under-fills
    pub neighbor_range: u16,
    /// Pass the edition hint to the catalog so hinted rows are listed first
    pub prefilter_by_hint: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            shortlist_limit: DEFAULT_SHORTLIST_LIMIT,
            neighbor_range: 1,
            prefilter_by_hint: true,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shortlist_limit(mut self, limit: usize) -> Self {
        self.shortlist_limit = limit;
        self
    }

    pub fn neighbor_range(mut self, range: u16) -> Self {
        self.neighbor_range = range;
        self
    }

    pub fn prefilter_by_hint(mut self, enabled: bool) -> Self {
        self.prefilter_by_hint = enabled;
        self
    }
}

/// What the resolver saw on the way to its decision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolveDiagnostics {
    pub shortlist_size: usize,
    /// Smallest combined distance over every shortlisted row
    pub min_score: Option<u32>,
    /// Distinct cards that passed the hard filter
    pub hard_survivors: usize,
    /// Whether the edition hint narrowed survivors to a single card
    pub narrowed_by_hint: bool,
}

/// A decision plus its diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub result: ScanResult,
    pub diagnostics: ResolveDiagnostics,
}

impl Resolution {
    fn without_shortlist(reason: NoneReason) -> Self {
        Self {
            result: ScanResult::none(reason),
            diagnostics: ResolveDiagnostics::default(),
        }
    }
}

/// Resolves fingerprints against a catalog
pub struct FingerprintResolver {
    catalog: Arc<dyn CatalogRepository>,
    config: ResolverConfig,
}

impl FingerprintResolver {
    pub fn new(catalog: Arc<dyn CatalogRepository>, config: ResolverConfig) -> Self {
        Self { catalog, config }
    }

    pub fn with_defaults(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self::new(catalog, ResolverConfig::default())
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogRepository> {
        &self.catalog
    }

    /// Validate an untyped fingerprint, then resolve it.
    ///
    /// Any missing or non-finite field yields `None{fingerprint_unavailable}`.
    pub fn resolve_raw(&self, raw: &RawFingerprint, hint: Option<&EditionHint>) -> Resolution {
        match Fingerprint::from_raw(raw) {
            Some(fingerprint) => self.resolve(&fingerprint, hint),
            None => {
                debug!("fingerprint unavailable");
                Resolution::without_shortlist(NoneReason::FingerprintUnavailable)
            }
        }
    }

    /// Fetch the shortlist for `fingerprint` and decide
    pub fn resolve(&self, fingerprint: &Fingerprint, hint: Option<&EditionHint>) -> Resolution {
        let mut query = BucketQuery::new(self.config.shortlist_limit).neighbor_range(self.config.neighbor_range);
        if self.config.prefilter_by_hint {
            if let Some(hint) = hint {
                query = query.edition(Some(&hint.set_code), Some(&hint.collector_number));
            }
        }

        match self
            .catalog
            .search_fingerprint_candidates_by_bucket(fingerprint.bucket16, &query)
        {
            Ok(shortlist) => resolve_shortlist(fingerprint, &shortlist, hint),
            Err(e) => {
                warn!(error = %e, bucket = fingerprint.bucket16, "catalog lookup failed");
                Resolution::without_shortlist(NoneReason::CatalogUnavailable)
            }
        }
    }
}

/// Decide on an already-fetched shortlist. Pure: no catalog access.
pub fn resolve_shortlist(
    fingerprint: &Fingerprint,
    shortlist: &[CatalogFingerprintRow],
    hint: Option<&EditionHint>,
) -> Resolution {
    let mut diagnostics = ResolveDiagnostics {
        shortlist_size: shortlist.len(),
        ..Default::default()
    };

    if shortlist.is_empty() {
        debug!(bucket = fingerprint.bucket16, "no bucket hits");
        return Resolution {
            result: ScanResult::none(NoneReason::NoBucketHits),
            diagnostics,
        };
    }

    let mut scored: Vec<ScoredCandidate> = shortlist
        .iter()
        .map(|row| ScoredCandidate::score(fingerprint, row))
        .collect();
    sort_candidates(&mut scored);
    diagnostics.min_score = scored.first().map(|c| c.score);

    let survivors = dedup_by_card(scored.iter().filter(|c| c.passes_hard_filter()));
    diagnostics.hard_survivors = survivors.len();

    if survivors.is_empty() {
        let result = loose_fallback(&scored);
        debug!(
            shortlist = diagnostics.shortlist_size,
            min_score = ?diagnostics.min_score,
            status = result.status(),
            "no row passed the hard filter"
        );
        return Resolution { result, diagnostics };
    }

    let hinted: Vec<&ScoredCandidate> = match hint {
        Some(hint) => survivors.iter().copied().filter(|c| hint.matches_row(&c.row)).collect(),
        None => Vec::new(),
    };
    diagnostics.narrowed_by_hint = hinted.len() == 1;

    let candidates: &[&ScoredCandidate] = if diagnostics.narrowed_by_hint {
        &hinted
    } else {
        &survivors
    };
    let top = candidates[0];
    let confidence = top.confidence();

    let matched_by = if candidates.len() == 1
        && confidence >= EXACT_MIN_CONFIDENCE
        && top.phash_distance <= HARD_MAX_PHASH_DISTANCE
        && top.dhash_distance <= HARD_MAX_DHASH_DISTANCE
    {
        Some(MatchedBy::FingerprintExact)
    } else if candidates.len() >= 2
        && confidence >= CONFIDENT_MIN_CONFIDENCE
        && candidates[1].score >= top.score + CONFIDENT_MIN_SEPARATION
        && top.phash_distance <= CONFIDENT_MAX_PHASH_DISTANCE
        && top.dhash_distance <= CONFIDENT_MAX_DHASH_DISTANCE
    {
        Some(MatchedBy::FingerprintConfident)
    } else if hint.is_some() && diagnostics.narrowed_by_hint && confidence >= EDITION_HINT_MIN_CONFIDENCE {
        Some(MatchedBy::FingerprintWithEditionHint)
    } else {
        None
    };

    let result = match matched_by {
        Some(matched_by) => ScanResult::matched(
            top.row.card_id.clone(),
            matched_by,
            confidence,
            top.evidence(&fingerprint.variant_tag),
        ),
        None => ScanResult::ambiguous(
            survivors.iter().map(|c| c.to_scan_candidate()).collect(),
            confidence,
            MatchedBy::FingerprintAmbiguous,
        ),
    };

    debug!(
        variant = %fingerprint.variant_tag,
        shortlist = diagnostics.shortlist_size,
        survivors = diagnostics.hard_survivors,
        confidence,
        decision = result.matched_by().map(|m| m.as_str()).unwrap_or("none"),
        "resolved fingerprint"
    );

    Resolution { result, diagnostics }
}

/// Best rows by raw score when nothing passed the hard filter
fn loose_fallback(sorted: &[ScoredCandidate]) -> ScanResult {
    let best = dedup_by_card(sorted.iter());
    match best.first() {
        Some(top) if top.score <= LOOSE_MAX_SCORE => ScanResult::ambiguous(
            best.iter()
                .take(LOOSE_CANDIDATE_COUNT)
                .map(|c| c.to_scan_candidate())
                .collect(),
            LOOSE_CONFIDENCE,
            MatchedBy::LooseAmbiguous,
        ),
        _ => ScanResult::none(NoneReason::SimilarityTooLow),
    }
}

/// Best score first, then pHash distance, then card id for a stable order
fn sort_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        a.score
            .cmp(&b.score)
            .then(a.phash_distance.cmp(&b.phash_distance))
            .then_with(|| a.row.card_id.cmp(&b.row.card_id))
    });
}

/// Keep each card's best row, preserving order
fn dedup_by_card<'a>(sorted: impl Iterator<Item = &'a ScoredCandidate>) -> Vec<&'a ScoredCandidate> {
    let mut seen = HashSet::new();
    sorted
        .filter(|c| seen.insert(c.row.card_id.as_str()))
        .collect()
}
