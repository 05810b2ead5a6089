//! The recognition result that crosses the UI boundary.
//!
//! `ScanResult` is plain data: it serializes to JSON with a `status` tag
//! (`matched`, `ambiguous`, `none`) and never holds live handles.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Most candidates an ambiguous result may carry
pub const MAX_AMBIGUOUS_CANDIDATES: usize = 12;

/// Which decision path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    SetCollectorExact,
    FingerprintExact,
    FingerprintConfident,
    FingerprintWithEditionHint,
    FingerprintAmbiguous,
    LooseAmbiguous,
    FingerprintAmbiguousResolvedByEdition,
    FingerprintOcrConsensus,
    FingerprintOcrConflict,
    FingerprintOcrAmbiguous,
    OcrTitle,
    OcrTitleAmbiguous,
    OcrFullText,
    OcrFullTextAmbiguous,
}

impl MatchedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchedBy::SetCollectorExact => "set_collector_exact",
            MatchedBy::FingerprintExact => "fingerprint_exact",
            MatchedBy::FingerprintConfident => "fingerprint_confident",
            MatchedBy::FingerprintWithEditionHint => "fingerprint_with_edition_hint",
            MatchedBy::FingerprintAmbiguous => "fingerprint_ambiguous",
            MatchedBy::LooseAmbiguous => "loose_ambiguous",
            MatchedBy::FingerprintAmbiguousResolvedByEdition => "fingerprint_ambiguous_resolved_by_edition",
            MatchedBy::FingerprintOcrConsensus => "fingerprint_ocr_consensus",
            MatchedBy::FingerprintOcrConflict => "fingerprint_ocr_conflict",
            MatchedBy::FingerprintOcrAmbiguous => "fingerprint_ocr_ambiguous",
            MatchedBy::OcrTitle => "ocr_title",
            MatchedBy::OcrTitleAmbiguous => "ocr_title_ambiguous",
            MatchedBy::OcrFullText => "ocr_full_text",
            MatchedBy::OcrFullTextAmbiguous => "ocr_full_text_ambiguous",
        }
    }

    /// Paths backed by image fingerprints or an exact edition lookup.
    /// These need fewer repeat cycles before navigation.
    pub fn is_fingerprint_trusted(&self) -> bool {
        matches!(
            self,
            MatchedBy::SetCollectorExact
                | MatchedBy::FingerprintExact
                | MatchedBy::FingerprintConfident
                | MatchedBy::FingerprintWithEditionHint
                | MatchedBy::FingerprintAmbiguousResolvedByEdition
                | MatchedBy::FingerprintOcrConsensus
        )
    }
}

impl std::fmt::Display for MatchedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why no card was identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoneReason {
    FingerprintUnavailable,
    NoBucketHits,
    SimilarityTooLow,
    FingerprintNoConfidentMatch,
    NoConfidentMatch,
    ImageUnavailable,
    CatalogUnavailable,
}

impl NoneReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoneReason::FingerprintUnavailable => "fingerprint_unavailable",
            NoneReason::NoBucketHits => "no_bucket_hits",
            NoneReason::SimilarityTooLow => "similarity_too_low",
            NoneReason::FingerprintNoConfidentMatch => "fingerprint_no_confident_match",
            NoneReason::NoConfidentMatch => "no_confident_match",
            NoneReason::ImageUnavailable => "image_unavailable",
            NoneReason::CatalogUnavailable => "catalog_unavailable",
        }
    }
}

impl std::fmt::Display for NoneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One possible card in an ambiguous result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanCandidate {
    pub card_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub art_variant: Option<String>,
    /// Fingerprint distances; absent for text-only candidates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phash_distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhash_distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

/// What supported a match
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchEvidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phash_distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhash_distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector_number: Option<String>,
    /// Recognized text that drove a text-based match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Outcome of one recognition attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanResult {
    Matched {
        card_id: String,
        matched_by: MatchedBy,
        confidence: f64,
        evidence: MatchEvidence,
    },
    Ambiguous {
        candidates: Vec<ScanCandidate>,
        confidence: f64,
        matched_by: MatchedBy,
    },
    None {
        reason: NoneReason,
    },
}

impl ScanResult {
    pub fn none(reason: NoneReason) -> Self {
        ScanResult::None { reason }
    }

    /// A match with confidence clamped into [0, 1]
    pub fn matched(
        card_id: impl Into<String>,
        matched_by: MatchedBy,
        confidence: f64,
        evidence: MatchEvidence,
    ) -> Self {
        ScanResult::Matched {
            card_id: card_id.into(),
            matched_by,
            confidence: clamp_confidence(confidence),
            evidence,
        }
    }

    /// An ambiguous result, deduplicated by card id and capped at
    /// [`MAX_AMBIGUOUS_CANDIDATES`]. An empty list becomes
    /// `None{no_confident_match}` so ambiguity always names a candidate.
    pub fn ambiguous(candidates: Vec<ScanCandidate>, confidence: f64, matched_by: MatchedBy) -> Self {
        let candidates = merge_candidates(&candidates, &[]);
        if candidates.is_empty() {
            return ScanResult::none(NoneReason::NoConfidentMatch);
        }
        ScanResult::Ambiguous {
            candidates,
            confidence: clamp_confidence(confidence),
            matched_by,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, ScanResult::Matched { .. })
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ScanResult::Ambiguous { .. })
    }

    /// Matched card id, if any
    pub fn card_id(&self) -> Option<&str> {
        match self {
            ScanResult::Matched { card_id, .. } => Some(card_id),
            _ => None,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            ScanResult::Matched { confidence, .. } | ScanResult::Ambiguous { confidence, .. } => *confidence,
            ScanResult::None { .. } => 0.0,
        }
    }

    pub fn matched_by(&self) -> Option<MatchedBy> {
        match self {
            ScanResult::Matched { matched_by, .. } | ScanResult::Ambiguous { matched_by, .. } => Some(*matched_by),
            ScanResult::None { .. } => None,
        }
    }

    pub fn candidates(&self) -> &[ScanCandidate] {
        match self {
            ScanResult::Ambiguous { candidates, .. } => candidates,
            _ => &[],
        }
    }

    /// Lowest fingerprint score among candidates, used to rank ambiguous
    /// results from different variants
    pub fn min_candidate_score(&self) -> Option<u32> {
        self.candidates().iter().filter_map(|c| c.score).min()
    }

    pub fn status(&self) -> &'static str {
        match self {
            ScanResult::Matched { .. } => "matched",
            ScanResult::Ambiguous { .. } => "ambiguous",
            ScanResult::None { .. } => "none",
        }
    }

    /// Same result with a different decision tag (no-op for `None`)
    pub fn retagged(self, tag: MatchedBy) -> Self {
        match self {
            ScanResult::Matched {
                card_id,
                confidence,
                evidence,
                ..
            } => ScanResult::Matched {
                card_id,
                matched_by: tag,
                confidence,
                evidence,
            },
            ScanResult::Ambiguous {
                candidates,
                confidence,
                ..
            } => ScanResult::Ambiguous {
                candidates,
                confidence,
                matched_by: tag,
            },
            none => none,
        }
    }
}

/// Concatenate two candidate lists, keeping the first occurrence of each
/// card id, capped at [`MAX_AMBIGUOUS_CANDIDATES`]
pub fn merge_candidates(primary: &[ScanCandidate], secondary: &[ScanCandidate]) -> Vec<ScanCandidate> {
    let mut seen = HashSet::new();
    primary
        .iter()
        .chain(secondary.iter())
        .filter(|candidate| seen.insert(candidate.card_id.clone()))
        .take(MAX_AMBIGUOUS_CANDIDATES)
        .cloned()
        .collect()
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
