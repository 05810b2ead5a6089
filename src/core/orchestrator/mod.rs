//! # Orchestrator Module
//!
//! Turns one captured frame into one [`ScanResult`].
//!
//! ## Order of attempts
//! 1. Edition fast path: a unique set + collector number read from the
//!    footer is looked up directly
//! 2. Fingerprints: every geometry variant is extracted and resolved; the
//!    most confident match wins, and the ambiguous result closest to the
//!    catalog is carried forward
//! 3. A fingerprint match is returned without consulting text recognition
//! 4. An ambiguous result narrowed to one printing by the edition hint
//! 5. Without text fallback: the carried ambiguous result, or nothing
//! 6. Text fallback: title then full text, reconciled with the carried
//!    fingerprint ambiguity (fingerprints win on conflict)
//!
//! Every path returns a result; catalog and text failures are logged and
//! treated as missing signal.

mod text;

pub use text::{
    resolve_full_text, resolve_title, NoTextExtractor, TextExtractor, TextMatch, FULL_TEXT_MAX_LINES,
    FULL_TEXT_MIN_ALNUM, MIN_PARTIAL_NAME_LEN, OCR_FULL_TEXT_CONFIDENCE, OCR_TITLE_CONTAINS_CONFIDENCE,
    OCR_TITLE_EXACT_CONFIDENCE, OCR_TITLE_PREFIX_CONFIDENCE,
};

use crate::core::catalog::CatalogRepository;
use crate::core::extractor::{ExtractorConfig, FingerprintExtractor};
use crate::core::geometry::{FrameRect, RegionKind};
use crate::core::hasher::{Fingerprint, GrayscaleImage};
use crate::core::resolver::{confidence_for, EditionHint, FingerprintResolver, Resolution, ResolverConfig};
use crate::core::result::{merge_candidates, MatchEvidence, MatchedBy, NoneReason, ScanCandidate, ScanResult};
use crate::error::CatalogError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Confidence of a direct set + collector number hit
pub const SET_COLLECTOR_CONFIDENCE: f64 = 0.97;
/// Confidence when an edition hint picks one printing out of an ambiguous set
pub const EDITION_RESOLVED_CONFIDENCE: f64 = 0.9;

/// One captured frame and where the card sits in it
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// `None` when capture produced nothing usable
    pub image: Option<Arc<GrayscaleImage>>,
    /// Card bounding box as frame ratios; the whole frame when unknown
    pub card_frame: Option<FrameRect>,
    /// Which part of the card to fingerprint
    pub region: RegionKind,
}

impl FrameInput {
    pub fn new(image: GrayscaleImage) -> Self {
        Self {
            image: Some(Arc::new(image)),
            ..Default::default()
        }
    }

    pub fn card_frame(mut self, card_frame: FrameRect) -> Self {
        self.card_frame = Some(card_frame);
        self
    }

    pub fn region(mut self, region: RegionKind) -> Self {
        self.region = region;
        self
    }
}

/// What a caller allows for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPolicy {
    /// Fall back to title/full text recognition when fingerprints are not decisive
    pub allow_ocr_fallback: bool,
    /// Read the footer for a set + collector number hint
    pub read_footer: bool,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            allow_ocr_fallback: true,
            read_footer: true,
        }
    }
}

impl ScanPolicy {
    /// Fingerprints only, no text recognition at all
    pub fn fingerprint_only() -> Self {
        Self {
            allow_ocr_fallback: false,
            read_footer: false,
        }
    }

    pub fn allow_ocr_fallback(mut self, allowed: bool) -> Self {
        self.allow_ocr_fallback = allowed;
        self
    }

    pub fn read_footer(mut self, enabled: bool) -> Self {
        self.read_footer = enabled;
        self
    }
}

/// A frame after extraction, ready for resolution
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    pub image: Arc<GrayscaleImage>,
    /// Clamped card frame actually used
    pub card_frame: FrameRect,
    pub hint: Option<EditionHint>,
    pub fingerprints: Vec<Fingerprint>,
}

/// Output of the extraction step
#[derive(Debug, Clone)]
pub enum PreparedScan {
    /// Settled without fingerprint resolution
    Decided(ScanResult),
    Extracted(ExtractedFrame),
}

/// Best outcomes across all geometry variants of one frame
#[derive(Debug, Default)]
struct VariantOutcome {
    best_match: Option<ScanResult>,
    best_ambiguous: Option<ScanResult>,
    best_ambiguous_score: Option<u32>,
    catalog_failures: usize,
    resolved: usize,
}

impl VariantOutcome {
    fn collect(resolutions: Vec<Resolution>) -> Self {
        let mut outcome = Self {
            resolved: resolutions.len(),
            ..Default::default()
        };

        for resolution in resolutions {
            let Resolution { result, diagnostics } = resolution;
            match result {
                ScanResult::Matched { .. } => {
                    let confidence = result.confidence();
                    let better = outcome
                        .best_match
                        .as_ref()
                        .map_or(true, |best| confidence > best.confidence());
                    if better {
                        outcome.best_match = Some(result);
                    }
                }
                ScanResult::Ambiguous { .. } => {
                    let score = diagnostics.min_score.unwrap_or(u32::MAX);
                    let better = outcome.best_ambiguous_score.map_or(true, |best| score < best);
                    if better {
                        outcome.best_ambiguous_score = Some(score);
                        outcome.best_ambiguous = Some(result);
                    }
                }
                ScanResult::None { reason } => {
                    if reason == NoneReason::CatalogUnavailable {
                        outcome.catalog_failures += 1;
                    }
                }
            }
        }
        outcome
    }

    fn catalog_down(&self) -> bool {
        self.resolved > 0 && self.catalog_failures == self.resolved
    }
}

/// Combines fingerprint resolution with text fallback
pub struct ScanOrchestrator {
    catalog: Arc<dyn CatalogRepository>,
    extractor: FingerprintExtractor,
    resolver: FingerprintResolver,
    text: Arc<dyn TextExtractor>,
}

impl ScanOrchestrator {
    pub fn new(catalog: Arc<dyn CatalogRepository>, text: Arc<dyn TextExtractor>) -> Self {
        Self {
            extractor: FingerprintExtractor::default(),
            resolver: FingerprintResolver::with_defaults(Arc::clone(&catalog)),
            catalog,
            text,
        }
    }

    /// Orchestrator that never reads text
    pub fn fingerprint_only(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self::new(catalog, Arc::new(NoTextExtractor))
    }

    pub fn with_extractor_config(mut self, config: ExtractorConfig) -> Self {
        self.extractor = FingerprintExtractor::new(config);
        self
    }

    pub fn with_resolver_config(mut self, config: ResolverConfig) -> Self {
        self.resolver = FingerprintResolver::new(Arc::clone(&self.catalog), config);
        self
    }

    pub fn extractor(&self) -> &FingerprintExtractor {
        &self.extractor
    }

    pub fn resolver(&self) -> &FingerprintResolver {
        &self.resolver
    }

    /// Identify the card in one frame. Always returns a result.
    pub fn resolve_scan(&self, input: &FrameInput, policy: &ScanPolicy) -> ScanResult {
        match self.prepare_scan(input, policy) {
            PreparedScan::Decided(result) => result,
            PreparedScan::Extracted(extracted) => self.finish_scan(&extracted, policy),
        }
    }

    /// Footer read, edition fast path and fingerprint extraction.
    ///
    /// Frames that are settled before any resolution come back as
    /// [`PreparedScan::Decided`].
    pub fn prepare_scan(&self, input: &FrameInput, policy: &ScanPolicy) -> PreparedScan {
        let Some(image) = input.image.clone() else {
            debug!("no image for this frame");
            return PreparedScan::Decided(ScanResult::none(NoneReason::ImageUnavailable));
        };
        let card_frame = input
            .card_frame
            .and_then(|frame| frame.clamp_unit())
            .unwrap_or(FrameRect::FULL);

        let hint = if policy.read_footer {
            self.read_edition_hint(&image, &card_frame)
        } else {
            None
        };
        if let Some(hint) = &hint {
            if let Some(result) = self.edition_fast_path(hint) {
                info!(card_id = result.card_id().unwrap_or_default(), %hint, "matched by set and collector number");
                return PreparedScan::Decided(result);
            }
        }

        let fingerprints = self.extractor.extract_region(&image, &card_frame, input.region);
        PreparedScan::Extracted(ExtractedFrame {
            image,
            card_frame,
            hint,
            fingerprints,
        })
    }

    /// Fingerprint resolution, edition tiebreak and text reconciliation
    pub fn finish_scan(&self, frame: &ExtractedFrame, policy: &ScanPolicy) -> ScanResult {
        let hint = frame.hint.as_ref();
        let outcome = self.resolve_fingerprints(&frame.fingerprints, hint);

        if let Some(matched) = outcome.best_match {
            debug!(
                card_id = matched.card_id().unwrap_or_default(),
                confidence = matched.confidence(),
                "fingerprint match"
            );
            return matched;
        }

        if let (Some(ambiguous), Some(hint)) = (&outcome.best_ambiguous, hint) {
            if let Some(resolved) = resolve_by_edition(ambiguous, hint) {
                debug!(%hint, "edition hint resolved fingerprint ambiguity");
                return resolved;
            }
        }

        if !policy.allow_ocr_fallback {
            if let Some(ambiguous) = outcome.best_ambiguous {
                return ambiguous;
            }
            let reason = if outcome.catalog_down() {
                NoneReason::CatalogUnavailable
            } else {
                NoneReason::FingerprintNoConfidentMatch
            };
            debug!(fingerprints = frame.fingerprints.len(), %reason, "no fingerprint decision");
            return ScanResult::none(reason);
        }

        let text_match = self.text_fallback(&frame.image, &frame.card_frame);
        reconcile(outcome.best_ambiguous, text_match)
    }

    /// Resolve every fingerprint, variants in parallel
    pub fn resolve_variants(&self, fingerprints: &[Fingerprint], hint: Option<&EditionHint>) -> Vec<Resolution> {
        fingerprints
            .par_iter()
            .map(|fingerprint| self.resolver.resolve(fingerprint, hint))
            .collect()
    }

    fn resolve_fingerprints(&self, fingerprints: &[Fingerprint], hint: Option<&EditionHint>) -> VariantOutcome {
        VariantOutcome::collect(self.resolve_variants(fingerprints, hint))
    }

    fn read_edition_hint(&self, image: &GrayscaleImage, card_frame: &FrameRect) -> Option<EditionHint> {
        match self.text.extract_footer_text(image, card_frame) {
            Ok(footer) => EditionHint::parse_footer(&footer),
            Err(e) => {
                warn!(error = %e, "footer text recognition failed");
                None
            }
        }
    }

    fn edition_fast_path(&self, hint: &EditionHint) -> Option<ScanResult> {
        let cards = match self.catalog.find_by_set_collector(&hint.set_code, &hint.collector_number) {
            Ok(cards) => cards,
            Err(e) => {
                warn!(error = %e, %hint, "edition lookup failed");
                return None;
            }
        };
        match cards.as_slice() {
            [card] => Some(ScanResult::matched(
                card.card_id.clone(),
                MatchedBy::SetCollectorExact,
                SET_COLLECTOR_CONFIDENCE,
                MatchEvidence {
                    set_code: Some(card.set_code.clone()),
                    collector_number: Some(card.collector_number.clone()),
                    ..Default::default()
                },
            )),
            _ => None,
        }
    }

    /// Title first; full text only when the title is not decisive
    fn text_fallback(&self, image: &GrayscaleImage, card_frame: &FrameRect) -> Option<TextMatch> {
        let catalog = self.catalog.as_ref();

        let title = read_text("title", self.text.extract_title_text(image, card_frame))
            .and_then(|text| lookup("title", resolve_title(catalog, &text)));
        if title.as_ref().is_some_and(|m| m.result.is_matched()) {
            return title;
        }

        let full = read_text("full", self.text.extract_full_text(image, card_frame))
            .and_then(|text| lookup("full", resolve_full_text(catalog, &text)));
        if full.as_ref().is_some_and(|m| m.result.is_matched()) {
            return full;
        }

        title.or(full)
    }
}

fn read_text(kind: &str, text: Result<String, String>) -> Option<String> {
    match text {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            warn!(kind, error = %e, "text recognition failed");
            None
        }
    }
}

fn lookup(kind: &str, found: Result<Option<TextMatch>, CatalogError>) -> Option<TextMatch> {
    found.unwrap_or_else(|e| {
        warn!(kind, error = %e, "name lookup failed");
        None
    })
}

/// Pick the single printing an edition hint points at among ambiguous candidates
fn resolve_by_edition(ambiguous: &ScanResult, hint: &EditionHint) -> Option<ScanResult> {
    let mut hinted = ambiguous.candidates().iter().filter(|c| hint.matches_candidate(c));
    let candidate = hinted.next()?;
    if hinted.any(|other| other.card_id != candidate.card_id) {
        return None;
    }
    let confidence = match (candidate.phash_distance, candidate.dhash_distance) {
        (Some(p), Some(d)) => confidence_for(p, d).max(EDITION_RESOLVED_CONFIDENCE),
        _ => EDITION_RESOLVED_CONFIDENCE,
    };
    Some(ScanResult::matched(
        candidate.card_id.clone(),
        MatchedBy::FingerprintAmbiguousResolvedByEdition,
        confidence,
        evidence_from_candidate(candidate, None),
    ))
}

fn evidence_from_candidate(candidate: &ScanCandidate, text: Option<&str>) -> MatchEvidence {
    MatchEvidence {
        variant_tag: None,
        phash_distance: candidate.phash_distance,
        dhash_distance: candidate.dhash_distance,
        set_code: candidate.set_code.clone(),
        collector_number: candidate.collector_number.clone(),
        text: text.map(str::to_string),
    }
}

/// Combine the carried fingerprint ambiguity with the text result
fn reconcile(fingerprint: Option<ScanResult>, text: Option<TextMatch>) -> ScanResult {
    match (fingerprint, text) {
        (Some(ambiguous), Some(text)) => match &text.result {
            ScanResult::Matched {
                confidence: text_confidence,
                evidence,
                ..
            } => {
                let agreed = ambiguous
                    .candidates()
                    .iter()
                    .find(|c| text.contains(&c.card_id))
                    .cloned();
                match agreed {
                    Some(candidate) => {
                        debug!(card_id = %candidate.card_id, "fingerprint and text agree");
                        ScanResult::matched(
                            candidate.card_id.clone(),
                            MatchedBy::FingerprintOcrConsensus,
                            ambiguous.confidence().max(*text_confidence),
                            evidence_from_candidate(&candidate, evidence.text.as_deref()),
                        )
                    }
                    None => {
                        debug!(text_card = ?text.result.card_id(), "text disagrees with fingerprints");
                        ambiguous.retagged(MatchedBy::FingerprintOcrConflict)
                    }
                }
            }
            ScanResult::Ambiguous { candidates, .. } => ScanResult::ambiguous(
                merge_candidates(ambiguous.candidates(), candidates),
                ambiguous.confidence(),
                MatchedBy::FingerprintOcrAmbiguous,
            ),
            ScanResult::None { .. } => ambiguous,
        },
        (Some(ambiguous), None) => ambiguous,
        (None, Some(text)) => text.result,
        (None, None) => ScanResult::none(NoneReason::NoConfidentMatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{CardRow, CatalogFingerprintRow, CatalogStore, InMemoryCatalog};

    struct FixedText {
        title: Result<String, String>,
        footer: Result<String, String>,
        full: Result<String, String>,
    }

    impl FixedText {
        fn new(title: &str, footer: &str, full: &str) -> Self {
            Self {
                title: Ok(title.into()),
                footer: Ok(footer.into()),
                full: Ok(full.into()),
            }
        }
    }

    impl TextExtractor for FixedText {
        fn extract_title_text(&self, _: &GrayscaleImage, _: &FrameRect) -> Result<String, String> {
            self.title.clone()
        }
        fn extract_footer_text(&self, _: &GrayscaleImage, _: &FrameRect) -> Result<String, String> {
            self.footer.clone()
        }
        fn extract_full_text(&self, _: &GrayscaleImage, _: &FrameRect) -> Result<String, String> {
            self.full.clone()
        }
    }

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

    fn textured() -> GrayscaleImage {
        GrayscaleImage::from_fn(160, 224, |x, y| (((x / 6) * 53 + (y / 9) * 97) % 256) as u8)
    }

    fn fp_rows(card: &CardRow, fingerprints: &[Fingerprint]) -> Vec<CatalogFingerprintRow> {
        fingerprints
            .iter()
            .map(|fp| CatalogFingerprintRow::from_fingerprint(card, "full", fp))
            .collect()
    }

    fn ambiguous(ids: &[&str]) -> ScanResult {
        ScanResult::ambiguous(
            ids.iter()
                .map(|id| ScanCandidate {
                    card_id: id.to_string(),
                    set_code: Some("tst".into()),
                    collector_number: Some(id.trim_start_matches('c').into()),
                    phash_distance: Some(4),
                    dhash_distance: Some(4),
                    score: Some(8),
                    ..Default::default()
                })
                .collect(),
            0.73,
            MatchedBy::FingerprintAmbiguous,
        )
    }

    fn text_match(ids: &[&str], matched: bool) -> TextMatch {
        let result = if matched {
            ScanResult::matched(ids[0], MatchedBy::OcrTitle, 0.9, MatchEvidence::default())
        } else {
            ScanResult::ambiguous(
                ids.iter()
                    .map(|id| ScanCandidate {
                        card_id: id.to_string(),
                        ..Default::default()
                    })
                    .collect(),
                0.9,
                MatchedBy::OcrTitleAmbiguous,
            )
        };
        TextMatch {
            result,
            printings: ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    #[test]
    fn missing_image_is_image_unavailable() {
        let orchestrator = ScanOrchestrator::fingerprint_only(Arc::new(InMemoryCatalog::new()));
        let result = orchestrator.resolve_scan(&FrameInput::default(), &ScanPolicy::default());
        assert_eq!(result, ScanResult::none(NoneReason::ImageUnavailable));
    }

    #[test]
    fn footer_fast_path_skips_hashing() {
        let catalog = Arc::new(InMemoryCatalog::with_rows(&[card("a", "Alpha", "DMU", "7")], &[]).unwrap());
        let orchestrator = ScanOrchestrator::new(catalog, Arc::new(FixedText::new("", "007/281 DMU", "")));

        let flat = GrayscaleImage::from_fn(100, 140, |_, _| 50);
        let result = orchestrator.resolve_scan(&FrameInput::new(flat), &ScanPolicy::default());
        assert_eq!(result.matched_by(), Some(MatchedBy::SetCollectorExact));
        assert!(result.confidence() >= 0.95);
    }

    #[test]
    fn fingerprint_match_of_indexed_frame() {
        let image = textured();
        let reference = card("ref", "Reference", "tst", "1");
        let extractor = FingerprintExtractor::default();
        let fingerprints = extractor.extract_region(&image, &FrameRect::FULL, RegionKind::FullCard);
        assert!(!fingerprints.is_empty());

        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.upsert_card(&reference).unwrap();
        catalog.insert_fingerprints(&fp_rows(&reference, &fingerprints)).unwrap();

        let orchestrator = ScanOrchestrator::fingerprint_only(catalog);
        let result = orchestrator.resolve_scan(&FrameInput::new(image), &ScanPolicy::fingerprint_only());
        assert_eq!(result.card_id(), Some("ref"));
        assert_eq!(result.matched_by(), Some(MatchedBy::FingerprintExact));
    }

    #[test]
    fn no_fallback_reports_no_confident_match() {
        let orchestrator = ScanOrchestrator::fingerprint_only(Arc::new(InMemoryCatalog::new()));
        let result = orchestrator.resolve_scan(&FrameInput::new(textured()), &ScanPolicy::fingerprint_only());
        assert_eq!(result, ScanResult::none(NoneReason::FingerprintNoConfidentMatch));
    }

    #[test]
    fn title_fallback_when_fingerprints_miss() {
        let catalog = Arc::new(InMemoryCatalog::with_rows(&[card("bolt", "Lightning Bolt", "m10", "146")], &[]).unwrap());
        let orchestrator = ScanOrchestrator::new(catalog, Arc::new(FixedText::new("Lightning Bolt", "", "")));
        let result = orchestrator.resolve_scan(&FrameInput::new(textured()), &ScanPolicy::default());
        assert_eq!(result.matched_by(), Some(MatchedBy::OcrTitle));
        assert_eq!(result.card_id(), Some("bolt"));
    }

    #[test]
    fn failing_text_recognition_is_not_fatal() {
        let text = FixedText {
            title: Err("engine crashed".into()),
            footer: Err("engine crashed".into()),
            full: Err("engine crashed".into()),
        };
        let orchestrator = ScanOrchestrator::new(Arc::new(InMemoryCatalog::new()), Arc::new(text));
        let result = orchestrator.resolve_scan(&FrameInput::new(textured()), &ScanPolicy::default());
        assert_eq!(result, ScanResult::none(NoneReason::NoConfidentMatch));
    }

    #[test]
    fn prepared_frame_carries_fingerprints_and_hint() {
        let orchestrator = ScanOrchestrator::new(
            Arc::new(InMemoryCatalog::new()),
            Arc::new(FixedText::new("", "12/99 ZZZ", "")),
        );
        let input = FrameInput::new(textured()).card_frame(FrameRect::new(-0.2, 0.0, 1.5, 1.0));
        let PreparedScan::Extracted(frame) = orchestrator.prepare_scan(&input, &ScanPolicy::default()) else {
            panic!("expected an extracted frame");
        };
        assert_eq!(frame.hint, Some(EditionHint::new("zzz", "12")));
        assert!(!frame.fingerprints.is_empty());
        assert!(frame.card_frame.x >= 0.0 && frame.card_frame.x + frame.card_frame.width <= 1.0 + 1e-9);
    }

    #[test]
    fn consensus_upgrades_to_match() {
        let result = reconcile(Some(ambiguous(&["c1", "c2"])), Some(text_match(&["c2"], true)));
        assert_eq!(result.matched_by(), Some(MatchedBy::FingerprintOcrConsensus));
        assert_eq!(result.card_id(), Some("c2"));
        assert_eq!(result.confidence(), 0.9);
    }

    #[test]
    fn consensus_accepts_any_printing_of_the_title() {
        let result = reconcile(Some(ambiguous(&["c1", "c2"])), Some(text_match(&["c9", "c1"], true)));
        assert_eq!(result.card_id(), Some("c1"));
    }

    #[test]
    fn conflict_keeps_fingerprint_candidates() {
        let result = reconcile(Some(ambiguous(&["c1", "c2"])), Some(text_match(&["c9"], true)));
        assert_eq!(result.matched_by(), Some(MatchedBy::FingerprintOcrConflict));
        assert_eq!(result.candidates().len(), 2);
    }

    #[test]
    fn double_ambiguity_merges_candidates() {
        let result = reconcile(Some(ambiguous(&["c1", "c2"])), Some(text_match(&["c2", "c3"], false)));
        assert_eq!(result.matched_by(), Some(MatchedBy::FingerprintOcrAmbiguous));
        let ids: Vec<_> = result.candidates().iter().map(|c| c.card_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn nothing_at_all_is_no_confident_match() {
        assert_eq!(reconcile(None, None), ScanResult::none(NoneReason::NoConfidentMatch));
        let carried = reconcile(Some(ambiguous(&["c1"])), None);
        assert_eq!(carried.matched_by(), Some(MatchedBy::FingerprintAmbiguous));
    }

    #[test]
    fn edition_hint_resolves_ambiguity() {
        let hint = EditionHint::new("TST", "2");
        let result = resolve_by_edition(&ambiguous(&["c1", "c2"]), &hint).unwrap();
        assert_eq!(result.card_id(), Some("c2"));
        assert_eq!(result.matched_by(), Some(MatchedBy::FingerprintAmbiguousResolvedByEdition));

        let miss = EditionHint::new("TST", "9");
        assert!(resolve_by_edition(&ambiguous(&["c1", "c2"]), &miss).is_none());
    }
}
