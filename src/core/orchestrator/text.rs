//! Text recognition collaborators and name lookup.
//!
//! Recognized text is only a fallback signal. Title text is looked up
//! exact, then by prefix, then by substring; full text is tried line by
//! line. A name shared by several printings still counts as one card.

use crate::core::catalog::{normalize_name, CardRow, CatalogRepository, NameQuery};
use crate::core::geometry::FrameRect;
use crate::core::hasher::GrayscaleImage;
use crate::core::result::{MatchEvidence, MatchedBy, ScanCandidate, ScanResult};
use crate::error::CatalogError;

pub const OCR_TITLE_EXACT_CONFIDENCE: f64 = 0.9;
pub const OCR_TITLE_PREFIX_CONFIDENCE: f64 = 0.78;
pub const OCR_TITLE_CONTAINS_CONFIDENCE: f64 = 0.7;
pub const OCR_FULL_TEXT_CONFIDENCE: f64 = 0.72;
/// Full text lines tried, in reading order
pub const FULL_TEXT_MAX_LINES: usize = 8;
/// Lines with fewer alphanumerics than this are noise
pub const FULL_TEXT_MIN_ALNUM: usize = 3;
/// Prefix and substring lookups need at least this many normalized chars
pub const MIN_PARTIAL_NAME_LEN: usize = 3;
const NAME_SEARCH_LIMIT: usize = 12;

/// On-device text recognition.
///
/// Each call may fail or legitimately return an empty string; callers treat
/// both as "no text".
pub trait TextExtractor: Send + Sync {
    fn extract_title_text(&self, image: &GrayscaleImage, card_frame: &FrameRect) -> Result<String, String>;

    fn extract_footer_text(&self, image: &GrayscaleImage, card_frame: &FrameRect) -> Result<String, String>;

    fn extract_full_text(&self, image: &GrayscaleImage, card_frame: &FrameRect) -> Result<String, String>;
}

/// Text extractor for fingerprint-only scanning
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTextExtractor;

impl TextExtractor for NoTextExtractor {
    fn extract_title_text(&self, _image: &GrayscaleImage, _card_frame: &FrameRect) -> Result<String, String> {
        Ok(String::new())
    }

    fn extract_footer_text(&self, _image: &GrayscaleImage, _card_frame: &FrameRect) -> Result<String, String> {
        Ok(String::new())
    }

    fn extract_full_text(&self, _image: &GrayscaleImage, _card_frame: &FrameRect) -> Result<String, String> {
        Ok(String::new())
    }
}

/// A name lookup result plus every printing behind it
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    pub result: ScanResult,
    /// Card ids of all printings that matched, in catalog order
    pub printings: Vec<String>,
}

impl TextMatch {
    pub fn contains(&self, card_id: &str) -> bool {
        self.printings.iter().any(|id| id == card_id)
    }

    fn from_cards(cards: Vec<CardRow>, confidence: f64, single: MatchedBy, multiple: MatchedBy, text: &str) -> Self {
        let mut names: Vec<String> = Vec::new();
        for card in &cards {
            let name = normalize_name(&card.name);
            if !names.contains(&name) {
                names.push(name);
            }
        }

        let printings = cards.iter().map(|card| card.card_id.clone()).collect();
        let result = match cards.first() {
            Some(first) if names.len() == 1 => ScanResult::matched(
                first.card_id.clone(),
                single,
                confidence,
                MatchEvidence {
                    set_code: Some(first.set_code.clone()),
                    collector_number: Some(first.collector_number.clone()),
                    text: Some(text.to_string()),
                    ..Default::default()
                },
            ),
            _ => ScanResult::ambiguous(cards.iter().map(candidate_from_card).collect(), confidence, multiple),
        };

        Self { result, printings }
    }
}

fn candidate_from_card(card: &CardRow) -> ScanCandidate {
    ScanCandidate {
        card_id: card.card_id.clone(),
        name: Some(card.name.clone()),
        set_code: Some(card.set_code.clone()),
        collector_number: Some(card.collector_number.clone()),
        lang: Some(card.lang.clone()),
        ..Default::default()
    }
}

/// Look up a recognized title: exact, then prefix, then substring
pub fn resolve_title(catalog: &dyn CatalogRepository, title: &str) -> Result<Option<TextMatch>, CatalogError> {
    let title = title.trim();
    let normalized = normalize_name(title);
    if normalized.is_empty() {
        return Ok(None);
    }

    let mut tiers = vec![(NameQuery::exact(NAME_SEARCH_LIMIT), OCR_TITLE_EXACT_CONFIDENCE)];
    if normalized.len() >= MIN_PARTIAL_NAME_LEN {
        tiers.push((NameQuery::prefix(NAME_SEARCH_LIMIT), OCR_TITLE_PREFIX_CONFIDENCE));
        tiers.push((NameQuery::default(), OCR_TITLE_CONTAINS_CONFIDENCE));
    }

    for (query, confidence) in tiers {
        let cards = catalog.search_by_name_normalized(title, &query)?;
        if !cards.is_empty() {
            return Ok(Some(TextMatch::from_cards(
                cards,
                confidence,
                MatchedBy::OcrTitle,
                MatchedBy::OcrTitleAmbiguous,
                title,
            )));
        }
    }
    Ok(None)
}

/// Try the first lines of recognized full text as names.
///
/// The first line naming exactly one card wins; otherwise the first line
/// naming several becomes the ambiguous result.
pub fn resolve_full_text(catalog: &dyn CatalogRepository, text: &str) -> Result<Option<TextMatch>, CatalogError> {
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().filter(|c| c.is_alphanumeric()).count() >= FULL_TEXT_MIN_ALNUM)
        .take(FULL_TEXT_MAX_LINES);

    let mut first_ambiguous = None;
    for line in lines {
        for query in [NameQuery::exact(NAME_SEARCH_LIMIT), NameQuery::prefix(NAME_SEARCH_LIMIT)] {
            let cards = catalog.search_by_name_normalized(line, &query)?;
            if cards.is_empty() {
                continue;
            }
            let found = TextMatch::from_cards(
                cards,
                OCR_FULL_TEXT_CONFIDENCE,
                MatchedBy::OcrFullText,
                MatchedBy::OcrFullTextAmbiguous,
                line,
            );
            if found.result.is_matched() {
                return Ok(Some(found));
            }
            if first_ambiguous.is_none() {
                first_ambiguous = Some(found);
            }
            break;
        }
    }
    Ok(first_ambiguous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::InMemoryCatalog;

    fn card(id: &str, name: &str, set: &str) -> CardRow {
        CardRow {
            card_id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            set_code: set.into(),
            collector_number: "1".into(),
            lang: "en".into(),
        }
    }

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::with_rows(
            &[
                card("bolt-m10", "Lightning Bolt", "m10"),
                card("bolt-lea", "Lightning Bolt", "lea"),
                card("helix", "Lightning Helix", "rav"),
                card("saga", "Urza's Saga", "mh2"),
            ],
            &[],
        )
        .unwrap()
    }

    #[test]
    fn exact_title_with_several_printings_is_one_card() {
        let found = resolve_title(&catalog(), "Lightning Bolt").unwrap().unwrap();
        assert_eq!(found.result.matched_by(), Some(MatchedBy::OcrTitle));
        assert_eq!(found.result.confidence(), OCR_TITLE_EXACT_CONFIDENCE);
        assert!(found.contains("bolt-lea"));
        assert!(found.contains("bolt-m10"));
    }

    #[test]
    fn prefix_title_match_has_lower_confidence() {
        let found = resolve_title(&catalog(), "Urza's Sa").unwrap().unwrap();
        assert_eq!(found.result.card_id(), Some("saga"));
        assert_eq!(found.result.confidence(), OCR_TITLE_PREFIX_CONFIDENCE);
    }

    #[test]
    fn contains_title_match() {
        let found = resolve_title(&catalog(), "helix").unwrap().unwrap();
        assert_eq!(found.result.card_id(), Some("helix"));
        assert_eq!(found.result.confidence(), OCR_TITLE_CONTAINS_CONFIDENCE);
    }

    #[test]
    fn ambiguous_title_lists_names() {
        let found = resolve_title(&catalog(), "Lightning").unwrap().unwrap();
        assert_eq!(found.result.matched_by(), Some(MatchedBy::OcrTitleAmbiguous));
        assert_eq!(found.result.candidates().len(), 3);
        assert_eq!(found.result.candidates()[0].name.as_deref(), Some("Lightning Bolt"));
    }

    #[test]
    fn short_garbage_title_only_matches_exactly() {
        assert!(resolve_title(&catalog(), "li").unwrap().is_none());
        assert!(resolve_title(&catalog(), "   ").unwrap().is_none());
    }

    #[test]
    fn full_text_uses_first_unique_line() {
        let text = "~\nLightning\nInstant\nLightning Helix deals 3 damage\nLightning Helix";
        let found = resolve_full_text(&catalog(), text).unwrap().unwrap();
        assert_eq!(found.result.matched_by(), Some(MatchedBy::OcrFullText));
        assert_eq!(found.result.card_id(), Some("helix"));
    }

    #[test]
    fn full_text_falls_back_to_first_ambiguous_line() {
        let found = resolve_full_text(&catalog(), "Lightning\nnothing here").unwrap().unwrap();
        assert_eq!(found.result.matched_by(), Some(MatchedBy::OcrFullTextAmbiguous));
    }

    #[test]
    fn full_text_only_reads_the_first_lines() {
        let mut text = "filler line\n".repeat(FULL_TEXT_MAX_LINES);
        text.push_str("Lightning Helix");
        assert!(resolve_full_text(&catalog(), &text).unwrap().is_none());
    }
}
