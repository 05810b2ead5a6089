//! Edition hints: the (set code, collector number) pair printed in a card's
//! footer, used to tell apart printings that share artwork.

use crate::core::catalog::{normalize_collector_number, normalize_set_code, CatalogFingerprintRow};
use crate::core::result::ScanCandidate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

static COLLECTOR_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static SET_CODE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

/// Uppercase footer words that are never set codes
const SET_CODE_STOP_LIST: &[&str] = &[
    "THE", "AND", "FOR", "LLC", "INC", "ILLUS", "ART", "WOTC", "COAST", "TCG", "PROMO", "FOIL",
];

fn collector_pattern() -> Option<&'static Regex> {
    COLLECTOR_PATTERN
        .get_or_init(|| Regex::new(r"(?i)\b(\d{1,4}[a-z]?)(?:\s*/\s*(\d{1,4}))?\b").ok())
        .as_ref()
}

fn set_code_pattern() -> Option<&'static Regex> {
    SET_CODE_PATTERN
        .get_or_init(|| Regex::new(r"\b([A-Z][A-Z0-9]{2,4})\b").ok())
        .as_ref()
}

/// A set code and collector number read from auxiliary text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditionHint {
    pub set_code: String,
    pub collector_number: String,
}

impl EditionHint {
    pub fn new(set_code: impl Into<String>, collector_number: impl Into<String>) -> Self {
        Self {
            set_code: set_code.into(),
            collector_number: collector_number.into(),
        }
    }

    /// Read an edition from footer text such as `"123/280 R\nDMU • EN"`.
    ///
    /// Returns `None` unless exactly one distinct set code and exactly one
    /// distinct collector number appear. Bare four-digit years are not
    /// collector numbers.
    pub fn parse_footer(text: &str) -> Option<Self> {
        let collector_re = collector_pattern()?;
        let set_re = set_code_pattern()?;

        let mut numbers = BTreeSet::new();
        for caps in collector_re.captures_iter(text) {
            let number = &caps[1];
            let has_total = caps.get(2).is_some();
            let looks_like_year =
                number.len() == 4 && (number.starts_with("19") || number.starts_with("20"));
            if looks_like_year && !has_total {
                continue;
            }
            numbers.insert(normalize_collector_number(number));
        }

        let mut sets = BTreeSet::new();
        for caps in set_re.captures_iter(text) {
            let code = &caps[1];
            if SET_CODE_STOP_LIST.contains(&code) {
                continue;
            }
            sets.insert(normalize_set_code(code));
        }

        if numbers.len() != 1 || sets.len() != 1 {
            return None;
        }
        let collector_number = numbers.into_iter().next()?;
        let set_code = sets.into_iter().next()?;
        Some(Self::new(set_code, collector_number))
    }

    fn is(&self, set_code: &str, collector_number: &str) -> bool {
        normalize_set_code(&self.set_code) == normalize_set_code(set_code)
            && normalize_collector_number(&self.collector_number)
                == normalize_collector_number(collector_number)
    }

    pub fn matches_row(&self, row: &CatalogFingerprintRow) -> bool {
        self.is(&row.set_code, &row.collector_number)
    }

    /// Candidates without edition fields never match
    pub fn matches_candidate(&self, candidate: &ScanCandidate) -> bool {
        match (&candidate.set_code, &candidate.collector_number) {
            (Some(set_code), Some(number)) => self.is(set_code, number),
            _ => false,
        }
    }
}

impl std::fmt::Display for EditionHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} #{}", self.set_code.to_uppercase(), self.collector_number)
    }
}
