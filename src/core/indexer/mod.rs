//! # Indexer Module
//!
//! Builds the local catalog from reference card images.
//!
//! ## Phases
//! 1. Load a JSON manifest of printings and their reference images
//! 2. Decode and fingerprint every image in parallel (one fingerprint per
//!    configured region, always the untouched base crop)
//! 3. Write cards and fingerprint rows sequentially, replacing any previous
//!    fingerprints of the same card
//!
//! An unreadable image only skips its card; a failing catalog write stops
//! the build.

use crate::core::catalog::{CardRow, CatalogFingerprintRow, CatalogStore};
use crate::core::extractor::{ExtractorConfig, FingerprintExtractor};
use crate::core::frame::{FrameDecoder, DEFAULT_MAX_DIMENSION};
use crate::core::geometry::{FrameRect, RegionKind};
use crate::error::CatalogError;
use crate::events::{null_sender, EventSender, IndexCompleted, IndexEvent, IndexProgress};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// One printing and its reference scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub card_id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub set_code: String,
    pub collector_number: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Alternate art treatment, e.g. "borderless"
    #[serde(default)]
    pub art_variant: Option<String>,
    /// Relative paths are resolved against the manifest's directory
    pub image: PathBuf,
}

fn default_lang() -> String {
    "en".to_string()
}

impl ManifestEntry {
    pub fn card(&self) -> CardRow {
        CardRow {
            card_id: self.card_id.clone(),
            name: self.name.clone(),
            aliases: self.aliases.clone(),
            set_code: self.set_code.clone(),
            collector_number: self.collector_number.clone(),
            lang: self.lang.clone(),
        }
    }

    fn art_variant(&self, region: RegionKind) -> String {
        let region = match region {
            RegionKind::FullCard => "full",
            RegionKind::Artwork => "artwork",
        };
        match &self.art_variant {
            Some(art) => format!("{art}/{region}"),
            None => region.to_string(),
        }
    }
}

/// The cards to index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub cards: Vec<ManifestEntry>,
}

impl CatalogManifest {
    /// Read a manifest file and resolve its image paths
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path)
            .map_err(|e| CatalogError::InvalidManifest(format!("{}: {e}", path.display())))?;
        let mut manifest = Self::from_json(&text)?;
        if let Some(base) = path.parent() {
            for entry in &mut manifest.cards {
                if entry.image.is_relative() {
                    entry.image = base.join(&entry.image);
                }
            }
        }
        Ok(manifest)
    }

    /// Parse manifest JSON; duplicate card ids are rejected
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let manifest: Self =
            serde_json::from_str(text).map_err(|e| CatalogError::InvalidManifest(e.to_string()))?;
        let mut seen = std::collections::HashSet::new();
        for entry in &manifest.cards {
            if entry.card_id.trim().is_empty() {
                return Err(CatalogError::InvalidManifest("card with an empty id".to_string()));
            }
            if !seen.insert(entry.card_id.as_str()) {
                return Err(CatalogError::InvalidManifest(format!(
                    "duplicate card id {}",
                    entry.card_id
                )));
            }
        }
        Ok(manifest)
    }
}

#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Regions fingerprinted per card
    pub regions: Vec<RegionKind>,
    pub extractor: ExtractorConfig,
    /// Reference images are downscaled to this longest side first
    pub max_dimension: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            regions: vec![RegionKind::FullCard, RegionKind::Artwork],
            extractor: ExtractorConfig::default().max_variants(1),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl IndexConfig {
    pub fn regions(mut self, regions: Vec<RegionKind>) -> Self {
        self.regions = regions;
        self
    }
}

/// Outcome of one build
#[derive(Debug, Default)]
pub struct IndexReport {
    pub cards: usize,
    pub fingerprints: usize,
    /// Card id and reason for every skipped card
    pub failures: Vec<(String, String)>,
    pub duration_ms: u64,
}

pub struct CatalogIndexer {
    store: Arc<dyn CatalogStore>,
    config: IndexConfig,
    extractor: FingerprintExtractor,
}

impl CatalogIndexer {
    pub fn new(store: Arc<dyn CatalogStore>, config: IndexConfig) -> Self {
        let extractor = FingerprintExtractor::new(config.extractor.clone());
        Self {
            store,
            config,
            extractor,
        }
    }

    pub fn run(&self, manifest: &CatalogManifest) -> Result<IndexReport, CatalogError> {
        self.run_with_events(manifest, &null_sender())
    }

    pub fn run_with_events(
        &self,
        manifest: &CatalogManifest,
        events: &EventSender,
    ) -> Result<IndexReport, CatalogError> {
        let started = Instant::now();
        let total = manifest.cards.len();
        events.send(IndexEvent::Started { total });

        let completed = AtomicUsize::new(0);
        let fingerprinted: Vec<(&ManifestEntry, Result<Vec<CatalogFingerprintRow>, String>)> = manifest
            .cards
            .par_iter()
            .map_init(
                || FrameDecoder::new().with_max_dimension(self.config.max_dimension),
                |decoder, entry| {
                    let rows = self.fingerprint_entry(decoder, entry);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    events.send(IndexEvent::Progress(IndexProgress {
                        completed: done,
                        total,
                        current_card: entry.card_id.clone(),
                    }));
                    (entry, rows)
                },
            )
            .collect();

        let mut report = IndexReport::default();
        for (entry, rows) in fingerprinted {
            let rows = match rows {
                Ok(rows) => rows,
                Err(message) => {
                    warn!(card_id = %entry.card_id, %message, "skipping card");
                    events.send(IndexEvent::CardFailed {
                        card_id: entry.card_id.clone(),
                        message: message.clone(),
                    });
                    report.failures.push((entry.card_id.clone(), message));
                    continue;
                }
            };
            self.store.upsert_card(&entry.card())?;
            self.store.remove_fingerprints(&entry.card_id)?;
            self.store.insert_fingerprints(&rows)?;
            report.cards += 1;
            report.fingerprints += rows.len();
        }
        self.store.mark_built()?;

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            cards = report.cards,
            fingerprints = report.fingerprints,
            failed = report.failures.len(),
            "catalog build finished"
        );
        events.send(IndexEvent::Completed(IndexCompleted {
            cards: report.cards,
            fingerprints: report.fingerprints,
            failed: report.failures.len(),
            duration_ms: report.duration_ms,
        }));
        Ok(report)
    }

    fn fingerprint_entry(
        &self,
        decoder: &mut FrameDecoder,
        entry: &ManifestEntry,
    ) -> Result<Vec<CatalogFingerprintRow>, String> {
        let image = decoder.decode(&entry.image).map_err(|e| e.to_string())?;
        let card = entry.card();
        let mut rows = Vec::new();
        for region in &self.config.regions {
            let art_variant = entry.art_variant(*region);
            let fingerprints = self.extractor.extract_region(&image, &FrameRect::FULL, *region);
            rows.extend(
                fingerprints
                    .iter()
                    .map(|fp| CatalogFingerprintRow::from_fingerprint(&card, &art_variant, fp)),
            );
        }
        if rows.is_empty() {
            return Err(format!("no usable fingerprint in {}", entry.image.display()));
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{BucketQuery, CatalogRepository, InMemoryCatalog};
    use crate::events::{Event, EventChannel};
    use image::{ImageBuffer, Luma};
    use tempfile::TempDir;

    fn write_card(dir: &Path, name: &str, seed: u32) -> PathBuf {
        let path = dir.join(name);
        let image: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_fn(180, 250, |x, y| Luma([(((x / 9) * seed + (y / 11) * 71) % 256) as u8]));
        image.save(&path).unwrap();
        path
    }

    fn entry(id: &str, image: PathBuf) -> ManifestEntry {
        ManifestEntry {
            card_id: id.into(),
            name: format!("Card {id}"),
            aliases: Vec::new(),
            set_code: "tst".into(),
            collector_number: "1".into(),
            lang: "en".into(),
            art_variant: None,
            image,
        }
    }

    #[test]
    fn manifest_rejects_duplicates_and_fills_defaults() {
        let json = r#"{"cards":[{"card_id":"a","name":"A","set_code":"tst","collector_number":"1","image":"a.png"}]}"#;
        let manifest = CatalogManifest::from_json(json).unwrap();
        assert_eq!(manifest.cards[0].lang, "en");
        assert!(manifest.cards[0].aliases.is_empty());

        let duplicated = r#"{"cards":[
            {"card_id":"a","name":"A","set_code":"tst","collector_number":"1","image":"a.png"},
            {"card_id":"a","name":"B","set_code":"tst","collector_number":"2","image":"b.png"}]}"#;
        assert!(matches!(
            CatalogManifest::from_json(duplicated),
            Err(CatalogError::InvalidManifest(_))
        ));
    }

    #[test]
    fn load_resolves_relative_images() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(
            &path,
            r#"{"cards":[{"card_id":"a","name":"A","set_code":"tst","collector_number":"1","image":"scans/a.png"}]}"#,
        )
        .unwrap();
        let manifest = CatalogManifest::load(&path).unwrap();
        assert_eq!(manifest.cards[0].image, dir.path().join("scans/a.png"));
    }

    #[test]
    fn builds_catalog_and_reports_failures() {
        let dir = TempDir::new().unwrap();
        let manifest = CatalogManifest {
            cards: vec![
                entry("a", write_card(dir.path(), "a.png", 37)),
                entry("b", write_card(dir.path(), "b.png", 113)),
                entry("missing", dir.path().join("missing.png")),
            ],
        };
        let store = Arc::new(InMemoryCatalog::new());
        let (sender, receiver) = EventChannel::new();

        let report = CatalogIndexer::new(store.clone(), IndexConfig::default())
            .run_with_events(&manifest, &sender)
            .unwrap();

        assert_eq!(report.cards, 2);
        assert_eq!(report.fingerprints, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "missing");

        let stats = store.stats().unwrap();
        assert_eq!(stats.cards, 2);
        assert_eq!(stats.fingerprints, 4);
        assert!(stats.built_at.is_some());

        let events = receiver.drain();
        assert!(matches!(events.first(), Some(Event::Index(IndexEvent::Started { total: 3 }))));
        assert!(matches!(events.last(), Some(Event::Index(IndexEvent::Completed(_)))));
    }

    #[test]
    fn reindexing_replaces_fingerprints() {
        let dir = TempDir::new().unwrap();
        let manifest = CatalogManifest {
            cards: vec![entry("a", write_card(dir.path(), "a.png", 37))],
        };
        let store = Arc::new(InMemoryCatalog::new());
        let indexer = CatalogIndexer::new(store.clone(), IndexConfig::default().regions(vec![RegionKind::FullCard]));
        indexer.run(&manifest).unwrap();
        indexer.run(&manifest).unwrap();

        assert_eq!(store.stats().unwrap().fingerprints, 1);
        let row = {
            let image = FrameDecoder::new().decode(&manifest.cards[0].image).unwrap();
            let fp = FingerprintExtractor::new(IndexConfig::default().extractor)
                .extract_region(&image, &FrameRect::FULL, RegionKind::FullCard)
                .remove(0);
            store
                .search_fingerprint_candidates_by_bucket(fp.bucket16, &BucketQuery::default())
                .unwrap()
        };
        assert_eq!(row[0].art_variant, "full");
    }
}
