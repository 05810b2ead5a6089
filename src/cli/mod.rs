//! # CLI Module
//!
//! Command-line interface for the card scanner.
//!
//! ## Usage
//! ```bash
//! # Build the catalog from reference scans
//! card-scan index manifest.json
//!
//! # Identify photos of cards
//! card-scan identify ~/captures --region artwork --output json
//!
//! # Replay frames through the live scan loop
//! card-scan scan ~/captures/session-1 --budget 10
//!
//! # Inspect fingerprints and the catalog
//! card-scan hash card.jpg
//! card-scan stats
//! ```

use card_scan::core::catalog::{CatalogStore, SqliteCatalog};
use card_scan::core::cycle::{CycleConfig, CycleDecision, ScanCycleController, ScanSession, SystemScheduler};
use card_scan::core::extractor::FingerprintExtractor;
use card_scan::core::frame::{FileSequenceSource, FrameDecoder};
use card_scan::core::geometry::{FrameRect, RegionKind};
use card_scan::core::indexer::{CatalogIndexer, CatalogManifest, IndexConfig, IndexReport};
use card_scan::core::orchestrator::{FrameInput, ScanOrchestrator, ScanPolicy};
use card_scan::core::result::ScanResult;
use card_scan::core::scanner::{FrameScanner, ScanConfig, WalkDirScanner};
use card_scan::error::{CardScanError, Result};
use card_scan::events::{CycleEvent, Event, EventChannel, IndexEvent};
use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Card Scan - identify trading cards from photos
#[derive(Parser, Debug)]
#[command(name = "card-scan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build or extend the catalog from a JSON manifest of reference scans
    Index {
        manifest: PathBuf,

        /// Catalog database path
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Regions to fingerprint per card
        #[arg(long, value_delimiter = ',', default_values = ["full", "artwork"])]
        regions: Vec<Region>,

        /// Empty the catalog first
        #[arg(long)]
        clear: bool,
    },

    /// Identify the card in each image
    Identify {
        /// Images or directories of images
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Which part of the card to match on
        #[arg(long, default_value = "full")]
        region: Region,

        /// Card bounding box as frame ratios: x,y,width,height
        #[arg(long, value_parser = parse_card_frame)]
        card_frame: Option<FrameRect>,

        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,
    },

    /// Run the live scan loop over a sequence of frames
    Scan {
        /// Frames in capture order (directories are walked by name)
        #[arg(required = true)]
        frames: Vec<PathBuf>,

        #[arg(long)]
        catalog: Option<PathBuf>,

        #[arg(long, default_value = "full")]
        region: Region,

        #[arg(long, value_parser = parse_card_frame)]
        card_frame: Option<FrameRect>,

        /// Milliseconds between cycles
        #[arg(long)]
        interval: Option<u64>,

        /// Give up after this many seconds
        #[arg(long, default_value = "30")]
        budget: u64,
    },

    /// Print the fingerprints of every crop variant of an image
    Hash {
        image: PathBuf,

        #[arg(long, default_value = "full")]
        region: Region,

        #[arg(long, value_parser = parse_card_frame)]
        card_frame: Option<FrameRect>,
    },

    /// Catalog statistics
    Stats {
        #[arg(long)]
        catalog: Option<PathBuf>,

        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Region {
    /// The whole card face
    Full,
    /// The illustration only
    Artwork,
}

impl From<Region> for RegionKind {
    fn from(region: Region) -> Self {
        match region {
            Region::Full => RegionKind::FullCard,
            Region::Artwork => RegionKind::Artwork,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// One line per image: path and card id
    Minimal,
}

fn parse_card_frame(value: &str) -> std::result::Result<FrameRect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|e| format!("{part:?}: {e}")))
        .collect::<std::result::Result<_, _>>()?;
    let [x, y, width, height] = parts[..] else {
        return Err("expected x,y,width,height".to_string());
    };
    FrameRect::new(x, y, width, height)
        .clamp_unit()
        .ok_or_else(|| "card frame lies outside the image".to_string())
}

fn default_catalog_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("card-scan")
        .join("catalog.db")
}

fn open_catalog(path: Option<PathBuf>) -> Result<Arc<SqliteCatalog>> {
    let path = path.unwrap_or_else(default_catalog_path);
    Ok(Arc::new(SqliteCatalog::open(&path)?))
}

fn progress_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    card_scan::init_tracing(cli.verbose);

    match cli.command {
        Commands::Index {
            manifest,
            catalog,
            regions,
            clear,
        } => run_index(&manifest, catalog, regions, clear),
        Commands::Identify {
            paths,
            catalog,
            region,
            card_frame,
            output,
            include_hidden,
        } => run_identify(paths, catalog, region.into(), card_frame, output, include_hidden),
        Commands::Scan {
            frames,
            catalog,
            region,
            card_frame,
            interval,
            budget,
        } => run_scan(frames, catalog, region.into(), card_frame, interval, budget),
        Commands::Hash {
            image,
            region,
            card_frame,
        } => run_hash(&image, region.into(), card_frame),
        Commands::Stats { catalog, output } => run_stats(catalog, output),
    }
}

fn run_index(manifest_path: &Path, catalog: Option<PathBuf>, regions: Vec<Region>, clear: bool) -> Result<()> {
    let term = Term::stderr();
    let manifest = CatalogManifest::load(manifest_path)?;
    let store = open_catalog(catalog)?;
    if clear {
        store.clear()?;
    }

    let mut regions: Vec<RegionKind> = regions.into_iter().map(RegionKind::from).collect();
    regions.dedup();
    if regions.is_empty() {
        return Err(CardScanError::Config("at least one region is required".to_string()));
    }

    let progress = ProgressBar::new(manifest.cards.len() as u64);
    progress.set_style(progress_style("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}"));

    let (sender, receiver) = EventChannel::new();
    let bar = progress.clone();
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Index(IndexEvent::Progress(p)) => {
                    bar.set_position(p.completed as u64);
                    bar.set_message(p.current_card);
                }
                Event::Index(IndexEvent::CardFailed { card_id, message }) => {
                    bar.println(format!("{} {card_id}: {message}", style("✗").red()));
                }
                Event::Index(IndexEvent::Completed(_)) => bar.finish_and_clear(),
                _ => {}
            }
        }
    });

    let indexer = CatalogIndexer::new(store.clone(), IndexConfig::default().regions(regions));
    let report = indexer.run_with_events(&manifest, &sender);
    drop(sender);
    event_thread.join().ok();
    let report = report?;

    print_index_report(&term, &report, store.path());
    Ok(())
}

fn print_index_report(term: &Term, report: &IndexReport, path: &Path) {
    term.write_line(&format!("{} Catalog built", style("✓").green().bold())).ok();
    term.write_line(&format!(
        "  {} cards, {} fingerprints in {:.1}s",
        style(report.cards).cyan(),
        style(report.fingerprints).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    if !report.failures.is_empty() {
        term.write_line(&format!("  {} cards skipped", style(report.failures.len()).yellow())).ok();
    }
    term.write_line(&format!("  {}", style(path.display()).dim())).ok();
}

fn run_identify(
    paths: Vec<PathBuf>,
    catalog: Option<PathBuf>,
    region: RegionKind,
    card_frame: Option<FrameRect>,
    output: OutputFormat,
    include_hidden: bool,
) -> Result<()> {
    let term = Term::stderr();
    let scanner = WalkDirScanner::new(ScanConfig {
        include_hidden,
        ..Default::default()
    });
    let found = scanner.scan(&paths)?;
    for error in &found.errors {
        term.write_line(&format!("{} {error}", style("!").yellow())).ok();
    }

    let orchestrator = ScanOrchestrator::fingerprint_only(open_catalog(catalog)?);
    let policy = ScanPolicy::fingerprint_only();
    let mut decoder = FrameDecoder::new();

    let progress = match output {
        OutputFormat::Pretty => {
            let bar = ProgressBar::new(found.frames.len() as u64);
            bar.set_style(progress_style("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len}"));
            Some(bar)
        }
        _ => None,
    };

    let mut results = Vec::with_capacity(found.frames.len());
    for frame in &found.frames {
        let mut input = match decoder.decode(&frame.path) {
            Ok(image) => FrameInput::new(image).region(region),
            Err(e) => {
                tracing::warn!(path = %frame.path.display(), error = %e, "could not decode frame");
                FrameInput::default().region(region)
            }
        };
        input.card_frame = card_frame;
        results.push((frame.path.clone(), orchestrator.resolve_scan(&input, &policy)));
        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &results),
        OutputFormat::Json => print_json_results(&results)?,
        OutputFormat::Minimal => {
            for (path, result) in &results {
                println!("{}\t{}", path.display(), result.card_id().unwrap_or("-"));
            }
        }
    }
    Ok(())
}

fn print_pretty_results(term: &Term, results: &[(PathBuf, ScanResult)]) {
    let matched = results.iter().filter(|(_, r)| r.is_matched()).count();
    term.write_line(&format!(
        "{} {} of {} images identified",
        style("✓").green().bold(),
        style(matched).cyan(),
        results.len()
    ))
    .ok();
    term.write_line("").ok();

    for (path, result) in results {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        let line = match result {
            ScanResult::Matched {
                card_id,
                matched_by,
                confidence,
                ..
            } => format!(
                "  {} {} {} {}",
                style("★").green(),
                name,
                style(card_id).bold(),
                style(format!("({matched_by}, {confidence:.2})")).dim()
            ),
            ScanResult::Ambiguous { candidates, .. } => {
                let ids: Vec<&str> = candidates.iter().map(|c| c.card_id.as_str()).collect();
                format!("  {} {} one of {}", style("?").yellow(), name, ids.join(", "))
            }
            ScanResult::None { reason } => {
                format!("  {} {} {}", style("○").dim(), name, style(reason).dim())
            }
        };
        term.write_line(&line).ok();
    }
}

fn print_json_results(results: &[(PathBuf, ScanResult)]) -> Result<()> {
    let output: Vec<_> = results
        .iter()
        .map(|(path, result)| serde_json::json!({ "path": path, "result": result }))
        .collect();
    let text = serde_json::to_string_pretty(&output)
        .map_err(|e| CardScanError::Config(format!("could not serialize results: {e}")))?;
    println!("{text}");
    Ok(())
}

fn run_scan(
    frames: Vec<PathBuf>,
    catalog: Option<PathBuf>,
    region: RegionKind,
    card_frame: Option<FrameRect>,
    interval: Option<u64>,
    budget: u64,
) -> Result<()> {
    let term = Term::stderr();
    let found = WalkDirScanner::new(ScanConfig::default()).scan(&frames)?;
    if found.frames.is_empty() {
        return Err(CardScanError::Config("no frames to scan".to_string()));
    }
    let paths = found.frames.into_iter().map(|f| f.path).collect();
    let source = Arc::new(FileSequenceSource::new(paths).card_frame(card_frame).region(region));
    let orchestrator = Arc::new(ScanOrchestrator::fingerprint_only(open_catalog(catalog)?));

    let mut config = CycleConfig::fingerprint();
    if let Some(ms) = interval {
        config = config.interval(Duration::from_millis(ms));
    }

    let (sender, receiver) = EventChannel::new();
    let printer = thread::spawn(move || {
        let term = Term::stderr();
        for event in receiver.iter() {
            let line = match event {
                Event::Cycle(CycleEvent::CycleDecided { cycle, result }) => format!(
                    "  {} cycle {cycle}: {}",
                    style("·").dim(),
                    result.card_id().unwrap_or(result.status())
                ),
                Event::Cycle(CycleEvent::Hint { message }) => format!("  {} {message}", style("!").yellow()),
                Event::Cycle(CycleEvent::Recovered { reason, .. }) => format!("  {} {reason}", style("!").red()),
                _ => continue,
            };
            term.write_line(&line).ok();
        }
    });

    let controller = ScanCycleController::new(config, SystemScheduler::new(), sender);
    let mut session = ScanSession::new(controller, source, orchestrator);
    session.start();
    let decision = session.run_until_settled(Duration::from_secs(budget));
    drop(session);
    printer.join().ok();

    match decision {
        Some(CycleDecision::Navigate {
            card_id,
            matched_by,
            confidence,
        }) => {
            term.write_line(&format!(
                "{} {} {}",
                style("✓").green().bold(),
                style(&card_id).bold(),
                style(format!("({matched_by}, {confidence:.2})")).dim()
            ))
            .ok();
            println!("{card_id}");
        }
        Some(CycleDecision::AwaitSelection(result)) => {
            term.write_line(&format!("{} Several cards fit:", style("?").yellow().bold())).ok();
            for candidate in result.candidates() {
                println!("{}", candidate.card_id);
            }
        }
        _ => {
            term.write_line(&format!("{} No card identified within {budget}s", style("○").dim())).ok();
        }
    }
    Ok(())
}

fn run_hash(path: &Path, region: RegionKind, card_frame: Option<FrameRect>) -> Result<()> {
    let image = FrameDecoder::new().decode(path)?;
    let fingerprints = FingerprintExtractor::default().extract_region(
        &image,
        &card_frame.unwrap_or(FrameRect::FULL),
        region,
    );
    if fingerprints.is_empty() {
        eprintln!("{} no usable crop (too small or too blurry)", style("○").dim());
    }
    for fp in &fingerprints {
        println!(
            "{:<10} phash={} dhash={} bucket={:04x}",
            fp.variant_tag,
            fp.phash_hex(),
            fp.dhash_hex(),
            fp.bucket16
        );
    }
    Ok(())
}

fn run_stats(catalog: Option<PathBuf>, output: OutputFormat) -> Result<()> {
    let store = open_catalog(catalog)?;
    let stats = store.stats()?;
    match output {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&stats)
                .map_err(|e| CardScanError::Config(format!("could not serialize stats: {e}")))?;
            println!("{text}");
        }
        _ => {
            let term = Term::stdout();
            term.write_line(&format!("{}", style(store.path().display()).bold())).ok();
            term.write_line(&format!("  cards:        {}", stats.cards)).ok();
            term.write_line(&format!("  fingerprints: {}", stats.fingerprints)).ok();
            term.write_line(&format!("  buckets:      {}", stats.buckets)).ok();
            let built = stats
                .built_at
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "never".to_string());
            term.write_line(&format!("  built:        {built}")).ok();
        }
    }
    Ok(())
}
