use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::app_config::Config;
use crate::audit::UnmatchedLogger;
use crate::errors::SplitError;
use crate::extraction::PageExtractor;
use crate::file_utils::{FileManager, FileType};
use crate::matching::resolver::{PageRangeResolver, PageStatus, ResolvedPlan, UnmatchedEntry};
use crate::matching::synonyms::SynonymDictionary;
use crate::matching::NameMatcher;
use crate::ocr::{MockOcr, OcrEngine, TesseractOcr};
use crate::pdf_document::SourceDocument;
use crate::registry::RegistrySnapshot;
use crate::splitter::{DocumentSplitter, OutputArtifact, RunPeriod};

// @module: Application controller for payroll batch splitting

/// Cooperative cancellation flag shared between a run and signal handlers
///
/// Cancellation is honored at page granularity: in-flight pages finish,
/// pending pages are skipped, and the run ends as a partial result.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create a flag in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A recipient whose output document could not be written
#[derive(Debug)]
pub struct SplitFailure {
    /// Display name of the recipient
    pub recipient_name: String,
    /// What went wrong for this recipient
    pub error: SplitError,
}

/// Terminal state of one run, partial results included
#[derive(Debug)]
pub struct RunSummary {
    /// Unique id of the run, also recorded in the audit log
    pub run_id: String,
    /// The batch document that was processed
    pub source: PathBuf,
    /// Accounting period the artifacts were named for
    pub period: RunPeriod,
    /// Pages in the source document
    pub total_pages: usize,
    /// Pages assigned to some recipient
    pub matched_pages: usize,
    /// Distinct pages excluded from every range
    pub unmatched_pages: usize,
    /// Recipients that matched at least one page
    pub recipients_matched: usize,
    /// Documents written, sorted by recipient id
    pub artifacts: Vec<OutputArtifact>,
    /// Audit entries for unassigned pages
    pub unmatched: Vec<UnmatchedEntry>,
    /// Recipients whose artifact failed to write
    pub split_failures: Vec<SplitFailure>,
    /// Whether cancellation cut the run short
    pub cancelled: bool,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Whether the run ended with anything less than a full split
    pub fn is_partial(&self) -> bool {
        self.cancelled || !self.split_failures.is_empty() || self.unmatched_pages > 0
    }
}

/// Main application controller for batch splitting
pub struct Controller {
    // @field: App configuration
    config: Config,
    extractor: PageExtractor,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_ocr_engine(Config::default(), Arc::new(MockOcr::working()))
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractOcr::from_config(&config.extraction.ocr)?);
        Self::with_ocr_engine(config, ocr)
    }

    /// Create a controller over a specific OCR engine
    pub fn with_ocr_engine(config: Config, ocr: Arc<dyn OcrEngine>) -> Result<Self> {
        let extractor = PageExtractor::new(config.extraction.clone(), ocr);
        Ok(Controller { config, extractor })
    }

    /// Check if the controller is properly initialized with configuration
    pub fn is_initialized(&self) -> bool {
        self.config.validate().is_ok()
    }

    /// The configuration the controller runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Test version of run method that simulates the process without file operations
    pub async fn test_run(&self, input_file: PathBuf, output_dir: PathBuf) -> Result<()> {
        info!("Test run initiated for file: {:?}", input_file);
        info!("Output directory: {:?}", output_dir);

        if !self.is_initialized() {
            return Err(anyhow!("Controller not properly initialized"));
        }

        Ok(())
    }

    /// Run the main workflow with a batch document and output directory
    pub async fn run(
        &self,
        input_file: PathBuf,
        output_dir: PathBuf,
        period: RunPeriod,
        snapshot: RegistrySnapshot,
        cancel: CancelFlag,
    ) -> Result<RunSummary> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(
            input_file,
            output_dir,
            period,
            snapshot,
            &multi_progress,
            cancel,
        )
        .await
    }

    /// Run the controller with progress reporting
    async fn run_with_progress(
        &self,
        input_file: PathBuf,
        output_dir: PathBuf,
        period: RunPeriod,
        snapshot: RegistrySnapshot,
        multi_progress: &MultiProgress,
        cancel: CancelFlag,
    ) -> Result<RunSummary> {
        // Start timing the process
        let start_time = std::time::Instant::now();
        let run_id = Uuid::new_v4().to_string();

        // Check if the input file exists
        if !input_file.exists() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        // The snapshot is fixed for the whole run, registry edits made while
        // the run is in flight apply to the next run
        if snapshot.active_count() == 0 {
            return Err(anyhow!("Registry snapshot has no active recipients"));
        }

        if FileManager::detect_file_type(&input_file)? != FileType::Pdf {
            return Err(anyhow!("Input is not a PDF document: {:?}", input_file));
        }

        // Fail before touching any page when OCR is required but missing
        self.extractor.ensure_ocr_available().await?;

        FileManager::ensure_dir(&output_dir)?;

        if self.config.output.backup_enabled {
            match FileManager::backup_original(&input_file, &self.config.output.backup_dir) {
                Ok(backup) => info!("Backed up source to {:?}", backup),
                Err(e) => warn!("Failed to back up source document: {}", e),
            }
        }

        let source_name = input_file
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        info!("🚀 paysplit: {} - period {}", source_name, period);

        let doc = Arc::new(SourceDocument::open(&input_file).await?);
        let total_pages = doc.page_count();
        info!(
            "Document has {} pages, matching against {} active recipients",
            total_pages,
            snapshot.active_count()
        );

        let matcher = self.build_matcher(&snapshot)?;

        // Create a progress bar for extraction tracking
        let progress_bar = multi_progress.add(ProgressBar::new(total_pages as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Extracting");

        let pb = progress_bar.clone();
        let (outcomes, extraction_cancelled) = self
            .extractor
            .extract_batch(Arc::clone(&doc), cancel.clone(), move |completed, _total| {
                pb.set_position(completed as u64);
            })
            .await;

        // Finish and clear the progress bar instead of just finishing it
        progress_bar.finish_and_clear();

        if extraction_cancelled {
            warn!(
                "Run cancelled during extraction, {} of {} pages attempted",
                outcomes.len(),
                total_pages
            );
            return Ok(RunSummary {
                run_id,
                source: input_file,
                period,
                total_pages,
                matched_pages: 0,
                unmatched_pages: 0,
                recipients_matched: 0,
                artifacts: Vec::new(),
                unmatched: Vec::new(),
                split_failures: Vec::new(),
                cancelled: true,
                elapsed: start_time.elapsed(),
            });
        }

        // Match every extracted page, carrying extraction failures through
        // so resolution still accounts for every page of the document
        let mut statuses = Vec::with_capacity(outcomes.len());
        for outcome in &outcomes {
            match &outcome.outcome {
                Ok(extracted) => {
                    let matches = matcher.match_page(extracted.page_index, &extracted.text);
                    statuses.push(PageStatus::Assessed(matches));
                }
                Err(e) => {
                    debug!("Page {} extraction failed: {}", outcome.page_index, e);
                    statuses.push(PageStatus::ExtractionFailed {
                        page_index: outcome.page_index,
                        reason: e.reason_code().to_string(),
                    });
                }
            }
        }

        let plan = PageRangeResolver::new().resolve(total_pages, &statuses);

        // Record unmatched pages before splitting so the audit trail survives
        // even when writing artifacts fails afterwards
        let audit = UnmatchedLogger::new(&self.config.output.logs_dir);
        if let Err(e) = audit.log_run(&run_id, &input_file, period, &plan.unmatched) {
            warn!("Failed to write unmatched audit log: {}", e);
        }

        let splitter = DocumentSplitter::new(&output_dir, period);
        let (artifacts, split_failures) = self
            .split_ranges(Arc::clone(&doc), &splitter, &plan, &cancel)
            .await;

        let (hits, misses, hit_rate) = self.extractor.cache_stats();
        debug!(
            "Extraction cache: {} hits, {} misses ({:.0}% hit rate)",
            hits,
            misses,
            hit_rate * 100.0
        );

        info!(
            "Split complete in {}. {} documents written, {} pages assigned, {} pages unmatched",
            Self::format_duration(start_time.elapsed()),
            artifacts.len(),
            plan.matched_page_count(),
            plan.unmatched_page_count()
        );

        Ok(RunSummary {
            run_id,
            source: input_file,
            period,
            total_pages,
            matched_pages: plan.matched_page_count(),
            unmatched_pages: plan.unmatched_page_count(),
            recipients_matched: plan.ranges.len(),
            artifacts,
            unmatched: plan.unmatched,
            split_failures,
            cancelled: cancel.is_cancelled(),
            elapsed: start_time.elapsed(),
        })
    }

    /// Build the matcher for a run, loading the synonym dictionary when enabled
    fn build_matcher(&self, snapshot: &RegistrySnapshot) -> Result<NameMatcher> {
        let dictionary = if self.config.matching.enable_synonyms {
            match &self.config.matching.synonym_dictionary {
                Some(path) => SynonymDictionary::load(path)
                    .with_context(|| format!("Failed to load synonym dictionary: {:?}", path))?,
                None => SynonymDictionary::new(),
            }
        } else {
            SynonymDictionary::new()
        };
        Ok(NameMatcher::new(
            snapshot,
            self.config.matching.clone(),
            dictionary,
        ))
    }

    /// Write every resolved range, one failure aborting only its recipient
    async fn split_ranges(
        &self,
        doc: Arc<SourceDocument>,
        splitter: &DocumentSplitter,
        plan: &ResolvedPlan,
        cancel: &CancelFlag,
    ) -> (Vec<OutputArtifact>, Vec<SplitFailure>) {
        let results: Vec<Option<(String, Result<OutputArtifact, SplitError>)>> =
            stream::iter(plan.ranges.clone())
                .map(|range| {
                    let splitter = splitter.clone();
                    let doc = Arc::clone(&doc);
                    let cancel = cancel.clone();

                    async move {
                        if cancel.is_cancelled() {
                            return None;
                        }
                        let name = range.recipient_name.clone();
                        let result =
                            tokio::task::spawn_blocking(move || splitter.split(&doc, &range))
                                .await
                                .unwrap_or_else(|e| {
                                    Err(SplitError::Document(format!(
                                        "Split task panicked: {}",
                                        e
                                    )))
                                });
                        Some((name, result))
                    }
                })
                .buffer_unordered(self.config.extraction.max_concurrent_pages)
                .collect()
                .await;

        let mut artifacts = Vec::new();
        let mut failures = Vec::new();
        for item in results.into_iter().flatten() {
            match item {
                (_, Ok(artifact)) => artifacts.push(artifact),
                (name, Err(e)) => {
                    error!("Failed to write document for '{}': {}", name, e);
                    failures.push(SplitFailure {
                        recipient_name: name,
                        error: e,
                    });
                }
            }
        }

        // unordered completion, restore a stable order for reporting
        artifacts.sort_by_key(|a| a.recipient_id);
        (artifacts, failures)
    }

    /// Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
