//! Recognition run orchestration.
//!
//! A [`Recognizer`] owns the run-independent collaborators (engine pool,
//! rasterizer, text-layer writer, language detector) and drives one run at a
//! time through `Idle → DetectingLanguage → AcquiringWorker → ProcessingPages
//! → Finalizing → Complete`. Any error moves the run to `Failed` and is
//! returned as is; pages recognized before the failure are dropped.

use crate::core::config::ScanlayerConfig;
use crate::core::document::{Document, SourceKind};
use crate::core::progress::{CancellationToken, ProgressEvent, ProgressSink, RunPhase};
use crate::language_detection::LanguageDetector;
use crate::ocr::{EngineHandle, EnginePool};
use crate::output::{self, PdfTextLayerWriter, TextLayerWriter};
use crate::render::PageRasterizer;
use crate::types::{LanguageChoice, LanguageDetection, OutputFormat, PageResult, RecognitionRequest, RunResult};
use crate::{Result, ScanlayerError};
use std::sync::Arc;
use tracing::Instrument;

/// Tracks the run phase and publishes phase transitions.
struct PhaseTracker<'a> {
    phase: RunPhase,
    sink: &'a dyn ProgressSink,
}

impl<'a> PhaseTracker<'a> {
    fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            phase: RunPhase::Idle,
            sink,
        }
    }

    fn enter(&mut self, next: RunPhase, percent: u8, message: impl Into<String>) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid phase transition {:?} -> {:?}",
            self.phase,
            next
        );
        tracing::debug!(from = ?self.phase, to = ?next, "Run phase transition");
        self.phase = next;
        self.sink.report(ProgressEvent::new(percent, message, next));
    }

    fn page(&self, index: usize, total: usize, page_number: u32) {
        self.sink.report(ProgressEvent::page(index, total, page_number));
    }

    fn fail(&mut self, error: &ScanlayerError) {
        if self.phase.can_transition_to(RunPhase::Failed) {
            tracing::debug!(from = ?self.phase, "Run failed: {}", error);
            self.phase = RunPhase::Failed;
            self.sink
                .report(ProgressEvent::new(100, format!("failed: {}", error), RunPhase::Failed));
        }
    }
}

/// Accumulator folded over the selected pages.
#[derive(Debug, Default)]
struct PageFold {
    pages: Vec<PageResult>,
    confidence_sum: f64,
}

impl PageFold {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            pages: Vec::with_capacity(capacity),
            confidence_sum: 0.0,
        }
    }

    fn step(mut self, page: PageResult) -> Self {
        self.confidence_sum += page.confidence;
        self.pages.push(page);
        self
    }

    fn mean_confidence(&self) -> f64 {
        if self.pages.is_empty() {
            0.0
        } else {
            self.confidence_sum / self.pages.len() as f64
        }
    }
}

/// Runs recognition requests against a shared engine pool.
///
/// # Example
///
/// ```rust,no_run
/// # #[cfg(feature = "tesseract")]
/// # async fn example() -> scanlayer::Result<()> {
/// use scanlayer::core::config::ScanlayerConfig;
/// use scanlayer::core::document::Document;
/// use scanlayer::core::pipeline::Recognizer;
/// use scanlayer::core::progress::TracingProgress;
/// use scanlayer::types::RecognitionRequest;
///
/// let recognizer = Recognizer::with_defaults(ScanlayerConfig::default())?;
/// let document = Document::open("scan_deu.png")?;
/// let result = recognizer
///     .run_recognition(&document, &RecognitionRequest::default(), &TracingProgress, None)
///     .await?;
/// println!("{} pages, confidence {:.1}", result.pages_processed, result.confidence);
/// # Ok(())
/// # }
/// ```
pub struct Recognizer {
    config: ScanlayerConfig,
    pool: Arc<EnginePool>,
    rasterizer: Arc<dyn PageRasterizer>,
    writer: Arc<dyn TextLayerWriter>,
    detector: LanguageDetector,
}

impl std::fmt::Debug for Recognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recognizer")
            .field("pool", &self.pool)
            .field("default_language", &self.config.default_language)
            .finish()
    }
}

impl Recognizer {
    pub fn new(config: ScanlayerConfig, pool: Arc<EnginePool>, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        let detector = LanguageDetector::new(&config);
        Self {
            config,
            pool,
            rasterizer,
            writer: Arc::new(PdfTextLayerWriter),
            detector,
        }
    }

    /// Replace the searchable-document writer.
    pub fn with_writer(mut self, writer: Arc<dyn TextLayerWriter>) -> Self {
        self.writer = writer;
        self
    }

    /// Tesseract engines and the configured rasterizers.
    ///
    /// # Errors
    ///
    /// `Validation` if the configuration is inconsistent.
    #[cfg(feature = "tesseract")]
    pub fn with_defaults(config: ScanlayerConfig) -> Result<Self> {
        config.validate()?;
        let loader = Arc::new(crate::ocr::TesseractLoader::new(config.tesseract.clone()));
        let pool = Arc::new(EnginePool::new(loader, config.pool.capacity));
        let rasterizer = Arc::new(crate::render::CompositeRasterizer::from_config(&config.render));
        Ok(Self::new(config, pool, rasterizer))
    }

    pub fn config(&self) -> &ScanlayerConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<EnginePool> {
        &self.pool
    }

    /// Rasterization scale for pages of `document`.
    fn page_scale(&self, document: &Document) -> f64 {
        match document.kind() {
            SourceKind::Paged => self.config.render.document_scale(),
            SourceKind::Image => self.config.render.image_scale,
        }
    }

    /// Detect the language of `document`. Never fails.
    ///
    /// A content sample is only taken when the filename guess is not enough:
    /// the embedded text of a PDF when it has one, otherwise a low-resolution
    /// recognition of the first page with the default-language engine.
    pub async fn detect_language(&self, document: &Document) -> LanguageDetection {
        let from_name = self.detector.from_filename(document.name());
        if !self.detector.wants_content(document.is_image(), &from_name) {
            tracing::debug!(
                "Filename guess '{}' for '{}' is conclusive; skipping content scan",
                from_name.language,
                document.name()
            );
            return from_name;
        }

        let sample = self.content_sample(document).await;
        self.detector
            .detect(document.name(), sample.as_deref(), document.is_image())
    }

    async fn content_sample(&self, document: &Document) -> Option<String> {
        let max_chars = self.detector.config().max_sample_chars;
        if let Some(sample) = document.native_text_sample(max_chars) {
            return Some(sample);
        }

        let scan_scale = self.detector.config().scan_scale;
        let scale = match document.kind() {
            SourceKind::Paged => {
                let floor = f64::from(self.config.render.min_dpi) / 72.0;
                (self.config.render.document_scale() * scan_scale).max(floor)
            }
            SourceKind::Image => self.config.render.image_scale * scan_scale,
        };

        let scan = async {
            let bitmap = self.rasterizer.rasterize(document, 1, scale).await?;
            let engine = self.pool.acquire(&self.config.default_language).await?;
            engine.recognize(&bitmap).await
        };

        match scan.await {
            Ok(output) => {
                let sample: String = output.text.chars().take(max_chars).collect();
                (!sample.trim().is_empty()).then_some(sample)
            }
            Err(e) => {
                tracing::warn!("Content scan of '{}' failed, using filename guess: {}", document.name(), e);
                None
            }
        }
    }

    /// Run one recognition request.
    ///
    /// Progress is published to `progress` at every phase transition and after
    /// every page. `cancel` is checked before each page is rasterized.
    ///
    /// # Errors
    ///
    /// Fails fast with the first error: `InvalidSelection` before anything is
    /// loaded, then `ModelLoadFailure`, `PageRenderFailure`,
    /// `RecognitionFailure`, `Cancelled` or `AssemblyFailure`. No partial
    /// result is returned.
    pub async fn run_recognition(
        &self,
        document: &Document,
        request: &RecognitionRequest,
        progress: &dyn ProgressSink,
        cancel: Option<&CancellationToken>,
    ) -> Result<RunResult> {
        let selected = request.selection.resolve(document.page_count())?;

        let span = tracing::info_span!(
            "recognition_run",
            format = %request.format,
            language = tracing::field::Empty,
            pages = selected.len(),
        );

        async {
            tracing::info!(
                "Starting recognition of '{}' ({} of {} pages, {} output)",
                document.name(),
                selected.len(),
                document.page_count(),
                request.format
            );

            let mut tracker = PhaseTracker::new(progress);
            let result = self.run_phases(&mut tracker, document, request, &selected, cancel).await;

            match &result {
                Ok(run) => tracing::info!(
                    "Recognition of '{}' complete: {} pages, mean confidence {:.1}",
                    document.name(),
                    run.pages_processed,
                    run.confidence
                ),
                Err(e) => tracker.fail(e),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_phases(
        &self,
        tracker: &mut PhaseTracker<'_>,
        document: &Document,
        request: &RecognitionRequest,
        selected: &[u32],
        cancel: Option<&CancellationToken>,
    ) -> Result<RunResult> {
        let (language, detection) = match &request.language {
            LanguageChoice::Code(code) => (code.clone(), None),
            LanguageChoice::Auto => {
                tracker.enter(RunPhase::DetectingLanguage, 0, "detecting language");
                let detection = self.detect_language(document).await;
                tracing::debug!(
                    "Detected '{}' ({:?} confidence, from {:?})",
                    detection.language,
                    detection.tier,
                    detection.source
                );
                (detection.language.clone(), Some(detection))
            }
        };
        tracing::Span::current().record("language", language.as_str());

        tracker.enter(
            RunPhase::AcquiringWorker,
            0,
            format!("loading recognition engine for '{}'", language),
        );
        let engine = self.pool.acquire(&language).await?;

        tracker.enter(
            RunPhase::ProcessingPages,
            0,
            format!("processing {} pages", selected.len()),
        );
        let fold = self.process_pages(tracker, document, &engine, selected, cancel).await?;

        tracker.enter(
            RunPhase::Finalizing,
            100,
            format!("assembling {} output", request.format),
        );
        let confidence = fold.mean_confidence();
        let pages_processed = fold.pages.len();
        let output = self.assemble(request.format, fold.pages, &language, document).await?;

        tracker.enter(RunPhase::Complete, 100, "completed");
        Ok(RunResult {
            output,
            confidence,
            pages_processed,
            language,
            detection,
        })
    }

    async fn process_pages(
        &self,
        tracker: &PhaseTracker<'_>,
        document: &Document,
        engine: &EngineHandle,
        selected: &[u32],
        cancel: Option<&CancellationToken>,
    ) -> Result<PageFold> {
        let scale = self.page_scale(document);
        let total = selected.len();
        let mut fold = PageFold::with_capacity(total);

        for (index, &page_number) in selected.iter().enumerate() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                tracing::info!("Run cancelled before page {}", page_number);
                return Err(ScanlayerError::Cancelled { page: page_number });
            }

            tracing::debug!("Rasterizing page {} at scale {:.3}", page_number, scale);
            let bitmap = self.rasterizer.rasterize(document, page_number, scale).await?;

            tracing::debug!(
                "Recognizing page {} ({}x{} px)",
                page_number,
                bitmap.width(),
                bitmap.height()
            );
            let page = engine.recognize(&bitmap).await?.into_page_result(&bitmap);
            drop(bitmap);

            fold = fold.step(page);
            tracker.page(index + 1, total, page_number);
        }

        Ok(fold)
    }

    async fn assemble(
        &self,
        format: OutputFormat,
        pages: Vec<PageResult>,
        language: &str,
        document: &Document,
    ) -> Result<crate::types::RunOutput> {
        if format != OutputFormat::SearchablePdf {
            return output::assemble(format, &pages, language, &self.config.output, document, self.writer.as_ref());
        }

        let writer = Arc::clone(&self.writer);
        let config = self.config.output.clone();
        let document = document.clone();
        let language = language.to_string();
        tokio::task::spawn_blocking(move || {
            output::assemble(format, &pages, &language, &config, &document, writer.as_ref())
        })
        .await
        .map_err(|e| ScanlayerError::assembly_with_source("Searchable document task panicked", e))?
    }
}
