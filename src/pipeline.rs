//! The content pipeline: extract, normalize, summarize, persist.
//!
//! [`ContentPipeline::process`] handles one submission end to end. Only an
//! extraction failure (or a failed save) ends it without a record; a
//! summary failure is absorbed and the placeholder text is stored instead.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dyslexify::config::Config;
//! use dyslexify::pipeline::{ContentPipeline, Source};
//! use dyslexify::store::InMemoryStore;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::minimal();
//! let pipeline = ContentPipeline::from_config(&config, Arc::new(InMemoryStore::new()))?;
//! let record = pipeline
//!     .process(Source::UploadedFile {
//!         filename: "notes.txt".into(),
//!         bytes: b"Hello   world".to_vec(),
//!     })
//!     .await?;
//! assert_eq!(record.original_text, "Hello world");
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{ExtractionError, PipelineError};
use crate::extract::{format_for_filename, ExtractorRegistry};
use crate::models::{ExtractedDocument, NewContent, ProcessedContent, SourceKind};
use crate::normalize::normalize;
use crate::store::ContentStore;
use crate::summary::{create_summarizer, summarize_best_effort, Summarizer};
use crate::web::WebPageExtractor;

/// One submission.
#[derive(Debug, Clone)]
pub enum Source {
    /// A web page; the URL must already carry its scheme.
    RemotePage { url: String },
    /// An uploaded file and its original name.
    UploadedFile { filename: String, bytes: Vec<u8> },
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::RemotePage { .. } => SourceKind::RemotePage,
            Source::UploadedFile { .. } => SourceKind::UploadedFile,
        }
    }

    /// The value persisted as `source_value`: the URL or the file name.
    pub fn descriptor(&self) -> &str {
        match self {
            Source::RemotePage { url } => url,
            Source::UploadedFile { filename, .. } => filename,
        }
    }
}

pub struct ContentPipeline {
    extractors: ExtractorRegistry,
    web: WebPageExtractor,
    summarizer: Arc<dyn Summarizer>,
    store: Arc<dyn ContentStore>,
}

impl ContentPipeline {
    pub fn new(
        extractors: ExtractorRegistry,
        web: WebPageExtractor,
        summarizer: Arc<dyn Summarizer>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            extractors,
            web,
            summarizer,
            store,
        }
    }

    /// Wire the built-in extractors and the configured summarizer to `store`.
    pub fn from_config(config: &Config, store: Arc<dyn ContentStore>) -> Result<Self> {
        let web = WebPageExtractor::new(&config.fetch)
            .context("Failed to build HTTP client for web pages")?;
        let summarizer: Arc<dyn Summarizer> = Arc::from(create_summarizer(&config.summary));
        Ok(Self::new(
            ExtractorRegistry::with_builtins(&config.upload),
            web,
            summarizer,
            store,
        ))
    }

    pub fn summarizer(&self) -> &dyn Summarizer {
        self.summarizer.as_ref()
    }

    pub async fn process(&self, source: Source) -> Result<ProcessedContent, PipelineError> {
        let kind = source.kind();
        let descriptor = source.descriptor().to_string();

        let document = match self.extract(source).await {
            Ok(document) => document,
            Err(err) => {
                error!(source_kind = %kind, source = %descriptor, error = %err, "extraction failed");
                return Err(err.into());
            }
        };

        let clean = normalize(&document.raw_text);
        if clean.is_empty() {
            let err = ExtractionError::NoExtractableText;
            error!(source_kind = %kind, source = %descriptor, error = %err, "extraction failed");
            return Err(err.into());
        }
        debug!(
            source_kind = %kind,
            format = %document.format,
            raw_chars = document.raw_text.chars().count(),
            clean_chars = clean.chars().count(),
            "normalized text"
        );

        let outcome = summarize_best_effort(self.summarizer.as_ref(), &clean).await;
        let summarized = outcome.is_generated();

        let content = NewContent {
            source_kind: kind,
            source_value: descriptor,
            original_text: clean,
            summary: Some(outcome.text().to_string()),
            created_at: Utc::now(),
        };

        let record = self.store.insert(content).await.map_err(|err| {
            error!(source_kind = %kind, error = %err, "failed to save processed content");
            err
        })?;

        info!(
            id = record.id,
            source_kind = %kind,
            source = %record.source_value,
            summarized,
            "processed content saved"
        );
        Ok(record)
    }

    async fn extract(&self, source: Source) -> Result<ExtractedDocument, ExtractionError> {
        match source {
            Source::RemotePage { url } => self.web.extract(&url).await,
            Source::UploadedFile { filename, bytes } => {
                let format = format_for_filename(&filename)?;
                let extractor = self.extractors.find(format).ok_or_else(|| {
                    ExtractionError::UnsupportedFormat {
                        extension: format.as_str().to_string(),
                    }
                })?;

                // Parsers are CPU-bound and may panic on hostile input.
                let raw_text = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
                    .await
                    .map_err(|e| {
                        ExtractionError::CorruptDocument(format!("{} parser aborted: {}", format, e))
                    })??;

                Ok(ExtractedDocument { raw_text, format })
            }
        }
    }
}
