//! Error taxonomy for the content pipeline.
//!
//! The types mirror the two ways a submission can go wrong:
//!
//! * [`ExtractionError`] is **fatal**: without extracted text there is no
//!   content, so the submission ends as [`PipelineError::ExtractionFailed`]
//!   and nothing is persisted.
//! * [`SummaryError`] is **absorbed**: the pipeline swaps in the placeholder
//!   summary and still saves the record.
//!
//! Every type exposes `user_message()`, a fixed sentence that a boundary
//! layer (CLI, web handler) can show without leaking internal detail. The
//! `Display` impls carry the detail and are meant for logs.

use thiserror::Error;

/// Boxed source error used by [`PersistenceError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to turn a source into raw text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The upload's file-name suffix is not one of txt, pdf, docx, doc.
    #[error("unsupported file type: {extension:?}")]
    UnsupportedFormat { extension: String },

    /// The bytes are invalid in UTF-8 and in every fallback encoding.
    #[error("could not decode text with any supported encoding (tried {tried})")]
    UnsupportedEncoding { tried: String },

    /// The document container or markup could not be parsed.
    #[error("could not read document: {0}")]
    CorruptDocument(String),

    /// Parsing succeeded but no text came out (e.g. scanned-image PDFs).
    #[error("no text could be extracted from the document")]
    NoExtractableText,

    /// The URL lacks a scheme or a host.
    #[error("invalid URL {0:?}")]
    InvalidUrl(String),

    /// Network failure, timeout, or non-success HTTP status.
    #[error("failed to download {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The page was fetched but no main content was found.
    #[error("no readable content found at {0}")]
    NoReadableContent(String),
}

impl ExtractionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ExtractionError::UnsupportedFormat { .. } => {
                "File type not supported. Please upload .txt, .pdf, .docx, or .doc files."
            }
            ExtractionError::UnsupportedEncoding { .. } => {
                "Could not read the text file. Please save it as UTF-8 and try again."
            }
            ExtractionError::CorruptDocument(_) => {
                "Could not read the document. The file may be damaged or in an older format."
            }
            ExtractionError::NoExtractableText => {
                "Could not extract text from the uploaded file."
            }
            ExtractionError::InvalidUrl(_) => "Please enter a valid URL.",
            ExtractionError::FetchFailed { .. } => {
                "Could not download the web page. Please check the address and try again."
            }
            ExtractionError::NoReadableContent(_) => {
                "Could not extract text from the provided URL."
            }
        }
    }
}

/// Failure of the summarization service. Never fatal to a submission.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// No provider selected, or its credentials are missing.
    #[error("summary service is not configured: {0}")]
    Unconfigured(String),

    /// Network failure, timeout, or an error response from the service.
    #[error("summary service request failed: {0}")]
    UpstreamFailure(String),

    /// The service answered but produced no usable text.
    #[error("summary service returned no usable content")]
    EmptyResult,
}

impl SummaryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            SummaryError::Unconfigured(_) => "Summaries are not available on this server.",
            SummaryError::UpstreamFailure(_) | SummaryError::EmptyResult => {
                "The summary could not be generated this time."
            }
        }
    }
}

/// Opaque failure from the storage collaborator.
#[derive(Debug, Error)]
#[error("failed to persist processed content: {source}")]
pub struct PersistenceError {
    #[source]
    source: BoxError,
}

impl PersistenceError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        "Your content could not be saved. Please try again."
    }
}

/// Failure of [`ContentPipeline::process`](crate::pipeline::ContentPipeline::process).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Extraction failed; no record exists.
    #[error("extraction failed: {0}")]
    ExtractionFailed(#[from] ExtractionError),

    /// The record could not be saved; no identifier exists.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl PipelineError {
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::ExtractionFailed(cause) => cause.user_message(),
            PipelineError::Persistence(cause) => cause.user_message(),
        }
    }
}

/// Failure to produce a PDF export for a stored record.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("processed content {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("failed to render PDF: {0}")]
    Render(String),
}

impl ExportError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ExportError::NotFound(_) => "Page not found.",
            ExportError::Persistence(cause) => cause.user_message(),
            ExportError::Render(_) => "An error occurred while generating the PDF.",
        }
    }
}
