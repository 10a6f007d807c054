//! Core data models.
//!
//! [`ExtractedDocument`] lives only inside one pipeline run; [`ProcessedContent`]
//! is the persisted record that later feeds the PDF export.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Format an extractor understands.
///
/// Uploads pick one from the file-name suffix; URL submissions are always
/// [`DocumentFormat::WebPage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    WordDocument,
    Pdf,
    WebPage,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::PlainText => "plain_text",
            DocumentFormat::WordDocument => "word_document",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::WebPage => "web_page",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw text produced by an extractor, before normalization.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub raw_text: String,
    pub format: DocumentFormat,
}

/// Where a persisted record came from. Stored as `"url"` or `"file"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    #[serde(rename = "url")]
    RemotePage,
    #[serde(rename = "file")]
    UploadedFile,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::RemotePage => "url",
            SourceKind::UploadedFile => "file",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(SourceKind::RemotePage),
            "file" => Ok(SourceKind::UploadedFile),
            other => Err(format!("unknown source type: {}", other)),
        }
    }
}

/// A record ready to be saved; the store assigns the identifier.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub source_kind: SourceKind,
    pub source_value: String,
    pub original_text: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One completed submission, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedContent {
    pub id: i64,
    #[serde(rename = "source_type")]
    pub source_kind: SourceKind,
    pub source_value: String,
    pub original_text: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProcessedContent {
    pub fn from_new(id: i64, content: NewContent) -> Self {
        Self {
            id,
            source_kind: content.source_kind,
            source_value: content.source_value,
            original_text: content.original_text,
            summary: content.summary,
            created_at: content.created_at,
        }
    }
}
