//! Format-specific text extraction for uploaded documents.
//!
//! Uploads are dispatched on their file-name suffix to a [`DocumentFormat`],
//! and the [`ExtractorRegistry`] maps that tag to an [`Extractor`]. Each
//! extractor returns raw text; cleanup is left to
//! [`normalize`](crate::normalize::normalize). Web pages take a URL rather
//! than bytes and live in [`crate::web`].

use encoding_rs::Encoding;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use crate::config::UploadConfig;
use crate::error::ExtractionError;
use crate::models::DocumentFormat;

/// File-name suffixes accepted for upload (compared case-insensitively).
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["txt", "pdf", "docx", "doc"];

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Turns the bytes of one document format into raw text.
pub trait Extractor: Send + Sync {
    /// The format this extractor handles.
    fn format(&self) -> DocumentFormat;

    /// Extract raw (not yet normalized) text.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Resolve an upload's format from its file name.
///
/// Only the suffix after the last `.` counts. Unknown or missing suffixes
/// fail before any byte of the upload is looked at.
pub fn format_for_filename(filename: &str) -> Result<DocumentFormat, ExtractionError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" => Ok(DocumentFormat::PlainText),
        "docx" | "doc" => Ok(DocumentFormat::WordDocument),
        "pdf" => Ok(DocumentFormat::Pdf),
        _ => Err(ExtractionError::UnsupportedFormat { extension }),
    }
}

/// Lookup table from format tag to extractor.
#[derive(Default, Clone)]
pub struct ExtractorRegistry {
    extractors: HashMap<DocumentFormat, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the plain-text, word-processor and PDF extractors.
    pub fn with_builtins(upload: &UploadConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PlainTextExtractor::from_labels(
            &upload.fallback_encodings,
        )));
        registry.register(Arc::new(WordDocumentExtractor));
        registry.register(Arc::new(PdfExtractor));
        registry
    }

    /// Register an extractor, replacing any previous one for its format.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        self.extractors.insert(extractor.format(), extractor);
    }

    pub fn find(&self, format: DocumentFormat) -> Option<Arc<dyn Extractor>> {
        self.extractors.get(&format).cloned()
    }
}

// ============ Plain text ============

/// Decodes UTF-8 first, then each fallback encoding in order.
pub struct PlainTextExtractor {
    fallbacks: Vec<&'static Encoding>,
}

impl PlainTextExtractor {
    pub fn new(fallbacks: Vec<&'static Encoding>) -> Self {
        Self { fallbacks }
    }

    /// Build from WHATWG labels; unknown labels are skipped.
    pub fn from_labels(labels: &[String]) -> Self {
        let mut fallbacks: Vec<&'static Encoding> = Vec::new();
        for label in labels {
            match Encoding::for_label(label.as_bytes()) {
                Some(encoding) if !fallbacks.contains(&encoding) => fallbacks.push(encoding),
                Some(_) => {}
                None => tracing::warn!(label = %label, "ignoring unknown fallback encoding"),
            }
        }
        Self::new(fallbacks)
    }
}

impl Extractor for PlainTextExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::PlainText
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        if let Some(text) = encoding_rs::UTF_8.decode_without_bom_handling_and_without_replacement(body)
        {
            return Ok(text.into_owned());
        }

        for encoding in &self.fallbacks {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
                tracing::debug!(encoding = encoding.name(), "decoded text with fallback encoding");
                return Ok(text.into_owned());
            }
        }

        let tried = std::iter::once("UTF-8")
            .chain(self.fallbacks.iter().map(|e| e.name()))
            .collect::<Vec<_>>()
            .join(", ");
        Err(ExtractionError::UnsupportedEncoding { tried })
    }
}

// ============ Word-processor documents ============

/// Reads `word/document.xml` out of an OOXML archive, one paragraph per line.
pub struct WordDocumentExtractor;

impl Extractor for WordDocumentExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::WordDocument
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(corrupt)?;
        let doc_xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
        Ok(extract_paragraphs(&doc_xml)?.join("\n"))
    }
}

fn corrupt(err: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::CorruptDocument(err.to_string())
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractionError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractionError::CorruptDocument(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry.take(max_bytes).read_to_end(&mut out).map_err(corrupt)?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractionError::CorruptDocument(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Collect the text of every non-blank `w:p`, in document order.
///
/// Paragraphs nest (text boxes live inside a run of the outer paragraph)
/// and table cells hold their own paragraphs, so open paragraphs are kept
/// on a stack and everything comes out in document order.
fn extract_paragraphs(xml: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"r" => run_depth += 1,
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if run_depth > 0 => {
                if let Some(current) = open.last_mut() {
                    match e.local_name().as_ref() {
                        b"tab" => current.push('\t'),
                        b"br" | b"cr" => current.push('\n'),
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(corrupt)?;
                if let Some(current) = open.last_mut() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"p" => {
                    if let Some(paragraph) = open.pop() {
                        if !paragraph.trim().is_empty() {
                            paragraphs.push(paragraph);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(corrupt(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

// ============ PDF ============

/// Extracts embedded text page by page.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(corrupt)?;
        join_pages(pages)
    }
}

/// Join pages in order with a line break; whitespace-only output is an error.
fn join_pages(pages: Vec<String>) -> Result<String, ExtractionError> {
    let mut text = String::new();
    for page in pages {
        text.push_str(&page);
        text.push('\n');
    }
    if text.trim().is_empty() {
        return Err(ExtractionError::NoExtractableText);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
                body
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn format_dispatch_is_case_insensitive() {
        assert_eq!(format_for_filename("notes.TXT").unwrap(), DocumentFormat::PlainText);
        assert_eq!(format_for_filename("Report.Docx").unwrap(), DocumentFormat::WordDocument);
        assert_eq!(format_for_filename("old.doc").unwrap(), DocumentFormat::WordDocument);
        assert_eq!(format_for_filename("paper.v2.pdf").unwrap(), DocumentFormat::Pdf);
    }

    #[test]
    fn unknown_or_missing_suffix_is_unsupported() {
        let err = format_for_filename("slides.pptx").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat { ref extension } if extension == "pptx"));
        assert!(matches!(
            format_for_filename("README").unwrap_err(),
            ExtractionError::UnsupportedFormat { .. }
        ));
    }

    #[test]
    fn plain_text_prefers_utf8_and_strips_bom() {
        let extractor = PlainTextExtractor::from_labels(&["windows-1252".to_string()]);
        let text = extractor.extract("\u{feff}café".as_bytes()).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn plain_text_falls_back_to_legacy_encoding() {
        let extractor = PlainTextExtractor::from_labels(&["windows-1252".to_string()]);
        // "café" in windows-1252; 0xE9 alone is invalid UTF-8.
        let text = extractor.extract(b"caf\xe9").unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn plain_text_fails_when_every_encoding_rejects_bytes() {
        let extractor =
            PlainTextExtractor::from_labels(&["shift_jis".to_string(), "euc-kr".to_string()]);
        let err = extractor.extract(b"\xff\xff\xff").unwrap_err();
        match err {
            ExtractionError::UnsupportedEncoding { tried } => {
                assert_eq!(tried, "UTF-8, Shift_JIS, EUC-KR");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_encoding_labels_are_tried_once() {
        let extractor = PlainTextExtractor::from_labels(&[
            "latin1".to_string(),
            "iso-8859-1".to_string(),
            "windows-1252".to_string(),
        ]);
        assert_eq!(extractor.fallbacks.len(), 1);
    }

    #[test]
    fn docx_keeps_non_blank_paragraphs_in_order() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>First </w:t></w:r><w:r><w:t>paragraph</w:t></w:r></w:p>\
             <w:p><w:r><w:t>   </w:t></w:r></w:p>\
             <w:p/>\
             <w:p><w:r><w:t>Fish &amp; chips</w:t></w:r></w:p>",
        );
        let text = WordDocumentExtractor.extract(&bytes).unwrap();
        assert_eq!(text, "First paragraph\nFish & chips");
    }

    #[test]
    fn docx_tab_definitions_do_not_leak_into_text() {
        let bytes = docx_with_body(
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr>\
             <w:r><w:t>Name</w:t><w:tab/><w:t>Value</w:t></w:r></w:p>",
        );
        let text = WordDocumentExtractor.extract(&bytes).unwrap();
        assert_eq!(text, "Name\tValue");
    }

    #[test]
    fn docx_table_cell_paragraphs_follow_document_order() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>Before table</w:t></w:r></w:p>\
             <w:tbl><w:tr>\
               <w:tc><w:p><w:r><w:t>Cell A</w:t></w:r></w:p></w:tc>\
               <w:tc><w:p><w:r><w:t>Cell B</w:t></w:r></w:p></w:tc>\
             </w:tr></w:tbl>\
             <w:p><w:r><w:t>After table</w:t></w:r></w:p>",
        );
        let text = WordDocumentExtractor.extract(&bytes).unwrap();
        assert_eq!(text, "Before table\nCell A\nCell B\nAfter table");
    }

    #[test]
    fn invalid_zip_is_corrupt_document() {
        let err = WordDocumentExtractor.extract(b"not a zip").unwrap_err();
        assert!(matches!(err, ExtractionError::CorruptDocument(_)));
    }

    #[test]
    fn archive_without_document_xml_is_corrupt() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = WordDocumentExtractor.extract(&buf).unwrap_err();
        assert!(matches!(err, ExtractionError::CorruptDocument(ref m) if m.contains("word/document.xml")));
    }

    #[test]
    fn invalid_pdf_is_corrupt_document() {
        let err = PdfExtractor.extract(b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractionError::CorruptDocument(_)));
    }

    fn blank_pdf() -> Vec<u8> {
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1i64,
                "MediaBox" => vec![0i64.into(), 0i64.into(), 595i64.into(), 842i64.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn pdf_text_comes_back_in_page_order() {
        let mut body = vec!["Alphamarker".to_string()];
        body.extend((0..80).map(|i| format!("Filler line {}", i)));
        body.push("Omegamarker".to_string());
        let bytes = crate::export::render_pdf(&body.join("\n"), Some("Short"), "doc.txt").unwrap();
        assert!(lopdf::Document::load_mem(&bytes).unwrap().get_pages().len() >= 2);

        let text = PdfExtractor.extract(&bytes).unwrap();
        let first = text.find("Alphamarker").unwrap();
        let last = text.find("Omegamarker").unwrap();
        assert!(first < last);
    }

    #[test]
    fn pdf_with_empty_page_has_no_extractable_text() {
        let err = PdfExtractor.extract(&blank_pdf()).unwrap_err();
        assert!(matches!(err, ExtractionError::NoExtractableText), "{err:?}");
    }

    #[test]
    fn whitespace_only_pages_have_no_extractable_text() {
        let err = join_pages(vec!["  \n".into(), "\t".into(), String::new()]).unwrap_err();
        assert!(matches!(err, ExtractionError::NoExtractableText));
    }

    #[test]
    fn pages_are_joined_in_order() {
        let text = join_pages(vec!["page one".into(), "page two".into()]).unwrap();
        assert_eq!(text, "page one\npage two\n");
    }

    #[test]
    fn registry_resolves_builtin_formats() {
        let registry = ExtractorRegistry::with_builtins(&UploadConfig::default());
        for format in [
            DocumentFormat::PlainText,
            DocumentFormat::WordDocument,
            DocumentFormat::Pdf,
        ] {
            assert_eq!(registry.find(format).unwrap().format(), format);
        }
        assert!(registry.find(DocumentFormat::WebPage).is_none());
    }
}
