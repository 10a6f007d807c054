//! PDF export of a stored record.
//!
//! The layout favors readability over density: Helvetica at 13 pt, 1.5 line
//! spacing, short wrapped lines, wide margins. Text is written with the
//! standard `WinAnsiEncoding`; characters outside windows-1252 print as `?`.

use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::error::ExportError;
use crate::models::ProcessedContent;
use crate::store::ContentStore;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 72;
const BODY_SIZE: i64 = 13;
const HEADING_SIZE: i64 = 16;
const TITLE_SIZE: i64 = 20;
const LINE_HEIGHT: i64 = 20;
const WRAP_CHARS: usize = 68;

/// Suggested download name for record `id`.
pub fn export_filename(id: i64) -> String {
    format!("dyslexify_export_{}.pdf", id)
}

/// A rendered export, ready to hand to a client.
#[derive(Debug, Clone)]
pub struct PdfExport {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl PdfExport {
    /// Value for a `Content-Disposition` header.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

pub fn export_record(record: &ProcessedContent) -> Result<PdfExport, ExportError> {
    let bytes = render_pdf(
        &record.original_text,
        record.summary.as_deref(),
        &record.source_value,
    )?;
    Ok(PdfExport {
        filename: export_filename(record.id),
        content_type: PDF_CONTENT_TYPE,
        bytes,
    })
}

/// Load record `id` from `store` and export it.
pub async fn export_by_id(store: &dyn ContentStore, id: i64) -> Result<PdfExport, ExportError> {
    let record = store.get(id).await?.ok_or(ExportError::NotFound(id))?;
    export_record(&record)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Style {
    Title,
    Heading,
    Body,
}

impl Style {
    fn font(self) -> &'static str {
        match self {
            Style::Body => "F1",
            Style::Title | Style::Heading => "F2",
        }
    }

    fn size(self) -> i64 {
        match self {
            Style::Title => TITLE_SIZE,
            Style::Heading => HEADING_SIZE,
            Style::Body => BODY_SIZE,
        }
    }
}

struct Line {
    style: Style,
    text: String,
}

impl Line {
    fn new(style: Style, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::new(Style::Body, "")
    }
}

/// Render the three text fields of a record as PDF bytes.
pub fn render_pdf(
    original_text: &str,
    summary: Option<&str>,
    source_value: &str,
) -> Result<Vec<u8>, ExportError> {
    let lines = layout(original_text, summary, source_value);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_dictionary("Helvetica"));
    let bold_id = doc.add_object(font_dictionary("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let lines_per_page = ((PAGE_HEIGHT - 2 * MARGIN) / LINE_HEIGHT) as usize;
    let mut kids: Vec<Object> = Vec::new();
    for page_lines in lines.chunks(lines_per_page) {
        let page_id = add_page(&mut doc, pages_id, page_lines)?;
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ExportError::Render(e.to_string()))?;
    Ok(bytes)
}

fn font_dictionary(base_font: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn add_page(doc: &mut Document, pages_id: ObjectId, lines: &[Line]) -> Result<ObjectId, ExportError> {
    let mut operations = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    for line in lines {
        y -= LINE_HEIGHT;
        if line.text.is_empty() {
            continue;
        }
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![line.style.font().into(), line.style.size().into()],
        ));
        operations.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(to_win_ansi(&line.text), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }

    let content = Content { operations }
        .encode()
        .map_err(|e| ExportError::Render(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    }))
}

fn layout(original_text: &str, summary: Option<&str>, source_value: &str) -> Vec<Line> {
    let mut lines = vec![Line::new(Style::Title, "Dyslexify export"), Line::blank()];

    for wrapped in wrap(&format!("Source: {}", source_value), WRAP_CHARS) {
        lines.push(Line::new(Style::Body, wrapped));
    }

    if let Some(summary) = summary.filter(|s| !s.trim().is_empty()) {
        lines.push(Line::blank());
        lines.push(Line::new(Style::Heading, "Summary"));
        push_paragraphs(&mut lines, summary);
    }

    lines.push(Line::blank());
    lines.push(Line::new(Style::Heading, "Original text"));
    push_paragraphs(&mut lines, original_text);
    lines
}

fn push_paragraphs(lines: &mut Vec<Line>, text: &str) {
    for paragraph in text.lines() {
        if paragraph.trim().is_empty() {
            lines.push(Line::blank());
            continue;
        }
        for wrapped in wrap(paragraph, WRAP_CHARS) {
            lines.push(Line::new(Style::Body, wrapped));
        }
    }
}

/// Greedy word wrap by character count. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            out.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 { word.len() } else { word.len() + 1 };
        if current_len > 0 && current_len + needed > width {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 {
        out.push(current);
    }
    out
}

fn to_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        if ch.is_control() {
            out.push(b' ');
            continue;
        }
        let (bytes, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use chrono::Utc;

    fn record(id: i64, text: &str) -> ProcessedContent {
        ProcessedContent {
            id,
            source_kind: SourceKind::RemotePage,
            source_value: "https://example.com/article".into(),
            original_text: text.into(),
            summary: Some("A short summary.".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn export_declares_pdf_and_names_file_after_id() {
        let export = export_record(&record(42, "First line\nSecond line")).unwrap();
        assert_eq!(export.content_type, "application/pdf");
        assert!(export.filename.contains("42"));
        assert_eq!(export.filename, "dyslexify_export_42.pdf");
        assert_eq!(
            export.content_disposition(),
            "attachment; filename=\"dyslexify_export_42.pdf\""
        );
        assert!(export.bytes.starts_with(b"%PDF-1.5"));
    }

    #[test]
    fn long_text_spans_several_pages() {
        let text = (0..200)
            .map(|i| format!("Paragraph number {} with a few more words in it.", i))
            .collect::<Vec<_>>()
            .join("\n");
        let bytes = render_pdf(&text, None, "long.txt").unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn empty_record_still_renders_one_page() {
        let bytes = render_pdf("", None, "empty.txt").unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn wrap_respects_width_and_splits_long_words() {
        let lines = wrap("aaa bbb ccc dddddddddd", 7);
        assert_eq!(lines, vec!["aaa bbb", "ccc", "ddddddd", "ddd"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn win_ansi_maps_latin_and_replaces_the_rest() {
        assert_eq!(to_win_ansi("café"), b"caf\xe9".to_vec());
        assert_eq!(to_win_ansi("€"), vec![0x80]);
        assert_eq!(to_win_ansi("日本"), b"??".to_vec());
        assert_eq!(to_win_ansi("a\tb"), b"a b".to_vec());
    }

    #[tokio::test]
    async fn export_by_id_reports_missing_record() {
        let store = crate::store::InMemoryStore::new();
        let err = export_by_id(&store, 9).await.unwrap_err();
        assert!(matches!(err, ExportError::NotFound(9)));
    }
}
