//! Web-page extraction: URL validation, a bounded fetch, and main-content
//! selection.
//!
//! The fetch is a single attempt with the configured timeout. The page body
//! is decoded with the charset from `Content-Type` (UTF-8 otherwise), and
//! main content is pulled out of the DOM with `scraper`:
//!
//! 1. The content root is the largest `article`, then `main`, then
//!    `[role=main]`; pages without any fall back to `body`.
//! 2. Navigation, page chrome, forms, scripts and comment sections are
//!    skipped, matched by tag or by `class`/`id` tokens.
//! 3. Headings, paragraphs, list items, quotes and `pre` blocks become one
//!    line each; table rows become their cell texts joined with ` | `.

use encoding_rs::Encoding;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::error::ExtractionError;
use crate::models::{DocumentFormat, ExtractedDocument};

/// Tags whose whole subtree is never content.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "aside", "footer", "form", "button",
    "select", "textarea", "iframe", "svg", "canvas", "dialog",
];

/// Tags rendered as one line of text each.
const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "pre", "blockquote", "figcaption", "dt", "dd",
    "caption", "address",
];

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "del", "dfn", "em", "i", "ins", "kbd",
    "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var", "wbr",
    "font", "label",
];

/// `class`/`id` tokens that mark boilerplate or reader comments.
const BOILERPLATE_TOKENS: &[&str] = &[
    "comment", "comments", "nav", "navbar", "navigation", "menu", "sidebar", "footer", "cookie",
    "cookies", "consent", "banner", "advert", "advertisement", "ads", "promo", "newsletter",
    "subscribe", "sharing", "social", "related", "breadcrumb", "breadcrumbs", "popup", "modal",
    "skip",
];

/// Too short to match inside compound names (`ad-free`, `share-enabled`);
/// only a whole `class`/`id` word counts.
const WHOLE_WORD_TOKENS: &[&str] = &["ad", "share"];

/// Fetches a page and extracts its readable text.
pub struct WebPageExtractor {
    client: reqwest::Client,
    max_body_bytes: usize,
    timeout_secs: u64,
}

impl WebPageExtractor {
    pub fn new(config: &FetchConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Validate, fetch and extract. The URL must already carry its scheme.
    pub async fn extract(&self, url: &str) -> Result<ExtractedDocument, ExtractionError> {
        let parsed = validate_url(url)?;
        info!(url = %parsed, "fetching web page");

        let html = self.fetch(&parsed).await?;
        let text = extract_main_text(&html)
            .ok_or_else(|| ExtractionError::NoReadableContent(parsed.to_string()))?;

        info!(url = %parsed, chars = text.chars().count(), "extracted web page text");
        Ok(ExtractedDocument {
            raw_text: text,
            format: DocumentFormat::WebPage,
        })
    }

    async fn fetch(&self, url: &Url) -> Result<String, ExtractionError> {
        let fetch_failed = |reason: String| ExtractionError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let mut response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                fetch_failed(format!("timed out after {}s", self.timeout_secs))
            } else {
                fetch_failed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_failed(format!("HTTP {}", status)));
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(fetch_failed(format!(
                    "response exceeds {} bytes",
                    self.max_body_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }

        let encoding = charset
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(encoding_rs::UTF_8);
        let (text, used, had_errors) = encoding.decode(&body);
        if had_errors {
            debug!(encoding = used.name(), "page body contained undecodable bytes");
        }
        Ok(text.into_owned())
    }
}

/// Require an `http`/`https` scheme and a non-empty host.
///
/// Other schemes (`ftp`, `file`, `mailto`) are rejected here rather than
/// left to fail at fetch time.
pub fn validate_url(url: &str) -> Result<Url, ExtractionError> {
    let invalid = || ExtractionError::InvalidUrl(url.to_string());
    let parsed = Url::parse(url.trim()).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid());
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(invalid()),
    }
}

fn charset_from_content_type(value: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (key, val) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| val.trim().trim_matches('"').to_string())
    })
}

/// Extract the main readable text of an HTML page, one block per line.
///
/// Returns `None` when nothing readable is left after boilerplate removal.
pub fn extract_main_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let (root, is_body) = pick_content_root(&doc)?;

    let walker = BlockWalker {
        skip_headers: is_body,
    };
    let mut lines = Vec::new();
    walker.collect(root, &mut lines);

    let text = lines.join("\n");
    (!text.trim().is_empty()).then_some(text)
}

fn pick_content_root(doc: &Html) -> Option<(ElementRef<'_>, bool)> {
    for selector in ["article", "main", "[role=main]"] {
        let sel = Selector::parse(selector).ok()?;
        let best = doc
            .select(&sel)
            .map(|el| (el, text_chars(el)))
            .max_by_key(|(_, chars)| *chars);
        if let Some((el, chars)) = best {
            if chars > 0 {
                return Some((el, false));
            }
        }
    }
    let body = Selector::parse("body").ok()?;
    doc.select(&body).next().map(|el| (el, true))
}

fn text_chars(el: ElementRef<'_>) -> usize {
    el.text().map(|t| t.trim().chars().count()).sum()
}

fn is_boilerplate(el: ElementRef<'_>) -> bool {
    let value = el.value();
    if SKIP_TAGS.contains(&value.name()) {
        return true;
    }
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    [value.attr("class"), value.attr("id")]
        .into_iter()
        .flatten()
        .flat_map(str::split_whitespace)
        .map(str::to_ascii_lowercase)
        .any(|word| {
            WHOLE_WORD_TOKENS.contains(&word.as_str())
                || word
                    .split(['-', '_'])
                    .any(|token| BOILERPLATE_TOKENS.contains(&token))
        })
}

struct BlockWalker {
    /// Page-level `header` elements are chrome when walking the whole body.
    skip_headers: bool,
}

impl BlockWalker {
    fn skipped(&self, el: ElementRef<'_>) -> bool {
        is_boilerplate(el) || (self.skip_headers && el.value().name() == "header")
    }

    fn collect(&self, el: ElementRef<'_>, lines: &mut Vec<String>) {
        let mut inline = String::new();
        for child in el.children() {
            if let Some(text) = child.value().as_text() {
                push_text(&mut inline, text, false);
                continue;
            }
            let Some(child_el) = ElementRef::wrap(child) else {
                continue;
            };
            if self.skipped(child_el) {
                continue;
            }
            let name = child_el.value().name();
            if name == "br" {
                inline.push('\n');
            } else if INLINE_TAGS.contains(&name) {
                self.inline_text(child_el, &mut inline, false);
            } else if name == "tr" {
                flush(&mut inline, lines);
                push_line(lines, self.row_text(child_el));
            } else if BLOCK_TAGS.contains(&name) {
                flush(&mut inline, lines);
                let preserve = name == "pre";
                let mut block = String::new();
                self.inline_text(child_el, &mut block, preserve);
                if preserve {
                    lines.push(block);
                } else {
                    push_line(lines, squash_whitespace(&block));
                }
            } else {
                flush(&mut inline, lines);
                self.collect(child_el, lines);
            }
        }
        flush(&mut inline, lines);
    }

    /// Text of a subtree, honoring skips and turning `br` into a newline.
    ///
    /// Source line breaks are layout, not content, unless `preserve` is set.
    fn inline_text(&self, el: ElementRef<'_>, out: &mut String, preserve: bool) {
        for child in el.children() {
            if let Some(text) = child.value().as_text() {
                push_text(out, text, preserve);
            } else if let Some(child_el) = ElementRef::wrap(child) {
                if self.skipped(child_el) {
                    continue;
                }
                match child_el.value().name() {
                    "br" => out.push('\n'),
                    "p" | "li" | "div" | "tr" => {
                        out.push('\n');
                        self.inline_text(child_el, out, preserve);
                        out.push('\n');
                    }
                    _ => self.inline_text(child_el, out, preserve),
                }
            }
        }
    }

    fn row_text(&self, row: ElementRef<'_>) -> String {
        let mut cells = Vec::new();
        for child in row.children().filter_map(ElementRef::wrap) {
            if !matches!(child.value().name(), "td" | "th") || self.skipped(child) {
                continue;
            }
            let mut cell = String::new();
            self.inline_text(child, &mut cell, false);
            let cell = cell.split_whitespace().collect::<Vec<_>>().join(" ");
            if !cell.is_empty() {
                cells.push(cell);
            }
        }
        cells.join(" | ")
    }
}

fn push_text(out: &mut String, text: &str, preserve: bool) {
    if preserve {
        out.push_str(text);
    } else {
        out.extend(text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }));
    }
}

/// Collapse whitespace inside each line of `text`, keeping explicit newlines.
fn squash_whitespace(text: &str) -> String {
    text.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn flush(inline: &mut String, lines: &mut Vec<String>) {
    if !inline.trim().is_empty() {
        push_line(lines, squash_whitespace(inline));
    }
    inline.clear();
}

fn push_line(lines: &mut Vec<String>, line: String) {
    if !line.trim().is_empty() {
        lines.push(line);
    }
}
