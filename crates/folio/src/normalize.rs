//! Conversion of filing markup into markdown-like text.
//!
//! EDGAR primary documents are HTML, inline XBRL (XHTML with `ix:` tags) or,
//! for older filings, plain text. The normalizer tokenizes markup with
//! `quick-xml` in a lenient mode (unchecked end names, stray end tags
//! allowed), drops non-content subtrees and writes the remaining text in
//! reading order with light markdown structure:
//!
//! - `h1`-`h6` become `#` headings
//! - `li` becomes a `- ` item
//! - table cells in a row are joined with ` | `
//! - block elements separate paragraphs
//!
//! Output depends only on the input bytes.

use crate::error::{FolioError, Result};
use folio_data::edgar::{ContentHint, RawDocument};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::fmt;

/// Elements whose whole subtree is dropped.
const SKIPPED: [&str; 6] = ["script", "style", "head", "title", "noscript", "ix:header"];

/// Elements whose content is raw text rather than markup.
const RAW_TEXT: [&str; 2] = ["script", "style"];

/// Elements that start and end a paragraph.
const BLOCKS: [&str; 22] = [
    "p",
    "div",
    "section",
    "article",
    "table",
    "thead",
    "tbody",
    "tfoot",
    "ul",
    "ol",
    "dl",
    "dt",
    "dd",
    "blockquote",
    "pre",
    "center",
    "body",
    "html",
    "form",
    "header",
    "footer",
    "caption",
];

/// Normalized filing text.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NormalizedText(String);

impl NormalizedText {
    /// The text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the text is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unwrap into the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NormalizedText").field(&self.0.len()).finish()
    }
}

/// Converts raw documents into [`NormalizedText`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentNormalizer;

impl DocumentNormalizer {
    /// Create a normalizer.
    pub const fn new() -> Self {
        Self
    }

    /// Convert a downloaded document.
    ///
    /// # Errors
    /// Returns `FolioError::Conversion` for empty input, malformed markup,
    /// or a document without any text.
    pub fn normalize(&self, document: &RawDocument) -> Result<NormalizedText> {
        let source = String::from_utf8_lossy(&document.bytes);
        if source.trim().is_empty() {
            return Err(FolioError::Conversion("document is empty".to_string()));
        }

        let text = match document.hint {
            ContentHint::Text => plain_text(&source),
            ContentHint::Html | ContentHint::Xbrl | ContentHint::Unknown => markup_text(&source)?,
        };

        if text.is_empty() {
            return Err(FolioError::Conversion(
                "document contains no text".to_string(),
            ));
        }
        Ok(NormalizedText(text))
    }
}

fn plain_text(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut blank_run = false;

    for line in source.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run { "\n\n" } else { "\n" });
        }
        out.push_str(&collapsed);
        blank_run = false;
    }

    out
}

fn markup_text(source: &str) -> Result<String> {
    let prepared = prepare_markup(source);
    let mut reader = Reader::from_str(&prepared);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.check_comments = false;
    config.expand_empty_elements = false;
    config.trim_text(false);

    let mut writer = MarkdownWriter::default();
    let mut skip: Option<(String, usize)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            FolioError::Conversion(format!(
                "malformed markup at byte {}: {}",
                reader.error_position(),
                e
            ))
        })?;

        match event {
            Event::Start(tag) => {
                let name = tag_name(tag.name().as_ref());
                if let Some((skipped, depth)) = skip.as_mut() {
                    if *skipped == name {
                        *depth += 1;
                    }
                    continue;
                }
                if SKIPPED.contains(&name.as_str()) {
                    skip = Some((name, 1));
                    continue;
                }
                writer.open(&name);
            }
            Event::Empty(tag) => {
                if skip.is_none() {
                    writer.empty(&tag_name(tag.name().as_ref()));
                }
            }
            Event::End(tag) => {
                let name = tag_name(tag.name().as_ref());
                if let Some((skipped, depth)) = skip.as_mut() {
                    if *skipped == name {
                        *depth -= 1;
                        if *depth == 0 {
                            skip = None;
                        }
                    }
                    continue;
                }
                writer.close(&name);
            }
            Event::Text(text) => {
                if skip.is_none() {
                    let raw = text.into_inner();
                    writer.text(&decode_entities(&String::from_utf8_lossy(&raw)));
                }
            }
            Event::CData(data) => {
                if skip.is_none() {
                    writer.text(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(writer.finish())
}

/// Drop raw-text elements and escape every `<` that cannot open a tag.
///
/// Comments and CDATA sections are copied untouched.
fn prepare_markup(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut copied = 0;
    let mut pos = 0;

    while let Some(offset) = source[pos..].find('<') {
        let at = pos + offset;
        let rest = &source[at + 1..];
        match rest.bytes().next() {
            Some(b) if b.is_ascii_alphabetic() => {
                if let Some(end) = raw_text_end(source, at) {
                    out.push_str(&source[copied..at]);
                    copied = end;
                    pos = end;
                } else {
                    pos = at + 1;
                }
            }
            Some(b'!') if rest.starts_with("!--") => pos = skip_past(source, at, "-->"),
            Some(b'!') if rest.starts_with("![CDATA[") => pos = skip_past(source, at, "]]>"),
            Some(b'!' | b'/' | b'?') => pos = at + 1,
            _ => {
                out.push_str(&source[copied..at]);
                out.push_str("&lt;");
                copied = at + 1;
                pos = at + 1;
            }
        }
    }

    out.push_str(&source[copied..]);
    out
}

/// End of the raw-text element opening at `at`, if it is one.
///
/// An unclosed element runs to the end of the source.
fn raw_text_end(source: &str, at: usize) -> Option<usize> {
    let name_len = source[at + 1..]
        .bytes()
        .take_while(u8::is_ascii_alphanumeric)
        .count();
    let name = &source[at + 1..at + 1 + name_len];
    if !RAW_TEXT.iter().any(|raw| raw.eq_ignore_ascii_case(name)) {
        return None;
    }

    let open_end = skip_past(source, at, ">");
    if source[..open_end].ends_with("/>") {
        return Some(open_end);
    }

    let bytes = source.as_bytes();
    let mut pos = open_end;
    while let Some(offset) = source[pos..].find("</") {
        let close = pos + offset;
        let tail = bytes.get(close + 2..close + 2 + name_len);
        if tail.is_some_and(|tail| tail.eq_ignore_ascii_case(name.as_bytes())) {
            return Some(skip_past(source, close, ">"));
        }
        pos = close + 2;
    }
    Some(source.len())
}

/// Position just after the first `pattern` at or after `from`.
fn skip_past(source: &str, from: usize, pattern: &str) -> usize {
    source[from..]
        .find(pattern)
        .map_or(source.len(), |i| from + i + pattern.len())
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

/// Name without its namespace prefix.
fn local(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Pending separator before the next piece of text, in increasing strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
enum Gap {
    #[default]
    None,
    Space,
    Cell,
    Line,
    Paragraph,
}

#[derive(Debug, Default)]
struct MarkdownWriter {
    out: String,
    gap: Gap,
    prefix: Option<String>,
    row_cells: usize,
}

impl MarkdownWriter {
    fn widen(&mut self, gap: Gap) {
        self.gap = self.gap.max(gap);
    }

    fn open(&mut self, name: &str) {
        let name = local(name);
        if let Some(level) = heading_level(name) {
            self.widen(Gap::Paragraph);
            self.prefix = Some(format!("{} ", "#".repeat(level)));
            return;
        }
        match name {
            "li" => {
                self.widen(Gap::Line);
                self.prefix = Some("- ".to_string());
            }
            "tr" => {
                self.widen(Gap::Line);
                self.row_cells = 0;
            }
            "td" | "th" => {
                if self.row_cells > 0 {
                    self.widen(Gap::Cell);
                }
                self.row_cells += 1;
            }
            "br" => self.widen(Gap::Line),
            "hr" => self.rule(),
            _ if BLOCKS.contains(&name) => self.widen(Gap::Paragraph),
            _ => {}
        }
    }

    fn empty(&mut self, name: &str) {
        match local(name) {
            "br" => self.widen(Gap::Line),
            "hr" => self.rule(),
            other if BLOCKS.contains(&other) => self.widen(Gap::Paragraph),
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        let name = local(name);
        if heading_level(name).is_some() {
            self.prefix = None;
            self.widen(Gap::Paragraph);
            return;
        }
        match name {
            "li" => {
                self.prefix = None;
                self.widen(Gap::Line);
            }
            "tr" => {
                self.row_cells = 0;
                self.widen(Gap::Line);
            }
            _ if BLOCKS.contains(&name) => self.widen(Gap::Paragraph),
            _ => {}
        }
    }

    fn rule(&mut self) {
        self.widen(Gap::Paragraph);
        self.write_word("---");
        self.widen(Gap::Paragraph);
    }

    fn text(&mut self, text: &str) {
        let mut word = String::new();
        for ch in text.chars() {
            if ch.is_whitespace() || ch.is_control() {
                if !word.is_empty() {
                    self.write_word(&word);
                    word.clear();
                }
                self.widen(Gap::Space);
            } else {
                word.push(ch);
            }
        }
        if !word.is_empty() {
            self.write_word(&word);
        }
    }

    fn write_word(&mut self, word: &str) {
        if !self.out.is_empty() {
            match self.gap {
                Gap::None => {}
                Gap::Space => self.out.push(' '),
                Gap::Cell => self.out.push_str(" | "),
                Gap::Line => self.out.push('\n'),
                Gap::Paragraph => self.out.push_str("\n\n"),
            }
        }
        if let Some(prefix) = self.prefix.take() {
            self.out.push_str(&prefix);
        }
        self.gap = Gap::None;
        self.out.push_str(word);
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Decode HTML character references; unknown references are kept verbatim.
fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .char_indices()
            .take(12)
            .find(|(_, c)| *c == ';')
            .and_then(|(end, _)| resolve_entity(&tail[1..end]).map(|ch| (ch, end)));

        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn resolve_entity(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" | "ensp" | "emsp" | "thinsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "bull" => '\u{2022}',
        "hellip" => '\u{2026}',
        "middot" => '\u{00B7}',
        "sect" => '\u{00A7}',
        "para" => '\u{00B6}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "trade" => '\u{2122}',
        "cent" => '\u{00A2}',
        "pound" => '\u{00A3}',
        "euro" => '\u{20AC}',
        "yen" => '\u{00A5}',
        "deg" => '\u{00B0}',
        "frac12" => '\u{00BD}',
        "frac14" => '\u{00BC}',
        "frac34" => '\u{00BE}',
        "times" => '\u{00D7}',
        "divide" => '\u{00F7}',
        _ => return None,
    };
    Some(ch)
}
