//! Streaming PDF output for generated reports
//!
//! Sections are laid out one at a time. As soon as a page is full it is
//! serialized and handed to the response body, so memory use stays bounded
//! by one page no matter how long the document gets. Object offsets are
//! tracked as bytes go out, and the cross-reference table is written last.

use std::collections::BTreeMap;

use async_stream::try_stream;
use bytes::Bytes;
use futures::Stream;
use pdf_writer::writers::{Catalog, DocumentInfo};
use pdf_writer::{Chunk, Content, Finish, Name, Rect, Ref, Str, TextStr};
use thiserror::Error;

use super::sections::{Section, SectionKind};

const CATALOG_ID: i32 = 1;
const PAGE_TREE_ID: i32 = 2;
const FONT_REGULAR_ID: i32 = 3;
const FONT_BOLD_ID: i32 = 4;
const INFO_ID: i32 = 5;
const FIRST_FREE_ID: i32 = 6;

const REGULAR: Name<'static> = Name(b"F1");
const BOLD: Name<'static> = Name(b"F2");

/// Advance widths for WinAnsi 0x20..=0x7E, from the Helvetica AFM (1/1000 em)
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Same range from the Helvetica-Bold AFM
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width assumed for bytes outside the printable ASCII range
const FALLBACK_WIDTH: u16 = 722;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Layout error: {0}")]
    Layout(String),
}

/// Page geometry in PDF points (72 points = 1 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageLayout {
    pub const A4: PageLayout = PageLayout {
        width: 595.0,
        height: 842.0,
        margin: 56.0,
    };

    fn top(&self) -> f32 {
        self.height - self.margin
    }

    fn usable_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }

    fn usable_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::A4
    }
}

struct Style {
    font: Name<'static>,
    size: f32,
    leading: f32,
    space_before: f32,
}

impl Style {
    fn for_kind(kind: SectionKind) -> Self {
        let (font, size, leading, space_before) = match kind {
            SectionKind::Title => (BOLD, 18.0, 24.0, 0.0),
            SectionKind::Rule => (REGULAR, 0.0, 14.0, 0.0),
            SectionKind::Heading => (BOLD, 13.0, 18.0, 4.0),
            SectionKind::Line => (REGULAR, 11.0, 16.0, 0.0),
            SectionKind::Note => (REGULAR, 9.0, 12.0, 14.0),
        };
        Self {
            font,
            size,
            leading,
            space_before,
        }
    }
}

/// A positioned drawing operation
#[derive(Debug, Clone, PartialEq)]
enum Mark {
    Text {
        font: Name<'static>,
        size: f32,
        x: f32,
        y: f32,
        text: Vec<u8>,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
    },
}

/// One laid-out page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    marks: Vec<Mark>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Text lines on the page, decoded for inspection
    pub fn text_lines(&self) -> Vec<String> {
        self.marks
            .iter()
            .filter_map(|mark| match mark {
                Mark::Text { text, .. } => Some(text.iter().map(|&b| b as char).collect()),
                Mark::Rule { .. } => None,
            })
            .collect()
    }
}

/// Places sections top to bottom, breaking pages as space runs out
pub struct Paginator {
    layout: PageLayout,
    cursor: f32,
    current: Page,
}

impl Paginator {
    pub fn new(layout: PageLayout) -> Self {
        Self {
            layout,
            cursor: layout.top(),
            current: Page::default(),
        }
    }

    /// Lay out a section, returning the pages it completed
    pub fn push(&mut self, section: &Section) -> Result<Vec<Page>, RenderError> {
        let style = Style::for_kind(section.kind);
        if style.leading > self.layout.usable_height() {
            return Err(RenderError::Layout(format!(
                "{:?} section needs {}pt but a page only has {}pt",
                section.kind,
                style.leading,
                self.layout.usable_height()
            )));
        }

        let mut completed = Vec::new();

        if !self.current.is_empty() {
            self.cursor -= style.space_before;
        }

        if section.kind == SectionKind::Rule {
            self.reserve(style.leading, &mut completed);
            let y = self.cursor - style.leading / 2.0;
            self.current.marks.push(Mark::Rule {
                x1: self.layout.margin,
                x2: self.layout.width - self.layout.margin,
                y,
            });
            self.cursor -= style.leading;
            return Ok(completed);
        }

        let max_width = self.layout.usable_width();
        if max_width < style.size {
            return Err(RenderError::Layout(format!(
                "page too narrow for {}pt text",
                style.size
            )));
        }

        let measure = |text: &str| text_width(style.font, style.size, text);
        for line in wrap(&section.text, max_width, measure) {
            self.reserve(style.leading, &mut completed);
            self.current.marks.push(Mark::Text {
                font: style.font,
                size: style.size,
                x: self.layout.margin,
                y: self.cursor - style.size,
                text: win_ansi(&line),
            });
            self.cursor -= style.leading;
        }

        Ok(completed)
    }

    /// Flush the partially filled page, if any
    pub fn finish(self) -> Option<Page> {
        if self.current.is_empty() {
            None
        } else {
            Some(self.current)
        }
    }

    fn reserve(&mut self, height: f32, completed: &mut Vec<Page>) {
        if self.cursor - height < self.layout.margin {
            completed.push(std::mem::take(&mut self.current));
            self.cursor = self.layout.top();
        }
    }
}

/// Rendered width of `text` in points
fn text_width(font: Name<'static>, size: f32, text: &str) -> f32 {
    let widths = if font == BOLD {
        &HELVETICA_BOLD_WIDTHS
    } else {
        &HELVETICA_WIDTHS
    };
    let units: u32 = win_ansi(text)
        .into_iter()
        .map(|b| match b {
            0x20..=0x7E => u32::from(widths[(b - 0x20) as usize]),
            _ => u32::from(FALLBACK_WIDTH),
        })
        .sum();
    units as f32 * size / 1000.0
}

/// Greedy word wrap; words wider than a line are split between characters
fn wrap(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure(word) <= max_width {
            current = word.to_string();
            continue;
        }

        for c in word.chars() {
            current.push(c);
            if current.chars().count() > 1 && measure(&current) > max_width {
                current.pop();
                lines.push(std::mem::replace(&mut current, c.to_string()));
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Encode text for the standard fonts' WinAnsi encoding
///
/// Characters outside the encoding become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// Serializes a PDF incrementally, one page at a time
pub struct PdfWriter {
    title: String,
    layout: PageLayout,
    next_id: i32,
    written: usize,
    offsets: BTreeMap<i32, usize>,
    page_ids: Vec<Ref>,
}

impl PdfWriter {
    pub fn new(title: impl Into<String>, layout: PageLayout) -> Self {
        Self {
            title: title.into(),
            layout,
            next_id: FIRST_FREE_ID,
            written: 0,
            offsets: BTreeMap::new(),
            page_ids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a single-object chunk, recording where the object starts
    fn emit(&mut self, out: &mut Vec<u8>, id: Ref, chunk: &Chunk) {
        self.offsets.insert(id.get(), self.written + out.len());
        out.extend_from_slice(chunk.as_bytes());
    }

    fn flush(&mut self, out: Vec<u8>) -> Bytes {
        self.written += out.len();
        Bytes::from(out)
    }

    /// File header and shared font objects
    pub fn begin(&mut self) -> Bytes {
        let mut out = b"%PDF-1.7\n%\x80\x80\x80\x80\n".to_vec();

        for (id, base) in [(FONT_REGULAR_ID, "Helvetica"), (FONT_BOLD_ID, "Helvetica-Bold")] {
            let mut chunk = Chunk::new();
            chunk
                .type1_font(Ref::new(id))
                .base_font(Name(base.as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
            self.emit(&mut out, Ref::new(id), &chunk);
        }

        self.flush(out)
    }

    /// Serialize one page and its content stream
    pub fn write_page(&mut self, page: &Page) -> Bytes {
        let page_id = self.alloc();
        let content_id = self.alloc();
        let mut out = Vec::new();

        let mut content = Content::new();
        for mark in &page.marks {
            match mark {
                Mark::Text {
                    font,
                    size,
                    x,
                    y,
                    text,
                } => {
                    content.begin_text();
                    content.set_font(*font, *size);
                    content.next_line(*x, *y);
                    content.show(Str(text));
                    content.end_text();
                }
                Mark::Rule { x1, x2, y } => {
                    content.set_line_width(0.75);
                    content.move_to(*x1, *y);
                    content.line_to(*x2, *y);
                    content.stroke();
                }
            }
        }
        let data = content.finish();

        let mut chunk = Chunk::new();
        chunk.stream(content_id, &data);
        self.emit(&mut out, content_id, &chunk);

        let mut chunk = Chunk::new();
        let mut pdf_page = chunk.page(page_id);
        pdf_page.media_box(Rect::new(0.0, 0.0, self.layout.width, self.layout.height));
        pdf_page.parent(Ref::new(PAGE_TREE_ID));
        pdf_page.contents(content_id);
        pdf_page
            .resources()
            .fonts()
            .pair(REGULAR, Ref::new(FONT_REGULAR_ID))
            .pair(BOLD, Ref::new(FONT_BOLD_ID));
        pdf_page.finish();
        self.emit(&mut out, page_id, &chunk);

        self.page_ids.push(page_id);
        self.flush(out)
    }

    /// Page tree, catalog, document info, cross-reference table and trailer
    pub fn finish(mut self) -> Bytes {
        let mut out = Vec::new();

        let mut chunk = Chunk::new();
        chunk
            .pages(Ref::new(PAGE_TREE_ID))
            .kids(self.page_ids.iter().copied())
            .count(self.page_ids.len() as i32);
        self.emit(&mut out, Ref::new(PAGE_TREE_ID), &chunk);

        let mut chunk = Chunk::new();
        chunk
            .indirect(Ref::new(CATALOG_ID))
            .start::<Catalog>()
            .pages(Ref::new(PAGE_TREE_ID));
        self.emit(&mut out, Ref::new(CATALOG_ID), &chunk);

        let mut chunk = Chunk::new();
        chunk
            .indirect(Ref::new(INFO_ID))
            .start::<DocumentInfo>()
            .title(TextStr(&self.title))
            .producer(TextStr("pajsk-report-server"));
        self.emit(&mut out, Ref::new(INFO_ID), &chunk);

        let xref_offset = self.written + out.len();
        let size = self.next_id;

        out.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for id in 1..size {
            match self.offsets.get(&id) {
                Some(offset) => out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes()),
                None => out.extend_from_slice(b"0000000000 65535 f \n"),
            }
        }

        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
                size, CATALOG_ID, INFO_ID, xref_offset
            )
            .as_bytes(),
        );

        self.flush(out)
    }
}

/// Render sections into a PDF byte stream
///
/// Nothing is computed until the stream is polled. Dropping the stream
/// stops rendering before the next page.
pub fn render_document(
    sections: Vec<Section>,
    title: String,
    layout: PageLayout,
) -> impl Stream<Item = Result<Bytes, RenderError>> + Send + 'static {
    try_stream! {
        let mut writer = PdfWriter::new(title, layout);
        let mut paginator = Paginator::new(layout);

        yield writer.begin();

        for section in &sections {
            for page in paginator.push(section)? {
                yield writer.write_page(&page);
            }
        }

        if let Some(page) = paginator.finish() {
            yield writer.write_page(&page);
        }
        if writer.page_count() == 0 {
            yield writer.write_page(&Page::default());
        }

        yield writer.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn line(text: &str) -> Section {
        Section {
            kind: SectionKind::Line,
            text: text.to_string(),
        }
    }

    fn rule() -> Section {
        Section {
            kind: SectionKind::Rule,
            text: String::new(),
        }
    }

    async fn render(sections: Vec<Section>) -> (Vec<Bytes>, Vec<u8>) {
        let chunks: Vec<Bytes> = render_document(sections, "Test".to_string(), PageLayout::A4)
            .try_collect()
            .await
            .unwrap();
        let joined = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        (chunks, joined)
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn chars(text: &str) -> f32 {
        text.chars().count() as f32
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("Remarks: good", 80.0, chars), vec!["Remarks: good"]);
        assert_eq!(wrap("aaa bbb ccc", 7.0, chars), vec!["aaa bbb", "ccc"]);
        assert_eq!(wrap("abcdefghij", 4.0, chars), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("x abcdefghij", 4.0, chars), vec!["x", "abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 10.0, chars), vec![""]);
    }

    #[test]
    fn test_text_width_uses_font_metrics() {
        assert!((text_width(REGULAR, 10.0, "AW") - 16.11).abs() < 0.001);
        assert!((text_width(BOLD, 10.0, "AW") - 16.66).abs() < 0.001);
        assert!((text_width(REGULAR, 10.0, "il") - 4.44).abs() < 0.001);
        assert!(text_width(REGULAR, 11.0, "MALAYSIA") > text_width(REGULAR, 11.0, "malaysia"));
    }

    #[test]
    fn test_uppercase_lines_stay_inside_margin() {
        let text = "Uniformed Body: PERSATUAN BULAN SABIT MERAH MALAYSIA DAN KOR KADET POLIS WANITA";
        let layout = PageLayout::A4;

        let mut paginator = Paginator::new(layout);
        assert!(paginator.push(&line(text)).unwrap().is_empty());
        let lines = paginator.finish().unwrap().text_lines();

        assert!(lines.len() > 1);
        for wrapped in &lines {
            assert!(
                text_width(REGULAR, 11.0, wrapped) <= layout.usable_width(),
                "{:?} overflows",
                wrapped
            );
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi("Name: Ali"), b"Name: Ali".to_vec());
        assert_eq!(win_ansi("José"), vec![b'J', b'o', b's', 0xE9]);
        assert_eq!(win_ansi("’"), vec![0x92]);
        assert_eq!(win_ansi("李"), b"?".to_vec());
    }

    #[test]
    fn test_paginator_single_page() {
        let mut paginator = Paginator::new(PageLayout::A4);
        for section in [line("Name: Ali"), rule(), line("Class: 5 Bestari")] {
            assert!(paginator.push(&section).unwrap().is_empty());
        }
        let page = paginator.finish().unwrap();
        assert_eq!(page.text_lines(), vec!["Name: Ali", "Class: 5 Bestari"]);
    }

    #[test]
    fn test_paginator_breaks_pages() {
        let mut paginator = Paginator::new(PageLayout::A4);
        let mut pages = Vec::new();
        for i in 0..100 {
            pages.extend(paginator.push(&line(&format!("Line {}", i))).unwrap());
        }
        pages.extend(paginator.finish());

        // 730pt usable at 16pt per line
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].text_lines().len(), 45);
        assert_eq!(pages[1].text_lines()[0], "Line 45");
        let total: usize = pages.iter().map(|p| p.text_lines().len()).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_paginator_rejects_tiny_page() {
        let layout = PageLayout {
            width: 595.0,
            height: 120.0,
            margin: 55.0,
        };
        let mut paginator = Paginator::new(layout);
        assert!(matches!(paginator.push(&line("x")), Err(RenderError::Layout(_))));
    }

    #[tokio::test]
    async fn test_document_structure() {
        let (chunks, pdf) = render(vec![line("Name: Ali"), rule(), line("Remarks: N/A")]).await;

        // header, one page, trailer
        assert_eq!(chunks.len(), 3);
        assert!(pdf.starts_with(b"%PDF-1.7"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert!(contains(&pdf, b"/Count 1"));
        assert!(contains(&pdf, b"/Type /Catalog"));
        assert!(contains(&pdf, b"/Title (Test)"));
        assert!(contains(&pdf, b"(Name: Ali) Tj"));
        assert!(contains(&pdf, b"/Helvetica-Bold"));
    }

    #[tokio::test]
    async fn test_xref_offsets_point_at_objects() {
        let (_, pdf) = render(vec![line("Name: Ali"), line("Class: 5 Bestari")]).await;

        let startxref = pdf.windows(10).rposition(|w| w == b"startxref\n").unwrap();
        let tail = std::str::from_utf8(&pdf[startxref..]).unwrap();
        let xref_offset: usize = tail.lines().nth(1).unwrap().parse().unwrap();

        let xref = std::str::from_utf8(&pdf[xref_offset..]).unwrap();
        assert!(xref.starts_with("xref\n0 8\n"));

        let entries: Vec<&str> = xref.lines().skip(3).take_while(|l| l.ends_with(" n ")).collect();
        assert_eq!(entries.len(), 7);
        for (i, entry) in entries.iter().enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            let expected = format!("{} 0 obj", i + 1);
            assert!(pdf[offset..].starts_with(expected.as_bytes()), "object {} misplaced", i + 1);
        }
    }

    #[tokio::test]
    async fn test_long_document_streams_page_by_page() {
        let sections: Vec<Section> = (0..200).map(|i| line(&format!("Line {}", i))).collect();
        let (chunks, pdf) = render(sections).await;

        // header + 5 pages + trailer
        assert_eq!(chunks.len(), 7);
        assert!(contains(&pdf, b"/Count 5"));
    }

    #[tokio::test]
    async fn test_empty_document_has_one_page() {
        let (_, pdf) = render(Vec::new()).await;
        assert!(contains(&pdf, b"/Count 1"));
    }

    #[tokio::test]
    async fn test_layout_fault_ends_stream() {
        let layout = PageLayout {
            width: 595.0,
            height: 120.0,
            margin: 55.0,
        };
        let mut stream = Box::pin(render_document(vec![line("x")], "Test".to_string(), layout));

        let header = stream.try_next().await.unwrap();
        assert!(header.is_some());
        assert!(stream.try_next().await.is_err());
    }
}
