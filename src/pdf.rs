//! PDF serialization for [`Report`]s.
//!
//! Produces a PDF 1.4 file that relies only on the base-14 Helvetica fonts,
//! so nothing has to be embedded. Text is WinAnsi encoded; characters that
//! Windows-1252 cannot represent are written as `?`.
//!
//! Layout is a single top-down flow. Tables are centered, split across pages
//! by row, and repeat their header row on every continuation page. Columns
//! are sized from the Helvetica glyph metrics and shrunk proportionally when
//! a table is wider than the printable area, truncating cell text that no
//! longer fits. Each page gets a `Page N of M` footer once the flow is done.

use std::{borrow::Cow, fmt::Write as _, fs, path::Path};

use anyhow::{Context, Result};
use encoding_rs::WINDOWS_1252;
use log::debug;

use crate::{
    config::{Color, ReportConfig},
    report::{Alignment, CellStyle, Element, Report, StyledTable},
};

const LINE_HEIGHT: f32 = 1.2;
const DESCENT: f32 = 0.2;
const CELL_PADDING_X: f32 = 6.0;
const CELL_PADDING_TOP: f32 = 3.0;
const TITLE_SIZE: f32 = 18.0;
const TITLE_SPACING: f32 = 18.0;
const HEADING_SIZE: f32 = 14.0;
const HEADING_SPACING_BEFORE: f32 = 12.0;
const HEADING_SPACING_AFTER: f32 = 6.0;
const TABLE_SPACING_AFTER: f32 = 12.0;
const FOOTER_SIZE: f32 = 8.0;
const ELLIPSIS: &str = "...";

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

// Width used for anything outside printable ASCII.
const FALLBACK_WIDTH: u16 = 556;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn for_style(style: &CellStyle) -> Self {
        if style.bold { Font::Bold } else { Font::Regular }
    }

    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    fn glyph_width(self, ch: char) -> u16 {
        let table = match self {
            Font::Regular => &HELVETICA_WIDTHS,
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        match ch {
            ' '..='~' => table[ch as usize - 32],
            _ => FALLBACK_WIDTH,
        }
    }
}

fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text.chars().map(|ch| u32::from(font.glyph_width(ch))).sum();
    units as f32 * size / 1000.0
}

/// Shortens `text` with a trailing ellipsis until it fits `max_width`.
fn fit_text(text: &str, font: Font, size: f32, max_width: f32) -> Cow<'_, str> {
    if text_width(text, font, size) <= max_width {
        return Cow::Borrowed(text);
    }
    let budget = max_width - text_width(ELLIPSIS, font, size);
    if budget <= 0.0 {
        return Cow::Owned(String::new());
    }
    let mut fitted = String::new();
    let mut used = 0.0;
    for ch in text.chars() {
        let advance = f32::from(font.glyph_width(ch)) * size / 1000.0;
        if used + advance > budget {
            break;
        }
        used += advance;
        fitted.push(ch);
    }
    fitted.push_str(ELLIPSIS);
    Cow::Owned(fitted)
}

/// Encodes text as the body of a PDF literal string in WinAnsi encoding.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ' '..='~' => escaped.push(ch),
            c if c.is_control() => escaped.push(' '),
            other => {
                let mut buf = [0u8; 4];
                let (bytes, _, had_errors) = WINDOWS_1252.encode(other.encode_utf8(&mut buf));
                match bytes.as_ref() {
                    [byte] if !had_errors => {
                        let _ = write!(escaped, "\\{byte:03o}");
                    }
                    _ => escaped.push('?'),
                }
            }
        }
    }
    escaped
}

fn fill_color(out: &mut String, color: Color) {
    let (r, g, b) = color.unit_components();
    let _ = writeln!(out, "{r:.3} {g:.3} {b:.3} rg");
}

fn stroke_color(out: &mut String, color: Color) {
    let (r, g, b) = color.unit_components();
    let _ = writeln!(out, "{r:.3} {g:.3} {b:.3} RG");
}

fn show_text(out: &mut String, x: f32, y: f32, text: &str, font: Font, size: f32, color: Color) {
    fill_color(out, color);
    let _ = writeln!(
        out,
        "BT /{} {size:.2} Tf {x:.2} {y:.2} Td ({}) Tj ET",
        font.resource(),
        escape_text(text)
    );
}

/// Top-down flow of elements onto fixed-size pages.
struct PageLayout {
    width: f32,
    height: f32,
    margin: f32,
    font_size: f32,
    pages: Vec<String>,
    cursor: f32,
}

impl PageLayout {
    fn new(config: &ReportConfig) -> Self {
        let (width, height) = config.page_dimensions();
        Self {
            width,
            height,
            margin: config.margin,
            font_size: config.font_size,
            pages: vec![String::new()],
            cursor: height - config.margin,
        }
    }

    fn page(&mut self) -> &mut String {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(String::new());
        self.cursor = self.height - self.margin;
    }

    fn remaining(&self) -> f32 {
        self.cursor - self.margin
    }

    fn at_page_top(&self) -> bool {
        self.cursor >= self.height - self.margin
    }

    /// Starts a new page unless `needed` points still fit. An empty page
    /// always accepts content, however tall.
    fn reserve(&mut self, needed: f32) {
        if needed > self.remaining() && !self.at_page_top() {
            self.new_page();
        }
    }

    fn printable_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    fn title(&mut self, text: &str) {
        let line = TITLE_SIZE * LINE_HEIGHT;
        self.reserve(line);
        let fitted = fit_text(text, Font::Bold, TITLE_SIZE, self.printable_width());
        let x = (self.width - text_width(&fitted, Font::Bold, TITLE_SIZE)) / 2.0;
        let baseline = self.cursor - TITLE_SIZE;
        show_text(self.page(), x, baseline, &fitted, Font::Bold, TITLE_SIZE, Color::BLACK);
        self.cursor -= line + TITLE_SPACING;
    }

    fn heading(&mut self, text: &str) {
        let line = HEADING_SIZE * LINE_HEIGHT;
        // keep the heading on the same page as the first rows below it
        let follow = 2.0 * self.font_size * LINE_HEIGHT;
        self.reserve(HEADING_SPACING_BEFORE + line + follow);
        if !self.at_page_top() {
            self.cursor -= HEADING_SPACING_BEFORE;
        }
        let fitted = fit_text(text, Font::Bold, HEADING_SIZE, self.printable_width());
        let baseline = self.cursor - HEADING_SIZE;
        let x = self.margin;
        show_text(self.page(), x, baseline, &fitted, Font::Bold, HEADING_SIZE, Color::BLACK);
        self.cursor -= line + HEADING_SPACING_AFTER;
    }

    fn table(&mut self, table: &StyledTable) {
        if table.column_count() == 0 {
            return;
        }
        let styles = table.resolved_styles();
        let widths = self.column_widths(table, &styles);
        let total: f32 = widths.iter().sum();
        let left = self.margin + (self.printable_width() - total).max(0.0) / 2.0;
        let heights = styles
            .iter()
            .map(|row| self.row_height(row))
            .collect::<Vec<_>>();

        let header_block = heights[0] + heights.get(1).copied().unwrap_or(0.0);
        self.reserve(header_block);
        self.draw_row(table, &styles, 0, &widths, left, heights[0]);
        for row in 1..heights.len() {
            if heights[row] > self.remaining() && !self.at_page_top() {
                self.new_page();
                self.draw_row(table, &styles, 0, &widths, left, heights[0]);
            }
            self.draw_row(table, &styles, row, &widths, left, heights[row]);
        }
        self.cursor -= TABLE_SPACING_AFTER;
    }

    fn column_widths(&self, table: &StyledTable, styles: &[Vec<CellStyle>]) -> Vec<f32> {
        let minimum = 2.0 * CELL_PADDING_X + self.font_size;
        let mut widths = vec![minimum; table.column_count()];
        for (cells, row_styles) in table.cells().iter().zip(styles) {
            for ((cell, style), width) in cells.iter().zip(row_styles).zip(widths.iter_mut()) {
                let needed = text_width(cell, Font::for_style(style), self.font_size)
                    + 2.0 * CELL_PADDING_X;
                *width = width.max(needed);
            }
        }
        let total: f32 = widths.iter().sum();
        let available = self.printable_width();
        if total > available {
            let scale = available / total;
            for width in &mut widths {
                *width *= scale;
            }
        }
        widths
    }

    fn row_height(&self, row: &[CellStyle]) -> f32 {
        let bottom = row
            .iter()
            .map(|style| style.bottom_padding)
            .fold(0.0_f32, f32::max);
        self.font_size * LINE_HEIGHT + CELL_PADDING_TOP + bottom
    }

    fn draw_row(
        &mut self,
        table: &StyledTable,
        styles: &[Vec<CellStyle>],
        row: usize,
        widths: &[f32],
        left: f32,
        height: f32,
    ) {
        let bottom = self.cursor - height;
        let font_size = self.font_size;
        let cells = &table.cells()[row];
        let row_styles = &styles[row];
        let columns = || {
            widths.iter().scan(left, |x, width| {
                let start = *x;
                *x += width;
                Some((start, *width))
            })
        };
        let out = self.page();

        // backgrounds first so neighbouring fills never cover text or grid
        for ((x, width), style) in columns().zip(row_styles) {
            if let Some(color) = style.background {
                fill_color(out, color);
                let _ = writeln!(out, "{x:.2} {bottom:.2} {width:.2} {height:.2} re f");
            }
        }
        for (((x, width), style), cell) in columns().zip(row_styles).zip(cells) {
            let font = Font::for_style(style);
            let fitted = fit_text(cell, font, font_size, width - 2.0 * CELL_PADDING_X);
            let text_w = text_width(&fitted, font, font_size);
            let text_x = match style.align {
                Alignment::Left => x + CELL_PADDING_X,
                Alignment::Center => x + (width - text_w) / 2.0,
                Alignment::Right => x + width - CELL_PADDING_X - text_w,
            };
            let baseline = bottom + style.bottom_padding + DESCENT * font_size;
            show_text(out, text_x, baseline, &fitted, font, font_size, style.text_color);
        }
        for ((x, width), style) in columns().zip(row_styles) {
            if let Some((line_width, color)) = style.grid {
                if line_width <= 0.0 {
                    continue;
                }
                stroke_color(out, color);
                let _ = writeln!(
                    out,
                    "{line_width:.2} w {x:.2} {bottom:.2} {width:.2} {height:.2} re S"
                );
            }
        }
        self.cursor = bottom;
    }

    fn finish(mut self) -> Vec<String> {
        let total = self.pages.len();
        let baseline = (self.margin / 2.0).max(FOOTER_SIZE);
        for (idx, page) in self.pages.iter_mut().enumerate() {
            let label = format!("Page {} of {}", idx + 1, total);
            let x = (self.width - text_width(&label, Font::Regular, FOOTER_SIZE)) / 2.0;
            show_text(page, x, baseline, &label, Font::Regular, FOOTER_SIZE, Color::BLACK);
        }
        self.pages
    }
}

/// Serializes numbered objects and the cross-reference table.
struct PdfWriter {
    buffer: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buffer,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, body: &str) {
        self.offsets.push(self.buffer.len());
        let id = self.offsets.len();
        self.buffer
            .extend_from_slice(format!("{id} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    fn stream(&mut self, content: &str) {
        let body = format!(
            "<< /Length {} >>\nstream\n{content}endstream",
            content.len()
        );
        self.object(&body);
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.buffer.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            let _ = writeln!(xref, "{offset:010} 00000 n ");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            self.offsets.len() + 1
        );
        self.buffer.extend_from_slice(xref.as_bytes());
        self.buffer
    }
}

const FIRST_PAGE_OBJECT: usize = 5;

/// Lays out `report` and returns the complete PDF file contents.
/// A serialized report together with the number of pages laid out.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

pub fn render_pdf(report: &Report, config: &ReportConfig) -> RenderedPdf {
    let mut layout = PageLayout::new(config);
    for element in report.elements() {
        match element {
            Element::Title(text) => layout.title(text),
            Element::Heading(text) => layout.heading(text),
            Element::Table(table) => layout.table(table),
        }
    }
    let (width, height) = (layout.width, layout.height);
    let pages = layout.finish();

    let kids = (0..pages.len())
        .map(|idx| format!("{} 0 R", FIRST_PAGE_OBJECT + 2 * idx))
        .collect::<Vec<_>>()
        .join(" ");

    let mut writer = PdfWriter::new();
    writer.object("<< /Type /Catalog /Pages 2 0 R >>");
    writer.object(&format!(
        "<< /Type /Pages /Kids [{kids}] /Count {} >>",
        pages.len()
    ));
    writer.object(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );
    writer.object(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    );
    for (idx, content) in pages.iter().enumerate() {
        let content_id = FIRST_PAGE_OBJECT + 2 * idx + 1;
        writer.object(&format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {width:.2} {height:.2}] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {content_id} 0 R >>"
        ));
        writer.stream(content);
    }
    RenderedPdf {
        bytes: writer.finish(),
        pages: pages.len(),
    }
}

/// Renders and writes the report, returning the page count.
pub fn write_report(report: &Report, config: &ReportConfig, path: &Path) -> Result<usize> {
    config.ensure_valid().context("Invalid report config")?;
    let rendered = render_pdf(report, config);
    fs::write(path, &rendered.bytes).with_context(|| format!("Writing PDF report {path:?}"))?;
    debug!(
        "Wrote {} byte(s), {} page(s) to {:?}",
        rendered.bytes.len(),
        rendered.pages,
        path
    );
    Ok(rendered.pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compare::compare, data::Value, dataset::Dataset, report::build_report};

    fn report_for(rows: usize, changed: &[usize]) -> Report {
        report_with_labels(rows, changed, |idx| format!("row {idx}"))
    }

    fn report_with_labels(
        rows: usize,
        changed: &[usize],
        label: impl Fn(usize) -> String,
    ) -> Report {
        let control_rows = (0..rows)
            .map(|idx| vec![Value::Integer(idx as i64), Value::text(label(idx))])
            .collect::<Vec<_>>();
        let test_rows = control_rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                if changed.contains(&idx) {
                    vec![Value::Integer(-1), row[1].clone()]
                } else {
                    row.clone()
                }
            })
            .collect::<Vec<_>>();
        let control = Dataset::from_rows(&["id", "label"], control_rows).unwrap();
        let test = Dataset::from_rows(&["id", "label"], test_rows).unwrap();
        let comparison = compare(&control, &test).unwrap();
        build_report(
            &control,
            &comparison.matrix,
            &comparison.records,
            &ReportConfig::default(),
        )
    }

    fn as_text(pdf: &[u8]) -> String {
        String::from_utf8_lossy(pdf).into_owned()
    }

    #[test]
    fn render_pdf_produces_well_formed_envelope() {
        let rendered = render_pdf(&report_for(2, &[1]), &ReportConfig::default());
        let pdf = rendered.bytes;
        let text = as_text(&pdf);
        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
        assert!(text.contains("(Comparison Report) Tj"));
        assert!(text.contains("(Mismatched Values) Tj"));
        assert!(text.contains("(Page 1 of 1) Tj"));
        assert_eq!(rendered.pages, 1);

        let startxref = text.rfind("startxref\n").unwrap() + "startxref\n".len();
        let offset: usize = text[startxref..].lines().next().unwrap().parse().unwrap();
        assert!(pdf[offset..].starts_with(b"xref\n"));
    }

    #[test]
    fn long_tables_paginate_and_repeat_header() {
        let rendered = render_pdf(&report_for(200, &[]), &ReportConfig::default());
        let text = as_text(&rendered.bytes);
        let pages = rendered.pages;
        assert!(pages > 1, "expected several pages, got {pages}");
        assert_eq!(text.matches("(label) Tj").count(), pages);
        assert!(text.contains(&format!("(Page {pages} of {pages}) Tj")));
    }

    #[test]
    fn highlight_color_appears_only_with_mismatches() {
        let highlight = "0.941 0.502 0.502 rg";
        let clean = as_text(&render_pdf(&report_for(3, &[]), &ReportConfig::default()).bytes);
        assert!(!clean.contains(highlight));
        let dirty = as_text(&render_pdf(&report_for(3, &[2]), &ReportConfig::default()).bytes);
        assert!(dirty.contains(highlight));
    }

    #[test]
    fn page_count_ignores_cell_text_that_looks_like_page_objects() {
        let report = report_with_labels(3, &[], |_| "/Type /Page /Parent".to_string());
        let rendered = render_pdf(&report, &ReportConfig::default());
        assert_eq!(rendered.pages, 1);
        assert!(as_text(&rendered.bytes).contains("(Page 1 of 1) Tj"));
    }

    #[test]
    fn write_report_rejects_non_finite_layout_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let config = ReportConfig {
            font_size: f32::INFINITY,
            ..ReportConfig::default()
        };
        let err = write_report(&report_for(1, &[]), &config, &path).unwrap_err();
        assert!(format!("{err:#}").contains("font_size"), "{err:#}");
        assert!(!path.exists());
    }

    #[test]
    fn escape_text_handles_delimiters_and_latin1() {
        assert_eq!(escape_text("a(b)\\c"), "a\\(b\\)\\\\c");
        assert_eq!(escape_text("café"), "caf\\351");
        assert_eq!(escape_text("€"), "\\200");
        assert_eq!(escape_text("日本"), "??");
        assert_eq!(escape_text("line\nbreak"), "line break");
    }

    #[test]
    fn fit_text_truncates_with_ellipsis() {
        assert_eq!(fit_text("short", Font::Regular, 10.0, 200.0), "short");
        let fitted = fit_text("a rather long cell value", Font::Regular, 10.0, 50.0);
        assert!(fitted.ends_with(ELLIPSIS));
        assert!(text_width(&fitted, Font::Regular, 10.0) <= 50.0);
        assert_eq!(fit_text("anything", Font::Regular, 10.0, 1.0), "");
    }

    #[test]
    fn text_width_uses_font_metrics() {
        assert_eq!(text_width("i", Font::Regular, 10.0), 2.22);
        assert!(text_width("W", Font::Bold, 10.0) > text_width("i", Font::Bold, 10.0));
    }
}
