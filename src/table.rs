//! Plain-text tables for terminal output.
//!
//! Columns are padded to the widest cell; ANSI escape sequences do not count
//! towards the width, so highlighted cells line up with plain ones.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{
    compare::{MismatchMatrix, MismatchRecord},
    dataset::Dataset,
    report::SUMMARY_HEADERS,
};

const HIGHLIGHT_START: &str = "\u{1b}[1;31m";
const HIGHLIGHT_END: &str = "\u{1b}[0m";

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(&sanitize_cell(cell)));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

/// Control values with every mismatched cell wrapped in a red highlight.
pub fn render_highlighted(control: &Dataset, matrix: &MismatchMatrix) -> String {
    let rows = control
        .rows()
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            row.iter()
                .enumerate()
                .map(|(col_idx, value)| {
                    let text = value.as_display();
                    if matrix.is_mismatch(row_idx, col_idx) {
                        format!("{HIGHLIGHT_START}{}{HIGHLIGHT_END}", sanitize_cell(&text))
                    } else {
                        text
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    render_table(control.columns(), &rows)
}

pub fn render_mismatch_summary(records: &[MismatchRecord]) -> String {
    let headers = SUMMARY_HEADERS
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = records
        .iter()
        .map(|record| {
            vec![
                record.row.to_string(),
                record.column.clone(),
                record.control.as_display(),
                record.test.as_display(),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&sanitized));
            format!("{sanitized}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    let trimmed = line.trim_end().len();
    line.truncate(trimmed);
    line
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
