//! Report document model and builder.
//!
//! A [`Report`] is an ordered list of [`Element`]s ready for a paginated
//! renderer. Tables carry their cell text plus an ordered list of
//! [`StyleCommand`]s; commands are applied in sequence, so a later command
//! covering a cell overrides an earlier one. [`StyledTable::cell_style`]
//! resolves the effective style of a single cell by folding the commands in
//! that order.
//!
//! [`build_report`] renders the control dataset as the primary table, flags
//! mismatched cells with a highlight background added after the table-wide
//! rules, and appends the mismatch summary when there is anything to list.

use crate::{
    compare::{MismatchMatrix, MismatchRecord},
    config::{Color, ReportConfig},
    dataset::Dataset,
};

pub const SUMMARY_HEADERS: [&str; 4] = ["Row", "Column", "Control Value", "Test Value"];

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    elements: Vec<Element>,
}

impl Report {
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn tables(&self) -> impl Iterator<Item = &StyledTable> {
        self.elements.iter().filter_map(|element| match element {
            Element::Table(table) => Some(table),
            _ => None,
        })
    }

    pub fn primary_table(&self) -> Option<&StyledTable> {
        self.tables().next()
    }

    pub fn summary_table(&self) -> Option<&StyledTable> {
        self.tables().nth(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Title(String),
    Heading(String),
    Table(StyledTable),
}

/// Selects rows or columns of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    All,
    From(usize),
    Only(usize),
}

impl Span {
    pub fn contains(&self, index: usize) -> bool {
        match *self {
            Span::All => true,
            Span::From(start) => index >= start,
            Span::Only(only) => index == only,
        }
    }

    fn indices(&self, len: usize) -> std::ops::Range<usize> {
        match *self {
            Span::All => 0..len,
            Span::From(start) => start.min(len)..len,
            Span::Only(only) if only < len => only..only + 1,
            Span::Only(_) => 0..0,
        }
    }
}

/// Rectangular area of a table, addressed with the header as row 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellArea {
    pub rows: Span,
    pub columns: Span,
}

impl CellArea {
    pub const HEADER: CellArea = CellArea {
        rows: Span::Only(0),
        columns: Span::All,
    };
    pub const BODY: CellArea = CellArea {
        rows: Span::From(1),
        columns: Span::All,
    };
    pub const ALL: CellArea = CellArea {
        rows: Span::All,
        columns: Span::All,
    };

    pub fn cell(row: usize, column: usize) -> Self {
        Self {
            rows: Span::Only(row),
            columns: Span::Only(column),
        }
    }

    pub fn contains(&self, row: usize, column: usize) -> bool {
        self.rows.contains(row) && self.columns.contains(column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleRule {
    Background(Color),
    TextColor(Color),
    Bold,
    Align(Alignment),
    BottomPadding(f32),
    Grid { width: f32, color: Color },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleCommand {
    pub area: CellArea,
    pub rule: StyleRule,
}

/// Effective style of one cell after every command has been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellStyle {
    pub background: Option<Color>,
    pub text_color: Color,
    pub bold: bool,
    pub align: Alignment,
    pub bottom_padding: f32,
    pub grid: Option<(f32, Color)>,
}

impl CellStyle {
    fn apply(&mut self, rule: StyleRule) {
        match rule {
            StyleRule::Background(color) => self.background = Some(color),
            StyleRule::TextColor(color) => self.text_color = color,
            StyleRule::Bold => self.bold = true,
            StyleRule::Align(align) => self.align = align,
            StyleRule::BottomPadding(padding) => self.bottom_padding = padding,
            StyleRule::Grid { width, color } => self.grid = Some((width, color)),
        }
    }
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            background: None,
            text_color: Color::BLACK,
            bold: false,
            align: Alignment::Left,
            bottom_padding: DEFAULT_BOTTOM_PADDING,
            grid: None,
        }
    }
}

pub const DEFAULT_BOTTOM_PADDING: f32 = 3.0;

/// A grid of display strings whose first row is the header.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledTable {
    cells: Vec<Vec<String>>,
    commands: Vec<StyleCommand>,
}

impl StyledTable {
    pub fn new(header: Vec<String>, body: Vec<Vec<String>>) -> Self {
        let mut cells = Vec::with_capacity(body.len() + 1);
        cells.push(header);
        cells.extend(body);
        Self {
            cells,
            commands: Vec::new(),
        }
    }

    pub fn push_style(&mut self, area: CellArea, rule: StyleRule) {
        self.commands.push(StyleCommand { area, rule });
    }

    pub fn cells(&self) -> &[Vec<String>] {
        &self.cells
    }

    pub fn header(&self) -> &[String] {
        &self.cells[0]
    }

    pub fn body(&self) -> &[Vec<String>] {
        &self.cells[1..]
    }

    pub fn column_count(&self) -> usize {
        self.cells[0].len()
    }

    pub fn commands(&self) -> &[StyleCommand] {
        &self.commands
    }

    pub fn cell_style(&self, row: usize, column: usize) -> CellStyle {
        self.commands
            .iter()
            .filter(|command| command.area.contains(row, column))
            .fold(CellStyle::default(), |mut style, command| {
                style.apply(command.rule);
                style
            })
    }

    /// Styles for every cell, row by row. Cost is proportional to the area
    /// each command covers rather than commands times cells.
    pub fn resolved_styles(&self) -> Vec<Vec<CellStyle>> {
        let row_count = self.cells.len();
        let column_count = self.column_count();
        let mut styles = vec![vec![CellStyle::default(); column_count]; row_count];
        for command in &self.commands {
            for row in command.area.rows.indices(row_count) {
                for column in command.area.columns.indices(column_count) {
                    styles[row][column].apply(command.rule);
                }
            }
        }
        styles
    }
}

pub fn build_report(
    control: &Dataset,
    matrix: &MismatchMatrix,
    records: &[MismatchRecord],
    config: &ReportConfig,
) -> Report {
    let mut elements = vec![Element::Title(config.title.clone())];

    let body: Vec<Vec<String>> = control
        .rows()
        .iter()
        .map(|row| row.iter().map(|value| value.as_display()).collect())
        .collect();
    let mut primary = StyledTable::new(control.columns().to_vec(), body);
    apply_base_style(&mut primary, config);
    for (row, flags) in matrix.rows().enumerate() {
        for (column, _) in flags.iter().enumerate().filter(|(_, flag)| **flag) {
            primary.push_style(
                CellArea::cell(row + 1, column),
                StyleRule::Background(config.mismatch_background),
            );
        }
    }
    elements.push(Element::Table(primary));

    if !records.is_empty() {
        elements.push(Element::Heading(config.summary_heading.clone()));
        let header: Vec<String> = SUMMARY_HEADERS.iter().map(|h| h.to_string()).collect();
        let body: Vec<Vec<String>> = records
            .iter()
            .map(|record| {
                vec![
                    record.row.to_string(),
                    record.column.clone(),
                    record.control.as_display(),
                    record.test.as_display(),
                ]
            })
            .collect();
        let mut summary = StyledTable::new(header, body);
        apply_base_style(&mut summary, config);
        elements.push(Element::Table(summary));
    }

    Report { elements }
}

fn apply_base_style(table: &mut StyledTable, config: &ReportConfig) {
    table.push_style(
        CellArea::HEADER,
        StyleRule::Background(config.header_background),
    );
    table.push_style(CellArea::HEADER, StyleRule::TextColor(config.header_text));
    table.push_style(CellArea::ALL, StyleRule::Align(Alignment::Center));
    table.push_style(CellArea::HEADER, StyleRule::Bold);
    table.push_style(
        CellArea::HEADER,
        StyleRule::BottomPadding(config.header_bottom_padding),
    );
    table.push_style(CellArea::BODY, StyleRule::Background(config.body_background));
    table.push_style(
        CellArea::ALL,
        StyleRule::Grid {
            width: config.grid_width,
            color: config.grid_color,
        },
    );
}
