//! Office Open XML workbook (`.xlsx`) reading.
//!
//! Only the first worksheet is read. Cells come back as typed [`Value`]s on a
//! grid anchored at `A1`:
//!
//! - numbers become integers when the stored text is integral, floats
//!   otherwise, and dates or datetimes when their number format is a date or
//!   time format (1900 and 1904 date systems),
//! - shared, inline and formula strings become text,
//! - booleans become booleans and error codes such as `#DIV/0!` stay text,
//! - cells without a value are empty.
//!
//! Formulas are not evaluated; the cached value written by the spreadsheet
//! application is used.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use zip::{ZipArchive, result::ZipError};

use crate::data::{Value, parse_naive_date, parse_naive_datetime};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];
const SECONDS_PER_DAY: f64 = 86_400.0;
/// Serial number of 9999-12-31 in the 1900 date system.
const LAST_SERIAL: f64 = 2_958_466.0;

pub fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

/// Cells of the first worksheet, row-major from `A1`.
///
/// Rows and columns past the last non-empty cell are not materialized, so
/// rows can be shorter than the widest one and rows without any value are
/// empty vectors.
pub fn read_first_sheet(path: &Path) -> Result<Vec<Vec<Value>>> {
    let file = File::open(path).with_context(|| format!("Opening workbook {path:?}"))?;
    read_workbook(BufReader::new(file)).with_context(|| format!("Reading workbook {path:?}"))
}

pub fn read_workbook<R: Read + Seek>(reader: R) -> Result<Vec<Vec<Value>>> {
    let mut archive = ZipArchive::new(reader).context("Opening workbook archive")?;

    let workbook = read_part(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| anyhow!("Workbook has no xl/workbook.xml part"))?;
    let info = parse_workbook(&workbook)?;
    if !info.has_sheet {
        bail!("Workbook does not contain any worksheet");
    }
    let relationships = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
        Some(bytes) => parse_relationships(&bytes)?,
        None => HashMap::new(),
    };
    let target = info
        .first_sheet_rel
        .as_ref()
        .and_then(|id| relationships.get(id))
        .map(|target| normalize_target(target))
        .unwrap_or_else(|| "xl/worksheets/sheet1.xml".to_string());

    let shared_strings = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(bytes) => parse_shared_strings(&bytes)?,
        None => Vec::new(),
    };
    let date_styles = match read_part(&mut archive, "xl/styles.xml")? {
        Some(bytes) => parse_date_styles(&bytes)?,
        None => Vec::new(),
    };
    let sheet = read_part(&mut archive, &target)?
        .ok_or_else(|| anyhow!("Workbook has no worksheet part {target}"))?;

    let context = CellContext {
        shared_strings: &shared_strings,
        date_styles: &date_styles,
        date1904: info.date1904,
    };
    parse_sheet(&sheet, &context).with_context(|| format!("Parsing worksheet {target}"))
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("Opening workbook part {name}")),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .with_context(|| format!("Reading workbook part {name}"))?;
    Ok(Some(bytes))
}

#[derive(Debug, Default)]
struct WorkbookInfo {
    has_sheet: bool,
    first_sheet_rel: Option<String>,
    date1904: bool,
}

fn parse_workbook(xml: &[u8]) -> Result<WorkbookInfo> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut info = WorkbookInfo::default();

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("Parsing xl/workbook.xml")?
        {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    info.date1904 = attribute(&e, b"date1904")?
                        .is_some_and(|flag| flag == "1" || flag.eq_ignore_ascii_case("true"));
                }
                b"sheet" if !info.has_sheet => {
                    info.has_sheet = true;
                    info.first_sheet_rel = attribute(&e, b"id")?;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(info)
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut map = HashMap::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("Parsing workbook relationships")?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    map.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(map)
}

fn normalize_target(target: &str) -> String {
    let trimmed = target.trim_start_matches('/');
    if trimmed.starts_with("xl/") {
        trimmed.to_string()
    } else {
        format!("xl/{trimmed}")
    }
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_phonetic = false;

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("Parsing xl/sharedStrings.xml")?
        {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => current.push_str(&read_element_text(&mut reader, &e)?),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// One flag per `cellXfs` entry: whether cells using that style hold dates.
fn parse_date_styles(xml: &[u8]) -> Result<Vec<bool>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut custom_formats: HashMap<u32, bool> = HashMap::new();
    let mut style_formats = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("Parsing xl/styles.xml")?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"numFmt" => {
                let id = attribute(&e, b"numFmtId")?.and_then(|id| id.parse::<u32>().ok());
                let code = attribute(&e, b"formatCode")?;
                if let (Some(id), Some(code)) = (id, code) {
                    custom_formats.insert(id, is_date_format(&code));
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Start(e) | Event::Empty(e)
                if in_cell_xfs && e.local_name().as_ref() == b"xf" =>
            {
                let format = attribute(&e, b"numFmtId")?
                    .and_then(|id| id.parse::<u32>().ok())
                    .unwrap_or(0);
                style_formats.push(format);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(style_formats
        .into_iter()
        .map(|id| {
            custom_formats
                .get(&id)
                .copied()
                .unwrap_or_else(|| is_builtin_date_format(id))
        })
        .collect())
}

fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// Whether a number format code renders dates or times.
///
/// Quoted literals, escaped characters and bracketed sections such as colors
/// or locales are skipped; `[h]`, `[mm]` and `[ss]` elapsed-time sections count.
fn is_date_format(code: &str) -> bool {
    let mut chars = code.chars();
    let mut in_quotes = false;
    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let section = chars.by_ref().take_while(|c| *c != ']').collect::<String>();
                if !section.is_empty()
                    && section
                        .chars()
                        .all(|c| matches!(c.to_ascii_lowercase(), 'h' | 'm' | 's'))
                {
                    return true;
                }
            }
            _ if matches!(ch.to_ascii_lowercase(), 'd' | 'm' | 'y' | 'h' | 's') => return true,
            _ => {}
        }
    }
    false
}

struct CellContext<'a> {
    shared_strings: &'a [String],
    date_styles: &'a [bool],
    date1904: bool,
}

impl CellContext<'_> {
    fn is_date_style(&self, style: usize) -> bool {
        self.date_styles.get(style).copied().unwrap_or(false)
    }
}

struct CellHeader {
    row: usize,
    col: usize,
    kind: Option<String>,
    style: usize,
}

impl CellHeader {
    fn read(element: &BytesStart<'_>, row: usize, next_col: usize) -> Result<Self> {
        let (row, col) = match attribute(element, b"r")? {
            Some(reference) => cell_position(&reference)
                .ok_or_else(|| anyhow!("Invalid cell reference '{reference}'"))?,
            None => (row, next_col),
        };
        let style = attribute(element, b"s")?
            .and_then(|style| style.parse::<usize>().ok())
            .unwrap_or(0);
        Ok(Self {
            row,
            col,
            kind: attribute(element, b"t")?,
            style,
        })
    }

    fn reference(&self) -> String {
        format!("{}{}", column_name(self.col), self.row + 1)
    }
}

fn parse_sheet(xml: &[u8], context: &CellContext<'_>) -> Result<Vec<Vec<Value>>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut grid: Vec<Vec<Value>> = Vec::new();
    let mut row = 0usize;
    let mut next_row = 0usize;
    let mut next_col = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                row = match attribute(&e, b"r")? {
                    Some(number) => number
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .ok_or_else(|| anyhow!("Invalid row number '{number}'"))?,
                    None => next_row,
                };
                next_row = row + 1;
                next_col = 0;
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let cell = CellHeader::read(&e, row, next_col)?;
                next_col = cell.col + 1;
                let value = read_cell_value(&mut reader, &cell, context)
                    .with_context(|| format!("Reading cell {}", cell.reference()))?;
                place(&mut grid, cell.row, cell.col, value);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                next_col = CellHeader::read(&e, row, next_col)?.col + 1;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(grid)
}

fn place(grid: &mut Vec<Vec<Value>>, row: usize, col: usize, value: Value) {
    if value.is_empty() {
        return;
    }
    if grid.len() <= row {
        grid.resize_with(row + 1, Vec::new);
    }
    let cells = &mut grid[row];
    if cells.len() <= col {
        cells.resize(col + 1, Value::Empty);
    }
    cells[col] = value;
}

fn read_cell_value(
    reader: &mut Reader<&[u8]>,
    cell: &CellHeader,
    context: &CellContext<'_>,
) -> Result<Value> {
    let mut buf = Vec::new();
    let mut stored: Option<String> = None;
    let mut inline: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"v" => {
                stored = Some(read_element_text(reader, &e)?);
            }
            Event::Start(e) if e.local_name().as_ref() == b"is" => {
                inline = Some(read_inline_string(reader)?);
            }
            Event::End(e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => bail!("Worksheet ended inside the cell"),
            _ => {}
        }
        buf.clear();
    }

    if let Some(text) = inline {
        return Ok(text_value(text));
    }
    match stored {
        Some(raw) => convert_cell(&raw, cell, context),
        None => Ok(Value::Empty),
    }
}

fn read_inline_string(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_phonetic = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => text.push_str(&read_element_text(reader, &e)?),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"rPh" => in_phonetic = false,
                b"is" => break,
                _ => {}
            },
            Event::Eof => bail!("Worksheet ended inside an inline string"),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

fn convert_cell(raw: &str, cell: &CellHeader, context: &CellContext<'_>) -> Result<Value> {
    match cell.kind.as_deref() {
        Some("s") => {
            let idx = raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid shared string index '{raw}'"))?;
            let text = context
                .shared_strings
                .get(idx)
                .ok_or_else(|| anyhow!("Shared string {idx} does not exist"))?;
            Ok(text_value(text.clone()))
        }
        Some("str") | Some("inlineStr") => Ok(text_value(raw.to_string())),
        Some("b") => match raw.trim() {
            "1" => Ok(Value::Boolean(true)),
            "0" => Ok(Value::Boolean(false)),
            other => bail!("Invalid boolean '{other}'"),
        },
        Some("e") => Ok(Value::Text(raw.trim().to_string())),
        Some("d") => Ok(iso_date_value(raw.trim())),
        _ => number_value(
            raw.trim(),
            context.is_date_style(cell.style),
            context.date1904,
        ),
    }
}

fn text_value(text: String) -> Value {
    if text.is_empty() {
        Value::Empty
    } else {
        Value::Text(text)
    }
}

fn iso_date_value(raw: &str) -> Value {
    if let Ok(datetime) = parse_naive_datetime(raw) {
        return Value::DateTime(datetime);
    }
    if let Ok(date) = parse_naive_date(raw) {
        return Value::Date(date);
    }
    Value::Text(raw.to_string())
}

fn number_value(raw: &str, date_style: bool, date1904: bool) -> Result<Value> {
    if !date_style && let Ok(integer) = raw.parse::<i64>() {
        return Ok(Value::Integer(integer));
    }
    let number = raw
        .parse::<f64>()
        .with_context(|| format!("Invalid number '{raw}'"))?;
    if date_style && let Some(value) = serial_to_date(number, date1904) {
        return Ok(value);
    }
    Ok(Value::Float(number))
}

/// Converts a spreadsheet serial day number into a date, or a datetime when
/// it carries a time of day.
fn serial_to_date(serial: f64, date1904: bool) -> Option<Value> {
    if !(0.0..LAST_SERIAL).contains(&serial) {
        return None;
    }
    let (epoch, serial) = if date1904 {
        (NaiveDate::from_ymd_opt(1904, 1, 1)?, serial)
    } else if (1.0..60.0).contains(&serial) {
        // serial 60 is the fictitious 1900-02-29; earlier serials run one day behind
        (NaiveDate::from_ymd_opt(1899, 12, 31)?, serial)
    } else {
        (NaiveDate::from_ymd_opt(1899, 12, 30)?, serial)
    };
    let seconds = (serial * SECONDS_PER_DAY).round() as i64;
    let days = seconds.div_euclid(86_400);
    let time_of_day = seconds.rem_euclid(86_400);
    let date = epoch.checked_add_signed(TimeDelta::try_days(days)?)?;
    if time_of_day == 0 {
        return Some(Value::Date(date));
    }
    let time = NaiveTime::from_num_seconds_from_midnight_opt(u32::try_from(time_of_day).ok()?, 0)?;
    Some(Value::DateTime(date.and_time(time)))
}

fn read_element_text(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<String> {
    let raw = reader
        .read_text(start.name())
        .context("Reading XML text")?;
    let text = quick_xml::escape::unescape(&raw).context("Unescaping XML text")?;
    Ok(text.into_owned())
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.context("Parsing XML attribute")?;
        if attr.key.local_name().as_ref() == name {
            let value = attr
                .unescape_value()
                .context("Unescaping XML attribute")?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Zero-based `(row, column)` of an `A1`-style reference.
fn cell_position(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters.bytes().try_fold(0usize, |acc, b| {
        acc.checked_mul(26)?
            .checked_add(usize::from(b.to_ascii_uppercase() - b'A') + 1)
    })?;
    let row = digits.parse::<usize>().ok()?.checked_sub(1)?;
    Some((row, col - 1))
}

fn column_name(col: usize) -> String {
    let mut name = Vec::new();
    let mut remaining = col + 1;
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        name.push(b'A' + rem as u8);
        remaining = (remaining - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}
