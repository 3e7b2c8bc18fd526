#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::{CompressionMethod, write::FileOptions};

use cellcheck::{Dataset, Value};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a single-sheet `.xlsx` workbook. Cells that parse as numbers are
    /// stored as numbers, empty strings are left out and everything else is
    /// stored as an inline string.
    pub fn write_workbook(&self, name: &str, rows: &[&[&str]]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let file = File::create(&path).expect("create workbook");
        let mut zip = zip::ZipWriter::new(file);
        for (part, body) in workbook_parts(rows) {
            let options =
                FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
            zip.start_file(part, options).expect("start workbook part");
            zip.write_all(body.as_bytes()).expect("write workbook part");
        }
        zip.finish().expect("finish workbook");
        path
    }
}

fn workbook_parts(rows: &[&[&str]]) -> Vec<(&'static str, String)> {
    let sheet_rows = rows
        .iter()
        .enumerate()
        .map(|(row_idx, cells)| {
            let cells = cells
                .iter()
                .enumerate()
                .filter(|(_, value)| !value.is_empty())
                .map(|(col_idx, value)| {
                    let reference = format!("{}{}", (b'A' + col_idx as u8) as char, row_idx + 1);
                    if value.parse::<f64>().is_ok() {
                        format!(r#"<c r="{reference}"><v>{value}</v></c>"#)
                    } else {
                        format!(r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#)
                    }
                })
                .collect::<String>();
            format!(r#"<row r="{}">{cells}</row>"#, row_idx + 1)
        })
        .collect::<String>();

    vec![
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#.to_string(),
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
            ),
        ),
    ]
}

/// The two-row `[A, B]` dataset used throughout the end-to-end scenarios.
pub fn scenario(second_a: i64) -> Dataset {
    Dataset::from_rows(
        &["A", "B"],
        vec![
            vec![Value::Integer(1), Value::text("x")],
            vec![Value::Integer(second_a), Value::text("y")],
        ],
    )
    .expect("scenario dataset")
}

pub fn pdf_text(path: &Path) -> String {
    let bytes = std::fs::read(path).expect("read pdf");
    assert!(bytes.starts_with(b"%PDF-"), "not a PDF: {path:?}");
    String::from_utf8_lossy(&bytes).into_owned()
}
