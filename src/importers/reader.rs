//! Spreadsheet reader
//!
//! Turns the first sheet of an Excel/ODS workbook, or a delimited text file,
//! into a [`Sheet`]. The first spreadsheet row becomes the header, the way a
//! default spreadsheet read behaves; layouts that keep their real header
//! further down work from positional offsets relative to that.

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use encoding_rs::ISO_8859_15;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::RupturaError;
use crate::table::{Cell, Sheet};

/// Supported input file kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Workbook,
    Delimited,
}

fn source_kind(path: &Path) -> Result<SourceKind> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("File has no extension: {:?}", path))?
        .to_lowercase();

    match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceKind::Workbook),
        "csv" | "txt" => Ok(SourceKind::Delimited),
        other => Err(RupturaError::UnsupportedFormat(format!(
            "{}. Supported formats: .xlsx, .xls, .ods, .csv",
            other
        ))
        .into()),
    }
}

/// Read the whole first sheet of `path`
pub fn read_sheet<P: AsRef<Path>>(path: P) -> Result<Sheet> {
    read_limited(path.as_ref(), None)
}

/// Read the header plus at most `rows` data rows of the first sheet
pub fn read_sample<P: AsRef<Path>>(path: P, rows: usize) -> Result<Sheet> {
    read_limited(path.as_ref(), Some(rows))
}

fn read_limited(path: &Path, rows: Option<usize>) -> Result<Sheet> {
    let grid = match source_kind(path)? {
        SourceKind::Workbook => read_workbook_grid(path, rows.map(|n| n + 1))?,
        SourceKind::Delimited => read_delimited_grid(path, rows.map(|n| n + 1))?,
    };
    let sheet = Sheet::from_grid(grid);
    debug!(
        "Read {:?}: {} rows x {} columns",
        path,
        sheet.len(),
        sheet.width()
    );
    Ok(sheet)
}

fn read_workbook_grid(path: &Path, limit: Option<usize>) -> Result<Vec<Vec<Cell>>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {:?}", path))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| RupturaError::EmptyWorkbook(path.display().to_string()))?;

    info!("Reading sheet '{}' from {:?}", sheet_name, path);

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read worksheet '{}'", sheet_name))?;

    // The range starts at the first used cell; pad so positions match the grid.
    let (first_row, first_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let limit = limit.unwrap_or(usize::MAX);
    let mut grid: Vec<Vec<Cell>> = Vec::new();
    for _ in 0..first_row.min(limit) {
        grid.push(Vec::new());
    }
    for row in range.rows() {
        if grid.len() >= limit {
            break;
        }
        let mut cells = vec![Cell::Empty; first_col];
        cells.extend(row.iter().map(cell_from_data));
        grid.push(cells);
    }
    Ok(grid)
}

/// Convert a calamine value into a [`Cell`]
pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Decimal::from_f64(*f)
            .map(Cell::Number)
            .unwrap_or(Cell::Empty),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d")
            .map(Cell::Date)
            .unwrap_or_else(|_| Cell::text(s.clone())),
        Data::DurationIso(s) => Cell::text(s.clone()),
    }
}

/// Excel serial day number (1899-12-30 epoch) to a calendar date
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(chrono::Duration::try_days(serial.floor() as i64)?)
}

fn read_delimited_grid(path: &Path, limit: Option<usize>) -> Result<Vec<Vec<Cell>>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let content = decode_text(&bytes);
    let delimiter = sniff_delimiter(&content);
    debug!("Delimited file {:?} uses '{}'", path, delimiter as char);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let limit = limit.unwrap_or(usize::MAX);
    let mut grid = Vec::new();
    for record in reader.records() {
        if grid.len() >= limit {
            break;
        }
        let record = record.context("Failed to read CSV record")?;
        grid.push(record.iter().map(|field| Cell::from(field.trim())).collect());
    }
    Ok(grid)
}

/// UTF-8 when valid (BOM stripped), otherwise Latin-1 as exported by older ERPs
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (decoded, _, _) = ISO_8859_15.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Pick `;` or `,` from the first line; Brazilian exports favour `;`
fn sniff_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    if commas > semicolons {
        b','
    } else {
        b';'
    }
}
