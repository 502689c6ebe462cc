//! In-memory tabular containers
//!
//! [`Sheet`] is the raw, possibly ragged grid produced by the spreadsheet
//! reader. [`RecordSet`] is the rectangular, named-column table every layout
//! extracts into and every report consumes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::utils::parse_decimal_br;

/// A single spreadsheet cell
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Number(Decimal),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Empty cells and whitespace-only text count as missing
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Int(_) | Cell::Number(_))
    }

    /// Text form of the cell; empty cells become an empty string
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Number(d) => d.normalize().to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Trimmed text form
    pub fn trimmed(&self) -> String {
        self.as_text().trim().to_string()
    }

    /// Numeric value, parsing text with Brazilian conventions. `None` when
    /// the cell is empty or cannot be converted.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Cell::Int(i) => Some(Decimal::from(*i)),
            Cell::Number(d) => Some(*d),
            Cell::Text(s) => parse_decimal_br(s),
            _ => None,
        }
    }

    /// Numeric value with missing/unparseable cells read as zero
    pub fn decimal_or_zero(&self) -> Decimal {
        self.to_decimal().unwrap_or(Decimal::ZERO)
    }

    /// Integer value (fraction truncated); `None` when not numeric
    pub fn to_i64(&self) -> Option<i64> {
        use rust_decimal::prelude::ToPrimitive;
        match self {
            Cell::Int(i) => Some(*i),
            other => other.to_decimal().and_then(|d| d.trunc().to_i64()),
        }
    }

    /// Converts a numeric value into a cell, `None` becoming [`Cell::Empty`]
    pub fn from_decimal(value: Option<Decimal>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
            other => write!(f, "{}", other.as_text()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Number(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

/// Raw spreadsheet grid
///
/// The first spreadsheet row is promoted to `header`, mirroring a default
/// spreadsheet read. Row widths may differ: decorative rows, group markers
/// and data rows rarely share a populated-cell count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub header: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(header: Vec<Cell>, rows: Vec<Vec<Cell>>) -> Self {
        Self { header, rows }
    }

    /// Build from a full grid, promoting its first row to the header
    pub fn from_grid(mut grid: Vec<Vec<Cell>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }
        let header = grid.remove(0);
        Self { header, rows: grid }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row (header included)
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }

    /// Cell at (row, col); out-of-range positions read as empty
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Header names as trimmed text
    pub fn header_names(&self) -> Vec<String> {
        self.header.iter().map(Cell::trimmed).collect()
    }

    /// First `n` rows, keeping the header
    pub fn head(&self, n: usize) -> Sheet {
        Sheet {
            header: self.header.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Non-empty cells of a row joined by spaces
    pub fn row_text(&self, row: usize) -> String {
        self.rows
            .get(row)
            .map(|cells| {
                cells
                    .iter()
                    .filter(|c| !matches!(c, Cell::Empty))
                    .map(Cell::as_text)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }
}

/// Cell at `idx` of a row; positions past the end read as empty
pub fn cell_at(row: &[Cell], idx: usize) -> &Cell {
    static EMPTY: Cell = Cell::Empty;
    row.get(idx).unwrap_or(&EMPTY)
}

/// Rectangular table with named columns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, Cell::Empty);
                r
            })
            .collect();
        Self { columns, rows }
    }

    /// Interpret a raw sheet's header as column names (blank headers become `ColN`)
    pub fn from_sheet(sheet: &Sheet) -> Self {
        let width = sheet.width();
        let columns = (0..width)
            .map(|j| {
                let name = sheet.header.get(j).map(Cell::trimmed).unwrap_or_default();
                if name.is_empty() {
                    format!("Col{}", j)
                } else {
                    name
                }
            })
            .collect();
        Self::with_rows(columns, sheet.rows.clone())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Value of a named column in a row; missing columns read as empty
    pub fn get(&self, row: usize, column: &str) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.column_index(column)
            .and_then(|idx| self.rows.get(row).and_then(|r| r.get(idx)))
            .unwrap_or(&EMPTY)
    }

    /// All cells of a named column (empty when the column is absent)
    pub fn column(&self, name: &str) -> Vec<&Cell> {
        match self.column_index(name) {
            Some(idx) => self.rows.iter().map(|r| cell_at(r, idx)).collect(),
            None => Vec::new(),
        }
    }

    /// Sum of a numeric column, skipping empty/unparseable cells
    pub fn sum(&self, column: &str) -> Decimal {
        self.column(column)
            .into_iter()
            .filter_map(Cell::to_decimal)
            .sum()
    }

    /// Count of distinct non-empty values in a column
    pub fn n_unique(&self, column: &str) -> usize {
        self.column(column)
            .into_iter()
            .filter(|c| !c.is_empty())
            .map(Cell::as_text)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Distinct non-empty text values of a column, sorted
    pub fn distinct(&self, column: &str) -> BTreeSet<String> {
        self.column(column)
            .into_iter()
            .filter(|c| !c.is_empty())
            .map(Cell::to_string)
            .collect()
    }

    /// Row indexes per distinct non-empty value of `column`, in first-seen order
    pub fn group_rows(&self, column: &str) -> Vec<(String, Vec<usize>)> {
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (row, cell) in self.column(column).into_iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let key = cell.to_string();
            match positions.get(&key) {
                Some(&pos) => groups[pos].1.push(row),
                None => {
                    positions.insert(key.clone(), groups.len());
                    groups.push((key, vec![row]));
                }
            }
        }
        groups
    }

    /// Occurrences per distinct non-empty value, most frequent first
    /// (ties keep first-seen order)
    pub fn value_counts(&self, column: &str) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .group_rows(column)
            .into_iter()
            .map(|(key, rows)| (key, rows.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// Sum of `column` over the given rows
    pub fn sum_rows(&self, column: &str, rows: &[usize]) -> Decimal {
        rows.iter()
            .filter_map(|&row| self.get(row, column).to_decimal())
            .sum()
    }

    /// Copy of the first `n` rows
    pub fn head(&self, n: usize) -> RecordSet {
        RecordSet {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Filtered copy keeping the rows accepted by `keep`
    pub fn filter_rows<F>(&self, mut keep: F) -> RecordSet
    where
        F: FnMut(&[Cell]) -> bool,
    {
        RecordSet {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| keep(r.as_slice()))
                .cloned()
                .collect(),
        }
    }

    /// Copy restricted to (and ordered by) the given columns; unknown names are skipped
    pub fn select(&self, columns: &[&str]) -> RecordSet {
        let picked: Vec<(String, usize)> = columns
            .iter()
            .filter_map(|name| self.column_index(name).map(|idx| (name.to_string(), idx)))
            .collect();
        RecordSet {
            columns: picked.iter().map(|(name, _)| name.clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| picked.iter().map(|(_, idx)| r[*idx].clone()).collect())
                .collect(),
        }
    }

    /// Rename a column in place; returns false when it does not exist
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Vertical concatenation over the union of columns, in first-seen order
    pub fn concat(sets: &[&RecordSet]) -> RecordSet {
        let mut columns: Vec<String> = Vec::new();
        for set in sets {
            for col in &set.columns {
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }
        let mut out = RecordSet::new(columns.clone());
        for set in sets {
            for row_idx in 0..set.len() {
                let row = columns
                    .iter()
                    .map(|c| set.get(row_idx, c).clone())
                    .collect();
                out.rows.push(row);
            }
        }
        out
    }
}
