// Import module - spreadsheet reader, layout detection and per-layout extraction

pub mod curva_abc;
pub mod entradas;
pub mod estoque;
pub mod file_detector;
pub mod reader;

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt;

use crate::buyers::ProductBuyerMap;
use crate::table::{Cell, RecordSet, Sheet};

pub use file_detector::{detect, detect_file, layout_by_name, list_layouts};
pub use reader::{read_sample, read_sheet};

/// Text shown by summaries and previews of an empty extraction
pub const NO_DATA: &str = "Nenhum dado processado";

/// Known spreadsheet layouts, in detection priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LayoutKind {
    /// Sales per product, grouped under "Loja:" marker rows
    CurvaAbc,
    /// Inbound goods per category/group (SGE export)
    Entradas,
    /// Stock levels per product and store
    Estoque,
}

impl LayoutKind {
    /// Detection order: most specific signatures first
    pub const ALL: [LayoutKind; 3] = [LayoutKind::CurvaAbc, LayoutKind::Entradas, LayoutKind::Estoque];

    pub fn name(&self) -> &'static str {
        match self {
            LayoutKind::CurvaAbc => "Curva ABC por Loja",
            LayoutKind::Entradas => "Entradas por Grupo",
            LayoutKind::Estoque => "Estoque",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LayoutKind::CurvaAbc => "Vendas por loja com cabeçalho na linha 4",
            LayoutKind::Entradas => "Entradas de produtos agrupadas por categoria e grupo",
            LayoutKind::Estoque => "Estoque de produtos por loja",
        }
    }

    /// Whether `sample` looks like this layout. Errors mean "could not tell".
    pub fn recognize(&self, sample: &Sheet) -> Result<bool> {
        match self {
            LayoutKind::CurvaAbc => curva_abc::recognize(sample),
            LayoutKind::Entradas => entradas::recognize(sample),
            LayoutKind::Estoque => estoque::recognize(sample),
        }
    }

    /// Normalized records; empty when the sheet carries no usable data
    pub fn extract(&self, raw: &Sheet, buyers: &ProductBuyerMap) -> RecordSet {
        match self {
            LayoutKind::CurvaAbc => curva_abc::extract(raw),
            LayoutKind::Entradas => entradas::extract(raw, buyers),
            LayoutKind::Estoque => estoque::extract(raw),
        }
    }

    pub fn summary(&self, data: &RecordSet) -> String {
        match self {
            LayoutKind::CurvaAbc => curva_abc::summary(data),
            LayoutKind::Entradas => entradas::summary(data),
            LayoutKind::Estoque => estoque::summary(data),
        }
    }

    pub fn preview(&self, data: &RecordSet, rows: usize) -> String {
        match self {
            LayoutKind::CurvaAbc => curva_abc::preview(data, rows),
            LayoutKind::Entradas => entradas::preview(data, rows),
            LayoutKind::Estoque => estoque::preview(data, rows),
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trimmed text of the first `n` cells of the first column, header excluded
pub(crate) fn first_column(sample: &Sheet, n: usize) -> Result<Vec<String>> {
    if sample.width() == 0 {
        return Err(anyhow!("sample has no columns"));
    }
    Ok(sample
        .rows
        .iter()
        .take(n)
        .map(|row| row.first().map(Cell::trimmed).unwrap_or_default())
        .collect())
}

/// Locale-aware numeric conversion; unparseable cells become empty
pub(crate) fn numeric_cell(cell: &Cell) -> Cell {
    Cell::from_decimal(cell.to_decimal())
}

/// Integer code of a cell, zero when it cannot be read as a number
pub(crate) fn code_value(cell: &Cell) -> i64 {
    cell.to_i64().unwrap_or(0)
}

/// Text cells trimmed (blank ones emptied); other cells untouched
pub(crate) fn clean_cell(cell: &Cell) -> Cell {
    match cell {
        Cell::Text(s) => Cell::from(s.trim()),
        other => other.clone(),
    }
}

/// Column names from a header row; blank names become `ColN`
pub(crate) fn column_names(header: &[Cell], width: usize) -> Vec<String> {
    (0..width)
        .map(|j| {
            let name = header.get(j).map(Cell::trimmed).unwrap_or_default();
            if name.is_empty() {
                format!("Col{}", j)
            } else {
                name
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_layout_names_and_order() {
        let names: Vec<&str> = LayoutKind::ALL.iter().map(LayoutKind::name).collect();
        assert_eq!(names, vec!["Curva ABC por Loja", "Entradas por Grupo", "Estoque"]);
        assert_eq!(LayoutKind::Estoque.to_string(), "Estoque");
    }

    #[test]
    fn test_first_column_rejects_empty_sample() {
        assert!(first_column(&Sheet::default(), 10).is_err());
    }

    #[test]
    fn test_cell_helpers() {
        assert_eq!(numeric_cell(&Cell::text("1.234,5")), Cell::Number(dec!(1234.5)));
        assert_eq!(numeric_cell(&Cell::text("TOTAL")), Cell::Empty);
        assert_eq!(code_value(&Cell::text("00123")), 123);
        assert_eq!(code_value(&Cell::text("abc")), 0);
        assert_eq!(clean_cell(&Cell::text("  CARNES ")), Cell::text("CARNES"));
        assert_eq!(clean_cell(&Cell::text("   ")), Cell::Empty);
        assert_eq!(
            column_names(&[Cell::text("Código"), Cell::Empty], 3),
            vec!["Código", "Col1", "Col2"]
        );
    }
}
