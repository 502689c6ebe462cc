//! Spreadsheet export
//!
//! Writes a record set as a single flat worksheet: a header row followed by
//! one row per record, columns in record-set order.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use std::path::Path;
use tracing::info;

use crate::table::{Cell, RecordSet};

/// `Relatorio_<base>_<YYYYmmdd_HHMMSS>.xlsx`
pub fn default_file_name(base: &str, now: NaiveDateTime) -> String {
    format!("Relatorio_{}_{}.xlsx", base, now.format("%Y%m%d_%H%M%S"))
}

pub fn write_xlsx(data: &RecordSet, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    fill_worksheet(worksheet, data).context("Failed to build worksheet")?;
    workbook
        .save(path)
        .with_context(|| format!("Failed to write {:?}", path))?;
    info!("Exported {} rows to {:?}", data.len(), path);
    Ok(())
}

fn fill_worksheet(worksheet: &mut Worksheet, data: &RecordSet) -> std::result::Result<(), XlsxError> {
    for (col, name) in data.columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }
    for (idx, row) in data.rows.iter().enumerate() {
        let row_num = (idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet.write_string(row_num, col, s)?;
                }
                Cell::Int(i) => {
                    worksheet.write_number(row_num, col, *i as f64)?;
                }
                Cell::Number(d) => {
                    worksheet.write_number(row_num, col, d.to_f64().unwrap_or(0.0))?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
                Cell::Date(_) => {
                    worksheet.write_string(row_num, col, cell.to_string())?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::read_sheet;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[test]
    fn test_default_file_name() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 1)
            .unwrap();
        assert_eq!(
            default_file_name("Ruptura", now),
            "Relatorio_Ruptura_20240307_090501.xlsx"
        );
    }

    #[test]
    fn test_written_workbook_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        let data = RecordSet::with_rows(
            vec!["CÓDIGO".into(), "PRODUTO".into(), "ESTQ LOJA".into(), "Preço".into()],
            vec![vec![
                Cell::Int(123),
                Cell::text("PICANHA"),
                Cell::Number(dec!(2.5)),
                Cell::Empty,
            ]],
        );
        write_xlsx(&data, &path).unwrap();

        let sheet = read_sheet(&path).unwrap();
        assert_eq!(sheet.header_names(), vec!["CÓDIGO", "PRODUTO", "ESTQ LOJA", "Preço"]);
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.cell(0, 1), &Cell::text("PICANHA"));
        assert_eq!(sheet.cell(0, 2).to_decimal(), Some(dec!(2.5)));
    }
}
