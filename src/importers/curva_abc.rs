//! Sales curve per store ("Curva ABC por Loja")
//!
//! The export opens with a few decorative rows; the real column header sits
//! at a fixed offset. Products are listed in blocks, each introduced by a
//! `Loja:` marker row carrying the store code and name.

use anyhow::Result;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::{clean_cell, column_names, first_column, numeric_cell, NO_DATA};
use crate::table::{Cell, RecordSet, Sheet};
use crate::utils::{
    fold_accents, format_currency, format_decimal_br, format_integer, parse_decimal_br,
    starts_with_digit,
};

/// Data row holding the real header
pub const HEADER_OFFSET: usize = 4;
pub const STORE_MARKER: &str = "Loja:";
pub const CODE_COLUMN: &str = "Código";
pub const PRODUCT_COLUMN: &str = "Produto";
pub const QUANTITY_COLUMN: &str = "Qtd";
pub const TOTAL_COLUMN: &str = "Total R$";
pub const STORE_CODE_COLUMN: &str = "Loja_Codigo";
pub const STORE_NAME_COLUMN: &str = "Loja_Nome";

/// Position of the quantity column when the header does not name it
pub const QUANTITY_POSITION: usize = 4;

const NUMERIC_COLUMNS: [&str; 4] = [CODE_COLUMN, QUANTITY_COLUMN, TOTAL_COLUMN, STORE_CODE_COLUMN];
const RECOGNITION_ROWS: usize = 10;

const PREVIEW_COLUMNS: [(&str, usize); 5] = [
    (CODE_COLUMN, 8),
    (PRODUCT_COLUMN, 55),
    (QUANTITY_COLUMN, 15),
    (TOTAL_COLUMN, 18),
    (STORE_NAME_COLUMN, 15),
];

pub fn recognize(sample: &Sheet) -> Result<bool> {
    let cells = first_column(sample, RECOGNITION_ROWS)?;
    let folded: Vec<String> = cells.iter().map(|c| fold_accents(c)).collect();
    let has_code = folded.iter().any(|c| c.contains("codigo"));
    let has_store = folded.iter().any(|c| c.contains("loja:"));
    Ok(has_code && has_store)
}

/// Store currently in effect while scanning rows
#[derive(Debug, Clone, Default, PartialEq)]
struct StoreContext {
    code: Cell,
    name: Cell,
}

impl StoreContext {
    /// New context when `row` is a `Loja:` marker row
    fn from_marker(row: &[Cell]) -> Option<Self> {
        let first = row.first()?.as_text();
        if !first.contains(STORE_MARKER) {
            return None;
        }
        let cell = |idx: usize| row.get(idx).map(clean_cell).unwrap_or(Cell::Empty);
        Some(Self {
            code: cell(1),
            name: cell(2),
        })
    }
}

/// Product rows start with a number
fn is_product_row(row: &[Cell]) -> bool {
    let Some(first) = row.first() else {
        return false;
    };
    let text = first.trimmed();
    starts_with_digit(&text) && parse_decimal_br(&text).is_some()
}

pub fn extract(raw: &Sheet) -> RecordSet {
    let Some(header) = raw.rows.get(HEADER_OFFSET) else {
        debug!("Sales curve sheet too short for header at row {}", HEADER_OFFSET);
        return RecordSet::default();
    };
    if header.iter().all(Cell::is_empty) {
        debug!("Sales curve header row {} is blank", HEADER_OFFSET);
        return RecordSet::default();
    }

    let body = &raw.rows[HEADER_OFFSET + 1..];
    let width = body
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    let mut columns = column_names(header, width);
    columns.push(STORE_CODE_COLUMN.to_string());
    columns.push(STORE_NAME_COLUMN.to_string());

    let (_, rows) = body.iter().fold(
        (StoreContext::default(), Vec::new()),
        |(store, mut rows), row| {
            if let Some(next) = StoreContext::from_marker(row) {
                return (next, rows);
            }
            if is_product_row(row) {
                let mut cells: Vec<Cell> = (0..width)
                    .map(|j| row.get(j).map(clean_cell).unwrap_or(Cell::Empty))
                    .collect();
                cells.push(store.code.clone());
                cells.push(store.name.clone());
                rows.push(cells);
            }
            (store, rows)
        },
    );

    let mut records = RecordSet::with_rows(columns, rows);
    for name in NUMERIC_COLUMNS {
        if let Some(idx) = records.column_index(name) {
            for row in records.rows.iter_mut() {
                row[idx] = numeric_cell(&row[idx]);
            }
        }
    }

    info!("Sales curve extracted: {} products", records.len());
    records
}

pub fn summary(data: &RecordSet) -> String {
    if data.is_empty() {
        return NO_DATA.to_string();
    }

    let mut lines = Vec::new();
    lines.push(format!(
        "📦 Total de produtos únicos: {}",
        data.n_unique(CODE_COLUMN)
    ));
    lines.push(format!("🏪 Total de lojas: {}", data.n_unique(STORE_NAME_COLUMN)));
    lines.push(format!(
        "📊 Quantidade total: {}",
        format_decimal_br(data.sum(QUANTITY_COLUMN), 3)
    ));
    lines.push(format!(
        "💰 Faturamento total: {}",
        format_currency(data.sum(TOTAL_COLUMN))
    ));
    lines.push(String::new());
    lines.push("=".repeat(95));
    lines.push(String::new());
    lines.push("🏢 LOJAS (faturamento e quantidade):".to_string());
    lines.push(String::new());
    lines.push(format!("{:<35} {:>20} {:>25}", "LOJA", "QUANTIDADE", "FATURAMENTO"));
    lines.push("-".repeat(85));

    let mut stores: Vec<(String, Decimal, Decimal)> = data
        .group_rows(STORE_NAME_COLUMN)
        .into_iter()
        .map(|(store, rows)| {
            (
                store,
                data.sum_rows(QUANTITY_COLUMN, &rows),
                data.sum_rows(TOTAL_COLUMN, &rows),
            )
        })
        .collect();
    stores.sort_by(|a, b| b.2.cmp(&a.2));

    for (store, quantity, total) in stores {
        lines.push(format!(
            "{:<35} {:>20} {:>25}",
            store.trim(),
            format_decimal_br(quantity, 3),
            format_currency(total)
        ));
    }

    lines.join("\n")
}

/// Cut text longer than `width - 2` characters, appending `..`
fn clip(text: &str, width: usize) -> String {
    let limit = width.saturating_sub(2);
    if text.chars().count() > limit {
        let mut out: String = text.chars().take(limit).collect();
        out.push_str("..");
        out
    } else {
        text.to_string()
    }
}

fn preview_value(column: &str, cell: &Cell, width: usize) -> String {
    match (column, cell.to_decimal()) {
        (CODE_COLUMN, Some(value)) => format_integer(value),
        (QUANTITY_COLUMN, Some(value)) => format_decimal_br(value, 3),
        (TOTAL_COLUMN, Some(value)) => format_currency(value),
        (CODE_COLUMN | QUANTITY_COLUMN | TOTAL_COLUMN, None) => String::new(),
        _ => clip(&cell.to_string(), width),
    }
}

pub fn preview(data: &RecordSet, rows: usize) -> String {
    if data.is_empty() {
        return NO_DATA.to_string();
    }

    let mut lines = vec![
        "=".repeat(120),
        format!("PRIMEIRAS {} LINHAS:", rows),
        "=".repeat(120),
        String::new(),
    ];

    let header: String = PREVIEW_COLUMNS
        .iter()
        .map(|(name, width)| format!("{:^width$} ", name, width = *width))
        .collect();
    let rule = "-".repeat(header.chars().count());
    lines.push(header);
    lines.push(rule);

    for row in 0..data.len().min(rows) {
        let line: String = PREVIEW_COLUMNS
            .iter()
            .map(|(name, width)| {
                let text = preview_value(name, data.get(row, name), *width);
                format!("{:^width$} ", text, width = *width)
            })
            .collect();
        lines.push(line);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn t(s: &str) -> Cell {
        Cell::from(s)
    }

    /// Export as read: first spreadsheet row is the header, the real header at data row 4
    fn curve_sheet() -> Sheet {
        Sheet::new(
            vec![t("CURVA ABC POR LOJA")],
            vec![
                vec![t("Empresa: COMCARNE")],
                vec![t("Período: 01/03/2025 a 31/03/2025")],
                vec![],
                vec![t("Emitido em 01/04/2025")],
                vec![t("Código"), t("Produto"), t("Unid"), t("Curva"), t("Qtd"), t("Total R$")],
                vec![t("Loja:"), Cell::Int(1), t("CALHAU")],
                vec![Cell::Int(123), t("PICANHA BOVINA KG "), t("KG"), t("A"), t("10,5"), t("1.050,00")],
                vec![Cell::Int(456), t("ALCATRA"), t("KG"), t("B"), Cell::Int(3), Cell::Number(dec!(90))],
                vec![t("Total da loja"), t(""), t(""), t(""), t("13,5"), t("1.140,00")],
                vec![t("Loja:"), Cell::Int(2), t("TURU")],
                vec![t("123"), t("PICANHA BOVINA KG"), t("KG"), t("A"), t("2"), t("200")],
                vec![],
            ],
        )
    }

    #[test]
    fn test_recognize_curve() {
        assert!(recognize(&curve_sheet()).unwrap());
    }

    #[test]
    fn test_recognize_requires_both_tokens() {
        let sheet = Sheet::new(vec![t("X")], vec![vec![t("Código")], vec![t("Produto")]]);
        assert!(!recognize(&sheet).unwrap());
    }

    #[test]
    fn test_extract_stamps_store_and_drops_markers() {
        let data = extract(&curve_sheet());
        assert_eq!(data.len(), 3);
        assert_eq!(
            data.columns,
            vec!["Código", "Produto", "Unid", "Curva", "Qtd", "Total R$", "Loja_Codigo", "Loja_Nome"]
        );
        assert_eq!(data.get(0, STORE_NAME_COLUMN), &t("CALHAU"));
        assert_eq!(data.get(1, STORE_NAME_COLUMN), &t("CALHAU"));
        assert_eq!(data.get(2, STORE_NAME_COLUMN), &t("TURU"));
        assert_eq!(data.get(2, STORE_CODE_COLUMN), &Cell::Number(dec!(2)));
        assert_eq!(data.get(0, PRODUCT_COLUMN), &t("PICANHA BOVINA KG"));
    }

    #[test]
    fn test_extract_converts_numbers() {
        let data = extract(&curve_sheet());
        assert_eq!(data.get(0, QUANTITY_COLUMN), &Cell::Number(dec!(10.5)));
        assert_eq!(data.get(0, TOTAL_COLUMN), &Cell::Number(dec!(1050)));
        assert_eq!(data.get(2, CODE_COLUMN), &Cell::Number(dec!(123)));
    }

    #[test]
    fn test_extract_short_sheet_is_empty() {
        let sheet = Sheet::new(vec![t("Código")], vec![vec![t("Loja:")]]);
        assert!(extract(&sheet).is_empty());
    }

    #[test]
    fn test_summary_lists_stores_by_revenue() {
        let text = summary(&extract(&curve_sheet()));
        assert!(text.contains("📦 Total de produtos únicos: 2"));
        assert!(text.contains("🏪 Total de lojas: 2"));
        assert!(text.contains("📊 Quantidade total: 15,500"));
        assert!(text.contains("💰 Faturamento total: R$ 1.340,00"));
        let calhau = text.find("CALHAU").unwrap();
        let turu = text.find("TURU").unwrap();
        assert!(calhau < turu);
        assert_eq!(summary(&RecordSet::default()), NO_DATA);
    }

    #[test]
    fn test_preview_layout() {
        let text = preview(&extract(&curve_sheet()), 2);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "PRIMEIRAS 2 LINHAS:");
        assert!(lines[4].starts_with(" Código  "));
        assert_eq!(lines[5].chars().count(), lines[4].chars().count());
        assert!(lines[6].contains("R$ 1.050,00"));
        assert!(lines[6].contains("10,500"));
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_clip_long_names() {
        assert_eq!(clip("PICANHA BOVINA", 10), "PICANHA ..");
        assert_eq!(clip("ALCATRA", 10), "ALCATRA");
    }
}
