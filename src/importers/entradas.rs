//! Inbound goods per group ("Entradas por Grupo", SGE export)
//!
//! Products are listed under `Categoria:` marker rows that carry the
//! category and group of every product row below them. Buyers are resolved
//! from the group name after the scan.

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

use super::{clean_cell, code_value, first_column, numeric_cell, NO_DATA};
use crate::buyers::{ProductBuyerMap, UNMAPPED_BUYER};
use crate::table::{cell_at, Cell, RecordSet, Sheet};
use crate::utils::{format_decimal_br, starts_with_digit, truncate_with};

pub const TITLE: &str = "entradas produtos por grupo";
pub const CATEGORY_MARKER: &str = "Categoria:";

pub const CODE_COLUMN: &str = "Codigo";
pub const PRODUCT_COLUMN: &str = "Produto";
pub const PIECES_COLUMN: &str = "Peças";
pub const QUANTITY_COLUMN: &str = "Qtd";
pub const UNIT_COLUMN: &str = "Unid";
pub const AVERAGE_COST_COLUMN: &str = "Custo Md";
pub const TOTAL_COLUMN: &str = "Total";
pub const SALE_PRICE_COLUMN: &str = "Pr. Vda";
pub const MARKUP_COLUMN: &str = "Markup";
pub const MARGIN_COLUMN: &str = "Margem";
pub const LAST_ENTRY_COLUMN: &str = "Ult.Ent.";
pub const EXTRA_COLUMN: &str = "Col11";
pub const CATEGORY_CODE_COLUMN: &str = "Codigo Categoria";
pub const CATEGORY_COLUMN: &str = "Categoria";
pub const GROUP_CODE_COLUMN: &str = "Codigo Grupo";
pub const GROUP_COLUMN: &str = "Grupo";
pub const BUYER_COLUMN: &str = "Comprador";

/// Output schema (the extra column is appended only when it carries data)
pub const COLUMNS: [&str; 16] = [
    CODE_COLUMN,
    PRODUCT_COLUMN,
    CATEGORY_COLUMN,
    GROUP_COLUMN,
    BUYER_COLUMN,
    QUANTITY_COLUMN,
    UNIT_COLUMN,
    AVERAGE_COST_COLUMN,
    TOTAL_COLUMN,
    SALE_PRICE_COLUMN,
    MARKUP_COLUMN,
    MARGIN_COLUMN,
    LAST_ENTRY_COLUMN,
    PIECES_COLUMN,
    CATEGORY_CODE_COLUMN,
    GROUP_CODE_COLUMN,
];

/// Position of the optional twelfth column on product rows
const EXTRA_POSITION: usize = 11;
const GROUP_INDEX: usize = 3;
const BUYER_INDEX: usize = 4;
const RECOGNITION_ROWS: usize = 5;

const PREVIEW_COLUMNS: [(&str, &str, usize); 7] = [
    (CODE_COLUMN, "Código", 8),
    (PRODUCT_COLUMN, "Produto", 45),
    (QUANTITY_COLUMN, "Qtd", 10),
    (TOTAL_COLUMN, "Total", 15),
    (LAST_ENTRY_COLUMN, "Últ.Ent.", 12),
    (GROUP_COLUMN, "Grupo", 25),
    (BUYER_COLUMN, "Comprador", 15),
];

pub fn recognize(sample: &Sheet) -> Result<bool> {
    let mut cells = first_column(sample, RECOGNITION_ROWS)?;
    if let Some(title) = sample.header.first() {
        cells.push(title.trimmed());
    }
    Ok(cells.iter().any(|c| c.to_lowercase().contains(TITLE)))
}

/// Category and group in effect while scanning rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupContext {
    pub category_code: String,
    pub category_name: String,
    pub group_code: String,
    pub group_name: String,
}

impl GroupContext {
    /// Context after `row`: replaced on `Categoria:` marker rows, unchanged otherwise.
    ///
    /// Category fields need at least 3 columns in the sheet, group fields at
    /// least 6; narrower sheets keep the previous values.
    pub fn advance(&self, row: &[Cell], sheet_width: usize) -> GroupContext {
        let first = row.first().map(Cell::trimmed).unwrap_or_default();
        if !first.contains(CATEGORY_MARKER) {
            return self.clone();
        }

        let text = |idx: usize| row.get(idx).map(Cell::trimmed).unwrap_or_default();
        let code = |idx: usize| text(idx).trim_start_matches('0').to_string();

        let mut next = self.clone();
        if sheet_width > 2 {
            next.category_code = code(1);
            next.category_name = text(2);
        }
        if sheet_width > 5 {
            next.group_code = code(4);
            next.group_name = text(5);
        }
        debug!(
            "Categoria {}-{}, Grupo {}-{}",
            next.category_code, next.category_name, next.group_code, next.group_name
        );
        next
    }
}

/// Date of last entry: `dd/mm/yy` first, then other common renderings
fn entry_date(cell: &Cell) -> Cell {
    if let Cell::Date(_) = cell {
        return cell.clone();
    }
    let text = cell.trimmed();
    ["%d/%m/%y", "%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
        .map(Cell::Date)
        .unwrap_or(Cell::Empty)
}

fn is_category_marker(row: &[Cell]) -> bool {
    row.first()
        .map(|c| c.trimmed().contains(CATEGORY_MARKER))
        .unwrap_or(false)
}

fn is_product_row(row: &[Cell]) -> bool {
    row.first()
        .map(|c| !c.is_empty() && starts_with_digit(&c.trimmed()))
        .unwrap_or(false)
}

/// Output row with an empty buyer, filled once the scan is over
fn product_row(row: &[Cell], context: &GroupContext) -> Vec<Cell> {
    let raw = |idx: usize| row.get(idx).map(clean_cell).unwrap_or(Cell::Empty);
    vec![
        Cell::Int(code_value(&raw(0))),
        raw(1),
        Cell::from(context.category_name.as_str()),
        Cell::from(context.group_name.as_str()),
        Cell::Empty,
        numeric_cell(&raw(3)),
        raw(4),
        numeric_cell(&raw(5)),
        numeric_cell(&raw(6)),
        numeric_cell(&raw(7)),
        numeric_cell(&raw(8)),
        numeric_cell(&raw(9)),
        entry_date(&raw(10)),
        numeric_cell(&raw(2)),
        Cell::Int(code_value(&Cell::from(context.category_code.as_str()))),
        Cell::Int(code_value(&Cell::from(context.group_code.as_str()))),
        raw(EXTRA_POSITION),
    ]
}

pub fn extract(raw: &Sheet, buyers: &ProductBuyerMap) -> RecordSet {
    let sheet_width = raw.width();

    let (_, mut rows) = raw.rows.iter().fold(
        (GroupContext::default(), Vec::new()),
        |(context, mut rows), row| {
            if is_category_marker(row) {
                return (context.advance(row, sheet_width), rows);
            }
            if is_product_row(row) {
                rows.push(product_row(row, &context));
            }
            (context, rows)
        },
    );
    debug!("Inbound goods scan found {} product rows", rows.len());
    if rows.is_empty() {
        return RecordSet::default();
    }

    for row in rows.iter_mut() {
        row[BUYER_INDEX] = Cell::text(buyers.buyer_for(&row[GROUP_INDEX].trimmed()));
    }

    let has_extra = rows.iter().any(|r| !r[COLUMNS.len()].is_empty());
    let mut columns: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    if has_extra {
        columns.push(EXTRA_COLUMN.to_string());
    } else {
        for row in rows.iter_mut() {
            row.truncate(COLUMNS.len());
        }
    }
    rows.retain(|r| r[0] != Cell::Int(0));

    let records = RecordSet::with_rows(columns, rows);
    info!("Inbound goods extracted: {} products", records.len());
    records
}

fn br(value: rust_decimal::Decimal) -> String {
    format_decimal_br(value, 2)
}

/// Groups of `column` ordered by product count (desc), then name
fn ranked_groups(data: &RecordSet, column: &str) -> Vec<(String, Vec<usize>)> {
    let mut groups = data.group_rows(column);
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    groups
}

pub fn summary(data: &RecordSet) -> String {
    if data.is_empty() {
        return NO_DATA.to_string();
    }

    let mut lines = vec![
        "📊 RESUMO GERAL".to_string(),
        "-".repeat(90),
        format!("📦 Total de produtos: {}", data.len()),
        format!("📦 Produtos únicos: {}", data.n_unique(CODE_COLUMN)),
        format!("📊 Quantidade total: {}", br(data.sum(QUANTITY_COLUMN))),
        format!("💰 Valor total: R$ {}", br(data.sum(TOTAL_COLUMN))),
    ];

    lines.push("\n📁 POR CATEGORIA".to_string());
    lines.push("-".repeat(90));
    let mut categories = data.group_rows(CATEGORY_COLUMN);
    categories.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    for (category, rows) in categories {
        lines.push(format!(
            "  {:<30} {:>6} produtos  R$ {:>15}",
            category,
            rows.len(),
            br(data.sum_rows(TOTAL_COLUMN, &rows))
        ));
    }

    lines.push("\n📁 POR GRUPO".to_string());
    lines.push("-".repeat(90));
    for (group, rows) in ranked_groups(data, GROUP_COLUMN) {
        let name: String = group.chars().take(35).collect();
        lines.push(format!(
            "  {:<35} {:>6} produtos  R$ {:>15}",
            name,
            rows.len(),
            br(data.sum_rows(TOTAL_COLUMN, &rows))
        ));
    }

    lines.push("\n👤 POR COMPRADOR".to_string());
    lines.push("-".repeat(90));
    for (buyer, rows) in ranked_groups(data, BUYER_COLUMN) {
        if buyer == UNMAPPED_BUYER {
            continue;
        }
        lines.push(format!(
            "  {:<20} {:>6} produtos  R$ {:>15}",
            buyer,
            rows.len(),
            br(data.sum_rows(TOTAL_COLUMN, &rows))
        ));
    }

    let unmapped = data.filter_rows(|row| {
        data.column_index(BUYER_COLUMN)
            .map(|idx| cell_at(row, idx).trimmed() == UNMAPPED_BUYER)
            .unwrap_or(false)
    });
    if !unmapped.is_empty() {
        lines.push("\n⚠️ GRUPOS NÃO MAPEADOS:".to_string());
        for (group, rows) in unmapped.group_rows(GROUP_COLUMN) {
            lines.push(format!(
                "  - {}: {} produtos (R$ {})",
                group,
                rows.len(),
                br(unmapped.sum_rows(TOTAL_COLUMN, &rows))
            ));
        }
    }

    lines.join("\n")
}

fn preview_value(column: &str, cell: &Cell, width: usize) -> String {
    match column {
        QUANTITY_COLUMN | TOTAL_COLUMN => br(cell.decimal_or_zero()),
        PRODUCT_COLUMN => truncate_with(&cell.to_string(), width, "..."),
        _ => cell.to_string(),
    }
}

pub fn preview(data: &RecordSet, rows: usize) -> String {
    if data.is_empty() {
        return NO_DATA.to_string();
    }

    let columns: Vec<(&str, &str, usize)> = PREVIEW_COLUMNS
        .iter()
        .copied()
        .filter(|(name, _, _)| data.has_column(name))
        .collect();

    let header: String = columns
        .iter()
        .map(|(_, label, width)| format!("{:<width$} ", label, width = *width))
        .collect();
    let mut lines = vec![header.clone(), "-".repeat(header.chars().count())];

    for row in 0..data.len().min(rows) {
        let line: String = columns
            .iter()
            .map(|(name, _, width)| {
                let text = preview_value(name, data.get(row, name), *width);
                format!("{:<width$} ", text, width = *width)
            })
            .collect();
        lines.push(line);
    }

    lines.join("\n")
}
