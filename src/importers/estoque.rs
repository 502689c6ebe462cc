//! Stock per product and store ("Estoque")
//!
//! Exports come either with the header on the first row or with a few
//! title rows above it. Header names vary across ERP versions, so they are
//! canonicalized through substring synonyms.

use anyhow::Result;
use tracing::{debug, info, warn};

use super::{clean_cell, code_value, column_names, NO_DATA};
use crate::table::{Cell, RecordSet, Sheet};
use crate::utils::{format_decimal_br, render_table, starts_with_digit};

pub const CODE_COLUMN: &str = "Codigo";
pub const DESCRIPTION_COLUMN: &str = "Descricao";
pub const STORE_STOCK_COLUMN: &str = "Estoque_Loja";
pub const TOTAL_STOCK_COLUMN: &str = "Estoque_Geral";
pub const CATEGORY_COLUMN: &str = "Categoria";
pub const GROUP_COLUMN: &str = "Grupo";
pub const SUBGROUP_COLUMN: &str = "Sub_Grupo";
pub const SUPPLIER_COLUMN: &str = "Fornecedor_Razao";
pub const STORE_COLUMN: &str = "Loja";

const CODE_TOKENS: [&str; 3] = ["Código", "CODIGO", "codigo"];
const STORE_STOCK_TOKEN: &str = "Estoque Loja";
const TOTAL_STOCK_TOKEN: &str = "Estoque Geral";
const HEADER_SCAN_ROWS: usize = 30;
const TOP_N: usize = 10;

/// Header substring → canonical column name, checked in order
const SYNONYMS: [(&[&str], &str); 19] = [
    (&["Código", "CODIGO"], CODE_COLUMN),
    (&["Descrição"], DESCRIPTION_COLUMN),
    (&["Abreviação"], "Abreviacao"),
    (&[STORE_STOCK_TOKEN], STORE_STOCK_COLUMN),
    (&[TOTAL_STOCK_TOKEN], TOTAL_STOCK_COLUMN),
    (&["Unid"], "Unid"),
    (&["Marca"], "Marca"),
    (&["Modelo"], "Modelo"),
    (&["NCM"], "NCM"),
    (&["Referência"], "Referencia"),
    (&["Classificação"], "Classificacao"),
    (&["Categoria"], CATEGORY_COLUMN),
    (&["Grupo"], GROUP_COLUMN),
    (&["Sub-grupo"], SUBGROUP_COLUMN),
    (&["Fornec/Razão Social"], SUPPLIER_COLUMN),
    (&["Fornec/Nome Fantasia"], "Fornecedor_Fantasia"),
    (&["Linha"], "Linha"),
    (&["Especie", "Espécie"], "Especie"),
    (&["LOJA", "Loja"], STORE_COLUMN),
];

const PREVIEW_COLUMNS: [&str; 7] = [
    CODE_COLUMN,
    DESCRIPTION_COLUMN,
    STORE_STOCK_COLUMN,
    TOTAL_STOCK_COLUMN,
    CATEGORY_COLUMN,
    GROUP_COLUMN,
    STORE_COLUMN,
];

fn has_code_token(text: &str) -> bool {
    CODE_TOKENS.iter().any(|token| text.contains(token))
}

/// A header row names the code column and both stock columns
fn is_header_text(text: &str) -> bool {
    has_code_token(text) && text.contains(STORE_STOCK_TOKEN) && text.contains(TOTAL_STOCK_TOKEN)
}

/// Canonical name for a raw header
pub fn canonical_column(raw: &str) -> String {
    let name = raw.trim();
    SYNONYMS
        .iter()
        .find(|(tokens, _)| tokens.iter().any(|t| name.contains(t)))
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| name.replace([' ', '/'], "_"))
}

fn header_row(raw: &Sheet) -> Option<usize> {
    (0..raw.len().min(HEADER_SCAN_ROWS)).find(|&row| is_header_text(&raw.row_text(row)))
}

pub fn recognize(sample: &Sheet) -> Result<bool> {
    let headers = sample.header_names();
    let has_code = headers.iter().any(|h| has_code_token(h));
    let has_store_stock = headers.iter().any(|h| h.contains(STORE_STOCK_TOKEN));
    let has_total_stock = headers.iter().any(|h| h.contains(TOTAL_STOCK_TOKEN));
    if has_code && has_store_stock && has_total_stock {
        debug!("Stock headers found on first row");
        return Ok(true);
    }
    Ok(header_row(sample).is_some())
}

/// Rows whose first cell looks like a product code
fn starts_with_code(row: &[Cell]) -> bool {
    match row.first() {
        Some(cell) if cell.is_numeric() => true,
        Some(cell) => starts_with_digit(&cell.trimmed()),
        None => false,
    }
}

pub fn extract(raw: &Sheet) -> RecordSet {
    let width = raw.width();
    let has_header = raw.header_names().iter().any(|h| has_code_token(h));

    let (columns, body): (Vec<String>, Vec<&Vec<Cell>>) = if has_header {
        (column_names(&raw.header, width), raw.rows.iter().collect())
    } else {
        let Some(idx) = header_row(raw) else {
            warn!("Stock header row not found in the first {} rows", HEADER_SCAN_ROWS);
            return RecordSet::default();
        };
        debug!("Stock header found at row {}", idx);
        let body = raw.rows[idx + 1..]
            .iter()
            .filter(|row| starts_with_code(row))
            .collect();
        (column_names(&raw.rows[idx], width), body)
    };

    let columns: Vec<String> = columns.iter().map(|c| canonical_column(c)).collect();
    debug!("Stock columns: {:?}", columns);

    let code_idx = columns.iter().position(|c| c == CODE_COLUMN);
    let stock_idx: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| *c == STORE_STOCK_COLUMN || *c == TOTAL_STOCK_COLUMN)
        .map(|(j, _)| j)
        .collect();

    let rows: Vec<Vec<Cell>> = body
        .into_iter()
        .map(|row| {
            let mut cells: Vec<Cell> = (0..width)
                .map(|j| row.get(j).map(clean_cell).unwrap_or(Cell::Empty))
                .collect();
            if let Some(idx) = code_idx {
                cells[idx] = Cell::Int(code_value(&cells[idx]));
            }
            for &idx in &stock_idx {
                cells[idx] = Cell::Number(cells[idx].decimal_or_zero());
            }
            cells
        })
        .filter(|cells| code_idx.map(|idx| cells[idx] != Cell::Int(0)).unwrap_or(true))
        .collect();

    let records = RecordSet::with_rows(columns, rows);
    info!("Stock extracted: {} products", records.len());
    records
}

pub fn summary(data: &RecordSet) -> String {
    if data.is_empty() {
        return NO_DATA.to_string();
    }

    let mut lines = vec![
        "📊 RESUMO DO ESTOQUE".to_string(),
        "-".repeat(60),
        format!("📦 Total de produtos: {}", data.len()),
    ];
    if data.has_column(CODE_COLUMN) {
        lines.push(format!("📦 Produtos únicos: {}", data.n_unique(CODE_COLUMN)));
    }
    if data.has_column(TOTAL_STOCK_COLUMN) {
        lines.push(format!(
            "📊 Estoque Geral: {}",
            format_decimal_br(data.sum(TOTAL_STOCK_COLUMN), 2)
        ));
    }
    if data.has_column(CATEGORY_COLUMN) {
        lines.push("\n📁 Por Categoria:".to_string());
        for (category, count) in data.value_counts(CATEGORY_COLUMN).into_iter().take(TOP_N) {
            lines.push(format!("  {}: {} produtos", category, count));
        }
    }
    if data.has_column(STORE_COLUMN) {
        lines.push("\n🏪 Por Loja:".to_string());
        for (store, count) in data.value_counts(STORE_COLUMN).into_iter().take(TOP_N) {
            lines.push(format!("  {}: {} produtos", store, count));
        }
    }

    lines.join("\n")
}

pub fn preview(data: &RecordSet, rows: usize) -> String {
    if data.is_empty() {
        return NO_DATA.to_string();
    }

    let mut columns: Vec<&str> = PREVIEW_COLUMNS
        .iter()
        .copied()
        .filter(|c| data.has_column(c))
        .collect();
    if columns.is_empty() {
        columns = data.columns.iter().map(String::as_str).collect();
    }

    let view = data.head(rows).select(&columns);
    let body: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|row| row.iter().map(Cell::to_string).collect())
        .collect();
    render_table(&view.columns, &body)
}
