//! Stockout (ruptura) reconciliation
//!
//! Every stock row is joined with the matrix store stock of the same product,
//! the current sales of the sales curve and the historical average sales, then
//! enriched with coverage, status, buyer and stockout columns. The join is
//! left-outer from the stock side: one output row per stock row.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::buyers::{ProductBuyerMap, UNMAPPED_BUYER};
use crate::config::Settings;
use crate::error::{Result, RupturaError};
use crate::importers::{curva_abc, estoque, NO_DATA};
use crate::media_vendas::{self, AverageSalesStore};
use crate::table::{cell_at, Cell, RecordSet};
use crate::utils::{fold_accents, format_decimal_br, is_plain_digits, normalize_code_cell, render_table};

pub const CATEGORY: &str = "CATEGORIA";
pub const GROUP: &str = "GRUPO";
pub const CODE: &str = "CÓDIGO";
pub const PRODUCT: &str = "PRODUTO";
pub const STORE_STOCK: &str = "ESTQ LOJA";
pub const MATRIX_STOCK: &str = "ESTQ MATRIZ";
pub const CURRENT_SALES: &str = "VENDAS MÊS ATUAL";
pub const AVERAGE_SALES: &str = "MÉDIA VENDA MENSAL";
pub const COVERAGE: &str = "DDE";
pub const STORE: &str = "LOJA";
pub const STOCK_STATUS: &str = "STATUS DO ESTOQUE";
pub const SALE_STATUS: &str = "VENDA";
pub const BUYER: &str = "COMPRADOR";
pub const STOCKOUT: &str = "RUPTURA";
pub const STOCK_VALUE: &str = "Valor Estoque";
pub const PRICE: &str = "Preço";
pub const SUBGROUP: &str = "Subgrupo";
pub const SUPPLIER: &str = "Forn";

/// Report schema, in export order
pub const COLUMNS: [&str; 18] = [
    CATEGORY,
    GROUP,
    CODE,
    PRODUCT,
    STORE_STOCK,
    MATRIX_STOCK,
    CURRENT_SALES,
    AVERAGE_SALES,
    COVERAGE,
    STORE,
    STOCK_STATUS,
    SALE_STATUS,
    BUYER,
    STOCKOUT,
    STOCK_VALUE,
    PRICE,
    SUBGROUP,
    SUPPLIER,
];

/// Columns rendered with two decimals in previews
const NUMERIC_COLUMNS: [&str; 4] = [STORE_STOCK, MATRIX_STOCK, CURRENT_SALES, AVERAGE_SALES];

pub const STOCKOUT_LABEL: &str = "RUPTURA";
pub const OK_LABEL: &str = "OK";
pub const SALES_LABEL: &str = "VENDA";
pub const NO_SALES_LABEL: &str = "SEM VENDA";

const DAYS_PER_MONTH: i64 = 30;
const TOP_BUYERS: usize = 10;

/// Days of stock coverage (DDE) at the historical sales rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    StockAndSalesZero,
    StockZero,
    NoSales,
    /// Whole months, for coverage of 30 days or more
    Months(i64),
    /// Whole days, below 30
    Days(i64),
}

impl Coverage {
    pub fn compute(stock: Decimal, average: Decimal) -> Self {
        match (stock.is_zero(), average.is_zero()) {
            (true, true) => Coverage::StockAndSalesZero,
            (true, false) => Coverage::StockZero,
            (false, true) => Coverage::NoSales,
            (false, false) => {
                let month = Decimal::from(DAYS_PER_MONTH);
                let days = stock
                    .checked_div(average)
                    .and_then(|ratio| ratio.checked_mul(month))
                    .unwrap_or(Decimal::MAX);
                if days >= month {
                    Coverage::Months((days / month).floor().to_i64().unwrap_or(i64::MAX))
                } else {
                    Coverage::Days(days.trunc().to_i64().unwrap_or(0))
                }
            }
        }
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coverage::StockAndSalesZero => f.write_str("Estoque e venda zerados"),
            Coverage::StockZero => f.write_str("Estoque zerado"),
            Coverage::NoSales => f.write_str("Sem venda"),
            Coverage::Months(1) => f.write_str("1 mês"),
            Coverage::Months(n) => write!(f, "{} meses", n),
            Coverage::Days(n) => write!(f, "{} dia(s)", n),
        }
    }
}

impl Serialize for Coverage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// "C/ESTQ LJ S/ESTQ MTZ" style tag: store presence then matrix presence
pub fn stock_status(store_stock: Decimal, matrix_stock: Decimal) -> String {
    let store = if store_stock > Decimal::ZERO { "C/ESTQ LJ" } else { "S/ESTQ LJ" };
    let matrix = if matrix_stock > Decimal::ZERO { "C/ESTQ MTZ" } else { "S/ESTQ MTZ" };
    format!("{} {}", store, matrix)
}

pub fn sale_status(sales: Decimal) -> &'static str {
    // below 0.000001 counts as no sales
    if sales < Decimal::new(1, 6) {
        NO_SALES_LABEL
    } else {
        SALES_LABEL
    }
}

/// Stockout: the product sells historically but the store has nothing
pub fn is_stockout(store_stock: Decimal, average: Decimal) -> bool {
    average > Decimal::ZERO && store_stock.is_zero()
}

fn serialize_stockout<S: Serializer>(stockout: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(if *stockout { STOCKOUT_LABEL } else { OK_LABEL })
}

/// One reconciled stock row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedReportRow {
    #[serde(rename = "CATEGORIA")]
    pub category: String,
    #[serde(rename = "GRUPO")]
    pub group: String,
    #[serde(rename = "CÓDIGO")]
    pub code: i64,
    #[serde(rename = "PRODUTO")]
    pub product: String,
    #[serde(rename = "ESTQ LOJA")]
    pub store_stock: Decimal,
    #[serde(rename = "ESTQ MATRIZ")]
    pub matrix_stock: Decimal,
    #[serde(rename = "VENDAS MÊS ATUAL")]
    pub sales: Decimal,
    #[serde(rename = "MÉDIA VENDA MENSAL")]
    pub average_sales: Decimal,
    #[serde(rename = "DDE")]
    pub coverage: Coverage,
    #[serde(rename = "LOJA")]
    pub store: String,
    #[serde(rename = "STATUS DO ESTOQUE")]
    pub stock_status: String,
    #[serde(rename = "VENDA")]
    pub sale_status: String,
    #[serde(rename = "COMPRADOR")]
    pub buyer: String,
    #[serde(rename = "RUPTURA", serialize_with = "serialize_stockout")]
    pub stockout: bool,
    #[serde(rename = "Subgrupo")]
    pub subgroup: String,
    #[serde(rename = "Forn")]
    pub supplier: String,
    /// Join key: normalized code + "-" + store
    #[serde(skip)]
    pub key: String,
}

impl UnifiedReportRow {
    pub fn stockout_label(&self) -> &'static str {
        if self.stockout {
            STOCKOUT_LABEL
        } else {
            OK_LABEL
        }
    }

    /// Cell for a report column; unknown and blank schema columns are empty
    pub fn value(&self, column: &str) -> Cell {
        match column {
            CATEGORY => Cell::from(self.category.as_str()),
            GROUP => Cell::from(self.group.as_str()),
            CODE => Cell::Int(self.code),
            PRODUCT => Cell::from(self.product.as_str()),
            STORE_STOCK => Cell::Number(self.store_stock),
            MATRIX_STOCK => Cell::Number(self.matrix_stock),
            CURRENT_SALES => Cell::Number(self.sales),
            AVERAGE_SALES => Cell::Number(self.average_sales),
            COVERAGE => Cell::text(self.coverage.to_string()),
            STORE => Cell::from(self.store.as_str()),
            STOCK_STATUS => Cell::from(self.stock_status.as_str()),
            SALE_STATUS => Cell::from(self.sale_status.as_str()),
            BUYER => Cell::from(self.buyer.as_str()),
            STOCKOUT => Cell::from(self.stockout_label()),
            SUBGROUP => Cell::from(self.subgroup.as_str()),
            SUPPLIER => Cell::from(self.supplier.as_str()),
            _ => Cell::Empty,
        }
    }
}

/// Reconciliation result plus the diagnostics gathered along the way
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedReport {
    pub rows: Vec<UnifiedReportRow>,
    pub matrix_store: String,
    /// False when no stock row belongs to the matrix store
    pub matrix_found: bool,
}

impl UnifiedReport {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Same diagnostics, different rows
    pub fn with_rows(&self, rows: Vec<UnifiedReportRow>) -> UnifiedReport {
        UnifiedReport {
            rows,
            matrix_store: self.matrix_store.clone(),
            matrix_found: self.matrix_found,
        }
    }

    pub fn stockout_count(&self) -> usize {
        self.rows.iter().filter(|r| r.stockout).count()
    }

    /// Rows whose store stock is zero or negative
    pub fn no_stock_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.store_stock <= Decimal::ZERO)
            .count()
    }

    /// Flat table in the fixed report schema
    pub fn to_record_set(&self) -> RecordSet {
        let columns = COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| COLUMNS.iter().map(|c| row.value(c)).collect())
            .collect();
        RecordSet::with_rows(columns, rows)
    }

    pub fn summary(&self) -> String {
        if self.is_empty() {
            return NO_DATA.to_string();
        }

        let mut lines = vec![
            "📊 RESUMO DO RELATÓRIO DE RUPTURA".to_string(),
            "-".repeat(60),
            format!("📦 Total de produtos: {}", self.len()),
            format!("⚠️ Produtos em ruptura: {}", self.stockout_count()),
            format!("📦 Produtos sem estoque: {}", self.no_stock_count()),
        ];
        if !self.matrix_found {
            lines.push(format!(
                "⚠️ Matriz '{}' não encontrada: estoque da matriz zerado",
                self.matrix_store
            ));
        }

        lines.push("\n👤 Por Comprador:".to_string());
        let table = self.to_record_set();
        for (buyer, count) in table
            .value_counts(BUYER)
            .into_iter()
            .take(TOP_BUYERS)
            .filter(|(buyer, _)| buyer != UNMAPPED_BUYER)
        {
            lines.push(format!("  {}: {} produtos", buyer, count));
        }

        lines.join("\n")
    }

    /// First `rows` rows as a fixed-width table, quantities with two decimals
    pub fn preview(&self, rows: usize) -> String {
        if self.is_empty() {
            return NO_DATA.to_string();
        }

        let table = self.to_record_set().head(rows);
        let body: Vec<Vec<String>> = table
            .rows
            .iter()
            .map(|row| {
                table
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| match cell.to_decimal() {
                        Some(value) if NUMERIC_COLUMNS.contains(&column.as_str()) => {
                            format_decimal_br(value, 2)
                        }
                        _ => cell.to_string(),
                    })
                    .collect()
            })
            .collect();
        render_table(&table.columns, &body)
    }
}

/// Joins stock, sales curve and average sales into a [`UnifiedReport`]
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    matrix_store: String,
    code_threshold: f64,
    code_sample: usize,
    buyers: ProductBuyerMap,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ReconciliationEngine {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            matrix_store: settings.matrix_store.trim().to_string(),
            code_threshold: settings.code_column_threshold,
            code_sample: settings.code_column_sample,
            buyers: ProductBuyerMap::with_overrides(&settings.buyers),
        }
    }

    pub fn with_buyers(mut self, buyers: ProductBuyerMap) -> Self {
        self.buyers = buyers;
        self
    }

    pub fn matrix_store(&self) -> &str {
        &self.matrix_store
    }

    /// Reconcile the stock table against sales and averages.
    ///
    /// When `averages` is missing or empty, `fallback` gets one chance to
    /// reload its table; without either, averages read as zero. Fails only
    /// when the stock table has no usable product code or store column.
    pub fn reconcile(
        &self,
        stock: &RecordSet,
        curve: &RecordSet,
        averages: Option<&RecordSet>,
        fallback: Option<&mut AverageSalesStore>,
    ) -> Result<UnifiedReport> {
        info!(
            "Reconciling {} stock rows with {} curve rows",
            stock.len(),
            curve.len()
        );

        if stock.is_empty() {
            info!("Stock table is empty, nothing to reconcile");
            return Ok(UnifiedReport {
                rows: Vec::new(),
                matrix_store: self.matrix_store.clone(),
                matrix_found: false,
            });
        }

        let code_idx = self.locate_code_column(stock).ok_or_else(|| {
            RupturaError::MissingRequiredColumn {
                requirement: "product code column in stock table".to_string(),
                available: stock.columns.clone(),
            }
        })?;
        let store_idx = stock.column_index(estoque::STORE_COLUMN).ok_or_else(|| {
            RupturaError::MissingRequiredColumn {
                requirement: format!("store column ({}) in stock table", estoque::STORE_COLUMN),
                available: stock.columns.clone(),
            }
        })?;
        debug!(
            "Stock code column: {}, store column: {}",
            stock.columns[code_idx], stock.columns[store_idx]
        );

        let averages = resolve_averages(averages, fallback);
        let average_index = averages
            .map(|table| self.average_index(table))
            .unwrap_or_default();
        let sales_index = sales_index(curve);

        let codes: Vec<String> = stock
            .rows
            .iter()
            .map(|row| normalize_code_cell(cell_at(row, code_idx)))
            .collect();
        let stores: Vec<String> = stock.rows.iter().map(|row| cell_at(row, store_idx).trimmed()).collect();

        let matrix_key = self.matrix_store.to_uppercase();
        let mut matrix_stock: HashMap<&str, Decimal> = HashMap::new();
        for (row, store) in stores.iter().enumerate() {
            if store.to_uppercase() == matrix_key {
                matrix_stock
                    .entry(codes[row].as_str())
                    .or_insert_with(|| stock.get(row, estoque::STORE_STOCK_COLUMN).decimal_or_zero());
            }
        }
        let matrix_found = !matrix_stock.is_empty();
        if matrix_found {
            info!(
                "Matrix store {:?}: {} products",
                self.matrix_store,
                matrix_stock.len()
            );
        } else {
            warn!(
                "Matrix store {:?} not found in stock table, matrix stock defaults to zero",
                self.matrix_store
            );
        }

        let rows: Vec<UnifiedReportRow> = (0..stock.len())
            .map(|row| {
                let code = &codes[row];
                let store = &stores[row];
                let join_key = (code.clone(), store.to_uppercase());

                let store_stock = stock.get(row, estoque::STORE_STOCK_COLUMN).decimal_or_zero();
                let matrix = matrix_stock.get(code.as_str()).copied().unwrap_or(Decimal::ZERO);
                let sales = sales_index.get(&join_key).copied().unwrap_or(Decimal::ZERO);
                let average = average_index.get(&join_key).copied().unwrap_or(Decimal::ZERO);
                let group = stock.get(row, estoque::GROUP_COLUMN).trimmed();

                UnifiedReportRow {
                    category: stock.get(row, estoque::CATEGORY_COLUMN).trimmed(),
                    buyer: self.buyers.buyer_for(&group).to_string(),
                    group,
                    code: code.parse().unwrap_or(0),
                    product: stock.get(row, estoque::DESCRIPTION_COLUMN).trimmed(),
                    store_stock,
                    matrix_stock: matrix,
                    sales,
                    average_sales: average,
                    coverage: Coverage::compute(store_stock, average),
                    store: store.clone(),
                    stock_status: stock_status(store_stock, matrix),
                    sale_status: sale_status(sales).to_string(),
                    stockout: is_stockout(store_stock, average),
                    subgroup: stock.get(row, estoque::SUBGROUP_COLUMN).trimmed(),
                    supplier: stock.get(row, estoque::SUPPLIER_COLUMN).trimmed(),
                    key: format!("{}-{}", code, store),
                }
            })
            .collect();

        let report = UnifiedReport {
            rows,
            matrix_store: self.matrix_store.clone(),
            matrix_found,
        };
        info!(
            "Reconciled {} rows, {} in stockout",
            report.len(),
            report.stockout_count()
        );
        Ok(report)
    }

    /// Index of the product code column: a header mentioning "codigo"
    /// (accents and case ignored), else the first column whose sampled values
    /// are mostly plain digits
    pub fn locate_code_column(&self, table: &RecordSet) -> Option<usize> {
        if let Some(idx) = table
            .columns
            .iter()
            .position(|name| fold_accents(name).contains("codigo"))
        {
            return Some(idx);
        }

        (0..table.columns.len()).find(|&idx| {
            let sample: Vec<&Cell> = table
                .rows
                .iter()
                .take(self.code_sample)
                .map(|row| cell_at(row, idx))
                .filter(|cell| !cell.is_empty())
                .collect();
            if sample.is_empty() {
                return false;
            }
            let digits = sample.iter().filter(|cell| looks_like_code(cell)).count();
            let share = digits as f64 / sample.len() as f64;
            debug!("Column {:?}: {:.0}% plain digits", table.columns[idx], share * 100.0);
            share >= self.code_threshold
        })
    }

    /// Mean average-sales quantity per (code, store) key
    fn average_index(&self, table: &RecordSet) -> HashMap<(String, String), Decimal> {
        let code_idx = table
            .column_index(media_vendas::CODE_COLUMN)
            .or_else(|| self.locate_code_column(table));
        let (Some(code_idx), Some(store_idx), Some(qty_idx)) = (
            code_idx,
            table.column_index(media_vendas::STORE_COLUMN),
            table.column_index(media_vendas::QUANTITY_COLUMN),
        ) else {
            warn!(
                "Average sales table lacks code/store/quantity columns ({}), averages default to zero",
                table.columns.join(", ")
            );
            return HashMap::new();
        };

        let mut totals: HashMap<(String, String), (Decimal, u32)> = HashMap::new();
        for row in &table.rows {
            let key = (
                normalize_code_cell(cell_at(row, code_idx)),
                cell_at(row, store_idx).trimmed().to_uppercase(),
            );
            let entry = totals.entry(key).or_insert((Decimal::ZERO, 0));
            entry.0 += cell_at(row, qty_idx).decimal_or_zero();
            entry.1 += 1;
        }
        debug!("Average sales keys: {}", totals.len());

        totals
            .into_iter()
            .map(|(key, (sum, count))| (key, sum / Decimal::from(count)))
            .collect()
    }
}

/// Given table when usable, else one reload through the store
fn resolve_averages<'a>(
    given: Option<&'a RecordSet>,
    fallback: Option<&'a mut AverageSalesStore>,
) -> Option<&'a RecordSet> {
    if let Some(table) = given.filter(|t| !t.is_empty()) {
        return Some(table);
    }
    let Some(store) = fallback else {
        warn!("No average sales table, averages default to zero");
        return None;
    };
    info!("Average sales table missing, reloading");
    let table = store.table();
    if table.is_empty() {
        warn!("Average sales still unavailable after reload, averages default to zero");
        None
    } else {
        Some(table)
    }
}

/// Current-period sales summed per (code, store) key
fn sales_index(curve: &RecordSet) -> HashMap<(String, String), Decimal> {
    let mut index = HashMap::new();
    if curve.is_empty() || curve.columns.is_empty() {
        return index;
    }

    let code_idx = curve.column_index(curva_abc::CODE_COLUMN).unwrap_or(0);
    let qty_idx = curve
        .column_index(curva_abc::QUANTITY_COLUMN)
        .unwrap_or(curva_abc::QUANTITY_POSITION);
    let Some(store_idx) = curve.column_index(curva_abc::STORE_NAME_COLUMN) else {
        warn!("Sales curve has no {} column, sales default to zero", curva_abc::STORE_NAME_COLUMN);
        return index;
    };
    if qty_idx >= curve.columns.len() {
        warn!("Sales curve has no quantity column, sales default to zero");
        return index;
    }

    for row in &curve.rows {
        let key = (
            normalize_code_cell(cell_at(row, code_idx)),
            cell_at(row, store_idx).trimmed().to_uppercase(),
        );
        *index.entry(key).or_insert(Decimal::ZERO) += cell_at(row, qty_idx).decimal_or_zero();
    }
    debug!("Sales curve keys: {}", index.len());
    index
}

fn looks_like_code(cell: &Cell) -> bool {
    match cell {
        Cell::Int(i) => *i >= 0,
        Cell::Number(d) => d.fract().is_zero() && !d.is_sign_negative(),
        other => is_plain_digits(&other.as_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MATRIX: &str = "COMCARNE MATRIZ SAO LUIS";

    fn stock_table(rows: &[(&str, &str, Decimal, &str)]) -> RecordSet {
        let columns = [
            estoque::CODE_COLUMN,
            estoque::DESCRIPTION_COLUMN,
            estoque::STORE_STOCK_COLUMN,
            estoque::CATEGORY_COLUMN,
            estoque::GROUP_COLUMN,
            estoque::SUBGROUP_COLUMN,
            estoque::STORE_COLUMN,
        ];
        RecordSet::with_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|(code, store, qty, group)| {
                    vec![
                        Cell::from(*code),
                        Cell::text(format!("PRODUTO {}", code)),
                        Cell::Number(*qty),
                        Cell::text("CARNES"),
                        Cell::from(*group),
                        Cell::Empty,
                        Cell::from(*store),
                    ]
                })
                .collect(),
        )
    }

    fn curve_table(rows: &[(&str, &str, Decimal)]) -> RecordSet {
        RecordSet::with_rows(
            vec![
                curva_abc::CODE_COLUMN.to_string(),
                curva_abc::PRODUCT_COLUMN.to_string(),
                curva_abc::QUANTITY_COLUMN.to_string(),
                curva_abc::STORE_NAME_COLUMN.to_string(),
            ],
            rows.iter()
                .map(|(code, store, qty)| {
                    vec![Cell::from(*code), Cell::text("X"), Cell::Number(*qty), Cell::from(*store)]
                })
                .collect(),
        )
    }

    fn average_table(rows: &[(&str, &str, Decimal)]) -> RecordSet {
        RecordSet::with_rows(
            vec![
                media_vendas::CODE_COLUMN.to_string(),
                media_vendas::STORE_COLUMN.to_string(),
                media_vendas::QUANTITY_COLUMN.to_string(),
            ],
            rows.iter()
                .map(|(code, store, qty)| vec![Cell::from(*code), Cell::from(*store), Cell::Number(*qty)])
                .collect(),
        )
    }

    #[test]
    fn test_coverage_boundaries() {
        assert_eq!(Coverage::compute(dec!(30), dec!(30)).to_string(), "1 mês");
        assert_eq!(Coverage::compute(dec!(29), dec!(30)).to_string(), "29 dia(s)");
        assert_eq!(Coverage::compute(dec!(0), dec!(0)).to_string(), "Estoque e venda zerados");
        assert_eq!(Coverage::compute(dec!(0), dec!(5)).to_string(), "Estoque zerado");
        assert_eq!(Coverage::compute(dec!(5), dec!(0)).to_string(), "Sem venda");
        assert_eq!(Coverage::compute(dec!(100), dec!(10)).to_string(), "10 meses");
        assert_eq!(Coverage::compute(dec!(1), dec!(10)), Coverage::Days(3));
    }

    #[test]
    fn test_status_and_stockout_rules() {
        assert_eq!(stock_status(dec!(1), dec!(0)), "C/ESTQ LJ S/ESTQ MTZ");
        assert_eq!(stock_status(dec!(-2), dec!(4)), "S/ESTQ LJ C/ESTQ MTZ");
        assert_eq!(sale_status(dec!(0.0000001)), NO_SALES_LABEL);
        assert_eq!(sale_status(dec!(0.5)), SALES_LABEL);
        assert!(is_stockout(dec!(0), dec!(5)));
        assert!(!is_stockout(dec!(10), dec!(5)));
        assert!(!is_stockout(dec!(0), dec!(0)));
    }

    #[test]
    fn test_reconcile_joins_every_source() {
        let stock = stock_table(&[
            ("00123", "CALHAU", dec!(0), "AVES"),
            ("123", MATRIX, dec!(40), "AVES"),
            ("456.0", "CALHAU", dec!(12), "GRUPO NOVO"),
        ]);
        let curve = curve_table(&[("123", "calhau", dec!(7)), ("123", "CALHAU", dec!(3))]);
        let averages = average_table(&[
            ("123", "CALHAU", dec!(4)),
            ("123", "CALHAU", dec!(6)),
            ("456", "CALHAU", dec!(12)),
        ]);

        let report = ReconciliationEngine::default()
            .reconcile(&stock, &curve, Some(&averages), None)
            .unwrap();

        assert_eq!(report.len(), 3);
        assert!(report.matrix_found);

        let first = &report.rows[0];
        assert_eq!(first.code, 123);
        assert_eq!(first.key, "123-CALHAU");
        assert_eq!(first.matrix_stock, dec!(40));
        assert_eq!(first.sales, dec!(10));
        assert_eq!(first.average_sales, dec!(5));
        assert!(first.stockout);
        assert_eq!(first.stock_status, "S/ESTQ LJ C/ESTQ MTZ");
        assert_eq!(first.buyer, "Glacirene");

        let third = &report.rows[2];
        assert_eq!(third.code, 456);
        assert_eq!(third.coverage, Coverage::Months(1));
        assert_eq!(third.sale_status, NO_SALES_LABEL);
        assert_eq!(third.buyer, UNMAPPED_BUYER);
        assert!(!third.stockout);
    }

    #[test]
    fn test_empty_curve_and_averages_keep_stock_rows() {
        let stock = stock_table(&[("1", "CALHAU", dec!(3), "AVES"), ("2", "TURU", dec!(0), "AVES")]);
        let report = ReconciliationEngine::default()
            .reconcile(&stock, &RecordSet::default(), Some(&RecordSet::default()), None)
            .unwrap();

        assert_eq!(report.len(), 2);
        assert!(report.rows.iter().all(|r| r.sales.is_zero() && r.average_sales.is_zero()));
        assert!(report.rows.iter().all(|r| !r.stockout));
        assert!(!report.matrix_found);
        assert!(report.summary().contains("Matriz 'COMCARNE MATRIZ SAO LUIS' não encontrada"));
    }

    #[test]
    fn test_short_stock_rows_read_as_empty() {
        let stock = RecordSet {
            columns: vec![
                estoque::CODE_COLUMN.to_string(),
                estoque::STORE_STOCK_COLUMN.to_string(),
                estoque::STORE_COLUMN.to_string(),
            ],
            rows: vec![vec![Cell::Int(1)]],
        };
        let curve = RecordSet {
            columns: vec![
                curva_abc::CODE_COLUMN.to_string(),
                curva_abc::QUANTITY_COLUMN.to_string(),
                curva_abc::STORE_NAME_COLUMN.to_string(),
            ],
            rows: vec![vec![Cell::Int(1)]],
        };
        let averages = RecordSet {
            columns: vec![
                media_vendas::CODE_COLUMN.to_string(),
                media_vendas::STORE_COLUMN.to_string(),
                media_vendas::QUANTITY_COLUMN.to_string(),
            ],
            rows: vec![vec![]],
        };

        let report = ReconciliationEngine::from_settings(&Settings::default())
            .reconcile(&stock, &curve, Some(&averages), None)
            .unwrap();

        assert_eq!(report.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.code, 1);
        assert_eq!(row.store, "");
        assert!(row.store_stock.is_zero());
        assert!(row.sales.is_zero());
        assert!(row.average_sales.is_zero());
    }

    #[test]
    fn test_fallback_store_supplies_averages() {
        let stock = stock_table(&[("1", "CALHAU", dec!(0), "AVES")]);
        let mut store = AverageSalesStore::from_records(average_table(&[("1", "calhau", dec!(2))]));
        let report = ReconciliationEngine::default()
            .reconcile(&stock, &RecordSet::default(), None, Some(&mut store))
            .unwrap();
        assert_eq!(report.rows[0].average_sales, dec!(2));
        assert!(report.rows[0].stockout);
    }

    #[test]
    fn test_code_column_found_by_digit_share() {
        let stock = RecordSet::with_rows(
            vec!["Produto".into(), "Ref".into(), "Loja".into()],
            vec![
                vec![Cell::text("A"), Cell::text("0042"), Cell::text("CALHAU")],
                vec![Cell::text("B"), Cell::Int(7), Cell::text("CALHAU")],
                vec![Cell::text("C"), Cell::text("9"), Cell::text("CALHAU")],
            ],
        );
        let engine = ReconciliationEngine::default();
        assert_eq!(engine.locate_code_column(&stock), Some(1));
        let report = engine
            .reconcile(&stock, &RecordSet::default(), None, None)
            .unwrap();
        assert_eq!(report.rows[0].code, 42);
    }

    #[test]
    fn test_missing_code_column_is_an_error() {
        let stock = RecordSet::with_rows(
            vec!["Produto".into(), "Loja".into()],
            vec![vec![Cell::text("A"), Cell::text("CALHAU")]],
        );
        let err = ReconciliationEngine::default()
            .reconcile(&stock, &RecordSet::default(), None, None)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("product code column"));
        assert!(msg.contains("Produto, Loja"));
    }

    #[test]
    fn test_record_set_follows_schema() {
        let stock = stock_table(&[("1", "CALHAU", dec!(0), "AVES")]);
        let report = ReconciliationEngine::default()
            .reconcile(&stock, &RecordSet::default(), None, None)
            .unwrap();
        let table = report.to_record_set();
        assert_eq!(table.columns, COLUMNS.to_vec());
        assert_eq!(table.get(0, CODE), &Cell::Int(1));
        assert_eq!(table.get(0, STOCK_VALUE), &Cell::Empty);
        assert_eq!(table.get(0, STOCKOUT), &Cell::text(OK_LABEL));
        assert_eq!(table.get(0, COVERAGE), &Cell::text("Estoque e venda zerados"));
    }

    #[test]
    fn test_summary_lists_buyers_without_unmapped() {
        let stock = stock_table(&[
            ("1", "CALHAU", dec!(0), "AVES"),
            ("2", "CALHAU", dec!(5), "AVES"),
            ("3", "CALHAU", dec!(5), "GRUPO NOVO"),
        ]);
        let averages = average_table(&[("1", "CALHAU", dec!(3))]);
        let report = ReconciliationEngine::default()
            .reconcile(&stock, &RecordSet::default(), Some(&averages), None)
            .unwrap();
        let summary = report.summary();
        assert!(summary.contains("📦 Total de produtos: 3"));
        assert!(summary.contains("⚠️ Produtos em ruptura: 1"));
        assert!(summary.contains("📦 Produtos sem estoque: 1"));
        assert!(summary.contains("  Glacirene: 2 produtos"));
        assert!(!summary.contains(UNMAPPED_BUYER));
    }

    #[test]
    fn test_preview_formats_quantities() {
        let stock = stock_table(&[("1", "CALHAU", dec!(1234.5), "AVES")]);
        let report = ReconciliationEngine::default()
            .reconcile(&stock, &RecordSet::default(), None, None)
            .unwrap();
        let preview = report.preview(5);
        assert!(preview.contains("1.234,50"));
        assert!(preview.contains("ESTQ LOJA"));
        assert_eq!(UnifiedReport { rows: vec![], matrix_store: MATRIX.into(), matrix_found: false }.preview(5), NO_DATA);
    }
}
