//! Historical average sales per product and store
//!
//! The table lives in a workbook shipped with the application (columns
//! `Código`, `Loja`, `Qtd`). It is loaded once, kept in memory, and reloaded
//! whenever a reader finds it empty. Load failures never propagate: the store
//! simply stays empty and reconciliation runs without averages.

use rust_decimal::Decimal;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::importers::reader;
use crate::table::{RecordSet, Sheet};
use crate::utils::{normalize_code, normalize_code_cell, resource_path};

pub const CODE_COLUMN: &str = "Código";
pub const STORE_COLUMN: &str = "Loja";
pub const QUANTITY_COLUMN: &str = "Qtd";

/// Reads the average-sales workbook from disk
pub type SheetLoader = Box<dyn Fn(&Path) -> Result<Sheet> + Send + Sync>;

pub struct AverageSalesStore {
    path: Option<PathBuf>,
    loader: SheetLoader,
    table: RecordSet,
    load_attempts: usize,
}

impl fmt::Debug for AverageSalesStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AverageSalesStore")
            .field("path", &self.path)
            .field("rows", &self.table.len())
            .field("load_attempts", &self.load_attempts)
            .finish()
    }
}

impl AverageSalesStore {
    /// Store backed by the workbook at `path`; nothing is read until [`load`](Self::load)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_loader(path, Box::new(|p: &Path| reader::read_sheet(p)))
    }

    /// Store using a custom loader (alternative sources, tests)
    pub fn with_loader(path: impl Into<PathBuf>, loader: SheetLoader) -> Self {
        Self {
            path: Some(path.into()),
            loader,
            table: RecordSet::default(),
            load_attempts: 0,
        }
    }

    /// Store at the configured path, resolved next to the executable or the working dir
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(resource_path(&settings.average_sales_path))
    }

    /// In-memory store with no backing file
    pub fn from_records(table: RecordSet) -> Self {
        Self {
            path: None,
            loader: Box::new(|_: &Path| Ok(Sheet::default())),
            table,
            load_attempts: 0,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of times the backing file was (re)read
    pub fn load_attempts(&self) -> usize {
        self.load_attempts
    }

    /// (Re)read the backing workbook, replacing the cached table.
    ///
    /// Returns the number of rows now cached; zero on any failure.
    pub fn load(&mut self) -> usize {
        let Some(path) = self.path.clone() else {
            return self.table.len();
        };
        self.load_attempts += 1;
        info!("Loading average sales from {:?}", path);

        if !path.exists() {
            warn!("Average sales file not found: {:?}", path);
            self.table = RecordSet::default();
            return 0;
        }

        self.table = match (self.loader)(&path) {
            Ok(sheet) => RecordSet::from_sheet(&sheet),
            Err(e) => {
                warn!("Failed to load average sales from {:?}: {:#}", path, e);
                RecordSet::default()
            }
        };
        info!("Average sales loaded: {} rows", self.table.len());
        self.table.len()
    }

    /// Cached table, reloading once when it is empty
    pub fn table(&mut self) -> &RecordSet {
        if self.table.is_empty() {
            debug!("Average sales table empty, reloading");
            self.load();
        }
        &self.table
    }

    /// Average for one product in one store (first matching row), zero when absent
    pub fn average_for(&mut self, code: &str, store: &str) -> Decimal {
        let code = normalize_code(code);
        let store = store.trim().to_uppercase();
        let table = self.table();
        (0..table.len())
            .find(|&row| {
                normalize_code_cell(table.get(row, CODE_COLUMN)) == code
                    && table.get(row, STORE_COLUMN).trimmed().to_uppercase() == store
            })
            .map(|row| table.get(row, QUANTITY_COLUMN).decimal_or_zero())
            .unwrap_or(Decimal::ZERO)
    }

    /// Mean across every store carrying the product, zero when absent
    pub fn average_for_product(&mut self, code: &str) -> Decimal {
        let code = normalize_code(code);
        let table = self.table();
        let values: Vec<Decimal> = (0..table.len())
            .filter(|&row| normalize_code_cell(table.get(row, CODE_COLUMN)) == code)
            .map(|row| table.get(row, QUANTITY_COLUMN).decimal_or_zero())
            .collect();
        if values.is_empty() {
            return Decimal::ZERO;
        }
        values.iter().copied().sum::<Decimal>() / Decimal::from(values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn averages() -> RecordSet {
        RecordSet::with_rows(
            vec![CODE_COLUMN.into(), STORE_COLUMN.into(), QUANTITY_COLUMN.into()],
            vec![
                vec![Cell::Int(123), Cell::text("CALHAU"), Cell::Number(dec!(10))],
                vec![Cell::Int(123), Cell::text("TURU"), Cell::Number(dec!(20))],
                vec![Cell::Int(456), Cell::text("TURU"), Cell::Number(dec!(3))],
            ],
        )
    }

    #[test]
    fn test_average_for_product_and_store() {
        let mut store = AverageSalesStore::from_records(averages());
        assert_eq!(store.average_for("00123.0", "calhau"), dec!(10));
        assert_eq!(store.average_for("123", "COHAMA"), Decimal::ZERO);
        assert_eq!(store.average_for_product("123"), dec!(15));
        assert_eq!(store.average_for_product("999"), Decimal::ZERO);
    }

    #[test]
    fn test_missing_file_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let mut store = AverageSalesStore::new(dir.path().join("media_vendas.xlsx"));
        assert_eq!(store.load(), 0);
        assert!(store.table().is_empty());
        assert_eq!(store.average_for("1", "CALHAU"), Decimal::ZERO);
    }

    #[test]
    fn test_empty_table_triggers_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("media_vendas.xlsx");
        std::fs::write(&path, b"placeholder").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut store = AverageSalesStore::with_loader(
            &path,
            Box::new(move |_: &Path| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Ok(Sheet::default())
                } else {
                    Ok(Sheet::from_grid(vec![
                        vec![Cell::text("Código"), Cell::text("Loja"), Cell::text("Qtd")],
                        vec![Cell::Int(7), Cell::text("TURU"), Cell::Int(4)],
                    ]))
                }
            }),
        );

        assert_eq!(store.load(), 0);
        assert_eq!(store.table().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.load_attempts(), 2);

        // A populated cache is served without touching the loader again.
        assert_eq!(store.average_for("7", "turu"), dec!(4));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_loader_error_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("media_vendas.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();
        let mut store = AverageSalesStore::new(&path);
        assert_eq!(store.load(), 0);
    }
}
