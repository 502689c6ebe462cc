// Reports module - stockout reconciliation, filters and the report catalog

pub mod catalog;
pub mod filter;
pub mod ruptura;

pub use catalog::{available_reports, combined_report, example_report, ReportKind};
pub use filter::{ReportFilter, StoreSelection};
pub use ruptura::{Coverage, ReconciliationEngine, UnifiedReport, UnifiedReportRow};
