//! Ruptura - stockout reports for a chain of stores
//!
//! Identifies the layout of exported spreadsheets (sales curve per store,
//! inbound goods per group, stock per store), extracts them into normalized
//! record sets and reconciles stock against sales, matrix store stock and
//! historical average sales to flag products in stockout.

pub mod buyers;
pub mod config;
pub mod error;
pub mod export;
pub mod importers;
pub mod media_vendas;
pub mod pipeline;
pub mod reports;
pub mod table;
pub mod ui;
pub mod utils;
