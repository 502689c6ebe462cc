//! Report filters
//!
//! [`ReportFilter`] narrows a reconciled report by allowed values per column,
//! with cascading option lists. [`StoreSelection`] narrows any record set by
//! store, optionally through the named store macros of the settings.

use anyhow::{anyhow, bail, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::ruptura::{UnifiedReport, BUYER, CATEGORY, GROUP, STOCKOUT, STOCK_STATUS, STORE, SUBGROUP};
use crate::config::Settings;
use crate::table::{cell_at, RecordSet};

/// Columns a report can be filtered on
pub const FILTERABLE_COLUMNS: [&str; 7] = [CATEGORY, GROUP, SUBGROUP, BUYER, STOCK_STATUS, STOCKOUT, STORE];

/// Macro selecting every store outside the configured macros
pub const OTHER_STORES_MACRO: &str = "outros";

/// Allowed values per column; rows must match every active column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    selections: BTreeMap<String, BTreeSet<String>>,
}

impl ReportFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `column` to `values`. An empty value list clears the column.
    pub fn set<I, S>(&mut self, column: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let column = filterable_column(column)?;
        let values: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.into().trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            self.selections.remove(column);
        } else {
            self.selections.insert(column.to_string(), values);
        }
        Ok(())
    }

    /// Parse and apply a `COLUMN=V1,V2` argument
    pub fn set_from_arg(&mut self, arg: &str) -> Result<()> {
        let (column, values) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid filter {:?}, expected COLUMN=VALUE[,VALUE...]", arg))?;
        self.set(column.trim(), values.split(','))
    }

    pub fn clear(&mut self, column: &str) {
        self.selections.remove(column);
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn selected(&self, column: &str) -> Option<&BTreeSet<String>> {
        self.selections.get(column)
    }

    /// Filtered copy; the input report is left untouched
    pub fn apply(&self, report: &UnifiedReport) -> UnifiedReport {
        let rows = report
            .rows
            .iter()
            .filter(|row| {
                self.selections
                    .iter()
                    .all(|(column, allowed)| allowed.contains(&row.value(column).to_string()))
            })
            .cloned()
            .collect::<Vec<_>>();
        debug!("Filter kept {} of {} rows", rows.len(), report.len());
        report.with_rows(rows)
    }

    /// Choices for `column` given every other active filter
    pub fn options(&self, report: &UnifiedReport, column: &str) -> Result<BTreeSet<String>> {
        let column = filterable_column(column)?;
        Ok(report
            .rows
            .iter()
            .filter(|row| {
                self.selections
                    .iter()
                    .filter(|(other, _)| other.as_str() != column)
                    .all(|(other, allowed)| allowed.contains(&row.value(other).to_string()))
            })
            .map(|row| row.value(column))
            .filter(|cell| !cell.is_empty())
            .map(|cell| cell.to_string())
            .collect())
    }
}

fn filterable_column(column: &str) -> Result<&'static str> {
    match FILTERABLE_COLUMNS.iter().find(|c| **c == column) {
        Some(c) => Ok(*c),
        None => bail!(
            "column {:?} cannot be filtered (filterable: {})",
            column,
            FILTERABLE_COLUMNS.join(", ")
        ),
    }
}

/// Set of stores to keep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSelection {
    stores: BTreeSet<String>,
}

impl StoreSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_store(&mut self, store: &str) {
        let store = store.trim();
        if !store.is_empty() {
            self.stores.insert(store.to_string());
        }
    }

    /// Add the stores of a named macro that are present in `available`.
    ///
    /// `outros` selects every available store that belongs to no macro.
    pub fn add_macro(
        &mut self,
        name: &str,
        available: &BTreeSet<String>,
        settings: &Settings,
    ) -> Result<usize> {
        let name = name.trim().to_lowercase();
        let picked: Vec<&String> = if name == OTHER_STORES_MACRO {
            let in_macros: BTreeSet<&str> = settings
                .store_macros
                .values()
                .flatten()
                .map(String::as_str)
                .collect();
            available
                .iter()
                .filter(|s| !in_macros.contains(s.as_str()))
                .collect()
        } else if settings.store_macros.contains_key(&name) {
            let members = settings.macro_stores(&name);
            available.iter().filter(|s| members.contains(*s)).collect()
        } else {
            bail!(
                "unknown store macro {:?} (known: {}, {})",
                name,
                settings
                    .store_macros
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
                OTHER_STORES_MACRO
            );
        };

        for store in &picked {
            self.stores.insert((*store).clone());
        }
        debug!("Store macro {:?} selected {} stores", name, picked.len());
        Ok(picked.len())
    }

    pub fn contains(&self, store: &str) -> bool {
        self.stores.contains(store.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub fn stores(&self) -> &BTreeSet<String> {
        &self.stores
    }

    /// Rows of `data` whose `store_column` is selected; an empty selection keeps everything
    pub fn apply(&self, data: &RecordSet, store_column: &str) -> RecordSet {
        if self.is_empty() {
            return data.clone();
        }
        match data.column_index(store_column) {
            Some(idx) => data.filter_rows(|row| self.contains(&cell_at(row, idx).trimmed())),
            None => RecordSet::new(data.columns.clone()),
        }
    }

    /// Report rows whose store is selected
    pub fn apply_report(&self, report: &UnifiedReport) -> UnifiedReport {
        if self.is_empty() {
            return report.clone();
        }
        report.with_rows(
            report
                .rows
                .iter()
                .filter(|row| self.contains(&row.store))
                .cloned()
                .collect(),
        )
    }
}
