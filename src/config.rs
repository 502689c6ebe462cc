//! Runtime settings
//!
//! Every value has a default matching the stores this tool was built for;
//! a TOML file only needs to list what differs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::RupturaError;

pub const DEFAULT_MATRIX_STORE: &str = "COMCARNE MATRIZ SAO LUIS";
pub const DEFAULT_AVERAGE_SALES_PATH: &str = "data/media_vendas.xlsx";
const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Store whose stock acts as the central warehouse
    pub matrix_store: String,
    /// Relative path of the historical average sales workbook
    pub average_sales_path: String,
    /// Rows shown by previews
    pub preview_rows: usize,
    /// Rows read from a file for layout detection
    pub sample_rows: usize,
    /// Share of digit-only values for a column to count as the code column
    pub code_column_threshold: f64,
    /// Rows sampled by the code column heuristic
    pub code_column_sample: usize,
    /// Named store groups used by store filters
    pub store_macros: BTreeMap<String, Vec<String>>,
    /// Extra group → buyer entries layered over the built-in table
    pub buyers: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut store_macros = BTreeMap::new();
        store_macros.insert(
            "emporio".to_string(),
            [
                "PONTA D AREIA",
                "CALHAU",
                "PENINSULA PTA AREIA",
                "COHAMA",
                "EMPORIO FRIBAL TERESINA",
                "EMPORIO IMPERATRIZ",
                "TURU",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );
        store_macros.insert(
            "mercearia".to_string(),
            ["CURVA DO 90", "MERCEARIA SANTA INES", "MERCEARIA MAIOBAO"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        Self {
            matrix_store: DEFAULT_MATRIX_STORE.to_string(),
            average_sales_path: DEFAULT_AVERAGE_SALES_PATH.to_string(),
            preview_rows: 20,
            sample_rows: 20,
            code_column_threshold: 0.70,
            code_column_sample: 100,
            store_macros,
            buyers: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| RupturaError::Config(e.to_string()))?;
        if !(0.0..=1.0).contains(&settings.code_column_threshold) {
            return Err(RupturaError::Config(format!(
                "code_column_threshold must be between 0 and 1, got {}",
                settings.code_column_threshold
            ))
            .into());
        }
        Ok(settings)
    }

    /// Load settings from `path`, or from the default config location.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    debug!("No config directory available, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let settings = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Stores of a named macro (empty when unknown)
    pub fn macro_stores(&self, name: &str) -> &[String] {
        self.store_macros
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// `<config_home>/ruptura/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("ruptura").join(CONFIG_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.matrix_store, "COMCARNE MATRIZ SAO LUIS");
        assert_eq!(settings.average_sales_path, "data/media_vendas.xlsx");
        assert_eq!(settings.preview_rows, 20);
        assert_eq!(settings.code_column_sample, 100);
        assert!(settings.macro_stores("emporio").contains(&"TURU".to_string()));
        assert!(settings.macro_stores("desconhecido").is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            matrix_store = "CD CENTRAL"

            [buyers]
            "NOVO GRUPO" = "Marcelo"
            "#,
        )
        .unwrap();
        assert_eq!(settings.matrix_store, "CD CENTRAL");
        assert_eq!(settings.preview_rows, 20);
        assert_eq!(settings.buyers.get("NOVO GRUPO").map(String::as_str), Some("Marcelo"));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = Settings::from_toml("code_column_threshold = 1.5").unwrap_err();
        assert!(err.to_string().contains("code_column_threshold"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "preview_rows = \"many\"").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }
}
