//! Error handling for the reconciliation core
//!
//! Defines the fatal error conditions and establishes a unified Result type
//! using anyhow for context chaining and error propagation. Soft data gaps
//! (missing average sales, unknown buyer groups, unparseable cells) are never
//! errors; they degrade to zero/empty values where they occur.

use thiserror::Error;

/// Conditions that make a whole operation meaningless
#[derive(Error, Debug)]
pub enum RupturaError {
    #[error("missing required column: {requirement} (available columns: {})", .available.join(", "))]
    MissingRequiredColumn {
        requirement: String,
        available: Vec<String>,
    },

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("workbook has no sheets: {0}")]
    EmptyWorkbook(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_lists_available_columns() {
        let err = RupturaError::MissingRequiredColumn {
            requirement: "product code column in stock table".to_string(),
            available: vec!["Descricao".to_string(), "Loja".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("product code column in stock table"));
        assert!(msg.contains("Descricao, Loja"));
    }

    #[test]
    fn test_anyhow_context_chains_errors() {
        use anyhow::Context;
        let result: Result<()> = Err(anyhow::Error::new(RupturaError::UnsupportedFormat(
            "pdf".to_string(),
        )))
        .context("failed to read stock file");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to read stock file"));
        assert!(err.downcast_ref::<RupturaError>().is_some());
    }

    #[test]
    fn test_error_variants_are_readable() {
        assert!(RupturaError::EmptyWorkbook("x.xlsx".into())
            .to_string()
            .starts_with("workbook has no sheets"));
        assert!(RupturaError::Config("bad".into())
            .to_string()
            .starts_with("configuration error"));
    }
}
