//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data processing from presentation.

use colored::Colorize;
use itertools::Itertools;
use ruptura::buyers::MappingStats;
use ruptura::importers::LayoutKind;
use ruptura::reports::UnifiedReport;
use std::path::Path;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

/// Known layouts as a table, in detection order
pub fn format_layouts(layouts: &[LayoutKind]) -> String {
    #[derive(Tabled)]
    struct LayoutRow {
        #[tabled(rename = "#")]
        position: usize,
        #[tabled(rename = "Modelo")]
        name: String,
        #[tabled(rename = "Descrição")]
        description: String,
    }

    let rows: Vec<LayoutRow> = layouts
        .iter()
        .enumerate()
        .map(|(idx, kind)| LayoutRow {
            position: idx + 1,
            name: kind.name().to_string(),
            description: kind.description().to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn format_detection(path: &Path, layout: Option<LayoutKind>) -> String {
    match layout {
        Some(kind) => format!(
            "{} {}: {}",
            "✓".green().bold(),
            path.display(),
            kind.name().bold()
        ),
        None => format!(
            "{} {}: Tipo não identificado",
            "✗".red().bold(),
            path.display()
        ),
    }
}

/// Buyer statistics with one row per buyer
pub fn format_buyer_stats(stats: &MappingStats) -> String {
    #[derive(Tabled)]
    struct BuyerRow {
        #[tabled(rename = "Comprador")]
        buyer: String,
        #[tabled(rename = "Grupos")]
        groups: usize,
    }

    let rows: Vec<BuyerRow> = stats
        .groups_per_buyer
        .iter()
        .map(|(buyer, groups)| BuyerRow {
            buyer: buyer.clone(),
            groups: *groups,
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.modify(Columns::new(1..), Alignment::right());

    format!(
        "\n{} Mapeamento de compradores\n\n{}\n\n{:<20} {}\n{:<20} {}\n",
        "👤".cyan().bold(),
        table,
        "Total de grupos:".bold(),
        stats.total_groups,
        "Total de compradores:".bold(),
        stats.total_buyers
    )
}

pub fn format_buyer_groups(buyer: &str, groups: &[&str]) -> String {
    if groups.is_empty() {
        return format!(
            "{} Nenhum grupo mapeado para {}\n",
            "ℹ".blue().bold(),
            buyer.bold()
        );
    }
    let mut out = format!("\n{} Grupos de {} ({})\n\n", "👤".cyan().bold(), buyer.bold(), groups.len());
    for group in groups {
        out.push_str(&format!("  • {}\n", group));
    }
    out
}

/// Per-file load results, colored by outcome
pub fn format_messages(messages: &[String]) -> String {
    messages
        .iter()
        .map(|m| {
            if m.starts_with('✅') {
                m.green().to_string()
            } else {
                m.yellow().to_string()
            }
        })
        .join("\n")
}

/// Report rows as a JSON array, one object per row keyed by report column
pub fn format_report_json(report: &UnifiedReport) -> String {
    serde_json::to_string_pretty(&report.rows)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

pub fn format_exported(path: &Path, rows: usize) -> String {
    format!(
        "{} Exportado {} linhas para {}",
        "✓".green().bold(),
        rows,
        path.display()
    )
}
