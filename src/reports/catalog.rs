//! Report catalog
//!
//! Which reports make sense for the layouts that were loaded, plus the two
//! generic text reports over the combined input records.

use itertools::Itertools;
use serde::Serialize;
use std::fmt;

use crate::importers::LayoutKind;
use crate::table::RecordSet;
use crate::utils::{format_currency, format_decimal_br, render_table};

const RAW_PREVIEW_COLUMNS: [&str; 8] = [
    "Codigo", "Código", "Produto", "Qtd", "Total", "Categoria", "Grupo", "Comprador",
];
const RAW_PREVIEW_ROWS: usize = 20;
const LISTED_COLUMNS: usize = 10;

/// Text of the generic reports when nothing was loaded
pub const NO_REPORT_DATA: &str = "Nenhum dado para gerar relatório";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportKind {
    Ruptura,
    Combined,
    Example,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Ruptura, ReportKind::Combined, ReportKind::Example];

    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::Ruptura => "📉 Ruptura - Análise de Disponibilidade",
            ReportKind::Combined => "📋 Dados Combinados (Raw)",
            ReportKind::Example => "📁 Modelo 1 - Relatório Exemplo",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReportKind::Ruptura => "Analisa produtos que estão em ruptura baseado em vendas e estoque",
            ReportKind::Combined => "Exibe os dados brutos de todos os arquivos combinados",
            ReportKind::Example => "Relatório de exemplo para testes e demonstração",
        }
    }

    /// Lookup by display name or by file base (case-insensitive)
    pub fn by_name(name: &str) -> Option<ReportKind> {
        let name = name.trim();
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name || kind.file_base().eq_ignore_ascii_case(name))
    }

    /// Short base used in export file names
    pub fn file_base(&self) -> &'static str {
        match self {
            ReportKind::Ruptura => "Ruptura",
            ReportKind::Combined => "Dados_Combinados",
            ReportKind::Example => "Exemplo",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reports offered for the loaded layouts: the stockout report needs both a
/// sales curve and a stock table, otherwise only the example report is offered
pub fn available_reports(loaded: &[LayoutKind]) -> Vec<ReportKind> {
    if loaded.contains(&LayoutKind::CurvaAbc) && loaded.contains(&LayoutKind::Estoque) {
        vec![ReportKind::Ruptura]
    } else {
        vec![ReportKind::Example]
    }
}

/// Overview of the combined records: sizes and a preview of the key columns
pub fn combined_report(data: &RecordSet) -> String {
    if data.is_empty() {
        return NO_REPORT_DATA.to_string();
    }

    let rule = "=".repeat(100);
    let mut lines = vec![
        rule.clone(),
        format!("📋 {}", ReportKind::Combined.name()),
        rule,
        String::new(),
        format!("Total de linhas: {}", data.len()),
        format!("Total de colunas: {}", data.columns.len()),
        String::new(),
    ];

    let mut preview = data.select(&RAW_PREVIEW_COLUMNS);
    if preview.columns.is_empty() {
        let first: Vec<&str> = data.columns.iter().take(5).map(String::as_str).collect();
        preview = data.select(&first);
    }
    let preview = preview.head(RAW_PREVIEW_ROWS);
    let rows: Vec<Vec<String>> = preview
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    lines.push(render_table(&preview.columns, &rows));

    lines.join("\n")
}

/// Column listing and basic totals of the combined records
pub fn example_report(data: &RecordSet) -> String {
    let mut out = format!("{}\n", ReportKind::Example.name());
    out.push_str(&"=".repeat(80));
    out.push_str("\n\n");
    out.push_str("Este é um relatório de exemplo para testes.\n\n");
    out.push_str("📊 INFORMAÇÕES DOS DADOS:\n");
    out.push_str(&format!("• Total de linhas: {}\n", data.len()));
    out.push_str(&format!("• Total de colunas: {}\n", data.columns.len()));
    out.push_str(&format!(
        "• Colunas: {}\n",
        data.columns.iter().take(LISTED_COLUMNS).join(", ")
    ));
    if data.columns.len() > LISTED_COLUMNS {
        out.push_str(&format!(
            "• ... e mais {} colunas\n",
            data.columns.len() - LISTED_COLUMNS
        ));
    }

    out.push_str("\n📈 ESTATÍSTICAS BÁSICAS:\n");
    if data.has_column("Qtd") {
        out.push_str(&format!(
            "• Quantidade total: {}\n",
            format_decimal_br(data.sum("Qtd"), 2)
        ));
    }
    if data.has_column("Total") {
        out.push_str(&format!("• Valor total: {}\n", format_currency(data.sum("Total"))));
    }
    if data.has_column("Estoque_Geral") {
        out.push_str(&format!(
            "• Estoque Geral: {}\n",
            format_decimal_br(data.sum("Estoque_Geral"), 2)
        ));
    }
    if let Some(code) = ["Codigo", "Código"].into_iter().find(|c| data.has_column(c)) {
        out.push_str(&format!("• Produtos únicos: {}\n", data.n_unique(code)));
    }
    out
}
