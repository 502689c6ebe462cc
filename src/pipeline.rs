//! Load → report pipeline
//!
//! Detects and extracts every input file, loads the average sales table and
//! runs the selected report. Progress goes through a caller-supplied closure
//! so the same pipeline can drive a terminal spinner or run silently in tests.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::buyers::ProductBuyerMap;
use crate::config::Settings;
use crate::importers::{detect_file, LayoutKind};
use crate::media_vendas::AverageSalesStore;
use crate::reports::{combined_report, example_report, ReconciliationEngine, ReportKind, UnifiedReport};
use crate::table::RecordSet;
use crate::ui::progress::{percent_of, ProgressEvent};

/// One identified and extracted input file
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub layout: LayoutKind,
    pub records: RecordSet,
}

/// Everything loaded for one report session
#[derive(Debug)]
pub struct LoadedInputs {
    pub files: Vec<LoadedFile>,
    /// One line per input file, in input order
    pub messages: Vec<String>,
    pub average_sales: AverageSalesStore,
}

impl LoadedInputs {
    /// Records of the last loaded file with `layout`
    pub fn records(&self, layout: LayoutKind) -> Option<&RecordSet> {
        self.files
            .iter()
            .rev()
            .find(|f| f.layout == layout)
            .map(|f| &f.records)
    }

    pub fn stock(&self) -> Option<&RecordSet> {
        self.records(LayoutKind::Estoque)
    }

    pub fn curve(&self) -> Option<&RecordSet> {
        self.records(LayoutKind::CurvaAbc)
    }

    pub fn layouts(&self) -> Vec<LayoutKind> {
        self.files.iter().map(|f| f.layout).collect()
    }

    pub fn available_reports(&self) -> Vec<ReportKind> {
        crate::reports::available_reports(&self.layouts())
    }

    /// Union of every loaded record set
    pub fn combined(&self) -> RecordSet {
        let sets: Vec<&RecordSet> = self.files.iter().map(|f| &f.records).collect();
        RecordSet::concat(&sets)
    }
}

/// Result of running a report
#[derive(Debug, Clone)]
pub enum ReportOutput {
    Ruptura(UnifiedReport),
    Text { text: String, data: RecordSet },
}

impl ReportOutput {
    /// Text shown to the user: summary plus preview for the stockout report
    pub fn render(&self, preview_rows: usize) -> String {
        match self {
            ReportOutput::Ruptura(report) => {
                format!("{}\n\n{}", report.summary(), report.preview(preview_rows))
            }
            ReportOutput::Text { text, .. } => text.clone(),
        }
    }

    /// Flat table for export
    pub fn to_record_set(&self) -> RecordSet {
        match self {
            ReportOutput::Ruptura(report) => report.to_record_set(),
            ReportOutput::Text { data, .. } => data.clone(),
        }
    }
}

/// Detect, extract and classify every file, then load the average sales table.
///
/// A file that cannot be read or identified is reported in `messages` and
/// skipped; the remaining files still load.
pub fn load_inputs<P, F>(
    paths: &[P],
    settings: &Settings,
    buyers: &ProductBuyerMap,
    mut progress: F,
) -> Result<LoadedInputs>
where
    P: AsRef<Path>,
    F: FnMut(ProgressEvent),
{
    progress(ProgressEvent::step(10, "Lendo arquivos..."));

    let total = paths.len();
    let mut files = Vec::new();
    let mut messages = Vec::new();

    for (idx, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let number = idx + 1;
        progress(ProgressEvent::step(
            10 + percent_of(idx, total) * 80 / 100,
            format!("Processando arquivo {} de {}...", number, total),
        ));
        info!("Loading file {}: {:?}", number, path);

        let detected = match detect_file(path, settings.sample_rows) {
            Ok(detected) => detected,
            Err(e) => {
                warn!("Failed to read {:?}: {:#}", path, e);
                let message = format!("❌ Arquivo {}: Erro ao ler ({})", number, e);
                progress(ProgressEvent::Warning {
                    message: message.clone(),
                });
                messages.push(message);
                continue;
            }
        };

        let Some((layout, sheet)) = detected else {
            let message = format!("❌ Arquivo {}: Tipo não identificado", number);
            progress(ProgressEvent::Warning {
                message: message.clone(),
            });
            messages.push(message);
            continue;
        };

        let records = layout.extract(&sheet, buyers);
        info!("{:?}: {} -> {} rows", path, layout, records.len());
        let message = format!("✅ Arquivo {}: {} - {} linhas", number, layout, records.len());
        progress(ProgressEvent::Info {
            message: message.clone(),
        });
        messages.push(message);
        files.push(LoadedFile {
            path: path.to_path_buf(),
            layout,
            records,
        });
    }

    progress(ProgressEvent::step(90, "Carregando média de vendas..."));
    let mut average_sales = AverageSalesStore::from_settings(settings);
    let average_rows = average_sales.load();
    if average_rows == 0 {
        progress(ProgressEvent::Warning {
            message: "⚠️ Arquivo de média de vendas não encontrado".to_string(),
        });
    }

    progress(ProgressEvent::Done {
        message: format!("{} de {} arquivos carregados", files.len(), total),
    });

    Ok(LoadedInputs {
        files,
        messages,
        average_sales,
    })
}

/// Run `kind` over the loaded inputs
pub fn run_report<F>(
    inputs: &mut LoadedInputs,
    kind: ReportKind,
    settings: &Settings,
    buyers: &ProductBuyerMap,
    mut progress: F,
) -> Result<ReportOutput>
where
    F: FnMut(ProgressEvent),
{
    progress(ProgressEvent::step(10, "Inicializando..."));

    let output = match kind {
        ReportKind::Ruptura => {
            progress(ProgressEvent::step(20, "Verificando dados necessários..."));
            let (Some(stock), Some(curve)) = (inputs.stock(), inputs.curve()) else {
                bail!("Precisa de Curva ABC e Estoque para gerar ruptura");
            };
            let (stock, curve) = (stock.clone(), curve.clone());

            progress(ProgressEvent::step(40, "Processando dados de estoque e vendas..."));
            let engine = ReconciliationEngine::from_settings(settings).with_buyers(buyers.clone());
            let report = engine.reconcile(&stock, &curve, None, Some(&mut inputs.average_sales))?;
            ReportOutput::Ruptura(report)
        }
        ReportKind::Combined | ReportKind::Example => {
            progress(ProgressEvent::step(30, "Combinando dados..."));
            let data = inputs.combined();
            progress(ProgressEvent::step(70, "Gerando relatório..."));
            let text = if kind == ReportKind::Combined {
                combined_report(&data)
            } else {
                example_report(&data)
            };
            ReportOutput::Text { text, data }
        }
    };

    progress(ProgressEvent::Done {
        message: format!("{} concluído", kind.name()),
    });
    Ok(output)
}
