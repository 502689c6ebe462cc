use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

use super::formatters::{
    format_buyer_groups, format_buyer_stats, format_detection, format_exported, format_layouts,
    format_messages, format_report_json,
};
use super::help::{render_help, RenderOpts};
use super::{Cli, Commands};
use ruptura::buyers::ProductBuyerMap;
use ruptura::config::Settings;
use ruptura::export::{default_file_name, write_xlsx};
use ruptura::importers::{detect_file, LayoutKind};
use ruptura::pipeline::{load_inputs, run_report, ReportOutput};
use ruptura::reports::{ReportFilter, ReportKind, StoreSelection};
use ruptura::table::RecordSet;
use ruptura::ui::progress::ProgressPrinter;

/// Execute one parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let buyers = ProductBuyerMap::with_overrides(&settings.buyers);

    let Some(command) = cli.command else {
        render_help(std::io::stdout(), &RenderOpts::default())?;
        return Ok(());
    };

    match command {
        Commands::Models => {
            println!("{}", format_layouts(&LayoutKind::ALL));
            Ok(())
        }
        Commands::Detect { file } => {
            let detected = detect_file(&file, settings.sample_rows)?;
            println!("{}", format_detection(&file, detected.map(|(kind, _)| kind)));
            Ok(())
        }
        Commands::Extract { file, rows, export } => {
            handle_extract(&file, rows, export.as_deref(), &settings, &buyers)
        }
        Commands::Reconcile {
            stock,
            curve,
            average,
            filters,
            store_macros,
            rows,
            export,
            json,
        } => {
            let mut settings = settings;
            if let Some(average) = average {
                settings.average_sales_path = average.to_string_lossy().into_owned();
            }
            let request = ReconcileRequest {
                stock,
                curve,
                filters,
                store_macros,
                rows: rows.unwrap_or(settings.preview_rows),
                export,
                json,
            };
            handle_reconcile(request, &settings, &buyers)
        }
        Commands::Report { files, kind, rows } => {
            let printer = ProgressPrinter::new(false);
            let mut inputs = load_inputs(&files, &settings, &buyers, |e| printer.handle_event(&e))?;
            let kind = match kind {
                Some(name) => ReportKind::by_name(&name)
                    .ok_or_else(|| anyhow!("unknown report {:?}", name))?,
                None => inputs
                    .available_reports()
                    .first()
                    .copied()
                    .unwrap_or(ReportKind::Example),
            };
            info!("Running report {}", kind);
            let output = run_report(&mut inputs, kind, &settings, &buyers, |e| {
                printer.handle_event(&e)
            })?;
            println!("{}", output.render(rows.unwrap_or(settings.preview_rows)));
            Ok(())
        }
        Commands::Buyers { buyer } => {
            match buyer {
                Some(name) => println!("{}", format_buyer_groups(&name, &buyers.groups_for(&name))),
                None => println!("{}", format_buyer_stats(&buyers.stats())),
            }
            Ok(())
        }
    }
}

fn handle_extract(
    file: &Path,
    rows: Option<usize>,
    export: Option<&Path>,
    settings: &Settings,
    buyers: &ProductBuyerMap,
) -> Result<()> {
    let Some((kind, sheet)) = detect_file(file, settings.sample_rows)? else {
        bail!("{}: Tipo não identificado", file.display());
    };
    let records = kind.extract(&sheet, buyers);

    println!("{}", format_detection(file, Some(kind)));
    println!();
    println!("{}", kind.summary(&records));
    println!();
    println!("{}", kind.preview(&records, rows.unwrap_or(settings.preview_rows)));

    if let Some(path) = export {
        let path = export_path(path, "Dados");
        write_xlsx(&records, &path)?;
        println!("{}", format_exported(&path, records.len()));
    }
    Ok(())
}

struct ReconcileRequest {
    stock: PathBuf,
    curve: PathBuf,
    filters: Vec<String>,
    store_macros: Vec<String>,
    rows: usize,
    export: Option<PathBuf>,
    json: bool,
}

fn handle_reconcile(request: ReconcileRequest, settings: &Settings, buyers: &ProductBuyerMap) -> Result<()> {
    let mut filter = ReportFilter::new();
    for arg in &request.filters {
        filter.set_from_arg(arg)?;
    }

    let printer = ProgressPrinter::new(request.json);
    let mut inputs = load_inputs(
        &[request.stock.clone(), request.curve.clone()],
        settings,
        buyers,
        |e| printer.handle_event(&e),
    )?;
    if inputs.stock().is_none() || inputs.curve().is_none() {
        bail!(
            "Precisa de Curva ABC e Estoque para gerar ruptura\n{}",
            format_messages(&inputs.messages)
        );
    }

    let output = run_report(&mut inputs, ReportKind::Ruptura, settings, buyers, |e| {
        printer.handle_event(&e)
    })?;
    let ReportOutput::Ruptura(report) = output else {
        bail!("stockout report produced no reconciled rows");
    };

    let mut report = filter.apply(&report);
    if !request.store_macros.is_empty() {
        let available: BTreeSet<String> = report.rows.iter().map(|r| r.store.clone()).collect();
        let mut selection = StoreSelection::new();
        for name in &request.store_macros {
            selection.add_macro(name, &available, settings)?;
        }
        report = selection.apply_report(&report);
    }

    if request.json {
        println!("{}", format_report_json(&report));
    } else {
        println!("{}", report.summary());
        println!();
        println!("{}", report.preview(request.rows));
    }

    if let Some(path) = request.export.as_deref() {
        let path = export_path(path, ReportKind::Ruptura.file_base());
        let table: RecordSet = report.to_record_set();
        write_xlsx(&table, &path).context("Failed to export stockout report")?;
        let message = format_exported(&path, table.len());
        if request.json {
            eprintln!("{}", message);
        } else {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Directories get the timestamped default file name
fn export_path(path: &Path, base: &str) -> PathBuf {
    if path.is_dir() {
        path.join(default_file_name(base, Local::now().naive_local()))
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_path_uses_default_name_for_directories() {
        let dir = TempDir::new().unwrap();
        let path = export_path(dir.path(), "Ruptura");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Relatorio_Ruptura_"));
        assert!(name.ends_with(".xlsx"));

        let file = dir.path().join("saida.xlsx");
        assert_eq!(export_path(&file, "Ruptura"), file);
    }
}
