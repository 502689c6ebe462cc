//! Integration tests for ruptura
//!
//! These tests run the library end to end over real workbooks:
//! - Layout detection of each ERP export
//! - Extraction of inbound goods with buyer resolution
//! - Stockout reconciliation through the load → report pipeline
//! - Filters and store selections over the reconciled report
//! - Export to .xlsx and read back


use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use tempfile::TempDir;

use ruptura::buyers::{ProductBuyerMap, UNMAPPED_BUYER};
use ruptura::config::Settings;
use ruptura::export::write_xlsx;
use ruptura::importers::{detect_file, read_sample, read_sheet, LayoutKind};
use ruptura::pipeline::{load_inputs, run_report, LoadedInputs, ReportOutput};
use ruptura::reports::{
    Coverage, ReportFilter, ReportKind, StoreSelection, UnifiedReport, UnifiedReportRow,
};
use ruptura::table::Cell;
use ruptura::ui::progress::ProgressEvent;

fn settings_with_averages(dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.average_sales_path = fixtures::averages(dir.path()).to_string_lossy().into_owned();
    settings
}

fn load_stock_and_curve(dir: &TempDir, settings: &Settings) -> Result<LoadedInputs> {
    let paths = [fixtures::stock(dir.path()), fixtures::curve(dir.path())];
    load_inputs(&paths, settings, ProductBuyerMap::builtin(), |_| {})
}

fn reconcile(dir: &TempDir) -> Result<UnifiedReport> {
    let settings = settings_with_averages(dir);
    let mut inputs = load_stock_and_curve(dir, &settings)?;
    match run_report(
        &mut inputs,
        ReportKind::Ruptura,
        &settings,
        ProductBuyerMap::builtin(),
        |_| {},
    )? {
        ReportOutput::Ruptura(report) => Ok(report),
        other => panic!("expected stockout report, got {:?}", other),
    }
}

fn row<'a>(report: &'a UnifiedReport, code: i64, store: &str) -> &'a UnifiedReportRow {
    report
        .rows
        .iter()
        .find(|r| r.code == code && r.store == store)
        .unwrap_or_else(|| panic!("row {} / {} missing", code, store))
}

#[test]
fn test_each_export_is_detected_as_its_layout() -> Result<()> {
    let dir = TempDir::new()?;
    let cases = [
        (fixtures::curve(dir.path()), LayoutKind::CurvaAbc),
        (fixtures::stock(dir.path()), LayoutKind::Estoque),
        (fixtures::inbound(dir.path()), LayoutKind::Entradas),
    ];

    for (path, expected) in cases {
        let (kind, _) = detect_file(&path, 20)?.expect("layout detected");
        assert_eq!(kind, expected, "{:?}", path);
        let sample = read_sample(&path, 20)?;
        let matching: Vec<LayoutKind> = LayoutKind::ALL
            .into_iter()
            .filter(|k| k.recognize(&sample).unwrap_or(false))
            .collect();
        assert_eq!(matching, vec![expected], "{:?} matched more than one layout", path);
    }

    assert!(detect_file(fixtures::unknown(dir.path()), 20)?.is_none());
    Ok(())
}

#[test]
fn test_inbound_extraction_resolves_buyers() -> Result<()> {
    let dir = TempDir::new()?;
    let (kind, sheet) = detect_file(fixtures::inbound(dir.path()), 20)?.expect("detected");
    let records = kind.extract(&sheet, ProductBuyerMap::builtin());

    assert_eq!(records.len(), 2);
    assert_eq!(records.get(0, "Codigo"), &Cell::Int(1001));
    assert_eq!(records.get(0, "Categoria").trimmed(), "CARNES");
    assert_eq!(records.get(0, "Grupo").trimmed(), "AVES");
    assert_eq!(records.get(0, "Comprador").trimmed(), "Glacirene");
    assert_eq!(records.get(0, "Codigo Grupo"), &Cell::Int(10));
    assert_eq!(records.get(0, "Qtd").to_decimal(), Some(dec!(10)));
    assert_eq!(
        records.get(0, "Ult.Ent."),
        &Cell::Date(NaiveDate::from_ymd_opt(2024, 9, 5).unwrap())
    );
    assert_eq!(records.get(1, "Comprador").trimmed(), UNMAPPED_BUYER);
    assert_eq!(records.sum("Total"), dec!(110));

    let summary = kind.summary(&records);
    assert!(summary.contains("AVES"));
    Ok(())
}

#[test]
fn test_load_inputs_reports_each_file() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_with_averages(&dir);
    let paths = [
        fixtures::stock(dir.path()),
        fixtures::unknown(dir.path()),
        dir.path().join("sumiu.xlsx"),
        fixtures::curve(dir.path()),
    ];

    let mut events = Vec::new();
    let inputs = load_inputs(&paths, &settings, ProductBuyerMap::builtin(), |e| events.push(e))?;

    assert_eq!(inputs.files.len(), 2);
    assert_eq!(inputs.messages.len(), 4);
    assert!(inputs.messages[0].starts_with("✅ Arquivo 1: Estoque - 5 linhas"));
    assert_eq!(inputs.messages[1], "❌ Arquivo 2: Tipo não identificado");
    assert!(inputs.messages[2].starts_with("❌ Arquivo 3: Erro ao ler"));
    assert!(inputs.messages[3].starts_with("✅ Arquivo 4: Curva ABC por Loja - 3 linhas"));
    assert_eq!(inputs.available_reports(), vec![ReportKind::Ruptura]);
    assert!(matches!(events.last(), Some(ProgressEvent::Done { .. })));
    Ok(())
}

#[test]
fn test_stockout_report_over_workbooks() -> Result<()> {
    let dir = TempDir::new()?;
    let report = reconcile(&dir)?;

    // One output row per stock row
    assert_eq!(report.len(), 5);
    assert!(report.matrix_found);

    let picanha = row(&report, 123, "CALHAU");
    assert!(picanha.stockout);
    assert_eq!(picanha.stockout_label(), "RUPTURA");
    assert_eq!(picanha.coverage, Coverage::StockZero);
    assert_eq!(picanha.matrix_stock, dec!(40));
    assert_eq!(picanha.stock_status, "S/ESTQ LJ C/ESTQ MTZ");
    assert_eq!(picanha.sale_status, "SEM VENDA");
    assert_eq!(picanha.buyer, "Glacirene");

    let frango = row(&report, 456, "CALHAU");
    assert!(!frango.stockout);
    assert_eq!(frango.sales, dec!(12));
    assert_eq!(frango.average_sales, dec!(30));
    assert_eq!(frango.coverage.to_string(), "1 mês");
    assert_eq!(frango.stock_status, "C/ESTQ LJ S/ESTQ MTZ");
    assert_eq!(frango.sale_status, "VENDA");

    let queijo = row(&report, 789, "TURU");
    assert_eq!(queijo.average_sales, dec!(30));
    assert_eq!(queijo.coverage.to_string(), "29 dia(s)");
    assert_eq!(queijo.buyer, UNMAPPED_BUYER);

    let sal = row(&report, 321, "TURU");
    assert_eq!(sal.coverage, Coverage::NoSales);
    assert!(!sal.stockout);

    assert_eq!(report.stockout_count(), 1);
    let summary = report.summary();
    assert!(summary.contains("Glacirene"));
    assert!(!summary.contains("Matriz 'COMCARNE"));
    Ok(())
}

#[test]
fn test_stockout_report_without_matrix_store() -> Result<()> {
    let dir = TempDir::new()?;
    let mut settings = settings_with_averages(&dir);
    settings.matrix_store = "MATRIZ INEXISTENTE".to_string();
    let mut inputs = load_stock_and_curve(&dir, &settings)?;

    let ReportOutput::Ruptura(report) = run_report(
        &mut inputs,
        ReportKind::Ruptura,
        &settings,
        ProductBuyerMap::builtin(),
        |_| {},
    )?
    else {
        panic!("expected stockout report");
    };

    assert!(!report.matrix_found);
    assert!(report.rows.iter().all(|r| r.matrix_stock.is_zero()));
    assert!(report.summary().contains("MATRIZ INEXISTENTE"));
    Ok(())
}

#[test]
fn test_stockout_report_without_average_file() -> Result<()> {
    let dir = TempDir::new()?;
    let mut settings = Settings::default();
    settings.average_sales_path = dir.path().join("nada.xlsx").to_string_lossy().into_owned();
    let mut inputs = load_stock_and_curve(&dir, &settings)?;

    let ReportOutput::Ruptura(report) = run_report(
        &mut inputs,
        ReportKind::Ruptura,
        &settings,
        ProductBuyerMap::builtin(),
        |_| {},
    )?
    else {
        panic!("expected stockout report");
    };

    assert_eq!(report.len(), 5);
    assert_eq!(report.stockout_count(), 0);
    assert!(report.rows.iter().all(|r| r.average_sales.is_zero()));
    Ok(())
}

#[test]
fn test_stockout_report_needs_curve_and_stock() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_with_averages(&dir);
    let mut inputs = load_inputs(
        &[fixtures::stock(dir.path())],
        &settings,
        ProductBuyerMap::builtin(),
        |_| {},
    )?;

    let err = run_report(
        &mut inputs,
        ReportKind::Ruptura,
        &settings,
        ProductBuyerMap::builtin(),
        |_| {},
    )
    .unwrap_err();
    assert!(err.to_string().contains("Precisa de Curva ABC e Estoque"));

    let output = run_report(
        &mut inputs,
        ReportKind::Example,
        &settings,
        ProductBuyerMap::builtin(),
        |_| {},
    )?;
    assert!(output.render(10).contains("• Total de linhas: 5"));
    Ok(())
}

#[test]
fn test_filters_and_store_macros_narrow_the_report() -> Result<()> {
    let dir = TempDir::new()?;
    let report = reconcile(&dir)?;

    let mut filter = ReportFilter::new();
    filter.set_from_arg("RUPTURA=RUPTURA")?;
    let stockouts = filter.apply(&report);
    assert_eq!(stockouts.len(), 1);
    assert_eq!(stockouts.rows[0].code, 123);

    let mut filter = ReportFilter::new();
    filter.set_from_arg("CATEGORIA=CARNES")?;
    let stores = filter.options(&report, "LOJA")?;
    assert!(stores.contains("CALHAU"));
    assert!(stores.contains(fixtures::MATRIX));
    assert!(!stores.contains("TURU"));

    let settings = Settings::default();
    let available: BTreeSet<String> = report
        .rows.iter().map(|r| r.store.clone()).collect();
    let mut selection = StoreSelection::new();
    selection.add_macro("outros", &available, &settings)?;
    let others = selection.apply_report(&report);
    assert_eq!(others.len(), 1);
    assert_eq!(others.rows[0].store, fixtures::MATRIX);
    Ok(())
}

#[test]
fn test_exported_report_reads_back() -> Result<()> {
    let dir = TempDir::new()?;
    let report = reconcile(&dir)?;
    let path = dir.path().join("ruptura.xlsx");

    let table = report.to_record_set();
    write_xlsx(&table, &path)?;

    let sheet = read_sheet(&path)?;
    let header = sheet.header_names();
    assert_eq!(header.first().map(String::as_str), Some("CATEGORIA"));
    assert!(header.iter().any(|h| h == "DDE"));
    assert_eq!(sheet.len(), 5);
    let stockouts = sheet
        .rows
        .iter()
        .filter(|r| r.iter().any(|c| c.trimmed() == "RUPTURA"))
        .count();
    assert_eq!(stockouts, 1);
    Ok(())
}

#[test]
fn test_combined_report_over_every_file() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_with_averages(&dir);
    let paths = [fixtures::curve(dir.path()), fixtures::inbound(dir.path())];
    let mut inputs = load_inputs(&paths, &settings, ProductBuyerMap::builtin(), |_| {})?;

    let output = run_report(
        &mut inputs,
        ReportKind::Combined,
        &settings,
        ProductBuyerMap::builtin(),
        |_| {},
    )?;
    let text = output.render(10);
    assert!(text.contains("Total de linhas: 5"));
    assert_eq!(output.to_record_set().len(), 5);
    Ok(())
}
