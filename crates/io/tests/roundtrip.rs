// Loader + report over real xlsx files in a temp directory.
// Run with: cargo test -p confronto-io --test roundtrip

use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

use confronto_io::{load_grid, run_files, InputPaths, OutputTarget, RunOptions};
use confronto_recon::{Cell, OfficeLabel, ReconConfig, ReconError};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn write_xlsx(path: &Path, rows: &[Vec<Cell>]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(s) => {
                    sheet.write_string(r as u32, c as u16, s).unwrap();
                }
                Cell::Number(n) => {
                    sheet.write_number(r as u32, c as u16, *n).unwrap();
                }
                Cell::Empty => {}
            }
        }
    }
    workbook.save(path).unwrap();
}

fn text(s: &str) -> Cell {
    Cell::Text(s.into())
}

fn num(n: f64) -> Cell {
    Cell::Number(n)
}

/// EDAC_001 with bonus data for months 1 and 2.
fn premi_rows() -> Vec<Vec<Cell>> {
    let mut header = vec![Cell::Empty];
    let mut fields = vec![text("Rows")];
    let mut line = vec![text("responsabili_area")];
    for (month, addon, final_premium) in [(1.0, 5.0, 105.0), (2.0, 0.0, 50.0)] {
        header.extend([num(month), Cell::Empty, Cell::Empty]);
        fields.extend([text("Premio calcolato"), text("Addon"), text("Premio finale")]);
        line.extend([num(0.0), num(addon), num(final_premium)]);
    }
    vec![
        vec![text("Premi_Mensili_x_Sede")],
        Vec::new(),
        Vec::new(),
        header,
        fields,
        vec![text("EDAC_001")],
        line,
    ]
}

/// Month-split margins; `detail = false` leaves only the TOTALE row.
fn importo_rows(detail: bool) -> Vec<Vec<Cell>> {
    let mut month_row = vec![Cell::Empty, Cell::Empty];
    let mut field_row = vec![text("Sezione"), text("Descrizione")];
    let mut total_row = vec![text("Z"), text("TOTALE MNA - MARGINE NETTO DI AREA")];
    let mut mna_row = vec![text("A"), text("MNA - Margine Netto di Area")];
    for month in 1..=12 {
        month_row.push(num(month as f64));
        field_row.push(text("Importo"));
        total_row.push(num(10_000.0));
        mna_row.push(num(if month <= 2 { 1000.0 } else { 0.0 }));
    }
    let mut rows = vec![
        vec![text("Sum of Importo")],
        Vec::new(),
        month_row,
        field_row,
        vec![text("A"), text("Ricavi")],
        total_row,
    ];
    if detail {
        rows.push(mna_row);
    }
    rows
}

/// CORE rows for EDAC_001 (months 1, 2) and EDAC_002 (month 1, no bonus).
fn obiettivo_rows() -> Vec<Vec<Cell>> {
    let mut rows = vec![vec![text("Sum of Obiettivoprev")]];
    rows.extend(std::iter::repeat(Vec::new()).take(4));
    for (office, month, production, collected) in [
        ("EDAC_001", 1.0, 200.0, 190.0),
        ("EDAC_001", 2.0, 200.0, 100.0),
        ("EDAC_002", 1.0, 0.0, 0.0),
    ] {
        let mut row = vec![Cell::Empty; 25];
        row[0] = text(office);
        row[2] = num(2024.0);
        row[3] = num(month);
        row[6] = text("CORE");
        row[16] = num(production);
        row[20] = num(production);
        row[24] = num(collected);
        rows.push(row);
    }
    rows
}

struct Fixture {
    dir: TempDir,
    paths: InputPaths,
}

fn fixture(detail_margin_row: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let paths = InputPaths {
        premi: dir.path().join("premi.xlsx"),
        importo: dir.path().join("importo.xlsx"),
        obiettivo: dir.path().join("obiettivo.xlsx"),
    };
    write_xlsx(&paths.premi, &premi_rows());
    write_xlsx(&paths.importo, &importo_rows(detail_margin_row));
    write_xlsx(&paths.obiettivo, &obiettivo_rows());
    Fixture { dir, paths }
}

fn options(dir: &Path) -> RunOptions {
    RunOptions {
        config: ReconConfig::default(),
        output: OutputTarget::Dir(dir.to_path_buf()),
    }
}

fn xlsx_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with("confronto_"))
        .collect();
    files.sort();
    files
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn full_run_writes_report() {
    let fx = fixture(true);
    let summary = run_files(&fx.paths, &options(fx.dir.path())).unwrap();

    assert_eq!(summary.output, fx.dir.path().join("confronto_multi_ra_mna.xlsx"));
    assert_eq!(summary.label, OfficeLabel::Multi);
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.offices, 2);
    assert_eq!(summary.offices_without_bonus, vec!["EDAC_002".to_string()]);
    assert!(summary.warnings.is_empty());
    assert!((summary.totals.legacy_core - 150.0).abs() < 1e-9);

    let report = load_grid(&summary.output).unwrap();
    let headers: Vec<_> = report.row(0).iter().map(|c| c.label().into_owned()).collect();
    assert_eq!(headers[0], "Anno");
    assert_eq!(headers[12], "Δ core");
    assert_eq!(report.len(), 4);

    // (2024, 1, EDAC_001), (2024, 1, EDAC_002), (2024, 2, EDAC_001)
    assert_eq!(report.cell(1, 2).label(), "EDAC_001");
    assert_eq!(report.cell(2, 2).label(), "EDAC_002");
    assert_eq!(report.cell(3, 1).as_integer(), Some(2));

    // EDAC_001 January: ratio 0.95, K 1, addon 5, legacy core 100
    assert_eq!(report.cell(1, 7).as_number(), Some(0.95));
    assert_eq!(report.cell(1, 8).as_number(), Some(1.0));
    assert_eq!(report.cell(1, 9).as_number(), Some(5.0));
    assert_eq!(report.cell(1, 10).as_number(), Some(100.0));

    // EDAC_002 has no production: ratio and K are blank
    assert!(report.cell(2, 7).is_empty());
    assert!(report.cell(2, 8).is_empty());
}

#[test]
fn single_office_names_the_file() {
    let fx = fixture(true);
    let mut rows = obiettivo_rows();
    rows.pop();
    write_xlsx(&fx.paths.obiettivo, &rows);

    let summary = run_files(&fx.paths, &options(fx.dir.path())).unwrap();
    assert_eq!(summary.label, OfficeLabel::Single("EDAC_001".into()));
    assert!(summary.output.ends_with("confronto_EDAC_001_ra_mna.xlsx"));
    assert!(summary.output.exists());
}

#[test]
fn explicit_output_path_is_used() {
    let fx = fixture(true);
    let target = fx.dir.path().join("custom.xlsx");
    let opts = RunOptions { output: OutputTarget::File(target.clone()), ..options(fx.dir.path()) };

    let summary = run_files(&fx.paths, &opts).unwrap();
    assert_eq!(summary.output, target);
    assert!(target.exists());
    assert!(!fx.dir.path().join("custom.xlsx.tmp").exists());
}

#[test]
fn total_fallback_warns_by_default() {
    let fx = fixture(false);
    let summary = run_files(&fx.paths, &options(fx.dir.path())).unwrap();
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.warnings[0].contains("TOTALE"), "{:?}", summary.warnings);
}

#[test]
fn total_fallback_fails_in_strict_mode() {
    let fx = fixture(false);
    let mut opts = options(fx.dir.path());
    opts.config.strict_margin_row = true;

    let err = run_files(&fx.paths, &opts).unwrap_err();
    assert!(matches!(err, ReconError::SuspectMarginRow { .. }), "{err}");
    assert!(xlsx_files(fx.dir.path()).is_empty());
}

#[test]
fn validation_failure_writes_nothing() {
    let fx = fixture(true);
    let mut rows = importo_rows(true);
    // drop the July column
    for row in rows.iter_mut() {
        if row.len() > 8 {
            row[8] = Cell::Empty;
        }
    }
    write_xlsx(&fx.paths.importo, &rows);

    let err = run_files(&fx.paths, &options(fx.dir.path())).unwrap_err();
    assert!(err.to_string().contains("missing month(s): 7 "), "{err}");
    assert!(xlsx_files(fx.dir.path()).is_empty());
}

#[test]
fn unreadable_input_names_its_kind() {
    let fx = fixture(true);
    std::fs::write(&fx.paths.obiettivo, b"plain text, not a workbook").unwrap();

    let err = run_files(&fx.paths, &options(fx.dir.path())).unwrap_err();
    match &err {
        ReconError::UnreadableFile { input, .. } => {
            assert_eq!(*input, Some(confronto_recon::InputKind::Obiettivoprev));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_output_dir_is_a_write_error() {
    let fx = fixture(true);
    let err = run_files(&fx.paths, &options(&fx.dir.path().join("nope"))).unwrap_err();
    assert!(matches!(err, ReconError::ReportWrite(_)), "{err}");
}
