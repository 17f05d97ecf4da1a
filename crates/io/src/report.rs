//! XLSX comparison report.
//!
//! The workbook is rendered into memory first and only then written to a
//! temporary file that is renamed into place, so a failed run never leaves a
//! partial report behind.

use std::path::Path;

use log::debug;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};

use confronto_recon::{ComparisonRow, ReconError, Reconciliation, ReportConfig};

const GOOD_FILL: u32 = 0xC6EFCE;
const BAD_FILL: u32 = 0xFFC7CE;

const MIN_WIDTH: usize = 8;
const MAX_WIDTH: usize = 55;
const WIDTH_PADDING: usize = 2;
const OFFICE_MIN_WIDTH: usize = 18;

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Text,
    Currency,
    Percent,
    Coefficient,
}

/// Traffic-light rule for a column. Evaluated only on finite values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillRule {
    None,
    /// Green above zero, red otherwise.
    Positive,
    /// Green at or above the configured threshold, red otherwise.
    RatioThreshold,
    /// Green above zero, no red.
    PositiveOnly,
}

struct Column {
    header: &'static str,
    kind: ColumnKind,
    fill: FillRule,
}

const fn col(header: &'static str, kind: ColumnKind, fill: FillRule) -> Column {
    Column { header, kind, fill }
}

const COLUMNS: [Column; 13] = [
    col("Anno", ColumnKind::Integer, FillRule::None),
    col("Mese", ColumnKind::Integer, FillRule::None),
    col("Sede", ColumnKind::Text, FillRule::None),
    col("Prodotto", ColumnKind::Currency, FillRule::None),
    col("Fatturato", ColumnKind::Currency, FillRule::None),
    col("Incassato", ColumnKind::Currency, FillRule::None),
    col("MNA", ColumnKind::Currency, FillRule::Positive),
    col("Inc/Prod", ColumnKind::Percent, FillRule::RatioThreshold),
    col("K", ColumnKind::Coefficient, FillRule::Positive),
    col("Addon", ColumnKind::Currency, FillRule::None),
    col("Vecchio core", ColumnKind::Currency, FillRule::None),
    col("Premio nuovo core", ColumnKind::Currency, FillRule::PositiveOnly),
    col("Δ core", ColumnKind::Currency, FillRule::None),
];

const OFFICE_COL: usize = 2;

/// Header labels in output order.
fn headers() -> impl Iterator<Item = &'static str> {
    COLUMNS.iter().map(|c| c.header)
}

enum Value<'a> {
    Number(Option<f64>),
    Text(&'a str),
}

fn row_values(row: &ComparisonRow) -> [Value<'_>; 13] {
    use Value::{Number, Text};
    [
        Number(Some(row.year as f64)),
        Number(Some(row.month as f64)),
        Text(&row.office),
        Number(Some(row.production)),
        Number(Some(row.billed)),
        Number(Some(row.collected)),
        Number(row.margin),
        Number(row.collection_ratio),
        Number(row.k),
        Number(Some(row.addon)),
        Number(Some(row.legacy_core)),
        Number(Some(row.new_premium)),
        Number(Some(row.delta)),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    None,
    Good,
    Bad,
}

fn fill_for(rule: FillRule, value: f64, ratio_threshold: f64) -> Fill {
    match rule {
        FillRule::None => Fill::None,
        FillRule::Positive if value > 0.0 => Fill::Good,
        FillRule::Positive => Fill::Bad,
        FillRule::RatioThreshold if value >= ratio_threshold => Fill::Good,
        FillRule::RatioThreshold => Fill::Bad,
        FillRule::PositiveOnly if value > 0.0 => Fill::Good,
        FillRule::PositiveOnly => Fill::None,
    }
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

/// Quote a currency symbol for a number format unless it is a plain one.
fn excel_literal_prefix(symbol: &str) -> String {
    if symbol.chars().all(|c| c.is_ascii_alphanumeric() || "$€£¥".contains(c)) {
        symbol.to_string()
    } else {
        format!("\"{}\"", symbol.replace('"', "\"\""))
    }
}

fn num_format(kind: ColumnKind, currency_symbol: &str) -> Option<String> {
    match kind {
        ColumnKind::Integer => Some("0".into()),
        ColumnKind::Text => None,
        ColumnKind::Currency => Some(format!("{} #,##0.00", excel_literal_prefix(currency_symbol))),
        ColumnKind::Percent => Some("0.00%".into()),
        ColumnKind::Coefficient => Some("0.0".into()),
    }
}

/// One format per (column kind, fill) pair actually used.
struct Styles {
    header: Format,
    text: Format,
    integer: Format,
    currency: [Format; 3],
    percent: [Format; 3],
    coefficient: [Format; 3],
}

impl Styles {
    fn new(config: &ReportConfig) -> Self {
        let filled = |kind: ColumnKind| -> [Format; 3] {
            let mut base = Format::new();
            if let Some(code) = num_format(kind, &config.currency_symbol) {
                base = base.set_num_format(&code);
            }
            [
                base.clone(),
                base.clone().set_background_color(Color::RGB(GOOD_FILL)),
                base.set_background_color(Color::RGB(BAD_FILL)),
            ]
        };
        Self {
            header: Format::new().set_bold(),
            text: Format::new(),
            integer: Format::new().set_num_format("0"),
            currency: filled(ColumnKind::Currency),
            percent: filled(ColumnKind::Percent),
            coefficient: filled(ColumnKind::Coefficient),
        }
    }

    fn number(&self, kind: ColumnKind, fill: Fill) -> &Format {
        let i = match fill {
            Fill::None => 0,
            Fill::Good => 1,
            Fill::Bad => 2,
        };
        match kind {
            ColumnKind::Integer => &self.integer,
            ColumnKind::Text => &self.text,
            ColumnKind::Currency => &self.currency[i],
            ColumnKind::Percent => &self.percent[i],
            ColumnKind::Coefficient => &self.coefficient[i],
        }
    }
}

// ---------------------------------------------------------------------------
// Widths
// ---------------------------------------------------------------------------

/// Group digits in threes: 1234567 → "1,234,567".
fn group_thousands(integer: u64) -> String {
    let digits = integer.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Approximation of how Excel displays a value, for width computation.
fn rendered(kind: ColumnKind, value: f64, currency_symbol: &str) -> String {
    match kind {
        ColumnKind::Integer => format!("{value:.0}"),
        ColumnKind::Text => value.to_string(),
        ColumnKind::Currency => {
            let cents = (value.abs() * 100.0).round();
            let units = (cents / 100.0).trunc() as u64;
            let fraction = (cents % 100.0) as u64;
            let sign = if value < 0.0 && cents > 0.0 { "-" } else { "" };
            format!("{sign}{currency_symbol} {}.{fraction:02}", group_thousands(units))
        }
        ColumnKind::Percent => format!("{:.2}%", value * 100.0),
        ColumnKind::Coefficient => format!("{value:.1}"),
    }
}

/// Width per column: widest rendered value or header, clamped to
/// [8, 55], plus padding. The office column never drops below 18.
pub fn column_widths(rows: &[&ComparisonRow], currency_symbol: &str) -> [usize; 13] {
    let mut longest: [usize; 13] = std::array::from_fn(|i| COLUMNS[i].header.chars().count());
    for row in rows {
        for (i, value) in row_values(row).iter().enumerate() {
            let len = match value {
                Value::Text(s) => s.chars().count(),
                Value::Number(Some(n)) if n.is_finite() => {
                    rendered(COLUMNS[i].kind, *n, currency_symbol).chars().count()
                }
                Value::Number(_) => 0,
            };
            longest[i] = longest[i].max(len);
        }
    }
    std::array::from_fn(|i| {
        let width = longest[i].clamp(MIN_WIDTH, MAX_WIDTH) + WIDTH_PADDING;
        if i == OFFICE_COL {
            width.max(OFFICE_MIN_WIDTH)
        } else {
            width
        }
    })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the comparison workbook into an xlsx byte buffer.
pub fn render_report(recon: &Reconciliation, config: &ReportConfig) -> Result<Vec<u8>, ReconError> {
    let mut rows: Vec<&ComparisonRow> = recon.rows.iter().collect();
    rows.sort_by(|a, b| {
        (a.year, a.month, a.office.as_str()).cmp(&(b.year, b.month, b.office.as_str()))
    });

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    fill_sheet(worksheet, &rows, config).map_err(report_error)?;

    let bytes = workbook.save_to_buffer().map_err(report_error)?;
    debug!("rendered report: {} row(s), {} byte(s)", rows.len(), bytes.len());
    Ok(bytes)
}

fn fill_sheet(worksheet: &mut Worksheet, rows: &[&ComparisonRow], config: &ReportConfig) -> Result<(), XlsxError> {
    let styles = Styles::new(config);
    worksheet.set_name(config.sheet_name.trim())?;

    for (c, header) in headers().enumerate() {
        worksheet.write_string_with_format(0, c as u16, header, &styles.header)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let xl_row = r as u32 + 1;
        for (c, value) in row_values(row).iter().enumerate() {
            let column = &COLUMNS[c];
            match value {
                Value::Text(s) => {
                    worksheet.write_string_with_format(xl_row, c as u16, *s, &styles.text)?;
                }
                // Null and non-finite values stay blank
                Value::Number(Some(n)) if n.is_finite() => {
                    let fill = fill_for(column.fill, *n, config.ratio_green_threshold);
                    worksheet.write_number_with_format(xl_row, c as u16, *n, styles.number(column.kind, fill))?;
                }
                Value::Number(_) => {}
            }
        }
    }

    for (c, width) in column_widths(rows, &config.currency_symbol).iter().enumerate() {
        worksheet.set_column_width(c as u16, *width as f64)?;
    }
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn report_error(e: XlsxError) -> ReconError {
    ReconError::ReportWrite(e.to_string())
}

/// Render, then write to `path` through a temporary sibling file.
pub fn write_report(recon: &Reconciliation, config: &ReportConfig, path: &Path) -> Result<(), ReconError> {
    let bytes = render_report(recon, config)?;

    let tmp_path = path.with_extension("xlsx.tmp");
    std::fs::write(&tmp_path, &bytes)
        .map_err(|e| ReconError::ReportWrite(format!("{}: {e}", tmp_path.display())))?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ReconError::ReportWrite(format!("{}: {e}", path.display())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use confronto_recon::OfficeLabel;

    fn row(office: &str, month: u32) -> ComparisonRow {
        ComparisonRow {
            year: 2024,
            month,
            office: office.into(),
            production: 1000.0,
            billed: 900.0,
            collected: 850.0,
            margin: Some(1234.5),
            collection_ratio: Some(0.85),
            k: Some(0.8),
            addon: 10.0,
            legacy_core: 90.0,
            new_base: 50.0,
            new_premium: 40.0,
            delta: -50.0,
        }
    }

    #[test]
    fn headers_in_order() {
        let all: Vec<_> = headers().collect();
        assert_eq!(all.len(), 13);
        assert_eq!(all[0], "Anno");
        assert_eq!(all[7], "Inc/Prod");
        assert_eq!(all[12], "Δ core");
    }

    #[test]
    fn fill_rules() {
        assert_eq!(fill_for(FillRule::Positive, 1.0, 0.7), Fill::Good);
        assert_eq!(fill_for(FillRule::Positive, 0.0, 0.7), Fill::Bad);
        assert_eq!(fill_for(FillRule::RatioThreshold, 0.7, 0.7), Fill::Good);
        assert_eq!(fill_for(FillRule::RatioThreshold, 0.69, 0.7), Fill::Bad);
        assert_eq!(fill_for(FillRule::PositiveOnly, 5.0, 0.7), Fill::Good);
        assert_eq!(fill_for(FillRule::PositiveOnly, -5.0, 0.7), Fill::None);
        assert_eq!(fill_for(FillRule::None, 5.0, 0.7), Fill::None);
    }

    #[test]
    fn currency_rendering() {
        assert_eq!(rendered(ColumnKind::Currency, 1234567.891, "€"), "€ 1,234,567.89");
        assert_eq!(rendered(ColumnKind::Currency, -5.0, "€"), "-€ 5.00");
        assert_eq!(rendered(ColumnKind::Percent, 0.8512, "€"), "85.12%");
        assert_eq!(rendered(ColumnKind::Coefficient, 0.5, "€"), "0.5");
    }

    #[test]
    fn widths_are_clamped_and_padded() {
        let mut long = row(&"X".repeat(80), 1);
        long.production = 1e12;
        let short = row("A", 2);
        let widths = column_widths(&[&long, &short], "€");
        // "Anno" is 4, "2024" is 4 → floor 8
        assert_eq!(widths[0], 10);
        assert_eq!(widths[2], 57);
        // "€ 1,000,000,000,000.00" is 22
        assert_eq!(widths[3], 24);
        // "Premio nuovo core" is the longest text in its column
        assert_eq!(widths[11], 19);

        let widths = column_widths(&[&short], "€");
        assert_eq!(widths[2], OFFICE_MIN_WIDTH);
    }

    #[test]
    fn renders_xlsx_bytes() {
        let recon = Reconciliation {
            rows: vec![row("EDAC_001", 2), row("EDAC_001", 1)],
            label: OfficeLabel::Single("EDAC_001".into()),
            offices_without_bonus: Vec::new(),
        };
        let bytes = render_report(&recon, &ReportConfig::default()).unwrap();
        // zip magic
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn header_row_reads_back_in_column_order() {
        let recon = Reconciliation {
            rows: vec![row("EDAC_001", 1)],
            label: OfficeLabel::Single("EDAC_001".into()),
            offices_without_bonus: Vec::new(),
        };
        let bytes = render_report(&recon, &ReportConfig::default()).unwrap();
        let grid = crate::load::load_grid_from_bytes("report.xlsx", &bytes).unwrap();

        let written: Vec<_> = grid.row(0).iter().map(|c| c.label().into_owned()).collect();
        assert_eq!(written, headers().collect::<Vec<_>>());
        assert_eq!(grid.cell(1, OFFICE_COL).label(), "EDAC_001");
    }

    #[test]
    fn bad_sheet_name_is_a_write_error() {
        let recon = Reconciliation {
            rows: Vec::new(),
            label: OfficeLabel::Multi,
            offices_without_bonus: Vec::new(),
        };
        let config = ReportConfig { sheet_name: "a[b]".into(), ..ReportConfig::default() };
        let err = render_report(&recon, &config).unwrap_err();
        assert!(matches!(err, ReconError::ReportWrite(_)), "{err}");
    }
}
