//! Extractors: turn a validated grid into typed records.
//!
//! All three are pure functions of the grid. Sentinel rows are located by
//! value through [`require_sentinel`], never by fixed coordinates.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::error::ReconError;
use crate::grid::{starts_with_ignore_case, Grid};
use crate::layout::*;
use crate::model::{
    InputKind, MarginExtraction, MarginRowChoice, MonthlyMargin, ObjectiveKey, ObjectiveRecord,
    OfficeMonthlyBonus,
};

// ---------------------------------------------------------------------------
// Shared primitives
// ---------------------------------------------------------------------------

/// Locate the row whose first column equals `sentinel`. The row above it
/// holds the month headers, so a sentinel on row 0 is as bad as none.
pub fn require_sentinel(grid: &Grid, input: InputKind, sentinel: &str) -> Result<usize, ReconError> {
    match grid.find_row(0, sentinel) {
        Some(0) => Err(ReconError::validation(
            input,
            format!("sentinel row '{sentinel}' is on the first row; the month header row above it is missing"),
        )),
        Some(row) => {
            debug!("{input}: sentinel '{sentinel}' at row {}", row + 1);
            Ok(row)
        }
        None => Err(ReconError::validation(
            input,
            format!("no row with '{sentinel}' in the first column"),
        )),
    }
}

/// Month blocks of the bonus report as `(month, start_col)`, left to right.
/// Only integers in 1–12 open a block; a year or total column does not.
pub(crate) fn premi_month_blocks(grid: &Grid, header_row: usize) -> Vec<(u32, usize)> {
    grid.row(header_row)
        .iter()
        .enumerate()
        .filter_map(|(col, cell)| {
            let month = u32::try_from(cell.as_integer()?).ok()?;
            MONTHS.contains(&month).then_some((month, col))
        })
        .collect()
}

/// Importo value columns of the margin report as `(col, header_integer)`.
///
/// The integer is whatever the month-header row holds; callers decide what
/// to do with values outside 1–12.
pub(crate) fn importo_month_columns(grid: &Grid, field_row: usize) -> Vec<(usize, i64)> {
    let Some(month_row) = field_row.checked_sub(1) else {
        return Vec::new();
    };
    let width = grid.row(field_row).len();
    (IMPORTO_FIRST_VALUE_COL..width)
        .filter(|&col| {
            grid.cell(field_row, col)
                .label()
                .to_lowercase()
                .starts_with(IMPORTO_FIELD_PREFIX)
        })
        .filter_map(|col| Some((col, grid.cell(month_row, col).as_integer()?)))
        .collect()
}

/// Rows whose label column mentions the MNA marker, in grid order.
pub(crate) fn mna_candidates(grid: &Grid) -> Vec<usize> {
    (0..grid.len())
        .filter(|&r| {
            grid.cell(r, IMPORTO_LABEL_COL)
                .label()
                .to_uppercase()
                .contains(MNA_MARKER)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Premi_Mensili_x_Sede
// ---------------------------------------------------------------------------

/// Where the row walk stands with respect to office blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OfficeCursor {
    NoOffice,
    InOffice(String),
}

/// First-column classification of a bonus-report row.
#[derive(Debug, PartialEq, Eq)]
enum PremiLine<'a> {
    OfficeHeader(&'a str),
    AreaManagers,
    Other,
}

impl<'a> PremiLine<'a> {
    fn classify(label: &'a str) -> Self {
        if starts_with_ignore_case(label, OFFICE_PREFIX) {
            Self::OfficeHeader(label)
        } else if label == AREA_MANAGERS_LABEL {
            Self::AreaManagers
        } else {
            Self::Other
        }
    }
}

impl OfficeCursor {
    /// Office headers always (re)open a block; nothing else changes state.
    fn step(self, line: &PremiLine<'_>) -> Self {
        match line {
            PremiLine::OfficeHeader(office) => Self::InOffice((*office).to_string()),
            _ => self,
        }
    }

    fn office(&self) -> Option<&str> {
        match self {
            Self::InOffice(office) => Some(office),
            Self::NoOffice => None,
        }
    }
}

/// Parse the bonus report into one record per office and month block.
pub fn extract_premi_mensili(grid: &Grid) -> Result<Vec<OfficeMonthlyBonus>, ReconError> {
    let input = InputKind::PremiMensili;
    let sentinel = require_sentinel(grid, input, PREMI_SENTINEL)?;
    let blocks = premi_month_blocks(grid, sentinel - 1);
    debug!("{input}: {} month block(s) in header row {}", blocks.len(), sentinel);

    let mut records = Vec::new();
    let mut cursor = OfficeCursor::NoOffice;

    for r in sentinel + 1..grid.len() {
        let label = grid.cell(r, 0).label();
        let line = PremiLine::classify(&label);
        cursor = cursor.step(&line);

        if line != PremiLine::AreaManagers {
            continue;
        }
        let Some(office) = cursor.office() else {
            debug!("{input}: row {} has '{AREA_MANAGERS_LABEL}' outside any office block, skipped", r + 1);
            continue;
        };

        for &(month, col) in &blocks {
            let addon = grid.cell(r, col + PREMI_ADDON_OFFSET).as_number().unwrap_or(0.0);
            let final_premium = grid.cell(r, col + PREMI_FINAL_OFFSET).as_number().unwrap_or(0.0);
            records.push(OfficeMonthlyBonus {
                office: office.to_string(),
                month,
                addon,
                legacy_core: final_premium - addon,
            });
        }
    }

    debug!("{input}: extracted {} bonus record(s)", records.len());
    Ok(records)
}

// ---------------------------------------------------------------------------
// Sum_of_Obiettivoprev
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ObjectiveTotals {
    production: f64,
    billed: f64,
    collected: f64,
}

/// Sum CORE objective rows per (office, year, month).
///
/// Rows with another category, a blank office, or a year/month that is not a
/// non-zero whole number are dropped. Output is sorted by key.
pub fn extract_obiettivo(grid: &Grid) -> Vec<ObjectiveRecord> {
    let mut buckets: BTreeMap<ObjectiveKey, ObjectiveTotals> = BTreeMap::new();
    let mut skipped = 0usize;

    for r in 0..grid.len() {
        let category = grid.cell(r, OBIETTIVO_CATEGORY_COL).label().to_uppercase();
        if category != CORE_CATEGORY {
            continue;
        }

        let office = grid.cell(r, OBIETTIVO_OFFICE_COL).label();
        let year = grid
            .cell(r, OBIETTIVO_YEAR_COL)
            .as_integer()
            .filter(|&y| y != 0)
            .and_then(|y| i32::try_from(y).ok());
        let month = grid
            .cell(r, OBIETTIVO_MONTH_COL)
            .as_integer()
            .and_then(|m| u32::try_from(m).ok())
            .filter(|m| MONTHS.contains(m));

        let (Some(year), Some(month)) = (year, month) else {
            skipped += 1;
            continue;
        };
        if office.is_empty() {
            skipped += 1;
            continue;
        }

        let key = ObjectiveKey { office: office.into_owned(), year, month };
        let totals = buckets.entry(key).or_default();
        totals.production += grid.cell(r, OBIETTIVO_PRODUCTION_COL).as_number().unwrap_or(0.0);
        totals.billed += grid.cell(r, OBIETTIVO_BILLED_COL).as_number().unwrap_or(0.0);
        totals.collected += grid.cell(r, OBIETTIVO_COLLECTED_COL).as_number().unwrap_or(0.0);
    }

    if skipped > 0 {
        debug!("{}: skipped {skipped} CORE row(s) without office/year/month", InputKind::Obiettivoprev);
    }

    buckets
        .into_iter()
        .map(|(key, totals)| ObjectiveRecord {
            office: key.office,
            year: key.year,
            month: key.month,
            production: totals.production,
            billed: totals.billed,
            collected: totals.collected,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sum_of_Importo
// ---------------------------------------------------------------------------

/// Read the monthly MNA figures from the margin report.
///
/// A detail MNA row is preferred over a TOTALE one. When only TOTALE rows
/// exist the first is used and the choice is reported as
/// [`MarginRowChoice::TotalFallback`].
pub fn extract_mna_by_month(grid: &Grid) -> Result<MarginExtraction, ReconError> {
    let input = InputKind::SumImporto;
    let field_row = require_sentinel(grid, input, IMPORTO_SENTINEL)?;

    let candidates = mna_candidates(grid);
    let is_total =
        |r: usize| grid.cell(r, IMPORTO_LABEL_COL).label().to_uppercase().contains(TOTAL_MARKER);

    let (row, choice) = match candidates.iter().copied().find(|&r| !is_total(r)) {
        Some(r) => (r, MarginRowChoice::Detail),
        None => match candidates.first() {
            Some(&r) => (r, MarginRowChoice::TotalFallback),
            None => {
                return Err(ReconError::validation(
                    input,
                    format!("no row mentions '{MNA_MARKER}' in the second column"),
                ))
            }
        },
    };
    let label = grid.cell(row, IMPORTO_LABEL_COL).label().into_owned();
    if choice == MarginRowChoice::TotalFallback {
        warn!("{input}: only total MNA rows found, using row {} ('{label}')", row + 1);
    }

    let mut margins = MonthlyMargin::new();
    for (col, header) in importo_month_columns(grid, field_row) {
        match u32::try_from(header).ok().filter(|m| MONTHS.contains(m)) {
            Some(month) => margins.insert(month, grid.cell(row, col).as_number()),
            None => debug!("{input}: column {} has month header {header}, ignored", col + 1),
        }
    }

    debug!("{input}: margin row {} gives {} month(s)", row + 1, margins.len());
    Ok(MarginExtraction { margins, row, label, choice })
}
