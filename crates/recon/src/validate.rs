//! Structural pre-checks, one per input kind.
//!
//! Validators never extract anything; they only assert the layout the
//! extractors rely on so that a wrong file fails with a specific message.

use std::collections::BTreeSet;

use crate::error::ReconError;
use crate::extract::{importo_month_columns, mna_candidates, require_sentinel};
use crate::grid::{starts_with_ignore_case, Grid};
use crate::layout::*;
use crate::model::InputKind;

/// Run the validator for `kind`.
pub fn validate(kind: InputKind, grid: &Grid) -> Result<(), ReconError> {
    match kind {
        InputKind::PremiMensili => validate_premi(grid),
        InputKind::SumImporto => validate_sum_importo(grid),
        InputKind::Obiettivoprev => validate_obiettivo(grid),
    }
}

fn require_min_rows(grid: &Grid, input: InputKind) -> Result<(), ReconError> {
    if grid.len() <= MIN_ROWS_EXCLUSIVE {
        return Err(ReconError::validation(
            input,
            format!(
                "sheet has {} row(s); more than {MIN_ROWS_EXCLUSIVE} expected",
                grid.len()
            ),
        ));
    }
    Ok(())
}

/// `Premi_Mensili_x_Sede`: `Rows` sentinel with a header row above it, and
/// below it at least one office block and one `responsabili_area` line.
pub fn validate_premi(grid: &Grid) -> Result<(), ReconError> {
    let input = InputKind::PremiMensili;
    require_min_rows(grid, input)?;
    let sentinel = require_sentinel(grid, input, PREMI_SENTINEL)?;

    let labels: Vec<_> = (sentinel + 1..grid.len()).map(|r| grid.cell(r, 0).label()).collect();

    if !labels.iter().any(|l| starts_with_ignore_case(l, OFFICE_PREFIX)) {
        return Err(ReconError::validation(
            input,
            format!("no office rows ('{OFFICE_PREFIX}...') below the '{PREMI_SENTINEL}' row"),
        ));
    }
    if !labels.iter().any(|l| l == AREA_MANAGERS_LABEL) {
        return Err(ReconError::validation(
            input,
            format!("no '{AREA_MANAGERS_LABEL}' rows below the '{PREMI_SENTINEL}' row"),
        ));
    }
    Ok(())
}

/// `Sum_of_Obiettivoprev`: wide enough to hold the collected column and
/// carrying at least one CORE row.
pub fn validate_obiettivo(grid: &Grid) -> Result<(), ReconError> {
    let input = InputKind::Obiettivoprev;
    require_min_rows(grid, input)?;

    let width = grid.max_width(OBIETTIVO_WIDTH_SCAN_ROWS);
    if width < OBIETTIVO_MIN_WIDTH {
        return Err(ReconError::validation(
            input,
            format!(
                "widest of the first {OBIETTIVO_WIDTH_SCAN_ROWS} rows has {width} column(s); at least {OBIETTIVO_MIN_WIDTH} expected"
            ),
        ));
    }

    let has_core = (0..grid.len()).any(|r| {
        grid.cell(r, OBIETTIVO_CATEGORY_COL).label().to_uppercase() == CORE_CATEGORY
    });
    if !has_core {
        return Err(ReconError::validation(
            input,
            format!(
                "no '{CORE_CATEGORY}' rows in column {}",
                OBIETTIVO_CATEGORY_COL + 1
            ),
        ));
    }
    Ok(())
}

/// `Sum_of_Importo`: `Sezione` sentinel, an MNA row, and Importo columns
/// covering every month 1–12. A yearly-total export fails the last check.
pub fn validate_sum_importo(grid: &Grid) -> Result<(), ReconError> {
    let input = InputKind::SumImporto;
    require_min_rows(grid, input)?;
    let field_row = require_sentinel(grid, input, IMPORTO_SENTINEL)?;

    if mna_candidates(grid).is_empty() {
        return Err(ReconError::validation(
            input,
            format!(
                "no row mentions '{MNA_MARKER}' in column {}",
                IMPORTO_LABEL_COL + 1
            ),
        ));
    }

    let found: BTreeSet<u32> = importo_month_columns(grid, field_row)
        .into_iter()
        .filter_map(|(_, header)| u32::try_from(header).ok())
        .filter(|m| MONTHS.contains(m))
        .collect();
    let missing: Vec<String> = MONTHS
        .filter(|m| !found.contains(m))
        .map(|m| m.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ReconError::validation(
            input,
            format!(
                "Importo columns are not split by month; missing month(s): {} (a yearly total export was probably uploaded)",
                missing.join(", ")
            ),
        ));
    }
    Ok(())
}
