//! Fixed labels and coordinates of the three input report shapes.

/// Every input must have more rows than this.
pub const MIN_ROWS_EXCLUSIVE: usize = 5;

// Premi_Mensili_x_Sede

/// First-column sentinel of the field-header row; month headers sit above it.
pub const PREMI_SENTINEL: &str = "Rows";
/// Prefix of the label that opens an office block (case-insensitive).
pub const OFFICE_PREFIX: &str = "EDAC_";
/// Sub-label of the per-office line carrying the monthly figures.
pub const AREA_MANAGERS_LABEL: &str = "responsabili_area";
/// Offset of the addon column within a month block.
pub const PREMI_ADDON_OFFSET: usize = 1;
/// Offset of the final premium (post negative balance) within a month block.
pub const PREMI_FINAL_OFFSET: usize = 2;

// Sum_of_Obiettivoprev

pub const OBIETTIVO_OFFICE_COL: usize = 0;
pub const OBIETTIVO_YEAR_COL: usize = 2;
pub const OBIETTIVO_MONTH_COL: usize = 3;
pub const OBIETTIVO_CATEGORY_COL: usize = 6;
pub const OBIETTIVO_PRODUCTION_COL: usize = 16;
pub const OBIETTIVO_BILLED_COL: usize = 20;
pub const OBIETTIVO_COLLECTED_COL: usize = 24;
/// The only category kept.
pub const CORE_CATEGORY: &str = "CORE";
/// Width check only looks at the top of the sheet.
pub const OBIETTIVO_WIDTH_SCAN_ROWS: usize = 80;
/// Minimum width: the collected column must exist.
pub const OBIETTIVO_MIN_WIDTH: usize = OBIETTIVO_COLLECTED_COL + 1;

// Sum_of_Importo

/// First-column sentinel of the field-header row; month headers sit above it.
pub const IMPORTO_SENTINEL: &str = "Sezione";
/// Column holding the section description.
pub const IMPORTO_LABEL_COL: usize = 1;
/// Value columns start here.
pub const IMPORTO_FIRST_VALUE_COL: usize = 2;
/// Lowercase prefix of a value column's field header.
pub const IMPORTO_FIELD_PREFIX: &str = "importo";
/// Uppercase marker of the net-margin row.
pub const MNA_MARKER: &str = "MNA - MARGINE NETTO DI AREA";
/// Uppercase marker of aggregate rows.
pub const TOTAL_MARKER: &str = "TOTALE";

/// Valid calendar months.
pub const MONTHS: std::ops::RangeInclusive<u32> = 1..=12;
