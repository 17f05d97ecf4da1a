use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Input kinds
// ---------------------------------------------------------------------------

/// The three report shapes the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// `Premi_Mensili_x_Sede`: bonus breakdown per office and month.
    PremiMensili,
    /// `Sum_of_Importo`: month-split margin report.
    SumImporto,
    /// `Sum_of_Obiettivoprev`: objective/production report.
    Obiettivoprev,
}

impl InputKind {
    /// Fixed validation order for a full run.
    pub const ALL: [InputKind; 3] = [Self::PremiMensili, Self::SumImporto, Self::Obiettivoprev];

    /// Name of the export as users know it.
    pub fn report_name(&self) -> &'static str {
        match self {
            Self::PremiMensili => "Premi_Mensili_x_Sede",
            Self::SumImporto => "Sum_of_Importo",
            Self::Obiettivoprev => "Sum_of_Obiettivoprev",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.report_name())
    }
}

// ---------------------------------------------------------------------------
// Extracted records
// ---------------------------------------------------------------------------

/// One `responsabili_area` line of the bonus report, for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfficeMonthlyBonus {
    pub office: String,
    pub month: u32,
    pub addon: f64,
    /// Final premium after negative balance, minus addon.
    pub legacy_core: f64,
}

/// Aggregation key for objective rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectiveKey {
    pub office: String,
    pub year: i32,
    pub month: u32,
}

/// CORE objective figures summed per (office, year, month).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveRecord {
    pub office: String,
    pub year: i32,
    pub month: u32,
    pub production: f64,
    pub billed: f64,
    pub collected: f64,
}

/// Organization-wide net margin (MNA) per month.
///
/// A month present with `None` had an Importo column but no numeric value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyMargin {
    values: BTreeMap<u32, Option<f64>>,
}

impl MonthlyMargin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value for `month`; later columns for the same month win.
    pub fn insert(&mut self, month: u32, value: Option<f64>) {
        self.values.insert(month, value);
    }

    /// Margin for `month`, or `None` if absent or blank.
    pub fn get(&self, month: u32) -> Option<f64> {
        self.values.get(&month).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(u32, Option<f64>)> for MonthlyMargin {
    fn from_iter<I: IntoIterator<Item = (u32, Option<f64>)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

/// Which candidate row the margin figures came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginRowChoice {
    /// A detail MNA row (label without "TOTALE").
    Detail,
    /// Only TOTALE rows matched; the first one was used.
    TotalFallback,
}

/// Output of the margin extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginExtraction {
    pub margins: MonthlyMargin,
    /// Grid row the values were read from.
    pub row: usize,
    /// Label of that row, trimmed.
    pub label: String,
    pub choice: MarginRowChoice,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Pre-extracted records for one run.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub bonuses: Vec<OfficeMonthlyBonus>,
    pub objectives: Vec<ObjectiveRecord>,
    pub margins: MonthlyMargin,
}

/// Legacy-versus-new comparison for one (office, year, month).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub year: i32,
    pub month: u32,
    pub office: String,
    pub production: f64,
    pub billed: f64,
    pub collected: f64,
    pub margin: Option<f64>,
    /// `collected / production`, clamped to [0, 1]; `None` without production.
    pub collection_ratio: Option<f64>,
    /// Tier coefficient; `None` exactly when the ratio is `None`.
    pub k: Option<f64>,
    pub addon: f64,
    pub legacy_core: f64,
    pub new_base: f64,
    pub new_premium: f64,
    /// `new_premium - legacy_core`.
    pub delta: f64,
}

/// Which offices a result covers; drives the output file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "office", rename_all = "snake_case")]
pub enum OfficeLabel {
    Single(String),
    Multi,
}

impl OfficeLabel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Single(office) => office,
            Self::Multi => "multi",
        }
    }
}

impl fmt::Display for OfficeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    /// Sorted by (year, month, office).
    pub rows: Vec<ComparisonRow>,
    pub label: OfficeLabel,
    /// Offices in the objective data with no bonus record at all.
    pub offices_without_bonus: Vec<String>,
}

impl Reconciliation {
    /// Distinct offices, sorted.
    pub fn offices(&self) -> Vec<&str> {
        let mut offices: Vec<&str> = self.rows.iter().map(|r| r.office.as_str()).collect();
        offices.sort_unstable();
        offices.dedup();
        offices
    }
}
