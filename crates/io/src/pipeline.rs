//! End-to-end run: load → validate → extract → reconcile → report.

use std::path::{Path, PathBuf};
use std::thread;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use confronto_recon::extract::{extract_mna_by_month, extract_obiettivo, extract_premi_mensili};
use confronto_recon::model::MarginRowChoice;
use confronto_recon::validate::validate;
use confronto_recon::{engine, Grid, InputKind, OfficeLabel, ReconConfig, ReconError, ReconInput};

use crate::load::load_grid;
use crate::naming::report_file_name;
use crate::report::write_report;
use crate::ENGINE_VERSION;

/// The three files of one run.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub premi: PathBuf,
    pub importo: PathBuf,
    pub obiettivo: PathBuf,
}

impl InputPaths {
    pub fn get(&self, kind: InputKind) -> &Path {
        match kind {
            InputKind::PremiMensili => &self.premi,
            InputKind::SumImporto => &self.importo,
            InputKind::Obiettivoprev => &self.obiettivo,
        }
    }
}

/// Where the report goes.
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// Directory receiving the generated file name.
    Dir(PathBuf),
    /// Exact file path.
    File(PathBuf),
}

impl Default for OutputTarget {
    fn default() -> Self {
        OutputTarget::Dir(PathBuf::from("."))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: ReconConfig,
    pub output: OutputTarget,
}

/// Money totals across every output row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunTotals {
    pub legacy_core: f64,
    pub new_premium: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_at: DateTime<Utc>,
    pub engine_version: &'static str,
    pub output: PathBuf,
    pub label: OfficeLabel,
    pub rows: usize,
    pub offices: usize,
    pub offices_without_bonus: Vec<String>,
    pub totals: RunTotals,
    pub warnings: Vec<String>,
}

impl RunSummary {
    /// One line for stderr.
    pub fn human_line(&self) -> String {
        let mut line = format!(
            "wrote {} ({} row(s), {} office(s)); legacy core {:.2}, new premium {:.2}, delta {:.2}",
            self.output.display(),
            self.rows,
            self.offices,
            self.totals.legacy_core,
            self.totals.new_premium,
            self.totals.delta,
        );
        if !self.offices_without_bonus.is_empty() {
            line.push_str(&format!("; {} office(s) without bonus data", self.offices_without_bonus.len()));
        }
        if !self.warnings.is_empty() {
            line.push_str(&format!("; {} warning(s)", self.warnings.len()));
        }
        line
    }
}

/// Decode the three inputs concurrently, one scoped thread each.
/// Results come back in [`InputKind::ALL`] order.
pub fn load_all(paths: &InputPaths) -> Result<[Grid; 3], ReconError> {
    let results: [Result<Grid, ReconError>; 3] = thread::scope(|scope| {
        let handles = InputKind::ALL.map(|kind| {
            let path = paths.get(kind);
            (kind, scope.spawn(move || load_grid(path)))
        });

        handles.map(|(kind, handle)| {
            let loaded = handle.join().unwrap_or_else(|_| {
                Err(ReconError::UnreadableFile {
                    input: None,
                    path: paths.get(kind).display().to_string(),
                    reason: "loader thread panicked".into(),
                })
            });
            loaded.map_err(|e| e.for_input(kind))
        })
    });

    let [premi, importo, obiettivo] = results;
    Ok([premi?, importo?, obiettivo?])
}

/// Full run. Nothing is written unless every step succeeds.
pub fn run_files(paths: &InputPaths, options: &RunOptions) -> Result<RunSummary, ReconError> {
    let config = &options.config;
    let [premi, importo, obiettivo] = load_all(paths)?;
    info!("loaded {} + {} + {} row(s)", premi.len(), importo.len(), obiettivo.len());

    validate(InputKind::PremiMensili, &premi)?;
    validate(InputKind::SumImporto, &importo)?;
    validate(InputKind::Obiettivoprev, &obiettivo)?;

    let mut warnings = Vec::new();
    let margin = extract_mna_by_month(&importo)?;
    if margin.choice == MarginRowChoice::TotalFallback {
        if config.strict_margin_row {
            return Err(ReconError::SuspectMarginRow { label: margin.label });
        }
        warnings.push(format!(
            "{}: no detail MNA row, used total row {} ('{}')",
            InputKind::SumImporto,
            margin.row + 1,
            margin.label
        ));
    }

    let input = ReconInput {
        bonuses: extract_premi_mensili(&premi)?,
        objectives: extract_obiettivo(&obiettivo),
        margins: margin.margins,
    };
    let recon = engine::run(config, &input)?;

    let output = match &options.output {
        OutputTarget::File(path) => path.clone(),
        OutputTarget::Dir(dir) => {
            if !dir.is_dir() {
                return Err(ReconError::ReportWrite(format!("{} is not a directory", dir.display())));
            }
            dir.join(report_file_name(&recon.label))
        }
    };
    write_report(&recon, &config.report, &output)?;
    info!("report written to {}", output.display());

    for office in &recon.offices_without_bonus {
        warn!("{office}: no bonus record, legacy core taken as 0");
    }

    let totals = recon.rows.iter().fold(RunTotals::default(), |mut acc, row| {
        acc.legacy_core += row.legacy_core;
        acc.new_premium += row.new_premium;
        acc.delta += row.delta;
        acc
    });

    Ok(RunSummary {
        run_at: Utc::now(),
        engine_version: ENGINE_VERSION,
        output,
        rows: recon.rows.len(),
        offices: recon.offices().len(),
        label: recon.label,
        offices_without_bonus: recon.offices_without_bonus,
        totals,
        warnings,
    })
}
