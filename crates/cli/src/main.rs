// Confronto CLI - RA bonus comparison (legacy core vs margin-based premium)

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, SystemTime};

use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use confronto_io::{
    precheck, run_files, InputPaths, OutputTarget, PrecheckReport, PrecheckSequence, PrecheckStatus, RunOptions,
};
use confronto_recon::{InputKind, ReconConfig, ReconError};

use exit_codes::{
    recon_exit_code, ErrorOutput, EXIT_CONFIG, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE, EXIT_VALIDATION,
};

#[derive(Parser)]
#[command(name = "confronto")]
#[command(about = "Compare legacy RA bonuses with the margin-based premium")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, reconcile and write the comparison workbook
    #[command(after_help = "\
Examples:
  confronto run --premi premi.xlsx --importo importo.xlsx --obiettivo obiettivo.xlsx
  confronto run --premi p.xlsx --importo i.xlsx --obiettivo o.xlsx --output-dir out/ --json
  CONFRONTO_CONFIG=formula.toml confronto run --premi p.xlsx --importo i.xlsx --obiettivo o.xlsx")]
    Run {
        /// Premi_Mensili_x_Sede export
        #[arg(long)]
        premi: PathBuf,

        /// Sum_of_Importo export (split by month)
        #[arg(long)]
        importo: PathBuf,

        /// Sum_of_Obiettivoprev export
        #[arg(long)]
        obiettivo: PathBuf,

        /// Directory for the generated file (default: current directory)
        #[arg(long, conflicts_with = "output")]
        output_dir: Option<PathBuf>,

        /// Exact output file path
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// TOML file overriding formula and report constants
        #[arg(long, env = "CONFRONTO_CONFIG")]
        config: Option<PathBuf>,

        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Check inputs independently without producing a report
    #[command(after_help = "\
Examples:
  confronto check --importo importo.xlsx
  confronto check --premi p.xlsx --importo i.xlsx --obiettivo o.xlsx --json
  confronto check --importo importo.xlsx --watch")]
    Check {
        #[arg(long)]
        premi: Option<PathBuf>,

        #[arg(long)]
        importo: Option<PathBuf>,

        #[arg(long)]
        obiettivo: Option<PathBuf>,

        /// Print the pre-check report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Re-check whenever an input file changes (until interrupted)
        #[arg(long)]
        watch: bool,

        /// Poll interval for --watch
        #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(50..))]
        interval_ms: u64,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  confronto-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  confronto-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
        )
    }
}

/// Logs go to stderr; `log` records from the library crates are bridged
/// by tracing-subscriber's tracing-log integration.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { premi, importo, obiettivo, output_dir, output, config, json } => {
            let paths = InputPaths { premi, importo, obiettivo };
            cmd_run(paths, output_dir, output, config, json)
        }
        Commands::Check { premi, importo, obiettivo, json, watch, interval_ms } => {
            let inputs = vec![
                (InputKind::PremiMensili, premi),
                (InputKind::SumImporto, importo),
                (InputKind::Obiettivoprev, obiettivo),
            ];
            cmd_check(inputs, json, watch, Duration::from_millis(interval_ms))
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Exit with `code` without printing anything more.
    pub fn silent(code: u8) -> Self {
        Self { code, message: String::new(), hint: None }
    }

    /// Create error from an engine error with the proper exit code.
    pub fn recon(err: &ReconError) -> Self {
        let hint = match err {
            ReconError::UnreadableFile { .. } => {
                Some("export the report again as .xlsx and retry".to_string())
            }
            ReconError::Validation { input, .. } => {
                Some(format!("is this really the {} export?", input.report_name()))
            }
            ReconError::IncoherentInputs { .. } => {
                Some("the bonus and objective reports must cover the same offices".to_string())
            }
            ReconError::SuspectMarginRow { .. } => {
                Some("set strict_margin_row = false in the config to accept the total row".to_string())
            }
            _ => None,
        };
        Self { code: recon_exit_code(err), message: err.to_string(), hint }
    }

    /// In `--json` mode the error goes to stdout as JSON instead.
    pub fn recon_or_json(err: &ReconError, json: bool) -> Self {
        if !json {
            return Self::recon(err);
        }
        let output = ErrorOutput::from_recon_error(err);
        match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{}", text);
                Self::silent(output.exit_code)
            }
            Err(_) => Self::recon(err),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// run
// ============================================================================

fn load_config(path: Option<&Path>, json: bool) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: format!("cannot read config {}: {}", path.display(), e),
        hint: None,
    })?;
    debug!(path = %path.display(), "loaded config");
    ReconConfig::from_toml(&text).map_err(|e| CliError::recon_or_json(&e, json))
}

fn cmd_run(
    paths: InputPaths,
    output_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref(), json)?;
    let output = match (output, output_dir) {
        (Some(file), _) => OutputTarget::File(file),
        (None, Some(dir)) => OutputTarget::Dir(dir),
        (None, None) => OutputTarget::default(),
    };

    let summary = run_files(&paths, &RunOptions { config, output })
        .map_err(|e| CliError::recon_or_json(&e, json))?;

    if json {
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::general(format!("cannot serialize summary: {}", e)))?;
        println!("{}", text);
    } else {
        for warning in &summary.warnings {
            eprintln!("warning: {}", warning);
        }
        eprintln!("{}", summary.human_line());
    }
    Ok(())
}

// ============================================================================
// check
// ============================================================================

type CheckInputs = Vec<(InputKind, Option<PathBuf>)>;

fn cmd_check(inputs: CheckInputs, json: bool, watch: bool, interval: Duration) -> Result<(), CliError> {
    if inputs.iter().all(|(_, path)| path.is_none()) {
        return Err(CliError::args("nothing to check")
            .with_hint("pass at least one of --premi, --importo, --obiettivo"));
    }

    if watch {
        watch_inputs(inputs, json, interval);
    }

    let report = precheck(&inputs);
    print_precheck(&report, json, None)?;

    if report.passed() {
        return Ok(());
    }
    let failed = report.entries.iter().filter(|e| e.status == PrecheckStatus::Failed).count();
    if json {
        Err(CliError::silent(EXIT_VALIDATION))
    } else {
        Err(CliError { code: EXIT_VALIDATION, message: format!("{} input(s) failed", failed), hint: None })
    }
}

fn print_precheck(report: &PrecheckReport, json: bool, sequence: Option<u64>) -> Result<(), CliError> {
    if json {
        // One line per report when watching
        let text = match sequence {
            Some(_) => serde_json::to_string(report),
            None => serde_json::to_string_pretty(report),
        }
        .map_err(|e| CliError::general(format!("cannot serialize report: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    if let Some(seq) = sequence {
        eprintln!("-- check #{} at {}", seq, chrono::Local::now().format("%H:%M:%S"));
    }
    for entry in &report.entries {
        let path = entry.path.as_deref().map(|p| p.display().to_string()).unwrap_or_default();
        match entry.status {
            PrecheckStatus::Ok => eprintln!("ok       {:<22} {}", entry.kind.report_name(), path),
            PrecheckStatus::Missing => eprintln!("missing  {}", entry.kind.report_name()),
            PrecheckStatus::Failed => {
                eprintln!("FAILED   {:<22} {}", entry.kind.report_name(), path);
                if let Some(message) = &entry.message {
                    eprintln!("         {}", message);
                }
            }
        }
    }
    Ok(())
}

fn modification_times(inputs: &CheckInputs) -> Vec<Option<SystemTime>> {
    inputs
        .iter()
        .map(|(_, path)| {
            let path = path.as_ref()?;
            std::fs::metadata(path).ok()?.modified().ok()
        })
        .collect()
}

/// Poll modification times and re-check on a background thread whenever
/// they change. Results of superseded checks are dropped.
fn watch_inputs(inputs: CheckInputs, json: bool, interval: Duration) -> ! {
    let inputs = Arc::new(inputs);
    let sequence = Arc::new(PrecheckSequence::new());
    let (tx, rx) = mpsc::channel::<(u64, PrecheckReport)>();
    let mut last_seen: Option<Vec<Option<SystemTime>>> = None;

    loop {
        let stamps = modification_times(&inputs);
        if last_seen.as_ref() != Some(&stamps) {
            last_seen = Some(stamps);
            let seq = sequence.begin();
            debug!(seq, "inputs changed, re-checking");

            let tx = tx.clone();
            let inputs = Arc::clone(&inputs);
            thread::spawn(move || {
                let _ = tx.send((seq, precheck(&inputs)));
            });
        }

        while let Ok((seq, report)) = rx.try_recv() {
            if let Some(report) = sequence.accept(seq, report) {
                if let Err(e) = print_precheck(&report, json, Some(seq)) {
                    eprintln!("error: {}", e.message);
                }
            }
        }

        thread::sleep(interval);
    }
}
