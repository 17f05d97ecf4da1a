//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Description                                   |
//! |------|-----------------------------------------------|
//! | 0    | Success                                       |
//! | 1    | General error (unspecified)                   |
//! | 2    | CLI usage error (bad args)                    |
//! | 3    | An input file cannot be read as a spreadsheet |
//! | 4    | An input fails its structural checks          |
//! | 5    | Bonus and objective data share no office      |
//! | 6    | Config file cannot be read, parsed or is invalid |
//! | 7    | The report cannot be written                  |
//! | 8    | Only a TOTALE margin row exists (strict mode) |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into [`recon_exit_code`] or the relevant command

use confronto_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Run / check (3-8)
// =============================================================================

pub const EXIT_UNREADABLE: u8 = 3;

/// Also returned by `check` when any supplied input fails.
pub const EXIT_VALIDATION: u8 = 4;

pub const EXIT_INCOHERENT: u8 = 5;

pub const EXIT_CONFIG: u8 = 6;

pub const EXIT_REPORT_WRITE: u8 = 7;

pub const EXIT_SUSPECT_MARGIN_ROW: u8 = 8;

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::UnreadableFile { .. } => EXIT_UNREADABLE,
        ReconError::Validation { .. } => EXIT_VALIDATION,
        ReconError::IncoherentInputs { .. } => EXIT_INCOHERENT,
        ReconError::SuspectMarginRow { .. } => EXIT_SUSPECT_MARGIN_ROW,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG,
        ReconError::ReportWrite(_) => EXIT_REPORT_WRITE,
    }
}

/// Stable machine name of an error, for `--json` output.
pub fn recon_error_kind(err: &ReconError) -> &'static str {
    match err {
        ReconError::UnreadableFile { .. } => "unreadable_file",
        ReconError::Validation { .. } => "validation",
        ReconError::IncoherentInputs { .. } => "incoherent_inputs",
        ReconError::SuspectMarginRow { .. } => "suspect_margin_row",
        ReconError::ConfigParse(_) => "config_parse",
        ReconError::ConfigValidation(_) => "config_validation",
        ReconError::ReportWrite(_) => "report_write",
    }
}

/// Structured error output for `--json` runs.
#[derive(Debug, serde::Serialize)]
pub struct ErrorOutput {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<confronto_recon::InputKind>,
    pub exit_code: u8,
}

impl ErrorOutput {
    pub fn from_recon_error(err: &ReconError) -> Self {
        Self {
            error: recon_error_kind(err),
            message: err.to_string(),
            input: err.input(),
            exit_code: recon_exit_code(err),
        }
    }
}
