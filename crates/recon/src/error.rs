use std::fmt;

use crate::model::InputKind;

/// How many office names to list in an incoherence message.
const MAX_LISTED_OFFICES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// Input file could not be decoded as a spreadsheet.
    UnreadableFile {
        input: Option<InputKind>,
        path: String,
        reason: String,
    },
    /// A structural precondition of an input layout is not met.
    Validation { input: InputKind, reason: String },
    /// Bonus and objective data share no office.
    IncoherentInputs {
        bonus_offices: Vec<String>,
        objective_offices: Vec<String>,
    },
    /// Only TOTALE margin rows exist and strict mode rejects them.
    SuspectMarginRow { label: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad tier table, sheet name, etc.).
    ConfigValidation(String),
    /// The report could not be rendered or saved.
    ReportWrite(String),
}

impl ReconError {
    pub fn validation(input: InputKind, reason: impl Into<String>) -> Self {
        Self::Validation { input, reason: reason.into() }
    }

    /// Attach the input kind to an [`ReconError::UnreadableFile`].
    pub fn for_input(self, kind: InputKind) -> Self {
        match self {
            Self::UnreadableFile { path, reason, .. } => {
                Self::UnreadableFile { input: Some(kind), path, reason }
            }
            other => other,
        }
    }

    /// The input this error is about, if any.
    pub fn input(&self) -> Option<InputKind> {
        match self {
            Self::UnreadableFile { input, .. } => *input,
            Self::Validation { input, .. } => Some(*input),
            Self::SuspectMarginRow { .. } => Some(InputKind::SumImporto),
            _ => None,
        }
    }
}

fn list_offices(offices: &[String]) -> String {
    if offices.is_empty() {
        return "none".into();
    }
    let mut listed = offices
        .iter()
        .take(MAX_LISTED_OFFICES)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if offices.len() > MAX_LISTED_OFFICES {
        listed.push_str(&format!(" (+{} more)", offices.len() - MAX_LISTED_OFFICES));
    }
    listed
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreadableFile { input: Some(kind), path, reason } => {
                write!(f, "{kind}: cannot read '{path}' as a spreadsheet: {reason}")
            }
            Self::UnreadableFile { input: None, path, reason } => {
                write!(f, "cannot read '{path}' as a spreadsheet: {reason}")
            }
            Self::Validation { input, reason } => write!(f, "{input}: {reason}"),
            Self::IncoherentInputs { bonus_offices, objective_offices } => write!(
                f,
                "incoherent inputs: no office in common between {} [{}] and {} [{}]",
                InputKind::PremiMensili,
                list_offices(bonus_offices),
                InputKind::Obiettivoprev,
                list_offices(objective_offices),
            ),
            Self::SuspectMarginRow { label } => write!(
                f,
                "{}: only a total MNA row was found ('{label}'); refusing to use an aggregate figure",
                InputKind::SumImporto,
            ),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::ReportWrite(msg) => write!(f, "cannot write report: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
