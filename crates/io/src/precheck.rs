//! Per-file structural checks, independent of each other.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use log::debug;
use serde::Serialize;

use confronto_recon::validate::validate;
use confronto_recon::InputKind;

use crate::load::load_grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecheckStatus {
    Ok,
    Failed,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecheckEntry {
    pub kind: InputKind,
    pub path: Option<PathBuf>,
    pub status: PrecheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecheckReport {
    pub entries: Vec<PrecheckEntry>,
}

impl PrecheckReport {
    /// True when no supplied input failed. Missing inputs do not count.
    pub fn passed(&self) -> bool {
        self.entries.iter().all(|e| e.status != PrecheckStatus::Failed)
    }
}

/// Load and validate one input.
pub fn precheck_one(kind: InputKind, path: Option<&Path>) -> PrecheckEntry {
    let Some(path) = path else {
        return PrecheckEntry {
            kind,
            path: None,
            status: PrecheckStatus::Missing,
            message: None,
        };
    };

    let outcome = load_grid(path)
        .map_err(|e| e.for_input(kind))
        .and_then(|grid| validate(kind, &grid));
    debug!("precheck {kind}: {}", if outcome.is_ok() { "ok" } else { "failed" });

    let (status, message) = match outcome {
        Ok(()) => (PrecheckStatus::Ok, None),
        Err(e) => (PrecheckStatus::Failed, Some(e.to_string())),
    };
    PrecheckEntry { kind, path: Some(path.to_path_buf()), status, message }
}

/// Check every input concurrently; entries keep the order of `inputs`.
pub fn precheck(inputs: &[(InputKind, Option<PathBuf>)]) -> PrecheckReport {
    let entries = thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|(kind, path)| {
                let kind = *kind;
                (kind, path.as_deref(), scope.spawn(move || precheck_one(kind, path.as_deref())))
            })
            .collect();

        handles
            .into_iter()
            .map(|(kind, path, handle)| {
                handle.join().unwrap_or_else(|_| PrecheckEntry {
                    kind,
                    path: path.map(Path::to_path_buf),
                    status: PrecheckStatus::Failed,
                    message: Some("check thread panicked".into()),
                })
            })
            .collect()
    });
    PrecheckReport { entries }
}

/// Monotonic tag for overlapping checks. Only the result of the latest
/// [`begin`](Self::begin) may be applied; older ones are dropped.
#[derive(Debug, Default)]
pub struct PrecheckSequence {
    current: AtomicU64,
}

impl PrecheckSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new check, superseding any in flight.
    pub fn begin(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, seq: u64) -> bool {
        self.current.load(Ordering::SeqCst) == seq
    }

    /// `Some(result)` if `seq` is still the latest check.
    pub fn accept<T>(&self, seq: u64, result: T) -> Option<T> {
        if self.is_current(seq) {
            Some(result)
        } else {
            debug!("dropping stale precheck result #{seq}");
            None
        }
    }
}
