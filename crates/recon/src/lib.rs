//! `confronto-recon`: parsing and reconciliation engine for the RA bonus
//! comparison.
//!
//! Pure engine crate: receives pre-loaded grids, returns validated records
//! and the reconciled comparison. No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod grid;
pub mod layout;
pub mod model;
pub mod validate;

pub use config::{PoolBasis, ReconConfig, ReportConfig, Tier};
pub use engine::run;
pub use error::ReconError;
pub use grid::{Cell, Grid};
pub use model::{ComparisonRow, InputKind, OfficeLabel, ReconInput, Reconciliation};
