// File I/O and the end-to-end run

pub mod load;
pub mod naming;
pub mod pipeline;
pub mod precheck;
pub mod report;

pub use load::{load_grid, load_grid_from_bytes};
pub use naming::report_file_name;
pub use pipeline::{load_all, run_files, InputPaths, OutputTarget, RunOptions, RunSummary, RunTotals};
pub use precheck::{precheck, precheck_one, PrecheckEntry, PrecheckReport, PrecheckSequence, PrecheckStatus};
pub use report::{render_report, write_report};

/// Version stamped into run summaries.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
