//! Coverage report export
//!
//! - [`coverage_report`]: the report document and its JSON export
//! - [`summary`]: human-readable terminal output of a report

pub mod coverage_report;
pub mod summary;

pub use coverage_report::{CoverageReport, MiningStats};
pub use summary::{print_groups, print_summary};
