//! Import and export orchestration.
//!
//! Coordinates tables, images, archives, staging, progress, and pacing.

pub mod export;
pub mod import;

pub use export::{ExportLayout, ExportOptions, ExportResult, ExportService};
pub use import::{ImportOptions, ImportResult, ImportService, MAX_RECORDED_MESSAGES};
