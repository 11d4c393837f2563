//! Core entry point for the store_report crate.
//!
//! Reports are rendered with `genpdf` from rows queried out of an embedded table store. Fonts
//! come from a [`fonts::FontCatalog`] built once per process and shared by every report run.

pub mod builder;
pub mod config;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod report;
pub mod store;
pub mod task;

pub use config::ReportConfig;
pub use error::{ErrorKind, ReportError};
pub use report::{ReportJob, ReportSummary};
pub use task::{CompletionFlag, ReportTask};
