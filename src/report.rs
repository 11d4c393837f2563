//! One report run: validate, query, resolve fonts, render, write.

use std::fs;
use std::path::PathBuf;

use log::info;

use crate::builder::ReportBuilder;
use crate::config::{validate_columns, ReportConfig};
use crate::error::ReportError;
use crate::fonts::FontResolver;
use crate::store::{select_query, DataStore};

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportSummary {
    pub output_path: PathBuf,
    pub rows: usize,
    pub pages: usize,
    pub bytes: usize,
}

/// A configured report ready to run against a data store.
#[derive(Clone, Debug)]
pub struct ReportJob {
    config: ReportConfig,
    resolver: FontResolver,
    project_dir: PathBuf,
}

impl ReportJob {
    /// Creates a job; relative paths in `config` are resolved against `project_dir`.
    pub fn new(
        config: ReportConfig,
        resolver: FontResolver,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            resolver,
            project_dir: project_dir.into(),
        }
    }

    /// Checks everything that can be checked without touching the store or the renderer.
    ///
    /// Returns the output path and the query to run.
    pub fn validate(&self) -> Result<(PathBuf, String), ReportError> {
        let output_path = self.config.output_path(&self.project_dir)?;
        let table = &self.config.table;
        validate_columns(&table.columns)?;
        let query = select_query(&table.query, &table.table_name)?;
        Ok((output_path, query))
    }

    /// Produces the report and writes it to the configured output path.
    pub fn run(&self, store: &dyn DataStore) -> Result<ReportSummary, ReportError> {
        let (output_path, query) = self.validate()?;
        info!("Creating report {}", output_path.display());

        let rows = store.query(&query)?;
        let row_count = rows.len();
        let font_family = self.resolver.load_family(self.config.font_family())?;

        let rendered = ReportBuilder::new(font_family)
            .with_header(self.config.header.clone())
            .with_footer(self.config.footer.clone())
            .with_table(self.config.table.columns.clone(), rows)
            .with_asset_dir(&self.project_dir)
            .render()?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&output_path, &rendered.bytes)?;

        info!(
            "Report successfully exported to {} ({} rows, {} pages)",
            output_path.display(),
            row_count,
            rendered.pages
        );
        Ok(ReportSummary {
            output_path,
            rows: row_count,
            pages: rendered.pages,
            bytes: rendered.bytes.len(),
        })
    }
}
