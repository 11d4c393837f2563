//! Report configuration loaded from JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ReportError;
use crate::fonts::DEFAULT_FONT_FAMILY;

/// Everything needed to produce one report.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Destination of the PDF; must carry a `.pdf` extension.
    pub output_path: String,
    /// Font family used for the whole document.
    pub font_family: String,
    /// Directory scanned for fonts instead of the platform default.
    pub fonts_dir: Option<PathBuf>,
    pub header: HeaderConfig,
    pub footer: FooterConfig,
    pub table: TableConfig,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeaderConfig {
    pub title: String,
    /// Descriptive text printed below the title and image.
    pub information: String,
    pub image: Option<ImageConfig>,
}

/// Header image with its printed size.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ImageConfig {
    pub path: PathBuf,
    pub width_mm: f64,
    pub height_mm: f64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FooterConfig {
    pub text: String,
    /// Appends "Page N of M" to the footer text.
    pub page_numbers: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableConfig {
    /// Identifier of the data store, a SQLite file relative to the project directory.
    pub data_store: String,
    pub table_name: String,
    pub columns: Vec<ColumnConfig>,
    /// Query run instead of the default one when non-empty.
    pub query: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ColumnConfig {
    pub name: String,
    pub width_mm: f64,
}

impl ColumnConfig {
    pub fn new(name: impl Into<String>, width_mm: f64) -> Self {
        Self {
            name: name.into(),
            width_mm,
        }
    }
}

impl ReportConfig {
    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            ReportError::config(format!("cannot read {}: {}", path.display(), err))
        })?;
        Self::from_json(&text)
    }

    /// Parses a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Configured font family, or [`DEFAULT_FONT_FAMILY`] when blank.
    pub fn font_family(&self) -> &str {
        match self.font_family.trim() {
            "" => DEFAULT_FONT_FAMILY,
            family => family,
        }
    }

    /// Configured font directory, resolved against `project_dir` when relative.
    pub fn fonts_dir(&self, project_dir: &Path) -> Option<PathBuf> {
        self.fonts_dir.as_ref().map(|dir| project_dir.join(dir))
    }

    /// Data store file, resolved against `project_dir`.
    pub fn data_store_path(&self, project_dir: &Path) -> Result<PathBuf, ReportError> {
        match self.table.data_store.trim() {
            "" => Err(ReportError::config("no data store configured")),
            store => Ok(project_dir.join(store)),
        }
    }

    /// Validated output path, resolved against `project_dir` when relative.
    pub fn output_path(&self, project_dir: &Path) -> Result<PathBuf, ReportError> {
        validate_output_path(&self.output_path).map(|path| project_dir.join(path))
    }
}

/// Widest column accepted, in millimetres.
pub const MAX_COLUMN_WIDTH_MM: f64 = 10_000.0;

/// Checks that there is at least one column and every width is a positive, bounded number.
pub fn validate_columns(columns: &[ColumnConfig]) -> Result<(), ReportError> {
    if columns.is_empty() {
        return Err(ReportError::config("the table needs at least one column"));
    }
    for column in columns {
        let width = column.width_mm;
        if !width.is_finite() || width <= 0.0 || width > MAX_COLUMN_WIDTH_MM {
            return Err(ReportError::config(format!(
                "column {:?} has invalid width {} mm (expected 0 < width <= {})",
                column.name, width, MAX_COLUMN_WIDTH_MM
            )));
        }
    }
    Ok(())
}

/// Checks that `path` is non-empty and names a `.pdf` file.
pub fn validate_output_path(path: &str) -> Result<PathBuf, ReportError> {
    if path.trim().is_empty() {
        return Err(ReportError::config("file path is empty"));
    }

    let path = PathBuf::from(path);
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf || path.file_stem().is_none() {
        return Err(ReportError::config(format!(
            "file extension must be .pdf: {}",
            path.display()
        )));
    }
    Ok(path)
}
