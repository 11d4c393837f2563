//! Document construction for store reports.

use std::path::{Path, PathBuf};

use genpdf::elements::{Break, FrameCellDecorator, Paragraph, TableLayout};
use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{self, Color, Style};
use genpdf::{self, Alignment, Element, Margins, Mm, PageDecorator, Position};
use log::{debug, warn};

use crate::config::{
    validate_columns, ColumnConfig, FooterConfig, HeaderConfig, MAX_COLUMN_WIDTH_MM,
};
use crate::elements::{mm_from_f64, SizedImage};
use crate::error::ReportError;
use crate::store::ResultSet;

const BASE_FONT_SIZE: u8 = 10;
const HEADING_FONT_SIZE: u8 = 14;
const HEADING_COLOR: Color = Color::Rgb(0, 0, 139);
const PAGE_MARGIN_MM: f64 = 15.0;
const FOOTER_HEIGHT_MM: f64 = 10.0;
const CELL_PADDING_MM: f64 = 1.0;

/// Rendered report bytes together with their page count.
#[derive(Clone, Debug)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Assembles and renders a report document: header block, data table and page footer.
pub struct ReportBuilder {
    font_family: FontFamily<FontData>,
    header: HeaderConfig,
    footer: FooterConfig,
    columns: Vec<ColumnConfig>,
    rows: ResultSet,
    asset_dir: PathBuf,
}

impl ReportBuilder {
    /// Creates a builder rendering with the given, already loaded, font family.
    pub fn new(font_family: FontFamily<FontData>) -> Self {
        Self {
            font_family,
            header: HeaderConfig::default(),
            footer: FooterConfig::default(),
            columns: Vec::new(),
            rows: ResultSet::default(),
            asset_dir: PathBuf::new(),
        }
    }

    pub fn with_header(mut self, header: HeaderConfig) -> Self {
        self.header = header;
        self
    }

    pub fn with_footer(mut self, footer: FooterConfig) -> Self {
        self.footer = footer;
        self
    }

    /// Sets the table columns and the rows filling them.
    pub fn with_table(mut self, columns: Vec<ColumnConfig>, rows: ResultSet) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    /// Directory that relative header image paths are resolved against.
    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    /// Renders the report.
    ///
    /// With page numbers enabled the document is laid out twice: the first pass only counts the
    /// pages so the footer can print the total.
    pub fn render(&self) -> Result<RenderedReport, ReportError> {
        validate_columns(&self.columns)?;

        let bytes = self.render_pass(None)?;
        let pages = count_pages(&bytes)?;
        if !self.footer.page_numbers {
            return Ok(RenderedReport { bytes, pages });
        }

        debug!("First pass produced {pages} pages; rendering with page totals");
        let bytes = self.render_pass(Some(pages))?;
        let pages = count_pages(&bytes)?;
        Ok(RenderedReport { bytes, pages })
    }

    fn render_pass(&self, total_pages: Option<usize>) -> Result<Vec<u8>, ReportError> {
        let mut document = genpdf::Document::new(self.font_family.clone());
        document.set_title(self.header.title.clone());
        document.set_font_size(BASE_FONT_SIZE);
        document.set_page_decorator(ReportPageDecorator::new(
            Margins::trbl(
                mm_from_f64(PAGE_MARGIN_MM),
                mm_from_f64(PAGE_MARGIN_MM),
                mm_from_f64(PAGE_MARGIN_MM),
                mm_from_f64(PAGE_MARGIN_MM),
            ),
            FooterSpec::new(self.footer.clone(), total_pages),
        ));

        self.push_header(&mut document);
        document.push(self.build_table()?);

        let mut bytes = Vec::new();
        document.render(&mut bytes)?;
        Ok(bytes)
    }

    fn push_header(&self, document: &mut genpdf::Document) {
        let mut title = Paragraph::new(self.header.title.clone());
        title.set_alignment(Alignment::Center);
        document.push(title.styled(heading_style()));
        document.push(Break::new(1.0));

        if let Some(image) = &self.header.image {
            let path = resolve_asset(&self.asset_dir, &image.path);
            if path.is_file() {
                match SizedImage::from_path(&path, image.width_mm, image.height_mm) {
                    Ok(element) => document.push(element),
                    Err(err) => warn!("Skipping header image {}: {}", path.display(), err),
                }
            } else {
                warn!("Header image {} not found; skipping", path.display());
            }
        }

        let information = Paragraph::new(format!("{} ", self.header.information));
        document.push(
            information
                .styled(Style::new().with_font_size(BASE_FONT_SIZE).with_color(HEADING_COLOR))
                .padded(Margins::trbl(2, 0, 2, 0)),
        );
        document.push(Break::new(1.0));
    }

    fn build_table(&self) -> Result<TableLayout, Error> {
        let mut table = TableLayout::new(column_weights(&self.columns));
        table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

        let mut header_row = table.row();
        for column in &self.columns {
            header_row.push_element(
                Paragraph::new(column.name.clone())
                    .styled(Style::new().bold().with_color(HEADING_COLOR))
                    .padded(mm_from_f64(CELL_PADDING_MM)),
            );
        }
        header_row.push()?;

        for row_index in 0..self.rows.len() {
            let mut row = table.row();
            for column_index in 0..self.columns.len() {
                row.push_element(
                    Paragraph::new(self.rows.cell(row_index, column_index).to_owned())
                        .padded(mm_from_f64(CELL_PADDING_MM)),
                );
            }
            row.push()?;
        }
        Ok(table)
    }
}

fn heading_style() -> Style {
    Style::new()
        .bold()
        .with_font_size(HEADING_FONT_SIZE)
        .with_color(HEADING_COLOR)
}

/// Converts millimetre column widths into the relative weights `genpdf` tables use.
pub fn column_weights(columns: &[ColumnConfig]) -> Vec<usize> {
    columns
        .iter()
        .map(|column| {
            (column.width_mm * 10.0)
                .round()
                .max(1.0)
                .min(MAX_COLUMN_WIDTH_MM * 10.0) as usize
        })
        .collect()
}

fn resolve_asset(asset_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        asset_dir.join(path)
    }
}

fn count_pages(bytes: &[u8]) -> Result<usize, ReportError> {
    let document = lopdf::Document::load_mem(bytes)?;
    Ok(document.get_pages().len())
}

/// Footer text printed at the bottom of every page.
pub struct FooterSpec {
    config: FooterConfig,
    total_pages: Option<usize>,
    height: Mm,
}

impl FooterSpec {
    /// Creates a footer; `total_pages` is printed as "of M" when known.
    pub fn new(config: FooterConfig, total_pages: Option<usize>) -> Self {
        Self {
            config,
            total_pages,
            height: mm_from_f64(FOOTER_HEIGHT_MM),
        }
    }

    /// Footer line for the 1-based `page`.
    pub fn text(&self, page: usize) -> String {
        if !self.config.page_numbers {
            return self.config.text.clone();
        }
        match self.total_pages {
            Some(total) => format!("{} Page {} of {}", self.config.text, page, total),
            None => format!("{} Page {}", self.config.text, page),
        }
    }
}

struct ReportPageDecorator {
    page: usize,
    margins: Margins,
    footer: FooterSpec,
}

impl ReportPageDecorator {
    fn new(margins: Margins, footer: FooterSpec) -> Self {
        Self {
            page: 0,
            margins,
            footer,
        }
    }
}

impl PageDecorator for ReportPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: style::Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;
        area.add_margins(self.margins);

        let available = area.size().height;
        if self.footer.height > available {
            return Err(Error::new(
                "Footer height exceeds available space",
                ErrorKind::InvalidData,
            ));
        }

        let mut footer_area = area.clone();
        footer_area.add_offset(Position::new(0, available - self.footer.height));
        let mut footer = Paragraph::new(self.footer.text(self.page));
        footer.set_alignment(Alignment::Center);
        let result = footer.render(context, footer_area, style)?;
        if result.has_more {
            return Err(Error::new(
                "Footer text does not fit into the reserved space",
                ErrorKind::PageSizeExceeded,
            ));
        }

        area.set_height(available - self.footer.height);
        Ok(area)
    }
}
