//! Style matching and font byte serving on top of a [`FontCatalog`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::sync::Arc;

use genpdf::fonts::{FontData, FontFamily};
use log::{debug, warn};

use super::catalog::{FontCatalog, FontStyle};
use crate::error::ReportError;

/// Family used when the configuration does not name one, or when a strict lookup misses.
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// Answers typeface requests for the PDF renderer.
///
/// Cloning is cheap; clones share the same catalog.
#[derive(Clone, Debug)]
pub struct FontResolver {
    catalog: Arc<FontCatalog>,
    null_if_not_found: bool,
}

impl FontResolver {
    /// Creates a resolver that falls back to an arbitrary installed font on unknown families.
    pub fn new(catalog: Arc<FontCatalog>) -> Self {
        Self {
            catalog,
            null_if_not_found: false,
        }
    }

    /// Makes unknown families resolve to `None` instead of an arbitrary installed font.
    pub fn with_null_if_not_found(mut self, null_if_not_found: bool) -> Self {
        self.null_if_not_found = null_if_not_found;
        self
    }

    /// The catalog this resolver reads from.
    pub fn catalog(&self) -> &FontCatalog {
        &self.catalog
    }

    /// Returns the file name of the font best matching the request.
    ///
    /// Within a known family the preference is bold italic, bold, italic (each only when
    /// requested), then regular, then whatever style the family has. Unknown families yield
    /// `None` in strict mode and the first installed font otherwise. An empty catalog is a
    /// configuration error.
    pub fn resolve_typeface(
        &self,
        family_name: &str,
        bold: bool,
        italic: bool,
    ) -> Result<Option<String>, ReportError> {
        if self.catalog.is_empty() {
            return Err(ReportError::config("no fonts available"));
        }

        let path = match self.catalog.family(family_name) {
            Some(family) => style_cascade(bold, italic)
                .into_iter()
                .find_map(|style| family.file(style))
                .or_else(|| family.first_file()),
            None if self.null_if_not_found => return Ok(None),
            None => {
                let fallback = self.catalog.families().find_map(|family| family.first_file());
                if let Some(path) = fallback {
                    warn!(
                        "Font family {:?} is not installed; substituting {}",
                        family_name,
                        path.display()
                    );
                }
                fallback
            }
        };

        Ok(path.map(|path| self.catalog.identifier(path)))
    }

    /// Reads the complete contents of the discovered font file identified by `identifier`.
    ///
    /// Identifiers are matched ignoring case; for uniquely named files the directory part of
    /// the identifier is ignored. The file is read again on every call.
    pub fn font_bytes(&self, identifier: &str) -> Result<Vec<u8>, ReportError> {
        let path = self
            .catalog
            .file_by_identifier(identifier)
            .ok_or_else(|| ReportError::FontNotFound(identifier.to_owned()))?;

        fs::read(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ReportError::FontNotFound(identifier.to_owned()),
            _ => ReportError::Io(err),
        })
    }

    /// Loads the four style variants of `family_name` as a `genpdf` font family.
    ///
    /// Each distinct file is read once. When the family cannot be resolved in strict mode the
    /// [`DEFAULT_FONT_FAMILY`] is tried before giving up.
    pub fn load_family(&self, family_name: &str) -> Result<FontFamily<FontData>, ReportError> {
        match self.load_family_faces(family_name)? {
            Some(family) => Ok(family),
            None if !family_name.eq_ignore_ascii_case(DEFAULT_FONT_FAMILY) => {
                warn!(
                    "Font family {:?} is not installed; trying {}",
                    family_name, DEFAULT_FONT_FAMILY
                );
                self.load_family_faces(DEFAULT_FONT_FAMILY)?
                    .ok_or_else(|| ReportError::FamilyNotFound(family_name.to_owned()))
            }
            None => Err(ReportError::FamilyNotFound(family_name.to_owned())),
        }
    }

    fn load_family_faces(
        &self,
        family_name: &str,
    ) -> Result<Option<FontFamily<FontData>>, ReportError> {
        let mut loaded: HashMap<String, FontData> = HashMap::new();
        let mut faces = Vec::with_capacity(4);

        for (bold, italic) in [(false, false), (true, false), (false, true), (true, true)] {
            let Some(face) = self.resolve_typeface(family_name, bold, italic)? else {
                return Ok(None);
            };
            if !loaded.contains_key(&face) {
                let bytes = self.font_bytes(&face)?;
                debug!("Embedding {} ({} bytes) for {:?}", face, bytes.len(), family_name);
                loaded.insert(face.clone(), FontData::new(bytes, None)?);
            }
            faces.push(loaded[&face].clone());
        }

        let mut faces = faces.into_iter();
        match (faces.next(), faces.next(), faces.next(), faces.next()) {
            (Some(regular), Some(bold), Some(italic), Some(bold_italic)) => {
                Ok(Some(FontFamily {
                    regular,
                    bold,
                    italic,
                    bold_italic,
                }))
            }
            _ => Ok(None),
        }
    }
}

/// Styles to try, in order, for a bold/italic request.
fn style_cascade(bold: bool, italic: bool) -> Vec<FontStyle> {
    let mut styles = Vec::with_capacity(4);
    if bold && italic {
        styles.push(FontStyle::BoldItalic);
    }
    if bold {
        styles.push(FontStyle::Bold);
    }
    if italic {
        styles.push(FontStyle::Italic);
    }
    styles.push(FontStyle::Regular);
    styles
}
