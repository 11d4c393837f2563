//! Recovers family name and style from a font file's binary tables.

use std::fs;
use std::path::Path;

use ttf_parser::{name_id, Face};

use super::catalog::FontStyle;
use crate::error::ReportError;

/// Family and style recovered from a font file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontDescription {
    /// Family name as stored in the font (case preserved).
    pub family: String,
    /// Style derived from the font's style flags.
    pub style: FontStyle,
}

/// Parses the metadata of a single font file.
///
/// The catalog builder only depends on this trait, which keeps the grouping and fallback rules
/// independent of the binary format.
pub trait FontDescriber {
    /// Describes the font stored at `path`.
    fn describe(&self, path: &Path) -> Result<FontDescription, ReportError>;
}

/// [`FontDescriber`] backed by `ttf-parser`, reading the `name` and `OS/2` tables.
///
/// Collections (`.ttc`) are described by their first face.
#[derive(Clone, Copy, Debug, Default)]
pub struct TtfDescriber;

impl FontDescriber for TtfDescriber {
    fn describe(&self, path: &Path) -> Result<FontDescription, ReportError> {
        let data = fs::read(path)?;
        describe_bytes(&data).map_err(|message| ReportError::FontParse {
            path: path.display().to_string(),
            message,
        })
    }
}

fn describe_bytes(data: &[u8]) -> Result<FontDescription, String> {
    let face = Face::parse(data, 0).map_err(|err| err.to_string())?;
    let family = family_name(&face).ok_or_else(|| "font has no family name".to_owned())?;
    let bold = face.is_bold();
    let italic = face.is_italic() || face.is_oblique();
    Ok(FontDescription {
        family,
        style: FontStyle::from_flags(bold, italic),
    })
}

/// Picks the family name, preferring an English Unicode record of the legacy family id and
/// falling back to the typographic family.
fn family_name(face: &Face<'_>) -> Option<String> {
    [name_id::FAMILY, name_id::TYPOGRAPHIC_FAMILY]
        .into_iter()
        .find_map(|id| {
            let candidates: Vec<_> = face
                .names()
                .into_iter()
                .filter(|name| name.name_id == id && name.is_unicode())
                .collect();
            let english = candidates
                .iter()
                .find(|name| name.language_id == 0x0409)
                .and_then(|name| name.to_string());
            english.or_else(|| candidates.iter().find_map(|name| name.to_string()))
        })
        .map(|family| family.trim().to_owned())
        .filter(|family| !family.is_empty())
}
