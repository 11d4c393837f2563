//! Font discovery and resolution for report rendering.
//!
//! A [`FontCatalog`] is built once from a directory scan and shared by every [`FontResolver`]
//! through an [`Arc`](std::sync::Arc). The resolver turns family/style requests into font file
//! names and serves the raw bytes that `genpdf` embeds.

pub mod catalog;
pub mod describe;
pub mod resolver;

use std::env;
use std::path::PathBuf;

pub use catalog::{FontCatalog, FontFamilyEntry, FontFileRecord, FontStyle, DEFAULT_FONT_EXTENSIONS};
pub use describe::{FontDescriber, FontDescription, TtfDescriber};
pub use resolver::{FontResolver, DEFAULT_FONT_FAMILY};

/// Environment variable overriding the scanned font directory.
pub const FONTS_DIR_ENV: &str = "STORE_REPORT_FONTS_DIR";

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

#[cfg(windows)]
fn platform_font_directory() -> Option<PathBuf> {
    ["WINDIR", "SystemRoot"]
        .into_iter()
        .filter_map(env_path)
        .map(|root| root.join("Fonts"))
        .find(|candidate| candidate.is_dir())
}

#[cfg(target_os = "macos")]
fn platform_font_directory() -> Option<PathBuf> {
    Some(PathBuf::from("/Library/Fonts"))
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_font_directory() -> Option<PathBuf> {
    Some(PathBuf::from("/usr/share/fonts"))
}

#[cfg(not(any(windows, unix)))]
fn platform_font_directory() -> Option<PathBuf> {
    None
}

/// Returns the directory to scan for fonts when nothing more specific is configured.
///
/// [`FONTS_DIR_ENV`] wins when set and non-empty; otherwise the operating system's standard
/// font directory is used.
pub fn default_font_directory() -> Option<PathBuf> {
    env_path(FONTS_DIR_ENV).or_else(platform_font_directory)
}

/// Builds a catalog from the default font directory, or an empty one when no directory is
/// known for this platform.
pub fn system_catalog() -> FontCatalog {
    match default_font_directory() {
        Some(directory) => FontCatalog::build(directory, DEFAULT_FONT_EXTENSIONS),
        None => {
            log::warn!("No font directory known for this platform; set {}", FONTS_DIR_ENV);
            FontCatalog::default()
        }
    }
}
