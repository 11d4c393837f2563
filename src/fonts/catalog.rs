//! Font catalog: family -> style -> file index built from a directory scan.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use super::describe::{FontDescriber, TtfDescriber};

/// File extensions scanned when the caller does not supply its own list.
pub const DEFAULT_FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

/// Style of a single font file.
///
/// The declaration order is also the iteration order used when an arbitrary style has to be
/// picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    /// Maps a bold/italic flag pair to a style.
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (true, true) => Self::BoldItalic,
            (true, false) => Self::Bold,
            (false, true) => Self::Italic,
            (false, false) => Self::Regular,
        }
    }
}

/// A described font file found during the scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontFileRecord {
    pub path: PathBuf,
    pub family: String,
    pub style: FontStyle,
}

/// All registered files of one font family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontFamilyEntry {
    name: String,
    files: BTreeMap<FontStyle, PathBuf>,
}

impl FontFamilyEntry {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
        }
    }

    /// Assembles a family from the records sharing its name.
    ///
    /// A lone file is registered as the regular style whatever its flags say; otherwise every
    /// record is registered under its own style and the first file wins on duplicates.
    fn from_records(name: &str, records: &[FontFileRecord]) -> Self {
        let mut family = Self::new(name);
        if let [only] = records {
            family.files.insert(FontStyle::Regular, only.path.clone());
            return family;
        }

        for record in records {
            match family.files.entry(record.style) {
                Entry::Vacant(slot) => {
                    slot.insert(record.path.clone());
                }
                Entry::Occupied(existing) => debug!(
                    "Ignoring {} for {:?} {}: already provided by {}",
                    record.path.display(),
                    name,
                    style_label(record.style),
                    existing.get().display()
                ),
            }
        }
        family
    }

    /// Family name as discovered in the font metadata.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path registered for `style`, if any.
    pub fn file(&self, style: FontStyle) -> Option<&Path> {
        self.files.get(&style).map(PathBuf::as_path)
    }

    /// Registered styles in [`FontStyle`] order.
    pub fn styles(&self) -> impl Iterator<Item = FontStyle> + '_ {
        self.files.keys().copied()
    }

    /// The first registered file in [`FontStyle`] order.
    pub fn first_file(&self) -> Option<&Path> {
        self.files.values().next().map(PathBuf::as_path)
    }
}

/// Read-only index of the installed font families.
///
/// Families are keyed by their lowercased name. The catalog also remembers every file that
/// matched the scan, including files whose metadata could not be read, so that raw bytes can
/// still be served for them.
///
/// Every file gets an identifier: its file name, or its full path when another discovered file
/// has the same name ignoring case.
#[derive(Clone, Debug, Default)]
pub struct FontCatalog {
    families: BTreeMap<String, FontFamilyEntry>,
    files: Vec<PathBuf>,
    identifiers: Vec<String>,
}

impl FontCatalog {
    /// Scans `directory` recursively with the `ttf-parser` describer.
    pub fn build(directory: impl AsRef<Path>, extensions: &[&str]) -> Self {
        Self::build_with(directory, extensions, &TtfDescriber)
    }

    /// Scans `directory` recursively, describing each matching file with `describer`.
    ///
    /// Unreadable directories, unparseable files and family-name collisions are logged and
    /// skipped; the build itself never fails.
    pub fn build_with(
        directory: impl AsRef<Path>,
        extensions: &[&str],
        describer: &dyn FontDescriber,
    ) -> Self {
        let directory = directory.as_ref();
        let files = scan_font_files(directory, extensions);

        let mut records = Vec::with_capacity(files.len());
        for path in &files {
            match describer.describe(path) {
                Ok(description) => {
                    debug!(
                        "Found font {} ({} {})",
                        path.display(),
                        description.family,
                        style_label(description.style)
                    );
                    records.push(FontFileRecord {
                        path: path.clone(),
                        family: description.family,
                        style: description.style,
                    });
                }
                Err(err) => warn!("Skipping font file {}: {}", path.display(), err),
            }
        }

        let catalog = Self::from_records(files, records);
        info!(
            "Font catalog built from {}: {} families, {} files",
            directory.display(),
            catalog.len(),
            catalog.files.len()
        );
        catalog
    }

    /// Builds the index from already described records.
    ///
    /// `files` lists every discovered font file, described or not.
    pub fn from_records(files: Vec<PathBuf>, records: Vec<FontFileRecord>) -> Self {
        let mut groups: Vec<(String, Vec<FontFileRecord>)> = Vec::new();
        for record in records {
            match groups.iter_mut().find(|(family, _)| *family == record.family) {
                Some((_, members)) => members.push(record),
                None => groups.push((record.family.clone(), vec![record])),
            }
        }

        let mut families = BTreeMap::new();
        for (name, members) in groups {
            match families.entry(name.to_lowercase()) {
                Entry::Vacant(slot) => {
                    slot.insert(FontFamilyEntry::from_records(&name, &members));
                }
                Entry::Occupied(existing) => warn!(
                    "Skipping font family {:?}: name collides with already registered {:?}",
                    name,
                    existing.get().name()
                ),
            }
        }

        let identifiers = file_identifiers(&files);
        Self {
            families,
            files,
            identifiers,
        }
    }

    /// Looks up a family by name, ignoring case.
    pub fn family(&self, name: &str) -> Option<&FontFamilyEntry> {
        self.families.get(&name.to_lowercase())
    }

    /// Registered families in ascending lowercased-name order.
    pub fn families(&self) -> impl Iterator<Item = &FontFamilyEntry> {
        self.families.values()
    }

    /// Every font file found by the scan.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Identifier handed out for `path`.
    pub fn identifier(&self, path: &Path) -> String {
        match self.files.iter().position(|file| file == path) {
            Some(index) => self.identifiers[index].clone(),
            None => file_name_lossy(path),
        }
    }

    /// Finds the discovered file for `identifier`, ignoring case.
    ///
    /// A bare file name, or a path whose file name part is the identifier of a uniquely named
    /// file, also matches; names shared by several files only match their full path.
    pub fn file_by_identifier(&self, identifier: &str) -> Option<&Path> {
        let wanted = identifier.to_lowercase();
        let index = self
            .identifiers
            .iter()
            .position(|id| id.to_lowercase() == wanted)
            .or_else(|| {
                let name = file_name_lossy(Path::new(identifier)).to_lowercase();
                self.identifiers
                    .iter()
                    .position(|id| id.to_lowercase() == name)
            })?;
        Some(&self.files[index])
    }

    /// Number of registered families.
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// Whether no family could be registered.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

fn scan_font_files(directory: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(directory)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Unable to scan {}: {}", directory.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_font_extension(entry.path(), extensions) {
            continue;
        }
        if entry.file_name().to_str().is_none() {
            warn!("Skipping font file with non UTF-8 name: {}", entry.path().display());
            continue;
        }
        files.push(entry.into_path());
    }
    files
}

fn has_font_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn file_name_lossy(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

fn file_identifiers(files: &[PathBuf]) -> Vec<String> {
    let mut name_counts: HashMap<String, usize> = HashMap::new();
    for path in files {
        *name_counts
            .entry(file_name_lossy(path).to_lowercase())
            .or_default() += 1;
    }

    files
        .iter()
        .map(|path| {
            let name = file_name_lossy(path);
            if name_counts.get(&name.to_lowercase()).copied().unwrap_or(0) > 1 {
                debug!("Font file name {name} is not unique; using {}", path.display());
                path.to_string_lossy().into_owned()
            } else {
                name
            }
        })
        .collect()
}

fn style_label(style: FontStyle) -> &'static str {
    match style {
        FontStyle::Regular => "regular",
        FontStyle::Bold => "bold",
        FontStyle::Italic => "italic",
        FontStyle::BoldItalic => "bold italic",
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::ReportError;
    use crate::fonts::describe::testing::minimal_font;
    use crate::fonts::describe::FontDescription;

    /// Describer answering from a fixed file-name table.
    struct TableDescriber(HashMap<&'static str, (&'static str, FontStyle)>);

    impl FontDescriber for TableDescriber {
        fn describe(&self, path: &Path) -> Result<FontDescription, ReportError> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            self.0
                .get(name)
                .map(|(family, style)| FontDescription {
                    family: (*family).to_owned(),
                    style: *style,
                })
                .ok_or_else(|| ReportError::FontParse {
                    path: path.display().to_string(),
                    message: "unknown test font".into(),
                })
        }
    }

    fn write_files(dir: &Path, names: &[&str]) {
        for name in names {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create dirs");
            }
            fs::write(path, name.as_bytes()).expect("write font stub");
        }
    }

    #[test]
    fn single_file_family_is_registered_as_regular() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_files(dir.path(), &["impact.ttf"]);
        let describer =
            TableDescriber(HashMap::from([("impact.ttf", ("Impact", FontStyle::Bold))]));

        let catalog = FontCatalog::build_with(dir.path(), DEFAULT_FONT_EXTENSIONS, &describer);
        let family = catalog.family("Impact").expect("family registered");
        assert_eq!(family.styles().collect::<Vec<_>>(), vec![FontStyle::Regular]);
        assert!(family.file(FontStyle::Bold).is_none());
    }

    #[test]
    fn duplicate_style_keeps_first_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_files(dir.path(), &["a-bold.ttf", "b-bold.ttf", "c-regular.ttf"]);
        let describer = TableDescriber(HashMap::from([
            ("a-bold.ttf", ("Demo", FontStyle::Bold)),
            ("b-bold.ttf", ("Demo", FontStyle::Bold)),
            ("c-regular.ttf", ("Demo", FontStyle::Regular)),
        ]));

        let catalog = FontCatalog::build_with(dir.path(), DEFAULT_FONT_EXTENSIONS, &describer);
        let family = catalog.family("demo").expect("family registered");
        assert_eq!(
            family.file(FontStyle::Bold),
            Some(dir.path().join("a-bold.ttf").as_path())
        );
        assert_eq!(family.styles().count(), 2);
    }

    #[test]
    fn case_collision_keeps_first_family() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_files(dir.path(), &["1.ttf", "2.ttf"]);
        let describer = TableDescriber(HashMap::from([
            ("1.ttf", ("Gothic", FontStyle::Regular)),
            ("2.ttf", ("GOTHIC", FontStyle::Regular)),
        ]));

        let catalog = FontCatalog::build_with(dir.path(), DEFAULT_FONT_EXTENSIONS, &describer);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.family("gothic").map(|f| f.name()), Some("Gothic"));
    }

    #[test]
    fn unparseable_files_are_skipped_but_still_listed() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_files(dir.path(), &["good.ttf", "nested/broken.TTF", "notes.txt"]);
        let describer =
            TableDescriber(HashMap::from([("good.ttf", ("Good", FontStyle::Regular))]));

        let catalog = FontCatalog::build_with(dir.path(), DEFAULT_FONT_EXTENSIONS, &describer);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.files().len(), 2);
        assert!(catalog
            .files()
            .iter()
            .any(|path| path.ends_with("nested/broken.TTF")));
    }

    #[test]
    fn shared_file_names_get_path_identifiers() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_files(dir.path(), &["a/Font.ttf", "b/font.ttf", "c/solo.ttf"]);
        let describer = TableDescriber(HashMap::from([
            ("Font.ttf", ("Alpha", FontStyle::Regular)),
            ("font.ttf", ("Beta", FontStyle::Regular)),
            ("solo.ttf", ("Solo", FontStyle::Regular)),
        ]));

        let catalog = FontCatalog::build_with(dir.path(), DEFAULT_FONT_EXTENSIONS, &describer);
        let alpha = dir.path().join("a/Font.ttf");
        let beta = dir.path().join("b/font.ttf");
        let solo = dir.path().join("c/solo.ttf");

        assert_eq!(catalog.identifier(&alpha), alpha.to_string_lossy());
        assert_eq!(catalog.identifier(&beta), beta.to_string_lossy());
        assert_eq!(catalog.identifier(&solo), "solo.ttf");

        assert_eq!(
            catalog.file_by_identifier(&catalog.identifier(&beta)),
            Some(beta.as_path())
        );
        assert_eq!(catalog.file_by_identifier("SOLO.TTF"), Some(solo.as_path()));
        assert_eq!(catalog.file_by_identifier("font.ttf"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_file_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().expect("tempdir");
        write_files(dir.path(), &["good.ttf"]);
        fs::write(dir.path().join(OsStr::from_bytes(b"caf\xe9.ttf")), b"stub").expect("write");
        let describer =
            TableDescriber(HashMap::from([("good.ttf", ("Good", FontStyle::Regular))]));

        let catalog = FontCatalog::build_with(dir.path(), DEFAULT_FONT_EXTENSIONS, &describer);
        assert_eq!(catalog.files(), &[dir.path().join("good.ttf")]);
    }

    #[test]
    fn missing_directory_gives_empty_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = FontCatalog::build(dir.path().join("absent"), DEFAULT_FONT_EXTENSIONS);
        assert!(catalog.is_empty());
        assert!(catalog.files().is_empty());
    }

    #[test]
    fn builds_from_real_font_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("Sample-Regular.ttf"),
            minimal_font("Sample", false, false),
        )
        .expect("write");
        fs::write(
            dir.path().join("Sample-BoldItalic.ttf"),
            minimal_font("Sample", true, true),
        )
        .expect("write");

        let catalog = FontCatalog::build(dir.path(), DEFAULT_FONT_EXTENSIONS);
        let family = catalog.family("SAMPLE").expect("family registered");
        assert_eq!(
            family.styles().collect::<Vec<_>>(),
            vec![FontStyle::Regular, FontStyle::BoldItalic]
        );
    }
}
