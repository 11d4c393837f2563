use std::sync::Arc;

use rusqlite::Connection;
use sha2::{Digest, Sha256};
use store_report::builder::ReportBuilder;
use store_report::config::{ColumnConfig, FooterConfig, HeaderConfig, ReportConfig};
use store_report::fonts::{self, FontResolver};
use store_report::store::{ResultSet, SqliteStore};
use store_report::{CompletionFlag, ReportJob, ReportTask};

/// Families known to load cleanly; whichever is installed first is used.
const CANDIDATE_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Arial",
    "FreeSans",
    "Noto Sans",
];

const SKIP_HINT: &str = "no usable TrueType font installed. Set STORE_REPORT_FONTS_DIR";

/// Resolver over the system fonts and the family to render with, when one is available.
fn system_resolver() -> Option<(FontResolver, &'static str)> {
    let catalog = fonts::system_catalog();
    let family = CANDIDATE_FAMILIES.iter().copied().find(|name| {
        catalog
            .family(name)
            .and_then(|family| family.first_file())
            .and_then(|path| path.extension())
            .map(|ext| ext.eq_ignore_ascii_case("ttf"))
            .unwrap_or(false)
    })?;
    Some((FontResolver::new(Arc::new(catalog)), family))
}

fn columns() -> Vec<ColumnConfig> {
    vec![
        ColumnConfig::new("Timestamp", 45.0),
        ColumnConfig::new("Level", 20.0),
        ColumnConfig::new("Message", 90.0),
    ]
}

fn rows(count: usize) -> ResultSet {
    ResultSet::new(
        vec!["Timestamp".into(), "Level".into(), "Message".into()],
        (0..count)
            .map(|i| {
                vec![
                    format!("2024-01-01 {:02}:{:02}", i / 60 % 24, i % 60),
                    (i % 4).to_string(),
                    format!("Alarm {i}"),
                ]
            })
            .collect(),
    )
}

fn render_sample_pdf(row_count: usize, page_numbers: bool) -> Option<(Vec<u8>, usize)> {
    let (resolver, family) = system_resolver()?;
    let font_family = match resolver.load_family(family) {
        Ok(font_family) => font_family,
        Err(err) => {
            eprintln!("cannot load {family}: {err}");
            return None;
        }
    };

    let rendered = ReportBuilder::new(font_family)
        .with_header(HeaderConfig {
            title: "Alarm history".into(),
            information: "Line 3".into(),
            image: None,
        })
        .with_footer(FooterConfig {
            text: "ACME".into(),
            page_numbers,
        })
        .with_table(columns(), rows(row_count))
        .render()
        .expect("render sample pdf");

    Some((rendered.bytes, rendered.pages))
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() {
                    let byte = data[cursor];
                    if byte == terminator {
                        break;
                    }
                    if terminator == b')' {
                        data[cursor] = b'0';
                    } else if !matches!(byte, b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t') {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while offset + start.len() < data.len() {
            let Some(start_pos) = data[offset..]
                .windows(start.len())
                .position(|window| window == start)
            else {
                break;
            };
            let start_index = offset + start_pos + start.len();
            let Some(end_pos) = data[start_index..]
                .windows(end.len())
                .position(|window| window == end)
            else {
                break;
            };
            for byte in &mut data[start_index..start_index + end_pos] {
                if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                    *byte = b'0';
                }
            }
            offset = start_index + end_pos + end.len();
        }
    }

    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    scrub_segment(&mut normalized, b"/Producer(", b')');
    for (start, end) in [
        ("<xmp:CreateDate>", "</xmp:CreateDate>"),
        ("<xmp:ModifyDate>", "</xmp:ModifyDate>"),
        ("<xmp:MetadataDate>", "</xmp:MetadataDate>"),
        ("<xmpMM:DocumentID>", "</xmpMM:DocumentID>"),
        ("<xmpMM:InstanceID>", "</xmpMM:InstanceID>"),
        ("<xmpMM:VersionID>", "</xmpMM:VersionID>"),
    ] {
        scrub_xml(&mut normalized, start.as_bytes(), end.as_bytes());
    }
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(scrub_pdf(bytes)).into()
}

#[test]
fn renders_non_empty_output() {
    let Some((bytes, pages)) = render_sample_pdf(3, false) else {
        eprintln!("Skipping renders_non_empty_output: {SKIP_HINT}");
        return;
    };
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(pages, 1);
}

#[test]
fn long_tables_span_pages_with_totals() {
    let Some((bytes, pages)) = render_sample_pdf(200, true) else {
        eprintln!("Skipping long_tables_span_pages_with_totals: {SKIP_HINT}");
        return;
    };
    assert!(pages >= 2, "200 rows should not fit on one page");
    let reloaded = lopdf::Document::load_mem(&bytes).expect("readable pdf");
    assert_eq!(reloaded.get_pages().len(), pages);
}

#[test]
fn empty_result_still_renders_header_row() {
    let Some((bytes, pages)) = render_sample_pdf(0, true) else {
        eprintln!("Skipping empty_result_still_renders_header_row: {SKIP_HINT}");
        return;
    };
    assert!(!bytes.is_empty());
    assert_eq!(pages, 1);
}

#[test]
fn rendering_is_deterministic() {
    let Some((bytes_a, _)) = render_sample_pdf(40, true) else {
        eprintln!("Skipping rendering_is_deterministic: {SKIP_HINT}");
        return;
    };
    let Some((bytes_b, _)) = render_sample_pdf(40, true) else {
        eprintln!("Skipping rendering_is_deterministic: {SKIP_HINT}");
        return;
    };

    assert_eq!(bytes_a.len(), bytes_b.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&bytes_a),
        normalized_hash(&bytes_b),
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn background_task_writes_pdf_and_sets_flag() {
    let Some((resolver, family)) = system_resolver() else {
        eprintln!("Skipping background_task_writes_pdf_and_sets_flag: {SKIP_HINT}");
        return;
    };
    if let Err(err) = resolver.load_family(family) {
        eprintln!("Skipping background_task_writes_pdf_and_sets_flag: {err}");
        return;
    }

    let connection = Connection::open_in_memory().expect("in-memory db");
    connection
        .execute_batch(
            "CREATE TABLE Alarms (Timestamp TEXT, Level INTEGER, Message TEXT);
             INSERT INTO Alarms VALUES ('2024-01-01 08:00', 2, 'Door open');
             INSERT INTO Alarms VALUES ('2024-01-01 07:00', 1, NULL);",
        )
        .expect("seed table");

    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = ReportConfig::default();
    config.output_path = "out/alarms.pdf".into();
    config.font_family = family.into();
    config.header.title = "Alarm history".into();
    config.footer.page_numbers = true;
    config.table.data_store = "unused.sqlite".into();
    config.table.table_name = "Alarms".into();
    config.table.columns = columns();

    let flag = CompletionFlag::new();
    let job = ReportJob::new(config, resolver, dir.path());
    let task = ReportTask::spawn(job, SqliteStore::from_connection(connection), flag.clone())
        .expect("spawn worker");
    let summary = task.join().expect("report generated");

    assert!(flag.is_set());
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.pages, 1);
    assert_eq!(summary.output_path, dir.path().join("out/alarms.pdf"));
    let written = std::fs::read(&summary.output_path).expect("output written");
    assert!(written.starts_with(b"%PDF"));
    assert_eq!(written.len(), summary.bytes);
}
