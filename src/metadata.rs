//! Metadata sheet loading and lookup.
//!
//! Labels and descriptions come from a CSV sheet keyed by object identifier,
//! kept by the archive alongside its finding aids:
//!
//! ```text
//! Identifier,Title,Description
//! Ms1990_025,"Letters to the Board","Correspondence, 1911-1914"
//! ```
//!
//! ## Sources
//!
//! The sheet is a local path or an `http(s)://` URL. URLs are fetched with a
//! blocking client bounded by [`MetadataConfig::timeout`]. A UTF-8 byte-order
//! mark is stripped. A header row is required and must contain a column
//! named exactly `Identifier`; `Title` and `Description` are optional.
//!
//! ## Lookup
//!
//! [`find_row`] is a pure scan over the parsed table: the first row whose
//! `Identifier` equals the requested id wins, later duplicates are ignored.
//! Empty cells resolve to `None`.
//!
//! ## Fail-soft policy
//!
//! Missing metadata degrades labels to empty, it never aborts a run. A
//! missing `Identifier` header, an unknown id, an unreachable URL or a
//! malformed sheet are all logged and reported as "not found".
//!
//! [`MetadataIndex`] loads the sheet once per run and answers every lookup
//! from memory. [`lookup`] is the uncached form that re-reads the sheet on
//! every call; both give identical answers.

use crate::config::MetadataConfig;
use crate::types::DocumentMetadata;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const IDENTIFIER_HEADER: &str = "Identifier";
const TITLE_HEADER: &str = "Title";
const DESCRIPTION_HEADER: &str = "Description";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Where the metadata sheet lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSource {
    Path(PathBuf),
    Url(String),
}

impl MetadataSource {
    /// Interpret a command-line argument: `http://` and `https://` are URLs,
    /// anything else is a filesystem path.
    pub fn parse(arg: &str) -> Self {
        let lower = arg.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            MetadataSource::Url(arg.to_string())
        } else {
            MetadataSource::Path(PathBuf::from(arg))
        }
    }

    /// Final path segment (`Ms1990_025_metadata.csv`), query string excluded.
    pub fn file_name(&self) -> Option<String> {
        match self {
            MetadataSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            MetadataSource::Url(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|base| base.rsplit('/').next())
                .filter(|name| !name.is_empty())
                .map(String::from),
        }
    }

    /// Read the raw bytes of the sheet.
    pub fn fetch(&self, config: &MetadataConfig) -> Result<Vec<u8>, MetadataError> {
        match self {
            MetadataSource::Path(path) => Ok(std::fs::read(path)?),
            MetadataSource::Url(url) => {
                let client = reqwest::blocking::Client::builder()
                    .timeout(config.timeout())
                    .build()?;
                let bytes = client.get(url).send()?.error_for_status()?.bytes()?;
                Ok(bytes.to_vec())
            }
        }
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataSource::Path(path) => write!(f, "{}", path.display()),
            MetadataSource::Url(url) => f.write_str(url),
        }
    }
}

/// A parsed metadata sheet: header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Parse CSV bytes into a [`MetadataTable`].
///
/// Rows may have differing field counts; missing trailing cells read as absent.
pub fn parse_table(bytes: &[u8]) -> Result<MetadataTable, MetadataError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(String::from).collect()))
        .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;

    Ok(MetadataTable { headers, rows })
}

/// Outcome of scanning a table for an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(DocumentMetadata),
    NoIdentifierHeader,
    NoMatch,
}

/// Cell text verbatim; only a missing or empty cell becomes `None`.
fn non_empty(cell: Option<&String>) -> Option<String> {
    cell.filter(|s| !s.is_empty()).cloned()
}

/// Find the first row whose `Identifier` equals `id`.
pub fn find_row(table: &MetadataTable, id: &str) -> Lookup {
    let column = |name: &str| table.headers.iter().position(|h| h == name);

    let Some(id_col) = column(IDENTIFIER_HEADER) else {
        return Lookup::NoIdentifierHeader;
    };
    let title_col = column(TITLE_HEADER);
    let description_col = column(DESCRIPTION_HEADER);

    table
        .rows
        .iter()
        .find(|row| row.get(id_col).map(String::as_str) == Some(id))
        .map(|row| {
            Lookup::Found(DocumentMetadata {
                title: non_empty(title_col.and_then(|c| row.get(c))),
                description: non_empty(description_col.and_then(|c| row.get(c))),
            })
        })
        .unwrap_or(Lookup::NoMatch)
}

/// Turn a lookup outcome into an optional result, logging the misses.
fn report(source: &str, id: &str, outcome: Lookup) -> Option<DocumentMetadata> {
    match outcome {
        Lookup::Found(metadata) => {
            debug!("Metadata for {} found in {}", id, source);
            Some(metadata)
        }
        Lookup::NoIdentifierHeader => {
            warn!("No Identifier header found in {}", source);
            None
        }
        Lookup::NoMatch => {
            warn!("No matching Identifier found for {} in {}", id, source);
            None
        }
    }
}

/// Uncached lookup: fetch, parse and scan the sheet on every call.
pub fn lookup(
    source: &MetadataSource,
    id: &str,
    config: &MetadataConfig,
) -> Option<DocumentMetadata> {
    let table = source
        .fetch(config)
        .and_then(|bytes| parse_table(&bytes));
    match table {
        Ok(table) => report(&source.to_string(), id, find_row(&table, id)),
        Err(e) => {
            warn!("An error occurred processing {}: {}", source, e);
            None
        }
    }
}

/// The metadata sheet loaded once for a run.
///
/// Construction never fails: a sheet that cannot be fetched or parsed is
/// remembered as unavailable and every lookup returns `None`.
#[derive(Debug)]
pub struct MetadataIndex {
    source: String,
    file_name: Option<String>,
    raw: Option<Vec<u8>>,
    table: Option<MetadataTable>,
}

impl MetadataIndex {
    /// Fetch and parse the sheet.
    pub fn open(source: &MetadataSource, config: &MetadataConfig) -> Self {
        let raw = match source.fetch(config) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("An error occurred processing {}: {}", source, e);
                None
            }
        };
        let table = raw.as_deref().and_then(|bytes| match parse_table(bytes) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("An error occurred processing {}: {}", source, e);
                None
            }
        });

        Self {
            source: source.to_string(),
            file_name: source.file_name(),
            raw,
            table,
        }
    }

    /// Build an index over an already-parsed table.
    pub fn from_table(source: &str, table: MetadataTable) -> Self {
        Self {
            source: source.to_string(),
            file_name: None,
            raw: None,
            table: Some(table),
        }
    }

    /// Whether the sheet was loaded and parsed.
    pub fn is_available(&self) -> bool {
        self.table.is_some()
    }

    /// Look up title and description for a document id.
    pub fn lookup(&self, id: &str) -> Option<DocumentMetadata> {
        let table = self.table.as_ref()?;
        report(&self.source, id, find_row(table, id))
    }

    /// Keep a copy of the fetched sheet in `dir` under its original file name.
    ///
    /// Returns the written path, or `None` when there is nothing to save.
    pub fn save_copy(&self, dir: &Path) -> std::io::Result<Option<PathBuf>> {
        let (Some(raw), Some(name)) = (&self.raw, &self.file_name) else {
            return Ok(None);
        };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(name);
        std::fs::write(&path, raw)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_csv;
    use tempfile::TempDir;

    const SHEET: &str = "Identifier,Title,Description\n\
        Ms1990_025,\"My Title\",\"My Desc\"\n\
        Ms1990_026,Second,\n\
        Ms1990_025,Duplicate,Ignored\n";

    fn table(csv: &str) -> MetadataTable {
        parse_table(csv.as_bytes()).unwrap()
    }

    // =========================================================================
    // find_row() tests
    // =========================================================================

    #[test]
    fn find_row_returns_title_and_description() {
        assert_eq!(
            find_row(&table(SHEET), "Ms1990_025"),
            Lookup::Found(DocumentMetadata {
                title: Some("My Title".to_string()),
                description: Some("My Desc".to_string()),
            })
        );
    }

    #[test]
    fn find_row_first_duplicate_wins() {
        let Lookup::Found(meta) = find_row(&table(SHEET), "Ms1990_025") else {
            panic!("expected a match");
        };
        assert_eq!(meta.title.as_deref(), Some("My Title"));
    }

    #[test]
    fn find_row_empty_cell_is_none() {
        assert_eq!(
            find_row(&table(SHEET), "Ms1990_026"),
            Lookup::Found(DocumentMetadata {
                title: Some("Second".to_string()),
                description: None,
            })
        );
    }

    #[test]
    fn find_row_keeps_cell_text_verbatim() {
        let sheet = "Identifier,Title,Description\nMs1990_025,\"  Letters \",\" \"\n";
        assert_eq!(
            find_row(&table(sheet), "Ms1990_025"),
            Lookup::Found(DocumentMetadata {
                title: Some("  Letters ".to_string()),
                description: Some(" ".to_string()),
            })
        );
    }

    #[test]
    fn find_row_no_match() {
        assert_eq!(find_row(&table(SHEET), "Ms2000_001"), Lookup::NoMatch);
    }

    #[test]
    fn find_row_requires_exact_identifier_header() {
        let t = table("identifier,Title\nMs1990_025,Lowercase header\n");
        assert_eq!(find_row(&t, "Ms1990_025"), Lookup::NoIdentifierHeader);
    }

    #[test]
    fn find_row_identifier_compared_exactly() {
        let t = table("Identifier,Title\n Ms1990_025,Padded\n");
        assert_eq!(find_row(&t, "Ms1990_025"), Lookup::NoMatch);
    }

    #[test]
    fn find_row_without_optional_columns() {
        let t = table("Identifier\nMs1990_025\n");
        assert_eq!(
            find_row(&t, "Ms1990_025"),
            Lookup::Found(DocumentMetadata::default())
        );
    }

    #[test]
    fn find_row_columns_in_any_order() {
        let t = table("Description,Identifier,Title\nA desc,Ms1990_025,A title\n");
        assert_eq!(
            find_row(&t, "Ms1990_025"),
            Lookup::Found(DocumentMetadata {
                title: Some("A title".to_string()),
                description: Some("A desc".to_string()),
            })
        );
    }

    // =========================================================================
    // parse_table() tests
    // =========================================================================

    #[test]
    fn parse_table_strips_byte_order_mark() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(SHEET.as_bytes());
        let t = parse_table(&bytes).unwrap();
        assert_eq!(t.headers[0], "Identifier");
        assert!(matches!(find_row(&t, "Ms1990_025"), Lookup::Found(_)));
    }

    #[test]
    fn parse_table_tolerates_short_rows() {
        let t = table("Identifier,Title,Description\nMs1990_025,Only title\n");
        assert_eq!(t.rows[0].len(), 2);
        assert_eq!(
            find_row(&t, "Ms1990_025"),
            Lookup::Found(DocumentMetadata {
                title: Some("Only title".to_string()),
                description: None,
            })
        );
    }

    #[test]
    fn parse_table_quoted_commas_and_newlines() {
        let t = table("Identifier,Description\nMs1990_025,\"Letters, 1911\nand 1912\"\n");
        assert_eq!(t.rows[0][1], "Letters, 1911\nand 1912");
    }

    #[test]
    fn parse_table_invalid_utf8_is_error() {
        let bytes = b"Identifier,Title\nMs1990_025,\xFF\xFE\n";
        assert!(matches!(parse_table(bytes), Err(MetadataError::Csv(_))));
    }

    // =========================================================================
    // MetadataSource tests
    // =========================================================================

    #[test]
    fn source_parse_distinguishes_urls() {
        assert_eq!(
            MetadataSource::parse("https://example.org/Ms1990_025.csv"),
            MetadataSource::Url("https://example.org/Ms1990_025.csv".to_string())
        );
        assert_eq!(
            MetadataSource::parse("data/Ms1990_025.csv"),
            MetadataSource::Path(PathBuf::from("data/Ms1990_025.csv"))
        );
    }

    #[test]
    fn source_file_name_strips_query() {
        let source = MetadataSource::parse("https://example.org/sheets/Ms1990_025.csv?raw=true");
        assert_eq!(source.file_name().as_deref(), Some("Ms1990_025.csv"));
    }

    // =========================================================================
    // lookup() / MetadataIndex tests
    // =========================================================================

    #[test]
    fn lookup_reads_local_sheet() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(tmp.path(), "Ms1990_025_metadata.csv", SHEET);
        let source = MetadataSource::Path(path);

        let meta = lookup(&source, "Ms1990_025", &MetadataConfig::default()).unwrap();
        assert_eq!(meta.title.as_deref(), Some("My Title"));
    }

    #[test]
    fn lookup_missing_file_is_not_found() {
        let source = MetadataSource::Path(PathBuf::from("/nonexistent/sheet.csv"));
        assert_eq!(lookup(&source, "Ms1990_025", &MetadataConfig::default()), None);
    }

    #[test]
    fn lookup_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(tmp.path(), "sheet.csv", SHEET);
        let source = MetadataSource::Path(path);
        let config = MetadataConfig::default();

        let first = lookup(&source, "Ms1990_025", &config);
        let second = lookup(&source, "Ms1990_025", &config);
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn index_matches_uncached_lookup() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(tmp.path(), "sheet.csv", SHEET);
        let source = MetadataSource::Path(path);
        let config = MetadataConfig::default();
        let index = MetadataIndex::open(&source, &config);

        for id in ["Ms1990_025", "Ms1990_026", "Ms2000_001"] {
            assert_eq!(index.lookup(id), lookup(&source, id, &config), "id {id}");
        }
    }

    #[test]
    fn index_without_identifier_header_never_matches() {
        let index = MetadataIndex::from_table(
            "sheet.csv",
            table("Id,Title,Description\nMs1990_025,My Title,My Desc\n"),
        );
        assert!(index.is_available());
        assert_eq!(index.lookup("Ms1990_025"), None);
        assert_eq!(index.lookup("anything"), None);
    }

    #[test]
    fn index_unavailable_sheet_returns_none() {
        let source = MetadataSource::Path(PathBuf::from("/nonexistent/sheet.csv"));
        let index = MetadataIndex::open(&source, &MetadataConfig::default());
        assert!(!index.is_available());
        assert_eq!(index.lookup("Ms1990_025"), None);
    }

    #[test]
    fn index_saves_copy_under_original_name() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(tmp.path(), "Ms1990_025_metadata.csv", SHEET);
        let index = MetadataIndex::open(&MetadataSource::Path(path), &MetadataConfig::default());

        let out = tmp.path().join("out");
        let saved = index.save_copy(&out).unwrap().unwrap();
        assert_eq!(saved, out.join("Ms1990_025_metadata.csv"));
        assert_eq!(std::fs::read_to_string(saved).unwrap(), SHEET);
    }

    #[test]
    fn index_save_copy_without_sheet_is_noop() {
        let tmp = TempDir::new().unwrap();
        let index = MetadataIndex::open(
            &MetadataSource::Path(PathBuf::from("/nonexistent/sheet.csv")),
            &MetadataConfig::default(),
        );
        assert_eq!(index.save_copy(tmp.path()).unwrap(), None);
    }
}
