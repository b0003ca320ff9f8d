//! Delimited text → [`Table`].
//!
//! Header names are always trimmed; string cells only when asked. Columns
//! whose every non-null value is a finite number load as numeric cells.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, instrument, warn};

use leadsift_shared::{LeadSiftError, Result};

use crate::separator::{Separator, detect_separator, detect_separator_in_file};
use crate::table::{Cell, Record, Table, parse_finite};

/// Raw values read as null (the usual spreadsheet/dataframe NA spellings).
pub const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// What to do with a line carrying more fields than the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BadLinePolicy {
    /// Abort with a parse error.
    #[default]
    Fail,
    /// Drop the line and keep going.
    Skip,
}

/// Loader settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Trim surrounding whitespace from string cells.
    pub trim_cells: bool,
    /// Handling of over-long lines.
    pub bad_lines: BadLinePolicy,
}

impl LoadOptions {
    pub fn with_trim_cells(mut self, trim: bool) -> Self {
        self.trim_cells = trim;
        self
    }

    pub fn with_bad_lines(mut self, policy: BadLinePolicy) -> Self {
        self.bad_lines = policy;
        self
    }
}

/// A parsed table plus what the loader learned along the way.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub table: Table,
    pub separator: Separator,
    /// Lines dropped under [`BadLinePolicy::Skip`].
    pub skipped_lines: usize,
}

/// Detect the separator of the file at `path`, then parse it.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_file(path: &Path, opts: &LoadOptions) -> Result<Loaded> {
    let separator = detect_separator_in_file(path)?;
    let text = read_text(path)?;
    let loaded = parse_str(&text, separator, opts)?;

    info!(
        %separator,
        rows = loaded.table.len(),
        columns = loaded.table.columns().len(),
        skipped = loaded.skipped_lines,
        "table loaded"
    );
    Ok(loaded)
}

/// Detect the separator of `text`, then parse it.
pub fn load_str(text: &str, opts: &LoadOptions) -> Result<Loaded> {
    let separator = detect_separator(text);
    debug!(%separator, "separator detected");
    parse_str(text, separator, opts)
}

/// Read a text file, dropping a UTF-8 byte-order mark. Invalid UTF-8 is
/// replaced rather than rejected.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| LeadSiftError::io(path, e))?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    match std::str::from_utf8(body) {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "input is not valid UTF-8, replacing bad bytes");
            Ok(String::from_utf8_lossy(body).into_owned())
        }
    }
}

/// Parse `text` with a known separator.
pub fn parse_str(text: &str, separator: Separator, opts: &LoadOptions) -> Result<Loaded> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(separator.as_byte())
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| {
            LeadSiftError::parse(format!(
                "failed to read header row with separator '{separator}': {e}"
            ))
        })?
        .clone();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LeadSiftError::parse("no columns to parse from input"));
    }

    let columns = normalize_headers(&headers);
    let width = columns.len();

    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut skipped_lines = 0;

    for result in reader.records() {
        let record = result.map_err(|e| {
            LeadSiftError::parse(format!("failed to read row with separator '{separator}': {e}"))
        })?;

        if record.len() == 1 && record.get(0).is_some_and(str::is_empty) && width > 1 {
            continue;
        }

        if record.len() > width {
            let line = record.position().map_or(0, csv::Position::line);
            match opts.bad_lines {
                BadLinePolicy::Fail => {
                    return Err(LeadSiftError::parse(format!(
                        "line {line}: expected {width} fields, saw {} (separator '{separator}')",
                        record.len()
                    )));
                }
                BadLinePolicy::Skip => {
                    debug!(line, fields = record.len(), expected = width, "skipping bad line");
                    skipped_lines += 1;
                    continue;
                }
            }
        }

        raw_rows.push(
            (0..width)
                .map(|i| record.get(i).and_then(|v| normalize_value(v, opts.trim_cells)))
                .collect(),
        );
    }

    if skipped_lines > 0 {
        warn!(skipped_lines, "dropped lines with too many fields");
    }

    let numeric: Vec<bool> = (0..width)
        .map(|i| column_is_numeric(raw_rows.iter().map(|r| r[i].as_deref())))
        .collect();

    let rows = raw_rows
        .into_iter()
        .map(|raw| {
            Record::new(
                raw.into_iter()
                    .zip(&numeric)
                    .map(|(value, &is_numeric)| to_cell(value, is_numeric))
                    .collect(),
            )
        })
        .collect();

    Ok(Loaded {
        table: Table::new(columns, rows)?,
        separator,
        skipped_lines,
    })
}

/// Trim header names; name blanks `Unnamed: N` and suffix repeats `.1`, `.2`, ….
fn normalize_headers(headers: &StringRecord) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(headers.len());
    for (i, header) in headers.iter().enumerate() {
        let trimmed = header.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {i}")
        } else {
            trimmed.to_string()
        };

        let mut name = base.clone();
        let mut k = 1;
        while columns.contains(&name) {
            name = format!("{base}.{k}");
            k += 1;
        }
        columns.push(name);
    }
    columns
}

fn normalize_value(value: &str, trim: bool) -> Option<String> {
    let value = if trim { value.trim() } else { value };
    if NA_MARKERS.contains(&value) {
        None
    } else {
        Some(value.to_string())
    }
}

fn column_is_numeric<'a>(mut values: impl Iterator<Item = Option<&'a str>>) -> bool {
    let mut any = false;
    let all = values.all(|v| match v {
        None => true,
        Some(s) => {
            any = true;
            parse_finite(s.trim()).is_some()
        }
    });
    any && all
}

fn to_cell(value: Option<String>, numeric: bool) -> Cell {
    match value {
        None => Cell::Null,
        Some(v) if numeric => {
            let raw = v.trim().to_string();
            Cell::number(raw).unwrap_or(Cell::Text(v))
        }
        Some(v) => Cell::Text(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, opts: &LoadOptions) -> Result<Loaded> {
        parse_str(text, detect_separator(text), opts)
    }

    #[test]
    fn parses_semicolon_file_with_trimmed_headers() {
        let text = " title ;cid; mail\nBakery;12;a@x.com\nButcher;13;\n";
        let loaded = parse(text, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.separator, Separator::Semicolon);

        let table = loaded.table;
        assert_eq!(table.columns(), ["title", "cid", "mail"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "cid"), Cell::number("12").as_ref());
        assert_eq!(table.cell(1, "mail"), Some(&Cell::Null));
    }

    #[test]
    fn trims_string_cells_only_when_asked() {
        let text = "title,mail\n  Bakery , a@x.com \n";

        let raw = parse(text, &LoadOptions::default()).unwrap().table;
        assert_eq!(raw.cell(0, "title"), Some(&Cell::text("  Bakery ")));

        let trimmed = parse(text, &LoadOptions::default().with_trim_cells(true))
            .unwrap()
            .table;
        assert_eq!(trimmed.cell(0, "title"), Some(&Cell::text("Bakery")));
        assert_eq!(trimmed.cell(0, "mail"), Some(&Cell::text("a@x.com")));
    }

    #[test]
    fn numeric_columns_keep_raw_text() {
        let text = "cid,score,phone\n0012,4.50,+33 1 23\n7,,0612\n";
        let table = parse(text, &LoadOptions::default()).unwrap().table;

        let cid = table.cell(0, "cid").unwrap();
        assert_eq!(cid.as_str(), Some("0012"));
        assert_eq!(cid.as_number(), Some(12.0));
        assert_eq!(table.cell(0, "score").unwrap().as_number(), Some(4.5));
        assert_eq!(table.cell(1, "score"), Some(&Cell::Null));
        assert_eq!(table.cell(0, "phone"), Some(&Cell::text("+33 1 23")));
        assert_eq!(table.cell(1, "phone").unwrap().kind(), "text");
    }

    #[test]
    fn na_markers_load_as_null() {
        let text = "title,mail\nA,N/A\nB,null\nC,x@y.z\n";
        let table = parse(text, &LoadOptions::default()).unwrap().table;
        assert!(table.cell(0, "mail").unwrap().is_null());
        assert!(table.cell(1, "mail").unwrap().is_null());
        assert!(!table.cell(2, "mail").unwrap().is_null());
    }

    #[test]
    fn short_rows_are_padded() {
        let text = "a,b,c\n1,2\n";
        let table = parse(text, &LoadOptions::default()).unwrap().table;
        assert_eq!(table.cell(0, "c"), Some(&Cell::Null));
    }

    #[test]
    fn long_rows_fail_by_default() {
        let text = "title,mail\nA,a@x.com,extra,more\n";
        let err = parse(text, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LeadSiftError::Parse { .. }));
        assert!(err.to_string().contains("expected 2 fields, saw 4"));
    }

    #[test]
    fn long_rows_skipped_when_asked() {
        let text = "title,mail\nA,a@x.com,extra\nB,b@x.com\n";
        let opts = LoadOptions::default().with_bad_lines(BadLinePolicy::Skip);
        let loaded = parse(text, &opts).unwrap();
        assert_eq!(loaded.skipped_lines, 1);
        assert_eq!(loaded.table.len(), 1);
        assert_eq!(loaded.table.cell(0, "title"), Some(&Cell::text("B")));
    }

    #[test]
    fn empty_input_is_parse_error() {
        let err = parse("", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LeadSiftError::Parse { .. }));
    }

    #[test]
    fn blank_and_duplicate_headers_are_named() {
        let text = "title,,title\n1,2,3\n";
        let table = parse(text, &LoadOptions::default()).unwrap().table;
        assert_eq!(table.columns(), ["title", "Unnamed: 1", "title.1"]);
    }

    #[test]
    fn quoted_fields_keep_separators() {
        let text = "title,address\n\"Chez Paul, Bistro\",\"1 rue A, Paris\"\n";
        let table = parse(text, &LoadOptions::default()).unwrap().table;
        assert_eq!(table.cell(0, "title"), Some(&Cell::text("Chez Paul, Bistro")));
    }

    #[test]
    fn load_file_strips_bom() {
        let path = std::env::temp_dir().join(format!("ls-load-test-{}.csv", uuid::Uuid::now_v7()));
        std::fs::write(&path, b"\xEF\xBB\xBFtitle;mail\nA;a@x.com\n").unwrap();

        let loaded = load_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.separator, Separator::Semicolon);
        assert_eq!(loaded.table.columns(), ["title", "mail"]);

        std::fs::remove_file(&path).ok();
    }
}
