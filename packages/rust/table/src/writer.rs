//! [`Table`] → comma-separated text (header row, no index column).

use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use tracing::debug;

use leadsift_shared::{LeadSiftError, Result};

use crate::table::Table;

/// Render `table` as a CSV string.
pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut buf = Vec::new();
    write_records(table, &mut buf)
        .map_err(|e| LeadSiftError::validation(format!("failed to serialize table: {e}")))?;
    String::from_utf8(buf)
        .map_err(|e| LeadSiftError::validation(format!("output is not valid UTF-8: {e}")))
}

/// Write `table` to a new file at `path`.
pub fn write_file(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| LeadSiftError::io(path, e))?;
    write_records(table, std::io::BufWriter::new(file))
        .map_err(|e| LeadSiftError::io(path, std::io::Error::other(e)))?;
    debug!(path = %path.display(), rows = table.len(), "wrote table");
    Ok(())
}

fn write_records<W: Write>(table: &Table, out: W) -> csv::Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b',').from_writer(out);
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.cells().iter().map(|c| c.as_str().unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, Record};

    #[test]
    fn writes_header_and_rows() {
        let table = Table::new(
            vec!["title".into(), "cid".into(), "mail".into()],
            vec![
                Record::new(vec![
                    Cell::text("Chez Paul, Bistro"),
                    Cell::number("0012").unwrap(),
                    Cell::Null,
                ]),
                Record::from_texts(["Bakery", "7", "a@x.com"]),
            ],
        )
        .unwrap();

        let out = to_csv_string(&table).unwrap();
        assert_eq!(
            out,
            "title,cid,mail\n\"Chez Paul, Bistro\",0012,\nBakery,7,a@x.com\n"
        );
    }

    #[test]
    fn empty_table_still_has_header() {
        let table = Table::empty(vec!["a".into(), "b".into()]);
        assert_eq!(to_csv_string(&table).unwrap(), "a,b\n");
    }

    #[test]
    fn write_file_roundtrips_through_loader() {
        let path = std::env::temp_dir().join(format!("ls-write-test-{}.csv", uuid::Uuid::now_v7()));
        let table = Table::new(
            vec!["title".into(), "mail".into()],
            vec![Record::from_texts(["A", ""])],
        )
        .unwrap();

        write_file(&table, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "title,mail\nA,\n");
        std::fs::remove_file(&path).ok();
    }
}
